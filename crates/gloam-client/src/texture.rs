//! Diffuse textures for the geometry pass.
//!
//! A texture that is missing or fails to decode resolves to a fully
//! transparent 1×1 texture: its coverage is 0, so the geometry pass
//! discards every fragment that samples it instead of failing.

use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureHandle(pub usize);

pub struct GpuTexture {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub bind_group: wgpu::BindGroup,
}

pub struct TextureCache {
    textures: Vec<GpuTexture>,
    bind_group_layout: wgpu::BindGroupLayout,
    sampler: wgpu::Sampler,
}

/// Decode an image file into RGBA8.
pub fn decode_texture(path: &Path) -> Result<image::RgbaImage, image::ImageError> {
    Ok(image::open(path)?.to_rgba8())
}

impl TextureCache {
    /// Opaque white, for untextured materials.
    pub const WHITE: TextureHandle = TextureHandle(0);
    /// Zero coverage; everything drawn with it is discarded.
    pub const TRANSPARENT: TextureHandle = TextureHandle(1);

    pub fn new(device: &wgpu::Device, queue: &wgpu::Queue) -> Self {
        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Diffuse Texture Layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Diffuse Sampler"),
            address_mode_u: wgpu::AddressMode::Repeat,
            address_mode_v: wgpu::AddressMode::Repeat,
            address_mode_w: wgpu::AddressMode::Repeat,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        let mut cache = Self {
            textures: Vec::new(),
            bind_group_layout,
            sampler,
        };
        let white = image::RgbaImage::from_pixel(1, 1, image::Rgba([255, 255, 255, 255]));
        let transparent = image::RgbaImage::from_pixel(1, 1, image::Rgba([0, 0, 0, 0]));
        cache.add_rgba(device, queue, "white", &white);
        cache.add_rgba(device, queue, "transparent", &transparent);
        cache
    }

    pub fn bind_group_layout(&self) -> &wgpu::BindGroupLayout {
        &self.bind_group_layout
    }

    pub fn add_rgba(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        label: &str,
        image: &image::RgbaImage,
    ) -> TextureHandle {
        let (width, height) = image.dimensions();
        let size = wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        };
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8Unorm,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            image.as_raw(),
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(4 * width),
                rows_per_image: Some(height),
            },
            size,
        );
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(label),
            layout: &self.bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&self.sampler),
                },
            ],
        });

        let handle = TextureHandle(self.textures.len());
        self.textures.push(GpuTexture {
            texture,
            view,
            bind_group,
        });
        tracing::debug!("Uploaded texture '{}' ({}x{})", label, width, height);
        handle
    }

    /// Load an image file, falling back to [`Self::TRANSPARENT`].
    pub fn load(&mut self, device: &wgpu::Device, queue: &wgpu::Queue, path: &Path) -> TextureHandle {
        match decode_texture(path) {
            Ok(image) => self.add_rgba(device, queue, &path.display().to_string(), &image),
            Err(e) => {
                tracing::warn!("Failed to load texture {:?}: {}, using transparent", path, e);
                Self::TRANSPARENT
            }
        }
    }

    /// Bind group for `handle`; unknown handles resolve to transparent.
    pub fn bind_group(&self, handle: TextureHandle) -> &wgpu::BindGroup {
        let texture = self
            .textures
            .get(handle.0)
            .unwrap_or(&self.textures[Self::TRANSPARENT.0]);
        &texture.bind_group
    }

    pub fn len(&self) -> usize {
        self.textures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.textures.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_png() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("leaf.png");
        let mut img = image::RgbaImage::new(2, 2);
        img.put_pixel(1, 0, image::Rgba([10, 20, 30, 0]));
        img.put_pixel(0, 1, image::Rgba([200, 100, 50, 255]));
        img.save(&path).unwrap();

        let decoded = decode_texture(&path).unwrap();
        assert_eq!(decoded.dimensions(), (2, 2));
        assert_eq!(decoded.get_pixel(0, 1).0, [200, 100, 50, 255]);
        assert_eq!(decoded.get_pixel(1, 0).0[3], 0);
    }

    #[test]
    fn test_decode_missing_or_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        assert!(decode_texture(&dir.path().join("missing.png")).is_err());

        let corrupt = dir.path().join("corrupt.png");
        std::fs::write(&corrupt, b"not a png").unwrap();
        assert!(decode_texture(&corrupt).is_err());
    }
}
