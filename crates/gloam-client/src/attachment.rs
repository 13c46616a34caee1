//! Render targets: attachments grouped into framebuffers that are bound,
//! cleared and resized as a unit.

use gloam_core::Extent;

/// Value an attachment is cleared to when bound with [`LoadPolicy::Clear`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ClearValue {
    Color(wgpu::Color),
    Depth(f32),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AttachmentDesc {
    pub label: &'static str,
    pub format: wgpu::TextureFormat,
    pub clear: ClearValue,
}

impl AttachmentDesc {
    pub const fn color(label: &'static str, format: wgpu::TextureFormat) -> Self {
        Self {
            label,
            format,
            clear: ClearValue::Color(wgpu::Color::TRANSPARENT),
        }
    }

    pub const fn depth(label: &'static str, format: wgpu::TextureFormat) -> Self {
        Self {
            label,
            format,
            clear: ClearValue::Depth(1.0),
        }
    }
}

/// A single GPU image. Never resized in place; a resize replaces it.
pub struct Attachment {
    desc: AttachmentDesc,
    texture: wgpu::Texture,
    view: wgpu::TextureView,
}

impl Attachment {
    fn create(device: &wgpu::Device, desc: AttachmentDesc, extent: Extent) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(desc.label),
            size: wgpu::Extent3d {
                width: extent.width(),
                height: extent.height(),
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: desc.format,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT
                | wgpu::TextureUsages::TEXTURE_BINDING
                | wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        tracing::debug!("Allocated attachment '{}': {:?} {}", desc.label, desc.format, extent);
        Self {
            desc,
            texture,
            view,
        }
    }

    pub fn desc(&self) -> &AttachmentDesc {
        &self.desc
    }

    pub fn format(&self) -> wgpu::TextureFormat {
        self.desc.format
    }

    pub fn texture(&self) -> &wgpu::Texture {
        &self.texture
    }

    pub fn view(&self) -> &wgpu::TextureView {
        &self.view
    }

    /// Size of the allocated texture.
    pub fn extent(&self) -> Extent {
        Extent::new(self.texture.width(), self.texture.height())
    }
}

/// Whether binding a framebuffer clears it or keeps what is already there.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadPolicy {
    Clear,
    Preserve,
}

/// Ordered color attachments plus an optional depth attachment, all the
/// same size.
pub struct Framebuffer {
    label: String,
    color: Vec<Attachment>,
    depth: Option<Attachment>,
    extent: Extent,
}

impl Framebuffer {
    pub fn new(
        device: &wgpu::Device,
        label: &str,
        color: &[AttachmentDesc],
        depth: Option<AttachmentDesc>,
        extent: Extent,
    ) -> Self {
        let color = color
            .iter()
            .map(|desc| Attachment::create(device, *desc, extent))
            .collect();
        let depth = depth.map(|desc| Attachment::create(device, desc, extent));
        tracing::debug!("Created framebuffer '{}' at {}", label, extent);
        Self {
            label: label.to_string(),
            color,
            depth,
            extent,
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn extent(&self) -> Extent {
        self.extent
    }

    pub fn color(&self, index: usize) -> &Attachment {
        &self.color[index]
    }

    pub fn color_attachments(&self) -> &[Attachment] {
        &self.color
    }

    pub fn depth(&self) -> Option<&Attachment> {
        self.depth.as_ref()
    }

    /// Dimensions of every allocated attachment, color first.
    pub fn attachment_extents(&self) -> Vec<Extent> {
        self.color
            .iter()
            .chain(self.depth.iter())
            .map(Attachment::extent)
            .collect()
    }

    /// Begin a render pass targeting every attachment, with the viewport
    /// covering the full framebuffer.
    pub fn bind<'e>(
        &self,
        encoder: &'e mut wgpu::CommandEncoder,
        pass_label: &str,
        load: LoadPolicy,
    ) -> wgpu::RenderPass<'e> {
        let color_attachments: Vec<Option<wgpu::RenderPassColorAttachment>> = self
            .color
            .iter()
            .map(|attachment| {
                let load = match (load, attachment.desc.clear) {
                    (LoadPolicy::Clear, ClearValue::Color(color)) => wgpu::LoadOp::Clear(color),
                    _ => wgpu::LoadOp::Load,
                };
                Some(wgpu::RenderPassColorAttachment {
                    view: &attachment.view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load,
                        store: wgpu::StoreOp::Store,
                    },
                })
            })
            .collect();

        let depth_stencil_attachment = self.depth.as_ref().map(|attachment| {
            let load = match (load, attachment.desc.clear) {
                (LoadPolicy::Clear, ClearValue::Depth(depth)) => wgpu::LoadOp::Clear(depth),
                _ => wgpu::LoadOp::Load,
            };
            wgpu::RenderPassDepthStencilAttachment {
                view: &attachment.view,
                depth_ops: Some(wgpu::Operations {
                    load,
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            }
        });

        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some(pass_label),
            color_attachments: &color_attachments,
            depth_stencil_attachment,
            timestamp_writes: None,
            occlusion_query_set: None,
        });
        let [x, y, w, h] = self.extent.viewport();
        pass.set_viewport(x, y, w, h, 0.0, 1.0);
        pass
    }

    /// Reallocate every attachment at `extent`, keeping formats and clear
    /// values. Returns false when the size is unchanged.
    ///
    /// Bind groups that reference the old views must be rebuilt afterwards.
    pub fn resize(&mut self, device: &wgpu::Device, extent: Extent) -> bool {
        if extent == self.extent {
            tracing::trace!("Framebuffer '{}' already {}", self.label, extent);
            return false;
        }
        for attachment in self.color.iter_mut().chain(self.depth.iter_mut()) {
            *attachment = Attachment::create(device, attachment.desc, extent);
        }
        tracing::debug!(
            "Resized framebuffer '{}': {} -> {}",
            self.label,
            self.extent,
            extent
        );
        self.extent = extent;
        true
    }
}
