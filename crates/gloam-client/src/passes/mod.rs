//! The five passes of a frame, in execution order: shadow, geometry,
//! directional lighting, point lighting, composite.
//!
//! Each pass owns its pipeline and pass-local uniforms. Framebuffers and
//! the bind groups that read them belong to the renderer.

pub mod composite;
pub mod directional;
pub mod geometry;
pub mod point_light;
pub mod shadow;

use crate::attachment::{AttachmentDesc, Framebuffer};

/// World position. Adapters that cannot render to 32-bit float targets
/// get [`GBUFFER_POSITION_FALLBACK`].
pub const GBUFFER_POSITION: AttachmentDesc =
    AttachmentDesc::color("gbuffer_position", wgpu::TextureFormat::Rgba32Float);
pub const GBUFFER_POSITION_FALLBACK: wgpu::TextureFormat = wgpu::TextureFormat::Rgba16Float;
pub const GBUFFER_NORMAL: AttachmentDesc =
    AttachmentDesc::color("gbuffer_normal", wgpu::TextureFormat::Rgba16Float);
/// rgb = tinted diffuse, a = coverage
pub const GBUFFER_DIFFUSE: AttachmentDesc =
    AttachmentDesc::color("gbuffer_diffuse", wgpu::TextureFormat::Rgba8Unorm);
/// rgb = specular color, a = glossiness weight
pub const GBUFFER_SPECULAR: AttachmentDesc =
    AttachmentDesc::color("gbuffer_specular", wgpu::TextureFormat::Rgba8Unorm);
pub const GBUFFER_DEPTH: AttachmentDesc =
    AttachmentDesc::depth("gbuffer_depth", wgpu::TextureFormat::Depth32Float);

pub const GBUFFER_COLOR_COUNT: usize = 4;

/// G-buffer color attachments in binding order, with the position target
/// stored as `position_format`.
pub fn gbuffer_color(position_format: wgpu::TextureFormat) -> [AttachmentDesc; GBUFFER_COLOR_COUNT] {
    [
        AttachmentDesc {
            format: position_format,
            ..GBUFFER_POSITION
        },
        GBUFFER_NORMAL,
        GBUFFER_DIFFUSE,
        GBUFFER_SPECULAR,
    ]
}

pub const LIGHTING_OUTPUT: AttachmentDesc =
    AttachmentDesc::color("lighting_output", wgpu::TextureFormat::Rgba16Float);

pub const SHADOW_DEPTH: AttachmentDesc =
    AttachmentDesc::depth("shadow_depth", wgpu::TextureFormat::Depth32Float);

/// G-buffer textures as read by both lighting passes (`textureLoad`, no
/// sampler).
pub fn gbuffer_bind_group_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    let entries: Vec<wgpu::BindGroupLayoutEntry> = (0..GBUFFER_COLOR_COUNT as u32)
        .map(|binding| wgpu::BindGroupLayoutEntry {
            binding,
            visibility: wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Texture {
                sample_type: wgpu::TextureSampleType::Float { filterable: false },
                view_dimension: wgpu::TextureViewDimension::D2,
                multisampled: false,
            },
            count: None,
        })
        .collect();
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some("GBuffer Input Layout"),
        entries: &entries,
    })
}

pub fn create_gbuffer_bind_group(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    gbuffer: &Framebuffer,
) -> wgpu::BindGroup {
    let entries: Vec<wgpu::BindGroupEntry> = gbuffer
        .color_attachments()
        .iter()
        .enumerate()
        .map(|(binding, attachment)| wgpu::BindGroupEntry {
            binding: binding as u32,
            resource: wgpu::BindingResource::TextureView(attachment.view()),
        })
        .collect();
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("GBuffer Input Bind Group"),
        layout,
        entries: &entries,
    })
}

/// Color target state for a pass writing `format` without blending.
fn opaque_target(format: wgpu::TextureFormat) -> Option<wgpu::ColorTargetState> {
    Some(wgpu::ColorTargetState {
        format,
        blend: None,
        write_mask: wgpu::ColorWrites::ALL,
    })
}
