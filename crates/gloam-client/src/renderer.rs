//! Deferred renderer: owns the framebuffers and the five passes, and
//! records one frame per call in the fixed schedule order.

use gloam_core::config::RenderConfig;
use gloam_core::shadow::ShadowProjection;
use gloam_core::{Camera, DirectionalLight, Extent, FrameError, FrameSchedule, PassKind, PointLight};

use crate::attachment::Framebuffer;
use crate::camera::CameraState;
use crate::draw::DrawUniformPool;
use crate::gpu::{GpuError, GpuState};
use crate::mesh::MeshCache;
use crate::passes::composite::CompositePass;
use crate::passes::directional::{DirectionalPass, DirectionalUniforms};
use crate::passes::geometry::GeometryPass;
use crate::passes::point_light::PointLightPass;
use crate::passes::shadow::ShadowPass;
use crate::passes::{self, GBUFFER_DEPTH, GBUFFER_POSITION, LIGHTING_OUTPUT, SHADOW_DEPTH};
use crate::scene::DrawItem;
use crate::shader::{ShaderError, ShaderLibrary};
use crate::texture::TextureCache;

#[derive(Debug)]
pub enum RendererError {
    Shader(ShaderError),
    Gpu(GpuError),
    Frame(FrameError),
    /// wgpu validation error raised while building pipelines.
    Pipeline(String),
}

impl std::fmt::Display for RendererError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Shader(e) => write!(f, "{}", e),
            Self::Gpu(e) => write!(f, "{}", e),
            Self::Frame(e) => write!(f, "Frame error: {}", e),
            Self::Pipeline(msg) => write!(f, "Pipeline creation failed: {}", msg),
        }
    }
}

impl std::error::Error for RendererError {}

impl From<ShaderError> for RendererError {
    fn from(e: ShaderError) -> Self {
        Self::Shader(e)
    }
}

impl From<GpuError> for RendererError {
    fn from(e: GpuError) -> Self {
        Self::Gpu(e)
    }
}

impl From<FrameError> for RendererError {
    fn from(e: FrameError) -> Self {
        Self::Frame(e)
    }
}

/// Runtime-tunable lighting parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LightingSettings {
    pub intensity: f32,
    pub glossiness: f32,
    pub shadows_enabled: bool,
    pub wireframe_volumes: bool,
}

const MIN_GLOSSINESS: f32 = 1.0;
const MAX_GLOSSINESS: f32 = 256.0;
const MAX_INTENSITY: f32 = 16.0;

impl Default for LightingSettings {
    fn default() -> Self {
        Self::from_config(&RenderConfig::default())
    }
}

impl LightingSettings {
    pub fn from_config(config: &RenderConfig) -> Self {
        Self {
            intensity: config.lighting.intensity,
            glossiness: config.lighting.glossiness,
            shadows_enabled: config.shadows.enabled,
            wireframe_volumes: config.debug.wireframe_volumes,
        }
    }

    pub fn scale_intensity(&mut self, factor: f32) {
        self.intensity = (self.intensity * factor).clamp(0.0, MAX_INTENSITY);
    }

    pub fn adjust_glossiness(&mut self, factor: f32) {
        self.glossiness = (self.glossiness * factor).clamp(MIN_GLOSSINESS, MAX_GLOSSINESS);
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FrameTiming {
    pub frame: u64,
    pub delta: f32,
}

/// Formats the renderer writes that depend on the surface or adapter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TargetFormats {
    /// The surface or texture the compositor draws into.
    pub output: wgpu::TextureFormat,
    pub gbuffer_position: wgpu::TextureFormat,
}

impl TargetFormats {
    pub fn new(output: wgpu::TextureFormat) -> Self {
        Self {
            output,
            gbuffer_position: GBUFFER_POSITION.format,
        }
    }

    pub fn with_gbuffer_position(self, format: wgpu::TextureFormat) -> Self {
        Self {
            gbuffer_position: format,
            ..self
        }
    }
}

/// Everything one frame reads. Passes see nothing else.
pub struct RenderContext<'a> {
    pub camera: &'a Camera,
    pub draws: &'a [DrawItem],
    pub directional: DirectionalLight,
    pub lights: &'a [PointLight],
    pub settings: LightingSettings,
    pub timing: FrameTiming,
    pub meshes: &'a MeshCache,
    pub textures: &'a TextureCache,
}

pub struct DeferredRenderer {
    extent: Extent,
    shadow_resolution: u32,
    schedule: FrameSchedule,

    camera: CameraState,
    draw_pool: DrawUniformPool,

    gbuffer: Framebuffer,
    lighting_output: Framebuffer,
    shadow_map: Framebuffer,
    gbuffer_layout: wgpu::BindGroupLayout,
    gbuffer_bind_group: wgpu::BindGroup,

    shadow_pass: ShadowPass,
    geometry_pass: GeometryPass,
    directional_pass: DirectionalPass,
    point_light_pass: PointLightPass,
    composite_pass: CompositePass,
}

impl DeferredRenderer {
    /// Allocate every framebuffer and build every pipeline.
    ///
    /// wgpu validation errors raised during construction are captured and
    /// returned as [`RendererError::Pipeline`].
    pub fn new(
        device: &wgpu::Device,
        formats: TargetFormats,
        extent: Extent,
        shadow_resolution: u32,
        light_capacity: usize,
        shaders: &ShaderLibrary,
        textures: &TextureCache,
    ) -> Result<Self, RendererError> {
        device.push_error_scope(wgpu::ErrorFilter::Validation);

        let shadow_resolution = shadow_resolution.max(1);
        let camera = CameraState::new(device);
        let draw_pool = DrawUniformPool::new(device);

        let gbuffer = Framebuffer::new(
            device,
            "gbuffer",
            &passes::gbuffer_color(formats.gbuffer_position),
            Some(GBUFFER_DEPTH),
            extent,
        );
        let lighting_output = Framebuffer::new(device, "lighting_output", &[LIGHTING_OUTPUT], None, extent);
        let shadow_map = Framebuffer::new(
            device,
            "shadow_map",
            &[],
            Some(SHADOW_DEPTH),
            Extent::new(shadow_resolution, shadow_resolution),
        );
        let shadow_view = shadow_map
            .depth()
            .map(|attachment| attachment.view())
            .ok_or_else(|| RendererError::Pipeline("shadow map has no depth attachment".to_string()))?;

        let gbuffer_layout = passes::gbuffer_bind_group_layout(device);
        let gbuffer_bind_group = passes::create_gbuffer_bind_group(device, &gbuffer_layout, &gbuffer);

        let shadow_pass = ShadowPass::new(device, shaders, &draw_pool.bind_group_layout);
        let geometry_pass = GeometryPass::new(
            device,
            shaders,
            &gbuffer,
            &camera.bind_group_layout,
            &draw_pool.bind_group_layout,
            textures.bind_group_layout(),
        );
        let directional_pass = DirectionalPass::new(
            device,
            shaders,
            &camera.bind_group_layout,
            &gbuffer_layout,
            shadow_view,
            shadow_resolution,
        );
        let point_light_pass = PointLightPass::new(
            device,
            shaders,
            &camera.bind_group_layout,
            &gbuffer_layout,
            light_capacity,
            device.features().contains(wgpu::Features::POLYGON_MODE_LINE),
        );
        let composite_pass = CompositePass::new(device, shaders, formats.output, &lighting_output);

        if let Some(error) = pollster::block_on(device.pop_error_scope()) {
            return Err(RendererError::Pipeline(error.to_string()));
        }

        tracing::info!(
            "Deferred renderer ready: {} output, {}x{} shadow map, {:?} target, {:?} positions",
            extent,
            shadow_resolution,
            shadow_resolution,
            formats.output,
            formats.gbuffer_position
        );

        Ok(Self {
            extent,
            shadow_resolution,
            schedule: FrameSchedule::new(),
            camera,
            draw_pool,
            gbuffer,
            lighting_output,
            shadow_map,
            gbuffer_layout,
            gbuffer_bind_group,
            shadow_pass,
            geometry_pass,
            directional_pass,
            point_light_pass,
            composite_pass,
        })
    }

    pub fn extent(&self) -> Extent {
        self.extent
    }

    pub fn shadow_resolution(&self) -> u32 {
        self.shadow_resolution
    }

    pub fn frames_completed(&self) -> u64 {
        self.schedule.frames_completed()
    }

    pub fn supports_wireframe(&self) -> bool {
        self.point_light_pass.supports_wireframe()
    }

    /// Attachment sizes of the window-sized framebuffers, keyed by
    /// framebuffer label.
    pub fn framebuffer_extents(&self) -> Vec<(&str, Extent)> {
        [&self.gbuffer, &self.lighting_output]
            .into_iter()
            .flat_map(|fb| {
                fb.attachment_extents()
                    .into_iter()
                    .map(move |extent| (fb.label(), extent))
            })
            .collect()
    }

    pub fn shadow_map_extent(&self) -> Extent {
        self.shadow_map.extent()
    }

    /// Reallocate the G-buffer and lighting output together and rebuild the
    /// bind groups that read them. Zero dimensions are clamped to 1.
    ///
    /// Only valid between frames.
    pub fn resize(&mut self, device: &wgpu::Device, width: u32, height: u32) -> Result<Extent, FrameError> {
        if !self.schedule.is_idle() {
            return Err(FrameError::Busy);
        }
        let extent = Extent::new(width, height);
        if extent == self.extent {
            tracing::trace!("Renderer already {}", extent);
            return Ok(extent);
        }

        self.gbuffer.resize(device, extent);
        self.lighting_output.resize(device, extent);
        self.gbuffer_bind_group =
            passes::create_gbuffer_bind_group(device, &self.gbuffer_layout, &self.gbuffer);
        self.composite_pass.rebind(device, &self.lighting_output);

        tracing::info!("Renderer resized {} -> {}", self.extent, extent);
        self.extent = extent;
        Ok(extent)
    }

    /// Render one frame into `target`, which must match [`Self::extent`].
    pub fn render_to_view(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        ctx: &RenderContext<'_>,
        target: &wgpu::TextureView,
    ) -> Result<(), RendererError> {
        self.schedule.begin()?;
        match self.record_frame(device, queue, ctx, target) {
            Ok(encoder) => {
                queue.submit(std::iter::once(encoder.finish()));
                self.schedule.finish()?;
                Ok(())
            }
            Err(e) => {
                self.schedule.abort();
                Err(e)
            }
        }
    }

    fn record_frame(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        ctx: &RenderContext<'_>,
        target: &wgpu::TextureView,
    ) -> Result<wgpu::CommandEncoder, RendererError> {
        let settings = ctx.settings;

        self.camera.update(queue, ctx.camera, self.extent);
        let draw_count = self.draw_pool.upload(queue, ctx.draws);

        // Recomputed every frame; the light may move.
        let light_space = ShadowProjection::from_light_position(ctx.directional.position).light_space();
        self.shadow_pass.update(queue, light_space);
        self.directional_pass.update(
            queue,
            &DirectionalUniforms::new(
                &ctx.directional,
                light_space,
                settings.glossiness,
                self.shadow_resolution,
                settings.shadows_enabled,
            ),
        );
        self.point_light_pass.set_lights(device, queue, ctx.lights);
        self.point_light_pass
            .update(queue, settings.glossiness, settings.intensity);

        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Deferred Frame Encoder"),
        });

        self.schedule.enter(PassKind::Shadow)?;
        self.shadow_pass.execute(
            &mut encoder,
            &self.shadow_map,
            &self.draw_pool,
            ctx.draws,
            draw_count,
            ctx.meshes,
            settings.shadows_enabled,
        );

        self.schedule.enter(PassKind::Geometry)?;
        self.geometry_pass.execute(
            &mut encoder,
            &self.gbuffer,
            &self.camera,
            &self.draw_pool,
            ctx.draws,
            draw_count,
            ctx.meshes,
            ctx.textures,
        );

        self.schedule.enter(PassKind::DirectionalLighting)?;
        self.directional_pass.execute(
            &mut encoder,
            &self.lighting_output,
            &self.camera,
            &self.gbuffer_bind_group,
        );

        self.schedule.enter(PassKind::PointLighting)?;
        self.point_light_pass.execute(
            &mut encoder,
            &self.lighting_output,
            &self.camera,
            &self.gbuffer_bind_group,
            settings.wireframe_volumes,
        );

        self.schedule.enter(PassKind::Composite)?;
        self.composite_pass.execute(&mut encoder, target);

        tracing::trace!(
            "Recorded frame {}: {} draws, {} lights",
            ctx.timing.frame,
            draw_count,
            self.point_light_pass.instance_count()
        );
        Ok(encoder)
    }

    /// Render to the window surface and present.
    ///
    /// A lost or outdated surface is reconfigured and the frame skipped;
    /// other acquire failures are logged and the frame skipped.
    pub fn render(&mut self, gpu: &GpuState, ctx: &RenderContext<'_>) -> Result<(), RendererError> {
        let output = match gpu.surface.get_current_texture() {
            Ok(texture) => texture,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                tracing::debug!("Surface lost or outdated, reconfiguring");
                gpu.reconfigure();
                return Ok(());
            }
            Err(e) => {
                tracing::error!("Surface error: {:?}", e);
                return Ok(());
            }
        };
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        self.render_to_view(&gpu.device, &gpu.queue, ctx, &view)?;
        output.present();
        Ok(())
    }
}
