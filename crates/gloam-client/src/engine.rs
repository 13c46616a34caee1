use std::path::PathBuf;
use std::sync::Arc;

use glam::Quat;
use gloam_core::config::RenderConfig;
use gloam_core::{Camera, DirectionalLight, Extent, LightGrid};
use winit::application::ApplicationHandler;
use winit::dpi::PhysicalSize;
use winit::event::WindowEvent;
use winit::event_loop::ActiveEventLoop;
use winit::window::{Window, WindowId};

use crate::gpu::GpuState;
use crate::input::{Control, InputState};
use crate::mesh::MeshCache;
use crate::renderer::{DeferredRenderer, FrameTiming, LightingSettings, RenderContext, TargetFormats};
use crate::scene::{self, SceneWorld};
use crate::shader::ShaderLibrary;
use crate::texture::TextureCache;

/// Radians per second.
const ORBIT_SPEED: f32 = 1.2;
const LIGHT_ORBIT_SPEED: f32 = 0.4;
const INTENSITY_STEP: f32 = 1.25;
const GLOSSINESS_STEP: f32 = 2.0;
const LINEAR_STEP: f32 = 0.01;
const QUADRATIC_STEP: f32 = 0.004;
/// World units per scroll line.
const ZOOM_STEP: f32 = 0.75;

/// Host loop: owns the window, GPU, scene and renderer.
pub struct Engine {
    config: RenderConfig,
    shader_dir: Option<PathBuf>,
    failure: Option<String>,

    gpu: Option<GpuState>,
    renderer: Option<DeferredRenderer>,
    scene: Option<SceneWorld>,
    meshes: MeshCache,
    textures: Option<TextureCache>,

    light_grid: LightGrid,
    camera: Camera,
    settings: LightingSettings,
    directional: DirectionalLight,
    animate_light: bool,
    light_angle: f32,

    input: InputState,
    /// Latest size from `Resized`, applied before the next frame.
    pending_resize: Option<PhysicalSize<u32>>,
    last_frame_time: Option<instant::Instant>,
    frame_index: u64,
}

impl Engine {
    pub fn new(config: RenderConfig, shader_dir: Option<PathBuf>) -> Self {
        let light_grid = LightGrid::generate(config.light_grid.params(), config.light_grid.seed);
        Self {
            settings: LightingSettings::from_config(&config),
            directional: config.lighting.directional_light(),
            animate_light: config.lighting.animate,
            config,
            shader_dir,
            failure: None,
            gpu: None,
            renderer: None,
            scene: None,
            meshes: MeshCache::new(),
            textures: None,
            light_grid,
            camera: Camera::default(),
            light_angle: 0.0,
            input: InputState::new(),
            pending_resize: None,
            last_frame_time: None,
            frame_index: 0,
        }
    }

    /// Initialization error that stopped the event loop, if any.
    pub fn failure(&self) -> Option<&str> {
        self.failure.as_deref()
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, message: String) {
        tracing::error!("{}", message);
        self.failure = Some(message);
        event_loop.exit();
    }

    fn initialize(&mut self, window: Arc<Window>) -> Result<(), String> {
        let shaders = ShaderLibrary::load(self.shader_dir.as_deref()).map_err(|e| e.to_string())?;

        let gpu = pollster::block_on(crate::gpu::init_gpu(window, self.config.window.vsync))
            .map_err(|e| e.to_string())?;
        tracing::info!("GPU initialized at {}", gpu.extent());

        let mut textures = TextureCache::new(&gpu.device, &gpu.queue);
        let scene = scene::build_demo_scene(
            &gpu.device,
            &gpu.queue,
            &mut self.meshes,
            &mut textures,
            self.config.scene.ground_texture.as_deref(),
        );

        let renderer = DeferredRenderer::new(
            &gpu.device,
            TargetFormats::new(gpu.config.format).with_gbuffer_position(gpu.gbuffer_position_format),
            gpu.extent(),
            self.config.shadows.resolution,
            self.light_grid.len(),
            &shaders,
            &textures,
        )
        .map_err(|e| e.to_string())?;

        if self.settings.wireframe_volumes && !renderer.supports_wireframe() {
            tracing::warn!("Wireframe light volumes need POLYGON_MODE_LINE, ignoring");
        }

        self.textures = Some(textures);
        self.scene = Some(scene);
        self.renderer = Some(renderer);
        self.gpu = Some(gpu);
        Ok(())
    }

    fn apply_control(&mut self, control: Control) {
        match control {
            Control::ToggleShadows => {
                self.settings.shadows_enabled = !self.settings.shadows_enabled;
                tracing::info!("Shadows {}", on_off(self.settings.shadows_enabled));
            }
            Control::ToggleWireframe => {
                self.settings.wireframe_volumes = !self.settings.wireframe_volumes;
                let supported = self
                    .renderer
                    .as_ref()
                    .is_some_and(DeferredRenderer::supports_wireframe);
                if self.settings.wireframe_volumes && !supported {
                    tracing::warn!("Wireframe light volumes need POLYGON_MODE_LINE, ignoring");
                } else {
                    tracing::info!("Light volume wireframe {}", on_off(self.settings.wireframe_volumes));
                }
            }
            Control::IntensityUp | Control::IntensityDown => {
                let factor = if control == Control::IntensityUp {
                    INTENSITY_STEP
                } else {
                    1.0 / INTENSITY_STEP
                };
                self.settings.scale_intensity(factor);
                tracing::info!("Point light intensity {:.2}", self.settings.intensity);
            }
            Control::GlossinessUp | Control::GlossinessDown => {
                let factor = if control == Control::GlossinessUp {
                    GLOSSINESS_STEP
                } else {
                    1.0 / GLOSSINESS_STEP
                };
                self.settings.adjust_glossiness(factor);
                tracing::info!("Glossiness {:.0}", self.settings.glossiness);
            }
            Control::LinearUp | Control::LinearDown => {
                let step = if control == Control::LinearUp {
                    LINEAR_STEP
                } else {
                    -LINEAR_STEP
                };
                let lighting = &mut self.config.lighting;
                lighting.linear = (lighting.linear + step).max(0.0);
                tracing::info!("Directional attenuation linear {:.3}", lighting.linear);
            }
            Control::QuadraticUp | Control::QuadraticDown => {
                let step = if control == Control::QuadraticUp {
                    QUADRATIC_STEP
                } else {
                    -QUADRATIC_STEP
                };
                let lighting = &mut self.config.lighting;
                lighting.quadratic = (lighting.quadratic + step).max(0.0);
                tracing::info!("Directional attenuation quadratic {:.3}", lighting.quadratic);
            }
            Control::ToggleAnimation => {
                self.animate_light = !self.animate_light;
                tracing::info!("Directional light animation {}", on_off(self.animate_light));
            }
        }
    }

    fn update(&mut self, delta: f32) {
        for control in self.input.controls() {
            self.apply_control(control);
        }

        let (yaw, pitch) = self.input.orbit_axis();
        self.camera.orbit(yaw * ORBIT_SPEED * delta, pitch * ORBIT_SPEED * delta);
        let scroll = self.input.scroll_lines();
        if scroll != 0.0 {
            // Scrolling up moves the camera in
            self.camera.zoom(-scroll * ZOOM_STEP);
        }

        if self.animate_light {
            self.light_angle += LIGHT_ORBIT_SPEED * delta;
        }
        let base = self.config.lighting.directional_light();
        self.directional = DirectionalLight {
            position: Quat::from_rotation_y(self.light_angle) * base.position,
            ..base
        };
    }

    fn apply_pending_resize(&mut self) {
        let Some(size) = self.pending_resize.take() else {
            return;
        };
        let (Some(gpu), Some(renderer)) = (&mut self.gpu, &mut self.renderer) else {
            return;
        };
        let extent = Extent::new(size.width, size.height);
        gpu.resize(extent);
        if let Err(e) = renderer.resize(&gpu.device, extent.width(), extent.height()) {
            tracing::error!("Resize to {} rejected: {}", extent, e);
        }
    }

    fn redraw(&mut self) {
        let now = instant::Instant::now();
        let delta = self
            .last_frame_time
            .map(|last| now.duration_since(last).as_secs_f32().min(0.1))
            .unwrap_or(1.0 / 60.0);
        self.last_frame_time = Some(now);

        self.apply_pending_resize();
        self.update(delta);
        self.input.begin_frame();

        let (Some(gpu), Some(renderer), Some(scene), Some(textures)) =
            (&self.gpu, &mut self.renderer, &self.scene, &self.textures)
        else {
            return;
        };

        // Minimized windows keep a 1x1 surface; nothing worth drawing.
        if gpu.window.is_minimized().unwrap_or(false) {
            return;
        }

        let draws = scene.draw_list();
        let ctx = RenderContext {
            camera: &self.camera,
            draws: &draws,
            directional: self.directional,
            lights: self.light_grid.lights(),
            settings: self.settings,
            timing: FrameTiming {
                frame: self.frame_index,
                delta,
            },
            meshes: &self.meshes,
            textures,
        };
        if let Err(e) = renderer.render(gpu, &ctx) {
            tracing::error!("Frame {} failed: {}", self.frame_index, e);
        }
        self.frame_index += 1;
    }
}

fn on_off(enabled: bool) -> &'static str {
    if enabled {
        "on"
    } else {
        "off"
    }
}

impl ApplicationHandler for Engine {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.gpu.is_some() {
            return;
        }

        tracing::info!("Application resumed, initializing GPU");

        let window_attrs = Window::default_attributes()
            .with_title("gloam")
            .with_inner_size(PhysicalSize::new(
                self.config.window.width,
                self.config.window.height,
            ));
        let window = match event_loop.create_window(window_attrs) {
            Ok(window) => Arc::new(window),
            Err(e) => {
                self.fail(event_loop, format!("Failed to create window: {}", e));
                return;
            }
        };

        if let Err(message) = self.initialize(window) {
            self.fail(event_loop, message);
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        self.input.handle_window_event(&event);

        match event {
            WindowEvent::CloseRequested => {
                tracing::info!("Close requested, exiting");
                event_loop.exit();
            }
            WindowEvent::Resized(new_size) => {
                self.pending_resize = Some(new_size);
            }
            WindowEvent::RedrawRequested => self.redraw(),
            _ => {}
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(gpu) = &self.gpu {
            gpu.window.request_redraw();
        }
    }
}
