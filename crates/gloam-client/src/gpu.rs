use std::sync::Arc;

use gloam_core::Extent;
use winit::window::Window;

use crate::passes::{GBUFFER_POSITION, GBUFFER_POSITION_FALLBACK};

#[derive(Debug)]
pub enum GpuError {
    Surface(String),
    NoAdapter,
    Device(wgpu::RequestDeviceError),
}

impl std::fmt::Display for GpuError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Surface(msg) => write!(f, "Surface error: {}", msg),
            Self::NoAdapter => write!(f, "No suitable GPU adapter found"),
            Self::Device(e) => write!(f, "Failed to create device: {}", e),
        }
    }
}

impl std::error::Error for GpuError {}

impl From<wgpu::RequestDeviceError> for GpuError {
    fn from(e: wgpu::RequestDeviceError) -> Self {
        Self::Device(e)
    }
}

/// GPU state created after the window is available.
pub struct GpuState {
    pub window: Arc<Window>,
    pub surface: wgpu::Surface<'static>,
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub config: wgpu::SurfaceConfiguration,
    pub gbuffer_position_format: wgpu::TextureFormat,
}

impl GpuState {
    pub fn extent(&self) -> Extent {
        Extent::new(self.config.width, self.config.height)
    }

    /// Reconfigure the swapchain for a new window size.
    pub fn resize(&mut self, extent: Extent) {
        self.config.width = extent.width();
        self.config.height = extent.height();
        self.surface.configure(&self.device, &self.config);
    }

    pub fn reconfigure(&self) {
        self.surface.configure(&self.device, &self.config);
    }
}

/// Device and queue without a window, for offscreen rendering.
pub struct HeadlessGpu {
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub gbuffer_position_format: wgpu::TextureFormat,
}

/// Features requested when the adapter has them. Line polygon mode drives
/// the light-volume wireframe overlay.
fn optional_features(adapter: &wgpu::Adapter) -> wgpu::Features {
    adapter.features() & wgpu::Features::POLYGON_MODE_LINE
}

async fn request_device(adapter: &wgpu::Adapter) -> Result<(wgpu::Device, wgpu::Queue), GpuError> {
    let info = adapter.get_info();
    tracing::info!("GPU adapter: {} ({:?})", info.name, info.backend);

    let features = optional_features(adapter);
    if !features.contains(wgpu::Features::POLYGON_MODE_LINE) {
        tracing::debug!("Adapter lacks POLYGON_MODE_LINE, wireframe volumes unavailable");
    }

    let (device, queue) = adapter
        .request_device(
            &wgpu::DeviceDescriptor {
                label: Some("gloam Device"),
                required_features: features,
                required_limits: wgpu::Limits::default(),
                memory_hints: wgpu::MemoryHints::default(),
            },
            None,
        )
        .await?;
    Ok((device, queue))
}

/// Full-precision positions when `usages` allow rendering to them.
pub fn choose_position_format(usages: wgpu::TextureUsages) -> wgpu::TextureFormat {
    if usages.contains(wgpu::TextureUsages::RENDER_ATTACHMENT) {
        GBUFFER_POSITION.format
    } else {
        GBUFFER_POSITION_FALLBACK
    }
}

fn gbuffer_position_format(adapter: &wgpu::Adapter) -> wgpu::TextureFormat {
    let usages = adapter
        .get_texture_format_features(GBUFFER_POSITION.format)
        .allowed_usages;
    let format = choose_position_format(usages);
    if format != GBUFFER_POSITION.format {
        tracing::warn!(
            "Adapter cannot render to {:?}, storing G-buffer positions as {:?}",
            GBUFFER_POSITION.format,
            format
        );
    }
    format
}

/// Prefer a non-sRGB format so the compositor's copy is not re-encoded.
pub fn choose_surface_format(formats: &[wgpu::TextureFormat]) -> Option<wgpu::TextureFormat> {
    formats
        .iter()
        .find(|f| !f.is_srgb())
        .or_else(|| formats.first())
        .copied()
}

/// Initialize the wgpu device and configure the window surface.
pub async fn init_gpu(window: Arc<Window>, vsync: bool) -> Result<GpuState, GpuError> {
    let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
        backends: wgpu::Backends::all(),
        ..Default::default()
    });

    let surface = instance
        .create_surface(Arc::clone(&window))
        .map_err(|e| GpuError::Surface(e.to_string()))?;

    let adapter = instance
        .request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: Some(&surface),
            force_fallback_adapter: false,
        })
        .await
        .ok_or(GpuError::NoAdapter)?;

    let (device, queue) = request_device(&adapter).await?;
    let gbuffer_position_format = gbuffer_position_format(&adapter);

    let size = window.inner_size();
    let extent = Extent::new(size.width, size.height);
    let surface_caps = surface.get_capabilities(&adapter);
    let surface_format = choose_surface_format(&surface_caps.formats)
        .ok_or_else(|| GpuError::Surface("surface reports no formats".to_string()))?;
    if surface_format.is_srgb() {
        tracing::warn!("No non-sRGB surface format available, output will be sRGB-encoded");
    }
    tracing::info!("Surface format: {:?}", surface_format);

    let config = wgpu::SurfaceConfiguration {
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        format: surface_format,
        width: extent.width(),
        height: extent.height(),
        present_mode: if vsync {
            wgpu::PresentMode::Fifo
        } else {
            wgpu::PresentMode::AutoNoVsync
        },
        alpha_mode: surface_caps.alpha_modes[0],
        view_formats: vec![],
        desired_maximum_frame_latency: 2,
    };
    surface.configure(&device, &config);

    Ok(GpuState {
        window,
        surface,
        device,
        queue,
        config,
        gbuffer_position_format,
    })
}

/// Initialize a device with no surface. Returns `NoAdapter` on machines
/// without any usable backend.
pub async fn init_headless() -> Result<HeadlessGpu, GpuError> {
    let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
        backends: wgpu::Backends::all(),
        ..Default::default()
    });
    let adapter = instance
        .request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::default(),
            compatible_surface: None,
            force_fallback_adapter: false,
        })
        .await
        .ok_or(GpuError::NoAdapter)?;
    let (device, queue) = request_device(&adapter).await?;
    Ok(HeadlessGpu {
        gbuffer_position_format: gbuffer_position_format(&adapter),
        device,
        queue,
    })
}
