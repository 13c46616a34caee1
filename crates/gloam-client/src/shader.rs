//! WGSL shader assets.
//!
//! Every pass shader lives in `shaders/` as a standalone file whose first
//! line is a `// gloam-shader: v<N>` header. The library resolves each
//! asset from an optional override directory, falling back to the copy
//! compiled into the binary, and validates it with naga once at startup.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Version every shader header must declare.
pub const SHADER_VERSION: u32 = 1;

const VERSION_PREFIX: &str = "// gloam-shader: v";

#[derive(Debug)]
pub enum ShaderError {
    Io(PathBuf, std::io::Error),
    Parse { name: String, message: String },
    Validation { name: String, message: String },
    Version { name: String, found: Option<u32> },
}

impl std::fmt::Display for ShaderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(path, e) => write!(f, "Failed to read shader {:?}: {}", path, e),
            Self::Parse { name, message } => write!(f, "WGSL parse error in {}:\n{}", name, message),
            Self::Validation { name, message } => {
                write!(f, "WGSL validation error in {}:\n{}", name, message)
            }
            Self::Version {
                name,
                found: Some(found),
            } => write!(
                f,
                "Shader {} is version {}, expected {}",
                name, found, SHADER_VERSION
            ),
            Self::Version { name, found: None } => write!(
                f,
                "Shader {} is missing the '{}{}' header",
                name, VERSION_PREFIX, SHADER_VERSION
            ),
        }
    }
}

impl std::error::Error for ShaderError {}

/// The shader of each pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderAsset {
    GBuffer,
    ShadowDepth,
    DirectionalLight,
    PointLight,
    Composite,
}

impl ShaderAsset {
    pub const ALL: [ShaderAsset; 5] = [
        Self::GBuffer,
        Self::ShadowDepth,
        Self::DirectionalLight,
        Self::PointLight,
        Self::Composite,
    ];

    pub fn file_name(&self) -> &'static str {
        match self {
            Self::GBuffer => "gbuffer.wgsl",
            Self::ShadowDepth => "shadow_depth.wgsl",
            Self::DirectionalLight => "directional_light.wgsl",
            Self::PointLight => "point_light.wgsl",
            Self::Composite => "composite.wgsl",
        }
    }

    pub fn embedded(&self) -> &'static str {
        match self {
            Self::GBuffer => include_str!("../shaders/gbuffer.wgsl"),
            Self::ShadowDepth => include_str!("../shaders/shadow_depth.wgsl"),
            Self::DirectionalLight => include_str!("../shaders/directional_light.wgsl"),
            Self::PointLight => include_str!("../shaders/point_light.wgsl"),
            Self::Composite => include_str!("../shaders/composite.wgsl"),
        }
    }
}

/// Version declared on the first line, if any.
pub fn parse_version(source: &str) -> Option<u32> {
    source
        .lines()
        .next()?
        .trim()
        .strip_prefix(VERSION_PREFIX)?
        .trim()
        .parse()
        .ok()
}

/// Check the header, then parse and validate `source` with naga.
pub fn validate_wgsl(name: &str, source: &str) -> Result<naga::Module, ShaderError> {
    match parse_version(source) {
        Some(SHADER_VERSION) => {}
        found => {
            return Err(ShaderError::Version {
                name: name.to_string(),
                found,
            })
        }
    }

    let module = naga::front::wgsl::parse_str(source).map_err(|e| ShaderError::Parse {
        name: name.to_string(),
        message: e.emit_to_string(source),
    })?;

    naga::valid::Validator::new(
        naga::valid::ValidationFlags::all(),
        naga::valid::Capabilities::empty(),
    )
    .validate(&module)
    .map_err(|e| ShaderError::Validation {
        name: name.to_string(),
        message: e.emit_to_string(source),
    })?;

    Ok(module)
}

/// Validated WGSL sources for every pass.
pub struct ShaderLibrary {
    sources: HashMap<ShaderAsset, String>,
}

impl ShaderLibrary {
    /// The shaders compiled into the binary.
    pub fn embedded() -> Result<Self, ShaderError> {
        Self::load(None)
    }

    /// Resolve every asset, preferring `override_dir/<file>` when it exists.
    pub fn load(override_dir: Option<&Path>) -> Result<Self, ShaderError> {
        let mut sources = HashMap::new();
        for asset in ShaderAsset::ALL {
            let source = match override_dir.map(|dir| dir.join(asset.file_name())) {
                Some(path) if path.exists() => {
                    tracing::info!("Loading shader override {:?}", path);
                    std::fs::read_to_string(&path).map_err(|e| ShaderError::Io(path.clone(), e))?
                }
                _ => asset.embedded().to_string(),
            };
            validate_wgsl(asset.file_name(), &source)?;
            sources.insert(asset, source);
        }
        tracing::info!("Validated {} shaders (v{})", sources.len(), SHADER_VERSION);
        Ok(Self { sources })
    }

    pub fn source(&self, asset: ShaderAsset) -> &str {
        self.sources
            .get(&asset)
            .map(String::as_str)
            .unwrap_or_else(|| asset.embedded())
    }

    pub fn create_module(&self, device: &wgpu::Device, asset: ShaderAsset) -> wgpu::ShaderModule {
        device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(asset.file_name()),
            source: wgpu::ShaderSource::Wgsl(self.source(asset).into()),
        })
    }
}
