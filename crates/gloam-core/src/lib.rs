//! GPU-independent half of the gloam deferred renderer.
//!
//! Everything here is plain data and math: render-target extents, the light
//! model, the procedural light grid, CPU references of the shading and PCF
//! formulas the WGSL passes evaluate, the fixed frame schedule, and the YAML
//! configuration.

pub mod camera;
pub mod config;
pub mod extent;
pub mod frame;
pub mod light;
pub mod light_grid;
pub mod shading;
pub mod shadow;

pub use camera::Camera;
pub use config::{ConfigError, RenderConfig};
pub use extent::Extent;
pub use frame::{FrameError, FrameSchedule, PassKind, FRAME_ORDER};
pub use light::{DirectionalLight, PointLight};
pub use light_grid::{LightGrid, LightGridParams};
