//! wgpu implementation of the gloam deferred renderer, plus the thin
//! window host and demo scene that drive it.

pub mod attachment;
pub mod camera;
pub mod cli;
pub mod draw;
pub mod engine;
pub mod gpu;
pub mod input;
pub mod mesh;
pub mod passes;
pub mod renderer;
pub mod scene;
pub mod shader;
pub mod texture;
