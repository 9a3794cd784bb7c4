//! vitrine
//!
//! A single-scene interactive 3D viewer for native and WASM targets. The
//! crate ships two experiences built on a small shared core: a glTF model
//! showroom with a damped orbit camera, a fixed light rig and a parameter
//! panel binding layer, and a procedurally shaded cube driven by a custom
//! shader pair.
//!
//! High-level modules
//! - `app`: application shell, event loop, frame driver and the `Experience` trait
//! - `camera`: camera, projection, damped orbit controller and uniforms
//! - `context`: central GPU and window context that owns device/queue/pipelines
//! - `data_structures`: scene data models (meshes, materials, the named scene graph)
//! - `experiences`: the two shipped scenes (showroom, facet)
//! - `lights`: the fixed light rig and its GPU uniform
//! - `panel`: parameter panel binding layer consumed by a widget toolkit
//! - `pipelines`: render pipeline definitions and their WGSL sources
//! - `resources`: glTF decoding and asset/texture loading helpers
//!

pub mod app;
pub mod camera;
pub mod context;
pub mod data_structures;
pub mod experiences;
pub mod lights;
pub mod panel;
pub mod pipelines;
pub mod resources;

// Re-exports commonly used types for convenience in downstream code.
pub use cgmath::*;
pub use wgpu::*;
pub use winit::dpi::PhysicalPosition;
pub use winit::event::DeviceEvent;
pub use winit::event::WindowEvent;
