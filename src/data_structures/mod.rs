//! Engine data structures: models, textures, scene graph, and instances.
//!
//! - `model` contains mesh and material definitions, GPU resources for 3D models
//! - `texture` contains the GPU texture wrapper and creation utilities
//! - `instance` holds per-object transformation data in GPU form
//! - `scene_graph` is the name-addressed hierarchical scene container

pub mod instance;
pub mod model;
pub mod scene_graph;
pub mod texture;
