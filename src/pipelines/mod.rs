//! Render pipeline definitions.
//!
//! - `basic` is the opaque textured/lit pipeline for loaded models
//! - `transparent` is the alpha-blended variant used by the backdrop plane
//! - `facet` is the custom shader-pair pipeline for the procedurally shaded cube

pub mod basic;
pub mod facet;
pub mod transparent;
