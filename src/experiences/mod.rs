//! The two shipped experiences.
//!
//! - `showroom` loads and lights a glTF model with panel-tunable parameters
//! - `facet` renders a procedurally shaded cube through a custom shader pair

pub mod facet;
pub mod showroom;
