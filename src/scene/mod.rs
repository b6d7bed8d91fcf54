//! JSON scene description and its compilation into a task graph.

pub(crate) mod builder;
pub(crate) mod model;

pub use builder::{BuiltScene, build_graph};
pub use model::{MAX_SURFACE_SIDE, Node, Scene, TransformDef};
