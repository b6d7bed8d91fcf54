//! Coordinate mapping stages and their composition.

pub(crate) mod stack;
pub(crate) mod transformation;

pub use stack::{ChangeListener, InsertPolicy, TransformationRef, TransformationStack};
pub use transformation::{
    AffineTransformation, ClipTransformation, DepthTransformation, Transformation,
    TransformedPoint,
};
