use std::fmt;

use crate::foundation::core::{Affine, Point, Rect};

/// Result of mapping a point through a [`Transformation`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TransformedPoint {
    /// Mapped position.
    pub p: Point,
    /// Accumulated depth.
    pub depth: f64,
    /// `false` once any stage hides the point.
    pub visible: bool,
}

impl TransformedPoint {
    /// Visible point at depth zero.
    pub fn new(p: Point) -> Self {
        Self {
            p,
            depth: 0.0,
            visible: true,
        }
    }
}

/// Pure mapping of a 2D point.
pub trait Transformation: fmt::Debug + Send + Sync {
    /// Map `p`, reporting the depth contribution and visibility of this stage.
    fn transform(&self, p: Point) -> TransformedPoint;
}

/// Affine mapping; contributes no depth and never hides points.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AffineTransformation(pub Affine);

impl Transformation for AffineTransformation {
    fn transform(&self, p: Point) -> TransformedPoint {
        TransformedPoint::new(self.0 * p)
    }
}

/// Identity mapping that adds a constant depth.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DepthTransformation(pub f64);

impl Transformation for DepthTransformation {
    fn transform(&self, p: Point) -> TransformedPoint {
        TransformedPoint {
            p,
            depth: self.0,
            visible: true,
        }
    }
}

/// Identity mapping that hides every point outside a rectangle.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ClipTransformation(pub Rect);

impl Transformation for ClipTransformation {
    fn transform(&self, p: Point) -> TransformedPoint {
        let r = self.0;
        TransformedPoint {
            p,
            depth: 0.0,
            visible: p.x >= r.x0 && p.x < r.x1 && p.y >= r.y0 && p.y < r.y1,
        }
    }
}
