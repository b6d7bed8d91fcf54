pub use kurbo::{Affine, Point, Rect, Vec2};

/// Integer pixel offset or size.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize,
)]
pub struct VectorInt {
    /// Horizontal component.
    pub x: i32,
    /// Vertical component.
    pub y: i32,
}

impl VectorInt {
    /// Build a vector from components.
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// Half-open integer pixel rectangle `[minx, maxx) x [miny, maxy)`.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize,
)]
pub struct RectInt {
    /// Inclusive left edge.
    pub minx: i32,
    /// Inclusive top edge.
    pub miny: i32,
    /// Exclusive right edge.
    pub maxx: i32,
    /// Exclusive bottom edge.
    pub maxy: i32,
}

impl RectInt {
    /// Build a rectangle from its edges.
    pub const fn new(minx: i32, miny: i32, maxx: i32, maxy: i32) -> Self {
        Self {
            minx,
            miny,
            maxx,
            maxy,
        }
    }

    /// Rectangle covering a whole `width x height` surface.
    pub fn from_size(width: u32, height: u32) -> Self {
        Self::new(
            0,
            0,
            i32::try_from(width).unwrap_or(i32::MAX),
            i32::try_from(height).unwrap_or(i32::MAX),
        )
    }

    /// `true` when the rectangle covers at least one pixel.
    pub fn is_valid(self) -> bool {
        self.minx < self.maxx && self.miny < self.maxy
    }

    /// Width in pixels; zero for degenerate rectangles.
    pub fn width(self) -> u32 {
        u32::try_from(self.maxx.saturating_sub(self.minx)).unwrap_or(0)
    }

    /// Height in pixels; zero for degenerate rectangles.
    pub fn height(self) -> u32 {
        u32::try_from(self.maxy.saturating_sub(self.miny)).unwrap_or(0)
    }

    /// Top-left corner.
    pub fn min(self) -> VectorInt {
        VectorInt::new(self.minx, self.miny)
    }

    /// Intersection; may be degenerate.
    pub fn intersect(self, other: Self) -> Self {
        Self::new(
            self.minx.max(other.minx),
            self.miny.max(other.miny),
            self.maxx.min(other.maxx),
            self.maxy.min(other.maxy),
        )
    }

    /// `true` when `other` lies entirely inside `self`.
    pub fn contains_rect(self, other: Self) -> bool {
        other.minx >= self.minx
            && other.miny >= self.miny
            && other.maxx <= self.maxx
            && other.maxy <= self.maxy
    }

    /// Translate by `v`. Edges saturate at the `i32` range.
    pub fn offset(self, v: VectorInt) -> Self {
        Self::new(
            self.minx.saturating_add(v.x),
            self.miny.saturating_add(v.y),
            self.maxx.saturating_add(v.x),
            self.maxy.saturating_add(v.y),
        )
    }

    /// Grow by `v` on every side. Edges saturate at the `i32` range.
    pub fn expand(self, v: VectorInt) -> Self {
        Self::new(
            self.minx.saturating_sub(v.x),
            self.miny.saturating_sub(v.y),
            self.maxx.saturating_add(v.x),
            self.maxy.saturating_add(v.y),
        )
    }

    /// Same rectangle in floating point coordinates.
    pub fn to_rect(self) -> Rect {
        Rect::new(
            f64::from(self.minx),
            f64::from(self.miny),
            f64::from(self.maxx),
            f64::from(self.maxy),
        )
    }
}

/// Premultiplied floating point RGBA color.
pub type ColorF = [f32; 4];

/// Premultiplied RGBA8 color.
pub type Rgba8 = [u8; 4];

/// Map a rectangle expressed in `from` space into `to` space, where `from` and `to` describe the
/// same region. Used to extrapolate logical source rectangles from pixel rectangles.
pub fn map_rect(rect: Rect, from: Rect, to: Rect) -> Rect {
    let kx = if from.width().abs() > f64::EPSILON {
        to.width() / from.width()
    } else {
        0.0
    };
    let ky = if from.height().abs() > f64::EPSILON {
        to.height() / from.height()
    } else {
        0.0
    };
    Rect::new(
        to.x0 + (rect.x0 - from.x0) * kx,
        to.y0 + (rect.y0 - from.y0) * ky,
        to.x0 + (rect.x1 - from.x0) * kx,
        to.y0 + (rect.y1 - from.y0) * ky,
    )
}

/// Map a single point between two rectangles describing the same region.
pub fn map_point(p: Point, from: Rect, to: Rect) -> Point {
    let r = map_rect(Rect::new(p.x, p.y, p.x, p.y), from, to);
    Point::new(r.x0, r.y0)
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/core.rs"]
mod tests;
