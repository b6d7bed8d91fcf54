use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::foundation::core::{Affine, Point, Rect};
use crate::foundation::error::{RenderError, RenderResult};
use crate::surface::SurfaceFormat;
use crate::task::{BlendMethod, BlurType, ColorCorrection};

/// Largest accepted surface side in pixels.
pub const MAX_SURFACE_SIDE: u32 = 16_384;

fn default_output_format() -> SurfaceFormat {
    SurfaceFormat::Packed
}

fn default_working_format() -> SurfaceFormat {
    SurfaceFormat::Flat
}

fn default_amount() -> f32 {
    1.0
}

/// JSON-facing description of one frame: canvas, logical view and a tree of drawing operations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scene {
    /// Output width in pixels.
    pub width: u32,
    /// Output height in pixels.
    pub height: u32,
    /// Logical region `[x0, y0, x1, y1]` mapped onto the canvas; defaults to the pixel grid.
    #[serde(default)]
    pub view: Option<[f64; 4]>,
    /// Representation of the final output surface.
    #[serde(default = "default_output_format")]
    pub output_format: SurfaceFormat,
    /// Representation of intermediate surfaces.
    #[serde(default = "default_working_format")]
    pub working_format: SurfaceFormat,
    /// Root operation.
    pub root: Node,
}

/// One drawing operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Node {
    /// Fill with a straight-alpha RGBA color.
    Solid {
        /// `[r, g, b, a]`, straight alpha.
        color: [f32; 4],
    },
    /// Blur the child.
    Blur {
        /// Kernel family.
        #[serde(default)]
        blur_type: BlurType,
        /// Kernel size in logical units per axis.
        size: [f64; 2],
        /// Blurred operation.
        child: Box<Node>,
    },
    /// Color-correct the child.
    ColorCorrect {
        /// Correction parameters.
        #[serde(default)]
        correction: ColorCorrection,
        /// Corrected operation.
        child: Box<Node>,
    },
    /// Blend `over` onto `under`.
    Blend {
        /// Operator.
        #[serde(default)]
        method: BlendMethod,
        /// Weight of `over` in `[0, 1]`.
        #[serde(default = "default_amount")]
        amount: f32,
        /// Destination operand.
        under: Box<Node>,
        /// Source operand.
        over: Box<Node>,
    },
    /// Place the child through a chain of transformations.
    Transform {
        /// Applied to the child's coordinates in order.
        transforms: Vec<TransformDef>,
        /// Transformed operation.
        child: Box<Node>,
    },
}

/// One stage of a [`Node::Transform`], expressed as a forward mapping of child coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum TransformDef {
    /// Move by `(x, y)`.
    Translate {
        /// Horizontal offset.
        x: f64,
        /// Vertical offset.
        y: f64,
    },
    /// Scale about the origin.
    Scale {
        /// Horizontal factor.
        x: f64,
        /// Vertical factor.
        y: f64,
    },
    /// Rotate counter-clockwise about `center`.
    Rotate {
        /// Angle in degrees.
        degrees: f64,
        /// Pivot.
        #[serde(default)]
        center: [f64; 2],
    },
    /// Arbitrary affine map, kurbo coefficient order.
    Affine {
        /// `[a, b, c, d, e, f]`.
        coeffs: [f64; 6],
    },
    /// Push the child back by a constant depth.
    Depth {
        /// Depth contribution.
        depth: f64,
    },
    /// Hide everything outside `[x0, y0, x1, y1]`.
    Clip {
        /// Visible region.
        rect: [f64; 4],
    },
}

impl TransformDef {
    /// Forward affine part of the stage; depth and clip stages are identities.
    pub fn affine(&self) -> Affine {
        match *self {
            Self::Translate { x, y } => Affine::translate((x, y)),
            Self::Scale { x, y } => Affine::scale_non_uniform(x, y),
            Self::Rotate { degrees, center } => {
                Affine::rotate_about(degrees.to_radians(), Point::new(center[0], center[1]))
            }
            Self::Affine { coeffs } => Affine::new(coeffs),
            Self::Depth { .. } | Self::Clip { .. } => Affine::IDENTITY,
        }
    }
}

impl Scene {
    /// Parse a scene from a JSON reader.
    pub fn from_reader<R: std::io::Read>(r: R) -> RenderResult<Self> {
        serde_json::from_reader(r)
            .map_err(|e| RenderError::validation(format!("parse scene JSON: {e}")))
    }

    /// Parse a scene from a JSON file on disk.
    pub fn from_path(path: impl AsRef<Path>) -> RenderResult<Self> {
        let path = path.as_ref();
        let f = File::open(path).map_err(|e| {
            RenderError::validation(format!("open scene JSON '{}': {e}", path.display()))
        })?;
        Self::from_reader(BufReader::new(f))
    }

    /// Logical region mapped onto the canvas.
    pub fn view_rect(&self) -> Rect {
        match self.view {
            Some([x0, y0, x1, y1]) => Rect::new(x0, y0, x1, y1),
            None => Rect::new(0.0, 0.0, f64::from(self.width), f64::from(self.height)),
        }
    }

    /// Check sizes, numeric ranges and transform invertibility.
    pub fn validate(&self) -> RenderResult<()> {
        if self.width == 0 || self.height == 0 {
            return Err(RenderError::validation("scene width and height must be > 0"));
        }
        if self.width > MAX_SURFACE_SIDE || self.height > MAX_SURFACE_SIDE {
            return Err(RenderError::validation(format!(
                "scene size {}x{} exceeds {MAX_SURFACE_SIDE} pixels per side",
                self.width, self.height
            )));
        }
        let view = self.view_rect();
        if !finite(&[view.x0, view.y0, view.x1, view.y1])
            || view.width() <= 0.0
            || view.height() <= 0.0
        {
            return Err(RenderError::validation(format!(
                "scene view {view:?} must be finite with positive extent"
            )));
        }
        validate_node(&self.root, "root")
    }
}

fn finite(v: &[f64]) -> bool {
    v.iter().all(|x| x.is_finite())
}

fn validate_node(node: &Node, path: &str) -> RenderResult<()> {
    match node {
        Node::Solid { color } => {
            if color.iter().any(|c| !c.is_finite()) || !(0.0..=1.0).contains(&color[3]) {
                return Err(RenderError::validation(format!(
                    "{path}: solid color must be finite with alpha in [0, 1]"
                )));
            }
            Ok(())
        }
        Node::Blur { size, child, .. } => {
            if !finite(size) {
                return Err(RenderError::validation(format!(
                    "{path}: blur size must be finite"
                )));
            }
            validate_node(child, &format!("{path}.child"))
        }
        Node::ColorCorrect { correction, child } => {
            let c = correction;
            if ![c.gamma, c.brightness, c.contrast, c.exposure]
                .iter()
                .all(|v| v.is_finite())
                || c.gamma <= 0.0
            {
                return Err(RenderError::validation(format!(
                    "{path}: color correction must be finite with gamma > 0"
                )));
            }
            validate_node(child, &format!("{path}.child"))
        }
        Node::Blend {
            amount,
            under,
            over,
            ..
        } => {
            if !(0.0..=1.0).contains(amount) {
                return Err(RenderError::validation(format!(
                    "{path}: blend amount must be in [0, 1], got {amount}"
                )));
            }
            validate_node(under, &format!("{path}.under"))?;
            validate_node(over, &format!("{path}.over"))
        }
        Node::Transform { transforms, child } => {
            for (i, t) in transforms.iter().enumerate() {
                validate_transform(t, &format!("{path}.transforms[{i}]"))?;
            }
            validate_node(child, &format!("{path}.child"))
        }
    }
}

fn validate_transform(t: &TransformDef, path: &str) -> RenderResult<()> {
    let ok = match t {
        TransformDef::Clip { rect } => finite(rect) && rect[2] >= rect[0] && rect[3] >= rect[1],
        TransformDef::Depth { depth } => depth.is_finite(),
        _ => {
            let a = t.affine();
            finite(&a.as_coeffs()) && a.determinant().abs() > f64::EPSILON
        }
    };
    if ok {
        Ok(())
    } else {
        Err(RenderError::validation(format!(
            "{path}: {t:?} is not a finite, invertible transformation"
        )))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/scene/model.rs"]
mod tests;
