//! Compile a [`Scene`] into a [`TaskGraph`].
//!
//! The root operation writes a persistent output surface covering the canvas; every other
//! operation writes a fresh temporary surface in the scene's working format. Surfaces are declared
//! in whatever format the scene asks for; the optimizer inserts conversions where a task cannot
//! handle that format.

use std::sync::Arc;

use crate::foundation::core::{Affine, Rect, RectInt, Vec2, VectorInt};
use crate::foundation::error::{RenderError, RenderResult};
use crate::render::get_extra_size;
use crate::render::pixels::premultiply;
use crate::scene::model::{MAX_SURFACE_SIDE, Node, Scene, TransformDef};
use crate::surface::{SurfaceDesc, SurfaceFormat, SurfaceId};
use crate::task::{Task, TaskGraph, TaskId, TaskKind};
use crate::transform::{
    AffineTransformation, ClipTransformation, DepthTransformation, TransformationRef,
    TransformationStack,
};

/// Task DAG of a scene and the surface holding the final pixels.
#[derive(Clone, Debug)]
pub struct BuiltScene {
    /// Unoptimized graph.
    pub graph: TaskGraph,
    /// Persistent output surface written by the root task.
    pub output: SurfaceId,
}

/// Build the task DAG of `scene`. The scene is validated first.
#[tracing::instrument(skip(scene), fields(width = scene.width, height = scene.height))]
pub fn build_graph(scene: &Scene) -> RenderResult<BuiltScene> {
    scene.validate()?;
    let mut b = Builder {
        graph: TaskGraph::new(),
        working: scene.working_format,
    };
    let output = b.graph.add_surface(SurfaceDesc::persistent(
        scene.output_format,
        scene.width,
        scene.height,
    ));
    let rect = RectInt::from_size(scene.width, scene.height);
    let root = b.node(&scene.root, output, rect, scene.view_rect())?;
    b.graph.set_root(root);
    tracing::debug!(tasks = b.graph.len(), surfaces = b.graph.surfaces.len(), "scene built");
    Ok(BuiltScene {
        graph: b.graph,
        output,
    })
}

struct Builder {
    graph: TaskGraph,
    working: SurfaceFormat,
}

impl Builder {
    /// Emit the task drawing `node` into `rect` of `target`, covering logical `source`.
    fn node(
        &mut self,
        node: &Node,
        target: SurfaceId,
        rect: RectInt,
        source: Rect,
    ) -> RenderResult<TaskId> {
        let task = match node {
            Node::Solid { color } => Task::new(TaskKind::Solid {
                color: premultiply(*color),
            }),
            Node::Blur {
                blur_type,
                size,
                child,
            } => {
                let px = pixel_size(rect, source);
                let size = Vec2::new(size[0], size[1]);
                let extra = get_extra_size(*blur_type, Vec2::new(size.x / px.x, size.y / px.y));
                let child_source = Rect::new(
                    source.x0 - f64::from(extra.x) * px.x,
                    source.y0 - f64::from(extra.y) * px.y,
                    source.x1 + f64::from(extra.x) * px.x,
                    source.y1 + f64::from(extra.y) * px.y,
                );
                let grown = |len: u32, margin: i32| f64::from(len) + 2.0 * f64::from(margin);
                let (cw, ch) = (
                    side(grown(rect.width(), extra.x), "blur child width")?,
                    side(grown(rect.height(), extra.y), "blur child height")?,
                );
                let sub = self.child(child, RectInt::from_size(cw, ch), child_source)?;
                let mut task = Task::new(TaskKind::Blur {
                    blur_type: *blur_type,
                    size,
                })
                .with_sub_tasks([sub]);
                // child pixel 0 sits `extra` pixels before the target rectangle
                task.offset = VectorInt::new(extra.x - rect.minx, extra.y - rect.miny);
                task
            }
            Node::ColorCorrect { correction, child } => {
                let sub = self.child(child, rect, source)?;
                Task::new(TaskKind::ColorCorrect(*correction)).with_sub_tasks([sub])
            }
            Node::Blend {
                method,
                amount,
                under,
                over,
            } => {
                let u = self.child(under, rect, source)?;
                let o = self.child(over, rect, source)?;
                Task::new(TaskKind::Blend {
                    method: *method,
                    amount: *amount,
                })
                .with_sub_tasks([u, o])
            }
            Node::Transform { transforms, child } => {
                let (stack, inverse) = stack_of(transforms);
                let px = pixel_size(rect, source);
                // child region: the target region pulled back, plus a pixel for filtering
                let bbox = inverse
                    .transform_rect_bbox(source)
                    .inflate(px.x, px.y);
                let (cw, ch) = (
                    side(bbox.width() / px.x, "transform child width")?,
                    side(bbox.height() / px.y, "transform child height")?,
                );
                let child_source = Rect::new(
                    bbox.x0,
                    bbox.y0,
                    bbox.x0 + f64::from(cw) * px.x,
                    bbox.y0 + f64::from(ch) * px.y,
                );
                let sub = self.child(child, RectInt::from_size(cw, ch), child_source)?;
                Task::new(TaskKind::Transformation { stack }).with_sub_tasks([sub])
            }
        };
        Ok(self.graph.add(task.with_target(target, rect, source)))
    }

    /// Emit `node` into a fresh temporary surface of `rect`'s size; the child's pixel grid starts
    /// at the origin.
    fn child(&mut self, node: &Node, rect: RectInt, source: Rect) -> RenderResult<TaskId> {
        let surface = self.graph.add_surface(SurfaceDesc::temporary(
            self.working,
            rect.width(),
            rect.height(),
        ));
        self.node(node, surface, RectInt::from_size(rect.width(), rect.height()), source)
    }
}

/// Logical units per pixel along each axis.
fn pixel_size(rect: RectInt, source: Rect) -> Vec2 {
    let per = |logical: f64, px: u32| {
        if px == 0 {
            1.0
        } else {
            (logical / f64::from(px)).abs().max(f64::EPSILON)
        }
    };
    Vec2::new(
        per(source.width(), rect.width()),
        per(source.height(), rect.height()),
    )
}

fn side(v: f64, what: &str) -> RenderResult<u32> {
    let n = v.ceil().max(1.0);
    if !n.is_finite() || n > f64::from(MAX_SURFACE_SIDE) {
        return Err(RenderError::validation(format!(
            "{what} of {v:.1} pixels exceeds {MAX_SURFACE_SIDE}"
        )));
    }
    Ok(n as u32)
}

/// Stack mapping target coordinates back to child coordinates, and the inverse of the combined
/// forward affine.
fn stack_of(transforms: &[TransformDef]) -> (TransformationStack, Affine) {
    let mut stack = TransformationStack::new();
    let mut forward = Affine::IDENTITY;
    for t in transforms.iter().rev() {
        let stage: TransformationRef = match *t {
            TransformDef::Depth { depth } => Arc::new(DepthTransformation(depth)),
            TransformDef::Clip { rect } => {
                Arc::new(ClipTransformation(Rect::new(rect[0], rect[1], rect[2], rect[3])))
            }
            _ => Arc::new(AffineTransformation(t.affine().inverse())),
        };
        stack.push(stage);
    }
    for t in transforms {
        forward = t.affine() * forward;
    }
    (stack, forward.inverse())
}

#[cfg(test)]
#[path = "../../tests/unit/scene/builder.rs"]
mod tests;
