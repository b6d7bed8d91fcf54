//! rendertask compiles a vector scene into a graph of render tasks, optimizes the surface
//! lifecycle of that graph and executes it on a software backend.
//!
//! The flow is split into explicit stages:
//!
//! - Load and validate a [`Scene`]
//! - Build a [`TaskGraph`] with [`build_graph`]
//! - Optimize it into an execution list with [`OptimizerPipeline`]
//! - Execute the list on a [`TaskBackend`] such as [`SoftwareBackend`]
//!
//! [`render_scene`] runs all of them in one call.
#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod foundation;

/// Undoable scene edits.
pub mod action;
/// Discrete Fourier transforms.
pub mod fft;
/// Surface lifecycle optimizer passes.
pub mod optimize;
/// End-to-end planning and rendering.
pub mod pipeline;
/// Backend interface, executor and software backend.
pub mod render;
/// Scene model and graph builder.
pub mod scene;
/// Surface handles and capabilities.
pub mod surface;
/// Render tasks and the task graph.
pub mod task;
/// Coordinate transformation stacks.
pub mod transform;

pub use crate::foundation::core::{
    Affine, ColorF, Point, Rect, RectInt, Rgba8, Vec2, VectorInt, map_point, map_rect,
};
pub use crate::foundation::error::{RenderError, RenderResult};

pub use crate::action::{Action, ActionHistory, ActionRegistry, SetParam};
pub use crate::fft::{FftBackend, FourierTransform};
pub use crate::optimize::{OptimizeStats, OptimizedPlan, OptimizerOpts, OptimizerPipeline};
pub use crate::pipeline::{
    PlanSummary, PreparedPlan, RenderOpts, plan_scene, render_plan, render_scene,
};
pub use crate::render::{
    FrameRGBA, NoProgress, ProgressCallback, SoftwareBackend, SoftwareBackendOpts, TaskBackend,
};
pub use crate::scene::{Node, Scene, TransformDef, build_graph};
pub use crate::surface::{SurfaceDesc, SurfaceFormat, SurfaceId};
pub use crate::task::{Task, TaskGraph, TaskId, TaskKind};
pub use crate::transform::TransformationStack;
