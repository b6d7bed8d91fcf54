//! Scene to pixels in one place: planning, execution and plan summaries.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::foundation::core::RectInt;
use crate::foundation::error::{RenderError, RenderResult};
use crate::optimize::{OptimizeStats, OptimizedPlan, OptimizerOpts, OptimizerPipeline};
use crate::render::{
    FrameRGBA, ProgressCallback, SoftwareBackend, SoftwareBackendOpts, TaskBackend, execute_list,
};
use crate::scene::{BuiltScene, Scene, build_graph};
use crate::surface::{SurfaceDesc, SurfaceId};
use crate::task::{TaskGraph, TaskId};

/// End-to-end render configuration.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderOpts {
    /// Optimizer pipeline options.
    pub optimizer: OptimizerOpts,
    /// Software backend options.
    pub backend: SoftwareBackendOpts,
    /// Restrict rendering to `[x0, y0, x1, y1]` output pixels; the rest stays transparent.
    pub region: Option<[i32; 4]>,
}

impl RenderOpts {
    /// Parse options from a JSON reader; missing fields take their defaults.
    pub fn from_reader<R: std::io::Read>(r: R) -> RenderResult<Self> {
        serde_json::from_reader(r)
            .map_err(|e| RenderError::validation(format!("parse render options JSON: {e}")))
    }

    /// Parse options from a JSON file on disk.
    pub fn from_path(path: impl AsRef<Path>) -> RenderResult<Self> {
        let path = path.as_ref();
        let f = File::open(path).map_err(|e| {
            RenderError::validation(format!(
                "open render options JSON '{}': {e}",
                path.display()
            ))
        })?;
        Self::from_reader(BufReader::new(f))
    }
}

/// Optimized plan of a scene, ready to execute.
#[derive(Clone, Debug)]
pub struct PreparedPlan {
    /// Graph owning every listed task.
    pub graph: TaskGraph,
    /// Surface holding the final pixels.
    pub output: SurfaceId,
    /// Execution order and optimizer counters.
    pub plan: OptimizedPlan,
}

/// Build, restrict and optimize the task graph of `scene`.
#[tracing::instrument(skip(scene, opts), fields(width = scene.width, height = scene.height))]
pub fn plan_scene(scene: &Scene, opts: &RenderOpts) -> RenderResult<PreparedPlan> {
    let BuiltScene { mut graph, output } = build_graph(scene)?;

    if let Some([x0, y0, x1, y1]) = opts.region {
        let root = graph
            .root()
            .ok_or_else(|| RenderError::structural("scene graph has no root"))?;
        let part = graph.split(root, RectInt::new(x0, y0, x1, y1)).ok_or_else(|| {
            RenderError::validation(format!(
                "render region [{x0}, {y0}, {x1}, {y1}] does not overlap the canvas"
            ))
        })?;
        graph.set_root(part);
    }

    let plan = OptimizerPipeline::with_default_passes(opts.optimizer).run(&mut graph)?;
    Ok(PreparedPlan {
        graph,
        output,
        plan,
    })
}

/// Run a prepared plan on `backend` and read back the output surface.
#[tracing::instrument(skip_all, fields(backend = backend.name(), len = prepared.plan.list.len()))]
pub fn render_plan(
    backend: &mut dyn TaskBackend,
    prepared: &PreparedPlan,
    progress: &mut dyn ProgressCallback,
) -> RenderResult<FrameRGBA> {
    execute_list(backend, &prepared.graph, &prepared.plan.list, progress)?;
    backend.readback_rgba8(prepared.output)
}

/// Plan `scene` and render it on a fresh [`SoftwareBackend`].
///
/// Returns **premultiplied** RGBA8 pixels of the whole canvas.
pub fn render_scene(
    scene: &Scene,
    opts: &RenderOpts,
    progress: &mut dyn ProgressCallback,
) -> RenderResult<FrameRGBA> {
    let prepared = plan_scene(scene, opts)?;
    let mut backend = SoftwareBackend::new(opts.backend);
    let frame = render_plan(&mut backend, &prepared, progress)?;
    let pool = backend.pool_stats();
    tracing::debug!(
        alloc = pool.alloc_surfaces,
        reused = pool.reused_surfaces,
        "render finished"
    );
    Ok(frame)
}

/// One listed task in a [`PlanSummary`].
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PlanEntry {
    /// Task identity.
    pub id: TaskId,
    /// Kind name.
    pub kind: String,
    /// Written surface.
    pub target: Option<SurfaceId>,
    /// Written pixels.
    pub target_rect: RectInt,
    /// Dependencies.
    pub sub_tasks: Vec<TaskId>,
}

/// One surface referenced by a [`PlanSummary`].
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PlanSurface {
    /// Surface identity.
    pub id: SurfaceId,
    /// Declaration.
    #[serde(flatten)]
    pub desc: SurfaceDesc,
}

/// Serializable view of an optimized plan.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PlanSummary {
    /// Tasks in execution order.
    pub tasks: Vec<PlanEntry>,
    /// Surfaces written by listed tasks, in id order.
    pub surfaces: Vec<PlanSurface>,
    /// Output surface.
    pub output: SurfaceId,
    /// Optimizer counters.
    pub stats: OptimizeStats,
}

impl PlanSummary {
    /// Summarize `prepared`.
    pub fn new(prepared: &PreparedPlan) -> Self {
        let g = &prepared.graph;
        let tasks: Vec<PlanEntry> = prepared
            .plan
            .list
            .iter()
            .filter_map(|&id| {
                let t = g.get(id)?;
                Some(PlanEntry {
                    id,
                    kind: t.kind.name().to_string(),
                    target: t.target,
                    target_rect: t.target_rect,
                    sub_tasks: t.sub_tasks.to_vec(),
                })
            })
            .collect();

        let mut ids: Vec<SurfaceId> = tasks.iter().filter_map(|t| t.target).collect();
        ids.sort_unstable();
        ids.dedup();
        let surfaces = ids
            .into_iter()
            .filter_map(|id| {
                g.surfaces
                    .get(id)
                    .map(|&desc| PlanSurface { id, desc })
            })
            .collect();

        Self {
            tasks,
            surfaces,
            output: prepared.output,
            stats: prepared.plan.stats,
        }
    }
}
