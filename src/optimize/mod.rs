//! Optimizer passes and the pipeline that runs them to a fixed point.
//!
//! Two kinds of rewrite rules exist:
//!
//! - [`TaskOptimizer`]s look at one DAG edge (a task and the consumer reading it) and may
//!   replace the task at that edge, insert wrappers, or retarget tasks.
//! - [`ListOptimizer`]s walk the linearized [`TaskList`] and insert or erase structural tasks.
//!
//! [`OptimizerPipeline::run`] drives both phases with explicit worklists instead of recursion:
//! a rewritten edge is queued again until no pass fires on it, and whole sweeps repeat until a
//! sweep changes nothing.

pub(crate) mod surface_convert;
pub(crate) mod surface_create;
pub(crate) mod surface_destroy;
pub(crate) mod validate;

use std::collections::{HashSet, VecDeque};
use std::fmt;

use crate::foundation::error::{RenderError, RenderResult};
use crate::surface::SurfaceId;
use crate::task::{Edge, Task, TaskGraph, TaskId, TaskKind, TaskList};

pub use surface_convert::OptimizerSurfaceConvert;
pub use surface_create::OptimizerSurfaceCreate;
pub use surface_destroy::OptimizerSurfaceDestroy;
pub use validate::validate_plan;

/// Input of a [`TaskOptimizer`]: the graph and the edge under inspection.
#[derive(Debug)]
pub struct TaskRunParams<'a> {
    /// Graph being rewritten.
    pub graph: &'a mut TaskGraph,
    /// Edge under inspection; its parent (if any) is the consumer of the task.
    pub edge: Edge,
}

/// Input of a [`ListOptimizer`].
#[derive(Debug)]
pub struct ListRunParams<'a> {
    /// Graph owning the listed tasks.
    pub graph: &'a mut TaskGraph,
    /// List being rewritten in place.
    pub list: &'a mut TaskList,
}

/// Rewrite rule over a single DAG edge.
pub trait TaskOptimizer: fmt::Debug + Send + Sync {
    /// Name used in logs.
    fn name(&self) -> &'static str;

    /// Inspect `params.edge`; return `true` if anything was rewritten.
    fn run(&self, params: &mut TaskRunParams<'_>) -> RenderResult<bool>;
}

/// Rewrite rule over a linearized list.
pub trait ListOptimizer: fmt::Debug + Send + Sync {
    /// Name used in logs.
    fn name(&self) -> &'static str;

    /// Rewrite the list; return the number of inserted or erased tasks.
    fn run(&self, params: &mut ListRunParams<'_>) -> RenderResult<usize>;
}

/// Pipeline options.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct OptimizerOpts {
    /// Upper bound on edge visits and list rounds before giving up.
    pub max_iterations: usize,
    /// Check the final list with [`validate_plan`].
    pub validate: bool,
}

impl Default for OptimizerOpts {
    fn default() -> Self {
        Self {
            max_iterations: 100_000,
            validate: true,
        }
    }
}

/// Counters collected while optimizing.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize)]
pub struct OptimizeStats {
    /// Edge rewrites performed by task optimizers.
    pub task_rewrites: usize,
    /// Full DAG sweeps, including the final unchanged one.
    pub sweeps: usize,
    /// Tasks inserted or erased by list optimizers.
    pub list_rewrites: usize,
    /// List rounds, including the final unchanged one.
    pub list_rounds: usize,
}

/// Final execution plan.
#[derive(Clone, Debug)]
pub struct OptimizedPlan {
    /// Tasks in execution order.
    pub list: TaskList,
    /// Optimizer counters.
    pub stats: OptimizeStats,
}

/// Ordered set of registered optimizers.
#[derive(Debug)]
pub struct OptimizerPipeline {
    opts: OptimizerOpts,
    task_passes: Vec<Box<dyn TaskOptimizer>>,
    list_passes: Vec<Box<dyn ListOptimizer>>,
}

impl Default for OptimizerPipeline {
    fn default() -> Self {
        Self::with_default_passes(OptimizerOpts::default())
    }
}

impl OptimizerPipeline {
    /// Pipeline without passes.
    pub fn new(opts: OptimizerOpts) -> Self {
        Self {
            opts,
            task_passes: Vec::new(),
            list_passes: Vec::new(),
        }
    }

    /// Pipeline with the surface conversion, creation and destruction passes.
    pub fn with_default_passes(opts: OptimizerOpts) -> Self {
        Self::new(opts)
            .with_task_pass(Box::new(OptimizerSurfaceConvert))
            .with_list_pass(Box::new(OptimizerSurfaceCreate))
            .with_list_pass(Box::new(OptimizerSurfaceDestroy))
    }

    /// Register a task-scoped pass.
    pub fn with_task_pass(mut self, pass: Box<dyn TaskOptimizer>) -> Self {
        self.task_passes.push(pass);
        self
    }

    /// Register a list-scoped pass.
    pub fn with_list_pass(mut self, pass: Box<dyn ListOptimizer>) -> Self {
        self.list_passes.push(pass);
        self
    }

    /// Options in effect.
    pub fn opts(&self) -> OptimizerOpts {
        self.opts
    }

    /// Optimize the DAG, linearize it and optimize the list.
    #[tracing::instrument(skip(self, graph), fields(tasks = graph.len()))]
    pub fn run(&self, graph: &mut TaskGraph) -> RenderResult<OptimizedPlan> {
        let mut stats = OptimizeStats::default();
        self.optimize_graph(graph, &mut stats)?;
        let mut list = graph.linearize()?;
        self.optimize_list(graph, &mut list, &mut stats)?;
        if self.opts.validate {
            validate_plan(graph, &list)?;
        }
        tracing::debug!(len = list.len(), ?stats, "optimized plan");
        Ok(OptimizedPlan { list, stats })
    }

    /// Apply the task passes until a whole sweep of the DAG changes nothing.
    pub fn optimize_graph(
        &self,
        graph: &mut TaskGraph,
        stats: &mut OptimizeStats,
    ) -> RenderResult<()> {
        let mut budget = self.opts.max_iterations;
        loop {
            stats.sweeps += 1;
            let rewrites = self.sweep(graph, &mut budget)?;
            stats.task_rewrites += rewrites;
            if rewrites == 0 {
                return Ok(());
            }
        }
    }

    fn sweep(&self, graph: &mut TaskGraph, budget: &mut usize) -> RenderResult<usize> {
        let mut pending = VecDeque::from([Edge::Root]);
        let mut expanded = HashSet::<TaskId>::new();
        let mut rewrites = 0usize;

        while let Some(edge) = pending.pop_front() {
            *budget = budget.checked_sub(1).ok_or_else(|| {
                RenderError::structural(format!(
                    "task optimizers did not reach a fixed point within {} steps",
                    self.opts.max_iterations
                ))
            })?;

            let Some(task) = graph.edge_task(edge) else {
                continue;
            };
            if graph.get(task).is_none() {
                return Err(RenderError::structural(format!(
                    "{edge:?} points at missing task {task:?}"
                )));
            }

            let mut fired = None;
            for pass in &self.task_passes {
                let mut params = TaskRunParams {
                    graph: &mut *graph,
                    edge,
                };
                if pass.run(&mut params)? {
                    fired = Some(pass.name());
                    break;
                }
            }

            if let Some(name) = fired {
                rewrites += 1;
                tracing::debug!(optimizer = name, ?edge, ?task, "task optimizer applied");
                pending.push_front(edge);
                continue;
            }

            if expanded.insert(task) {
                let subs = graph.get(task).map_or(0, |t| t.sub_tasks.len());
                pending.extend((0..subs).map(|slot| Edge::Sub { parent: task, slot }));
            }
        }
        Ok(rewrites)
    }

    /// Apply the list passes in registration order until a round changes nothing.
    pub fn optimize_list(
        &self,
        graph: &mut TaskGraph,
        list: &mut TaskList,
        stats: &mut OptimizeStats,
    ) -> RenderResult<()> {
        for _ in 0..self.opts.max_iterations {
            stats.list_rounds += 1;
            let mut changes = 0usize;
            for pass in &self.list_passes {
                let mut params = ListRunParams {
                    graph: &mut *graph,
                    list: &mut *list,
                };
                let n = pass.run(&mut params)?;
                if n > 0 {
                    tracing::debug!(optimizer = pass.name(), changes = n, "list optimizer applied");
                }
                changes += n;
            }
            stats.list_rewrites += changes;
            if changes == 0 {
                return Ok(());
            }
        }
        Err(RenderError::structural(format!(
            "list optimizers did not reach a fixed point within {} rounds",
            self.opts.max_iterations
        )))
    }
}

/// How lifecycle passes treat a task.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum TaskRole {
    Create,
    Destroy,
    Convert,
    Compute,
}

impl TaskRole {
    pub(crate) fn of(task: &Task) -> Self {
        match task.kind {
            TaskKind::SurfaceCreate => Self::Create,
            TaskKind::SurfaceDestroy => Self::Destroy,
            TaskKind::SurfaceConvert => Self::Convert,
            _ => Self::Compute,
        }
    }
}

/// Surfaces a compute task touches: sub-task targets in slot order, then its own target.
pub(crate) fn touched_surfaces(graph: &TaskGraph, id: TaskId) -> Vec<(TaskId, SurfaceId)> {
    let Some(task) = graph.get(id) else {
        return Vec::new();
    };
    task.sub_tasks
        .iter()
        .copied()
        .chain(std::iter::once(id))
        .filter(|&t| graph.valid_target(t))
        .filter_map(|t| graph.get(t).and_then(|x| x.target).map(|s| (t, s)))
        .collect()
}

#[cfg(test)]
#[path = "../../tests/unit/optimize/pipeline.rs"]
mod tests;
