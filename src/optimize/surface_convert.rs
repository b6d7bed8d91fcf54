use crate::foundation::error::{RenderError, RenderResult};
use crate::optimize::{TaskOptimizer, TaskRunParams};
use crate::surface::SurfaceCapability;
use crate::task::{Edge, Task, TaskGraph, TaskId};

/// Keeps every producer → consumer edge on a surface representation both sides support.
///
/// Conversion wrappers are inserted when the producer cannot write its target, or when the
/// consumer cannot read the producer's target. Wrappers that turn out to be unnecessary are
/// removed again, so repeated application settles instead of stacking wrappers.
#[derive(Clone, Copy, Debug, Default)]
pub struct OptimizerSurfaceConvert;

impl TaskOptimizer for OptimizerSurfaceConvert {
    fn name(&self) -> &'static str {
        "surface_convert"
    }

    fn run(&self, params: &mut TaskRunParams<'_>) -> RenderResult<bool> {
        let graph = &mut *params.graph;
        let edge = params.edge;
        let Some(id) = graph.edge_task(edge) else {
            return Ok(false);
        };
        if !graph.valid_target(id) {
            return Ok(false);
        }
        let parent_caps = edge.parent().and_then(|p| graph[p].capability());

        if graph[id].is_surface_convert() {
            return elide_wrapper(graph, edge, id, parent_caps);
        }

        let task = &graph[id];
        let (Some(target), Some(desc)) = (task.target, graph.target_desc(id).copied()) else {
            return Ok(false);
        };
        let (target_rect, source_rect) = (task.target_rect, task.source_rect);

        if let Some(caps) = task.capability()
            && !caps.is_supported_target(&desc)
        {
            let temp = caps
                .create_supported_target(desc.width, desc.height)
                .ok_or_else(|| {
                    RenderError::capability(format!(
                        "task {id:?} ({}) cannot write any surface representation",
                        task.kind.name()
                    ))
                })?;
            let temp = graph.add_surface(temp);
            let wrapper = graph.add(Task::surface_convert(target, target_rect, source_rect, id));
            graph[id].target = Some(temp);
            graph.set_edge_task(edge, wrapper)?;
            tracing::trace!(?id, ?wrapper, "wrapped task writing an unsupported target");
            return Ok(true);
        }

        if let Some(caps) = parent_caps
            && !caps.is_supported_source(&desc)
        {
            let temp = caps
                .create_supported_source(desc.width, desc.height)
                .ok_or_else(|| {
                    RenderError::capability(format!(
                        "consumer of task {id:?} cannot read any surface representation"
                    ))
                })?;
            let temp = graph.add_surface(temp);
            let wrapper = graph.add(Task::surface_convert(temp, target_rect, source_rect, id));
            graph.set_edge_task(edge, wrapper)?;
            tracing::trace!(?id, ?wrapper, "wrapped task read by an incompatible consumer");
            return Ok(true);
        }

        Ok(false)
    }
}

/// Replace a conversion wrapper at `edge` by its sub-task when the conversion is not needed.
fn elide_wrapper(
    graph: &mut TaskGraph,
    edge: Edge,
    wrapper: TaskId,
    parent_caps: Option<&'static dyn SurfaceCapability>,
) -> RenderResult<bool> {
    let Some(&sub) = graph[wrapper].sub_tasks.first() else {
        return Ok(false);
    };
    if !graph.valid_target(sub) || graph[sub].target_rect != graph[wrapper].target_rect {
        return Ok(false);
    }
    let (Some(sub_desc), Some(wrapper_desc)) = (
        graph.target_desc(sub).copied(),
        graph.target_desc(wrapper).copied(),
    ) else {
        return Ok(false);
    };
    if (sub_desc.width, sub_desc.height) != (wrapper_desc.width, wrapper_desc.height) {
        return Ok(false);
    }

    // The root wrapper writes the render output; the consumer side does not exist.
    let parent_reads_sub = match edge {
        Edge::Root => false,
        Edge::Sub { .. } => parent_caps.is_none_or(|c| c.is_supported_source(&sub_desc)),
    };
    if parent_reads_sub {
        graph.set_edge_task(edge, sub)?;
        tracing::trace!(?wrapper, ?sub, "removed wrapper: consumer reads the source directly");
        return Ok(true);
    }

    let sub_writes_target = graph[sub]
        .capability()
        .is_some_and(|c| c.is_supported_target(&wrapper_desc));
    if sub_writes_target {
        graph[sub].target = graph[wrapper].target;
        graph.set_edge_task(edge, sub)?;
        tracing::trace!(?wrapper, ?sub, "removed wrapper: source writes the target directly");
        return Ok(true);
    }

    Ok(false)
}

#[cfg(test)]
#[path = "../../tests/unit/optimize/surface_convert.rs"]
mod tests;
