use std::collections::HashSet;

use crate::foundation::error::RenderResult;
use crate::optimize::{ListOptimizer, ListRunParams, TaskRole, touched_surfaces};
use crate::surface::SurfaceId;
use crate::task::Task;

/// Inserts a [`crate::task::TaskKind::SurfaceDestroy`] right after the last use of every
/// plan-owned surface and erases duplicate destroys. Externally owned surfaces are left alone.
#[derive(Clone, Copy, Debug, Default)]
pub struct OptimizerSurfaceDestroy;

impl ListOptimizer for OptimizerSurfaceDestroy {
    fn name(&self) -> &'static str {
        "surface_destroy"
    }

    fn run(&self, params: &mut ListRunParams<'_>) -> RenderResult<usize> {
        let graph = &mut *params.graph;
        let list = &mut *params.list;
        let mut destroyed = HashSet::<SurfaceId>::new();
        let mut changes = 0usize;

        // Walk backwards; everything at index > i has already been visited, so inserting at
        // i + 1 or removing at i never disturbs the remaining walk.
        let mut i = list.len();
        while i > 0 {
            i -= 1;
            let id = list[i];
            if !graph.valid_target(id) {
                continue;
            }
            let Some(target) = graph[id].target else {
                continue;
            };

            match TaskRole::of(&graph[id]) {
                TaskRole::Destroy => {
                    if !destroyed.insert(target) {
                        list.remove(i);
                        changes += 1;
                        tracing::trace!(?id, ?target, "erased duplicate surface destroy");
                    }
                }
                TaskRole::Create => {}
                TaskRole::Convert | TaskRole::Compute => {
                    for (_, surface) in touched_surfaces(graph, id) {
                        let Some(desc) = graph.surfaces.get(surface).copied() else {
                            continue;
                        };
                        if desc.is_created() || destroyed.contains(&surface) {
                            continue;
                        }
                        let destroy = graph.add(Task::surface_destroy(surface, &desc));
                        list.insert(i + 1, destroy);
                        destroyed.insert(surface);
                        changes += 1;
                        tracing::trace!(?id, ?surface, ?destroy, "inserted surface destroy");
                    }
                }
            }
        }
        Ok(changes)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/optimize/surface_destroy.rs"]
mod tests;
