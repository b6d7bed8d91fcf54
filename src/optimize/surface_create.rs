use std::collections::HashSet;

use crate::foundation::core::map_rect;
use crate::foundation::error::{RenderError, RenderResult};
use crate::optimize::{ListOptimizer, ListRunParams, TaskRole, touched_surfaces};
use crate::surface::SurfaceId;
use crate::task::Task;

/// Inserts a [`crate::task::TaskKind::SurfaceCreate`] right before the first use of every
/// plan-owned surface and erases duplicate creates.
#[derive(Clone, Copy, Debug, Default)]
pub struct OptimizerSurfaceCreate;

impl ListOptimizer for OptimizerSurfaceCreate {
    fn name(&self) -> &'static str {
        "surface_create"
    }

    fn run(&self, params: &mut ListRunParams<'_>) -> RenderResult<usize> {
        let graph = &mut *params.graph;
        let list = &mut *params.list;
        let mut created = HashSet::<SurfaceId>::new();
        let mut changes = 0usize;

        let mut i = 0usize;
        while i < list.len() {
            let id = list[i];
            if !graph.valid_target(id) {
                i += 1;
                continue;
            }
            let Some(target) = graph[id].target else {
                i += 1;
                continue;
            };

            match TaskRole::of(&graph[id]) {
                TaskRole::Create => {
                    if !created.insert(target) {
                        list.remove(i);
                        changes += 1;
                        tracing::trace!(?id, ?target, "erased duplicate surface create");
                        continue;
                    }
                }
                // a conversion allocates the surface it writes
                TaskRole::Convert => {
                    created.insert(target);
                }
                TaskRole::Destroy => {}
                TaskRole::Compute => {
                    for (user, surface) in touched_surfaces(graph, id) {
                        let Some(desc) = graph.surfaces.get(surface).copied() else {
                            continue;
                        };
                        if desc.is_created() || created.contains(&surface) {
                            continue;
                        }
                        let consumer = &graph[user];
                        let source_rect = map_rect(
                            desc.rect().to_rect(),
                            consumer.target_rect.to_rect(),
                            consumer.source_rect,
                        );
                        let create = graph.add(Task::surface_create(surface, &desc, source_rect));
                        if !graph.valid_target(create) {
                            return Err(RenderError::structural(format!(
                                "surface create for {surface:?} has an invalid target rectangle"
                            )));
                        }
                        list.insert(i, create);
                        i += 1;
                        created.insert(surface);
                        changes += 1;
                        tracing::trace!(?id, ?surface, ?create, "inserted surface create");
                    }
                }
            }
            i += 1;
        }
        Ok(changes)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/optimize/surface_create.rs"]
mod tests;
