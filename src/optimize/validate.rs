use std::collections::{HashMap, HashSet};

use crate::foundation::error::{RenderError, RenderResult};
use crate::optimize::TaskRole;
use crate::surface::SurfaceId;
use crate::task::{TaskGraph, TaskId, TaskList};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Lifecycle {
    Uncreated,
    Live,
    Dead,
}

/// Check that `list` is executable as-is.
///
/// Every task appears once and after its sub-tasks; every plan-owned surface is created exactly
/// once before its first use (by a create task or by the conversion writing it) and destroyed
/// exactly once after its last use; externally owned surfaces are never created or destroyed;
/// and no temporary surface is still alive at the end.
pub fn validate_plan(graph: &TaskGraph, list: &TaskList) -> RenderResult<()> {
    let mut seen = HashSet::<TaskId>::new();
    let mut state = HashMap::<SurfaceId, Lifecycle>::new();
    for (id, desc) in graph.surfaces.iter() {
        let initial = if desc.is_created() {
            Lifecycle::Live
        } else {
            Lifecycle::Uncreated
        };
        state.insert(id, initial);
    }

    for (pos, &id) in list.iter().enumerate() {
        let task = graph
            .get(id)
            .ok_or_else(|| RenderError::structural(format!("plan[{pos}]: unknown task {id:?}")))?;
        if let Some(arity) = task.kind.arity()
            && arity != task.sub_tasks.len()
        {
            return Err(RenderError::structural(format!(
                "plan[{pos}]: {} task {id:?} has {} sub-tasks, expected {arity}",
                task.kind.name(),
                task.sub_tasks.len()
            )));
        }
        for &sub in &task.sub_tasks {
            if !seen.contains(&sub) {
                return Err(RenderError::structural(format!(
                    "plan[{pos}]: task {id:?} runs before its sub-task {sub:?}"
                )));
            }
        }
        if !seen.insert(id) {
            return Err(RenderError::structural(format!(
                "plan[{pos}]: task {id:?} is listed twice"
            )));
        }

        if !graph.valid_target(id) {
            // Tasks without a usable target produce nothing; they are skipped by the executor.
            continue;
        }
        let Some(target) = task.target else {
            continue;
        };
        let role = TaskRole::of(task);

        for &sub in &task.sub_tasks {
            if !graph.valid_target(sub) {
                continue;
            }
            if let Some(surface) = graph.get(sub).and_then(|t| t.target) {
                expect_live(&state, surface, pos, id)?;
            }
        }

        let current = state.get(&target).copied().ok_or_else(|| {
            RenderError::structural(format!("plan[{pos}]: unknown surface {target:?}"))
        })?;
        let persistent = graph.surfaces.get(target).is_some_and(|d| d.is_created());
        let next = match (role, current) {
            (TaskRole::Create, Lifecycle::Uncreated) => Lifecycle::Live,
            (TaskRole::Create, _) => {
                return Err(RenderError::structural(format!(
                    "plan[{pos}]: surface {target:?} created twice"
                )));
            }
            (TaskRole::Destroy, _) if persistent => {
                return Err(RenderError::structural(format!(
                    "plan[{pos}]: externally owned surface {target:?} is destroyed"
                )));
            }
            (TaskRole::Destroy, Lifecycle::Live) => Lifecycle::Dead,
            (TaskRole::Destroy, Lifecycle::Uncreated) => {
                return Err(RenderError::structural(format!(
                    "plan[{pos}]: surface {target:?} destroyed before it was created"
                )));
            }
            (TaskRole::Destroy, Lifecycle::Dead) => {
                return Err(RenderError::structural(format!(
                    "plan[{pos}]: surface {target:?} destroyed twice"
                )));
            }
            (TaskRole::Convert, Lifecycle::Uncreated | Lifecycle::Live) => Lifecycle::Live,
            (TaskRole::Compute, Lifecycle::Live) => Lifecycle::Live,
            (TaskRole::Compute, Lifecycle::Uncreated) => {
                return Err(RenderError::structural(format!(
                    "plan[{pos}]: task {id:?} writes surface {target:?} before it was created"
                )));
            }
            (TaskRole::Convert | TaskRole::Compute, Lifecycle::Dead) => {
                return Err(RenderError::structural(format!(
                    "plan[{pos}]: task {id:?} writes surface {target:?} after it was destroyed"
                )));
            }
        };
        state.insert(target, next);
    }

    for (surface, desc) in graph.surfaces.iter() {
        if desc.is_temporary() && state.get(&surface) == Some(&Lifecycle::Live) {
            return Err(RenderError::structural(format!(
                "temporary surface {surface:?} is never destroyed"
            )));
        }
    }
    Ok(())
}

fn expect_live(
    state: &HashMap<SurfaceId, Lifecycle>,
    surface: SurfaceId,
    pos: usize,
    reader: TaskId,
) -> RenderResult<()> {
    match state.get(&surface) {
        Some(Lifecycle::Live) => Ok(()),
        Some(Lifecycle::Uncreated) => Err(RenderError::structural(format!(
            "plan[{pos}]: task {reader:?} reads surface {surface:?} before it was created"
        ))),
        Some(Lifecycle::Dead) => Err(RenderError::structural(format!(
            "plan[{pos}]: task {reader:?} reads surface {surface:?} after it was destroyed"
        ))),
        None => Err(RenderError::structural(format!(
            "plan[{pos}]: unknown surface {surface:?}"
        ))),
    }
}

#[cfg(test)]
#[path = "../../tests/unit/optimize/validate.rs"]
mod tests;
