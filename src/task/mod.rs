//! Render tasks and the arena-backed task DAG.
//!
//! A [`TaskGraph`] owns every [`Task`] and the [`SurfaceTable`] they reference. Tasks point at
//! their dependencies by [`TaskId`], so a task read by several consumers is stored once. After
//! optimization the DAG is flattened into a [`TaskList`] whose order is the execution order.

pub(crate) mod kind;

use std::collections::HashSet;
use std::ops::{Index, IndexMut};

use smallvec::SmallVec;

use crate::foundation::core::{Rect, RectInt, VectorInt, map_rect};
use crate::foundation::error::{RenderError, RenderResult};
use crate::surface::{SurfaceCapability, SurfaceDesc, SurfaceId, SurfaceTable};

pub use kind::{BlendMethod, BlurType, ColorCorrection, TaskKind};

/// Identity of a task inside a [`TaskGraph`].
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
pub struct TaskId(
    /// Raw index in the graph's task arena.
    pub u32,
);

/// Linearized execution plan.
pub type TaskList = Vec<TaskId>;

/// One node of the render plan.
#[derive(Clone, Debug)]
pub struct Task {
    /// Operation.
    pub kind: TaskKind,
    /// Surface written by the task.
    pub target: Option<SurfaceId>,
    /// Pixels written, in target surface coordinates.
    pub target_rect: RectInt,
    /// Logical region mapped onto `target_rect`.
    pub source_rect: Rect,
    /// Pixel offset applied when reading sub-task surfaces.
    pub offset: VectorInt,
    /// Dependencies in evaluation order.
    pub sub_tasks: SmallVec<[TaskId; 2]>,
}

impl Task {
    /// Task without target or dependencies.
    pub fn new(kind: TaskKind) -> Self {
        Self {
            kind,
            target: None,
            target_rect: RectInt::default(),
            source_rect: Rect::ZERO,
            offset: VectorInt::default(),
            sub_tasks: SmallVec::new(),
        }
    }

    /// Set target surface and the pixel/logical rectangles.
    pub fn with_target(mut self, target: SurfaceId, target_rect: RectInt, source_rect: Rect) -> Self {
        self.target = Some(target);
        self.target_rect = target_rect;
        self.source_rect = source_rect;
        self
    }

    /// Set dependencies.
    pub fn with_sub_tasks(mut self, subs: impl IntoIterator<Item = TaskId>) -> Self {
        self.sub_tasks = subs.into_iter().collect();
        self
    }

    /// Task binding backing memory to `surface`.
    pub fn surface_create(surface: SurfaceId, desc: &SurfaceDesc, source_rect: Rect) -> Self {
        Self::new(TaskKind::SurfaceCreate).with_target(surface, desc.rect(), source_rect)
    }

    /// Task releasing the backing memory of `surface`.
    pub fn surface_destroy(surface: SurfaceId, desc: &SurfaceDesc) -> Self {
        let rect = desc.rect();
        Self::new(TaskKind::SurfaceDestroy).with_target(surface, rect, rect.to_rect())
    }

    /// Conversion wrapper writing `target` from the surface of `sub`.
    pub fn surface_convert(
        target: SurfaceId,
        target_rect: RectInt,
        source_rect: Rect,
        sub: TaskId,
    ) -> Self {
        Self::new(TaskKind::SurfaceConvert)
            .with_target(target, target_rect, source_rect)
            .with_sub_tasks([sub])
    }

    /// Optional capability interface; `None` means any representation is accepted.
    pub fn capability(&self) -> Option<&'static dyn SurfaceCapability> {
        self.kind.capability()
    }

    /// Pixels written by the task.
    pub fn get_target_rect(&self) -> RectInt {
        self.target_rect
    }

    /// `true` for [`TaskKind::SurfaceCreate`].
    pub fn is_surface_create(&self) -> bool {
        matches!(self.kind, TaskKind::SurfaceCreate)
    }

    /// `true` for [`TaskKind::SurfaceDestroy`].
    pub fn is_surface_destroy(&self) -> bool {
        matches!(self.kind, TaskKind::SurfaceDestroy)
    }

    /// `true` for [`TaskKind::SurfaceConvert`].
    pub fn is_surface_convert(&self) -> bool {
        matches!(self.kind, TaskKind::SurfaceConvert)
    }
}

/// Position of a task in the DAG: the root slot, or slot `slot` of `parent`'s sub-tasks.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Edge {
    /// The graph root.
    Root,
    /// A dependency slot.
    Sub {
        /// Consumer.
        parent: TaskId,
        /// Index into the consumer's sub-tasks.
        slot: usize,
    },
}

impl Edge {
    /// Consumer of the edge, if any.
    pub fn parent(self) -> Option<TaskId> {
        match self {
            Self::Root => None,
            Self::Sub { parent, .. } => Some(parent),
        }
    }
}

/// Arena of tasks and surfaces forming a DAG rooted at the final output task.
#[derive(Clone, Debug, Default)]
pub struct TaskGraph {
    tasks: Vec<Task>,
    /// Surfaces referenced by the tasks.
    pub surfaces: SurfaceTable,
    root: Option<TaskId>,
}

impl TaskGraph {
    /// Empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a task and return its identity.
    pub fn add(&mut self, task: Task) -> TaskId {
        let id = TaskId(self.tasks.len() as u32);
        self.tasks.push(task);
        id
    }

    /// Look up a task.
    pub fn get(&self, id: TaskId) -> Option<&Task> {
        self.tasks.get(id.0 as usize)
    }

    /// Number of tasks ever added (including superseded ones).
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    /// `true` when no task was added.
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Root task.
    pub fn root(&self) -> Option<TaskId> {
        self.root
    }

    /// Set the root task.
    pub fn set_root(&mut self, id: TaskId) {
        self.root = Some(id);
    }

    /// Register a surface.
    pub fn add_surface(&mut self, desc: SurfaceDesc) -> SurfaceId {
        self.surfaces.insert(desc)
    }

    /// Declaration of the surface targeted by `id`.
    pub fn target_desc(&self, id: TaskId) -> Option<&SurfaceDesc> {
        self.get(id)
            .and_then(|t| t.target)
            .and_then(|s| self.surfaces.get(s))
    }

    /// `true` when the task has a declared target surface and a non-degenerate target rectangle
    /// inside it.
    pub fn valid_target(&self, id: TaskId) -> bool {
        let Some(task) = self.get(id) else {
            return false;
        };
        let Some(desc) = task.target.and_then(|s| self.surfaces.get(s)) else {
            return false;
        };
        task.target_rect.is_valid() && desc.rect().contains_rect(task.target_rect)
    }

    /// Task currently at `edge`.
    pub fn edge_task(&self, edge: Edge) -> Option<TaskId> {
        match edge {
            Edge::Root => self.root,
            Edge::Sub { parent, slot } => self.get(parent)?.sub_tasks.get(slot).copied(),
        }
    }

    /// Put `task` at `edge`.
    pub fn set_edge_task(&mut self, edge: Edge, task: TaskId) -> RenderResult<()> {
        match edge {
            Edge::Root => {
                self.root = Some(task);
                Ok(())
            }
            Edge::Sub { parent, slot } => {
                let p = self
                    .tasks
                    .get_mut(parent.0 as usize)
                    .ok_or_else(|| RenderError::structural(format!("unknown task {parent:?}")))?;
                let s = p.sub_tasks.get_mut(slot).ok_or_else(|| {
                    RenderError::structural(format!("task {parent:?} has no sub-task slot {slot}"))
                })?;
                *s = task;
                Ok(())
            }
        }
    }

    /// Flatten the DAG reachable from the root into dependency order: every task appears once,
    /// after all of its sub-tasks. Sub-tasks are visited in slot order.
    pub fn linearize(&self) -> RenderResult<TaskList> {
        let Some(root) = self.root else {
            return Ok(Vec::new());
        };

        let mut out = Vec::new();
        let mut done = HashSet::<TaskId>::new();
        let mut on_path = HashSet::<TaskId>::new();
        // (task, next sub-task slot to visit)
        let mut stack: Vec<(TaskId, usize)> = vec![(root, 0)];
        on_path.insert(root);

        while let Some(frame) = stack.last_mut() {
            let (id, slot) = *frame;
            let task = self
                .get(id)
                .ok_or_else(|| RenderError::structural(format!("unknown task {id:?}")))?;
            if let Some(&sub) = task.sub_tasks.get(slot) {
                frame.1 += 1;
                if done.contains(&sub) {
                    continue;
                }
                if !on_path.insert(sub) {
                    return Err(RenderError::structural(format!(
                        "task graph has a cycle through {sub:?}"
                    )));
                }
                stack.push((sub, 0));
            } else {
                stack.pop();
                on_path.remove(&id);
                done.insert(id);
                out.push(id);
            }
        }
        Ok(out)
    }

    /// Add a copy of `id` restricted to `rect` (target pixels). The source rectangle shrinks
    /// proportionally. Returns `None` when the restriction is empty.
    pub fn split(&mut self, id: TaskId, rect: RectInt) -> Option<TaskId> {
        let task = self.get(id)?;
        let clipped = task.target_rect.intersect(rect);
        if !clipped.is_valid() {
            return None;
        }
        let mut part = task.clone();
        part.source_rect = map_rect(
            clipped.to_rect(),
            task.target_rect.to_rect(),
            task.source_rect,
        );
        part.target_rect = clipped;
        Some(self.add(part))
    }
}

impl Index<TaskId> for TaskGraph {
    type Output = Task;

    fn index(&self, id: TaskId) -> &Task {
        &self.tasks[id.0 as usize]
    }
}

impl IndexMut<TaskId> for TaskGraph {
    fn index_mut(&mut self, id: TaskId) -> &mut Task {
        &mut self.tasks[id.0 as usize]
    }
}

#[cfg(test)]
#[path = "../../tests/unit/task/graph.rs"]
mod tests;
