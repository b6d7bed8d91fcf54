use crate::foundation::error::{RenderError, RenderResult};
use crate::optimize::TaskRole;
use crate::surface::{SurfaceDesc, SurfaceId};
use crate::task::{TaskGraph, TaskId};

/// A rendered frame as RGBA8 pixels.
#[derive(Clone, Debug)]
pub struct FrameRGBA {
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// RGBA8 bytes, tightly packed, row-major.
    pub data: Vec<u8>,
    /// Whether the `data` is premultiplied alpha.
    pub premultiplied: bool,
}

impl FrameRGBA {
    /// Convert premultiplied bytes to straight alpha in place, as image files expect.
    pub fn unpremultiply(&mut self) {
        if !self.premultiplied {
            return;
        }
        for px in self.data.chunks_exact_mut(4) {
            let a = u16::from(px[3]);
            if a == 0 {
                px[..3].fill(0);
                continue;
            }
            for c in &mut px[..3] {
                *c = ((u16::from(*c) * 255 + a / 2) / a).min(255) as u8;
            }
        }
        self.premultiplied = false;
    }
}

/// Progress and cancellation hooks for [`execute_list`].
///
/// Every method returns `true` to continue; `false` aborts the render at the next task
/// boundary.
pub trait ProgressCallback {
    /// A task is about to run.
    fn task(&mut self, _name: &str) -> bool {
        true
    }

    /// A task failed; the render stops after this call regardless of the return value.
    fn error(&mut self, _msg: &str) -> bool {
        true
    }

    /// Something unexpected but recoverable happened.
    fn warning(&mut self, _msg: &str) -> bool {
        true
    }

    /// `current` of `total` tasks are done.
    fn amount_complete(&mut self, _current: usize, _total: usize) -> bool {
        true
    }
}

/// Callback that never aborts.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoProgress;

impl ProgressCallback for NoProgress {}

/// Executes the tasks of an optimized plan.
///
/// The executor calls [`TaskBackend::create_surface`] and [`TaskBackend::destroy_surface`] for
/// structural tasks and [`TaskBackend::run_task`] for everything else, in list order.
pub trait TaskBackend {
    /// Name used in logs.
    fn name(&self) -> &'static str;

    /// Bind backing memory to `surface`.
    fn create_surface(&mut self, surface: SurfaceId, desc: &SurfaceDesc) -> RenderResult<()>;

    /// Release the backing memory of `surface`.
    fn destroy_surface(&mut self, surface: SurfaceId) -> RenderResult<()>;

    /// Run a conversion or compute task. Sub-task surfaces are already written.
    fn run_task(&mut self, graph: &TaskGraph, id: TaskId) -> RenderResult<()>;

    /// Copy `surface` out as premultiplied RGBA8.
    fn readback_rgba8(&self, surface: SurfaceId) -> RenderResult<FrameRGBA>;
}

fn aborted(at: &str) -> RenderError {
    RenderError::aborted(format!("progress callback stopped the render at {at}"))
}

/// Run `list` front to back on `backend`.
///
/// Tasks without a valid target are skipped with a warning. The first failing task stops the
/// render; its error is reported through [`ProgressCallback::error`] and returned.
#[tracing::instrument(skip(backend, graph, list, progress), fields(backend = backend.name(), len = list.len()))]
pub fn execute_list(
    backend: &mut dyn TaskBackend,
    graph: &TaskGraph,
    list: &[TaskId],
    progress: &mut dyn ProgressCallback,
) -> RenderResult<()> {
    let total = list.len();
    for (i, &id) in list.iter().enumerate() {
        let task = graph
            .get(id)
            .ok_or_else(|| RenderError::structural(format!("plan lists unknown task {id:?}")))?;
        let name = task.kind.name();
        if !progress.task(name) {
            return Err(aborted(name));
        }

        match task.target.filter(|_| graph.valid_target(id)) {
            None => {
                let msg = format!("skipping {name} task {id:?} without a valid target");
                tracing::warn!(task = ?id, "{msg}");
                if !progress.warning(&msg) {
                    return Err(aborted(name));
                }
            }
            Some(surface) => {
                let result = match TaskRole::of(task) {
                    TaskRole::Create => match graph.surfaces.get(surface) {
                        Some(desc) => backend.create_surface(surface, desc),
                        None => Err(RenderError::structural(format!(
                            "task {id:?} creates undeclared surface {surface:?}"
                        ))),
                    },
                    TaskRole::Destroy => backend.destroy_surface(surface),
                    TaskRole::Convert | TaskRole::Compute => backend.run_task(graph, id),
                };
                if let Err(err) = result {
                    progress.error(&err.to_string());
                    return Err(err);
                }
                tracing::trace!(task = ?id, name, ?surface, "task executed");
            }
        }

        if !progress.amount_complete(i + 1, total) {
            return Err(aborted(name));
        }
    }
    Ok(())
}
