use std::collections::HashMap;

use crate::fft::FftBackend;
use crate::foundation::core::{Vec2, VectorInt};
use crate::foundation::error::{RenderError, RenderResult};
use crate::render::backend::{FrameRGBA, TaskBackend};
use crate::render::blur::blur;
use crate::render::kernels;
use crate::render::pixels::{FlatSurface, SurfaceData, pack};
use crate::render::surface_pool::{SurfacePool, SurfacePoolOpts, SurfacePoolStats};
use crate::surface::{SurfaceDesc, SurfaceId};
use crate::task::{Task, TaskGraph, TaskId, TaskKind};

/// Options for [`SoftwareBackend`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct SoftwareBackendOpts {
    /// Engine used by blur tasks.
    pub fft: FftBackend,
    /// Upper bound on bytes bound to live surfaces at once.
    pub max_surface_bytes: usize,
    /// Reuse of released buffers.
    pub pool: SurfacePoolOpts,
}

impl Default for SoftwareBackendOpts {
    fn default() -> Self {
        Self {
            fft: FftBackend::default(),
            max_surface_bytes: 1024 * 1024 * 1024,
            pool: SurfacePoolOpts::default(),
        }
    }
}

/// CPU backend running the pixel kernels of [`crate::render::kernels`] and
/// [`crate::render::blur`].
///
/// Surfaces are bound on their create task and released into a [`SurfacePool`] on their destroy
/// task. Externally owned surfaces and conversion targets are bound on first write.
#[derive(Debug)]
pub struct SoftwareBackend {
    opts: SoftwareBackendOpts,
    pool: SurfacePool,
    surfaces: HashMap<SurfaceId, SurfaceData>,
    live_bytes: usize,
}

impl Default for SoftwareBackend {
    fn default() -> Self {
        Self::new(SoftwareBackendOpts::default())
    }
}

impl SoftwareBackend {
    /// Backend without live surfaces.
    pub fn new(opts: SoftwareBackendOpts) -> Self {
        Self {
            pool: SurfacePool::new(opts.pool),
            opts,
            surfaces: HashMap::new(),
            live_bytes: 0,
        }
    }

    /// Pool counters.
    pub fn pool_stats(&self) -> SurfacePoolStats {
        self.pool.stats()
    }

    /// Bytes currently bound to live surfaces.
    pub fn live_bytes(&self) -> usize {
        self.live_bytes
    }

    /// Number of live surfaces.
    pub fn live_surfaces(&self) -> usize {
        self.surfaces.len()
    }

    /// Pixels of a live surface.
    pub fn surface(&self, id: SurfaceId) -> Option<&SurfaceData> {
        self.surfaces.get(&id)
    }

    /// Release every live surface, e.g. externally owned ones after a readback.
    pub fn release_all(&mut self) {
        for (_, data) in self.surfaces.drain() {
            self.pool.release(data);
        }
        self.live_bytes = 0;
    }

    fn allocate(&mut self, id: SurfaceId, desc: &SurfaceDesc) -> RenderResult<()> {
        let bytes = desc.byte_len();
        let total = self.live_bytes.saturating_add(bytes);
        if total > self.opts.max_surface_bytes {
            return Err(RenderError::allocation(format!(
                "surface {id:?} ({}x{} {:?}) needs {bytes} bytes; {} of {} bytes are in use",
                desc.width, desc.height, desc.format, self.live_bytes, self.opts.max_surface_bytes
            )));
        }
        let data = self.pool.borrow(desc);
        self.surfaces.insert(id, data);
        self.live_bytes = total;
        tracing::trace!(surface = ?id, bytes, live = self.live_bytes, "surface bound");
        Ok(())
    }

    fn check_formats(graph: &TaskGraph, task: &Task, desc: &SurfaceDesc) -> RenderResult<()> {
        let Some(cap) = task.capability() else {
            return Ok(());
        };
        let name = task.kind.name();
        if !cap.is_supported_target(desc) {
            return Err(RenderError::execution(format!(
                "{name} task cannot write {:?} surfaces",
                desc.format
            )));
        }
        for &sub in &task.sub_tasks {
            if let Some(sd) = graph.target_desc(sub)
                && !cap.is_supported_source(sd)
            {
                return Err(RenderError::execution(format!(
                    "{name} task cannot read {:?} surfaces",
                    sd.format
                )));
            }
        }
        Ok(())
    }
}

impl TaskBackend for SoftwareBackend {
    fn name(&self) -> &'static str {
        "software"
    }

    fn create_surface(&mut self, surface: SurfaceId, desc: &SurfaceDesc) -> RenderResult<()> {
        if self.surfaces.contains_key(&surface) {
            return Err(RenderError::execution(format!(
                "surface {surface:?} is created twice"
            )));
        }
        self.allocate(surface, desc)
    }

    fn destroy_surface(&mut self, surface: SurfaceId) -> RenderResult<()> {
        let data = self.surfaces.remove(&surface).ok_or_else(|| {
            RenderError::execution(format!("surface {surface:?} is destroyed while not bound"))
        })?;
        self.live_bytes = self.live_bytes.saturating_sub(data.byte_len());
        self.pool.release(data);
        Ok(())
    }

    fn run_task(&mut self, graph: &TaskGraph, id: TaskId) -> RenderResult<()> {
        let task = graph
            .get(id)
            .ok_or_else(|| RenderError::structural(format!("unknown task {id:?}")))?;
        let target = task
            .target
            .ok_or_else(|| RenderError::execution(format!("task {id:?} has no target")))?;
        let desc = *graph.surfaces.get(target).ok_or_else(|| {
            RenderError::structural(format!("task {id:?} targets undeclared surface {target:?}"))
        })?;
        Self::check_formats(graph, task, &desc)?;

        if !self.surfaces.contains_key(&target) {
            if desc.is_created() || task.is_surface_convert() {
                self.allocate(target, &desc)?;
            } else {
                return Err(RenderError::execution(format!(
                    "{} task writes surface {target:?} before it was created",
                    task.kind.name()
                )));
            }
        }

        let Some(mut dest) = self.surfaces.remove(&target) else {
            return Err(RenderError::execution(format!(
                "surface {target:?} is not bound"
            )));
        };
        // a task reading its own target sees the pixels from before it ran
        let snapshot = task
            .sub_tasks
            .iter()
            .any(|&s| graph.get(s).is_some_and(|t| t.target == Some(target)))
            .then(|| dest.clone());
        let inputs = Inputs {
            graph,
            surfaces: &self.surfaces,
            own: target,
            snapshot: snapshot.as_ref(),
        };
        let result = run_kernel(self.opts.fft, task, &inputs, &mut dest);
        self.surfaces.insert(target, dest);
        result
    }

    fn readback_rgba8(&self, surface: SurfaceId) -> RenderResult<FrameRGBA> {
        let data = self.surfaces.get(&surface).ok_or_else(|| {
            RenderError::execution(format!("cannot read back unbound surface {surface:?}"))
        })?;
        let bytes = match data {
            SurfaceData::Packed(p) => p.pixels().iter().flatten().copied().collect(),
            SurfaceData::Flat(f) => f.pixels().iter().flat_map(|&c| pack(c)).collect(),
        };
        Ok(FrameRGBA {
            width: data.width(),
            height: data.height(),
            data: bytes,
            premultiplied: true,
        })
    }
}

/// Read access to the surfaces of a task's dependencies.
struct Inputs<'a> {
    graph: &'a TaskGraph,
    surfaces: &'a HashMap<SurfaceId, SurfaceData>,
    own: SurfaceId,
    snapshot: Option<&'a SurfaceData>,
}

impl<'a> Inputs<'a> {
    fn get(&self, task: &Task, slot: usize) -> RenderResult<(&'a Task, &'a SurfaceData)> {
        let sub = task.sub_tasks.get(slot).copied().ok_or_else(|| {
            RenderError::structural(format!(
                "{} task has no sub-task in slot {slot}",
                task.kind.name()
            ))
        })?;
        let graph: &'a TaskGraph = self.graph;
        let sub_task = graph
            .get(sub)
            .ok_or_else(|| RenderError::structural(format!("unknown task {sub:?}")))?;
        let surface = sub_task.target.ok_or_else(|| {
            RenderError::execution(format!("sub-task {sub:?} has no target surface"))
        })?;
        let data = if surface == self.own {
            self.snapshot
        } else {
            self.surfaces.get(&surface)
        };
        let data = data.ok_or_else(|| {
            RenderError::execution(format!(
                "{} task reads surface {surface:?} that is not bound",
                task.kind.name()
            ))
        })?;
        Ok((sub_task, data))
    }

    fn flat(&self, task: &Task, slot: usize) -> RenderResult<(&'a Task, &'a FlatSurface)> {
        let (sub, data) = self.get(task, slot)?;
        match data {
            SurfaceData::Flat(f) => Ok((sub, f)),
            SurfaceData::Packed(_) => Err(RenderError::execution(format!(
                "{} task needs a flat source in slot {slot}",
                task.kind.name()
            ))),
        }
    }
}

fn flat_target<'d>(task: &Task, dest: &'d mut SurfaceData) -> RenderResult<&'d mut FlatSurface> {
    match dest {
        SurfaceData::Flat(f) => Ok(f),
        SurfaceData::Packed(_) => Err(RenderError::execution(format!(
            "{} task needs a flat target",
            task.kind.name()
        ))),
    }
}

fn run_kernel(
    fft: FftBackend,
    task: &Task,
    inputs: &Inputs<'_>,
    dest: &mut SurfaceData,
) -> RenderResult<()> {
    let rect = task.target_rect;
    // sub-task pixel = target pixel + offset
    let src_offset = VectorInt::new(rect.minx + task.offset.x, rect.miny + task.offset.y);

    match &task.kind {
        TaskKind::SurfaceCreate | TaskKind::SurfaceDestroy => Err(RenderError::structural(
            format!("{} is not a pixel task", task.kind.name()),
        )),
        TaskKind::SurfaceConvert => {
            let (_, src) = inputs.get(task, 0)?;
            kernels::convert(dest, rect, src, src_offset);
            Ok(())
        }
        TaskKind::Solid { color } => {
            kernels::fill_solid(dest, rect, *color);
            Ok(())
        }
        TaskKind::Blur { blur_type, size } => {
            let (_, src) = inputs.flat(task, 0)?;
            let sr = task.source_rect;
            let scale = |px: u32, logical: f64| {
                if logical.abs() > f64::EPSILON {
                    f64::from(px) / logical.abs()
                } else {
                    0.0
                }
            };
            let size_px = Vec2::new(
                size.x * scale(rect.width(), sr.width()),
                size.y * scale(rect.height(), sr.height()),
            );
            blur(
                fft.engine(),
                flat_target(task, dest)?,
                rect,
                src,
                src_offset,
                *blur_type,
                size_px,
            )
        }
        TaskKind::ColorCorrect(cc) => {
            let (_, src) = inputs.flat(task, 0)?;
            kernels::color_correct(flat_target(task, dest)?, rect, src, src_offset, cc);
            Ok(())
        }
        TaskKind::Blend { method, amount } => {
            let (_, under) = inputs.flat(task, 0)?;
            let (_, over) = inputs.flat(task, 1)?;
            kernels::blend(
                flat_target(task, dest)?,
                rect,
                under,
                src_offset,
                over,
                src_offset,
                *method,
                amount.clamp(0.0, 1.0),
            );
            Ok(())
        }
        TaskKind::Transformation { stack } => {
            let (sub, src) = inputs.get(task, 0)?;
            kernels::transform(
                flat_target(task, dest)?,
                rect,
                task.source_rect,
                src,
                sub.target_rect,
                sub.source_rect,
                stack,
            );
            Ok(())
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/software.rs"]
mod tests;
