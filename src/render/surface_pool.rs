use std::collections::HashMap;

use crate::render::pixels::SurfaceData;
use crate::surface::{SurfaceDesc, SurfaceFormat};

/// Pool configuration for released surface buffers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct SurfacePoolOpts {
    /// Maximum bytes retained across all buckets.
    pub max_pool_bytes: usize,
    /// Maximum number of retained buffers per (w, h, format) bucket.
    pub max_surfaces_per_bucket: usize,
}

impl Default for SurfacePoolOpts {
    fn default() -> Self {
        Self {
            max_pool_bytes: 256 * 1024 * 1024,
            max_surfaces_per_bucket: 8,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct SurfaceKey {
    w: u32,
    h: u32,
    format: SurfaceFormat,
}

impl SurfaceKey {
    fn from_desc(desc: &SurfaceDesc) -> Self {
        Self {
            w: desc.width,
            h: desc.height,
            format: desc.format,
        }
    }

    fn from_data(data: &SurfaceData) -> Self {
        Self {
            w: data.width(),
            h: data.height(),
            format: data.format(),
        }
    }

    fn byte_len(self) -> usize {
        (self.w as usize)
            .saturating_mul(self.h as usize)
            .saturating_mul(self.format.bytes_per_pixel())
    }
}

/// Pool counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SurfacePoolStats {
    /// Buffers currently held by the pool.
    pub retained_surfaces: usize,
    /// Bytes currently held by the pool.
    pub retained_bytes: usize,
    /// Fresh allocations.
    pub alloc_surfaces: u64,
    /// Bytes of fresh allocations.
    pub alloc_bytes: u64,
    /// Buffers handed out from the pool.
    pub reused_surfaces: u64,
    /// Released buffers dropped because a cap was reached.
    pub dropped_on_release: u64,
}

/// Bounded pool of surface buffers keyed by `(width, height, format)`.
///
/// Buffers are borrowed when a surface is created and released when it is destroyed, so the
/// pool works at task granularity.
#[derive(Debug)]
pub struct SurfacePool {
    opts: SurfacePoolOpts,
    stats: SurfacePoolStats,
    buckets: HashMap<SurfaceKey, Vec<SurfaceData>>,
}

impl SurfacePool {
    /// Empty pool.
    pub fn new(opts: SurfacePoolOpts) -> Self {
        Self {
            opts,
            stats: SurfacePoolStats::default(),
            buckets: HashMap::new(),
        }
    }

    /// Snapshot of the counters.
    pub fn stats(&self) -> SurfacePoolStats {
        self.stats
    }

    /// Transparent buffer for `desc`, reused when possible.
    pub fn borrow(&mut self, desc: &SurfaceDesc) -> SurfaceData {
        let key = SurfaceKey::from_desc(desc);
        if let Some(mut data) = self.buckets.get_mut(&key).and_then(Vec::pop) {
            self.stats.retained_surfaces = self.stats.retained_surfaces.saturating_sub(1);
            self.stats.retained_bytes = self.stats.retained_bytes.saturating_sub(key.byte_len());
            self.stats.reused_surfaces = self.stats.reused_surfaces.saturating_add(1);
            data.clear();
            return data;
        }

        self.stats.alloc_surfaces = self.stats.alloc_surfaces.saturating_add(1);
        self.stats.alloc_bytes = self
            .stats
            .alloc_bytes
            .saturating_add(key.byte_len() as u64);
        SurfaceData::new(desc)
    }

    /// Hand a buffer back; dropped if a cap would be exceeded.
    pub fn release(&mut self, data: SurfaceData) {
        if self.opts.max_pool_bytes == 0 || self.opts.max_surfaces_per_bucket == 0 {
            self.stats.dropped_on_release = self.stats.dropped_on_release.saturating_add(1);
            return;
        }

        let key = SurfaceKey::from_data(&data);
        let bytes = key.byte_len();
        if self.stats.retained_bytes.saturating_add(bytes) > self.opts.max_pool_bytes {
            self.stats.dropped_on_release = self.stats.dropped_on_release.saturating_add(1);
            return;
        }

        let bucket = self.buckets.entry(key).or_default();
        if bucket.len() >= self.opts.max_surfaces_per_bucket {
            self.stats.dropped_on_release = self.stats.dropped_on_release.saturating_add(1);
            return;
        }

        bucket.push(data);
        self.stats.retained_surfaces = self.stats.retained_surfaces.saturating_add(1);
        self.stats.retained_bytes = self.stats.retained_bytes.saturating_add(bytes);
    }
}
