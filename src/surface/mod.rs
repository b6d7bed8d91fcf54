//! Surface descriptors, the surface arena and the optional per-task capability interface.
//!
//! A surface here is only a handle: size, representation and lifecycle flags. Pixel memory is
//! owned by a backend and bound to the handle between its create and destroy tasks.

use std::fmt;

use crate::foundation::core::RectInt;

/// Identity of a surface inside a [`SurfaceTable`]. Used as set key by the lifecycle optimizers.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
pub struct SurfaceId(
    /// Raw index in [`SurfaceTable`].
    pub u32,
);

/// Concrete pixel representation of a surface.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SurfaceFormat {
    /// Premultiplied `f32` RGBA, one `[f32; 4]` per pixel.
    Flat,
    /// Premultiplied RGBA8, one `[u8; 4]` per pixel.
    Packed,
}

impl SurfaceFormat {
    /// Bytes used by one pixel.
    pub fn bytes_per_pixel(self) -> usize {
        match self {
            Self::Flat => 16,
            Self::Packed => 4,
        }
    }
}

/// Surface declaration: size, representation and lifecycle flags.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct SurfaceDesc {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Pixel representation.
    pub format: SurfaceFormat,
    /// Backing memory exists before the render starts (externally owned).
    pub created: bool,
    /// Exists only for this render; safe to destroy once unused.
    pub temporary: bool,
}

impl SurfaceDesc {
    /// Externally owned surface, e.g. the final output.
    pub fn persistent(format: SurfaceFormat, width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            format,
            created: true,
            temporary: false,
        }
    }

    /// Intermediate surface allocated by the plan and freed by it.
    pub fn temporary(format: SurfaceFormat, width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            format,
            created: false,
            temporary: true,
        }
    }

    /// Rectangle covering the whole surface.
    pub fn rect(&self) -> RectInt {
        RectInt::from_size(self.width, self.height)
    }

    /// Bytes needed to back the surface.
    pub fn byte_len(&self) -> usize {
        (self.width as usize)
            .saturating_mul(self.height as usize)
            .saturating_mul(self.format.bytes_per_pixel())
    }

    /// `true` for externally owned surfaces; the plan never creates or destroys them.
    pub fn is_created(&self) -> bool {
        self.created
    }

    /// `true` for surfaces that live only for the current render.
    pub fn is_temporary(&self) -> bool {
        self.temporary
    }
}

/// Arena of surface declarations addressed by [`SurfaceId`].
#[derive(Clone, Debug, Default)]
pub struct SurfaceTable {
    descs: Vec<SurfaceDesc>,
}

impl SurfaceTable {
    /// Empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a surface and return its identity.
    pub fn insert(&mut self, desc: SurfaceDesc) -> SurfaceId {
        let id = SurfaceId(self.descs.len() as u32);
        self.descs.push(desc);
        id
    }

    /// Look up a surface declaration.
    pub fn get(&self, id: SurfaceId) -> Option<&SurfaceDesc> {
        self.descs.get(id.0 as usize)
    }

    /// Number of declared surfaces.
    pub fn len(&self) -> usize {
        self.descs.len()
    }

    /// `true` when no surface was declared.
    pub fn is_empty(&self) -> bool {
        self.descs.is_empty()
    }

    /// Iterate declarations in id order.
    pub fn iter(&self) -> impl Iterator<Item = (SurfaceId, &SurfaceDesc)> {
        self.descs
            .iter()
            .enumerate()
            .map(|(i, d)| (SurfaceId(i as u32), d))
    }
}

/// Surface representations a task can read and write.
///
/// Tasks expose this through [`crate::task::Task::capability`]; a task without a capability
/// accepts any representation.
pub trait SurfaceCapability: fmt::Debug + Send + Sync {
    /// `true` if the task can read `surface` directly.
    fn is_supported_source(&self, surface: &SurfaceDesc) -> bool;

    /// `true` if the task can write into `surface` directly.
    fn is_supported_target(&self, surface: &SurfaceDesc) -> bool;

    /// Declaration of a fresh temporary surface this task can read.
    fn create_supported_source(&self, width: u32, height: u32) -> Option<SurfaceDesc>;

    /// Declaration of a fresh temporary surface this task can write.
    fn create_supported_target(&self, width: u32, height: u32) -> Option<SurfaceDesc>;
}

/// Capability described by two format lists; the first entry of each list is preferred when a
/// new surface has to be created.
#[derive(Debug)]
pub struct FormatCaps {
    /// Readable representations.
    pub sources: &'static [SurfaceFormat],
    /// Writable representations.
    pub targets: &'static [SurfaceFormat],
}

impl SurfaceCapability for FormatCaps {
    fn is_supported_source(&self, surface: &SurfaceDesc) -> bool {
        self.sources.contains(&surface.format)
    }

    fn is_supported_target(&self, surface: &SurfaceDesc) -> bool {
        self.targets.contains(&surface.format)
    }

    fn create_supported_source(&self, width: u32, height: u32) -> Option<SurfaceDesc> {
        self.sources
            .first()
            .map(|&f| SurfaceDesc::temporary(f, width, height))
    }

    fn create_supported_target(&self, width: u32, height: u32) -> Option<SurfaceDesc> {
        self.targets
            .first()
            .map(|&f| SurfaceDesc::temporary(f, width, height))
    }
}

/// Reads and writes flat surfaces only.
pub static FLAT_ONLY: FormatCaps = FormatCaps {
    sources: &[SurfaceFormat::Flat],
    targets: &[SurfaceFormat::Flat],
};

/// Writes packed surfaces only and reads nothing.
pub static PACKED_WRITER: FormatCaps = FormatCaps {
    sources: &[],
    targets: &[SurfaceFormat::Packed],
};

/// Reads either representation, writes flat surfaces.
pub static ANY_TO_FLAT: FormatCaps = FormatCaps {
    sources: &[SurfaceFormat::Flat, SurfaceFormat::Packed],
    targets: &[SurfaceFormat::Flat],
};
