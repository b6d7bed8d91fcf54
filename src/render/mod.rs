//! Plan execution: the backend interface, the executor loop and the software backend.

pub(crate) mod backend;
pub(crate) mod blur;
pub(crate) mod kernels;
pub(crate) mod pixels;
pub(crate) mod software;
pub(crate) mod surface_pool;

pub use backend::{FrameRGBA, NoProgress, ProgressCallback, TaskBackend, execute_list};
pub use blur::{blur, gauss, get_extra_size};
pub use pixels::{FlatSurface, PackedSurface, SurfaceData};
pub use software::{SoftwareBackend, SoftwareBackendOpts};
pub use surface_pool::{SurfacePool, SurfacePoolOpts, SurfacePoolStats};
