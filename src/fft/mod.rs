//! Discrete Fourier transforms over strided complex arrays.
//!
//! Two interchangeable engines implement [`FourierTransform`]:
//!
//! - [`Radix2Fft`]: in-place iterative Cooley–Tukey, power-of-two lengths only.
//! - [`DirectDft`]: direct `O(n^2)` evaluation for any length, used as a reference.
//!
//! Both follow the usual convention: the forward transform is unnormalized and the inverse
//! transform divides by the length.

pub(crate) mod complex;
pub(crate) mod direct;
pub(crate) mod radix2;

pub use complex::Complex;
pub use direct::DirectDft;
pub use radix2::Radix2Fft;

use crate::foundation::error::{RenderError, RenderResult};

/// Common interface of the FFT engines.
pub trait FourierTransform: std::fmt::Debug + Send + Sync {
    /// Smallest length accepted by this engine that is `>= x`.
    fn get_valid_count(&self, x: usize) -> usize;

    /// `true` if `x` is an accepted length.
    fn is_valid_count(&self, x: usize) -> bool;

    /// In-place 1D transform of `count` samples spaced `stride` elements apart.
    fn fft(
        &self,
        data: &mut [Complex],
        count: usize,
        stride: usize,
        invert: bool,
    ) -> RenderResult<()>;

    /// In-place 2D transform. `do_rows` transforms every row (along the column axis),
    /// `do_cols` every column; either may be skipped for separable processing.
    #[allow(clippy::too_many_arguments)]
    fn fft2d(
        &self,
        data: &mut [Complex],
        rows: usize,
        row_stride: usize,
        cols: usize,
        col_stride: usize,
        invert: bool,
        do_rows: bool,
        do_cols: bool,
    ) -> RenderResult<()> {
        if rows == 0 || cols == 0 {
            return Ok(());
        }
        let needed = (rows - 1) * row_stride + (cols - 1) * col_stride + 1;
        if data.len() < needed {
            return Err(RenderError::structural(format!(
                "fft2d needs {needed} samples, got {}",
                data.len()
            )));
        }
        if do_rows {
            for r in 0..rows {
                self.fft(&mut data[r * row_stride..], cols, col_stride, invert)?;
            }
        }
        if do_cols {
            for c in 0..cols {
                self.fft(&mut data[c * col_stride..], rows, row_stride, invert)?;
            }
        }
        Ok(())
    }
}

/// Engine selection for configuration files.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FftBackend {
    /// [`Radix2Fft`].
    #[default]
    Radix2,
    /// [`DirectDft`].
    Direct,
}

impl FftBackend {
    /// Engine instance for this selection.
    pub fn engine(self) -> &'static dyn FourierTransform {
        static RADIX2: Radix2Fft = Radix2Fft;
        static DIRECT: DirectDft = DirectDft;
        match self {
            Self::Radix2 => &RADIX2,
            Self::Direct => &DIRECT,
        }
    }
}

fn check_span(len: usize, count: usize, stride: usize) -> RenderResult<()> {
    if stride == 0 {
        return Err(RenderError::structural("fft stride must be > 0"));
    }
    let needed = (count - 1)
        .checked_mul(stride)
        .and_then(|v| v.checked_add(1))
        .ok_or_else(|| RenderError::structural("fft span overflow"))?;
    if len < needed {
        return Err(RenderError::structural(format!(
            "fft of {count} samples with stride {stride} needs {needed} elements, got {len}"
        )));
    }
    Ok(())
}

#[cfg(test)]
#[path = "../../tests/unit/fft/fft.rs"]
mod tests;
