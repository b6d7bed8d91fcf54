//! FFT convolution blur for flat surfaces.
//!
//! The source region (plus a kernel-dependent margin) is copied into four complex planes, one
//! per premultiplied channel, zero padded so the circular convolution does not wrap around, up
//! to a length the selected [`FourierTransform`] accepts.
//! Separable kernels convolve rows and columns with 1D patterns; the disc kernel uses a full 2D
//! pattern. Planes are processed in parallel.

use std::f64::consts::PI;

use rayon::prelude::*;

use crate::fft::{Complex, FourierTransform};
use crate::foundation::core::{RectInt, Vec2, VectorInt};
use crate::foundation::error::RenderResult;
use crate::render::pixels::FlatSurface;
use crate::task::BlurType;

const PRECISION: f64 = 1e-10;

/// Kernel values below this fraction of the peak are cut off.
const MIN_KERNEL_VALUE: f64 = 1.0 / 4096.0;

/// Normal distribution density with standard deviation `radius`; a unit impulse for zero radius.
pub fn gauss(x: f64, radius: f64) -> f64 {
    if radius.abs() < PRECISION {
        return if x.abs() < PRECISION { 1.0 } else { 0.0 };
    }
    let k = 1.0 / (2.0 * PI).sqrt();
    k * (-0.5 * x * x / (radius * radius)).exp() / radius
}

fn extra_size_factor(blur_type: BlurType) -> f64 {
    match blur_type {
        BlurType::Box | BlurType::Cross | BlurType::Disc => 1.0,
        BlurType::Gaussian | BlurType::FastGaussian => {
            (-2.0 * (MIN_KERNEL_VALUE / gauss(0.0, 1.0)).ln()).sqrt()
        }
    }
}

/// Margin in pixels a blur of `size` reads around every output pixel.
pub fn get_extra_size(blur_type: BlurType, size: Vec2) -> VectorInt {
    let k = extra_size_factor(blur_type);
    let margin = |v: f64| (v.abs() * k + 0.5 - PRECISION).ceil() as i32;
    VectorInt::new(margin(size.x), margin(size.y))
}

/// Box kernel of half-width `0.5 + |size|` centered on index 0 (wrapping), weighted by exact
/// pixel coverage so the pattern sums to one.
pub(crate) fn fill_pattern_box(pattern: &mut [Complex], size: f64) {
    let count = pattern.len();
    if count == 0 {
        return;
    }
    let s = 0.5 + size.abs();
    let w = 0.5 / s;
    for i in 0..=count / 2 {
        let x = i as f64;
        let coverage = ((x + 0.5).min(s) - (x - 0.5).max(-s)).clamp(0.0, 1.0);
        if coverage <= 0.0 {
            break;
        }
        let v = Complex::real(w * coverage);
        pattern[i] = v;
        if i > 0 {
            pattern[count - i] = v;
        }
    }
}

/// Sampled gaussian kernel centered on index 0 (wrapping).
pub(crate) fn fill_pattern_gauss(pattern: &mut [Complex], size: f64) {
    let count = pattern.len();
    if count == 0 {
        return;
    }
    let s = size.abs();
    pattern[0] = Complex::real(gauss(0.0, s));
    for i in 1..=count / 2 {
        let v = Complex::real(gauss(i as f64, s));
        pattern[i] = v;
        pattern[count - i] = v;
    }
}

/// Normalized elliptic disc of radii `0.5 + |size|` centered on `(0, 0)` (wrapping), stored
/// row-major in a `rows x cols` pattern.
pub(crate) fn fill_pattern_disc(pattern: &mut [Complex], rows: usize, cols: usize, size: Vec2) {
    if rows == 0 || cols == 0 || pattern.len() < rows * cols {
        return;
    }
    let s = (0.5 + size.x.abs(), 0.5 + size.y.abs());
    let max_c = (cols / 2).min((s.0 - PRECISION).ceil() as usize);
    let max_r = (rows / 2).min((s.1 - PRECISION).ceil() as usize);

    for r in 0..=max_r {
        for c in 0..=max_c {
            let (dx, dy) = (c as f64 / s.0, r as f64 / s.1);
            if dx * dx + dy * dy > 1.0 + PRECISION {
                continue;
            }
            for (rr, cc) in [(r, c), (rows - r, c), (r, cols - c), (rows - r, cols - c)] {
                pattern[(rr % rows) * cols + cc % cols] = Complex::real(1.0);
            }
        }
    }

    let sum: f64 = pattern[..rows * cols].iter().map(|x| x.re).sum();
    if sum > PRECISION {
        let k = 1.0 / sum;
        for x in &mut pattern[..rows * cols] {
            *x = x.scale(k);
        }
    }
}

/// One channel plane padded to `rows x cols`, row-major.
struct Plane {
    data: Vec<Complex>,
}

struct Kernel {
    rows: usize,
    cols: usize,
    shape: KernelShape,
}

enum KernelShape {
    Separable {
        row: Vec<Complex>,
        col: Vec<Complex>,
        cross: bool,
    },
    Full(Vec<Complex>),
}

impl Kernel {
    fn new(
        engine: &dyn FourierTransform,
        blur_type: BlurType,
        size: Vec2,
        rows: usize,
        cols: usize,
    ) -> RenderResult<Self> {
        let shape = match blur_type {
            BlurType::Disc => {
                let mut full = vec![Complex::ZERO; rows * cols];
                fill_pattern_disc(&mut full, rows, cols, size);
                engine.fft2d(&mut full, rows, cols, cols, 1, false, true, true)?;
                KernelShape::Full(full)
            }
            _ => {
                let mut row = vec![Complex::ZERO; cols];
                let mut col = vec![Complex::ZERO; rows];
                let fill: fn(&mut [Complex], f64) = match blur_type {
                    BlurType::Gaussian | BlurType::FastGaussian => fill_pattern_gauss,
                    _ => fill_pattern_box,
                };
                fill(&mut row, size.x);
                fill(&mut col, size.y);
                engine.fft(&mut row, cols, 1, false)?;
                engine.fft(&mut col, rows, 1, false)?;
                KernelShape::Separable {
                    row,
                    col,
                    cross: blur_type == BlurType::Cross,
                }
            }
        };
        Ok(Self { rows, cols, shape })
    }

    fn apply(&self, engine: &dyn FourierTransform, plane: &mut Plane) -> RenderResult<()> {
        let (rows, cols) = (self.rows, self.cols);
        match &self.shape {
            KernelShape::Full(full) => {
                engine.fft2d(&mut plane.data, rows, cols, cols, 1, false, true, true)?;
                for (x, k) in plane.data.iter_mut().zip(full) {
                    *x *= *k;
                }
                engine.fft2d(&mut plane.data, rows, cols, cols, 1, true, true, true)
            }
            KernelShape::Separable { row, col, cross } => {
                if *cross {
                    for x in &mut plane.data {
                        *x = x.scale(0.5);
                    }
                    let mut vertical = plane.data.clone();
                    convolve_rows(engine, &mut plane.data, rows, cols, row)?;
                    convolve_cols(engine, &mut vertical, rows, cols, col)?;
                    for (x, v) in plane.data.iter_mut().zip(vertical) {
                        *x += v;
                    }
                    Ok(())
                } else {
                    convolve_rows(engine, &mut plane.data, rows, cols, row)?;
                    convolve_cols(engine, &mut plane.data, rows, cols, col)
                }
            }
        }
    }
}

fn convolve_rows(
    engine: &dyn FourierTransform,
    data: &mut [Complex],
    rows: usize,
    cols: usize,
    pattern: &[Complex],
) -> RenderResult<()> {
    for r in 0..rows {
        let line = &mut data[r * cols..(r + 1) * cols];
        engine.fft(line, cols, 1, false)?;
        for (x, k) in line.iter_mut().zip(pattern) {
            *x *= *k;
        }
        engine.fft(line, cols, 1, true)?;
    }
    Ok(())
}

fn convolve_cols(
    engine: &dyn FourierTransform,
    data: &mut [Complex],
    rows: usize,
    cols: usize,
    pattern: &[Complex],
) -> RenderResult<()> {
    for c in 0..cols {
        let lane = &mut data[c..];
        engine.fft(lane, rows, cols, false)?;
        for (r, k) in pattern.iter().enumerate().take(rows) {
            lane[r * cols] *= *k;
        }
        engine.fft(lane, rows, cols, true)?;
    }
    Ok(())
}

/// Plane length for `len` source pixels and a kernel reaching `extra` pixels.
///
/// Circular convolution over at least `len + min(2 * extra, len)` samples never wraps a source
/// pixel onto another one inside the kernel's reach.
fn padded_len(len: usize, extra: i32) -> usize {
    let reach = usize::try_from(extra).unwrap_or(0).saturating_mul(2);
    len + reach.min(len)
}

/// Blur `src` into `dest_rect` of `dest`.
///
/// `src_offset` is the source pixel that lands on `dest_rect`'s top-left corner; `size` is the
/// kernel size in pixels per axis. Pixels outside `src` read as transparent. Pixels of `dest`
/// outside `dest_rect` are left untouched.
pub fn blur(
    engine: &dyn FourierTransform,
    dest: &mut FlatSurface,
    dest_rect: RectInt,
    src: &FlatSurface,
    src_offset: VectorInt,
    blur_type: BlurType,
    size: Vec2,
) -> RenderResult<()> {
    // dest pixel = src pixel + shift
    let shift = VectorInt::new(dest_rect.minx - src_offset.x, dest_rect.miny - src_offset.y);
    let unshift = VectorInt::new(-shift.x, -shift.y);
    let extra = get_extra_size(blur_type, size);

    let dest_bounds = RectInt::from_size(dest.width(), dest.height());
    let src_bounds = RectInt::from_size(src.width(), src.height());
    let dr = dest_rect.intersect(dest_bounds);
    if !dr.is_valid() {
        return Ok(());
    }
    let sr = dr.offset(unshift).expand(extra).intersect(src_bounds);
    if !sr.is_valid() {
        return Ok(());
    }
    let dr = dr.intersect(sr.offset(shift));
    if !dr.is_valid() {
        return Ok(());
    }

    let (sw, sh) = (sr.width() as usize, sr.height() as usize);
    let cols = engine.get_valid_count(padded_len(sw, extra.x));
    let rows = engine.get_valid_count(padded_len(sh, extra.y));

    let mut planes: Vec<Plane> = (0..4)
        .map(|_| Plane {
            data: vec![Complex::ZERO; rows * cols],
        })
        .collect();
    for r in 0..sh {
        for c in 0..sw {
            let px = src.get(sr.minx + c as i32, sr.miny + r as i32);
            for (plane, v) in planes.iter_mut().zip(px) {
                plane.data[r * cols + c] = Complex::real(f64::from(v));
            }
        }
    }

    let kernel = Kernel::new(engine, blur_type, size, rows, cols)?;
    planes
        .par_iter_mut()
        .try_for_each(|plane| kernel.apply(engine, plane))?;

    for y in dr.miny..dr.maxy {
        let br = (y - shift.y - sr.miny) as usize;
        for x in dr.minx..dr.maxx {
            let bc = (x - shift.x - sr.minx) as usize;
            let i = br * cols + bc;
            let out = [0, 1, 2, 3].map(|ch| planes[ch].data[i].abs() as f32);
            dest.set(x, y, out);
        }
    }
    tracing::trace!(
        ?blur_type,
        sx = size.x,
        sy = size.y,
        rows,
        cols,
        "fft blur"
    );
    Ok(())
}

#[cfg(test)]
#[path = "../../tests/unit/render/blur.rs"]
mod tests;
