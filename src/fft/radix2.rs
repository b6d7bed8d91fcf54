use std::f64::consts::PI;

use crate::fft::{Complex, FourierTransform, check_span};
use crate::foundation::error::{RenderError, RenderResult};

/// Self-contained in-place radix-2 transform.
#[derive(Clone, Copy, Debug, Default)]
pub struct Radix2Fft;

impl FourierTransform for Radix2Fft {
    fn get_valid_count(&self, x: usize) -> usize {
        x.next_power_of_two()
    }

    fn is_valid_count(&self, x: usize) -> bool {
        x.is_power_of_two()
    }

    fn fft(
        &self,
        data: &mut [Complex],
        count: usize,
        stride: usize,
        invert: bool,
    ) -> RenderResult<()> {
        if count <= 1 {
            return Ok(());
        }
        if !self.is_valid_count(count) {
            return Err(RenderError::structural(format!(
                "radix-2 fft length {count} is not a power of two"
            )));
        }
        check_span(data.len(), count, stride)?;

        let at = |i: usize| i * stride;

        // bit reversal
        let mut j = 0usize;
        for i in 1..count {
            let mut bit = count >> 1;
            while j & bit != 0 {
                j ^= bit;
                bit >>= 1;
            }
            j ^= bit;
            if i < j {
                data.swap(at(i), at(j));
            }
        }

        // The butterflies run with the opposite exponent sign; reversing elements 1..count
        // afterwards turns X[k] into X[count - k], which flips the sign back.
        let sign = if invert { -1.0 } else { 1.0 };
        let mut mmax = 1usize;
        while mmax < count {
            let theta = sign * PI / mmax as f64;
            let wtemp = (0.5 * theta).sin();
            // w_p = e^(i theta) - 1, so w += w * w_p rotates w by theta
            let wp = Complex::new(-2.0 * wtemp * wtemp, theta.sin());
            let mut w = Complex::real(1.0);
            for m in 0..mmax {
                let mut i = m;
                while i < count {
                    let k = i + mmax;
                    let t = w * data[at(k)];
                    data[at(k)] = data[at(i)] - t;
                    data[at(i)] += t;
                    i += mmax << 1;
                }
                w += w * wp;
            }
            mmax <<= 1;
        }

        let (mut lo, mut hi) = (1usize, count - 1);
        while lo < hi {
            data.swap(at(lo), at(hi));
            lo += 1;
            hi -= 1;
        }

        if invert {
            let k = 1.0 / count as f64;
            for i in 0..count {
                data[at(i)] = data[at(i)].scale(k);
            }
        }
        Ok(())
    }
}
