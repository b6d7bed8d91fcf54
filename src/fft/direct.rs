use std::f64::consts::PI;

use crate::fft::{Complex, FourierTransform, check_span};
use crate::foundation::error::RenderResult;

/// Direct evaluation of the DFT sum. Accepts any length.
#[derive(Clone, Copy, Debug, Default)]
pub struct DirectDft;

impl FourierTransform for DirectDft {
    fn get_valid_count(&self, x: usize) -> usize {
        x.max(1)
    }

    fn is_valid_count(&self, x: usize) -> bool {
        x > 0
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
        check_span(data.len(), count, stride)?;

        let input: Vec<Complex> = (0..count).map(|i| data[i * stride]).collect();
        let sign = if invert { 1.0 } else { -1.0 };
        let step = sign * 2.0 * PI / count as f64;
        let norm = if invert { 1.0 / count as f64 } else { 1.0 };

        for k in 0..count {
            let mut acc = Complex::ZERO;
            for (j, x) in input.iter().enumerate() {
                // reduce the exponent first to keep the angle small
                let e = (j * k) % count;
                acc += *x * Complex::from_angle(step * e as f64);
            }
            data[k * stride] = acc.scale(norm);
        }
        Ok(())
    }
}
