use super::*;

fn samples(n: usize, seed: u64) -> Vec<Complex> {
    // xorshift, deterministic across runs
    let mut s = seed.wrapping_mul(0x9e3779b97f4a7c15) | 1;
    let mut next = move || {
        s ^= s << 13;
        s ^= s >> 7;
        s ^= s << 17;
        (s >> 11) as f64 / (1u64 << 53) as f64 * 2.0 - 1.0
    };
    (0..n).map(|_| Complex::new(next(), next())).collect()
}

fn max_err(a: &[Complex], b: &[Complex]) -> f64 {
    a.iter()
        .zip(b)
        .map(|(x, y)| (*x - *y).abs())
        .fold(0.0, f64::max)
}

#[test]
fn valid_count_is_smallest_power_of_two() {
    let f = Radix2Fft;
    for x in 1..=1100usize {
        let v = f.get_valid_count(x);
        assert!(v >= x);
        assert!(f.is_valid_count(v));
        assert!(v == 1 || v / 2 < x, "{v} is not minimal for {x}");
    }
    assert!(f.is_valid_count(1));
    assert!(!f.is_valid_count(0));
    assert!(!f.is_valid_count(12));
}

#[test]
fn direct_dft_accepts_any_positive_length() {
    let f = DirectDft;
    assert_eq!(f.get_valid_count(0), 1);
    assert_eq!(f.get_valid_count(7), 7);
    assert!(f.is_valid_count(7));
    assert!(!f.is_valid_count(0));
}

#[test]
fn impulse_transforms_to_constant() {
    let mut x = vec![Complex::ZERO; 8];
    x[0] = Complex::real(1.0);
    Radix2Fft.fft(&mut x, 8, 1, false).unwrap();
    for v in &x {
        assert!((*v - Complex::real(1.0)).abs() < 1e-12);
    }
}

#[test]
fn forward_uses_negative_exponent() {
    // x[j] = e^(2 pi i j / n) has all its energy in bin 1 under X[k] = sum x[j] e^(-2 pi i jk/n).
    let n = 16;
    let mut x: Vec<Complex> = (0..n)
        .map(|j| Complex::from_angle(2.0 * std::f64::consts::PI * j as f64 / n as f64))
        .collect();
    Radix2Fft.fft(&mut x, n, 1, false).unwrap();
    assert!((x[1] - Complex::real(n as f64)).abs() < 1e-9);
    for (k, v) in x.iter().enumerate() {
        if k != 1 {
            assert!(v.abs() < 1e-9, "bin {k} = {v:?}");
        }
    }
}

#[test]
fn radix2_matches_direct_dft() {
    for &n in &[2usize, 4, 8, 32, 128] {
        for &invert in &[false, true] {
            let x = samples(n, n as u64 + u64::from(invert));
            let mut a = x.clone();
            let mut b = x;
            Radix2Fft.fft(&mut a, n, 1, invert).unwrap();
            DirectDft.fft(&mut b, n, 1, invert).unwrap();
            assert!(max_err(&a, &b) < 1e-9, "n = {n}, invert = {invert}");
        }
    }
}

#[test]
fn round_trip_reproduces_input() {
    for shift in 0..=11 {
        let n = 1usize << shift;
        let x = samples(n, 7 + shift as u64);
        let mut y = x.clone();
        Radix2Fft.fft(&mut y, n, 1, false).unwrap();
        Radix2Fft.fft(&mut y, n, 1, true).unwrap();
        assert!(max_err(&x, &y) < 1e-9, "n = {n}");
    }
}

#[test]
fn parseval_energy_scales_by_length() {
    let n = 256;
    let x = samples(n, 3);
    let mut y = x.clone();
    Radix2Fft.fft(&mut y, n, 1, false).unwrap();
    let ex: f64 = x.iter().map(|v| v.norm_sqr()).sum();
    let ey: f64 = y.iter().map(|v| v.norm_sqr()).sum();
    assert!((ey - ex * n as f64).abs() < 1e-6 * ey);
}

#[test]
fn strided_transform_leaves_other_lanes_untouched() {
    let n = 8;
    let stride = 3;
    let mut data = samples(n * stride, 11);
    let original = data.clone();

    Radix2Fft.fft(&mut data[1..], n, stride, false).unwrap();

    for (i, (a, b)) in data.iter().zip(&original).enumerate() {
        if i % stride != 1 {
            assert_eq!(a, b, "lane element {i} changed");
        }
    }

    let mut lane: Vec<Complex> = (0..n).map(|i| original[1 + i * stride]).collect();
    Radix2Fft.fft(&mut lane, n, 1, false).unwrap();
    let got: Vec<Complex> = (0..n).map(|i| data[1 + i * stride]).collect();
    assert!(max_err(&lane, &got) < 1e-12);
}

#[test]
fn trivial_lengths_are_no_ops() {
    let mut one = vec![Complex::new(2.0, -1.0)];
    Radix2Fft.fft(&mut one, 1, 1, true).unwrap();
    assert_eq!(one[0], Complex::new(2.0, -1.0));

    let mut empty: Vec<Complex> = Vec::new();
    Radix2Fft.fft(&mut empty, 0, 1, false).unwrap();
}

#[test]
fn invalid_lengths_and_spans_are_structural_errors() {
    let mut x = vec![Complex::ZERO; 12];
    let err = Radix2Fft.fft(&mut x, 12, 1, false).unwrap_err();
    assert!(matches!(err, RenderError::Structural(_)));

    let err = Radix2Fft.fft(&mut x, 8, 2, false).unwrap_err();
    assert!(matches!(err, RenderError::Structural(_)));

    let err = Radix2Fft.fft(&mut x, 4, 0, false).unwrap_err();
    assert!(matches!(err, RenderError::Structural(_)));
}

#[test]
fn fft2d_is_separable() {
    let (rows, cols) = (8usize, 16usize);
    for engine in [FftBackend::Radix2, FftBackend::Direct] {
        let f = engine.engine();
        let x = samples(rows * cols, 5);

        let mut both = x.clone();
        f.fft2d(&mut both, rows, cols, cols, 1, false, true, true)
            .unwrap();

        let mut split = x.clone();
        f.fft2d(&mut split, rows, cols, cols, 1, false, true, false)
            .unwrap();
        f.fft2d(&mut split, rows, cols, cols, 1, false, false, true)
            .unwrap();
        assert!(max_err(&both, &split) < 1e-9);

        f.fft2d(&mut both, rows, cols, cols, 1, true, true, true)
            .unwrap();
        assert!(max_err(&both, &x) < 1e-9);
    }
}

#[test]
fn fft2d_rejects_short_buffers() {
    let mut x = vec![Complex::ZERO; 10];
    let err = Radix2Fft
        .fft2d(&mut x, 4, 4, 4, 1, false, true, true)
        .unwrap_err();
    assert!(matches!(err, RenderError::Structural(_)));
}
