use super::*;
use crate::fft::{DirectDft, Radix2Fft};

fn sum(p: &[Complex]) -> f64 {
    p.iter().map(|x| x.re).sum()
}

fn assert_close(a: f64, b: f64, eps: f64) {
    assert!((a - b).abs() < eps, "{a} != {b} (eps {eps})");
}

fn impulse(w: u32, h: u32, x: i32, y: i32) -> FlatSurface {
    let mut s = FlatSurface::new(w, h);
    s.set(x, y, [1.0, 0.5, 0.25, 1.0]);
    s
}

fn total_alpha(s: &FlatSurface) -> f64 {
    s.pixels().iter().map(|p| f64::from(p[3])).sum()
}

#[test]
fn gauss_degenerates_to_impulse() {
    assert_eq!(gauss(0.0, 0.0), 1.0);
    assert_eq!(gauss(1.0, 0.0), 0.0);
    let area: f64 = (-400..=400).map(|i| gauss(f64::from(i) * 0.05, 2.0) * 0.05).sum();
    assert_close(area, 1.0, 1e-6);
}

#[test]
fn extra_size_covers_kernel() {
    assert_eq!(
        get_extra_size(BlurType::Box, Vec2::new(2.0, 0.0)),
        VectorInt::new(3, 1)
    );
    assert_eq!(
        get_extra_size(BlurType::Disc, Vec2::new(-1.5, 1.0)),
        VectorInt::new(2, 2)
    );
    // gaussian margin is cut at 1/4096 of the peak, about 3.85 sigma
    assert_eq!(
        get_extra_size(BlurType::Gaussian, Vec2::new(1.0, 2.0)),
        VectorInt::new(5, 9)
    );
}

#[test]
fn box_pattern_is_normalized_and_symmetric() {
    for size in [0.0, 0.3, 0.7, 1.0, 2.5] {
        let mut p = vec![Complex::ZERO; 32];
        fill_pattern_box(&mut p, size);
        assert_close(sum(&p), 1.0, 1e-12);
        for i in 1..16 {
            assert_eq!(p[i], p[32 - i]);
        }
    }

    let mut p = vec![Complex::ZERO; 16];
    fill_pattern_box(&mut p, 1.0);
    assert_close(p[0].re, 1.0 / 3.0, 1e-12);
    assert_close(p[1].re, 1.0 / 3.0, 1e-12);
    assert_eq!(p[2], Complex::ZERO);
}

#[test]
fn gauss_pattern_is_normalized() {
    let mut p = vec![Complex::ZERO; 64];
    fill_pattern_gauss(&mut p, 2.0);
    assert_close(sum(&p), 1.0, 1e-6);
    assert_eq!(p[3], p[61]);

    let mut identity = vec![Complex::ZERO; 8];
    fill_pattern_gauss(&mut identity, 0.0);
    assert_eq!(identity[0], Complex::real(1.0));
    assert_close(sum(&identity), 1.0, f64::EPSILON);
}

#[test]
fn disc_pattern_is_normalized_and_round() {
    let (rows, cols) = (16, 16);
    let mut p = vec![Complex::ZERO; rows * cols];
    fill_pattern_disc(&mut p, rows, cols, Vec2::new(2.5, 2.5));
    assert_close(sum(&p), 1.0, 1e-12);
    // center and axis points are inside, the corner of the bounding square is not
    assert!(p[0].re > 0.0);
    assert!(p[3].re > 0.0);
    assert_eq!(p[3 * cols + 3], Complex::ZERO);
    assert_eq!(p[cols + 1], p[(rows - 1) * cols + cols - 1]);
}

#[test]
fn zero_size_gaussian_is_identity() {
    let src = impulse(8, 8, 3, 4);
    let mut dest = FlatSurface::new(8, 8);
    blur(
        &Radix2Fft,
        &mut dest,
        RectInt::from_size(8, 8),
        &src,
        VectorInt::default(),
        BlurType::Gaussian,
        Vec2::ZERO,
    )
    .unwrap();
    for (a, b) in dest.pixels().iter().zip(src.pixels()) {
        for ch in 0..4 {
            assert!((a[ch] - b[ch]).abs() < 1e-6);
        }
    }
}

#[test]
fn blur_preserves_energy() {
    for blur_type in [
        BlurType::Box,
        BlurType::Gaussian,
        BlurType::Disc,
        BlurType::Cross,
    ] {
        let src = impulse(32, 32, 16, 16);
        let mut dest = FlatSurface::new(32, 32);
        blur(
            &Radix2Fft,
            &mut dest,
            RectInt::from_size(32, 32),
            &src,
            VectorInt::default(),
            blur_type,
            Vec2::new(2.0, 2.0),
        )
        .unwrap();
        assert_close(total_alpha(&dest), 1.0, 1e-3);
        // the impulse spreads out
        assert!(dest.get(16, 16)[3] < 0.9, "{blur_type:?}");
        assert!(dest.get(17, 16)[3] > 0.0, "{blur_type:?}");
    }
}

#[test]
fn uniform_interior_is_unchanged() {
    let mut src = FlatSurface::new(16, 16);
    for p in src.pixels_mut() {
        *p = [0.5, 0.25, 0.0, 0.5];
    }
    let mut dest = FlatSurface::new(16, 16);
    blur(
        &Radix2Fft,
        &mut dest,
        RectInt::from_size(16, 16),
        &src,
        VectorInt::default(),
        BlurType::Box,
        Vec2::new(1.0, 1.0),
    )
    .unwrap();
    let c = dest.get(8, 8);
    assert!((c[0] - 0.5).abs() < 1e-5);
    assert!((c[1] - 0.25).abs() < 1e-5);
    assert!((c[3] - 0.5).abs() < 1e-5);
}

#[test]
fn engines_agree_on_power_of_two_regions() {
    let src = impulse(16, 16, 5, 9);
    let mut a = FlatSurface::new(16, 16);
    let mut b = FlatSurface::new(16, 16);
    for (engine, dest) in [
        (&Radix2Fft as &dyn FourierTransform, &mut a),
        (&DirectDft as &dyn FourierTransform, &mut b),
    ] {
        blur(
            engine,
            dest,
            RectInt::from_size(16, 16),
            &src,
            VectorInt::default(),
            BlurType::Gaussian,
            Vec2::new(1.5, 0.5),
        )
        .unwrap();
    }
    for (x, y) in a.pixels().iter().zip(b.pixels()) {
        for ch in 0..4 {
            assert!((x[ch] - y[ch]).abs() < 1e-6);
        }
    }
}

#[test]
fn only_dest_rect_is_written() {
    let mut src = FlatSurface::new(8, 8);
    for p in src.pixels_mut() {
        *p = [1.0; 4];
    }
    let mut dest = FlatSurface::new(8, 8);
    blur(
        &Radix2Fft,
        &mut dest,
        RectInt::new(2, 2, 4, 4),
        &src,
        VectorInt::new(2, 2),
        BlurType::Box,
        Vec2::new(1.0, 1.0),
    )
    .unwrap();
    assert_eq!(dest.get(0, 0), [0.0; 4]);
    assert_eq!(dest.get(5, 5), [0.0; 4]);
    assert!(dest.get(2, 2)[3] > 0.0);
    assert!(dest.get(3, 3)[3] > 0.0);
}

#[test]
fn empty_rects_are_noops() {
    let src = impulse(4, 4, 1, 1);
    let mut dest = FlatSurface::new(4, 4);
    blur(
        &Radix2Fft,
        &mut dest,
        RectInt::new(10, 10, 12, 12),
        &src,
        VectorInt::default(),
        BlurType::Box,
        Vec2::new(1.0, 1.0),
    )
    .unwrap();
    assert!(dest.pixels().iter().all(|p| *p == [0.0; 4]));
}

#[test]
fn edges_do_not_wrap_around() {
    let mut src = FlatSurface::new(8, 1);
    src.set(0, 0, [1.0; 4]);
    for engine in [&Radix2Fft as &dyn FourierTransform, &DirectDft] {
        let mut dest = FlatSurface::new(8, 1);
        blur(
            engine,
            &mut dest,
            RectInt::from_size(8, 1),
            &src,
            VectorInt::default(),
            BlurType::Box,
            Vec2::new(1.0, 0.0),
        )
        .unwrap();
        assert!((dest.get(0, 0)[3] - 1.0 / 3.0).abs() < 1e-5);
        assert!((dest.get(1, 0)[3] - 1.0 / 3.0).abs() < 1e-5);
        assert!(dest.get(2, 0)[3].abs() < 1e-5);
        // the far edge stays transparent
        assert!(dest.get(7, 0)[3].abs() < 1e-5);
    }
}

#[test]
fn padded_len_is_bounded_by_source() {
    assert_eq!(padded_len(8, 2), 12);
    assert_eq!(padded_len(8, 0), 8);
    assert_eq!(padded_len(8, i32::MAX), 16);
    assert_eq!(padded_len(8, -3), 8);
}
