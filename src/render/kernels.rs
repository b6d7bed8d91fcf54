//! Per-pixel kernels of the software backend.
//!
//! Pixel-aligned kernels read their inputs at `dest pixel - dest_rect.min + src_offset`; reads
//! outside an input surface are transparent. All colors are premultiplied.

use crate::foundation::core::{ColorF, Point, Rect, RectInt, VectorInt, map_point};
use crate::render::pixels::{FlatSurface, SurfaceData, premultiply, unpremultiply};
use crate::task::{BlendMethod, ColorCorrection};
use crate::transform::TransformationStack;

const EPSILON: f32 = 1e-6;

fn clipped(dest_rect: RectInt, width: u32, height: u32) -> RectInt {
    dest_rect.intersect(RectInt::from_size(width, height))
}

/// Copy `src` into `dest`, converting representation.
pub fn convert(dest: &mut SurfaceData, dest_rect: RectInt, src: &SurfaceData, src_offset: VectorInt) {
    let dr = clipped(dest_rect, dest.width(), dest.height());
    for y in dr.miny..dr.maxy {
        for x in dr.minx..dr.maxx {
            let c = src.color(
                x - dest_rect.minx + src_offset.x,
                y - dest_rect.miny + src_offset.y,
            );
            dest.put(x, y, c);
        }
    }
}

/// Fill `dest_rect` with `color`.
pub fn fill_solid(dest: &mut SurfaceData, dest_rect: RectInt, color: ColorF) {
    let dr = clipped(dest_rect, dest.width(), dest.height());
    for y in dr.miny..dr.maxy {
        for x in dr.minx..dr.maxx {
            dest.put(x, y, color);
        }
    }
}

/// Color correction of one premultiplied pixel. Alpha is preserved.
pub fn color_correct_pixel(c: ColorF, cc: &ColorCorrection) -> ColorF {
    if c[3].abs() <= EPSILON {
        return [0.0; 4];
    }
    let s = unpremultiply(c);
    let exposure = cc.exposure.exp();
    let gamma = (cc.gamma > EPSILON && (cc.gamma - 1.0).abs() > EPSILON).then(|| 1.0 / cc.gamma);
    let channel = |v: f32| {
        let mut v = v;
        if let Some(inv) = gamma {
            v = v.max(0.0).powf(inv);
        }
        v *= exposure;
        v += cc.brightness;
        v = (v - 0.5) * cc.contrast + 0.5;
        v.max(0.0)
    };
    premultiply([channel(s[0]), channel(s[1]), channel(s[2]), s[3]])
}

/// Color-correct `src` into `dest_rect` of `dest`.
pub fn color_correct(
    dest: &mut FlatSurface,
    dest_rect: RectInt,
    src: &FlatSurface,
    src_offset: VectorInt,
    cc: &ColorCorrection,
) {
    let dr = clipped(dest_rect, dest.width(), dest.height());
    for y in dr.miny..dr.maxy {
        for x in dr.minx..dr.maxx {
            let c = src.get(
                x - dest_rect.minx + src_offset.x,
                y - dest_rect.miny + src_offset.y,
            );
            dest.set(x, y, color_correct_pixel(c, cc));
        }
    }
}

/// Blend premultiplied `over` onto premultiplied `under` with weight `amount`.
pub fn blend_pixel(method: BlendMethod, over: ColorF, under: ColorF, amount: f32) -> ColorF {
    match method {
        BlendMethod::Composite => {
            let k = 1.0 - over[3] * amount;
            [0, 1, 2, 3].map(|i| over[i] * amount + under[i] * k)
        }
        BlendMethod::Straight => [0, 1, 2, 3].map(|i| (over[i] - under[i]) * amount + under[i]),
        BlendMethod::Add => {
            let a = under[3];
            let us = unpremultiply(under);
            let rgb = [0, 1, 2].map(|i| us[i] * a + over[i] * amount);
            premultiply([rgb[0], rgb[1], rgb[2], a])
        }
        BlendMethod::Multiply => {
            let a = under[3];
            let (us, os) = (unpremultiply(under), unpremultiply(over));
            let k = amount * over[3];
            let rgb = [0, 1, 2].map(|i| (us[i] * os[i] - us[i]) * k + us[i]);
            premultiply([rgb[0], rgb[1], rgb[2], a])
        }
        BlendMethod::Screen => {
            let a = under[3];
            let (us, os) = (unpremultiply(under), unpremultiply(over));
            let k = amount * over[3];
            let rgb = [0, 1, 2].map(|i| {
                let screen = 1.0 - (1.0 - os[i]) * (1.0 - us[i]);
                screen * k + us[i] * (1.0 - k)
            });
            premultiply([rgb[0], rgb[1], rgb[2], a])
        }
    }
}

/// Blend `over` onto `under` into `dest_rect` of `dest`.
#[allow(clippy::too_many_arguments)]
pub fn blend(
    dest: &mut FlatSurface,
    dest_rect: RectInt,
    under: &FlatSurface,
    under_offset: VectorInt,
    over: &FlatSurface,
    over_offset: VectorInt,
    method: BlendMethod,
    amount: f32,
) {
    let dr = clipped(dest_rect, dest.width(), dest.height());
    for y in dr.miny..dr.maxy {
        for x in dr.minx..dr.maxx {
            let (lx, ly) = (x - dest_rect.minx, y - dest_rect.miny);
            let u = under.get(lx + under_offset.x, ly + under_offset.y);
            let o = over.get(lx + over_offset.x, ly + over_offset.y);
            dest.set(x, y, blend_pixel(method, o, u, amount));
        }
    }
}

/// Bilinear sample at continuous pixel coordinates (pixel centers at `i + 0.5`).
pub fn sample_bilinear(src: &SurfaceData, p: Point) -> ColorF {
    let (fx, fy) = (p.x - 0.5, p.y - 0.5);
    let (x0, y0) = (fx.floor(), fy.floor());
    let (tx, ty) = ((fx - x0) as f32, (fy - y0) as f32);
    let (x0, y0) = (x0 as i32, y0 as i32);
    let c00 = src.color(x0, y0);
    let c10 = src.color(x0 + 1, y0);
    let c01 = src.color(x0, y0 + 1);
    let c11 = src.color(x0 + 1, y0 + 1);
    [0, 1, 2, 3].map(|i| {
        let top = c00[i] + (c10[i] - c00[i]) * tx;
        let bottom = c01[i] + (c11[i] - c01[i]) * tx;
        top + (bottom - top) * ty
    })
}

/// Resample `src` through `stack` into `dest_rect` of `dest`.
///
/// Each destination pixel center is mapped to logical coordinates via
/// `dest_rect -> dest_source_rect`, through the stack, and back to source pixels via
/// `src_source_rect -> src_rect`. Points the stack hides stay transparent.
#[allow(clippy::too_many_arguments)]
pub fn transform(
    dest: &mut FlatSurface,
    dest_rect: RectInt,
    dest_source_rect: Rect,
    src: &SurfaceData,
    src_rect: RectInt,
    src_source_rect: Rect,
    stack: &TransformationStack,
) {
    let dr = clipped(dest_rect, dest.width(), dest.height());
    let (dest_px, src_px) = (dest_rect.to_rect(), src_rect.to_rect());
    for y in dr.miny..dr.maxy {
        for x in dr.minx..dr.maxx {
            let center = Point::new(f64::from(x) + 0.5, f64::from(y) + 0.5);
            let logical = map_point(center, dest_px, dest_source_rect);
            let tp = stack.transform(logical);
            let c = if tp.visible {
                sample_bilinear(src, map_point(tp.p, src_source_rect, src_px))
            } else {
                [0.0; 4]
            };
            dest.set(x, y, c);
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/kernels.rs"]
mod tests;
