use crate::foundation::core::{ColorF, Rgba8};
use crate::surface::{SurfaceDesc, SurfaceFormat};

/// Row-major buffer of premultiplied `f32` pixels.
#[derive(Clone, Debug, PartialEq)]
pub struct FlatSurface {
    width: u32,
    height: u32,
    data: Vec<ColorF>,
}

/// Row-major buffer of premultiplied RGBA8 pixels.
#[derive(Clone, Debug, PartialEq)]
pub struct PackedSurface {
    width: u32,
    height: u32,
    data: Vec<Rgba8>,
}

macro_rules! impl_pixel_buffer {
    ($ty:ty, $px:ty) => {
        impl $ty {
            /// Transparent buffer of the given size.
            pub fn new(width: u32, height: u32) -> Self {
                let len = (width as usize).saturating_mul(height as usize);
                Self {
                    width,
                    height,
                    data: vec![<$px>::default(); len],
                }
            }

            /// Width in pixels.
            pub fn width(&self) -> u32 {
                self.width
            }

            /// Height in pixels.
            pub fn height(&self) -> u32 {
                self.height
            }

            /// All pixels, row-major.
            pub fn pixels(&self) -> &[$px] {
                &self.data
            }

            /// All pixels, row-major.
            pub fn pixels_mut(&mut self) -> &mut [$px] {
                &mut self.data
            }

            /// Buffer index of `(x, y)`, or `None` outside the surface.
            pub fn index(&self, x: i32, y: i32) -> Option<usize> {
                let x = u32::try_from(x).ok().filter(|&x| x < self.width)?;
                let y = u32::try_from(y).ok().filter(|&y| y < self.height)?;
                Some(y as usize * self.width as usize + x as usize)
            }

            /// Pixel at `(x, y)`; transparent outside the surface.
            pub fn get(&self, x: i32, y: i32) -> $px {
                self.index(x, y)
                    .map(|i| self.data[i])
                    .unwrap_or_default()
            }

            /// Overwrite the pixel at `(x, y)`; ignored outside the surface.
            pub fn set(&mut self, x: i32, y: i32, px: $px) {
                if let Some(i) = self.index(x, y) {
                    self.data[i] = px;
                }
            }

            /// Reset every pixel to transparent.
            pub fn clear(&mut self) {
                self.data.fill(<$px>::default());
            }
        }
    };
}

impl_pixel_buffer!(FlatSurface, ColorF);
impl_pixel_buffer!(PackedSurface, Rgba8);

impl FlatSurface {
    /// Pixel at `(x, y)` as float color.
    pub fn color(&self, x: i32, y: i32) -> ColorF {
        self.get(x, y)
    }
}

impl PackedSurface {
    /// Pixel at `(x, y)` as float color.
    pub fn color(&self, x: i32, y: i32) -> ColorF {
        unpack(self.get(x, y))
    }
}

/// Backing memory of one surface in either representation.
#[derive(Clone, Debug, PartialEq)]
pub enum SurfaceData {
    /// Float pixels.
    Flat(FlatSurface),
    /// 8-bit pixels.
    Packed(PackedSurface),
}

impl SurfaceData {
    /// Transparent buffer matching `desc`.
    pub fn new(desc: &SurfaceDesc) -> Self {
        match desc.format {
            SurfaceFormat::Flat => Self::Flat(FlatSurface::new(desc.width, desc.height)),
            SurfaceFormat::Packed => Self::Packed(PackedSurface::new(desc.width, desc.height)),
        }
    }

    /// Representation of the buffer.
    pub fn format(&self) -> SurfaceFormat {
        match self {
            Self::Flat(_) => SurfaceFormat::Flat,
            Self::Packed(_) => SurfaceFormat::Packed,
        }
    }

    /// Width in pixels.
    pub fn width(&self) -> u32 {
        match self {
            Self::Flat(s) => s.width(),
            Self::Packed(s) => s.width(),
        }
    }

    /// Height in pixels.
    pub fn height(&self) -> u32 {
        match self {
            Self::Flat(s) => s.height(),
            Self::Packed(s) => s.height(),
        }
    }

    /// Bytes held by the buffer.
    pub fn byte_len(&self) -> usize {
        (self.width() as usize)
            .saturating_mul(self.height() as usize)
            .saturating_mul(self.format().bytes_per_pixel())
    }

    /// `true` when the buffer can back `desc`.
    pub fn matches(&self, desc: &SurfaceDesc) -> bool {
        self.format() == desc.format && self.width() == desc.width && self.height() == desc.height
    }

    /// Pixel at `(x, y)` as premultiplied float color; transparent outside.
    pub fn color(&self, x: i32, y: i32) -> ColorF {
        match self {
            Self::Flat(s) => s.color(x, y),
            Self::Packed(s) => s.color(x, y),
        }
    }

    /// Store a premultiplied float color at `(x, y)`.
    pub fn put(&mut self, x: i32, y: i32, c: ColorF) {
        match self {
            Self::Flat(s) => s.set(x, y, c),
            Self::Packed(s) => s.set(x, y, pack(c)),
        }
    }

    /// Reset every pixel to transparent.
    pub fn clear(&mut self) {
        match self {
            Self::Flat(s) => s.clear(),
            Self::Packed(s) => s.clear(),
        }
    }
}

/// Quantize a premultiplied float color.
pub fn pack(c: ColorF) -> Rgba8 {
    c.map(|v| (v.clamp(0.0, 1.0) * 255.0).round() as u8)
}

/// Expand a premultiplied 8-bit color.
pub fn unpack(p: Rgba8) -> ColorF {
    p.map(|v| f32::from(v) / 255.0)
}

/// Straight color of a premultiplied one; fully transparent input gives zero.
pub fn unpremultiply(c: ColorF) -> ColorF {
    let a = c[3];
    if a.abs() <= f32::EPSILON {
        return [0.0; 4];
    }
    [c[0] / a, c[1] / a, c[2] / a, a]
}

/// Premultiplied color of a straight one.
pub fn premultiply(c: ColorF) -> ColorF {
    let a = c[3];
    [c[0] * a, c[1] * a, c[2] * a, a]
}
