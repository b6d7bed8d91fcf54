use crate::foundation::core::{ColorF, Vec2};
use crate::surface::{ANY_TO_FLAT, FLAT_ONLY, PACKED_WRITER, SurfaceCapability};
use crate::transform::TransformationStack;

/// Blur kernel family.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlurType {
    /// Separable box filter.
    Box,
    /// Sum of a horizontal and a vertical box filter.
    Cross,
    /// Round disc filter (full 2D pattern).
    Disc,
    /// Separable gaussian filter.
    #[default]
    Gaussian,
    /// Gaussian variant; same kernel on the software backend.
    FastGaussian,
}

/// Blending operator of a [`TaskKind::Blend`] task.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlendMethod {
    /// Source over destination.
    #[default]
    Composite,
    /// Replace destination by source, weighted by amount.
    Straight,
    /// Additive.
    Add,
    /// Multiply.
    Multiply,
    /// Screen.
    Screen,
}

/// Per-pixel color correction parameters.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct ColorCorrection {
    /// Gamma applied to straight color channels.
    pub gamma: f32,
    /// Added to straight color channels.
    pub brightness: f32,
    /// Multiplies distance from mid grey.
    pub contrast: f32,
    /// Straight color channels are multiplied by `e^exposure`.
    pub exposure: f32,
}

impl Default for ColorCorrection {
    fn default() -> Self {
        Self {
            gamma: 1.0,
            brightness: 0.0,
            contrast: 1.0,
            exposure: 0.0,
        }
    }
}

/// What a task does.
#[derive(Clone, Debug)]
pub enum TaskKind {
    /// Bind backing memory to the target surface.
    SurfaceCreate,
    /// Release the target surface's backing memory.
    SurfaceDestroy,
    /// Copy the single sub-task's surface into the target, changing representation.
    SurfaceConvert,
    /// Fill the target rectangle with a premultiplied color.
    Solid {
        /// Fill color.
        color: ColorF,
    },
    /// Blur the single sub-task's surface.
    Blur {
        /// Kernel family.
        blur_type: BlurType,
        /// Kernel size in source units.
        size: Vec2,
    },
    /// Color-correct the single sub-task's surface.
    ColorCorrect(ColorCorrection),
    /// Blend sub-task 1 (source) over sub-task 0 (destination).
    Blend {
        /// Operator.
        method: BlendMethod,
        /// Source weight in `[0, 1]`.
        amount: f32,
    },
    /// Resample the single sub-task's surface through a transformation chain.
    Transformation {
        /// Maps target coordinates to source coordinates.
        stack: TransformationStack,
    },
}

impl TaskKind {
    /// Short stable name used by logs, progress callbacks and plan dumps.
    pub fn name(&self) -> &'static str {
        match self {
            Self::SurfaceCreate => "surface_create",
            Self::SurfaceDestroy => "surface_destroy",
            Self::SurfaceConvert => "surface_convert",
            Self::Solid { .. } => "solid",
            Self::Blur { .. } => "blur",
            Self::ColorCorrect(_) => "color_correct",
            Self::Blend { .. } => "blend",
            Self::Transformation { .. } => "transformation",
        }
    }

    /// Surface representations this kind of task supports on the software backend.
    ///
    /// Structural tasks have none: they accept any representation.
    pub fn capability(&self) -> Option<&'static dyn SurfaceCapability> {
        match self {
            Self::SurfaceCreate | Self::SurfaceDestroy | Self::SurfaceConvert => None,
            Self::Solid { .. } => Some(&PACKED_WRITER),
            Self::Blur { .. } | Self::ColorCorrect(_) | Self::Blend { .. } => Some(&FLAT_ONLY),
            Self::Transformation { .. } => Some(&ANY_TO_FLAT),
        }
    }

    /// Number of sub-tasks the kind expects, if fixed.
    pub fn arity(&self) -> Option<usize> {
        match self {
            Self::SurfaceCreate | Self::SurfaceDestroy | Self::Solid { .. } => Some(0),
            Self::SurfaceConvert
            | Self::Blur { .. }
            | Self::ColorCorrect(_)
            | Self::Transformation { .. } => Some(1),
            Self::Blend { .. } => Some(2),
        }
    }
}
