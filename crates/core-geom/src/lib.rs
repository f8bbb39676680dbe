//! Airfoil geometry model.
//!
//! A [`Geometry`] owns the ordered contour of an airfoil (upper trailing
//! edge over the leading edge back to the lower trailing edge) together
//! with one of four interchangeable strategies: a linear baseline, a cubic
//! spline contour, a parametric Bézier pair, or a Hicks-Henne seed with
//! bump functions. Derived [`Line`]s (upper, lower, thickness, camber) and
//! the [`Curvature`] are built lazily and invalidated on every mutation.
//!
//! Mutators operate on a scratch copy of the coordinates: on failure the
//! scratch is dropped and the geometry keeps its previous valid state, on
//! success it is committed and the modification recorded.

pub mod curvature;
pub mod geometry;
pub mod line;
pub mod modify;
pub mod repanel;
pub mod side;

pub use curvature::Curvature;
pub use geometry::{Geometry, GeometryEvent, GeometryObserver, Strategy};
pub use line::{Line, LineType};
pub use modify::PanelCount;
pub use side::{BezierSide, HicksHenneSide};

use thiserror::Error;

/// Distance below which the splined LE counts as coincident with (0,0).
pub const EPSILON_LE_CLOSE: f64 = 1e-6;

/// Errors of geometry construction and mutation.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum GeometryError {
    #[error("invalid coordinates: {reason}")]
    InvalidCoordinates { reason: String },
    #[error("normalization failed: {reason}")]
    NormalizationFailed { reason: String },
    #[error("leading edge search on spline failed")]
    LeFindFailed,
    #[error("{op} is not supported by the {strategy:?} strategy")]
    Unsupported { op: &'static str, strategy: Strategy },
    #[error(transparent)]
    Spline(#[from] core_spline::SplineError),
}

/// A recorded modification of the geometry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModKind {
    Normalize,
    Repanel,
    MaxThick,
    MaxCamb,
    MaxUpper,
    MaxLower,
    TeGap,
    LeRadius,
    Blend,
}

impl ModKind {
    /// Short fragment used when composing a modified airfoil name.
    pub fn short(&self) -> &'static str {
        match self {
            ModKind::Normalize => "norm",
            ModKind::Repanel => "p",
            ModKind::MaxThick => "t",
            ModKind::MaxCamb => "c",
            ModKind::MaxUpper => "u",
            ModKind::MaxLower => "l",
            ModKind::TeGap => "te",
            ModKind::LeRadius => "r",
            ModKind::Blend => "blend",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ModKind::Normalize => "normalized",
            ModKind::Repanel => "repan",
            ModKind::MaxThick => "thickness",
            ModKind::MaxCamb => "camber",
            ModKind::MaxUpper => "upper",
            ModKind::MaxLower => "lower",
            ModKind::TeGap => "te_gap",
            ModKind::LeRadius => "le_radius",
            ModKind::Blend => "blend",
        }
    }
}

/// One entry of the modification record.
#[derive(Debug, Clone, PartialEq)]
pub struct Modification {
    pub kind: ModKind,
    pub value: String,
}

impl Modification {
    pub fn as_label(&self) -> String {
        if self.value.is_empty() {
            self.kind.short().to_string()
        } else {
            format!("{}{}", self.kind.short(), self.value)
        }
    }
}
