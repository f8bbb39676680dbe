//! Polars of an airfoil.
//!
//! A [`PolarDef`] is the recipe (type, Reynolds, Mach, Ncrit, transition,
//! spec variable and range, optional flap); a [`Polar`] is a definition
//! plus its operating points once generated or loaded; a [`PolarSet`]
//! manages the polars of one airfoil.

pub mod air;
pub mod definition;
pub mod point;
pub mod polar;
pub mod set;

pub use definition::{PolarDef, PolarType, SpecVar, ValRange};
pub use point::PolarPoint;
pub use polar::Polar;
pub use set::{PolarPathResolver, PolarSet};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PolarError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("polar file {path}: {reason}")]
    LoadFailed { path: String, reason: String },
    #[error("polar generation failed: {0}")]
    GenerationFailed(String),
}

/// A polar variable, one axis of a polar diagram.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PolarVar {
    Alpha,
    Cl,
    Cd,
    /// Pressure drag.
    Cdp,
    /// Friction drag `cd - cdp`.
    Cdf,
    /// Glide ratio `cl/cd`.
    Glide,
    Cm,
    /// Reynolds number per operating point (T2 polars vary with cl).
    ReCalc,
    /// Sink rate figure `cl^1.5/cd`.
    Sink,
    Xtrt,
    Xtrb,
    /// Mean of the transition points `(xtrt + xtrb) / 2`.
    Xtr,
}

impl PolarVar {
    pub fn as_str(&self) -> &'static str {
        match self {
            PolarVar::Alpha => "alpha",
            PolarVar::Cl => "cl",
            PolarVar::Cd => "cd",
            PolarVar::Cdp => "cdp",
            PolarVar::Cdf => "cdf",
            PolarVar::Glide => "cl/cd",
            PolarVar::Cm => "cm",
            PolarVar::ReCalc => "Re",
            PolarVar::Sink => "sink",
            PolarVar::Xtrt => "xtrt",
            PolarVar::Xtrb => "xtrb",
            PolarVar::Xtr => "xtr",
        }
    }

    /// The variables offered for diagram axes (the internal helper
    /// channels cdf and xtr stay out).
    pub fn values() -> Vec<PolarVar> {
        vec![
            PolarVar::Alpha,
            PolarVar::Cl,
            PolarVar::Cd,
            PolarVar::Cdp,
            PolarVar::Glide,
            PolarVar::Cm,
            PolarVar::ReCalc,
            PolarVar::Sink,
            PolarVar::Xtrt,
            PolarVar::Xtrb,
        ]
    }
}

impl std::fmt::Display for PolarVar {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
