//! Numeric curve primitives for the airfoil model.
//!
//! A [`Spline1d`] is a C2 piecewise-cubic interpolant over strictly
//! increasing abscissae, a [`Spline2d`] parameterizes a point sequence by
//! normalized arc length, and [`Bezier`] is a parametric curve of arbitrary
//! degree. [`HicksHenne`] is the localized bump function used by the
//! Hicks-Henne airfoil representation. The scalar search helpers
//! (bisection, interpolation, 1-D Nelder-Mead) live in [`util`].

pub mod bezier;
pub mod cubic;
pub mod hicks_henne;
pub mod spline2d;
pub mod util;

pub use bezier::Bezier;
pub use cubic::{Boundary, Spline1d};
pub use hicks_henne::HicksHenne;
pub use spline2d::Spline2d;

use thiserror::Error;

/// Errors raised by the curve primitives.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SplineError {
    #[error("at least {min} points required, got {got}")]
    TooFewPoints { min: usize, got: usize },
    #[error("x values must be strictly increasing at index {index}")]
    NotIncreasing { index: usize },
    #[error("x and y length differ: {nx} vs {ny}")]
    LengthMismatch { nx: usize, ny: usize },
    #[error("spline coefficient system is singular")]
    SingularSystem,
    #[error("root search did not converge")]
    NoConvergence,
}
