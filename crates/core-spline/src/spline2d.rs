//! 2-D parametric cubic spline over a point sequence.

use crate::{Boundary, Spline1d, SplineError};

/// Point sequence parameterized by normalized arc length `u ∈ [0,1]`.
///
/// `u` is the cumulative chord length of the polyline scaled to `[0,1]`;
/// `x(u)` and `y(u)` are independent [`Spline1d`] interpolants sharing the
/// same knots.
#[derive(Debug, Clone)]
pub struct Spline2d {
    u: Vec<f64>,
    splx: Spline1d,
    sply: Spline1d,
}

impl Spline2d {
    pub fn new(x: &[f64], y: &[f64], boundary: Boundary) -> Result<Self, SplineError> {
        if x.len() != y.len() {
            return Err(SplineError::LengthMismatch {
                nx: x.len(),
                ny: y.len(),
            });
        }
        if x.len() < 3 {
            return Err(SplineError::TooFewPoints {
                min: 3,
                got: x.len(),
            });
        }

        let mut u = vec![0.0; x.len()];
        for i in 1..x.len() {
            let dx = x[i] - x[i - 1];
            let dy = y[i] - y[i - 1];
            u[i] = u[i - 1] + (dx * dx + dy * dy).sqrt();
        }
        let total = u[x.len() - 1];
        if total == 0.0 {
            return Err(SplineError::NotIncreasing { index: 1 });
        }
        for ui in u.iter_mut() {
            *ui /= total;
        }
        u[x.len() - 1] = 1.0;

        let splx = Spline1d::new(&u, x, boundary)?;
        let sply = Spline1d::new(&u, y, boundary)?;
        Ok(Self { u, splx, sply })
    }

    /// Knot parameter values, ascending from 0 to 1.
    pub fn u(&self) -> &[f64] {
        &self.u
    }

    /// `(x, y)` or its `der`-th parametric derivative at `u`.
    pub fn eval(&self, u: f64, der: u8) -> (f64, f64) {
        (self.splx.eval(u, der), self.sply.eval(u, der))
    }

    pub fn evalx(&self, u: f64) -> f64 {
        self.splx.eval(u, 0)
    }

    pub fn evaly(&self, u: f64) -> f64 {
        self.sply.eval(u, 0)
    }

    /// Signed curvature `(x'y'' - y'x'') / (x'^2 + y'^2)^(3/2)` at `u`.
    pub fn curvature(&self, u: f64) -> f64 {
        let (dx, dy) = self.eval(u, 1);
        let (ddx, ddy) = self.eval(u, 2);
        let denom = (dx * dx + dy * dy).powf(1.5);
        if denom == 0.0 {
            0.0
        } else {
            (dx * ddy - dy * ddx) / denom
        }
    }
}
