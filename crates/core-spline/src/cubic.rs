//! 1-D cubic spline interpolation.
//!
//! Coefficients are solved from the full linear system with an LU
//! factorization; point counts stay in the low hundreds for airfoil work,
//! so the dense solve is not a bottleneck (the repanel bench keeps an eye
//! on it).

use nalgebra::{DMatrix, DVector};
use std::f64::consts::PI;

use crate::{util, SplineError};

/// End condition of a [`Spline1d`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Boundary {
    /// Second derivative zero at both ends.
    Natural,
    /// Third derivative continuous over the first and last interior knot.
    #[default]
    NotAKnot,
    /// Closed curve: value, first and second derivative wrap around.
    Periodic,
}

/// C2 piecewise-cubic interpolant over strictly increasing `x`.
#[derive(Debug, Clone)]
pub struct Spline1d {
    x: Vec<f64>,
    y: Vec<f64>,
    // per-segment polynomial s(t) = y[i] + b t + c t^2 + d t^3, t = x - x[i]
    b: Vec<f64>,
    c: Vec<f64>,
    d: Vec<f64>,
    // abscissa transform for curves with high end curvature
    arccos: Option<(f64, f64)>,
}

impl Spline1d {
    pub fn new(x: &[f64], y: &[f64], boundary: Boundary) -> Result<Self, SplineError> {
        Self::build(x, y, boundary, false)
    }

    /// Spline over an arccos-mapped abscissa.
    ///
    /// The map bunches knots towards both interval ends, which suppresses
    /// the oscillation a plain cubic shows near a leading edge with high
    /// curvature. Derivatives from [`eval`](Self::eval) refer to the
    /// mapped abscissa.
    pub fn new_arccos(x: &[f64], y: &[f64], boundary: Boundary) -> Result<Self, SplineError> {
        Self::build(x, y, boundary, true)
    }

    fn build(x: &[f64], y: &[f64], boundary: Boundary, arccos: bool) -> Result<Self, SplineError> {
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

        let transform = if arccos {
            Some((x[0], x[x.len() - 1]))
        } else {
            None
        };
        let xt: Vec<f64> = match transform {
            Some((x0, x1)) => x.iter().map(|&xi| arccos_map(xi, x0, x1)).collect(),
            None => x.to_vec(),
        };

        for i in 1..xt.len() {
            if xt[i] <= xt[i - 1] {
                return Err(SplineError::NotIncreasing { index: i });
            }
        }

        let (b, c, d) = solve_coefficients(&xt, y, boundary)?;
        Ok(Self {
            x: xt,
            y: y.to_vec(),
            b,
            c,
            d,
            arccos: transform,
        })
    }

    pub fn len(&self) -> usize {
        self.x.len()
    }

    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }

    /// Evaluate value (`der = 0`), slope (`1`) or second derivative (`2`).
    ///
    /// Queries outside the knot range extrapolate with the end segment.
    pub fn eval(&self, x: f64, der: u8) -> f64 {
        let xq = match self.arccos {
            Some((x0, x1)) => arccos_map(x, x0, x1),
            None => x,
        };
        let i = segment_of(&self.x, xq);
        let t = xq - self.x[i];
        match der {
            0 => self.y[i] + self.b[i] * t + self.c[i] * t * t + self.d[i] * t * t * t,
            1 => self.b[i] + 2.0 * self.c[i] * t + 3.0 * self.d[i] * t * t,
            _ => 2.0 * self.c[i] + 6.0 * self.d[i] * t,
        }
    }

    /// Curvature `y'' / (1 + y'^2)^(3/2)` at `x`.
    pub fn curvature(&self, x: f64) -> f64 {
        let d1 = self.eval(x, 1);
        let d2 = self.eval(x, 2);
        d2 / (1.0 + d1 * d1).powf(1.5)
    }

    pub fn knots_x(&self) -> &[f64] {
        &self.x
    }
}

fn arccos_map(x: f64, x0: f64, x1: f64) -> f64 {
    let xn = if x1 == x0 { 0.0 } else { (x - x0) / (x1 - x0) };
    let xn = xn.clamp(0.0, 1.0);
    x0 + (x1 - x0) * (1.0 - 2.0 * xn).acos() / PI
}

fn segment_of(x: &[f64], xq: f64) -> usize {
    let i = util::bisection(x, xq);
    (i.max(0) as usize).min(x.len() - 2)
}

/// Solve for the `c` (half second derivative) values, derive `b` and `d`.
fn solve_coefficients(
    x: &[f64],
    y: &[f64],
    boundary: Boundary,
) -> Result<(Vec<f64>, Vec<f64>, Vec<f64>), SplineError> {
    let n = x.len();
    let h: Vec<f64> = (0..n - 1).map(|i| x[i + 1] - x[i]).collect();

    let mut a = DMatrix::<f64>::zeros(n, n);
    let mut rhs = DVector::<f64>::zeros(n);

    for i in 1..n - 1 {
        a[(i, i - 1)] = h[i - 1];
        a[(i, i)] = 2.0 * (h[i - 1] + h[i]);
        a[(i, i + 1)] = h[i];
        rhs[i] = 3.0 * ((y[i + 1] - y[i]) / h[i] - (y[i] - y[i - 1]) / h[i - 1]);
    }

    match boundary {
        Boundary::Natural => {
            a[(0, 0)] = 1.0;
            a[(n - 1, n - 1)] = 1.0;
        }
        Boundary::NotAKnot => {
            // d continuous across the first and last interior knot
            a[(0, 0)] = h[1];
            a[(0, 1)] = -(h[0] + h[1]);
            a[(0, 2)] = h[0];
            a[(n - 1, n - 3)] = h[n - 2];
            a[(n - 1, n - 2)] = -(h[n - 3] + h[n - 2]);
            a[(n - 1, n - 1)] = h[n - 3];
        }
        Boundary::Periodic => {
            // wrap equation at knot 0 and identification of the end values
            a[(0, n - 2)] = h[n - 2];
            a[(0, 0)] = 2.0 * (h[n - 2] + h[0]);
            a[(0, 1)] = h[0];
            rhs[0] = 3.0 * ((y[1] - y[0]) / h[0] - (y[n - 1] - y[n - 2]) / h[n - 2]);
            a[(n - 1, 0)] = 1.0;
            a[(n - 1, n - 1)] = -1.0;
        }
    }

    let c_vec = a.lu().solve(&rhs).ok_or(SplineError::SingularSystem)?;
    let c: Vec<f64> = c_vec.iter().copied().collect();

    let mut b = vec![0.0; n - 1];
    let mut d = vec![0.0; n - 1];
    for i in 0..n - 1 {
        b[i] = (y[i + 1] - y[i]) / h[i] - h[i] * (2.0 * c[i] + c[i + 1]) / 3.0;
        d[i] = (c[i + 1] - c[i]) / (3.0 * h[i]);
    }
    Ok((b, c, d))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::linspace;

    const X: [f64; 7] = [0.0, 0.5, 2.0, 3.0, 4.0, 5.0, 7.0];
    const Y: [f64; 7] = [0.0, 3.0, 0.0, 2.0, 0.0, 2.0, 0.0];

    fn sum_eval(spl: &Spline1d, xs: &[f64], der: u8) -> f64 {
        xs.iter().map(|&x| spl.eval(x, der)).sum()
    }

    #[test]
    fn natural_reference_value() {
        let spl = Spline1d::new(&X, &Y, Boundary::Natural).unwrap();
        assert!((spl.eval(1.0, 0) - 2.9546299523643555).abs() < 1e-9);
    }

    #[test]
    fn notaknot_reference_values() {
        let spl = Spline1d::new(&X, &Y, Boundary::NotAKnot).unwrap();
        assert!((spl.eval(1.0, 0) - 2.642301710730949).abs() < 1e-9);

        let xs = linspace(X[0], X[6], 10);
        assert!((sum_eval(&spl, &xs, 0) - 15.4634525661).abs() < 1e-9);
        assert!((sum_eval(&spl, &xs, 1) - 0.0739588733).abs() < 1e-9);
        assert!((sum_eval(&spl, &xs, 2) - -49.1819595645).abs() < 1e-9);

        let curv: f64 = xs.iter().map(|&x| spl.curvature(x)).sum();
        assert!((curv - -6.7610052324).abs() < 1e-9);
    }

    #[test]
    fn interpolates_knots() {
        for boundary in [Boundary::Natural, Boundary::NotAKnot] {
            let spl = Spline1d::new(&X, &Y, boundary).unwrap();
            for (&x, &y) in X.iter().zip(Y.iter()) {
                assert!((spl.eval(x, 0) - y).abs() < 1e-12);
            }
        }
    }

    #[test]
    fn periodic_wraps_derivatives() {
        // closed data: first and last y equal
        let x = [0.0, 1.0, 2.0, 3.0, 4.0];
        let y = [0.0, 1.0, 0.0, -1.0, 0.0];
        let spl = Spline1d::new(&x, &y, Boundary::Periodic).unwrap();
        assert!((spl.eval(0.0, 1) - spl.eval(4.0, 1)).abs() < 1e-9);
        assert!((spl.eval(0.0, 2) - spl.eval(4.0, 2)).abs() < 1e-9);
    }

    #[test]
    fn arccos_passes_through_knots() {
        let x = linspace(0.0, 1.0, 11);
        let y: Vec<f64> = x.iter().map(|&x| (x * PI).sin()).collect();
        let spl = Spline1d::new_arccos(&x, &y, Boundary::Natural).unwrap();
        for (&xi, &yi) in x.iter().zip(y.iter()) {
            assert!((spl.eval(xi, 0) - yi).abs() < 1e-10);
        }
    }

    #[test]
    fn rejects_bad_input() {
        assert!(matches!(
            Spline1d::new(&[0.0, 1.0], &[0.0, 1.0], Boundary::Natural),
            Err(SplineError::TooFewPoints { .. })
        ));
        assert!(matches!(
            Spline1d::new(&[0.0, 1.0, 1.0], &[0.0, 1.0, 2.0], Boundary::Natural),
            Err(SplineError::NotIncreasing { index: 2 })
        ));
        assert!(matches!(
            Spline1d::new(&[0.0, 1.0, 2.0], &[0.0, 1.0], Boundary::Natural),
            Err(SplineError::LengthMismatch { .. })
        ));
    }
}
