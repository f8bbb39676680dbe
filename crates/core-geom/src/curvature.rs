//! Curvature of the whole airfoil contour, split into upper and lower
//! halves with the heuristics used around the leading edge.

use core_spline::{Boundary, Spline2d};

use crate::line::{Line, LineType};
use crate::side::BezierSide;
use crate::GeometryError;

#[derive(Debug, Clone)]
pub struct Curvature {
    kappa: Vec<f64>,
    ile: usize,
    upper: Line,
    lower: Line,
}

impl Curvature {
    /// Curvature from an existing contour spline evaluated at its knots.
    pub fn of_spline(spline: &Spline2d, x: &[f64], ile: usize) -> Self {
        let kappa: Vec<f64> = spline.u().iter().map(|&u| spline.curvature(u)).collect();
        Self::from_kappa(x, kappa, ile)
    }

    /// Curvature from plain coordinates; builds its own spline.
    pub fn of_xy(x: &[f64], y: &[f64]) -> Result<Self, GeometryError> {
        let spline = Spline2d::new(x, y, Boundary::NotAKnot)?;
        let ile = argmin(x);
        Ok(Self::of_spline(&spline, x, ile))
    }

    /// Curvature of a Bézier pair; upper values are sign-flipped so the
    /// concatenation matches the whole-contour convention.
    pub fn of_bezier(upper: &BezierSide, lower: &BezierSide) -> Self {
        let upper_curv = upper.curvature_line();
        let lower_curv = lower.curvature_line();
        let ile = upper.x().len() - 1;

        let upper_flipped: Vec<f64> = upper_curv.y().iter().map(|&k| -k).collect();
        let mut kappa: Vec<f64> = upper_flipped.iter().rev().copied().collect();
        kappa.extend_from_slice(&lower_curv.y()[1..]);

        let mut x: Vec<f64> = upper.x().iter().rev().copied().collect();
        x.extend_from_slice(&lower.x()[1..]);

        let mut me = Self::from_kappa(&x, kappa, ile);
        // sides keep the ascending-x orientation of their sources
        me.upper = Line::new(upper.x().to_vec(), upper_flipped, LineType::Upper);
        me.lower = Line::new(lower.x().to_vec(), lower_curv.y().to_vec(), LineType::Lower);
        me
    }

    fn from_kappa(x: &[f64], kappa: Vec<f64>, ile: usize) -> Self {
        let upper = Line::new(
            x[..=ile].iter().rev().copied().collect(),
            kappa[..=ile].iter().rev().copied().collect(),
            LineType::Upper,
        );
        let lower = Line::new(x[ile..].to_vec(), kappa[ile..].to_vec(), LineType::Lower);
        Self {
            kappa,
            ile,
            upper,
            lower,
        }
    }

    pub fn kappa(&self) -> &[f64] {
        &self.kappa
    }

    pub fn ile(&self) -> usize {
        self.ile
    }

    /// Curvature trace of the upper side, x ascending 0..1.
    pub fn upper(&self) -> &Line {
        &self.upper
    }

    pub fn lower(&self) -> &Line {
        &self.lower
    }

    pub fn side(&self, kind: LineType) -> &Line {
        match kind {
            LineType::Lower => &self.lower,
            _ => &self.upper,
        }
    }

    pub fn at_le(&self) -> f64 {
        self.kappa[self.ile]
    }

    pub fn at_upper_te(&self) -> f64 {
        *self.upper.y().last().unwrap()
    }

    pub fn at_lower_te(&self) -> f64 {
        *self.lower.y().last().unwrap()
    }

    /// Max |curvature| within 3 samples of the LE.
    pub fn max_around_le(&self) -> f64 {
        self.window_max(self.ile.saturating_sub(3), (self.ile + 4).min(self.kappa.len()))
    }

    pub fn max_upper_le(&self) -> f64 {
        self.window_max(self.ile.saturating_sub(3), self.ile + 1)
    }

    pub fn max_lower_le(&self) -> f64 {
        self.window_max(self.ile, (self.ile + 4).min(self.kappa.len()))
    }

    /// Single-sample dip right next to the LE on the upper side.
    pub fn bump_at_upper_le(&self) -> bool {
        self.ile >= 2 && self.kappa[self.ile - 1] < self.kappa[self.ile - 2]
    }

    pub fn bump_at_lower_le(&self) -> bool {
        self.ile + 2 < self.kappa.len() && self.kappa[self.ile + 1] < self.kappa[self.ile + 2]
    }

    /// Smoothed LE curvature estimate when the discrete maximum sits next
    /// to the LE instead of on it.
    pub fn best_around_le(&self) -> f64 {
        if self.max_around_le() > self.at_le() {
            (self.max_around_le() + 2.0 * self.at_le()) / 3.0
        } else if self.bump_at_upper_le() {
            (self.kappa[self.ile] + self.kappa[self.ile - 2]) / 2.0
        } else if self.bump_at_lower_le() {
            (self.kappa[self.ile] + self.kappa[self.ile + 2]) / 2.0
        } else {
            self.at_le()
        }
    }

    /// Exactly one curvature reversal on the upper side.
    pub fn is_reflexed(&self) -> bool {
        self.upper.reversals(0.1).len() == 1
    }

    /// Exactly one curvature reversal on the lower side.
    pub fn is_rear_loaded(&self) -> bool {
        self.lower.reversals(0.1).len() == 1
    }

    fn window_max(&self, from: usize, to: usize) -> f64 {
        self.kappa[from..to]
            .iter()
            .map(|k| k.abs())
            .fold(0.0, f64::max)
    }
}

fn argmin(values: &[f64]) -> usize {
    let mut best = 0;
    for (i, &v) in values.iter().enumerate() {
        if v < values[best] {
            best = i;
        }
    }
    best
}
