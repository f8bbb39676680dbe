//! 1-D line of an airfoil: upper or lower side, thickness or camber
//! distribution, or a curvature trace. `x` runs ascending 0..1.

use std::cell::OnceCell;

use core_spline::util::{self, SearchOptions};
use core_spline::{Boundary, Spline1d, Spline2d};
use tracing::debug;

use crate::GeometryError;

/// Role of a [`Line`] within the airfoil.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LineType {
    Upper,
    Lower,
    Thickness,
    Camber,
    Curvature,
}

impl LineType {
    pub fn as_str(&self) -> &'static str {
        match self {
            LineType::Upper => "upper",
            LineType::Lower => "lower",
            LineType::Thickness => "thickness",
            LineType::Camber => "camber",
            LineType::Curvature => "curvature",
        }
    }
}

/// Default threshold for reversal detection.
pub const REVERSAL_THRESHOLD: f64 = 0.1;

#[derive(Debug, Clone)]
pub struct Line {
    x: Vec<f64>,
    y: Vec<f64>,
    kind: LineType,
    threshold: f64,
    splined: bool,
    highpoint: OnceCell<(f64, f64)>,
    spline: OnceCell<Option<Spline1d>>,
}

impl Line {
    /// Line with linear interpolation between points.
    pub fn new(x: Vec<f64>, y: Vec<f64>, kind: LineType) -> Self {
        Self {
            x,
            y,
            kind,
            threshold: REVERSAL_THRESHOLD,
            splined: false,
            highpoint: OnceCell::new(),
            spline: OnceCell::new(),
        }
    }

    /// Line whose `y_at` evaluates a cubic spline over the points.
    pub fn new_splined(x: Vec<f64>, y: Vec<f64>, kind: LineType) -> Self {
        let mut line = Self::new(x, y, kind);
        line.splined = true;
        line
    }

    pub fn x(&self) -> &[f64] {
        &self.x
    }

    pub fn y(&self) -> &[f64] {
        &self.y
    }

    pub fn kind(&self) -> LineType {
        self.kind
    }

    pub fn len(&self) -> usize {
        self.x.len()
    }

    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }

    pub fn is_splined(&self) -> bool {
        self.splined
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn set_threshold(&mut self, threshold: f64) {
        self.threshold = threshold;
    }

    /// Replace the y values, keeping the x grid. Caches are dropped.
    pub fn set_y(&mut self, y: Vec<f64>) {
        debug_assert_eq!(y.len(), self.x.len());
        self.y = y;
        self.reset();
    }

    /// `x[0] == 0` and `x[last] == 1`.
    pub fn is_normalized(&self) -> bool {
        !self.x.is_empty() && self.x[0] == 0.0 && *self.x.last().unwrap() == 1.0
    }

    pub fn is_upper(&self) -> bool {
        self.kind == LineType::Upper
    }

    pub fn is_lower(&self) -> bool {
        self.kind == LineType::Lower
    }

    /// Interpolated y at `x` - linear, or the spline when the line is
    /// splined-backed.
    pub fn y_at(&self, x: f64) -> f64 {
        if let Some(spl) = self.spline() {
            return spl.eval(x, 0);
        }
        let jl = util::bisection(&self.x, x);
        if jl < 0 {
            return self.y[0];
        }
        let jl = jl as usize;
        if jl < self.x.len() - 1 {
            util::interpolate(self.x[jl], self.x[jl + 1], self.y[jl], self.y[jl + 1], x)
        } else {
            *self.y.last().unwrap()
        }
    }

    fn spline(&self) -> Option<&Spline1d> {
        if !self.splined {
            return None;
        }
        self.spline
            .get_or_init(|| Spline1d::new(&self.x, &self.y, Boundary::NotAKnot).ok())
            .as_ref()
    }

    /// `(x, y)` of the extremum of the line.
    ///
    /// A small helper spline around the discrete maximum refines the
    /// position; a symmetric line (all zero) reports `(0.5, 0.0)`.
    /// Linear-only accuracy would be about 1% off, hence the refinement.
    pub fn highpoint(&self) -> (f64, f64) {
        *self.highpoint.get_or_init(|| self.compute_highpoint())
    }

    fn compute_highpoint(&self) -> (f64, f64) {
        let max_y = self.y.iter().cloned().fold(f64::MIN, f64::max);
        let min_y = self.y.iter().cloned().fold(f64::MAX, f64::min);

        if max_y == 0.0 && min_y == 0.0 {
            return (0.5, 0.0);
        }

        let on_upper = max_y.abs() > min_y.abs();
        let imax = if on_upper {
            argmax(&self.y)
        } else {
            argmin(&self.y)
        };

        let n = self.x.len();
        if imax > 3 && imax < n - 3 {
            let (istart, iend) = (imax - 3, imax + 3);
            let helper = Spline1d::new(&self.x[istart..=iend], &self.y[istart..=iend], Boundary::NotAKnot);
            if let Ok(helper) = helper {
                let bounds = (self.x[istart], self.x[iend]);
                let f = |x: f64| helper.eval(x, 0);
                let xmax = if on_upper {
                    util::find_max(f, self.x[imax], bounds, SearchOptions::default())
                } else {
                    util::find_min(f, self.x[imax], bounds, SearchOptions::default())
                };
                return (round7(xmax), round7(helper.eval(xmax, 0)));
            }
        }
        (round7(self.x[imax]), round7(self.y[imax]))
    }

    /// Reversals (sign changes of y outside the threshold band), detected
    /// from `x_start` on to skip the leading-edge area.
    pub fn reversals(&self, x_start: f64) -> Vec<(f64, f64)> {
        let mut found = Vec::new();
        if !self.y.iter().any(|&y| y < 0.0) {
            return found;
        }
        let mut yold = None;
        for i in 0..self.x.len() {
            if self.x[i] < x_start {
                continue;
            }
            let yi = self.y[i];
            let yold_val = *yold.get_or_insert(yi);
            if yi.abs() >= self.threshold {
                if yi * yold_val < 0.0 {
                    found.push((round7(self.x[i]), round7(yi)));
                }
                yold = Some(yi);
            }
        }
        found
    }

    pub fn nreversals(&self) -> usize {
        self.reversals(0.1).len()
    }

    /// Move the highpoint towards `(x_new, y_new)`; `None` keeps a
    /// coordinate. Returns the (clamped) position actually reached.
    pub fn set_highpoint(
        &mut self,
        x_new: Option<f64>,
        y_new: Option<f64>,
    ) -> Result<(f64, f64), GeometryError> {
        let (x_cur, y_cur) = self.highpoint();

        let mut x_final = x_cur;
        let mut y_final = y_cur;

        if let Some(y_target) = y_new {
            if y_target != y_cur {
                y_final = self.move_max_y(y_cur, y_target);
            }
        }
        if let Some(x_target) = x_new {
            if x_target != x_cur {
                x_final = self.move_max_x(x_cur, x_target)?;
            }
        }

        self.reset();
        Ok((x_final, y_final))
    }

    /// Scale all y by `y_new / y_cur` after clamping to the per-side range.
    fn move_max_y(&mut self, y_cur: f64, y_new: f64) -> f64 {
        let y_new = if y_cur == 0.0 {
            0.0
        } else if self.kind == LineType::Lower {
            y_new.clamp(-0.5, -0.005)
        } else {
            y_new.clamp(0.005, 0.5)
        };

        if y_cur != 0.0 {
            let factor = y_new / y_cur;
            for y in self.y.iter_mut() {
                *y *= factor;
            }
        }
        y_new
    }

    /// Remap x so the highpoint slides to `x_new` while y values keep their
    /// shape. A cubic through `{0, x_cur, 1} -> {0, x_new, 1}` provides the
    /// smooth map (the xfoil approach); resampling onto the original grid
    /// goes through an arccos spline to avoid oscillation near the LE.
    fn move_max_x(&mut self, x_cur: f64, x_new: f64) -> Result<f64, GeometryError> {
        let x_new = x_new.clamp(0.1, 0.9);

        let first = self.x[0];
        let last = *self.x.last().unwrap();
        let map_x = [first, x_cur, last];
        let map_y = [first, x_new, last];
        let map = Spline2d::new(&map_x, &map_y, Boundary::Natural)?;

        let us = util::linspace(0.0, 1.0, 50);
        let (xmap, ymap): (Vec<f64>, Vec<f64>) = us.iter().map(|&u| map.eval(u, 0)).unzip();
        let map1d = Spline1d::new(&xmap, &ymap, Boundary::Natural)?;

        let mut new_x: Vec<f64> = self.x.iter().map(|&xi| map1d.eval(xi, 0)).collect();
        new_x[0] = first;
        *new_x.last_mut().unwrap() = last;

        let tmp = Spline1d::new_arccos(&new_x, &self.y, Boundary::NotAKnot)?;
        let mut new_y: Vec<f64> = self.x.iter().map(|&xi| tmp.eval(xi, 0)).collect();
        new_y[0] = self.y[0];
        *new_y.last_mut().unwrap() = *self.y.last().unwrap();
        self.y = new_y;

        debug!(kind = self.kind.as_str(), x_cur, x_new, "highpoint x-remap");
        Ok(x_new)
    }

    fn reset(&mut self) {
        self.highpoint = OnceCell::new();
        self.spline = OnceCell::new();
    }
}

fn argmax(values: &[f64]) -> usize {
    let mut best = 0;
    for (i, &v) in values.iter().enumerate() {
        if v > values[best] {
            best = i;
        }
    }
    best
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

fn round7(v: f64) -> f64 {
    (v * 1e7).round() / 1e7
}
