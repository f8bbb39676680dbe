//! Airfoil sides backed by a Bézier curve or a Hicks-Henne seed.

use core_spline::{Bezier, HicksHenne};
use nalgebra::{DMatrix, DVector};
use tracing::debug;

use crate::line::{Line, LineType};
use crate::GeometryError;

/// Smallest y of the LE tangent control point, keeps the LE from collapsing.
pub const LE_TANGENT_MIN_Y: f64 = 0.006;
/// Interior control points stay inside `[0.01, 0.99]`.
pub const CP_X_MIN: f64 = 0.01;
pub const CP_X_MAX: f64 = 0.99;
/// Minimum x distance between neighbouring control points on insert.
pub const CP_MIN_SPACING: f64 = 0.01;

/// One side (upper or lower) of a Bézier airfoil.
///
/// Control point conventions: `p0 = (0,0)` is the LE and immovable, `p1`
/// is the LE tangent (x locked to 0, `|y| >= 0.006`), interior points keep
/// `0.01 <= x <= 0.99`, the last point is the TE with x locked to 1.
#[derive(Debug, Clone)]
pub struct BezierSide {
    bezier: Bezier,
    kind: LineType,
    u: Vec<f64>,
    x: Vec<f64>,
    y: Vec<f64>,
}

impl BezierSide {
    pub fn new(px: &[f64], py: &[f64], kind: LineType, n_points: usize) -> Result<Self, GeometryError> {
        let bezier = Bezier::new(px, py)?;
        let u = panel_distribution(n_points);
        let mut side = Self {
            bezier,
            kind,
            u,
            x: Vec::new(),
            y: Vec::new(),
        };
        side.resample();
        Ok(side)
    }

    fn resample(&mut self) {
        let n = self.u.len();
        let mut x = Vec::with_capacity(n);
        let mut y = Vec::with_capacity(n);
        for &u in &self.u {
            let (xi, yi) = self.bezier.eval(u);
            x.push(xi);
            y.push(yi);
        }
        // pin the analytic end points against rounding
        x[0] = self.bezier.points_x()[0];
        y[0] = self.bezier.points_y()[0];
        x[n - 1] = *self.bezier.points_x().last().unwrap();
        y[n - 1] = *self.bezier.points_y().last().unwrap();
        self.x = x;
        self.y = y;
    }

    pub fn kind(&self) -> LineType {
        self.kind
    }

    pub fn bezier(&self) -> &Bezier {
        &self.bezier
    }

    pub fn n_control_points(&self) -> usize {
        self.bezier.points_x().len()
    }

    pub fn x(&self) -> &[f64] {
        &self.x
    }

    pub fn y(&self) -> &[f64] {
        &self.y
    }

    pub fn n_points(&self) -> usize {
        self.u.len()
    }

    /// Change the sampling density of the side.
    pub fn set_panel_distribution(&mut self, n_points: usize) {
        self.u = panel_distribution(n_points);
        self.resample();
    }

    pub fn as_line(&self) -> Line {
        Line::new(self.x.clone(), self.y.clone(), self.kind)
    }

    /// Curvature over the sample points as a line on `x`.
    ///
    /// A side runs 0..1, so upper-side values come out with opposite sign
    /// compared to the whole-contour convention; the caller flips them.
    pub fn curvature_line(&self) -> Line {
        let curv: Vec<f64> = self.u.iter().map(|&u| self.bezier.curvature(u)).collect();
        Line::new(self.x.clone(), curv, LineType::Curvature)
    }

    pub fn curvature_at_le(&self) -> f64 {
        self.bezier.curvature(0.0)
    }

    pub fn y_at(&self, x: f64, fast: bool) -> f64 {
        self.bezier.eval_y_on_x(x, fast)
    }

    /// Half trailing edge gap: y of the last control point.
    pub fn te_y(&self) -> f64 {
        *self.bezier.points_y().last().unwrap()
    }

    pub fn set_te_y(&mut self, y: f64) {
        let last = self.n_control_points() - 1;
        self.bezier.set_point(last, 1.0, y);
        self.resample();
    }

    /// Move a control point applying the per-index locking rules. Returns
    /// the corrected position.
    pub fn move_control_point(&mut self, index: usize, x: Option<f64>, y: Option<f64>) -> (f64, f64) {
        let px = self.bezier.points_x();
        let py = self.bezier.points_y();
        let last = px.len() - 1;
        let mut x = x.unwrap_or(px[index]);
        let mut y = y.unwrap_or(py[index]);

        if index == 0 {
            x = 0.0;
            y = 0.0;
        } else if index == 1 {
            x = 0.0;
            y = if py[index] > 0.0 {
                y.max(LE_TANGENT_MIN_Y)
            } else {
                y.min(-LE_TANGENT_MIN_Y)
            };
        } else if index == last {
            x = 1.0;
            y = py[index];
        } else {
            x = x.clamp(CP_X_MIN, CP_X_MAX);
        }

        self.bezier.set_point(index, x, y);
        self.resample();
        (x, y)
    }

    /// Insert a control point at `(x, y)`, keeping points ordered and at
    /// least [`CP_MIN_SPACING`] apart. Returns the insert index.
    pub fn insert_control_point(&mut self, x: f64, y: f64) -> Option<usize> {
        let px = self.bezier.points_x().to_vec();
        let py = self.bezier.points_y().to_vec();

        if x <= px[0] || x >= *px.last().unwrap() {
            return None;
        }
        let mut i_insert = px.len() - 1;
        for (i, &pxi) in px.iter().enumerate() {
            if i > 1 && pxi > x {
                i_insert = i;
                break;
            }
        }
        if (x - px[i_insert - 1]).abs() < CP_MIN_SPACING || (px[i_insert] - x).abs() < CP_MIN_SPACING {
            return None;
        }

        let mut new_px = px;
        let mut new_py = py;
        new_px.insert(i_insert, x);
        new_py.insert(i_insert, y);
        if self.bezier.set_points(&new_px, &new_py).is_err() {
            return None;
        }
        self.resample();
        Some(i_insert)
    }

    /// Delete a control point; the LE, LE tangent and TE points stay.
    pub fn delete_control_point(&mut self, index: usize) -> Option<usize> {
        let last = self.n_control_points() - 1;
        if index == 0 || index == 1 || index >= last {
            return None;
        }
        let mut px = self.bezier.points_x().to_vec();
        let mut py = self.bezier.points_y().to_vec();
        px.remove(index);
        py.remove(index);
        if self.bezier.set_points(&px, &py).is_err() {
            return None;
        }
        self.resample();
        Some(index)
    }

    /// Least-squares fit of a Bézier side to a sampled line.
    ///
    /// The x positions of the control points are fixed (LE pair at 0,
    /// interior spread towards the TE, TE at 1) so `y(u)` is linear in the
    /// free control ordinates and a dense least-squares solve suffices.
    /// `n_cp >= 4`; LE point and TE ordinate are pinned to the target.
    pub fn fit(line: &Line, kind: LineType, n_cp: usize, n_points: usize) -> Result<Self, GeometryError> {
        let n_cp = n_cp.max(4);
        let te_y = *line.y().last().unwrap();

        // fixed x layout: 0, 0, then interior bunched towards the front
        let mut px = vec![0.0, 0.0];
        let n_interior = n_cp - 3;
        for i in 0..n_interior {
            let t = (i + 1) as f64 / (n_interior + 1) as f64;
            px.push((1.0 - (t * std::f64::consts::PI / 2.0).cos()).min(0.95));
        }
        px.push(1.0);

        // sample targets along the curve parameter
        let m = (8 * n_cp).max(40);
        let degree = n_cp - 1;
        let us: Vec<f64> = (0..m).map(|j| (j + 1) as f64 / (m + 1) as f64).collect();

        // free ordinates: indices 1 .. n_cp-2  (p0 and TE pinned)
        let n_free = n_cp - 2;
        let mut a = DMatrix::<f64>::zeros(m, n_free);
        let mut rhs = DVector::<f64>::zeros(m);
        for (j, &u) in us.iter().enumerate() {
            let x_u = bezier_point(&px, u);
            let target = line.y_at(x_u);
            let b_last = bernstein(degree, degree, u);
            rhs[j] = target - te_y * b_last;
            for k in 0..n_free {
                a[(j, k)] = bernstein(degree, k + 1, u);
            }
        }

        let svd = a.svd(true, true);
        let w = svd
            .solve(&rhs, 1e-12)
            .map_err(|_| GeometryError::InvalidCoordinates {
                reason: "bezier fit system is singular".to_string(),
            })?;

        let mut py = vec![0.0];
        py.extend(w.iter().copied());
        py.push(te_y);

        // honor the LE tangent convention
        if kind == LineType::Upper {
            py[1] = py[1].max(LE_TANGENT_MIN_Y);
        } else {
            py[1] = py[1].min(-LE_TANGENT_MIN_Y);
        }

        debug!(kind = kind.as_str(), n_cp, "bezier side fitted");
        Self::new(&px, &py, kind, n_points)
    }
}

/// Non-uniform `u` distribution for a Bézier side.
///
/// For constant `du` the panel length is inversely proportional to the
/// curvature, which already bunches points at the LE; the first and last
/// panels get an extra geometric refinement.
pub fn panel_distribution(n_points: usize) -> Vec<f64> {
    let te_du_end = 0.5;
    let te_du_growth = 1.4;
    let le_du_start = 0.8;
    let le_du_growth = 1.1;

    let n_panels = n_points.max(2) - 1;
    let mut du = vec![1.0; n_panels];

    let mut du_ip = le_du_start;
    let mut ip = 0usize;
    while du_ip < 1.0 && ip < n_panels {
        du[ip] = du_ip;
        ip += 1;
        du_ip *= le_du_growth;
    }

    let mut du_ip = te_du_end;
    let mut ip = n_panels as isize - 1;
    while du_ip < 1.0 && ip >= 0 {
        du[ip as usize] = du_ip;
        ip -= 1;
        du_ip *= te_du_growth;
    }

    let mut u = vec![0.0; n_panels + 1];
    for (i, &d) in du.iter().enumerate() {
        u[i + 1] = u[i] + d;
    }
    let total = u[n_panels];
    for ui in u.iter_mut() {
        *ui /= total;
    }
    u[n_panels] = 1.0;
    u
}

fn bezier_point(points: &[f64], u: f64) -> f64 {
    let mut work = points.to_vec();
    for level in (1..work.len()).rev() {
        for i in 0..level {
            work[i] = work[i] * (1.0 - u) + work[i + 1] * u;
        }
    }
    work[0]
}

fn bernstein(n: usize, i: usize, u: f64) -> f64 {
    binomial(n, i) * u.powi(i as i32) * (1.0 - u).powi((n - i) as i32)
}

fn binomial(n: usize, k: usize) -> f64 {
    let mut r = 1.0;
    for j in 0..k {
        r *= (n - j) as f64 / (j + 1) as f64;
    }
    r
}

/// One side of a Hicks-Henne airfoil: a seed line plus bump functions.
/// The seed x grid is master.
#[derive(Debug, Clone)]
pub struct HicksHenneSide {
    seed_x: Vec<f64>,
    seed_y: Vec<f64>,
    hhs: Vec<HicksHenne>,
    kind: LineType,
    y: Vec<f64>,
}

impl HicksHenneSide {
    pub fn new(
        seed_x: Vec<f64>,
        seed_y: Vec<f64>,
        hhs: Vec<HicksHenne>,
        kind: LineType,
    ) -> Result<Self, GeometryError> {
        if seed_x.len() != seed_y.len() || seed_x.len() < 3 {
            return Err(GeometryError::InvalidCoordinates {
                reason: "hicks-henne seed coordinates missing or too short".to_string(),
            });
        }
        let y = seed_x
            .iter()
            .zip(seed_y.iter())
            .map(|(&x, &ys)| ys + HicksHenne::eval_sum(&hhs, x))
            .collect();
        Ok(Self {
            seed_x,
            seed_y,
            hhs,
            kind,
            y,
        })
    }

    pub fn kind(&self) -> LineType {
        self.kind
    }

    pub fn x(&self) -> &[f64] {
        &self.seed_x
    }

    /// Seed y plus the sum of all bumps.
    pub fn y(&self) -> &[f64] {
        &self.y
    }

    pub fn seed_y(&self) -> &[f64] {
        &self.seed_y
    }

    pub fn hhs(&self) -> &[HicksHenne] {
        &self.hhs
    }

    pub fn n_hhs(&self) -> usize {
        self.hhs.len()
    }

    pub fn as_line(&self) -> Line {
        Line::new(self.seed_x.clone(), self.y.clone(), self.kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_spline::util::linspace;
    use std::f64::consts::PI;

    fn upper() -> BezierSide {
        BezierSide::new(
            &[0.0, 0.0, 0.33, 1.0],
            &[0.0, 0.06, 0.12, 0.0],
            LineType::Upper,
            101,
        )
        .unwrap()
    }

    #[test]
    fn panel_distribution_shape() {
        let u = panel_distribution(101);
        assert_eq!(u.len(), 101);
        assert_eq!(u[0], 0.0);
        assert_eq!(u[100], 1.0);
        // first and last panels are smaller than the interior ones
        let first = u[1] - u[0];
        let last = u[100] - u[99];
        let mid = u[51] - u[50];
        assert!(first < mid);
        assert!(last < mid);
        for w in u.windows(2) {
            assert!(w[1] > w[0]);
        }
    }

    #[test]
    fn side_samples_full_span() {
        let s = upper();
        assert_eq!(s.x()[0], 0.0);
        assert_eq!(*s.x().last().unwrap(), 1.0);
        assert_eq!(s.y()[0], 0.0);
    }

    #[test]
    fn move_control_point_rules() {
        let mut s = upper();
        // p0 immovable
        assert_eq!(s.move_control_point(0, Some(0.3), Some(0.1)), (0.0, 0.0));
        // p1 locked to x = 0, y floor
        assert_eq!(s.move_control_point(1, Some(0.2), Some(0.001)), (0.0, LE_TANGENT_MIN_Y));
        // TE keeps its y, x locked to 1
        let te_y = s.te_y();
        assert_eq!(s.move_control_point(3, Some(0.7), Some(0.4)), (1.0, te_y));
        // interior clamped
        let (x, _) = s.move_control_point(2, Some(0.999), None);
        assert_eq!(x, CP_X_MAX);
    }

    #[test]
    fn insert_and_delete_control_point() {
        let mut s = upper();
        let i = s.insert_control_point(0.6, 0.05).unwrap();
        assert_eq!(i, 3);
        assert_eq!(s.n_control_points(), 5);
        // too close to an existing point
        assert!(s.insert_control_point(0.335, 0.1).is_none());
        // outside the span
        assert!(s.insert_control_point(1.2, 0.0).is_none());
        assert_eq!(s.delete_control_point(3), Some(3));
        assert!(s.delete_control_point(0).is_none());
        assert!(s.delete_control_point(1).is_none());
    }

    #[test]
    fn te_gap_setter() {
        let mut s = upper();
        s.set_te_y(0.002);
        assert_eq!(s.te_y(), 0.002);
        assert!((s.y().last().unwrap() - 0.002).abs() < 1e-12);
    }

    #[test]
    fn fit_reproduces_smooth_side() {
        let x = linspace(0.0, 1.0, 81);
        let y: Vec<f64> = x.iter().map(|&x| 0.1 * (PI * x.powf(0.75)).sin()).collect();
        let target = Line::new(x.clone(), y, LineType::Upper);
        let side = BezierSide::fit(&target, LineType::Upper, 6, 101).unwrap();
        // mid-chord deviation stays small for a smooth target
        for &xq in &[0.2, 0.4, 0.6, 0.8] {
            let dev = (side.y_at(xq, false) - target.y_at(xq)).abs();
            assert!(dev < 5e-3, "deviation {dev} at x = {xq}");
        }
    }

    #[test]
    fn hicks_henne_side_sums_bumps() {
        let x = linspace(0.0, 1.0, 41);
        let y: Vec<f64> = x.iter().map(|&x| 0.1 * (PI * x).sin()).collect();
        let hh = HicksHenne::new(0.01, 0.4, 2.0);
        let side = HicksHenneSide::new(x.clone(), y.clone(), vec![hh], LineType::Upper).unwrap();
        for i in 0..x.len() {
            let expect = y[i] + hh.eval(x[i]);
            assert!((side.y()[i] - expect).abs() < 1e-12);
        }
        assert_eq!(side.n_hhs(), 1);
    }
}
