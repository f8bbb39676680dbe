//! A polar: definition plus operating points, loaded from an Xfoil polar
//! file or filled by the worker.

use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;
use tracing::{debug, error};

use crate::definition::PolarDef;
use crate::point::PolarPoint;
use crate::{PolarError, PolarType, PolarVar};

/// Relative tolerance when checking the file header Reynolds number.
const RE_MATCH_TOLERANCE: f64 = 1e-6;

#[derive(Debug, Clone)]
pub struct Polar {
    def: PolarDef,
    points: Vec<PolarPoint>,
    error_reason: Option<String>,
    /// Reynolds scale of the owning set (chord-scaled reference airfoils).
    re_scale: f64,
}

impl Polar {
    pub fn new(def: PolarDef) -> Self {
        Self {
            def,
            points: Vec::new(),
            error_reason: None,
            re_scale: 1.0,
        }
    }

    pub fn def(&self) -> &PolarDef {
        &self.def
    }

    pub fn def_mut(&mut self) -> &mut PolarDef {
        &mut self.def
    }

    pub fn points(&self) -> &[PolarPoint] {
        &self.points
    }

    pub fn re_scale(&self) -> f64 {
        self.re_scale
    }

    pub(crate) fn set_re_scale(&mut self, scale: f64) {
        self.re_scale = scale;
    }

    /// Loaded means: points are present, or an error is recorded. Either
    /// way the polar will not be generated again.
    pub fn is_loaded(&self) -> bool {
        !self.points.is_empty() || self.error_reason.is_some()
    }

    pub fn error_occurred(&self) -> bool {
        self.error_reason.is_some()
    }

    pub fn error_reason(&self) -> Option<&str> {
        self.error_reason.as_deref()
    }

    pub fn set_error_reason(&mut self, reason: impl Into<String>) {
        self.error_reason = Some(reason.into());
    }

    /// Reset to the not-loaded state (e.g. after the airfoil changed).
    pub fn set_not_loaded(&mut self) {
        self.points.clear();
        self.error_reason = None;
    }

    // --- channels ----------------------------------------------------------

    /// Reynolds number of an operating point: constant for T1, `Re/sqrt(cl)`
    /// for T2 polars.
    fn re_for_point(&self, point: &PolarPoint) -> f64 {
        match self.def.polar_type {
            PolarType::T1 => self.def.re,
            PolarType::T2 => {
                if point.cl > 0.0 {
                    self.def.re / point.cl.sqrt()
                } else {
                    0.0
                }
            }
        }
    }

    pub fn values_of(&self, var: PolarVar) -> Vec<f64> {
        self.points
            .iter()
            .map(|p| p.value_of(var, self.re_for_point(p)))
            .collect()
    }

    pub fn alpha(&self) -> Vec<f64> {
        self.values_of(PolarVar::Alpha)
    }

    pub fn cl(&self) -> Vec<f64> {
        self.values_of(PolarVar::Cl)
    }

    pub fn cd(&self) -> Vec<f64> {
        self.values_of(PolarVar::Cd)
    }

    pub fn glide(&self) -> Vec<f64> {
        self.values_of(PolarVar::Glide)
    }

    /// `(x, y)` arrays for a pair of variables. When either axis is the
    /// sink figure, leading entries with `sink <= 0` are trimmed.
    pub fn of_vars(&self, x_var: PolarVar, y_var: PolarVar) -> (Vec<f64>, Vec<f64>) {
        let mut xs = self.values_of(x_var);
        let mut ys = self.values_of(y_var);

        if x_var == PolarVar::Sink || y_var == PolarVar::Sink {
            let sink = self.values_of(PolarVar::Sink);
            let first = sink.iter().position(|&s| s > 0.0).unwrap_or(sink.len());
            xs.drain(..first);
            ys.drain(..first);
        }
        (xs, ys)
    }

    // --- interpolation ------------------------------------------------------

    /// Interpolate `y_var` at `x_var = x_val` with bisection plus linear
    /// interpolation; `cd` values round to 5 decimals, others to 3.
    ///
    /// Returns `None` outside the polar range unless `allow_outside_range`
    /// is set, which then returns the boundary value.
    pub fn get_interpolated(
        &self,
        x_var: PolarVar,
        x_val: f64,
        y_var: PolarVar,
        allow_outside_range: bool,
    ) -> Option<f64> {
        if !self.is_loaded() {
            return None;
        }
        let xs = self.values_of(x_var);
        let ys = self.values_of(y_var);

        let i = bisection(&xs, x_val);
        let y = if i >= 0 && (i as usize) < xs.len() - 1 {
            let i = i as usize;
            let y = interpolate(xs[i], xs[i + 1], ys[i], ys[i + 1], x_val);
            let decimals = if y_var == PolarVar::Cd { 1e5 } else { 1e3 };
            (y * decimals).round() / decimals
        } else if allow_outside_range {
            if i < 0 {
                ys[0]
            } else {
                *ys.last()?
            }
        } else {
            return None;
        };
        Some(y)
    }

    /// Full operating point interpolated at `x_var = x_val`; `None` when
    /// any channel cannot be interpolated.
    pub fn get_interpolated_point(
        &self,
        x_var: PolarVar,
        x_val: f64,
        allow_outside_range: bool,
    ) -> Option<PolarPoint> {
        if !self.is_loaded() {
            return None;
        }
        let mut point = PolarPoint::default();
        point.set_value_of(x_var, x_val);

        let all = [
            PolarVar::Cl,
            PolarVar::Cd,
            PolarVar::Cdp,
            PolarVar::Alpha,
            PolarVar::Cm,
            PolarVar::Xtrt,
            PolarVar::Xtrb,
        ];
        for y_var in all.into_iter().filter(|v| *v != x_var) {
            let y = self.get_interpolated(x_var, x_val, y_var, allow_outside_range)?;
            point.set_value_of(y_var, y);
        }
        Some(point)
    }

    // --- characteristic points ----------------------------------------------

    pub fn min_cd(&self) -> Option<&PolarPoint> {
        self.points
            .iter()
            .min_by(|a, b| a.cd.total_cmp(&b.cd))
    }

    pub fn max_glide(&self) -> Option<&PolarPoint> {
        self.points
            .iter()
            .max_by(|a, b| a.glide().total_cmp(&b.glide()))
    }

    pub fn max_cl(&self) -> Option<&PolarPoint> {
        self.points.iter().max_by(|a, b| a.cl.total_cmp(&b.cl))
    }

    pub fn min_cl(&self) -> Option<&PolarPoint> {
        self.points.iter().min_by(|a, b| a.cl.total_cmp(&b.cl))
    }

    /// Zero-lift angle: interpolated on the cl branch, with a linear
    /// regression over the whole polar as fallback when cl = 0 is outside
    /// the computed range.
    pub fn alpha_cl0(&self) -> Option<f64> {
        if let Some(alpha) = self.get_interpolated(PolarVar::Cl, 0.0, PolarVar::Alpha, false) {
            return Some(alpha);
        }
        // least squares alpha(cl) extrapolated to cl = 0
        let n = self.points.len();
        if n < 2 {
            return None;
        }
        let (mut s_cl, mut s_a, mut s_clcl, mut s_cla) = (0.0, 0.0, 0.0, 0.0);
        for p in &self.points {
            s_cl += p.cl;
            s_a += p.alpha;
            s_clcl += p.cl * p.cl;
            s_cla += p.cl * p.alpha;
        }
        let nf = n as f64;
        let denom = nf * s_clcl - s_cl * s_cl;
        if denom == 0.0 {
            return None;
        }
        let slope = (nf * s_cla - s_cl * s_a) / denom;
        let intercept = (s_a - slope * s_cl) / nf;
        Some((intercept * 1000.0).round() / 1000.0)
    }

    pub fn has_bubble_top(&self) -> bool {
        self.points.iter().any(|p| p.bubble_top.is_some())
    }

    pub fn has_bubble_bot(&self) -> bool {
        self.points.iter().any(|p| p.bubble_bot.is_some())
    }

    // --- file import --------------------------------------------------------

    /// Load the operating points from an Xfoil polar file.
    ///
    /// The header must carry the matching Reynolds number and Ncrit;
    /// mismatches fail the load. On failure the error reason is recorded
    /// and the polar counts as loaded-with-error.
    pub fn load_from_file(&mut self, path: &Path) -> Result<(), PolarError> {
        if self.is_loaded() {
            return Ok(());
        }
        match self.import_from_file(path) {
            Ok(points) => {
                debug!(polar = %self.def.label(), n = points.len(), "polar loaded");
                self.points = points;
                Ok(())
            }
            Err(e) => {
                error!(polar = %self.def.label(), error = %e, "polar load failed");
                self.error_reason = Some(e.to_string());
                Err(e)
            }
        }
    }

    fn import_from_file(&self, path: &Path) -> Result<Vec<PolarPoint>, PolarError> {
        static RE_LINE: OnceLock<Regex> = OnceLock::new();
        static NCRIT_LINE: OnceLock<Regex> = OnceLock::new();
        let re_line = RE_LINE.get_or_init(|| {
            Regex::new(r"Re\s*=\s*([0-9.]+)\s*e\s*([-+]?[0-9]+)").unwrap_or_else(|e| panic!("{e}"))
        });
        let ncrit_line = NCRIT_LINE.get_or_init(|| {
            Regex::new(r"Ncrit\s*=\s*([0-9.]+)").unwrap_or_else(|e| panic!("{e}"))
        });

        let load_err = |reason: String| PolarError::LoadFailed {
            path: path.display().to_string(),
            reason,
        };

        let text = std::fs::read_to_string(path)?;
        let mut points = Vec::new();
        let mut in_data = false;

        for line in text.lines() {
            if line.contains("Calculated polar for:") {
                continue; // airfoil name, informational
            }
            if let Some(caps) = re_line.captures(line) {
                let mantissa: f64 = caps[1].parse().unwrap_or(0.0);
                let exponent: i32 = caps[2].parse().unwrap_or(0);
                let re_file = mantissa * 10f64.powi(exponent);
                if (re_file - self.def.re).abs() > self.def.re.abs() * RE_MATCH_TOLERANCE {
                    return Err(load_err(format!(
                        "Re of polar ({}) and of polar file ({re_file}) not equal",
                        self.def.re
                    )));
                }
                if let Some(nc) = ncrit_line.captures(line) {
                    let ncrit_file: f64 = nc[1].parse().unwrap_or(0.0);
                    if ncrit_file != self.def.ncrit {
                        return Err(load_err(format!(
                            "Ncrit of polar ({}) and of polar file ({ncrit_file}) not equal",
                            self.def.ncrit
                        )));
                    }
                }
                continue;
            }
            if line.contains("-------") {
                in_data = true;
                continue;
            }
            if !in_data {
                continue;
            }
            let values: Vec<f64> = line
                .split_whitespace()
                .filter_map(|v| v.parse().ok())
                .collect();
            if values.len() < 7 {
                continue;
            }
            let mut point = PolarPoint {
                alpha: values[0],
                cl: values[1],
                cd: values[2],
                cdp: values[3],
                cm: values[4],
                xtrt: values[5],
                xtrb: values[6],
                bubble_top: None,
                bubble_bot: None,
            };
            if values.len() == 11 {
                // a bubble coordinate of 0 means no bubble
                if values[7] > 0.0 && values[8] > 0.0 {
                    point.bubble_top = Some((values[7], values[8]));
                }
                if values[9] > 0.0 && values[10] > 0.0 {
                    point.bubble_bot = Some((values[9], values[10]));
                }
            }
            points.push(point);
        }

        if points.is_empty() {
            return Err(load_err("could not read polar file".to_string()));
        }
        Ok(points)
    }

    /// Append points directly (used by tests and the worker harvest).
    pub fn set_points(&mut self, points: Vec<PolarPoint>) {
        self.points = points;
    }
}

fn bisection(values: &[f64], target: f64) -> isize {
    if values.is_empty() || target < values[0] {
        return -1;
    }
    let n = values.len();
    if target >= values[n - 1] {
        return (n - 1) as isize;
    }
    let mut lo = 0usize;
    let mut hi = n - 1;
    while hi - lo > 1 {
        let mid = (lo + hi) / 2;
        if values[mid] <= target {
            lo = mid;
        } else {
            hi = mid;
        }
    }
    lo as isize
}

fn interpolate(x1: f64, x2: f64, y1: f64, y2: f64, x: f64) -> f64 {
    if x2 == x1 {
        y1
    } else {
        y1 + (y2 - y1) * (x - x1) / (x2 - x1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_polar() -> Polar {
        let mut polar = Polar::new(PolarDef::default());
        let mut points = Vec::new();
        for i in 0..21 {
            let alpha = -2.0 + i as f64 * 0.5;
            let cl = 0.11 * alpha + 0.25;
            let cd = 0.006 + 0.0004 * alpha * alpha;
            points.push(PolarPoint {
                alpha,
                cl,
                cd,
                cdp: cd * 0.4,
                cm: -0.05,
                xtrt: 0.5,
                xtrb: 0.9,
                ..PolarPoint::default()
            });
        }
        polar.set_points(points);
        polar
    }

    #[test]
    fn interpolation_inside_range() {
        let polar = sample_polar();
        let cl = polar
            .get_interpolated(PolarVar::Alpha, 1.25, PolarVar::Cl, false)
            .unwrap();
        assert!((cl - 0.388).abs() <= 5e-4, "cl = {cl}");
        // cd rounds to 5 decimals
        let cd = polar
            .get_interpolated(PolarVar::Alpha, 1.25, PolarVar::Cd, false)
            .unwrap();
        assert_eq!(cd, (cd * 1e5).round() / 1e5);
    }

    #[test]
    fn interpolation_outside_range() {
        let polar = sample_polar();
        assert!(polar
            .get_interpolated(PolarVar::Alpha, 99.0, PolarVar::Cl, false)
            .is_none());
        let clamped = polar
            .get_interpolated(PolarVar::Alpha, 99.0, PolarVar::Cl, true)
            .unwrap();
        assert_eq!(clamped, polar.cl().last().copied().unwrap());
    }

    #[test]
    fn interpolated_point_requires_all_channels() {
        let polar = sample_polar();
        let p = polar
            .get_interpolated_point(PolarVar::Alpha, 1.25, false)
            .unwrap();
        assert!(p.cl > 0.0);
        assert!(polar
            .get_interpolated_point(PolarVar::Alpha, 99.0, false)
            .is_none());
    }

    #[test]
    fn sink_axis_trims_non_positive_lift() {
        let polar = sample_polar();
        let (xs, ys) = polar.of_vars(PolarVar::Sink, PolarVar::Cl);
        assert!(xs.iter().all(|&s| s > 0.0));
        assert_eq!(xs.len(), ys.len());
        assert!(xs.len() < polar.points().len());
    }

    #[test]
    fn characteristic_points() {
        let polar = sample_polar();
        let min_cd = polar.min_cd().unwrap();
        assert!((min_cd.alpha - 0.0).abs() < 0.26);
        let max_glide = polar.max_glide().unwrap();
        assert!(max_glide.glide() > 40.0);
        let alpha0 = polar.alpha_cl0().unwrap();
        assert!((alpha0 - (-0.25 / 0.11)).abs() < 0.05, "alpha0 = {alpha0}");
    }

    #[test]
    fn re_calc_for_t2() {
        let mut polar = sample_polar();
        polar.def_mut().polar_type = PolarType::T2;
        let res = polar.values_of(PolarVar::ReCalc);
        let cls = polar.cl();
        for (re, cl) in res.iter().zip(cls.iter()) {
            if *cl > 0.0 {
                assert!((re - 400_000.0 / cl.sqrt()).abs() < 1.0);
            } else {
                assert_eq!(*re, 0.0);
            }
        }
    }
}
