//! The airfoil contour with its strategy, derived lines and caches.

use std::cell::OnceCell;
use std::fmt;
use std::sync::Arc;

use core_spline::util::{self, SearchOptions};
use core_spline::{Boundary, Spline2d};
use tracing::{debug, warn};

use crate::curvature::Curvature;
use crate::line::{Line, LineType};
use crate::side::{BezierSide, HicksHenneSide};
use crate::{GeometryError, ModKind, Modification, EPSILON_LE_CLOSE};

/// Strategy tag of a [`Geometry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Linear interpolation between the points.
    Basic,
    /// Cubic 2-D spline over the contour; enables the exact LE.
    Splined,
    /// Two parametric Bézier sides.
    Bezier,
    /// Seed coordinates plus Hicks-Henne bump functions per side.
    HicksHenne,
}

/// Per-strategy state.
#[derive(Clone)]
pub(crate) enum StrategyData {
    Basic,
    Splined,
    Bezier {
        upper: BezierSide,
        lower: BezierSide,
    },
    HicksHenne {
        upper: HicksHenneSide,
        lower: HicksHenneSide,
    },
}

/// Typed change notification emitted after a mutator commits or fails.
#[derive(Debug, Clone, PartialEq)]
pub enum GeometryEvent {
    Changed { kind: ModKind, label: String },
    Failed { kind: ModKind, reason: String },
}

/// Subscriber for [`GeometryEvent`]s; the UI layer implements this.
pub trait GeometryObserver: Send + Sync {
    fn on_geometry(&self, event: &GeometryEvent);
}

#[derive(Clone, Default)]
pub(crate) struct Caches {
    pub upper: OnceCell<Line>,
    pub lower: OnceCell<Line>,
    pub thickness: OnceCell<Option<Line>>,
    pub camber: OnceCell<Option<Line>>,
    pub curvature: OnceCell<Option<Curvature>>,
    pub spline: OnceCell<Option<Spline2d>>,
    pub u_le: OnceCell<Option<f64>>,
}

/// Airfoil contour from upper TE over the LE back to the lower TE.
#[derive(Clone)]
pub struct Geometry {
    pub(crate) x: Vec<f64>,
    pub(crate) y: Vec<f64>,
    pub(crate) data: StrategyData,
    pub(crate) cache: Caches,
    pub(crate) mods: Vec<Modification>,
    pub(crate) max_thick_initial: Option<(f64, f64)>,
    pub(crate) max_camb_initial: Option<(f64, f64)>,
    pub(crate) observer: Option<Arc<dyn GeometryObserver>>,
}

impl fmt::Debug for Geometry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Geometry")
            .field("strategy", &self.strategy())
            .field("n_points", &self.x.len())
            .field("mods", &self.mods)
            .finish()
    }
}

impl Geometry {
    /// Basic or splined geometry from contour coordinates.
    pub fn new(x: Vec<f64>, y: Vec<f64>, strategy: Strategy) -> Result<Self, GeometryError> {
        let data = match strategy {
            Strategy::Basic => StrategyData::Basic,
            Strategy::Splined => StrategyData::Splined,
            _ => {
                return Err(GeometryError::InvalidCoordinates {
                    reason: format!("{strategy:?} geometry needs side definitions"),
                })
            }
        };
        validate_coordinates(&x, &y)?;
        Ok(Self {
            x,
            y,
            data,
            cache: Caches::default(),
            mods: Vec::new(),
            max_thick_initial: None,
            max_camb_initial: None,
            observer: None,
        })
    }

    /// Geometry from two Bézier sides; coordinates are the sampled curve.
    pub fn new_bezier(upper: BezierSide, lower: BezierSide) -> Result<Self, GeometryError> {
        let (x, y) = concat_sides(upper.x(), upper.y(), lower.x(), lower.y());
        validate_coordinates(&x, &y)?;
        Ok(Self {
            x,
            y,
            data: StrategyData::Bezier { upper, lower },
            cache: Caches::default(),
            mods: Vec::new(),
            max_thick_initial: None,
            max_camb_initial: None,
            observer: None,
        })
    }

    /// Geometry from two Hicks-Henne sides.
    pub fn new_hicks_henne(
        upper: HicksHenneSide,
        lower: HicksHenneSide,
    ) -> Result<Self, GeometryError> {
        let (x, y) = concat_sides(upper.x(), upper.y(), lower.x(), lower.y());
        validate_coordinates(&x, &y)?;
        Ok(Self {
            x,
            y,
            data: StrategyData::HicksHenne { upper, lower },
            cache: Caches::default(),
            mods: Vec::new(),
            max_thick_initial: None,
            max_camb_initial: None,
            observer: None,
        })
    }

    pub fn strategy(&self) -> Strategy {
        match self.data {
            StrategyData::Basic => Strategy::Basic,
            StrategyData::Splined => Strategy::Splined,
            StrategyData::Bezier { .. } => Strategy::Bezier,
            StrategyData::HicksHenne { .. } => Strategy::HicksHenne,
        }
    }

    /// Same coordinates under a different (Basic / Splined) strategy.
    pub fn with_strategy(&self, strategy: Strategy) -> Result<Self, GeometryError> {
        Self::new(self.x.clone(), self.y.clone(), strategy)
    }

    pub fn set_observer(&mut self, observer: Arc<dyn GeometryObserver>) {
        self.observer = Some(observer);
    }

    pub(crate) fn notify(&self, event: GeometryEvent) {
        if let Some(obs) = &self.observer {
            obs.on_geometry(&event);
        }
    }

    // --- coordinates and basic queries ------------------------------------

    pub fn x(&self) -> &[f64] {
        &self.x
    }

    pub fn y(&self) -> &[f64] {
        &self.y
    }

    pub fn n_points(&self) -> usize {
        self.x.len()
    }

    pub fn n_panels(&self) -> usize {
        self.x.len().saturating_sub(1)
    }

    /// Index of the point-based leading edge (minimum x).
    pub fn ile(&self) -> usize {
        argmin(&self.x)
    }

    /// Point-based leading edge.
    pub fn le(&self) -> (f64, f64) {
        let i = self.ile();
        (self.x[i], self.y[i])
    }

    /// Exact leading edge.
    ///
    /// For the splined strategy this is the point where the tangent is
    /// perpendicular to the TE chord vector; a failed search falls back to
    /// the point-based LE with a warning. Other strategies return the
    /// point-based LE (the Bézier LE is its fixed first control point).
    pub fn le_real(&self) -> (f64, f64) {
        match self.data {
            StrategyData::Splined => match (self.spline(), self.u_le()) {
                (Some(spline), Some(u_le)) => spline.eval(u_le, 0),
                _ => {
                    warn!("LE search failed, falling back to point-based LE");
                    self.le()
                }
            },
            StrategyData::Bezier { .. } => (0.0, 0.0),
            _ => self.le(),
        }
    }

    /// Trailing edge midpoint.
    pub fn te(&self) -> (f64, f64) {
        let n = self.x.len();
        (
            (self.x[0] + self.x[n - 1]) / 2.0,
            (self.y[0] + self.y[n - 1]) / 2.0,
        )
    }

    pub fn te_gap(&self) -> f64 {
        self.y[0] - self.y[self.y.len() - 1]
    }

    /// Leading edge radius, the reciprocal of the curvature at the LE.
    pub fn le_radius(&self) -> Option<f64> {
        let at_le = self.curvature()?.at_le();
        if at_le == 0.0 {
            None
        } else {
            Some(1.0 / at_le)
        }
    }

    /// Angle between the two panels meeting at the LE, in degrees.
    pub fn panel_angle_le(&self) -> f64 {
        let i = self.ile();
        if i == 0 || i + 1 >= self.x.len() {
            return 0.0;
        }
        panel_angle(&self.x, &self.y, i)
    }

    /// Sharpest kink between adjacent panels and its index.
    pub fn panel_angle_min(&self) -> (f64, usize) {
        let mut min_angle = 180.0;
        let mut at = 0;
        for i in 1..self.x.len() - 1 {
            let a = panel_angle(&self.x, &self.y, i);
            if a < min_angle {
                min_angle = a;
                at = i;
            }
        }
        (min_angle, at)
    }

    /// Probably flapped: a sharp panel kink aft of mid chord.
    pub fn is_flapped(&self) -> bool {
        let (angle, at) = self.panel_angle_min();
        angle < 172.0 && self.x[at] > 0.5
    }

    /// Normalized: LE at (0,0), both TE x at 1, symmetric TE y. The
    /// splined strategy additionally requires the real LE within
    /// [`EPSILON_LE_CLOSE`] of the origin.
    pub fn is_normalized(&self) -> bool {
        if !self.is_normalized_points() {
            return false;
        }
        match self.data {
            StrategyData::Splined => self.is_le_close_to_real(),
            _ => true,
        }
    }

    pub(crate) fn is_normalized_points(&self) -> bool {
        let n = self.x.len();
        let i = self.ile();
        self.x[i] == 0.0
            && self.y[i] == 0.0
            && self.x[0] == 1.0
            && self.x[n - 1] == 1.0
            && self.y[0] == -self.y[n - 1]
    }

    pub(crate) fn is_le_close_to_real(&self) -> bool {
        let (xr, yr) = self.le_real();
        let (xp, yp) = self.le();
        ((xr - xp).powi(2) + (yr - yp).powi(2)).sqrt() <= EPSILON_LE_CLOSE
    }

    /// No camber anywhere.
    pub fn is_symmetrical(&self) -> bool {
        match self.camber() {
            Some(camber) => camber.highpoint().1 == 0.0,
            None => false,
        }
    }

    // --- modification record ----------------------------------------------

    pub fn modifications(&self) -> &[Modification] {
        &self.mods
    }

    /// Compact label of all modifications, e.g. `norm_t8.3_te0.5`.
    pub fn modifications_as_label(&self) -> String {
        self.mods
            .iter()
            .map(Modification::as_label)
            .collect::<Vec<_>>()
            .join("_")
    }

    pub(crate) fn record(&mut self, kind: ModKind, value: String) {
        // a repeated modification of the same kind replaces its entry
        self.mods.retain(|m| m.kind != kind);
        self.mods.push(Modification { kind, value });
    }

    // --- derived lines ----------------------------------------------------

    /// Upper side, reversed so x ascends 0..1.
    pub fn upper(&self) -> &Line {
        self.cache.upper.get_or_init(|| match &self.data {
            StrategyData::Bezier { upper, .. } => upper.as_line(),
            StrategyData::HicksHenne { upper, .. } => upper.as_line(),
            _ => {
                let i = self.ile();
                let x: Vec<f64> = self.x[..=i].iter().rev().copied().collect();
                let y: Vec<f64> = self.y[..=i].iter().rev().copied().collect();
                if matches!(self.data, StrategyData::Splined) {
                    Line::new_splined(x, y, LineType::Upper)
                } else {
                    Line::new(x, y, LineType::Upper)
                }
            }
        })
    }

    /// Lower side, x ascending 0..1.
    pub fn lower(&self) -> &Line {
        self.cache.lower.get_or_init(|| match &self.data {
            StrategyData::Bezier { lower, .. } => lower.as_line(),
            StrategyData::HicksHenne { lower, .. } => lower.as_line(),
            _ => {
                let i = self.ile();
                let x = self.x[i..].to_vec();
                let y = self.y[i..].to_vec();
                if matches!(self.data, StrategyData::Splined) {
                    Line::new_splined(x, y, LineType::Lower)
                } else {
                    Line::new(x, y, LineType::Lower)
                }
            }
        })
    }

    pub fn side(&self, kind: LineType) -> &Line {
        match kind {
            LineType::Lower => self.lower(),
            _ => self.upper(),
        }
    }

    /// Thickness distribution on the upper side x grid.
    pub fn thickness(&self) -> Option<&Line> {
        self.ensure_camb_thick();
        self.cache.thickness.get()?.as_ref()
    }

    /// Camber line on the upper side x grid.
    pub fn camber(&self) -> Option<&Line> {
        self.ensure_camb_thick();
        self.cache.camber.get()?.as_ref()
    }

    pub fn max_thick(&self) -> Option<f64> {
        self.thickness().map(|t| t.highpoint().1)
    }

    pub fn max_thick_x(&self) -> Option<f64> {
        self.thickness().map(|t| t.highpoint().0)
    }

    pub fn max_camb(&self) -> Option<f64> {
        self.camber().map(|c| c.highpoint().1)
    }

    pub fn max_camb_x(&self) -> Option<f64> {
        self.camber().map(|c| c.highpoint().0)
    }

    /// Thickness and camber are the sum and mean of the sides on a common
    /// x grid; a non-normalized airfoil is normalized on a working copy
    /// first so the distributions are exact.
    fn ensure_camb_thick(&self) {
        if self.cache.thickness.get().is_some() {
            return;
        }
        let built = self.build_camb_thick();
        let (thickness, camber) = match built {
            Ok(pair) => (Some(pair.0), Some(pair.1)),
            Err(e) => {
                warn!(error = %e, "thickness/camber construction failed");
                (None, None)
            }
        };
        let _ = self.cache.thickness.set(thickness);
        let _ = self.cache.camber.set(camber);
    }

    fn build_camb_thick(&self) -> Result<(Line, Line), GeometryError> {
        let (upper, lower) = if self.is_normalized_points() {
            let upper = self.upper().clone();
            let lower = self.lower_new_x(upper.x())?;
            (upper, lower)
        } else {
            // normalize a working copy, keep self untouched
            debug!("normalizing working copy for thickness");
            let mut work = Self::new(self.x.clone(), self.y.clone(), Strategy::Splined)?;
            crate::modify::normalize_in_place(&mut work)?;
            let upper = work.upper().clone();
            let lower = work.lower_new_x(upper.x())?;
            (upper, lower)
        };

        if !upper.is_normalized() || !lower.is_normalized() {
            return Err(GeometryError::NormalizationFailed {
                reason: "sides are not normalized for thickness".to_string(),
            });
        }

        let thickness_y: Vec<f64> = upper
            .y()
            .iter()
            .zip(lower.y().iter())
            .map(|(&u, &l)| round10(u - l))
            .collect();
        let mut camber_y: Vec<f64> = upper
            .y()
            .iter()
            .zip(lower.y().iter())
            .map(|(&u, &l)| round10((u + l) / 2.0))
            .collect();

        // unclean symmetric data gets an exactly zero camber line
        if camber_y.iter().cloned().fold(f64::MIN, f64::max) < 1e-5 {
            camber_y = vec![0.0; camber_y.len()];
        }

        Ok((
            Line::new(upper.x().to_vec(), thickness_y, LineType::Thickness),
            Line::new(upper.x().to_vec(), camber_y, LineType::Camber),
        ))
    }

    /// Curvature over the contour; `None` when the backing spline cannot
    /// be built.
    pub fn curvature(&self) -> Option<&Curvature> {
        self.cache
            .curvature
            .get_or_init(|| match &self.data {
                StrategyData::Bezier { upper, lower } => Some(Curvature::of_bezier(upper, lower)),
                _ => {
                    let spline = self.spline()?;
                    Some(Curvature::of_spline(spline, &self.x, self.ile()))
                }
            })
            .as_ref()
    }

    // --- spline backing ---------------------------------------------------

    pub(crate) fn spline(&self) -> Option<&Spline2d> {
        self.cache
            .spline
            .get_or_init(|| match Spline2d::new(&self.x, &self.y, Boundary::NotAKnot) {
                Ok(s) => Some(s),
                Err(e) => {
                    warn!(error = %e, "contour spline construction failed");
                    None
                }
            })
            .as_ref()
    }

    /// Arc parameter of the real LE on the contour spline.
    pub(crate) fn u_le(&self) -> Option<f64> {
        *self.cache.u_le.get_or_init(|| {
            let spline = self.spline()?;
            match le_find(spline, &self.x, &self.y) {
                Ok(u) => Some(u),
                Err(e) => {
                    warn!(error = %e, "LE root search failed");
                    None
                }
            }
        })
    }

    // --- side resampling --------------------------------------------------

    /// Upper side evaluated on a new x grid.
    pub fn upper_new_x(&self, xs: &[f64]) -> Result<Line, GeometryError> {
        match &self.data {
            StrategyData::Bezier { upper, .. } => Ok(side_on_new_x_bezier(upper, xs)),
            _ if matches!(self.data, StrategyData::Splined) => self.side_new_x_splined(xs, true),
            _ => Ok(side_on_new_x_linear(self.upper(), xs)),
        }
    }

    /// Lower side evaluated on a new x grid.
    pub fn lower_new_x(&self, xs: &[f64]) -> Result<Line, GeometryError> {
        match &self.data {
            StrategyData::Bezier { lower, .. } => Ok(side_on_new_x_bezier(lower, xs)),
            _ if matches!(self.data, StrategyData::Splined) => self.side_new_x_splined(xs, false),
            _ => Ok(side_on_new_x_linear(self.lower(), xs)),
        }
    }

    /// Spline-exact side evaluation: find `u` with `x(u) = target` per
    /// point. The first points near the LE use the bounded scalar search;
    /// further out a secant iteration on the previous result is enough
    /// and much faster.
    fn side_new_x_splined(&self, xs: &[f64], is_upper: bool) -> Result<Line, GeometryError> {
        let spline = self.spline().ok_or(GeometryError::LeFindFailed)?;
        let u_le = self.u_le().ok_or(GeometryError::LeFindFailed)?;

        let (u_start, u_end) = if is_upper { (0.0, u_le) } else { (u_le, 1.0) };

        let mut ys = Vec::with_capacity(xs.len());
        let mut u_prev: Option<(f64, f64)> = None; // (u, x residual base)
        let mut u_guess = if is_upper { 0.25 } else { 0.75 };

        for (i, &x_target) in xs.iter().enumerate() {
            let u = match u_prev {
                Some((u0, x0)) if i > 6 => secant_on_x(spline, x_target, u0, x0, u_start, u_end),
                _ => None,
            };
            let u = match u {
                Some(u) => u,
                None => {
                    let opts = SearchOptions {
                        no_improve_thr: 1e-6,
                        ..SearchOptions::default()
                    };
                    util::find_min(
                        |u| (spline.evalx(u) - x_target).abs(),
                        u_guess,
                        (u_start, u_end),
                        opts,
                    )
                }
            };
            u_guess = u;
            u_prev = Some((u, spline.evalx(u)));
            ys.push(spline.evaly(u));
        }

        // pin LE and TE against residual error of the search
        if !xs.is_empty() {
            let ile = self.ile();
            if xs[0] == self.x[ile] {
                ys[0] = self.y[ile];
            }
            let last = xs.len() - 1;
            if is_upper && xs[last] == self.x[0] {
                ys[last] = self.y[0];
            } else if !is_upper && xs[last] == self.x[self.x.len() - 1] {
                ys[last] = self.y[self.x.len() - 1];
            }
        }

        let kind = if is_upper { LineType::Upper } else { LineType::Lower };
        Ok(Line::new_splined(xs.to_vec(), ys, kind))
    }

    /// y values on a side for given x values, normalizing a working copy
    /// first when needed.
    pub fn get_y_on(&self, kind: LineType, xs: &[f64]) -> Result<Vec<f64>, GeometryError> {
        let line = match kind {
            LineType::Lower => self.lower_new_x(xs)?,
            _ => self.upper_new_x(xs)?,
        };
        Ok(line.y().to_vec())
    }

    // --- strategy internals -----------------------------------------------

    /// The two Bézier sides of a Bézier geometry.
    pub fn bezier_sides(&self) -> Option<(&BezierSide, &BezierSide)> {
        match &self.data {
            StrategyData::Bezier { upper, lower } => Some((upper, lower)),
            _ => None,
        }
    }

    pub(crate) fn bezier_sides_mut(&mut self) -> Option<(&mut BezierSide, &mut BezierSide)> {
        match &mut self.data {
            StrategyData::Bezier { upper, lower } => Some((upper, lower)),
            _ => None,
        }
    }

    /// The two Hicks-Henne sides of a Hicks-Henne geometry.
    pub fn hicks_henne_sides(&self) -> Option<(&HicksHenneSide, &HicksHenneSide)> {
        match &self.data {
            StrategyData::HicksHenne { upper, lower } => Some((upper, lower)),
            _ => None,
        }
    }

    /// Drop all caches after a coordinate change.
    pub(crate) fn reset_caches(&mut self) {
        self.cache = Caches::default();
    }

    /// Commit new coordinates, remembering the initial thickness and
    /// camber highpoints for later label generation.
    pub(crate) fn commit_xy(&mut self, x: Vec<f64>, y: Vec<f64>) {
        if self.max_thick_initial.is_none() {
            self.max_thick_initial = self.thickness().map(|t| t.highpoint());
            self.max_camb_initial = self.camber().map(|c| c.highpoint());
        }
        self.x = x;
        self.y = y;
        self.reset_caches();
    }

    /// Rebuild coordinates from the Bézier sides after a control point or
    /// sampling change.
    pub(crate) fn resync_from_sides(&mut self) {
        let (x, y) = match &self.data {
            StrategyData::Bezier { upper, lower } => {
                concat_sides(upper.x(), upper.y(), lower.x(), lower.y())
            }
            StrategyData::HicksHenne { upper, lower } => {
                concat_sides(upper.x(), upper.y(), lower.x(), lower.y())
            }
            _ => return,
        };
        self.x = x;
        self.y = y;
        self.reset_caches();
    }
}

// --- free helpers ---------------------------------------------------------

pub(crate) fn validate_coordinates(x: &[f64], y: &[f64]) -> Result<(), GeometryError> {
    if x.len() != y.len() {
        return Err(GeometryError::InvalidCoordinates {
            reason: format!("x and y length differ: {} vs {}", x.len(), y.len()),
        });
    }
    if x.len() < 5 {
        return Err(GeometryError::InvalidCoordinates {
            reason: format!("{} points are not enough for an airfoil", x.len()),
        });
    }
    if x.iter().chain(y.iter()).any(|v| !v.is_finite()) {
        return Err(GeometryError::InvalidCoordinates {
            reason: "coordinates contain NaN or infinite values".to_string(),
        });
    }
    let ile = argmin(x);
    if ile == 0 || ile == x.len() - 1 {
        return Err(GeometryError::InvalidCoordinates {
            reason: "contour has no interior leading edge".to_string(),
        });
    }
    Ok(())
}

/// Concatenate a (reversed) upper and a lower side into one contour.
pub(crate) fn concat_sides(
    ux: &[f64],
    uy: &[f64],
    lx: &[f64],
    ly: &[f64],
) -> (Vec<f64>, Vec<f64>) {
    let mut x: Vec<f64> = ux.iter().rev().copied().collect();
    let mut y: Vec<f64> = uy.iter().rev().copied().collect();
    x.extend_from_slice(&lx[1..]);
    y.extend_from_slice(&ly[1..]);
    (x, y)
}

/// LE search on the contour spline: root of the scalar product between the
/// tangent at `u` and the chord vector from the TE to `u`.
pub(crate) fn le_find(spline: &Spline2d, x: &[f64], y: &[f64]) -> Result<f64, GeometryError> {
    let n = x.len();
    let x_te = (x[0] + x[n - 1]) / 2.0;
    let y_te = (y[0] + y[n - 1]) / 2.0;

    let dot = |u: f64| {
        let (px, py) = spline.eval(u, 0);
        let (dx, dy) = spline.eval(u, 1);
        dx * (px - x_te) + dy * (py - y_te)
    };

    let ile_guess = argmin(x);
    let u_guess = spline.u()[ile_guess.saturating_sub(1)];
    let umin = (u_guess - 0.1).max(0.4);
    let umax = (u_guess + 0.1).min(0.6);

    let u_le = util::find_root(dot, u_guess, (umin, umax), 1e-10)
        .ok_or(GeometryError::LeFindFailed)?;
    debug!(u_guess, u_le, "le_find");
    Ok(u_le)
}

fn side_on_new_x_linear(side: &Line, xs: &[f64]) -> Line {
    let ys: Vec<f64> = xs.iter().map(|&x| side.y_at(x)).collect();
    Line::new(xs.to_vec(), ys, side.kind())
}

fn side_on_new_x_bezier(side: &BezierSide, xs: &[f64]) -> Line {
    let ys: Vec<f64> = xs.iter().map(|&x| side.y_at(x, true)).collect();
    Line::new(xs.to_vec(), ys, side.kind())
}

/// Up to 4 secant steps on `x(u) - target`; `None` when it leaves the
/// bracket or stalls, letting the caller fall back to the bounded search.
fn secant_on_x(
    spline: &Spline2d,
    x_target: f64,
    u0: f64,
    x0: f64,
    u_min: f64,
    u_max: f64,
) -> Option<f64> {
    let mut u_a = u0;
    let mut f_a = x0 - x_target;
    let mut u_b = (u0 + (u_max - u_min) * 1e-3).min(u_max);
    let mut f_b = spline.evalx(u_b) - x_target;

    for _ in 0..4 {
        if (f_b - f_a).abs() < 1e-14 {
            return None;
        }
        let u_next = u_b - f_b * (u_b - u_a) / (f_b - f_a);
        if !(u_min..=u_max).contains(&u_next) {
            return None;
        }
        let f_next = spline.evalx(u_next) - x_target;
        u_a = u_b;
        f_a = f_b;
        u_b = u_next;
        f_b = f_next;
        if f_b.abs() < 1e-10 {
            return Some(u_b);
        }
    }
    if f_b.abs() < 1e-7 {
        Some(u_b)
    } else {
        None
    }
}

pub(crate) fn argmin(values: &[f64]) -> usize {
    let mut best = 0;
    for (i, &v) in values.iter().enumerate() {
        if v < values[best] {
            best = i;
        }
    }
    best
}

fn panel_angle(x: &[f64], y: &[f64], i: usize) -> f64 {
    let v1 = (x[i - 1] - x[i], y[i - 1] - y[i]);
    let v2 = (x[i + 1] - x[i], y[i + 1] - y[i]);
    let n1 = (v1.0 * v1.0 + v1.1 * v1.1).sqrt();
    let n2 = (v2.0 * v2.0 + v2.1 * v2.1).sqrt();
    if n1 == 0.0 || n2 == 0.0 {
        return 180.0;
    }
    let cosa = ((v1.0 * v2.0 + v1.1 * v2.1) / (n1 * n2)).clamp(-1.0, 1.0);
    cosa.acos().to_degrees()
}

pub(crate) fn round10(v: f64) -> f64 {
    (v * 1e10).round() / 1e10
}
