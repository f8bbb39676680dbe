//! Geometry mutators.
//!
//! Every mutator computes the new coordinates on a working copy first and
//! commits only on success; on failure the geometry keeps its previous
//! valid state and the observer receives a `Failed` event.

use tracing::{debug, warn};

use crate::geometry::{
    argmin, concat_sides, le_find, round10, Geometry, GeometryEvent, Strategy,
};
use crate::line::LineType;
use crate::repanel::{self, split_panels};
use crate::{GeometryError, ModKind};

/// Iteration limit of the splined normalization.
const NORMALIZE_MAX_ITER: usize = 10;
/// A LE further away than this from the origin is not an airfoil anymore.
const NORMALIZE_MAX_LE_DISTANCE: f64 = 0.1;

/// Requested panel counts for [`Geometry::repanel`].
#[derive(Debug, Clone, Copy)]
pub enum PanelCount {
    Total(usize),
    PerSide { upper: usize, lower: usize },
    Keep,
}

impl Geometry {
    /// Shift, rotate and scale so the LE lands at (0,0) and the TE at x=1
    /// with symmetric y. Splined geometries iterate with retained
    /// repaneling until the real LE coincides with the point LE.
    ///
    /// Returns `false` when the geometry was already normalized.
    pub fn normalize(&mut self) -> Result<bool, GeometryError> {
        if self.is_normalized() {
            return Ok(false);
        }
        if self.strategy() == Strategy::HicksHenne {
            return Err(GeometryError::Unsupported {
                op: "normalize",
                strategy: Strategy::HicksHenne,
            });
        }
        let mut work = self.clone_plain();
        match normalize_in_place(&mut work) {
            Ok(()) => {
                self.commit_xy(work.x.clone(), work.y.clone());
                self.record(ModKind::Normalize, String::new());
                self.notify(GeometryEvent::Changed {
                    kind: ModKind::Normalize,
                    label: String::new(),
                });
                Ok(true)
            }
            Err(e) => {
                self.notify(GeometryEvent::Failed {
                    kind: ModKind::Normalize,
                    reason: e.to_string(),
                });
                Err(e)
            }
        }
    }

    /// Resample the contour.
    ///
    /// Splined geometries get a fresh cosine-like distribution per side
    /// ([`PanelCount::Keep`] keeps the current counts); Bézier geometries
    /// only change their per-side sampling density.
    pub fn repanel(
        &mut self,
        count: PanelCount,
        le_bunch: f64,
        te_bunch: f64,
    ) -> Result<(), GeometryError> {
        let result = self.repanel_inner(count, le_bunch, te_bunch);
        match result {
            Ok(()) => {
                self.record(ModKind::Repanel, String::new());
                self.notify(GeometryEvent::Changed {
                    kind: ModKind::Repanel,
                    label: String::new(),
                });
                Ok(())
            }
            Err(e) => {
                self.notify(GeometryEvent::Failed {
                    kind: ModKind::Repanel,
                    reason: e.to_string(),
                });
                Err(e)
            }
        }
    }

    fn repanel_inner(
        &mut self,
        count: PanelCount,
        le_bunch: f64,
        te_bunch: f64,
    ) -> Result<(), GeometryError> {
        match self.strategy() {
            Strategy::Splined => {
                let (n_upper, n_lower) = self.panel_counts(count);
                let mut work = self.clone_plain();
                repanel_fresh_in_place(&mut work, n_upper, n_lower, le_bunch, te_bunch)?;
                // repanel shifts the LE slightly, pull it back once
                normalize_step_in_place(&mut work)?;
                self.commit_xy(work.x.clone(), work.y.clone());
                Ok(())
            }
            Strategy::Bezier => {
                let (n_upper, n_lower) = self.panel_counts(count);
                if let Some((upper, lower)) = self.bezier_sides_mut() {
                    upper.set_panel_distribution(n_upper + 1);
                    lower.set_panel_distribution(n_lower + 1);
                }
                self.resync_from_sides();
                Ok(())
            }
            strategy => Err(GeometryError::Unsupported {
                op: "repanel",
                strategy,
            }),
        }
    }

    fn panel_counts(&self, count: PanelCount) -> (usize, usize) {
        match count {
            PanelCount::Total(n) => split_panels(n),
            PanelCount::PerSide { upper, lower } => (upper, lower),
            PanelCount::Keep => {
                let ile = self.ile();
                (ile, self.n_panels() - ile)
            }
        }
    }

    /// Set the trailing edge gap, blending the change over the rear
    /// `x_blend` fraction of the chord.
    ///
    /// The thickness factor tails off exponentially away from the TE (the
    /// xfoil approach). `new_gap` is clamped to `[0, 0.1]`.
    pub fn set_te_gap(&mut self, new_gap: f64, x_blend: f64) -> Result<(), GeometryError> {
        let new_gap = new_gap.clamp(0.0, 0.1);
        let result = self.set_te_gap_inner(new_gap, x_blend);
        self.finish(
            result,
            ModKind::TeGap,
            trim_decimals(new_gap * 100.0, 7),
        )
    }

    fn set_te_gap_inner(&mut self, new_gap: f64, x_blend: f64) -> Result<(), GeometryError> {
        if let Some((upper, lower)) = self.bezier_sides_mut() {
            upper.set_te_y(new_gap / 2.0);
            lower.set_te_y(-new_gap / 2.0);
            self.resync_from_sides();
            return Ok(());
        }
        if self.strategy() == Strategy::HicksHenne {
            return Err(GeometryError::Unsupported {
                op: "set_te_gap",
                strategy: Strategy::HicksHenne,
            });
        }

        let x_blend = x_blend.clamp(0.0, 1.0);
        let gap = 2.0 * self.upper().y().last().copied().unwrap_or(0.0);
        let dgap = new_gap - gap;

        let mut sides = Vec::with_capacity(2);
        for line in [self.upper(), self.lower()] {
            let n = line.len();
            let sign = if line.is_upper() { 0.5 } else { -0.5 };
            let mut y_new = Vec::with_capacity(n);
            for i in 0..n {
                let tfac = if x_blend == 0.0 {
                    if i == 0 || i == n - 1 {
                        1.0
                    } else {
                        0.0
                    }
                } else {
                    let arg = ((1.0 - line.x()[i]) * (1.0 / x_blend - 1.0)).min(15.0);
                    (-arg).exp()
                };
                y_new.push(line.y()[i] + sign * dgap * line.x()[i] * tfac);
            }
            sides.push((line.x().to_vec(), y_new));
        }

        let (x, y) = concat_sides(&sides[0].0, &sides[0].1, &sides[1].0, &sides[1].1);
        self.commit_xy(x, y);
        Ok(())
    }

    /// Set the leading edge radius (reciprocal of the LE curvature) by
    /// scaling the thickness near the LE, blended over `x_blend`.
    pub fn set_le_radius(&mut self, new_radius: f64, x_blend: f64) -> Result<(), GeometryError> {
        let new_radius = new_radius.clamp(0.002, 0.05);
        let result = self.set_le_radius_inner(new_radius, x_blend);
        self.finish(
            result,
            ModKind::LeRadius,
            trim_decimals(new_radius * 100.0, 2),
        )
    }

    fn set_le_radius_inner(&mut self, new_radius: f64, x_blend: f64) -> Result<(), GeometryError> {
        if matches!(self.strategy(), Strategy::Bezier | Strategy::HicksHenne) {
            return Err(GeometryError::Unsupported {
                op: "set_le_radius",
                strategy: self.strategy(),
            });
        }
        let x_blend = x_blend.clamp(0.001, 1.0);

        let at_le = self
            .curvature()
            .ok_or(GeometryError::LeFindFailed)?
            .at_le();
        if at_le == 0.0 {
            return Err(GeometryError::NormalizationFailed {
                reason: "curvature at LE is zero".to_string(),
            });
        }
        let cur_radius = 1.0 / at_le;
        let factor = new_radius / cur_radius;
        let srfac = factor.abs().sqrt();

        let (thickness, camber) = self.camb_thick_lines()?;
        let mut thick_y = thickness.y().to_vec();
        for (i, &xi) in thickness.x().iter().enumerate() {
            let arg = (xi / x_blend).min(15.0);
            let tfac = 1.0 - (1.0 - srfac) * (-arg).exp();
            thick_y[i] *= tfac;
        }

        let (x, y) = rebuild_from_camb_thick(thickness.x(), &thick_y, camber.y());
        self.commit_xy(x, y);
        Ok(())
    }

    /// Move the highpoint of one of the derived lines and rebuild the
    /// contour through the matching route.
    ///
    /// A pure y change of the thickness scales the sides directly instead
    /// of taking the thickness/camber round trip (the airfoil must be
    /// normalized for that).
    pub fn set_highpoint_of(
        &mut self,
        kind: LineType,
        x_new: Option<f64>,
        y_new: Option<f64>,
    ) -> Result<(), GeometryError> {
        let (mod_kind, result) = self.set_highpoint_inner(kind, x_new, y_new);
        let label = match (result.as_ref(), mod_kind) {
            (Ok(()), ModKind::MaxThick) => {
                highpoint_label(self.thickness().map(|t| t.highpoint()), self.max_thick_initial)
            }
            (Ok(()), ModKind::MaxCamb) => {
                highpoint_label(self.camber().map(|c| c.highpoint()), self.max_camb_initial)
            }
            _ => String::new(),
        };
        self.finish(result, mod_kind, label)
    }

    fn set_highpoint_inner(
        &mut self,
        kind: LineType,
        x_new: Option<f64>,
        y_new: Option<f64>,
    ) -> (ModKind, Result<(), GeometryError>) {
        let mod_kind = match kind {
            LineType::Thickness => ModKind::MaxThick,
            LineType::Camber => ModKind::MaxCamb,
            LineType::Upper => ModKind::MaxUpper,
            LineType::Lower => ModKind::MaxLower,
            LineType::Curvature => {
                return (
                    ModKind::MaxThick,
                    Err(GeometryError::Unsupported {
                        op: "set_highpoint_of curvature",
                        strategy: self.strategy(),
                    }),
                )
            }
        };
        if matches!(self.strategy(), Strategy::Bezier | Strategy::HicksHenne) {
            return (
                mod_kind,
                Err(GeometryError::Unsupported {
                    op: "set_highpoint_of",
                    strategy: self.strategy(),
                }),
            );
        }
        (mod_kind, self.apply_highpoint(kind, x_new, y_new))
    }

    fn apply_highpoint(
        &mut self,
        kind: LineType,
        x_new: Option<f64>,
        y_new: Option<f64>,
    ) -> Result<(), GeometryError> {
        match kind {
            LineType::Thickness if x_new.is_none() => {
                // direct scaling of both sides, no thickness round trip
                if !self.is_normalized_points() {
                    return Err(GeometryError::NormalizationFailed {
                        reason: "airfoil must be normalized to set thickness".to_string(),
                    });
                }
                let mut thickness = self
                    .camb_thick_lines()?
                    .0;
                let (_, y_cur) = thickness.highpoint();
                let (_, y_clamped) = thickness.set_highpoint(None, y_new)?;
                if y_cur == 0.0 {
                    return Ok(());
                }
                let factor = y_clamped / y_cur;
                let upper_y: Vec<f64> = self.upper().y().iter().map(|&v| v * factor).collect();
                let lower_y: Vec<f64> = self.lower().y().iter().map(|&v| v * factor).collect();
                let (x, y) = concat_sides(
                    self.upper().x(),
                    &upper_y,
                    self.lower().x(),
                    &lower_y,
                );
                self.commit_xy(x, y);
            }
            LineType::Thickness | LineType::Camber => {
                let (mut thickness, mut camber) = self.camb_thick_lines()?;
                if kind == LineType::Thickness {
                    thickness.set_highpoint(x_new, y_new)?;
                } else {
                    camber.set_highpoint(x_new, y_new)?;
                }
                let (x, y) = rebuild_from_camb_thick(thickness.x(), thickness.y(), camber.y());
                self.commit_xy(x, y);
            }
            _ => {
                let mut upper = self.upper().clone();
                let mut lower = self.lower().clone();
                if kind == LineType::Upper {
                    upper.set_highpoint(x_new, y_new)?;
                } else {
                    lower.set_highpoint(x_new, y_new)?;
                }
                let (x, y) = concat_sides(upper.x(), upper.y(), lower.x(), lower.y());
                self.commit_xy(x, y);
            }
        }

        // the rebuilt contour may have drifted off the normalized frame
        let mut work = self.clone_plain();
        if normalize_in_place(&mut work).is_ok() {
            self.commit_xy(work.x.clone(), work.y.clone());
        }
        Ok(())
    }

    /// Blend two geometries: `t = 0` is `geo1`, `t = 1` is `geo2`. The
    /// geometry with the larger share provides the x grid, the other one
    /// is resampled onto it.
    pub fn blend(
        &mut self,
        geo1: &Geometry,
        geo2: &Geometry,
        t: f64,
    ) -> Result<(), GeometryError> {
        let result = self.blend_inner(geo1, geo2, t);
        self.finish(result, ModKind::Blend, String::new())
    }

    fn blend_inner(
        &mut self,
        geo1: &Geometry,
        geo2: &Geometry,
        t: f64,
    ) -> Result<(), GeometryError> {
        if matches!(self.strategy(), Strategy::Bezier | Strategy::HicksHenne) {
            return Err(GeometryError::Unsupported {
                op: "blend",
                strategy: self.strategy(),
            });
        }
        let t = t.clamp(0.0, 1.0);

        // working copies under the own strategy, normalized
        let mut g1 = self.adopt_strategy_of(geo1)?;
        let mut g2 = self.adopt_strategy_of(geo2)?;
        if !g1.is_normalized() {
            normalize_in_place(&mut g1)?;
        }
        if !g2.is_normalized() {
            normalize_in_place(&mut g2)?;
        }

        if t == 0.0 {
            self.commit_xy(g1.x.clone(), g1.y.clone());
            return Ok(());
        }
        if t == 1.0 {
            self.commit_xy(g2.x.clone(), g2.y.clone());
            return Ok(());
        }

        let (upper_x, lower_x, y1u, y1l, y2u, y2l) = if t <= 0.5 {
            let upper_x = g1.upper().x().to_vec();
            let lower_x = g1.lower().x().to_vec();
            let u2 = g2.upper_new_x(&upper_x)?;
            let l2 = g2.lower_new_x(&lower_x)?;
            (
                upper_x,
                lower_x,
                g1.upper().y().to_vec(),
                g1.lower().y().to_vec(),
                u2.y().to_vec(),
                l2.y().to_vec(),
            )
        } else {
            let upper_x = g2.upper().x().to_vec();
            let lower_x = g2.lower().x().to_vec();
            let u1 = g1.upper_new_x(&upper_x)?;
            let l1 = g1.lower_new_x(&lower_x)?;
            (
                upper_x,
                lower_x,
                u1.y().to_vec(),
                l1.y().to_vec(),
                g2.upper().y().to_vec(),
                g2.lower().y().to_vec(),
            )
        };

        let y_upper: Vec<f64> = y1u
            .iter()
            .zip(y2u.iter())
            .map(|(&a, &b)| (1.0 - t) * a + t * b)
            .collect();
        let y_lower: Vec<f64> = y1l
            .iter()
            .zip(y2l.iter())
            .map(|(&a, &b)| (1.0 - t) * a + t * b)
            .collect();

        let (x, y) = concat_sides(&upper_x, &y_upper, &lower_x, &y_lower);
        self.commit_xy(x, y);
        Ok(())
    }

    // --- shared plumbing --------------------------------------------------

    fn finish(
        &mut self,
        result: Result<(), GeometryError>,
        kind: ModKind,
        label: String,
    ) -> Result<(), GeometryError> {
        match result {
            Ok(()) => {
                self.record(kind, label.clone());
                self.notify(GeometryEvent::Changed { kind, label });
                Ok(())
            }
            Err(e) => {
                warn!(kind = ?kind, error = %e, "geometry modification failed");
                self.notify(GeometryEvent::Failed {
                    kind,
                    reason: e.to_string(),
                });
                Err(e)
            }
        }
    }

    /// Plain working copy with the same coordinates and a Basic/Splined
    /// strategy; observer and record do not travel along.
    pub(crate) fn clone_plain(&self) -> Geometry {
        let strategy = match self.strategy() {
            Strategy::Basic => Strategy::Basic,
            _ => Strategy::Splined,
        };
        // coordinates were validated on construction
        Geometry::new(self.x.clone(), self.y.clone(), strategy)
            .unwrap_or_else(|_| self.clone())
    }

    fn adopt_strategy_of(&self, other: &Geometry) -> Result<Geometry, GeometryError> {
        if other.strategy() == self.strategy() {
            Ok(other.clone())
        } else {
            other.with_strategy(self.strategy())
        }
    }

    /// Owned thickness and camber lines or the matching error.
    pub(crate) fn camb_thick_lines(&self) -> Result<(crate::Line, crate::Line), GeometryError> {
        match (self.thickness(), self.camber()) {
            (Some(t), Some(c)) => Ok((t.clone(), c.clone())),
            _ => Err(GeometryError::NormalizationFailed {
                reason: "thickness/camber could not be derived".to_string(),
            }),
        }
    }
}

/// Iterative in-place normalization without event and record handling.
pub(crate) fn normalize_in_place(geo: &mut Geometry) -> Result<(), GeometryError> {
    if geo.is_normalized() {
        return Ok(());
    }
    match geo.strategy() {
        Strategy::Bezier => Ok(()), // normalized by construction
        Strategy::Basic | Strategy::HicksHenne => normalize_step_in_place(geo),
        Strategy::Splined => {
            for n in 1..=NORMALIZE_MAX_ITER {
                if n > 1 {
                    repanel_retain_in_place(geo)?;
                }
                normalize_step_in_place(geo)?;
                if geo.is_le_close_to_real() {
                    debug!(iteration = n, "splined normalize converged");
                    return Ok(());
                }
            }
            Err(GeometryError::NormalizationFailed {
                reason: format!(
                    "splined LE still off origin after {NORMALIZE_MAX_ITER} iterations"
                ),
            })
        }
    }
}

/// One coordinate-based normalize pass: translate the real LE to the
/// origin, rotate the chord onto the x axis, scale both sides to 1.
fn normalize_step_in_place(geo: &mut Geometry) -> Result<(), GeometryError> {
    let (x_le, y_le) = geo.le_real();
    let norm2 = (x_le * x_le + y_le * y_le).sqrt();
    if norm2 > NORMALIZE_MAX_LE_DISTANCE {
        return Err(GeometryError::NormalizationFailed {
            reason: format!("LE ({x_le:.4},{y_le:.4}) too far away from origin"),
        });
    }

    let n = geo.x.len();
    let mut xn: Vec<f64> = geo.x.iter().map(|&x| x - x_le).collect();
    let mut yn: Vec<f64> = geo.y.iter().map(|&y| y - y_le).collect();

    let angle = ((yn[0] + yn[n - 1]) / 2.0).atan2((xn[0] + xn[n - 1]) / 2.0);
    let (sina, cosa) = (-angle).sin_cos();
    for i in 0..n {
        let (xi, yi) = (xn[i], yn[i]);
        xn[i] = xi * cosa - yi * sina;
        yn[i] = xi * sina + yi * cosa;
    }

    let ile = argmin(&xn);
    if xn[0] != 1.0 || xn[n - 1] != 1.0 {
        let scale_upper = 1.0 / xn[0];
        let scale_lower = 1.0 / xn[n - 1];
        for i in 0..n {
            let scale = if i <= ile { scale_upper } else { scale_lower };
            xn[i] *= scale;
            yn[i] *= scale;
        }
    }

    xn[ile] = 0.0;
    yn[ile] = 0.0;
    xn[0] = 1.0;
    xn[n - 1] = 1.0;
    yn[n - 1] = -yn[0];

    geo.x = xn.iter().map(|&v| round10(v)).collect();
    geo.y = yn.iter().map(|&v| round10(v)).collect();
    geo.reset_caches();
    Ok(())
}

/// Repanel keeping the current knot distribution, stretched so the LE knot
/// lands on the freshly searched LE parameter.
fn repanel_retain_in_place(geo: &mut Geometry) -> Result<(), GeometryError> {
    let ile = geo.ile();
    let xy: Vec<(f64, f64)> = {
        let spline = geo.spline().ok_or(GeometryError::LeFindFailed)?;
        let u_le_new = le_find(spline, &geo.x, &geo.y)?;
        let u_new = repanel::stretch_retain(spline.u(), ile, u_le_new);
        u_new.iter().map(|&u| spline.eval(u, 0)).collect()
    };
    geo.x = xy.iter().map(|p| round10(p.0)).collect();
    geo.y = xy.iter().map(|p| round10(p.1)).collect();
    geo.reset_caches();
    Ok(())
}

/// Fresh cosine-like repanel of a splined geometry.
fn repanel_fresh_in_place(
    geo: &mut Geometry,
    n_pan_upper: usize,
    n_pan_lower: usize,
    le_bunch: f64,
    te_bunch: f64,
) -> Result<(), GeometryError> {
    let (u_new, xy): (Vec<f64>, Vec<(f64, f64)>) = {
        let spline = geo.spline().ok_or(GeometryError::LeFindFailed)?;
        let u_le = le_find(spline, &geo.x, &geo.y)?;

        let u_cos_upper = repanel::side_distribution(n_pan_upper + 1, le_bunch, te_bunch);
        let u_new_upper: Vec<f64> = u_cos_upper
            .iter()
            .rev()
            .map(|&u| (u - 1.0).abs() * u_le)
            .collect();

        let u_cos_lower = repanel::side_distribution(n_pan_lower + 1, le_bunch, te_bunch);
        let u_new_lower: Vec<f64> = u_cos_lower
            .iter()
            .map(|&u| u * (1.0 - u_le) + u_le)
            .collect();

        let mut u_new = u_new_upper;
        u_new.extend_from_slice(&u_new_lower[1..]);
        let xy = u_new.iter().map(|&u| spline.eval(u, 0)).collect();
        (u_new, xy)
    };
    debug!(
        n_pan_upper,
        n_pan_lower,
        n_points = u_new.len(),
        "fresh repanel"
    );
    geo.x = xy.iter().map(|p| round10(p.0)).collect();
    geo.y = xy.iter().map(|p| round10(p.1)).collect();
    geo.reset_caches();
    Ok(())
}

/// Rebuild contour coordinates from thickness and camber on a shared grid.
fn rebuild_from_camb_thick(x: &[f64], thick_y: &[f64], camber_y: &[f64]) -> (Vec<f64>, Vec<f64>) {
    let y_upper: Vec<f64> = camber_y
        .iter()
        .zip(thick_y.iter())
        .map(|(&c, &t)| c + t / 2.0)
        .collect();
    let y_lower: Vec<f64> = camber_y
        .iter()
        .zip(thick_y.iter())
        .map(|(&c, &t)| c - t / 2.0)
        .collect();
    concat_sides(x, &y_upper, x, &y_lower)
}

/// `"8.3@40"` style label of a highpoint against its initial position.
fn highpoint_label(current: Option<(f64, f64)>, initial: Option<(f64, f64)>) -> String {
    let Some((x, y)) = current else {
        return String::new();
    };
    let mut label = trim_decimals(y * 100.0, 2);
    let x_moved = initial.map(|(xi, _)| (x - xi).abs() > 1e-4).unwrap_or(false);
    if x_moved {
        label.push('@');
        label.push_str(&trim_decimals(x * 100.0, 1));
    }
    label
}

/// Fixed-decimal format with trailing zeros (and a trailing dot) removed.
pub(crate) fn trim_decimals(value: f64, decimals: usize) -> String {
    let s = format!("{value:.decimals$}");
    if s.contains('.') {
        s.trim_end_matches('0').trim_end_matches('.').to_string()
    } else {
        s
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trim_decimals_strips_zeros() {
        assert_eq!(trim_decimals(0.5, 7), "0.5");
        assert_eq!(trim_decimals(1.0, 2), "1");
        assert_eq!(trim_decimals(8.25, 2), "8.25");
    }

    #[test]
    fn highpoint_label_formats() {
        assert_eq!(highpoint_label(Some((0.3, 0.083)), Some((0.3, 0.12))), "8.3");
        assert_eq!(
            highpoint_label(Some((0.4, 0.10)), Some((0.3, 0.12))),
            "10@40"
        );
        assert_eq!(highpoint_label(None, None), "");
    }
}
