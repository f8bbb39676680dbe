//! A single operating point of a polar.

use crate::PolarVar;

/// One row of a polar: aerodynamic coefficients and transition locations,
/// optionally with laminar separation bubble ranges per side.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PolarPoint {
    pub alpha: f64,
    pub cl: f64,
    pub cd: f64,
    pub cdp: f64,
    pub cm: f64,
    pub xtrt: f64,
    pub xtrb: f64,
    /// Bubble `(x_start, x_end)` on the upper side.
    pub bubble_top: Option<(f64, f64)>,
    pub bubble_bot: Option<(f64, f64)>,
}

impl PolarPoint {
    /// Friction drag.
    pub fn cdf(&self) -> f64 {
        self.cd - self.cdp
    }

    pub fn glide(&self) -> f64 {
        if self.cd != 0.0 {
            self.cl / self.cd
        } else {
            0.0
        }
    }

    /// `cl^1.5 / cd`, proportional to the inverse sink rate.
    pub fn sink(&self) -> f64 {
        if self.cl > 0.0 && self.cd != 0.0 {
            self.cl.powf(1.5) / self.cd
        } else {
            0.0
        }
    }

    /// Mean transition location.
    pub fn xtr(&self) -> f64 {
        (self.xtrt + self.xtrb) / 2.0
    }

    /// The bubble on the upper side reaches the transition point, so the
    /// reattachment is turbulent-separated.
    pub fn is_bubble_top_separated(&self) -> bool {
        match self.bubble_top {
            Some((_, x_end)) => x_end >= self.xtrt,
            None => false,
        }
    }

    pub fn is_bubble_bot_separated(&self) -> bool {
        match self.bubble_bot {
            Some((_, x_end)) => x_end >= self.xtrb,
            None => false,
        }
    }

    /// Channel access by variable; `re` is the polar-level Reynolds
    /// number, needed for the T2 per-point value.
    pub fn value_of(&self, var: PolarVar, re_for_point: f64) -> f64 {
        match var {
            PolarVar::Alpha => self.alpha,
            PolarVar::Cl => self.cl,
            PolarVar::Cd => self.cd,
            PolarVar::Cdp => self.cdp,
            PolarVar::Cdf => self.cdf(),
            PolarVar::Glide => self.glide(),
            PolarVar::Cm => self.cm,
            PolarVar::ReCalc => re_for_point,
            PolarVar::Sink => self.sink(),
            PolarVar::Xtrt => self.xtrt,
            PolarVar::Xtrb => self.xtrb,
            PolarVar::Xtr => self.xtr(),
        }
    }

    /// Set a directly stored channel (derived channels are ignored).
    pub fn set_value_of(&mut self, var: PolarVar, value: f64) {
        match var {
            PolarVar::Alpha => self.alpha = value,
            PolarVar::Cl => self.cl = value,
            PolarVar::Cd => self.cd = value,
            PolarVar::Cdp => self.cdp = value,
            PolarVar::Cm => self.cm = value,
            PolarVar::Xtrt => self.xtrt = value,
            PolarVar::Xtrb => self.xtrb = value,
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derived_channels() {
        let p = PolarPoint {
            alpha: 2.0,
            cl: 0.64,
            cd: 0.008,
            cdp: 0.003,
            cm: -0.05,
            xtrt: 0.55,
            xtrb: 0.95,
            ..PolarPoint::default()
        };
        assert!((p.glide() - 80.0).abs() < 1e-9);
        assert!((p.cdf() - 0.005).abs() < 1e-12);
        assert!((p.xtr() - 0.75).abs() < 1e-12);
        assert!((p.sink() - 0.64f64.powf(1.5) / 0.008).abs() < 1e-9);
    }

    #[test]
    fn sink_zero_for_negative_lift() {
        let p = PolarPoint {
            cl: -0.2,
            cd: 0.01,
            ..PolarPoint::default()
        };
        assert_eq!(p.sink(), 0.0);
    }

    #[test]
    fn bubble_separation() {
        let p = PolarPoint {
            xtrt: 0.5,
            bubble_top: Some((0.4, 0.55)),
            ..PolarPoint::default()
        };
        assert!(p.is_bubble_top_separated());
        let p2 = PolarPoint {
            xtrt: 0.5,
            bubble_top: Some((0.2, 0.3)),
            ..PolarPoint::default()
        };
        assert!(!p2.is_bubble_top_separated());
        assert!(!p2.is_bubble_bot_separated());
    }
}
