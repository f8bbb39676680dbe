//! Polar definition: the recipe a polar is generated from.

use core_airfoil::FlapDef;

use crate::air;

/// Xfoil polar type: T1 (constant speed) or T2 (constant lift).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PolarType {
    #[default]
    T1,
    T2,
}

impl PolarType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PolarType::T1 => "T1",
            PolarType::T2 => "T2",
        }
    }
}

/// Allowed spec variables for the operating point sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SpecVar {
    #[default]
    Alpha,
    Cl,
}

impl SpecVar {
    pub fn as_str(&self) -> &'static str {
        match self {
            SpecVar::Alpha => "alpha",
            SpecVar::Cl => "cl",
        }
    }
}

/// Sweep range `from..to` with `step`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ValRange {
    pub from: f64,
    pub to: f64,
    pub step: f64,
}

impl Default for ValRange {
    fn default() -> Self {
        Self {
            from: -3.0,
            to: 13.0,
            step: 0.25,
        }
    }
}

impl ValRange {
    pub fn as_string(&self) -> String {
        format!("{}, {}, {}", self.from, self.to, self.step)
    }
}

/// Definition of a single polar.
#[derive(Debug, Clone, PartialEq)]
pub struct PolarDef {
    pub active: bool,
    pub polar_type: PolarType,
    pub re: f64,
    pub ma: f64,
    pub ncrit: f64,
    /// Forced transition top side; `None` is free transition (1.0).
    pub xtript: Option<f64>,
    pub xtripb: Option<f64>,
    pub spec_var: SpecVar,
    pub val_range: ValRange,
    pub auto_range: bool,
    pub flap: Option<FlapDef>,
}

impl Default for PolarDef {
    fn default() -> Self {
        Self {
            active: true,
            polar_type: PolarType::T1,
            re: 400_000.0,
            ma: 0.0,
            ncrit: 7.0,
            xtript: None,
            xtripb: None,
            spec_var: SpecVar::Alpha,
            val_range: ValRange::default(),
            auto_range: true,
            flap: None,
        }
    }
}

impl PolarDef {
    pub fn is_flapped(&self) -> bool {
        self.flap.is_some()
    }

    /// Short display label, e.g. `T1 Re400k N7` with optional Mach, flap
    /// and transition fragments.
    pub fn label(&self) -> String {
        let ncrit = format!(" N{}", trim_num(self.ncrit, 2));
        let ma = if self.ma != 0.0 {
            format!(" M{}", trim_num(self.ma, 2))
        } else {
            String::new()
        };
        let mut flap = String::new();
        if let Some(f) = &self.flap {
            flap = format!(" F{}\u{00b0}", trim_num(f.flap_angle, 1));
            if f.x_flap != 0.75 {
                flap.push_str(&format!(" H{:.0}%", f.x_flap * 100.0));
            }
        }
        let xtript = self
            .xtript
            .map(|x| format!(" Trt{:.0}%", x * 100.0))
            .unwrap_or_default();
        let xtripb = self
            .xtripb
            .map(|x| format!(" Trb{:.0}%", x * 100.0))
            .unwrap_or_default();

        format!(
            "{} Re{}k{}{}{}{}{}",
            self.polar_type.as_str(),
            (self.re / 1000.0) as i64,
            ma,
            ncrit,
            flap,
            xtript,
            xtripb
        )
    }

    /// Label including the sweep definition.
    pub fn label_long(&self) -> String {
        format!(
            "{}  {}: {}",
            self.label(),
            self.spec_var.as_str(),
            self.val_range.as_string()
        )
    }

    /// Label with the flight speed for a chord in mm (type 1 only).
    pub fn label_with_v(&self, chord_mm: f64) -> String {
        match self.v_for_chord(chord_mm) {
            Some(v) => format!("{} | {v:.1}m/s", self.label()),
            None => self.label(),
        }
    }

    /// Speed for a chord length in mm, type 1 polars only.
    pub fn v_for_chord(&self, chord_mm: f64) -> Option<f64> {
        if chord_mm > 0.0 && self.polar_type == PolarType::T1 {
            Some(air::v_from_re(self.re, chord_mm / 1000.0))
        } else {
            None
        }
    }

    /// Equality of the recipe, optionally ignoring the `active` flag.
    pub fn is_equal_to(&self, other: &PolarDef, ignore_active: bool) -> bool {
        let active_ok = ignore_active || self.active == other.active;
        active_ok
            && self.polar_type == other.polar_type
            && self.re == other.re
            && self.ma == other.ma
            && self.ncrit == other.ncrit
            && self.xtript == other.xtript
            && self.xtripb == other.xtripb
            && self.spec_var == other.spec_var
            && self.val_range == other.val_range
            && self.auto_range == other.auto_range
            && self.flap == other.flap
    }

    pub fn is_in(&self, defs: &[PolarDef]) -> bool {
        defs.iter().any(|d| self.is_equal_to(d, true))
    }

    /// Keys that must match for two polars to share one worker task.
    pub fn is_task_compatible(&self, other: &PolarDef) -> bool {
        self.polar_type == other.polar_type
            && self.ncrit == other.ncrit
            && self.xtript == other.xtript
            && self.xtripb == other.xtripb
            && self.auto_range == other.auto_range
            && self.spec_var == other.spec_var
            && self.val_range == other.val_range
            && FlapDef::same_hinge(self.flap.as_ref(), other.flap.as_ref())
    }
}

/// Fixed-decimal format with trailing zeros trimmed.
pub(crate) fn trim_num(value: f64, decimals: usize) -> String {
    let s = format!("{value:.decimals$}");
    if s.contains('.') {
        s.trim_end_matches('0').trim_end_matches('.').to_string()
    } else {
        s
    }
}
