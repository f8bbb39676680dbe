//! The polar collection of one airfoil.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::definition::PolarDef;
use crate::polar::Polar;

/// Reynolds numbers of a scaled set round to this.
pub const RE_SCALE_ROUND_TO: f64 = 5000.0;

/// Resolves the on-disk polar file of a definition, if it was generated
/// already. Implemented by the worker proxy which owns the canonical
/// naming scheme.
pub trait PolarPathResolver {
    fn existing_polar_file(&self, airfoil_path: &Path, def: &PolarDef) -> Option<PathBuf>;
}

/// Polars of one airfoil, keyed by the definition label.
#[derive(Debug, Clone)]
pub struct PolarSet {
    airfoil_name: String,
    airfoil_path: PathBuf,
    polars: Vec<Polar>,
    /// Chord scale of a reference airfoil relative to the main airfoil;
    /// rescales Re (rounded to 5000) and Mach (2 dp) of every polar.
    re_scale: Option<f64>,
}

impl PolarSet {
    pub fn new(airfoil_name: impl Into<String>, airfoil_path: impl Into<PathBuf>) -> Self {
        Self {
            airfoil_name: airfoil_name.into(),
            airfoil_path: airfoil_path.into(),
            polars: Vec::new(),
            re_scale: None,
        }
    }

    pub fn airfoil_name(&self) -> &str {
        &self.airfoil_name
    }

    pub fn airfoil_path(&self) -> &Path {
        &self.airfoil_path
    }

    pub fn re_scale(&self) -> f64 {
        self.re_scale.unwrap_or(1.0)
    }

    pub fn set_re_scale(&mut self, scale: Option<f64>) {
        self.re_scale = scale;
    }

    pub fn polars(&self) -> &[Polar] {
        &self.polars
    }

    pub fn polars_mut(&mut self) -> &mut [Polar] {
        &mut self.polars
    }

    pub fn has_polars(&self) -> bool {
        !self.polars.is_empty()
    }

    pub fn polars_not_loaded(&self) -> Vec<&Polar> {
        self.polars.iter().filter(|p| !p.is_loaded()).collect()
    }

    pub fn has_polars_not_loaded(&self) -> bool {
        self.polars.iter().any(|p| !p.is_loaded())
    }

    pub fn has_all_polars_loaded(&self) -> bool {
        !self.has_polars_not_loaded()
    }

    /// Reset every polar to not-loaded (after the airfoil shape changed).
    pub fn set_polars_not_loaded(&mut self) {
        for polar in &mut self.polars {
            polar.set_not_loaded();
        }
    }

    /// Add polars for the given definitions; duplicates (by label) are
    /// dropped, a set-level Reynolds scale is applied to the copies.
    pub fn add_polar_defs(&mut self, defs: &[PolarDef]) {
        for def in defs {
            if !def.active {
                continue;
            }
            let mut def = def.clone();
            if let Some(scale) = self.re_scale {
                def.re = (def.re * scale / RE_SCALE_ROUND_TO).round() * RE_SCALE_ROUND_TO;
                def.ma = (def.ma * scale * 100.0).round() / 100.0;
            }
            let label = def.label();
            if self.polars.iter().any(|p| p.def().label() == label) {
                debug!(polar = %label, "duplicate polar definition dropped");
                continue;
            }
            let mut polar = Polar::new(def);
            polar.set_re_scale(self.re_scale.unwrap_or(1.0));
            self.polars.push(polar);
        }
    }

    pub fn remove_polars(&mut self) {
        self.polars.clear();
    }

    /// Two sets are equal when their Reynolds scale matches and every
    /// polar is equal by definition.
    pub fn is_equal_to(&self, other: &PolarSet, ignore_active: bool) -> bool {
        if self.re_scale() != other.re_scale() || self.polars.len() != other.polars.len() {
            return false;
        }
        self.polars.iter().zip(other.polars.iter()).all(|(a, b)| {
            a.def().is_equal_to(b.def(), ignore_active)
        })
    }

    /// Merge a polar loaded elsewhere (a worker task) back into the set.
    /// Replaces the matching pending polar; `false` when no polar of this
    /// definition is part of the set.
    pub fn merge_loaded(&mut self, loaded: Polar) -> bool {
        let label = loaded.def().label();
        for polar in &mut self.polars {
            if polar.def().label() == label {
                if !polar.is_loaded() {
                    *polar = loaded;
                }
                return true;
            }
        }
        false
    }

    /// Try to load every not-yet-loaded polar from its canonical polar
    /// file. Returns the number of polars newly loaded. Polars without an
    /// existing file stay pending (the caller bundles them into tasks).
    pub fn load_polars(&mut self, resolver: &dyn PolarPathResolver) -> usize {
        let mut n_loaded = 0;
        let airfoil_path = self.airfoil_path.clone();
        for polar in &mut self.polars {
            if polar.is_loaded() {
                continue;
            }
            if let Some(path) = resolver.existing_polar_file(&airfoil_path, polar.def()) {
                if polar.load_from_file(&path).is_ok() {
                    n_loaded += 1;
                }
            }
        }
        n_loaded
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definition::{PolarType, ValRange};

    fn def(re: f64, ncrit: f64) -> PolarDef {
        PolarDef {
            re,
            ncrit,
            polar_type: PolarType::T1,
            val_range: ValRange::default(),
            ..PolarDef::default()
        }
    }

    #[test]
    fn duplicates_are_dropped() {
        let mut set = PolarSet::new("X", "/tmp/x.dat");
        set.add_polar_defs(&[def(400_000.0, 7.0), def(400_000.0, 7.0), def(300_000.0, 7.0)]);
        assert_eq!(set.polars().len(), 2);
    }

    #[test]
    fn inactive_defs_are_skipped() {
        let mut set = PolarSet::new("X", "/tmp/x.dat");
        let mut d = def(400_000.0, 7.0);
        d.active = false;
        set.add_polar_defs(&[d]);
        assert!(!set.has_polars());
    }

    #[test]
    fn re_scale_rounds_re_and_mach() {
        let mut set = PolarSet::new("X", "/tmp/x.dat");
        set.set_re_scale(Some(0.8));
        let mut d = def(412_345.0, 7.0);
        d.ma = 0.123;
        set.add_polar_defs(&[d]);
        let scaled = set.polars()[0].def();
        assert_eq!(scaled.re % RE_SCALE_ROUND_TO, 0.0);
        assert!((scaled.re - 330_000.0).abs() < RE_SCALE_ROUND_TO);
        assert_eq!(scaled.ma, 0.1);
    }

    #[test]
    fn set_equality() {
        let mut a = PolarSet::new("X", "/tmp/x.dat");
        a.add_polar_defs(&[def(400_000.0, 7.0)]);
        let mut b = PolarSet::new("Y", "/tmp/y.dat");
        b.add_polar_defs(&[def(400_000.0, 7.0)]);
        assert!(a.is_equal_to(&b, false));

        b.add_polar_defs(&[def(300_000.0, 7.0)]);
        assert!(!a.is_equal_to(&b, false));
    }
}
