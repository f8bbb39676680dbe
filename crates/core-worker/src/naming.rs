//! Canonical polar file naming.
//!
//! The worker derives the polar file name deterministically from the
//! recipe, so a polar can be found on disk without running the worker
//! again: `<airfoil>_polars/T1_Re0.400_M0.00_N7.0[_TrT..][_TrB..][_f..].txt`.

use std::path::{Path, PathBuf};

use core_airfoil::FlapDef;
use core_polar::set::PolarPathResolver;
use core_polar::PolarDef;

/// Directory suffix holding the polar files of one airfoil.
pub const POLAR_DIR_SUFFIX: &str = "_polars";

/// Stateless naming rules; implements [`PolarPathResolver`] for the
/// polar set lookup.
#[derive(Debug, Clone, Copy, Default)]
pub struct PolarFileNaming;

impl PolarFileNaming {
    /// `<parent>/<stem>_polars` next to the airfoil file.
    pub fn polar_dir(airfoil_path: &Path) -> PathBuf {
        let stem = airfoil_path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("airfoil");
        airfoil_path
            .parent()
            .unwrap_or_else(|| Path::new("."))
            .join(format!("{stem}{POLAR_DIR_SUFFIX}"))
    }

    /// File name encoding the recipe.
    pub fn polar_file_name(def: &PolarDef) -> String {
        let mut name = format!(
            "{}_Re{:.3}_M{:.2}_N{:.1}",
            def.polar_type.as_str(),
            def.re / 1e6,
            def.ma,
            def.ncrit
        );
        if let Some(x) = def.xtript {
            name.push_str(&format!("_TrT{}", trim_num(x, 2)));
        }
        if let Some(x) = def.xtripb {
            name.push_str(&format!("_TrB{}", trim_num(x, 2)));
        }
        if let Some(flap) = &def.flap {
            name.push_str(&Self::flapped_suffix(flap));
        }
        name.push_str(".txt");
        name
    }

    /// Shortest unique flap suffix: `_f5.1` when everything else is at its
    /// default, fragments for hinge x, hinge y and the y spec otherwise.
    pub fn flapped_suffix(flap: &FlapDef) -> String {
        let mut suffix = format!("_f{}", trim_num(flap.flap_angle, 2));
        if flap.x_flap != 0.75 {
            suffix.push_str(&format!("_xf{}", trim_num(flap.x_flap, 2)));
        }
        if flap.y_flap != 0.0 {
            suffix.push_str(&format!("_yf{}", trim_num(flap.y_flap, 2)));
        }
        if flap.y_flap_spec != "y/c" {
            suffix.push_str("_yspecYT");
        }
        suffix
    }

    /// Full path of the polar file of a recipe.
    pub fn polar_file_path(airfoil_path: &Path, def: &PolarDef) -> PathBuf {
        Self::polar_dir(airfoil_path).join(Self::polar_file_name(def))
    }

    /// Path of an already generated polar file, if present on disk.
    pub fn get_existing_polar_file(airfoil_path: &Path, def: &PolarDef) -> Option<PathBuf> {
        let path = Self::polar_file_path(airfoil_path, def);
        if path.is_file() {
            Some(path)
        } else {
            None
        }
    }
}

impl PolarPathResolver for PolarFileNaming {
    fn existing_polar_file(&self, airfoil_path: &Path, def: &PolarDef) -> Option<PathBuf> {
        Self::get_existing_polar_file(airfoil_path, def)
    }
}

fn trim_num(value: f64, decimals: usize) -> String {
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
    use core_polar::PolarType;

    #[test]
    fn plain_file_name() {
        let def = PolarDef {
            polar_type: PolarType::T1,
            re: 400_000.0,
            ma: 0.0,
            ncrit: 7.0,
            ..PolarDef::default()
        };
        assert_eq!(
            PolarFileNaming::polar_file_name(&def),
            "T1_Re0.400_M0.00_N7.0.txt"
        );
    }

    #[test]
    fn trip_fragments() {
        let def = PolarDef {
            xtript: Some(0.3),
            xtripb: Some(0.6),
            ..PolarDef::default()
        };
        assert_eq!(
            PolarFileNaming::polar_file_name(&def),
            "T1_Re0.400_M0.00_N7.0_TrT0.3_TrB0.6.txt"
        );
    }

    #[test]
    fn flapped_suffix_shortest_form() {
        let flap = FlapDef {
            flap_angle: 5.1,
            ..FlapDef::default()
        };
        assert_eq!(PolarFileNaming::flapped_suffix(&flap), "_f5.1");

        let flap = FlapDef {
            flap_angle: -1.4,
            x_flap: 0.72,
            y_flap: 0.5,
            y_flap_spec: "y/t".to_string(),
        };
        assert_eq!(
            PolarFileNaming::flapped_suffix(&flap),
            "_f-1.4_xf0.72_yf0.5_yspecYT"
        );
    }

    #[test]
    fn polar_dir_next_to_airfoil() {
        let dir = PolarFileNaming::polar_dir(Path::new("/tmp/foils/JX-GL-05.dat"));
        assert_eq!(dir, Path::new("/tmp/foils/JX-GL-05_polars"));
    }

    #[test]
    fn existing_file_lookup() {
        let tmp = tempfile::tempdir().unwrap();
        let airfoil = tmp.path().join("test.dat");
        let def = PolarDef::default();
        assert!(PolarFileNaming::get_existing_polar_file(&airfoil, &def).is_none());

        let polar_dir = PolarFileNaming::polar_dir(&airfoil);
        std::fs::create_dir_all(&polar_dir).unwrap();
        let file = polar_dir.join(PolarFileNaming::polar_file_name(&def));
        std::fs::write(&file, "polar").unwrap();
        assert_eq!(
            PolarFileNaming::get_existing_polar_file(&airfoil, &def),
            Some(file)
        );
    }
}
