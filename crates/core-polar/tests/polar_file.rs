//! Xfoil polar file import: header checks, data rows, bubble columns and
//! the write-read round trip of a synthetic polar.

use std::fs;
use std::path::PathBuf;

use core_polar::{Polar, PolarDef, PolarPoint, PolarVar};
use tempfile::tempdir;

fn synthetic_points(n: usize) -> Vec<PolarPoint> {
    (0..n)
        .map(|i| {
            let alpha = -2.0 + i as f64 * 0.5;
            PolarPoint {
                alpha,
                cl: (0.11 * alpha * 1000.0).round() / 1000.0,
                cd: 0.00612 + (i as f64) * 1e-5,
                cdp: 0.0021,
                cm: -0.043,
                xtrt: 0.512,
                xtrb: 0.913,
                ..PolarPoint::default()
            }
        })
        .collect()
}

/// Write the Xfoil polar format at its documented precision.
fn write_polar_file(path: &PathBuf, name: &str, re: f64, ncrit: f64, points: &[PolarPoint]) {
    let mut text = String::new();
    text.push_str(&format!("\n Calculated polar for: {name}\n\n"));
    text.push_str(" 1 1 Reynolds number fixed          Mach number fixed\n\n");
    text.push_str(&format!(
        " xtrf =   1.000 (top)        1.000 (bottom)\n Mach =   0.000     Re = {:>9.3} e 6     Ncrit = {:>7.3}\n\n",
        re / 1e6,
        ncrit
    ));
    text.push_str("   alpha     CL        CD       CDp       CM    Top Xtr  Bot Xtr\n");
    text.push_str("  ------- -------- --------- --------- -------- -------- --------\n");
    for p in points {
        text.push_str(&format!(
            "  {:7.3} {:8.4} {:9.5} {:9.5} {:8.4} {:8.4} {:8.4}\n",
            p.alpha, p.cl, p.cd, p.cdp, p.cm, p.xtrt, p.xtrb
        ));
    }
    fs::write(path, text).unwrap();
}

#[test]
fn round_trip_at_documented_precision() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("T1_Re0.400_M0.00_N9.0.txt");

    // values chosen representable at the file precision
    let points = synthetic_points(20);
    write_polar_file(&path, "Test Foil", 400_000.0, 9.0, &points);

    let mut polar = Polar::new(PolarDef {
        re: 400_000.0,
        ncrit: 9.0,
        ..PolarDef::default()
    });
    polar.load_from_file(&path).unwrap();

    assert!(polar.is_loaded());
    assert!(!polar.error_occurred());
    assert_eq!(polar.points().len(), 20);
    for (orig, read) in points.iter().zip(polar.points().iter()) {
        assert!((orig.alpha - read.alpha).abs() < 5e-4);
        assert!((orig.cl - read.cl).abs() < 5e-5);
        assert!((orig.cd - read.cd).abs() < 5e-6);
        assert!((orig.cm - read.cm).abs() < 5e-5);
        assert!((orig.xtrt - read.xtrt).abs() < 5e-5);
    }
}

#[test]
fn re_mismatch_fails_load() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("wrong_re.txt");
    write_polar_file(&path, "X", 300_000.0, 9.0, &synthetic_points(5));

    let mut polar = Polar::new(PolarDef {
        re: 400_000.0,
        ncrit: 9.0,
        ..PolarDef::default()
    });
    assert!(polar.load_from_file(&path).is_err());
    // the polar is loaded-with-error and will not be generated again
    assert!(polar.is_loaded());
    assert!(polar.error_occurred());
    assert!(polar.error_reason().unwrap().contains("Re"));
}

#[test]
fn ncrit_mismatch_fails_load() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("wrong_ncrit.txt");
    write_polar_file(&path, "X", 400_000.0, 7.0, &synthetic_points(5));

    let mut polar = Polar::new(PolarDef {
        re: 400_000.0,
        ncrit: 9.0,
        ..PolarDef::default()
    });
    assert!(polar.load_from_file(&path).is_err());
    assert!(polar.error_reason().unwrap().contains("Ncrit"));
}

#[test]
fn bubble_columns_are_optional() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("bubbles.txt");
    let text = "\n Calculated polar for: Bubbly\n\n\
        Mach =   0.000     Re = 0.400 e 6     Ncrit = 9.000\n\n\
        alpha     CL        CD       CDp       CM    Top Xtr  Bot Xtr   TBub x0  TBub x1  BBub x0  BBub x1\n\
        ------- -------- --------- --------- -------- -------- -------- -------- -------- -------- --------\n\
        1.000   0.5000   0.00800   0.00300  -0.0500   0.5000   0.9000   0.4000   0.5500   0.0000   0.0000\n\
        2.000   0.6000   0.00820   0.00310  -0.0510   0.4800   0.8900   0.0000   0.0000   0.6000   0.7000\n";
    fs::write(&path, text).unwrap();

    let mut polar = Polar::new(PolarDef {
        re: 400_000.0,
        ncrit: 9.0,
        ..PolarDef::default()
    });
    polar.load_from_file(&path).unwrap();
    assert_eq!(polar.points().len(), 2);
    // a pair with any 0 coordinate means no bubble
    assert_eq!(polar.points()[0].bubble_top, Some((0.4, 0.55)));
    assert_eq!(polar.points()[0].bubble_bot, None);
    assert_eq!(polar.points()[1].bubble_top, None);
    assert_eq!(polar.points()[1].bubble_bot, Some((0.6, 0.7)));
    assert!(polar.has_bubble_top());
    assert!(polar.has_bubble_bot());
}

#[test]
fn empty_data_section_is_error() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("empty.txt");
    fs::write(&path, "Calculated polar for: E\nRe = 0.400 e 6  Ncrit = 9.0\n-------\n").unwrap();
    let mut polar = Polar::new(PolarDef {
        re: 400_000.0,
        ncrit: 9.0,
        ..PolarDef::default()
    });
    assert!(polar.load_from_file(&path).is_err());
}

#[test]
fn glide_channel_from_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("glide.txt");
    write_polar_file(&path, "G", 400_000.0, 9.0, &synthetic_points(20));
    let mut polar = Polar::new(PolarDef {
        re: 400_000.0,
        ncrit: 9.0,
        ..PolarDef::default()
    });
    polar.load_from_file(&path).unwrap();
    let (cl, glide) = polar.of_vars(PolarVar::Cl, PolarVar::Glide);
    assert_eq!(cl.len(), glide.len());
    let max = glide.iter().cloned().fold(f64::MIN, f64::max);
    assert!(max > 10.0);
}
