//! Airfoil file formats: Selig `.dat`, Bézier `.bez` and Hicks-Henne
//! `.hicks`.

use std::fs;
use std::path::Path;

use core_spline::HicksHenne;
use tracing::warn;

use crate::AirfoilError;

/// Parsed contents of a `.dat` file.
#[derive(Debug, Clone, PartialEq)]
pub struct DatContent {
    pub name: String,
    pub x: Vec<f64>,
    pub y: Vec<f64>,
}

/// Parsed contents of a `.bez` file: control points per side.
#[derive(Debug, Clone, PartialEq)]
pub struct BezContent {
    pub name: String,
    pub top: (Vec<f64>, Vec<f64>),
    pub bottom: (Vec<f64>, Vec<f64>),
}

/// Parsed contents of a `.hicks` file: bump functions per side plus the
/// inline seed airfoil.
#[derive(Debug, Clone, PartialEq)]
pub struct HicksContent {
    pub name: String,
    pub top: Vec<HicksHenne>,
    pub bottom: Vec<HicksHenne>,
    pub seed_name: String,
    pub seed_x: Vec<f64>,
    pub seed_y: Vec<f64>,
}

fn parse_err(path: &Path, line: usize, reason: impl Into<String>) -> AirfoilError {
    AirfoilError::Parse {
        path: path.display().to_string(),
        line,
        reason: reason.into(),
    }
}

// --- .dat ------------------------------------------------------------------

/// Read a Selig `.dat` file: name line, then `x y` pairs. Duplicate
/// consecutive points are skipped with a warning; the sequence is flipped
/// to counter-clockwise orientation when necessary.
pub fn read_dat(path: &Path) -> Result<DatContent, AirfoilError> {
    let text = fs::read_to_string(path)?;
    let mut name = String::new();
    let mut x: Vec<f64> = Vec::new();
    let mut y: Vec<f64> = Vec::new();
    let mut prev: Option<(f64, f64)> = None;

    for (i, line) in text.lines().enumerate() {
        if i == 0 {
            name = line.trim().to_string();
            continue;
        }
        let mut split = line.split_whitespace();
        let (Some(xs), Some(ys)) = (split.next(), split.next()) else {
            continue;
        };
        let xv: f64 = xs
            .parse()
            .map_err(|_| parse_err(path, i + 1, format!("not a coordinate: '{xs}'")))?;
        let yv: f64 = ys
            .parse()
            .map_err(|_| parse_err(path, i + 1, format!("not a coordinate: '{ys}'")))?;
        if prev == Some((xv, yv)) {
            warn!(airfoil = %name, line = i + 1, "duplicate coordinates skipped");
        } else {
            x.push(xv);
            y.push(yv);
        }
        prev = Some((xv, yv));
    }

    if name.is_empty() || x.is_empty() {
        return Err(parse_err(path, 1, "missing name or coordinates"));
    }

    ensure_counter_clockwise(&mut x, &mut y, &name);
    Ok(DatContent { name, x, y })
}

/// Flip the sequence when the shoelace area is negative (clockwise).
pub fn ensure_counter_clockwise(x: &mut Vec<f64>, y: &mut Vec<f64>, name: &str) {
    let n = x.len();
    let mut area = 0.0;
    for i in 0..n {
        let j = (i + 1) % n;
        area += x[i] * y[j] - x[j] * y[i];
    }
    if area < 0.0 {
        x.reverse();
        y.reverse();
        warn!(airfoil = %name, "coordinates flipped to become counter clockwise");
    }
}

/// Write a `.dat` file at 7 decimals.
pub fn write_dat(path: &Path, name: &str, x: &[f64], y: &[f64]) -> Result<(), AirfoilError> {
    let mut out = String::with_capacity(x.len() * 20 + name.len() + 1);
    out.push_str(name);
    out.push('\n');
    for (xi, yi) in x.iter().zip(y.iter()) {
        out.push_str(&format!("{xi:.7} {yi:.7}\n"));
    }
    fs::write(path, out)?;
    Ok(())
}

// --- .bez ------------------------------------------------------------------

/// Read a `.bez` file: name line, then `Top Start` / `Top End` and
/// `Bottom Start` / `Bottom End` blocks with one control point per line.
/// Keywords are case-insensitive; missing markers are a parse error.
pub fn read_bez(path: &Path) -> Result<BezContent, AirfoilError> {
    let text = fs::read_to_string(path)?;
    let mut lines = text.lines().enumerate();
    let name = lines
        .next()
        .map(|(_, l)| l.trim().to_string())
        .unwrap_or_default();
    if name.is_empty() {
        return Err(parse_err(path, 1, "missing airfoil name"));
    }

    let mut top: Option<(Vec<f64>, Vec<f64>)> = None;
    let mut bottom: Option<(Vec<f64>, Vec<f64>)> = None;
    let mut current: Option<(&str, Vec<f64>, Vec<f64>)> = None;

    for (i, raw) in lines {
        let line = raw.trim();
        if line.is_empty() {
            continue;
        }
        let lower = line.to_lowercase();
        match lower.as_str() {
            "top start" => current = Some(("top", Vec::new(), Vec::new())),
            "bottom start" => current = Some(("bottom", Vec::new(), Vec::new())),
            "top end" | "bottom end" => {
                let Some((side, px, py)) = current.take() else {
                    return Err(parse_err(path, i + 1, format!("'{line}' without start")));
                };
                let expected = if lower == "top end" { "top" } else { "bottom" };
                if side != expected {
                    return Err(parse_err(path, i + 1, format!("'{line}' closes '{side}'")));
                }
                if side == "top" {
                    top = Some((px, py));
                } else {
                    bottom = Some((px, py));
                }
            }
            _ => {
                let Some((_, px, py)) = current.as_mut() else {
                    return Err(parse_err(path, i + 1, "control point outside block"));
                };
                let mut split = line.split_whitespace();
                let (Some(xs), Some(ys)) = (split.next(), split.next()) else {
                    return Err(parse_err(path, i + 1, "expected 'px py'"));
                };
                px.push(xs.parse().map_err(|_| {
                    parse_err(path, i + 1, format!("not a control point: '{xs}'"))
                })?);
                py.push(ys.parse().map_err(|_| {
                    parse_err(path, i + 1, format!("not a control point: '{ys}'"))
                })?);
            }
        }
    }

    match (top, bottom) {
        (Some(top), Some(bottom)) => Ok(BezContent { name, top, bottom }),
        (None, _) => Err(parse_err(path, 0, "missing 'Top Start' .. 'Top End' block")),
        (_, None) => Err(parse_err(path, 0, "missing 'Bottom Start' .. 'Bottom End' block")),
    }
}

/// Write a `.bez` file at 10 decimals in 13-wide fields.
pub fn write_bez(path: &Path, content: &BezContent) -> Result<(), AirfoilError> {
    let mut out = String::new();
    out.push_str(&content.name);
    out.push('\n');
    out.push_str("Top Start\n");
    for (px, py) in content.top.0.iter().zip(content.top.1.iter()) {
        out.push_str(&format!("{px:13.10} {py:13.10}\n"));
    }
    out.push_str("Top End\n");
    out.push_str("Bottom Start\n");
    for (px, py) in content.bottom.0.iter().zip(content.bottom.1.iter()) {
        out.push_str(&format!("{px:13.10} {py:13.10}\n"));
    }
    out.push_str("Bottom End\n");
    fs::write(path, out)?;
    Ok(())
}

// --- .hicks ----------------------------------------------------------------

/// Read a `.hicks` file: bump blocks like `.bez`, then a `Seedfoil Start`
/// block holding a full `.dat` content inline.
pub fn read_hicks(path: &Path) -> Result<HicksContent, AirfoilError> {
    let text = fs::read_to_string(path)?;
    let mut name = String::new();
    let mut top: Vec<HicksHenne> = Vec::new();
    let mut bottom: Vec<HicksHenne> = Vec::new();
    let mut seed_name = String::new();
    let mut seed_x: Vec<f64> = Vec::new();
    let mut seed_y: Vec<f64> = Vec::new();

    #[derive(PartialEq)]
    enum Section {
        None,
        Top,
        Bottom,
        SeedName,
        SeedCoords,
    }
    let mut section = Section::None;

    for (i, raw) in text.lines().enumerate() {
        let line = raw.trim();
        if i == 0 {
            name = line.to_string();
            continue;
        }
        if line.is_empty() {
            continue;
        }
        match line.to_lowercase().as_str() {
            "top start" => section = Section::Top,
            "bottom start" => section = Section::Bottom,
            "top end" | "bottom end" => section = Section::None,
            "seedfoil start" => section = Section::SeedName,
            _ => match section {
                Section::Top | Section::Bottom => {
                    let vals: Vec<f64> = line
                        .split_whitespace()
                        .map(|v| v.parse::<f64>())
                        .collect::<Result<_, _>>()
                        .map_err(|_| parse_err(path, i + 1, "expected 'strength location width'"))?;
                    if vals.len() != 3 {
                        return Err(parse_err(path, i + 1, "expected 3 bump values"));
                    }
                    let hh = HicksHenne::new(vals[0], vals[1], vals[2]);
                    if section == Section::Top {
                        top.push(hh);
                    } else {
                        bottom.push(hh);
                    }
                }
                Section::SeedName => {
                    seed_name = line.to_string();
                    section = Section::SeedCoords;
                }
                Section::SeedCoords => {
                    let mut split = line.split_whitespace();
                    let (Some(xs), Some(ys)) = (split.next(), split.next()) else {
                        return Err(parse_err(path, i + 1, "expected seed 'x y'"));
                    };
                    seed_x.push(xs.parse().map_err(|_| {
                        parse_err(path, i + 1, format!("not a coordinate: '{xs}'"))
                    })?);
                    seed_y.push(ys.parse().map_err(|_| {
                        parse_err(path, i + 1, format!("not a coordinate: '{ys}'"))
                    })?);
                }
                Section::None => {
                    return Err(parse_err(path, i + 1, format!("unexpected content '{line}'")))
                }
            },
        }
    }

    if name.is_empty() {
        return Err(parse_err(path, 1, "missing airfoil name"));
    }
    if seed_name.is_empty() || seed_x.is_empty() {
        return Err(parse_err(path, 0, "missing seed airfoil block"));
    }
    Ok(HicksContent {
        name,
        top,
        bottom,
        seed_name,
        seed_x,
        seed_y,
    })
}

/// Write a `.hicks` file.
pub fn write_hicks(path: &Path, content: &HicksContent) -> Result<(), AirfoilError> {
    let mut out = String::new();
    out.push_str(&content.name);
    out.push('\n');
    for (marker, hhs) in [("Top", &content.top), ("Bottom", &content.bottom)] {
        out.push_str(&format!("{marker} Start\n"));
        for hh in hhs.iter() {
            out.push_str(&format!(
                "{:13.10} {:13.10} {:13.10}\n",
                hh.strength, hh.location, hh.width
            ));
        }
        out.push_str(&format!("{marker} End\n"));
    }
    out.push_str("Seedfoil Start\n");
    out.push_str(&content.seed_name);
    out.push('\n');
    for (x, y) in content.seed_x.iter().zip(content.seed_y.iter()) {
        out.push_str(&format!(" {x:.7} {y:.7}\n"));
    }
    fs::write(path, out)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn dat_round_trip_flips_clockwise_input() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("cw.dat");
        // clockwise: lower TE -> LE -> upper TE
        let text = "CW Foil\n1.0 -0.01\n0.5 -0.05\n0.0 0.0\n0.5 0.06\n1.0 0.01\n";
        fs::write(&path, text).unwrap();
        let content = read_dat(&path).unwrap();
        assert_eq!(content.name, "CW Foil");
        // flipped to counter-clockwise: starts at upper TE
        assert_eq!(content.y[0], 0.01);
        assert_eq!(*content.y.last().unwrap(), -0.01);
    }

    #[test]
    fn dat_skips_duplicates_and_accepts_tabs() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("dup.dat");
        let text = "Dup\n1.0\t0.01\n0.5 0.05\n0.5 0.05\n0.0 0.0\n0.5 -0.05\n1.0 -0.01\n";
        fs::write(&path, text).unwrap();
        let content = read_dat(&path).unwrap();
        assert_eq!(content.x.len(), 5);
    }

    #[test]
    fn dat_write_format() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.dat");
        write_dat(&path, "Out", &[1.0, 0.0], &[0.00126, 0.0]).unwrap();
        let text = fs::read_to_string(&path).unwrap();
        assert_eq!(text, "Out\n1.0000000 0.0012600\n0.0000000 0.0000000\n");
    }

    #[test]
    fn bez_round_trip_bit_exact() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("rt.bez");
        let content = BezContent {
            name: "RT Bezier".to_string(),
            top: (vec![0.0, 0.0, 0.33, 1.0], vec![0.0, 0.06, 0.12, 0.0]),
            bottom: (vec![0.0, 0.0, 0.25, 1.0], vec![0.0, -0.04, -0.07, 0.0]),
        };
        write_bez(&path, &content).unwrap();
        let read = read_bez(&path).unwrap();
        assert_eq!(read, content);
    }

    #[test]
    fn bez_keywords_case_insensitive() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("ci.bez");
        let text = "CI\nTOP START\n0 0\n0 0.05\n1 0\ntop end\nbottom start\n0 0\n0 -0.05\n1 0\nBOTTOM END\n";
        fs::write(&path, text).unwrap();
        let read = read_bez(&path).unwrap();
        assert_eq!(read.top.0.len(), 3);
        assert_eq!(read.bottom.1[1], -0.05);
    }

    #[test]
    fn bez_missing_marker_is_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bad.bez");
        fs::write(&path, "Bad\nTop Start\n0 0\n1 0\nTop End\n").unwrap();
        assert!(matches!(read_bez(&path), Err(AirfoilError::Parse { .. })));
    }

    #[test]
    fn hicks_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("rt.hicks");
        let content = HicksContent {
            name: "HH Foil".to_string(),
            top: vec![HicksHenne::new(0.0012, 0.3, 1.5)],
            bottom: vec![],
            seed_name: "Seed".to_string(),
            seed_x: vec![1.0, 0.5, 0.0, 0.5, 1.0],
            seed_y: vec![0.001, 0.05, 0.0, -0.05, -0.001],
        };
        write_hicks(&path, &content).unwrap();
        let read = read_hicks(&path).unwrap();
        assert_eq!(read.name, content.name);
        assert_eq!(read.top, content.top);
        assert_eq!(read.seed_name, content.seed_name);
        assert_eq!(read.seed_x, content.seed_x);
    }
}
