//! The airfoil model object: file identity, lazy loading of the three
//! shape formats, and the owned [`Geometry`].

pub mod formats;

use std::path::{Path, PathBuf};

use core_geom::{BezierSide, Geometry, HicksHenneSide, LineType, Strategy};
use thiserror::Error;
use tracing::{debug, info};

pub use formats::{BezContent, DatContent, HicksContent};

/// Default airfoil file extension.
pub const DAT_EXT: &str = ".dat";
pub const BEZ_EXT: &str = ".bez";
pub const HICKS_EXT: &str = ".hicks";

#[derive(Debug, Error)]
pub enum AirfoilError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("{path}:{line}: {reason}")]
    Parse {
        path: String,
        line: usize,
        reason: String,
    },
    #[error(transparent)]
    Geometry(#[from] core_geom::GeometryError),
    #[error("airfoil '{0}' is not loaded")]
    NotLoaded(String),
    #[error("airfoil has no file path")]
    NoPath,
}

/// Role of an airfoil within the application model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UsedAs {
    #[default]
    Normal,
    Design,
    Seed,
    SeedDesign,
    Reference,
    Target,
    Second,
    Final,
}

impl UsedAs {
    pub fn as_str(&self) -> &'static str {
        match self {
            UsedAs::Normal => "Normal",
            UsedAs::Design => "Design",
            UsedAs::Seed => "Seed",
            UsedAs::SeedDesign => "Seed of design",
            UsedAs::Reference => "Reference",
            UsedAs::Target => "Target",
            UsedAs::Second => "Second",
            UsedAs::Final => "Final",
        }
    }
}

/// Flap hinge definition plus deflection angle.
#[derive(Debug, Clone, PartialEq)]
pub struct FlapDef {
    pub x_flap: f64,
    pub y_flap: f64,
    /// `"y/c"` or `"y/t"`: hinge y relative to chord or local thickness.
    pub y_flap_spec: String,
    pub flap_angle: f64,
}

impl Default for FlapDef {
    fn default() -> Self {
        Self {
            x_flap: 0.75,
            y_flap: 0.0,
            y_flap_spec: "y/c".to_string(),
            flap_angle: 0.0,
        }
    }
}

impl FlapDef {
    /// Hinge equality ignores the deflection angle; two absent definitions
    /// count as the same hinge.
    pub fn same_hinge(a: Option<&FlapDef>, b: Option<&FlapDef>) -> bool {
        match (a, b) {
            (None, None) => true,
            (Some(a), Some(b)) => {
                a.x_flap == b.x_flap && a.y_flap == b.y_flap && a.y_flap_spec == b.y_flap_spec
            }
            _ => false,
        }
    }
}

/// Shape format of an airfoil file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShapeFormat {
    Dat,
    Bez,
    Hicks,
}

impl ShapeFormat {
    pub fn from_path(path: &Path) -> Self {
        match path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .as_deref()
        {
            Some("bez") => ShapeFormat::Bez,
            Some("hicks") => ShapeFormat::Hicks,
            _ => ShapeFormat::Dat,
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            ShapeFormat::Dat => DAT_EXT,
            ShapeFormat::Bez => BEZ_EXT,
            ShapeFormat::Hicks => HICKS_EXT,
        }
    }
}

/// An airfoil: identity, file lifecycle and geometry.
#[derive(Debug, Clone)]
pub struct Airfoil {
    name: String,
    path: Option<PathBuf>,
    working_dir: Option<PathBuf>,
    format: ShapeFormat,
    used_as: UsedAs,
    geometry: Option<Geometry>,
    seed_name: Option<String>,
    is_modified: bool,
    is_edited: bool,
    is_blend: bool,
}

impl Airfoil {
    /// Airfoil bound to a file; coordinates load on demand via
    /// [`ensure_loaded`](Self::ensure_loaded).
    pub fn from_file(path: impl Into<PathBuf>) -> Self {
        let path: PathBuf = path.into();
        let format = ShapeFormat::from_path(&path);
        let name = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
            .to_string();
        Self {
            name,
            path: Some(path),
            working_dir: None,
            format,
            used_as: UsedAs::Normal,
            geometry: None,
            seed_name: None,
            is_modified: false,
            is_edited: false,
            is_blend: false,
        }
    }

    /// Airfoil from explicit coordinates.
    pub fn from_xy(
        x: Vec<f64>,
        y: Vec<f64>,
        name: impl Into<String>,
        strategy: Strategy,
    ) -> Result<Self, AirfoilError> {
        let geometry = Geometry::new(x, y, strategy)?;
        Ok(Self {
            name: name.into(),
            path: None,
            working_dir: None,
            format: ShapeFormat::Dat,
            used_as: UsedAs::Normal,
            geometry: Some(geometry),
            seed_name: None,
            is_modified: false,
            is_edited: false,
            is_blend: false,
        })
    }

    /// Airfoil from two Bézier sides.
    pub fn from_bezier_sides(
        upper: BezierSide,
        lower: BezierSide,
        name: impl Into<String>,
    ) -> Result<Self, AirfoilError> {
        let geometry = Geometry::new_bezier(upper, lower)?;
        Ok(Self {
            name: name.into(),
            path: None,
            working_dir: None,
            format: ShapeFormat::Bez,
            used_as: UsedAs::Normal,
            geometry: Some(geometry),
            seed_name: None,
            is_modified: false,
            is_edited: false,
            is_blend: false,
        })
    }

    // --- identity ---------------------------------------------------------

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
        self.is_modified = true;
    }

    /// Name plus the modification trail, e.g. `JX-GL-05_t8.3_te0.5`.
    pub fn name_to_show(&self) -> String {
        match self.geometry.as_ref() {
            Some(geo) if !geo.modifications().is_empty() => {
                format!("{}_{}", self.name, geo.modifications_as_label())
            }
            _ => self.name.clone(),
        }
    }

    pub fn format(&self) -> ShapeFormat {
        self.format
    }

    pub fn used_as(&self) -> UsedAs {
        self.used_as
    }

    pub fn set_used_as(&mut self, used_as: UsedAs) {
        self.used_as = used_as;
    }

    pub fn used_as_design(&self) -> bool {
        self.used_as == UsedAs::Design
    }

    pub fn seed_name(&self) -> Option<&str> {
        self.seed_name.as_deref()
    }

    // --- paths ------------------------------------------------------------

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn set_path(&mut self, path: impl Into<PathBuf>) {
        let path: PathBuf = path.into();
        self.format = ShapeFormat::from_path(&path);
        self.path = Some(path);
    }

    pub fn working_dir(&self) -> Option<&Path> {
        self.working_dir.as_deref()
    }

    pub fn set_working_dir(&mut self, dir: impl Into<PathBuf>) {
        self.working_dir = Some(dir.into());
    }

    /// Absolute file path: the path itself, or joined onto the working dir
    /// when relative.
    pub fn path_abs(&self) -> Option<PathBuf> {
        let path = self.path.as_ref()?;
        if path.is_absolute() {
            Some(path.clone())
        } else {
            match &self.working_dir {
                Some(dir) => Some(dir.join(path)),
                None => Some(path.clone()),
            }
        }
    }

    pub fn file_name(&self) -> Option<String> {
        self.path
            .as_ref()
            .and_then(|p| p.file_name())
            .and_then(|s| s.to_str())
            .map(|s| s.to_string())
    }

    pub fn file_stem(&self) -> Option<String> {
        self.path
            .as_ref()
            .and_then(|p| p.file_stem())
            .and_then(|s| s.to_str())
            .map(|s| s.to_string())
    }

    pub fn is_existing(&self) -> bool {
        self.path_abs().map(|p| p.is_file()).unwrap_or(false)
    }

    // --- flags ------------------------------------------------------------

    pub fn is_loaded(&self) -> bool {
        self.geometry.is_some()
    }

    pub fn is_modified(&self) -> bool {
        self.is_modified
    }

    pub fn set_modified(&mut self, modified: bool) {
        self.is_modified = modified;
    }

    pub fn is_edited(&self) -> bool {
        self.is_edited
    }

    pub fn set_edited(&mut self, edited: bool) {
        self.is_edited = edited;
    }

    pub fn is_blend(&self) -> bool {
        self.is_blend
    }

    pub fn set_blend(&mut self, blend: bool) {
        self.is_blend = blend;
    }

    pub fn is_normalized(&self) -> bool {
        self.geometry
            .as_ref()
            .map(|g| g.is_normalized())
            .unwrap_or(false)
    }

    pub fn is_symmetrical(&self) -> bool {
        self.geometry
            .as_ref()
            .map(|g| g.is_symmetrical())
            .unwrap_or(false)
    }

    /// Probably flapped: the contour has a sharp kink aft of mid chord.
    pub fn is_flapped(&self) -> bool {
        self.geometry
            .as_ref()
            .map(|g| g.is_flapped())
            .unwrap_or(false)
    }

    /// Exactly one curvature reversal on the upper side.
    pub fn is_reflexed(&self) -> bool {
        self.geometry
            .as_ref()
            .and_then(|g| g.curvature())
            .map(|c| c.is_reflexed())
            .unwrap_or(false)
    }

    /// Exactly one curvature reversal on the lower side.
    pub fn is_rear_loaded(&self) -> bool {
        self.geometry
            .as_ref()
            .and_then(|g| g.curvature())
            .map(|c| c.is_rear_loaded())
            .unwrap_or(false)
    }

    // --- geometry access ----------------------------------------------------

    pub fn geometry(&self) -> Option<&Geometry> {
        self.geometry.as_ref()
    }

    pub fn geometry_mut(&mut self) -> Option<&mut Geometry> {
        self.is_modified = true;
        self.geometry.as_mut()
    }

    pub fn x(&self) -> &[f64] {
        self.geometry.as_ref().map(|g| g.x()).unwrap_or(&[])
    }

    pub fn y(&self) -> &[f64] {
        self.geometry.as_ref().map(|g| g.y()).unwrap_or(&[])
    }

    pub fn n_panels(&self) -> usize {
        self.geometry.as_ref().map(|g| g.n_panels()).unwrap_or(0)
    }

    pub fn te_gap(&self) -> Option<f64> {
        self.geometry.as_ref().map(|g| g.te_gap())
    }

    pub fn max_thick(&self) -> Option<f64> {
        self.geometry.as_ref().and_then(|g| g.max_thick())
    }

    pub fn max_camb(&self) -> Option<f64> {
        self.geometry.as_ref().and_then(|g| g.max_camb())
    }

    // --- load / save --------------------------------------------------------

    /// Load the file contents if not yet loaded.
    pub fn ensure_loaded(&mut self) -> Result<&Geometry, AirfoilError> {
        if self.geometry.is_none() {
            self.load()?;
        }
        self.geometry
            .as_ref()
            .ok_or_else(|| AirfoilError::NotLoaded(self.name.clone()))
    }

    /// (Re)load from the file, choosing the parser by format.
    pub fn load(&mut self) -> Result<(), AirfoilError> {
        let path = self.path_abs().ok_or(AirfoilError::NoPath)?;
        match self.format {
            ShapeFormat::Dat => {
                let content = formats::read_dat(&path)?;
                self.name = content.name;
                self.geometry = Some(Geometry::new(content.x, content.y, Strategy::Basic)?);
            }
            ShapeFormat::Bez => {
                let content = formats::read_bez(&path)?;
                self.name = content.name;
                let upper = BezierSide::new(&content.top.0, &content.top.1, LineType::Upper, 101)?;
                let lower =
                    BezierSide::new(&content.bottom.0, &content.bottom.1, LineType::Lower, 101)?;
                self.geometry = Some(Geometry::new_bezier(upper, lower)?);
            }
            ShapeFormat::Hicks => {
                let content = formats::read_hicks(&path)?;
                self.name = content.name;
                let ile = content
                    .seed_x
                    .iter()
                    .enumerate()
                    .min_by(|a, b| a.1.total_cmp(b.1))
                    .map(|(i, _)| i)
                    .unwrap_or(0);
                let upper = HicksHenneSide::new(
                    content.seed_x[..=ile].iter().rev().copied().collect(),
                    content.seed_y[..=ile].iter().rev().copied().collect(),
                    content.top,
                    LineType::Upper,
                )?;
                let lower = HicksHenneSide::new(
                    content.seed_x[ile..].to_vec(),
                    content.seed_y[ile..].to_vec(),
                    content.bottom,
                    LineType::Lower,
                )?;
                self.seed_name = Some(content.seed_name);
                self.geometry = Some(Geometry::new_hicks_henne(upper, lower)?);
            }
        }
        self.is_modified = false;
        debug!(name = %self.name, ?self.format, "airfoil loaded");
        Ok(())
    }

    /// Save to the own path in the own format.
    pub fn save(&mut self) -> Result<(), AirfoilError> {
        let path = self.path_abs().ok_or(AirfoilError::NoPath)?;
        let geo = self
            .geometry
            .as_ref()
            .ok_or_else(|| AirfoilError::NotLoaded(self.name.clone()))?;

        match self.format {
            ShapeFormat::Bez => {
                let (upper, lower) = geo
                    .bezier_sides()
                    .ok_or_else(|| AirfoilError::NotLoaded(self.name.clone()))?;
                let content = BezContent {
                    name: self.name.clone(),
                    top: (
                        upper.bezier().points_x().to_vec(),
                        upper.bezier().points_y().to_vec(),
                    ),
                    bottom: (
                        lower.bezier().points_x().to_vec(),
                        lower.bezier().points_y().to_vec(),
                    ),
                };
                formats::write_bez(&path, &content)?;
            }
            _ => {
                formats::write_dat(&path, &self.name, geo.x(), geo.y())?;
            }
        }
        self.is_modified = false;
        info!(name = %self.name, path = %path.display(), "airfoil saved");
        Ok(())
    }

    /// Save to a directory and/or new name, rebinding the own path.
    pub fn save_as(
        &mut self,
        dir: Option<&Path>,
        dest_name: Option<&str>,
    ) -> Result<PathBuf, AirfoilError> {
        if let Some(name) = dest_name {
            self.name = name.to_string();
        }
        let file_name = format!(
            "{}{}",
            dest_name
                .map(|n| n.to_string())
                .or_else(|| self.file_stem())
                .unwrap_or_else(|| self.name.clone()),
            self.format.extension()
        );
        let path = match dir {
            Some(dir) => {
                if !dir.is_dir() {
                    std::fs::create_dir_all(dir)?;
                }
                dir.join(file_name)
            }
            None => match self.path_abs() {
                Some(p) => p.with_file_name(file_name),
                None => PathBuf::from(file_name),
            },
        };
        self.path = Some(path.clone());
        self.save()?;
        Ok(path)
    }

    /// Copy with optional new path, name and geometry strategy.
    pub fn as_copy(
        &self,
        path: Option<&Path>,
        name: Option<&str>,
        strategy: Option<Strategy>,
    ) -> Result<Airfoil, AirfoilError> {
        let geo = self
            .geometry
            .as_ref()
            .ok_or_else(|| AirfoilError::NotLoaded(self.name.clone()))?;
        let geometry = match strategy {
            Some(s) if s != geo.strategy() => geo.with_strategy(s)?,
            _ => geo.clone(),
        };
        let mut copy = Airfoil {
            name: name.map(|n| n.to_string()).unwrap_or_else(|| self.name.clone()),
            path: path.map(|p| p.to_path_buf()).or_else(|| self.path.clone()),
            working_dir: self.working_dir.clone(),
            format: path.map(ShapeFormat::from_path).unwrap_or(self.format),
            used_as: UsedAs::Normal,
            geometry: Some(geometry),
            seed_name: self.seed_name.clone(),
            is_modified: false,
            is_edited: false,
            is_blend: self.is_blend,
        };
        if copy.format == ShapeFormat::Hicks {
            // a copy of a Hicks-Henne airfoil carries plain coordinates
            copy.format = ShapeFormat::Dat;
        }
        Ok(copy)
    }

    /// Copy that keeps the design bookkeeping (role, edit flag, record).
    pub fn as_copy_design(&self, path: Option<&Path>) -> Result<Airfoil, AirfoilError> {
        let mut copy = self.as_copy(path, None, None)?;
        copy.used_as = self.used_as;
        copy.is_edited = self.is_edited;
        Ok(copy)
    }

    /// Normalize the geometry; flags the airfoil as modified on change.
    pub fn normalize(&mut self) -> Result<bool, AirfoilError> {
        let geo = self
            .geometry
            .as_mut()
            .ok_or_else(|| AirfoilError::NotLoaded(self.name.clone()))?;
        let changed = geo.normalize()?;
        if changed {
            self.is_modified = true;
        }
        Ok(changed)
    }

    /// Blend two airfoils into self.
    pub fn do_blend(
        &mut self,
        airfoil1: &Airfoil,
        airfoil2: &Airfoil,
        t: f64,
    ) -> Result<(), AirfoilError> {
        let geo1 = airfoil1
            .geometry()
            .ok_or_else(|| AirfoilError::NotLoaded(airfoil1.name.clone()))?;
        let geo2 = airfoil2
            .geometry()
            .ok_or_else(|| AirfoilError::NotLoaded(airfoil2.name.clone()))?;
        let geo = self
            .geometry
            .as_mut()
            .ok_or_else(|| AirfoilError::NotLoaded(self.name.clone()))?;
        geo.blend(geo1, geo2, t)?;
        self.is_blend = true;
        self.is_modified = true;
        Ok(())
    }
}
