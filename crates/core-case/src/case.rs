//! The three case flavours.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use core_airfoil::{Airfoil, ShapeFormat, UsedAs};
use core_geom::{BezierSide, LineType, Strategy};
use core_worker::{Optimizer, OptimizerState};
use tracing::{debug, error, info, warn};

use crate::input_file::InputFile;
use crate::CaseError;

/// Suffix of the per-airfoil design directory.
pub const DESIGN_DIR_SUFFIX: &str = "_designs";
/// Base of every design file name.
pub const DESIGN_NAME_BASE: &str = "Design";

/// `Design___0.dat`, `Design__34.dat`, `Design_100.dat` - the number is
/// right-aligned in a 4-wide underscore field.
pub fn design_file_name(i_design: usize, extension: &str) -> String {
    if i_design < 1000 {
        format!("{DESIGN_NAME_BASE}{i_design:_>4}{extension}")
    } else {
        format!("{DESIGN_NAME_BASE}_{i_design}{extension}")
    }
}

/// Design number from a design file stem, `None` when there is none.
pub fn get_i_design(file_stem: &str) -> Option<usize> {
    let tail = file_stem
        .rsplit(|c: char| c == '_' || c == ' ')
        .next()
        .unwrap_or("");
    tail.parse().ok()
}

// --- Direct Design ---------------------------------------------------------

/// Manual modification session: an ordered list of design airfoils in
/// `<stem>_designs/` next to the seed airfoil.
#[derive(Debug)]
pub struct DirectDesignCase {
    airfoil_seed: Airfoil,
    working_dir: PathBuf,
    designs: Vec<Airfoil>,
    remove_designs_on_close: bool,
}

impl DirectDesignCase {
    /// Open a case for a seed airfoil: creates the design directory or
    /// reads the designs already present.
    pub fn new(mut airfoil_seed: Airfoil) -> Result<Self, CaseError> {
        airfoil_seed.ensure_loaded()?;
        let seed_path = airfoil_seed
            .path_abs()
            .ok_or_else(|| CaseError::NoSeed("airfoil has no file path".to_string()))?;
        let working_dir = seed_path
            .parent()
            .unwrap_or_else(|| Path::new("."))
            .to_path_buf();

        let mut case = Self {
            airfoil_seed,
            working_dir,
            designs: Vec::new(),
            remove_designs_on_close: false,
        };

        let dir = case.design_dir_abs();
        if dir.is_dir() {
            case.designs = case.read_all_designs()?;
        } else {
            fs::create_dir_all(&dir)?;
        }
        info!(case = %case.name(), n_designs = case.designs.len(), "direct design case opened");
        Ok(case)
    }

    pub fn name(&self) -> String {
        self.airfoil_seed.file_name().unwrap_or_default()
    }

    pub fn airfoil_seed(&self) -> &Airfoil {
        &self.airfoil_seed
    }

    pub fn working_dir(&self) -> &Path {
        &self.working_dir
    }

    fn extension(&self) -> String {
        self.airfoil_seed.format().extension().to_string()
    }

    /// Design directory relative to the working dir.
    pub fn design_dir(&self) -> String {
        let stem = self.airfoil_seed.file_stem().unwrap_or_default();
        format!("{stem}{DESIGN_DIR_SUFFIX}")
    }

    pub fn design_dir_abs(&self) -> PathBuf {
        self.working_dir.join(self.design_dir())
    }

    pub fn designs(&self) -> &[Airfoil] {
        &self.designs
    }

    pub fn set_remove_designs_on_close(&mut self, remove: bool) {
        self.remove_designs_on_close = remove;
    }

    /// First working airfoil of the session: the last existing design, or
    /// a fresh normalized (splined) copy of the seed saved as design 0.
    pub fn initial_airfoil_design(&mut self) -> Result<Airfoil, CaseError> {
        if self.designs.is_empty() {
            // bezier seeds keep their geometry, everything else goes splined
            let strategy = match self.airfoil_seed.format() {
                ShapeFormat::Bez => None,
                _ => Some(Strategy::Splined),
            };
            let mut first = self.airfoil_seed.as_copy(None, None, strategy)?;
            if first.geometry().map(|g| g.strategy()) != Some(Strategy::Bezier) {
                first.normalize()?;
            }
            first.set_used_as(UsedAs::Design);
            self.add_design(&first)?;
        }
        let design = self
            .designs
            .last()
            .ok_or_else(|| CaseError::NoSeed("no initial design".to_string()))?;
        let mut copy = design.as_copy_design(None)?;
        copy.set_edited(true);
        Ok(copy)
    }

    /// Save `airfoil` as the next design `Design_<nnn><ext>` and append
    /// it to the list. Returns the stored copy.
    pub fn add_design(&mut self, airfoil: &Airfoil) -> Result<Airfoil, CaseError> {
        let i_design = match self.designs.last() {
            Some(last) => last
                .file_stem()
                .and_then(|s| get_i_design(&s))
                .map(|i| i + 1)
                .unwrap_or(0),
            None => 0,
        };

        let file_name = design_file_name(i_design, &self.extension());
        let path = self.design_dir_abs().join(&file_name);

        let mut copy = airfoil.as_copy_design(Some(&path))?;
        copy.set_used_as(UsedAs::Design);
        copy.save()?;
        debug!(design = %file_name, "design added");
        self.designs.push(copy.clone());
        Ok(copy)
    }

    /// Remove a design (by file name); the first design always stays.
    /// Returns the neighbouring design to show next.
    pub fn remove_design(&mut self, file_name: &str) -> Option<Airfoil> {
        if self.designs.len() <= 1 {
            return None;
        }
        let i = self.designs.iter().position(|a| {
            a.file_name().as_deref() == Some(file_name)
                || a.file_stem().as_deref() == Some(file_name)
        })?;
        let airfoil = self.designs.remove(i);
        if let Some(path) = airfoil.path_abs() {
            if let Err(e) = fs::remove_file(&path) {
                error!(path = %path.display(), error = %e, "design file could not be removed");
            }
        }
        let next = if i < self.designs.len() {
            &self.designs[i]
        } else {
            self.designs.last()?
        };
        next.as_copy_design(None).ok()
    }

    pub fn get_design_by_name(&self, file_name: &str) -> Option<Airfoil> {
        self.designs
            .iter()
            .find(|a| {
                a.file_name().as_deref() == Some(file_name)
                    || a.file_stem().as_deref() == Some(file_name)
            })
            .and_then(|a| a.as_copy_design(None).ok())
    }

    /// Final airfoil derived from a design, placed next to the seed:
    /// `<seed>_mod`, or `<seed>_Design_<i>` when the seed already carries
    /// a `mod` tag.
    pub fn get_final_from_design(&self, design: &Airfoil) -> Result<Airfoil, CaseError> {
        let seed_name = self.airfoil_seed.name();
        let name_ext = if seed_name.contains("mod") {
            match design.file_stem().and_then(|s| get_i_design(&s)) {
                Some(i) => format!("_Design_{i}"),
                None => "_Design".to_string(),
            }
        } else {
            "_mod".to_string()
        };

        let seed_stem = self.airfoil_seed.file_stem().unwrap_or_default();
        let extension = design.format().extension();
        let path = self
            .working_dir
            .join(format!("{seed_stem}{name_ext}{extension}"));

        let mut airfoil = design.as_copy(
            Some(&path),
            Some(&format!("{seed_name}{name_ext}")),
            None,
        )?;
        airfoil.set_edited(false);
        Ok(airfoil)
    }

    /// Shut the case down. The design directory is removed when requested
    /// or when only the initial design exists. Removal uses
    /// `remove_dir_all`, which does not follow symlinked content.
    pub fn close(self) {
        if self.remove_designs_on_close || self.designs.len() < 2 {
            let dir = self.design_dir_abs();
            debug!(dir = %dir.display(), "removing design dir");
            if let Err(e) = fs::remove_dir_all(&dir) {
                warn!(dir = %dir.display(), error = %e, "design dir not removed");
            }
        }
    }

    fn read_all_designs(&self) -> Result<Vec<Airfoil>, CaseError> {
        let extension = self.extension();
        let dir = self.design_dir_abs();
        let mut files: Vec<PathBuf> = fs::read_dir(&dir)?
            .flatten()
            .map(|e| e.path())
            .filter(|p| {
                p.is_file()
                    && p.file_name()
                        .and_then(|n| n.to_str())
                        .map(|n| n.starts_with(DESIGN_NAME_BASE) && n.ends_with(&extension))
                        .unwrap_or(false)
            })
            .collect();
        files.sort_by_key(|p| {
            p.file_name()
                .and_then(|n| n.to_str())
                .unwrap_or("")
                .to_lowercase()
                .replace('_', " ")
        });

        let mut designs = Vec::new();
        for path in files {
            let mut airfoil = Airfoil::from_file(&path);
            match airfoil.ensure_loaded() {
                Ok(_) => {
                    let mut airfoil = match airfoil.format() {
                        ShapeFormat::Dat => {
                            airfoil.as_copy(Some(&path), None, Some(Strategy::Splined))?
                        }
                        _ => airfoil,
                    };
                    airfoil.set_used_as(UsedAs::Design);
                    airfoil.set_edited(true);
                    designs.push(airfoil);
                }
                Err(e) => {
                    error!(path = %path.display(), error = %e, "design could not be loaded");
                }
            }
        }
        info!(n = designs.len(), dir = %dir.display(), "designs read");
        Ok(designs)
    }
}

// --- As Bezier -------------------------------------------------------------

/// Direct design over a Bézier conversion of the seed: the first design
/// is a least-squares Bézier fit of the normalized seed airfoil; designs
/// are stored as `.bez` next to the converted file.
#[derive(Debug)]
pub struct AsBezierCase {
    inner: DirectDesignCase,
}

/// Control points used for the fitted sides.
const FIT_N_CP_UPPER: usize = 6;
const FIT_N_CP_LOWER: usize = 6;

impl AsBezierCase {
    pub fn new(mut airfoil_seed: Airfoil) -> Result<Self, CaseError> {
        airfoil_seed.ensure_loaded()?;
        let seed_path = airfoil_seed
            .path_abs()
            .ok_or_else(|| CaseError::NoSeed("airfoil has no file path".to_string()))?;

        // normalized splined working copy supplies the fit targets
        let mut normalized = airfoil_seed.as_copy(None, None, Some(Strategy::Splined))?;
        normalized.normalize()?;
        let geo = normalized
            .geometry()
            .ok_or_else(|| CaseError::NoSeed("seed airfoil not loaded".to_string()))?;

        let upper = BezierSide::fit(geo.upper(), LineType::Upper, FIT_N_CP_UPPER, 101)?;
        let lower = BezierSide::fit(geo.lower(), LineType::Lower, FIT_N_CP_LOWER, 101)?;

        let bezier_name = format!("{}_bezier", airfoil_seed.name());
        let mut bezier = Airfoil::from_bezier_sides(upper, lower, &bezier_name)?;
        let stem = seed_path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("seed");
        let bezier_path = seed_path.with_file_name(format!("{stem}_bezier.bez"));
        bezier.set_path(&bezier_path);
        bezier.save()?;
        info!(bezier = %bezier_path.display(), "seed converted to bezier");

        Ok(Self {
            inner: DirectDesignCase::new(bezier)?,
        })
    }

    pub fn case(&self) -> &DirectDesignCase {
        &self.inner
    }

    pub fn case_mut(&mut self) -> &mut DirectDesignCase {
        &mut self.inner
    }

    pub fn close(self) {
        self.inner.close()
    }
}

// --- Optimize --------------------------------------------------------------

/// Optimization session: input file, optimizer controller, result files.
#[derive(Debug)]
pub struct OptimizeCase {
    working_dir: PathBuf,
    input_file: InputFile,
    optimizer: Arc<Mutex<Optimizer>>,
    airfoil_seed: Option<Airfoil>,
}

impl OptimizeCase {
    pub fn new(
        input_path: impl Into<PathBuf>,
        optimizer_exe: Option<PathBuf>,
    ) -> Result<Self, CaseError> {
        let input_path: PathBuf = input_path.into();
        let working_dir = input_path
            .parent()
            .unwrap_or_else(|| Path::new("."))
            .to_path_buf();
        let input_file = if input_path.is_file() {
            InputFile::load(&input_path)?
        } else {
            InputFile::new(&input_path)
        };

        // the seed airfoil referenced from the input file, when present
        let airfoil_seed = input_file
            .get("optimization_options", "airfoil_file")
            .map(|v| v.trim_matches('\'').trim_matches('"').to_string())
            .map(|file| Airfoil::from_file(working_dir.join(file)));

        Ok(Self {
            optimizer: Arc::new(Mutex::new(Optimizer::new(optimizer_exe, &working_dir))),
            working_dir,
            input_file,
            airfoil_seed,
        })
    }

    pub fn name(&self) -> String {
        self.out_name()
    }

    pub fn working_dir(&self) -> &Path {
        &self.working_dir
    }

    pub fn input_file(&self) -> &InputFile {
        &self.input_file
    }

    pub fn input_file_mut(&mut self) -> &mut InputFile {
        &mut self.input_file
    }

    pub fn airfoil_seed(&self) -> Option<&Airfoil> {
        self.airfoil_seed.as_ref()
    }

    /// Name of all result artefacts, the input file stem.
    pub fn out_name(&self) -> String {
        self.input_file.file_stem()
    }

    /// Shared handle for the watchdog.
    pub fn optimizer(&self) -> Arc<Mutex<Optimizer>> {
        self.optimizer.clone()
    }

    pub fn result_airfoil_path(&self) -> PathBuf {
        self.working_dir.join(format!("{}.dat", self.out_name()))
    }

    pub fn result_dir(&self) -> PathBuf {
        self.working_dir.join(format!("{}_temp", self.out_name()))
    }

    pub fn state(&self) -> OptimizerState {
        self.optimizer
            .lock()
            .map(|mut o| o.state())
            .unwrap_or(OptimizerState::NotReady)
    }

    pub fn is_running(&self) -> bool {
        self.state() == OptimizerState::Running
    }

    /// Start the optimizer on the saved input file.
    pub fn run(&self) -> Result<(), CaseError> {
        self.input_file.save()?;
        let mut optimizer = self
            .optimizer
            .lock()
            .map_err(|_| CaseError::NoSeed("optimizer lock poisoned".to_string()))?;
        optimizer.run(&self.out_name(), self.input_file.path())?;
        Ok(())
    }

    pub fn stop(&self) {
        if let Ok(mut optimizer) = self.optimizer.lock() {
            optimizer.stop();
        }
    }

    /// Finished means: input file present, a result airfoil on disk that
    /// is at least as new as the result directory, and the optimizer back
    /// at `Ready`.
    pub fn is_finished(&self) -> bool {
        if !self.input_file.exists() {
            return false;
        }
        let result = self.result_airfoil_path();
        if !result.is_file() {
            return false;
        }
        if self.state() != OptimizerState::Ready {
            return false;
        }
        let result_mtime = fs::metadata(&result).and_then(|m| m.modified()).ok();
        let dir_mtime = fs::metadata(self.result_dir()).and_then(|m| m.modified()).ok();
        match (result_mtime, dir_mtime) {
            (Some(r), Some(d)) => r >= d,
            (Some(_), None) => true,
            _ => false,
        }
    }

    /// Drop the result artefacts of a previous run.
    pub fn clear_results(&self) {
        let dir = self.result_dir();
        if dir.is_dir() {
            if let Err(e) = fs::remove_dir_all(&dir) {
                warn!(dir = %dir.display(), error = %e, "result dir not removed");
            }
        }
    }

    /// Shut down: stop a running optimization hard.
    pub fn close(self) {
        if let Ok(mut optimizer) = self.optimizer.lock() {
            optimizer.terminate();
        }
    }
}
