//! Proxy for the external polar-generating worker process.

use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};

use core_airfoil::FlapDef;
use core_polar::{PolarType, SpecVar, ValRange};
use tracing::{debug, info, warn};

use crate::naming::PolarFileNaming;
use crate::WorkerError;

/// Executable base name of the worker.
pub const WORKER_EXE_NAME: &str = "worker";

/// Scratch file prefix of worker invocations; cleaned by
/// [`Worker::clean_working_dir`].
const INPUT_FILE_PREFIX: &str = "worker_input";

/// Everything one worker run needs to know, written to the input file.
#[derive(Debug, Clone)]
pub struct WorkerInvocation {
    pub airfoil_path: PathBuf,
    pub polar_type: PolarType,
    pub re: Vec<f64>,
    pub ma: Vec<f64>,
    pub ncrit: f64,
    pub xtript: Option<f64>,
    pub xtripb: Option<f64>,
    pub auto_range: bool,
    pub spec_var: SpecVar,
    pub val_range: ValRange,
    pub flap_angle: Vec<f64>,
    pub x_flap: Option<f64>,
    pub y_flap: Option<f64>,
    pub y_flap_spec: Option<String>,
    /// Repanel limit handed to the worker to speed up generation.
    pub n_points: Option<usize>,
}

impl WorkerInvocation {
    /// Namelist-style text of the invocation.
    fn as_input_text(&self) -> String {
        let join = |values: &[f64]| {
            values
                .iter()
                .map(|v| v.to_string())
                .collect::<Vec<_>>()
                .join(", ")
        };
        let mut text = String::from("&polar_generation\n");
        text.push_str(&format!("  type = '{}'\n", self.polar_type.as_str()));
        text.push_str(&format!("  polar_reynolds = {}\n", join(&self.re)));
        text.push_str(&format!("  polar_mach = {}\n", join(&self.ma)));
        text.push_str(&format!("  ncrit = {}\n", self.ncrit));
        if let Some(x) = self.xtript {
            text.push_str(&format!("  xtript = {x}\n"));
        }
        if let Some(x) = self.xtripb {
            text.push_str(&format!("  xtripb = {x}\n"));
        }
        text.push_str(&format!("  auto_range = {}\n", self.auto_range));
        text.push_str(&format!("  spec = '{}'\n", self.spec_var.as_str()));
        text.push_str(&format!(
            "  range = {}, {}, {}\n",
            self.val_range.from, self.val_range.to, self.val_range.step
        ));
        if !self.flap_angle.is_empty() {
            text.push_str(&format!("  flap_angle = {}\n", join(&self.flap_angle)));
            if let Some(x) = self.x_flap {
                text.push_str(&format!("  x_flap = {x}\n"));
            }
            if let Some(y) = self.y_flap {
                text.push_str(&format!("  y_flap = {y}\n"));
            }
            if let Some(spec) = &self.y_flap_spec {
                text.push_str(&format!("  y_flap_spec = '{spec}'\n"));
            }
        }
        if let Some(n) = self.n_points {
            text.push_str(&format!("  npoint = {n}\n"));
        }
        text.push_str("/\n");
        text
    }
}

/// One worker process: spawn, monitor, terminate, collect the verdict.
#[derive(Debug)]
pub struct Worker {
    exe_path: PathBuf,
    working_dir: PathBuf,
    child: Option<Child>,
    finished: Option<(i32, String)>,
    input_file: Option<PathBuf>,
}

impl Worker {
    pub fn new(exe_path: impl Into<PathBuf>, working_dir: impl Into<PathBuf>) -> Self {
        Self {
            exe_path: exe_path.into(),
            working_dir: working_dir.into(),
            child: None,
            finished: None,
            input_file: None,
        }
    }

    /// Resolve the executable and check its version against `min_version`.
    /// Returns the found version string.
    pub fn is_ready(exe_path: &Path, min_version: &str) -> Result<String, WorkerError> {
        if !exe_path.is_file() {
            return Err(WorkerError::NotReady(exe_path.display().to_string()));
        }
        let output = Command::new(exe_path)
            .arg("--version")
            .output()
            .map_err(|e| WorkerError::NotReady(format!("{}: {e}", exe_path.display())))?;
        let stdout = String::from_utf8_lossy(&output.stdout);
        let found = parse_version(&stdout)
            .ok_or_else(|| WorkerError::NotReady("no version in --version output".to_string()))?;
        if compare_versions(&found, min_version) < 0 {
            return Err(WorkerError::VersionTooOld {
                found,
                min: min_version.to_string(),
            });
        }
        debug!(version = %found, "worker ready");
        Ok(found)
    }

    /// Spawn the worker to generate the polars of an invocation. Returns
    /// immediately; progress is observed via [`is_running`](Self::is_running)
    /// and the polar files appearing on disk.
    pub fn generate_polar(&mut self, invocation: &WorkerInvocation) -> Result<(), WorkerError> {
        let stem = invocation
            .airfoil_path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("airfoil");
        let input_file = self
            .working_dir
            .join(format!("{INPUT_FILE_PREFIX}_{stem}.inp"));
        fs::write(&input_file, invocation.as_input_text())?;

        let child = Command::new(&self.exe_path)
            .current_dir(&self.working_dir)
            .arg("-w")
            .arg("polar")
            .arg("-i")
            .arg(&input_file)
            .arg("-a")
            .arg(&invocation.airfoil_path)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| WorkerError::SpawnFailed(e.to_string()))?;

        info!(exe = %self.exe_path.display(), airfoil = %invocation.airfoil_path.display(),
              n_re = invocation.re.len(), "worker spawned");
        self.child = Some(child);
        self.input_file = Some(input_file);
        self.finished = None;
        Ok(())
    }

    /// Apply a flap setting synchronously. Returns the flapped airfoil
    /// file the worker wrote.
    pub fn set_flap(
        &mut self,
        airfoil_path: &Path,
        flap: &FlapDef,
        out_name: Option<&str>,
    ) -> Result<PathBuf, WorkerError> {
        let stem = airfoil_path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("airfoil");
        let out_name = out_name
            .map(|n| n.to_string())
            .unwrap_or_else(|| format!("{stem}{}", PolarFileNaming::flapped_suffix(flap)));

        let output = Command::new(&self.exe_path)
            .current_dir(&self.working_dir)
            .arg("-w")
            .arg("flap")
            .arg("-a")
            .arg(airfoil_path)
            .arg("-o")
            .arg(&out_name)
            .args(["--x-flap", &flap.x_flap.to_string()])
            .args(["--y-flap", &flap.y_flap.to_string()])
            .args(["--y-flap-spec", &flap.y_flap_spec])
            .args(["--flap-angle", &flap.flap_angle.to_string()])
            .output()
            .map_err(|e| WorkerError::SpawnFailed(e.to_string()))?;

        if !output.status.success() {
            return Err(WorkerError::SpawnFailed(
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            ));
        }
        Ok(self.working_dir.join(format!("{out_name}.dat")))
    }

    pub fn is_running(&mut self) -> bool {
        match self.child.as_mut() {
            Some(child) => match child.try_wait() {
                Ok(Some(_)) => false,
                Ok(None) => true,
                Err(_) => false,
            },
            None => false,
        }
    }

    /// Kill the child process; harmless when already finished.
    pub fn terminate(&mut self) {
        if let Some(child) = self.child.as_mut() {
            if let Err(e) = child.kill() {
                debug!(error = %e, "worker kill (already finished?)");
            }
            warn!("worker terminated");
        }
    }

    /// Wait for the child, record return code and stderr text, remove the
    /// input scratch file.
    pub fn finalize(&mut self) {
        if let Some(mut child) = self.child.take() {
            let code = match child.wait() {
                Ok(status) => status.code().unwrap_or(-1),
                Err(_) => -1,
            };
            let mut errortext = String::new();
            if let Some(stderr) = child.stderr.as_mut() {
                let _ = stderr.read_to_string(&mut errortext);
            }
            let errortext = errortext.trim().to_string();
            if code != 0 {
                warn!(code, error = %errortext, "worker finished with error");
            }
            self.finished = Some((code, errortext));
        }
        if let Some(input) = self.input_file.take() {
            let _ = fs::remove_file(input);
        }
    }

    /// Return code after [`finalize`](Self::finalize); 0 while unknown.
    pub fn finished_returncode(&self) -> i32 {
        self.finished.as_ref().map(|(c, _)| *c).unwrap_or(0)
    }

    pub fn finished_errortext(&self) -> Option<String> {
        match &self.finished {
            Some((code, text)) if *code != 0 => {
                if text.is_empty() {
                    Some(format!("worker returncode {code}"))
                } else {
                    Some(text.clone())
                }
            }
            _ => None,
        }
    }

    /// Delete worker scratch files in a directory (input files and stop
    /// sentinels); polar result directories stay.
    pub fn clean_working_dir(dir: &Path) {
        let Ok(entries) = fs::read_dir(dir) else {
            return;
        };
        for entry in entries.flatten() {
            let name = entry.file_name();
            let name = name.to_string_lossy();
            if name.starts_with(INPUT_FILE_PREFIX) || name.ends_with(".stop") {
                debug!(file = %name, "removing worker scratch file");
                let _ = fs::remove_file(entry.path());
            }
        }
    }
}

impl Drop for Worker {
    fn drop(&mut self) {
        // a dropped proxy must not leave a running child behind
        if self.is_running() {
            self.terminate();
        }
        self.finalize();
    }
}

/// First `x.y[.z]` sequence in a text.
pub fn parse_version(text: &str) -> Option<String> {
    for token in text.split_whitespace() {
        let candidate = token.trim_matches(|c: char| !c.is_ascii_digit() && c != '.');
        let parts: Vec<&str> = candidate.split('.').collect();
        if parts.len() >= 2 && parts.iter().all(|p| !p.is_empty() && p.chars().all(|c| c.is_ascii_digit())) {
            return Some(candidate.to_string());
        }
    }
    None
}

/// Semantic comparison: negative when `a < b`.
pub fn compare_versions(a: &str, b: &str) -> i32 {
    let parse = |v: &str| -> Vec<u64> {
        v.split('.')
            .map(|p| p.parse::<u64>().unwrap_or(0))
            .collect()
    };
    let (va, vb) = (parse(a), parse(b));
    for i in 0..va.len().max(vb.len()) {
        let x = va.get(i).copied().unwrap_or(0);
        let y = vb.get(i).copied().unwrap_or(0);
        if x != y {
            return if x < y { -1 } else { 1 };
        }
    }
    0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_parsing() {
        assert_eq!(parse_version("Worker 1.0.3 (build 7)"), Some("1.0.3".to_string()));
        assert_eq!(parse_version("v2.1"), Some("2.1".to_string()));
        assert_eq!(parse_version("no version here"), None);
    }

    #[test]
    fn version_ordering() {
        assert!(compare_versions("1.0.3", "1.0.2") > 0);
        assert!(compare_versions("1.0", "1.0.0") == 0);
        assert!(compare_versions("0.9.9", "1.0") < 0);
        assert!(compare_versions("1.10", "1.9") > 0);
    }

    #[test]
    fn missing_executable_is_not_ready() {
        let err = Worker::is_ready(Path::new("/nonexistent/worker"), "1.0");
        assert!(matches!(err, Err(WorkerError::NotReady(_))));
    }

    #[test]
    fn invocation_input_text() {
        let invocation = WorkerInvocation {
            airfoil_path: PathBuf::from("/tmp/a.dat"),
            polar_type: PolarType::T1,
            re: vec![300_000.0, 400_000.0],
            ma: vec![0.0, 0.0],
            ncrit: 9.0,
            xtript: None,
            xtripb: None,
            auto_range: true,
            spec_var: SpecVar::Alpha,
            val_range: ValRange::default(),
            flap_angle: vec![],
            x_flap: None,
            y_flap: None,
            y_flap_spec: None,
            n_points: Some(160),
        };
        let text = invocation.as_input_text();
        assert!(text.starts_with("&polar_generation"));
        assert!(text.contains("polar_reynolds = 300000, 400000"));
        assert!(text.contains("ncrit = 9"));
        assert!(text.contains("npoint = 160"));
        assert!(text.trim_end().ends_with('/'));
        assert!(!text.contains("flap_angle"));
    }

    #[test]
    fn clean_working_dir_removes_scratch_only() {
        let dir = tempfile::tempdir().unwrap();
        let scratch = dir.path().join("worker_input_a.inp");
        let keep = dir.path().join("a_polars");
        fs::write(&scratch, "x").unwrap();
        fs::create_dir(&keep).unwrap();
        Worker::clean_working_dir(dir.path());
        assert!(!scratch.exists());
        assert!(keep.exists());
    }
}
