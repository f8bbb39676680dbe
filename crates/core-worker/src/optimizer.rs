//! Proxy for the external airfoil optimizer (Xoptfoil2 family).

use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::time::Instant;

use tracing::{debug, info, warn};

use crate::WorkerError;

/// Executable base name of the optimizer.
pub const OPTIMIZER_EXE_NAME: &str = "xoptfoil2";

/// Sentinel file the running optimizer watches for a graceful stop.
pub const STOP_SENTINEL: &str = "run_control.stop";

/// Run states of the optimizer controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptimizerState {
    NotReady,
    Ready,
    Running,
    Stopping,
    RunError,
}

impl OptimizerState {
    pub fn as_str(&self) -> &'static str {
        match self {
            OptimizerState::NotReady => "not ready",
            OptimizerState::Ready => "ready",
            OptimizerState::Running => "running",
            OptimizerState::Stopping => "waiting for stop",
            OptimizerState::RunError => "run error",
        }
    }
}

/// Progress snapshot of a running optimization.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Progress {
    pub n_steps: usize,
    pub n_designs: usize,
    pub objective: f64,
}

/// Spawn, observe and stop one optimizer process.
#[derive(Debug)]
pub struct Optimizer {
    exe_path: Option<PathBuf>,
    working_dir: PathBuf,
    out_name: Option<String>,
    child: Option<Child>,
    finished: Option<(i32, String)>,
    stop_requested: bool,
    progress: Progress,
    time_started: Option<Instant>,
}

impl Optimizer {
    pub fn new(exe_path: Option<PathBuf>, working_dir: impl Into<PathBuf>) -> Self {
        Self {
            exe_path,
            working_dir: working_dir.into(),
            out_name: None,
            child: None,
            finished: None,
            stop_requested: false,
            progress: Progress {
                objective: 1.0,
                ..Progress::default()
            },
            time_started: None,
        }
    }

    pub fn working_dir(&self) -> &Path {
        &self.working_dir
    }

    pub fn out_name(&self) -> Option<&str> {
        self.out_name.as_deref()
    }

    /// Executable exists and answered `--version` at least at `min_version`.
    pub fn is_ready(&self, min_version: &str) -> bool {
        match &self.exe_path {
            Some(exe) => crate::Worker::is_ready(exe, min_version).is_ok(),
            None => false,
        }
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

    /// Pending stop request; clears itself once the process is gone.
    pub fn is_stop_requested(&mut self) -> bool {
        if self.stop_requested && !self.is_running() {
            self.stop_requested = false;
        }
        self.stop_requested
    }

    pub fn run_errortext(&self) -> Option<String> {
        match &self.finished {
            Some((code, text)) if *code != 0 => Some(if text.is_empty() {
                format!("optimizer returncode {code}")
            } else {
                text.clone()
            }),
            _ => None,
        }
    }

    /// Recompute the state from the process and bookkeeping.
    pub fn state(&mut self) -> OptimizerState {
        if self.is_stop_requested() {
            OptimizerState::Stopping
        } else if self.is_running() {
            OptimizerState::Running
        } else if self.run_errortext().is_some() {
            OptimizerState::RunError
        } else if self.exe_path.is_none() {
            OptimizerState::NotReady
        } else {
            OptimizerState::Ready
        }
    }

    /// Start an optimization. `out_name` names the result files, the input
    /// file carries the namelist configuration.
    pub fn run(&mut self, out_name: &str, input_file: &Path) -> Result<(), WorkerError> {
        let exe = self
            .exe_path
            .clone()
            .ok_or_else(|| WorkerError::NotReady("optimizer executable unset".to_string()))?;
        // a stale stop sentinel would end the fresh run immediately
        let _ = fs::remove_file(self.working_dir.join(STOP_SENTINEL));

        let child = Command::new(&exe)
            .current_dir(&self.working_dir)
            .arg("-i")
            .arg(input_file)
            .arg("-o")
            .arg(out_name)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| WorkerError::SpawnFailed(e.to_string()))?;

        info!(out_name, input = %input_file.display(), "optimizer started");
        self.child = Some(child);
        self.out_name = Some(out_name.to_string());
        self.finished = None;
        self.stop_requested = false;
        self.progress = Progress {
            objective: 1.0,
            ..Progress::default()
        };
        self.time_started = Some(Instant::now());
        Ok(())
    }

    /// Graceful stop: drop the sentinel file the optimizer watches; it
    /// writes its best design and exits. State shows `Stopping` until the
    /// process terminates.
    pub fn stop(&mut self) {
        if self.is_running() {
            self.stop_requested = true;
            if let Err(e) = fs::write(self.working_dir.join(STOP_SENTINEL), "stop\n") {
                warn!(error = %e, "could not write stop sentinel, killing process");
                if let Some(child) = self.child.as_mut() {
                    let _ = child.kill();
                }
            }
        }
    }

    /// Hard kill, for app shutdown.
    pub fn terminate(&mut self) {
        if let Some(child) = self.child.as_mut() {
            let _ = child.kill();
        }
        self.finalize();
    }

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
            self.finished = Some((code, errortext.trim().to_string()));
            let _ = fs::remove_file(self.working_dir.join(STOP_SENTINEL));
            debug!(code, "optimizer finalized");
        }
    }

    /// Progress `(n_steps, n_designs, objective)` read from the progress
    /// file the optimizer appends to (`<out_name>.prog`, one
    /// `step;designs;objective` row per step).
    pub fn get_progress(&mut self) -> Progress {
        if !self.is_running() {
            self.progress = Progress {
                objective: 1.0,
                ..Progress::default()
            };
            return self.progress;
        }
        let Some(out_name) = &self.out_name else {
            return self.progress;
        };
        let path = self.working_dir.join(format!("{out_name}.prog"));
        if let Ok(text) = fs::read_to_string(&path) {
            if let Some(line) = text.lines().rev().find(|l| !l.trim().is_empty()) {
                let parts: Vec<&str> = line.split(';').map(|p| p.trim()).collect();
                if parts.len() >= 3 {
                    self.progress = Progress {
                        n_steps: parts[0].parse().unwrap_or(self.progress.n_steps),
                        n_designs: parts[1].parse().unwrap_or(self.progress.n_designs),
                        objective: parts[2].parse().unwrap_or(self.progress.objective),
                    };
                }
            }
        }
        self.progress
    }

    /// Improvement reached so far, as a fraction of 1.
    pub fn improvement(&self) -> f64 {
        1.0 - self.progress.objective
    }

    /// Elapsed run time as `h:mm:ss` or `m:ss`; empty when not running.
    pub fn time_running(&mut self) -> String {
        if !self.is_running() {
            return String::new();
        }
        let Some(started) = self.time_started else {
            return String::new();
        };
        let total = started.elapsed().as_secs();
        let (hours, rest) = (total / 3600, total % 3600);
        let (minutes, seconds) = (rest / 60, rest % 60);
        if hours > 0 {
            format!("{hours}:{minutes}:{seconds:02}")
        } else {
            format!("{minutes}:{seconds:02}")
        }
    }
}

impl Drop for Optimizer {
    fn drop(&mut self) {
        if self.is_running() {
            self.terminate();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_without_executable() {
        let dir = tempfile::tempdir().unwrap();
        let mut opt = Optimizer::new(None, dir.path());
        assert_eq!(opt.state(), OptimizerState::NotReady);
        assert!(opt.run("out", Path::new("in.inp")).is_err());
    }

    #[test]
    fn state_ready_with_executable_path() {
        let dir = tempfile::tempdir().unwrap();
        let mut opt = Optimizer::new(Some(PathBuf::from("/bin/true")), dir.path());
        // not running, no error, exe set
        assert_eq!(opt.state(), OptimizerState::Ready);
    }

    #[test]
    fn run_and_finalize_with_shell_process() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("case.inp");
        fs::write(&input, "&optimization_options\n/\n").unwrap();

        // wrapper script stands in for the optimizer binary
        let script = dir.path().join("opt.sh");
        fs::write(&script, "#!/bin/sh\nsleep 0.3\n").unwrap();
        make_executable(&script);

        let mut opt = Optimizer::new(Some(script), dir.path());
        opt.run("case", &input).unwrap();
        assert_eq!(opt.state(), OptimizerState::Running);
        assert!(!opt.time_running().is_empty());

        while opt.is_running() {
            std::thread::sleep(std::time::Duration::from_millis(20));
        }
        opt.finalize();
        assert_eq!(opt.state(), OptimizerState::Ready);
        assert!(opt.run_errortext().is_none());
    }

    #[test]
    fn failing_process_gives_run_error() {
        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("fail.sh");
        fs::write(&script, "#!/bin/sh\necho boom >&2\nexit 3\n").unwrap();
        make_executable(&script);

        let mut opt = Optimizer::new(Some(script), dir.path());
        opt.run("case", Path::new("missing.inp")).unwrap();
        while opt.is_running() {
            std::thread::sleep(std::time::Duration::from_millis(20));
        }
        opt.finalize();
        assert_eq!(opt.state(), OptimizerState::RunError);
        assert_eq!(opt.run_errortext().unwrap(), "boom");
    }

    #[test]
    fn progress_file_parsing() {
        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("opt.sh");
        fs::write(&script, "#!/bin/sh\nsleep 0.5\n").unwrap();
        make_executable(&script);

        let mut opt = Optimizer::new(Some(script), dir.path());
        opt.run("case", Path::new("in.inp")).unwrap();
        fs::write(dir.path().join("case.prog"), "1;0;1.0\n12;3;0.974\n").unwrap();

        let progress = opt.get_progress();
        assert_eq!(progress.n_steps, 12);
        assert_eq!(progress.n_designs, 3);
        assert!((opt.improvement() - 0.026).abs() < 1e-9);
        opt.terminate();
    }

    fn make_executable(path: &Path) {
        use std::os::unix::fs::PermissionsExt;
        let mut perms = fs::metadata(path).unwrap().permissions();
        perms.set_mode(0o755);
        fs::set_permissions(path, perms).unwrap();
    }
}
