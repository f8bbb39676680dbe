//! Bundling of compatible polars into one worker run, and the
//! per-application task registry the watchdog polls.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use core_polar::set::PolarPathResolver;
use core_polar::Polar;
use tracing::{debug, warn};

use crate::worker::{Worker, WorkerInvocation};
use crate::WorkerError;

/// One worker run generating the polars of compatible definitions.
///
/// Compatible means: same polar type, ncrit, transitions, spec variable,
/// value range, auto-range flag and flap hinge. Reynolds numbers, Mach
/// numbers and flap angles accumulate into lists the worker sweeps.
#[derive(Debug)]
pub struct PolarTask {
    airfoil_path: PathBuf,
    airfoil_name: String,
    airfoil_is_design: bool,
    res: Vec<f64>,
    mas: Vec<f64>,
    flap_angles: Vec<f64>,
    polars: Vec<Polar>,
    n_polars_total: usize,
    worker: Option<Worker>,
    started: bool,
    finalized: bool,
}

impl PolarTask {
    /// Task seeded with its first polar.
    pub fn new(
        polar: Polar,
        airfoil_path: impl Into<PathBuf>,
        airfoil_name: impl Into<String>,
        airfoil_is_design: bool,
    ) -> Self {
        let def = polar.def();
        let mut task = Self {
            airfoil_path: airfoil_path.into(),
            airfoil_name: airfoil_name.into(),
            airfoil_is_design,
            res: vec![def.re],
            mas: vec![def.ma],
            flap_angles: def.flap.as_ref().map(|f| vec![f.flap_angle]).unwrap_or_default(),
            polars: Vec::new(),
            n_polars_total: 1,
            worker: None,
            started: false,
            finalized: false,
        };
        task.polars.push(polar);
        task
    }

    pub fn airfoil_name(&self) -> &str {
        &self.airfoil_name
    }

    pub fn airfoil_is_design(&self) -> bool {
        self.airfoil_is_design
    }

    pub fn n_polars(&self) -> usize {
        self.n_polars_total
    }

    pub fn n_polars_running(&self) -> usize {
        self.polars.iter().filter(|p| !p.is_loaded()).count()
    }

    /// Add a polar when the task has not started and every compatibility
    /// key matches; an incompatible polar is handed back to the caller.
    pub fn add_polar(&mut self, polar: Polar) -> Result<(), Polar> {
        if self.started || polar.is_loaded() {
            return Err(polar);
        }
        let first = match self.polars.first() {
            Some(p) => p.def(),
            None => return Err(polar),
        };
        if !first.is_task_compatible(polar.def()) {
            return Err(polar);
        }
        let def = polar.def();
        self.res.push(def.re);
        self.mas.push(def.ma);
        if let Some(flap) = &def.flap {
            self.flap_angles.push(flap.flap_angle);
        }
        self.polars.push(polar);
        self.n_polars_total += 1;
        Ok(())
    }

    /// Launch the worker for the whole bundle. A launch failure marks
    /// every polar in the bundle as errored and finalizes the task.
    pub fn run(&mut self, worker_exe: &Path, n_points: Option<usize>) -> Result<(), WorkerError> {
        let working_dir = self
            .airfoil_path
            .parent()
            .unwrap_or_else(|| Path::new("."))
            .to_path_buf();
        let first = match self.polars.first() {
            Some(p) => p.def().clone(),
            None => return Ok(()),
        };

        let invocation = WorkerInvocation {
            airfoil_path: self.airfoil_path.clone(),
            polar_type: first.polar_type,
            re: self.res.clone(),
            ma: self.mas.clone(),
            ncrit: first.ncrit,
            xtript: first.xtript,
            xtripb: first.xtripb,
            auto_range: first.auto_range,
            spec_var: first.spec_var,
            val_range: first.val_range,
            flap_angle: self.flap_angles.clone(),
            x_flap: first.flap.as_ref().map(|f| f.x_flap),
            y_flap: first.flap.as_ref().map(|f| f.y_flap),
            y_flap_spec: first.flap.as_ref().map(|f| f.y_flap_spec.clone()),
            n_points,
        };

        let mut worker = Worker::new(worker_exe, working_dir);
        self.started = true;
        match worker.generate_polar(&invocation) {
            Ok(()) => {
                self.worker = Some(worker);
                debug!(airfoil = %self.airfoil_name, n = self.n_polars_total, "polar task started");
                Ok(())
            }
            Err(e) => {
                warn!(airfoil = %self.airfoil_name, error = %e, "polar generation failed");
                // the errored polars stay in the bundle so the watchdog
                // harvest still delivers them before the task is dropped
                for polar in &mut self.polars {
                    polar.set_error_reason(e.to_string());
                }
                Err(e)
            }
        }
    }

    /// Mark as started without a process; the polars are expected to
    /// appear through an external channel. Used by tests and the reload
    /// path where files already exist.
    pub fn mark_started(&mut self) {
        self.started = true;
    }

    pub fn is_running(&mut self) -> bool {
        self.worker.as_mut().map(|w| w.is_running()).unwrap_or(false)
    }

    /// All polars of the bundle are loaded (possibly with errors).
    pub fn is_completed(&self) -> bool {
        self.polars.iter().all(|p| p.is_loaded())
    }

    /// Kill the worker. Remaining polars get the worker's exit reason as
    /// their error; idempotent.
    pub fn terminate(&mut self) {
        let mut reason = "polar generation terminated".to_string();
        if let Some(worker) = self.worker.as_mut() {
            if worker.is_running() {
                worker.terminate();
            }
            worker.finalize();
            if let Some(text) = worker.finished_errortext() {
                reason = text;
            }
        }
        for polar in self.polars.iter_mut().filter(|p| !p.is_loaded()) {
            polar.set_error_reason(&reason);
        }
        self.finalize();
    }

    /// Harvest results: when the worker is done, load every pending polar
    /// from its canonical file (or propagate the worker error). Returns
    /// the number of polars newly loaded.
    pub fn load_polars(&mut self, resolver: &dyn PolarPathResolver) -> usize {
        if self.is_running() {
            return 0;
        }
        if let Some(worker) = self.worker.as_mut() {
            worker.finalize();
        }
        let returncode = self.worker.as_ref().map(|w| w.finished_returncode()).unwrap_or(0);
        let errortext = self
            .worker
            .as_ref()
            .and_then(|w| w.finished_errortext())
            .unwrap_or_else(|| format!("worker returncode {returncode}"));

        let mut n_loaded = 0;
        for polar in self.polars.iter_mut().filter(|p| !p.is_loaded()) {
            if returncode != 0 {
                polar.set_error_reason(&errortext);
            } else if let Some(path) = resolver.existing_polar_file(&self.airfoil_path, polar.def())
            {
                let _ = polar.load_from_file(&path);
            }
            if polar.is_loaded() {
                n_loaded += 1;
            }
        }
        n_loaded
    }

    /// Drain the loaded polars for delivery to the UI domain.
    pub fn take_loaded(&mut self) -> Vec<Polar> {
        let mut taken = Vec::new();
        let mut i = 0;
        while i < self.polars.len() {
            if self.polars[i].is_loaded() {
                taken.push(self.polars.remove(i));
            } else {
                i += 1;
            }
        }
        taken
    }

    /// Worker cleanup; the task is dropped from the registry afterwards.
    pub fn finalize(&mut self) {
        if let Some(mut worker) = self.worker.take() {
            worker.finalize();
        }
        self.finalized = true;
    }

    pub fn is_finalized(&self) -> bool {
        self.finalized
    }
}

/// Load what exists on disk and bundle the rest into running tasks.
///
/// Missing polars group into as few tasks as compatibility allows; each
/// task is started on the worker and registered for the watchdog harvest.
/// Returns the number of polars loaded synchronously from disk.
pub fn load_or_generate_polars(
    set: &mut core_polar::PolarSet,
    airfoil_is_design: bool,
    registry: &TaskRegistry,
    worker_exe: &Path,
    n_points: Option<usize>,
) -> usize {
    let n_loaded = set.load_polars(&crate::PolarFileNaming);

    let airfoil_path = set.airfoil_path().to_path_buf();
    let airfoil_name = set.airfoil_name().to_string();

    let mut tasks: Vec<PolarTask> = Vec::new();
    for polar in set.polars().iter().filter(|p| !p.is_loaded()).cloned() {
        let mut pending = Some(polar);
        for task in tasks.iter_mut() {
            let Some(p) = pending.take() else { break };
            match task.add_polar(p) {
                Ok(()) => break,
                Err(p) => pending = Some(p),
            }
        }
        if let Some(p) = pending {
            tasks.push(PolarTask::new(
                p,
                &airfoil_path,
                &airfoil_name,
                airfoil_is_design,
            ));
        }
    }

    for mut task in tasks {
        // a failed launch errors its polars; the watchdog harvest still
        // delivers those to the UI before the task is dropped
        let _ = task.run(worker_exe, n_points);
        registry.add(task);
    }
    n_loaded
}

/// Shared handle of a task.
pub type TaskHandle = Arc<Mutex<PolarTask>>;

/// Per-application registry of polar tasks.
///
/// The UI domain adds tasks; the watchdog reads them and removes the ones
/// it finalized. Registration order is kept, completion order is not
/// guaranteed to the consumers.
#[derive(Debug, Default)]
pub struct TaskRegistry {
    tasks: Mutex<Vec<TaskHandle>>,
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, task: PolarTask) -> TaskHandle {
        let handle = Arc::new(Mutex::new(task));
        if let Ok(mut tasks) = self.tasks.lock() {
            tasks.push(handle.clone());
        }
        handle
    }

    /// Active tasks in registration order; finalized ones are dropped on
    /// the way.
    pub fn active_tasks(&self) -> Vec<TaskHandle> {
        let Ok(mut tasks) = self.tasks.lock() else {
            return Vec::new();
        };
        tasks.retain(|t| t.lock().map(|t| !t.is_finalized()).unwrap_or(false));
        tasks.clone()
    }

    pub fn n_tasks(&self) -> usize {
        self.active_tasks().len()
    }

    /// Total number of polars still being generated.
    pub fn n_polars_running(&self) -> usize {
        self.active_tasks()
            .iter()
            .filter_map(|t| t.lock().ok().map(|t| t.n_polars_running()))
            .sum()
    }

    /// Bound the number of concurrent workers: terminate every task whose
    /// airfoil is not in `keep_airfoils` and is not a design airfoil.
    /// Used when switching airfoils or leaving a mode.
    pub fn terminate_instances_except_for(&self, keep_airfoils: &[String]) {
        for handle in self.active_tasks() {
            let Ok(mut task) = handle.lock() else {
                continue;
            };
            let keep = keep_airfoils.iter().any(|n| n == task.airfoil_name())
                || task.airfoil_is_design();
            if !keep {
                warn!(airfoil = %task.airfoil_name(), "terminating polar task");
                task.terminate();
            }
        }
    }

    /// Terminate everything, for app shutdown.
    pub fn terminate_all(&self) {
        for handle in self.active_tasks() {
            if let Ok(mut task) = handle.lock() {
                task.terminate();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_polar::{PolarDef, PolarSet};

    fn polar(re: f64, ncrit: f64) -> Polar {
        Polar::new(PolarDef {
            re,
            ncrit,
            ..PolarDef::default()
        })
    }

    fn task_of(polar_: Polar) -> PolarTask {
        PolarTask::new(polar_, "/tmp/x.dat", "X", false)
    }

    #[test]
    fn compatible_polars_join_one_task() {
        let mut task = task_of(polar(300_000.0, 9.0));
        assert!(task.add_polar(polar(400_000.0, 9.0)).is_ok());
        assert_eq!(task.n_polars(), 2);
        assert_eq!(task.n_polars_running(), 2);
    }

    #[test]
    fn incompatible_polar_is_handed_back() {
        let mut task = task_of(polar(300_000.0, 9.0));
        let other = polar(400_000.0, 7.0);
        let refused = task.add_polar(other).unwrap_err();
        assert_eq!(refused.def().ncrit, 7.0);
        assert_eq!(task.n_polars(), 1);
    }

    #[test]
    fn started_task_refuses_polars() {
        let mut task = task_of(polar(300_000.0, 9.0));
        task.mark_started();
        assert!(task.add_polar(polar(400_000.0, 9.0)).is_err());
    }

    #[test]
    fn grouping_via_sets_produces_expected_tasks() {
        // three defs: two share everything, the third differs by ncrit
        let mut set = PolarSet::new("X", "/tmp/x.dat");
        set.add_polar_defs(&[
            PolarDef {
                re: 300_000.0,
                ncrit: 9.0,
                ..PolarDef::default()
            },
            PolarDef {
                re: 400_000.0,
                ncrit: 9.0,
                ..PolarDef::default()
            },
            PolarDef {
                re: 400_000.0,
                ncrit: 7.0,
                ..PolarDef::default()
            },
        ]);

        let mut tasks: Vec<PolarTask> = Vec::new();
        for polar in set.polars().iter().cloned() {
            let mut pending = Some(polar);
            for task in tasks.iter_mut() {
                let Some(p) = pending.take() else { break };
                match task.add_polar(p) {
                    Ok(()) => break,
                    Err(p) => pending = Some(p),
                }
            }
            if let Some(p) = pending {
                tasks.push(PolarTask::new(p, "/tmp/x.dat", "X", false));
            }
        }
        assert_eq!(tasks.len(), 2);
        assert_eq!(tasks[0].n_polars(), 2);
        assert_eq!(tasks[1].n_polars(), 1);
    }

    #[test]
    fn registry_drops_finalized_tasks() {
        let registry = TaskRegistry::new();
        let handle = registry.add(task_of(polar(300_000.0, 9.0)));
        assert_eq!(registry.n_tasks(), 1);
        handle.lock().map(|mut t| t.finalize()).ok();
        assert_eq!(registry.n_tasks(), 0);
    }

    #[test]
    fn terminate_except_spares_designs_and_kept() {
        let registry = TaskRegistry::new();
        registry.add(task_of(polar(300_000.0, 9.0)));
        registry.add(PolarTask::new(polar(300_000.0, 9.0), "/tmp/d.dat", "D", true));
        registry.add(PolarTask::new(polar(300_000.0, 9.0), "/tmp/y.dat", "Y", false));

        registry.terminate_instances_except_for(&["X".to_string()]);
        // the design task and X survive, Y is gone
        let names: Vec<String> = registry
            .active_tasks()
            .iter()
            .filter_map(|t| t.lock().ok().map(|t| t.airfoil_name().to_string()))
            .collect();
        assert_eq!(names, vec!["X".to_string(), "D".to_string()]);
    }
}
