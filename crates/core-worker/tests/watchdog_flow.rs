//! End-to-end polar generation flow: a stand-in worker process drops a
//! polar file, the watchdog harvests it and notifies.

use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use core_polar::{PolarDef, PolarSet};
use core_worker::task::load_or_generate_polars;
use core_worker::watchdog::WatchTargets;
use core_worker::{Notification, Optimizer, OptimizerState, PolarFileNaming, TaskRegistry, Watchdog};
use crossbeam_channel::unbounded;
use tempfile::tempdir;

fn write_polar_file(path: &Path, re: f64, ncrit: f64, n_rows: usize) {
    let mut text = String::new();
    text.push_str(" Calculated polar for: X\n\n");
    text.push_str(&format!(
        " Mach =   0.000     Re = {:>9.3} e 6     Ncrit = {:>7.3}\n\n",
        re / 1e6,
        ncrit
    ));
    text.push_str("   alpha     CL        CD       CDp       CM    Top Xtr  Bot Xtr\n");
    text.push_str("  ------- -------- --------- --------- -------- -------- --------\n");
    for i in 0..n_rows {
        let alpha = -2.0 + i as f64 * 0.5;
        text.push_str(&format!(
            "  {:7.3} {:8.4} {:9.5} {:9.5} {:8.4} {:8.4} {:8.4}\n",
            alpha,
            0.11 * alpha,
            0.006,
            0.002,
            -0.05,
            0.5,
            0.9
        ));
    }
    fs::write(path, text).unwrap();
}

fn make_executable(path: &Path) {
    use std::os::unix::fs::PermissionsExt;
    let mut perms = fs::metadata(path).unwrap().permissions();
    perms.set_mode(0o755);
    fs::set_permissions(path, perms).unwrap();
}

#[test]
fn watchdog_ticks_within_warmup_window() {
    let registry = Arc::new(TaskRegistry::new());
    let targets = Arc::new(WatchTargets::new(registry, Arc::new(PolarFileNaming)));
    let (tx, rx) = unbounded();
    let watchdog = Watchdog::start(targets, tx);

    // warm-up is 1 s; the first loop iteration must land within 1.5 s
    let notification = rx.recv_timeout(Duration::from_millis(1500));
    assert!(matches!(notification, Ok(Notification::Tick)));
    watchdog.stop();
}

#[test]
fn worker_result_is_harvested_and_notified() {
    let dir = tempdir().unwrap();
    let airfoil_path = dir.path().join("X.dat");
    fs::write(&airfoil_path, "X\n1.0 0.0\n0.0 0.0\n1.0 -0.0\n").unwrap();

    let def = PolarDef {
        re: 400_000.0,
        ncrit: 9.0,
        ..PolarDef::default()
    };

    // pre-canned result the stand-in worker drops after 200 ms
    let precanned = dir.path().join("precanned.txt");
    write_polar_file(&precanned, 400_000.0, 9.0, 20);
    let polar_dir = PolarFileNaming::polar_dir(&airfoil_path);
    let target = polar_dir.join(PolarFileNaming::polar_file_name(&def));

    let script = dir.path().join("worker.sh");
    fs::write(
        &script,
        format!(
            "#!/bin/sh\nsleep 0.2\nmkdir -p '{}'\ncp '{}' '{}'\n",
            polar_dir.display(),
            precanned.display(),
            target.display()
        ),
    )
    .unwrap();
    make_executable(&script);

    let mut set = PolarSet::new("X", &airfoil_path);
    set.add_polar_defs(&[def]);

    let registry = Arc::new(TaskRegistry::new());
    let n_sync = load_or_generate_polars(&mut set, false, &registry, &script, None);
    assert_eq!(n_sync, 0);
    assert_eq!(registry.n_tasks(), 1);
    let task = registry.active_tasks()[0].clone();

    let targets = Arc::new(WatchTargets::new(registry.clone(), Arc::new(PolarFileNaming)));
    let (tx, rx) = unbounded();
    let watchdog = Watchdog::start(targets, tx);

    // one watchdog tick after the file appears the notification fires
    let deadline = Instant::now() + Duration::from_secs(5);
    let mut harvested = Vec::new();
    while Instant::now() < deadline {
        match rx.recv_timeout(Duration::from_millis(200)) {
            Ok(Notification::NewPolars(polars)) => {
                harvested = polars;
                break;
            }
            Ok(_) => continue,
            Err(_) => continue,
        }
    }
    watchdog.stop();

    assert_eq!(harvested.len(), 1);
    assert_eq!(harvested[0].airfoil_name, "X");
    assert_eq!(harvested[0].polar.points().len(), 20);
    assert!(task.lock().map(|t| t.is_completed()).unwrap_or(false));

    // the UI domain merges the result back into the set
    for loaded in harvested {
        assert!(set.merge_loaded(loaded.polar));
    }
    assert!(set.has_all_polars_loaded());

    // finalized tasks leave the registry
    assert_eq!(registry.n_tasks(), 0);
}

#[test]
fn failed_launch_delivers_errored_polars() {
    let dir = tempdir().unwrap();
    let airfoil_path = dir.path().join("X.dat");
    fs::write(&airfoil_path, "X\n").unwrap();

    let mut set = PolarSet::new("X", &airfoil_path);
    set.add_polar_defs(&[PolarDef::default()]);

    let registry = Arc::new(TaskRegistry::new());
    // executable does not exist, launch fails
    load_or_generate_polars(
        &mut set,
        false,
        &registry,
        Path::new("/nonexistent/worker"),
        None,
    );

    let targets = Arc::new(WatchTargets::new(registry.clone(), Arc::new(PolarFileNaming)));
    let (tx, rx) = unbounded();
    let watchdog = Watchdog::start(targets, tx);

    let deadline = Instant::now() + Duration::from_secs(5);
    let mut harvested = Vec::new();
    while Instant::now() < deadline {
        match rx.recv_timeout(Duration::from_millis(200)) {
            Ok(Notification::NewPolars(polars)) => {
                harvested = polars;
                break;
            }
            _ => continue,
        }
    }
    watchdog.stop();

    assert_eq!(harvested.len(), 1);
    assert!(harvested[0].polar.error_occurred());
    set.merge_loaded(harvested.into_iter().next().map(|l| l.polar).unwrap());
    assert!(set.polars()[0].error_occurred());
}

#[test]
fn optimizer_state_is_reported_on_watch() {
    let dir = tempdir().unwrap();
    let registry = Arc::new(TaskRegistry::new());
    let targets = Arc::new(WatchTargets::new(registry, Arc::new(PolarFileNaming)));
    let optimizer = Arc::new(Mutex::new(Optimizer::new(None, dir.path())));
    targets.set_optimizer(Some(optimizer));

    let (tx, rx) = unbounded();
    let watchdog = Watchdog::start(targets.clone(), tx);

    let deadline = Instant::now() + Duration::from_secs(5);
    let mut state = None;
    while Instant::now() < deadline {
        match rx.recv_timeout(Duration::from_millis(200)) {
            Ok(Notification::OptimizerState(s)) => {
                state = Some(s);
                break;
            }
            _ => continue,
        }
    }
    watchdog.stop();
    assert_eq!(state, Some(OptimizerState::NotReady));
}
