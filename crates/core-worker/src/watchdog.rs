//! Background observer: polls the polar tasks and the optimizer at a
//! fixed cadence and reports changes over a channel.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use core_polar::set::PolarPathResolver;
use core_polar::Polar;
use crossbeam_channel::Sender;
use tracing::{debug, info, warn};

use crate::optimizer::{Optimizer, OptimizerState};
use crate::task::TaskRegistry;

/// Initial wait before the polling begins.
const WARMUP: Duration = Duration::from_millis(1000);
/// Polling cadence.
const TICK: Duration = Duration::from_millis(500);
/// Granularity of interruptible sleeps.
const SLEEP_SLICE: Duration = Duration::from_millis(50);
/// Join patience on stop.
const JOIN_TIMEOUT: Duration = Duration::from_secs(2);

/// A polar that finished generation, addressed to its airfoil.
#[derive(Debug, Clone)]
pub struct LoadedPolar {
    pub airfoil_name: String,
    pub polar: Polar,
}

/// Change notifications emitted by the watchdog.
///
/// Polars arrive in task registration order per tick, but across ticks
/// the completion order of the workers decides; consumers must not assume
/// any ordering.
#[derive(Debug, Clone)]
pub enum Notification {
    /// Loop heartbeat, one per polling cycle (also the test hook for
    /// liveness checks).
    Tick,
    /// New polars were harvested this tick.
    NewPolars(Vec<LoadedPolar>),
    /// The optimizer state changed.
    OptimizerState(OptimizerState),
    /// The optimizer finished another step batch.
    OptimizerNewStep(usize),
    /// The optimizer wrote a new design.
    OptimizerNewDesign(usize),
    /// Still running, nothing changed; the UI updates elapsed time.
    OptimizerStillRunning,
}

/// Everything the watchdog polls; shared with the owning model.
pub struct WatchTargets {
    pub registry: Arc<TaskRegistry>,
    pub resolver: Arc<dyn PolarPathResolver + Send + Sync>,
    pub optimizer: Mutex<Option<Arc<Mutex<Optimizer>>>>,
}

impl WatchTargets {
    pub fn new(
        registry: Arc<TaskRegistry>,
        resolver: Arc<dyn PolarPathResolver + Send + Sync>,
    ) -> Self {
        Self {
            registry,
            resolver,
            optimizer: Mutex::new(None),
        }
    }

    /// Watch (or stop watching) an optimizer instance.
    pub fn set_optimizer(&self, optimizer: Option<Arc<Mutex<Optimizer>>>) {
        if let Ok(mut slot) = self.optimizer.lock() {
            *slot = optimizer;
        }
    }
}

/// The background observer thread.
pub struct Watchdog {
    handle: Option<JoinHandle<()>>,
    interrupt: Arc<AtomicBool>,
}

impl Watchdog {
    /// Start the observer. Notifications go to `tx`; a closed receiver
    /// ends the loop.
    pub fn start(targets: Arc<WatchTargets>, tx: Sender<Notification>) -> Self {
        let interrupt = Arc::new(AtomicBool::new(false));
        let flag = interrupt.clone();
        let handle = std::thread::Builder::new()
            .name("watchdog".to_string())
            .spawn(move || run_loop(targets, tx, flag))
            .ok();
        if handle.is_none() {
            warn!("watchdog thread could not be spawned");
        }
        Self { handle, interrupt }
    }

    pub fn request_interruption(&self) {
        self.interrupt.store(true, Ordering::Relaxed);
    }

    /// Interrupt and join with a bounded wait; a stuck thread is left
    /// detached with a warning.
    pub fn stop(mut self) {
        self.request_interruption();
        let Some(handle) = self.handle.take() else {
            return;
        };
        let deadline = Instant::now() + JOIN_TIMEOUT;
        while !handle.is_finished() && Instant::now() < deadline {
            std::thread::sleep(SLEEP_SLICE);
        }
        if handle.is_finished() {
            let _ = handle.join();
            info!("watchdog stopped");
        } else {
            warn!("watchdog did not stop within {JOIN_TIMEOUT:?}, detaching");
        }
    }
}

fn run_loop(targets: Arc<WatchTargets>, tx: Sender<Notification>, interrupt: Arc<AtomicBool>) {
    info!("starting watchdog thread");
    if !sleep_interruptible(WARMUP, &interrupt) {
        return;
    }

    let mut optimizer_watch = OptimizerWatch::default();

    while !interrupt.load(Ordering::Relaxed) {
        if tx.send(Notification::Tick).is_err() {
            break; // receiver gone, nothing left to notify
        }

        // optimizer state, steps, designs
        let optimizer = targets.optimizer.lock().ok().and_then(|o| o.clone());
        if let Some(optimizer) = optimizer {
            optimizer_watch.check(&optimizer, &tx);
        } else {
            optimizer_watch.reset();
        }

        // polar task harvest
        let mut loaded: Vec<LoadedPolar> = Vec::new();
        for handle in targets.registry.active_tasks() {
            let Ok(mut task) = handle.lock() else {
                continue;
            };
            let n_new = task.load_polars(targets.resolver.as_ref());
            if n_new > 0 {
                debug!(airfoil = %task.airfoil_name(), n_new, "polars harvested");
            }
            loaded.extend(task.take_loaded().into_iter().map(|polar| LoadedPolar {
                airfoil_name: task.airfoil_name().to_string(),
                polar,
            }));
            if task.is_completed() {
                task.finalize();
            }
            // note: completion order across tasks is not serialized here;
            // polars may appear in any order (see Notification docs)
        }
        if !loaded.is_empty() && tx.send(Notification::NewPolars(loaded)).is_err() {
            break;
        }

        if !sleep_interruptible(TICK, &interrupt) {
            break;
        }
    }
    debug!("watchdog loop ended");
}

/// Change detection of the watched optimizer, mirroring what the UI needs:
/// state transitions, new steps, new designs, and a heartbeat.
#[derive(Default)]
struct OptimizerWatch {
    instance: Option<usize>,
    state: Option<OptimizerState>,
    n_steps: usize,
    n_designs: usize,
}

impl OptimizerWatch {
    fn reset(&mut self) {
        *self = OptimizerWatch::default();
    }

    fn check(&mut self, optimizer: &Arc<Mutex<Optimizer>>, tx: &Sender<Notification>) {
        let id = Arc::as_ptr(optimizer) as usize;
        let Ok(mut opt) = optimizer.lock() else {
            return;
        };

        // a fresh instance resets the change detection
        if self.instance != Some(id) {
            self.instance = Some(id);
            self.state = Some(opt.state());
            let progress = opt.get_progress();
            self.n_steps = progress.n_steps;
            self.n_designs = progress.n_designs;
            let _ = tx.send(Notification::OptimizerState(opt.state()));
            return;
        }

        let state = opt.state();
        let progress = opt.get_progress();

        if Some(state) != self.state {
            self.state = Some(state);
            let _ = tx.send(Notification::OptimizerState(state));
        } else if progress.n_steps != self.n_steps {
            self.n_steps = progress.n_steps;
            self.n_designs = progress.n_designs;
            let _ = tx.send(Notification::OptimizerNewStep(progress.n_steps));
        } else if progress.n_designs != self.n_designs {
            self.n_designs = progress.n_designs;
            let _ = tx.send(Notification::OptimizerNewDesign(progress.n_designs));
        } else if state == OptimizerState::Running {
            let _ = tx.send(Notification::OptimizerStillRunning);
        }
    }
}

/// Sleep in small slices; `false` when interrupted.
fn sleep_interruptible(total: Duration, interrupt: &AtomicBool) -> bool {
    let deadline = Instant::now() + total;
    loop {
        if interrupt.load(Ordering::Relaxed) {
            return false;
        }
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return true;
        }
        std::thread::sleep(SLEEP_SLICE.min(remaining));
    }
}
