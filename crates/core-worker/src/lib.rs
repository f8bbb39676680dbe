//! Process control for the external aerodynamic worker and optimizer,
//! polar task bundling, and the background watchdog.
//!
//! One [`PolarTask`] owns at most one worker process; tasks register in a
//! per-application [`TaskRegistry`] which the [`Watchdog`] polls. Results
//! travel back to the UI domain as [`Notification`] messages on a
//! crossbeam channel, so the core never holds a UI reference.

pub mod naming;
pub mod optimizer;
pub mod task;
pub mod watchdog;
pub mod worker;

pub use naming::PolarFileNaming;
pub use optimizer::{Optimizer, OptimizerState};
pub use task::{load_or_generate_polars, PolarTask, TaskRegistry};
pub use watchdog::{LoadedPolar, Notification, WatchTargets, Watchdog};
pub use worker::{Worker, WorkerInvocation};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("worker executable not found: {0}")]
    NotReady(String),
    #[error("worker version {found} is older than required {min}")]
    VersionTooOld { found: String, min: String },
    #[error("spawn failed: {0}")]
    SpawnFailed(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
