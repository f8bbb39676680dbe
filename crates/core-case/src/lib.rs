//! Editing sessions: Direct-Design (versioned designs of an airfoil),
//! As-Bezier (direct design on a Bézier conversion of the seed) and
//! Optimize (input file plus optimizer controller and results).

pub mod case;
pub mod input_file;

pub use case::{AsBezierCase, DirectDesignCase, OptimizeCase};
pub use input_file::{Entry, InputFile, Namelist, KNOWN_GROUPS};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CaseError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Airfoil(#[from] core_airfoil::AirfoilError),
    #[error(transparent)]
    Geometry(#[from] core_geom::GeometryError),
    #[error(transparent)]
    Worker(#[from] core_worker::WorkerError),
    #[error("input file rejected in namelist '{namelist}': {reason}")]
    ParseError { namelist: String, reason: String },
    #[error("case has no usable seed airfoil: {0}")]
    NoSeed(String),
}
