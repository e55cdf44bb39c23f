pub mod ephemeris;
pub mod integrator;
pub mod math;
pub mod orbit;
pub mod rotation;
pub mod scenario;
pub mod simulation;
pub mod tree;

pub use ephemeris::EphemerisProvider;
pub use orbit::Orbit;
pub use rotation::Rotation;
pub use simulation::Simulation;
pub use tree::{Category, Node, NodeId, Rank, StateVector, Tree};

use anyhow::Result;

#[derive(thiserror::Error, Debug)]
pub enum OrreryError {
    #[error("Scenario error: {0}")]
    Scenario(String),
    #[error("Scenario parse error: {0}")]
    Parse(#[from] ron::error::SpannedError),
    #[error("Ephemeris error: {0}")]
    Ephemeris(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type OrreryResult<T> = Result<T, OrreryError>;
