//! Sensory-motor execution, deferred world commits and the generational
//! lifecycle of a BioSim run.

pub mod actions;
pub mod challenge;
pub mod individual;
pub mod observer;
pub mod peeps;
pub mod sensors;
pub mod simulation;

use biosim_brain::GenomeError;
use biosim_core::{ConfigError, GridError};
use thiserror::Error;

pub use actions::{Decision, decide, execute_actions, response_curve};
pub use challenge::{
    SurvivalOutcome, apply_end_of_step_hooks, ensure_supported, passed_survival_criterion,
};
pub use individual::Individual;
pub use observer::{
    AgentSnapshot, GenerationSummary, GenomeSample, NullObserver, SimulationObserver,
    WorldSnapshot,
};
pub use peeps::Peeps;
pub use sensors::{StepContext, get_sensor};
pub use simulation::{RunControl, RunSummary, Simulation, StepEvents, World};

/// Errors surfaced while running a simulation.
#[derive(Debug, Error)]
pub enum SimError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Genome(#[from] GenomeError),
    /// Internal state broke an invariant the simulation depends on.
    #[error("contract violation: {0}")]
    Contract(String),
    /// A configured feature exists in the catalogue but has no implementation.
    #[error("{0} is not supported")]
    Unsupported(&'static str),
}

impl SimError {
    /// The failure names a feature that is not available, rather than corrupt state.
    #[must_use]
    pub fn is_unsupported(&self) -> bool {
        match self {
            SimError::Unsupported(_) => true,
            SimError::Genome(err) => err.is_unsupported(),
            _ => false,
        }
    }

    /// The failure indicates an internal invariant was broken.
    #[must_use]
    pub fn is_contract(&self) -> bool {
        match self {
            SimError::Contract(_) => true,
            SimError::Genome(err) => !err.is_unsupported(),
            _ => false,
        }
    }
}

impl From<GridError> for SimError {
    fn from(err: GridError) -> Self {
        match err {
            GridError::InvalidDimensions => {
                SimError::Config(ConfigError::Invalid("grid dimensions are out of range"))
            }
            GridError::UnsupportedBarrier(_) => SimError::Unsupported("floating-islands barrier"),
        }
    }
}
