//! Genetic encoding, genetic operators and the genome-to-network compiler.

pub mod compiler;
pub mod gene;
pub mod genome;
pub mod net;
pub mod similarity;

use thiserror::Error;

pub use compiler::{CompileNode, NetLimits, compile};
pub use gene::{Gene, SinkKind, SourceKind};
pub use genome::{GeneticParams, Genome, generate_child};
pub use net::{INITIAL_NEURON_OUTPUT, NeuralNet, Neuron};
pub use similarity::{genome_similarity, jaro_winkler};

/// Errors raised by genetic operators.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GenomeError {
    /// A genome with no genes reached an operator that requires at least one.
    #[error("genome is empty")]
    EmptyGenome,
    /// Reproduction was requested from an empty parent pool.
    #[error("no parent genomes to reproduce from")]
    NoParents,
    /// The requested capability is not implemented.
    #[error("{0} is not supported")]
    Unsupported(&'static str),
}

impl GenomeError {
    #[must_use]
    pub const fn is_unsupported(&self) -> bool {
        matches!(self, GenomeError::Unsupported(_))
    }
}
