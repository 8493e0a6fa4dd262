//! Hooks for watching a running simulation without touching its state.

use biosim_core::Coord;
use serde::Serialize;

/// Per-agent view captured at the end of a step.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AgentSnapshot {
    pub index: usize,
    pub loc: Coord,
    pub alive: bool,
    pub genome_length: usize,
    /// Space-separated gene hex strings.
    pub genome_hex: String,
}

/// Read-only view of the world after a completed step.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorldSnapshot {
    pub generation: u32,
    pub step: u32,
    pub agents: Vec<AgentSnapshot>,
}

impl WorldSnapshot {
    #[must_use]
    pub fn alive_count(&self) -> usize {
        self.agents.iter().filter(|agent| agent.alive).count()
    }
}

/// Statistics for one finished generation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenerationSummary {
    pub generation: u32,
    pub population: usize,
    pub survivors: usize,
    /// Agents removed by the death queue during the generation.
    pub deaths: usize,
    /// True when nobody survived and the next generation was seeded randomly.
    pub reseeded: bool,
    pub average_genome_length: f32,
    /// Mean score across survivors, zero when there were none.
    pub average_score: f32,
}

/// One agent of a freshly bred population, reported for genome analysis.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenomeSample {
    pub index: usize,
    pub genome_length: usize,
    /// Gene hex strings, eight per line.
    pub genome_hex: String,
    pub connections: usize,
    /// Actions the compiled brain drives, in connection order.
    pub actions: Vec<&'static str>,
}

/// Receives step and generation events from [`crate::Simulation`].
///
/// Observers only ever see copies; they cannot influence the run.
pub trait SimulationObserver: Send {
    /// Return true to receive a [`WorldSnapshot`] after every step.
    fn wants_step_snapshots(&self) -> bool {
        false
    }

    fn on_step(&mut self, _snapshot: &WorldSnapshot) {}

    fn on_generation(&mut self, _summary: &GenerationSummary) {}

    /// Called with the first live agents of the population bred from
    /// `generation`, every `genome_analysis_stride` generations.
    fn on_sample_genomes(&mut self, _generation: u32, _samples: &[GenomeSample]) {}
}

/// Observer that ignores everything.
#[derive(Debug, Default)]
pub struct NullObserver;

impl SimulationObserver for NullObserver {}
