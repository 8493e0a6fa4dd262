//! Static run parameters and the enumerations they select between.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised when validating a [`BioSimConfig`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Indicates an invalid configuration value.
    #[error("invalid configuration: {0}")]
    Invalid(&'static str),
}

/// Survival rule applied at the end of every generation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum Challenge {
    #[default]
    Circle,
    RightHalf,
    RightQuarter,
    LeftEighth,
    String,
    CenterWeighted,
    CenterUnweighted,
    CenterSparse,
    Corner,
    CornerWeighted,
    MigrateDistance,
    RadioactiveWalls,
    AgainstAnyWall,
    TouchAnyWall,
    EastWestEighths,
    NearBarrier,
    Pairs,
    LocationSequence,
    Altruism,
    AltruismSacrifice,
}

/// Static obstacle layout written into the grid at generation start.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum BarrierType {
    #[default]
    None,
    VerticalBarConstant,
    VerticalBarRandom,
    FiveBlocksStaggered,
    HorizontalBarConstant,
    FloatingIslands,
    Spots,
}

/// Method used by the forward genetic-similarity sensor.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum GenomeComparison {
    #[default]
    JaroWinkler,
    HammingBits,
    HammingBytes,
}

/// How driven hidden neurons carry state from one step to the next.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum HiddenNeuronUpdate {
    /// Hidden outputs are never rewritten; the accumulator is reseeded from
    /// the stored output whenever the sink switches to actions.
    #[default]
    Snapshot,
    /// `tanh(accumulator)` is committed to each driven neuron at that boundary.
    Tanh,
}

/// Static configuration for a BioSim run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct BioSimConfig {
    /// Grid width in cells.
    pub size_x: u32,
    /// Grid height in cells.
    pub size_y: u32,
    /// Number of agents spawned each generation.
    pub population: usize,
    pub steps_per_generation: u32,
    pub max_generations: u32,
    /// Number of signal layers allocated per generation.
    pub signal_layers: usize,
    pub genome_initial_length_min: usize,
    pub genome_initial_length_max: usize,
    pub genome_max_length: usize,
    /// Hidden neuron capacity used when range-reducing gene indices.
    pub max_number_neurons: usize,
    pub point_mutation_rate: f32,
    pub gene_insertion_deletion_rate: f32,
    /// Fraction of insertion/deletion events that delete.
    pub deletion_ratio: f32,
    pub sexual_reproduction: bool,
    pub choose_parents_by_fitness: bool,
    pub population_sensor_radius: f32,
    pub signal_sensor_radius: f32,
    /// Initial responsiveness of every newborn agent.
    pub responsiveness: f32,
    pub responsiveness_curve_k_factor: u32,
    /// Initial long-probe distance in cells.
    pub long_probe_distance: u32,
    pub short_probe_barrier_distance: u32,
    pub genome_comparison_method: GenomeComparison,
    pub challenge: Challenge,
    pub barrier_type: BarrierType,
    pub replace_barrier_type: BarrierType,
    /// Generation from which `replace_barrier_type` is used; `None` disables it.
    pub replace_barrier_type_generation_number: Option<u32>,
    pub hidden_neuron_update: HiddenNeuronUpdate,
    /// Report sample genomes after every generation whose index is a multiple of this.
    pub genome_analysis_stride: u32,
    /// How many genomes of the new population to report; zero disables reporting.
    pub display_sample_genomes: usize,
    /// Optional seed for deterministic runs.
    pub rng_seed: Option<u64>,
}

impl Default for BioSimConfig {
    fn default() -> Self {
        Self {
            size_x: 128,
            size_y: 128,
            population: 100,
            steps_per_generation: 100,
            max_generations: 100,
            signal_layers: 1,
            genome_initial_length_min: 16,
            genome_initial_length_max: 16,
            genome_max_length: 20,
            max_number_neurons: 10,
            point_mutation_rate: 0.0001,
            gene_insertion_deletion_rate: 0.0001,
            deletion_ratio: 0.7,
            sexual_reproduction: true,
            choose_parents_by_fitness: true,
            population_sensor_radius: 2.0,
            signal_sensor_radius: 1.0,
            responsiveness: 0.5,
            responsiveness_curve_k_factor: 2,
            long_probe_distance: 16,
            short_probe_barrier_distance: 3,
            genome_comparison_method: GenomeComparison::JaroWinkler,
            challenge: Challenge::Circle,
            barrier_type: BarrierType::None,
            replace_barrier_type: BarrierType::None,
            replace_barrier_type_generation_number: None,
            hidden_neuron_update: HiddenNeuronUpdate::Snapshot,
            genome_analysis_stride: 1,
            display_sample_genomes: 0,
            rng_seed: None,
        }
    }
}

impl BioSimConfig {
    /// Check every parameter against the ranges the simulation relies on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.size_x < 2 || self.size_y < 2 {
            return Err(ConfigError::Invalid("grid dimensions must be at least 2x2"));
        }
        if self.size_x > u32::from(u16::MAX) || self.size_y > u32::from(u16::MAX) {
            return Err(ConfigError::Invalid("grid dimensions must fit in 16 bits"));
        }
        if self.population == 0 {
            return Err(ConfigError::Invalid("population must be non-zero"));
        }
        // Cell values 1..=0xFFFE encode occupants; 0xFFFF is reserved for barriers.
        if self.population > usize::from(u16::MAX - 1) {
            return Err(ConfigError::Invalid("population must not exceed 65534"));
        }
        if self.population as u64 >= u64::from(self.size_x) * u64::from(self.size_y) {
            return Err(ConfigError::Invalid(
                "population must be smaller than the number of grid cells",
            ));
        }
        if self.steps_per_generation == 0 {
            return Err(ConfigError::Invalid("steps_per_generation must be non-zero"));
        }
        if self.signal_layers == 0 {
            return Err(ConfigError::Invalid("at least one signal layer is required"));
        }
        if self.genome_initial_length_min == 0
            || self.genome_initial_length_min > self.genome_initial_length_max
        {
            return Err(ConfigError::Invalid(
                "initial genome length range must be non-empty and start above zero",
            ));
        }
        if self.genome_initial_length_max > self.genome_max_length {
            return Err(ConfigError::Invalid(
                "genome_initial_length_max cannot exceed genome_max_length",
            ));
        }
        if self.max_number_neurons == 0 {
            return Err(ConfigError::Invalid("max_number_neurons must be non-zero"));
        }
        let rates = [
            self.point_mutation_rate,
            self.gene_insertion_deletion_rate,
            self.deletion_ratio,
            self.responsiveness,
        ];
        if rates.iter().any(|rate| !(0.0..=1.0).contains(rate)) {
            return Err(ConfigError::Invalid(
                "mutation rates, deletion_ratio and responsiveness must lie in [0, 1]",
            ));
        }
        if self.population_sensor_radius <= 0.0 || self.signal_sensor_radius <= 0.0 {
            return Err(ConfigError::Invalid("sensor radii must be positive"));
        }
        if !(1..=8).contains(&self.responsiveness_curve_k_factor) {
            return Err(ConfigError::Invalid(
                "responsiveness_curve_k_factor must be in 1..=8",
            ));
        }
        if self.long_probe_distance == 0 || self.short_probe_barrier_distance == 0 {
            return Err(ConfigError::Invalid("probe distances must be non-zero"));
        }
        if self.genome_analysis_stride == 0 {
            return Err(ConfigError::Invalid("genome_analysis_stride must be non-zero"));
        }
        Ok(())
    }

    /// Barrier layout that applies to the given generation.
    #[must_use]
    pub fn barrier_type_for(&self, generation: u32) -> BarrierType {
        match self.replace_barrier_type_generation_number {
            Some(from) if generation >= from => self.replace_barrier_type,
            _ => self.barrier_type,
        }
    }

    /// Returns the configured RNG seed, generating one from entropy if absent.
    #[must_use]
    pub fn resolved_seed(&self) -> u64 {
        match self.rng_seed {
            Some(seed) => seed,
            None => rand::random(),
        }
    }
}
