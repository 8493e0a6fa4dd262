//! The generational lifecycle: step pipeline, selection and reproduction.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use biosim_brain::{GeneticParams, Genome, generate_child};
use biosim_core::{
    Action, BarrierType, BioSimConfig, ConfigError, GenomeComparison, Grid, Signals,
};
use rand::rngs::SmallRng;
use rand::{RngCore, SeedableRng};
use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::SimError;
use crate::actions::{Decision, decide};
use crate::challenge::{apply_end_of_step_hooks, ensure_supported, passed_survival_criterion};
use crate::individual::Individual;
use crate::observer::{
    AgentSnapshot, GenerationSummary, GenomeSample, NullObserver, SimulationObserver,
    WorldSnapshot,
};
use crate::peeps::Peeps;
use crate::sensors::StepContext;

/// Grid, signal field and population for the current generation.
#[derive(Debug, Clone)]
pub struct World {
    pub grid: Grid,
    pub signals: Signals,
    pub peeps: Peeps,
}

impl World {
    /// Build a fresh world: zeroed layers, `barrier` applied, then one agent
    /// per genome at uniformly random empty cells.
    ///
    /// Running out of empty cells is a configuration error: the barrier
    /// layout left too little room for the population.
    pub fn populate(
        config: &BioSimConfig,
        barrier: BarrierType,
        genomes: Vec<Genome>,
        rng: &mut dyn RngCore,
    ) -> Result<Self, SimError> {
        let mut grid = Grid::new(config.size_x, config.size_y)?;
        grid.create_barrier(barrier, rng)?;
        let signals = Signals::new(config.signal_layers, config.size_x, config.size_y)?;

        let mut peeps = Peeps::new();
        for (index, genome) in genomes.into_iter().enumerate() {
            let loc = grid.find_empty_location(rng).ok_or(ConfigError::Invalid(
                "population exceeds the empty cells left by the barrier layout",
            ))?;
            let indiv = Individual::new(index, loc, genome, config, rng);
            grid.set(loc, indiv.grid_value());
            peeps.push(indiv);
        }
        Ok(Self {
            grid,
            signals,
            peeps,
        })
    }
}

/// What happened during one call to [`Simulation::step`].
#[derive(Debug, Clone, PartialEq)]
pub struct StepEvents {
    pub generation: u32,
    /// Step index within the generation that was just executed.
    pub step: u32,
    pub moves: usize,
    pub deaths: usize,
    pub emissions: usize,
    /// Present when this step closed out the generation.
    pub generation_complete: Option<GenerationSummary>,
}

/// Totals reported by [`Simulation::run`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunSummary {
    pub seed: u64,
    pub generations_completed: u32,
    pub reseeds: u32,
    pub stopped_early: bool,
    pub last_generation: Option<GenerationSummary>,
}

/// Cooperative stop flag, polled before every step.
#[derive(Debug, Clone, Default)]
pub struct RunControl {
    stop: Arc<AtomicBool>,
}

impl RunControl {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask the run to stop before its next step.
    pub fn request_stop(&self) {
        self.stop.store(true, Ordering::Relaxed);
    }

    #[must_use]
    pub fn should_stop(&self) -> bool {
        self.stop.load(Ordering::Relaxed)
    }
}

/// A seeded BioSim run.
///
/// Each step ages every live agent, lets all of them decide in parallel
/// against the step-start world, then commits the queued deaths, moves and
/// emissions in agent-index order. Per-agent randomness comes from a stream
/// derived from the run seed, generation, step and agent index, so results
/// do not depend on how rayon schedules the decide phase.
pub struct Simulation {
    config: BioSimConfig,
    params: GeneticParams,
    seed: u64,
    rng: SmallRng,
    world: World,
    generation: u32,
    step: u32,
    deaths_this_generation: usize,
    observer: Box<dyn SimulationObserver>,
}

impl fmt::Debug for Simulation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Simulation")
            .field("seed", &self.seed)
            .field("generation", &self.generation)
            .field("step", &self.step)
            .field("population", &self.world.peeps.len())
            .field("alive", &self.world.peeps.alive_count())
            .finish()
    }
}

impl Simulation {
    /// Start a run with a random generation-zero population.
    pub fn new(config: BioSimConfig) -> Result<Self, SimError> {
        Self::with_observer(config, Box::new(NullObserver))
    }

    /// Start a run with a random generation-zero population, reporting to `observer`.
    pub fn with_observer(
        config: BioSimConfig,
        observer: Box<dyn SimulationObserver>,
    ) -> Result<Self, SimError> {
        Self::check_supported(&config)?;
        let seed = config.resolved_seed();
        let mut rng = SmallRng::seed_from_u64(seed);
        let params = GeneticParams::from(&config);
        let genomes = (0..config.population)
            .map(|_| Genome::random(&params, &mut rng))
            .collect();
        Self::build(config, params, seed, rng, genomes, observer)
    }

    /// Start a run whose generation-zero population carries the given genomes.
    ///
    /// One agent is created per genome; the count must match `population`.
    pub fn with_genomes(config: BioSimConfig, genomes: Vec<Genome>) -> Result<Self, SimError> {
        Self::check_supported(&config)?;
        if genomes.len() != config.population {
            return Err(ConfigError::Invalid("genome count must match population").into());
        }
        if genomes.iter().any(Genome::is_empty) {
            return Err(ConfigError::Invalid("seed genomes must not be empty").into());
        }
        let seed = config.resolved_seed();
        let rng = SmallRng::seed_from_u64(seed);
        let params = GeneticParams::from(&config);
        Self::build(config, params, seed, rng, genomes, Box::new(NullObserver))
    }

    fn check_supported(config: &BioSimConfig) -> Result<(), SimError> {
        config.validate()?;
        ensure_supported(config.challenge)?;
        if config.genome_comparison_method != GenomeComparison::JaroWinkler {
            return Err(SimError::Unsupported("hamming genome comparison"));
        }
        let replaced = config.replace_barrier_type_generation_number.is_some();
        if config.barrier_type == BarrierType::FloatingIslands
            || (replaced && config.replace_barrier_type == BarrierType::FloatingIslands)
        {
            return Err(SimError::Unsupported("floating-islands barrier"));
        }
        Ok(())
    }

    fn build(
        config: BioSimConfig,
        params: GeneticParams,
        seed: u64,
        mut rng: SmallRng,
        genomes: Vec<Genome>,
        observer: Box<dyn SimulationObserver>,
    ) -> Result<Self, SimError> {
        let world = World::populate(&config, config.barrier_type_for(0), genomes, &mut rng)?;
        info!(
            seed,
            width = config.size_x,
            height = config.size_y,
            population = config.population,
            challenge = ?config.challenge,
            "simulation initialised"
        );
        Ok(Self {
            config,
            params,
            seed,
            rng,
            world,
            generation: 0,
            step: 0,
            deaths_this_generation: 0,
            observer,
        })
    }

    fn stage_aging(&mut self) {
        for indiv in self.world.peeps.iter_mut().filter(|indiv| indiv.alive) {
            indiv.age += 1;
        }
    }

    fn stage_decide(&self) -> Result<Vec<Decision>, SimError> {
        let ctx = StepContext {
            grid: &self.world.grid,
            signals: &self.world.signals,
            peeps: &self.world.peeps,
            config: &self.config,
            step: self.step,
        };
        let (seed, generation, step) = (self.seed, self.generation, self.step);
        self.world
            .peeps
            .individuals()
            .par_iter()
            .filter(|indiv| indiv.alive)
            .map(|indiv| {
                let mut rng = agent_rng(seed, generation, step, indiv.index);
                decide(indiv, &ctx, &mut rng)
            })
            .collect()
    }

    fn stage_queue_decisions(&mut self, decisions: Vec<Decision>) {
        let peeps = &mut self.world.peeps;
        for decision in decisions {
            let Some(indiv) = peeps.get_mut(decision.index) else {
                continue;
            };
            indiv.responsiveness = decision.responsiveness;
            indiv.osc_period = decision.osc_period;
            indiv.long_probe_dist = decision.long_probe_dist;
            if let Some(nnet) = decision.nnet {
                indiv.nnet = nnet;
            }
            if let Some(loc) = decision.move_to {
                peeps.queue_for_move(decision.index, loc);
            }
            if let Some(loc) = decision.emit_at {
                peeps.queue_emission(0, loc);
            }
        }
    }

    fn stage_challenge_hooks(&mut self) {
        apply_end_of_step_hooks(
            self.config.challenge,
            self.step,
            &mut self.world.peeps,
            &self.world.grid,
            &self.config,
            &mut self.rng,
        );
    }

    fn stage_commit(&mut self) -> (usize, usize, usize) {
        let world = &mut self.world;
        let deaths = world.peeps.drain_death_queue(&mut world.grid);
        let moves = world.peeps.drain_move_queue(&mut world.grid);
        let emissions = world.peeps.drain_emission_queue(&mut world.signals);
        world.signals.fade_all();
        (deaths, moves, emissions)
    }

    fn stage_observe(&mut self) {
        if self.observer.wants_step_snapshots() {
            let snapshot = self.snapshot();
            self.observer.on_step(&snapshot);
        }
    }

    /// Execute one step, closing the generation when its last step completes.
    pub fn step(&mut self) -> Result<StepEvents, SimError> {
        let generation = self.generation;
        let step = self.step;

        self.stage_aging();
        let decisions = self.stage_decide()?;
        self.stage_queue_decisions(decisions);
        self.stage_challenge_hooks();
        let queued_moves = self.world.peeps.move_queue_len();
        let queued_deaths = self.world.peeps.death_queue_len();
        let (deaths, moves, emissions) = self.stage_commit();
        self.deaths_this_generation += deaths;
        self.step += 1;
        self.stage_observe();

        debug!(
            generation,
            step,
            moves,
            queued_moves,
            deaths,
            queued_deaths,
            emissions,
            "step committed"
        );

        let generation_complete = if self.step >= self.config.steps_per_generation {
            Some(self.end_generation()?)
        } else {
            None
        };
        Ok(StepEvents {
            generation,
            step,
            moves,
            deaths,
            emissions,
            generation_complete,
        })
    }

    /// Run the remaining steps of the current generation and return its summary.
    pub fn run_generation(&mut self) -> Result<GenerationSummary, SimError> {
        loop {
            if let Some(summary) = self.step()?.generation_complete {
                return Ok(summary);
            }
        }
    }

    /// Step until `max_generations` generations have completed or `control` asks to stop.
    pub fn run(&mut self, control: &RunControl) -> Result<RunSummary, SimError> {
        let mut summary = RunSummary {
            seed: self.seed,
            generations_completed: 0,
            reseeds: 0,
            stopped_early: false,
            last_generation: None,
        };
        while self.generation < self.config.max_generations {
            if control.should_stop() {
                summary.stopped_early = true;
                info!(
                    generation = self.generation,
                    step = self.step,
                    "run stopped on request"
                );
                break;
            }
            let Some(generation) = self.step()?.generation_complete else {
                continue;
            };
            summary.generations_completed += 1;
            if generation.reseeded {
                summary.reseeds += 1;
            }
            summary.last_generation = Some(generation);
        }
        Ok(summary)
    }

    /// Score the finished generation, breed the next one and rebuild the world.
    fn end_generation(&mut self) -> Result<GenerationSummary, SimError> {
        let challenge = self.config.challenge;
        let peeps = &self.world.peeps;

        let mut survivors: Vec<(f32, &Genome)> = Vec::new();
        for indiv in peeps.iter() {
            let outcome = passed_survival_criterion(indiv, challenge, &self.world.grid)?;
            if outcome.passed && !indiv.nnet.connections().is_empty() {
                survivors.push((outcome.score, &indiv.genome));
            }
        }
        survivors.sort_by(|a, b| a.0.total_cmp(&b.0));

        let population = peeps.len();
        let total_genes: usize = peeps.iter().map(|indiv| indiv.genome.len()).sum();
        let average_genome_length = if population > 0 {
            total_genes as f32 / population as f32
        } else {
            0.0
        };
        let average_score = if survivors.is_empty() {
            0.0
        } else {
            survivors.iter().map(|(score, _)| score).sum::<f32>() / survivors.len() as f32
        };
        let parents: Vec<Genome> = survivors.iter().map(|(_, genome)| (*genome).clone()).collect();

        let reseeded = parents.is_empty();
        let (genomes, barrier) = if reseeded {
            warn!(generation = self.generation, "no survivors, reseeding population");
            let genomes = (0..self.config.population)
                .map(|_| Genome::random(&self.params, &mut self.rng))
                .collect::<Vec<_>>();
            (genomes, self.config.barrier_type_for(0))
        } else {
            let genomes = (0..self.config.population)
                .map(|_| generate_child(&parents, &self.params, &mut self.rng))
                .collect::<Result<Vec<_>, _>>()?;
            (genomes, self.config.barrier_type_for(self.generation + 1))
        };

        let summary = GenerationSummary {
            generation: self.generation,
            population,
            survivors: parents.len(),
            deaths: self.deaths_this_generation,
            reseeded,
            average_genome_length,
            average_score,
        };
        info!(
            generation = summary.generation,
            survivors = summary.survivors,
            population = summary.population,
            deaths = summary.deaths,
            average_score = summary.average_score,
            "generation complete"
        );
        self.observer.on_generation(&summary);

        self.world = World::populate(&self.config, barrier, genomes, &mut self.rng)?;
        if !reseeded && self.generation.is_multiple_of(self.config.genome_analysis_stride) {
            let samples = self.sample_genomes(self.config.display_sample_genomes);
            if !samples.is_empty() {
                self.observer.on_sample_genomes(summary.generation, &samples);
            }
        }
        self.generation += 1;
        self.step = 0;
        self.deaths_this_generation = 0;
        Ok(summary)
    }

    /// Genomes and driven actions of the first `count` live agents.
    #[must_use]
    pub fn sample_genomes(&self, count: usize) -> Vec<GenomeSample> {
        self.world
            .peeps
            .iter()
            .filter(|indiv| indiv.alive)
            .take(count)
            .map(|indiv| GenomeSample {
                index: indiv.index,
                genome_length: indiv.genome.len(),
                genome_hex: indiv.genome.hex_dump(8),
                connections: indiv.nnet.connections().len(),
                actions: indiv.nnet.driven_actions().map(Action::name).collect(),
            })
            .collect()
    }

    /// Copy of the current agent states.
    #[must_use]
    pub fn snapshot(&self) -> WorldSnapshot {
        WorldSnapshot {
            generation: self.generation,
            step: self.step,
            agents: self
                .world
                .peeps
                .iter()
                .map(|indiv| AgentSnapshot {
                    index: indiv.index,
                    loc: indiv.loc,
                    alive: indiv.alive,
                    genome_length: indiv.genome.len(),
                    genome_hex: indiv.genome.hex_dump(usize::MAX),
                })
                .collect(),
        }
    }

    #[must_use]
    pub fn config(&self) -> &BioSimConfig {
        &self.config
    }

    /// Seed the run was started from.
    #[must_use]
    pub const fn seed(&self) -> u64 {
        self.seed
    }

    #[must_use]
    pub const fn generation(&self) -> u32 {
        self.generation
    }

    /// Steps already executed in the current generation.
    #[must_use]
    pub const fn step_index(&self) -> u32 {
        self.step
    }

    #[must_use]
    pub fn world(&self) -> &World {
        &self.world
    }

    #[must_use]
    pub fn peeps(&self) -> &Peeps {
        &self.world.peeps
    }

    /// Replace the observer receiving step and generation events.
    pub fn set_observer(&mut self, observer: Box<dyn SimulationObserver>) {
        self.observer = observer;
    }
}

fn splitmix64(state: u64) -> u64 {
    let mut z = state.wrapping_add(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

/// Independent random stream for one agent's decision in one step.
fn agent_rng(seed: u64, generation: u32, step: u32, index: usize) -> SmallRng {
    let mixed = [u64::from(generation), u64::from(step), index as u64]
        .into_iter()
        .fold(splitmix64(seed), |acc, part| splitmix64(acc ^ part));
    SmallRng::seed_from_u64(mixed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use biosim_core::{Challenge, Coord, EMPTY};

    fn small_config() -> BioSimConfig {
        BioSimConfig {
            size_x: 12,
            size_y: 12,
            population: 6,
            steps_per_generation: 5,
            max_generations: 3,
            genome_initial_length_min: 4,
            genome_initial_length_max: 6,
            genome_max_length: 8,
            rng_seed: Some(11),
            ..BioSimConfig::default()
        }
    }

    #[test]
    fn agent_streams_differ_by_index_and_step() {
        let mut a = agent_rng(1, 0, 0, 0);
        let mut b = agent_rng(1, 0, 0, 1);
        let mut c = agent_rng(1, 0, 1, 0);
        let mut again = agent_rng(1, 0, 0, 0);
        let first = a.next_u64();
        assert_ne!(first, b.next_u64());
        assert_ne!(first, c.next_u64());
        assert_eq!(first, again.next_u64());
    }

    #[test]
    fn initial_world_places_every_agent_once() {
        let sim = Simulation::new(small_config()).expect("sim");
        let world = sim.world();
        assert_eq!(world.peeps.len(), 6);
        for indiv in world.peeps.iter() {
            assert_eq!(world.grid.occupant_at(indiv.loc), Some(indiv.index));
            assert_eq!(indiv.birth_loc, indiv.loc);
        }
        let occupied = world.grid.iter().filter(|(loc, _)| world.grid.is_occupied_at(*loc)).count();
        assert_eq!(occupied, 6);
    }

    #[test]
    fn step_advances_counters_and_ages_agents() {
        let mut sim = Simulation::new(small_config()).expect("sim");
        let events = sim.step().expect("step");
        assert_eq!(events.step, 0);
        assert_eq!(events.generation, 0);
        assert!(events.generation_complete.is_none());
        assert_eq!(sim.step_index(), 1);
        assert!(sim.peeps().iter().all(|indiv| indiv.age == 1));
    }

    #[test]
    fn generation_rollover_rebuilds_population() {
        let mut sim = Simulation::new(small_config()).expect("sim");
        let summary = sim.run_generation().expect("generation");
        assert_eq!(summary.generation, 0);
        assert_eq!(summary.population, 6);
        assert_eq!(sim.generation(), 1);
        assert_eq!(sim.step_index(), 0);
        assert_eq!(sim.peeps().len(), 6);
        assert!(sim.peeps().iter().all(|indiv| indiv.alive && indiv.age == 0));
    }

    #[test]
    fn snapshot_mirrors_agents() {
        let sim = Simulation::new(small_config()).expect("sim");
        let snapshot = sim.snapshot();
        assert_eq!(snapshot.agents.len(), 6);
        assert_eq!(snapshot.alive_count(), 6);
        let first: Coord = snapshot.agents[0].loc;
        assert_eq!(sim.peeps().get(0).map(|indiv| indiv.loc), Some(first));
    }

    #[test]
    fn unsupported_features_fail_at_construction() {
        let config = BioSimConfig {
            challenge: Challenge::AltruismSacrifice,
            ..small_config()
        };
        assert!(Simulation::new(config).expect_err("altruism").is_unsupported());

        let config = BioSimConfig {
            genome_comparison_method: GenomeComparison::HammingBits,
            ..small_config()
        };
        assert!(Simulation::new(config).expect_err("hamming").is_unsupported());

        let config = BioSimConfig {
            replace_barrier_type: BarrierType::FloatingIslands,
            replace_barrier_type_generation_number: Some(2),
            ..small_config()
        };
        assert!(Simulation::new(config).expect_err("islands").is_unsupported());
    }

    #[test]
    fn crowded_barrier_layout_is_a_config_error() {
        // The 10x10 vertical bar covers 12 cells, leaving 88 free.
        let config = BioSimConfig {
            size_x: 10,
            size_y: 10,
            population: 95,
            barrier_type: BarrierType::VerticalBarConstant,
            ..small_config()
        };
        let err = Simulation::new(config).expect_err("too crowded");
        assert!(matches!(err, SimError::Config(ConfigError::Invalid(_))));
        assert!(!err.is_contract());
        assert!(!err.is_unsupported());

        let fits = BioSimConfig {
            size_x: 10,
            size_y: 10,
            population: 88,
            barrier_type: BarrierType::VerticalBarConstant,
            ..small_config()
        };
        let sim = Simulation::new(fits).expect("exactly full");
        assert_eq!(sim.world().grid.iter().filter(|(_, cell)| *cell == EMPTY).count(), 0);
    }

    #[test]
    fn run_honours_stop_request() {
        let mut sim = Simulation::new(small_config()).expect("sim");
        let control = RunControl::new();
        control.request_stop();
        let summary = sim.run(&control).expect("run");
        assert!(summary.stopped_early);
        assert_eq!(summary.generations_completed, 0);
        assert_eq!(sim.generation(), 0);
    }

    struct StopAfter {
        control: RunControl,
        remaining: u32,
    }

    impl SimulationObserver for StopAfter {
        fn wants_step_snapshots(&self) -> bool {
            true
        }

        fn on_step(&mut self, _snapshot: &WorldSnapshot) {
            self.remaining = self.remaining.saturating_sub(1);
            if self.remaining == 0 {
                self.control.request_stop();
            }
        }
    }

    #[test]
    fn stop_request_lands_between_steps() {
        let control = RunControl::new();
        let observer = StopAfter {
            control: control.clone(),
            remaining: 2,
        };
        let mut sim = Simulation::with_observer(small_config(), Box::new(observer)).expect("sim");
        let summary = sim.run(&control).expect("run");
        assert!(summary.stopped_early);
        assert_eq!(summary.generations_completed, 0);
        assert_eq!(sim.generation(), 0);
        assert_eq!(sim.step_index(), 2);
    }

    #[test]
    fn run_stops_at_max_generations() {
        let mut sim = Simulation::new(small_config()).expect("sim");
        let summary = sim.run(&RunControl::new()).expect("run");
        assert_eq!(summary.generations_completed, 3);
        assert!(!summary.stopped_early);
        assert_eq!(sim.generation(), 3);
        assert_eq!(summary.seed, 11);
    }
}
