use biosim_brain::{Genome, NetLimits, NeuralNet, compile};
use biosim_core::{BioSimConfig, Coord, Dir};
use rand::RngCore;

/// Oscillator period every agent is born with.
pub const INITIAL_OSC_PERIOD: u32 = 34;

/// One agent: its genome, compiled brain and behavioural state.
#[derive(Debug, Clone)]
pub struct Individual {
    pub index: usize,
    pub loc: Coord,
    pub birth_loc: Coord,
    pub alive: bool,
    /// Steps lived in the current generation.
    pub age: u32,
    pub genome: Genome,
    pub nnet: NeuralNet,
    pub responsiveness: f32,
    pub osc_period: u32,
    pub long_probe_dist: u32,
    pub last_move_dir: Dir,
    /// Challenge-specific progress flags.
    pub challenge_bits: u32,
}

impl Individual {
    /// Create a newborn at `loc`, compiling its genome into a brain.
    pub fn new(
        index: usize,
        loc: Coord,
        genome: Genome,
        config: &BioSimConfig,
        rng: &mut dyn RngCore,
    ) -> Self {
        let nnet = compile(&genome, NetLimits::from(config));
        Self {
            index,
            loc,
            birth_loc: loc,
            alive: true,
            age: 0,
            genome,
            nnet,
            responsiveness: config.responsiveness,
            osc_period: INITIAL_OSC_PERIOD,
            long_probe_dist: config.long_probe_distance,
            last_move_dir: Dir::random8(rng),
            challenge_bits: 0,
        }
    }

    /// Grid cell value marking this agent's position.
    #[must_use]
    pub fn grid_value(&self) -> u16 {
        (self.index + 1) as u16
    }
}
