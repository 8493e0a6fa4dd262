//! Core types shared across the BioSim workspace: coordinates, configuration,
//! the occupancy grid, signal layers and the sensor/action catalogue.

pub mod config;
pub mod coord;
pub mod grid;
pub mod io;
pub mod signals;

pub use config::{
    BarrierType, BioSimConfig, Challenge, ConfigError, GenomeComparison, HiddenNeuronUpdate,
};
pub use coord::{Coord, Dir};
pub use grid::{BARRIER, EMPTY, Grid, GridError, visit_neighborhood};
pub use io::{Action, NUM_ACTIONS, NUM_SENSES, SENSOR_MAX, SENSOR_MIN, Sensor};
pub use signals::{SIGNAL_MAX, SIGNAL_MIN, Signals};
