//! Sensor inputs and action outputs available to compiled brains.

use serde::{Deserialize, Serialize};

/// Sensor values are normalized into this range before reaching the brain.
pub const SENSOR_MIN: f32 = 0.0;
pub const SENSOR_MAX: f32 = 1.0;

/// Number of active sensors.
pub const NUM_SENSES: usize = 21;
/// Number of active actions.
pub const NUM_ACTIONS: usize = 17;

/// Inputs an agent can read each step.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum Sensor {
    /// Normalized distance from the left edge.
    LocX = 0,
    /// Normalized distance from the bottom edge.
    LocY,
    BoundaryDistX,
    BoundaryDist,
    BoundaryDistY,
    GeneticSimFwd,
    LastMoveDirX,
    LastMoveDirY,
    LongProbePopFwd,
    LongProbeBarFwd,
    Population,
    PopulationFwd,
    PopulationLr,
    Osc1,
    Age,
    BarrierFwd,
    BarrierLr,
    Random,
    Signal0,
    Signal0Fwd,
    Signal0Lr,
}

impl Sensor {
    pub const ALL: [Sensor; NUM_SENSES] = [
        Sensor::LocX,
        Sensor::LocY,
        Sensor::BoundaryDistX,
        Sensor::BoundaryDist,
        Sensor::BoundaryDistY,
        Sensor::GeneticSimFwd,
        Sensor::LastMoveDirX,
        Sensor::LastMoveDirY,
        Sensor::LongProbePopFwd,
        Sensor::LongProbeBarFwd,
        Sensor::Population,
        Sensor::PopulationFwd,
        Sensor::PopulationLr,
        Sensor::Osc1,
        Sensor::Age,
        Sensor::BarrierFwd,
        Sensor::BarrierLr,
        Sensor::Random,
        Sensor::Signal0,
        Sensor::Signal0Fwd,
        Sensor::Signal0Lr,
    ];

    #[must_use]
    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Diagnostic name in the conventional upper-case form.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Sensor::LocX => "LOC_X",
            Sensor::LocY => "LOC_Y",
            Sensor::BoundaryDistX => "BOUNDARY_DIST_X",
            Sensor::BoundaryDist => "BOUNDARY_DIST",
            Sensor::BoundaryDistY => "BOUNDARY_DIST_Y",
            Sensor::GeneticSimFwd => "GENETIC_SIM_FWD",
            Sensor::LastMoveDirX => "LAST_MOVE_DIR_X",
            Sensor::LastMoveDirY => "LAST_MOVE_DIR_Y",
            Sensor::LongProbePopFwd => "LONGPROBE_POP_FWD",
            Sensor::LongProbeBarFwd => "LONGPROBE_BAR_FWD",
            Sensor::Population => "POPULATION",
            Sensor::PopulationFwd => "POPULATION_FWD",
            Sensor::PopulationLr => "POPULATION_LR",
            Sensor::Osc1 => "OSC1",
            Sensor::Age => "AGE",
            Sensor::BarrierFwd => "BARRIER_FWD",
            Sensor::BarrierLr => "BARRIER_LR",
            Sensor::Random => "RANDOM",
            Sensor::Signal0 => "SIGNAL0",
            Sensor::Signal0Fwd => "SIGNAL0_FWD",
            Sensor::Signal0Lr => "SIGNAL0_LR",
        }
    }
}

/// Outputs a brain can drive each step.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum Action {
    MoveX = 0,
    MoveY,
    MoveForward,
    MoveRl,
    MoveRandom,
    SetOscillatorPeriod,
    SetLongProbeDist,
    SetResponsiveness,
    EmitSignal0,
    MoveEast,
    MoveWest,
    MoveNorth,
    MoveSouth,
    MoveLeft,
    MoveRight,
    MoveReverse,
    /// Declared for genome compatibility; never has an effect.
    KillForward,
}

impl Action {
    pub const ALL: [Action; NUM_ACTIONS] = [
        Action::MoveX,
        Action::MoveY,
        Action::MoveForward,
        Action::MoveRl,
        Action::MoveRandom,
        Action::SetOscillatorPeriod,
        Action::SetLongProbeDist,
        Action::SetResponsiveness,
        Action::EmitSignal0,
        Action::MoveEast,
        Action::MoveWest,
        Action::MoveNorth,
        Action::MoveSouth,
        Action::MoveLeft,
        Action::MoveRight,
        Action::MoveReverse,
        Action::KillForward,
    ];

    #[must_use]
    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Action::MoveX => "MOVE_X",
            Action::MoveY => "MOVE_Y",
            Action::MoveForward => "MOVE_FORWARD",
            Action::MoveRl => "MOVE_RL",
            Action::MoveRandom => "MOVE_RANDOM",
            Action::SetOscillatorPeriod => "SET_OSCILLATOR_PERIOD",
            Action::SetLongProbeDist => "SET_LONGPROBE_DIST",
            Action::SetResponsiveness => "SET_RESPONSIVENESS",
            Action::EmitSignal0 => "EMIT_SIGNAL0",
            Action::MoveEast => "MOVE_EAST",
            Action::MoveWest => "MOVE_WEST",
            Action::MoveNorth => "MOVE_NORTH",
            Action::MoveSouth => "MOVE_SOUTH",
            Action::MoveLeft => "MOVE_LEFT",
            Action::MoveRight => "MOVE_RIGHT",
            Action::MoveReverse => "MOVE_REVERSE",
            Action::KillForward => "KILL_FORWARD",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalogue_indices_are_dense() {
        for (idx, sensor) in Sensor::ALL.iter().enumerate() {
            assert_eq!(sensor.index(), idx);
            assert_eq!(Sensor::from_index(idx), Some(*sensor));
        }
        for (idx, action) in Action::ALL.iter().enumerate() {
            assert_eq!(action.index(), idx);
        }
        assert_eq!(Sensor::from_index(NUM_SENSES), None);
        assert_eq!(Action::from_index(NUM_ACTIONS), None);
    }

    #[test]
    fn names_match_catalogue() {
        assert_eq!(Sensor::Signal0Lr.name(), "SIGNAL0_LR");
        assert_eq!(Action::KillForward.name(), "KILL_FORWARD");
    }
}
