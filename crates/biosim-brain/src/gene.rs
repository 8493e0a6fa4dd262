//! A single gene: one weighted connection from a source to a sink.

use std::fmt;

use rand::{Rng, RngCore};
use serde::{Deserialize, Serialize};

/// Fixed-point scale for gene weights.
pub const WEIGHT_SCALE: f32 = 8192.0;
/// Exclusive upper bound for freshly generated source and sink indices.
const RANDOM_NUM_LIMIT: u16 = 0x7FFF;

/// Where a connection draws its input from.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum SourceKind {
    Neuron,
    Sensor,
}

/// Where a connection delivers its output.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum SinkKind {
    Neuron,
    Action,
}

impl SourceKind {
    #[must_use]
    pub const fn bit(self) -> u8 {
        match self {
            SourceKind::Neuron => 0,
            SourceKind::Sensor => 1,
        }
    }

    #[must_use]
    pub const fn flipped(self) -> Self {
        match self {
            SourceKind::Neuron => SourceKind::Sensor,
            SourceKind::Sensor => SourceKind::Neuron,
        }
    }
}

impl SinkKind {
    #[must_use]
    pub const fn bit(self) -> u8 {
        match self {
            SinkKind::Neuron => 0,
            SinkKind::Action => 1,
        }
    }

    #[must_use]
    pub const fn flipped(self) -> Self {
        match self {
            SinkKind::Neuron => SinkKind::Action,
            SinkKind::Action => SinkKind::Neuron,
        }
    }
}

/// Raw genetic encoding of one connection.
///
/// `source_num` and `sink_num` are not range-checked; the compiler reduces
/// them modulo the relevant catalogue size.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Gene {
    pub source_type: SourceKind,
    pub source_num: u16,
    pub sink_type: SinkKind,
    pub sink_num: u16,
    /// Fixed-point weight; see [`Gene::weight_as_float`].
    pub weight: i16,
}

impl Gene {
    #[must_use]
    pub const fn new(
        source_type: SourceKind,
        source_num: u16,
        sink_type: SinkKind,
        sink_num: u16,
        weight: i16,
    ) -> Self {
        Self {
            source_type,
            source_num,
            sink_type,
            sink_num,
            weight,
        }
    }

    /// Sample a gene with uniformly random fields.
    pub fn random(rng: &mut dyn RngCore) -> Self {
        let source_type = if rng.random::<bool>() {
            SourceKind::Sensor
        } else {
            SourceKind::Neuron
        };
        let sink_type = if rng.random::<bool>() {
            SinkKind::Action
        } else {
            SinkKind::Neuron
        };
        Self {
            source_type,
            source_num: rng.random_range(0..RANDOM_NUM_LIMIT),
            sink_type,
            sink_num: rng.random_range(0..RANDOM_NUM_LIMIT),
            weight: rng.random::<i16>(),
        }
    }

    #[must_use]
    pub fn weight_as_float(&self) -> f32 {
        f32::from(self.weight) / WEIGHT_SCALE
    }
}

/// Ten lowercase hex digits: the low byte of each field in declaration order.
impl fmt::Display for Gene {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:02x}{:02x}{:02x}{:02x}{:02x}",
            self.source_type.bit(),
            self.source_num & 0xFF,
            self.sink_type.bit(),
            self.sink_num & 0xFF,
            (self.weight as u16) & 0xFF,
        )
    }
}
