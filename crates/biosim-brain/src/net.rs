//! Compiled recurrent network and its single-pass evaluation.

use biosim_core::{Action, HiddenNeuronUpdate, NUM_ACTIONS, Sensor};
use serde::{Deserialize, Serialize};

use crate::gene::{Gene, SinkKind, SourceKind};

/// Output every hidden neuron starts with.
pub const INITIAL_NEURON_OUTPUT: f32 = 0.5;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Neuron {
    pub output: f32,
    /// Fed by at least one sensor or other neuron.
    pub driven: bool,
}

/// Connections plus hidden neuron state.
///
/// All neuron-sink connections precede all action-sink connections, and
/// every neuron index refers into `neurons`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct NeuralNet {
    connections: Vec<Gene>,
    neurons: Vec<Neuron>,
}

impl NeuralNet {
    #[must_use]
    pub fn new(connections: Vec<Gene>, neurons: Vec<Neuron>) -> Self {
        Self {
            connections,
            neurons,
        }
    }

    #[must_use]
    pub fn connections(&self) -> &[Gene] {
        &self.connections
    }

    #[must_use]
    pub fn neurons(&self) -> &[Neuron] {
        &self.neurons
    }

    /// Evaluate every connection once, in order, and return raw action levels.
    ///
    /// `sense` is called for each sensor-sourced connection (sensors feeding
    /// several connections are read several times). Hidden neurons are read
    /// from their stored outputs; whether those outputs change at the
    /// neuron/action boundary is governed by `update`.
    pub fn feed_forward<E>(
        &mut self,
        update: HiddenNeuronUpdate,
        mut sense: impl FnMut(Sensor) -> Result<f32, E>,
    ) -> Result<[f32; NUM_ACTIONS], E> {
        let mut action_levels = [0.0f32; NUM_ACTIONS];
        let mut accumulators = vec![0.0f32; self.neurons.len()];
        let mut outputs_computed = false;

        for conn in &self.connections {
            if conn.sink_type == SinkKind::Action && !outputs_computed {
                for (neuron, acc) in self.neurons.iter_mut().zip(accumulators.iter_mut()) {
                    if !neuron.driven {
                        continue;
                    }
                    match update {
                        HiddenNeuronUpdate::Snapshot => *acc = neuron.output,
                        HiddenNeuronUpdate::Tanh => neuron.output = acc.tanh(),
                    }
                }
                outputs_computed = true;
            }

            let input = match conn.source_type {
                SourceKind::Sensor => match Sensor::from_index(usize::from(conn.source_num)) {
                    Some(sensor) => sense(sensor)?,
                    None => 0.0,
                },
                SourceKind::Neuron => self
                    .neurons
                    .get(usize::from(conn.source_num))
                    .map_or(0.0, |neuron| neuron.output),
            };
            let contribution = input * conn.weight_as_float();

            match conn.sink_type {
                SinkKind::Action => {
                    if let Some(level) = action_levels.get_mut(usize::from(conn.sink_num)) {
                        *level += contribution;
                    }
                }
                SinkKind::Neuron => {
                    if let Some(acc) = accumulators.get_mut(usize::from(conn.sink_num)) {
                        *acc += contribution;
                    }
                }
            }
        }

        Ok(action_levels)
    }

    /// Names of the actions this network can drive, for diagnostics.
    pub fn driven_actions(&self) -> impl Iterator<Item = Action> + '_ {
        self.connections
            .iter()
            .filter(|c| c.sink_type == SinkKind::Action)
            .filter_map(|c| Action::from_index(usize::from(c.sink_num)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::convert::Infallible;

    fn net() -> NeuralNet {
        NeuralNet::new(
            vec![
                Gene::new(SourceKind::Sensor, Sensor::LocX as u16, SinkKind::Neuron, 0, 8192),
                Gene::new(SourceKind::Neuron, 0, SinkKind::Action, Action::MoveX as u16, 8192),
                Gene::new(SourceKind::Sensor, Sensor::LocY as u16, SinkKind::Action, Action::MoveY as u16, -16384),
            ],
            vec![Neuron {
                output: INITIAL_NEURON_OUTPUT,
                driven: true,
            }],
        )
    }

    fn sense(sensor: Sensor) -> Result<f32, Infallible> {
        Ok(match sensor {
            Sensor::LocX => 1.0,
            Sensor::LocY => 0.25,
            _ => 0.0,
        })
    }

    #[test]
    fn snapshot_mode_keeps_hidden_outputs() {
        let mut net = net();
        for _ in 0..3 {
            let levels = net
                .feed_forward(HiddenNeuronUpdate::Snapshot, sense)
                .expect("infallible");
            assert!((levels[Action::MoveX.index()] - 0.5).abs() < 1e-6);
            assert!((levels[Action::MoveY.index()] + 0.5).abs() < 1e-6);
        }
        assert_eq!(net.neurons()[0].output, INITIAL_NEURON_OUTPUT);
    }

    #[test]
    fn tanh_mode_commits_accumulator() {
        let mut net = net();
        let levels = net
            .feed_forward(HiddenNeuronUpdate::Tanh, sense)
            .expect("infallible");
        let expected = 1.0f32.tanh();
        assert!((levels[Action::MoveX.index()] - expected).abs() < 1e-6);
        assert!((net.neurons()[0].output - expected).abs() < 1e-6);
    }

    #[test]
    fn sensor_errors_propagate() {
        let mut net = net();
        let result: Result<_, &str> =
            net.feed_forward(HiddenNeuronUpdate::Snapshot, |_| Err("boom"));
        assert_eq!(result, Err("boom"));
    }

    #[test]
    fn lists_driven_actions() {
        let actions: Vec<Action> = net().driven_actions().collect();
        assert_eq!(actions, vec![Action::MoveX, Action::MoveY]);
    }
}
