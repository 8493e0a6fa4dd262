//! Turns a genome into an executable [`NeuralNet`].
//!
//! Compilation range-reduces gene indices, prunes hidden neurons whose only
//! consumers are themselves, renumbers the survivors densely and orders the
//! connection list so every neuron-sink connection precedes every
//! action-sink connection.

use std::collections::{BTreeMap, BTreeSet};

use biosim_core::{BioSimConfig, NUM_ACTIONS, NUM_SENSES};
use tracing::trace;

use crate::gene::{Gene, SinkKind, SourceKind};
use crate::genome::Genome;
use crate::net::{INITIAL_NEURON_OUTPUT, NeuralNet, Neuron};

/// Capacity limits applied during range reduction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NetLimits {
    pub max_number_neurons: usize,
}

impl From<&BioSimConfig> for NetLimits {
    fn from(config: &BioSimConfig) -> Self {
        Self {
            max_number_neurons: config.max_number_neurons,
        }
    }
}

/// Bookkeeping for one hidden neuron during compilation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CompileNode {
    pub num_outputs: usize,
    pub num_self_inputs: usize,
    pub num_inputs_from_sensor_or_other_neurons: usize,
    pub remapped_number: usize,
}

impl CompileNode {
    /// Nothing outside the neuron itself consumes its output.
    #[must_use]
    pub const fn is_useless(&self) -> bool {
        self.num_outputs == self.num_self_inputs
    }
}

fn range_reduced(genome: &Genome, limits: NetLimits) -> Vec<Gene> {
    let neurons = limits.max_number_neurons.max(1);
    genome
        .genes()
        .iter()
        .map(|gene| {
            let mut gene = *gene;
            gene.source_num = match gene.source_type {
                SourceKind::Neuron => (usize::from(gene.source_num) % neurons) as u16,
                SourceKind::Sensor => (usize::from(gene.source_num) % NUM_SENSES) as u16,
            };
            gene.sink_num = match gene.sink_type {
                SinkKind::Neuron => (usize::from(gene.sink_num) % neurons) as u16,
                SinkKind::Action => (usize::from(gene.sink_num) % NUM_ACTIONS) as u16,
            };
            gene
        })
        .collect()
}

/// Count outputs, self-inputs and other inputs for every referenced hidden neuron.
pub fn make_node_map(connections: &[Gene]) -> BTreeMap<u16, CompileNode> {
    let mut nodes: BTreeMap<u16, CompileNode> = BTreeMap::new();
    for conn in connections {
        if conn.sink_type == SinkKind::Neuron {
            let node = nodes.entry(conn.sink_num).or_default();
            if conn.source_type == SourceKind::Neuron && conn.source_num == conn.sink_num {
                node.num_self_inputs += 1;
            } else {
                node.num_inputs_from_sensor_or_other_neurons += 1;
            }
        }
        if conn.source_type == SourceKind::Neuron {
            nodes.entry(conn.source_num).or_default().num_outputs += 1;
        }
    }
    nodes
}

fn remove_connections_to_neuron(
    connections: &mut Vec<Gene>,
    nodes: &mut BTreeMap<u16, CompileNode>,
    neuron: u16,
) {
    connections.retain(|conn| {
        let feeds_neuron = conn.sink_type == SinkKind::Neuron && conn.sink_num == neuron;
        if feeds_neuron && conn.source_type == SourceKind::Neuron {
            if let Some(source) = nodes.get_mut(&conn.source_num) {
                source.num_outputs = source.num_outputs.saturating_sub(1);
            }
        }
        !feeds_neuron
    });
}

/// Repeatedly delete useless neurons until none remain.
///
/// Each pass first collects the doomed neurons, then removes them together
/// with their incoming connections.
pub fn cull_useless_neurons(
    connections: &mut Vec<Gene>,
    nodes: &mut BTreeMap<u16, CompileNode>,
) {
    loop {
        let doomed: BTreeSet<u16> = nodes
            .iter()
            .filter(|(_, node)| node.is_useless())
            .map(|(num, _)| *num)
            .collect();
        if doomed.is_empty() {
            break;
        }
        for neuron in doomed {
            remove_connections_to_neuron(connections, nodes, neuron);
            nodes.remove(&neuron);
        }
    }
}

/// Compile `genome` into a pruned, densely numbered network.
#[must_use]
pub fn compile(genome: &Genome, limits: NetLimits) -> NeuralNet {
    let mut connections = range_reduced(genome, limits);
    let mut nodes = make_node_map(&connections);
    cull_useless_neurons(&mut connections, &mut nodes);

    for (remapped, node) in nodes.values_mut().enumerate() {
        debug_assert!(node.num_outputs != 0);
        node.remapped_number = remapped;
    }
    let remap = |num: u16| nodes.get(&num).map(|node| node.remapped_number as u16);

    let mut compiled = Vec::with_capacity(connections.len());
    for conn in connections.iter().filter(|c| c.sink_type == SinkKind::Neuron) {
        let Some(sink) = remap(conn.sink_num) else {
            continue;
        };
        let mut conn = *conn;
        conn.sink_num = sink;
        if conn.source_type == SourceKind::Neuron {
            let Some(source) = remap(conn.source_num) else {
                continue;
            };
            conn.source_num = source;
        }
        compiled.push(conn);
    }
    for conn in connections.iter().filter(|c| c.sink_type == SinkKind::Action) {
        let mut conn = *conn;
        if conn.source_type == SourceKind::Neuron {
            let Some(source) = remap(conn.source_num) else {
                continue;
            };
            conn.source_num = source;
        }
        compiled.push(conn);
    }

    let neurons = nodes
        .values()
        .map(|node| Neuron {
            output: INITIAL_NEURON_OUTPUT,
            driven: node.num_inputs_from_sensor_or_other_neurons != 0,
        })
        .collect::<Vec<_>>();

    trace!(
        genes = genome.len(),
        connections = compiled.len(),
        neurons = neurons.len(),
        "compiled genome"
    );
    NeuralNet::new(compiled, neurons)
}
