use core::fmt;

use hashbrown::HashMap;
use tracing::debug;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::GraphError;
use crate::graph::Graph;
use crate::neuron::NeuronId;
use crate::squash::Squash;
use crate::synapse::{SynapseId, Weight};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LayerId(pub(crate) usize);

impl fmt::Display for LayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "l{}", self.0)
    }
}

/// Connection pattern between two layers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ConnectionType {
    /// Every source neuron to every target neuron.
    AllToAll,
    /// Source i to target i; sizes must match.
    OneToOne,
    /// Every source neuron to every target neuron except the one at the same
    /// index (lateral wiring without self-loops).
    AllToElse,
}

/// Which synapses of a [`LayerConnection`] a gating layer controls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum GateType {
    /// Gater i controls every synapse entering target neuron i.
    Input,
    /// Gater i controls every synapse leaving source neuron i.
    Output,
    /// Gater i controls the connection's i-th synapse.
    OneToOne,
}

/// An assembled network that other layers can project into.
///
/// Projecting into a topology means projecting into its input layer.
pub trait Topology {
    fn input_layer(&self) -> &Layer;
}

pub enum LayerTarget<'a> {
    Layer(&'a Layer),
    Topology(&'a dyn Topology),
    /// The projecting layer itself (recurrent/lateral wiring).
    Itself,
}

/// Synapses created by one [`Layer::project`] call.
#[derive(Debug, Clone, PartialEq)]
pub struct LayerConnection {
    id: usize,
    from: LayerId,
    to: LayerId,
    kind: ConnectionType,
    from_neurons: Vec<NeuronId>,
    to_neurons: Vec<NeuronId>,
    synapses: Vec<SynapseId>,
    gated_from: Vec<(LayerId, GateType)>,
}

impl LayerConnection {
    pub fn id(&self) -> usize {
        self.id
    }

    pub fn from(&self) -> LayerId {
        self.from
    }

    pub fn to(&self) -> LayerId {
        self.to
    }

    pub fn kind(&self) -> ConnectionType {
        self.kind
    }

    pub fn synapses(&self) -> &[SynapseId] {
        &self.synapses
    }

    pub fn size(&self) -> usize {
        self.synapses.len()
    }

    pub fn is_recurrent(&self) -> bool {
        self.from == self.to
    }

    /// Gating layers applied so far, in order.
    pub fn gated_from(&self) -> &[(LayerId, GateType)] {
        &self.gated_from
    }
}

/// Ordered group of neurons living in a [`Graph`].
///
/// Neuron order is fixed at construction; bulk operations keep positional
/// correspondence with the caller's input/target slices.
#[derive(Debug, Clone)]
pub struct Layer {
    id: LayerId,
    neurons: Vec<NeuronId>,
    connected_to: HashMap<LayerId, ConnectionType>,
}

impl Layer {
    pub fn new(graph: &mut Graph, size: usize) -> Self {
        let squash = graph.config().squash;
        Self::with_squash(graph, size, squash)
    }

    pub fn with_squash(graph: &mut Graph, size: usize, squash: Squash) -> Self {
        let id = LayerId(graph.next_layer_id());
        let neurons = (0..size).map(|_| graph.add_neuron_with(squash)).collect();
        Self {
            id,
            neurons,
            connected_to: HashMap::new(),
        }
    }

    pub fn id(&self) -> LayerId {
        self.id
    }

    pub fn size(&self) -> usize {
        self.neurons.len()
    }

    pub fn neurons(&self) -> &[NeuronId] {
        &self.neurons
    }

    /// Activate every neuron in order. With `inputs`, neuron i is clamped to
    /// `inputs[i]`.
    pub fn activate(
        &self,
        graph: &mut Graph,
        inputs: Option<&[f64]>,
    ) -> Result<Vec<f64>, GraphError> {
        match inputs {
            Some(inputs) => {
                if inputs.len() != self.size() {
                    return Err(GraphError::InputSizeMismatch {
                        expected: self.size(),
                        actual: inputs.len(),
                    });
                }
                Ok(self
                    .neurons
                    .iter()
                    .zip(inputs)
                    .map(|(&n, &x)| graph.activate(n, Some(x)))
                    .collect())
            }
            None => Ok(self
                .neurons
                .iter()
                .map(|&n| graph.activate(n, None))
                .collect()),
        }
    }

    /// Propagate every neuron, last to first. With `targets`, neuron i learns
    /// toward `targets[i]`.
    pub fn propagate(
        &self,
        graph: &mut Graph,
        rate: f64,
        targets: Option<&[f64]>,
    ) -> Result<(), GraphError> {
        if let Some(targets) = targets {
            if targets.len() != self.size() {
                return Err(GraphError::TargetSizeMismatch {
                    expected: self.size(),
                    actual: targets.len(),
                });
            }
        }

        for (i, &n) in self.neurons.iter().enumerate().rev() {
            graph.propagate_with_rate(n, rate, targets.map(|t| t[i]));
        }
        Ok(())
    }

    /// Wire this layer to `target` with the given pattern.
    ///
    /// `kind` defaults to `AllToElse` for [`LayerTarget::Itself`] and
    /// `AllToAll` otherwise. Returns `Ok(None)` if this layer already projects
    /// to the target.
    pub fn project(
        &mut self,
        graph: &mut Graph,
        target: LayerTarget<'_>,
        kind: Option<ConnectionType>,
        weight: Option<Weight>,
    ) -> Result<Option<LayerConnection>, GraphError> {
        let (to, to_neurons) = match target {
            LayerTarget::Layer(layer) => (layer.id, layer.neurons.clone()),
            LayerTarget::Topology(net) => {
                let layer = net.input_layer();
                (layer.id, layer.neurons.clone())
            }
            LayerTarget::Itself => (self.id, self.neurons.clone()),
        };

        if let Some(existing) = self.connected_to.get(&to) {
            debug!(from = %self.id, %to, ?existing, "layer already connected");
            return Ok(None);
        }

        let kind = kind.unwrap_or(if to == self.id {
            ConnectionType::AllToElse
        } else {
            ConnectionType::AllToAll
        });

        let mut synapses = Vec::new();
        match kind {
            ConnectionType::AllToAll | ConnectionType::AllToElse => {
                for (i, &from) in self.neurons.iter().enumerate() {
                    for (j, &dest) in to_neurons.iter().enumerate() {
                        if kind == ConnectionType::AllToElse && i == j {
                            continue;
                        }
                        synapses.push(graph.project(from, dest, weight));
                    }
                }
            }
            ConnectionType::OneToOne => {
                if to_neurons.len() != self.size() {
                    return Err(GraphError::LayerSizeMismatch {
                        expected: self.size(),
                        actual: to_neurons.len(),
                    });
                }
                for (&from, &dest) in self.neurons.iter().zip(&to_neurons) {
                    synapses.push(graph.project(from, dest, weight));
                }
            }
        }

        self.connected_to.insert(to, kind);
        let connection = LayerConnection {
            id: graph.next_connection_id(),
            from: self.id,
            to,
            kind,
            from_neurons: self.neurons.clone(),
            to_neurons,
            synapses,
            gated_from: Vec::new(),
        };
        debug!(
            from = %self.id,
            %to,
            ?kind,
            synapses = connection.size(),
            "layer projected"
        );
        Ok(Some(connection))
    }

    /// Let this layer's neurons gate the synapses of `connection`.
    ///
    /// Applying the same gate type from the same layer twice is a no-op.
    pub fn gate(
        &self,
        graph: &mut Graph,
        connection: &mut LayerConnection,
        gate: GateType,
    ) -> Result<(), GraphError> {
        if connection.gated_from.contains(&(self.id, gate)) {
            debug!(gater = %self.id, ?gate, "connection already gated");
            return Ok(());
        }

        let mut pairs = Vec::new();
        match gate {
            GateType::Input => {
                self.expect_size(connection.to_neurons.len())?;
                for (&gater, &neuron) in self.neurons.iter().zip(&connection.to_neurons) {
                    for &s in &connection.synapses {
                        if graph.synapse(s).to() == neuron {
                            pairs.push((gater, s));
                        }
                    }
                }
            }
            GateType::Output => {
                self.expect_size(connection.from_neurons.len())?;
                for (&gater, &neuron) in self.neurons.iter().zip(&connection.from_neurons) {
                    for &s in &connection.synapses {
                        if graph.synapse(s).from() == neuron {
                            pairs.push((gater, s));
                        }
                    }
                }
            }
            GateType::OneToOne => {
                self.expect_size(connection.synapses.len())?;
                pairs.extend(self.neurons.iter().copied().zip(connection.synapses.iter().copied()));
            }
        }

        // All or nothing: reject before touching the graph.
        for &(gater, s) in &pairs {
            match graph.synapse(s).gater() {
                Some(current) if current != gater => {
                    return Err(GraphError::AlreadyGated {
                        synapse: s,
                        gater: current,
                    });
                }
                _ => {}
            }
        }
        for (gater, s) in pairs {
            graph.gate(gater, s)?;
        }

        connection.gated_from.push((self.id, gate));
        debug!(gater = %self.id, connection = connection.id, ?gate, "layer gated");
        Ok(())
    }

    /// Pattern this layer used to project to `layer`, if it has.
    pub fn connection_to(&self, layer: LayerId) -> Option<ConnectionType> {
        self.connected_to.get(&layer).copied()
    }

    /// True when every neuron has an active self-connection.
    pub fn is_self_connected(&self, graph: &Graph) -> bool {
        self.neurons.iter().all(|&n| graph.is_self_connected(n))
    }

    pub fn clear(&self, graph: &mut Graph) {
        for &n in &self.neurons {
            graph.clear(n);
        }
    }

    pub fn reset(&self, graph: &mut Graph) {
        for &n in &self.neurons {
            graph.reset(n);
        }
    }

    pub fn set_squash(&self, graph: &mut Graph, squash: Squash) {
        for &n in &self.neurons {
            graph.neuron_mut(n).squash = squash;
        }
    }

    pub fn set_bias(&self, graph: &mut Graph, bias: f64) {
        for &n in &self.neurons {
            graph.neuron_mut(n).bias = bias;
        }
    }

    fn expect_size(&self, actual: usize) -> Result<(), GraphError> {
        if actual != self.size() {
            return Err(GraphError::LayerSizeMismatch {
                expected: self.size(),
                actual,
            });
        }
        Ok(())
    }
}
