#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use core::fmt;
use std::collections::{BTreeMap, BTreeSet};

use crate::graph::Graph;
use crate::squash::Squash;
use crate::synapse::SynapseId;

/// Index of a neuron inside its graph. Assigned in creation order, never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct NeuronId(pub(crate) usize);

impl NeuronId {
    #[inline]
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for NeuronId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n{}", self.0)
    }
}

/// The three disjoint sets a neuron's synapses live in.
///
/// Ordered sets keep traversal (and therefore floating-point summation order)
/// deterministic.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ConnectionSets {
    /// Synapses ending at this neuron (self-connection excluded).
    pub inputs: BTreeSet<SynapseId>,
    /// Synapses starting at this neuron (self-connection excluded).
    pub projected: BTreeSet<SynapseId>,
    /// Synapses whose gain this neuron controls.
    pub gated: BTreeSet<SynapseId>,
}

/// Which of the three sets a connection was found in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ConnectionKind {
    Inputs,
    Projected,
    Gated,
}

/// Result of [`Graph::connected_to`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Connectivity {
    /// Queried neuron is the neuron itself and its self-connection is active.
    SelfConnection(SynapseId),
    Found {
        kind: ConnectionKind,
        synapse: SynapseId,
    },
    Unconnected,
}

impl Connectivity {
    pub fn is_connected(&self) -> bool {
        !matches!(self, Connectivity::Unconnected)
    }

    pub fn synapse(&self) -> Option<SynapseId> {
        match *self {
            Connectivity::SelfConnection(s) => Some(s),
            Connectivity::Found { synapse, .. } => Some(synapse),
            Connectivity::Unconnected => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ErrorTerms {
    pub responsibility: f64,
    pub projected: f64,
    pub gated: f64,
}

#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Traces {
    /// One entry per inbound synapse.
    pub eligibility: BTreeMap<SynapseId, f64>,
    /// Gated neuron -> (inbound synapse -> extended trace).
    pub extended: BTreeMap<NeuronId, BTreeMap<SynapseId, f64>>,
    /// Gated neuron -> gating synapses feeding it, in gating order.
    pub influences: BTreeMap<NeuronId, Vec<SynapseId>>,
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Neuron {
    id: NeuronId,

    pub state: f64,
    pub old_state: f64,
    pub activation: f64,
    pub derivative: f64,
    pub bias: f64,
    pub squash: Squash,

    self_connection: SynapseId,

    pub(crate) connections: ConnectionSets,
    pub(crate) neighbors: BTreeSet<NeuronId>,
    pub(crate) error: ErrorTerms,
    pub(crate) trace: Traces,
}

impl Neuron {
    pub(crate) fn new(id: NeuronId, self_connection: SynapseId, bias: f64, squash: Squash) -> Self {
        Self {
            id,
            state: 0.0,
            old_state: 0.0,
            activation: 0.0,
            derivative: 0.0,
            bias,
            squash,
            self_connection,
            connections: ConnectionSets::default(),
            neighbors: BTreeSet::new(),
            error: ErrorTerms::default(),
            trace: Traces::default(),
        }
    }

    pub fn id(&self) -> NeuronId {
        self.id
    }

    pub fn self_connection(&self) -> SynapseId {
        self.self_connection
    }

    pub fn connections(&self) -> &ConnectionSets {
        &self.connections
    }

    pub fn neighbors(&self) -> &BTreeSet<NeuronId> {
        &self.neighbors
    }

    pub fn error(&self) -> &ErrorTerms {
        &self.error
    }

    pub fn traces(&self) -> &Traces {
        &self.trace
    }

    pub fn eligibility(&self, synapse: SynapseId) -> Option<f64> {
        self.trace.eligibility.get(&synapse).copied()
    }

    pub fn extended(&self, gated: NeuronId, synapse: SynapseId) -> Option<f64> {
        self.trace.extended.get(&gated)?.get(&synapse).copied()
    }

    /// Every synapse this neuron owns a reference to, across all three sets.
    pub(crate) fn all_synapses(&self) -> impl Iterator<Item = SynapseId> + '_ {
        self.connections
            .inputs
            .iter()
            .chain(self.connections.projected.iter())
            .chain(self.connections.gated.iter())
            .copied()
    }
}

// Activation and learning. These read other neurons and synapses, so they live
// on the graph rather than on `Neuron`.
impl Graph {
    /// Activate one neuron and return its new activation.
    ///
    /// `Some(input)` clamps the neuron to an external value (input unit): the
    /// activation becomes `input`, derivative and bias become 0, and no traces
    /// move. `None` integrates the inbound synapses, squashes, and advances the
    /// eligibility and extended traces. Afterwards every synapse this neuron
    /// gates carries the new activation as its gain.
    ///
    /// # Panics
    /// If `id` does not belong to this graph.
    pub fn activate(&mut self, id: NeuronId, input: Option<f64>) -> f64 {
        if let Some(input) = input {
            let neuron = &mut self.neurons[id.0];
            neuron.activation = input;
            neuron.derivative = 0.0;
            neuron.bias = 0.0;
            return input;
        }

        let neuron = &self.neurons[id.0];
        let self_decay = self.self_decay(id);
        let mut state = self_decay * neuron.state + neuron.bias;
        for &s in &neuron.connections.inputs {
            let syn = &self.synapses[s.0];
            state += self.neurons[syn.from().0].activation * syn.weight * syn.gain;
        }

        let neuron = &mut self.neurons[id.0];
        neuron.old_state = neuron.state;
        neuron.state = state;
        neuron.activation = neuron.squash.value(state);
        neuron.derivative = neuron.squash.derivative(state);
        let activation = neuron.activation;
        let derivative = neuron.derivative;

        // Influence and decay of every gated neighbor, read once per step.
        let neighbors: Vec<(NeuronId, f64, f64)> = self.neurons[id.0]
            .trace
            .extended
            .keys()
            .map(|&k| (k, self.influence(id, k), self.self_decay(k)))
            .collect();

        let drives: Vec<(SynapseId, f64)> = self.neurons[id.0]
            .connections
            .inputs
            .iter()
            .map(|&s| {
                let syn = &self.synapses[s.0];
                (s, syn.gain * self.neurons[syn.from().0].activation)
            })
            .collect();

        let trace = &mut self.neurons[id.0].trace;
        for (s, drive) in drives {
            let e = trace.eligibility.entry(s).or_insert(0.0);
            *e = self_decay * *e + drive;
            let eligibility = *e;

            for &(k, influence, decay) in &neighbors {
                if let Some(x) = trace.extended.get_mut(&k).and_then(|m| m.get_mut(&s)) {
                    // Scaled by this neuron's own squash derivative (LSTM-g form).
                    *x = decay * *x + derivative * eligibility * influence;
                }
            }
        }

        let gated: Vec<SynapseId> = self.neurons[id.0]
            .connections
            .gated
            .iter()
            .copied()
            .collect();
        for s in gated {
            self.synapses[s.0].gain = activation;
        }

        activation
    }

    /// Back-propagate with the graph's configured learning rate.
    pub fn propagate(&mut self, id: NeuronId, target: Option<f64>) -> f64 {
        self.propagate_with_rate(id, self.cfg.learning_rate, target)
    }

    /// Compute this neuron's error terms, then update every inbound weight and
    /// the bias. Returns the updated bias.
    ///
    /// `Some(target)` marks an output unit. Hidden units read the responsibility
    /// of the neurons they project to and of the neurons they gate, so those
    /// must already have been propagated this step.
    ///
    /// # Panics
    /// If `id` does not belong to this graph.
    pub fn propagate_with_rate(&mut self, id: NeuronId, rate: f64, target: Option<f64>) -> f64 {
        let error = match target {
            Some(target) => {
                let delta = target - self.neurons[id.0].activation;
                ErrorTerms {
                    responsibility: delta,
                    projected: delta,
                    gated: self.neurons[id.0].error.gated,
                }
            }
            None => {
                let neuron = &self.neurons[id.0];

                let mut projected_error = 0.0;
                for &s in &neuron.connections.projected {
                    let syn = &self.synapses[s.0];
                    projected_error +=
                        self.neurons[syn.to().0].error.responsibility * syn.gain * syn.weight;
                }

                let mut gated_error = 0.0;
                for &k in neuron.trace.extended.keys() {
                    gated_error += self.neurons[k.0].error.responsibility * self.influence(id, k);
                }

                let projected = neuron.derivative * projected_error;
                let gated = neuron.derivative * gated_error;
                ErrorTerms {
                    responsibility: projected + gated,
                    projected,
                    gated,
                }
            }
        };
        self.neurons[id.0].error = error;

        let neuron = &self.neurons[id.0];
        let updates: Vec<(SynapseId, f64)> = neuron
            .connections
            .inputs
            .iter()
            .map(|&s| {
                let mut gradient =
                    error.projected * neuron.trace.eligibility.get(&s).copied().unwrap_or(0.0);
                for (&k, xtrace) in &neuron.trace.extended {
                    gradient += self.neurons[k.0].error.responsibility
                        * xtrace.get(&s).copied().unwrap_or(0.0);
                }
                (s, gradient)
            })
            .collect();

        for (s, gradient) in updates {
            self.synapses[s.0].weight += rate * gradient;
        }

        let neuron = &mut self.neurons[id.0];
        neuron.bias += rate * error.responsibility;
        neuron.bias
    }

    /// How strongly `gater` modulates the net input of `gated`: the gated
    /// neuron's previous state if `gater` gates its self-connection, plus the
    /// ungated contribution of every synapse into `gated` that `gater` controls.
    pub(crate) fn influence(&self, gater: NeuronId, gated: NeuronId) -> f64 {
        let target = &self.neurons[gated.0];
        let mut influence = if self.synapses[target.self_connection.0].gater() == Some(gater) {
            target.old_state
        } else {
            0.0
        };

        if let Some(list) = self.neurons[gater.0].trace.influences.get(&gated) {
            for &s in list {
                let syn = &self.synapses[s.0];
                influence += syn.weight * self.neurons[syn.from().0].activation;
            }
        }
        influence
    }

    /// Effective self-recurrence factor (`gain * weight` of the self-connection).
    #[inline]
    pub(crate) fn self_decay(&self, id: NeuronId) -> f64 {
        let sc = &self.synapses[self.neurons[id.0].self_connection.0];
        sc.gain * sc.weight
    }
}
