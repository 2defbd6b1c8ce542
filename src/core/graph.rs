use tracing::{trace, warn};

use crate::config::GraphConfig;
use crate::error::GraphError;
use crate::neuron::{ConnectionKind, Connectivity, Neuron, NeuronId};
use crate::prng::Prng;
use crate::squash::Squash;
use crate::synapse::{Synapse, SynapseId, Weight};

/// Per-graph creation counters (diagnostics only).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Census {
    pub neurons: usize,
    pub synapses: usize,
    pub layers: usize,
    pub connections: usize,
}

/// Arena owning every neuron and synapse of one network.
///
/// All cross-references (endpoints, gaters, neighbors) are ids into the flat
/// `neurons`/`synapses` vectors, so the graph has no reference cycles and ids
/// are never shared between two graphs' namespaces by accident. The graph does
/// not enforce activation order; the caller activates upstream before
/// downstream and propagates in reverse.
#[derive(Debug, Clone)]
pub struct Graph {
    pub(crate) cfg: GraphConfig,
    pub(crate) neurons: Vec<Neuron>,
    pub(crate) synapses: Vec<Synapse>,
    rng: Prng,

    next_layer: usize,
    next_connection: usize,
}

impl Graph {
    /// Build a graph, falling back to the default config if `cfg` is invalid.
    pub fn new(cfg: GraphConfig) -> Self {
        match Self::try_new(cfg) {
            Ok(g) => g,
            Err(e) => {
                warn!("{e}; using default graph config");
                let fallback = GraphConfig {
                    seed: cfg.seed,
                    ..GraphConfig::default()
                };
                Self::from_valid(fallback)
            }
        }
    }

    pub fn try_new(cfg: GraphConfig) -> Result<Self, GraphError> {
        cfg.validate()?;
        Ok(Self::from_valid(cfg))
    }

    fn from_valid(cfg: GraphConfig) -> Self {
        Self {
            rng: Prng::new(cfg.seed.unwrap_or(1)),
            cfg,
            neurons: Vec::new(),
            synapses: Vec::new(),
            next_layer: 0,
            next_connection: 0,
        }
    }

    pub fn config(&self) -> &GraphConfig {
        &self.cfg
    }

    pub fn census(&self) -> Census {
        Census {
            neurons: self.neurons.len(),
            synapses: self.synapses.len(),
            layers: self.next_layer,
            connections: self.next_connection,
        }
    }

    /// New neuron with the configured squash, a random bias and an inactive
    /// (zero-weight) self-connection.
    pub fn add_neuron(&mut self) -> NeuronId {
        self.add_neuron_with(self.cfg.squash)
    }

    pub fn add_neuron_with(&mut self, squash: Squash) -> NeuronId {
        let id = NeuronId(self.neurons.len());
        let bias = self.rng.symmetric(self.cfg.init_range);
        let self_connection = self.push_synapse(id, id, 0.0);
        self.neurons
            .push(Neuron::new(id, self_connection, bias, squash));
        id
    }

    pub fn neuron(&self, id: NeuronId) -> &Neuron {
        &self.neurons[id.0]
    }

    pub fn neuron_mut(&mut self, id: NeuronId) -> &mut Neuron {
        &mut self.neurons[id.0]
    }

    pub fn neurons(&self) -> &[Neuron] {
        &self.neurons
    }

    pub fn synapse(&self, id: SynapseId) -> &Synapse {
        &self.synapses[id.0]
    }

    pub fn synapse_mut(&mut self, id: SynapseId) -> &mut Synapse {
        &mut self.synapses[id.0]
    }

    pub fn synapses(&self) -> &[Synapse] {
        &self.synapses
    }

    /// A self-connection counts as active once it has a weight or a gater.
    pub fn is_self_connected(&self, id: NeuronId) -> bool {
        let sc = &self.synapses[self.neurons[id.0].self_connection().0];
        sc.weight != 0.0 || sc.is_gated()
    }

    /// Connect `from` to `to` and return the synapse.
    ///
    /// Projecting a neuron onto itself sets its self-connection weight (1 by
    /// default). An existing `from -> to` synapse is reused, with its weight
    /// overwritten when `weight` is given; this never creates a parallel edge.
    ///
    /// # Panics
    /// If either id does not belong to this graph.
    pub fn project(&mut self, from: NeuronId, to: NeuronId, weight: Option<Weight>) -> SynapseId {
        if from == to {
            let sc = self.neurons[from.0].self_connection();
            self.synapses[sc.0].weight = weight.unwrap_or(1.0);
            return sc;
        }

        if let Some(existing) = self.projection(from, to) {
            if let Some(w) = weight {
                self.synapses[existing.0].weight = w;
            }
            return existing;
        }

        let weight = match weight {
            Some(w) => w,
            None => self.rng.symmetric(self.cfg.init_range),
        };
        let sid = self.push_synapse(from, to, weight);

        let source = &mut self.neurons[from.0];
        source.connections.projected.insert(sid);
        source.neighbors.insert(to);

        let target = &mut self.neurons[to.0];
        target.connections.inputs.insert(sid);
        target.trace.eligibility.insert(sid, 0.0);
        // Gates already watching `to` need a slot for the new input.
        for xtrace in target.trace.extended.values_mut() {
            xtrace.insert(sid, 0.0);
        }

        trace!(synapse = %sid, %from, %to, weight, "projected");
        sid
    }

    /// Make `gater` the gater of `synapse`.
    ///
    /// From now on every activation of `gater` writes its activation into the
    /// synapse's gain. Gating the same synapse twice with the same neuron is a
    /// no-op; a synapse already gated by another neuron is rejected.
    ///
    /// # Panics
    /// If either id does not belong to this graph.
    pub fn gate(&mut self, gater: NeuronId, synapse: SynapseId) -> Result<(), GraphError> {
        match self.synapses[synapse.0].gater() {
            Some(current) if current == gater => return Ok(()),
            Some(current) => {
                return Err(GraphError::AlreadyGated {
                    synapse,
                    gater: current,
                })
            }
            None => {}
        }

        let gated = self.synapses[synapse.0].to();
        let neuron = &mut self.neurons[gater.0];
        neuron.connections.gated.insert(synapse);

        if !neuron.trace.extended.contains_key(&gated) {
            neuron.neighbors.insert(gated);
            let seeded = neuron
                .connections
                .inputs
                .iter()
                .map(|&s| (s, 0.0))
                .collect();
            neuron.trace.extended.insert(gated, seeded);
        }
        neuron
            .trace
            .influences
            .entry(gated)
            .or_default()
            .push(synapse);

        self.synapses[synapse.0].set_gater(gater);
        trace!(%synapse, %gater, %gated, "gated");
        Ok(())
    }

    /// Is `neuron` connected to `other`, and how?
    ///
    /// Scans `inputs`, then `projected`, then `gated` and reports the first
    /// synapse that has `other` as one of its endpoints.
    pub fn connected_to(&self, neuron: NeuronId, other: NeuronId) -> Connectivity {
        let n = &self.neurons[neuron.0];
        if neuron == other {
            return if self.is_self_connected(neuron) {
                Connectivity::SelfConnection(n.self_connection())
            } else {
                Connectivity::Unconnected
            };
        }

        let sets = [
            (ConnectionKind::Inputs, &n.connections.inputs),
            (ConnectionKind::Projected, &n.connections.projected),
            (ConnectionKind::Gated, &n.connections.gated),
        ];
        for (kind, set) in sets {
            for &s in set {
                let syn = &self.synapses[s.0];
                if syn.from() == other || syn.to() == other {
                    return Connectivity::Found { kind, synapse: s };
                }
            }
        }
        Connectivity::Unconnected
    }

    /// Zero every trace entry and the error terms. Weights, bias and
    /// structure are untouched.
    pub fn clear(&mut self, id: NeuronId) {
        let neuron = &mut self.neurons[id.0];
        for e in neuron.trace.eligibility.values_mut() {
            *e = 0.0;
        }
        for xtrace in neuron.trace.extended.values_mut() {
            for x in xtrace.values_mut() {
                *x = 0.0;
            }
        }
        neuron.error = Default::default();
    }

    /// `clear`, then redraw every weight in the neuron's three connection sets
    /// and its bias, and zero the activation state. The self-connection weight
    /// is left alone; it encodes structure, not a learned value.
    pub fn reset(&mut self, id: NeuronId) {
        self.clear(id);

        let range = self.cfg.init_range;
        let owned: Vec<SynapseId> = self.neurons[id.0].all_synapses().collect();
        for s in owned {
            self.synapses[s.0].weight = self.rng.symmetric(range);
        }

        let bias = self.rng.symmetric(range);
        let neuron = &mut self.neurons[id.0];
        neuron.bias = bias;
        neuron.state = 0.0;
        neuron.old_state = 0.0;
        neuron.activation = 0.0;
        neuron.derivative = 0.0;
    }

    /// Existing `from -> to` synapse in `from`'s projected set.
    fn projection(&self, from: NeuronId, to: NeuronId) -> Option<SynapseId> {
        self.neurons[from.0]
            .connections
            .projected
            .iter()
            .copied()
            .find(|s| self.synapses[s.0].to() == to)
    }

    fn push_synapse(&mut self, from: NeuronId, to: NeuronId, weight: Weight) -> SynapseId {
        let id = SynapseId(self.synapses.len());
        self.synapses.push(Synapse::new(id, from, to, weight));
        id
    }

    pub(crate) fn next_layer_id(&mut self) -> usize {
        let id = self.next_layer;
        self.next_layer += 1;
        id
    }

    pub(crate) fn next_connection_id(&mut self) -> usize {
        let id = self.next_connection;
        self.next_connection += 1;
        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::neuron::ErrorTerms;

    fn graph() -> Graph {
        Graph::new(GraphConfig::default().with_seed(5))
    }

    #[test]
    fn fresh_neuron_has_inactive_self_connection() {
        let mut g = graph();
        let a = g.add_neuron();
        let sc = g.synapse(g.neuron(a).self_connection());

        assert_eq!(sc.from(), a);
        assert_eq!(sc.to(), a);
        assert_eq!(sc.weight, 0.0);
        assert_eq!(g.connected_to(a, a), Connectivity::Unconnected);
        assert!((-1.0..1.0).contains(&g.neuron(a).bias));
    }

    #[test]
    fn projecting_onto_self_activates_self_connection() {
        let mut g = graph();
        let a = g.add_neuron();
        let sc = g.project(a, a, None);

        assert_eq!(sc, g.neuron(a).self_connection());
        assert_eq!(g.synapse(sc).weight, 1.0);
        assert_eq!(g.connected_to(a, a), Connectivity::SelfConnection(sc));
        // Self-connection never enters the regular sets.
        assert!(g.neuron(a).connections().inputs.is_empty());
        assert!(g.neuron(a).connections().projected.is_empty());

        g.project(a, a, Some(-0.3));
        assert_eq!(g.synapse(sc).weight, -0.3);
    }

    #[test]
    fn repeated_projection_reuses_the_synapse() {
        let mut g = graph();
        let a = g.add_neuron();
        let b = g.add_neuron();

        let first = g.project(a, b, Some(0.2));
        let second = g.project(a, b, Some(0.9));
        assert_eq!(first, second);
        assert_eq!(g.synapse(first).weight, 0.9);
        assert_eq!(g.neuron(a).connections().projected.len(), 1);
        assert_eq!(g.neuron(b).connections().inputs.len(), 1);

        // No weight given: keep the current one.
        g.project(a, b, None);
        assert_eq!(g.synapse(first).weight, 0.9);
    }

    #[test]
    fn reverse_projection_is_a_distinct_synapse() {
        let mut g = graph();
        let a = g.add_neuron();
        let b = g.add_neuron();

        let ab = g.project(a, b, None);
        let ba = g.project(b, a, None);
        assert_ne!(ab, ba);
        // a already has b->a as an input; a second a->b must still be deduplicated.
        assert_eq!(g.project(a, b, None), ab);
    }

    #[test]
    fn projection_seeds_traces_and_neighbors() {
        let mut g = graph();
        let a = g.add_neuron();
        let b = g.add_neuron();
        let s = g.project(a, b, None);

        assert!(g.neuron(a).neighbors().contains(&b));
        assert_eq!(g.neuron(b).eligibility(s), Some(0.0));
        assert_eq!(g.neuron(a).eligibility(s), None);
    }

    #[test]
    fn gate_seeds_extended_trace_and_backfills_later_inputs() {
        let mut g = graph();
        let x = g.add_neuron();
        let y = g.add_neuron();
        let gater = g.add_neuron();
        let a = g.add_neuron();
        let b = g.add_neuron();

        let early = g.project(x, gater, None);
        let ab = g.project(a, b, None);
        g.gate(gater, ab).unwrap();

        assert_eq!(g.synapse(ab).gater(), Some(gater));
        assert!(g.neuron(gater).connections().gated.contains(&ab));
        assert!(g.neuron(gater).neighbors().contains(&b));
        assert_eq!(g.neuron(gater).extended(b, early), Some(0.0));
        assert_eq!(g.neuron(gater).traces().influences[&b], vec![ab]);

        let late = g.project(y, gater, None);
        assert_eq!(g.neuron(gater).extended(b, late), Some(0.0));
        assert_eq!(g.neuron(gater).traces().extended[&b].len(), 2);
    }

    #[test]
    fn regating_rules() {
        let mut g = graph();
        let a = g.add_neuron();
        let b = g.add_neuron();
        let g1 = g.add_neuron();
        let g2 = g.add_neuron();
        let s = g.project(a, b, None);

        g.gate(g1, s).unwrap();
        g.gate(g1, s).unwrap();
        assert_eq!(g.neuron(g1).traces().influences[&b].len(), 1);

        assert!(matches!(
            g.gate(g2, s),
            Err(GraphError::AlreadyGated { gater, .. }) if gater == g1
        ));
        assert!(g.neuron(g2).connections().gated.is_empty());
    }

    #[test]
    fn gated_self_connection_counts_as_active() {
        let mut g = graph();
        let a = g.add_neuron();
        let gater = g.add_neuron();
        let sc = g.neuron(a).self_connection();

        g.gate(gater, sc).unwrap();
        assert!(g.is_self_connected(a));
        assert_eq!(g.connected_to(a, a), Connectivity::SelfConnection(sc));
    }

    #[test]
    fn connected_to_filters_by_endpoint() {
        let mut g = graph();
        let a = g.add_neuron();
        let b = g.add_neuron();
        let c = g.add_neuron();
        let d = g.add_neuron();

        let ca = g.project(c, a, None);
        let ab = g.project(a, b, None);

        assert_eq!(
            g.connected_to(a, c),
            Connectivity::Found {
                kind: ConnectionKind::Inputs,
                synapse: ca
            }
        );
        assert_eq!(
            g.connected_to(a, b),
            Connectivity::Found {
                kind: ConnectionKind::Projected,
                synapse: ab
            }
        );
        assert_eq!(g.connected_to(a, d), Connectivity::Unconnected);

        let cd = g.project(c, d, None);
        g.gate(a, cd).unwrap();
        assert_eq!(
            g.connected_to(a, d),
            Connectivity::Found {
                kind: ConnectionKind::Gated,
                synapse: cd
            }
        );
    }

    #[test]
    fn clear_zeroes_traces_but_keeps_parameters() {
        let mut g = graph();
        let x = g.add_neuron();
        let gater = g.add_neuron();
        let a = g.add_neuron();
        let b = g.add_neuron();
        let xg = g.project(x, gater, None);
        let ab = g.project(a, b, None);
        g.gate(gater, ab).unwrap();

        g.activate(x, Some(1.0));
        g.activate(a, Some(1.0));
        g.activate(gater, None);
        g.activate(b, None);
        g.propagate(b, Some(1.0));
        g.propagate(gater, None);

        let weights: Vec<f64> = g.synapses().iter().map(|s| s.weight).collect();
        let bias = g.neuron(gater).bias;
        assert_ne!(g.neuron(gater).eligibility(xg), Some(0.0));

        g.clear(gater);
        let n = g.neuron(gater);
        assert_eq!(n.eligibility(xg), Some(0.0));
        assert_eq!(n.extended(b, xg), Some(0.0));
        assert_eq!(*n.error(), ErrorTerms::default());
        assert_eq!(n.bias, bias);
        let after: Vec<f64> = g.synapses().iter().map(|s| s.weight).collect();
        assert_eq!(weights, after);
    }

    #[test]
    fn reset_redraws_parameters_and_zeroes_state() {
        let mut g = graph();
        let a = g.add_neuron();
        let b = g.add_neuron();
        let c = g.add_neuron();
        let ab = g.project(a, b, Some(5.0));
        let bc = g.project(b, c, Some(-5.0));
        let d = g.add_neuron();
        let dc = g.project(d, c, Some(9.0));
        g.gate(b, dc).unwrap();
        g.project(b, b, Some(0.5));
        g.neuron_mut(b).bias = 7.0;

        g.activate(a, Some(1.0));
        g.activate(b, None);
        g.reset(b);

        let n = g.neuron(b);
        assert!((-1.0..1.0).contains(&n.bias));
        assert_eq!(n.state, 0.0);
        assert_eq!(n.old_state, 0.0);
        assert_eq!(n.activation, 0.0);
        assert_eq!(n.derivative, 0.0);
        assert_eq!(n.eligibility(ab), Some(0.0));
        assert!((-1.0..1.0).contains(&g.synapse(ab).weight));
        assert!((-1.0..1.0).contains(&g.synapse(bc).weight));
        assert!((-1.0..1.0).contains(&g.synapse(dc).weight));
        assert_eq!(g.synapse(dc).gater(), Some(b));
        assert_eq!(g.synapse(g.neuron(b).self_connection()).weight, 0.5);
    }

    #[test]
    fn census_counts_self_connections_as_synapses() {
        let mut g = graph();
        let a = g.add_neuron();
        let b = g.add_neuron();
        g.project(a, b, None);

        let census = g.census();
        assert_eq!(census.neurons, 2);
        assert_eq!(census.synapses, 3);
    }

    #[test]
    fn same_seed_builds_identical_graphs() {
        let build = || {
            let mut g = graph();
            let a = g.add_neuron();
            let b = g.add_neuron();
            g.project(a, b, None);
            g
        };
        let (g1, g2) = (build(), build());
        assert_eq!(g1.neurons(), g2.neurons());
        assert_eq!(g1.synapses(), g2.synapses());
    }

    #[test]
    fn invalid_config_falls_back_to_defaults() {
        assert!(Graph::try_new(GraphConfig::default().with_learning_rate(-1.0)).is_err());
        let g = Graph::new(GraphConfig::default().with_learning_rate(-1.0).with_seed(3));
        assert_eq!(g.config().learning_rate, 0.1);
        assert_eq!(g.config().seed, Some(3));
    }
}
