//! Gated connections and self-recurrence across whole activate/propagate steps.

use approx::assert_relative_eq;
use gatenet::prelude::*;

fn graph(seed: u64) -> Graph {
    Graph::new(GraphConfig::default().with_seed(seed))
}

#[test]
fn gate_activation_scales_the_gated_term() {
    let mut g = graph(21);
    let a = g.add_neuron();
    let gate = g.add_neuron();
    let b = g.add_neuron_with(Squash::Identity);
    let other = g.add_neuron();

    let s = g.project(a, b, Some(0.6));
    let plain = g.project(other, b, Some(-0.4));
    g.gate(gate, s).unwrap();

    g.activate(a, Some(0.9));
    g.activate(other, Some(0.5));
    let ga = g.activate(gate, None);
    assert_eq!(g.synapse(s).gain, ga);
    assert_eq!(g.synapse(plain).gain, 1.0);

    let bias = g.neuron(b).bias;
    let out = g.activate(b, None);
    assert_relative_eq!(out, bias + 0.6 * ga * 0.9 + (-0.4) * 0.5, epsilon = 1e-12);
}

#[test]
fn gated_self_connection_holds_state_when_gate_is_open() {
    let mut g = graph(4);
    let x = g.add_neuron();
    let keep = g.add_neuron_with(Squash::Identity);
    let cell = g.add_neuron_with(Squash::Identity);

    let write = g.project(x, cell, Some(1.0));
    let memory = g.project(cell, cell, Some(1.0));
    g.gate(keep, memory).unwrap();
    g.neuron_mut(cell).bias = 0.0;
    g.neuron_mut(keep).bias = 0.0;

    // Write 1.0 into the cell.
    g.activate(x, Some(1.0));
    g.activate(keep, None);
    g.activate(cell, None);
    assert_relative_eq!(g.neuron(cell).state, 1.0);

    // Input off, gate fully open: the cell keeps its value.
    g.neuron_mut(keep).bias = 1.0;
    g.activate(x, Some(0.0));
    g.activate(keep, None);
    assert_eq!(g.synapse(memory).gain, 1.0);
    g.activate(cell, None);
    assert_relative_eq!(g.neuron(cell).state, 1.0);

    // Gate closed: the cell forgets.
    g.neuron_mut(keep).bias = 0.0;
    g.activate(keep, None);
    g.activate(cell, None);
    assert_relative_eq!(g.neuron(cell).state, 0.0);

    // The write synapse's trace decays with the gated self-connection.
    assert!(g.neuron(cell).eligibility(write).is_some());
}

#[test]
fn gater_of_self_connection_sees_previous_state_as_influence() {
    let mut g = graph(8);
    let x = g.add_neuron();
    let keep = g.add_neuron();
    let cell = g.add_neuron_with(Squash::Identity);

    g.project(x, cell, Some(1.0));
    let into_keep = g.project(x, keep, Some(0.3));
    let memory = g.project(cell, cell, Some(0.5));
    g.gate(keep, memory).unwrap();

    g.activate(x, Some(1.0));
    g.activate(keep, None);
    g.activate(cell, None);
    g.activate(keep, None);

    // influence = old state of the cell + memory weight * cell activation.
    let cell_n = g.neuron(cell);
    let influence = cell_n.old_state + 0.5 * cell_n.activation;
    let keep_n = g.neuron(keep);
    let eligibility = keep_n.eligibility(into_keep).unwrap();
    assert_relative_eq!(eligibility, 1.0);

    let decay = g.synapse(memory).gain * 0.5;
    let traces = keep_n.traces();
    assert!(traces.extended.contains_key(&cell));
    assert_eq!(traces.influences[&cell], vec![memory]);
    let xt = keep_n.extended(cell, into_keep).unwrap();
    assert!(xt.is_finite());
    // Recompute one more step by hand.
    let before = xt;
    g.activate(keep, None);
    let keep_n = g.neuron(keep);
    let expected = decay * before + keep_n.derivative * eligibility * influence;
    assert_relative_eq!(
        keep_n.extended(cell, into_keep).unwrap(),
        expected,
        epsilon = 1e-12
    );
}

#[test]
fn training_through_a_gate_moves_the_gate_weights() {
    let mut g = graph(13);
    let mut input = Layer::new(&mut g, 2);
    let output = Layer::new(&mut g, 2);
    let gates = Layer::new(&mut g, 2);

    let mut conn = input
        .project(&mut g, LayerTarget::Layer(&output), Some(ConnectionType::OneToOne), None)
        .unwrap()
        .unwrap();
    input
        .project(&mut g, LayerTarget::Layer(&gates), None, None)
        .unwrap();
    gates.gate(&mut g, &mut conn, GateType::OneToOne).unwrap();

    let before: Vec<f64> = gates
        .neurons()
        .iter()
        .flat_map(|&n| g.neuron(n).connections().inputs.clone())
        .map(|s| g.synapse(s).weight)
        .collect();

    input.activate(&mut g, Some(&[1.0, 0.5])).unwrap();
    gates.activate(&mut g, None).unwrap();
    output.activate(&mut g, None).unwrap();
    output.propagate(&mut g, 0.1, Some(&[1.0, 0.0])).unwrap();
    gates.propagate(&mut g, 0.1, None).unwrap();

    let after: Vec<f64> = gates
        .neurons()
        .iter()
        .flat_map(|&n| g.neuron(n).connections().inputs.clone())
        .map(|s| g.synapse(s).weight)
        .collect();

    assert_eq!(before.len(), 4);
    assert!(before.iter().zip(&after).all(|(b, a)| b != a));
    for &n in gates.neurons() {
        let err = g.neuron(n).error();
        assert_eq!(err.projected, 0.0);
        assert_eq!(err.responsibility, err.gated);
        assert!(err.gated != 0.0);
    }
}
