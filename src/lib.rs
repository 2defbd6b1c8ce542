//! # gatenet
//!
//! A graph-structured neural network engine with gated synapses.
//!
//! Neurons are vertices holding activation state, synapses are weighted,
//! gateable directed edges, and learning is online: a forward activation
//! followed by error propagation that uses eligibility traces, so connections
//! gated by another neuron's activation train without unrolling time.
//!
//! ## Quick Start
//!
//! ```
//! use gatenet::prelude::*;
//!
//! let mut graph = Graph::new(GraphConfig::default().with_seed(42));
//! let mut input = Layer::new(&mut graph, 2);
//! let output = Layer::new(&mut graph, 1);
//! input
//!     .project(&mut graph, LayerTarget::Layer(&output), None, None)
//!     .unwrap();
//!
//! // One training step.
//! input.activate(&mut graph, Some(&[1.0, 0.0])).unwrap();
//! let out = output.activate(&mut graph, None).unwrap();
//! output.propagate(&mut graph, 0.1, Some(&[1.0])).unwrap();
//! assert_eq!(out.len(), 1);
//! ```
//!
//! The engine does not order anything itself: activate layers upstream first,
//! then propagate them in reverse.
//!
//! ## Feature Flags
//!
//! - `serde` (default): Serialize/Deserialize for records and JSON config loading
//!
//! ## Modules
//!
//! - [`graph`]: Neuron/synapse arena and the per-neuron operations
//! - [`neuron`]: Neuron records, activation and learning
//! - [`synapse`]: Synapse records
//! - [`layer`]: Layers, connection patterns and gate patterns
//! - [`squash`]: Activation functions
//! - [`config`]: Graph configuration

#[path = "core/config.rs"]
pub mod config;

#[path = "core/error.rs"]
pub mod error;

#[path = "core/graph.rs"]
pub mod graph;

#[path = "core/layer.rs"]
pub mod layer;

#[path = "core/neuron.rs"]
pub mod neuron;

#[path = "core/prng.rs"]
pub mod prng;

#[path = "core/squash.rs"]
pub mod squash;

#[path = "core/synapse.rs"]
pub mod synapse;

/// Prelude module for convenient imports.
///
/// ```
/// use gatenet::prelude::*;
/// ```
pub mod prelude {
    pub use crate::config::{GraphConfig, DEFAULT_LEARNING_RATE};
    pub use crate::error::GraphError;
    pub use crate::graph::{Census, Graph};
    pub use crate::layer::{
        ConnectionType, GateType, Layer, LayerConnection, LayerId, LayerTarget, Topology,
    };
    pub use crate::neuron::{
        ConnectionKind, ConnectionSets, Connectivity, ErrorTerms, Neuron, NeuronId, Traces,
    };
    pub use crate::squash::Squash;
    pub use crate::synapse::{Synapse, SynapseId, Weight};
}
