use thiserror::Error;

use crate::neuron::NeuronId;
use crate::synapse::SynapseId;

/// Errors surfaced at the graph/layer boundary.
///
/// All of these are argument-validation failures; the engine never retries or
/// repairs anything.
#[derive(Debug, Error)]
pub enum GraphError {
    #[error("input size {actual} does not match layer size {expected}")]
    InputSizeMismatch { expected: usize, actual: usize },

    #[error("target size {actual} does not match layer size {expected}")]
    TargetSizeMismatch { expected: usize, actual: usize },

    /// One-to-one projection or gating between groups of different sizes.
    #[error("layer size {actual} does not match required size {expected}")]
    LayerSizeMismatch { expected: usize, actual: usize },

    #[error("synapse {synapse} is already gated by neuron {gater}")]
    AlreadyGated { synapse: SynapseId, gater: NeuronId },

    #[error("invalid config: {0}")]
    InvalidConfig(&'static str),

    #[cfg(feature = "serde")]
    #[error("invalid config json: {0}")]
    ConfigJson(#[from] serde_json::Error),
}
