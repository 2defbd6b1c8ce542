use core::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::neuron::NeuronId;

/// Index of a synapse inside its graph. Assigned in creation order, never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SynapseId(pub(crate) usize);

impl SynapseId {
    #[inline]
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for SynapseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "s{}", self.0)
    }
}

/// Type alias for connection weights.
pub type Weight = f64;

/// Directed, weighted edge between two neurons.
///
/// Endpoints and gater are fixed by the graph; only `weight` and `gain` are
/// meant to be touched from outside. `gain` is overwritten by the gater's
/// activation every time the gater activates.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Synapse {
    id: SynapseId,
    from: NeuronId,
    to: NeuronId,
    pub weight: Weight,
    pub gain: f64,
    gater: Option<NeuronId>,
}

impl Synapse {
    pub(crate) fn new(id: SynapseId, from: NeuronId, to: NeuronId, weight: Weight) -> Self {
        Self {
            id,
            from,
            to,
            weight,
            gain: 1.0,
            gater: None,
        }
    }

    pub fn id(&self) -> SynapseId {
        self.id
    }

    pub fn from(&self) -> NeuronId {
        self.from
    }

    pub fn to(&self) -> NeuronId {
        self.to
    }

    pub fn gater(&self) -> Option<NeuronId> {
        self.gater
    }

    pub fn is_gated(&self) -> bool {
        self.gater.is_some()
    }

    pub fn is_self_connection(&self) -> bool {
        self.from == self.to
    }

    /// Touches `gater` only; the gater's own bookkeeping lives on the neuron.
    pub(crate) fn set_gater(&mut self, gater: NeuronId) {
        self.gater = Some(gater);
    }
}
