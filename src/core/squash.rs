use core::fmt;
use core::str::FromStr;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Activation ("squash") function applied to a neuron's pre-activation state.
///
/// Both `value` and `derivative` are evaluated at the state itself, not at the
/// squashed output.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Squash {
    /// 1 / (1 + e^-x).
    #[default]
    Logistic,
    Tanh,
    Identity,
    /// Step at zero. Its derivative is reported as 1 (straight-through) so a
    /// hard-limit unit still passes error upstream.
    #[cfg_attr(feature = "serde", serde(rename = "hlim"))]
    HardLimit,
    Relu,
}

impl Squash {
    pub const ALL: [Squash; 5] = [
        Squash::Logistic,
        Squash::Tanh,
        Squash::Identity,
        Squash::HardLimit,
        Squash::Relu,
    ];

    #[inline]
    pub fn value(self, x: f64) -> f64 {
        match self {
            Squash::Logistic => 1.0 / (1.0 + (-x).exp()),
            Squash::Tanh => x.tanh(),
            Squash::Identity => x,
            Squash::HardLimit => {
                if x > 0.0 {
                    1.0
                } else {
                    0.0
                }
            }
            Squash::Relu => {
                if x > 0.0 {
                    x
                } else {
                    0.0
                }
            }
        }
    }

    #[inline]
    pub fn derivative(self, x: f64) -> f64 {
        match self {
            Squash::Logistic => {
                let fx = self.value(x);
                fx * (1.0 - fx)
            }
            Squash::Tanh => {
                let t = x.tanh();
                1.0 - t * t
            }
            Squash::Identity | Squash::HardLimit => 1.0,
            Squash::Relu => {
                if x > 0.0 {
                    1.0
                } else {
                    0.0
                }
            }
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Squash::Logistic => "logistic",
            Squash::Tanh => "tanh",
            Squash::Identity => "identity",
            Squash::HardLimit => "hlim",
            Squash::Relu => "relu",
        }
    }
}

impl fmt::Display for Squash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown squash function: {0}")]
pub struct UnknownSquash(pub String);

impl FromStr for Squash {
    type Err = UnknownSquash;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Squash::ALL
            .into_iter()
            .find(|sq| sq.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| UnknownSquash(s.to_string()))
    }
}
