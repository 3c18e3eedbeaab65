// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use crate::AtlasError;

/// Number of canonical measurement vectors scored per window.
pub const VECTOR_COUNT: usize = 15;

/// The fixed set of semantic measurement vectors.
///
/// Variant order is alphabetical and is the canonical iteration order
/// everywhere a per-vector pass must be deterministic.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum VectorId {
    Anomaly,
    Attention,
    Cohesion,
    Density,
    Drift,
    Entropy,
    Flux,
    Momentum,
    Polarity,
    Resonance,
    Salience,
    Turbulence,
    Valence,
    Velocity,
    Volatility,
}

impl VectorId {
    /// All vectors in canonical (alphabetical) order.
    pub const ALL: [VectorId; VECTOR_COUNT] = [
        VectorId::Anomaly,
        VectorId::Attention,
        VectorId::Cohesion,
        VectorId::Density,
        VectorId::Drift,
        VectorId::Entropy,
        VectorId::Flux,
        VectorId::Momentum,
        VectorId::Polarity,
        VectorId::Resonance,
        VectorId::Salience,
        VectorId::Turbulence,
        VectorId::Valence,
        VectorId::Velocity,
        VectorId::Volatility,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Anomaly => "anomaly",
            Self::Attention => "attention",
            Self::Cohesion => "cohesion",
            Self::Density => "density",
            Self::Drift => "drift",
            Self::Entropy => "entropy",
            Self::Flux => "flux",
            Self::Momentum => "momentum",
            Self::Polarity => "polarity",
            Self::Resonance => "resonance",
            Self::Salience => "salience",
            Self::Turbulence => "turbulence",
            Self::Valence => "valence",
            Self::Velocity => "velocity",
            Self::Volatility => "volatility",
        }
    }

    pub fn parse(raw: &str) -> Result<Self, AtlasError> {
        Self::ALL
            .into_iter()
            .find(|vector| vector.as_str() == raw)
            .ok_or_else(|| {
                AtlasError::invalid_input(format!("unknown vector id '{raw}'"))
            })
    }
}

impl std::fmt::Display for VectorId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
