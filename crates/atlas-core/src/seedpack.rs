// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use crate::{AtlasError, VectorId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Seedpack schema version accepted by the loader.
pub const SEEDPACK_SCHEMA_VERSION: &str = "1.0";

/// Metric key carrying the cross-domain echo signal.
pub const CDEC_METRIC: &str = "CDEC";

/// One time-windowed observation from a single domain.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    pub window_start_utc: String,
    pub window_end_utc: String,
    pub domain: String,
    #[serde(default)]
    pub vectors: BTreeMap<VectorId, VectorReading>,
    #[serde(default)]
    pub provenance_refs: Vec<String>,
}

/// Per-vector score inside a frame; absent observations stay `None`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct VectorReading {
    pub score: Option<f64>,
}

/// Externally supplied influence metrics, keyed by domain.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct InfluenceBundle {
    #[serde(default)]
    pub ics: BTreeMap<String, BTreeMap<String, f64>>,
}

impl InfluenceBundle {
    /// Maximum cross-domain echo value found anywhere in the bundle.
    ///
    /// Missing data reads as 0.0, never as an error.
    pub fn max_cdec(&self) -> f64 {
        self.ics
            .values()
            .filter_map(|metrics| metrics.get(CDEC_METRIC))
            .copied()
            .fold(0.0, f64::max)
    }
}

/// Externally detected cross-domain co-activation envelope.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SynchronicityEnvelope {
    pub domains_involved: Vec<String>,
    pub vectors_activated: Vec<VectorId>,
    #[serde(default)]
    pub metrics: BTreeMap<String, f64>,
    pub time_window: String,
    #[serde(default)]
    pub rarity_estimate: Option<f64>,
    #[serde(default)]
    pub provenance_refs: Vec<String>,
}

impl SynchronicityEnvelope {
    pub fn metric(&self, key: &str) -> Option<f64> {
        self.metrics.get(key).copied()
    }
}

/// Envelope collection wrapper.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SynchronicityBundle {
    #[serde(default)]
    pub envelopes: Vec<SynchronicityEnvelope>,
}

/// Full atlas input: frames plus influence and synchronicity context.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Seedpack {
    pub schema_version: String,
    pub year: i32,
    #[serde(default = "default_window_granularity")]
    pub window_granularity: String,
    #[serde(default)]
    pub frames: Vec<Frame>,
    #[serde(default)]
    pub influence: InfluenceBundle,
    #[serde(default)]
    pub synchronicity: SynchronicityBundle,
}

fn default_window_granularity() -> String {
    "weekly".to_string()
}

impl Seedpack {
    /// Parses and validates a seedpack document.
    pub fn from_json(raw: &str) -> Result<Self, AtlasError> {
        let seedpack: Seedpack = serde_json::from_str(raw)
            .map_err(|err| AtlasError::invalid_input(format!("invalid seedpack JSON: {err}")))?;
        seedpack.validate()?;
        Ok(seedpack)
    }

    /// Rejects unsupported schema versions and non-finite scores.
    ///
    /// Missing scores are data, not errors; only numbers that cannot be
    /// canonicalized are refused here.
    pub fn validate(&self) -> Result<(), AtlasError> {
        if self.schema_version != SEEDPACK_SCHEMA_VERSION {
            return Err(AtlasError::invalid_input(format!(
                "unsupported seedpack schema_version '{}'; expected '{SEEDPACK_SCHEMA_VERSION}'",
                self.schema_version
            )));
        }
        if self.window_granularity.trim().is_empty() {
            return Err(AtlasError::invalid_input(
                "seedpack window_granularity must be non-empty",
            ));
        }
        for (index, frame) in self.frames.iter().enumerate() {
            if frame.window_start_utc.trim().is_empty() || frame.window_end_utc.trim().is_empty() {
                return Err(AtlasError::invalid_input(format!(
                    "frame {index} has an empty window bound"
                )));
            }
            for (vector, reading) in &frame.vectors {
                if let Some(score) = reading.score {
                    if !score.is_finite() {
                        return Err(AtlasError::numerical_issue(format!(
                            "frame {index} vector {vector} has non-finite score {score}"
                        )));
                    }
                }
            }
        }
        Ok(())
    }
}
