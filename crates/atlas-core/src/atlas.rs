// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use crate::canonical::content_hash;
use crate::{AtlasError, VectorId};
use serde::{Deserialize, Serialize};

/// Atlas artifact schema version.
pub const ATLAS_VERSION: &str = "1.0";

/// Trend direction of a jetstream segment.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendDirection {
    Up,
    Down,
}

impl TrendDirection {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Up => "up",
            Self::Down => "down",
        }
    }
}

/// Rotation sense of a cyclone window.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RotationDirection {
    Cw,
    Ccw,
}

/// Per-(vector, window) intensity and window-over-window gradient.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PressureCell {
    pub cell_id: String,
    pub vector: VectorId,
    pub window_utc: String,
    pub intensity: Option<f64>,
    pub gradient: Option<f64>,
    /// Motif co-occurrence edges attached by the upstream framing
    /// layer; empty when the atlas is built directly from a seedpack.
    #[serde(default)]
    pub motifs_present: Vec<String>,
    #[serde(default)]
    pub provenance_refs: Vec<String>,
}

/// A sustained single-vector directional run of at least three windows.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Jetstream {
    pub jet_id: String,
    pub vector: VectorId,
    pub window_span: Vec<String>,
    pub direction: TrendDirection,
    pub strength: f64,
    pub persistence: usize,
}

/// A window flagged anomalous by simultaneous positive gradients plus a
/// cross-domain echo signal.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Cyclone {
    pub cyclone_id: String,
    pub window_utc: String,
    pub center_vectors: Vec<VectorId>,
    pub rotation_direction: RotationDirection,
    pub domain_overlap: f64,
    pub coherence_score: Option<f64>,
    pub rarity_score: Option<f64>,
}

/// A sustained single-vector low-variance run of at least three windows.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CalmZone {
    pub zone_id: String,
    pub vector: VectorId,
    pub window_span: Vec<String>,
    pub stability_score: f64,
}

/// A carried-through cross-domain co-activation grouping.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SynchronicityCluster {
    pub cluster_id: String,
    pub domains: Vec<String>,
    pub vectors: Vec<VectorId>,
    pub time_window: String,
    pub density_score: Option<f64>,
    #[serde(default)]
    pub provenance_refs: Vec<String>,
}

/// Audit record binding an atlas to its input and run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AtlasProvenance {
    pub seedpack_hash: String,
    pub run_id: String,
    pub atlas_hash: String,
}

/// The assembled summary artifact over one seedpack.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AtlasPack {
    pub atlas_version: String,
    pub year: i32,
    pub window_granularity: String,
    pub frames_count: usize,
    pub pressure_cells: Vec<PressureCell>,
    pub jetstreams: Vec<Jetstream>,
    pub cyclones: Vec<Cyclone>,
    pub calm_zones: Vec<CalmZone>,
    pub synchronicity_clusters: Vec<SynchronicityCluster>,
    pub provenance: AtlasProvenance,
}

impl AtlasPack {
    /// Parses and shape-checks an atlas document.
    pub fn from_json(raw: &str) -> Result<Self, AtlasError> {
        serde_json::from_str(raw)
            .map_err(|err| AtlasError::invalid_input(format!("invalid atlas JSON: {err}")))
    }

    /// Content hash over the canonical payload with the stored hash blanked.
    pub fn compute_hash(&self) -> Result<String, AtlasError> {
        let mut unsealed = self.clone();
        unsealed.provenance.atlas_hash = String::new();
        content_hash(&unsealed)
    }

    /// Writes the computed hash back into provenance.
    pub fn seal(mut self) -> Result<Self, AtlasError> {
        self.provenance.atlas_hash = self.compute_hash()?;
        Ok(self)
    }

    /// True when the stored hash matches a recomputation.
    pub fn verify_hash(&self) -> Result<bool, AtlasError> {
        Ok(self.compute_hash()? == self.provenance.atlas_hash)
    }
}
