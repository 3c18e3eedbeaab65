// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use atlas_core::{AtlasError, VectorId, content_hash};
use serde::{Deserialize, Serialize};

/// Delta artifact schema version.
pub const DELTA_VERSION: &str = "1.0";

/// Per-(vector, window) intensity/gradient movement between two atlases.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DeltaPressure {
    pub vector: VectorId,
    pub window_utc: String,
    pub delta_intensity: Option<f64>,
    pub delta_gradient: Option<f64>,
    pub appeared: bool,
    pub disappeared: bool,
    #[serde(default)]
    pub provenance_refs: Vec<String>,
}

/// Trend-segment movement, keyed by the sorted involved-vector set.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DeltaJetstream {
    pub vectors_involved: Vec<VectorId>,
    pub delta_strength: Option<f64>,
    pub delta_persistence: Option<i64>,
    pub appeared: bool,
    pub disappeared: bool,
}

/// Anomaly-window movement from overlap-matched cyclone pairs.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DeltaCyclone {
    pub base_cyclone_id: Option<String>,
    pub compare_cyclone_id: Option<String>,
    pub center_vectors: Vec<VectorId>,
    pub overlap_ratio: Option<f64>,
    pub delta_domain_overlap: Option<f64>,
    pub appeared: bool,
    pub disappeared: bool,
}

/// Stability-segment movement, keyed by the sorted suppressed-vector set.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DeltaCalmZone {
    pub vectors_suppressed: Vec<VectorId>,
    pub delta_stability: Option<f64>,
    pub appeared: bool,
    pub disappeared: bool,
}

/// Co-activation cluster movement, keyed by sorted domains and vectors.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DeltaCluster {
    pub domains: Vec<String>,
    pub vectors: Vec<VectorId>,
    pub delta_density: Option<f64>,
    pub appeared: bool,
    pub disappeared: bool,
}

/// Audit record for a delta computation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DeltaProvenance {
    pub run_id: String,
    pub delta_hash: String,
}

/// The full diff artifact between an aligned (base, compare) atlas pair.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DeltaAtlasPack {
    pub delta_version: String,
    pub base_atlas_hash: String,
    pub compare_atlas_hash: String,
    pub comparison_label: String,
    pub window_granularity: String,
    pub frames_count: usize,
    pub delta_pressures: Vec<DeltaPressure>,
    pub delta_jetstreams: Vec<DeltaJetstream>,
    pub delta_cyclones: Vec<DeltaCyclone>,
    pub delta_calm_zones: Vec<DeltaCalmZone>,
    pub delta_synchronicity_clusters: Vec<DeltaCluster>,
    pub provenance: DeltaProvenance,
}

impl DeltaAtlasPack {
    pub fn from_json(raw: &str) -> Result<Self, AtlasError> {
        serde_json::from_str(raw)
            .map_err(|err| AtlasError::invalid_input(format!("invalid delta JSON: {err}")))
    }

    /// Content hash over the canonical payload with the stored hash blanked.
    pub fn compute_hash(&self) -> Result<String, AtlasError> {
        let mut unsealed = self.clone();
        unsealed.provenance.delta_hash = String::new();
        content_hash(&unsealed)
    }

    pub fn seal(mut self) -> Result<Self, AtlasError> {
        self.provenance.delta_hash = self.compute_hash()?;
        Ok(self)
    }

    pub fn verify_hash(&self) -> Result<bool, AtlasError> {
        Ok(self.compute_hash()? == self.provenance.delta_hash)
    }
}
