// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use atlas_core::{
    AtlasError, SynchronicityBundle, SynchronicityCluster, VectorId, content_hash, round6,
};
use serde::Serialize;

/// Metric keys contributing to a cluster's density score.
const DENSITY_METRICS: [&str; 5] = ["TCI", "SIS", "CPA", "RAC", "PUR"];

/// The identity payload hashed into a `cluster_id`. Domains and vectors
/// are taken exactly as the envelope gives them; reordering them is an
/// upstream concern and produces a different cluster.
#[derive(Serialize)]
struct ClusterIdentity<'a> {
    domains: &'a [String],
    vectors: &'a [VectorId],
    time_window: &'a str,
}

/// Converts externally supplied envelopes into hashed, sorted clusters.
pub fn build_clusters(
    synchronicity: &SynchronicityBundle,
) -> Result<Vec<SynchronicityCluster>, AtlasError> {
    let mut clusters = Vec::with_capacity(synchronicity.envelopes.len());
    for envelope in &synchronicity.envelopes {
        let present: Vec<f64> = DENSITY_METRICS
            .iter()
            .filter_map(|key| envelope.metric(key))
            .collect();
        let density_score = if present.is_empty() {
            None
        } else {
            Some(round6(present.iter().sum::<f64>() / present.len() as f64))
        };

        let cluster_id = content_hash(&ClusterIdentity {
            domains: &envelope.domains_involved,
            vectors: &envelope.vectors_activated,
            time_window: &envelope.time_window,
        })?;

        clusters.push(SynchronicityCluster {
            cluster_id,
            domains: envelope.domains_involved.clone(),
            vectors: envelope.vectors_activated.clone(),
            time_window: envelope.time_window.clone(),
            density_score,
            provenance_refs: envelope.provenance_refs.clone(),
        });
    }
    clusters.sort_by(|a, b| a.cluster_id.cmp(&b.cluster_id));
    Ok(clusters)
}
