// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use crate::watchlist::{WATCH_SCHEMA_VERSION, Watchlist, WatchlistCluster, WatchlistEdge};
use atlas_core::{AtlasError, content_hash, round6};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Separator between the two motif endpoints of an edge string.
pub const EDGE_SEPARATOR: &str = "--";

const DEFAULT_TOP_K_EDGES_CONSIDERED: usize = 200;
const DEFAULT_BRIDGE_EDGE_MIN_SCORE: f64 = 0.35;
const DEFAULT_BRIDGE_EDGE_MIN_PERSISTENCE: usize = 3;
const DEFAULT_BRIDGE_NODE_MIN_DEGREE: usize = 2;
const DEFAULT_ALERT_MIN_SCORE_DELTA: f64 = 0.10;
const DEFAULT_ALERT_MIN_PERSISTENCE_DELTA: i64 = 1;

/// Thresholds for bridge derivation and alert emission.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DeformationConfig {
    pub top_k_edges_considered: usize,
    pub bridge_edge_min_score: f64,
    pub bridge_edge_min_persistence: usize,
    pub bridge_node_min_degree: usize,
    pub alert_min_score_delta: f64,
    pub alert_min_persistence_delta: i64,
}

impl Default for DeformationConfig {
    fn default() -> Self {
        Self {
            top_k_edges_considered: DEFAULT_TOP_K_EDGES_CONSIDERED,
            bridge_edge_min_score: DEFAULT_BRIDGE_EDGE_MIN_SCORE,
            bridge_edge_min_persistence: DEFAULT_BRIDGE_EDGE_MIN_PERSISTENCE,
            bridge_node_min_degree: DEFAULT_BRIDGE_NODE_MIN_DEGREE,
            alert_min_score_delta: DEFAULT_ALERT_MIN_SCORE_DELTA,
            alert_min_persistence_delta: DEFAULT_ALERT_MIN_PERSISTENCE_DELTA,
        }
    }
}

impl DeformationConfig {
    pub fn validate(&self) -> Result<(), AtlasError> {
        if self.top_k_edges_considered == 0 {
            return Err(AtlasError::invalid_input(
                "DeformationConfig.top_k_edges_considered must be >= 1; got 0",
            ));
        }
        if self.bridge_node_min_degree == 0 {
            return Err(AtlasError::invalid_input(
                "DeformationConfig.bridge_node_min_degree must be >= 1; got 0",
            ));
        }
        if !self.bridge_edge_min_score.is_finite() || self.bridge_edge_min_score < 0.0 {
            return Err(AtlasError::invalid_input(format!(
                "DeformationConfig.bridge_edge_min_score must be finite and >= 0.0; got {}",
                self.bridge_edge_min_score
            )));
        }
        if !self.alert_min_score_delta.is_finite() || self.alert_min_score_delta < 0.0 {
            return Err(AtlasError::invalid_input(format!(
                "DeformationConfig.alert_min_score_delta must be finite and >= 0.0; got {}",
                self.alert_min_score_delta
            )));
        }
        if self.alert_min_persistence_delta < 0 {
            return Err(AtlasError::invalid_input(format!(
                "DeformationConfig.alert_min_persistence_delta must be >= 0; got {}",
                self.alert_min_persistence_delta
            )));
        }
        Ok(())
    }
}

/// A motif meeting the bridge degree threshold.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BridgeNode {
    pub id: String,
    pub degree: usize,
}

/// Provenance shared by the three deformation artifacts.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DeformationProvenance {
    pub watchlist_hash: String,
    pub run_id: String,
}

/// Structurally connective edges and motifs within the watchlist.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BridgeSet {
    pub schema_version: String,
    pub shadow_only: bool,
    pub not_computable: bool,
    pub bridge_nodes: Vec<BridgeNode>,
    pub bridge_edges: Vec<String>,
    pub provenance: DeformationProvenance,
    pub bridge_hash: String,
}

impl BridgeSet {
    pub fn compute_hash(&self) -> Result<String, AtlasError> {
        let mut unsealed = self.clone();
        unsealed.bridge_hash = String::new();
        content_hash(&unsealed)
    }

    pub fn seal(mut self) -> Result<Self, AtlasError> {
        self.bridge_hash = self.compute_hash()?;
        Ok(self)
    }

    pub fn verify_hash(&self) -> Result<bool, AtlasError> {
        Ok(self.compute_hash()? == self.bridge_hash)
    }
}

/// Alert classification: first sighting vs. measured movement.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertKind {
    New,
    Delta,
}

/// Significant movement of one ranked edge between snapshots.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EdgeAlert {
    pub edge: String,
    pub alert_type: AlertKind,
    pub score_delta: f64,
    pub persistence_delta: i64,
}

/// Significant density movement of one ranked cluster.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ClusterAlert {
    pub cluster_id: String,
    pub alert_type: AlertKind,
    pub density_delta: f64,
}

/// Alerts derived from a (current, previous) watchlist pair.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Alerts {
    pub schema_version: String,
    pub shadow_only: bool,
    pub not_computable: bool,
    pub edge_alerts: Vec<EdgeAlert>,
    pub cluster_alerts: Vec<ClusterAlert>,
    pub provenance: DeformationProvenance,
    pub alerts_hash: String,
}

impl Alerts {
    pub fn compute_hash(&self) -> Result<String, AtlasError> {
        let mut unsealed = self.clone();
        unsealed.alerts_hash = String::new();
        content_hash(&unsealed)
    }

    pub fn seal(mut self) -> Result<Self, AtlasError> {
        self.alerts_hash = self.compute_hash()?;
        Ok(self)
    }

    pub fn verify_hash(&self) -> Result<bool, AtlasError> {
        Ok(self.compute_hash()? == self.alerts_hash)
    }
}

/// Counts-only summary of one deformation pass.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DeformationReport {
    pub schema_version: String,
    pub shadow_only: bool,
    pub not_computable: bool,
    pub edges_considered: usize,
    pub bridge_edge_count: usize,
    pub bridge_node_count: usize,
    pub new_edge_alerts: usize,
    pub delta_edge_alerts: usize,
    pub cluster_alerts: usize,
    pub provenance: DeformationProvenance,
    pub report_hash: String,
}

impl DeformationReport {
    pub fn compute_hash(&self) -> Result<String, AtlasError> {
        let mut unsealed = self.clone();
        unsealed.report_hash = String::new();
        content_hash(&unsealed)
    }

    pub fn seal(mut self) -> Result<Self, AtlasError> {
        self.report_hash = self.compute_hash()?;
        Ok(self)
    }

    pub fn verify_hash(&self) -> Result<bool, AtlasError> {
        Ok(self.compute_hash()? == self.report_hash)
    }
}

/// The three artifacts of one deformation pass.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DeformationBundle {
    pub bridge_set: BridgeSet,
    pub alerts: Alerts,
    pub report: DeformationReport,
}

/// Normalized (lexicographic) endpoints of an edge string, when it
/// splits into exactly two non-empty motifs.
fn edge_endpoints(edge: &str) -> Option<(&str, &str)> {
    let (left, right) = edge.split_once(EDGE_SEPARATOR)?;
    if left.is_empty() || right.is_empty() {
        return None;
    }
    if left <= right {
        Some((left, right))
    } else {
        Some((right, left))
    }
}

/// Derives the bridge set, alerts, and summary report from a current
/// watchlist and an optional previous snapshot.
pub fn derive_deformation(
    current: &Watchlist,
    previous: Option<&Watchlist>,
    config: &DeformationConfig,
    run_id: &str,
) -> Result<DeformationBundle, AtlasError> {
    config.validate()?;

    let provenance = DeformationProvenance {
        watchlist_hash: current.watchlist_hash.clone(),
        run_id: run_id.to_string(),
    };

    let considered: Vec<_> = current
        .edges_top
        .iter()
        .take(config.top_k_edges_considered)
        .collect();
    let candidates: Vec<_> = considered
        .iter()
        .filter(|edge| {
            edge.score >= config.bridge_edge_min_score
                && edge.persistence >= config.bridge_edge_min_persistence
        })
        .copied()
        .collect();

    let mut degrees: BTreeMap<&str, usize> = BTreeMap::new();
    for edge in &candidates {
        if let Some((left, right)) = edge_endpoints(&edge.edge) {
            *degrees.entry(left).or_insert(0) += 1;
            if right != left {
                *degrees.entry(right).or_insert(0) += 1;
            }
        }
    }

    let bridge_edges: Vec<String> = candidates
        .iter()
        .filter(|edge| {
            edge_endpoints(&edge.edge).is_some_and(|(left, right)| {
                degrees.get(left).copied().unwrap_or(0) >= config.bridge_node_min_degree
                    || degrees.get(right).copied().unwrap_or(0) >= config.bridge_node_min_degree
            })
        })
        .map(|edge| edge.edge.clone())
        .collect();

    let mut bridge_nodes: Vec<BridgeNode> = degrees
        .into_iter()
        .filter(|(_, degree)| *degree >= config.bridge_node_min_degree)
        .map(|(id, degree)| BridgeNode {
            id: id.to_string(),
            degree,
        })
        .collect();
    bridge_nodes.sort_by(|a, b| b.degree.cmp(&a.degree).then_with(|| a.id.cmp(&b.id)));

    let bridge_set = BridgeSet {
        schema_version: WATCH_SCHEMA_VERSION.to_string(),
        shadow_only: true,
        not_computable: current.not_computable,
        bridge_nodes,
        bridge_edges,
        provenance: provenance.clone(),
        bridge_hash: String::new(),
    }
    .seal()?;

    let alerts = derive_alerts(current, previous, config, provenance.clone())?;

    let report = DeformationReport {
        schema_version: WATCH_SCHEMA_VERSION.to_string(),
        shadow_only: true,
        not_computable: current.not_computable,
        edges_considered: considered.len(),
        bridge_edge_count: bridge_set.bridge_edges.len(),
        bridge_node_count: bridge_set.bridge_nodes.len(),
        new_edge_alerts: alerts
            .edge_alerts
            .iter()
            .filter(|alert| alert.alert_type == AlertKind::New)
            .count(),
        delta_edge_alerts: alerts
            .edge_alerts
            .iter()
            .filter(|alert| alert.alert_type == AlertKind::Delta)
            .count(),
        cluster_alerts: alerts.cluster_alerts.len(),
        provenance,
        report_hash: String::new(),
    }
    .seal()?;

    tracing::debug!(
        bridges = report.bridge_edge_count,
        edge_alerts = report.new_edge_alerts + report.delta_edge_alerts,
        cluster_alerts = report.cluster_alerts,
        "deformation derived"
    );
    Ok(DeformationBundle {
        bridge_set,
        alerts,
        report,
    })
}

fn derive_alerts(
    current: &Watchlist,
    previous: Option<&Watchlist>,
    config: &DeformationConfig,
    provenance: DeformationProvenance,
) -> Result<Alerts, AtlasError> {
    let Some(previous) = previous else {
        // No earlier snapshot: there is nothing to measure against.
        return Alerts {
            schema_version: WATCH_SCHEMA_VERSION.to_string(),
            shadow_only: true,
            not_computable: true,
            edge_alerts: vec![],
            cluster_alerts: vec![],
            provenance,
            alerts_hash: String::new(),
        }
        .seal();
    };

    let previous_edges: BTreeMap<&str, &WatchlistEdge> = previous
        .edges_top
        .iter()
        .map(|edge| (edge.edge.as_str(), edge))
        .collect();
    let previous_clusters: BTreeMap<&str, &WatchlistCluster> = previous
        .clusters_top
        .iter()
        .map(|cluster| (cluster.cluster_id.as_str(), cluster))
        .collect();

    let mut edge_alerts = Vec::new();
    for edge in &current.edges_top {
        let (alert_type, score_delta, persistence_delta) =
            match previous_edges.get(edge.edge.as_str()) {
                None => (AlertKind::New, edge.score, edge.persistence as i64),
                Some(before) => (
                    AlertKind::Delta,
                    edge.score - before.score,
                    edge.persistence as i64 - before.persistence as i64,
                ),
            };
        if score_delta.abs() >= config.alert_min_score_delta
            || persistence_delta.abs() >= config.alert_min_persistence_delta
        {
            edge_alerts.push(EdgeAlert {
                edge: edge.edge.clone(),
                alert_type,
                score_delta: round6(score_delta),
                persistence_delta,
            });
        }
    }

    let mut cluster_alerts = Vec::new();
    for cluster in &current.clusters_top {
        let (alert_type, density_delta) = match previous_clusters.get(cluster.cluster_id.as_str())
        {
            None => (AlertKind::New, cluster.mean_density),
            Some(before) => (AlertKind::Delta, cluster.mean_density - before.mean_density),
        };
        if density_delta.abs() >= config.alert_min_score_delta {
            cluster_alerts.push(ClusterAlert {
                cluster_id: cluster.cluster_id.clone(),
                alert_type,
                density_delta: round6(density_delta),
            });
        }
    }

    Alerts {
        schema_version: WATCH_SCHEMA_VERSION.to_string(),
        shadow_only: true,
        not_computable: false,
        edge_alerts,
        cluster_alerts,
        provenance,
        alerts_hash: String::new(),
    }
    .seal()
}
