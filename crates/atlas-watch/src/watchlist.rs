// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use atlas_core::{AtlasError, AtlasPack, content_hash, round6};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Watch artifact schema version (shared by bridge set, alerts, report).
pub const WATCH_SCHEMA_VERSION: &str = "1.0";

const DEFAULT_MIN_PERSISTENCE: usize = 2;
const DEFAULT_MIN_DENSITY: f64 = 0.0;
const DEFAULT_WEIGHT_PERSISTENCE: f64 = 0.50;
const DEFAULT_WEIGHT_DENSITY: f64 = 0.30;
const DEFAULT_WEIGHT_INTENSITY: f64 = 0.20;
const DEFAULT_TOP_K_EDGES: usize = 200;
const DEFAULT_TOP_K_CLUSTERS: usize = 100;

/// Persistence saturates at this window count when normalized into a score.
const PERSISTENCE_SATURATION: f64 = 10.0;

/// Filters, weights, and truncation for watchlist ranking.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WatchlistConfig {
    pub min_persistence: usize,
    pub min_density: f64,
    pub weight_persistence: f64,
    pub weight_density: f64,
    pub weight_intensity: f64,
    pub top_k_edges: usize,
    pub top_k_clusters: usize,
}

impl Default for WatchlistConfig {
    fn default() -> Self {
        Self {
            min_persistence: DEFAULT_MIN_PERSISTENCE,
            min_density: DEFAULT_MIN_DENSITY,
            weight_persistence: DEFAULT_WEIGHT_PERSISTENCE,
            weight_density: DEFAULT_WEIGHT_DENSITY,
            weight_intensity: DEFAULT_WEIGHT_INTENSITY,
            top_k_edges: DEFAULT_TOP_K_EDGES,
            top_k_clusters: DEFAULT_TOP_K_CLUSTERS,
        }
    }
}

impl WatchlistConfig {
    pub fn validate(&self) -> Result<(), AtlasError> {
        if self.min_persistence < 1 {
            return Err(AtlasError::invalid_input(
                "WatchlistConfig.min_persistence must be >= 1; got 0",
            ));
        }
        if !self.min_density.is_finite() || self.min_density < 0.0 {
            return Err(AtlasError::invalid_input(format!(
                "WatchlistConfig.min_density must be finite and >= 0.0; got {}",
                self.min_density
            )));
        }
        for (name, weight) in [
            ("weight_persistence", self.weight_persistence),
            ("weight_density", self.weight_density),
            ("weight_intensity", self.weight_intensity),
        ] {
            if !weight.is_finite() || weight < 0.0 {
                return Err(AtlasError::invalid_input(format!(
                    "WatchlistConfig.{name} must be finite and >= 0.0; got {weight}"
                )));
            }
        }
        if self.top_k_edges == 0 {
            return Err(AtlasError::invalid_input(
                "WatchlistConfig.top_k_edges must be >= 1; got 0",
            ));
        }
        if self.top_k_clusters == 0 {
            return Err(AtlasError::invalid_input(
                "WatchlistConfig.top_k_clusters must be >= 1; got 0",
            ));
        }
        Ok(())
    }
}

/// A ranked motif co-occurrence edge.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WatchlistEdge {
    pub edge: String,
    pub persistence: usize,
    pub mean_density: f64,
    pub mean_intensity: f64,
    pub score: f64,
}

/// A ranked synchronicity cluster.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WatchlistCluster {
    pub cluster_id: String,
    pub persistence: usize,
    pub mean_density: f64,
    pub score: f64,
}

/// Count of one adjacent sorted-domain pair across the ranked clusters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DomainPair {
    pub domain_a: String,
    pub domain_b: String,
    pub count: usize,
}

/// Audit record binding a watch artifact to its source and run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WatchProvenance {
    pub atlas_hash: String,
    pub run_id: String,
}

/// Ranked shortlist over one atlas's internal topology.
///
/// `shadow_only` marks the artifact exploratory: downstream automation
/// must not consume it without explicit external promotion.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Watchlist {
    pub schema_version: String,
    pub shadow_only: bool,
    pub not_computable: bool,
    pub edges_top: Vec<WatchlistEdge>,
    pub clusters_top: Vec<WatchlistCluster>,
    pub domain_pairs: Vec<DomainPair>,
    pub provenance: WatchProvenance,
    pub watchlist_hash: String,
}

impl Watchlist {
    pub fn from_json(raw: &str) -> Result<Self, AtlasError> {
        serde_json::from_str(raw)
            .map_err(|err| AtlasError::invalid_input(format!("invalid watchlist JSON: {err}")))
    }

    pub fn compute_hash(&self) -> Result<String, AtlasError> {
        let mut unsealed = self.clone();
        unsealed.watchlist_hash = String::new();
        content_hash(&unsealed)
    }

    pub fn seal(mut self) -> Result<Self, AtlasError> {
        self.watchlist_hash = self.compute_hash()?;
        Ok(self)
    }

    pub fn verify_hash(&self) -> Result<bool, AtlasError> {
        Ok(self.compute_hash()? == self.watchlist_hash)
    }
}

fn clamp01(value: f64) -> f64 {
    value.clamp(0.0, 1.0)
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

#[derive(Default)]
struct EdgeAccumulator {
    windows: BTreeSet<String>,
    intensities: Vec<f64>,
    densities: Vec<f64>,
}

/// Extracts and ranks motif co-occurrence edges and clusters from one
/// atlas's pressure cells and synchronicity clusters.
pub fn rank_watchlist(
    atlas: &AtlasPack,
    config: &WatchlistConfig,
    run_id: &str,
) -> Result<Watchlist, AtlasError> {
    config.validate()?;

    let not_computable =
        atlas.pressure_cells.is_empty() && atlas.synchronicity_clusters.is_empty();

    // Max cluster density per time window.
    let mut density_by_window: BTreeMap<&str, f64> = BTreeMap::new();
    for cluster in &atlas.synchronicity_clusters {
        if let Some(density) = cluster.density_score {
            density_by_window
                .entry(cluster.time_window.as_str())
                .and_modify(|max| *max = max.max(density))
                .or_insert(density);
        }
    }

    let mut accumulators: BTreeMap<&str, EdgeAccumulator> = BTreeMap::new();
    for cell in &atlas.pressure_cells {
        for edge in &cell.motifs_present {
            let accumulator = accumulators.entry(edge.as_str()).or_default();
            accumulator.windows.insert(cell.window_utc.clone());
            if let Some(intensity) = cell.intensity {
                accumulator.intensities.push(intensity);
            }
            if let Some(density) = density_by_window.get(cell.window_utc.as_str()) {
                accumulator.densities.push(*density);
            }
        }
    }

    let mut edges_top: Vec<WatchlistEdge> = accumulators
        .into_iter()
        .filter_map(|(edge, accumulator)| {
            let persistence = accumulator.windows.len();
            let mean_density = mean(&accumulator.densities);
            if persistence < config.min_persistence || mean_density < config.min_density {
                return None;
            }
            let mean_intensity = mean(&accumulator.intensities);
            let score = config.weight_persistence
                * (persistence as f64 / PERSISTENCE_SATURATION).min(1.0)
                + config.weight_density * clamp01(mean_density)
                + config.weight_intensity * clamp01(mean_intensity);
            Some(WatchlistEdge {
                edge: edge.to_string(),
                persistence,
                mean_density: round6(mean_density),
                mean_intensity: round6(mean_intensity),
                score: round6(score),
            })
        })
        .collect();
    edges_top.sort_by(|a, b| {
        b.score
            .total_cmp(&a.score)
            .then_with(|| b.persistence.cmp(&a.persistence))
            .then_with(|| a.edge.cmp(&b.edge))
    });
    edges_top.truncate(config.top_k_edges);

    // Clusters are ranked in a single pass where each cluster counts as
    // one persistence unit; clusters without a density are unrankable.
    let mut clusters_top: Vec<WatchlistCluster> = atlas
        .synchronicity_clusters
        .iter()
        .filter_map(|cluster| {
            let density = cluster.density_score?;
            let persistence = 1usize;
            let score = density * (persistence as f64 / PERSISTENCE_SATURATION).min(1.0);
            Some(WatchlistCluster {
                cluster_id: cluster.cluster_id.clone(),
                persistence,
                mean_density: round6(density),
                score: round6(score),
            })
        })
        .collect();
    clusters_top.sort_by(|a, b| {
        b.score
            .total_cmp(&a.score)
            .then_with(|| a.cluster_id.cmp(&b.cluster_id))
    });
    clusters_top.truncate(config.top_k_clusters);

    let domain_pairs = count_domain_pairs(atlas, &clusters_top);

    let watchlist = Watchlist {
        schema_version: WATCH_SCHEMA_VERSION.to_string(),
        shadow_only: true,
        not_computable,
        edges_top,
        clusters_top,
        domain_pairs,
        provenance: WatchProvenance {
            atlas_hash: atlas.provenance.atlas_hash.clone(),
            run_id: run_id.to_string(),
        },
        watchlist_hash: String::new(),
    }
    .seal()?;

    tracing::debug!(
        edges = watchlist.edges_top.len(),
        clusters = watchlist.clusters_top.len(),
        not_computable = watchlist.not_computable,
        "watchlist ranked"
    );
    Ok(watchlist)
}

/// Counts adjacent sorted-domain pairs across the ranked clusters.
fn count_domain_pairs(atlas: &AtlasPack, ranked: &[WatchlistCluster]) -> Vec<DomainPair> {
    let by_id: BTreeMap<&str, &atlas_core::SynchronicityCluster> = atlas
        .synchronicity_clusters
        .iter()
        .map(|cluster| (cluster.cluster_id.as_str(), cluster))
        .collect();

    let mut counts: BTreeMap<(String, String), usize> = BTreeMap::new();
    for entry in ranked {
        let Some(cluster) = by_id.get(entry.cluster_id.as_str()) else {
            continue;
        };
        let mut domains = cluster.domains.clone();
        domains.sort();
        for pair in domains.windows(2) {
            *counts
                .entry((pair[0].clone(), pair[1].clone()))
                .or_insert(0) += 1;
        }
    }

    let mut pairs: Vec<DomainPair> = counts
        .into_iter()
        .map(|((domain_a, domain_b), count)| DomainPair {
            domain_a,
            domain_b,
            count,
        })
        .collect();
    pairs.sort_by(|a, b| {
        b.count
            .cmp(&a.count)
            .then_with(|| a.domain_a.cmp(&b.domain_a))
            .then_with(|| a.domain_b.cmp(&b.domain_b))
    });
    pairs
}

#[cfg(test)]
mod tests {
    use super::{WatchlistConfig, rank_watchlist};
    use atlas_core::{
        ATLAS_VERSION, AtlasPack, AtlasProvenance, PressureCell, SynchronicityCluster, VectorId,
    };

    fn cell(window: &str, intensity: f64, motifs: &[&str]) -> PressureCell {
        PressureCell {
            cell_id: format!("flux:{window}"),
            vector: VectorId::Flux,
            window_utc: window.to_string(),
            intensity: Some(intensity),
            gradient: None,
            motifs_present: motifs.iter().map(|m| m.to_string()).collect(),
            provenance_refs: vec![],
        }
    }

    fn cluster(id: &str, window: &str, domains: &[&str], density: f64) -> SynchronicityCluster {
        SynchronicityCluster {
            cluster_id: id.to_string(),
            domains: domains.iter().map(|d| d.to_string()).collect(),
            vectors: vec![VectorId::Flux],
            time_window: window.to_string(),
            density_score: Some(density),
            provenance_refs: vec![],
        }
    }

    fn atlas(cells: Vec<PressureCell>, clusters: Vec<SynchronicityCluster>) -> AtlasPack {
        AtlasPack {
            atlas_version: ATLAS_VERSION.to_string(),
            year: 2025,
            window_granularity: "weekly".to_string(),
            frames_count: 0,
            pressure_cells: cells,
            jetstreams: vec![],
            cyclones: vec![],
            calm_zones: vec![],
            synchronicity_clusters: clusters,
            provenance: AtlasProvenance {
                seedpack_hash: "seed".to_string(),
                run_id: "run".to_string(),
                atlas_hash: String::new(),
            },
        }
        .seal()
        .expect("test atlas should seal")
    }

    #[test]
    fn empty_atlas_is_not_computable_but_still_sealed() {
        let watchlist = rank_watchlist(
            &atlas(vec![], vec![]),
            &WatchlistConfig::default(),
            "run-1",
        )
        .expect("ranking should succeed");
        assert!(watchlist.not_computable);
        assert!(watchlist.shadow_only);
        assert!(watchlist.edges_top.is_empty());
        assert_eq!(watchlist.watchlist_hash.len(), 64);
        assert!(watchlist.verify_hash().expect("verify"));
    }

    #[test]
    fn edge_persistence_counts_distinct_windows() {
        let cells = vec![
            cell("w1", 0.5, &["A--B"]),
            cell("w2", 0.7, &["A--B"]),
            cell("w2", 0.9, &["A--B", "C--D"]),
        ];
        let watchlist = rank_watchlist(
            &atlas(cells, vec![]),
            &WatchlistConfig::default(),
            "run-1",
        )
        .expect("ranking should succeed");
        // C--D appears in one window only and is filtered out.
        assert_eq!(watchlist.edges_top.len(), 1);
        let edge = &watchlist.edges_top[0];
        assert_eq!(edge.edge, "A--B");
        assert_eq!(edge.persistence, 2);
    }

    #[test]
    fn edge_score_combines_weighted_components() {
        let cells = vec![cell("w1", 0.5, &["A--B"]), cell("w2", 0.5, &["A--B"])];
        let clusters = vec![cluster("c1", "w1", &["weather", "astronomy"], 0.8)];
        let watchlist = rank_watchlist(
            &atlas(cells, clusters),
            &WatchlistConfig::default(),
            "run-1",
        )
        .expect("ranking should succeed");
        let edge = &watchlist.edges_top[0];
        // densities: only w1 has a cluster density (0.8); mean over one sample.
        // score = 0.5*(2/10) + 0.3*0.8 + 0.2*0.5 = 0.1 + 0.24 + 0.1 = 0.44
        assert!((edge.score - 0.44).abs() < 1e-9);
    }

    #[test]
    fn ties_break_by_persistence_then_edge_string() {
        let cells = vec![
            cell("w1", 0.5, &["B--C", "A--B"]),
            cell("w2", 0.5, &["B--C", "A--B"]),
        ];
        let watchlist = rank_watchlist(
            &atlas(cells, vec![]),
            &WatchlistConfig::default(),
            "run-1",
        )
        .expect("ranking should succeed");
        assert_eq!(watchlist.edges_top.len(), 2);
        assert_eq!(watchlist.edges_top[0].edge, "A--B");
        assert_eq!(watchlist.edges_top[1].edge, "B--C");
    }

    #[test]
    fn top_k_truncates_the_edge_list() {
        let motifs: Vec<String> = (0..5).map(|i| format!("M{i}--N{i}")).collect();
        let motif_refs: Vec<&str> = motifs.iter().map(|m| m.as_str()).collect();
        let cells = vec![cell("w1", 0.5, &motif_refs), cell("w2", 0.5, &motif_refs)];
        let config = WatchlistConfig {
            top_k_edges: 3,
            ..WatchlistConfig::default()
        };
        let watchlist =
            rank_watchlist(&atlas(cells, vec![]), &config, "run-1").expect("ranking should succeed");
        assert_eq!(watchlist.edges_top.len(), 3);
    }

    #[test]
    fn clusters_rank_by_dampened_density() {
        let clusters = vec![
            cluster("c-low", "w1", &["weather"], 0.2),
            cluster("c-high", "w1", &["weather"], 0.9),
        ];
        let watchlist = rank_watchlist(
            &atlas(vec![], clusters),
            &WatchlistConfig::default(),
            "run-1",
        )
        .expect("ranking should succeed");
        assert!(!watchlist.not_computable);
        assert_eq!(watchlist.clusters_top[0].cluster_id, "c-high");
        // score = density * min(1, 1/10)
        assert!((watchlist.clusters_top[0].score - 0.09).abs() < 1e-9);
        assert_eq!(watchlist.clusters_top[0].persistence, 1);
    }

    #[test]
    fn domain_pairs_count_adjacent_sorted_domains() {
        let clusters = vec![
            cluster("c1", "w1", &["weather", "astronomy"], 0.5),
            cluster("c2", "w2", &["astronomy", "weather", "linguistics"], 0.5),
        ];
        let watchlist = rank_watchlist(
            &atlas(vec![], clusters),
            &WatchlistConfig::default(),
            "run-1",
        )
        .expect("ranking should succeed");
        // c1 sorted: [astronomy, weather] -> (astronomy, weather)
        // c2 sorted: [astronomy, linguistics, weather]
        //   -> (astronomy, linguistics), (linguistics, weather)
        assert_eq!(watchlist.domain_pairs.len(), 3);
        // Equal counts fall back to lexicographic pair order.
        assert_eq!(watchlist.domain_pairs[0].domain_a, "astronomy");
        assert_eq!(watchlist.domain_pairs[0].domain_b, "linguistics");
        assert!(watchlist.domain_pairs.iter().all(|pair| pair.count == 1));
    }

    #[test]
    fn invalid_config_is_rejected() {
        let config = WatchlistConfig {
            top_k_edges: 0,
            ..WatchlistConfig::default()
        };
        let err = rank_watchlist(&atlas(vec![], vec![]), &config, "run-1")
            .expect_err("top_k_edges 0 must fail");
        assert!(err.to_string().contains("top_k_edges"));
    }
}
