// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use crate::types::{
    DELTA_VERSION, DeltaAtlasPack, DeltaCalmZone, DeltaCluster, DeltaCyclone, DeltaJetstream,
    DeltaPressure, DeltaProvenance,
};
use atlas_core::{AtlasError, AtlasPack, Cyclone, VectorId, round6};
use std::collections::{BTreeMap, BTreeSet};

/// Minimum center-vector overlap ratio for a cyclone match (inclusive).
const CYCLONE_MATCH_MIN_OVERLAP: f64 = 0.5;

/// Diffs two atlases into a sealed delta artifact.
///
/// Alignment is all-or-nothing: a granularity or window-set mismatch
/// aborts with [`AtlasError::Alignment`] before any category is diffed.
pub fn diff_atlases(
    base: &AtlasPack,
    compare: &AtlasPack,
    comparison_label: &str,
    run_id: &str,
) -> Result<DeltaAtlasPack, AtlasError> {
    check_alignment(base, compare)?;

    let delta = DeltaAtlasPack {
        delta_version: DELTA_VERSION.to_string(),
        base_atlas_hash: base.provenance.atlas_hash.clone(),
        compare_atlas_hash: compare.provenance.atlas_hash.clone(),
        comparison_label: comparison_label.to_string(),
        window_granularity: compare.window_granularity.clone(),
        frames_count: compare.frames_count,
        delta_pressures: diff_pressures(base, compare),
        delta_jetstreams: diff_jetstreams(base, compare),
        delta_cyclones: diff_cyclones(base, compare),
        delta_calm_zones: diff_calm_zones(base, compare),
        delta_synchronicity_clusters: diff_clusters(base, compare),
        provenance: DeltaProvenance {
            run_id: run_id.to_string(),
            delta_hash: String::new(),
        },
    }
    .seal()?;

    tracing::debug!(
        pressures = delta.delta_pressures.len(),
        cyclones = delta.delta_cyclones.len(),
        delta_hash = %delta.provenance.delta_hash,
        "atlas delta sealed"
    );
    Ok(delta)
}

fn window_set(atlas: &AtlasPack) -> BTreeSet<&str> {
    atlas
        .pressure_cells
        .iter()
        .map(|cell| cell.window_utc.as_str())
        .collect()
}

fn check_alignment(base: &AtlasPack, compare: &AtlasPack) -> Result<(), AtlasError> {
    if base.window_granularity != compare.window_granularity {
        return Err(AtlasError::alignment(format!(
            "window_granularity differs: base '{}' vs compare '{}'",
            base.window_granularity, compare.window_granularity
        )));
    }
    let base_windows = window_set(base);
    let compare_windows = window_set(compare);
    if base_windows != compare_windows {
        return Err(AtlasError::alignment(format!(
            "window sets differ: base has {} windows, compare has {}",
            base_windows.len(),
            compare_windows.len()
        )));
    }
    Ok(())
}

fn merged_refs(base: Option<&Vec<String>>, compare: Option<&Vec<String>>) -> Vec<String> {
    let mut refs: BTreeSet<String> = BTreeSet::new();
    for side in [base, compare].into_iter().flatten() {
        refs.extend(side.iter().cloned());
    }
    refs.into_iter().collect()
}

fn diff_pressures(base: &AtlasPack, compare: &AtlasPack) -> Vec<DeltaPressure> {
    type Key = (VectorId, String);
    let index = |atlas: &AtlasPack| -> BTreeMap<Key, (Option<f64>, Option<f64>, Vec<String>)> {
        atlas
            .pressure_cells
            .iter()
            .map(|cell| {
                (
                    (cell.vector, cell.window_utc.clone()),
                    (cell.intensity, cell.gradient, cell.provenance_refs.clone()),
                )
            })
            .collect()
    };
    let base_cells = index(base);
    let compare_cells = index(compare);

    let keys: BTreeSet<&Key> = base_cells.keys().chain(compare_cells.keys()).collect();
    keys.into_iter()
        .map(|key| {
            let base_cell = base_cells.get(key);
            let compare_cell = compare_cells.get(key);
            let subtract = |pick: fn(&(Option<f64>, Option<f64>, Vec<String>)) -> Option<f64>| {
                match (base_cell, compare_cell) {
                    (Some(b), Some(c)) => match (pick(b), pick(c)) {
                        (Some(before), Some(after)) => Some(round6(after - before)),
                        _ => None,
                    },
                    _ => None,
                }
            };
            DeltaPressure {
                vector: key.0,
                window_utc: key.1.clone(),
                delta_intensity: subtract(|cell| cell.0),
                delta_gradient: subtract(|cell| cell.1),
                appeared: base_cell.is_none(),
                disappeared: compare_cell.is_none(),
                provenance_refs: merged_refs(
                    base_cell.map(|cell| &cell.2),
                    compare_cell.map(|cell| &cell.2),
                ),
            }
        })
        .collect()
}

fn diff_jetstreams(base: &AtlasPack, compare: &AtlasPack) -> Vec<DeltaJetstream> {
    // Keyed by the sorted involved-vector set; when one side carries
    // several segments with the same key, the one latest in jet_id
    // order stands for the key.
    let index = |atlas: &AtlasPack| -> BTreeMap<Vec<VectorId>, (f64, usize)> {
        atlas
            .jetstreams
            .iter()
            .map(|jet| (vec![jet.vector], (jet.strength, jet.persistence)))
            .collect()
    };
    let base_jets = index(base);
    let compare_jets = index(compare);

    let keys: BTreeSet<&Vec<VectorId>> = base_jets.keys().chain(compare_jets.keys()).collect();
    keys.into_iter()
        .map(|key| {
            let before = base_jets.get(key);
            let after = compare_jets.get(key);
            DeltaJetstream {
                vectors_involved: key.clone(),
                delta_strength: match (before, after) {
                    (Some(b), Some(c)) => Some(round6(c.0 - b.0)),
                    _ => None,
                },
                delta_persistence: match (before, after) {
                    (Some(b), Some(c)) => Some(c.1 as i64 - b.1 as i64),
                    _ => None,
                },
                appeared: before.is_none(),
                disappeared: after.is_none(),
            }
        })
        .collect()
}

fn diff_calm_zones(base: &AtlasPack, compare: &AtlasPack) -> Vec<DeltaCalmZone> {
    let index = |atlas: &AtlasPack| -> BTreeMap<Vec<VectorId>, f64> {
        atlas
            .calm_zones
            .iter()
            .map(|zone| (vec![zone.vector], zone.stability_score))
            .collect()
    };
    let base_zones = index(base);
    let compare_zones = index(compare);

    let keys: BTreeSet<&Vec<VectorId>> = base_zones.keys().chain(compare_zones.keys()).collect();
    keys.into_iter()
        .map(|key| {
            let before = base_zones.get(key);
            let after = compare_zones.get(key);
            DeltaCalmZone {
                vectors_suppressed: key.clone(),
                delta_stability: match (before, after) {
                    (Some(b), Some(c)) => Some(round6(c - b)),
                    _ => None,
                },
                appeared: before.is_none(),
                disappeared: after.is_none(),
            }
        })
        .collect()
}

fn diff_clusters(base: &AtlasPack, compare: &AtlasPack) -> Vec<DeltaCluster> {
    type Key = (Vec<String>, Vec<VectorId>);
    let index = |atlas: &AtlasPack| -> BTreeMap<Key, Option<f64>> {
        atlas
            .synchronicity_clusters
            .iter()
            .map(|cluster| {
                let mut domains = cluster.domains.clone();
                domains.sort();
                let mut vectors = cluster.vectors.clone();
                vectors.sort();
                ((domains, vectors), cluster.density_score)
            })
            .collect()
    };
    let base_clusters = index(base);
    let compare_clusters = index(compare);

    let keys: BTreeSet<&Key> = base_clusters.keys().chain(compare_clusters.keys()).collect();
    keys.into_iter()
        .map(|key| {
            let before = base_clusters.get(key);
            let after = compare_clusters.get(key);
            DeltaCluster {
                domains: key.0.clone(),
                vectors: key.1.clone(),
                delta_density: match (before, after) {
                    (Some(Some(b)), Some(Some(c))) => Some(round6(c - b)),
                    _ => None,
                },
                appeared: before.is_none(),
                disappeared: after.is_none(),
            }
        })
        .collect()
}

fn overlap_ratio(compare: &Cyclone, base: &Cyclone) -> f64 {
    if compare.center_vectors.is_empty() {
        return 0.0;
    }
    let base_set: BTreeSet<VectorId> = base.center_vectors.iter().copied().collect();
    let shared = compare
        .center_vectors
        .iter()
        .filter(|vector| base_set.contains(vector))
        .count();
    shared as f64 / compare.center_vectors.len() as f64
}

/// Greedy best-overlap matching: each compare cyclone claims the best
/// unused base cyclone whose overlap ratio is at least the threshold.
/// Ties keep the first-encountered base cyclone (strict `>` against the
/// running best).
fn diff_cyclones(base: &AtlasPack, compare: &AtlasPack) -> Vec<DeltaCyclone> {
    let mut used = vec![false; base.cyclones.len()];
    let mut deltas = Vec::new();

    for current in &compare.cyclones {
        let mut best: Option<(usize, f64)> = None;
        for (index, candidate) in base.cyclones.iter().enumerate() {
            if used[index] {
                continue;
            }
            let ratio = overlap_ratio(current, candidate);
            if ratio < CYCLONE_MATCH_MIN_OVERLAP {
                continue;
            }
            if best.is_none_or(|(_, best_ratio)| ratio > best_ratio) {
                best = Some((index, ratio));
            }
        }

        match best {
            Some((index, ratio)) => {
                used[index] = true;
                let matched = &base.cyclones[index];
                deltas.push(DeltaCyclone {
                    base_cyclone_id: Some(matched.cyclone_id.clone()),
                    compare_cyclone_id: Some(current.cyclone_id.clone()),
                    center_vectors: current.center_vectors.clone(),
                    overlap_ratio: Some(round6(ratio)),
                    delta_domain_overlap: Some(round6(
                        current.domain_overlap - matched.domain_overlap,
                    )),
                    appeared: false,
                    disappeared: false,
                });
            }
            None => deltas.push(DeltaCyclone {
                base_cyclone_id: None,
                compare_cyclone_id: Some(current.cyclone_id.clone()),
                center_vectors: current.center_vectors.clone(),
                overlap_ratio: None,
                delta_domain_overlap: None,
                appeared: true,
                disappeared: false,
            }),
        }
    }

    for (index, leftover) in base.cyclones.iter().enumerate() {
        if !used[index] {
            deltas.push(DeltaCyclone {
                base_cyclone_id: Some(leftover.cyclone_id.clone()),
                compare_cyclone_id: None,
                center_vectors: leftover.center_vectors.clone(),
                overlap_ratio: None,
                delta_domain_overlap: None,
                appeared: false,
                disappeared: true,
            });
        }
    }
    deltas
}

#[cfg(test)]
mod tests {
    use super::diff_atlases;
    use atlas_core::{
        ATLAS_VERSION, AtlasError, AtlasPack, AtlasProvenance, Cyclone, PressureCell,
        RotationDirection, SynchronicityCluster, VectorId,
    };

    fn cell(vector: VectorId, window: &str, intensity: Option<f64>, gradient: Option<f64>) -> PressureCell {
        PressureCell {
            cell_id: format!("{vector}:{window}"),
            vector,
            window_utc: window.to_string(),
            intensity,
            gradient,
            motifs_present: vec![],
            provenance_refs: vec![format!("ref:{window}")],
        }
    }

    fn cyclone(id: &str, window: &str, centers: &[VectorId], overlap: f64) -> Cyclone {
        Cyclone {
            cyclone_id: id.to_string(),
            window_utc: window.to_string(),
            center_vectors: centers.to_vec(),
            rotation_direction: RotationDirection::Cw,
            domain_overlap: overlap,
            coherence_score: None,
            rarity_score: None,
        }
    }

    fn atlas(cells: Vec<PressureCell>) -> AtlasPack {
        AtlasPack {
            atlas_version: ATLAS_VERSION.to_string(),
            year: 2025,
            window_granularity: "weekly".to_string(),
            frames_count: cells.len(),
            pressure_cells: cells,
            jetstreams: vec![],
            cyclones: vec![],
            calm_zones: vec![],
            synchronicity_clusters: vec![],
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
    fn granularity_mismatch_fails_before_any_delta() {
        let base = atlas(vec![cell(VectorId::Flux, "w1", Some(0.1), None)]);
        let mut monthly = atlas(vec![cell(VectorId::Flux, "w1", Some(0.1), None)]);
        monthly.window_granularity = "monthly".to_string();

        let err = diff_atlases(&base, &monthly, "label", "run")
            .expect_err("granularity mismatch must fail");
        assert!(matches!(err, AtlasError::Alignment(_)));
        assert!(err.to_string().contains("window_granularity"));
    }

    #[test]
    fn window_set_mismatch_fails_before_any_delta() {
        let base = atlas(vec![cell(VectorId::Flux, "w1", Some(0.1), None)]);
        let compare = atlas(vec![cell(VectorId::Flux, "w2", Some(0.1), None)]);
        let err =
            diff_atlases(&base, &compare, "label", "run").expect_err("window mismatch must fail");
        assert!(matches!(err, AtlasError::Alignment(_)));
    }

    #[test]
    fn pressure_deltas_subtract_compare_minus_base() {
        let base = atlas(vec![cell(VectorId::Flux, "w1", Some(0.10), Some(0.02))]);
        let compare = atlas(vec![cell(VectorId::Flux, "w1", Some(0.35), None)]);
        let delta = diff_atlases(&base, &compare, "label", "run").expect("diff should succeed");

        assert_eq!(delta.delta_pressures.len(), 1);
        let pressure = &delta.delta_pressures[0];
        assert_eq!(pressure.delta_intensity, Some(0.25));
        // Gradient missing on the compare side: no delta.
        assert_eq!(pressure.delta_gradient, None);
        assert!(!pressure.appeared);
        assert!(!pressure.disappeared);
        assert_eq!(pressure.provenance_refs, vec!["ref:w1"]);
    }

    #[test]
    fn delta_is_sealed_and_carries_both_atlas_hashes() {
        let base = atlas(vec![cell(VectorId::Flux, "w1", Some(0.1), None)]);
        let compare = atlas(vec![cell(VectorId::Flux, "w1", Some(0.2), None)]);
        let delta = diff_atlases(&base, &compare, "2024_vs_2025", "run")
            .expect("diff should succeed");
        assert_eq!(delta.base_atlas_hash, base.provenance.atlas_hash);
        assert_eq!(delta.compare_atlas_hash, compare.provenance.atlas_hash);
        assert!(delta.verify_hash().expect("verify should succeed"));
    }

    #[test]
    fn cluster_appears_when_only_the_compare_side_has_it() {
        let base = atlas(vec![cell(VectorId::Flux, "w1", Some(0.1), None)]);
        let mut compare = atlas(vec![cell(VectorId::Flux, "w1", Some(0.1), None)]);
        compare.synchronicity_clusters.push(SynchronicityCluster {
            cluster_id: "abc".to_string(),
            domains: vec!["weather".to_string()],
            vectors: vec![VectorId::Flux],
            time_window: "w1".to_string(),
            density_score: Some(0.5),
            provenance_refs: vec![],
        });
        let compare = compare.seal().expect("reseal");

        let delta = diff_atlases(&base, &compare, "label", "run").expect("diff should succeed");
        assert_eq!(delta.delta_synchronicity_clusters.len(), 1);
        let cluster = &delta.delta_synchronicity_clusters[0];
        assert!(cluster.appeared);
        assert!(!cluster.disappeared);
        assert_eq!(cluster.delta_density, None);
    }

    #[test]
    fn cyclone_overlap_of_exactly_half_matches() {
        let mut base = atlas(vec![cell(VectorId::Flux, "w1", Some(0.1), None)]);
        base.cyclones.push(cyclone(
            "w1:flux",
            "w1",
            &[VectorId::Flux, VectorId::Entropy],
            1.0,
        ));
        let base = base.seal().expect("reseal base");

        let mut compare = atlas(vec![cell(VectorId::Flux, "w1", Some(0.1), None)]);
        compare.cyclones.push(cyclone(
            "w1:flux-b",
            "w1",
            &[VectorId::Flux, VectorId::Drift],
            1.5,
        ));
        let compare = compare.seal().expect("reseal compare");

        let delta = diff_atlases(&base, &compare, "label", "run").expect("diff should succeed");
        assert_eq!(delta.delta_cyclones.len(), 1);
        let matched = &delta.delta_cyclones[0];
        assert_eq!(matched.overlap_ratio, Some(0.5));
        assert!(!matched.appeared);
        assert_eq!(matched.delta_domain_overlap, Some(0.5));
    }

    #[test]
    fn cyclone_overlap_below_half_yields_appeared_and_disappeared() {
        let mut base = atlas(vec![cell(VectorId::Flux, "w1", Some(0.1), None)]);
        base.cyclones.push(cyclone(
            "w1:anomaly",
            "w1",
            &[VectorId::Anomaly, VectorId::Entropy, VectorId::Polarity],
            1.0,
        ));
        let base = base.seal().expect("reseal base");

        let mut compare = atlas(vec![cell(VectorId::Flux, "w1", Some(0.1), None)]);
        compare.cyclones.push(cyclone(
            "w1:flux",
            "w1",
            &[VectorId::Flux, VectorId::Drift, VectorId::Anomaly],
            1.0,
        ));
        let compare = compare.seal().expect("reseal compare");

        // Overlap ratio 1/3 < 0.5: no match on either side.
        let delta = diff_atlases(&base, &compare, "label", "run").expect("diff should succeed");
        assert_eq!(delta.delta_cyclones.len(), 2);
        assert!(delta.delta_cyclones[0].appeared);
        assert_eq!(
            delta.delta_cyclones[0].compare_cyclone_id.as_deref(),
            Some("w1:flux")
        );
        assert!(delta.delta_cyclones[1].disappeared);
        assert_eq!(
            delta.delta_cyclones[1].base_cyclone_id.as_deref(),
            Some("w1:anomaly")
        );
    }

    #[test]
    fn tied_cyclone_overlap_keeps_the_first_seen_base() {
        let mut base = atlas(vec![cell(VectorId::Flux, "w1", Some(0.1), None)]);
        base.cyclones.push(cyclone(
            "w1:first",
            "w1",
            &[VectorId::Flux, VectorId::Entropy],
            1.0,
        ));
        base.cyclones.push(cyclone(
            "w1:second",
            "w1",
            &[VectorId::Drift, VectorId::Entropy],
            1.0,
        ));
        let base = base.seal().expect("reseal base");

        let mut compare = atlas(vec![cell(VectorId::Flux, "w1", Some(0.1), None)]);
        compare.cyclones.push(cyclone(
            "w1:both",
            "w1",
            &[VectorId::Flux, VectorId::Drift],
            1.0,
        ));
        let compare = compare.seal().expect("reseal compare");

        // Both base cyclones tie at ratio 0.5; the earlier one wins.
        let delta = diff_atlases(&base, &compare, "label", "run").expect("diff should succeed");
        let matched = delta
            .delta_cyclones
            .iter()
            .find(|entry| entry.compare_cyclone_id.is_some() && entry.base_cyclone_id.is_some())
            .expect("one matched pair expected");
        assert_eq!(matched.base_cyclone_id.as_deref(), Some("w1:first"));
        let leftover = delta
            .delta_cyclones
            .iter()
            .find(|entry| entry.disappeared)
            .expect("second base cyclone should disappear");
        assert_eq!(leftover.base_cyclone_id.as_deref(), Some("w1:second"));
    }
}
