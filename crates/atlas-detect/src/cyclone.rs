// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use crate::config::DetectorConfig;
use crate::window::Window;
use atlas_core::{
    Cyclone, InfluenceBundle, RotationDirection, SynchronicityBundle, VectorId, round6,
};
use std::collections::BTreeMap;

const CYCLONE_CENTER_LIMIT: usize = 3;
const COHERENCE_METRICS: [&str; 2] = ["SIS", "RAC"];

/// Flags windows where at least `min_cyclone_vectors` vectors climb
/// simultaneously while the cross-domain echo signal is at or above
/// `min_cdec_overlap`.
///
/// The previous-value tracker follows the pressure-cell semantics: it
/// is overwritten after every window, so a gap suppresses gradients for
/// the following window.
pub fn detect_cyclones(
    windows: &[Window],
    influence: &InfluenceBundle,
    synchronicity: &SynchronicityBundle,
    config: &DetectorConfig,
) -> Vec<Cyclone> {
    let max_cdec = influence.max_cdec();
    let coherence_score = mean_envelope_coherence(synchronicity).map(round6);
    let rarity_score = mean_rarity(synchronicity).map(round6);

    let mut previous: BTreeMap<VectorId, Option<f64>> = VectorId::ALL
        .into_iter()
        .map(|vector| (vector, None))
        .collect();

    let mut cyclones = Vec::new();
    for window in windows {
        let mut gradients: Vec<(VectorId, f64)> = Vec::new();
        for vector in VectorId::ALL {
            let current = window.score(vector);
            if let (Some(now), Some(prior)) = (current, previous[&vector]) {
                gradients.push((vector, now - prior));
            }
            previous.insert(vector, current);
        }

        let mut positive: Vec<(VectorId, f64)> = gradients
            .iter()
            .copied()
            .filter(|(_, gradient)| *gradient > 0.0)
            .collect();
        if positive.len() < config.min_cyclone_vectors || max_cdec < config.min_cdec_overlap {
            continue;
        }

        // Largest gradient first; equal gradients fall back to vector order.
        positive.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        let center_vectors: Vec<VectorId> = positive
            .iter()
            .take(CYCLONE_CENTER_LIMIT)
            .map(|(vector, _)| *vector)
            .collect();

        let gradient_sum: f64 = gradients.iter().map(|(_, gradient)| gradient).sum();
        let rotation_direction = if gradient_sum >= 0.0 {
            RotationDirection::Cw
        } else {
            RotationDirection::Ccw
        };

        let center_label = center_vectors
            .first()
            .map(|vector| vector.as_str())
            .unwrap_or("none");
        cyclones.push(Cyclone {
            cyclone_id: format!("{}:{center_label}", window.window_id()),
            window_utc: window.window_id().to_string(),
            center_vectors,
            rotation_direction,
            domain_overlap: round6(max_cdec),
            coherence_score,
            rarity_score,
        });
    }
    cyclones
}

/// Mean of the envelopes' coherence metrics (`SIS`, `RAC`), or `None`
/// when no envelope carries either.
fn mean_envelope_coherence(synchronicity: &SynchronicityBundle) -> Option<f64> {
    let per_envelope: Vec<f64> = synchronicity
        .envelopes
        .iter()
        .filter_map(|envelope| {
            let present: Vec<f64> = COHERENCE_METRICS
                .iter()
                .filter_map(|key| envelope.metric(key))
                .collect();
            if present.is_empty() {
                None
            } else {
                Some(present.iter().sum::<f64>() / present.len() as f64)
            }
        })
        .collect();
    if per_envelope.is_empty() {
        None
    } else {
        Some(per_envelope.iter().sum::<f64>() / per_envelope.len() as f64)
    }
}

fn mean_rarity(synchronicity: &SynchronicityBundle) -> Option<f64> {
    let rarities: Vec<f64> = synchronicity
        .envelopes
        .iter()
        .filter_map(|envelope| envelope.rarity_estimate)
        .collect();
    if rarities.is_empty() {
        None
    } else {
        Some(rarities.iter().sum::<f64>() / rarities.len() as f64)
    }
}
