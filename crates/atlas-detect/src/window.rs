// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use atlas_core::{Frame, VectorId};
use std::collections::{BTreeMap, BTreeSet};

/// One aggregated time bucket: averaged per-vector scores across every
/// frame (from any domain) covering the same (start, end) pair.
#[derive(Clone, Debug, PartialEq)]
pub struct Window {
    pub window_start_utc: String,
    pub window_end_utc: String,
    pub scores: BTreeMap<VectorId, f64>,
    pub provenance_refs: Vec<String>,
}

impl Window {
    /// Canonical window identifier used in cell, jet, and zone ids.
    pub fn window_id(&self) -> &str {
        &self.window_start_utc
    }

    /// Averaged score for a vector, `None` when unobserved in this window.
    pub fn score(&self, vector: VectorId) -> Option<f64> {
        self.scores.get(&vector).copied()
    }
}

/// Groups frames into chronologically sorted windows; domain
/// information collapses here. Absence of data is `None`, never an
/// error, so this pass is infallible.
pub fn aggregate_windows(frames: &[Frame]) -> Vec<Window> {
    let mut groups: BTreeMap<(String, String), Vec<&Frame>> = BTreeMap::new();
    for frame in frames {
        groups
            .entry((frame.window_start_utc.clone(), frame.window_end_utc.clone()))
            .or_default()
            .push(frame);
    }

    groups
        .into_iter()
        .map(|((start, end), members)| {
            let mut scores = BTreeMap::new();
            for vector in VectorId::ALL {
                let mut observed: Vec<f64> = members
                    .iter()
                    .filter_map(|frame| frame.vectors.get(&vector).and_then(|r| r.score))
                    .collect();
                if !observed.is_empty() {
                    // Summation order must not depend on frame input order.
                    observed.sort_by(f64::total_cmp);
                    let mean = observed.iter().sum::<f64>() / observed.len() as f64;
                    scores.insert(vector, mean);
                }
            }

            let refs: BTreeSet<String> = members
                .iter()
                .flat_map(|frame| frame.provenance_refs.iter().cloned())
                .collect();

            Window {
                window_start_utc: start,
                window_end_utc: end,
                scores,
                provenance_refs: refs.into_iter().collect(),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::aggregate_windows;
    use atlas_core::{Frame, VectorId, VectorReading};
    use std::collections::BTreeMap;

    fn frame(start: &str, end: &str, domain: &str, scores: &[(VectorId, f64)]) -> Frame {
        let mut vectors = BTreeMap::new();
        for (vector, score) in scores {
            vectors.insert(*vector, VectorReading { score: Some(*score) });
        }
        Frame {
            window_start_utc: start.to_string(),
            window_end_utc: end.to_string(),
            domain: domain.to_string(),
            vectors,
            provenance_refs: vec![format!("{domain}:{start}")],
        }
    }

    #[test]
    fn frames_from_different_domains_merge_into_one_window() {
        let frames = vec![
            frame("2025-W02", "2025-W03", "weather", &[(VectorId::Flux, 0.2)]),
            frame("2025-W02", "2025-W03", "astronomy", &[(VectorId::Flux, 0.4)]),
            frame("2025-W01", "2025-W02", "weather", &[(VectorId::Flux, 1.0)]),
        ];
        let windows = aggregate_windows(&frames);
        assert_eq!(windows.len(), 2);
        assert_eq!(windows[0].window_id(), "2025-W01");
        assert_eq!(windows[1].window_id(), "2025-W02");
        let merged = windows[1].score(VectorId::Flux).expect("flux observed");
        assert!((merged - 0.3).abs() < 1e-12);
    }

    #[test]
    fn unobserved_vectors_stay_none() {
        let frames = vec![frame(
            "2025-W01",
            "2025-W02",
            "weather",
            &[(VectorId::Flux, 0.5)],
        )];
        let windows = aggregate_windows(&frames);
        assert_eq!(windows[0].score(VectorId::Flux), Some(0.5));
        assert_eq!(windows[0].score(VectorId::Entropy), None);
    }

    #[test]
    fn provenance_refs_are_sorted_and_unique() {
        let mut first = frame("2025-W01", "2025-W02", "weather", &[]);
        first.provenance_refs = vec!["b".to_string(), "a".to_string()];
        let mut second = frame("2025-W01", "2025-W02", "astronomy", &[]);
        second.provenance_refs = vec!["a".to_string(), "c".to_string()];

        let windows = aggregate_windows(&[first, second]);
        assert_eq!(windows[0].provenance_refs, vec!["a", "b", "c"]);
    }

    #[test]
    fn input_order_does_not_change_output() {
        let a = frame("2025-W01", "2025-W02", "weather", &[(VectorId::Drift, 0.1)]);
        let b = frame("2025-W02", "2025-W03", "weather", &[(VectorId::Drift, 0.2)]);
        let c = frame("2025-W01", "2025-W02", "linguistics", &[(VectorId::Drift, 0.3)]);

        let forward = aggregate_windows(&[a.clone(), b.clone(), c.clone()]);
        let shuffled = aggregate_windows(&[c, b, a]);
        assert_eq!(forward, shuffled);
    }

    #[test]
    fn empty_input_yields_no_windows() {
        assert!(aggregate_windows(&[]).is_empty());
    }
}
