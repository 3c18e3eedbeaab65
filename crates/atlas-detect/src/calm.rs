// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use crate::config::DetectorConfig;
use crate::window::Window;
use atlas_core::{CalmZone, VectorId, round6};

/// Scans every vector for sustained low-variance streaks.
///
/// Each observed value is tentatively appended to the running streak;
/// if the extended streak's variance reaches the ceiling, the streak is
/// finalized *without* the new value and the new value seeds a fresh
/// streak. Missing values finalize unconditionally.
pub fn detect_calm_zones(windows: &[Window], config: &DetectorConfig) -> Vec<CalmZone> {
    let mut zones = Vec::new();
    for vector in VectorId::ALL {
        scan_vector(vector, windows, config, &mut zones);
    }
    zones.sort_by(|a, b| a.zone_id.cmp(&b.zone_id));
    zones
}

fn scan_vector(
    vector: VectorId,
    windows: &[Window],
    config: &DetectorConfig,
    out: &mut Vec<CalmZone>,
) {
    let mut streak_start = 0usize;
    let mut streak: Vec<f64> = Vec::new();

    for (index, window) in windows.iter().enumerate() {
        match window.score(vector) {
            None => {
                finalize(vector, windows, streak_start, &streak, config, out);
                streak.clear();
            }
            Some(value) => {
                if streak.is_empty() {
                    streak_start = index;
                    streak.push(value);
                    continue;
                }
                let mut tentative = streak.clone();
                tentative.push(value);
                if population_variance(&tentative) >= config.calm_variance_ceiling {
                    finalize(vector, windows, streak_start, &streak, config, out);
                    streak_start = index;
                    streak = vec![value];
                } else {
                    streak = tentative;
                }
            }
        }
    }
    finalize(vector, windows, streak_start, &streak, config, out);
}

fn finalize(
    vector: VectorId,
    windows: &[Window],
    start: usize,
    streak: &[f64],
    config: &DetectorConfig,
    out: &mut Vec<CalmZone>,
) {
    if streak.len() < config.min_calm_span {
        return;
    }
    let variance = population_variance(streak);
    let stability_score = 1.0 / variance.max(config.stability_variance_floor);

    let end = start + streak.len() - 1;
    let span: Vec<String> = windows[start..=end]
        .iter()
        .map(|w| w.window_id().to_string())
        .collect();
    out.push(CalmZone {
        zone_id: format!("{vector}:{}:{}", span[0], span[span.len() - 1]),
        vector,
        window_span: span,
        stability_score: round6(stability_score),
    });
}

fn population_variance(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mean = values.iter().sum::<f64>() / values.len() as f64;
    values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64
}
