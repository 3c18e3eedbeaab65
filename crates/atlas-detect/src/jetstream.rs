// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use crate::config::DetectorConfig;
use crate::window::Window;
use atlas_core::{Jetstream, TrendDirection, VectorId, round6};

/// Scans every vector's window-ordered value sequence for sustained
/// directional runs.
///
/// A missing value finalizes the current segment and restarts after the
/// gap. A direction change finalizes at the previous index and the new
/// segment starts from that same index, so adjacent segments share a
/// boundary window. Exactly-equal consecutive values carry no direction
/// and likewise break an established run.
pub fn detect_jetstreams(windows: &[Window], config: &DetectorConfig) -> Vec<Jetstream> {
    let mut jets = Vec::new();
    for vector in VectorId::ALL {
        let values: Vec<Option<f64>> = windows.iter().map(|w| w.score(vector)).collect();
        scan_vector(vector, windows, &values, config, &mut jets);
    }
    jets.sort_by(|a, b| a.jet_id.cmp(&b.jet_id));
    jets
}

fn scan_vector(
    vector: VectorId,
    windows: &[Window],
    values: &[Option<f64>],
    config: &DetectorConfig,
    out: &mut Vec<Jetstream>,
) {
    if values.len() < 2 {
        return;
    }

    let mut segment_start = 0usize;
    let mut direction: Option<TrendDirection> = None;

    for i in 1..values.len() {
        let (Some(prior), Some(current)) = (values[i - 1], values[i]) else {
            finalize(vector, windows, values, segment_start, i - 1, direction, config, out);
            segment_start = i;
            direction = None;
            continue;
        };

        let pair_direction = if current > prior {
            Some(TrendDirection::Up)
        } else if current < prior {
            Some(TrendDirection::Down)
        } else {
            None
        };

        match (direction, pair_direction) {
            (None, adopted) => direction = adopted,
            (Some(established), changed) if changed != Some(established) => {
                finalize(
                    vector,
                    windows,
                    values,
                    segment_start,
                    i - 1,
                    Some(established),
                    config,
                    out,
                );
                segment_start = i - 1;
                direction = changed;
            }
            _ => {}
        }
    }

    let last = values.len() - 1;
    finalize(vector, windows, values, segment_start, last, direction, config, out);
}

#[allow(clippy::too_many_arguments)]
fn finalize(
    vector: VectorId,
    windows: &[Window],
    values: &[Option<f64>],
    start: usize,
    end: usize,
    direction: Option<TrendDirection>,
    config: &DetectorConfig,
    out: &mut Vec<Jetstream>,
) {
    let Some(direction) = direction else {
        return;
    };
    let span_len = end - start + 1;
    if span_len < config.min_trend_persistence {
        return;
    }

    let mut deltas = Vec::with_capacity(span_len - 1);
    for i in start..end {
        // Established direction implies every value in the span is present.
        if let (Some(a), Some(b)) = (values[i], values[i + 1]) {
            deltas.push((b - a).abs());
        }
    }
    if deltas.is_empty() {
        return;
    }
    let strength = deltas.iter().sum::<f64>() / deltas.len() as f64;

    let span: Vec<String> = windows[start..=end]
        .iter()
        .map(|w| w.window_id().to_string())
        .collect();
    let jet_id = format!(
        "{vector}:{}:{}:{}",
        direction.as_str(),
        span[0],
        span[span.len() - 1]
    );
    out.push(Jetstream {
        jet_id,
        vector,
        window_span: span,
        direction,
        strength: round6(strength),
        persistence: span_len,
    });
}
