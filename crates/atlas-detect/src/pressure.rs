// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use crate::window::Window;
use atlas_core::{PressureCell, VectorId, round6};
use std::collections::BTreeMap;

/// Emits one cell per (vector, window) in chronological window order.
///
/// The previous-value tracker is overwritten after every window, even
/// when the current observation is missing: a single gap resets the
/// gradient baseline until the next observed value. Fill-forward is
/// intentionally not applied.
pub fn build_pressure_cells(windows: &[Window]) -> Vec<PressureCell> {
    let mut previous: BTreeMap<VectorId, Option<f64>> = VectorId::ALL
        .into_iter()
        .map(|vector| (vector, None))
        .collect();

    let mut cells = Vec::with_capacity(windows.len() * VectorId::ALL.len());
    for window in windows {
        for vector in VectorId::ALL {
            let intensity = window.score(vector);
            let gradient = match (intensity, previous[&vector]) {
                (Some(current), Some(prior)) => Some(round6(current - prior)),
                _ => None,
            };
            cells.push(PressureCell {
                cell_id: format!("{vector}:{}", window.window_id()),
                vector,
                window_utc: window.window_id().to_string(),
                intensity: intensity.map(round6),
                gradient,
                motifs_present: vec![],
                provenance_refs: window.provenance_refs.clone(),
            });
            previous.insert(vector, intensity);
        }
    }
    cells
}
