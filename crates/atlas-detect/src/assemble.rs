// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use crate::calm::detect_calm_zones;
use crate::cluster::build_clusters;
use crate::config::DetectorConfig;
use crate::cyclone::detect_cyclones;
use crate::jetstream::detect_jetstreams;
use crate::pressure::build_pressure_cells;
use crate::window::aggregate_windows;
use atlas_core::{
    ATLAS_VERSION, AtlasError, AtlasPack, AtlasProvenance, Seedpack, content_hash,
};

/// Runs the full aggregation and detection pipeline over one seedpack
/// and seals the result with its content hash.
///
/// Pure and synchronous: identical inputs (including `run_id`) produce
/// a bit-identical atlas.
pub fn build_atlas(
    seedpack: &Seedpack,
    config: &DetectorConfig,
    run_id: &str,
) -> Result<AtlasPack, AtlasError> {
    config.validate()?;
    seedpack.validate()?;

    let seedpack_hash = content_hash(seedpack)?;
    let windows = aggregate_windows(&seedpack.frames);
    tracing::debug!(
        frames = seedpack.frames.len(),
        windows = windows.len(),
        "aggregated seedpack into windows"
    );

    let pressure_cells = build_pressure_cells(&windows);
    let jetstreams = detect_jetstreams(&windows, config);
    let cyclones = detect_cyclones(
        &windows,
        &seedpack.influence,
        &seedpack.synchronicity,
        config,
    );
    let calm_zones = detect_calm_zones(&windows, config);
    let synchronicity_clusters = build_clusters(&seedpack.synchronicity)?;

    let atlas = AtlasPack {
        atlas_version: ATLAS_VERSION.to_string(),
        year: seedpack.year,
        window_granularity: seedpack.window_granularity.clone(),
        frames_count: seedpack.frames.len(),
        pressure_cells,
        jetstreams,
        cyclones,
        calm_zones,
        synchronicity_clusters,
        provenance: AtlasProvenance {
            seedpack_hash,
            run_id: run_id.to_string(),
            atlas_hash: String::new(),
        },
    }
    .seal()?;

    tracing::info!(
        atlas_hash = %atlas.provenance.atlas_hash,
        cells = atlas.pressure_cells.len(),
        jetstreams = atlas.jetstreams.len(),
        cyclones = atlas.cyclones.len(),
        calm_zones = atlas.calm_zones.len(),
        clusters = atlas.synchronicity_clusters.len(),
        "atlas sealed"
    );
    Ok(atlas)
}
