// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

pub mod assemble;
pub mod calm;
pub mod cluster;
pub mod config;
pub mod cyclone;
pub mod jetstream;
pub mod pressure;
pub mod window;

pub use assemble::build_atlas;
pub use calm::detect_calm_zones;
pub use cluster::build_clusters;
pub use config::DetectorConfig;
pub use cyclone::detect_cyclones;
pub use jetstream::detect_jetstreams;
pub use pressure::build_pressure_cells;
pub use window::{Window, aggregate_windows};

/// Detector namespace placeholder.
pub fn crate_name() -> &'static str {
    let _ = atlas_core::crate_name();
    "atlas-detect"
}
