// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

pub mod diff;
pub mod types;

pub use diff::diff_atlases;
pub use types::{
    DELTA_VERSION, DeltaAtlasPack, DeltaCalmZone, DeltaCluster, DeltaCyclone, DeltaJetstream,
    DeltaPressure, DeltaProvenance,
};

/// Delta engine namespace placeholder.
pub fn crate_name() -> &'static str {
    let _ = atlas_core::crate_name();
    "atlas-delta"
}
