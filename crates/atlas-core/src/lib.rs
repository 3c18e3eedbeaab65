// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

pub mod atlas;
pub mod canonical;
pub mod error;
pub mod seedpack;
pub mod vector;

pub use atlas::{
    ATLAS_VERSION, AtlasPack, AtlasProvenance, CalmZone, Cyclone, Jetstream, PressureCell,
    RotationDirection, SynchronicityCluster, TrendDirection,
};
pub use canonical::{FLOAT_DECIMALS, canonical_json, canonicalize, content_hash, round6};
pub use error::AtlasError;
pub use seedpack::{
    CDEC_METRIC, Frame, InfluenceBundle, SEEDPACK_SCHEMA_VERSION, Seedpack,
    SynchronicityBundle, SynchronicityEnvelope, VectorReading,
};
pub use vector::{VECTOR_COUNT, VectorId};

/// Core shared types for the atlas workspace.
pub fn crate_name() -> &'static str {
    "atlas-core"
}
