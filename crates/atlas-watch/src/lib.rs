// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

pub mod deformation;
pub mod watchlist;

pub use deformation::{
    AlertKind, Alerts, BridgeNode, BridgeSet, ClusterAlert, DeformationBundle, DeformationConfig,
    DeformationProvenance, DeformationReport, EDGE_SEPARATOR, EdgeAlert, derive_deformation,
};
pub use watchlist::{
    DomainPair, WATCH_SCHEMA_VERSION, WatchProvenance, Watchlist, WatchlistCluster,
    WatchlistConfig, WatchlistEdge, rank_watchlist,
};

/// Watchlist and deformation namespace placeholder.
pub fn crate_name() -> &'static str {
    let _ = atlas_core::crate_name();
    "atlas-watch"
}
