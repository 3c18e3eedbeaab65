// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use atlas_core::{AtlasError, AtlasPack, Seedpack};
use atlas_delta::{DeltaAtlasPack, diff_atlases};
use atlas_detect::{DetectorConfig, build_atlas};

/// Parses a seedpack document and builds a sealed atlas from it.
pub fn build_atlas_from_json(
    seedpack_json: &str,
    config: &DetectorConfig,
    run_id: &str,
) -> Result<AtlasPack, AtlasError> {
    let seedpack = Seedpack::from_json(seedpack_json)?;
    build_atlas(&seedpack, config, run_id)
}

/// Parses two atlas documents and diffs them.
pub fn diff_atlases_from_json(
    base_json: &str,
    compare_json: &str,
    comparison_label: &str,
    run_id: &str,
) -> Result<DeltaAtlasPack, AtlasError> {
    let base = AtlasPack::from_json(base_json)?;
    let compare = AtlasPack::from_json(compare_json)?;
    diff_atlases(&base, &compare, comparison_label, run_id)
}

/// CLI namespace placeholder.
pub fn crate_name() -> &'static str {
    let _ = (
        atlas_core::crate_name(),
        atlas_detect::crate_name(),
        atlas_delta::crate_name(),
        atlas_watch::crate_name(),
    );
    "atlas-cli"
}

#[cfg(test)]
mod tests {
    use super::{build_atlas_from_json, diff_atlases_from_json};
    use atlas_detect::DetectorConfig;

    const MINIMAL_SEEDPACK: &str = r#"{
        "schema_version": "1.0",
        "year": 2025,
        "frames": [
            {
                "window_start_utc": "2025-W01",
                "window_end_utc": "2025-W02",
                "domain": "weather",
                "vectors": {"flux": {"score": 0.4}},
                "provenance_refs": ["obs:w1"]
            }
        ]
    }"#;

    #[test]
    fn build_atlas_from_json_produces_a_sealed_atlas() {
        let atlas = build_atlas_from_json(MINIMAL_SEEDPACK, &DetectorConfig::default(), "run-1")
            .expect("seedpack should build");
        assert_eq!(atlas.frames_count, 1);
        assert!(atlas.verify_hash().expect("verify"));
    }

    #[test]
    fn diff_atlases_from_json_roundtrips_through_serialization() {
        let config = DetectorConfig::default();
        let base = build_atlas_from_json(MINIMAL_SEEDPACK, &config, "run-base")
            .expect("base should build");
        let compare = build_atlas_from_json(MINIMAL_SEEDPACK, &config, "run-compare")
            .expect("compare should build");

        let base_json = serde_json::to_string(&base).expect("base serializes");
        let compare_json = serde_json::to_string(&compare).expect("compare serializes");
        let delta = diff_atlases_from_json(&base_json, &compare_json, "self", "run-delta")
            .expect("diff should succeed");
        assert_eq!(delta.base_atlas_hash, base.provenance.atlas_hash);
        assert!(delta.verify_hash().expect("verify"));
    }

    #[test]
    fn invalid_seedpack_json_is_rejected() {
        let err = build_atlas_from_json("{", &DetectorConfig::default(), "run-1")
            .expect_err("malformed JSON must fail");
        assert!(err.to_string().contains("invalid seedpack JSON"));
    }
}
