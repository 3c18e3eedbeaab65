// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use atlas_core::{
    Frame, SEEDPACK_SCHEMA_VERSION, Seedpack, VectorId, VectorReading,
};
use atlas_delta::diff_atlases;
use atlas_detect::{DetectorConfig, build_atlas};
use criterion::{Criterion, black_box, criterion_group, criterion_main};
use std::collections::BTreeMap;

/// A full year of weekly windows across three domains, with smoothly
/// varying scores so every detector has work to do.
fn yearly_seedpack(weeks: usize) -> Seedpack {
    let mut frames = Vec::with_capacity(weeks * 3);
    for week in 0..weeks {
        for (domain_index, domain) in ["weather", "astronomy", "linguistics"]
            .into_iter()
            .enumerate()
        {
            let mut vectors = BTreeMap::new();
            for (vector_index, vector) in VectorId::ALL.into_iter().enumerate() {
                let phase = (week as f64 + vector_index as f64 + domain_index as f64) / 7.0;
                vectors.insert(
                    vector,
                    VectorReading {
                        score: Some(0.5 + 0.4 * phase.sin()),
                    },
                );
            }
            frames.push(Frame {
                window_start_utc: format!("2025-W{:02}", week + 1),
                window_end_utc: format!("2025-W{:02}", week + 2),
                domain: domain.to_string(),
                vectors,
                provenance_refs: vec![format!("{domain}:{week}")],
            });
        }
    }
    Seedpack {
        schema_version: SEEDPACK_SCHEMA_VERSION.to_string(),
        year: 2025,
        window_granularity: "weekly".to_string(),
        frames,
        influence: Default::default(),
        synchronicity: Default::default(),
    }
}

fn bench_build_atlas(c: &mut Criterion) {
    let seedpack = yearly_seedpack(52);
    let config = DetectorConfig::default();

    c.bench_function("build_atlas_52_weeks", |b| {
        b.iter(|| {
            build_atlas(black_box(&seedpack), &config, "bench-run")
                .expect("benchmark build should succeed")
        })
    });
}

fn bench_diff_atlases(c: &mut Criterion) {
    let config = DetectorConfig::default();
    let base = build_atlas(&yearly_seedpack(52), &config, "bench-base")
        .expect("base build should succeed");
    let compare = build_atlas(&yearly_seedpack(52), &config, "bench-compare")
        .expect("compare build should succeed");

    c.bench_function("diff_atlases_52_weeks", |b| {
        b.iter(|| {
            diff_atlases(black_box(&base), black_box(&compare), "bench", "bench-run")
                .expect("benchmark diff should succeed")
        })
    });
}

criterion_group!(benches, bench_build_atlas, bench_diff_atlases);
criterion_main!(benches);
