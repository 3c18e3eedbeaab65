// SPDX-License-Identifier: MIT OR Apache-2.0

#![no_main]

use atlas_core::{
    Frame, InfluenceBundle, SEEDPACK_SCHEMA_VERSION, Seedpack, SynchronicityBundle,
    SynchronicityEnvelope, VectorId, VectorReading,
};
use atlas_detect::{DetectorConfig, build_atlas};
use libfuzzer_sys::fuzz_target;
use std::collections::BTreeMap;

struct ByteCursor<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> ByteCursor<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    fn next_u8(&mut self) -> u8 {
        let value = self.data.get(self.pos).copied().unwrap_or(0);
        self.pos = self.pos.wrapping_add(1);
        value
    }

    fn next_i16(&mut self) -> i16 {
        i16::from_le_bytes([self.next_u8(), self.next_u8()])
    }
}

fn build_score(mode_seed: u8, raw_seed: i16) -> Option<f64> {
    match mode_seed % 8 {
        0 => None,
        1 => Some(0.0),
        2 => Some(f64::from(raw_seed) / 16.0),
        3 => Some(f64::from(raw_seed)),
        4 => Some(f64::from(raw_seed) / 1_000_000.0),
        5 => Some(f64::NAN),
        6 => Some(f64::INFINITY),
        _ => Some(f64::NEG_INFINITY),
    }
}

fn build_frame(cursor: &mut ByteCursor<'_>) -> Frame {
    let week = cursor.next_u8() % 12;
    let domain = ["weather", "astronomy", "linguistics"][usize::from(cursor.next_u8()) % 3];

    let mut vectors = BTreeMap::new();
    let vector_count = usize::from(cursor.next_u8()) % (VectorId::ALL.len() + 1);
    for _ in 0..vector_count {
        let vector = VectorId::ALL[usize::from(cursor.next_u8()) % VectorId::ALL.len()];
        let score = build_score(cursor.next_u8(), cursor.next_i16());
        vectors.insert(vector, VectorReading { score });
    }

    Frame {
        window_start_utc: format!("2025-W{:02}", week + 1),
        window_end_utc: format!("2025-W{:02}", week + 2),
        domain: domain.to_string(),
        vectors,
        provenance_refs: vec![format!("{domain}:{week}")],
    }
}

fn build_influence(cursor: &mut ByteCursor<'_>) -> InfluenceBundle {
    let mut bundle = InfluenceBundle::default();
    let domain_count = usize::from(cursor.next_u8()) % 4;
    for _ in 0..domain_count {
        let domain = ["weather", "astronomy", "linguistics"][usize::from(cursor.next_u8()) % 3];
        let mut metrics = BTreeMap::new();
        metrics.insert(
            "CDEC".to_string(),
            f64::from(cursor.next_i16()) / 256.0,
        );
        bundle.ics.insert(domain.to_string(), metrics);
    }
    bundle
}

fn build_synchronicity(cursor: &mut ByteCursor<'_>) -> SynchronicityBundle {
    let envelope_count = usize::from(cursor.next_u8()) % 4;
    let envelopes = (0..envelope_count)
        .map(|_| {
            let mut metrics = BTreeMap::new();
            for key in ["TCI", "SIS", "CPA", "RAC", "PUR"] {
                if cursor.next_u8() & 1 == 1 {
                    metrics.insert(key.to_string(), f64::from(cursor.next_i16()) / 512.0);
                }
            }
            SynchronicityEnvelope {
                domains_involved: vec!["weather".to_string(), "astronomy".to_string()],
                vectors_activated: vec![
                    VectorId::ALL[usize::from(cursor.next_u8()) % VectorId::ALL.len()],
                ],
                metrics,
                time_window: format!("2025-W{:02}", cursor.next_u8() % 12 + 1),
                rarity_estimate: match cursor.next_u8() % 3 {
                    0 => None,
                    _ => Some(f64::from(cursor.next_i16()) / 1024.0),
                },
                provenance_refs: vec![],
            }
        })
        .collect();
    SynchronicityBundle { envelopes }
}

fuzz_target!(|data: &[u8]| {
    let mut cursor = ByteCursor::new(data);

    let frame_count = usize::from(cursor.next_u8()) % 32;
    let frames = (0..frame_count).map(|_| build_frame(&mut cursor)).collect();

    let seedpack = Seedpack {
        schema_version: SEEDPACK_SCHEMA_VERSION.to_string(),
        year: i32::from(cursor.next_i16()),
        window_granularity: "weekly".to_string(),
        frames,
        influence: build_influence(&mut cursor),
        synchronicity: build_synchronicity(&mut cursor),
    };

    // Non-finite scores must surface as errors, never as panics.
    let _ = build_atlas(&seedpack, &DetectorConfig::default(), "fuzz-run");
});
