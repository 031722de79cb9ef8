#![allow(missing_docs)]

use criterion::{criterion_group, criterion_main, Criterion};
use std::hint::black_box;
use wireform::{Wireform, WireformObject};

#[derive(WireformObject, Clone)]
struct Sample {
    /// Identifier
    id: i64,
    /// Display label
    label: String,
    /// Measurement channel values
    channels: Vec<f64>,
    /// Optional annotation
    note: Option<String>,
}

#[derive(WireformObject, Clone)]
struct Batch {
    sequence: i32,
    samples: Vec<Sample>,
}

fn batch() -> Batch {
    Batch {
        sequence: 7,
        samples: (0..100)
            .map(|i| Sample {
                id: i,
                label: format!("sample-{i}"),
                channels: (0..16).map(|c| (i * c) as f64 * 0.25).collect(),
                note: if i % 3 == 0 {
                    Some("calibrated".to_string())
                } else {
                    None
                },
            })
            .collect(),
    }
}

fn bench_roundtrip(c: &mut Criterion) {
    let engine = Wireform::new();
    let data = batch();

    let json = engine.to_json_string(&data).expect("encode json");
    let packed = engine.to_bytes(&data).expect("encode bytes");
    let msgpack = engine.to_msgpack(&data).expect("encode msgpack");

    c.bench_function("encode_json", |b| {
        b.iter(|| engine.to_json_string(black_box(&data)).expect("encode"));
    });

    c.bench_function("decode_json", |b| {
        b.iter(|| {
            engine
                .from_json_str::<Batch>(black_box(&json))
                .expect("decode")
        });
    });

    c.bench_function("encode_bytes", |b| {
        b.iter(|| engine.to_bytes(black_box(&data)).expect("encode"));
    });

    c.bench_function("decode_bytes", |b| {
        b.iter(|| engine.from_bytes::<Batch>(black_box(&packed)).expect("decode"));
    });

    c.bench_function("decode_msgpack", |b| {
        b.iter(|| {
            engine
                .from_msgpack::<Batch>(black_box(&msgpack))
                .expect("decode")
        });
    });
}

criterion_group!(benches, bench_roundtrip);
criterion_main!(benches);
