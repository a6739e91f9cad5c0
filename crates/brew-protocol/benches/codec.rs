//! Codec benchmarks for brew-protocol.

use brew_protocol::{codec, ChannelDeclaration, MessageType, Value};
use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};

fn bench_encode_message(c: &mut Criterion) {
    let value = Value::Range(512);

    let mut group = c.benchmark_group("encode");
    group.bench_function("range_message", |b| {
        b.iter(|| codec::encode_message(black_box("bench"), black_box("counter"), &value))
    });
    group.finish();
}

fn bench_decode_message(c: &mut Criterion) {
    let encoded = codec::encode_message("bench", "time", &Value::from("x".repeat(64))).unwrap();

    let mut group = c.benchmark_group("decode");
    group.throughput(Throughput::Bytes(encoded.len() as u64));
    group.bench_function("string_64B", |b| {
        b.iter(|| codec::decode_message(black_box(&encoded)))
    });
    group.finish();
}

fn bench_encode_config(c: &mut Criterion) {
    let publishers: Vec<_> = (0..32)
        .map(|i| ChannelDeclaration::publisher(format!("pub-{i}"), &Value::Range(0)))
        .collect();
    let subscribers: Vec<_> = (0..32)
        .map(|i| ChannelDeclaration::subscriber(format!("sub-{i}"), MessageType::String))
        .collect();

    c.bench_function("config_64_channels", |b| {
        b.iter(|| codec::encode_config("bench", "", black_box(&publishers), black_box(&subscribers)))
    });
}

criterion_group!(
    benches,
    bench_encode_message,
    bench_decode_message,
    bench_encode_config
);
criterion_main!(benches);
