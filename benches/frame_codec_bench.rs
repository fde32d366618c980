//! Performance benchmarks for FrameCodec.
//!
//! Run benchmarks with:
//! ```sh
//! cargo bench --bench frame_codec_bench
//! ```

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use netlock_protocol::{AddressLimits, FrameCodec, ProtocolTable};
use std::hint::black_box;

/// Benchmark encoding an open command.
fn bench_encode(c: &mut Criterion) {
    let mut group = c.benchmark_group("encode");
    group.throughput(Throughput::Elements(1));

    let codec = FrameCodec::default();

    group.bench_function("encode_open_command", |b| {
        b.iter(|| {
            let frame = codec.encode(black_box(1), black_box(12)).unwrap();
            black_box(frame);
        });
    });

    group.finish();
}

/// Benchmark decoding a controller reply with and without a terminator.
fn bench_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("decode");
    group.throughput(Throughput::Elements(1));

    let tables = [
        ("plain", ProtocolTable::default()),
        (
            "terminated",
            ProtocolTable {
                terminator: Some(0x0D),
                ..ProtocolTable::default()
            },
        ),
    ];

    for (name, table) in tables {
        let codec = FrameCodec::new(table, AddressLimits::default());
        let reply = codec.response_bytes(1, 12, 0x0000).unwrap();

        group.bench_with_input(BenchmarkId::new("decode_ack", name), &reply, |b, reply| {
            b.iter(|| {
                let response = codec.decode(black_box(reply)).unwrap();
                black_box(response);
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_encode, bench_decode);
criterion_main!(benches);
