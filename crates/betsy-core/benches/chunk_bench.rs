//! Criterion benchmarks for chunking and command framing.
//!
//! Run with:
//! ```bash
//! cargo bench --package betsy-core --bench chunk_bench
//! ```

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use betsy_core::protocol::FRAME_CHUNK_SIZE;
use betsy_core::{chunks, decode_command, Command, TileGeometry};

fn bench_frame_to_datagrams(c: &mut Criterion) {
    let frame = vec![0x5Au8; TileGeometry::BETSY.frame_len()];
    let mut out = Vec::with_capacity(FRAME_CHUNK_SIZE + 32);

    c.bench_function("frame_to_datagrams", |b| {
        b.iter(|| {
            for chunk in chunks(black_box(&frame), FRAME_CHUNK_SIZE) {
                out.clear();
                Command::Data {
                    buffer: 0,
                    offset: chunk.offset,
                    payload: chunk.bytes,
                }
                .encode_into(&mut out);
                black_box(&out);
            }
        })
    });
}

fn bench_decode_data(c: &mut Criterion) {
    let payload = vec![0u8; FRAME_CHUNK_SIZE];
    let datagram = Command::Data {
        buffer: 1,
        offset: 1024,
        payload: &payload,
    }
    .to_bytes();

    c.bench_function("decode_data", |b| {
        b.iter(|| decode_command(black_box(&datagram)).expect("valid datagram"))
    });
}

criterion_group!(benches, bench_frame_to_datagrams, bench_decode_data);
criterion_main!(benches);
