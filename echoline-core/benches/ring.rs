//! Ring primitive benchmarks at realistic audio-session sizes.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use echoline_core::ring::RingBuffer;

fn bench_ring(c: &mut Criterion) {
    // ~2.1 s at 48 kHz, the capacity a 2000 ms delay session uses.
    let cap = 100_800;
    let block = vec![0.25f32; 512];
    let mut out = vec![0.0f32; 512];

    c.bench_function("ring_write_512", |b| {
        let mut rb = RingBuffer::new(cap);
        let mut w = 0usize;
        b.iter(|| {
            rb.write(black_box(w), black_box(&block), 0.8, 0.8);
            w = (w + block.len()) % cap;
        });
    });

    c.bench_function("ring_read_512", |b| {
        let rb = RingBuffer::new(cap);
        let mut r = cap - 100; // force the wrap split on most iterations
        b.iter(|| {
            rb.read(black_box(r), black_box(&mut out));
            r = (r + out.len()) % cap;
        });
    });

    c.bench_function("ring_accumulate_512", |b| {
        let mut rb = RingBuffer::new(cap);
        let mut w = 0usize;
        b.iter(|| {
            rb.accumulate(black_box(w), black_box(&block), 0.7, 0.7);
            w = (w + block.len()) % cap;
        });
    });
}

criterion_group!(benches, bench_ring);
criterion_main!(benches);
