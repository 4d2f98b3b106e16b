use std::hint::black_box;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::{rngs::StdRng, Rng, SeedableRng};
use tensorshim::{
    new_scalar_string, new_vector_numeric, new_vector_string, CpuAllocator, HostEngine,
    INLINE_CAPACITY,
};

fn sample_strings(count: usize, max_len: usize) -> Vec<Vec<u8>> {
    let mut rng = StdRng::seed_from_u64(0);
    (0..count)
        .map(|_| {
            let mut bytes = vec![0u8; rng.random_range(0..=max_len)];
            rng.fill(&mut bytes[..]);
            bytes
        })
        .collect()
}

fn bench_vector_string(c: &mut Criterion) {
    let mut group = c.benchmark_group("VectorString");
    let engine = HostEngine::default();

    for count in [16, 1024, 65536] {
        for (label, max_len) in [("inline", INLINE_CAPACITY), ("heap", 256)] {
            let strings = sample_strings(count, max_len);
            group.bench_with_input(
                BenchmarkId::new(label, count),
                &strings,
                |b, strings| {
                    b.iter(|| new_vector_string(&engine, black_box(strings), CpuAllocator))
                },
            );
        }
    }
    group.finish();
}

fn bench_scalar_string(c: &mut Criterion) {
    let engine = HostEngine::default();
    let payload = vec![b'x'; 4096];

    c.bench_function("scalar_string_4k", |b| {
        b.iter(|| new_scalar_string(&engine, black_box(&payload), CpuAllocator))
    });
}

fn bench_vector_numeric(c: &mut Criterion) {
    let engine = HostEngine::default();
    let values = vec![1.0f32; 1 << 16];

    c.bench_function("vector_numeric_f32", |b| {
        b.iter(|| new_vector_numeric(&engine, black_box(&values)))
    });
}

criterion_group!(
    benches,
    bench_vector_string,
    bench_scalar_string,
    bench_vector_numeric
);
criterion_main!(benches);
