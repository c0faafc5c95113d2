// VRAM allocator benchmarks
// Performance benchmarks for pool allocation, release and frame pacing

use criterion::{criterion_group, criterion_main, Criterion};
use std::hint::black_box;
use trigon_rs::engine::{Engine, UpdateFlags};
use trigon_rs::gpu::PolyKind;
use trigon_rs::vram::{Pool, BANK_SIZE};

/// Benchmark allocate/release churn at various block sizes
fn bench_pool_allocation(c: &mut Criterion) {
    let mut group = c.benchmark_group("pool_allocation");

    group.bench_function("alloc_release_1k", |b| {
        let mut pool = Pool::new(4 * BANK_SIZE).unwrap();

        b.iter(|| {
            let record = pool.allocate(black_box(1024), 8).unwrap();
            pool.release(record).unwrap();
        });
    });

    group.bench_function("alloc_release_interleaved", |b| {
        let mut pool = Pool::new(4 * BANK_SIZE).unwrap();

        b.iter(|| {
            // Allocate 32 blocks, free every other one, then the rest,
            // forcing first-fit scans and gap coalescing
            let records: Vec<_> = (0..32)
                .map(|_| pool.allocate(4096, 8).unwrap())
                .collect();
            for record in records.iter().step_by(2) {
                pool.release(*record).unwrap();
            }
            for record in records.iter().skip(1).step_by(2) {
                pool.release(*record).unwrap();
            }
        });
    });

    group.bench_function("clone_release", |b| {
        let mut pool = Pool::new(BANK_SIZE).unwrap();
        let record = pool.allocate(8192, 8).unwrap();

        b.iter(|| {
            let clone = pool.clone_record(black_box(record)).unwrap();
            pool.release(clone).unwrap();
        });
    });

    group.finish();
}

/// Benchmark texel uploads into a resident record
fn bench_pool_upload(c: &mut Criterion) {
    let mut group = c.benchmark_group("pool_upload");

    group.bench_function("upload_64k", |b| {
        let mut pool = Pool::new(4 * BANK_SIZE).unwrap();
        let record = pool.allocate(64 * 1024, 8).unwrap();
        let data = vec![0x5Au8; 64 * 1024];

        b.iter(|| {
            pool.upload(record, black_box(&data)).unwrap();
        });
    });

    group.finish();
}

/// Benchmark a full engine frame including the raster wait
fn bench_engine_frame(c: &mut Criterion) {
    let mut group = c.benchmark_group("engine_frame");
    group.sample_size(20);

    group.bench_function("frame_with_geometry", |b| {
        let mut engine = Engine::new();
        engine.init_single().unwrap();
        engine.set_draw_callback(|gpu| {
            gpu.begin(PolyKind::Triangles);
            for _ in 0..300 {
                gpu.vertex(0.0, 0.0, 5.0);
            }
            gpu.end();
        });

        b.iter(|| {
            engine.run_frame().unwrap();
            engine.wait_for_sync(UpdateFlags::none());
            black_box(engine.cpu_percent());
        });
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_pool_allocation,
    bench_pool_upload,
    bench_engine_frame
);
criterion_main!(benches);
