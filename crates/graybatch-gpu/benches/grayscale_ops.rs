use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use graybatch_gpu::*;

fn cpu_gray(rgb: &[u8]) -> Vec<u8> {
    rgb.chunks_exact(3)
        .map(|px| (0.299 * px[0] as f32 + 0.587 * px[1] as f32 + 0.114 * px[2] as f32).round() as u8)
        .collect()
}

fn test_image(side: usize) -> Vec<u8> {
    (0..side * side * 3).map(|i| (i % 251) as u8).collect()
}

fn bench_round_trip<R: Runtime>(c: &mut Criterion, runtime: &R) {
    let mut group = c.benchmark_group(format!("grayscale_{}", runtime.name()));

    for side in [64usize, 256, 1024].iter() {
        let rgb = test_image(*side);
        let region = Region::new(*side, *side);

        // Baseline without staging
        group.bench_with_input(BenchmarkId::new("direct", side), side, |bench, _| {
            bench.iter(|| {
                let result = cpu_gray(black_box(&rgb));
                black_box(result);
            });
        });

        // Full acquire/upload/compute/download/release cycle
        group.bench_with_input(BenchmarkId::new("round_trip", side), side, |bench, _| {
            bench.iter(|| {
                let result = grayscale(black_box(runtime), black_box(&rgb), region).unwrap();
                black_box(result);
            });
        });

        // Kernel only, buffers staged once
        let mut pair = GpuAllocator::new(runtime)
            .acquire(region.pixels() * 3, region.pixels())
            .unwrap();
        upload(&rgb, &mut pair.input).unwrap();
        group.bench_with_input(BenchmarkId::new("kernel", side), side, |bench, _| {
            bench.iter(|| {
                rgb_to_gray_execute(black_box(&pair.input), &mut pair.output, region).unwrap();
            });
        });
    }
    group.finish();
}

fn bench_host(c: &mut Criterion) {
    let runtime = HostRuntime::new();
    bench_round_trip(c, &runtime);
}

#[cfg(any(feature = "cuda", feature = "wgpu"))]
fn bench_device(c: &mut Criterion) {
    #[cfg(feature = "cuda")]
    let runtime = init_cuda_runtime();
    #[cfg(all(feature = "wgpu", not(feature = "cuda")))]
    let runtime = init_wgpu_runtime();

    let Ok(runtime) = runtime else {
        println!("GPU not available, skipping benchmarks");
        return;
    };
    bench_round_trip(c, &runtime);
}

#[cfg(any(feature = "cuda", feature = "wgpu"))]
criterion_group!(benches, bench_host, bench_device);

#[cfg(not(any(feature = "cuda", feature = "wgpu")))]
criterion_group!(benches, bench_host);

criterion_main!(benches);
