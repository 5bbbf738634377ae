//! Benchmarks for the frame compile pipeline

use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use quadbatch_render::{
    BatchCompiler, BatchCompilerDescriptor, BufferCapacity, MergePolicy, Quad, Sprite, TextureId,
    TextureMetadata, TextureRegistry,
};

fn scene(quads: usize) -> (TextureRegistry, Vec<Sprite>) {
    let mut registry = TextureRegistry::with_capacity(8);
    let textures: Vec<TextureId> = (0..8)
        .map(|i| registry.register(TextureMetadata::new(64, 64, i % 4 == 0)))
        .collect();

    let sprites = (0..quads)
        .map(|i| {
            let x = (i % 100) as f32 * 10.0;
            let y = (i / 100) as f32 * 10.0;
            let z = (i % 16) as f32 / 16.0;
            Sprite::new(
                textures[i % textures.len()],
                Quad::from_rect(x, y + 10.0, x + 10.0, y),
                z,
            )
        })
        .collect();

    (registry, sprites)
}

fn compiler(policy: MergePolicy, quads: usize) -> BatchCompiler {
    BatchCompiler::new(
        BatchCompilerDescriptor::new()
            .with_capacity(BufferCapacity::for_quads(quads))
            .with_merge_policy(policy),
    )
}

fn bench_compile(c: &mut Criterion) {
    let mut group = c.benchmark_group("compile");

    for size in [100, 1000, 10000] {
        let (registry, sprites) = scene(size);
        group.throughput(Throughput::Elements(size as u64));

        group.bench_with_input(BenchmarkId::new("exact_depth", size), &size, |b, &size| {
            let mut compiler = compiler(MergePolicy::ExactDepth, size);
            b.iter(|| compiler.compile(black_box(&sprites), &registry).unwrap());
        });

        group.bench_with_input(BenchmarkId::new("relax_opaque", size), &size, |b, &size| {
            let mut compiler = compiler(MergePolicy::RelaxOpaqueDepth, size);
            b.iter(|| compiler.compile(black_box(&sprites), &registry).unwrap());
        });
    }

    group.finish();
}

criterion_group!(benches, bench_compile);
criterion_main!(benches);
