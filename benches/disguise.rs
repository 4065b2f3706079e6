//! Benchmarks for seed generation, matrix sampling and the disguise transform
//!
//! Run with: cargo bench --bench disguise
//!
//! The solver dominates any real run; these measure the generator's own cost
//! so it stays negligible next to a multi-second solver budget.

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use opaque_pell::expr::all_hold;
use opaque_pell::rng::{Pcg32, SeedableRng};
use opaque_pell::{
    disguise_with, pell_seeds, EntryRange, GeneratorMode, MatrixSampler, PellSeed, QuadraticForm,
    TransformMatrix,
};
use std::hint::black_box;

fn bench_seeds(c: &mut Criterion) {
    c.bench_function("pell_seeds/complete", |b| {
        b.iter(|| {
            for seed in pell_seeds(black_box(GeneratorMode::Complete)) {
                black_box(seed);
            }
        });
    });
}

fn bench_sampling(c: &mut Criterion) {
    let mut group = c.benchmark_group("matrix_sampling");
    for bound in [1i64, 10, 1000] {
        let sampler = MatrixSampler::new(EntryRange::symmetric(bound).unwrap_or_default())
            .unwrap_or_default();
        let mut rng = Pcg32::seed_from_u64(bound as u64);
        group.throughput(Throughput::Elements(1));
        group.bench_with_input(BenchmarkId::from_parameter(bound), &bound, |b, _| {
            b.iter(|| black_box(sampler.sample(&mut rng)));
        });
    }
    group.finish();
}

fn bench_disguise(c: &mut Criterion) {
    let matrix = TransformMatrix::new(7, -3, 2, 9).unwrap_or(TransformMatrix::identity());
    let mut group = c.benchmark_group("disguise");
    for seed in pell_seeds(GeneratorMode::Complete) {
        group.bench_with_input(BenchmarkId::new("product", seed.d()), &seed, |b, seed| {
            b.iter(|| black_box(disguise_with(seed, black_box(matrix))));
        });
        group.bench_with_input(BenchmarkId::new("expand", seed.d()), &seed, |b, seed| {
            b.iter(|| black_box(QuadraticForm::expand(seed.d(), black_box(&matrix))));
        });
    }
    group.finish();
}

fn bench_evaluation(c: &mut Criterion) {
    let Ok(seed) = PellSeed::new(49) else {
        return;
    };
    let matrix = TransformMatrix::new(7, -3, 2, 9).unwrap_or(TransformMatrix::identity());
    let disguised = disguise_with(&seed, matrix);
    let constraints = disguised.constraints();
    let (u, v) = disguised.vars();

    c.bench_function("evaluate/box_20x20", |b| {
        b.iter(|| {
            for uv in -10i128..10 {
                for vv in -10i128..10 {
                    black_box(all_hold(&constraints, &[(u, uv), (v, vv)]));
                }
            }
        });
    });
}

criterion_group!(
    benches,
    bench_seeds,
    bench_sampling,
    bench_disguise,
    bench_evaluation
);
criterion_main!(benches);
