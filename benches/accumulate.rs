use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use gausrepr::{DenseRepr, Rotation, SparseMat, SparseRepr, NO_ROTATION};
use nalgebra::DMatrix;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::StandardNormal;

/// Banded pattern with `2 * half_width + 1` diagonals.
fn banded(n: usize, half_width: usize) -> SparseMat<f64> {
    let mut triplets = Vec::new();
    for j in 0..n {
        for i in j.saturating_sub(half_width)..(j + half_width + 1).min(n) {
            triplets.push((i, j, 1.0));
        }
    }
    SparseMat::from_triplets(n, n, &triplets).unwrap()
}

fn bench_dense_window(c: &mut Criterion) {
    let mut group = c.benchmark_group("dense_window");
    for n in [16, 64, 256] {
        let mut repr = DenseRepr::<f64>::dense(n, n);
        repr.update_var(&DMatrix::from_element(n, n, 1.0));
        let mut rng = StdRng::seed_from_u64(0);

        group.bench_with_input(BenchmarkId::new("sample_accumulate_x8", n), &n, |b, _| {
            b.iter(|| {
                for _ in 0..8 {
                    let f = repr.sample(|| rng.sample(StandardNormal)).map(|x| -x * x);
                    repr.accumulate_gradient(&f);
                }
                black_box(repr.gradient_mean().sum())
            })
        });
    }
    group.finish();
}

fn bench_sparse_window(c: &mut Criterion) {
    let mut group = c.benchmark_group("sparse_window");
    for n in [64, 256, 1024] {
        let t = banded(n, 2);
        let mut repr = SparseRepr::<f64>::from_pattern(&t);
        repr.update_var(&t);
        let mut rng = StdRng::seed_from_u64(0);

        group.bench_with_input(BenchmarkId::new("sample_accumulate_x8", n), &n, |b, _| {
            b.iter(|| {
                for _ in 0..8 {
                    let f = repr.sample(|| rng.sample(StandardNormal)).map(|x| -x * x);
                    repr.accumulate_gradient(&f);
                }
                black_box(repr.gradient_mean().values().iter().sum::<f64>())
            })
        });
    }
    group.finish();
}

fn bench_rotated_sample(c: &mut Criterion) {
    let mut group = c.benchmark_group("rotated_sample");
    for n in [16, 64] {
        let left = DMatrix::from_fn(n, n, |i, j| if i >= j { 1.0 / (1 + i - j) as f64 } else { 0.0 });
        let mut repr = DenseRepr::<f64>::dense(n, n);
        repr.update_var(&DMatrix::from_element(n, n, 1.0));
        let mut rng = StdRng::seed_from_u64(0);

        group.bench_with_input(BenchmarkId::new("identity", n), &n, |b, _| {
            b.iter(|| {
                black_box(
                    repr.sample_rotated(NO_ROTATION, NO_ROTATION, || rng.sample(StandardNormal))
                        .sum(),
                )
            })
        });
        group.bench_with_input(BenchmarkId::new("lower_triangular", n), &n, |b, _| {
            b.iter(|| {
                black_box(
                    repr.sample_rotated(Rotation::Operator(&left), NO_ROTATION, || {
                        rng.sample(StandardNormal)
                    })
                    .sum(),
                )
            })
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_dense_window,
    bench_sparse_window,
    bench_rotated_sample
);
criterion_main!(benches);
