use criterion::{black_box, criterion_group, criterion_main, Criterion};
use criterion::BenchmarkId;
use ndarray::prelude::*;
use rand;

use nuclei_metrics::{default_properties, regionprops_table, measure::collect_regions};

/// Blocky random labels: each 8 x 8 tile of every plane gets one
/// label out of `n_labels`, so regions span many slices.
fn random_labels(shape : (usize, usize, usize), n_labels : u32) -> ArrayD<u32> {
    let tiles = Array3::<u32>::from_shape_simple_fn(
        (shape.0, shape.1 / 8 + 1, shape.2 / 8 + 1),
        || rand::random::<u32>() % (n_labels + 1),
    );
    Array3::from_shape_fn(shape, |(z, y, x)| tiles[[z, y / 8, x / 8]]).into_dyn()
}

/// Accumulation cost with and without an intensity image, and
/// the full table built from it.
fn criterion_benchmark_regionprops(c: &mut Criterion) {
    let mut bench_group = c.benchmark_group("Region accumulation");

    for &depth in [8usize, 64].iter() {
        let shape = (depth, 256, 256);
        let labels = random_labels(shape, 200);
        let intensity = Array3::<f64>::from_shape_simple_fn(shape, || rand::random::<f64>() * 4096.0)
            .into_dyn();

        bench_group.bench_with_input(
            BenchmarkId::new("Labels only", depth),
            &labels,
            |bench, labels| {
                bench.iter(|| black_box(collect_regions(labels.view(), None).unwrap()))
            },
        );

        bench_group.bench_with_input(
            BenchmarkId::new("Labels and intensity", depth),
            &labels,
            |bench, labels| {
                bench.iter(|| black_box(collect_regions(labels.view(), Some(intensity.view())).unwrap()))
            },
        );

        let props = default_properties();
        bench_group.bench_with_input(
            BenchmarkId::new("Default property table", depth),
            &labels,
            |bench, labels| {
                bench.iter(|| black_box(regionprops_table(labels.view(), Some(intensity.view()), &props).unwrap()))
            },
        );
    }
    bench_group.finish();
}

criterion_group!(benches, criterion_benchmark_regionprops);
criterion_main!(benches);
