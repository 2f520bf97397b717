//! # Window Benchmark

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use comms_if::wp::PathPoint;
use nalgebra::Vector3;
use wp_lib::{locator::nearest_index, window::build_window};

/// A closed track of the given number of points, roughly the shape of a test track loop.
fn track(num_points: usize) -> Vec<PathPoint> {
    (0..num_points)
        .map(|i| {
            let theta = 2.0 * std::f64::consts::PI * (i as f64) / (num_points as f64);
            PathPoint::from_position(
                400.0 * theta.cos(),
                150.0 * theta.sin() + 20.0 * (3.0 * theta).sin(),
                0.0,
            )
        })
        .collect()
}

fn window_benchmark(c: &mut Criterion) {
    let path = track(10_000);
    let position_m = Vector3::new(-120.0, 140.0, 0.0);

    c.bench_function("nearest_index", |b| {
        b.iter(|| nearest_index(black_box(&path), black_box(&position_m)))
    });

    let start = path.len() - 20;

    c.bench_function("build_window", |b| {
        b.iter(|| build_window(black_box(&path), black_box(start), 200, 11.1))
    });

    c.bench_function("nearest_and_build", |b| {
        b.iter(|| {
            let start = nearest_index(black_box(&path), black_box(&position_m)).unwrap_or(0);
            build_window(&path, start, 50, 11.1)
        })
    });
}

criterion_group!(benches, window_benchmark);
criterion_main!(benches);
