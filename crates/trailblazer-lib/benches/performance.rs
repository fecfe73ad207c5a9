//! Performance benchmarks for trailblazer-lib
//!
//! Run with: cargo bench --package trailblazer-lib

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use time::Duration;
use time::macros::datetime;
use trailblazer_lib::{
    Config, Point, RawPoint, Target, TrailNetwork, build_graph, reduce_points, simplify_graph,
};

/// Generate a realistic walked track with the specified number of points, one every 15 s
fn generate_track(num_points: usize, track: u32, base_lat: f64, base_lon: f64) -> Vec<RawPoint> {
    let start = datetime!(2023-05-01 08:00:00 UTC);
    (0..num_points)
        .map(|i| {
            let t = i as f64 / num_points as f64;
            let lat = base_lat + t * 0.05 + (t * 50.0).sin() * 0.001;
            let lon = base_lon + t * 0.05 + (t * 30.0).cos() * 0.001;
            RawPoint::new(lat, lon, start + Duration::seconds(15 * i as i64), track, 0)
        })
        .collect()
}

/// Generate overlapping tracks spread across an area
fn generate_area(num_tracks: usize, points_per_track: usize) -> Vec<RawPoint> {
    (0..num_tracks)
        .flat_map(|i| {
            let lat_offset = (i % 5) as f64 * 0.01;
            let lon_offset = (i / 5) as f64 * 0.01;
            generate_track(
                points_per_track,
                i as u32,
                41.5 + lat_offset,
                2.0 + lon_offset,
            )
        })
        .collect()
}

/// Targets scattered over the same area
fn generate_targets(count: usize) -> Vec<Target> {
    (0..count)
        .map(|i| {
            let t = i as f64 / count as f64;
            Target::new(
                format!("monument {i}"),
                Point::new(41.5 + t * 0.09, 2.0 + (t * 17.0).sin().abs() * 0.09),
            )
        })
        .collect()
}

// ============================================================================
// Core Benchmarks - Key performance indicators
// ============================================================================

fn bench_reduction(c: &mut Criterion) {
    let mut group = c.benchmark_group("reduction");
    group.sample_size(10);

    let points = generate_area(20, 1_000);
    group.throughput(Throughput::Elements(points.len() as u64));

    for n_clusters in [100, 500] {
        let config = Config {
            n_clusters,
            ..Config::default()
        };
        group.bench_with_input(
            BenchmarkId::new("20x1k_points", n_clusters),
            &config,
            |b, config| {
                b.iter(|| reduce_points(&points, config).unwrap());
            },
        );
    }

    group.finish();
}

fn bench_graph(c: &mut Criterion) {
    let mut group = c.benchmark_group("graph");

    let config = Config::default();
    let segments = reduce_points(&generate_area(20, 1_000), &config).unwrap();
    group.throughput(Throughput::Elements(segments.len() as u64));

    group.bench_function("build", |b| {
        b.iter(|| build_graph(&segments));
    });

    let graph = build_graph(&segments);
    group.bench_function("simplify", |b| {
        b.iter(|| simplify_graph(&graph, config.epsilon_degrees));
    });

    group.finish();
}

fn bench_routing(c: &mut Criterion) {
    let mut group = c.benchmark_group("routing");

    let network = TrailNetwork::build(&generate_area(20, 1_000), Config::default()).unwrap();
    let origin = Point::new(41.5, 2.0);

    for count in [10, 200] {
        let targets = generate_targets(count);
        group.throughput(Throughput::Elements(count as u64));
        group.bench_with_input(BenchmarkId::new("targets", count), &targets, |b, targets| {
            b.iter(|| network.find_routes(origin, targets).unwrap());
        });
    }

    group.finish();
}

fn bench_pipeline(c: &mut Criterion) {
    let mut group = c.benchmark_group("pipeline");
    group.sample_size(10);

    let points = generate_area(10, 1_000);
    group.throughput(Throughput::Elements(points.len() as u64));
    group.bench_function("build_10x1k", |b| {
        b.iter(|| TrailNetwork::build(&points, Config::default()).unwrap());
    });

    group.finish();
}

// ============================================================================
// Criterion Configuration
// ============================================================================

criterion_group!(
    benches,
    bench_reduction,
    bench_graph,
    bench_routing,
    bench_pipeline,
);

criterion_main!(benches);
