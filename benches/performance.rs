//! Performance benchmarks for route-locator
//!
//! Run with: cargo bench

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use geo::{Coord, Point};
use route_locator::{
    CancelToken, Event, EventLocator, LocatorConfig, MeasuredPolyline, RouteTable,
};

/// Build a synthetic network of gently curving east-west routes.
fn build_network(route_count: usize, vertices_per_route: usize) -> RouteTable {
    let mut table = RouteTable::new();
    for r in 0..route_count {
        let id = format!("{:03}i", (r % 999) + 1);
        let y = r as f64 * 50.0;
        let points = (0..vertices_per_route)
            .map(|i| {
                let t = i as f64 / (vertices_per_route - 1) as f64;
                (
                    Coord {
                        x: t * 1000.0,
                        y: y + (t * 40.0).sin() * 5.0,
                    },
                    t * 1000.0,
                )
            })
            .collect();
        table.insert(MeasuredPolyline::new(id, points).unwrap());
    }
    table
}

fn generate_point_events(count: usize, route_count: usize) -> Vec<Event> {
    (0..count)
        .map(|i| {
            let route = format!("{:03}", (i % route_count) + 1);
            let measure = (i as f64 * 7.3) % 1000.0;
            Event::point(i as i64, route, measure)
        })
        .collect()
}

fn bench_locate_batch(c: &mut Criterion) {
    let locator = EventLocator::new(build_network(100, 200), LocatorConfig::default());
    let cancel = CancelToken::new();

    let mut group = c.benchmark_group("locate_batch");
    for batch_size in [100usize, 1_000, 10_000] {
        let events = generate_point_events(batch_size, 100);
        group.throughput(Throughput::Elements(batch_size as u64));
        group.bench_with_input(
            BenchmarkId::from_parameter(batch_size),
            &events,
            |b, events| b.iter(|| locator.locate_batch(events, &cancel)),
        );
    }
    group.finish();
}

fn bench_pair_and_locate(c: &mut Criterion) {
    let locator = EventLocator::new(build_network(20, 200), LocatorConfig::default());

    // Begin/end pairs, each pair near one route.
    let points: Vec<Point<f64>> = (0..2_000)
        .map(|i| {
            let y = ((i / 2) % 20) as f64 * 50.0 + 2.0;
            Point::new((i as f64 * 3.1) % 900.0, y)
        })
        .collect();

    let mut group = c.benchmark_group("pair_and_locate");
    group.throughput(Throughput::Elements(points.len() as u64 / 2));
    group.bench_function("2000_points", |b| {
        b.iter(|| locator.pair_and_locate(&points, 25.0).unwrap())
    });
    group.finish();
}

criterion_group!(benches, bench_locate_batch, bench_pair_and_locate);
criterion_main!(benches);
