//! Routing benchmarks.
//!
//! Run with: `cargo bench -p trellis-router`

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use http::Method;
use trellis_router::{Route, Router};

const METHODS: [Method; 9] = [
    Method::HEAD,
    Method::GET,
    Method::POST,
    Method::PATCH,
    Method::PUT,
    Method::DELETE,
    Method::CONNECT,
    Method::OPTIONS,
    Method::TRACE,
];

const PREFIXES: &str = "abc1def2ghi3jkl4mno5pqr6stu7vwx8yz9_0-";

/// Builds the high-load table: 38 prefixes times 4 routes per method,
/// plus one deep parameterized route under GET.
fn build_router() -> Router<usize> {
    let mut router = Router::new();
    let mut id = 0;

    for method in &METHODS {
        for symbol in PREFIXES.chars() {
            for suffix in [
                "load",
                "load/route/test/help",
                "load/route/test/help/test",
                "load/route/test/exam/test/a",
            ] {
                let path = format!("/{symbol}test-example_high/{suffix}");
                router
                    .add_route(Route::with_method(&path, method.clone(), id).unwrap())
                    .unwrap();
                id += 1;
            }
        }
    }

    router
        .add_route(Route::get("/news/:id/comments/:id/statistics/test/test", id).unwrap())
        .unwrap();
    router
}

fn bench_static_match(c: &mut Criterion) {
    let router = build_router();

    c.bench_function("static_match", |b| {
        b.iter(|| {
            black_box(router.resolve(&Method::GET, "/mtest-example_high/load/route/test/help"));
        });
    });
}

fn bench_param_match(c: &mut Criterion) {
    let router = build_router();

    c.bench_function("param_match", |b| {
        b.iter(|| {
            black_box(router.resolve(&Method::GET, "/news/103/comments/10/statistics/test/test"));
        });
    });
}

fn bench_method_not_allowed(c: &mut Criterion) {
    let router = build_router();

    c.bench_function("method_not_allowed", |b| {
        b.iter(|| {
            black_box(router.resolve(&Method::POST, "/news/103/comments/10/statistics/test/test"));
        });
    });
}

fn bench_miss(c: &mut Criterion) {
    let router = build_router();

    c.bench_function("miss", |b| {
        b.iter(|| {
            black_box(router.resolve(&Method::GET, "/api/v1/nonexistent/path"));
        });
    });
}

fn bench_scaling(c: &mut Criterion) {
    let mut group = c.benchmark_group("scaling");

    for num_routes in [10, 50, 100, 500, 1000] {
        let mut router = Router::new();
        for i in 0..num_routes {
            router
                .add_route(Route::get(&format!("/api/v1/resource{i}/:id"), i).unwrap())
                .unwrap();
        }

        group.bench_with_input(
            BenchmarkId::new("param_match", num_routes),
            &num_routes,
            |b, &n| {
                let path = format!("/api/v1/resource{}/12345", n - 1);
                b.iter(|| black_box(router.resolve(&Method::GET, &path)));
            },
        );
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_static_match,
    bench_param_match,
    bench_method_not_allowed,
    bench_miss,
    bench_scaling
);
criterion_main!(benches);
