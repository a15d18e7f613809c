//! Instrumentation hot-path benchmarks
//!
//! Measures the in-memory work done for every weighted request: the counter
//! increment, the gauge update and building the response. No network I/O.
//!
//! Run with: `cargo bench`

use axum::http::Method;
use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use loadgauge::{
    metrics::Metrics,
    respond::{DisplayMessage, InstrumentedHandler},
    weights::{Weight, WeightTable},
};

fn bench_apply_weight(c: &mut Criterion) {
    let metrics = Metrics::new().expect("should create metrics");
    let mut group = c.benchmark_group("apply_weight");

    for weight in [0, 10, -1] {
        group.bench_with_input(BenchmarkId::from_parameter(weight), &weight, |b, w| {
            b.iter(|| metrics.apply_weight(Weight::new(*w)));
        });
    }

    group.finish();
}

fn bench_instrumented_handle(c: &mut Criterion) {
    let metrics = Metrics::new().expect("should create metrics");
    let handler = InstrumentedHandler::new(
        "/ten",
        Weight::new(10),
        metrics,
        DisplayMessage::new("nothing"),
    );

    // Dropping the response counts an error; irrelevant for timing.
    c.bench_function("instrumented_handle", |b| {
        b.iter(|| handler.handle(&Method::GET));
    });
}

fn bench_help_text(c: &mut Criterion) {
    let table = WeightTable::builtin();
    c.bench_function("help_text", |b| b.iter(|| table.help_text()));
}

criterion_group!(
    benches,
    bench_apply_weight,
    bench_instrumented_handle,
    bench_help_text
);
criterion_main!(benches);
