//! Benchmark for quote computation and quantity parsing

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use curve_buyer::quote::{compute_quote, Observation, Quantity, QuoteState};

fn bench_compute_quote(c: &mut Criterion) {
    c.bench_function("compute_quote", |b| {
        b.iter(|| {
            compute_quote(
                black_box(Some(10.0)),
                black_box(Some(100.0)),
                black_box(Quantity::new(5)),
            )
        });
    });
}

fn bench_quote_state_derive(c: &mut Criterion) {
    let observation = Observation::new(10.0, 100);

    c.bench_function("quote_state_derive", |b| {
        b.iter(|| QuoteState::derive(black_box(Some(&observation)), black_box(Quantity::new(5)), false));
    });
}

fn bench_parse_input(c: &mut Criterion) {
    c.bench_function("quantity_parse_input", |b| {
        b.iter(|| Quantity::parse_input(black_box(" 12.7 ")));
    });
}

criterion_group!(
    benches,
    bench_compute_quote,
    bench_quote_state_derive,
    bench_parse_input
);
criterion_main!(benches);
