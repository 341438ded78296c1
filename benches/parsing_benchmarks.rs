use criterion::{Criterion, criterion_group, criterion_main};
use oxidize_postal::Postal;
use std::hint::black_box;

const SIMPLE: &str = "123 Main St, New York, NY 10001";
const COMPLEX: &str = "Apt 5B, 123 Main Street, Suite 100, New York, NY 10001-1234, USA";
const AMBIGUOUS: &str = "1 St Dr Ave Ct St Dr N E";

fn bench_address_parsing(c: &mut Criterion) {
    let postal = Postal::new().unwrap();
    let parser = postal.parser();

    c.bench_function("parse_simple_address", |b| {
        b.iter(|| parser.parse(black_box(SIMPLE)).unwrap())
    });

    c.bench_function("parse_complex_address", |b| {
        b.iter(|| parser.parse(black_box(COMPLEX)).unwrap())
    });
}

fn bench_address_expansion(c: &mut Criterion) {
    let postal = Postal::new().unwrap();
    let expander = postal.expander();

    c.bench_function("expand_simple_address", |b| {
        b.iter(|| expander.expand(black_box(SIMPLE)).unwrap())
    });

    c.bench_function("expand_ambiguous_address", |b| {
        b.iter(|| expander.expand(black_box(AMBIGUOUS)).unwrap())
    });
}

fn bench_address_normalization(c: &mut Criterion) {
    let postal = Postal::new().unwrap();
    let normalizer = postal.normalizer();

    c.bench_function("normalize_complex_address", |b| {
        b.iter(|| normalizer.normalize(black_box(COMPLEX)).unwrap())
    });
}

criterion_group!(
    benches,
    bench_address_parsing,
    bench_address_expansion,
    bench_address_normalization
);
criterion_main!(benches);
