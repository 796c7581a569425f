//! Benchmarks for feature table lookups and record construction.

use bcdx_core::features;
use bcdx_core::record::FeatureRecord;
use criterion::{black_box, criterion_group, criterion_main, Criterion};

fn bench_features(c: &mut Criterion) {
    let mut group = c.benchmark_group("features");

    group.bench_function("map_all", |b| {
        b.iter(|| {
            for name in features::ui_names() {
                black_box(features::map(black_box(name)).ok());
            }
        });
    });

    group.bench_function("validate_order", |b| {
        let order: Vec<&str> = features::trained_names().rev().collect();
        b.iter(|| black_box(features::validate_order(black_box(&order)).is_ok()));
    });

    group.finish();
}

fn bench_record(c: &mut Criterion) {
    let mut group = c.benchmark_group("record");

    group.bench_function("defaults", |b| {
        b.iter(|| black_box(FeatureRecord::defaults()));
    });

    group.bench_function("builder_fill_defaults", |b| {
        b.iter(|| {
            let record = FeatureRecord::builder()
                .set("radius_mean", black_box(17.99))
                .map(|builder| builder.fill_defaults().build());
            black_box(record.ok())
        });
    });

    group.finish();
}

criterion_group!(benches, bench_features, bench_record);
criterion_main!(benches);
