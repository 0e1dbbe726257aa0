use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rowboat_io::{read_bytes, ReadOptions};
use rowboat_test_utils::numeric_csv;

fn bench_read_threads(c: &mut Criterion) {
    let input = numeric_csv(200_000, 5);

    let mut group = c.benchmark_group("read");
    group.throughput(Throughput::Bytes(input.len() as u64));
    for threads in [1usize, 2, 4, 8] {
        group.bench_with_input(
            BenchmarkId::new("threads", threads),
            &threads,
            |b, &threads| {
                let options = ReadOptions {
                    nthreads: threads,
                    ..ReadOptions::default()
                };
                b.iter(|| read_bytes(&input, &options, None).unwrap().nrows);
            },
        );
    }
    group.finish();
}

fn bench_read_wide_vs_narrow(c: &mut Criterion) {
    let narrow = numeric_csv(500_000, 2);
    let wide = numeric_csv(50_000, 20);

    let mut group = c.benchmark_group("shape");
    let options = ReadOptions::default();
    group.throughput(Throughput::Bytes(narrow.len() as u64));
    group.bench_function("narrow", |b| {
        b.iter(|| read_bytes(&narrow, &options, None).unwrap().nrows);
    });
    group.throughput(Throughput::Bytes(wide.len() as u64));
    group.bench_function("wide", |b| {
        b.iter(|| read_bytes(&wide, &options, None).unwrap().nrows);
    });
    group.finish();
}

criterion_group!(benches, bench_read_threads, bench_read_wide_vs_narrow);
criterion_main!(benches);
