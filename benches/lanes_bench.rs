//! Benchmarks for mbhash.
//!
//! Run with:
//!     cargo bench

use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};

use mbhash::{
    Digest, EngineConfig, LaneScheduler, MultiHash, SchedulerConfig, SingleStreamDriver,
    StreamCursor, StreamId,
};

// Deterministic pseudo-random streams, each `chunks` chunks of `chunk_len` bytes.
fn make_streams(count: usize, chunks: usize, chunk_len: usize) -> Vec<StreamCursor> {
    (0..count)
        .map(|s| {
            let parts: Vec<Vec<u8>> = (0..chunks)
                .map(|c| {
                    (0..chunk_len)
                        .map(|i| (i * 7 + c * 13 + s * 31) as u8)
                        .collect()
                })
                .collect();
            StreamCursor::new(StreamId::new(s as u64), parts)
        })
        .collect()
}

fn bench_scheduler(c: &mut Criterion) {
    let mut group = c.benchmark_group("scheduler");

    for count in [2, 8, 16] {
        let streams = make_streams(count, 16, 4096);
        let total: usize = streams.iter().map(StreamCursor::total_bytes).sum();

        group.throughput(Throughput::Bytes(total as u64));
        group.bench_with_input(BenchmarkId::new("streams", count), &streams, |b, streams| {
            b.iter(|| {
                let mut scheduler =
                    LaneScheduler::new(black_box(streams.clone()), SchedulerConfig::default())
                        .unwrap();
                black_box(scheduler.run_collect().unwrap().len())
            });
        });
    }

    group.finish();
}

fn bench_batch_width(c: &mut Criterion) {
    let mut group = c.benchmark_group("batch_width");
    let streams = make_streams(16, 16, 1024);
    let total: usize = streams.iter().map(StreamCursor::total_bytes).sum();
    group.throughput(Throughput::Bytes(total as u64));

    for width in [1, 4, 8, 16] {
        let config = SchedulerConfig::new(EngineConfig::default().with_batch_width(width));
        group.bench_function(BenchmarkId::from_parameter(width), |b| {
            b.iter(|| {
                let mut scheduler =
                    LaneScheduler::new(black_box(streams.clone()), config).unwrap();
                black_box(scheduler.run(|_| {}).unwrap())
            });
        });
    }

    group.finish();
}

fn bench_single(c: &mut Criterion) {
    let mut group = c.benchmark_group("single");
    let stream = make_streams(1, 256, 4096).remove(0);
    let data = stream.concat();
    group.throughput(Throughput::Bytes(data.len() as u64));

    group.bench_function("driver", |b| {
        b.iter(|| {
            let mut driver =
                SingleStreamDriver::new(black_box(stream.clone()), SchedulerConfig::default())
                    .unwrap();
            black_box(driver.run_collect().unwrap().digest)
        });
    });

    // Plain one-shot hash for reference
    group.bench_function("one_shot", |b| {
        b.iter(|| black_box(Digest::of(black_box(&data))));
    });

    group.bench_function("multi_hash", |b| {
        b.iter(|| {
            let mut hash = MultiHash::new();
            for chunk in stream.chunks() {
                hash.update(black_box(chunk)).unwrap();
            }
            black_box(hash.finalize())
        });
    });

    group.finish();
}

criterion_group!(benches, bench_scheduler, bench_batch_width, bench_single);
criterion_main!(benches);
