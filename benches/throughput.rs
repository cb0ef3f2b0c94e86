//! Throughput Benchmark for respkv
//!
//! Measures the storage engine, the request parser and the full command path
//! under various workloads.

use bytes::Bytes;
use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use respkv::commands::CommandHandler;
use respkv::protocol::{parse_request, RespValue};
use respkv::storage::{KeyPattern, SetExpiry, SetOptions, StorageEngine};
use std::sync::Arc;
use std::time::Duration;

fn plain() -> SetOptions {
    SetOptions::default()
}

/// Benchmark SET operations
fn bench_set(c: &mut Criterion) {
    let engine = Arc::new(StorageEngine::new());

    let mut group = c.benchmark_group("set");
    group.throughput(Throughput::Elements(1));

    group.bench_function("set_small", |b| {
        let mut i = 0u64;
        b.iter(|| {
            let key = Bytes::from(format!("key:{}", i));
            engine.set(key, Bytes::from("small_value"), &plain());
            i += 1;
        });
    });

    group.bench_function("set_medium", |b| {
        let mut i = 0u64;
        let value = Bytes::from("x".repeat(1024)); // 1KB value
        b.iter(|| {
            let key = Bytes::from(format!("key:{}", i));
            engine.set(key, value.clone(), &plain());
            i += 1;
        });
    });

    group.bench_function("set_nx_get", |b| {
        let options = SetOptions {
            condition: Some(respkv::storage::SetCondition::Nx),
            get: true,
            ..Default::default()
        };
        let mut i = 0u64;
        b.iter(|| {
            let key = Bytes::from(format!("nx:{}", i % 1_000));
            black_box(engine.set(key, Bytes::from("v"), &options));
            i += 1;
        });
    });

    group.finish();
}

/// Benchmark GET operations
fn bench_get(c: &mut Criterion) {
    let engine = Arc::new(StorageEngine::new());

    for i in 0..100_000 {
        let key = Bytes::from(format!("key:{}", i));
        let value = Bytes::from(format!("value:{}", i));
        engine.set(key, value, &plain());
    }

    let mut group = c.benchmark_group("get");
    group.throughput(Throughput::Elements(1));

    group.bench_function("get_existing", |b| {
        let mut i = 0u64;
        b.iter(|| {
            let key = Bytes::from(format!("key:{}", i % 100_000));
            black_box(engine.get(&key));
            i += 1;
        });
    });

    group.bench_function("get_missing", |b| {
        let mut i = 0u64;
        b.iter(|| {
            let key = Bytes::from(format!("missing:{}", i));
            black_box(engine.get(&key));
            i += 1;
        });
    });

    group.finish();
}

/// Benchmark mixed workload (80% reads, 20% writes)
fn bench_mixed(c: &mut Criterion) {
    let engine = Arc::new(StorageEngine::new());

    for i in 0..10_000 {
        let key = Bytes::from(format!("key:{}", i));
        let value = Bytes::from(format!("value:{}", i));
        engine.set(key, value, &plain());
    }

    let mut group = c.benchmark_group("mixed");
    group.throughput(Throughput::Elements(1));

    group.bench_function("80_read_20_write", |b| {
        let mut i = 0u64;
        b.iter(|| {
            if i % 5 == 0 {
                let key = Bytes::from(format!("new:{}", i));
                engine.set(key, Bytes::from("value"), &plain());
            } else {
                let key = Bytes::from(format!("key:{}", i % 10_000));
                black_box(engine.get(&key));
            }
            i += 1;
        });
    });

    group.finish();
}

/// Benchmark sorted set operations
fn bench_sorted_set(c: &mut Criterion) {
    let engine = Arc::new(StorageEngine::new());
    let board = Bytes::from("board");

    for i in 0..10_000 {
        engine.zadd(
            board.clone(),
            vec![((i % 500) as f64, Bytes::from(format!("player:{}", i)))],
        );
    }

    let mut group = c.benchmark_group("sorted_set");
    group.throughput(Throughput::Elements(1));

    group.bench_function("zadd_update", |b| {
        let mut i = 0u64;
        b.iter(|| {
            let member = Bytes::from(format!("player:{}", i % 10_000));
            black_box(engine.zadd(board.clone(), vec![(i as f64, member)]));
            i += 1;
        });
    });

    group.bench_function("zrange_top_10", |b| {
        b.iter(|| {
            black_box(engine.zrange(&board, -10, -1));
        });
    });

    group.finish();
}

/// Benchmark concurrent access
fn bench_concurrent(c: &mut Criterion) {
    use std::thread;

    let mut group = c.benchmark_group("concurrent");
    group.measurement_time(Duration::from_secs(10));

    group.bench_function("4_threads_mixed", |b| {
        b.iter(|| {
            let engine = Arc::new(StorageEngine::new());
            let handles: Vec<_> = (0..4)
                .map(|t| {
                    let engine = Arc::clone(&engine);
                    thread::spawn(move || {
                        for i in 0..10_000 {
                            let key = Bytes::from(format!("key:{}:{}", t, i));
                            engine.set(key.clone(), Bytes::from("value"), &SetOptions::default());
                            engine.get(&key);
                        }
                    })
                })
                .collect();

            for handle in handles {
                handle.join().unwrap();
            }

            black_box(engine.len());
        });
    });

    group.finish();
}

/// Benchmark expiry operations
fn bench_expiry(c: &mut Criterion) {
    let engine = Arc::new(StorageEngine::new());

    let mut group = c.benchmark_group("expiry");
    group.throughput(Throughput::Elements(1));

    group.bench_function("set_with_ttl", |b| {
        let options = SetOptions {
            expiry: SetExpiry::Ex(3600),
            ..Default::default()
        };
        let mut i = 0u64;
        b.iter(|| {
            let key = Bytes::from(format!("key:{}", i));
            engine.set(key, Bytes::from("value"), &options);
            i += 1;
        });
    });

    group.bench_function("expire_existing", |b| {
        for i in 0..10_000 {
            let key = Bytes::from(format!("expire:{}", i));
            engine.set(key, Bytes::from("value"), &plain());
        }

        let mut i = 0u64;
        b.iter(|| {
            let key = Bytes::from(format!("expire:{}", i % 10_000));
            engine.expire(&key, 3600, None);
            i += 1;
        });
    });

    group.finish();
}

/// Benchmark KEYS pattern matching
fn bench_keys(c: &mut Criterion) {
    let engine = Arc::new(StorageEngine::new());

    for i in 0..1_000 {
        engine.set(Bytes::from(format!("user:{}", i)), Bytes::from("user_data"), &plain());
        engine.set(
            Bytes::from(format!("session:{}", i)),
            Bytes::from("session_data"),
            &plain(),
        );
    }

    let prefix = KeyPattern::parse(b"user:*");
    let all = KeyPattern::parse(b"*");

    let mut group = c.benchmark_group("keys");

    group.bench_function("keys_prefix", |b| {
        b.iter(|| {
            black_box(engine.keys(&prefix));
        });
    });

    group.bench_function("keys_all", |b| {
        b.iter(|| {
            black_box(engine.keys(&all));
        });
    });

    group.finish();
}

/// Benchmark request decoding and the full command path
fn bench_protocol(c: &mut Criterion) {
    let set = RespValue::request(["SET", "key:1", "value", "EX", "100"]).serialize();
    let handler = CommandHandler::new(Arc::new(StorageEngine::new()));

    let mut group = c.benchmark_group("protocol");
    group.throughput(Throughput::Bytes(set.len() as u64));

    group.bench_function("parse_set_request", |b| {
        b.iter(|| {
            black_box(parse_request(black_box(&set)).unwrap());
        });
    });

    group.bench_function("parse_and_execute", |b| {
        b.iter(|| {
            if let Ok(Some((args, _))) = parse_request(&set) {
                black_box(handler.execute(args).serialize());
            }
        });
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_set,
    bench_get,
    bench_mixed,
    bench_sorted_set,
    bench_concurrent,
    bench_expiry,
    bench_keys,
    bench_protocol,
);

criterion_main!(benches);
