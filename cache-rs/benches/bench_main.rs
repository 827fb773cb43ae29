use cache_rs::build_cache;
use criterion::{black_box, criterion_group, criterion_main, Criterion};

fn commit_throughput(c: &mut Criterion) {
    let runtime = tokio::runtime::Runtime::new().unwrap();
    let cache = build_cache::<String>(None);

    c.bench_function("commit single key", |b| {
        b.iter(|| {
            runtime.block_on(async {
                let mut txn = cache.begin_transaction().await;
                txn.set("k".to_string(), black_box(serde_json::json!({"count": 1})));
                txn.commit().await.unwrap();
            })
        })
    });
}

fn lru_insertion(c: &mut Criterion) {
    c.bench_function("lru insert at capacity", |b| {
        let mut lru = cache_rs::lru::Lru::new(1_000);
        let mut i: u64 = 0;
        b.iter(|| {
            lru.set(i, black_box(serde_json::json!(i)));
            i += 1;
        })
    });
}

criterion_group!(benches, commit_throughput, lru_insertion);
criterion_main!(benches);
