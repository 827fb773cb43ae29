use cache_rs::{build_cache, CResult};

#[tokio::main]
async fn main() {
    env_logger::init();
    println!("Hello, cache-rs!");

    run().await.unwrap();

    println!("Bye~");
}

async fn run() -> CResult<()> {
    let cache = build_cache::<String>(None);

    let mut txn = cache.begin_transaction().await;
    txn.set("b".to_string(), serde_json::json!({"count": 1}));
    txn.commit().await?;

    let mut txn = cache.begin_transaction().await;
    txn.set("b".to_string(), serde_json::json!({"label": "second"}));
    txn.commit().await?;

    // The default deep-merge strategy combines the two commits field by field.
    assert_eq!(
        cache.get(&"b".to_string()).await,
        Some(serde_json::json!({"count": 1, "label": "second"})),
    );

    let mut txn = cache.begin_transaction().await;
    txn.delete(&"b".to_string());
    txn.commit().await?;

    // delete() only scopes to the transaction's own view; nothing was
    // staged for "b" at commit, so the primary store is unchanged.
    assert_eq!(cache.get(&"b".to_string()).await, Some(serde_json::json!({"count": 1, "label": "second"})));

    let history = cache.entry_revisions(&"b".to_string()).await;
    println!("revisions for \"b\": {}", history.len());

    Ok(())
}
