use std::time::{SystemTime, UNIX_EPOCH};

use docstore_http::{
    ConnectionConfig, DeleteParams, DocStoreClient, GetParams, IndexAdminParams, IndexParams,
    RefreshPolicy, SearchParams,
};
use serde_json::json;

fn unique_suffix() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock must be after epoch")
        .as_millis()
}

#[tokio::test]
async fn live_roundtrip_with_refresh() {
    if std::env::var("DOCSTORE_HOST").is_err() {
        eprintln!("skipping live test: DOCSTORE_HOST is not set");
        return;
    }

    let index = format!("docstore_live_{}", unique_suffix());
    let config = ConnectionConfig::from_env()
        .expect("DOCSTORE_* variables must parse")
        .with_index(index.clone())
        .with_refresh(RefreshPolicy::all());
    let db = DocStoreClient::new(config);

    db.create_index(IndexAdminParams::new())
        .await
        .expect("index creation must succeed");

    db.index(IndexParams::new("apples", json!({"name": "fuji"})).with_id("1"))
        .await
        .expect("index must succeed");

    let document = db
        .get(GetParams::new("apples", "1"))
        .await
        .expect("get must succeed")
        .expect("document must exist after refresh");
    assert_eq!(document.source, Some(json!({"name": "fuji"})));

    let hits = db
        .search(SearchParams::new().with_type("apples"))
        .await
        .expect("search must succeed");
    assert_eq!(hits.ids(), vec!["1"]);

    db.delete(DeleteParams::new("apples", "1"))
        .await
        .expect("delete must succeed");
    let missing = db
        .get(GetParams::new("apples", "1"))
        .await
        .expect("get after delete must succeed");
    assert!(missing.is_none());

    let cleanup = db.delete_index(IndexAdminParams::new()).await;
    if let Err(err) = cleanup {
        panic!("cleanup failed: {err}");
    }
}
