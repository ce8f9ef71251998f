use docstore_http::{
    ConnectionConfig, DocStoreClient, GetParams, IndexParams, RefreshPolicy, SearchParams,
    SortField,
};
use serde_json::json;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ConnectionConfig::from_env()?
        .with_index("fruit")
        .with_refresh(RefreshPolicy::all());
    let db = DocStoreClient::new(config);

    let written = db
        .index(IndexParams::new("apples", json!({"name": "fuji"})).with_id("1"))
        .await?;
    println!("indexed {:?} in {} attempt(s)", written.id, written.attempts);

    match db.get(GetParams::new("apples", "1")).await? {
        Some(document) => println!("loaded {}: {:?}", document.id, document.source),
        None => println!("document 1 not found"),
    }

    let page = db
        .search(
            SearchParams::new()
                .with_type("apples")
                .size(10)
                .fields(["_id"])
                .sort(SortField::desc("_timestamp")),
        )
        .await?;
    for id in page.ids() {
        println!("{id}");
    }

    Ok(())
}
