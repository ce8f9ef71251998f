use serde::de::DeserializeOwned;
use serde_json::{json, Map, Value};

use crate::{
    params::SearchParams,
    wire::{DocumentEnvelope, SearchEnvelope, WriteEnvelope},
    DocStoreError, Document, Hit, SearchResponse, StoreResponse, WriteResponse,
};

/// Builds the `_search` body. Only keys the caller set are emitted.
pub(crate) fn build_search_body(params: &SearchParams) -> Value {
    let mut body = Map::new();
    if let Some(query) = &params.query {
        body.insert("query".to_owned(), query.clone());
    }
    if let Some(from) = params.from {
        body.insert("from".to_owned(), json!(from));
    }
    if let Some(size) = params.size {
        body.insert("size".to_owned(), json!(size));
    }
    if !params.fields.is_empty() {
        body.insert("fields".to_owned(), json!(params.fields));
    }
    if !params.sort.is_empty() {
        let sort = params
            .sort
            .iter()
            .map(|entry| {
                let mut clause = Map::new();
                clause.insert(entry.field.clone(), json!(entry.direction.as_str()));
                Value::Object(clause)
            })
            .collect();
        body.insert("sort".to_owned(), Value::Array(sort));
    }
    Value::Object(body)
}

/// Decodes a search response. A body without `hits` is an empty result.
pub(crate) fn decode_search_response(
    response: StoreResponse,
) -> Result<SearchResponse, DocStoreError> {
    let attempts = response.attempts;
    let envelope: SearchEnvelope = decode_envelope(response, "search response")?;
    let hits_envelope = envelope.hits.unwrap_or_default();

    let hits: Vec<Hit> = hits_envelope
        .hits
        .into_iter()
        .map(|hit| Hit {
            index: hit.index,
            doc_type: hit.doc_type,
            id: hit.id,
            score: hit.score,
            source: hit.source,
            fields: hit.fields,
            sort: hit.sort,
        })
        .collect();

    Ok(SearchResponse {
        total: hits_envelope
            .total
            .map(|total| total.value())
            .unwrap_or(hits.len() as u64),
        max_score: hits_envelope.max_score,
        hits,
        attempts,
    })
}

/// Decodes a get response; `None` when the store says the document is absent.
pub(crate) fn decode_document(
    response: StoreResponse,
    requested_id: &str,
) -> Result<Option<Document>, DocStoreError> {
    let attempts = response.attempts;
    let envelope: DocumentEnvelope = decode_envelope(response, "document")?;

    if envelope.found == Some(false) || envelope.exists == Some(false) {
        return Ok(None);
    }

    Ok(Some(Document {
        index: envelope.index,
        doc_type: envelope.doc_type,
        id: envelope.id.unwrap_or_else(|| requested_id.to_owned()),
        version: envelope.version,
        source: envelope.source,
        fields: envelope.fields,
        attempts,
    }))
}

pub(crate) fn decode_write_response(
    response: StoreResponse,
) -> Result<WriteResponse, DocStoreError> {
    let raw = response.body.clone();
    let attempts = response.attempts;
    let envelope: WriteEnvelope = decode_envelope(response, "write acknowledgement")?;

    Ok(WriteResponse {
        index: envelope.index,
        doc_type: envelope.doc_type,
        id: envelope.id,
        version: envelope.version,
        result: envelope.result,
        created: envelope.created,
        found: envelope.found,
        attempts,
        raw,
    })
}

/// Whether a cached payload is the "does not exist" marker.
pub(crate) fn is_absent_marker(payload: &Value) -> bool {
    let flag = |name: &str| payload.get(name).and_then(Value::as_bool);
    match (flag("exists"), flag("found")) {
        (Some(exists), _) => !exists,
        (None, Some(found)) => !found,
        (None, None) => true,
    }
}

fn decode_envelope<T>(response: StoreResponse, what: &str) -> Result<T, DocStoreError>
where
    T: DeserializeOwned + Default,
{
    let attempts = response.attempts;
    if response.body.is_null() {
        return Ok(T::default());
    }
    serde_json::from_value(response.body).map_err(|err| DocStoreError::Decode {
        message: format!("invalid {what}: {err}"),
        attempts,
    })
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{
        build_search_body, decode_document, decode_search_response, is_absent_marker,
    };
    use crate::{params::SearchParams, SortField, StoreResponse};

    fn response(body: serde_json::Value) -> StoreResponse {
        StoreResponse { body, attempts: 1 }
    }

    #[test]
    fn search_body_carries_paging_fields_and_sort() {
        let params = SearchParams::new()
            .with_type("apples")
            .offset(10)
            .size(5)
            .fields(["_id", "_timestamp"])
            .sort(SortField::desc("_timestamp"));

        assert_eq!(
            build_search_body(&params),
            json!({
                "from": 10,
                "size": 5,
                "fields": ["_id", "_timestamp"],
                "sort": [{"_timestamp": "desc"}]
            })
        );
    }

    #[test]
    fn search_without_hits_field_is_empty_result() {
        let decoded = decode_search_response(response(json!({"took": 1, "timed_out": false})))
            .expect("permissive decode");
        assert!(decoded.is_empty());
        assert_eq!(decoded.total, 0);
    }

    #[test]
    fn search_total_accepts_count_and_object_forms() {
        let legacy = decode_search_response(response(json!({
            "hits": {"total": 7, "hits": [{"_id": "a"}]}
        })))
        .expect("legacy total");
        assert_eq!(legacy.total, 7);
        assert_eq!(legacy.ids(), vec!["a"]);

        let modern = decode_search_response(response(json!({
            "hits": {"total": {"value": 3, "relation": "eq"}, "hits": []}
        })))
        .expect("object total");
        assert_eq!(modern.total, 3);
    }

    #[test]
    fn search_with_malformed_hits_is_decode_error() {
        let err = decode_search_response(response(json!({"hits": {"hits": "nope"}})))
            .expect_err("hits must be an array");
        assert!(matches!(err, crate::DocStoreError::Decode { attempts: 1, .. }));
    }

    #[test]
    fn document_with_found_false_is_absent() {
        let decoded = decode_document(response(json!({"_id": "1", "found": false})), "1")
            .expect("decode");
        assert!(decoded.is_none());
    }

    #[test]
    fn document_id_falls_back_to_requested_id() {
        let decoded = decode_document(response(serde_json::Value::Null), "42")
            .expect("decode")
            .expect("empty body is not an absent marker");
        assert_eq!(decoded.id, "42");
    }

    #[test]
    fn absent_marker_detection() {
        assert!(is_absent_marker(&json!({"exists": false})));
        assert!(is_absent_marker(&json!({"found": false})));
        assert!(is_absent_marker(&json!({"_id": "1"})));
        assert!(!is_absent_marker(&json!({"exists": true, "_source": {}})));
        assert!(!is_absent_marker(&json!({"found": true})));
    }
}
