use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::{DocStoreError, Result};

/// Normalized successful response from the executor.
#[derive(Clone, Debug, PartialEq)]
pub struct StoreResponse {
    /// Decoded JSON body; `Value::Null` when the store sent no body.
    pub body: Value,
    /// Send attempts used. Zero when served from the cache.
    pub attempts: u32,
}

/// Ascending or descending sort order.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }
}

/// One `{field: direction}` entry of a search sort list.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SortField {
    pub field: String,
    pub direction: SortDirection,
}

impl SortField {
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Asc,
        }
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Desc,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Hit {
    pub index: Option<String>,
    pub doc_type: Option<String>,
    pub id: String,
    pub score: Option<f64>,
    pub source: Option<Value>,
    pub fields: Option<Value>,
    pub sort: Vec<Value>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct SearchResponse {
    /// Total matches reported by the store; falls back to `hits.len()`.
    pub total: u64,
    pub max_score: Option<f64>,
    pub hits: Vec<Hit>,
    pub attempts: u32,
}

impl SearchResponse {
    /// Document ids of the returned hits, in order.
    pub fn ids(&self) -> Vec<&str> {
        self.hits.iter().map(|hit| hit.id.as_str()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }
}

/// A document returned by `get`.
#[derive(Clone, Debug, PartialEq)]
pub struct Document {
    pub index: Option<String>,
    pub doc_type: Option<String>,
    pub id: String,
    pub version: Option<u64>,
    pub source: Option<Value>,
    pub fields: Option<Value>,
    pub attempts: u32,
}

impl Document {
    /// Deserializes `_source` into `T`.
    pub fn source_as<T: DeserializeOwned>(&self) -> Result<T> {
        let source = self.source.clone().unwrap_or(Value::Null);
        serde_json::from_value(source).map_err(|err| DocStoreError::Decode {
            message: format!("document '{}' source: {err}", self.id),
            attempts: self.attempts,
        })
    }
}

/// Acknowledgement of an index, update or delete.
#[derive(Clone, Debug, PartialEq)]
pub struct WriteResponse {
    pub index: Option<String>,
    pub doc_type: Option<String>,
    pub id: Option<String>,
    pub version: Option<u64>,
    /// `created`, `updated`, `deleted`, ... when the store reports it.
    pub result: Option<String>,
    pub created: Option<bool>,
    pub found: Option<bool>,
    /// Attempts used by the write itself, not the chained refresh.
    pub attempts: u32,
    pub raw: Value,
}
