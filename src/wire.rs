use reqwest::Method;
use serde::Deserialize;
use serde_json::Value;

/// One outbound call: method, path, optional query string and JSON body.
#[derive(Clone, Debug, PartialEq)]
pub struct OperationRequest {
    pub method: Method,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
}

impl OperationRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
        }
    }

    pub fn with_body(mut self, body: Option<Value>) -> Self {
        self.body = body;
        self
    }

    pub fn with_query<I, K, V>(mut self, pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.query
            .extend(pairs.into_iter().map(|(key, value)| (key.into(), value.into())));
        self
    }
}

/// Resource path builders. Every path starts with `/`; caller-supplied
/// segments are percent-encoded so `?`, `#` and `/` stay inside the segment.
pub(crate) mod path {
    use url::form_urlencoded;

    /// Percent-encodes one path segment. Spaces become `%20`, not `+`.
    pub(crate) fn segment(raw: &str) -> String {
        form_urlencoded::byte_serialize(raw.as_bytes())
            .collect::<String>()
            .replace('+', "%20")
    }

    pub(crate) fn index(index: &str) -> String {
        format!("/{}", segment(index))
    }

    pub(crate) fn doc_type(index: &str, doc_type: &str) -> String {
        format!("/{}/{}", segment(index), segment(doc_type))
    }

    pub(crate) fn document(index: &str, doc_type: &str, id: &str) -> String {
        format!("/{}/{}/{}", segment(index), segment(doc_type), segment(id))
    }

    pub(crate) fn search(index: &str, doc_type: Option<&str>) -> String {
        match doc_type {
            Some(doc_type) => format!("{}/_search", self::doc_type(index, doc_type)),
            None => format!("{}/_search", self::index(index)),
        }
    }

    pub(crate) fn update(index: &str, doc_type: &str, id: &str) -> String {
        format!("{}/_update", document(index, doc_type, id))
    }

    pub(crate) fn mapping(index: &str, doc_type: &str) -> String {
        format!("{}/_mapping", self::doc_type(index, doc_type))
    }

    pub(crate) fn refresh(index: &str) -> String {
        format!("{}/_refresh", self::index(index))
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct SearchEnvelope {
    pub hits: Option<HitsEnvelope>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct HitsEnvelope {
    pub total: Option<Total>,
    pub max_score: Option<f64>,
    pub hits: Vec<HitEntry>,
}

/// Older stores report a bare count, newer ones `{ "value": n, "relation": .. }`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum Total {
    Count(u64),
    Object { value: u64 },
}

impl Total {
    pub fn value(&self) -> u64 {
        match self {
            Self::Count(value) | Self::Object { value } => *value,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct HitEntry {
    #[serde(rename = "_index")]
    pub index: Option<String>,
    #[serde(rename = "_type")]
    pub doc_type: Option<String>,
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "_score")]
    pub score: Option<f64>,
    #[serde(rename = "_source")]
    pub source: Option<Value>,
    pub fields: Option<Value>,
    pub sort: Vec<Value>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct DocumentEnvelope {
    #[serde(rename = "_index")]
    pub index: Option<String>,
    #[serde(rename = "_type")]
    pub doc_type: Option<String>,
    #[serde(rename = "_id")]
    pub id: Option<String>,
    #[serde(rename = "_version")]
    pub version: Option<u64>,
    pub found: Option<bool>,
    pub exists: Option<bool>,
    #[serde(rename = "_source")]
    pub source: Option<Value>,
    pub fields: Option<Value>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct WriteEnvelope {
    #[serde(rename = "_index")]
    pub index: Option<String>,
    #[serde(rename = "_type")]
    pub doc_type: Option<String>,
    #[serde(rename = "_id")]
    pub id: Option<String>,
    #[serde(rename = "_version")]
    pub version: Option<u64>,
    pub result: Option<String>,
    pub created: Option<bool>,
    pub found: Option<bool>,
}

/// Message carried by a store-level `error` field, if the field is present
/// and non-null. Strings are used as-is, objects prefer their `reason`.
pub(crate) fn store_error_message(body: &Value) -> Option<String> {
    match body.get("error")? {
        Value::Null => None,
        Value::String(message) => Some(message.clone()),
        Value::Object(fields) => Some(
            fields
                .get("reason")
                .and_then(Value::as_str)
                .map(str::to_owned)
                .unwrap_or_else(|| Value::Object(fields.clone()).to_string()),
        ),
        other => Some(other.to_string()),
    }
}
