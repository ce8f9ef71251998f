use serde_json::Value;

use crate::SortField;

/// Parameters for [`crate::DocStoreClient::search`].
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SearchParams {
    /// Target index; the client's default index when `None`.
    pub index: Option<String>,
    /// Restricts the search to one type when set.
    pub doc_type: Option<String>,
    pub query: Option<Value>,
    pub from: Option<u64>,
    pub size: Option<u64>,
    pub fields: Vec<String>,
    pub sort: Vec<SortField>,
    /// Extra query-string parameters appended to the request URL.
    pub query_string: Vec<(String, String)>,
}

impl SearchParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_index(mut self, index: impl Into<String>) -> Self {
        self.index = Some(index.into());
        self
    }

    pub fn with_type(mut self, doc_type: impl Into<String>) -> Self {
        self.doc_type = Some(doc_type.into());
        self
    }

    pub fn query(mut self, query: Value) -> Self {
        self.query = Some(query);
        self
    }

    /// Sets the `from` offset of the first hit.
    pub fn offset(mut self, from: u64) -> Self {
        self.from = Some(from);
        self
    }

    pub fn size(mut self, size: u64) -> Self {
        self.size = Some(size);
        self
    }

    pub fn fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fields = fields.into_iter().map(Into::into).collect();
        self
    }

    /// Appends a sort clause; clauses apply in insertion order.
    pub fn sort(mut self, sort: SortField) -> Self {
        self.sort.push(sort);
        self
    }

    pub fn query_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query_string.push((key.into(), value.into()));
        self
    }
}

/// Parameters for [`crate::DocStoreClient::get`].
#[derive(Clone, Debug, PartialEq)]
pub struct GetParams {
    pub index: Option<String>,
    pub doc_type: String,
    pub id: String,
    /// Optional request body; also part of the cache key.
    pub body: Option<Value>,
}

impl GetParams {
    pub fn new(doc_type: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            index: None,
            doc_type: doc_type.into(),
            id: id.into(),
            body: None,
        }
    }

    pub fn with_index(mut self, index: impl Into<String>) -> Self {
        self.index = Some(index.into());
        self
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }
}

/// Parameters for [`crate::DocStoreClient::index`].
#[derive(Clone, Debug, PartialEq)]
pub struct IndexParams {
    pub index: Option<String>,
    pub doc_type: String,
    /// Caller-chosen id (upsert via PUT); the store assigns one when `None`.
    pub id: Option<String>,
    pub body: Value,
    /// Overrides the client-wide refresh flag for this call.
    pub refresh: Option<bool>,
}

impl IndexParams {
    pub fn new(doc_type: impl Into<String>, body: Value) -> Self {
        Self {
            index: None,
            doc_type: doc_type.into(),
            id: None,
            body,
            refresh: None,
        }
    }

    pub fn with_index(mut self, index: impl Into<String>) -> Self {
        self.index = Some(index.into());
        self
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn refresh(mut self, refresh: bool) -> Self {
        self.refresh = Some(refresh);
        self
    }
}

/// Parameters for [`crate::DocStoreClient::update`].
#[derive(Clone, Debug, PartialEq)]
pub struct UpdateParams {
    pub index: Option<String>,
    pub doc_type: String,
    pub id: String,
    /// Partial update body, e.g. `{"doc": {...}}` or a script.
    pub body: Value,
    pub refresh: Option<bool>,
}

impl UpdateParams {
    pub fn new(doc_type: impl Into<String>, id: impl Into<String>, body: Value) -> Self {
        Self {
            index: None,
            doc_type: doc_type.into(),
            id: id.into(),
            body,
            refresh: None,
        }
    }

    pub fn with_index(mut self, index: impl Into<String>) -> Self {
        self.index = Some(index.into());
        self
    }

    pub fn refresh(mut self, refresh: bool) -> Self {
        self.refresh = Some(refresh);
        self
    }
}

/// Parameters for [`crate::DocStoreClient::delete`].
#[derive(Clone, Debug, PartialEq)]
pub struct DeleteParams {
    pub index: Option<String>,
    pub doc_type: String,
    pub id: String,
    pub refresh: Option<bool>,
}

impl DeleteParams {
    pub fn new(doc_type: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            index: None,
            doc_type: doc_type.into(),
            id: id.into(),
            refresh: None,
        }
    }

    pub fn with_index(mut self, index: impl Into<String>) -> Self {
        self.index = Some(index.into());
        self
    }

    pub fn refresh(mut self, refresh: bool) -> Self {
        self.refresh = Some(refresh);
        self
    }
}

/// Parameters for index-level administration: create, delete, refresh.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct IndexAdminParams {
    pub index: Option<String>,
    /// Settings or other body passed through unchanged.
    pub body: Option<Value>,
}

impl IndexAdminParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_index(mut self, index: impl Into<String>) -> Self {
        self.index = Some(index.into());
        self
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }
}

/// Parameters for mapping administration on one type.
#[derive(Clone, Debug, PartialEq)]
pub struct MappingParams {
    pub index: Option<String>,
    pub doc_type: String,
    pub body: Option<Value>,
}

impl MappingParams {
    pub fn new(doc_type: impl Into<String>) -> Self {
        Self {
            index: None,
            doc_type: doc_type.into(),
            body: None,
        }
    }

    pub fn with_index(mut self, index: impl Into<String>) -> Self {
        self.index = Some(index.into());
        self
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }
}
