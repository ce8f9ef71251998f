//! `docstore-http` is an async client for Elasticsearch-style document stores.
//!
//! Every operation goes through one request executor that retries transport
//! failures and store-reported errors with exponential backoff:
//! - [`DocStoreClient::search`], [`DocStoreClient::get`]
//! - [`DocStoreClient::index`], [`DocStoreClient::update`], [`DocStoreClient::delete`]
//! - index and mapping administration
//! - [`DocStoreClient::exec`] for requests the typed operations do not cover
//!
//! Writes can be followed by an index refresh, and `get` can be served from
//! a memcached read-through shortcut when a cache endpoint is configured.

mod cache;
mod client;
mod decode;
mod error;
mod executor;
mod options;
mod params;
mod retry;
mod types;
mod wire;

pub use client::DocStoreClient;
pub use error::DocStoreError;
pub use options::{
    BasicAuth, CacheEndpoint, ConnectionConfig, Protocol, RefreshPolicy, RetryPolicy,
    DEFAULT_CACHE_PORT,
};
pub use params::{
    DeleteParams, GetParams, IndexAdminParams, IndexParams, MappingParams, SearchParams,
    UpdateParams,
};
pub use types::{
    Document, Hit, SearchResponse, SortDirection, SortField, StoreResponse, WriteResponse,
};
pub use wire::OperationRequest;

pub use reqwest::Method;

pub type Result<T> = std::result::Result<T, DocStoreError>;
