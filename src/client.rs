use std::future::Future;
use std::time::Duration;

use reqwest::Method;
use tokio::time::timeout;

use crate::{
    cache::Fetch,
    decode::{build_search_body, decode_document, decode_search_response, decode_write_response},
    executor::RequestExecutor,
    options::RefreshPolicy,
    wire::{path, OperationRequest},
    ConnectionConfig, DeleteParams, DocStoreError, Document, GetParams, IndexAdminParams,
    IndexParams, MappingParams, Result, SearchParams, SearchResponse, StoreResponse,
    UpdateParams, WriteResponse,
};

/// Conflict retries requested from the store on every partial update.
const UPDATE_RETRY_ON_CONFLICT: &str = "10";

/// Async client for an Elasticsearch-style document store.
///
/// Cloning is cheap; clones share the HTTP connection pool.
#[derive(Clone, Debug)]
pub struct DocStoreClient {
    executor: RequestExecutor,
    fetch: Fetch,
    default_index: Option<String>,
    refresh: RefreshPolicy,
    operation_timeout: Option<Duration>,
}

impl DocStoreClient {
    /// Creates a client from a connection config.
    ///
    /// When `config.cache` is set, `get` consults memcached before the store.
    pub fn new(config: ConnectionConfig) -> Self {
        Self {
            executor: RequestExecutor::new(&config),
            fetch: Fetch::from_config(&config),
            default_index: config.index.filter(|index| !index.trim().is_empty()),
            refresh: config.refresh,
            operation_timeout: config.operation_timeout_ms.map(Duration::from_millis),
        }
    }

    /// Creates a client from `DOCSTORE_*` environment variables.
    ///
    /// See [`ConnectionConfig::from_env`] for the variables read.
    pub fn from_env() -> Result<Self> {
        Ok(Self::new(ConnectionConfig::from_env()?))
    }

    /// Runs a search. A result with no hits is an empty [`SearchResponse`].
    pub async fn search(&self, params: SearchParams) -> Result<SearchResponse> {
        let index = self.resolve_index(params.index.as_deref())?;
        let request = OperationRequest::new(
            Method::POST,
            path::search(index, params.doc_type.as_deref()),
        )
        .with_query(params.query_string.iter().cloned())
        .with_body(Some(build_search_body(&params)));

        self.bounded(async {
            let response = self.fetch.fetch(&self.executor, &request).await?;
            decode_search_response(response)
        })
        .await
    }

    /// Sends a caller-built request through the same cache, retry and
    /// timeout path as the typed operations. The path is used as given.
    pub async fn exec(&self, request: &OperationRequest) -> Result<StoreResponse> {
        self.bounded(self.fetch.fetch(&self.executor, request)).await
    }

    /// Loads one document. Returns `Ok(None)` when it does not exist.
    pub async fn get(&self, params: GetParams) -> Result<Option<Document>> {
        let index = self.resolve_index(params.index.as_deref())?;
        let request = OperationRequest::new(
            Method::GET,
            path::document(index, &params.doc_type, &params.id),
        )
        .with_body(params.body);

        self.bounded(async {
            match self.fetch.fetch(&self.executor, &request).await {
                Ok(response) => decode_document(response, &params.id),
                Err(err) if err.is_not_found() => Ok(None),
                Err(err) => Err(err),
            }
        })
        .await
    }

    /// Indexes a document: PUT with the caller's id, POST when the store
    /// assigns one. An empty id counts as no id.
    pub async fn index(&self, params: IndexParams) -> Result<WriteResponse> {
        let index = self.resolve_index(params.index.as_deref())?;
        let request = match params.id.as_deref().filter(|id| !id.is_empty()) {
            Some(id) => OperationRequest::new(Method::PUT, path::document(index, &params.doc_type, id)),
            None => OperationRequest::new(Method::POST, path::doc_type(index, &params.doc_type)),
        }
        .with_body(Some(params.body));

        let refresh = params.refresh.unwrap_or(self.refresh.index);
        self.bounded(self.write_then_refresh(index, request, refresh))
            .await
    }

    /// Applies a partial update. The store retries version conflicts itself.
    pub async fn update(&self, params: UpdateParams) -> Result<WriteResponse> {
        let index = self.resolve_index(params.index.as_deref())?;
        let request = OperationRequest::new(
            Method::POST,
            path::update(index, &params.doc_type, &params.id),
        )
        .with_query([("retry_on_conflict", UPDATE_RETRY_ON_CONFLICT)])
        .with_body(Some(params.body));

        let refresh = params.refresh.unwrap_or(self.refresh.update);
        self.bounded(self.write_then_refresh(index, request, refresh))
            .await
    }

    pub async fn delete(&self, params: DeleteParams) -> Result<WriteResponse> {
        let index = self.resolve_index(params.index.as_deref())?;
        let request = OperationRequest::new(
            Method::DELETE,
            path::document(index, &params.doc_type, &params.id),
        );

        let refresh = params.refresh.unwrap_or(self.refresh.delete);
        self.bounded(self.write_then_refresh(index, request, refresh))
            .await
    }

    pub async fn create_index(&self, params: IndexAdminParams) -> Result<StoreResponse> {
        let index = self.resolve_index(params.index.as_deref())?;
        let request = OperationRequest::new(Method::PUT, path::index(index)).with_body(params.body);
        self.bounded(self.executor.execute(&request)).await
    }

    pub async fn delete_index(&self, params: IndexAdminParams) -> Result<StoreResponse> {
        let index = self.resolve_index(params.index.as_deref())?;
        let request =
            OperationRequest::new(Method::DELETE, path::index(index)).with_body(params.body);
        self.bounded(self.executor.execute(&request)).await
    }

    /// Makes recent writes to the index visible to searches.
    pub async fn refresh_index(&self, params: IndexAdminParams) -> Result<StoreResponse> {
        let index = self.resolve_index(params.index.as_deref())?;
        let request =
            OperationRequest::new(Method::POST, path::refresh(index)).with_body(params.body);
        self.bounded(self.executor.execute(&request)).await
    }

    pub async fn create_mapping(&self, params: MappingParams) -> Result<StoreResponse> {
        let index = self.resolve_index(params.index.as_deref())?;
        let request = OperationRequest::new(Method::PUT, path::mapping(index, &params.doc_type))
            .with_body(params.body);
        self.bounded(self.executor.execute(&request)).await
    }

    pub async fn delete_mapping(&self, params: MappingParams) -> Result<StoreResponse> {
        let index = self.resolve_index(params.index.as_deref())?;
        let request =
            OperationRequest::new(Method::DELETE, path::mapping(index, &params.doc_type))
                .with_body(params.body);
        self.bounded(self.executor.execute(&request)).await
    }

    /// Sends a write and, when asked to, a refresh of the same index.
    ///
    /// The refresh is only issued after the write succeeded, and the call
    /// resolves once both round-trips are done.
    async fn write_then_refresh(
        &self,
        index: &str,
        request: OperationRequest,
        refresh: bool,
    ) -> Result<WriteResponse> {
        let response = self.executor.execute(&request).await?;
        let ack = decode_write_response(response)?;

        if refresh {
            #[cfg(feature = "tracing")]
            tracing::debug!(index, path = %request.path, "refreshing index after write");

            let refresh_request = OperationRequest::new(Method::POST, path::refresh(index));
            self.executor.execute(&refresh_request).await?;
        }

        Ok(ack)
    }

    /// Applies the operation timeout, if any, to a whole operation.
    async fn bounded<T, F>(&self, operation: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        match self.operation_timeout {
            None => operation.await,
            Some(limit) => timeout(limit, operation).await.map_err(|_| {
                DocStoreError::Timeout {
                    elapsed_ms: u64::try_from(limit.as_millis()).unwrap_or(u64::MAX),
                }
            })?,
        }
    }

    fn resolve_index<'a>(&'a self, index: Option<&'a str>) -> Result<&'a str> {
        index
            .filter(|index| !index.trim().is_empty())
            .or(self.default_index.as_deref())
            .ok_or_else(|| {
                DocStoreError::Config(
                    "no index given and no default index configured".to_owned(),
                )
            })
    }
}
