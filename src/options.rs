use std::fmt;

use serde::Deserialize;

use crate::DocStoreError;

/// Default memcached port used when a cache endpoint omits one.
pub const DEFAULT_CACHE_PORT: u16 = 11211;

/// URL scheme used to reach the store.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    #[default]
    Http,
    Https,
}

impl Protocol {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Http => "http",
            Self::Https => "https",
        }
    }
}

impl std::str::FromStr for Protocol {
    type Err = DocStoreError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().trim_end_matches(':').to_ascii_lowercase().as_str() {
            "http" => Ok(Self::Http),
            "https" => Ok(Self::Https),
            other => Err(DocStoreError::Config(format!(
                "unsupported protocol '{other}'"
            ))),
        }
    }
}

/// Single basic-auth credential pair passed through to the store.
#[derive(Clone, Eq, PartialEq, Deserialize)]
pub struct BasicAuth {
    pub username: String,
    #[serde(default)]
    pub password: Option<String>,
}

impl BasicAuth {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: Some(password.into()),
        }
    }
}

impl fmt::Debug for BasicAuth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BasicAuth")
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Bounded retry with exponential backoff.
#[derive(Clone, Debug, Eq, PartialEq, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Maximum number of send attempts, including the first one.
    #[serde(alias = "retries")]
    pub max_attempts: u32,
    /// Delay before the second attempt, in milliseconds.
    #[serde(alias = "minTimeout")]
    pub min_timeout_ms: u64,
    /// Upper bound for any single backoff delay, in milliseconds.
    #[serde(alias = "maxTimeout")]
    pub max_timeout_ms: u64,
    /// Growth factor between consecutive delays.
    pub factor: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            min_timeout_ms: 50,
            max_timeout_ms: 3_000,
            factor: 2,
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, min_timeout_ms: u64, max_timeout_ms: u64) -> Self {
        Self {
            max_attempts,
            min_timeout_ms,
            max_timeout_ms,
            ..Self::default()
        }
    }
}

/// Which writes are followed by an index refresh.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Deserialize)]
#[serde(default)]
pub struct RefreshPolicy {
    pub index: bool,
    pub update: bool,
    pub delete: bool,
}

impl RefreshPolicy {
    /// Refresh after every kind of write.
    pub fn all() -> Self {
        Self {
            index: true,
            update: true,
            delete: true,
        }
    }
}

/// Memcached endpoint consulted by `get` before the store.
#[derive(Clone, Debug, Eq, PartialEq, Deserialize)]
#[serde(default)]
pub struct CacheEndpoint {
    /// Cache host. Falls back to the store host when unset.
    pub host: Option<String>,
    pub port: u16,
    /// Connect + read budget for one cache lookup, in milliseconds.
    pub lookup_timeout_ms: u64,
}

impl Default for CacheEndpoint {
    fn default() -> Self {
        Self {
            host: None,
            port: DEFAULT_CACHE_PORT,
            lookup_timeout_ms: 250,
        }
    }
}

impl CacheEndpoint {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: Some(host.into()),
            port,
            ..Self::default()
        }
    }
}

/// Connection settings for one client.
///
/// Immutable once handed to [`crate::DocStoreClient::new`].
#[derive(Clone, Eq, PartialEq, Deserialize)]
#[serde(default)]
pub struct ConnectionConfig {
    pub host: String,
    pub port: u16,
    pub protocol: Protocol,
    pub auth: Option<BasicAuth>,
    /// Index used when an operation does not name one.
    pub index: Option<String>,
    pub retry: RetryPolicy,
    pub refresh: RefreshPolicy,
    pub cache: Option<CacheEndpoint>,
    /// Per-attempt request timeout in milliseconds.
    pub timeout_ms: u64,
    /// Budget for a whole operation, chained refresh included.
    pub operation_timeout_ms: Option<u64>,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_owned(),
            port: 9200,
            protocol: Protocol::Http,
            auth: None,
            index: None,
            retry: RetryPolicy::default(),
            refresh: RefreshPolicy::default(),
            cache: None,
            timeout_ms: 10_000,
            operation_timeout_ms: None,
        }
    }
}

impl fmt::Debug for ConnectionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("protocol", &self.protocol)
            .field("auth", &self.auth)
            .field("index", &self.index)
            .field("retry", &self.retry)
            .field("refresh", &self.refresh)
            .field("cache", &self.cache)
            .field("timeout_ms", &self.timeout_ms)
            .field("operation_timeout_ms", &self.operation_timeout_ms)
            .finish()
    }
}

impl ConnectionConfig {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            ..Self::default()
        }
    }

    /// Creates a config from environment variables.
    ///
    /// Reads (all optional):
    /// - `DOCSTORE_HOST`, `DOCSTORE_PORT`, `DOCSTORE_PROTOCOL`
    /// - `DOCSTORE_INDEX`
    /// - `DOCSTORE_USERNAME`, `DOCSTORE_PASSWORD`
    /// - `DOCSTORE_CACHE_HOST`, `DOCSTORE_CACHE_PORT` (either enables the cache)
    ///
    /// Returns an error if a numeric or protocol variable cannot be parsed.
    pub fn from_env() -> Result<Self, DocStoreError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub(crate) fn from_lookup<F>(lookup: F) -> Result<Self, DocStoreError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());
        let mut config = Self::default();

        if let Some(host) = var("DOCSTORE_HOST") {
            config.host = host.trim().to_owned();
        }
        if let Some(port) = var("DOCSTORE_PORT") {
            config.port = parse_port("DOCSTORE_PORT", &port)?;
        }
        if let Some(protocol) = var("DOCSTORE_PROTOCOL") {
            config.protocol = protocol.parse()?;
        }
        config.index = var("DOCSTORE_INDEX");
        if let Some(username) = var("DOCSTORE_USERNAME") {
            config.auth = Some(BasicAuth {
                username,
                password: var("DOCSTORE_PASSWORD"),
            });
        }

        let cache_host = var("DOCSTORE_CACHE_HOST");
        let cache_port = var("DOCSTORE_CACHE_PORT");
        if cache_host.is_some() || cache_port.is_some() {
            let mut cache = CacheEndpoint {
                host: cache_host,
                ..CacheEndpoint::default()
            };
            if let Some(port) = cache_port {
                cache.port = parse_port("DOCSTORE_CACHE_PORT", &port)?;
            }
            config.cache = Some(cache);
        }

        Ok(config)
    }

    pub fn with_protocol(mut self, protocol: Protocol) -> Self {
        self.protocol = protocol;
        self
    }

    pub fn with_auth(mut self, auth: BasicAuth) -> Self {
        self.auth = Some(auth);
        self
    }

    pub fn with_index(mut self, index: impl Into<String>) -> Self {
        self.index = Some(index.into());
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_refresh(mut self, refresh: RefreshPolicy) -> Self {
        self.refresh = refresh;
        self
    }

    pub fn with_cache(mut self, cache: CacheEndpoint) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    pub fn with_operation_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.operation_timeout_ms = Some(timeout_ms);
        self
    }

    /// `protocol://host:port`, without a trailing slash.
    pub fn base_url(&self) -> String {
        format!("{}://{}:{}", self.protocol.as_str(), self.host, self.port)
    }
}

fn parse_port(name: &str, value: &str) -> Result<u16, DocStoreError> {
    value
        .trim()
        .parse()
        .map_err(|_| DocStoreError::Config(format!("{name} is not a valid port: '{value}'")))
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::{BasicAuth, ConnectionConfig, Protocol, RetryPolicy, DEFAULT_CACHE_PORT};

    #[test]
    fn defaults_match_local_store() {
        let config = ConnectionConfig::default();
        assert_eq!(config.base_url(), "http://localhost:9200");
        assert_eq!(config.retry, RetryPolicy::new(5, 50, 3_000));
        assert!(!config.refresh.index && !config.refresh.update && !config.refresh.delete);
        assert!(config.cache.is_none());
    }

    #[test]
    fn deserializes_from_json_with_aliases() {
        let config: ConnectionConfig = serde_json::from_str(
            r#"{
                "host": "search.internal",
                "protocol": "https",
                "index": "fruit",
                "retry": { "retries": 3, "minTimeout": 50, "maxTimeout": 200 },
                "refresh": { "index": true },
                "cache": { "port": 11311 }
            }"#,
        )
        .expect("config must parse");

        assert_eq!(config.base_url(), "https://search.internal:9200");
        assert_eq!(config.index.as_deref(), Some("fruit"));
        assert_eq!(config.retry.max_attempts, 3);
        assert_eq!(config.retry.max_timeout_ms, 200);
        assert_eq!(config.retry.factor, 2);
        assert!(config.refresh.index);
        assert!(!config.refresh.delete);
        let cache = config.cache.expect("cache must be set");
        assert_eq!(cache.host, None);
        assert_eq!(cache.port, 11311);
    }

    #[test]
    fn from_lookup_reads_env_style_variables() {
        let vars: HashMap<&str, &str> = HashMap::from([
            ("DOCSTORE_HOST", "es1"),
            ("DOCSTORE_PORT", "9201"),
            ("DOCSTORE_PROTOCOL", "HTTPS"),
            ("DOCSTORE_USERNAME", "elastic"),
            ("DOCSTORE_PASSWORD", "changeme"),
            ("DOCSTORE_CACHE_HOST", "mc1"),
        ]);
        let config = ConnectionConfig::from_lookup(|name| vars.get(name).map(|v| v.to_string()))
            .expect("config must parse");

        assert_eq!(config.base_url(), "https://es1:9201");
        assert_eq!(config.protocol, Protocol::Https);
        assert_eq!(config.auth, Some(BasicAuth::new("elastic", "changeme")));
        let cache = config.cache.expect("cache must be set");
        assert_eq!(cache.host.as_deref(), Some("mc1"));
        assert_eq!(cache.port, DEFAULT_CACHE_PORT);
    }

    #[test]
    fn from_lookup_rejects_bad_port() {
        let err = ConnectionConfig::from_lookup(|name| {
            (name == "DOCSTORE_PORT").then(|| "ninety-two hundred".to_owned())
        })
        .expect_err("port must be rejected");
        assert!(err.to_string().contains("DOCSTORE_PORT"));
    }

    #[test]
    fn debug_redacts_password() {
        let config = ConnectionConfig::default().with_auth(BasicAuth::new("elastic", "s3cret"));
        let debug = format!("{config:?}");
        assert!(debug.contains("<redacted>"));
        assert!(!debug.contains("s3cret"));
    }
}
