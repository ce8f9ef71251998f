/// Error type returned by this crate.
///
/// Every variant that originates from a network round-trip carries the number
/// of send attempts made before the error was surfaced.
#[derive(Debug, thiserror::Error)]
pub enum DocStoreError {
    /// Network or request execution error from `reqwest`, after the retry
    /// budget was spent. Holds the error from the last attempt.
    #[error("transport error after {attempts} attempt(s): {source}")]
    Transport {
        #[source]
        source: reqwest::Error,
        attempts: u32,
    },
    /// The store answered with an HTTP status >= 400.
    #[error("http error {status}: {message}")]
    Http {
        status: u16,
        /// Store-reported error message, or a generic status message.
        message: String,
        attempts: u32,
    },
    /// A non-error status whose body still carries an `error` field.
    #[error("store error: {message}")]
    Store { message: String, attempts: u32 },
    /// Response body is not valid JSON or does not have the expected shape.
    #[error("decode error: {message}")]
    Decode { message: String, attempts: u32 },
    /// The cache holds an explicit "does not exist" marker for the request.
    #[error("document does not exist")]
    NotFound,
    /// The whole operation (including a chained refresh) exceeded the
    /// configured operation timeout.
    #[error("operation timed out after {elapsed_ms} ms")]
    Timeout { elapsed_ms: u64 },
    /// Invalid configuration or missing request parameters.
    #[error("configuration error: {0}")]
    Config(String),
}

impl DocStoreError {
    /// HTTP status associated with the error, if any.
    ///
    /// A cached "absent" marker reports `404`, like a live miss.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            Self::NotFound => Some(404),
            Self::Transport { source, .. } => source.status().map(|status| status.as_u16()),
            _ => None,
        }
    }

    /// Returns `true` for a live 404 or a cached absent marker.
    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }

    /// Number of send attempts made before the error surfaced.
    ///
    /// Zero when the error was produced without contacting the store.
    pub fn attempts(&self) -> u32 {
        match self {
            Self::Transport { attempts, .. }
            | Self::Http { attempts, .. }
            | Self::Store { attempts, .. }
            | Self::Decode { attempts, .. } => *attempts,
            Self::NotFound | Self::Timeout { .. } | Self::Config(_) => 0,
        }
    }
}
