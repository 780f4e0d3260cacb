use thiserror::Error;

/// Errors that can occur while fetching or decoding a page of results.
///
/// An empty result set is not an error: the fetch functions return `Ok(None)`.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("API key is not configured (set api.api_key, CBAPI_API_KEY or RAPIDAPI_KEY)")]
    MissingApiKey,

    #[error("API rejected the credentials (HTTP {status})")]
    Unauthorized { status: u16 },

    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("API error (HTTP {status}): {body}")]
    Api { status: u16, body: String },

    #[error("malformed response body: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("fetch worker panicked")]
    WorkerPanicked,
}

impl FetchError {
    /// True for credential problems (missing key or 401/403).
    pub fn is_auth(&self) -> bool {
        matches!(
            self,
            FetchError::MissingApiKey | FetchError::Unauthorized { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, FetchError>;
