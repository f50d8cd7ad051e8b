//! Provider error types.

use thiserror::Error;

pub type ProviderResult<T> = Result<T, ProviderError>;

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("{provider} is not configured: {reason}")]
    NotConfigured {
        provider: &'static str,
        reason: String,
    },

    #[error("{provider} returned {status}: {body}")]
    Api {
        provider: &'static str,
        status: u16,
        body: String,
    },

    /// The script provider could not produce well-formed structured output.
    #[error("Malformed provider output: {0}")]
    MalformedOutput(String),

    #[error("{provider} returned no results for '{query}'")]
    NoResults {
        provider: &'static str,
        query: String,
    },

    #[error("Failed to decode payload: {0}")]
    Decode(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ProviderError {
    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::MalformedOutput(msg.into())
    }

    pub fn not_configured(provider: &'static str, reason: impl Into<String>) -> Self {
        Self::NotConfigured {
            provider,
            reason: reason.into(),
        }
    }

    /// Read a non-success response into an [`ProviderError::Api`].
    pub(crate) async fn from_response(provider: &'static str, response: reqwest::Response) -> Self {
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        Self::Api {
            provider,
            status,
            body: truncate(&body, 500),
        }
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.len() <= max {
        return s.to_string();
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}…", &s[..end])
}
