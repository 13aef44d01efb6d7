use thiserror::Error;

/// Identity resolution error types
#[derive(Error, Debug)]
pub enum ResolveError {
    #[error("Direct request quota exhausted and no proxy transport is available")]
    QuotaExhausted,

    #[error("Both the primary and the backup endpoint rejected the request with 403 Forbidden")]
    EndpointExhausted,

    #[error("Request was interrupted before a response arrived")]
    Interrupted,

    #[error("Operation not supported: {0}")]
    Unsupported(&'static str),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("HTTP error {status}: {body_snippet}")]
    Http {
        status: reqwest::StatusCode,
        body_snippet: String,
    },

    #[error("JSON serialization/deserialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    #[error("Base64 decode error: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl ResolveError {
    /// Whether the same call may succeed if attempted again later.
    ///
    /// `Unsupported` and malformed payloads are permanent; quota, network and
    /// interruption failures are not.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::QuotaExhausted | Self::Interrupted | Self::Network(_) => true,
            Self::Http { status, .. } => status.is_server_error(),
            Self::EndpointExhausted
            | Self::Unsupported(_)
            | Self::Serde(_)
            | Self::UrlParse(_)
            | Self::Base64(_)
            | Self::InvalidResponse(_) => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, ResolveError>;
