/// Everything that can go wrong talking to the portal services.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Connect failure, timeout, or a body that could not be read.
    #[error("request failed: {0}")]
    Transport(#[source] reqwest::Error),
    /// Non-success HTTP status. `detail` is the server's message when it sent
    /// one, otherwise `API Error: <status>`.
    #[error("{detail}")]
    Status { status: u16, detail: String },
    #[error("unexpected response from {endpoint}: {source}")]
    Decode {
        endpoint: String,
        #[source]
        source: serde_json::Error,
    },
    /// Rejected locally, before anything was sent.
    #[error("{0}")]
    InvalidInput(String),
}

impl ApiError {
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, ApiError::Transport(e) if e.is_timeout())
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        ApiError::Transport(err)
    }
}

impl From<foundation::BoundsError> for ApiError {
    fn from(err: foundation::BoundsError) -> Self {
        ApiError::InvalidInput(err.to_string())
    }
}

/// Message for a failed response body: FastAPI's `detail` when present.
pub(crate) fn error_detail(status: u16, body: &str) -> String {
    let detail = serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v.get("detail").cloned());
    match detail {
        Some(serde_json::Value::String(s)) if !s.trim().is_empty() => s,
        Some(serde_json::Value::Null) | None => format!("API Error: {status}"),
        Some(serde_json::Value::String(_)) => format!("API Error: {status}"),
        // Validation errors arrive as a list of objects.
        Some(other) => other.to_string(),
    }
}
