use thiserror::Error;

/// Message fragment the server uses when an expected version is stale
const STALE_VERSION_MARKER: &str = "expected version doesn't match current version";

/// Failures talking to the repository server
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("server rejected request ({status}): {message}")]
    Server { status: u16, message: String },

    #[error("version conflict: {message}")]
    VersionConflict { message: String },

    #[error("not found: {message}")]
    NotFound { message: String },

    #[error("unexpected response payload: {0}")]
    Decode(String),
}

impl ApiError {
    /// Classify an error envelope returned by the server
    pub fn from_response(status: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        if status == 409 || message.contains(STALE_VERSION_MARKER) || message.starts_with("InvalidVersion") {
            ApiError::VersionConflict { message }
        } else if status == 404 {
            ApiError::NotFound { message }
        } else {
            ApiError::Server { status, message }
        }
    }

    /// Server-reported failures carry a message meant for the operator
    pub fn server_message(&self) -> Option<&str> {
        match self {
            ApiError::Server { message, .. }
            | ApiError::VersionConflict { message }
            | ApiError::NotFound { message } => Some(message),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::Decode(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conflict_classification() {
        assert!(matches!(
            ApiError::from_response(409, "stale"),
            ApiError::VersionConflict { .. }
        ));
        assert!(matches!(
            ApiError::from_response(
                400,
                "InvalidVersion: expected version doesn't match current version"
            ),
            ApiError::VersionConflict { .. }
        ));
        assert!(matches!(
            ApiError::from_response(404, "shipment id is invalid: S9"),
            ApiError::NotFound { .. }
        ));
        assert!(matches!(
            ApiError::from_response(400, "TimeSentBeforePacked"),
            ApiError::Server { status: 400, .. }
        ));
    }

    #[test]
    fn test_server_message_is_verbatim() {
        let err = ApiError::from_response(400, "courier name is empty");
        assert_eq!(err.server_message(), Some("courier name is empty"));
        assert_eq!(ApiError::Decode("bad".into()).server_message(), None);
    }
}
