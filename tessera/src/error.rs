//! Error types for the Tessera client.

use thiserror::Error;

/// Errors that can occur when talking to the Tessera API.
#[derive(Error, Debug)]
pub enum TesseraError {
    /// The server rejected a request, or the request never completed.
    ///
    /// `status` is the HTTP status when a response was received, `code` the
    /// server's internal error code and `more` any additional detail, both
    /// parsed from the JSON error body when present.
    #[error("API error: status={status:?}, code={code:?}, message={message}, more={more:?}")]
    Api {
        status: Option<u16>,
        code: Option<i64>,
        message: String,
        more: Option<String>,
    },

    /// A 200 response whose body does not match the documented contract.
    #[error("Unexpected response: {0}")]
    Response(String),

    /// The client configuration is unusable.
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error when reading a local file for upload or hashing.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization error, including task result payloads.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// GeoJSON feature conversion error.
    #[error("GeoJSON error: {0}")]
    GeoJson(#[from] geojson::Error),
}

impl TesseraError {
    /// Build a [`TesseraError::Api`] from an HTTP status and the raw error
    /// body, falling back to status-only information when the body is not
    /// the documented `{code, message, more}` JSON shape.
    pub(crate) fn from_response(status: u16, body: &str) -> Self {
        #[derive(serde::Deserialize)]
        struct ErrorBody {
            code: Option<i64>,
            message: Option<String>,
            more: Option<String>,
        }

        match serde_json::from_str::<ErrorBody>(body) {
            Ok(parsed) => TesseraError::Api {
                status: Some(status),
                code: parsed.code,
                message: parsed
                    .message
                    .unwrap_or_else(|| format!("HTTP status {}", status)),
                more: parsed.more,
            },
            Err(_) => TesseraError::Api {
                status: Some(status),
                code: None,
                message: format!("HTTP status {}", status),
                more: None,
            },
        }
    }

    /// Build a [`TesseraError::Api`] for a failure with no HTTP response,
    /// such as a connection error or exhausted retries after timeouts.
    pub(crate) fn transport(message: impl Into<String>) -> Self {
        TesseraError::Api {
            status: None,
            code: None,
            message: message.into(),
            more: None,
        }
    }
}

/// Result type alias using [`TesseraError`].
pub type Result<T> = std::result::Result<T, TesseraError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = TesseraError::Api {
            status: Some(413),
            code: Some(7),
            message: "payload too large".to_string(),
            more: None,
        };
        assert!(err.to_string().contains("413"));
        assert!(err.to_string().contains("payload too large"));

        let err = TesseraError::Response("missing key: layers".to_string());
        assert!(err.to_string().contains("layers"));
    }

    #[test]
    fn test_from_response_parses_error_body() {
        let err = TesseraError::from_response(
            403,
            r#"{"code": 12, "message": "bad signature", "more": "check your key"}"#,
        );
        match err {
            TesseraError::Api {
                status,
                code,
                message,
                more,
            } => {
                assert_eq!(status, Some(403));
                assert_eq!(code, Some(12));
                assert_eq!(message, "bad signature");
                assert_eq!(more.as_deref(), Some("check your key"));
            }
            other => panic!("expected Api error, got {:?}", other),
        }
    }

    #[test]
    fn test_from_response_falls_back_on_garbage_body() {
        let err = TesseraError::from_response(500, "<html>oops</html>");
        match err {
            TesseraError::Api {
                status,
                code,
                message,
                ..
            } => {
                assert_eq!(status, Some(500));
                assert_eq!(code, None);
                assert!(message.contains("500"));
            }
            other => panic!("expected Api error, got {:?}", other),
        }
    }
}
