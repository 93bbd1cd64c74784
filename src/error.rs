//! Error types for the wallet clients

use crate::poller::OperationKind;
use serde_json::Value;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// Non-2xx response from the custody backend
    #[error("Remote API error (HTTP {status}): {message}")]
    RemoteApi {
        status: u16,
        message: String,
        body: Value,
    },

    /// Terminal state not observed within the attempt budget
    #[error("{kind} {id} did not reach a terminal state after {attempts} attempts")]
    PollTimeout {
        kind: OperationKind,
        id: String,
        attempts: u32,
    },

    #[error("Transaction {id} failed: {reason}")]
    TransactionFailed { id: String, reason: String },

    #[error("Signature {id} failed: {reason}")]
    SignatureFailed { id: String, reason: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Unsupported operation: {0}")]
    Unsupported(String),

    #[error("Failed to decode {context} response: {source}")]
    Decode {
        context: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Signing error: {0}")]
    Signing(String),

    #[error("RPC error: {0}")]
    Rpc(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Build a `RemoteApi` error from a raw response body.
    ///
    /// The message prefers the body's `error` field, then `message`, then the
    /// raw text.
    pub fn remote_api(status: u16, raw_body: &str) -> Self {
        let body: Value =
            serde_json::from_str(raw_body).unwrap_or_else(|_| Value::String(raw_body.to_string()));

        let message = body
            .get("error")
            .and_then(Value::as_str)
            .or_else(|| body.get("message").and_then(Value::as_str))
            .map(str::to_string)
            .unwrap_or_else(|| {
                let trimmed = raw_body.trim();
                if trimmed.is_empty() {
                    "empty response body".to_string()
                } else {
                    trimmed.to_string()
                }
            });

        Error::RemoteApi {
            status,
            message,
            body,
        }
    }

    /// HTTP status of a `RemoteApi` error
    pub fn remote_status(&self) -> Option<u16> {
        match self {
            Error::RemoteApi { status, .. } => Some(*status),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remote_api_uses_error_field() {
        let err = Error::remote_api(429, r#"{"error":"Too Many Requests"}"#);
        let msg = err.to_string();
        assert!(msg.contains("429"));
        assert!(msg.contains("Too Many Requests"));
        assert_eq!(err.remote_status(), Some(429));
    }

    #[test]
    fn remote_api_falls_back_to_message_then_raw() {
        let err = Error::remote_api(400, r#"{"message":"bad locator"}"#);
        assert!(err.to_string().contains("bad locator"));

        let err = Error::remote_api(502, "upstream unavailable");
        assert!(err.to_string().contains("upstream unavailable"));
        match err {
            Error::RemoteApi { body, .. } => {
                assert_eq!(body, Value::String("upstream unavailable".into()))
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
