use async_trait::async_trait;
use serde_json::{Map, Value};

/// How an SDK call went wrong, as far as the dispatcher cares.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SdkErrorKind {
    /// The transport timed out; callers may retry.
    Timeout,
    /// The controller answered with an error status.
    Http,
    /// Everything else: connection refused, TLS, decoding.
    Transport,
}

/// Error raised by the vendor SDK. No assumptions about HTTP specifics
/// beyond the optional status code.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct SdkError {
    pub kind: SdkErrorKind,
    pub status_code: Option<u16>,
    pub message: String,
}

impl SdkError {
    pub fn timeout(message: impl Into<String>) -> Self {
        Self {
            kind: SdkErrorKind::Timeout,
            status_code: None,
            message: message.into(),
        }
    }

    pub fn http(status_code: u16, message: impl Into<String>) -> Self {
        Self {
            kind: SdkErrorKind::Http,
            status_code: Some(status_code),
            message: message.into(),
        }
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self {
            kind: SdkErrorKind::Transport,
            status_code: None,
            message: message.into(),
        }
    }
}

/// Vendor SDK boundary. Families are sub-clients addressed by name,
/// methods are addressed by name within a family, and parameters travel as
/// keyword-style arguments under SDK-side names.
#[async_trait]
pub trait SdkClient: Send + Sync {
    /// Capability check for `family.method`; the dispatcher fails loudly
    /// instead of guessing when this returns false.
    fn supports(&self, family: &str, method: &str) -> bool;

    /// Invoke `family.method` once. Returns the parsed response payload.
    async fn call(
        &self,
        family: &str,
        method: &str,
        arguments: Map<String, Value>,
    ) -> Result<Value, SdkError>;
}
