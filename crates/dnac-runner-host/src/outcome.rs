use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Runtime fault taxonomy. `definition-invalid` is missing on purpose: it
/// is fatal at module build time and never reaches a task outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FaultKind {
    ArgumentInvalid,
    NoMatchingOperation,
    SdkNotFound,
    SdkCallError,
    SdkTimeout,
    PreReadFailed,
}

impl FaultKind {
    pub fn reason(self) -> &'static str {
        match self {
            FaultKind::ArgumentInvalid => "arguments failed validation",
            FaultKind::NoMatchingOperation => "no operation matches the requested state",
            FaultKind::SdkNotFound => "SDK function not found",
            FaultKind::SdkCallError => "SDK call failed",
            FaultKind::SdkTimeout => "SDK call timed out",
            FaultKind::PreReadFailed => "pre-read before reconciliation failed",
        }
    }
}

/// Structured diagnostic attached to a failed outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fault {
    pub kind: FaultKind,
    pub message: String,
    /// Itemized messages, e.g. the validator's list.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub details: Vec<String>,
    /// The SDK's own message, verbatim.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sdk_message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,
}

impl Fault {
    pub fn new(kind: FaultKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            details: Vec::new(),
            sdk_message: None,
            status_code: None,
        }
    }

    pub fn with_details(kind: FaultKind, message: impl Into<String>, details: Vec<String>) -> Self {
        Self {
            details,
            ..Self::new(kind, message)
        }
    }

    /// A remote "does not exist" answer, the one signal lifecycle
    /// reconciliation is allowed to absorb.
    pub fn is_not_found(&self) -> bool {
        matches!(self.kind, FaultKind::SdkCallError) && self.status_code == Some(404)
    }
}

impl fmt::Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind.reason(), self.message)?;
        if let Some(sdk_message) = &self.sdk_message {
            write!(f, " ({sdk_message})")?;
        }
        Ok(())
    }
}

/// The single object returned to the host runtime per task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskOutcome {
    pub changed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<Value>,
    /// `"{family}.{method}"`; set iff the selector chose a method, on
    /// success and failure paths alike.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sdk_function: Option<String>,
    pub failed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub msg: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exception: Option<Fault>,
}

impl TaskOutcome {
    pub fn success(changed: bool, response: Option<Value>, sdk_function: Option<String>) -> Self {
        Self {
            changed,
            response,
            sdk_function,
            failed: false,
            msg: None,
            exception: None,
        }
    }

    pub fn failure(fault: Fault, sdk_function: Option<String>) -> Self {
        Self {
            changed: false,
            response: None,
            sdk_function,
            failed: true,
            msg: Some(single_line(&fault.to_string())),
            exception: Some(fault),
        }
    }
}

fn single_line(message: &str) -> String {
    message
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}
