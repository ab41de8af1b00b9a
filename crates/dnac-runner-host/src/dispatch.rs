use std::time::Instant;

use serde_json::{Map, Value};
use tracing::{Instrument, Level, span};

use crate::outcome::{Fault, FaultKind};
use crate::sdk::{SdkClient, SdkError, SdkErrorKind};

/// Result of one SDK invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct OperationResult {
    pub ok: bool,
    pub payload: Option<Value>,
    /// Structured failure when `ok` is false.
    pub status: Option<Fault>,
    pub elapsed_ms: Option<u64>,
}

impl OperationResult {
    pub fn success(payload: Value, elapsed_ms: Option<u64>) -> Self {
        Self {
            ok: true,
            payload: Some(payload),
            status: None,
            elapsed_ms,
        }
    }

    pub fn failure(fault: Fault, elapsed_ms: Option<u64>) -> Self {
        Self {
            ok: false,
            payload: None,
            status: Some(fault),
            elapsed_ms,
        }
    }
}

/// Perform exactly one SDK call: capability check, invoke, capture. No
/// local retry; recovery belongs to the caller.
pub async fn dispatch(
    client: &dyn SdkClient,
    family: &str,
    method: &str,
    arguments: Map<String, Value>,
) -> OperationResult {
    if !client.supports(family, method) {
        return OperationResult::failure(
            Fault::new(
                FaultKind::SdkNotFound,
                format!("SDK function `{family}.{method}` is not available on this client"),
            ),
            None,
        );
    }
    let call_span = span!(Level::DEBUG, "sdk.call", family = %family, method = %method);
    let started = Instant::now();
    match client
        .call(family, method, arguments)
        .instrument(call_span)
        .await
    {
        Ok(payload) => OperationResult::success(payload, elapsed_ms(started)),
        Err(err) => OperationResult::failure(fault_from_sdk(family, method, err), elapsed_ms(started)),
    }
}

fn elapsed_ms(started: Instant) -> Option<u64> {
    u64::try_from(started.elapsed().as_millis()).ok()
}

fn fault_from_sdk(family: &str, method: &str, err: SdkError) -> Fault {
    let kind = match err.kind {
        SdkErrorKind::Timeout => FaultKind::SdkTimeout,
        SdkErrorKind::Http | SdkErrorKind::Transport => FaultKind::SdkCallError,
    };
    Fault {
        kind,
        message: format!("SDK call `{family}.{method}` failed"),
        details: Vec::new(),
        sdk_message: Some(err.message),
        status_code: err.status_code,
    }
}
