use serde_json::{Map, Value, json};
use tracing::debug;

use module_core::{ModuleDefinition, ResponseKind, State, Verb};

use crate::dispatch::{OperationResult, dispatch};
use crate::metrics::TaskMetrics;
use crate::outcome::{Fault, FaultKind};
use crate::sdk::SdkClient;
use crate::select::select_operation;

/// One reconciled task: the SDK result plus decided `changed` semantics
/// and the function actually used.
#[derive(Debug)]
pub struct Reconciled {
    pub changed: bool,
    pub result: OperationResult,
    pub sdk_function: String,
}

/// Run the operation(s) for the requested state and decide `changed`.
///
/// Query states never change anything; writes default to always-changed;
/// `present`/`absent` consult a pre-read first. A remote not-found is
/// absorbed only where it means the desired state already holds.
pub async fn reconcile(
    definition: &ModuleDefinition,
    client: &dyn SdkClient,
    state: State,
    args: &Map<String, Value>,
    metrics: &TaskMetrics,
) -> Result<Reconciled, Fault> {
    match state {
        State::Query => {
            let (result, function) =
                dispatch_verb(definition, client, Verb::Get, args, metrics).await?;
            Ok(Reconciled {
                changed: false,
                result,
                sdk_function: function,
            })
        }
        State::Create => {
            let (result, function) =
                dispatch_verb(definition, client, Verb::Post, args, metrics).await?;
            Ok(Reconciled {
                changed: result.ok,
                result,
                sdk_function: function,
            })
        }
        State::Update => run_put(definition, client, args, metrics, None).await,
        State::Delete => run_delete(definition, client, args, metrics).await,
        State::Present => run_present(definition, client, args, metrics).await,
        State::Absent => run_absent(definition, client, args, metrics).await,
    }
}

async fn run_present(
    definition: &ModuleDefinition,
    client: &dyn SdkClient,
    args: &Map<String, Value>,
    metrics: &TaskMetrics,
) -> Result<Reconciled, Fault> {
    let read = match pre_read(definition, client, args, metrics).await {
        Ok(read) => read,
        Err(PreReadError::Select(fault)) => return Err(fault),
        Err(PreReadError::Failed(failed)) => return Ok(*failed),
    };
    match read.existing {
        None => {
            let (result, function) =
                dispatch_verb(definition, client, Verb::Post, args, metrics).await?;
            Ok(Reconciled {
                changed: result.ok,
                result,
                sdk_function: function,
            })
        }
        Some(previous) if definition.supports(Verb::Put) => {
            run_put(definition, client, args, metrics, Some(&previous)).await
        }
        Some(previous) => Ok(Reconciled {
            changed: false,
            result: OperationResult::success(previous, read.elapsed_ms),
            sdk_function: read.function,
        }),
    }
}

async fn run_absent(
    definition: &ModuleDefinition,
    client: &dyn SdkClient,
    args: &Map<String, Value>,
    metrics: &TaskMetrics,
) -> Result<Reconciled, Fault> {
    let read = match pre_read(definition, client, args, metrics).await {
        Ok(read) => read,
        Err(PreReadError::Select(fault)) => return Err(fault),
        Err(PreReadError::Failed(failed)) => return Ok(*failed),
    };
    match read.existing {
        None => Ok(Reconciled {
            changed: false,
            result: OperationResult::success(
                read.payload.unwrap_or(Value::Null),
                read.elapsed_ms,
            ),
            sdk_function: read.function,
        }),
        Some(_) => run_delete(definition, client, args, metrics).await,
    }
}

async fn run_put(
    definition: &ModuleDefinition,
    client: &dyn SdkClient,
    args: &Map<String, Value>,
    metrics: &TaskMetrics,
    last_read: Option<&Value>,
) -> Result<Reconciled, Fault> {
    let (result, function) = dispatch_verb(definition, client, Verb::Put, args, metrics).await?;
    let changed = result.ok
        && !(definition.idempotent && semantically_empty(result.payload.as_ref(), last_read));
    Ok(Reconciled {
        changed,
        result,
        sdk_function: function,
    })
}

async fn run_delete(
    definition: &ModuleDefinition,
    client: &dyn SdkClient,
    args: &Map<String, Value>,
    metrics: &TaskMetrics,
) -> Result<Reconciled, Fault> {
    let (result, function) = dispatch_verb(definition, client, Verb::Delete, args, metrics).await?;
    if result.ok {
        return Ok(Reconciled {
            changed: true,
            result,
            sdk_function: function,
        });
    }
    if result.status.as_ref().is_some_and(Fault::is_not_found) {
        // the desired state already holds
        return Ok(Reconciled {
            changed: false,
            result: OperationResult::success(Value::Null, result.elapsed_ms),
            sdk_function: function,
        });
    }
    Ok(Reconciled {
        changed: false,
        result,
        sdk_function: function,
    })
}

async fn dispatch_verb(
    definition: &ModuleDefinition,
    client: &dyn SdkClient,
    verb: Verb,
    args: &Map<String, Value>,
    metrics: &TaskMetrics,
) -> Result<(OperationResult, String), Fault> {
    let request = select_operation(definition, verb, args)?;
    let function = request.sdk_function(&definition.family);
    TaskMetrics::bump(&metrics.dispatch_attempts);
    let result = dispatch(
        client,
        &definition.family,
        &request.method_name,
        request.arguments,
    )
    .await;
    if !result.ok {
        TaskMetrics::bump(&metrics.dispatch_errors);
    }
    Ok((result, function))
}

struct PreRead {
    /// The object when it exists, per the response shape hint.
    existing: Option<Value>,
    payload: Option<Value>,
    function: String,
    elapsed_ms: Option<u64>,
}

enum PreReadError {
    Select(Fault),
    Failed(Box<Reconciled>),
}

/// The `get` executed before a lifecycle write. Sends only the matching
/// get method's required parameters, the ones that identify the object.
async fn pre_read(
    definition: &ModuleDefinition,
    client: &dyn SdkClient,
    args: &Map<String, Value>,
    metrics: &TaskMetrics,
) -> Result<PreRead, PreReadError> {
    let request = select_operation(definition, Verb::Get, args).map_err(PreReadError::Select)?;
    let function = request.sdk_function(&definition.family);
    let identifying: Vec<&str> = definition
        .params_for(&request.method_name)
        .iter()
        .filter(|p| p.required && !p.artificial)
        .map(|p| p.wire_name())
        .collect();
    let arguments: Map<String, Value> = request
        .arguments
        .iter()
        .filter(|(name, _)| identifying.contains(&name.as_str()))
        .map(|(name, value)| (name.clone(), value.clone()))
        .collect();
    TaskMetrics::bump(&metrics.pre_read_attempts);
    let result = dispatch(client, &definition.family, &request.method_name, arguments).await;
    if result.ok {
        let shape = definition.response_for(&request.method_name);
        let existing = existing_object(result.payload.as_ref(), shape.kind);
        debug!(function = %function, found = existing.is_some(), "pre-read complete");
        return Ok(PreRead {
            existing,
            payload: result.payload,
            function,
            elapsed_ms: result.elapsed_ms,
        });
    }
    let fault = match result.status {
        Some(fault) => fault,
        None => Fault::new(FaultKind::PreReadFailed, format!("pre-read `{function}` failed")),
    };
    if fault.is_not_found() {
        return Ok(PreRead {
            existing: None,
            payload: None,
            function,
            elapsed_ms: result.elapsed_ms,
        });
    }
    TaskMetrics::bump(&metrics.pre_read_errors);
    let fault = Fault {
        kind: FaultKind::PreReadFailed,
        message: format!("pre-read `{function}` failed"),
        details: fault.details,
        sdk_message: fault.sdk_message,
        status_code: fault.status_code,
    };
    Err(PreReadError::Failed(Box::new(Reconciled {
        changed: false,
        result: OperationResult::failure(fault, result.elapsed_ms),
        sdk_function: function,
    })))
}

/// Existence test for the pre-read payload, honouring the declared
/// response shape. Controller responses usually wrap the body under a
/// `response` envelope; a null or empty body means the object is absent.
fn existing_object(payload: Option<&Value>, kind: ResponseKind) -> Option<Value> {
    let value = payload?;
    if value.is_null() {
        return None;
    }
    match kind {
        ResponseKind::Scalar => Some(value.clone()),
        ResponseKind::Array | ResponseKind::Object | ResponseKind::Any => {
            match unwrap_envelope(value) {
                Value::Null => None,
                Value::Object(map) if map.is_empty() => None,
                Value::Array(items) if items.is_empty() => None,
                _ => Some(value.clone()),
            }
        }
    }
}

fn unwrap_envelope(value: &Value) -> &Value {
    match value {
        Value::Object(map) => map.get("response").unwrap_or(value),
        _ => value,
    }
}

/// The empty-diff test for idempotent writes.
fn semantically_empty(payload: Option<&Value>, last_read: Option<&Value>) -> bool {
    let Some(value) = payload else {
        return true;
    };
    if value.is_null() || *value == json!({}) || *value == json!({"response": null}) {
        return true;
    }
    last_read.is_some_and(|previous| previous == value)
}
