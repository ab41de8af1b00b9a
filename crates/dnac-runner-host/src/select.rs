use serde_json::{Map, Value};

use module_core::{ModuleDefinition, ParamSpec, State, Verb};

use crate::outcome::{Fault, FaultKind};

/// The single operation chosen for a task, with arguments already mapped
/// to SDK-side names. Discriminators are kept for observability but are
/// never part of the SDK call.
#[derive(Debug, Clone, PartialEq)]
pub struct OperationRequest {
    pub verb: Verb,
    pub method_name: String,
    pub arguments: Map<String, Value>,
    pub discriminators: Map<String, Value>,
}

impl OperationRequest {
    pub fn sdk_function(&self, family: &str) -> String {
        format!("{family}.{}", self.method_name)
    }
}

/// Parse the requested lifecycle state out of the normalized arguments.
pub fn requested_state(args: &Map<String, Value>) -> Result<State, Fault> {
    let value = args.get("state").and_then(Value::as_str).ok_or_else(|| {
        Fault::new(FaultKind::ArgumentInvalid, "`state` is missing or not a string")
    })?;
    value
        .parse()
        .map_err(|err| Fault::new(FaultKind::ArgumentInvalid, format!("{err}")))
}

/// Choose the single method dispatched for `verb` and map its arguments.
///
/// With several candidates, the first method (in definition order) whose
/// artificial discriminator is truthy in the arguments wins; without any
/// truthy discriminator the first candidate is the tie-break.
pub fn select_operation(
    definition: &ModuleDefinition,
    verb: Verb,
    args: &Map<String, Value>,
) -> Result<OperationRequest, Fault> {
    let candidates = definition.methods_for(verb);
    let method = match candidates {
        [] => {
            return Err(Fault::new(
                FaultKind::NoMatchingOperation,
                format!(
                    "definition `{}` has no {verb} operation for the requested state",
                    definition.name
                ),
            ));
        }
        [only] => only,
        many => discriminated(definition, many, args),
    };
    Ok(build_request(definition, verb, method, args))
}

fn discriminated<'a>(
    definition: &ModuleDefinition,
    candidates: &'a [String],
    args: &Map<String, Value>,
) -> &'a String {
    for method in candidates {
        for param in definition.artificial_params_for(method) {
            if args.get(&param.name) == Some(&Value::Bool(true)) {
                return method;
            }
        }
    }
    &candidates[0]
}

fn build_request(
    definition: &ModuleDefinition,
    verb: Verb,
    method: &str,
    args: &Map<String, Value>,
) -> OperationRequest {
    let mut arguments = Map::new();
    let mut discriminators = Map::new();
    for param in definition.params_for(method) {
        let Some(value) = args.get(&param.name) else {
            continue;
        };
        if param.artificial {
            discriminators.insert(param.name.clone(), value.clone());
            continue;
        }
        if value.is_null() && !param.required {
            continue;
        }
        arguments.insert(param.wire_name().to_string(), map_value(value, param));
    }
    OperationRequest {
        verb,
        method_name: method.to_string(),
        arguments,
        discriminators,
    }
}

fn map_value(value: &Value, param: &ParamSpec) -> Value {
    if param.schema.is_empty() {
        return value.clone();
    }
    match value {
        Value::Object(map) => map_object(map, &param.schema),
        Value::Array(items) => Value::Array(
            items
                .iter()
                .map(|item| match item {
                    Value::Object(map) => map_object(map, &param.schema),
                    other => other.clone(),
                })
                .collect(),
        ),
        other => other.clone(),
    }
}

fn map_object(map: &Map<String, Value>, schema: &[ParamSpec]) -> Value {
    let mut out = Map::new();
    for spec in schema {
        let Some(value) = map.get(&spec.name) else {
            continue;
        };
        if value.is_null() && !spec.required {
            continue;
        }
        out.insert(spec.wire_name().to_string(), map_value(value, spec));
    }
    // keys the schema does not describe pass through unchanged
    for (key, value) in map {
        if !schema.iter().any(|spec| spec.name == *key) {
            out.insert(key.clone(), value.clone());
        }
    }
    Value::Object(out)
}
