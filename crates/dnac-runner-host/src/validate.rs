use jsonschema::{Draft, Validator};
use serde_json::{Map, Value};

use module_core::{ArgumentSchema, ParamType};

use crate::outcome::{Fault, FaultKind};

/// Compiled form of an [`ArgumentSchema`], ready to check task arguments.
///
/// The adapter owns normalization (type coercion, defaults) and delegates
/// value-shape checking to the generic JSON Schema validator. Unknown
/// parameters are surfaced, never dropped.
#[derive(Debug)]
pub struct ArgumentValidator {
    schema: ArgumentSchema,
    compiled: Validator,
}

impl ArgumentValidator {
    pub fn new(schema: ArgumentSchema) -> Result<Self, String> {
        let document = schema.to_json_schema();
        let compiled = jsonschema::options()
            .with_draft(Draft::Draft7)
            .build(&document)
            .map_err(|err| err.to_string())?;
        Ok(Self { schema, compiled })
    }

    pub fn schema(&self) -> &ArgumentSchema {
        &self.schema
    }

    /// Validate and normalize caller arguments. On success the returned
    /// mapping has coerced types and defaults applied; on failure the
    /// fault carries the validator's messages as a list.
    pub fn check(&self, raw: &Value) -> Result<Map<String, Value>, Fault> {
        let Some(object) = raw.as_object() else {
            return Err(Fault::with_details(
                FaultKind::ArgumentInvalid,
                "module arguments must be a mapping",
                vec![format!("expected an object, got {raw}")],
            ));
        };
        let normalized = self.normalize(object);
        let instance = Value::Object(normalized.clone());
        let messages: Vec<String> = self
            .compiled
            .iter_errors(&instance)
            .map(|err| self.render_error(&err))
            .collect();
        if !messages.is_empty() {
            return Err(Fault::with_details(
                FaultKind::ArgumentInvalid,
                "argument validation failed",
                messages,
            ));
        }
        Ok(normalized)
    }

    fn normalize(&self, raw: &Map<String, Value>) -> Map<String, Value> {
        let mut out = Map::new();
        for (name, value) in raw {
            match self.schema.args.get(name) {
                // a null for a known parameter means "unset"
                Some(_) if value.is_null() => {}
                Some(descriptor) => {
                    out.insert(name.clone(), coerce_value(value, descriptor.param_type));
                }
                // unknown parameters are kept so the validator reports them
                None => {
                    out.insert(name.clone(), value.clone());
                }
            }
        }
        for (name, descriptor) in &self.schema.args {
            if !out.contains_key(name)
                && let Some(default) = &descriptor.default
            {
                out.insert(name.clone(), default.clone());
            }
        }
        out
    }

    fn render_error(&self, err: &jsonschema::ValidationError<'_>) -> String {
        let path = err.instance_path().to_string();
        let top = path
            .strip_prefix('/')
            .and_then(|rest| rest.split('/').next())
            .unwrap_or("");
        let display_path = if path.is_empty() { "/" } else { path.as_str() };
        match self.schema.args.get(top) {
            Some(descriptor) if descriptor.secret => {
                format!("{display_path}: value is not valid")
            }
            _ => format!("{display_path}: {err}"),
        }
    }
}

fn coerce_value(value: &Value, target: ParamType) -> Value {
    match (target, value) {
        (ParamType::Integer, Value::String(text)) => text
            .trim()
            .parse::<i64>()
            .map(Value::from)
            .unwrap_or_else(|_| value.clone()),
        (ParamType::Number, Value::String(text)) => text
            .trim()
            .parse::<f64>()
            .ok()
            .and_then(serde_json::Number::from_f64)
            .map(Value::Number)
            .unwrap_or_else(|| value.clone()),
        (ParamType::Boolean, Value::String(text)) => {
            match text.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => Value::Bool(true),
                "0" | "false" | "no" | "off" => Value::Bool(false),
                _ => value.clone(),
            }
        }
        (ParamType::String, Value::Number(number)) => Value::String(number.to_string()),
        (ParamType::String, Value::Bool(flag)) => Value::String(flag.to_string()),
        _ => value.clone(),
    }
}
