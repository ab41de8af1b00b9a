use std::fmt;
use std::str::FromStr;

use anyhow::bail;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use crate::definition::{ModuleDefinition, ParamSpec, ParamType, Verb};
use crate::error::DefinitionError;

/// User-facing lifecycle selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum State {
    Query,
    Create,
    Update,
    Delete,
    Present,
    Absent,
}

impl State {
    pub fn as_str(self) -> &'static str {
        match self {
            State::Query => "query",
            State::Create => "create",
            State::Update => "update",
            State::Delete => "delete",
            State::Present => "present",
            State::Absent => "absent",
        }
    }

    /// Verb dispatched for this state. `present` resolves to post or put
    /// only after the pre-read, so it has no static verb.
    pub fn verb(self) -> Option<Verb> {
        match self {
            State::Query => Some(Verb::Get),
            State::Create => Some(Verb::Post),
            State::Update => Some(Verb::Put),
            State::Delete | State::Absent => Some(Verb::Delete),
            State::Present => None,
        }
    }

    /// The state a method belongs to by virtue of its verb.
    pub fn of_verb(verb: Verb) -> State {
        match verb {
            Verb::Get => State::Query,
            Verb::Post => State::Create,
            Verb::Put => State::Update,
            Verb::Delete => State::Delete,
        }
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for State {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> anyhow::Result<Self> {
        match value.to_ascii_lowercase().as_str() {
            "query" => Ok(State::Query),
            "create" => Ok(State::Create),
            "update" => Ok(State::Update),
            "delete" => Ok(State::Delete),
            "present" => Ok(State::Present),
            "absent" => Ok(State::Absent),
            other => bail!("unsupported state `{other}`"),
        }
    }
}

pub const DEFAULT_USERNAME: &str = "admin";
pub const DEFAULT_PORT: u16 = 443;
pub const DEFAULT_VERSION: &str = "2.3.7";

/// Validator descriptor for one caller-facing parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArgDescriptor {
    pub param_type: ParamType,
    /// Required under every state.
    pub required: bool,
    /// States under which the parameter becomes required.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub required_if: Vec<State>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub choices: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    /// Values never echoed into diagnostics.
    #[serde(default)]
    pub secret: bool,
    /// Element type when `param_type` is array.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub elements: Option<ParamType>,
    /// Nested layout for objects and arrays of objects.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub nested: Vec<ParamSpec>,
}

impl ArgDescriptor {
    fn new(param_type: ParamType) -> Self {
        Self {
            param_type,
            required: false,
            required_if: Vec::new(),
            choices: Vec::new(),
            default: None,
            secret: false,
            elements: None,
            nested: Vec::new(),
        }
    }

    fn from_param(param: &ParamSpec) -> Self {
        Self {
            elements: param.array_type,
            nested: param.schema.clone(),
            ..Self::new(param.param_type)
        }
    }

    fn required(mut self) -> Self {
        self.required = true;
        self
    }

    fn secret(mut self) -> Self {
        self.secret = true;
        self
    }

    fn with_default(mut self, value: Value) -> Self {
        self.default = Some(value);
        self
    }

    fn with_choices(mut self, choices: Vec<String>) -> Self {
        self.choices = choices;
        self
    }
}

/// Compiled argument schema for one module: the union of every method's
/// parameters plus `state` and the connection block. A pure function of the
/// definition; compiling twice yields an equal schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArgumentSchema {
    pub args: IndexMap<String, ArgDescriptor>,
    /// Value set of `state`, derived from the operations map.
    pub states: Vec<State>,
}

impl ArgumentSchema {
    pub fn compile(definition: &ModuleDefinition) -> Result<Self, DefinitionError> {
        let states = derive_states(definition);
        let mut args: IndexMap<String, ArgDescriptor> = IndexMap::new();
        for (verb, methods) in &definition.operations {
            let state = State::of_verb(*verb);
            for method in methods {
                for param in definition.params_for(method) {
                    if let Some(existing) = args.get(&param.name)
                        && existing.param_type != param.param_type
                    {
                        return Err(DefinitionError::TypeConflict {
                            family: definition.family.clone(),
                            param: param.name.clone(),
                            left: existing.param_type,
                            right: param.param_type,
                        });
                    }
                    let descriptor = args
                        .entry(param.name.clone())
                        .or_insert_with(|| ArgDescriptor::from_param(param));
                    if param.required && !param.artificial && !descriptor.required_if.contains(&state)
                    {
                        descriptor.required_if.push(state);
                    }
                }
            }
        }
        args.insert(
            "state".to_string(),
            ArgDescriptor::new(ParamType::String)
                .required()
                .with_choices(states.iter().map(|s| s.as_str().to_string()).collect()),
        );
        for (name, descriptor) in connection_args() {
            args.insert(name.to_string(), descriptor);
        }
        Ok(Self { args, states })
    }

    pub fn descriptor(&self, name: &str) -> Option<&ArgDescriptor> {
        self.args.get(name)
    }

    /// Render the compiled schema as a JSON Schema draft-7 document, the
    /// form the host validator consumes. Unknown parameters are rejected
    /// via `additionalProperties: false`; per-state requirements become
    /// `allOf` if/then clauses keyed on the `state` constant.
    pub fn to_json_schema(&self) -> Value {
        let mut properties = Map::new();
        let mut required = Vec::new();
        for (name, descriptor) in &self.args {
            let mut schema = type_schema(descriptor.param_type, descriptor.elements, &descriptor.nested);
            if !descriptor.choices.is_empty() {
                schema["enum"] = Value::Array(
                    descriptor.choices.iter().map(|c| json!(c)).collect(),
                );
            }
            properties.insert(name.clone(), schema);
            if descriptor.required {
                required.push(json!(name));
            }
        }
        let mut root = json!({
            "$schema": "http://json-schema.org/draft-07/schema#",
            "type": "object",
            "additionalProperties": false,
            "properties": properties,
        });
        if !required.is_empty() {
            root["required"] = Value::Array(required);
        }
        let mut by_state: IndexMap<State, Vec<String>> = IndexMap::new();
        for (name, descriptor) in &self.args {
            for state in &descriptor.required_if {
                by_state.entry(*state).or_default().push(name.clone());
            }
        }
        let clauses: Vec<Value> = by_state
            .into_iter()
            .map(|(state, names)| {
                json!({
                    "if": {
                        "properties": { "state": { "const": state.as_str() } },
                        "required": ["state"],
                    },
                    "then": { "required": names },
                })
            })
            .collect();
        if !clauses.is_empty() {
            root["allOf"] = Value::Array(clauses);
        }
        root
    }
}

fn derive_states(definition: &ModuleDefinition) -> Vec<State> {
    let mut states = Vec::new();
    if definition.supports(Verb::Get) {
        states.push(State::Query);
    }
    if definition.supports(Verb::Post) {
        states.push(State::Create);
    }
    if definition.supports(Verb::Put) {
        states.push(State::Update);
    }
    if definition.supports(Verb::Delete) {
        states.push(State::Delete);
    }
    if definition.supports(Verb::Post) && definition.supports(Verb::Delete) {
        states.push(State::Present);
        states.push(State::Absent);
    }
    states
}

fn connection_args() -> Vec<(&'static str, ArgDescriptor)> {
    vec![
        ("dnac_host", ArgDescriptor::new(ParamType::String).required()),
        (
            "dnac_username",
            ArgDescriptor::new(ParamType::String).with_default(json!(DEFAULT_USERNAME)),
        ),
        (
            "dnac_password",
            ArgDescriptor::new(ParamType::String).required().secret(),
        ),
        (
            "dnac_verify",
            ArgDescriptor::new(ParamType::Boolean).with_default(json!(true)),
        ),
        (
            "dnac_port",
            ArgDescriptor::new(ParamType::Integer).with_default(json!(DEFAULT_PORT)),
        ),
        (
            "dnac_version",
            ArgDescriptor::new(ParamType::String).with_default(json!(DEFAULT_VERSION)),
        ),
        (
            "dnac_debug",
            ArgDescriptor::new(ParamType::Boolean).with_default(json!(false)),
        ),
    ]
}

fn type_schema(param_type: ParamType, elements: Option<ParamType>, nested: &[ParamSpec]) -> Value {
    match param_type {
        ParamType::String => json!({ "type": "string" }),
        ParamType::Integer => json!({ "type": "integer" }),
        ParamType::Number => json!({ "type": "number" }),
        ParamType::Boolean => json!({ "type": "boolean" }),
        ParamType::Any => json!({}),
        ParamType::Object => object_schema(nested),
        ParamType::Array => {
            let items = match elements {
                Some(ParamType::Object) => object_schema(nested),
                Some(element) => type_schema(element, None, &[]),
                None => json!({}),
            };
            json!({ "type": "array", "items": items })
        }
    }
}

fn object_schema(nested: &[ParamSpec]) -> Value {
    if nested.is_empty() {
        return json!({ "type": "object" });
    }
    let mut properties = Map::new();
    let mut required = Vec::new();
    for spec in nested {
        properties.insert(
            spec.name.clone(),
            type_schema(spec.param_type, spec.array_type, &spec.schema),
        );
        if spec.required {
            required.push(json!(spec.name));
        }
    }
    let mut schema = json!({ "type": "object", "properties": properties });
    if !required.is_empty() {
        schema["required"] = Value::Array(required);
    }
    schema
}
