use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::DefinitionError;

/// HTTP-method-shaped grouping of SDK methods.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verb {
    Get,
    Post,
    Put,
    Delete,
}

impl Verb {
    pub fn as_str(self) -> &'static str {
        match self {
            Verb::Get => "get",
            Verb::Post => "post",
            Verb::Put => "put",
            Verb::Delete => "delete",
        }
    }
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Base value type of one parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamType {
    String,
    Integer,
    Number,
    Boolean,
    Array,
    Object,
    Any,
}

impl ParamType {
    pub fn as_str(self) -> &'static str {
        match self {
            ParamType::String => "string",
            ParamType::Integer => "integer",
            ParamType::Number => "number",
            ParamType::Boolean => "boolean",
            ParamType::Array => "array",
            ParamType::Object => "object",
            ParamType::Any => "any",
        }
    }
}

impl fmt::Display for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One caller-facing parameter of one SDK method.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ParamSpec {
    pub name: String,
    /// SDK-side synonym; the caller-facing name is used when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sdk_name: Option<String>,
    #[serde(rename = "type")]
    pub param_type: ParamType,
    #[serde(default)]
    pub required: bool,
    /// Element type when `param_type` is array.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub array_type: Option<ParamType>,
    /// Nested parameter layout for objects and arrays of objects.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub schema: Vec<ParamSpec>,
    /// Discriminator used only to pick between methods sharing a verb;
    /// never forwarded to the SDK.
    #[serde(default)]
    pub artificial: bool,
}

impl ParamSpec {
    /// Name the value travels under on the SDK side.
    pub fn wire_name(&self) -> &str {
        self.sdk_name.as_deref().unwrap_or(&self.name)
    }
}

/// Hint about the payload one method returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseKind {
    #[default]
    Any,
    Object,
    Array,
    Scalar,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ResponseShape {
    #[serde(default)]
    pub kind: ResponseKind,
}

/// In-memory representation of one endpoint family. Immutable once built:
/// the loader validates on construction and the host only hands out shared
/// references.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ModuleDefinition {
    /// SDK sub-client the methods live on.
    pub family: String,
    /// Human identifier; also the registry key.
    pub name: String,
    /// Methods per verb, in definition order. Order is the selector's
    /// tie-break when several methods share a verb.
    pub operations: IndexMap<Verb, Vec<String>>,
    /// Parameter layout per method, in definition order.
    pub parameters: IndexMap<String, Vec<ParamSpec>>,
    /// Response shape hints per method.
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub responses: IndexMap<String, ResponseShape>,
    /// When true, a write returning a semantically empty payload reports
    /// `changed = false` instead of the always-changed default.
    #[serde(default)]
    pub idempotent: bool,
}

/// Parameter names the schema compiler reserves for itself.
pub(crate) const RESERVED_NAMES: &[&str] = &[
    "state",
    "dnac_host",
    "dnac_username",
    "dnac_password",
    "dnac_verify",
    "dnac_port",
    "dnac_version",
    "dnac_debug",
];

impl ModuleDefinition {
    /// Check the construction invariants. The loader calls this for every
    /// definition file; call it yourself when assembling one in code.
    pub fn validate(&self) -> Result<(), DefinitionError> {
        if self.operations.values().all(Vec::is_empty) {
            return Err(DefinitionError::NoOperations {
                family: self.family.clone(),
            });
        }
        for (verb, methods) in &self.operations {
            for method in methods {
                if !self.parameters.contains_key(method) {
                    return Err(DefinitionError::UnknownMethod {
                        family: self.family.clone(),
                        verb: *verb,
                        method: method.clone(),
                    });
                }
            }
        }
        for (method, params) in &self.parameters {
            self.validate_params(method, params)?;
        }
        Ok(())
    }

    fn validate_params(&self, method: &str, params: &[ParamSpec]) -> Result<(), DefinitionError> {
        let mut seen = Vec::new();
        let mut optional_seen = false;
        for param in params {
            if seen.contains(&param.name.as_str()) {
                return Err(DefinitionError::DuplicateParam {
                    family: self.family.clone(),
                    method: method.to_string(),
                    param: param.name.clone(),
                });
            }
            seen.push(param.name.as_str());
            if RESERVED_NAMES.contains(&param.name.as_str()) {
                return Err(DefinitionError::ReservedName {
                    family: self.family.clone(),
                    param: param.name.clone(),
                });
            }
            if param.artificial && (param.param_type != ParamType::Boolean || !param.required) {
                return Err(DefinitionError::BadArtificial {
                    family: self.family.clone(),
                    method: method.to_string(),
                    param: param.name.clone(),
                });
            }
            if param.required && !param.artificial && optional_seen {
                return Err(DefinitionError::RequiredAfterOptional {
                    family: self.family.clone(),
                    method: method.to_string(),
                    param: param.name.clone(),
                });
            }
            if !param.required && !param.artificial {
                optional_seen = true;
            }
            self.validate_shape(method, param)?;
            self.validate_nested(method, &param.name, &param.schema)?;
        }
        Ok(())
    }

    fn validate_shape(&self, method: &str, param: &ParamSpec) -> Result<(), DefinitionError> {
        if param.param_type == ParamType::Array && param.array_type.is_none() {
            return Err(DefinitionError::ArrayWithoutElementType {
                family: self.family.clone(),
                method: method.to_string(),
                param: param.name.clone(),
            });
        }
        Ok(())
    }

    fn validate_nested(
        &self,
        method: &str,
        parent: &str,
        schema: &[ParamSpec],
    ) -> Result<(), DefinitionError> {
        let mut seen = Vec::new();
        for param in schema {
            if seen.contains(&param.name.as_str()) {
                return Err(DefinitionError::DuplicateParam {
                    family: self.family.clone(),
                    method: method.to_string(),
                    param: param.name.clone(),
                });
            }
            seen.push(param.name.as_str());
            if param.artificial {
                return Err(DefinitionError::NestedArtificial {
                    family: self.family.clone(),
                    method: method.to_string(),
                    parent: parent.to_string(),
                    param: param.name.clone(),
                });
            }
            self.validate_shape(method, param)?;
            self.validate_nested(method, &param.name, &param.schema)?;
        }
        Ok(())
    }

    /// Methods dispatched for `verb`, in definition order.
    pub fn methods_for(&self, verb: Verb) -> &[String] {
        self.operations.get(&verb).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Parameter layout for one method.
    pub fn params_for(&self, method: &str) -> &[ParamSpec] {
        self.parameters
            .get(method)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Discriminator parameters for one method.
    pub fn artificial_params_for(&self, method: &str) -> impl Iterator<Item = &ParamSpec> {
        self.params_for(method).iter().filter(|p| p.artificial)
    }

    /// Response shape hint for one method; `Any` when none is declared.
    pub fn response_for(&self, method: &str) -> ResponseShape {
        self.responses.get(method).copied().unwrap_or_default()
    }

    pub fn supports(&self, verb: Verb) -> bool {
        !self.methods_for(verb).is_empty()
    }
}
