use crate::definition::{ParamType, Verb};

/// Fatal construction problems. A definition that fails these checks never
/// becomes a module; the host refuses to load it.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DefinitionError {
    #[error("definition `{family}` declares no operations")]
    NoOperations { family: String },

    #[error("definition `{family}`: {verb} operation names unknown method `{method}`")]
    UnknownMethod {
        family: String,
        verb: Verb,
        method: String,
    },

    #[error("definition `{family}`: method `{method}` declares parameter `{param}` more than once")]
    DuplicateParam {
        family: String,
        method: String,
        param: String,
    },

    #[error(
        "definition `{family}`: method `{method}` parameter `{param}` is an array without array_type"
    )]
    ArrayWithoutElementType {
        family: String,
        method: String,
        param: String,
    },

    #[error(
        "definition `{family}`: method `{method}` artificial parameter `{param}` must be a required boolean"
    )]
    BadArtificial {
        family: String,
        method: String,
        param: String,
    },

    #[error(
        "definition `{family}`: method `{method}` nests artificial parameter `{param}` under `{parent}`"
    )]
    NestedArtificial {
        family: String,
        method: String,
        parent: String,
        param: String,
    },

    #[error(
        "definition `{family}`: method `{method}` declares required parameter `{param}` after optional ones"
    )]
    RequiredAfterOptional {
        family: String,
        method: String,
        param: String,
    },

    #[error(
        "definition `{family}`: parameter `{param}` is declared as both {left} and {right} across methods"
    )]
    TypeConflict {
        family: String,
        param: String,
        left: ParamType,
        right: ParamType,
    },

    #[error("definition `{family}`: parameter `{param}` shadows a reserved runner parameter")]
    ReservedName { family: String, param: String },
}
