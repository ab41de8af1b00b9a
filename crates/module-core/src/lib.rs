//! Definition model and argument-schema compiler for DNA Center modules.
//!
//! This crate provides the data side of the runner: the in-memory
//! representation of one endpoint family, the compiler that derives the
//! argument schema consumed by the host-side validator, and the loader for
//! the data-only definition files. It is not meant to execute anything;
//! use `dnac-runner-host`, which wraps these types with validation,
//! dispatch, and lifecycle reconciliation.

pub mod definition;
pub mod error;
pub mod loader;
pub mod schema;

pub use definition::{
    ModuleDefinition, ParamSpec, ParamType, ResponseKind, ResponseShape, Verb,
};
pub use error::DefinitionError;
pub use loader::{load_definition, load_definitions_dir};
pub use schema::{ArgDescriptor, ArgumentSchema, State};
