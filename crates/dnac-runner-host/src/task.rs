use serde_json::Value;
use tracing::{Instrument, Level, debug, span};

use module_core::{ArgumentSchema, DefinitionError, ModuleDefinition};

use crate::connection::ConnectionConfig;
use crate::lifecycle::{Reconciled, reconcile};
use crate::metrics::{TaskMetrics, TaskMetricsSnapshot};
use crate::outcome::TaskOutcome;
use crate::sdk::SdkClient;
use crate::select::requested_state;
use crate::validate::ArgumentValidator;

/// Problems that keep a definition from becoming a module. Fatal at build
/// time; a task never sees them.
#[derive(Debug, thiserror::Error)]
pub enum ModuleError {
    #[error(transparent)]
    Definition(#[from] DefinitionError),
    #[error("definition `{family}` produced an uncompilable argument schema: {message}")]
    SchemaCompile { family: String, message: String },
}

/// One endpoint family ready to serve tasks: the definition, its compiled
/// argument schema, and the schema validator, built once per process and
/// immutable afterwards.
#[derive(Debug)]
pub struct Module {
    definition: ModuleDefinition,
    validator: ArgumentValidator,
    metrics: TaskMetrics,
}

impl Module {
    pub fn new(definition: ModuleDefinition) -> Result<Self, ModuleError> {
        definition.validate()?;
        let schema = ArgumentSchema::compile(&definition)?;
        let validator = ArgumentValidator::new(schema).map_err(|message| {
            ModuleError::SchemaCompile {
                family: definition.family.clone(),
                message,
            }
        })?;
        Ok(Self {
            definition,
            validator,
            metrics: TaskMetrics::default(),
        })
    }

    pub fn name(&self) -> &str {
        &self.definition.name
    }

    pub fn definition(&self) -> &ModuleDefinition {
        &self.definition
    }

    pub fn schema(&self) -> &ArgumentSchema {
        self.validator.schema()
    }

    pub fn metrics(&self) -> TaskMetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Entry point for one task invocation.
    ///
    /// Exactly one outcome comes back per call; no fault escapes as an
    /// error. The `sdk_function` field is filled in as soon as a method is
    /// selected, on success and failure paths alike.
    pub async fn run(&self, client: &dyn SdkClient, raw_args: &Value) -> TaskOutcome {
        let task_span = span!(
            Level::INFO,
            "task.run",
            module = %self.definition.name,
            family = %self.definition.family,
        );
        async {
            let args = match self.validator.check(raw_args) {
                Ok(args) => args,
                Err(fault) => {
                    TaskMetrics::bump(&self.metrics.validate_errors);
                    return TaskOutcome::failure(fault, None);
                }
            };
            let connection = match ConnectionConfig::from_args(&args) {
                Ok(connection) => connection,
                Err(fault) => {
                    TaskMetrics::bump(&self.metrics.validate_errors);
                    return TaskOutcome::failure(fault, None);
                }
            };
            let state = match requested_state(&args) {
                Ok(state) => state,
                Err(fault) => {
                    TaskMetrics::bump(&self.metrics.validate_errors);
                    return TaskOutcome::failure(fault, None);
                }
            };
            if connection.debug {
                debug!(host = %connection.host, state = %state, "arguments validated");
            }

            match reconcile(&self.definition, client, state, &args, &self.metrics).await {
                Ok(reconciled) => shape(reconciled),
                Err(fault) => {
                    TaskMetrics::bump(&self.metrics.select_errors);
                    TaskOutcome::failure(fault, None)
                }
            }
        }
        .instrument(task_span)
        .await
    }
}

fn shape(reconciled: Reconciled) -> TaskOutcome {
    let Reconciled {
        changed,
        result,
        sdk_function,
    } = reconciled;
    match result.status {
        None => TaskOutcome::success(changed, result.payload, Some(sdk_function)),
        Some(fault) => TaskOutcome::failure(fault, Some(sdk_function)),
    }
}
