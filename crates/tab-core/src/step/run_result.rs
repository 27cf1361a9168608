use indexmap::IndexMap;
use serde_json::Value;

use crate::errors::CoreError;
use crate::model::Context;

/// Salida declarativa de un step: tablas en `context`, escalares en
/// `values`. El executor filtra ambos por las claves de salida declaradas
/// antes del merge.
#[derive(Debug, Default)]
pub struct StepOutput {
    pub context: Context,
    pub values: IndexMap<String, Value>,
}

impl StepOutput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_table(mut self, key: impl Into<String>, table: crate::model::Table) -> Self {
        self.context.insert_table(key, table);
        self
    }

    pub fn with_value(mut self, key: impl Into<String>, value: Value) -> Self {
        self.values.insert(key.into(), value);
        self
    }
}

/// Resultado abstracto de ejecutar un step.
pub enum StepRunResult {
    Success { output: StepOutput },
    Failure { error: CoreError },
}

impl StepRunResult {
    pub fn success(output: StepOutput) -> Self {
        StepRunResult::Success { output }
    }

    pub fn failure(error: CoreError) -> Self {
        StepRunResult::Failure { error }
    }
}

impl From<Result<StepOutput, CoreError>> for StepRunResult {
    fn from(res: Result<StepOutput, CoreError>) -> Self {
        match res {
            Ok(output) => StepRunResult::Success { output },
            Err(error) => StepRunResult::Failure { error },
        }
    }
}
