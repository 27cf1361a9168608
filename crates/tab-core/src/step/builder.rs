//! Construcción declarativa de steps.
//!
//! Reemplazo del registro por decoradores del diseño original: una función
//! más su metadata declarada (claves de entrada/salida, parámetros con
//! defaults, política de error) produce un step inmutable que se agrega a la
//! lista ordenada del pipeline. No hace falta parchear código en runtime.

use std::collections::HashMap;

use crate::model::ExecutionContext;

use super::definition::{ErrorPolicy, StepDefinition, StepKind, WriteMode};
use super::params::ParameterDefinition;
use super::run_result::StepRunResult;

type StepFn = dyn Fn(&ExecutionContext) -> StepRunResult + Send + Sync;

/// Step concreto respaldado por un closure.
pub struct FnStep {
    id: String,
    kind: StepKind,
    input_keys: Vec<String>,
    output_keys: Vec<String>,
    parameters: HashMap<String, ParameterDefinition>,
    error_policy: ErrorPolicy,
    chunk_size: Option<usize>,
    rows: Option<usize>,
    write_mode: WriteMode,
    content_version: String,
    body: Box<StepFn>,
}

impl StepDefinition for FnStep {
    fn id(&self) -> &str {
        &self.id
    }

    fn kind(&self) -> StepKind {
        self.kind
    }

    fn input_keys(&self) -> &[String] {
        &self.input_keys
    }

    fn output_keys(&self) -> &[String] {
        &self.output_keys
    }

    fn parameters(&self) -> HashMap<String, ParameterDefinition> {
        self.parameters.clone()
    }

    fn error_policy(&self) -> ErrorPolicy {
        self.error_policy
    }

    fn chunk_size(&self) -> Option<usize> {
        self.chunk_size
    }

    fn row_count(&self) -> Option<usize> {
        self.rows
    }

    fn write_mode(&self) -> WriteMode {
        self.write_mode
    }

    fn content_version(&self) -> &str {
        &self.content_version
    }

    fn run(&self, ctx: &ExecutionContext) -> StepRunResult {
        (self.body)(ctx)
    }
}

/// Builder fluido para `FnStep`.
pub struct StepBuilder {
    id: String,
    kind: StepKind,
    input_keys: Vec<String>,
    output_keys: Vec<String>,
    parameters: HashMap<String, ParameterDefinition>,
    error_policy: ErrorPolicy,
    chunk_size: Option<usize>,
    rows: Option<usize>,
    write_mode: WriteMode,
    content_version: String,
}

impl StepBuilder {
    fn new(id: impl Into<String>, kind: StepKind) -> Self {
        Self { id: id.into(),
               kind,
               input_keys: Vec::new(),
               output_keys: Vec::new(),
               parameters: HashMap::new(),
               error_policy: ErrorPolicy::default(),
               chunk_size: None,
               rows: None,
               write_mode: WriteMode::default(),
               content_version: "1".to_string() }
    }

    pub fn source(id: impl Into<String>) -> Self {
        Self::new(id, StepKind::Source)
    }

    pub fn transform(id: impl Into<String>) -> Self {
        Self::new(id, StepKind::Transform)
    }

    pub fn sink(id: impl Into<String>) -> Self {
        Self::new(id, StepKind::Sink)
    }

    pub fn input(mut self, key: impl Into<String>) -> Self {
        self.input_keys.push(key.into());
        self
    }

    pub fn output(mut self, key: impl Into<String>) -> Self {
        self.output_keys.push(key.into());
        self
    }

    pub fn parameter(mut self, def: ParameterDefinition) -> Self {
        self.parameters.insert(def.name.clone(), def);
        self
    }

    pub fn error_policy(mut self, policy: ErrorPolicy) -> Self {
        self.error_policy = policy;
        self
    }

    pub fn chunk_size(mut self, size: usize) -> Self {
        self.chunk_size = Some(size);
        self
    }

    pub fn row_count(mut self, rows: usize) -> Self {
        self.rows = Some(rows);
        self
    }

    pub fn write_mode(mut self, mode: WriteMode) -> Self {
        self.write_mode = mode;
        self
    }

    pub fn content_version(mut self, version: impl Into<String>) -> Self {
        self.content_version = version.into();
        self
    }

    /// Cierra el builder con el cuerpo del step.
    pub fn build<F>(self, body: F) -> FnStep
        where F: Fn(&ExecutionContext) -> StepRunResult + Send + Sync + 'static
    {
        FnStep { id: self.id,
                 kind: self.kind,
                 input_keys: self.input_keys,
                 output_keys: self.output_keys,
                 parameters: self.parameters,
                 error_policy: self.error_policy,
                 chunk_size: self.chunk_size,
                 rows: self.rows,
                 write_mode: self.write_mode,
                 content_version: self.content_version,
                 body: Box::new(body) }
    }
}

impl std::fmt::Debug for FnStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnStep")
         .field("id", &self.id)
         .field("kind", &self.kind)
         .field("input_keys", &self.input_keys)
         .field("output_keys", &self.output_keys)
         .finish_non_exhaustive()
    }
}
