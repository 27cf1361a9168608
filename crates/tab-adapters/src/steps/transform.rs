//! Transformaciones puras sobre proyecciones del contexto.
//!
//! Cada transform declara sus claves de entrada/salida y sus parámetros con
//! defaults; el motor resuelve prioridades y filtra el merge-back, así que
//! acá sólo vive la lógica de tabla.

use std::collections::HashMap;

use serde_json::{json, Value};
use tab_core::{CoreError, ExecutionContext, ParameterDefinition, ParameterType, StepDefinition, StepKind,
               StepOutput, StepRunResult, Table};

/// Multiplica una columna numérica por el parámetro `factor`.
pub struct ScaleColumn {
    id: String,
    keys: Vec<String>,
    column: String,
}

impl ScaleColumn {
    pub fn new(id: impl Into<String>, table_key: impl Into<String>, column: impl Into<String>) -> Self {
        Self { id: id.into(),
               keys: vec![table_key.into()],
               column: column.into() }
    }
}

impl StepDefinition for ScaleColumn {
    fn id(&self) -> &str {
        &self.id
    }

    fn kind(&self) -> StepKind {
        StepKind::Transform
    }

    fn input_keys(&self) -> &[String] {
        &self.keys
    }

    fn output_keys(&self) -> &[String] {
        &self.keys
    }

    fn parameters(&self) -> HashMap<String, ParameterDefinition> {
        let mut m = HashMap::new();
        m.insert("factor".to_string(),
                 ParameterDefinition::optional("factor", ParameterType::Number, json!(1.0))
                     .describe("multiplicador aplicado a la columna"));
        m
    }

    fn run(&self, ctx: &ExecutionContext) -> StepRunResult {
        let key = &self.keys[0];
        let factor = match ctx.param("factor").and_then(Value::as_f64) {
            Some(f) => f,
            None => return StepRunResult::failure(CoreError::step_failed(&self.id, "factor must be numeric")),
        };
        let Some(table) = ctx.context.table(key) else {
            return StepRunResult::failure(CoreError::MissingContextKey(key.clone()));
        };
        let Some(col) = table.column_index(&self.column) else {
            return StepRunResult::failure(CoreError::step_failed(&self.id,
                                                                 format!("column '{}' not found", self.column)));
        };

        let rows = table.rows()
                        .iter()
                        .map(|row| {
                            let mut row = row.clone();
                            if let Some(n) = row[col].as_f64() {
                                row[col] = json!(n * factor);
                            }
                            row
                        })
                        .collect();
        match Table::with_rows(table.columns().to_vec(), rows) {
            Ok(scaled) => StepRunResult::success(StepOutput::new().with_table(key.clone(), scaled)),
            Err(e) => StepRunResult::failure(e),
        }
    }
}

/// Proyecta un subconjunto de columnas hacia otra clave de contexto.
pub struct ProjectColumns {
    id: String,
    input_keys: Vec<String>,
    output_keys: Vec<String>,
    columns: Vec<String>,
}

impl ProjectColumns {
    pub fn new(id: impl Into<String>,
               input_key: impl Into<String>,
               output_key: impl Into<String>,
               columns: Vec<&str>)
               -> Self {
        Self { id: id.into(),
               input_keys: vec![input_key.into()],
               output_keys: vec![output_key.into()],
               columns: columns.into_iter().map(str::to_string).collect() }
    }
}

impl StepDefinition for ProjectColumns {
    fn id(&self) -> &str {
        &self.id
    }

    fn kind(&self) -> StepKind {
        StepKind::Transform
    }

    fn input_keys(&self) -> &[String] {
        &self.input_keys
    }

    fn output_keys(&self) -> &[String] {
        &self.output_keys
    }

    fn run(&self, ctx: &ExecutionContext) -> StepRunResult {
        let Some(table) = ctx.context.table(&self.input_keys[0]) else {
            return StepRunResult::failure(CoreError::MissingContextKey(self.input_keys[0].clone()));
        };

        let mut indices = Vec::with_capacity(self.columns.len());
        for c in &self.columns {
            match table.column_index(c) {
                Some(i) => indices.push(i),
                None => {
                    return StepRunResult::failure(CoreError::step_failed(&self.id,
                                                                         format!("column '{c}' not found")))
                }
            }
        }

        let rows = table.rows()
                        .iter()
                        .map(|row| indices.iter().map(|&i| row[i].clone()).collect())
                        .collect();
        match Table::with_rows(self.columns.clone(), rows) {
            Ok(projected) => StepRunResult::success(StepOutput::new().with_table(self.output_keys[0].clone(), projected)),
            Err(e) => StepRunResult::failure(e),
        }
    }
}

/// Resta `amount` a un escalar del índice de parámetros y publica el nuevo
/// valor bajo la misma clave. Resta real: el contrato es sustracción.
pub struct DecrementScalar {
    id: String,
    scalar_key: String,
    output_keys: Vec<String>,
}

impl DecrementScalar {
    pub fn new(id: impl Into<String>, scalar_key: impl Into<String>) -> Self {
        let scalar_key = scalar_key.into();
        Self { id: id.into(),
               output_keys: vec![scalar_key.clone()],
               scalar_key }
    }
}

impl StepDefinition for DecrementScalar {
    fn id(&self) -> &str {
        &self.id
    }

    fn kind(&self) -> StepKind {
        StepKind::Transform
    }

    fn input_keys(&self) -> &[String] {
        &[]
    }

    fn output_keys(&self) -> &[String] {
        &self.output_keys
    }

    fn parameters(&self) -> HashMap<String, ParameterDefinition> {
        let mut m = HashMap::new();
        m.insert(self.scalar_key.clone(),
                 ParameterDefinition::required(self.scalar_key.clone(), ParameterType::Number)
                     .describe("valor actual a decrementar"));
        m.insert("amount".to_string(),
                 ParameterDefinition::optional("amount", ParameterType::Number, json!(1.0)));
        m
    }

    fn run(&self, ctx: &ExecutionContext) -> StepRunResult {
        let current = match ctx.param(&self.scalar_key).and_then(Value::as_f64) {
            Some(v) => v,
            None => {
                return StepRunResult::failure(CoreError::step_failed(&self.id,
                                                                     format!("'{}' is not numeric",
                                                                             self.scalar_key)))
            }
        };
        let amount = ctx.param("amount").and_then(Value::as_f64).unwrap_or(1.0);
        StepRunResult::success(StepOutput::new().with_value(self.scalar_key.clone(), json!(current - amount)))
    }
}
