//! VecSource (Source determinista)
//!
//! - Emite una única tabla bajo su clave de salida declarada, a partir de
//!   datos en memoria. No accede a IO externo.
//! - Expone `row_count` y respeta coordenadas de chunk: una rebanada
//!   `(start, rows)` materializa esa ventana de filas; el centinela `Skip`
//!   produce la tabla vacía (misma forma, cero filas).

use tab_core::{ChunkCoordinate, ExecutionContext, StepDefinition, StepKind, StepOutput, StepRunResult, Table};

pub struct VecSource {
    id: String,
    output_keys: Vec<String>,
    table: Table,
    chunk_size: Option<usize>,
    content_version: String,
}

impl VecSource {
    pub fn new(id: impl Into<String>, table_key: impl Into<String>, table: Table) -> Self {
        Self { id: id.into(),
               output_keys: vec![table_key.into()],
               table,
               chunk_size: None,
               content_version: "1".to_string() }
    }

    /// Habilita particionado con el tamaño de chunk dado.
    pub fn with_chunk_size(mut self, size: usize) -> Self {
        self.chunk_size = Some(size);
        self
    }

    pub fn with_content_version(mut self, version: impl Into<String>) -> Self {
        self.content_version = version.into();
        self
    }

    fn table_key(&self) -> &str {
        &self.output_keys[0]
    }
}

impl StepDefinition for VecSource {
    fn id(&self) -> &str {
        &self.id
    }

    fn kind(&self) -> StepKind {
        StepKind::Source
    }

    fn input_keys(&self) -> &[String] {
        &[]
    }

    fn output_keys(&self) -> &[String] {
        &self.output_keys
    }

    fn chunk_size(&self) -> Option<usize> {
        self.chunk_size
    }

    fn row_count(&self) -> Option<usize> {
        Some(self.table.row_count())
    }

    fn content_version(&self) -> &str {
        &self.content_version
    }

    fn run(&self, ctx: &ExecutionContext) -> StepRunResult {
        let window = match ctx.chunk {
            None => self.table.clone(),
            Some(ChunkCoordinate::Slice { start, rows }) => self.table.slice(start, rows),
            Some(ChunkCoordinate::Skip) => self.table.slice(0, 0),
        };
        StepRunResult::success(StepOutput::new().with_table(self.table_key(), window))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tab_core::Context;

    fn source() -> VecSource {
        let rows = (0..10).map(|i| vec![json!(i)]).collect();
        VecSource::new("numbers", "numbers", Table::with_rows(vec!["n"], rows).unwrap())
    }

    fn run(step: &VecSource, chunk: Option<ChunkCoordinate>) -> Table {
        let ctx = ExecutionContext { context: Context::new(),
                                     params: json!({}),
                                     chunk };
        match step.run(&ctx) {
            StepRunResult::Success { output } => output.context.table("numbers").unwrap().clone(),
            StepRunResult::Failure { error } => panic!("source failed: {error}"),
        }
    }

    #[test]
    fn emits_whole_table_without_chunk() {
        assert_eq!(run(&source(), None).row_count(), 10);
    }

    #[test]
    fn emits_window_for_slice_coordinate() {
        let t = run(&source(), Some(ChunkCoordinate::Slice { start: 4, rows: 3 }));
        assert_eq!(t.row_count(), 3);
        assert_eq!(t.rows()[0][0], json!(4));
    }

    #[test]
    fn skip_coordinate_emits_empty_table() {
        let t = run(&source(), Some(ChunkCoordinate::Skip));
        assert_eq!(t.row_count(), 0);
        assert_eq!(t.columns(), ["n"]);
    }

    #[test]
    fn reports_row_count_for_planner() {
        assert_eq!(source().row_count(), Some(10));
    }
}
