//! Sink en memoria con modos de existencia/escritura.
//!
//! El buffer vive detrás de un handle compartido para que el caller (tests,
//! demo) pueda observar lo escrito después de entregar el step al pipeline.
//! Bajo chunking el motor exige `Append`: escrituras parciales repetidas
//! acumulan en lugar de pisarse.

use std::sync::{Arc, Mutex};

use log::debug;
use tab_core::{CoreError, ExecutionContext, StepDefinition, StepKind, StepOutput, StepRunResult, Table,
               WriteMode};

/// Handle clonable al buffer del sink.
pub type SinkHandle = Arc<Mutex<Table>>;

pub struct MemorySink {
    id: String,
    input_keys: Vec<String>,
    mode: WriteMode,
    buffer: SinkHandle,
}

impl MemorySink {
    pub fn new(id: impl Into<String>, table_key: impl Into<String>, mode: WriteMode) -> Self {
        Self { id: id.into(),
               input_keys: vec![table_key.into()],
               mode,
               buffer: Arc::new(Mutex::new(Table::empty())) }
    }

    /// Handle para inspeccionar el buffer una vez que el step fue movido al
    /// pipeline.
    pub fn handle(&self) -> SinkHandle {
        Arc::clone(&self.buffer)
    }
}

impl StepDefinition for MemorySink {
    fn id(&self) -> &str {
        &self.id
    }

    fn kind(&self) -> StepKind {
        StepKind::Sink
    }

    fn input_keys(&self) -> &[String] {
        &self.input_keys
    }

    fn output_keys(&self) -> &[String] {
        &[]
    }

    fn write_mode(&self) -> WriteMode {
        self.mode
    }

    fn run(&self, ctx: &ExecutionContext) -> StepRunResult {
        let key = &self.input_keys[0];
        let Some(table) = ctx.context.table(key) else {
            return StepRunResult::failure(CoreError::MissingContextKey(key.clone()));
        };

        let mut buffer = match self.buffer.lock() {
            Ok(guard) => guard,
            Err(_) => return StepRunResult::failure(CoreError::Internal("sink buffer poisoned".to_string())),
        };

        let result = match self.mode {
            WriteMode::Append => buffer.append(table),
            WriteMode::Replace => {
                *buffer = table.clone();
                Ok(())
            }
            WriteMode::Fail => {
                if buffer.is_empty() {
                    *buffer = table.clone();
                    Ok(())
                } else {
                    Err(CoreError::SinkWouldOverwrite(self.id.clone()))
                }
            }
        };

        match result {
            Ok(()) => {
                debug!("sink {} wrote {} row(s), buffer now {}",
                       self.id,
                       table.row_count(),
                       buffer.row_count());
                StepRunResult::success(StepOutput::new())
            }
            Err(e) => StepRunResult::failure(e),
        }
    }
}
