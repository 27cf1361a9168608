//! Errores específicos del core.
//!
//! Un único enum plano: los eventos del pipeline serializan el error tal cual,
//! por lo que todas las variantes llevan datos `Serialize`/`Deserialize`.

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq, Clone, Serialize, Deserialize)]
pub enum CoreError {
    /// Modo de ejecución desconocido (fallo de configuración, previo al run).
    #[error("invalid execution mode: {0}")]
    InvalidExecutionMode(String),

    /// En modo producción debe existir al menos un step de tipo Source.
    #[error("production mode requires at least one source step")]
    NoSourceConfigured,

    /// Bajo chunking, los sinks deben escribir en modo append: escrituras
    /// parciales repetidas no pueden pisarse entre sí.
    #[error("sink step '{0}' must use append write mode under chunked execution")]
    SinkMustAppend(String),

    /// Una fuente declara `chunk_size` pero no expone `row_count`.
    #[error("chunked source '{0}' exposes no row count")]
    MissingRowCount(String),

    /// `chunk_size` debe ser positivo para que el planner avance.
    #[error("chunk size for source '{0}' must be positive")]
    InvalidChunkSize(String),

    /// Parámetro requerido sin binding, sin valor en el índice y sin default.
    #[error("step '{step}' is missing required parameter '{param}'")]
    MissingParameter { step: String, param: String },

    /// La proyección pidió una clave que el contexto no tiene y el step no
    /// produce.
    #[error("context key '{0}' not found")]
    MissingContextKey(String),

    /// Filas con aridad distinta a las columnas de la tabla.
    #[error("table '{table}': row has {got} values, expected {expected}")]
    RowArityMismatch { table: String, got: usize, expected: usize },

    /// Columnas incompatibles al anexar tablas.
    #[error("incompatible columns when appending to table '{0}'")]
    ColumnMismatch(String),

    /// Un sink en modo `fail` encontró datos previos.
    #[error("sink '{0}' refuses to overwrite existing data")]
    SinkWouldOverwrite(String),

    /// El registro del cache referencia un snapshot ilegible o ausente.
    /// Sin el snapshot la reanudación es imposible: fatal.
    #[error("checkpoint for step '{0}' is missing or unreadable")]
    CheckpointUnreadable(String),

    /// Fallo de IO contra el backing store del cache.
    #[error("cache backing store: {0}")]
    CacheIo(String),

    /// `execute()` corre la secuencia una sola vez por instancia.
    #[error("pipeline already executed")]
    AlreadyExecuted,

    /// Fallo dentro de un step, gobernado por su política de error.
    #[error("step '{step}' failed: {message}")]
    StepFailed { step: String, message: String },

    #[error("internal: {0}")]
    Internal(String),
}

impl CoreError {
    /// Construye un `StepFailed` a partir de cualquier error mostrable.
    pub fn step_failed(step: &str, err: impl std::fmt::Display) -> Self {
        CoreError::StepFailed { step: step.to_string(),
                                message: err.to_string() }
    }
}
