//! Tipos de evento del pipeline y estructura `PipelineEvent`.
//!
//! Rol:
//! - Cada ejecución emite eventos a un `EventStore` append-only.
//! - El enum `PipelineEventKind` es el contrato observable del executor:
//!   fallos ignorados y sinks omitidos quedan registrados aquí en lugar de
//!   detener el run.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::CoreError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum PipelineEventKind {
    /// Primer evento de un `run_id`: fija la `definition_hash` y la cantidad
    /// de steps.
    PipelineInitialized { definition_hash: String, step_count: usize },

    /// Comienzo de una pasada de chunking (0-based).
    PassStarted { pass: usize },

    /// Un step comenzó su ejecución. No implica éxito.
    StepStarted { step_index: usize, step_key: String },

    /// Un step terminó correctamente.
    StepFinished {
        step_index: usize,
        step_key: String,
        fingerprint: String,
    },

    /// Un step falló bajo política `raise`. El run no continúa.
    StepFailed {
        step_index: usize,
        step_key: String,
        error: CoreError,
    },

    /// Un step fue omitido (p. ej. sink en modo desarrollo).
    StepSkipped {
        step_index: usize,
        step_key: String,
        reason: String,
    },

    /// Un fallo bajo política `ignore`: la salida del step se descartó y el
    /// run continuó.
    FaultIgnored {
        step_index: usize,
        step_key: String,
        error: CoreError,
    },

    /// Checkpoint persistido tras completar el step.
    CheckpointStored { step_key: String },

    /// Estado restaurado desde el checkpoint de un step previo.
    CheckpointRestored { step_key: String },

    /// Cierre del run con fingerprint agregado (hash de los fingerprints de
    /// steps exitosos en orden).
    PipelineCompleted { pipeline_fingerprint: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineEvent {
    pub seq: u64, // asignado por el EventStore (orden de append)
    pub run_id: Uuid,
    pub kind: PipelineEventKind,
    pub ts: DateTime<Utc>, // metadato, no entra en ningún fingerprint
}
