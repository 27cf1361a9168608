//! Cache de checkpoints del pipeline.
//!
//! Dos planos complementarios:
//! - un KV direccionado por contenido con desalojo LFU (`put`/`get`), que
//!   mantiene en memoria los snapshots calientes;
//! - un plano de persistencia por step (`store`/`load`): un registro
//!   estructurado `step_key -> (fingerprint, completed)` más un archivo de
//!   snapshot comprimido por step completado.
//!
//! El punto de reanudación se decide contra el registro: el primer step cuyo
//! fingerprint no coincide (o que nunca completó) marca la frontera; todo lo
//! anterior se salta cargando el último checkpoint válido. Un mismatch no es
//! error: es la señal para descartar los checkpoints desde ahí en adelante.

pub mod lfu;
pub mod snapshot;

pub use lfu::LfuCache;
pub use snapshot::{SnapshotStore, StepRecord};

use crate::errors::CoreError;
use crate::model::PipelineState;

/// Frontera de reanudación detectada: índice y clave del último step cuyo
/// checkpoint sigue siendo válido.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResumePoint {
    pub step_index: usize,
    pub step_key: String,
}

/// Contrato del cache de pipeline.
pub trait PipelineCache {
    /// Guarda un snapshot en el plano KV y devuelve su clave de contenido.
    fn put(&mut self, state: &PipelineState) -> Result<String, CoreError>;

    /// Recupera por clave de contenido; cuenta como acceso para el LFU.
    fn get(&mut self, key: &str) -> Option<PipelineState>;

    /// Registra el step como completado con su fingerprint y persiste el
    /// snapshot de `(parameter_index, contexto)` bajo su clave.
    fn store(&mut self, step_key: &str, fingerprint: &str, state: &PipelineState) -> Result<(), CoreError>;

    /// Carga el checkpoint de un step completado. Que el registro lo
    /// referencie y el snapshot no sea legible es fatal.
    fn load(&mut self, step_key: &str) -> Result<PipelineState, CoreError>;

    /// Recorre `(step_key, fingerprint)` en orden de secuencia y devuelve la
    /// frontera de reanudación, si existe.
    fn resume_point(&self, steps: &[(String, String)]) -> Option<ResumePoint>;

    /// Descarta los checkpoints de las claves dadas (registro + snapshots).
    fn invalidate(&mut self, step_keys: &[String]) -> Result<(), CoreError>;

    /// Vacía el cache; con `delete_backing_store` borra también el plano
    /// persistido.
    fn reset(&mut self, delete_backing_store: bool) -> Result<(), CoreError>;
}
