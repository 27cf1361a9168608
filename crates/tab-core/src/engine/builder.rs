//! Builder para `Pipeline`.
//!
//! Acumula steps en orden, deriva claves únicas por posición, precalcula
//! fingerprints y arma el planner de chunks si se pidió. Los fallos de
//! configuración del planner (fuente chunked sin row_count, chunk_size
//! cero) se levantan acá, en el armado, no en runtime.

use indexmap::IndexMap;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::cache::PipelineCache;
use crate::chunk::{Chunker, DirectChunker, DistributedChunker, SourceCursor};
use crate::constants::ENGINE_VERSION;
use crate::errors::CoreError;
use crate::event::{EventStore, InMemoryEventStore};
use crate::hashing::hash_value;
use crate::model::Context;
use crate::step::{base_parameters, StepDefinition, StepKind, StepStatus};

use super::core::{ExecutionMode, Pipeline, StepSlot};

/// Algoritmo de particionado a usar cuando hay fuentes con `chunk_size`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkStrategy {
    /// Round-robin de rebanadas fijas, con padding `Skip`.
    Direct,
    /// Distribución balanceada sin pasadas ociosas.
    Distributed,
}

pub struct PipelineBuilder<E: EventStore = InMemoryEventStore> {
    event_store: E,
    steps: Vec<(Box<dyn StepDefinition>, Value)>,
    mode: ExecutionMode,
    cache: Option<Box<dyn PipelineCache>>,
    strategy: Option<ChunkStrategy>,
    parameter_index: IndexMap<String, Value>,
}

impl PipelineBuilder<InMemoryEventStore> {
    pub fn new() -> Self {
        Self::with_store(InMemoryEventStore::default())
    }
}

impl Default for PipelineBuilder<InMemoryEventStore> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: EventStore> PipelineBuilder<E> {
    /// Builder sobre un event store provisto.
    pub fn with_store(event_store: E) -> Self {
        Self { event_store,
               steps: Vec::new(),
               mode: ExecutionMode::default(),
               cache: None,
               strategy: None,
               parameter_index: IndexMap::new() }
    }

    pub fn add_step(mut self, step: impl StepDefinition + 'static) -> Self {
        self.steps.push((Box::new(step), json!({})));
        self
    }

    /// Agrega un step con parámetros ligados a esta instancia (prioridad
    /// máxima en la resolución).
    pub fn add_step_with_params(mut self, step: impl StepDefinition + 'static, bindings: Value) -> Self {
        self.steps.push((Box::new(step), bindings));
        self
    }

    pub fn with_mode(mut self, mode: ExecutionMode) -> Self {
        self.mode = mode;
        self
    }

    /// Valor inicial del índice de parámetros compartido.
    pub fn with_parameter(mut self, key: impl Into<String>, value: Value) -> Self {
        self.parameter_index.insert(key.into(), value);
        self
    }

    pub fn with_cache(mut self, cache: impl PipelineCache + 'static) -> Self {
        self.cache = Some(Box::new(cache));
        self
    }

    pub fn with_chunking(mut self, strategy: ChunkStrategy) -> Self {
        self.strategy = Some(strategy);
        self
    }

    pub fn build(self) -> Result<Pipeline<E>, CoreError> {
        let mut slots = Vec::with_capacity(self.steps.len());
        let mut keys = Vec::with_capacity(self.steps.len());

        for (index, (step, bindings)) in self.steps.into_iter().enumerate() {
            // La clave única se deriva de posición + id declarado: ids
            // repetidos en posiciones distintas son entidades distintas.
            let key = format!("{index:02}-{}", step.id());
            let base = base_parameters(&step.parameters(), &bindings);
            let fingerprint = hash_value(&json!({
                                             "engine_version": ENGINE_VERSION,
                                             "step_key": key,
                                             "content_version": step.content_version(),
                                             "params": base,
                                         }));
            keys.push(key.clone());
            slots.push(StepSlot { step,
                                  key,
                                  bindings,
                                  fingerprint,
                                  status: StepStatus::Pending });
        }

        let definition_hash = hash_value(&json!(keys));
        let chunker = match self.strategy {
            None => None,
            Some(strategy) => Some(build_chunker(strategy, &slots)?),
        };

        Ok(Pipeline { event_store: self.event_store,
                      run_id: Uuid::new_v4(),
                      definition_hash,
                      slots,
                      parameter_index: self.parameter_index,
                      context: Context::new(),
                      mode: self.mode,
                      cache: self.cache,
                      chunker,
                      executed: false })
    }
}

fn build_chunker(strategy: ChunkStrategy, slots: &[StepSlot]) -> Result<Box<dyn Chunker>, CoreError> {
    let mut cursors = Vec::new();
    for slot in slots {
        if slot.step.kind() != StepKind::Source {
            continue;
        }
        let Some(size) = slot.step.chunk_size() else {
            continue;
        };
        if size == 0 {
            return Err(CoreError::InvalidChunkSize(slot.key.clone()));
        }
        let rows = slot.step
                       .row_count()
                       .ok_or_else(|| CoreError::MissingRowCount(slot.key.clone()))?;
        cursors.push(SourceCursor::new(slot.key.clone(), size, rows));
    }
    Ok(match strategy {
        ChunkStrategy::Direct => Box::new(DirectChunker::new(cursors)),
        ChunkStrategy::Distributed => Box::new(DistributedChunker::new(cursors)),
    })
}
