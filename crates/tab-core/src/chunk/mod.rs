//! Planificación de chunks por coordenadas.
//!
//! Un pipeline con fuentes de tamaños distintos se re-ejecuta completo una
//! vez por pasada; en cada pasada cada fuente recibe una coordenada
//! `(start, rows)` o el centinela `Skip` ("esta fuente no aporta nada en
//! esta pasada"). Este módulo define la maquinaria compartida (cursores por
//! fuente, colas FIFO de coordenadas, snapshot de estado entre pasadas) y
//! dos algoritmos concretos en `direct` y `distributed`.

pub mod direct;
pub mod distributed;

use std::collections::VecDeque;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::model::PipelineState;

pub use direct::DirectChunker;
pub use distributed::DistributedChunker;

/// Rebanada de filas de una fuente para una pasada, o el centinela de
/// omisión (el `(None, None)` del contrato original).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChunkCoordinate {
    Slice { start: usize, rows: usize },
    Skip,
}

impl ChunkCoordinate {
    pub fn is_skip(&self) -> bool {
        matches!(self, ChunkCoordinate::Skip)
    }
}

/// Contadores por fuente, propiedad exclusiva del planner (los steps no los
/// ven). `total_rows` se captura una sola vez en la construcción.
#[derive(Debug, Clone)]
pub struct SourceCursor {
    pub step_key: String,
    pub chunk_size: usize,
    pub total_rows: usize,
    pub current_chunk: usize,
    pub finished: bool,
}

impl SourceCursor {
    pub fn new(step_key: impl Into<String>, chunk_size: usize, total_rows: usize) -> Self {
        Self { step_key: step_key.into(),
               chunk_size,
               total_rows,
               current_chunk: 0,
               finished: false }
    }
}

/// Colas FIFO de coordenadas, una por fuente, en orden estable de registro.
#[derive(Debug, Default)]
pub struct CoordinateQueue {
    queues: IndexMap<String, VecDeque<ChunkCoordinate>>,
    saved: Option<PipelineState>,
}

impl CoordinateQueue {
    pub fn register(&mut self, step_key: &str) {
        self.queues.entry(step_key.to_string()).or_default();
    }

    pub fn enqueue(&mut self, step_key: &str, coord: ChunkCoordinate) {
        self.queues.entry(step_key.to_string()).or_default().push_back(coord);
    }

    pub fn has_more(&self) -> bool {
        self.queues.values().any(|q| !q.is_empty())
    }

    /// Cantidad total de coordenadas encoladas (todas las fuentes).
    pub fn len(&self) -> usize {
        self.queues.values().map(VecDeque::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        !self.has_more()
    }

    /// Desencola una coordenada por fuente. Fuentes cuya cola se agotó antes
    /// que las demás reciben `Skip` (pueden haber emitido menos entradas,
    /// como en el planner distribuido con menos filas que pasadas).
    pub fn dequeue_pass(&mut self) -> Option<IndexMap<String, ChunkCoordinate>> {
        if !self.has_more() {
            return None;
        }
        let mut pass = IndexMap::new();
        for (key, queue) in self.queues.iter_mut() {
            pass.insert(key.clone(), queue.pop_front().unwrap_or(ChunkCoordinate::Skip));
        }
        Some(pass)
    }

    pub fn save(&mut self, state: PipelineState) {
        self.saved = Some(state);
    }

    pub fn reload(&self) -> Option<PipelineState> {
        self.saved.clone()
    }
}

/// Contrato de un planificador de chunks.
///
/// `save`/`reload` snapshotean estado externo al planner (parameter_index +
/// contexto global) para que cada pasada arranque de la misma base sin
/// depender del cache.
pub trait Chunker {
    /// Calcula y encola todas las coordenadas. Idempotencia no requerida:
    /// se invoca una única vez por ejecución.
    fn calculate_chunks(&mut self);

    /// Quedan coordenadas por consumir.
    fn has_more(&self) -> bool;

    /// Coordenadas de la próxima pasada, una por fuente registrada.
    fn next_pass(&mut self) -> Option<IndexMap<String, ChunkCoordinate>>;

    /// Cantidad de fuentes bajo chunking.
    fn source_count(&self) -> usize;

    fn save(&mut self, state: PipelineState);

    fn reload(&self) -> Option<PipelineState>;
}
