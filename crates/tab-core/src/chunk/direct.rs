//! Planner round-robin de rebanadas de tamaño fijo.
//!
//! Cada ciclo recorre las fuentes en orden estable y encola una rebanada
//! `chunk_size` (la última puede ser más corta). Fuentes agotadas siguen
//! recibiendo `Skip` hasta que la fuente más larga termine, así la longitud
//! de la cola es siempre múltiplo de la cantidad de fuentes.
//!
//! Ejemplo: X con 100 filas / chunk 50 (2 chunks) e Y con 60 filas / chunk
//! 20 (3 chunks) producen 3 pasadas; X queda ociosa en la tercera.

use indexmap::IndexMap;
use log::debug;

use crate::model::PipelineState;

use super::{ChunkCoordinate, Chunker, CoordinateQueue, SourceCursor};

pub struct DirectChunker {
    sources: Vec<SourceCursor>,
    queue: CoordinateQueue,
}

impl DirectChunker {
    pub fn new(sources: Vec<SourceCursor>) -> Self {
        let mut queue = CoordinateQueue::default();
        for s in &sources {
            queue.register(&s.step_key);
        }
        Self { sources, queue }
    }
}

impl Chunker for DirectChunker {
    fn calculate_chunks(&mut self) {
        let Self { sources, queue } = self;
        while sources.iter().any(|s| !s.finished) {
            for s in sources.iter_mut() {
                if s.finished {
                    queue.enqueue(&s.step_key, ChunkCoordinate::Skip);
                    continue;
                }
                let start = s.current_chunk * s.chunk_size;
                let stop = (start + s.chunk_size).min(s.total_rows);
                if stop == s.total_rows {
                    s.finished = true;
                }
                queue.enqueue(&s.step_key,
                              ChunkCoordinate::Slice { start,
                                                       rows: stop - start });
                s.current_chunk += 1;
            }
        }
        debug!("direct chunker planned {} coordinates over {} sources",
               self.queue.len(),
               self.sources.len());
    }

    fn has_more(&self) -> bool {
        self.queue.has_more()
    }

    fn next_pass(&mut self) -> Option<IndexMap<String, ChunkCoordinate>> {
        self.queue.dequeue_pass()
    }

    fn source_count(&self) -> usize {
        self.sources.len()
    }

    fn save(&mut self, state: PipelineState) {
        self.queue.save(state);
    }

    fn reload(&self) -> Option<PipelineState> {
        self.queue.reload()
    }
}
