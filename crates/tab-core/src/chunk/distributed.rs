//! Planner de distribución balanceada.
//!
//! En lugar de rebanadas de tamaño fijo, el total de pasadas es el producto
//! de los chunks de cada fuente y cada fuente reparte sus filas de manera
//! pareja entre todas las pasadas. Con fuentes de tamaños dispares esto
//! elimina pasadas ociosas: cada pasada consume algo de cada fuente (salvo
//! fuentes con menos filas que pasadas, que dejan de emitir al agotarse).
//!
//! Ejemplo: A con 12 filas / chunk 6 (2 chunks) y B con 6 filas / chunk 2
//! (3 chunks) dan `total = 6` pasadas, cada una con 2 filas de A y 1 de B.

use indexmap::IndexMap;
use log::debug;

use crate::model::PipelineState;

use super::{ChunkCoordinate, Chunker, CoordinateQueue, SourceCursor};

pub struct DistributedChunker {
    sources: Vec<SourceCursor>,
    queue: CoordinateQueue,
    total_chunks: usize,
}

impl DistributedChunker {
    pub fn new(sources: Vec<SourceCursor>) -> Self {
        let mut queue = CoordinateQueue::default();
        for s in &sources {
            queue.register(&s.step_key);
        }
        Self { sources,
               queue,
               total_chunks: 0 }
    }

    fn chunks_of(cursor: &SourceCursor) -> usize {
        // ceil(total_rows / chunk_size); chunk_size > 0 garantizado por la
        // validación del builder.
        (cursor.total_rows + cursor.chunk_size - 1) / cursor.chunk_size
    }
}

impl Chunker for DistributedChunker {
    fn calculate_chunks(&mut self) {
        let total: usize = if self.sources.is_empty() {
            0
        } else {
            self.sources.iter().map(Self::chunks_of).product()
        };
        self.total_chunks = total;
        if total == 0 {
            // Sin fuentes, o alguna fuente sin filas: nada que planificar.
            return;
        }

        let Self { sources, queue, .. } = self;
        for s in sources.iter_mut() {
            let base = s.total_rows / total;
            let remainder = s.total_rows % total;
            for p in 0..total {
                let start = p * base + p.min(remainder);
                let end = start + base + usize::from(p < remainder);
                if end == start {
                    // Menos filas que pasadas: la fuente deja de emitir.
                    break;
                }
                queue.enqueue(&s.step_key,
                              ChunkCoordinate::Slice { start,
                                                       rows: end - start });
                s.current_chunk += 1;
            }
            s.finished = true;
        }
        debug!("distributed chunker planned {} passes over {} sources",
               self.total_chunks,
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

#[cfg(test)]
mod tests {
    use super::*;

    fn passes(chunker: &mut DistributedChunker) -> Vec<IndexMap<String, ChunkCoordinate>> {
        chunker.calculate_chunks();
        let mut out = Vec::new();
        while let Some(p) = chunker.next_pass() {
            out.push(p);
        }
        out
    }

    #[test]
    fn balanced_distribution_without_idle_passes() {
        // El ejemplo del contrato: A 12/6 (2 chunks), B 6/2 (3 chunks).
        let mut chunker = DistributedChunker::new(vec![SourceCursor::new("a", 6, 12),
                                                       SourceCursor::new("b", 2, 6)]);
        let all = passes(&mut chunker);
        assert_eq!(all.len(), 6);

        let mut next_a = 0;
        let mut next_b = 0;
        for pass in &all {
            match pass["a"] {
                ChunkCoordinate::Slice { start, rows } => {
                    assert_eq!(start, next_a);
                    assert_eq!(rows, 2);
                    next_a += rows;
                }
                ChunkCoordinate::Skip => panic!("no pass should idle source a"),
            }
            match pass["b"] {
                ChunkCoordinate::Slice { start, rows } => {
                    assert_eq!(start, next_b);
                    assert_eq!(rows, 1);
                    next_b += rows;
                }
                ChunkCoordinate::Skip => panic!("no pass should idle source b"),
            }
        }
        assert_eq!(next_a, 12);
        assert_eq!(next_b, 6);
    }

    #[test]
    fn remainder_rows_go_to_early_passes() {
        // 7 filas repartidas en 3 pasadas: 3, 2, 2.
        let mut chunker = DistributedChunker::new(vec![SourceCursor::new("a", 3, 7)]);
        let all = passes(&mut chunker);
        assert_eq!(all.len(), 3);
        assert_eq!(all[0]["a"], ChunkCoordinate::Slice { start: 0, rows: 3 });
        assert_eq!(all[1]["a"], ChunkCoordinate::Slice { start: 3, rows: 2 });
        assert_eq!(all[2]["a"], ChunkCoordinate::Slice { start: 5, rows: 2 });
    }

    #[test]
    fn source_smaller_than_pass_count_stops_emitting() {
        // A 10/5 (2 chunks) y B 3/1 (3 chunks): total 6 pasadas, B sólo
        // tiene filas para 3 de ellas.
        let mut chunker = DistributedChunker::new(vec![SourceCursor::new("a", 5, 10),
                                                       SourceCursor::new("b", 1, 3)]);
        let all = passes(&mut chunker);
        assert_eq!(all.len(), 6);

        let b_live = all.iter().filter(|p| !p["b"].is_skip()).count();
        assert_eq!(b_live, 3);
        // Las primeras pasadas consumen B; las finales la ven como Skip.
        assert!(all[5]["b"].is_skip());

        let a_total: usize = all.iter()
                                .filter_map(|p| match p["a"] {
                                    ChunkCoordinate::Slice { rows, .. } => Some(rows),
                                    ChunkCoordinate::Skip => None,
                                })
                                .sum();
        assert_eq!(a_total, 10);
    }

    #[test]
    fn empty_source_plans_nothing() {
        let mut chunker = DistributedChunker::new(vec![SourceCursor::new("a", 5, 0)]);
        chunker.calculate_chunks();
        assert!(!chunker.has_more());
    }
}
