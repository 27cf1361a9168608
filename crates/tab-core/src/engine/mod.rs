//! Executor del pipeline.
//!
//! Provee el núcleo (`Pipeline`), el builder de armado y el modo de
//! ejecución. El executor es el único dueño del contexto global y del
//! índice de parámetros: los steps ven proyecciones y el merge-back pasa
//! siempre por acá.

pub mod builder;
pub mod core;

pub use builder::{ChunkStrategy, PipelineBuilder};
pub use core::{ExecutionMode, Pipeline, StepSlot};
