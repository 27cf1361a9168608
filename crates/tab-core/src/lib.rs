//! tab-core: motor secuencial de pipelines tabulares, reanudable y
//! particionable.
//!
//! La secuencia de steps es estrictamente lineal y corre en un solo hilo:
//! un step por vez, sin scheduling interno. La reanudación se apoya en
//! checkpoints direccionados por contenido (`cache`) y el particionado en
//! coordenadas de chunk por fuente (`chunk`).
pub mod cache;
pub mod chunk;
pub mod constants;
pub mod engine;
pub mod errors;
pub mod event;
pub mod hashing;
pub mod model;
pub mod step;

pub use cache::{LfuCache, PipelineCache, ResumePoint};
pub use chunk::{ChunkCoordinate, Chunker, DirectChunker, DistributedChunker, SourceCursor};
pub use engine::{ChunkStrategy, ExecutionMode, Pipeline, PipelineBuilder, StepSlot};
pub use errors::CoreError;
pub use event::{EventStore, InMemoryEventStore, PipelineEvent, PipelineEventKind};
pub use model::{Context, ExecutionContext, PipelineState, Table};
pub use step::{ErrorPolicy, FnStep, ParameterDefinition, ParameterType, StepBuilder, StepDefinition, StepKind,
               StepOutput, StepRunResult, StepStatus, WriteMode};
