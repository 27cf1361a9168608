//! Modelos neutrales (Table, Context, PipelineState, ExecutionContext).

pub mod context;
pub mod table;

pub use context::{Context, ExecutionContext, PipelineState};
pub use table::Table;
