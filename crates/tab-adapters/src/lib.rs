//! tab-adapters: steps concretos en memoria para ejercitar el motor.
//!
//! Los adapters reales (archivos, planillas, SQL) viven fuera del core y
//! sólo implementan el contrato de `StepDefinition`. Este crate provee las
//! piezas mínimas que los tests de integración y el binario demo necesitan:
//! una fuente respaldada por una tabla en memoria, transformaciones simples
//! y un sink con modos de escritura.

pub mod steps;

pub use steps::sink::{MemorySink, SinkHandle};
pub use steps::source::VecSource;
pub use steps::transform::{DecrementScalar, ProjectColumns, ScaleColumn};
