//! Definiciones relacionadas a Steps.
//!
//! Un Step es una unidad determinista que lee una proyección del contexto y
//! devuelve tablas y escalares para sus claves de salida declaradas. Este
//! módulo define:
//! - `StepDefinition`: interfaz neutral usada por el executor.
//! - `ParameterDefinition` y la resolución por prioridad de parámetros.
//! - `StepBuilder`/`FnStep`: construcción declarativa de steps a partir de
//!   un closure más metadata (reemplazo del registro por decoradores).
//! - `StepRunResult` / `StepOutput` / `StepStatus`.

pub mod builder;
pub mod definition;
pub mod params;
mod run_result;
mod status;

pub use builder::{FnStep, StepBuilder};
pub use definition::{ErrorPolicy, StepDefinition, StepKind, WriteMode};
pub use params::{base_parameters, merge_json, resolve_parameters, ParameterDefinition, ParameterType};
pub use run_result::{StepOutput, StepRunResult};
pub use status::StepStatus;
