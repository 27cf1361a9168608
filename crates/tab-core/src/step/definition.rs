use std::collections::HashMap;

use crate::model::ExecutionContext;

use super::params::ParameterDefinition;
use super::run_result::StepRunResult;

/// Tipo general del step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepKind {
    Source,
    Transform,
    Sink,
}

/// Política ante un fallo dentro del step.
///
/// `Raise` aborta el run completo de inmediato (sin rollback de steps
/// previos). `Ignore` registra el fallo, descarta la salida del step y
/// continúa con el estado exactamente como estaba antes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ErrorPolicy {
    #[default]
    Raise,
    Ignore,
}

/// Modo de existencia/escritura de un sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WriteMode {
    /// Escrituras parciales acumulan. Obligatorio bajo chunking.
    #[default]
    Append,
    /// Rechaza escribir si ya hay datos previos.
    Fail,
    /// Sobreescribe lo existente.
    Replace,
}

/// Trait que define un Step. Implementaciones deben ser puras respecto a
/// proyección + params: el executor es quien aplica efectos sobre el estado
/// global.
pub trait StepDefinition {
    /// Identificador declarado. La clave única dentro del pipeline se deriva
    /// de posición + id, así que ids repetidos en posiciones distintas son
    /// entidades distintas.
    fn id(&self) -> &str;

    /// Nombre opcional amigable.
    fn name(&self) -> &str {
        self.id()
    }

    fn kind(&self) -> StepKind;

    /// Claves de contexto que la proyección de entrada debe contener.
    fn input_keys(&self) -> &[String];

    /// Claves (tablas o escalares) que el merge-back acepta de este step.
    fn output_keys(&self) -> &[String];

    /// Parámetros declarados, con requeridos y defaults.
    fn parameters(&self) -> HashMap<String, ParameterDefinition> {
        HashMap::new()
    }

    fn error_policy(&self) -> ErrorPolicy {
        ErrorPolicy::Raise
    }

    /// Tamaño de chunk para fuentes particionables. `None` = fuente entera.
    fn chunk_size(&self) -> Option<usize> {
        None
    }

    /// Cantidad total de filas de la fuente. Requerido si declara
    /// `chunk_size`; el planner lo consume en la construcción.
    fn row_count(&self) -> Option<usize> {
        None
    }

    /// Sólo relevante para sinks.
    fn write_mode(&self) -> WriteMode {
        WriteMode::Append
    }

    /// Versión de contenido provista por el implementador. Entra al
    /// fingerprint del step: cambiarla invalida los checkpoints de este step
    /// en adelante.
    fn content_version(&self) -> &str {
        "1"
    }

    /// Ejecución pura del step sobre su proyección + params resueltos.
    fn run(&self, ctx: &ExecutionContext) -> StepRunResult;
}
