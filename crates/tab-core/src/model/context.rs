//! Contexto compartido del pipeline y su proyección.
//!
//! El `Context` es el único estado mutable global: tablas y escalares con
//! nombre, más metadata ambiental. Los steps nunca lo ven entero: reciben
//! una proyección restringida a sus claves declaradas y sólo el executor
//! aplica el merge de vuelta. Mapas con orden de inserción (`IndexMap`) para
//! que hashing y eventos sean deterministas.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::chunk::ChunkCoordinate;
use crate::errors::CoreError;
use crate::model::Table;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Context {
    tables: IndexMap<String, Table>,
    scalars: IndexMap<String, Value>,
    metadata: IndexMap<String, Value>,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_table(&mut self, key: impl Into<String>, table: Table) {
        self.tables.insert(key.into(), table);
    }

    pub fn table(&self, key: &str) -> Option<&Table> {
        self.tables.get(key)
    }

    pub fn insert_scalar(&mut self, key: impl Into<String>, value: Value) {
        self.scalars.insert(key.into(), value);
    }

    pub fn scalar(&self, key: &str) -> Option<&Value> {
        self.scalars.get(key)
    }

    pub fn insert_metadata(&mut self, key: impl Into<String>, value: Value) {
        self.metadata.insert(key.into(), value);
    }

    pub fn metadata(&self, key: &str) -> Option<&Value> {
        self.metadata.get(key)
    }

    /// Nombres de tabla presentes, en orden de inserción.
    pub fn keys(&self) -> Vec<&str> {
        self.tables.keys().map(String::as_str).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty() && self.scalars.is_empty()
    }

    /// Sub-contexto con únicamente las claves pedidas.
    ///
    /// Una clave ausente es fallo de configuración, salvo que el step la
    /// declare como salida (`produced`): entonces se entrega un placeholder
    /// vacío para que el step pueda extenderla. La metadata viaja entera.
    pub fn project(&self, keys: &[String], produced: &[String]) -> Result<Context, CoreError> {
        let mut sub = Context::new();
        for key in keys {
            if let Some(table) = self.tables.get(key) {
                sub.tables.insert(key.clone(), table.clone());
            } else if let Some(value) = self.scalars.get(key) {
                sub.scalars.insert(key.clone(), value.clone());
            } else if produced.contains(key) {
                sub.tables.insert(key.clone(), Table::empty());
            } else {
                return Err(CoreError::MissingContextKey(key.clone()));
            }
        }
        sub.metadata = self.metadata.clone();
        Ok(sub)
    }

    /// Aplica un sub-contexto: claves coincidentes se sobreescriben, claves
    /// nuevas se agregan. Nunca borra claves ausentes en `sub`.
    pub fn merge(&mut self, sub: Context) {
        for (k, t) in sub.tables {
            self.tables.insert(k, t);
        }
        for (k, v) in sub.scalars {
            self.scalars.insert(k, v);
        }
        for (k, v) in sub.metadata {
            self.metadata.insert(k, v);
        }
    }

    /// Descarta toda clave (tabla o escalar) fuera de `allowed`. El executor
    /// filtra así la salida de un step antes del merge, evitando fugas de
    /// claves no declaradas.
    pub fn retain_keys(&mut self, allowed: &[String]) {
        self.tables.retain(|k, _| allowed.contains(k));
        self.scalars.retain(|k, _| allowed.contains(k));
    }
}

/// Snapshot serializable de `(parameter_index, contexto global)`.
///
/// Es la unidad que el cache persiste por step completado y la que el chunk
/// planner guarda/recarga entre pasadas.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PipelineState {
    pub parameter_index: IndexMap<String, Value>,
    pub context: Context,
}

/// Contexto de ejecución entregado a `StepDefinition::run`.
pub struct ExecutionContext {
    /// Proyección del contexto global (vacía para un source puro).
    pub context: Context,
    /// Parámetros ya resueltos (bindings > índice > defaults), objeto JSON.
    pub params: Value,
    /// Coordenada de chunk para esta pasada, si hay planner activo.
    pub chunk: Option<ChunkCoordinate>,
}

impl ExecutionContext {
    /// Acceso cómodo a un parámetro resuelto.
    pub fn param(&self, name: &str) -> Option<&Value> {
        self.params.get(name)
    }
}
