//! Dataset tabular mínimo en memoria.
//!
//! Representación row-major: un vector de nombres de columna y filas de
//! `serde_json::Value`. Suficiente para que el executor, el cache y el chunk
//! planner operen sin atarse a ningún formato de IO concreto; los adapters
//! convierten desde/hacia sus fuentes reales.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::CoreError;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
}

impl Table {
    /// Tabla vacía sin columnas. Sirve como placeholder de proyección para
    /// claves que un step declara como salida pero aún no existen.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Tabla con columnas declaradas y sin filas.
    pub fn new<S: Into<String>>(columns: Vec<S>) -> Self {
        Self { columns: columns.into_iter().map(Into::into).collect(),
               rows: Vec::new() }
    }

    /// Construye una tabla validando la aridad de cada fila.
    pub fn with_rows<S: Into<String>>(columns: Vec<S>, rows: Vec<Vec<Value>>) -> Result<Self, CoreError> {
        let mut table = Self::new(columns);
        for row in rows {
            table.push_row(row)?;
        }
        Ok(table)
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Valores de una columna, en orden de fila.
    pub fn column(&self, name: &str) -> Option<Vec<&Value>> {
        let idx = self.column_index(name)?;
        Some(self.rows.iter().map(|r| &r[idx]).collect())
    }

    pub fn push_row(&mut self, row: Vec<Value>) -> Result<(), CoreError> {
        if row.len() != self.columns.len() {
            return Err(CoreError::RowArityMismatch { table: self.columns.join(","),
                                                     got: row.len(),
                                                     expected: self.columns.len() });
        }
        self.rows.push(row);
        Ok(())
    }

    /// Ventana de filas `[start, start + rows)`, recortada al final de la
    /// tabla. Las coordenadas de chunk se materializan con esto.
    pub fn slice(&self, start: usize, rows: usize) -> Table {
        let start = start.min(self.rows.len());
        let stop = start.saturating_add(rows).min(self.rows.len());
        Table { columns: self.columns.clone(),
                rows: self.rows[start..stop].to_vec() }
    }

    /// Anexa las filas de `other`. Una tabla sin columnas adopta el esquema
    /// del lado derecho; en cualquier otro caso las columnas deben coincidir.
    pub fn append(&mut self, other: &Table) -> Result<(), CoreError> {
        if self.columns.is_empty() && self.rows.is_empty() {
            self.columns = other.columns.clone();
        } else if self.columns != other.columns {
            return Err(CoreError::ColumnMismatch(self.columns.join(",")));
        }
        self.rows.extend(other.rows.iter().cloned());
        Ok(())
    }
}
