//! Plano persistido del cache: registro de steps + snapshots comprimidos.
//!
//! Layout en disco (un directorio por pipeline):
//! - `manifest.json`: registro estructurado `step_key -> StepRecord`.
//! - `<step_key>.snap.zst`: snapshot zstd del `PipelineState` serializado.
//!
//! Toda escritura es write-then-rename para que un crash a mitad de camino
//! nunca deje un registro o snapshot truncado. Se asume un único escritor
//! por directorio y por run.

use std::fs;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use log::debug;
use serde::{Deserialize, Serialize};

use crate::constants::{MANIFEST_FILE, SNAPSHOT_EXT};
use crate::errors::CoreError;

/// Registro por step en el manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepRecord {
    pub fingerprint: String,
    pub completed: bool,
    /// Clave de contenido del snapshot (la misma que el plano KV en
    /// memoria), si hay snapshot persistido.
    pub snapshot_key: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct Manifest {
    steps: IndexMap<String, StepRecord>,
}

/// Backing store en disco del cache.
#[derive(Debug)]
pub struct SnapshotStore {
    dir: PathBuf,
    manifest: Manifest,
}

fn io_err(err: std::io::Error) -> CoreError {
    CoreError::CacheIo(err.to_string())
}

/// Nombre de archivo seguro a partir de una step key.
fn sanitize(step_key: &str) -> String {
    step_key.chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.' { c } else { '-' })
            .collect()
}

impl SnapshotStore {
    /// Abre (creando si no existe) el directorio y carga el manifest previo.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, CoreError> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(io_err)?;
        let manifest_path = dir.join(MANIFEST_FILE);
        let manifest = if manifest_path.exists() {
            let raw = fs::read(&manifest_path).map_err(io_err)?;
            serde_json::from_slice(&raw).map_err(|e| CoreError::CacheIo(e.to_string()))?
        } else {
            Manifest::default()
        };
        Ok(Self { dir, manifest })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn record(&self, step_key: &str) -> Option<&StepRecord> {
        self.manifest.steps.get(step_key)
    }

    /// Copia del registro completo, en orden de inserción.
    pub fn records_snapshot(&self) -> IndexMap<String, StepRecord> {
        self.manifest.steps.clone()
    }

    fn manifest_path(&self) -> PathBuf {
        self.dir.join(MANIFEST_FILE)
    }

    fn snapshot_path(&self, step_key: &str) -> PathBuf {
        self.dir.join(format!("{}.{}", sanitize(step_key), SNAPSHOT_EXT))
    }

    fn write_atomic(&self, path: &Path, bytes: &[u8]) -> Result<(), CoreError> {
        let tmp = path.with_extension("tmp");
        fs::write(&tmp, bytes).map_err(io_err)?;
        fs::rename(&tmp, path).map_err(io_err)
    }

    fn save_manifest(&self) -> Result<(), CoreError> {
        let raw = serde_json::to_vec_pretty(&self.manifest).map_err(|e| CoreError::CacheIo(e.to_string()))?;
        self.write_atomic(&self.manifest_path(), &raw)
    }

    /// Persiste snapshot + registro de un step completado.
    pub fn write_snapshot(&mut self,
                          step_key: &str,
                          fingerprint: &str,
                          snapshot_key: &str,
                          payload: &[u8])
                          -> Result<(), CoreError> {
        let compressed = zstd::encode_all(payload, 0).map_err(io_err)?;
        self.write_atomic(&self.snapshot_path(step_key), &compressed)?;
        self.manifest.steps.insert(step_key.to_string(),
                                   StepRecord { fingerprint: fingerprint.to_string(),
                                                completed: true,
                                                snapshot_key: Some(snapshot_key.to_string()) });
        self.save_manifest()?;
        debug!("checkpoint persisted for step {step_key} ({} bytes compressed)", compressed.len());
        Ok(())
    }

    /// Lee y descomprime el snapshot de un step. Ausente o corrupto = fatal.
    pub fn read_snapshot(&self, step_key: &str) -> Result<Vec<u8>, CoreError> {
        let path = self.snapshot_path(step_key);
        let compressed = fs::read(&path).map_err(|_| CoreError::CheckpointUnreadable(step_key.to_string()))?;
        zstd::decode_all(compressed.as_slice()).map_err(|_| CoreError::CheckpointUnreadable(step_key.to_string()))
    }

    /// Descarta registro y snapshot de las claves dadas.
    pub fn remove(&mut self, step_keys: &[String]) -> Result<(), CoreError> {
        let mut touched = false;
        for key in step_keys {
            if self.manifest.steps.shift_remove(key).is_some() {
                touched = true;
            }
            let path = self.snapshot_path(key);
            if path.exists() {
                fs::remove_file(&path).map_err(io_err)?;
                touched = true;
            }
        }
        if touched {
            self.save_manifest()?;
        }
        Ok(())
    }

    /// Borra todo el plano persistido (manifest + snapshots).
    pub fn delete_all(&mut self) -> Result<(), CoreError> {
        let keys: Vec<String> = self.manifest.steps.keys().cloned().collect();
        self.remove(&keys)?;
        self.manifest.steps.clear();
        let manifest_path = self.manifest_path();
        if manifest_path.exists() {
            fs::remove_file(&manifest_path).map_err(io_err)?;
        }
        Ok(())
    }
}
