//! Implementación concreta del cache: LFU acotado + persistencia opcional.
//!
//! Política de desalojo: cada clave lleva un contador de frecuencia que se
//! incrementa en cada `get` y en el `put` inicial. Al insertar por encima de
//! la capacidad se desaloja la clave de menor frecuencia; dentro de esa
//! clase de frecuencia, la más antigua (orden de entrada al bucket).

use std::collections::{BTreeMap, HashMap};

use indexmap::{IndexMap, IndexSet};
use log::{debug, info, warn};

use crate::errors::CoreError;
use crate::hashing::hash_value;
use crate::model::PipelineState;

use super::snapshot::{SnapshotStore, StepRecord};
use super::{PipelineCache, ResumePoint};

pub struct LfuCache {
    capacity: usize,
    entries: HashMap<String, PipelineState>,
    frequency: HashMap<String, u64>,
    /// Buckets por frecuencia; `IndexSet` conserva el orden de entrada, que
    /// es el criterio de desempate para el desalojo.
    buckets: BTreeMap<u64, IndexSet<String>>,
    /// Registro en memoria (espejo del manifest cuando hay disco).
    records: IndexMap<String, StepRecord>,
    disk: Option<SnapshotStore>,
}

impl LfuCache {
    /// Cache sólo en memoria.
    pub fn new(capacity: usize) -> Self {
        Self { capacity: capacity.max(1),
               entries: HashMap::new(),
               frequency: HashMap::new(),
               buckets: BTreeMap::new(),
               records: IndexMap::new(),
               disk: None }
    }

    /// Cache con backing store en disco. Los registros previos del manifest
    /// se levantan acá, habilitando la detección de reanudación entre runs.
    pub fn with_store(capacity: usize, dir: impl Into<std::path::PathBuf>) -> Result<Self, CoreError> {
        let disk = SnapshotStore::open(dir)?;
        debug!("checkpoint backing store at {} ({} prior record(s))",
               disk.dir().display(),
               disk.records_snapshot().len());
        let mut cache = Self::new(capacity);
        cache.records = disk.records_snapshot();
        cache.disk = Some(disk);
        Ok(cache)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Frecuencia actual de una clave (para inspección y tests).
    pub fn frequency(&self, key: &str) -> Option<u64> {
        self.frequency.get(key).copied()
    }

    fn touch(&mut self, key: &str) {
        let freq = self.frequency.get(key).copied().unwrap_or(0);
        if let Some(bucket) = self.buckets.get_mut(&freq) {
            bucket.shift_remove(key);
            if bucket.is_empty() {
                self.buckets.remove(&freq);
            }
        }
        let next = freq + 1;
        self.frequency.insert(key.to_string(), next);
        self.buckets.entry(next).or_default().insert(key.to_string());
    }

    fn evict_one(&mut self) {
        // Bucket de menor frecuencia; dentro de él, la entrada más antigua.
        let Some((&freq, bucket)) = self.buckets.iter_mut().next() else {
            return;
        };
        let Some(victim) = bucket.shift_remove_index(0) else {
            return;
        };
        if bucket.is_empty() {
            self.buckets.remove(&freq);
        }
        self.entries.remove(&victim);
        self.frequency.remove(&victim);
        debug!("lfu evicted snapshot {victim} (frequency {freq})");
    }

    fn insert(&mut self, key: String, state: PipelineState) {
        if self.entries.contains_key(&key) {
            // Re-put de una clave viva: cuenta como acceso.
            self.entries.insert(key.clone(), state);
            self.touch(&key);
            return;
        }
        if self.entries.len() >= self.capacity {
            self.evict_one();
        }
        self.entries.insert(key.clone(), state);
        self.touch(&key);
    }
}

impl PipelineCache for LfuCache {
    fn put(&mut self, state: &PipelineState) -> Result<String, CoreError> {
        let value = serde_json::to_value(state).map_err(|e| CoreError::Internal(e.to_string()))?;
        let key = hash_value(&value);
        self.insert(key.clone(), state.clone());
        Ok(key)
    }

    fn get(&mut self, key: &str) -> Option<PipelineState> {
        if !self.entries.contains_key(key) {
            return None;
        }
        self.touch(key);
        self.entries.get(key).cloned()
    }

    fn store(&mut self, step_key: &str, fingerprint: &str, state: &PipelineState) -> Result<(), CoreError> {
        let value = serde_json::to_value(state).map_err(|e| CoreError::Internal(e.to_string()))?;
        let snapshot_key = hash_value(&value);
        self.insert(snapshot_key.clone(), state.clone());

        if let Some(disk) = self.disk.as_mut() {
            let payload = serde_json::to_vec(&value).map_err(|e| CoreError::Internal(e.to_string()))?;
            disk.write_snapshot(step_key, fingerprint, &snapshot_key, &payload)?;
        }
        self.records.insert(step_key.to_string(),
                            StepRecord { fingerprint: fingerprint.to_string(),
                                         completed: true,
                                         snapshot_key: Some(snapshot_key) });
        Ok(())
    }

    fn load(&mut self, step_key: &str) -> Result<PipelineState, CoreError> {
        let record = self.records
                         .get(step_key)
                         .cloned()
                         .ok_or_else(|| CoreError::CheckpointUnreadable(step_key.to_string()))?;

        // Plano KV primero: el snapshot puede seguir caliente en memoria.
        if let Some(snapshot_key) = &record.snapshot_key {
            if let Some(state) = self.get(snapshot_key) {
                debug!("checkpoint for {step_key} served from memory");
                return Ok(state);
            }
        }

        let disk = self.disk
                       .as_ref()
                       .ok_or_else(|| CoreError::CheckpointUnreadable(step_key.to_string()))?;
        let payload = disk.read_snapshot(step_key)?;
        let state: PipelineState =
            serde_json::from_slice(&payload).map_err(|_| CoreError::CheckpointUnreadable(step_key.to_string()))?;
        // Reinstalar en memoria para accesos siguientes.
        self.put(&state)?;
        info!("checkpoint for {step_key} restored from backing store");
        Ok(state)
    }

    fn resume_point(&self, steps: &[(String, String)]) -> Option<ResumePoint> {
        let mut last: Option<ResumePoint> = None;
        for (index, (step_key, fingerprint)) in steps.iter().enumerate() {
            match self.records.get(step_key) {
                Some(rec) if rec.completed && rec.fingerprint == *fingerprint => {
                    last = Some(ResumePoint { step_index: index,
                                              step_key: step_key.clone() });
                }
                Some(rec) if rec.completed => {
                    // Mismatch de fingerprint: frontera de reanudación, no
                    // error. Todo desde acá se re-ejecuta.
                    debug!("fingerprint mismatch at {step_key}: cached {} vs current {fingerprint}",
                           rec.fingerprint);
                    break;
                }
                _ => break,
            }
        }
        last
    }

    fn invalidate(&mut self, step_keys: &[String]) -> Result<(), CoreError> {
        if step_keys.is_empty() {
            return Ok(());
        }
        for key in step_keys {
            self.records.shift_remove(key);
        }
        if let Some(disk) = self.disk.as_mut() {
            disk.remove(step_keys)?;
        }
        warn!("invalidated {} checkpoint(s): {}", step_keys.len(), step_keys.join(", "));
        Ok(())
    }

    fn reset(&mut self, delete_backing_store: bool) -> Result<(), CoreError> {
        self.entries.clear();
        self.frequency.clear();
        self.buckets.clear();
        self.records.clear();
        if delete_backing_store {
            if let Some(disk) = self.disk.as_mut() {
                disk.delete_all()?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn state(tag: u64) -> PipelineState {
        let mut s = PipelineState::default();
        s.parameter_index.insert("tag".into(), json!(tag));
        s
    }

    #[test]
    fn put_then_get_round_trips() {
        let mut cache = LfuCache::new(4);
        let s = state(1);
        let key = cache.put(&s).unwrap();
        assert_eq!(cache.get(&key), Some(s));
    }

    #[test]
    fn put_is_content_addressed() {
        let mut cache = LfuCache::new(4);
        let k1 = cache.put(&state(1)).unwrap();
        let k2 = cache.put(&state(1)).unwrap();
        let k3 = cache.put(&state(2)).unwrap();
        assert_eq!(k1, k2);
        assert_ne!(k1, k3);
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn eviction_prefers_lowest_frequency_oldest_entry() {
        // La propiedad del contrato: capacidad 3, acceso extra al primero,
        // la cuarta inserción desaloja al segundo (freq mínima, más viejo).
        let mut cache = LfuCache::new(3);
        let k0 = cache.put(&state(0)).unwrap();
        let k1 = cache.put(&state(1)).unwrap();
        let k2 = cache.put(&state(2)).unwrap();

        assert!(cache.get(&k0).is_some()); // k0 sube a frecuencia 2

        let k3 = cache.put(&state(3)).unwrap();
        assert!(cache.get(&k1).is_none(), "oldest frequency-1 entry must be evicted");
        assert!(cache.get(&k0).is_some());
        assert!(cache.get(&k2).is_some());
        assert!(cache.get(&k3).is_some());
    }

    #[test]
    fn get_counts_as_access() {
        let mut cache = LfuCache::new(2);
        let k = cache.put(&state(7)).unwrap();
        assert_eq!(cache.frequency(&k), Some(1));
        cache.get(&k);
        cache.get(&k);
        assert_eq!(cache.frequency(&k), Some(3));
    }

    #[test]
    fn store_without_disk_keeps_record_in_memory() {
        let mut cache = LfuCache::new(4);
        cache.store("00-a", "fp-a", &state(1)).unwrap();
        let loaded = cache.load("00-a").unwrap();
        assert_eq!(loaded, state(1));
    }

    #[test]
    fn load_unknown_step_is_fatal() {
        let mut cache = LfuCache::new(4);
        assert!(matches!(cache.load("00-nope"), Err(CoreError::CheckpointUnreadable(_))));
    }

    #[test]
    fn resume_point_stops_at_first_mismatch() {
        let mut cache = LfuCache::new(8);
        cache.store("00-a", "fp-a", &state(0)).unwrap();
        cache.store("01-b", "fp-b", &state(1)).unwrap();
        cache.store("02-c", "fp-c", &state(2)).unwrap();

        let steps = vec![("00-a".to_string(), "fp-a".to_string()),
                         ("01-b".to_string(), "CHANGED".to_string()),
                         ("02-c".to_string(), "fp-c".to_string())];
        let rp = cache.resume_point(&steps).unwrap();
        assert_eq!(rp, ResumePoint { step_index: 0, step_key: "00-a".into() });
    }

    #[test]
    fn resume_point_none_when_first_step_mismatches() {
        let mut cache = LfuCache::new(8);
        cache.store("00-a", "fp-a", &state(0)).unwrap();
        let steps = vec![("00-a".to_string(), "OTHER".to_string())];
        assert!(cache.resume_point(&steps).is_none());
    }

    #[test]
    fn invalidate_discards_records() {
        let mut cache = LfuCache::new(8);
        cache.store("00-a", "fp-a", &state(0)).unwrap();
        cache.store("01-b", "fp-b", &state(1)).unwrap();
        cache.invalidate(&["01-b".to_string()]).unwrap();

        let steps = vec![("00-a".to_string(), "fp-a".to_string()),
                         ("01-b".to_string(), "fp-b".to_string())];
        let rp = cache.resume_point(&steps).unwrap();
        assert_eq!(rp.step_index, 0);
    }

    #[test]
    fn reset_clears_everything() {
        let mut cache = LfuCache::new(8);
        let k = cache.put(&state(1)).unwrap();
        cache.store("00-a", "fp", &state(2)).unwrap();
        cache.reset(false).unwrap();
        assert!(cache.is_empty());
        assert!(cache.get(&k).is_none());
        assert!(cache.load("00-a").is_err());
    }
}
