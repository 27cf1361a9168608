//! Core Pipeline implementation
//!
//! Motor secuencial de ejecución de steps. Responsable de resolver
//! parámetros, proyectar el contexto, aplicar merge-back, gobernar la
//! política de errores por step y coordinar cache (checkpoints/reanudación)
//! y chunk planner (pasadas por coordenadas).

use std::str::FromStr;

use indexmap::IndexMap;
use log::{debug, info, warn};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::cache::PipelineCache;
use crate::chunk::{ChunkCoordinate, Chunker};
use crate::constants::ENGINE_VERSION;
use crate::errors::CoreError;
use crate::event::{EventStore, InMemoryEventStore, PipelineEvent, PipelineEventKind};
use crate::hashing::hash_value;
use crate::model::{Context, ExecutionContext, PipelineState};
use crate::step::{resolve_parameters, ErrorPolicy, StepDefinition, StepKind, StepRunResult, StepStatus, WriteMode};

/// Modo de ejecución del pipeline.
///
/// `Development` omite todo step de tipo Sink: el resto de la secuencia
/// corre para inspección sin efectos externos. `Production` exige al menos
/// una fuente configurada y ejecuta todo incondicionalmente.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExecutionMode {
    Development,
    #[default]
    Production,
}

impl FromStr for ExecutionMode {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "development" | "dev" => Ok(ExecutionMode::Development),
            "production" | "prod" => Ok(ExecutionMode::Production),
            other => Err(CoreError::InvalidExecutionMode(other.to_string())),
        }
    }
}

impl std::fmt::Display for ExecutionMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExecutionMode::Development => write!(f, "development"),
            ExecutionMode::Production => write!(f, "production"),
        }
    }
}

/// Un step ya armado dentro de la secuencia: descriptor + clave única
/// derivada de posición, bindings de instancia y fingerprint precalculado.
pub struct StepSlot {
    pub step: Box<dyn StepDefinition>,
    pub key: String,
    pub bindings: Value,
    pub fingerprint: String,
    pub status: StepStatus,
}

/// Motor de ejecución secuencial.
pub struct Pipeline<E: EventStore = InMemoryEventStore> {
    pub(crate) event_store: E,
    pub(crate) run_id: Uuid,
    pub(crate) definition_hash: String,
    pub(crate) slots: Vec<StepSlot>,
    pub(crate) parameter_index: IndexMap<String, Value>,
    pub(crate) context: Context,
    pub(crate) mode: ExecutionMode,
    pub(crate) cache: Option<Box<dyn PipelineCache>>,
    pub(crate) chunker: Option<Box<dyn Chunker>>,
    pub(crate) executed: bool,
}

impl<E: EventStore> std::fmt::Debug for Pipeline<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("run_id", &self.run_id)
            .field("definition_hash", &self.definition_hash)
            .field("mode", &self.mode)
            .field("step_count", &self.slots.len())
            .field("executed", &self.executed)
            .finish()
    }
}

impl Pipeline<InMemoryEventStore> {
    /// Builder con event store en memoria.
    pub fn builder() -> crate::engine::PipelineBuilder<InMemoryEventStore> {
        crate::engine::PipelineBuilder::new()
    }
}

impl<E: EventStore> Pipeline<E> {
    /// Ejecuta la secuencia completa: una vez por coordenada del planner, o
    /// una única vez si no hay chunking configurado.
    pub fn execute(&mut self) -> Result<(), CoreError> {
        if self.executed {
            return Err(CoreError::AlreadyExecuted);
        }
        self.executed = true;

        self.validate()?;
        self.event_store.append_kind(self.run_id,
                                     PipelineEventKind::PipelineInitialized { definition_hash:
                                                                                  self.definition_hash.clone(),
                                                                              step_count: self.slots.len() });

        if let Some(mut chunker) = self.chunker.take() {
            // Bajo chunking no se consulta la frontera de reanudación: los
            // checkpoints se sobreescriben pasada a pasada y no capturan los
            // efectos acumulados de los sinks, así que cada run ejecuta
            // todas las pasadas. Los checkpoints igual se persisten.
            debug!("chunked execution: resume detection skipped");
            chunker.calculate_chunks();
            let result = self.run_chunked(chunker.as_mut(), 0);
            self.chunker = Some(chunker);
            result?;
        } else {
            let start_index = self.try_resume()?;
            self.run_sequence(start_index, None)?;
        }

        self.complete();
        Ok(())
    }

    /// Validación previa al run: fallos de configuración se levantan antes
    /// de ejecutar ningún step.
    fn validate(&self) -> Result<(), CoreError> {
        if self.mode == ExecutionMode::Production
           && !self.slots.iter().any(|s| s.step.kind() == StepKind::Source)
        {
            return Err(CoreError::NoSourceConfigured);
        }

        if self.chunker.is_some() {
            for slot in &self.slots {
                if slot.step.kind() == StepKind::Sink && slot.step.write_mode() != WriteMode::Append {
                    return Err(CoreError::SinkMustAppend(slot.key.clone()));
                }
            }
        }

        // Pre-flight de parámetros: cada requerido debe resolverse desde
        // binding, índice inicial, default, o un escalar que un step previo
        // declare como salida.
        let mut available: Vec<String> = self.parameter_index.keys().cloned().collect();
        for slot in &self.slots {
            for (name, def) in slot.step.parameters() {
                let satisfied = slot.bindings.get(&name).is_some()
                                || available.contains(&name)
                                || def.default_value.is_some();
                if def.required && !satisfied {
                    return Err(CoreError::MissingParameter { step: slot.key.clone(),
                                                             param: name });
                }
            }
            for out in slot.step.output_keys() {
                if !available.contains(out) {
                    available.push(out.clone());
                }
            }
        }
        Ok(())
    }

    /// Detección de reanudación contra el cache. Devuelve el índice desde el
    /// cual ejecutar (0 si no hay nada reutilizable).
    fn try_resume(&mut self) -> Result<usize, CoreError> {
        let Some(cache) = self.cache.as_mut() else {
            return Ok(0);
        };
        let pairs: Vec<(String, String)> = self.slots
                                               .iter()
                                               .map(|s| (s.key.clone(), s.fingerprint.clone()))
                                               .collect();
        match cache.resume_point(&pairs) {
            Some(rp) => {
                let state = cache.load(&rp.step_key)?;
                let stale: Vec<String> = pairs[rp.step_index + 1..].iter().map(|(k, _)| k.clone()).collect();
                cache.invalidate(&stale)?;

                self.parameter_index = state.parameter_index;
                self.context = state.context;
                for slot in &mut self.slots[..=rp.step_index] {
                    slot.status = StepStatus::FinishedOk;
                }
                info!("resuming after checkpoint {} (skipping {} step(s))",
                      rp.step_key,
                      rp.step_index + 1);
                self.event_store
                    .append_kind(self.run_id, PipelineEventKind::CheckpointRestored { step_key: rp.step_key });
                Ok(rp.step_index + 1)
            }
            None => {
                // Nada reutilizable: los registros viejos (si los hay) dejan
                // de ser válidos desde el primer step.
                let all: Vec<String> = pairs.into_iter().map(|(k, _)| k).collect();
                cache.invalidate(&all)?;
                Ok(0)
            }
        }
    }

    fn run_chunked(&mut self, chunker: &mut dyn Chunker, mut start_index: usize) -> Result<(), CoreError> {
        if !chunker.has_more() {
            // Planner configurado pero sin fuentes chunked: pasada única.
            return self.run_sequence(start_index, None);
        }

        // Snapshot base: cada pasada posterior arranca del mismo estado,
        // los sinks acumulan por append.
        chunker.save(self.snapshot_state());

        let mut pass = 0usize;
        while let Some(coords) = chunker.next_pass() {
            if pass > 0 {
                if let Some(base) = chunker.reload() {
                    self.parameter_index = base.parameter_index;
                    self.context = base.context;
                }
            }
            debug!("starting chunk pass {pass}");
            self.event_store.append_kind(self.run_id, PipelineEventKind::PassStarted { pass });
            self.run_sequence(start_index, Some(&coords))?;
            start_index = 0;
            pass += 1;
        }
        Ok(())
    }

    fn run_sequence(&mut self,
                    start: usize,
                    coords: Option<&IndexMap<String, ChunkCoordinate>>)
                    -> Result<(), CoreError> {
        for index in start..self.slots.len() {
            let key = self.slots[index].key.clone();
            let kind = self.slots[index].step.kind();
            let policy = self.slots[index].step.error_policy();

            if self.mode == ExecutionMode::Development && kind == StepKind::Sink {
                debug!("skipping sink {key} in development mode");
                self.slots[index].status = StepStatus::Skipped;
                let reason = "sink skipped in development mode".to_string();
                self.event_store.append_kind(self.run_id,
                                             PipelineEventKind::StepSkipped { step_index: index,
                                                                              step_key: key,
                                                                              reason });
                continue;
            }

            self.slots[index].status = StepStatus::Running;
            self.event_store.append_kind(self.run_id,
                                         PipelineEventKind::StepStarted { step_index: index,
                                                                          step_key: key.clone() });

            let slot = &self.slots[index];
            let params =
                resolve_parameters(&slot.key, &slot.step.parameters(), &self.parameter_index, &slot.bindings)?;
            let projection = self.context.project(slot.step.input_keys(), slot.step.output_keys())?;
            let chunk = coords.and_then(|c| c.get(slot.key.as_str()).copied());
            let allowed: Vec<String> = slot.step.output_keys().to_vec();
            let fingerprint = slot.fingerprint.clone();

            let ctx = ExecutionContext { context: projection,
                                         params,
                                         chunk };
            match slot.step.run(&ctx) {
                StepRunResult::Success { mut output } => {
                    // Merge-back filtrado: claves no declaradas no se fugan.
                    output.context.retain_keys(&allowed);
                    output.values.retain(|k, _| allowed.contains(k));

                    self.context.merge(output.context);
                    for (k, v) in output.values {
                        self.parameter_index.insert(k, v);
                    }

                    self.slots[index].status = StepStatus::FinishedOk;
                    self.event_store.append_kind(self.run_id,
                                                 PipelineEventKind::StepFinished { step_index: index,
                                                                                   step_key: key.clone(),
                                                                                   fingerprint:
                                                                                       fingerprint.clone() });

                    if self.cache.is_some() {
                        let state = self.snapshot_state();
                        if let Some(cache) = self.cache.as_mut() {
                            cache.store(&key, &fingerprint, &state)?;
                        }
                        self.event_store
                            .append_kind(self.run_id, PipelineEventKind::CheckpointStored { step_key: key.clone() });
                    }
                }
                StepRunResult::Failure { error } => match policy {
                    ErrorPolicy::Raise => {
                        self.slots[index].status = StepStatus::Failed;
                        self.event_store.append_kind(self.run_id,
                                                     PipelineEventKind::StepFailed { step_index: index,
                                                                                     step_key: key.clone(),
                                                                                     error: error.clone() });
                        return Err(error);
                    }
                    ErrorPolicy::Ignore => {
                        // La salida del step se descarta: el estado queda
                        // exactamente como antes de ejecutarlo.
                        warn!("step {key} failed under ignore policy: {error}");
                        self.slots[index].status = StepStatus::Skipped;
                        self.event_store.append_kind(self.run_id,
                                                     PipelineEventKind::FaultIgnored { step_index: index,
                                                                                       step_key: key.clone(),
                                                                                       error });
                    }
                },
            }
        }
        Ok(())
    }

    fn snapshot_state(&self) -> PipelineState {
        PipelineState { parameter_index: self.parameter_index.clone(),
                        context: self.context.clone() }
    }

    fn complete(&mut self) {
        let events = self.event_store.list(self.run_id);
        let step_fps: Vec<String> = events.iter()
                                          .filter_map(|e| match &e.kind {
                                              PipelineEventKind::StepFinished { fingerprint, .. } => {
                                                  Some(fingerprint.clone())
                                              }
                                              _ => None,
                                          })
                                          .collect();
        let pipeline_fp = hash_value(&json!({
                                         "engine_version": ENGINE_VERSION,
                                         "definition_hash": self.definition_hash,
                                         "step_fingerprints": step_fps,
                                     }));
        self.event_store
            .append_kind(self.run_id, PipelineEventKind::PipelineCompleted { pipeline_fingerprint: pipeline_fp });
    }

    // ---- Accesores de inspección ----

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn mode(&self) -> ExecutionMode {
        self.mode
    }

    pub fn context(&self) -> &Context {
        &self.context
    }

    pub fn parameter_index(&self) -> &IndexMap<String, Value> {
        &self.parameter_index
    }

    pub fn parameter(&self, key: &str) -> Option<&Value> {
        self.parameter_index.get(key)
    }

    pub fn step_statuses(&self) -> Vec<(String, StepStatus)> {
        self.slots.iter().map(|s| (s.key.clone(), s.status)).collect()
    }

    pub fn cache_mut(&mut self) -> Option<&mut (dyn PipelineCache + 'static)> {
        self.cache.as_deref_mut()
    }

    pub fn events(&self) -> Vec<PipelineEvent> {
        self.event_store.list(self.run_id)
    }

    /// Variante compacta de la traza de eventos, un caracter por evento.
    pub fn event_variants(&self) -> Vec<&'static str> {
        self.events()
            .iter()
            .map(|e| match e.kind {
                PipelineEventKind::PipelineInitialized { .. } => "I",
                PipelineEventKind::PassStarted { .. } => "P",
                PipelineEventKind::StepStarted { .. } => "S",
                PipelineEventKind::StepFinished { .. } => "F",
                PipelineEventKind::StepFailed { .. } => "X",
                PipelineEventKind::StepSkipped { .. } => "K",
                PipelineEventKind::FaultIgnored { .. } => "G",
                PipelineEventKind::CheckpointStored { .. } => "T",
                PipelineEventKind::CheckpointRestored { .. } => "R",
                PipelineEventKind::PipelineCompleted { .. } => "C",
            })
            .collect()
    }

    /// Fingerprint agregado del run, si ya completó.
    pub fn pipeline_fingerprint(&self) -> Option<String> {
        self.events().iter().rev().find_map(|e| match &e.kind {
                                       PipelineEventKind::PipelineCompleted { pipeline_fingerprint } => {
                                           Some(pipeline_fingerprint.clone())
                                       }
                                       _ => None,
                                   })
    }
}
