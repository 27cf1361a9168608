use std::collections::HashMap;

use chrono::Utc;
use uuid::Uuid;

use super::{PipelineEvent, PipelineEventKind};

/// Almacenamiento de eventos append-only.
pub trait EventStore {
    /// Agrega un evento a partir de su kind y devuelve el evento completo
    /// (con seq y ts).
    fn append_kind(&mut self, run_id: Uuid, kind: PipelineEventKind) -> PipelineEvent;
    /// Lista eventos de un run (orden ascendente por seq).
    fn list(&self, run_id: Uuid) -> Vec<PipelineEvent>;
}

#[derive(Debug, Default)]
pub struct InMemoryEventStore {
    pub inner: HashMap<Uuid, Vec<PipelineEvent>>,
}

impl EventStore for InMemoryEventStore {
    fn append_kind(&mut self, run_id: Uuid, kind: PipelineEventKind) -> PipelineEvent {
        let vec = self.inner.entry(run_id).or_default();
        let ev = PipelineEvent { seq: vec.len() as u64,
                                 run_id,
                                 kind,
                                 ts: Utc::now() };
        vec.push(ev.clone());
        ev
    }

    fn list(&self, run_id: Uuid) -> Vec<PipelineEvent> {
        self.inner.get(&run_id).cloned().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn append_assigns_sequential_seq() {
        let mut store = InMemoryEventStore::default();
        let run_id = Uuid::new_v4();
        let a = store.append_kind(run_id, PipelineEventKind::PassStarted { pass: 0 });
        let b = store.append_kind(run_id, PipelineEventKind::PassStarted { pass: 1 });
        assert_eq!(a.seq, 0);
        assert_eq!(b.seq, 1);
        assert_eq!(store.list(run_id).len(), 2);
    }

    #[test]
    fn list_unknown_run_is_empty() {
        let store = InMemoryEventStore::default();
        assert!(store.list(Uuid::new_v4()).is_empty());
    }
}
