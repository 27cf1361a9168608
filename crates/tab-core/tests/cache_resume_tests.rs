//! Integración del cache en disco: round-trip de checkpoints, detección de
//! frontera de reanudación por fingerprint y reset del backing store.

use serde_json::json;
use tab_adapters::{MemorySink, VecSource};
use tab_core::{LfuCache, Pipeline, PipelineCache, PipelineEventKind, PipelineState, StepBuilder, StepOutput,
               StepRunResult, Table, WriteMode};
use tempfile::TempDir;

fn numbers(n: usize) -> Table {
    let rows = (0..n).map(|i| vec![json!(i), json!(i as f64)]).collect();
    Table::with_rows(vec!["id", "v"], rows).unwrap()
}

/// Transform trivial con versión de contenido parametrizable: cambiarla
/// simula que la lógica del step cambió entre runs.
fn tag_step(id: &str, version: &str) -> tab_core::FnStep {
    let key = format!("tag_{id}");
    StepBuilder::transform(id).output(key.clone())
                              .content_version(version)
                              .build(move |_ctx| {
                                  StepRunResult::success(StepOutput::new().with_value(key.clone(), json!(1)))
                              })
}

fn five_step_pipeline(dir: &std::path::Path, b_version: &str) -> Pipeline {
    let sink = MemorySink::new("out", "numbers", WriteMode::Append);
    Pipeline::builder().add_step(VecSource::new("numbers", "numbers", numbers(8)))
                       .add_step(tag_step("a", "1"))
                       .add_step(tag_step("b", b_version))
                       .add_step(tag_step("c", "1"))
                       .add_step(sink)
                       .with_cache(LfuCache::with_store(16, dir).unwrap())
                       .build()
                       .unwrap()
}

#[test]
fn store_then_load_round_trips_state() {
    let dir = TempDir::new().unwrap();
    let mut cache = LfuCache::with_store(4, dir.path()).unwrap();

    let mut state = PipelineState::default();
    state.parameter_index.insert("k".into(), json!("v"));
    state.context.insert_table("t", numbers(3));

    cache.store("00-src", "fp-src", &state).unwrap();
    assert_eq!(cache.load("00-src").unwrap(), state);

    // Otro cache sobre el mismo directorio rehidrata desde disco.
    let mut reopened = LfuCache::with_store(4, dir.path()).unwrap();
    assert_eq!(reopened.load("00-src").unwrap(), state);
}

#[test]
fn fully_cached_run_resumes_after_last_step() {
    let dir = TempDir::new().unwrap();

    let mut first = five_step_pipeline(dir.path(), "1");
    first.execute().unwrap();
    let baseline = first.context().clone();

    // Mismos fingerprints: el segundo run restaura el último checkpoint y no
    // re-ejecuta ningún step.
    let mut second = five_step_pipeline(dir.path(), "1");
    second.execute().unwrap();

    let started = second.events()
                        .iter()
                        .filter(|e| matches!(e.kind, PipelineEventKind::StepStarted { .. }))
                        .count();
    assert_eq!(started, 0);
    assert!(second.events()
                  .iter()
                  .any(|e| matches!(&e.kind, PipelineEventKind::CheckpointRestored { step_key }
                                    if step_key == "04-out")));
    assert_eq!(second.context(), &baseline);
}

#[test]
fn changed_fingerprint_resumes_from_last_matching_checkpoint() {
    let dir = TempDir::new().unwrap();

    let mut first = five_step_pipeline(dir.path(), "1");
    first.execute().unwrap();
    let baseline = first.context().clone();

    // El tercer step ("02-b") cambió de lógica: se re-ejecutan los índices
    // 2, 3 y 4, partiendo del checkpoint del segundo step ("01-a").
    let mut second = five_step_pipeline(dir.path(), "2");
    second.execute().unwrap();

    let started: Vec<usize> = second.events()
                                    .iter()
                                    .filter_map(|e| match e.kind {
                                        PipelineEventKind::StepStarted { step_index, .. } => Some(step_index),
                                        _ => None,
                                    })
                                    .collect();
    assert_eq!(started, vec![2, 3, 4]);
    assert!(second.events()
                  .iter()
                  .any(|e| matches!(&e.kind, PipelineEventKind::CheckpointRestored { step_key }
                                    if step_key == "01-a")));

    // La lógica de "b" no cambió de verdad (sólo su versión declarada), así
    // que el contexto final coincide con el del primer run.
    assert_eq!(second.context(), &baseline);
}

#[test]
fn mismatch_discards_checkpoints_from_boundary_forward() {
    let dir = TempDir::new().unwrap();

    let mut first = five_step_pipeline(dir.path(), "1");
    first.execute().unwrap();

    let mut second = five_step_pipeline(dir.path(), "2");
    second.execute().unwrap();

    // Tras el segundo run los checkpoints re-escritos deben reflejar los
    // fingerprints nuevos: un tercer run idéntico no re-ejecuta nada.
    let mut third = five_step_pipeline(dir.path(), "2");
    third.execute().unwrap();
    let started = third.events()
                       .iter()
                       .filter(|e| matches!(e.kind, PipelineEventKind::StepStarted { .. }))
                       .count();
    assert_eq!(started, 0);
}

#[test]
fn corrupted_checkpoint_referenced_by_record_is_fatal() {
    let dir = TempDir::new().unwrap();

    let mut first = five_step_pipeline(dir.path(), "1");
    first.execute().unwrap();

    // Romper el snapshot del último step completado y reintentar: la
    // reanudación es imposible sin él.
    let snap = dir.path().join("04-out.snap.zst");
    std::fs::write(&snap, b"garbage").unwrap();

    let mut second = five_step_pipeline(dir.path(), "1");
    let err = second.execute().unwrap_err();
    assert_eq!(err, tab_core::CoreError::CheckpointUnreadable("04-out".into()));
}

#[test]
fn reset_with_delete_clears_backing_store() {
    let dir = TempDir::new().unwrap();

    let mut first = five_step_pipeline(dir.path(), "1");
    first.execute().unwrap();
    first.cache_mut().unwrap().reset(true).unwrap();

    // Sin registros persistidos, el siguiente run ejecuta todo de nuevo.
    let mut second = five_step_pipeline(dir.path(), "1");
    second.execute().unwrap();
    let started = second.events()
                        .iter()
                        .filter(|e| matches!(e.kind, PipelineEventKind::StepStarted { .. }))
                        .count();
    assert_eq!(started, 5);
}
