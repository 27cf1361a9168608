//! Integración del chunking: pipeline completo re-ejecutado por pasadas,
//! acumulación por append en sinks y fallos de configuración del planner.

use serde_json::json;
use tab_adapters::{MemorySink, VecSource};
use tab_core::{ChunkStrategy, CoreError, Pipeline, PipelineEventKind, StepBuilder, StepOutput, StepRunResult,
               Table, WriteMode};

fn rows(n: usize) -> Table {
    let data = (0..n).map(|i| vec![json!(i)]).collect();
    Table::with_rows(vec!["n"], data).unwrap()
}

#[test]
fn direct_chunking_runs_three_passes_over_uneven_sources() {
    // El ejemplo del contrato: X 100 filas / chunk 50, Y 60 filas / chunk 20.
    let sink_x = MemorySink::new("out_x", "x", WriteMode::Append);
    let sink_y = MemorySink::new("out_y", "y", WriteMode::Append);
    let hx = sink_x.handle();
    let hy = sink_y.handle();

    let mut pipeline = Pipeline::builder()
        .add_step(VecSource::new("x", "x", rows(100)).with_chunk_size(50))
        .add_step(VecSource::new("y", "y", rows(60)).with_chunk_size(20))
        .add_step(sink_x)
        .add_step(sink_y)
        .with_chunking(ChunkStrategy::Direct)
        .build()
        .unwrap();
    pipeline.execute().unwrap();

    let passes = pipeline.events()
                         .iter()
                         .filter(|e| matches!(e.kind, PipelineEventKind::PassStarted { .. }))
                         .count();
    assert_eq!(passes, 3);
    assert_eq!(hx.lock().unwrap().row_count(), 100);
    assert_eq!(hy.lock().unwrap().row_count(), 60);

    // Las filas acumulan en orden: la primera de cada fuente es la fila 0.
    assert_eq!(hx.lock().unwrap().rows()[0][0], json!(0));
    assert_eq!(hy.lock().unwrap().rows()[59][0], json!(59));
}

#[test]
fn distributed_chunking_consumes_both_sources_every_pass() {
    // A 12 filas / chunk 6 y B 6 filas / chunk 2: 6 pasadas, 2+1 filas.
    let sink_a = MemorySink::new("out_a", "a", WriteMode::Append);
    let sink_b = MemorySink::new("out_b", "b", WriteMode::Append);
    let ha = sink_a.handle();
    let hb = sink_b.handle();

    let mut pipeline = Pipeline::builder()
        .add_step(VecSource::new("a", "a", rows(12)).with_chunk_size(6))
        .add_step(VecSource::new("b", "b", rows(6)).with_chunk_size(2))
        .add_step(sink_a)
        .add_step(sink_b)
        .with_chunking(ChunkStrategy::Distributed)
        .build()
        .unwrap();
    pipeline.execute().unwrap();

    let passes = pipeline.events()
                         .iter()
                         .filter(|e| matches!(e.kind, PipelineEventKind::PassStarted { .. }))
                         .count();
    assert_eq!(passes, 6);
    assert_eq!(ha.lock().unwrap().row_count(), 12);
    assert_eq!(hb.lock().unwrap().row_count(), 6);
}

#[test]
fn sink_must_append_under_chunking() {
    let mut pipeline = Pipeline::builder()
        .add_step(VecSource::new("a", "a", rows(10)).with_chunk_size(5))
        .add_step(MemorySink::new("out", "a", WriteMode::Replace))
        .with_chunking(ChunkStrategy::Direct)
        .build()
        .unwrap();
    assert_eq!(pipeline.execute().unwrap_err(), CoreError::SinkMustAppend("01-out".into()));
}

#[test]
fn chunked_source_without_row_count_fails_at_build() {
    // Una fuente armada a mano que declara chunk_size pero no expone filas.
    let blind = StepBuilder::source("blind").output("t")
                                            .chunk_size(10)
                                            .build(|_ctx| StepRunResult::success(StepOutput::new()));
    let err = Pipeline::builder().add_step(blind)
                                 .with_chunking(ChunkStrategy::Direct)
                                 .build()
                                 .unwrap_err();
    assert_eq!(err, CoreError::MissingRowCount("00-blind".into()));
}

#[test]
fn zero_chunk_size_fails_at_build() {
    let err = Pipeline::builder()
        .add_step(VecSource::new("a", "a", rows(10)).with_chunk_size(0))
        .with_chunking(ChunkStrategy::Direct)
        .build()
        .unwrap_err();
    assert_eq!(err, CoreError::InvalidChunkSize("00-a".into()));
}

#[test]
fn chunking_without_chunked_sources_is_a_single_pass() {
    let sink = MemorySink::new("out", "a", WriteMode::Append);
    let handle = sink.handle();
    let mut pipeline = Pipeline::builder().add_step(VecSource::new("a", "a", rows(7)))
                                          .add_step(sink)
                                          .with_chunking(ChunkStrategy::Direct)
                                          .build()
                                          .unwrap();
    pipeline.execute().unwrap();
    assert_eq!(handle.lock().unwrap().row_count(), 7);
    let passes = pipeline.events()
                         .iter()
                         .filter(|e| matches!(e.kind, PipelineEventKind::PassStarted { .. }))
                         .count();
    assert_eq!(passes, 0);
}

#[test]
fn scalar_state_resets_between_passes() {
    // Un step que acumula sobre un escalar: como cada pasada recarga el
    // snapshot base del planner, el valor final refleja una sola pasada.
    let bump = StepBuilder::transform("bump")
        .output("count")
        .parameter(tab_core::ParameterDefinition::optional("count", tab_core::ParameterType::Number, json!(0)))
        .build(|ctx| {
            let prev = ctx.param("count").and_then(serde_json::Value::as_i64).unwrap_or(0);
            StepRunResult::success(StepOutput::new().with_value("count", json!(prev + 1)))
        });

    let mut pipeline = Pipeline::builder()
        .add_step(VecSource::new("a", "a", rows(9)).with_chunk_size(3))
        .add_step(bump)
        .with_parameter("count", json!(0))
        .with_chunking(ChunkStrategy::Direct)
        .build()
        .unwrap();
    pipeline.execute().unwrap();
    assert_eq!(pipeline.parameter("count"), Some(&json!(1)));
}
