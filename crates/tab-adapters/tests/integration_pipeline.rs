//! Pipeline de punta a punta con los adapters en memoria: fuente chunked,
//! transformaciones, decremento real de escalar y sink acumulativo.

use serde_json::json;
use tab_adapters::{DecrementScalar, MemorySink, ProjectColumns, ScaleColumn, VecSource};
use tab_core::{ChunkStrategy, Pipeline, Table, WriteMode};

fn measurements(n: usize) -> Table {
    let rows = (0..n).map(|i| vec![json!(i), json!(i as f64), json!(format!("s{i}"))]).collect();
    Table::with_rows(vec!["id", "value", "label"], rows).unwrap()
}

#[test]
fn full_pipeline_with_chunking_and_transforms() {
    let sink = MemorySink::new("store", "scaled_ids", WriteMode::Append);
    let handle = sink.handle();

    let mut pipeline = Pipeline::builder()
        .add_step(VecSource::new("measurements", "measurements", measurements(40)).with_chunk_size(10))
        .add_step(ScaleColumn::new("scale", "measurements", "value"))
        .add_step(ProjectColumns::new("project", "measurements", "scaled_ids", vec!["id", "value"]))
        .add_step(sink)
        .with_parameter("factor", json!(10.0))
        .with_chunking(ChunkStrategy::Direct)
        .build()
        .unwrap();
    pipeline.execute().unwrap();

    let written = handle.lock().unwrap();
    assert_eq!(written.row_count(), 40);
    assert_eq!(written.columns(), ["id", "value"]);
    // Fila 7 de la primera pasada: value = 7 * 10.
    assert_eq!(written.rows()[7][1], json!(70.0));
}

#[test]
fn budget_countdown_across_steps() {
    // Dos decrementos encadenados sobre el mismo escalar: resta de verdad.
    let mut pipeline = Pipeline::builder()
        .add_step(VecSource::new("measurements", "measurements", measurements(2)))
        .add_step_with_params(DecrementScalar::new("spend_a", "budget"), json!({"amount": 30.0}))
        .add_step_with_params(DecrementScalar::new("spend_b", "budget"), json!({"amount": 12.5}))
        .with_parameter("budget", json!(100.0))
        .build()
        .unwrap();
    pipeline.execute().unwrap();
    assert_eq!(pipeline.parameter("budget"), Some(&json!(57.5)));
}
