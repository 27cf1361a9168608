//! Demo ejecutable: arma un pipeline pequeño (fuente chunked, dos
//! transformaciones y un sink acumulativo) con cache de checkpoints en
//! disco, lo corre por pasadas y muestra la traza de eventos. Los
//! checkpoints quedan en el directorio configurado para inspección.

use std::str::FromStr;

use serde_json::json;
use tabflow_rust::config::CONFIG;

use tab_adapters::{MemorySink, ProjectColumns, ScaleColumn, VecSource};
use tab_core::{ChunkStrategy, CoreError, ExecutionMode, LfuCache, Pipeline, PipelineEventKind, Table,
               WriteMode};

fn sample_table(rows: usize) -> Table {
    let data = (0..rows).map(|i| {
                            vec![json!(i), json!(i as f64), json!(if i % 2 == 0 { "even" } else { "odd" })]
                        })
                        .collect();
    Table::with_rows(vec!["id", "value", "parity"], data).expect("static demo table")
}

fn run_demo() -> Result<(), CoreError> {
    let mode = ExecutionMode::from_str(&CONFIG.execution.mode)?;
    let cache = LfuCache::with_store(CONFIG.cache.capacity, &CONFIG.cache.dir)?;

    let sink = MemorySink::new("store", "report", WriteMode::Append);
    let handle = sink.handle();

    let mut pipeline = Pipeline::builder()
        .add_step(VecSource::new("measurements", "measurements", sample_table(100)).with_chunk_size(25))
        .add_step(ScaleColumn::new("scale", "measurements", "value"))
        .add_step(ProjectColumns::new("report", "measurements", "report", vec!["id", "value"]))
        .add_step(sink)
        .with_parameter("factor", json!(1.5))
        .with_mode(mode)
        .with_cache(cache)
        .with_chunking(ChunkStrategy::Direct)
        .build()?;

    pipeline.execute()?;

    let passes = pipeline.events()
                         .iter()
                         .filter(|e| matches!(e.kind, PipelineEventKind::PassStarted { .. }))
                         .count();
    println!("mode: {mode}");
    println!("run id: {}", pipeline.run_id());
    println!("chunk passes: {passes}");
    println!("rows written: {}", handle.lock().map(|t| t.row_count()).unwrap_or(0));
    println!("event trace: {}", pipeline.event_variants().join(""));
    if let Some(fp) = pipeline.pipeline_fingerprint() {
        println!("pipeline fingerprint: {fp}");
    }
    Ok(())
}

fn main() {
    dotenvy::dotenv().ok();
    env_logger::init();
    log::info!("tabflow demo starting (cache dir: {})", CONFIG.cache.dir);

    if let Err(e) = run_demo() {
        eprintln!("pipeline aborted: {e}");
        std::process::exit(1);
    }
}
