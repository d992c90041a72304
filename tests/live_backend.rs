//! Pipeline against a real local model
//!
//! Requires the configured command (default `ollama run llama3.1`) on PATH.
//!
//! Run with: `cargo test --features real_llm --test live_backend -- --nocapture`

#![cfg(feature = "real_llm")]

mod common;

use common::chunk;
use mindstream::{CommandBackend, Config, InMemoryStore, MindstreamApi, PipelineMode};
use std::sync::Arc;

#[tokio::test]
async fn live_model_produces_a_valid_map() {
    let config = match std::env::var("MINDSTREAM_CONFIG") {
        Ok(path) => Config::load(path).unwrap(),
        Err(_) => Config::default(),
    };
    let backend = CommandBackend::from_argv(&config.backend.command).unwrap();
    let api = MindstreamApi::new(Arc::new(backend), Arc::new(InMemoryStore::new()), &config);

    let run = api
        .run_pipeline(
            "live",
            vec![
                chunk("Let's start with the budget for Q3. Marketing wants more."),
                chunk("Hiring is on hold until October. Alice owns the roadmap review."),
            ],
            PipelineMode::Fixed,
        )
        .await
        .unwrap();

    println!("strategy: {:?}", run.extraction_strategy);
    println!("{}", run.map.to_outline());
    assert!(run.map.is_well_formed());
    assert!(!run.map.is_empty());
}
