//! Session isolation, serialization and persistence through the API

mod common;

use common::{chunk, heuristic_config, nodes_json, texts};
use mindstream::prompts::TRANSCRIPT_LABEL;
use mindstream::{
    InMemoryStore, MindstreamApi, MockBackend, OpenStore, PipelineMode, SessionStore, SqliteStore,
};
use std::sync::Arc;
use std::time::Duration;

#[tokio::test]
async fn sessions_never_see_each_other() {
    let backend = MockBackend::available()
        .on("alpha-topic", nodes_json(&[("1", "Alpha", None)]))
        .on("beta-topic", nodes_json(&[("1", "Beta", None)]));
    let api = MindstreamApi::new(Arc::new(backend), Arc::new(InMemoryStore::new()), &heuristic_config());

    let a = api
        .run_pipeline("a", vec![chunk("alpha-topic")], PipelineMode::Fixed)
        .await
        .unwrap();
    let b = api
        .run_pipeline("b", vec![chunk("beta-topic")], PipelineMode::Fixed)
        .await
        .unwrap();

    assert_eq!(texts(&a.map), vec!["Alpha"]);
    assert_eq!(texts(&b.map), vec!["Beta"]);
    assert_eq!(texts(&api.session_map("a").unwrap()), vec!["Alpha"]);
    assert_eq!(api.session_window("b").await, vec![chunk("beta-topic")]);
    assert_eq!(api.list_sessions().unwrap(), vec!["a", "b"]);
}

#[tokio::test]
async fn concurrent_runs_on_one_session_lose_no_update() {
    // Window of one, so each run extracts only its own chunk.
    let backend = MockBackend::available()
        .on("alpha-topic", nodes_json(&[("1", "Alpha", None)]))
        .on("beta-topic", nodes_json(&[("1", "Beta", None)]))
        .with_delay(Duration::from_millis(20));
    let mut config = heuristic_config();
    config.buffer.max_chunks = 1;
    let store = Arc::new(InMemoryStore::new());
    let api = MindstreamApi::new(Arc::new(backend), store.clone(), &config);

    let (first, second) = tokio::join!(
        api.run_pipeline("s", vec![chunk("alpha-topic")], PipelineMode::Fixed),
        api.run_pipeline("s", vec![chunk("beta-topic")], PipelineMode::Fixed),
    );
    first.unwrap();
    second.unwrap();

    let stored = store.recall("s").unwrap();
    assert_eq!(texts(&stored), vec!["Alpha", "Beta"]);
    assert!(stored.is_well_formed());
}

#[tokio::test]
async fn window_evicts_oldest_chunks() {
    let backend = Arc::new(MockBackend::available().otherwise(nodes_json(&[("1", "Topic", None)])));
    let mut config = heuristic_config();
    config.buffer.max_chunks = 3;
    let api = MindstreamApi::new(backend.clone(), Arc::new(InMemoryStore::new()), &config);

    let chunks: Vec<_> = (0..5).map(|i| chunk(&format!("chunk-{}", i))).collect();
    api.run_pipeline("s", chunks, PipelineMode::Fixed).await.unwrap();

    let prompt = backend.prompts().remove(0);
    assert!(!prompt.contains("chunk-0") && !prompt.contains("chunk-1"));
    assert!(prompt.contains("chunk-2") && prompt.contains("chunk-4"));
}

#[tokio::test]
async fn repeated_runs_accumulate_without_duplicates() {
    let backend = MockBackend::available()
        .on("first", nodes_json(&[("1", "Budget", None), ("2", "Q3 numbers", Some("1"))]))
        .on(TRANSCRIPT_LABEL, nodes_json(&[("1", "budget", None), ("2", "Hiring", None)]));
    let mut config = heuristic_config();
    config.buffer.max_chunks = 1;
    let api = MindstreamApi::new(Arc::new(backend), Arc::new(InMemoryStore::new()), &config);

    api.run_pipeline("s", vec![chunk("first")], PipelineMode::Fixed)
        .await
        .unwrap();
    let run = api
        .run_pipeline("s", vec![chunk("second")], PipelineMode::Fixed)
        .await
        .unwrap();

    assert_eq!(texts(&run.map), vec!["Budget", "Hiring", "Q3 numbers"]);
    assert!(run.map.get("1").is_some_and(|n| n.text == "Budget"));
}

#[tokio::test]
async fn sqlite_sessions_survive_restart() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("sessions.db");

    {
        let backend = MockBackend::available().otherwise(nodes_json(&[("1", "Roadmap", None)]));
        let store = Arc::new(SqliteStore::open(&path).unwrap());
        let api = MindstreamApi::new(Arc::new(backend), store, &heuristic_config());
        api.run_pipeline("standup", vec![chunk("roadmap")], PipelineMode::Fixed)
            .await
            .unwrap();
    }

    let store = Arc::new(SqliteStore::open(&path).unwrap());
    assert!(store.updated_at("standup").unwrap().is_some());
    let api = MindstreamApi::new(
        Arc::new(MockBackend::unavailable()),
        store,
        &heuristic_config(),
    );
    assert_eq!(api.list_sessions().unwrap(), vec!["standup"]);
    assert_eq!(texts(&api.session_map("standup").unwrap()), vec!["Roadmap"]);
}
