use revu::backend::Backend;
use revu::config::Config;
use revu::context::ReviewContext;
use revu::instruction_presets::get_instruction_preset_library;
use revu::runner::TurnError;
use revu::store::MessageStore;
use revu::{run_simple, ui};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use test_utils::{FixedSummarizer, ScriptedRunner, Step, TestStore, fast_settings};

fn backend(steps: Vec<Step>) -> Backend {
    ui::set_quiet_mode(true);
    let store = TestStore::new();
    let mut config = Config::default();
    config.streaming = fast_settings();
    Backend::new(
        config,
        Arc::clone(&store) as Arc<dyn MessageStore>,
        ScriptedRunner::new(store, steps),
        FixedSummarizer::new(Duration::ZERO),
    )
}

fn context() -> ReviewContext {
    let mut files = BTreeMap::new();
    files.insert("src/lib.rs".to_string(), "pub fn add() {}".to_string());
    ReviewContext::new("+pub fn add() {}", files)
}

async fn review(backend: &Backend, cancel: &CancellationToken) -> (anyhow::Result<()>, String) {
    let preset = get_instruction_preset_library().get_or_default("default");
    let mut out = Vec::new();
    let result = run_simple(cancel, context(), backend, &preset, &mut out).await;
    (result, String::from_utf8(out).expect("utf-8"))
}

#[tokio::test]
async fn test_streamed_review_is_written_once() {
    let backend = backend(vec![Step::Grow("Looks"), Step::Grow("Looks good.")]);
    let (result, out) = review(&backend, &CancellationToken::new()).await;

    result.expect("review");
    assert_eq!(out, "Looks good.\n");
}

#[tokio::test]
async fn test_differing_final_text_is_appended() {
    let backend = backend(vec![Step::Grow("Draft"), Step::Store("Final.")]);
    let (result, out) = review(&backend, &CancellationToken::new()).await;

    result.expect("review");
    assert_eq!(out, "Draft\n\nFinal.\n");
}

#[tokio::test]
async fn test_cancelled_review_returns_ok() {
    let backend = backend(vec![Step::Grow("Partial"), Step::Hang]);
    let cancel = CancellationToken::new();
    let canceller = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        canceller.cancel();
    });

    let (result, out) = tokio::time::timeout(Duration::from_secs(2), review(&backend, &cancel))
        .await
        .expect("review did not stop");

    result.expect("cancel is not an error");
    assert_eq!(out, "Partial\n");
}

#[tokio::test]
async fn test_model_error_is_returned() {
    let backend = backend(vec![Step::Fail(TurnError::Transport(
        "rate limited".to_string(),
    ))]);
    let (result, _) = review(&backend, &CancellationToken::new()).await;

    let err = result.expect_err("should fail");
    assert!(err.to_string().contains("rate limited"));
}
