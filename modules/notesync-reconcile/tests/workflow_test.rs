//! Workflow end to end over an HTML snapshot and the in-memory mocks.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use notesync_common::Config;
use notesync_extract::HtmlSurface;
use notesync_reconcile::testing::{key_row, test_credentials, test_table, MockRowStore, MockTokenProvider};
use notesync_reconcile::{Annotations, ReconciliationOutcome, SyncError, Workflow, WorkflowState};

const NOTE_ID: &str = "5f2a1b3c4d5e6f7a8b9c0d1e";

fn note_url() -> String {
    format!("https://www.xiaohongshu.com/explore/{NOTE_ID}")
}

const NOTE_PAGE: &str = r#"<html><body><div id="noteContainer">
    <span class="username">小红</span>
    <div class="title">周末去哪儿</div>
    <div class="desc">杭州一日游</div>
    <div class="media-container"><img src="https://sns-img.example.com/a.jpg"></div>
    <span class="like-wrapper"><span class="count">7</span></span>
</div></body></html>"#;

const FEED_PAGE: &str = r#"<html><body><div class="feeds-container"></div></body></html>"#;

fn config() -> Config {
    Config {
        credentials: test_credentials(),
        table: test_table(),
        api_base: "http://127.0.0.1:9".into(),
        key_field: "note_id".into(),
        request_timeout: Duration::from_secs(30),
        browserless: None,
    }
}

struct Harness {
    workflow: Workflow,
    store: Arc<MockRowStore>,
    tokens: Arc<MockTokenProvider>,
    states: Arc<Mutex<Vec<WorkflowState>>>,
}

fn harness(store: MockRowStore, tokens: MockTokenProvider) -> Harness {
    let store = Arc::new(store);
    let tokens = Arc::new(tokens);
    let states = Arc::new(Mutex::new(Vec::new()));
    let sink = states.clone();
    let workflow = Workflow::new(config(), tokens.clone(), store.clone())
        .with_observer(move |state| sink.lock().unwrap().push(state.clone()));
    Harness {
        workflow,
        store,
        tokens,
        states,
    }
}

fn annotations() -> Annotations {
    Annotations {
        note: "想去".into(),
        keywords: "杭州".into(),
    }
}

#[tokio::test]
async fn new_note_walks_through_every_state_and_is_created() {
    let h = harness(MockRowStore::new(), MockTokenProvider::new());
    let surface = HtmlSurface::parse(&note_url(), NOTE_PAGE);

    let outcome = h.workflow.run(&surface, &annotations()).await.unwrap();

    let expected = ReconciliationOutcome::Created {
        record_handle: "recNew1".into(),
    };
    assert_eq!(outcome, expected);
    assert_eq!(
        *h.states.lock().unwrap(),
        vec![
            WorkflowState::Collecting,
            WorkflowState::Reconciling,
            WorkflowState::Done(expected),
        ]
    );
    assert_eq!(h.tokens.calls(), 1);

    let created = h.store.created();
    assert_eq!(created.len(), 1);
    assert_eq!(created[0]["note_id"], NOTE_ID);
    assert_eq!(created[0]["标题"], "周末去哪儿");
    assert_eq!(created[0]["点赞"], 7);
    assert_eq!(created[0]["批注"], "想去");
    assert_eq!(created[0]["关键词"], "杭州");
    assert!(!h.workflow.is_busy());
}

#[tokio::test]
async fn known_note_is_updated() {
    let h = harness(
        MockRowStore::new().with_row(key_row("recA", "note_id", NOTE_ID)),
        MockTokenProvider::new(),
    );
    let surface = HtmlSurface::parse(&note_url(), NOTE_PAGE);

    let outcome = h.workflow.run(&surface, &Annotations::default()).await.unwrap();

    assert_eq!(
        outcome,
        ReconciliationOutcome::Updated {
            record_handle: "recA".into()
        }
    );
    assert_eq!(outcome.message(), "Existing record updated to latest (recA)");
}

#[tokio::test]
async fn unsupported_page_errors_without_touching_the_store() {
    let h = harness(MockRowStore::new(), MockTokenProvider::new());
    let surface = HtmlSurface::parse("https://www.xiaohongshu.com/explore", FEED_PAGE);

    let err = h.workflow.run(&surface, &Annotations::default()).await.unwrap_err();

    assert!(matches!(err, SyncError::Extraction(_)));
    let states = h.states.lock().unwrap();
    assert_eq!(states.len(), 2);
    assert_eq!(states[0], WorkflowState::Collecting);
    assert!(matches!(states[1], WorkflowState::Error(_)));
    assert_eq!(h.tokens.calls(), 0);
    assert_eq!(h.store.list_calls(), 0);
    assert_eq!(h.store.write_calls(), 0);
}

#[tokio::test]
async fn token_failure_stops_before_search() {
    let h = harness(MockRowStore::new(), MockTokenProvider::failing(10003, "invalid param"));
    let surface = HtmlSurface::parse(&note_url(), NOTE_PAGE);

    let err = h.workflow.run(&surface, &Annotations::default()).await.unwrap_err();

    match &err {
        SyncError::Token(message) => assert!(message.contains("invalid param"), "{message}"),
        other => panic!("expected Token error, got {other:?}"),
    }
    assert_eq!(h.store.list_calls(), 0);
    assert_eq!(
        h.states.lock().unwrap().last(),
        Some(&WorkflowState::Error(err.to_string()))
    );
}

#[tokio::test]
async fn search_failure_is_a_done_failed_outcome() {
    let h = harness(
        MockRowStore::new().fail_list(99991663, "Invalid access token"),
        MockTokenProvider::new(),
    );
    let surface = HtmlSurface::parse(&note_url(), NOTE_PAGE);

    let outcome = h.workflow.run(&surface, &Annotations::default()).await.unwrap();

    assert!(!outcome.is_success());
    assert!(matches!(
        h.states.lock().unwrap().last(),
        Some(WorkflowState::Done(ReconciliationOutcome::Failed { .. }))
    ));
    assert_eq!(h.store.write_calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn concurrent_run_is_rejected_as_busy() {
    let h = harness(
        MockRowStore::new(),
        MockTokenProvider::new().with_delay(Duration::from_secs(1)),
    );
    let surface = HtmlSurface::parse(&note_url(), NOTE_PAGE);
    let annotations = Annotations::default();

    let first = h.workflow.run(&surface, &annotations);
    let second = async {
        tokio::time::sleep(Duration::from_millis(10)).await;
        h.workflow.run(&surface, &annotations).await
    };
    let (first, second) = tokio::join!(first, second);

    assert!(matches!(first, Ok(ReconciliationOutcome::Created { .. })));
    assert!(matches!(second, Err(SyncError::Busy)));
    assert_eq!(h.tokens.calls(), 1);
    assert_eq!(h.store.created().len(), 1);
    assert!(!h.workflow.is_busy());
}

#[tokio::test(start_paused = true)]
async fn slow_token_times_out_before_search() {
    let h = harness(
        MockRowStore::new(),
        MockTokenProvider::new().with_delay(Duration::from_secs(31)),
    );
    let surface = HtmlSurface::parse(&note_url(), NOTE_PAGE);

    let err = h.workflow.run(&surface, &Annotations::default()).await.unwrap_err();

    assert!(
        matches!(err, SyncError::Timeout { operation: "token", secs: 30 }),
        "got {err:?}"
    );
    assert_eq!(h.tokens.calls(), 1);
    assert_eq!(h.store.list_calls(), 0);
    assert_eq!(h.store.write_calls(), 0);
    assert_eq!(h.workflow.state(), WorkflowState::Error(err.to_string()));
    assert!(!h.workflow.is_busy());
}

#[tokio::test]
async fn state_is_idle_until_the_first_action_and_never_emitted() {
    let h = harness(MockRowStore::new(), MockTokenProvider::new());
    assert_eq!(h.workflow.state(), WorkflowState::Idle);

    let surface = HtmlSurface::parse(&note_url(), NOTE_PAGE);
    let outcome = h.workflow.run(&surface, &Annotations::default()).await.unwrap();

    assert_eq!(h.workflow.state(), WorkflowState::Done(outcome));
    assert!(!h.states.lock().unwrap().contains(&WorkflowState::Idle));
}

#[tokio::test]
async fn guard_is_released_after_failure() {
    let h = harness(MockRowStore::new(), MockTokenProvider::new());
    let feed = HtmlSurface::parse("https://www.xiaohongshu.com/explore", FEED_PAGE);
    let note = HtmlSurface::parse(&note_url(), NOTE_PAGE);

    assert!(h.workflow.run(&feed, &Annotations::default()).await.is_err());
    assert!(h.workflow.run(&note, &Annotations::default()).await.is_ok());
}
