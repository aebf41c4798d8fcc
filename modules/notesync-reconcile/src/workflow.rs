use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use notesync_common::{Annotations, Config, ReconciliationOutcome, SyncError, WorkflowState};
use notesync_extract::Surface;
use tracing::{info, warn};

use crate::fields::to_fields;
use crate::reconciler::{bounded, Reconciler};
use crate::store::{RowStore, TokenProvider};

type Observer = Box<dyn Fn(&WorkflowState) + Send + Sync>;

/// One collect-and-sync action: extract the page, obtain a token, reconcile.
///
/// Only one action runs at a time; a second call while one is in flight is
/// rejected with [`SyncError::Busy`] before touching the page or the store.
///
/// [`WorkflowState::Idle`] is the state before the first action and is never
/// emitted; every later state is, and the last one stays readable through
/// [`Workflow::state`].
pub struct Workflow {
    config: Config,
    tokens: Arc<dyn TokenProvider>,
    store: Arc<dyn RowStore>,
    observer: Option<Observer>,
    state: Mutex<WorkflowState>,
    in_flight: AtomicBool,
}

/// Clears the in-flight flag however the action ends.
struct InFlight<'a>(&'a AtomicBool);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl Workflow {
    pub fn new(config: Config, tokens: Arc<dyn TokenProvider>, store: Arc<dyn RowStore>) -> Self {
        Self {
            config,
            tokens,
            store,
            observer: None,
            state: Mutex::new(WorkflowState::Idle),
            in_flight: AtomicBool::new(false),
        }
    }

    /// Receive every state transition, in order.
    pub fn with_observer(mut self, observer: impl Fn(&WorkflowState) + Send + Sync + 'static) -> Self {
        self.observer = Some(Box::new(observer));
        self
    }

    /// Most recent state: `Idle` until the first action starts.
    pub fn state(&self) -> WorkflowState {
        self.state.lock().unwrap().clone()
    }

    pub fn is_busy(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Run one action against `surface`.
    ///
    /// `Ok` carries the reconciliation outcome, which may itself be `Failed`
    /// (search or write errors). `Err` means the action stopped before
    /// reconciling: busy, unsupported page, or no access token.
    pub async fn run(
        &self,
        surface: &dyn Surface,
        annotations: &Annotations,
    ) -> Result<ReconciliationOutcome, SyncError> {
        let _guard = self.acquire()?;

        match self.run_inner(surface, annotations).await {
            Ok(outcome) => {
                self.emit(WorkflowState::Done(outcome.clone()));
                Ok(outcome)
            }
            Err(err) => {
                warn!(error = %err, "Sync aborted");
                self.emit(WorkflowState::Error(err.to_string()));
                Err(err)
            }
        }
    }

    async fn run_inner(
        &self,
        surface: &dyn Surface,
        annotations: &Annotations,
    ) -> Result<ReconciliationOutcome, SyncError> {
        self.emit(WorkflowState::Collecting);
        let record = notesync_extract::extract(surface)?;
        let fields = to_fields(&record, annotations, &self.config.key_field);

        let token = bounded(
            self.config.request_timeout,
            "token",
            self.tokens.access_token(&self.config.credentials),
        )
        .await?
        .map_err(|e| SyncError::Token(e.to_string()))?;

        self.emit(WorkflowState::Reconciling);
        let outcome = Reconciler::new(self.store.as_ref(), self.config.request_timeout)
            .reconcile(
                &token,
                &self.config.table,
                &self.config.key_field,
                &record.id,
                &fields,
            )
            .await;

        info!(note_id = %record.id, table = %self.config.table, outcome = %outcome, "Sync finished");
        Ok(outcome)
    }

    fn acquire(&self) -> Result<InFlight<'_>, SyncError> {
        self.in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| SyncError::Busy)?;
        Ok(InFlight(&self.in_flight))
    }

    fn emit(&self, state: WorkflowState) {
        tracing::debug!(?state, "Workflow state");
        *self.state.lock().unwrap() = state.clone();
        if let Some(observer) = &self.observer {
            observer(&state);
        }
    }
}
