use std::future::Future;
use std::time::Duration;

use bitable_client::Fields;
use notesync_common::{ReconciliationOutcome, SyncError, TableRef, WriteOp};
use tracing::{info, warn};

use crate::store::{AccessToken, ListQuery, RowStore, StoreError};

/// Rows inspected per search. Rows past this window are invisible, so a note
/// stored there is duplicated by the next create.
pub const SEARCH_WINDOW: u32 = 200;

/// Run `fut` under `limit`, mapping expiry to `SyncError::Timeout`.
pub(crate) async fn bounded<T>(
    limit: Duration,
    operation: &'static str,
    fut: impl Future<Output = T>,
) -> Result<T, SyncError> {
    tokio::time::timeout(limit, fut)
        .await
        .map_err(|_| SyncError::Timeout {
            operation,
            secs: limit.as_secs(),
        })
}

/// Upserts one row by natural key: search, then exactly one write.
pub struct Reconciler<'a> {
    store: &'a dyn RowStore,
    request_timeout: Duration,
}

impl<'a> Reconciler<'a> {
    pub fn new(store: &'a dyn RowStore, request_timeout: Duration) -> Self {
        Self {
            store,
            request_timeout,
        }
    }

    /// Never errors: every failure is folded into `Failed` with a readable reason.
    pub async fn reconcile(
        &self,
        token: &AccessToken,
        table: &TableRef,
        key_field: &str,
        natural_key: &str,
        fields: &Fields,
    ) -> ReconciliationOutcome {
        match self.try_reconcile(token, table, key_field, natural_key, fields).await {
            Ok(outcome) => outcome,
            Err(err) => {
                warn!(%table, natural_key, error = %err, "Reconciliation failed");
                ReconciliationOutcome::Failed {
                    reason: failure_reason(&err),
                }
            }
        }
    }

    async fn try_reconcile(
        &self,
        token: &AccessToken,
        table: &TableRef,
        key_field: &str,
        natural_key: &str,
        fields: &Fields,
    ) -> Result<ReconciliationOutcome, SyncError> {
        match self.find_row(token, table, key_field, natural_key).await? {
            Some(record_handle) => {
                info!(%table, natural_key, record_handle = %record_handle, "Existing row found, updating");
                bounded(
                    self.request_timeout,
                    "update",
                    self.store.update_row(token, table, &record_handle, fields),
                )
                .await?
                .map_err(|e| write_error(WriteOp::Update, e))?;
                Ok(ReconciliationOutcome::Updated { record_handle })
            }
            None => {
                info!(%table, natural_key, "No existing row, creating");
                let record_handle = bounded(
                    self.request_timeout,
                    "create",
                    self.store.create_row(token, table, fields),
                )
                .await?
                .map_err(|e| write_error(WriteOp::Create, e))?;
                Ok(ReconciliationOutcome::Created { record_handle })
            }
        }
    }

    /// Handle of the first row in the search window whose key equals
    /// `natural_key` after trimming both sides.
    async fn find_row(
        &self,
        token: &AccessToken,
        table: &TableRef,
        key_field: &str,
        natural_key: &str,
    ) -> Result<Option<String>, SyncError> {
        let query = ListQuery {
            page_size: SEARCH_WINDOW,
            field_names: vec![key_field.to_string()],
        };
        let rows = bounded(
            self.request_timeout,
            "search",
            self.store.list_rows(token, table, &query),
        )
        .await?
        .map_err(|e| SyncError::Search(e.to_string()))?;

        let wanted = natural_key.trim();
        Ok(rows
            .into_iter()
            .find(|row| {
                row.text_value(key_field)
                    .is_some_and(|value| value.trim() == wanted)
            })
            .map(|row| row.record_handle))
    }
}

fn write_error(operation: WriteOp, err: StoreError) -> SyncError {
    SyncError::Write {
        operation,
        message: err.to_string(),
    }
}

fn failure_reason(err: &SyncError) -> String {
    match err {
        SyncError::Timeout { operation, .. } if *operation != "search" => {
            format!("{err}; the row may still have been written")
        }
        _ => err.to_string(),
    }
}
