// Test mocks for the reconcile seams.
//
// - MockRowStore (RowStore): stateful in-memory table with scripted failures
// - MockTokenProvider (TokenProvider): fixed token, optional failure/delay
//
// Both record every call so tests can assert on what reached the remote.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use bitable_client::Fields;
use notesync_common::{Credentials, TableRef};
use serde_json::json;

use crate::store::{AccessToken, ListQuery, RemoteRow, Result, RowStore, StoreError, TokenProvider};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

pub fn test_table() -> TableRef {
    TableRef {
        app_token: "bascnTestApp".into(),
        table_id: "tblTest".into(),
    }
}

pub fn test_credentials() -> Credentials {
    Credentials {
        app_id: "cli_test".into(),
        app_secret: "secret".into(),
    }
}

/// A row holding only the natural-key column.
pub fn key_row(record_handle: &str, key_field: &str, key: &str) -> RemoteRow {
    let mut fields = Fields::new();
    fields.insert(key_field.to_string(), json!(key));
    RemoteRow {
        record_handle: record_handle.to_string(),
        fields,
    }
}

/// How a scripted call misbehaves.
#[derive(Debug, Clone)]
enum Fault {
    Fail(StoreError),
    Hang,
}

impl Fault {
    async fn trigger(&self) -> StoreError {
        match self {
            Fault::Fail(err) => err.clone(),
            Fault::Hang => std::future::pending().await,
        }
    }
}

// ---------------------------------------------------------------------------
// MockRowStore
// ---------------------------------------------------------------------------

/// In-memory table. `list_rows` honors `page_size`, so rows past the search
/// window stay invisible exactly as they do remotely. Created rows are
/// appended and visible to later searches.
pub struct MockRowStore {
    rows: Mutex<Vec<RemoteRow>>,
    list_fault: Option<Fault>,
    create_fault: Option<Fault>,
    update_fault: Option<Fault>,
    list_queries: Mutex<Vec<ListQuery>>,
    created: Mutex<Vec<Fields>>,
    updated: Mutex<Vec<(String, Fields)>>,
    next_handle: AtomicUsize,
}

impl Default for MockRowStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MockRowStore {
    pub fn new() -> Self {
        Self {
            rows: Mutex::new(Vec::new()),
            list_fault: None,
            create_fault: None,
            update_fault: None,
            list_queries: Mutex::new(Vec::new()),
            created: Mutex::new(Vec::new()),
            updated: Mutex::new(Vec::new()),
            next_handle: AtomicUsize::new(1),
        }
    }

    pub fn with_row(self, row: RemoteRow) -> Self {
        self.rows.lock().unwrap().push(row);
        self
    }

    /// `count` filler rows whose keys never match a real note id.
    pub fn with_filler_rows(self, key_field: &str, count: usize) -> Self {
        {
            let mut rows = self.rows.lock().unwrap();
            for i in 0..count {
                rows.push(key_row(&format!("recFiller{i}"), key_field, &format!("filler_{i}")));
            }
        }
        self
    }

    pub fn fail_list(mut self, code: i64, message: &str) -> Self {
        self.list_fault = Some(Fault::Fail(remote(code, message)));
        self
    }

    pub fn fail_create(mut self, code: i64, message: &str) -> Self {
        self.create_fault = Some(Fault::Fail(remote(code, message)));
        self
    }

    pub fn fail_update(mut self, code: i64, message: &str) -> Self {
        self.update_fault = Some(Fault::Fail(remote(code, message)));
        self
    }

    pub fn hang_list(mut self) -> Self {
        self.list_fault = Some(Fault::Hang);
        self
    }

    pub fn hang_create(mut self) -> Self {
        self.create_fault = Some(Fault::Hang);
        self
    }

    pub fn hang_update(mut self) -> Self {
        self.update_fault = Some(Fault::Hang);
        self
    }

    // --- Assertions ---

    pub fn list_calls(&self) -> usize {
        self.list_queries.lock().unwrap().len()
    }

    pub fn last_list_query(&self) -> Option<ListQuery> {
        self.list_queries.lock().unwrap().last().cloned()
    }

    pub fn created(&self) -> Vec<Fields> {
        self.created.lock().unwrap().clone()
    }

    pub fn updated(&self) -> Vec<(String, Fields)> {
        self.updated.lock().unwrap().clone()
    }

    pub fn write_calls(&self) -> usize {
        self.created.lock().unwrap().len() + self.updated.lock().unwrap().len()
    }

    pub fn row_count(&self) -> usize {
        self.rows.lock().unwrap().len()
    }
}

fn remote(code: i64, message: &str) -> StoreError {
    StoreError::Remote {
        code,
        message: message.to_string(),
    }
}

#[async_trait]
impl RowStore for MockRowStore {
    async fn list_rows(
        &self,
        _token: &AccessToken,
        _table: &TableRef,
        query: &ListQuery,
    ) -> Result<Vec<RemoteRow>> {
        self.list_queries.lock().unwrap().push(query.clone());
        if let Some(fault) = &self.list_fault {
            return Err(fault.trigger().await);
        }
        let rows = self.rows.lock().unwrap();
        Ok(rows.iter().take(query.page_size as usize).cloned().collect())
    }

    async fn create_row(&self, _token: &AccessToken, _table: &TableRef, fields: &Fields) -> Result<String> {
        self.created.lock().unwrap().push(fields.clone());
        if let Some(fault) = &self.create_fault {
            return Err(fault.trigger().await);
        }
        let handle = format!("recNew{}", self.next_handle.fetch_add(1, Ordering::SeqCst));
        self.rows.lock().unwrap().push(RemoteRow {
            record_handle: handle.clone(),
            fields: fields.clone(),
        });
        Ok(handle)
    }

    async fn update_row(
        &self,
        _token: &AccessToken,
        _table: &TableRef,
        record_handle: &str,
        fields: &Fields,
    ) -> Result<()> {
        self.updated
            .lock()
            .unwrap()
            .push((record_handle.to_string(), fields.clone()));
        if let Some(fault) = &self.update_fault {
            return Err(fault.trigger().await);
        }
        let mut rows = self.rows.lock().unwrap();
        match rows.iter_mut().find(|row| row.record_handle == record_handle) {
            Some(row) => {
                row.fields = fields.clone();
                Ok(())
            }
            None => Err(remote(1254043, "RecordIdNotFound")),
        }
    }
}

// ---------------------------------------------------------------------------
// MockTokenProvider
// ---------------------------------------------------------------------------

pub struct MockTokenProvider {
    token: String,
    failure: Option<StoreError>,
    delay: Option<Duration>,
    calls: AtomicUsize,
}

impl Default for MockTokenProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl MockTokenProvider {
    pub fn new() -> Self {
        Self {
            token: "t-mock-token".into(),
            failure: None,
            delay: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing(code: i64, message: &str) -> Self {
        Self {
            failure: Some(remote(code, message)),
            ..Self::new()
        }
    }

    /// Sleep before answering, to hold a workflow in flight.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TokenProvider for MockTokenProvider {
    async fn access_token(&self, _credentials: &Credentials) -> Result<AccessToken> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        match &self.failure {
            Some(err) => Err(err.clone()),
            None => Ok(AccessToken::new(self.token.clone())),
        }
    }
}
