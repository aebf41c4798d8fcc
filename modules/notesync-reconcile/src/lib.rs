//! Natural-key upsert of extracted notes into a Bitable table.
//!
//! [`Reconciler`] searches a bounded window of remote rows for the note's key
//! and issues exactly one write: an update when the key is found, a create
//! otherwise. [`Workflow`] wraps one user action end to end (extract, token,
//! reconcile) and reports progress through [`WorkflowState`] events.

pub mod fields;
pub mod reconciler;
pub mod store;
pub mod workflow;

#[cfg(any(test, feature = "test-support"))]
pub mod testing;

pub use fields::to_fields;
pub use reconciler::{Reconciler, SEARCH_WINDOW};
pub use store::{AccessToken, ListQuery, RemoteRow, RowStore, StoreError, TokenProvider};
pub use workflow::Workflow;

pub use notesync_common::{Annotations, ReconciliationOutcome, SyncError, TableRef, WorkflowState};
