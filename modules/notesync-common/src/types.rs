use std::fmt;

use serde::{Deserialize, Serialize};

/// Prefix of the synthetic id used when no note id can be derived from the URL.
/// Records carrying it can never be matched by a later run.
pub const SYNTHETIC_ID_PREFIX: &str = "unknown_";

// --- Extraction output ---

/// Normalized output of one extraction pass over a note page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedRecord {
    /// Natural key: the note's 24-hex-char id, or `unknown_<epoch millis>`.
    pub id: String,
    pub source_url: String,
    pub author: String,
    pub title: String,
    pub body: String,
    /// Document order.
    pub tags: Vec<String>,
    /// `YYYY-MM-DD HH:MM:SS`, or empty when the page carried no usable date.
    pub timestamp: String,
    /// Unique URLs in first-seen order.
    pub images: Vec<String>,
    pub likes: u64,
    pub collects: u64,
    pub comments: u64,
}

impl ExtractedRecord {
    /// False when the id is the synthetic fallback and cannot be deduplicated.
    pub fn has_stable_id(&self) -> bool {
        !self.id.starts_with(SYNTHETIC_ID_PREFIX)
    }
}

/// Free-text columns supplied by the user at write time, never extracted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Annotations {
    pub note: String,
    pub keywords: String,
}

// --- Remote table ---

/// Identifies one table inside a Bitable app.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableRef {
    pub app_token: String,
    pub table_id: String,
}

impl fmt::Display for TableRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.app_token, self.table_id)
    }
}

// --- Reconciliation ---

/// Terminal result of one reconciliation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ReconciliationOutcome {
    Created { record_handle: String },
    Updated { record_handle: String },
    Failed { reason: String },
}

impl ReconciliationOutcome {
    pub fn is_success(&self) -> bool {
        !matches!(self, ReconciliationOutcome::Failed { .. })
    }

    pub fn record_handle(&self) -> Option<&str> {
        match self {
            ReconciliationOutcome::Created { record_handle }
            | ReconciliationOutcome::Updated { record_handle } => Some(record_handle),
            ReconciliationOutcome::Failed { .. } => None,
        }
    }

    /// One-line message for the end user.
    pub fn message(&self) -> String {
        match self {
            ReconciliationOutcome::Created { record_handle } => {
                format!("New record written ({record_handle})")
            }
            ReconciliationOutcome::Updated { record_handle } => {
                format!("Existing record updated to latest ({record_handle})")
            }
            ReconciliationOutcome::Failed { reason } => format!("Sync failed: {reason}"),
        }
    }
}

impl fmt::Display for ReconciliationOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message())
    }
}

/// Caller-visible progress of one collect-and-sync action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkflowState {
    /// Before the first action; never emitted as a transition.
    Idle,
    Collecting,
    Reconciling,
    Done(ReconciliationOutcome),
    Error(String),
}

impl WorkflowState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, WorkflowState::Done(_) | WorkflowState::Error(_))
    }
}
