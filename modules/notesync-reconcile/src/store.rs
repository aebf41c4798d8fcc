// Seams between the reconciler and the remote table.
//
// RowStore: list/create/update rows in one table.
// TokenProvider: exchange app credentials for an access token, once per action.
//
// BitableClient implements both; tests use MockRowStore / MockTokenProvider
// from `testing`.

use std::fmt;

use async_trait::async_trait;
use bitable_client::{BitableClient, BitableError, Fields, ListRecordsQuery};
use notesync_common::{Credentials, TableRef};
use serde_json::Value;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, StoreError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// The remote answered with a failure status. `message` is verbatim.
    #[error("{message} (code {code})")]
    Remote { code: i64, message: String },

    #[error("{0}")]
    Transport(String),
}

impl From<BitableError> for StoreError {
    fn from(err: BitableError) -> Self {
        match err {
            BitableError::Api { code, message } => StoreError::Remote { code, message },
            BitableError::Http { status, message } => StoreError::Remote {
                code: i64::from(status),
                message,
            },
            other => StoreError::Transport(other.to_string()),
        }
    }
}

/// Opaque bearer token, passed through to the store untouched.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken(String);

impl AccessToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AccessToken(***)")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListQuery {
    pub page_size: u32,
    /// Columns to return; empty means all.
    pub field_names: Vec<String>,
}

/// A row as returned by the store. Only the handle and the natural-key
/// column are ever inspected.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteRow {
    pub record_handle: String,
    pub fields: Fields,
}

impl RemoteRow {
    /// The value of `field` as a string, whatever cell type the table uses:
    /// plain text, a number, or rich-text segments (concatenated).
    pub fn text_value(&self, field: &str) -> Option<String> {
        cell_text(self.fields.get(field)?)
    }
}

fn cell_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Array(segments) => {
            let text: String = segments
                .iter()
                .filter_map(|segment| match segment {
                    Value::String(s) => Some(s.as_str()),
                    Value::Object(obj) => obj.get("text").and_then(Value::as_str),
                    _ => None,
                })
                .collect();
            Some(text)
        }
        _ => None,
    }
}

#[async_trait]
pub trait RowStore: Send + Sync {
    /// First page of rows, at most `query.page_size` of them.
    async fn list_rows(
        &self,
        token: &AccessToken,
        table: &TableRef,
        query: &ListQuery,
    ) -> Result<Vec<RemoteRow>>;

    /// Insert a row and return its remote-assigned handle.
    async fn create_row(&self, token: &AccessToken, table: &TableRef, fields: &Fields) -> Result<String>;

    async fn update_row(
        &self,
        token: &AccessToken,
        table: &TableRef,
        record_handle: &str,
        fields: &Fields,
    ) -> Result<()>;
}

#[async_trait]
pub trait TokenProvider: Send + Sync {
    async fn access_token(&self, credentials: &Credentials) -> Result<AccessToken>;
}

#[async_trait]
impl RowStore for BitableClient {
    async fn list_rows(
        &self,
        token: &AccessToken,
        table: &TableRef,
        query: &ListQuery,
    ) -> Result<Vec<RemoteRow>> {
        let query = ListRecordsQuery {
            page_size: query.page_size,
            field_names: query.field_names.clone(),
        };
        let page = self
            .list_records(token.as_str(), &table.app_token, &table.table_id, &query)
            .await?;
        Ok(page
            .into_items()
            .into_iter()
            .map(|record| RemoteRow {
                record_handle: record.record_id,
                fields: record.fields,
            })
            .collect())
    }

    async fn create_row(&self, token: &AccessToken, table: &TableRef, fields: &Fields) -> Result<String> {
        let record = self
            .create_record(token.as_str(), &table.app_token, &table.table_id, fields)
            .await?;
        Ok(record.record_id)
    }

    async fn update_row(
        &self,
        token: &AccessToken,
        table: &TableRef,
        record_handle: &str,
        fields: &Fields,
    ) -> Result<()> {
        self.update_record(
            token.as_str(),
            &table.app_token,
            &table.table_id,
            record_handle,
            fields,
        )
        .await?;
        Ok(())
    }
}

#[async_trait]
impl TokenProvider for BitableClient {
    async fn access_token(&self, credentials: &Credentials) -> Result<AccessToken> {
        let token = self
            .tenant_access_token(&credentials.app_id, &credentials.app_secret)
            .await?;
        Ok(AccessToken::new(token.token))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(value: Value) -> RemoteRow {
        let mut fields = Fields::new();
        fields.insert("note_id".into(), value);
        RemoteRow {
            record_handle: "rec1".into(),
            fields,
        }
    }

    #[test]
    fn key_cell_reads_text_number_and_rich_text() {
        assert_eq!(row(json!("abc")).text_value("note_id").as_deref(), Some("abc"));
        assert_eq!(row(json!(42)).text_value("note_id").as_deref(), Some("42"));
        assert_eq!(
            row(json!([{"type": "text", "text": "5f2a"}, {"type": "text", "text": "1b3c"}]))
                .text_value("note_id")
                .as_deref(),
            Some("5f2a1b3c")
        );
        assert_eq!(row(json!(null)).text_value("note_id"), None);
        assert_eq!(row(json!("abc")).text_value("other"), None);
    }

    #[test]
    fn api_errors_keep_code_and_message() {
        let err: StoreError = BitableError::Api {
            code: 91402,
            message: "NOTEXIST".into(),
        }
        .into();
        assert_eq!(
            err,
            StoreError::Remote {
                code: 91402,
                message: "NOTEXIST".into()
            }
        );
        assert_eq!(err.to_string(), "NOTEXIST (code 91402)");
    }

    #[test]
    fn transport_errors_are_stringified() {
        let err: StoreError = BitableError::Network("connection refused".into()).into();
        assert_eq!(err, StoreError::Transport("Network error: connection refused".into()));
    }

    #[test]
    fn access_token_debug_is_masked() {
        let token = AccessToken::new("t-secret");
        assert_eq!(format!("{token:?}"), "AccessToken(***)");
        assert_eq!(token.as_str(), "t-secret");
    }
}
