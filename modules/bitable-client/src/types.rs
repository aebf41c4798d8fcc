use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Column name → cell value, exactly as the Bitable API expects under `fields`.
pub type Fields = Map<String, Value>;

// --- Auth ---

#[derive(Debug, Clone, Serialize)]
pub(crate) struct TenantTokenRequest<'a> {
    pub app_id: &'a str,
    pub app_secret: &'a str,
}

/// `tenant_access_token/internal` answers with a flat body, not the `data` envelope.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct TenantTokenResponse {
    pub code: i64,
    #[serde(default)]
    pub msg: String,
    pub tenant_access_token: Option<String>,
    pub expire: Option<u64>,
}

/// A tenant access token plus its lifetime in seconds as reported by Feishu.
#[derive(Debug, Clone)]
pub struct TenantToken {
    pub token: String,
    pub expires_in_secs: u64,
}

// --- Records ---

/// Standard Open API envelope: `{ "code": 0, "msg": "success", "data": {...} }`.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ApiResponse<T> {
    pub code: i64,
    #[serde(default)]
    pub msg: String,
    pub data: Option<T>,
}

/// Query options for the list-records endpoint.
#[derive(Debug, Clone)]
pub struct ListRecordsQuery {
    pub page_size: u32,
    /// Restrict returned columns server-side. Empty means all columns.
    pub field_names: Vec<String>,
}

/// One page of records. Feishu sends `items: null` for an empty table.
#[derive(Debug, Clone, Deserialize)]
pub struct RecordPage {
    items: Option<Vec<Record>>,
    #[serde(default)]
    pub has_more: bool,
    pub page_token: Option<String>,
    pub total: Option<u64>,
}

impl RecordPage {
    pub fn into_items(self) -> Vec<Record> {
        self.items.unwrap_or_default()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Record {
    pub record_id: String,
    #[serde(default)]
    pub fields: Fields,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct RecordEnvelope {
    pub record: Record,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct RecordWrite<'a> {
    pub fields: &'a Fields,
}
