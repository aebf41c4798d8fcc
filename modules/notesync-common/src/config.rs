use std::env;
use std::fmt;
use std::time::Duration;

use url::Url;

use crate::error::SyncError;
use crate::types::TableRef;

pub const DEFAULT_API_BASE: &str = "https://open.feishu.cn/open-apis";
pub const DEFAULT_KEY_FIELD: &str = "note_id";
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Feishu app credentials, exchanged for a tenant token once per action.
#[derive(Clone)]
pub struct Credentials {
    pub app_id: String,
    pub app_secret: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("app_id", &self.app_id)
            .field("app_secret", &"***")
            .finish()
    }
}

#[derive(Clone)]
pub struct BrowserlessConfig {
    pub base_url: String,
    pub token: Option<String>,
}

impl BrowserlessConfig {
    /// `None` when `BROWSERLESS_URL` is unset.
    pub fn from_env() -> Option<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Option<Self> {
        Some(Self {
            base_url: non_blank(lookup("BROWSERLESS_URL"))?,
            token: non_blank(lookup("BROWSERLESS_TOKEN")),
        })
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

impl fmt::Debug for BrowserlessConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BrowserlessConfig")
            .field("base_url", &self.base_url)
            .field("token", &self.token.as_ref().map(|_| "***"))
            .finish()
    }
}

/// Application configuration loaded from environment variables.
/// Read once at workflow start; never written back.
#[derive(Debug, Clone)]
pub struct Config {
    pub credentials: Credentials,
    pub table: TableRef,
    pub api_base: String,
    /// Column holding the natural key in the remote table.
    pub key_field: String,
    /// Upper bound for each remote call (token, search, write).
    pub request_timeout: Duration,
    pub browserless: Option<BrowserlessConfig>,
}

impl Config {
    pub fn from_env() -> Result<Self, SyncError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from an arbitrary key lookup. Blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, SyncError> {
        let get = |key: &str| non_blank(lookup(key));
        let required = |key: &str| {
            get(key).ok_or_else(|| SyncError::Config(format!("{key} environment variable is required")))
        };

        let table_url = required("BITABLE_TABLE_URL")?;
        let table = parse_table_url(&table_url)?;

        let request_timeout_secs = match get("NOTESYNC_REQUEST_TIMEOUT_SECS") {
            Some(raw) => raw.parse::<u64>().ok().filter(|secs| *secs > 0).ok_or_else(|| {
                SyncError::Config(format!(
                    "NOTESYNC_REQUEST_TIMEOUT_SECS must be a positive integer, got '{raw}'"
                ))
            })?,
            None => DEFAULT_REQUEST_TIMEOUT_SECS,
        };

        Ok(Self {
            credentials: Credentials {
                app_id: required("FEISHU_APP_ID")?,
                app_secret: required("FEISHU_APP_SECRET")?,
            },
            table,
            api_base: get("FEISHU_API_BASE").unwrap_or_else(|| DEFAULT_API_BASE.to_string()),
            key_field: get("NOTESYNC_KEY_FIELD").unwrap_or_else(|| DEFAULT_KEY_FIELD.to_string()),
            request_timeout: Duration::from_secs(request_timeout_secs),
            browserless: BrowserlessConfig::from_lookup(&lookup),
        })
    }

    /// Log the effective configuration with secrets masked.
    pub fn log_redacted(&self) {
        tracing::info!(
            app_id = %self.credentials.app_id,
            table = %self.table,
            api_base = %self.api_base,
            key_field = %self.key_field,
            request_timeout_secs = self.request_timeout.as_secs(),
            browserless = self.browserless.as_ref().map(|b| b.base_url.as_str()).unwrap_or("-"),
            "Loaded configuration"
        );
    }
}

/// Split a Bitable table URL into app token (last path segment) and table id
/// (`table` query parameter), e.g. `https://x.feishu.cn/base/bascnAbc?table=tblXyz&view=vew1`.
pub fn parse_table_url(raw: &str) -> Result<TableRef, SyncError> {
    let invalid = |why: &str| SyncError::Config(format!("Invalid table URL '{raw}': {why}"));

    let url = Url::parse(raw).map_err(|e| invalid(&e.to_string()))?;

    let app_token = url
        .path_segments()
        .and_then(|mut segments| segments.next_back())
        .filter(|segment| !segment.is_empty())
        .ok_or_else(|| invalid("no app token in path"))?
        .to_string();

    let table_id = url
        .query_pairs()
        .find(|(key, _)| key == "table")
        .map(|(_, value)| value.into_owned())
        .filter(|value| !value.is_empty())
        .ok_or_else(|| invalid("missing `table` query parameter"))?;

    Ok(TableRef { app_token, table_id })
}
