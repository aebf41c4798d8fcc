pub mod error;
pub mod types;

pub use error::{BitableError, Result};
pub use types::{Fields, ListRecordsQuery, Record, RecordPage, TenantToken};

use std::time::Duration;

use serde::de::DeserializeOwned;
use types::{ApiResponse, RecordEnvelope, RecordWrite, TenantTokenRequest, TenantTokenResponse};

pub const DEFAULT_BASE_URL: &str = "https://open.feishu.cn/open-apis";

/// Transport-level ceiling for a single request.
const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Longest slice of an unparseable error body carried into `BitableError::Http`.
const MAX_ERROR_BODY: usize = 500;

pub struct BitableClient {
    client: reqwest::Client,
    base_url: String,
}

impl BitableClient {
    pub fn new(base_url: &str) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(HTTP_TIMEOUT).build()?;
        Ok(Self::with_client(client, base_url))
    }

    pub fn with_client(client: reqwest::Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Exchange app credentials for a tenant access token.
    pub async fn tenant_access_token(&self, app_id: &str, app_secret: &str) -> Result<TenantToken> {
        let url = format!("{}/auth/v3/tenant_access_token/internal", self.base_url);
        tracing::debug!(app_id, "Requesting tenant access token");

        let resp = self
            .client
            .post(&url)
            .json(&TenantTokenRequest { app_id, app_secret })
            .send()
            .await?;

        let status = resp.status().as_u16();
        let body = resp.text().await?;
        parse_token_response(status, &body)
    }

    /// Fetch the first page of records for a table.
    pub async fn list_records(
        &self,
        access_token: &str,
        app_token: &str,
        table_id: &str,
        query: &ListRecordsQuery,
    ) -> Result<RecordPage> {
        let url = self.records_url(app_token, table_id);

        let mut params = vec![("page_size", query.page_size.to_string())];
        if !query.field_names.is_empty() {
            params.push(("field_names", serde_json::to_string(&query.field_names)?));
        }

        tracing::debug!(table_id, page_size = query.page_size, "Listing records");
        let resp = self
            .client
            .get(&url)
            .bearer_auth(access_token)
            .query(&params)
            .send()
            .await?;

        let status = resp.status().as_u16();
        let body = resp.text().await?;
        parse_envelope(status, &body)
    }

    /// Insert one record. Returns the created record with its remote `record_id`.
    pub async fn create_record(
        &self,
        access_token: &str,
        app_token: &str,
        table_id: &str,
        fields: &Fields,
    ) -> Result<Record> {
        let url = self.records_url(app_token, table_id);

        tracing::debug!(table_id, columns = fields.len(), "Creating record");
        let resp = self
            .client
            .post(&url)
            .bearer_auth(access_token)
            .json(&RecordWrite { fields })
            .send()
            .await?;

        let status = resp.status().as_u16();
        let body = resp.text().await?;
        let envelope: RecordEnvelope = parse_envelope(status, &body)?;
        Ok(envelope.record)
    }

    /// Overwrite the given columns of an existing record.
    pub async fn update_record(
        &self,
        access_token: &str,
        app_token: &str,
        table_id: &str,
        record_id: &str,
        fields: &Fields,
    ) -> Result<Record> {
        let url = format!("{}/{}", self.records_url(app_token, table_id), record_id);

        tracing::debug!(table_id, record_id, columns = fields.len(), "Updating record");
        let resp = self
            .client
            .put(&url)
            .bearer_auth(access_token)
            .json(&RecordWrite { fields })
            .send()
            .await?;

        let status = resp.status().as_u16();
        let body = resp.text().await?;
        let envelope: RecordEnvelope = parse_envelope(status, &body)?;
        Ok(envelope.record)
    }

    fn records_url(&self, app_token: &str, table_id: &str) -> String {
        format!(
            "{}/bitable/v1/apps/{}/tables/{}/records",
            self.base_url, app_token, table_id
        )
    }
}

fn is_success(status: u16) -> bool {
    (200..300).contains(&status)
}

fn truncated(body: &str) -> String {
    body.chars().take(MAX_ERROR_BODY).collect()
}

/// Decode an Open API envelope. A non-zero `code` wins over the HTTP status
/// because Feishu reports most failures with both.
fn parse_envelope<T: DeserializeOwned>(status: u16, body: &str) -> Result<T> {
    match serde_json::from_str::<ApiResponse<T>>(body) {
        Ok(envelope) if envelope.code != 0 => Err(BitableError::Api {
            code: envelope.code,
            message: envelope.msg,
        }),
        Ok(_) | Err(_) if !is_success(status) => Err(BitableError::Http {
            status,
            message: truncated(body),
        }),
        Ok(envelope) => envelope.data.ok_or(BitableError::MissingField("data")),
        Err(err) => Err(err.into()),
    }
}

fn parse_token_response(status: u16, body: &str) -> Result<TenantToken> {
    match serde_json::from_str::<TenantTokenResponse>(body) {
        Ok(resp) if resp.code != 0 => Err(BitableError::Api {
            code: resp.code,
            message: resp.msg,
        }),
        Ok(_) | Err(_) if !is_success(status) => Err(BitableError::Http {
            status,
            message: truncated(body),
        }),
        Ok(resp) => {
            let token = resp
                .tenant_access_token
                .filter(|t| !t.is_empty())
                .ok_or(BitableError::MissingField("tenant_access_token"))?;
            Ok(TenantToken {
                token,
                expires_in_secs: resp.expire.unwrap_or(0),
            })
        }
        Err(err) => Err(err.into()),
    }
}
