pub mod error;

pub use error::{BrowserlessError, Result};

use std::time::Duration;

use serde::Serialize;

/// How long Browserless may wait for the ready selector before giving up, in ms.
const DEFAULT_SELECTOR_TIMEOUT_MS: u64 = 15_000;

pub struct BrowserlessClient {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

/// A page snapshot taken after client-side rendering finished.
#[derive(Debug, Clone)]
pub struct RenderedPage {
    pub url: String,
    pub html: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ContentRequest<'a> {
    url: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    wait_for_selector: Option<WaitForSelector<'a>>,
    goto_options: GotoOptions,
}

#[derive(Debug, Serialize)]
struct WaitForSelector<'a> {
    selector: &'a str,
    timeout: u64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GotoOptions {
    wait_until: &'static str,
}

impl BrowserlessClient {
    pub fn new(base_url: &str, token: Option<&str>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(45))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.map(String::from),
        })
    }

    /// Render `url` in headless Chrome and return the DOM once `ready_selector`
    /// is present (or immediately after network idle when `None`).
    pub async fn render(&self, url: &str, ready_selector: Option<&str>) -> Result<RenderedPage> {
        let mut endpoint = format!("{}/content", self.base_url);
        if let Some(ref token) = self.token {
            endpoint.push_str(&format!("?token={token}"));
        }

        let body = ContentRequest {
            url,
            wait_for_selector: ready_selector.map(|selector| WaitForSelector {
                selector,
                timeout: DEFAULT_SELECTOR_TIMEOUT_MS,
            }),
            goto_options: GotoOptions {
                wait_until: "networkidle2",
            },
        };

        tracing::info!(url, ready_selector, "Rendering page via Browserless");
        let resp = self.client.post(&endpoint).json(&body).send().await?;

        let status = resp.status();
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(BrowserlessError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let html = resp.text().await?;
        if html.trim().is_empty() {
            return Err(BrowserlessError::EmptyPage(url.to_string()));
        }

        tracing::debug!(url, bytes = html.len(), "Rendered page");
        Ok(RenderedPage {
            url: url.to_string(),
            html,
        })
    }
}
