use thiserror::Error;

pub type Result<T> = std::result::Result<T, BrowserlessError>;

#[derive(Debug, Error)]
pub enum BrowserlessError {
    /// Transport failure before Browserless answered (connect, timeout, body read).
    #[error("Network error: {0}")]
    Network(String),

    /// Browserless answered with a non-2xx status. `message` is the response body.
    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    /// The render succeeded but produced no markup, usually a blocked or redirected page.
    #[error("Rendered page for {0} is empty")]
    EmptyPage(String),
}

impl From<reqwest::Error> for BrowserlessError {
    fn from(err: reqwest::Error) -> Self {
        BrowserlessError::Network(err.to_string())
    }
}
