use thiserror::Error;

pub type Result<T> = std::result::Result<T, BitableError>;

#[derive(Debug, Error)]
pub enum BitableError {
    #[error("Network error: {0}")]
    Network(String),

    /// The Open API answered with a non-zero `code`. `message` is the remote `msg` verbatim.
    #[error("API error (code {code}): {message}")]
    Api { code: i64, message: String },

    #[error("HTTP error (status {status}): {message}")]
    Http { status: u16, message: String },

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Response is missing `{0}`")]
    MissingField(&'static str),
}

impl From<reqwest::Error> for BitableError {
    fn from(err: reqwest::Error) -> Self {
        BitableError::Network(err.to_string())
    }
}

impl From<serde_json::Error> for BitableError {
    fn from(err: serde_json::Error) -> Self {
        BitableError::Parse(err.to_string())
    }
}
