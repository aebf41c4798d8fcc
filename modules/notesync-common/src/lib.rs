pub mod config;
pub mod error;
pub mod types;

pub use config::{BrowserlessConfig, Config, Credentials};
pub use error::{ExtractionError, SyncError, WriteOp};
pub use types::*;
