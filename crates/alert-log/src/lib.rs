//! Alert History
//!
//! Normalized alert records resolved from a prioritized chain of sources:
//! the backend API, a local log file, the bundled dataset, and built-in
//! sample events.

mod parse;
mod record;
mod resolver;
mod source;

pub use parse::{parse_line, parse_log_content, parse_record, RISKY_OUTPUT};
pub use record::{alert_type_label, reason_text, AlertRecord};
pub use resolver::AlertLogResolver;
pub use source::{
    AlertSource, ApiSource, BundledSource, FileSource, SampleSource, LOG_DIR_NAME, LOG_FILE_NAME,
};

use backend_client::ClientError;
use thiserror::Error;

/// Errors while turning one raw event into an [`AlertRecord`]
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Record is not a JSON object")]
    NotAnObject,

    #[error("Not a risky behavior event: {0:?}")]
    NotRisky(String),

    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("Malformed timestamp: {0}")]
    MalformedTimestamp(String),
}

/// Errors from a single alert source
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("Backend error: {0}")]
    Backend(#[from] ClientError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("No readable log file among {0} candidates")]
    NoLogFile(usize),
}
