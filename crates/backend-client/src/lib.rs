//! Inference Backend Client
//!
//! REST client for the driver behavior backend:
//! - latest behavior flags for live alerting
//! - alert history for the history screen
//! - health checks and camera frame submission
//!
//! Every call walks an ordered list of candidate base URLs and returns the
//! first successful answer.

mod client;
mod types;

pub use client::{BackendClient, ClientConfig, DEFAULT_BASE_URLS};
pub use types::{AlertHistoryPayload, FrameMetrics, HealthResponse, ProcessingResponse};

use thiserror::Error;

/// Backend client error types
#[derive(Error, Debug)]
pub enum ClientError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Unexpected status code: {0}")]
    Status(u16),

    #[error("Backend reported failure: {0}")]
    Unsuccessful(String),

    #[error("Malformed response: {0}")]
    Decode(String),

    #[error("All candidate endpoints failed")]
    AllCandidatesFailed,

    #[error("No candidate base URLs configured")]
    NoCandidates,
}
