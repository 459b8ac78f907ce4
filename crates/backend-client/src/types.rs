//! Wire types for the backend REST API

use alerting::BehaviorFlags;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// `GET /api/latest_behavior`
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct LatestBehaviorResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub behavior_category: Option<BehaviorFlags>,
    #[serde(default)]
    pub error: Option<String>,
}

/// `GET /api/alert_history`
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct AlertHistoryResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub alerts: Option<Vec<Value>>,
    #[serde(default)]
    pub total_count: u64,
    #[serde(default)]
    pub returned_count: u64,
    #[serde(default)]
    pub latest_timestamp: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

/// Successful alert history answer.
///
/// Records stay raw so callers can parse and skip them one by one.
#[derive(Debug, Clone)]
pub struct AlertHistoryPayload {
    pub alerts: Vec<Value>,
    pub total_count: u64,
    pub returned_count: u64,
    pub latest_timestamp: Option<String>,
}

/// `GET /api/health`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HealthResponse {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub timestamp: String,
}

/// Body of `POST /api/process_frame`
#[derive(Debug, Serialize)]
pub(crate) struct FrameRequest<'a> {
    /// Base64-encoded JPEG
    pub frame: &'a str,
    /// Capture time, unix millis
    pub timestamp: i64,
}

/// Per-frame facial metrics
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FrameMetrics {
    #[serde(default)]
    pub ear: f64,
    #[serde(default)]
    pub mar: f64,
    #[serde(default)]
    pub head_pose: Option<Vec<f64>>,
}

/// Answer to a processed frame
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProcessingResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub timestamp: String,
    #[serde(default)]
    pub session_id: String,
    #[serde(default)]
    pub behaviors: Vec<String>,
    #[serde(default)]
    pub metrics: FrameMetrics,
    #[serde(default)]
    pub error: Option<String>,
}
