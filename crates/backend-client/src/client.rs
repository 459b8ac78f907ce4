//! Backend client with ordered candidate fallback

use crate::types::{
    AlertHistoryPayload, AlertHistoryResponse, FrameRequest, HealthResponse, LatestBehaviorResponse,
    ProcessingResponse,
};
use crate::ClientError;
use alerting::BehaviorFlags;
use base64::{engine::general_purpose::STANDARD, Engine};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Candidate base URLs tried when none are configured
pub const DEFAULT_BASE_URLS: [&str; 3] = [
    "http://127.0.0.1:5000",
    "http://localhost:5000",
    "http://10.0.2.2:5000",
];

/// Backend client configuration
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URLs in the order they are tried
    pub base_urls: Vec<String>,
    /// Timeout for a latest-behavior poll
    pub behavior_timeout: Duration,
    /// Timeout for an alert history request
    pub history_timeout: Duration,
    /// Timeout for health checks and frame uploads
    pub request_timeout: Duration,
    /// Pause between behavior poll candidates
    pub behavior_retry_pause: Duration,
    /// Pause between history candidates
    pub history_retry_pause: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_urls: DEFAULT_BASE_URLS.iter().map(|s| s.to_string()).collect(),
            behavior_timeout: Duration::from_secs(3),
            history_timeout: Duration::from_secs(5),
            request_timeout: Duration::from_secs(10),
            behavior_retry_pause: Duration::from_millis(50),
            history_retry_pause: Duration::from_millis(100),
        }
    }
}

/// REST client for the inference backend
#[derive(Debug, Clone)]
pub struct BackendClient {
    http: reqwest::Client,
    config: ClientConfig,
}

impl BackendClient {
    pub fn new(config: ClientConfig) -> Result<Self, ClientError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let http = reqwest::Client::builder()
            .user_agent(concat!("EyeDTrack/", env!("CARGO_PKG_VERSION")))
            .default_headers(headers)
            .build()?;

        info!(candidates = ?config.base_urls, "backend client created");
        Ok(Self { http, config })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Latest behavior flags from the first responsive candidate
    pub async fn latest_behavior(&self) -> Result<BehaviorFlags, ClientError> {
        self.first_success("latest_behavior", self.config.behavior_retry_pause, |base| {
            self.fetch_latest_behavior(base)
        })
        .await
    }

    async fn fetch_latest_behavior(&self, base: String) -> Result<BehaviorFlags, ClientError> {
        let url = endpoint(&base, "api/latest_behavior");
        let response: LatestBehaviorResponse = self.get_json(&url, self.config.behavior_timeout).await?;

        if !response.success {
            return Err(ClientError::Unsuccessful(
                response.error.unwrap_or_else(|| "Unknown error".to_string()),
            ));
        }

        let flags = response
            .behavior_category
            .ok_or_else(|| ClientError::Decode("missing behavior_category".to_string()))?;

        if flags.any() {
            info!(
                base = %base,
                is_drowsy = flags.is_drowsy,
                is_yawning = flags.is_yawning,
                is_distracted = flags.is_distracted,
                "risky behavior reported"
            );
        }
        Ok(flags)
    }

    /// Recent alert records from the first candidate returning a records array
    pub async fn alert_history(&self, limit: usize) -> Result<AlertHistoryPayload, ClientError> {
        self.first_success("alert_history", self.config.history_retry_pause, |base| {
            self.fetch_alert_history(base, limit)
        })
        .await
    }

    async fn fetch_alert_history(&self, base: String, limit: usize) -> Result<AlertHistoryPayload, ClientError> {
        let url = format!("{}?limit={}", endpoint(&base, "api/alert_history"), limit);
        let response: AlertHistoryResponse = self.get_json(&url, self.config.history_timeout).await?;

        if !response.success {
            return Err(ClientError::Unsuccessful(
                response.error.unwrap_or_else(|| "Unknown error".to_string()),
            ));
        }

        let alerts = response
            .alerts
            .ok_or_else(|| ClientError::Decode("missing alerts array".to_string()))?;

        debug!(
            base = %base,
            returned = response.returned_count,
            total = response.total_count,
            latest = response.latest_timestamp.as_deref().unwrap_or("unknown"),
            "alert history received"
        );

        Ok(AlertHistoryPayload {
            alerts,
            total_count: response.total_count,
            returned_count: response.returned_count,
            latest_timestamp: response.latest_timestamp,
        })
    }

    /// Backend health from the first candidate answering with a 2xx status
    pub async fn health(&self) -> Result<HealthResponse, ClientError> {
        self.first_success("health", Duration::ZERO, |base| self.fetch_health(base))
            .await
    }

    async fn fetch_health(&self, base: String) -> Result<HealthResponse, ClientError> {
        let response = self
            .http
            .get(endpoint(&base, "api/health"))
            .timeout(self.config.request_timeout)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ClientError::Status(status.as_u16()));
        }

        // An empty or non-JSON body still counts as healthy.
        let body = response.text().await?;
        Ok(serde_json::from_str(&body).unwrap_or_default())
    }

    /// Poll `health` up to `attempts` times, pausing between attempts
    pub async fn wait_for_health(&self, attempts: u32, pause: Duration) -> bool {
        for attempt in 1..=attempts {
            match self.health().await {
                Ok(health) => {
                    info!(attempt, status = %health.status, "backend healthy");
                    return true;
                }
                Err(e) => warn!(attempt, attempts, error = %e, "backend health check failed"),
            }
            if attempt < attempts {
                tokio::time::sleep(pause).await;
            }
        }
        warn!("all backend health checks failed");
        false
    }

    /// Submit one encoded camera frame for behavior inference
    pub async fn process_frame(&self, jpeg: &[u8]) -> Result<ProcessingResponse, ClientError> {
        let encoded = STANDARD.encode(jpeg);
        let timestamp = chrono::Utc::now().timestamp_millis();

        self.first_success("process_frame", Duration::ZERO, |base| {
            self.post_frame(base, &encoded, timestamp)
        })
        .await
    }

    async fn post_frame(&self, base: String, frame: &str, timestamp: i64) -> Result<ProcessingResponse, ClientError> {
        let response = self
            .http
            .post(endpoint(&base, "api/process_frame"))
            .timeout(self.config.request_timeout)
            .json(&FrameRequest { frame, timestamp })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ClientError::Status(status.as_u16()));
        }

        response
            .json::<ProcessingResponse>()
            .await
            .map_err(|e| ClientError::Decode(e.to_string()))
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str, timeout: Duration) -> Result<T, ClientError> {
        debug!(url, "GET");
        let response = self.http.get(url).timeout(timeout).send().await?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(ClientError::Status(status.as_u16()));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| ClientError::Decode(e.to_string()))
    }

    async fn first_success<T, F, Fut>(&self, op: &'static str, pause: Duration, mut attempt: F) -> Result<T, ClientError>
    where
        F: FnMut(String) -> Fut,
        Fut: Future<Output = Result<T, ClientError>>,
    {
        let total = self.config.base_urls.len();
        if total == 0 {
            return Err(ClientError::NoCandidates);
        }

        for (index, base) in self.config.base_urls.iter().enumerate() {
            debug!(op, candidate = index + 1, total, base = %base, "trying backend candidate");
            match attempt(base.clone()).await {
                Ok(value) => return Ok(value),
                Err(e) => warn!(op, base = %base, error = %e, "backend candidate failed"),
            }

            if index + 1 < total && !pause.is_zero() {
                tokio::time::sleep(pause).await;
            }
        }

        Err(ClientError::AllCandidatesFailed)
    }
}

fn endpoint(base: &str, path: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), path)
}
