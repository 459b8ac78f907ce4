//! Alert record sources

use crate::parse::{parse_log_content, parse_record};
use crate::record::AlertRecord;
use crate::SourceError;
use async_trait::async_trait;
use backend_client::BackendClient;
use std::borrow::Cow;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Log file written by the backend
pub const LOG_FILE_NAME: &str = "driver_monitoring.json";
/// Directory the backend may write its log into
pub const LOG_DIR_NAME: &str = "driver_monitoring_logs";

const BUNDLED_LOG: &str = include_str!("../assets/driver_monitoring.json");

const SAMPLE_EVENTS: [&str; 3] = [
    r#"{"timestamp": "2025-06-02T23:47:17.888789", "behavior_category": {"is_drowsy": false, "is_yawning": false, "is_distracted": true}, "behavior_output": "RISKY BEHAVIOR DETECTED", "mar": 0.5694, "ear": 1.0625, "pitch": 0.0, "yaw": 0.0, "roll": 0.0, "behavior_confidence": 0.7316}"#,
    r#"{"timestamp": "2025-06-02T23:47:40.483343", "behavior_category": {"is_drowsy": false, "is_yawning": true, "is_distracted": false}, "behavior_output": "RISKY BEHAVIOR DETECTED", "mar": 0.6305, "ear": 0.9623, "pitch": 87.028, "yaw": -33.4991, "roll": 102.9791, "behavior_confidence": 0.9244}"#,
    r#"{"timestamp": "2025-06-02T23:58:52.649196", "behavior_category": {"is_drowsy": true, "is_yawning": false, "is_distracted": false}, "behavior_output": "RISKY BEHAVIOR DETECTED", "mar": 0.6864, "ear": 0.8352, "pitch": 6.3078, "yaw": -1.5945, "roll": 6.6499, "behavior_confidence": 0.7217}"#,
];

/// A provider of alert records, tried in priority order by the resolver
#[async_trait]
pub trait AlertSource: Send + Sync {
    fn name(&self) -> &str;

    /// Fetch records; an empty list means "nothing here, try the next source"
    async fn fetch(&self, limit: usize) -> Result<Vec<AlertRecord>, SourceError>;
}

/// Live alert history from the backend API
pub struct ApiSource {
    client: BackendClient,
}

impl ApiSource {
    pub fn new(client: BackendClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl AlertSource for ApiSource {
    fn name(&self) -> &str {
        "api"
    }

    async fn fetch(&self, limit: usize) -> Result<Vec<AlertRecord>, SourceError> {
        let payload = self.client.alert_history(limit).await?;

        let records: Vec<_> = payload
            .alerts
            .iter()
            .enumerate()
            .filter_map(|(index, raw)| match parse_record(raw) {
                Ok(record) => Some(record),
                Err(e) => {
                    debug!(index, error = %e, "skipping alert from api");
                    None
                }
            })
            .collect();

        info!(
            received = payload.alerts.len(),
            kept = records.len(),
            total = payload.total_count,
            "alerts loaded from api"
        );
        Ok(records)
    }
}

/// Line-delimited log file found among ordered candidate paths
pub struct FileSource {
    candidates: Vec<PathBuf>,
}

impl FileSource {
    pub fn new(candidates: Vec<PathBuf>) -> Self {
        Self { candidates }
    }

    /// Usual places the backend drops its log
    pub fn default_candidates() -> Vec<PathBuf> {
        let mut roots = Vec::new();
        if let Some(home) = std::env::var_os("HOME") {
            let home = PathBuf::from(home);
            roots.push(home.join("Download"));
            roots.push(home.join("Documents"));
            roots.push(home.clone());
            roots.push(home.join("EyeDTrack"));
            roots.push(home.join(LOG_DIR_NAME));
        }
        roots.push(PathBuf::from("."));
        roots.push(PathBuf::from(LOG_DIR_NAME));

        roots.into_iter().map(|root| root.join(LOG_FILE_NAME)).collect()
    }

    pub fn candidates(&self) -> &[PathBuf] {
        &self.candidates
    }

    /// Content of the first existing, non-empty, readable candidate
    async fn read_first_available(&self) -> Option<(&Path, String)> {
        for path in &self.candidates {
            let metadata = match tokio::fs::metadata(path).await {
                Ok(metadata) => metadata,
                Err(_) => {
                    debug!(path = %path.display(), "log candidate missing");
                    continue;
                }
            };

            if !metadata.is_file() || metadata.len() == 0 {
                debug!(path = %path.display(), size = metadata.len(), "log candidate empty or not a file");
                continue;
            }

            match tokio::fs::read(path).await {
                Ok(bytes) => {
                    debug!(path = %path.display(), size = metadata.len(), "found readable log file");
                    // Invalid UTF-8 only spoils the line it sits on
                    let content = String::from_utf8_lossy(&bytes).into_owned();
                    return Some((path.as_path(), content));
                }
                Err(e) => warn!(path = %path.display(), error = %e, "log candidate unreadable"),
            }
        }
        None
    }
}

impl Default for FileSource {
    fn default() -> Self {
        Self::new(Self::default_candidates())
    }
}

#[async_trait]
impl AlertSource for FileSource {
    fn name(&self) -> &str {
        "file"
    }

    async fn fetch(&self, _limit: usize) -> Result<Vec<AlertRecord>, SourceError> {
        let (path, content) = self
            .read_first_available()
            .await
            .ok_or(SourceError::NoLogFile(self.candidates.len()))?;

        let records = parse_log_content(&content);
        info!(path = %path.display(), count = records.len(), "alerts loaded from log file");
        Ok(records)
    }
}

/// Dataset packaged with the application
pub struct BundledSource {
    content: Cow<'static, str>,
}

impl BundledSource {
    pub fn new() -> Self {
        Self {
            content: Cow::Borrowed(BUNDLED_LOG),
        }
    }

    /// Use other content in place of the packaged dataset
    pub fn with_content(content: impl Into<Cow<'static, str>>) -> Self {
        Self {
            content: content.into(),
        }
    }
}

impl Default for BundledSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AlertSource for BundledSource {
    fn name(&self) -> &str {
        "bundled"
    }

    async fn fetch(&self, _limit: usize) -> Result<Vec<AlertRecord>, SourceError> {
        Ok(parse_log_content(&self.content))
    }
}

/// Fixed example events, the last resort
#[derive(Debug, Default)]
pub struct SampleSource;

#[async_trait]
impl AlertSource for SampleSource {
    fn name(&self) -> &str {
        "sample"
    }

    async fn fetch(&self, _limit: usize) -> Result<Vec<AlertRecord>, SourceError> {
        Ok(parse_log_content(&SAMPLE_EVENTS.join("\n")))
    }
}
