//! Prioritized alert source resolution

use crate::record::AlertRecord;
use crate::source::{AlertSource, ApiSource, BundledSource, FileSource, SampleSource};
use backend_client::BackendClient;
use std::cmp::Reverse;
use std::path::PathBuf;
use tracing::{debug, info, warn};

/// Tries alert sources in order and returns the first non-empty result,
/// newest first. Never fails; the worst case is an empty list.
pub struct AlertLogResolver {
    sources: Vec<Box<dyn AlertSource>>,
}

impl AlertLogResolver {
    pub fn new(sources: Vec<Box<dyn AlertSource>>) -> Self {
        Self { sources }
    }

    /// API, then log file candidates, then bundled dataset, then samples
    pub fn standard(client: BackendClient, log_paths: Vec<PathBuf>) -> Self {
        let file = if log_paths.is_empty() {
            FileSource::default()
        } else {
            FileSource::new(log_paths)
        };

        Self::new(vec![
            Box::new(ApiSource::new(client)),
            Box::new(file),
            Box::new(BundledSource::new()),
            Box::new(SampleSource),
        ])
    }

    pub fn source_names(&self) -> Vec<&str> {
        self.sources.iter().map(|s| s.name()).collect()
    }

    /// Up to `limit` records from the highest-priority source that has any
    pub async fn load(&self, limit: usize) -> Vec<AlertRecord> {
        debug!(limit, sources = ?self.source_names(), "loading alert history");

        for source in &self.sources {
            let mut records = match source.fetch(limit).await {
                Ok(records) => records,
                Err(e) => {
                    warn!(source = source.name(), error = %e, "alert source failed");
                    continue;
                }
            };

            if records.is_empty() {
                debug!(source = source.name(), "alert source empty");
                continue;
            }

            records.sort_by_cached_key(|r| Reverse(r.sort_key()));
            records.truncate(limit);
            info!(source = source.name(), count = records.len(), "alert history resolved");
            return records;
        }

        warn!("no alert source produced records");
        Vec::new()
    }
}
