//! EyeDTrack driver monitoring client
//!
//! Polls the inference backend for behavior flags, debounces them into
//! spoken alerts, uploads camera frames, and prints the alert history.

use alert_log::{AlertLogResolver, AlertRecord};
use alerting::{AlertManager, ChannelSink};
use anyhow::Context;
use backend_client::BackendClient;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::info;
use tracing_subscriber::EnvFilter;

pub mod config;
pub mod frames;
pub mod session;
pub mod speech;

pub use config::{ConfigError, LoggingSection, MonitorConfig};
pub use frames::{FrameDecision, FrameThrottle, FrameUploader, ProcessingState};
pub use session::Monitor;
pub use speech::{speech_args, SpeechStats, SpeechWorker};

/// Install the global tracing subscriber; `RUST_LOG` wins over the configured level
pub fn init_logging(logging: &LoggingSection) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&logging.level))
        .context("invalid log filter")?;

    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(true);
    let installed = if logging.json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    installed.map_err(|e| anyhow::anyhow!("failed to set tracing subscriber: {e}"))
}

/// Alert manager plus speech worker, driven by a [`Monitor`]
struct AlertSession {
    monitor: Monitor<ChannelSink>,
    speech: JoinHandle<SpeechStats>,
}

impl AlertSession {
    fn start(config: &MonitorConfig, client: BackendClient) -> Self {
        let (sink, rx) = ChannelSink::channel();
        let speech = tokio::spawn(SpeechWorker::new(config.speech.clone(), rx).run());

        let manager = AlertManager::new(config.sound.clone(), sink);
        let mut monitor = Monitor::new(client, manager, config.polling.interval());
        monitor.start();
        Self { monitor, speech }
    }

    async fn finish(mut self) -> anyhow::Result<SpeechStats> {
        self.monitor.stop().await;
        // Dropping the monitor closes the sink channel and ends the worker
        drop(self.monitor);
        let stats = self.speech.await?;
        info!(
            spoken = stats.spoken,
            interrupted = stats.interrupted,
            vibrations = stats.vibrations,
            "alert session finished"
        );
        Ok(stats)
    }
}

/// Fail unless the backend answers a health check
pub async fn ensure_connected(config: &MonitorConfig, client: &BackendClient) -> anyhow::Result<()> {
    let attempts = config.backend.health_attempts;
    let pause = Duration::from_millis(config.backend.health_retry_ms);
    if client.wait_for_health(attempts, pause).await {
        Ok(())
    } else {
        anyhow::bail!("Not connected to server: {attempts} health checks failed")
    }
}

/// Poll the backend and voice alerts until Ctrl-C
pub async fn run_monitor(config: &MonitorConfig) -> anyhow::Result<()> {
    let client = BackendClient::new(config.to_client_config())?;
    ensure_connected(config, &client).await?;

    let session = AlertSession::start(config, client);
    tokio::signal::ctrl_c().await.context("failed to listen for Ctrl-C")?;
    info!("shutdown requested");
    session.finish().await?;
    Ok(())
}

/// Resolve the alert history from the best available source
pub async fn load_history(config: &MonitorConfig, limit: usize) -> anyhow::Result<Vec<AlertRecord>> {
    let client = BackendClient::new(config.to_client_config())?;
    let resolver = AlertLogResolver::standard(client, config.history.log_paths.clone());
    Ok(resolver.load(limit).await)
}

pub async fn run_history(config: &MonitorConfig, limit: Option<usize>, json: bool) -> anyhow::Result<()> {
    let records = load_history(config, limit.unwrap_or(config.history.limit)).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&records)?);
        return Ok(());
    }

    if records.is_empty() {
        println!("No alerts recorded");
    }
    for record in &records {
        println!(
            "{} {}  {:<22} {:>3}%  {}",
            record.date, record.time, record.alert_type, record.confidence, record.reason
        );
    }
    Ok(())
}

/// JPEG files in `dir`, sorted by name
pub fn collect_frames(dir: &Path) -> anyhow::Result<Vec<PathBuf>> {
    let mut frames = Vec::new();
    for entry in std::fs::read_dir(dir).with_context(|| format!("reading {}", dir.display()))? {
        let path = entry?.path();
        let is_jpeg = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.eq_ignore_ascii_case("jpg") || ext.eq_ignore_ascii_case("jpeg"))
            .unwrap_or(false);
        if is_jpeg && path.is_file() {
            frames.push(path);
        }
    }
    frames.sort();
    Ok(frames)
}

/// Feed recorded frames through the uploader at `fps`
pub async fn run_replay(config: &MonitorConfig, dir: &Path, fps: f64) -> anyhow::Result<()> {
    anyhow::ensure!(fps > 0.0 && fps.is_finite(), "fps must be positive, got {fps}");

    let frames = collect_frames(dir)?;
    anyhow::ensure!(!frames.is_empty(), "no .jpg or .jpeg files in {}", dir.display());

    let client = BackendClient::new(config.to_client_config())?;
    let session = AlertSession::start(config, client.clone());
    let mut uploader = FrameUploader::new(
        client,
        config.polling.frame_interval(),
        config.polling.health_interval(),
    )
    .with_results(session.monitor.frame_results());
    uploader.on_camera_started().await;

    let mut ticker = tokio::time::interval(Duration::from_secs_f64(1.0 / fps));
    let mut admitted = 0usize;
    for path in &frames {
        ticker.tick().await;
        let jpeg = tokio::fs::read(path)
            .await
            .with_context(|| format!("reading {}", path.display()))?;

        let decision = uploader.submit(&jpeg).await;
        if decision == FrameDecision::Admit {
            admitted += 1;
            info!(frame = %path.display(), state = ?uploader.state(), "frame submitted");
        } else {
            info!(frame = %path.display(), ?decision, "frame skipped");
        }
    }

    uploader.on_camera_stopped();
    info!(total = frames.len(), admitted, "replay finished");
    session.finish().await?;
    Ok(())
}
