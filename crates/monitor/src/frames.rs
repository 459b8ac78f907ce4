//! Camera frame throttling and upload

use alerting::BehaviorFlags;
use backend_client::{BackendClient, ProcessingResponse};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

/// Outcome of the most recent frame upload
#[derive(Debug, Clone, PartialEq, Default)]
pub enum ProcessingState {
    #[default]
    Idle,
    Processing,
    Success(ProcessingResponse),
    Error(String),
}

/// Whether a frame may be uploaded right now
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameDecision {
    Admit,
    TooSoon,
    Busy,
    Unhealthy,
}

/// Rate, concurrency and health gate for frame uploads
#[derive(Debug)]
pub struct FrameThrottle {
    interval: Duration,
    last_admitted: Option<Instant>,
    in_flight: bool,
    server_healthy: bool,
}

impl FrameThrottle {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_admitted: None,
            in_flight: false,
            server_healthy: false,
        }
    }

    /// Decide on a frame captured at `now`; admitting marks an upload in flight
    pub fn check(&mut self, now: Instant) -> FrameDecision {
        if let Some(last) = self.last_admitted {
            if now.saturating_duration_since(last) < self.interval {
                return FrameDecision::TooSoon;
            }
        }
        if self.in_flight {
            return FrameDecision::Busy;
        }
        if !self.server_healthy {
            return FrameDecision::Unhealthy;
        }

        self.last_admitted = Some(now);
        self.in_flight = true;
        FrameDecision::Admit
    }

    /// The admitted upload completed, successfully or not
    pub fn finish(&mut self) {
        self.in_flight = false;
    }

    pub fn set_healthy(&mut self, healthy: bool) {
        self.server_healthy = healthy;
    }

    pub fn is_healthy(&self) -> bool {
        self.server_healthy
    }

    /// Forget timing and in-flight state; health is kept
    pub fn reset(&mut self) {
        self.last_admitted = None;
        self.in_flight = false;
    }
}

/// Sends throttled camera frames to the backend and tracks the result
pub struct FrameUploader {
    client: BackendClient,
    throttle: Arc<Mutex<FrameThrottle>>,
    health_interval: Duration,
    state: Arc<watch::Sender<ProcessingState>>,
    results: Option<mpsc::UnboundedSender<BehaviorFlags>>,
    health_task: Option<JoinHandle<()>>,
}

impl FrameUploader {
    pub fn new(client: BackendClient, frame_interval: Duration, health_interval: Duration) -> Self {
        let (state, _) = watch::channel(ProcessingState::Idle);
        Self {
            client,
            throttle: Arc::new(Mutex::new(FrameThrottle::new(frame_interval))),
            health_interval,
            state: Arc::new(state),
            results: None,
            health_task: None,
        }
    }

    /// Forward the behaviors of every processed frame to an alert session
    pub fn with_results(mut self, results: mpsc::UnboundedSender<BehaviorFlags>) -> Self {
        self.results = Some(results);
        self
    }

    pub fn state(&self) -> ProcessingState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<ProcessingState> {
        self.state.subscribe()
    }

    pub async fn is_server_healthy(&self) -> bool {
        self.throttle.lock().await.is_healthy()
    }

    /// Reset throttling and begin periodic health checks
    pub async fn on_camera_started(&mut self) {
        self.throttle.lock().await.reset();
        self.state.send_replace(ProcessingState::Idle);

        if let Some(task) = self.health_task.take() {
            task.abort();
        }
        self.health_task = Some(tokio::spawn(health_loop(
            self.client.clone(),
            Arc::clone(&self.throttle),
            self.health_interval,
        )));
        info!("camera started");
    }

    /// Stop health checks and return to idle
    pub fn on_camera_stopped(&mut self) {
        if let Some(task) = self.health_task.take() {
            task.abort();
        }
        self.state.send_replace(ProcessingState::Idle);
        info!("camera stopped");
    }

    /// Upload one JPEG frame if the throttle admits it
    pub async fn submit(&self, jpeg: &[u8]) -> FrameDecision {
        let decision = self.throttle.lock().await.check(Instant::now());
        match decision {
            FrameDecision::Admit => {}
            FrameDecision::Unhealthy => {
                debug!("server unhealthy, frame dropped");
                tokio::spawn(check_health(self.client.clone(), Arc::clone(&self.throttle)));
                return decision;
            }
            FrameDecision::TooSoon | FrameDecision::Busy => return decision,
        }

        self.state.send_replace(ProcessingState::Processing);

        // Runs to completion even if the caller stops waiting
        let upload = tokio::spawn(upload_frame(
            self.client.clone(),
            jpeg.to_vec(),
            Arc::clone(&self.throttle),
            Arc::clone(&self.state),
            self.results.clone(),
        ));
        if let Err(e) = upload.await {
            warn!(error = %e, "frame upload task failed");
            self.throttle.lock().await.finish();
            self.state.send_replace(ProcessingState::Error(e.to_string()));
        }
        decision
    }
}

impl Drop for FrameUploader {
    fn drop(&mut self) {
        if let Some(task) = self.health_task.take() {
            task.abort();
        }
    }
}

async fn upload_frame(
    client: BackendClient,
    jpeg: Vec<u8>,
    throttle: Arc<Mutex<FrameThrottle>>,
    state: Arc<watch::Sender<ProcessingState>>,
    results: Option<mpsc::UnboundedSender<BehaviorFlags>>,
) {
    let result = client.process_frame(&jpeg).await;
    throttle.lock().await.finish();

    let next = match result {
        Ok(response) => {
            debug!(
                session_id = %response.session_id,
                behaviors = ?response.behaviors,
                "frame processed"
            );
            if let Some(results) = &results {
                if results.send(BehaviorFlags::from_labels(&response.behaviors)).is_err() {
                    debug!("alert session gone, frame result dropped");
                }
            }
            ProcessingState::Success(response)
        }
        Err(e) => {
            warn!(error = %e, size = jpeg.len(), "frame upload failed");
            ProcessingState::Error(e.to_string())
        }
    };
    state.send_replace(next);
}

async fn check_health(client: BackendClient, throttle: Arc<Mutex<FrameThrottle>>) {
    let healthy = match client.health().await {
        Ok(health) => {
            debug!(status = %health.status, "health check ok");
            true
        }
        Err(e) => {
            debug!(error = %e, "health check failed");
            false
        }
    };

    let mut throttle = throttle.lock().await;
    if throttle.is_healthy() != healthy {
        info!(healthy, "server health changed");
    }
    throttle.set_healthy(healthy);
}

async fn health_loop(client: BackendClient, throttle: Arc<Mutex<FrameThrottle>>, period: Duration) {
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        ticker.tick().await;
        check_health(client.clone(), Arc::clone(&throttle)).await;
    }
}
