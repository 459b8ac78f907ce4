//! Behavior polling session
//!
//! While running, a single Tokio task owns the [`AlertManager`] and is the
//! only writer of the debouncer state. Backend polls and processed camera
//! frames both reach it as samples. Stopping hands the manager back and
//! resets it, so the next session starts from zero counters.

use alerting::{AlertManager, AlertSink, BehaviorFlags, BehaviorSample};
use backend_client::BackendClient;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

struct SessionParts<S> {
    manager: AlertManager<S>,
    frames: mpsc::UnboundedReceiver<BehaviorFlags>,
}

struct ActiveSession<S> {
    shutdown: watch::Sender<bool>,
    handle: JoinHandle<SessionParts<S>>,
}

/// Starts and stops behavior polling against the backend
pub struct Monitor<S> {
    client: BackendClient,
    poll_interval: Duration,
    frame_tx: mpsc::UnboundedSender<BehaviorFlags>,
    idle: Option<SessionParts<S>>,
    active: Option<ActiveSession<S>>,
}

impl<S: AlertSink + 'static> Monitor<S> {
    pub fn new(client: BackendClient, manager: AlertManager<S>, poll_interval: Duration) -> Self {
        let (frame_tx, frames) = mpsc::unbounded_channel();
        Self {
            client,
            poll_interval,
            frame_tx,
            idle: Some(SessionParts { manager, frames }),
            active: None,
        }
    }

    /// Sender for behaviors detected in processed camera frames
    pub fn frame_results(&self) -> mpsc::UnboundedSender<BehaviorFlags> {
        self.frame_tx.clone()
    }

    pub fn is_running(&self) -> bool {
        self.active.is_some()
    }

    /// The alert manager, available while no session is running
    pub fn manager(&self) -> Option<&AlertManager<S>> {
        self.idle.as_ref().map(|parts| &parts.manager)
    }

    /// Begin polling. Returns false if a session is already running.
    pub fn start(&mut self) -> bool {
        if self.active.is_some() {
            debug!("monitoring already active");
            return false;
        }
        let Some(mut parts) = self.idle.take() else {
            error!("alert manager lost by a previous session");
            return false;
        };

        let mut stale = 0usize;
        while parts.frames.try_recv().is_ok() {
            stale += 1;
        }
        if stale > 0 {
            debug!(stale, "dropped frame results from before the session");
        }

        let (shutdown, rx) = watch::channel(false);
        let handle = tokio::spawn(poll_behavior(
            self.client.clone(),
            parts,
            self.poll_interval,
            rx,
        ));
        self.active = Some(ActiveSession { shutdown, handle });

        info!(interval_ms = self.poll_interval.as_millis() as u64, "monitoring started");
        true
    }

    /// Cancel polling and reset all alert state. No-op when idle.
    pub async fn stop(&mut self) {
        let Some(active) = self.active.take() else {
            debug!("no monitoring session to stop");
            return;
        };

        let _ = active.shutdown.send(true);
        match active.handle.await {
            Ok(mut parts) => {
                parts.manager.reset();
                self.idle = Some(parts);
                info!("monitoring stopped");
            }
            Err(e) => error!(error = %e, "polling task failed"),
        }
    }
}

async fn poll_behavior<S: AlertSink>(
    client: BackendClient,
    mut parts: SessionParts<S>,
    period: Duration,
    mut shutdown: watch::Receiver<bool>,
) -> SessionParts<S> {
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        let flags = tokio::select! {
            biased;
            _ = shutdown.changed() => break,
            Some(flags) = parts.frames.recv() => {
                debug!(?flags, "frame result");
                flags
            }
            _ = ticker.tick() => tokio::select! {
                biased;
                _ = shutdown.changed() => break,
                result = client.latest_behavior() => match result {
                    Ok(flags) => flags,
                    Err(e) => {
                        warn!(error = %e, "behavior poll failed");
                        BehaviorFlags::default()
                    }
                },
            },
        };

        let fired = parts.manager.process_sample(&BehaviorSample::now(flags));
        if !fired.is_empty() {
            debug!(fired = ?fired, "alerts fired");
        }
    }

    parts
}

#[cfg(test)]
mod tests {
    use super::*;
    use alerting::{BehaviorKind, ChannelSink, SinkCommand, SoundSettings};
    use axum::routing::get;
    use axum::{Json, Router};
    use backend_client::ClientConfig;
    use serde_json::json;

    async fn behavior_backend(distracted: bool) -> String {
        let router = Router::new().route(
            "/api/latest_behavior",
            get(move || async move {
                Json(json!({
                    "success": true,
                    "behavior_category": {
                        "is_drowsy": false,
                        "is_yawning": false,
                        "is_distracted": distracted
                    }
                }))
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}", addr)
    }

    fn monitor(base_urls: Vec<String>) -> (Monitor<ChannelSink>, mpsc::UnboundedReceiver<SinkCommand>) {
        monitor_every(base_urls, Duration::from_millis(20))
    }

    fn monitor_every(
        base_urls: Vec<String>,
        poll_interval: Duration,
    ) -> (Monitor<ChannelSink>, mpsc::UnboundedReceiver<SinkCommand>) {
        let client = BackendClient::new(ClientConfig {
            base_urls,
            behavior_timeout: Duration::from_secs(1),
            behavior_retry_pause: Duration::from_millis(1),
            ..Default::default()
        })
        .unwrap();
        let (sink, rx) = ChannelSink::channel();
        let manager = AlertManager::new(SoundSettings::default(), sink);
        (Monitor::new(client, manager, poll_interval), rx)
    }

    #[tokio::test]
    async fn test_distracted_poll_speaks_once() {
        let base = behavior_backend(true).await;
        let (mut monitor, mut rx) = monitor(vec![base]);

        assert!(monitor.start());
        assert!(!monitor.start());

        let mut spoken = None;
        while spoken.is_none() {
            match tokio::time::timeout(Duration::from_secs(5), rx.recv()).await.unwrap() {
                Some(SinkCommand::Speak(utterance)) => spoken = Some(utterance),
                Some(_) => {}
                None => panic!("sink closed"),
            }
        }
        assert_eq!(spoken.unwrap().kind, BehaviorKind::Distracted);

        monitor.stop().await;
        assert!(!monitor.is_running());

        let manager = monitor.manager().unwrap();
        assert_eq!(manager.fire_count(BehaviorKind::Distracted), 1);
        assert_eq!(manager.state().counter(BehaviorKind::Distracted).consecutive_count, 0);

        // Everything after the speak: no second alert inside the cooldown, then the stop
        let mut rest = Vec::new();
        while let Ok(command) = rx.try_recv() {
            rest.push(command);
        }
        assert_eq!(rest.last(), Some(&SinkCommand::Stop));
        assert!(!rest.iter().any(|c| matches!(c, SinkCommand::Speak(_))));
    }

    #[tokio::test]
    async fn test_frame_results_reach_debouncer() {
        let base = behavior_backend(false).await;
        let (mut monitor, mut rx) = monitor_every(vec![base], Duration::from_secs(60));
        let frames = monitor.frame_results();

        assert!(monitor.start());
        let yawning = BehaviorFlags::from_labels(&["yawning"]);
        frames.send(yawning).unwrap();
        frames.send(yawning).unwrap();

        let spoken = loop {
            match tokio::time::timeout(Duration::from_secs(5), rx.recv()).await.unwrap() {
                Some(SinkCommand::Speak(utterance)) => break utterance,
                Some(_) => {}
                None => panic!("sink closed"),
            }
        };
        assert_eq!(spoken.kind, BehaviorKind::Yawning);

        monitor.stop().await;
        assert_eq!(monitor.manager().unwrap().fire_count(BehaviorKind::Yawning), 1);
    }

    #[tokio::test]
    async fn test_unreachable_backend_keeps_running() {
        let (mut monitor, mut rx) = monitor(vec!["http://127.0.0.1:1".to_string()]);
        assert!(monitor.start());

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(monitor.is_running());

        monitor.stop().await;
        assert_eq!(rx.try_recv(), Ok(SinkCommand::Stop));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_stop_when_idle_is_noop() {
        let (mut monitor, mut rx) = monitor(vec!["http://127.0.0.1:1".to_string()]);
        monitor.stop().await;
        assert!(monitor.manager().is_some());
        assert!(rx.try_recv().is_err());

        assert!(monitor.start());
        monitor.stop().await;
        monitor.stop().await;
        assert!(monitor.start());
        monitor.stop().await;
    }
}
