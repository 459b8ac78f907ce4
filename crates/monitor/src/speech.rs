//! Speech and vibration output worker

use crate::config::SpeechSection;
use alerting::{QueueMode, SinkCommand, Utterance, VolumePolicy};
use std::collections::VecDeque;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;
use tokio::process::{Child, Command};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

const VOLUME_PLACEHOLDER: &str = "{volume}";

/// Counters reported when the worker shuts down
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SpeechStats {
    pub spoken: u64,
    pub interrupted: u64,
    pub discarded: u64,
    pub vibrations: u64,
}

/// Plays alert commands one at a time until the sink side is dropped
pub struct SpeechWorker {
    config: SpeechSection,
    rx: mpsc::UnboundedReceiver<SinkCommand>,
    queue: VecDeque<Utterance>,
    current: Option<Child>,
    stats: SpeechStats,
}

impl SpeechWorker {
    pub fn new(config: SpeechSection, rx: mpsc::UnboundedReceiver<SinkCommand>) -> Self {
        Self {
            config,
            rx,
            queue: VecDeque::new(),
            current: None,
            stats: SpeechStats::default(),
        }
    }

    pub async fn run(mut self) -> SpeechStats {
        info!(command = ?self.config.command, "speech worker started");

        loop {
            if self.current.is_none() {
                if let Some(next) = self.queue.pop_front() {
                    self.play(next);
                    continue;
                }
            }

            tokio::select! {
                command = self.rx.recv() => match command {
                    Some(command) => self.handle(command).await,
                    None => break,
                },
                status = wait_current(&mut self.current), if self.current.is_some() => {
                    self.current = None;
                    match status {
                        Ok(status) if !status.success() => warn!(%status, "speech command failed"),
                        Ok(_) => {}
                        Err(e) => warn!(error = %e, "waiting for speech command failed"),
                    }
                }
            }
        }

        // Let the last utterance finish
        if let Some(mut child) = self.current.take() {
            let _ = child.wait().await;
        }
        info!(stats = ?self.stats, "speech worker stopped");
        self.stats
    }

    async fn handle(&mut self, command: SinkCommand) {
        match command {
            SinkCommand::Speak(utterance) => {
                if utterance.queue_mode == QueueMode::Flush {
                    self.silence().await;
                }
                self.queue.push_back(utterance);
            }
            SinkCommand::Vibrate(duration) => self.vibrate(duration),
            SinkCommand::Stop => self.silence().await,
        }
    }

    /// Kill the current utterance and drop the queue
    async fn silence(&mut self) {
        if let Some(mut child) = self.current.take() {
            if let Err(e) = child.kill().await {
                debug!(error = %e, "speech command already exited");
            }
            self.stats.interrupted += 1;
        }
        if !self.queue.is_empty() {
            debug!(count = self.queue.len(), "discarding queued utterances");
            self.stats.discarded += self.queue.len() as u64;
            self.queue.clear();
        }
    }

    fn play(&mut self, utterance: Utterance) {
        info!(id = %utterance.id, behavior = %utterance.kind, text = utterance.text, "speaking alert");
        self.stats.spoken += 1;

        let Some(program) = self.config.command.as_deref() else {
            return;
        };

        let mut command = Command::new(program);
        command
            .args(speech_args(&self.config.args, utterance.volume))
            .arg(utterance.text)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .kill_on_drop(true);

        match command.spawn() {
            Ok(child) => self.current = Some(child),
            Err(e) => warn!(program, error = %e, "failed to start speech command"),
        }
    }

    fn vibrate(&mut self, duration: Duration) {
        self.stats.vibrations += 1;
        let Some(program) = self.config.vibrate_command.as_deref() else {
            info!(duration_ms = duration.as_millis() as u64, "vibration pulse");
            return;
        };

        let spawned = Command::new(program)
            .arg(duration.as_millis().to_string())
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .spawn();
        if let Err(e) = spawned {
            warn!(program, error = %e, "failed to start vibrate command");
        }
    }
}

async fn wait_current(current: &mut Option<Child>) -> std::io::Result<ExitStatus> {
    match current {
        Some(child) => child.wait().await,
        None => std::future::pending().await,
    }
}

/// Configured arguments with the volume placeholder resolved
pub fn speech_args(args: &[String], volume: VolumePolicy) -> Vec<String> {
    match volume {
        VolumePolicy::System => args
            .iter()
            .filter(|arg| !arg.contains(VOLUME_PLACEHOLDER))
            .cloned()
            .collect(),
        VolumePolicy::Custom(percent) => args
            .iter()
            .map(|arg| arg.replace(VOLUME_PLACEHOLDER, &percent.to_string()))
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alerting::BehaviorKind;

    fn utterance(kind: BehaviorKind, queue_mode: QueueMode) -> Utterance {
        Utterance {
            id: format!("alert-{}", kind.as_str()),
            kind,
            text: kind.message(),
            queue_mode,
            volume: VolumePolicy::System,
        }
    }

    #[test]
    fn test_volume_placeholder() {
        let args = vec!["-a".to_string(), "{volume}".to_string(), "-v".to_string()];
        assert_eq!(speech_args(&args, VolumePolicy::Custom(80)), vec!["-a", "80", "-v"]);
        assert_eq!(speech_args(&args, VolumePolicy::System), vec!["-a", "-v"]);

        let inline = vec!["--volume={volume}".to_string()];
        assert_eq!(speech_args(&inline, VolumePolicy::Custom(5)), vec!["--volume=5"]);
    }

    #[tokio::test]
    async fn test_worker_without_command_logs_and_exits() {
        let (tx, rx) = mpsc::unbounded_channel();
        let worker = tokio::spawn(SpeechWorker::new(SpeechSection::default(), rx).run());

        tx.send(SinkCommand::Vibrate(Duration::from_millis(500))).unwrap();
        tx.send(SinkCommand::Speak(utterance(BehaviorKind::Yawning, QueueMode::Add))).unwrap();
        tx.send(SinkCommand::Speak(utterance(BehaviorKind::Drowsy, QueueMode::Flush))).unwrap();
        tx.send(SinkCommand::Stop).unwrap();
        drop(tx);

        let stats = worker.await.unwrap();
        assert_eq!(stats.vibrations, 1);
        assert_eq!(stats.spoken, 2);
        assert_eq!(stats.interrupted, 0);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_flush_interrupts_long_utterance() {
        let (_tx, rx) = mpsc::unbounded_channel();
        let mut worker = SpeechWorker::new(SpeechSection::default(), rx);

        worker.current = Some(
            Command::new("sleep")
                .arg("30")
                .kill_on_drop(true)
                .spawn()
                .unwrap(),
        );
        worker.queue.push_back(utterance(BehaviorKind::Yawning, QueueMode::Add));

        worker
            .handle(SinkCommand::Speak(utterance(BehaviorKind::Drowsy, QueueMode::Flush)))
            .await;
        assert!(worker.current.is_none());
        assert_eq!(worker.queue.len(), 1);
        assert_eq!(worker.queue[0].kind, BehaviorKind::Drowsy);
        assert_eq!(worker.stats.interrupted, 1);
        assert_eq!(worker.stats.discarded, 1);
    }
}
