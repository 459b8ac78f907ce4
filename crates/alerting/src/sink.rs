//! Alert output: speech queue and vibration

use crate::behavior::BehaviorKind;
use crate::settings::VolumePolicy;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::warn;

/// How an utterance joins the speech queue
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueMode {
    /// Interrupt whatever is playing and drop queued utterances
    Flush,
    /// Play after everything already queued
    Add,
}

/// A spoken alert
#[derive(Debug, Clone, PartialEq)]
pub struct Utterance {
    pub id: String,
    pub kind: BehaviorKind,
    pub text: &'static str,
    pub queue_mode: QueueMode,
    pub volume: VolumePolicy,
}

/// Destination for fired alerts
pub trait AlertSink: Send {
    fn speak(&mut self, utterance: Utterance);
    fn vibrate(&mut self, duration: Duration);
    /// Stop current speech and drop anything queued
    fn stop(&mut self);
}

/// Command delivered to the speech worker
#[derive(Debug, Clone, PartialEq)]
pub enum SinkCommand {
    Speak(Utterance),
    Vibrate(Duration),
    Stop,
}

/// Sink that forwards alerts to a speech worker over a channel
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<SinkCommand>,
}

impl ChannelSink {
    pub fn new(tx: mpsc::UnboundedSender<SinkCommand>) -> Self {
        Self { tx }
    }

    /// Create a sink together with the receiving end for the worker
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<SinkCommand>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::new(tx), rx)
    }

    fn send(&self, command: SinkCommand) {
        if self.tx.send(command).is_err() {
            warn!("speech worker gone, alert dropped");
        }
    }
}

impl AlertSink for ChannelSink {
    fn speak(&mut self, utterance: Utterance) {
        self.send(SinkCommand::Speak(utterance));
    }

    fn vibrate(&mut self, duration: Duration) {
        self.send(SinkCommand::Vibrate(duration));
    }

    fn stop(&mut self) {
        self.send(SinkCommand::Stop);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_channel_sink_forwards_in_order() {
        let (mut sink, mut rx) = ChannelSink::channel();
        sink.vibrate(Duration::from_millis(500));
        sink.stop();

        assert_eq!(rx.recv().await, Some(SinkCommand::Vibrate(Duration::from_millis(500))));
        assert_eq!(rx.recv().await, Some(SinkCommand::Stop));
    }

    #[test]
    fn test_send_after_worker_dropped_does_not_panic() {
        let (mut sink, rx) = ChannelSink::channel();
        drop(rx);
        sink.stop();
    }
}
