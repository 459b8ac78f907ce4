//! Alerting System
//!
//! Turns the per-tick behavior flags reported by the inference backend into
//! rate-limited driver alerts:
//! - consecutive-detection thresholds per behavior kind
//! - per-kind cooldown windows
//! - spoken alerts with an optional vibration pulse

mod behavior;
mod debouncer;
mod manager;
mod settings;
mod sink;

pub use behavior::{BehaviorFlags, BehaviorKind, BehaviorPolicy, BehaviorSample};
pub use debouncer::{AlertDebouncer, BehaviorCounterState, SessionState};
pub use manager::{AlertManager, VIBRATION_PULSE};
pub use settings::{SoundSettings, VolumePolicy};
pub use sink::{AlertSink, ChannelSink, QueueMode, SinkCommand, Utterance};
