//! Alert Manager Implementation

use crate::behavior::{BehaviorKind, BehaviorSample};
use crate::debouncer::{AlertDebouncer, SessionState};
use crate::settings::SoundSettings;
use crate::sink::{AlertSink, QueueMode, Utterance};
use std::time::Duration;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Length of the vibration pulse sent with each alert
pub const VIBRATION_PULSE: Duration = Duration::from_millis(500);

/// Owns the session counters and dispatches fired alerts to a sink.
///
/// Must only be driven from one task at a time; it holds no locks.
pub struct AlertManager<S> {
    debouncer: AlertDebouncer,
    state: SessionState,
    settings: SoundSettings,
    sink: S,
    fire_counts: [u64; 3],
}

impl<S: AlertSink> AlertManager<S> {
    pub fn new(settings: SoundSettings, sink: S) -> Self {
        info!(?settings, "creating alert manager");
        Self {
            debouncer: AlertDebouncer::new(),
            state: SessionState::new(),
            settings,
            sink,
            fire_counts: [0; 3],
        }
    }

    pub fn with_debouncer(mut self, debouncer: AlertDebouncer) -> Self {
        self.debouncer = debouncer;
        self
    }

    /// Feed one polling tick; returns the kinds that fired
    pub fn process_sample(&mut self, sample: &BehaviorSample) -> Vec<BehaviorKind> {
        debug!(
            is_drowsy = sample.flags.is_drowsy,
            is_yawning = sample.flags.is_yawning,
            is_distracted = sample.flags.is_distracted,
            "processing behavior sample"
        );

        let fired = self.debouncer.process(&mut self.state, sample);
        for &kind in &fired {
            self.fire(kind);
        }
        fired
    }

    fn fire(&mut self, kind: BehaviorKind) {
        self.fire_counts[kind.index()] += 1;
        warn!(behavior = %kind, count = self.fire_counts[kind.index()], "triggering alert");

        if self.settings.vibrate_enabled {
            self.sink.vibrate(VIBRATION_PULSE);
        }

        let queue_mode = match kind {
            BehaviorKind::Drowsy => QueueMode::Flush,
            BehaviorKind::Yawning | BehaviorKind::Distracted => QueueMode::Add,
        };

        self.sink.speak(Utterance {
            id: format!("alert-{}", Uuid::new_v4()),
            kind,
            text: kind.message(),
            queue_mode,
            volume: self.settings.volume_policy(),
        });
    }

    /// Zero all counters and cooldowns and silence pending speech
    pub fn reset(&mut self) {
        info!("resetting behavior counters and cooldowns");
        self.state = SessionState::new();
        self.sink.stop();
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// Alerts fired for `kind` since the manager was created
    pub fn fire_count(&self, kind: BehaviorKind) -> u64 {
        self.fire_counts[kind.index()]
    }

    pub fn settings(&self) -> &SoundSettings {
        &self.settings
    }

    pub fn set_settings(&mut self, settings: SoundSettings) {
        self.settings = settings;
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }
}
