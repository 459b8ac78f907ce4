//! Consecutive-detection and cooldown debouncing

use crate::behavior::{BehaviorKind, BehaviorPolicy, BehaviorSample};
use std::time::Instant;
use tracing::debug;

/// Debounce state for one behavior kind
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BehaviorCounterState {
    /// Positive ticks in the current unbroken streak
    pub consecutive_count: u32,
    /// Last time an alert fired for this kind (`None` = never)
    pub last_alert: Option<Instant>,
}

/// Counter state for a monitoring session, one entry per behavior kind
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionState {
    counters: [BehaviorCounterState; 3],
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn counter(&self, kind: BehaviorKind) -> &BehaviorCounterState {
        &self.counters[kind.index()]
    }

    fn counter_mut(&mut self, kind: BehaviorKind) -> &mut BehaviorCounterState {
        &mut self.counters[kind.index()]
    }
}

/// Converts per-tick behavior flags into alert decisions.
///
/// The debouncer itself is stateless; all counters live in the
/// [`SessionState`] passed to [`AlertDebouncer::process`].
#[derive(Debug, Clone)]
pub struct AlertDebouncer {
    policies: [BehaviorPolicy; 3],
}

impl AlertDebouncer {
    pub fn new() -> Self {
        Self {
            policies: BehaviorKind::ALL.map(BehaviorKind::policy),
        }
    }

    /// Override the policy for one kind
    pub fn with_policy(mut self, kind: BehaviorKind, policy: BehaviorPolicy) -> Self {
        self.policies[kind.index()] = policy;
        self
    }

    pub fn policy(&self, kind: BehaviorKind) -> BehaviorPolicy {
        self.policies[kind.index()]
    }

    /// Process one sample and return the kinds whose alert fires on this tick
    pub fn process(&self, state: &mut SessionState, sample: &BehaviorSample) -> Vec<BehaviorKind> {
        BehaviorKind::ALL
            .into_iter()
            .filter(|&kind| self.process_kind(state, kind, sample))
            .collect()
    }

    fn process_kind(&self, state: &mut SessionState, kind: BehaviorKind, sample: &BehaviorSample) -> bool {
        let policy = self.policy(kind);
        let counter = state.counter_mut(kind);

        if !sample.flags.get(kind) {
            if counter.consecutive_count > 0 {
                debug!(behavior = %kind, "streak broken, resetting counter");
            }
            counter.consecutive_count = 0;
            return false;
        }

        counter.consecutive_count += 1;
        let count = counter.consecutive_count;

        if count < policy.threshold {
            debug!(behavior = %kind, count, threshold = policy.threshold, "below consecutive threshold");
            return false;
        }

        let cooled_down = counter
            .last_alert
            .map_or(true, |last| sample.at.saturating_duration_since(last) >= policy.cooldown);

        if !cooled_down {
            // Streak keeps accumulating so the alert fires as soon as the cooldown lapses.
            debug!(behavior = %kind, count, "threshold reached but in cooldown period");
            return false;
        }

        counter.last_alert = Some(sample.at);
        counter.consecutive_count = 0;
        true
    }
}

impl Default for AlertDebouncer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::behavior::BehaviorFlags;
    use proptest::prelude::*;
    use std::time::Duration;

    fn sample(base: Instant, secs: f64, flags: BehaviorFlags) -> BehaviorSample {
        BehaviorSample::new(flags, base + Duration::from_secs_f64(secs))
    }

    fn distracted() -> BehaviorFlags {
        BehaviorFlags::new(false, false, true)
    }

    fn yawning() -> BehaviorFlags {
        BehaviorFlags::new(false, true, false)
    }

    #[test]
    fn test_single_distracted_sample_fires() {
        let debouncer = AlertDebouncer::new();
        let mut state = SessionState::new();
        let base = Instant::now();

        let fired = debouncer.process(&mut state, &sample(base, 0.0, distracted()));
        assert_eq!(fired, vec![BehaviorKind::Distracted]);
        assert_eq!(state.counter(BehaviorKind::Distracted).consecutive_count, 0);
        assert!(state.counter(BehaviorKind::Distracted).last_alert.is_some());
    }

    #[test]
    fn test_broken_yawning_streak_never_fires() {
        let debouncer = AlertDebouncer::new();
        let mut state = SessionState::new();
        let base = Instant::now();

        assert!(debouncer.process(&mut state, &sample(base, 0.0, yawning())).is_empty());
        assert!(debouncer
            .process(&mut state, &sample(base, 1.0, BehaviorFlags::default()))
            .is_empty());
        assert!(debouncer.process(&mut state, &sample(base, 2.0, yawning())).is_empty());
        assert_eq!(state.counter(BehaviorKind::Yawning).consecutive_count, 1);
    }

    #[test]
    fn test_yawning_fires_on_second_consecutive_tick() {
        let debouncer = AlertDebouncer::new();
        let mut state = SessionState::new();
        let base = Instant::now();

        assert!(debouncer.process(&mut state, &sample(base, 0.0, yawning())).is_empty());
        let fired = debouncer.process(&mut state, &sample(base, 1.0, yawning()));
        assert_eq!(fired, vec![BehaviorKind::Yawning]);
    }

    #[test]
    fn test_cooldown_blocks_without_resetting_streak() {
        let debouncer = AlertDebouncer::new();
        let mut state = SessionState::new();
        let base = Instant::now();

        assert_eq!(
            debouncer.process(&mut state, &sample(base, 0.0, distracted())),
            vec![BehaviorKind::Distracted]
        );

        for tick in 1..15 {
            let fired = debouncer.process(&mut state, &sample(base, tick as f64, distracted()));
            assert!(fired.is_empty(), "fired during cooldown at tick {tick}");
        }
        assert_eq!(state.counter(BehaviorKind::Distracted).consecutive_count, 14);

        let fired = debouncer.process(&mut state, &sample(base, 15.0, distracted()));
        assert_eq!(fired, vec![BehaviorKind::Distracted]);
        assert_eq!(state.counter(BehaviorKind::Distracted).consecutive_count, 0);
    }

    #[test]
    fn test_multiple_kinds_fire_in_one_tick() {
        let debouncer = AlertDebouncer::new();
        let mut state = SessionState::new();
        let base = Instant::now();

        let all = BehaviorFlags::new(true, true, true);
        let fired = debouncer.process(&mut state, &sample(base, 0.0, all));
        assert_eq!(fired, vec![BehaviorKind::Drowsy, BehaviorKind::Distracted]);

        let fired = debouncer.process(&mut state, &sample(base, 1.0, all));
        assert_eq!(fired, vec![BehaviorKind::Yawning]);
    }

    #[test]
    fn test_fresh_state_forgets_cooldowns() {
        let debouncer = AlertDebouncer::new();
        let mut state = SessionState::new();
        let base = Instant::now();

        debouncer.process(&mut state, &sample(base, 0.0, distracted()));
        state = SessionState::new();
        let fired = debouncer.process(&mut state, &sample(base, 1.0, distracted()));
        assert_eq!(fired, vec![BehaviorKind::Distracted]);
    }

    fn flags_strategy() -> impl Strategy<Value = BehaviorFlags> {
        (any::<bool>(), any::<bool>(), any::<bool>())
            .prop_map(|(d, y, x)| BehaviorFlags::new(d, y, x))
    }

    proptest! {
        #[test]
        fn prop_negative_sample_zeroes_counter(
            ticks in prop::collection::vec((flags_strategy(), 0u64..3000), 1..200)
        ) {
            let debouncer = AlertDebouncer::new();
            let mut state = SessionState::new();
            let base = Instant::now();
            let mut elapsed = Duration::ZERO;

            for (flags, gap_ms) in ticks {
                elapsed += Duration::from_millis(gap_ms);
                debouncer.process(&mut state, &BehaviorSample::new(flags, base + elapsed));
                for kind in BehaviorKind::ALL {
                    if !flags.get(kind) {
                        prop_assert_eq!(state.counter(kind).consecutive_count, 0);
                    }
                }
            }
        }

        #[test]
        fn prop_alerts_respect_cooldown(
            ticks in prop::collection::vec((flags_strategy(), 0u64..3000), 1..300)
        ) {
            let debouncer = AlertDebouncer::new();
            let mut state = SessionState::new();
            let base = Instant::now();
            let mut elapsed = Duration::ZERO;
            let mut last_fired: [Option<Duration>; 3] = [None; 3];

            for (flags, gap_ms) in ticks {
                elapsed += Duration::from_millis(gap_ms);
                let fired = debouncer.process(&mut state, &BehaviorSample::new(flags, base + elapsed));
                for kind in fired {
                    prop_assert!(flags.get(kind));
                    if let Some(previous) = last_fired[kind.index()] {
                        prop_assert!(elapsed - previous >= kind.policy().cooldown);
                    }
                    last_fired[kind.index()] = Some(elapsed);
                }
            }
        }
    }
}
