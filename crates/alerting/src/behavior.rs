//! Behavior flags and per-kind alert policy

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{Duration, Instant};

/// Behavior classification reported by the inference backend
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BehaviorFlags {
    #[serde(default)]
    pub is_drowsy: bool,
    #[serde(default)]
    pub is_yawning: bool,
    #[serde(default)]
    pub is_distracted: bool,
}

impl BehaviorFlags {
    pub fn new(is_drowsy: bool, is_yawning: bool, is_distracted: bool) -> Self {
        Self {
            is_drowsy,
            is_yawning,
            is_distracted,
        }
    }

    /// Flags from frame-level behavior labels such as `["drowsy", "yawning"]`
    pub fn from_labels<L: AsRef<str>>(labels: &[L]) -> Self {
        let has = |kind: BehaviorKind| labels.iter().any(|label| label.as_ref() == kind.as_str());
        Self::new(
            has(BehaviorKind::Drowsy),
            has(BehaviorKind::Yawning),
            has(BehaviorKind::Distracted),
        )
    }

    /// Flag for a single behavior kind
    pub fn get(&self, kind: BehaviorKind) -> bool {
        match kind {
            BehaviorKind::Drowsy => self.is_drowsy,
            BehaviorKind::Yawning => self.is_yawning,
            BehaviorKind::Distracted => self.is_distracted,
        }
    }

    /// Whether any behavior is present
    pub fn any(&self) -> bool {
        self.is_drowsy || self.is_yawning || self.is_distracted
    }

    /// Number of behaviors present
    pub fn count(&self) -> usize {
        BehaviorKind::ALL.iter().filter(|k| self.get(**k)).count()
    }
}

/// Behavior kind tracked by the debouncer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BehaviorKind {
    Drowsy,
    Yawning,
    Distracted,
}

/// Consecutive-detection threshold and cooldown for one behavior kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BehaviorPolicy {
    /// Consecutive positive ticks required before alerting
    pub threshold: u32,
    /// Minimum time between two alerts of this kind
    pub cooldown: Duration,
}

impl BehaviorKind {
    /// Evaluation order within a tick
    pub const ALL: [BehaviorKind; 3] = [
        BehaviorKind::Drowsy,
        BehaviorKind::Yawning,
        BehaviorKind::Distracted,
    ];

    pub fn policy(self) -> BehaviorPolicy {
        match self {
            BehaviorKind::Drowsy => BehaviorPolicy {
                threshold: 1,
                cooldown: Duration::from_secs(10),
            },
            BehaviorKind::Yawning => BehaviorPolicy {
                threshold: 2,
                cooldown: Duration::from_secs(12),
            },
            BehaviorKind::Distracted => BehaviorPolicy {
                threshold: 1,
                cooldown: Duration::from_secs(15),
            },
        }
    }

    /// Spoken alert text
    pub fn message(self) -> &'static str {
        match self {
            BehaviorKind::Drowsy => {
                "Warning! Drowsiness detected! Please stay alert and consider taking a break."
            }
            BehaviorKind::Yawning => {
                "Warning! Yawning detected. You may be getting tired. Consider taking a rest."
            }
            BehaviorKind::Distracted => {
                "Warning! Distraction detected. Please focus on the road ahead."
            }
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            BehaviorKind::Drowsy => "drowsy",
            BehaviorKind::Yawning => "yawning",
            BehaviorKind::Distracted => "distracted",
        }
    }

    pub(crate) fn index(self) -> usize {
        match self {
            BehaviorKind::Drowsy => 0,
            BehaviorKind::Yawning => 1,
            BehaviorKind::Distracted => 2,
        }
    }
}

impl fmt::Display for BehaviorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One polling tick worth of behavior flags
#[derive(Debug, Clone, Copy)]
pub struct BehaviorSample {
    pub flags: BehaviorFlags,
    pub at: Instant,
}

impl BehaviorSample {
    pub fn new(flags: BehaviorFlags, at: Instant) -> Self {
        Self { flags, at }
    }

    /// Sample taken now
    pub fn now(flags: BehaviorFlags) -> Self {
        Self::new(flags, Instant::now())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_policy_table() {
        assert_eq!(BehaviorKind::Drowsy.policy().threshold, 1);
        assert_eq!(BehaviorKind::Drowsy.policy().cooldown, Duration::from_secs(10));
        assert_eq!(BehaviorKind::Yawning.policy().threshold, 2);
        assert_eq!(BehaviorKind::Yawning.policy().cooldown, Duration::from_secs(12));
        assert_eq!(BehaviorKind::Distracted.policy().threshold, 1);
        assert_eq!(BehaviorKind::Distracted.policy().cooldown, Duration::from_secs(15));
    }

    #[test]
    fn test_flags_deserialize_missing_fields() {
        let flags: BehaviorFlags = serde_json::from_str(r#"{"is_yawning": true}"#).unwrap();
        assert_eq!(flags, BehaviorFlags::new(false, true, false));
        assert_eq!(flags.count(), 1);
        assert!(flags.any());
    }

    #[test]
    fn test_flags_from_labels() {
        assert_eq!(
            BehaviorFlags::from_labels(&["yawning"]),
            BehaviorFlags::new(false, true, false)
        );
        assert_eq!(
            BehaviorFlags::from_labels(&["distracted".to_string(), "drowsy".to_string()]),
            BehaviorFlags::new(true, false, true)
        );
        assert!(!BehaviorFlags::from_labels(&["Yawning", "sleepy"]).any());
        assert!(!BehaviorFlags::from_labels::<&str>(&[]).any());
    }

    #[test]
    fn test_flag_lookup() {
        let flags = BehaviorFlags::new(true, false, true);
        assert!(flags.get(BehaviorKind::Drowsy));
        assert!(!flags.get(BehaviorKind::Yawning));
        assert!(flags.get(BehaviorKind::Distracted));
    }
}
