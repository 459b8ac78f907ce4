//! Alert history record

use alerting::BehaviorFlags;
use serde::{Deserialize, Serialize};

/// One detected risky-behavior event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertRecord {
    /// `YYYY-MM-DD`
    pub date: String,
    /// `HH:MM:SS`
    pub time: String,
    pub alert_type: String,
    /// Confidence in percent (0-100)
    pub confidence: u8,
    pub reason: String,
    pub behavior_output: String,
}

impl AlertRecord {
    /// Ordering key; both parts are fixed width so string order is time order
    pub fn sort_key(&self) -> String {
        format!("{}T{}", self.date, self.time)
    }
}

/// Alert type label for a set of behavior flags
pub fn alert_type_label(flags: &BehaviorFlags) -> &'static str {
    match (flags.is_drowsy, flags.is_yawning, flags.is_distracted) {
        (true, true, true) => "Multiple Behaviors",
        (true, true, false) => "Drowsy & Yawning",
        (true, false, true) => "Drowsy & Distracted",
        (false, true, true) => "Yawning & Distracted",
        (true, false, false) => "Drowsiness",
        (false, true, false) => "Yawning",
        (false, false, true) => "Distraction",
        (false, false, false) => "Unknown Risk",
    }
}

/// Human readable reason for a set of behavior flags
pub fn reason_text(flags: &BehaviorFlags) -> &'static str {
    match (flags.is_drowsy, flags.is_yawning, flags.is_distracted) {
        (true, true, true) => "Driver shows multiple risky behaviors",
        (true, true, false) => "Driver is drowsy and yawning",
        (true, false, true) => "Driver is drowsy and distracted",
        (false, true, true) => "Driver is yawning and distracted",
        (true, false, false) => "Driver shows signs of drowsiness",
        (false, true, false) => "Driver is yawning",
        (false, false, true) => "Driver is distracted",
        (false, false, false) => "Risky behavior detected",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_labels() {
        let cases = [
            ((true, true, true), "Multiple Behaviors"),
            ((true, true, false), "Drowsy & Yawning"),
            ((true, false, true), "Drowsy & Distracted"),
            ((false, true, true), "Yawning & Distracted"),
            ((true, false, false), "Drowsiness"),
            ((false, true, false), "Yawning"),
            ((false, false, true), "Distraction"),
            ((false, false, false), "Unknown Risk"),
        ];
        for ((d, y, x), label) in cases {
            assert_eq!(alert_type_label(&BehaviorFlags::new(d, y, x)), label);
        }
    }

    #[test]
    fn test_reason_for_single_behavior() {
        assert_eq!(
            reason_text(&BehaviorFlags::new(false, false, true)),
            "Driver is distracted"
        );
    }
}
