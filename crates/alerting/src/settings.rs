//! Sound and vibration preferences

use serde::{Deserialize, Serialize};

/// User sound preferences applied to every fired alert
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SoundSettings {
    /// Follow the system volume instead of `custom_volume`
    pub use_system_volume: bool,
    /// Custom alert volume in percent (0-100)
    pub custom_volume: u8,
    /// Pulse the vibration motor alongside spoken alerts
    pub vibrate_enabled: bool,
}

impl Default for SoundSettings {
    fn default() -> Self {
        Self {
            use_system_volume: true,
            custom_volume: 50,
            vibrate_enabled: true,
        }
    }
}

impl SoundSettings {
    pub fn volume_policy(&self) -> VolumePolicy {
        if self.use_system_volume {
            VolumePolicy::System
        } else {
            VolumePolicy::Custom(self.custom_volume.min(100))
        }
    }
}

/// How loud an utterance should be played
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VolumePolicy {
    /// Leave the output volume alone
    System,
    /// Percent of the output's maximum volume
    Custom(u8),
}

impl VolumePolicy {
    /// Scale to an output with `max` volume steps; `None` for system volume
    pub fn scaled(&self, max: u32) -> Option<u32> {
        match self {
            VolumePolicy::System => None,
            VolumePolicy::Custom(percent) => Some(u32::from(*percent) * max / 100),
        }
    }
}
