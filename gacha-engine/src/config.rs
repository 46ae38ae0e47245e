//! Runtime configuration for rolls, timers, audio, and redemption.
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

use crate::constants::{
    ACTION_VOLUME, AMBIENT_VOLUME, DRAW_SCALE, PHONE_MAX_LEN, PHONE_MIN_LEN, PRELOAD_WARMUP_MS,
    REDEEM_ENDPOINT, REWARD_POPUP_MS,
};
use crate::reward::{RollTable, Tier};

/// Errors raised when configuration invariants are violated.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("configuration is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("tier thresholds must satisfy 0 < super rare ({super_rare:.2}) < rare ({rare:.2}) <= 100")]
    Thresholds { super_rare: f64, rare: f64 },
    #[error("{tier} payout range is invalid (min {min}, max {max})")]
    PayoutRange { tier: Tier, min: u32, max: u32 },
    #[error("{field} must be between 0.0 and 1.0 (got {value:.2})")]
    Volume { field: &'static str, value: f32 },
    #[error("{field} must be greater than zero")]
    ZeroDelay { field: &'static str },
    #[error("phone length window invalid (min {min} > max {max})")]
    PhoneLength { min: usize, max: usize },
}

/// Fixed delays standing in for asset-ready and popup-finished signals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimingConfig {
    #[serde(default = "TimingConfig::default_preload_warmup_ms")]
    pub preload_warmup_ms: u64,
    #[serde(default = "TimingConfig::default_reward_popup_ms")]
    pub reward_popup_ms: u64,
}

impl TimingConfig {
    const fn default_preload_warmup_ms() -> u64 {
        PRELOAD_WARMUP_MS
    }

    const fn default_reward_popup_ms() -> u64 {
        REWARD_POPUP_MS
    }

    #[must_use]
    pub const fn preload_warmup(&self) -> Duration {
        Duration::from_millis(self.preload_warmup_ms)
    }

    #[must_use]
    pub const fn reward_popup(&self) -> Duration {
        Duration::from_millis(self.reward_popup_ms)
    }
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            preload_warmup_ms: Self::default_preload_warmup_ms(),
            reward_popup_ms: Self::default_reward_popup_ms(),
        }
    }
}

/// Persistent settings applied to both looping tracks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioConfig {
    #[serde(default = "AudioConfig::default_ambient_volume")]
    pub ambient_volume: f32,
    #[serde(default = "AudioConfig::default_action_volume")]
    pub action_volume: f32,
}

impl AudioConfig {
    const fn default_ambient_volume() -> f32 {
        AMBIENT_VOLUME
    }

    const fn default_action_volume() -> f32 {
        ACTION_VOLUME
    }
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            ambient_volume: Self::default_ambient_volume(),
            action_volume: Self::default_action_volume(),
        }
    }
}

/// Where claims are sent and how the phone input is constrained.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedeemConfig {
    #[serde(default = "RedeemConfig::default_endpoint")]
    pub endpoint: String,
    #[serde(default = "RedeemConfig::default_phone_max_len")]
    pub phone_max_len: usize,
    #[serde(default = "RedeemConfig::default_phone_min_len")]
    pub phone_min_len: usize,
}

impl RedeemConfig {
    fn default_endpoint() -> String {
        REDEEM_ENDPOINT.to_string()
    }

    const fn default_phone_max_len() -> usize {
        PHONE_MAX_LEN
    }

    const fn default_phone_min_len() -> usize {
        PHONE_MIN_LEN
    }
}

impl Default for RedeemConfig {
    fn default() -> Self {
        Self {
            endpoint: Self::default_endpoint(),
            phone_max_len: Self::default_phone_max_len(),
            phone_min_len: Self::default_phone_min_len(),
        }
    }
}

/// Complete engine configuration.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct GachaConfig {
    #[serde(default)]
    pub rolls: RollTable,
    #[serde(default)]
    pub timing: TimingConfig,
    #[serde(default)]
    pub audio: AudioConfig,
    #[serde(default)]
    pub redeem: RedeemConfig,
}

impl GachaConfig {
    /// Parse and validate a JSON document. Missing fields take their defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is malformed or violates an invariant.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Check every invariant the session relies on.
    ///
    /// # Errors
    ///
    /// Returns the first violated invariant.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let rolls = &self.rolls;
        let thresholds_ok = rolls.super_rare_below > 0.0
            && rolls.super_rare_below < rolls.rare_below
            && rolls.rare_below <= DRAW_SCALE;
        if !thresholds_ok {
            return Err(ConfigError::Thresholds {
                super_rare: rolls.super_rare_below,
                rare: rolls.rare_below,
            });
        }
        for tier in Tier::ALL {
            let range = rolls.payout_range(tier);
            if range.min == 0 || range.min > range.max {
                return Err(ConfigError::PayoutRange {
                    tier,
                    min: range.min,
                    max: range.max,
                });
            }
        }
        for (field, value) in [
            ("audio.ambient_volume", self.audio.ambient_volume),
            ("audio.action_volume", self.audio.action_volume),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::Volume { field, value });
            }
        }
        if self.timing.preload_warmup_ms == 0 {
            return Err(ConfigError::ZeroDelay {
                field: "timing.preload_warmup_ms",
            });
        }
        if self.timing.reward_popup_ms == 0 {
            return Err(ConfigError::ZeroDelay {
                field: "timing.reward_popup_ms",
            });
        }
        if self.redeem.phone_min_len > self.redeem.phone_max_len {
            return Err(ConfigError::PhoneLength {
                min: self.redeem.phone_min_len,
                max: self.redeem.phone_max_len,
            });
        }
        Ok(())
    }
}
