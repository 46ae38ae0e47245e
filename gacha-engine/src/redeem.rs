//! Redemption overlay state, claim payload, and user-facing alerts.
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::RedeemConfig;
use crate::constants::{ALERT_CONNECTION_FAILED, ALERT_INVALID_PHONE, ALERT_SUBMITTED};

/// Errors raised while building or delivering a claim.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RedemptionError {
    #[error("wallet phone must have at least {min} digits (got {len})")]
    InvalidPhone { len: usize, min: usize },
    #[error("redemption endpoint unreachable: {0}")]
    Transport(String),
    #[error("redemption endpoint answered with status {status}")]
    Rejected { status: u16 },
}

/// JSON body posted to the redemption endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RedemptionClaim {
    pub wallet_phone: String,
    pub total_money: u32,
}

/// Acknowledgment returned by the endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedemptionAck {
    #[serde(default)]
    pub status: String,
}

/// Transient message surfaced to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Alert {
    InvalidPhone,
    Submitted,
    ConnectionFailed,
}

impl Alert {
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::InvalidPhone => ALERT_INVALID_PHONE,
            Self::Submitted => ALERT_SUBMITTED,
            Self::ConnectionFailed => ALERT_CONNECTION_FAILED,
        }
    }
}

/// Keep ASCII digits only and truncate to `max_len`.
#[must_use]
pub fn sanitize_phone(raw: &str, max_len: usize) -> String {
    raw.chars()
        .filter(char::is_ascii_digit)
        .take(max_len)
        .collect()
}

/// Phone-number field of the redemption overlay.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RedeemOverlay {
    open: bool,
    phone: String,
}

impl RedeemOverlay {
    #[must_use]
    pub const fn is_open(&self) -> bool {
        self.open
    }

    #[must_use]
    pub fn phone(&self) -> &str {
        &self.phone
    }

    pub fn open(&mut self) {
        self.open = true;
    }

    pub fn close(&mut self) {
        self.open = false;
    }

    /// Replace the field with the sanitised form of `raw`.
    pub fn edit_phone(&mut self, raw: &str, config: &RedeemConfig) {
        self.phone = sanitize_phone(raw, config.phone_max_len);
    }

    /// Build the claim for `total_money`, enforcing the minimum length.
    ///
    /// # Errors
    ///
    /// Returns [`RedemptionError::InvalidPhone`] when the number is too short.
    pub fn claim(
        &self,
        total_money: u32,
        config: &RedeemConfig,
    ) -> Result<RedemptionClaim, RedemptionError> {
        let len = self.phone.len();
        if len < config.phone_min_len {
            return Err(RedemptionError::InvalidPhone {
                len,
                min: config.phone_min_len,
            });
        }
        Ok(RedemptionClaim {
            wallet_phone: self.phone.clone(),
            total_money,
        })
    }

    pub fn reset(&mut self) {
        self.open = false;
        self.phone.clear();
    }
}
