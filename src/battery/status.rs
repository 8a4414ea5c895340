//! Battery status and operation outcomes
//!
//! `BatteryStatus` is the authoritative snapshot for one (user, context)
//! pair. The client never computes a balance itself: `battery_current` only
//! changes when a consume/recharge response from the authority reports the
//! new value.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::battery::action::BatteryAction;
use crate::battery::settings::BatterySettings;

/// Live battery snapshot for one user in one context
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatteryStatus {
    pub battery_current: u32,
    pub battery_max: u32,
    pub last_recharge: Option<DateTime<Utc>>,
    /// Battery is flat and waiting for the daily recharge
    pub needs_recharge: bool,
    pub is_premium: bool,
    pub has_unlimited_battery: bool,
    pub unlimited_expires_at: Option<DateTime<Utc>>,
    /// Contexts this user is currently enrolled in
    pub active_contexts: u32,
    pub max_contexts_free: u32,
    /// Settings snapshot observed at fetch time
    pub settings: BatterySettings,
}

impl BatteryStatus {
    /// Premium subscription or an unexpired unlimited-battery grant
    pub fn bypasses_battery(&self, now: DateTime<Utc>) -> bool {
        if self.is_premium {
            return true;
        }
        self.has_unlimited_battery
            && self.unlimited_expires_at.map_or(true, |exp| exp > now)
    }
}

/// Why a consume request was rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConsumeError {
    InsufficientBattery,
    ContextNotFound,
}

/// Outcome of a consume request
///
/// Exactly one of these is produced per logical action; a rejected consume
/// is never retried automatically.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConsumeResult {
    Consumed {
        battery_before: u32,
        battery_current: u32,
        cost: u32,
        is_premium: bool,
    },
    Rejected {
        error: ConsumeError,
        /// Balance as reported by the authority, when known
        battery_current: Option<u32>,
        /// Upsell link for the out-of-energy flow
        checkout_url: Option<String>,
    },
}

impl ConsumeResult {
    pub fn is_success(&self) -> bool {
        matches!(self, ConsumeResult::Consumed { .. })
    }

    /// Rejection reason, if any
    pub fn error(&self) -> Option<ConsumeError> {
        match self {
            ConsumeResult::Consumed { .. } => None,
            ConsumeResult::Rejected { error, .. } => Some(*error),
        }
    }
}

/// Read-only precomputation for "can the user do this right now?"
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionCheck {
    pub can_perform: bool,
    pub cost: u32,
    pub battery_current: u32,
    pub is_premium: bool,
}

impl ActionCheck {
    /// Conservative answer used when the status cannot be read
    pub fn denied() -> Self {
        Self {
            can_perform: false,
            cost: 0,
            battery_current: 0,
            is_premium: false,
        }
    }
}

/// Result of the free-tier context limit check
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanAddContext {
    pub can_add: bool,
    pub is_premium: bool,
    pub current_count: Option<u32>,
    pub max_allowed: Option<u32>,
    pub checkout_url: Option<String>,
}

impl CanAddContext {
    /// Conservative answer used when the authority cannot be reached
    pub fn denied() -> Self {
        Self {
            can_add: false,
            is_premium: false,
            current_count: None,
            max_allowed: None,
            checkout_url: None,
        }
    }
}

/// One consumption event, newest first in history queries
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatteryHistoryEntry {
    pub action: BatteryAction,
    pub cost: u32,
    pub battery_after: u32,
    pub created_at: DateTime<Utc>,
}
