//! Battery client - request/response wrapper over the authority
//!
//! Policy layer: every authority failure is caught here, logged, and turned
//! into a safe default (`None`, a rejection, an empty list). Nothing past
//! this module ever sees a transport error. Settings are cached in memory
//! for a short TTL to avoid hammering the authority on every gate check.

use serde_json::Value;
use std::time::{Duration, Instant};

use crate::battery::action::BatteryAction;
use crate::battery::authority::BatteryAuthority;
use crate::battery::settings::BatterySettings;
use crate::battery::status::{
    ActionCheck, BatteryHistoryEntry, BatteryStatus, CanAddContext, ConsumeError, ConsumeResult,
};
use crate::core::error::TrilhaError;
use crate::core::types::{ContextId, UserId};

/// How long a fetched settings snapshot stays fresh
pub const SETTINGS_CACHE_TTL: Duration = Duration::from_secs(5 * 60);

/// Client for the battery authority with a settings cache
pub struct BatteryClient<A> {
    authority: A,
    settings_cache: Option<(BatterySettings, Instant)>,
}

impl<A: BatteryAuthority> BatteryClient<A> {
    pub fn new(authority: A) -> Self {
        Self {
            authority,
            settings_cache: None,
        }
    }

    /// Fetch the global settings, serving from cache within the TTL
    ///
    /// Returns `None` on failure; the caller falls back to last-known
    /// settings or defaults.
    pub async fn fetch_settings(&mut self) -> Option<BatterySettings> {
        if let Some((settings, fetched_at)) = &self.settings_cache {
            if fetched_at.elapsed() < SETTINGS_CACHE_TTL {
                return Some(settings.clone());
            }
        }

        match self.authority.get_settings().await {
            Ok(settings) => {
                if let Err(problem) = settings.validate() {
                    tracing::warn!("[BatteryClient] settings failed validation: {}", problem);
                }
                self.settings_cache = Some((settings.clone(), Instant::now()));
                Some(settings)
            }
            Err(e) => {
                tracing::error!("[BatteryClient] error getting settings: {}", e);
                None
            }
        }
    }

    /// Force the next `fetch_settings` to hit the authority
    ///
    /// Called when pricing changes upstream (admin action).
    pub fn invalidate_settings_cache(&mut self) {
        self.settings_cache = None;
    }

    /// Fetch the live status for one (user, context) pair
    ///
    /// Both transport failures and authority-reported domain errors come
    /// back as `None`; they are distinguished only in the logs.
    pub async fn fetch_status(
        &mut self,
        user_id: UserId,
        context_id: ContextId,
    ) -> Option<BatteryStatus> {
        match self.authority.get_status(user_id, context_id).await {
            Ok(status) => Some(status),
            Err(TrilhaError::Authority(msg)) => {
                tracing::warn!("[BatteryClient] status error: {}", msg);
                None
            }
            Err(e) => {
                tracing::error!("[BatteryClient] error getting status: {}", e);
                None
            }
        }
    }

    /// Consume energy for one action: a single round trip, never retried
    ///
    /// A transport failure degrades to a context-not-found rejection, the
    /// same shape the authority uses when it has no row for this pair.
    pub async fn consume(
        &mut self,
        user_id: UserId,
        context_id: ContextId,
        action: BatteryAction,
        context: Value,
    ) -> ConsumeResult {
        match self
            .authority
            .consume(user_id, context_id, action, context)
            .await
        {
            Ok(result) => result,
            Err(e) => {
                tracing::error!("[BatteryClient] error consuming battery: {}", e);
                ConsumeResult::Rejected {
                    error: ConsumeError::ContextNotFound,
                    battery_current: None,
                    checkout_url: None,
                }
            }
        }
    }

    /// Read-only check: could the user perform this action right now?
    ///
    /// Looks up the cost in the settings snapshot embedded in the current
    /// status. Mutates nothing. Premium users short-circuit to always-true
    /// at zero cost.
    pub async fn check_can_perform_action(
        &mut self,
        user_id: UserId,
        context_id: ContextId,
        action: BatteryAction,
    ) -> ActionCheck {
        let Some(status) = self.fetch_status(user_id, context_id).await else {
            return ActionCheck::denied();
        };

        if status.bypasses_battery(chrono::Utc::now()) {
            return ActionCheck {
                can_perform: true,
                cost: 0,
                battery_current: status.battery_current,
                is_premium: true,
            };
        }

        let cost = status.settings.cost_for(action);
        ActionCheck {
            can_perform: status.battery_current >= cost,
            cost,
            battery_current: status.battery_current,
            is_premium: false,
        }
    }

    /// Check the free-tier context limit
    pub async fn check_can_add_context(&mut self, user_id: UserId) -> CanAddContext {
        match self.authority.check_can_add_context(user_id).await {
            Ok(result) => result,
            Err(e) => {
                tracing::error!("[BatteryClient] error checking context limit: {}", e);
                CanAddContext::denied()
            }
        }
    }

    /// Recent consumption events, newest first; empty on failure
    pub async fn history(
        &mut self,
        user_id: UserId,
        context_id: ContextId,
        limit: usize,
    ) -> Vec<BatteryHistoryEntry> {
        match self.authority.history(user_id, context_id, limit).await {
            Ok(entries) => entries,
            Err(e) => {
                tracing::error!("[BatteryClient] error getting history: {}", e);
                Vec::new()
            }
        }
    }
}
