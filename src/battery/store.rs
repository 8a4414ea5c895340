//! Battery store - session-wide battery state
//!
//! Holds the status snapshot for the most recently selected context, plus
//! the shared settings and the loading/modal booleans the UI observes. One
//! instance is constructed at startup and passed by reference; there are no
//! module-level globals.
//!
//! Mutations happen synchronously once an awaited call resolves. Overlapping
//! `fetch_status` calls are not coalesced: both run to completion and the
//! last write wins. Context switches are rare and sequential in practice, so
//! this race is tolerated rather than serialized away.

use serde_json::Value;

use crate::battery::action::BatteryAction;
use crate::battery::authority::BatteryAuthority;
use crate::battery::client::BatteryClient;
use crate::battery::settings::BatterySettings;
use crate::battery::status::{
    ActionCheck, BatteryStatus, CanAddContext, ConsumeError, ConsumeResult,
};
use crate::core::types::{ContextId, UserId};
use crate::entitlement::{self, UserProfile};

/// Session-wide battery state for one focused context
pub struct BatteryStore<A> {
    client: BatteryClient<A>,

    status: Option<BatteryStatus>,
    current_context: Option<ContextId>,
    settings: Option<BatterySettings>,

    is_loading: bool,
    is_consuming: bool,

    empty_modal_open: bool,
    limit_modal_open: bool,
}

impl<A: BatteryAuthority> BatteryStore<A> {
    pub fn new(client: BatteryClient<A>) -> Self {
        Self {
            client,
            status: None,
            current_context: None,
            settings: None,
            is_loading: false,
            is_consuming: false,
            empty_modal_open: false,
            limit_modal_open: false,
        }
    }

    /// Replace the focused status with a fresh fetch for this context
    pub async fn fetch_status(&mut self, user_id: UserId, context_id: ContextId) {
        self.is_loading = true;

        let status = self.client.fetch_status(user_id, context_id).await;
        if let Some(s) = &status {
            self.settings = Some(s.settings.clone());
        }
        self.status = status;
        self.current_context = Some(context_id);

        self.is_loading = false;
    }

    /// Refresh the shared settings; keeps the old ones on failure
    pub async fn fetch_settings(&mut self) {
        if let Some(settings) = self.client.fetch_settings().await {
            self.settings = Some(settings);
        }
    }

    /// Consume energy for one action and apply the authoritative balance
    ///
    /// On success only `battery_current` is replaced, with the value the
    /// authority reported, never a locally computed subtraction. An
    /// insufficient-battery rejection raises the empty-battery modal flag.
    /// The result is returned either way so the caller can abort its action.
    pub async fn consume(
        &mut self,
        user_id: UserId,
        context_id: ContextId,
        action: BatteryAction,
        context: Option<Value>,
    ) -> ConsumeResult {
        self.is_consuming = true;

        let result = self
            .client
            .consume(user_id, context_id, action, context.unwrap_or(Value::Null))
            .await;

        match &result {
            ConsumeResult::Consumed {
                battery_current, ..
            } => {
                if let Some(status) = &mut self.status {
                    status.battery_current = *battery_current;
                }
            }
            ConsumeResult::Rejected { error, .. } => {
                if *error == ConsumeError::InsufficientBattery {
                    self.empty_modal_open = true;
                }
            }
        }

        self.is_consuming = false;
        result
    }

    /// Read-only gate check, bypassed entirely for full-access profiles
    pub async fn check_can_perform_action(
        &mut self,
        profile: Option<&UserProfile>,
        user_id: UserId,
        context_id: ContextId,
        action: BatteryAction,
    ) -> ActionCheck {
        if let Some(profile) = profile {
            if entitlement::has_full_access(profile) {
                return ActionCheck {
                    can_perform: true,
                    cost: 0,
                    battery_current: self
                        .status
                        .as_ref()
                        .map(|s| s.battery_current)
                        .unwrap_or(0),
                    is_premium: true,
                };
            }
        }

        self.client
            .check_can_perform_action(user_id, context_id, action)
            .await
    }

    /// Free-tier context limit check; raises the limit modal when denied
    pub async fn check_can_add_context(&mut self, user_id: UserId) -> CanAddContext {
        let result = self.client.check_can_add_context(user_id).await;
        if !result.can_add && !result.is_premium {
            self.limit_modal_open = true;
        }
        result
    }

    /// Recent consumption events for the focused pair
    pub async fn history(
        &mut self,
        user_id: UserId,
        context_id: ContextId,
        limit: usize,
    ) -> Vec<crate::battery::status::BatteryHistoryEntry> {
        self.client.history(user_id, context_id, limit).await
    }

    /// Force the next settings fetch to hit the authority
    pub fn invalidate_settings_cache(&mut self) {
        self.client.invalidate_settings_cache();
    }

    // Modal visibility: plain booleans the surrounding UI reads

    pub fn open_empty_modal(&mut self) {
        self.empty_modal_open = true;
    }

    pub fn close_empty_modal(&mut self) {
        self.empty_modal_open = false;
    }

    pub fn open_limit_modal(&mut self) {
        self.limit_modal_open = true;
    }

    pub fn close_limit_modal(&mut self) {
        self.limit_modal_open = false;
    }

    /// Drop all session state, keeping only the client
    pub fn reset(&mut self) {
        self.status = None;
        self.current_context = None;
        self.settings = None;
        self.is_loading = false;
        self.is_consuming = false;
        self.empty_modal_open = false;
        self.limit_modal_open = false;
    }

    pub fn status(&self) -> Option<&BatteryStatus> {
        self.status.as_ref()
    }

    pub fn current_context(&self) -> Option<ContextId> {
        self.current_context
    }

    pub fn settings(&self) -> Option<&BatterySettings> {
        self.settings.as_ref()
    }

    pub fn is_loading(&self) -> bool {
        self.is_loading
    }

    pub fn is_consuming(&self) -> bool {
        self.is_consuming
    }

    pub fn empty_modal_open(&self) -> bool {
        self.empty_modal_open
    }

    pub fn limit_modal_open(&self) -> bool {
        self.limit_modal_open
    }
}
