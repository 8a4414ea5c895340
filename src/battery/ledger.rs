//! In-memory battery ledger - a self-contained authority
//!
//! Single-writer ledger keyed by (user, context). All mutations go through
//! one async mutex, so concurrent consumes are strictly serialized and the
//! balance invariant (0 <= current <= max) holds no matter how requests
//! interleave. The row logic itself is synchronous and takes an explicit
//! `now`, which keeps it testable without a runtime.

use ahash::{AHashMap, AHashSet};
use chrono::{DateTime, Duration, Utc};
use serde_json::Value;
use tokio::sync::Mutex;

use crate::battery::action::BatteryAction;
use crate::battery::authority::BatteryAuthority;
use crate::battery::settings::BatterySettings;
use crate::battery::status::{
    BatteryHistoryEntry, BatteryStatus, CanAddContext, ConsumeError, ConsumeResult,
};
use crate::core::error::{Result, TrilhaError};
use crate::core::types::{ContextId, UserId};

/// Maximum history entries retained per row
const HISTORY_CAP: usize = 100;

/// One ledger row: the balance for a single (user, context) pair
#[derive(Debug, Clone)]
struct LedgerRow {
    current: u32,
    max: u32,
    last_recharge: DateTime<Utc>,
    has_unlimited: bool,
    unlimited_expires_at: Option<DateTime<Utc>>,
    history: Vec<BatteryHistoryEntry>,
}

impl LedgerRow {
    fn new(max: u32, now: DateTime<Utc>) -> Self {
        Self {
            current: max,
            max,
            last_recharge: now,
            has_unlimited: false,
            unlimited_expires_at: None,
            history: Vec::new(),
        }
    }

    fn unlimited_active(&self, now: DateTime<Utc>) -> bool {
        self.has_unlimited && self.unlimited_expires_at.map_or(true, |exp| exp > now)
    }

    fn push_history(&mut self, entry: BatteryHistoryEntry) {
        self.history.push(entry);
        if self.history.len() > HISTORY_CAP {
            self.history.remove(0);
        }
    }
}

/// Synchronous ledger state, wrapped by `InMemoryLedger`
#[derive(Debug)]
pub(crate) struct LedgerState {
    settings: BatterySettings,
    checkout_url: Option<String>,
    premium_users: AHashSet<UserId>,
    rows: AHashMap<(UserId, ContextId), LedgerRow>,
}

impl LedgerState {
    pub(crate) fn new(settings: BatterySettings, checkout_url: Option<String>) -> Self {
        Self {
            settings,
            checkout_url,
            premium_users: AHashSet::new(),
            rows: AHashMap::new(),
        }
    }

    /// Create a row for a new enrollment, starting at full charge
    pub(crate) fn enroll(&mut self, user_id: UserId, context_id: ContextId, now: DateTime<Utc>) {
        self.rows
            .entry((user_id, context_id))
            .or_insert_with(|| LedgerRow::new(self.settings.max_battery, now));
    }

    pub(crate) fn set_premium(&mut self, user_id: UserId, premium: bool) {
        if premium {
            self.premium_users.insert(user_id);
        } else {
            self.premium_users.remove(&user_id);
        }
    }

    /// Grant unlimited battery for one context until `expires_at`
    pub(crate) fn grant_unlimited(
        &mut self,
        user_id: UserId,
        context_id: ContextId,
        expires_at: Option<DateTime<Utc>>,
    ) -> bool {
        match self.rows.get_mut(&(user_id, context_id)) {
            Some(row) => {
                row.has_unlimited = true;
                row.unlimited_expires_at = expires_at;
                true
            }
            None => false,
        }
    }

    /// Refill a row to max immediately (support/admin operation)
    pub(crate) fn admin_recharge(
        &mut self,
        user_id: UserId,
        context_id: ContextId,
        now: DateTime<Utc>,
    ) -> bool {
        match self.rows.get_mut(&(user_id, context_id)) {
            Some(row) => {
                row.current = row.max;
                row.last_recharge = now;
                true
            }
            None => false,
        }
    }

    /// Most recent recharge boundary at or before `now`
    fn last_boundary(now: DateTime<Utc>, recharge_hour: u8) -> DateTime<Utc> {
        let hour = (recharge_hour as u32).min(23);
        let today = now
            .date_naive()
            .and_hms_opt(hour, 0, 0)
            .expect("hour clamped to 0..=23")
            .and_utc();
        if now >= today {
            today
        } else {
            today - Duration::days(1)
        }
    }

    /// Apply the daily recharge if a boundary has passed since the last one
    fn maybe_daily_recharge(row: &mut LedgerRow, settings: &BatterySettings, now: DateTime<Utc>) {
        let boundary = Self::last_boundary(now, settings.recharge_hour);
        if row.last_recharge < boundary {
            row.current = (row.current + settings.daily_recharge).min(row.max);
            row.last_recharge = boundary;
        }
    }

    fn active_contexts(&self, user_id: UserId) -> u32 {
        self.rows.keys().filter(|(u, _)| *u == user_id).count() as u32
    }

    pub(crate) fn status(
        &mut self,
        user_id: UserId,
        context_id: ContextId,
        now: DateTime<Utc>,
    ) -> Result<BatteryStatus> {
        let is_premium = self.premium_users.contains(&user_id);
        let active_contexts = self.active_contexts(user_id);
        let settings = self.settings.clone();

        let row = self
            .rows
            .get_mut(&(user_id, context_id))
            .ok_or_else(|| TrilhaError::Authority("user_trail_not_found".into()))?;

        Self::maybe_daily_recharge(row, &settings, now);

        Ok(BatteryStatus {
            battery_current: row.current,
            battery_max: row.max,
            last_recharge: Some(row.last_recharge),
            needs_recharge: row.current == 0,
            is_premium,
            has_unlimited_battery: row.has_unlimited,
            unlimited_expires_at: row.unlimited_expires_at,
            active_contexts,
            max_contexts_free: settings.max_contexts_free,
            settings,
        })
    }

    pub(crate) fn consume(
        &mut self,
        user_id: UserId,
        context_id: ContextId,
        action: BatteryAction,
        now: DateTime<Utc>,
    ) -> ConsumeResult {
        let is_premium = self.premium_users.contains(&user_id);
        let settings = self.settings.clone();
        let checkout_url = self.checkout_url.clone();

        let Some(row) = self.rows.get_mut(&(user_id, context_id)) else {
            return ConsumeResult::Rejected {
                error: ConsumeError::ContextNotFound,
                battery_current: None,
                checkout_url: None,
            };
        };

        Self::maybe_daily_recharge(row, &settings, now);

        // Premium, unlimited grants, and a globally disabled battery system
        // all make actions free
        if is_premium || row.unlimited_active(now) || !settings.is_enabled {
            let entry = BatteryHistoryEntry {
                action,
                cost: 0,
                battery_after: row.current,
                created_at: now,
            };
            row.push_history(entry);
            return ConsumeResult::Consumed {
                battery_before: row.current,
                battery_current: row.current,
                cost: 0,
                is_premium,
            };
        }

        let cost = settings.cost_for(action);
        if row.current < cost {
            return ConsumeResult::Rejected {
                error: ConsumeError::InsufficientBattery,
                battery_current: Some(row.current),
                checkout_url,
            };
        }

        let before = row.current;
        row.current -= cost;
        row.push_history(BatteryHistoryEntry {
            action,
            cost,
            battery_after: row.current,
            created_at: now,
        });

        ConsumeResult::Consumed {
            battery_before: before,
            battery_current: row.current,
            cost,
            is_premium: false,
        }
    }

    pub(crate) fn can_add_context(&self, user_id: UserId) -> CanAddContext {
        let is_premium = self.premium_users.contains(&user_id);
        if is_premium {
            return CanAddContext {
                can_add: true,
                is_premium: true,
                current_count: None,
                max_allowed: None,
                checkout_url: None,
            };
        }

        let count = self.active_contexts(user_id);
        let max = self.settings.max_contexts_free;
        let can_add = count < max;
        CanAddContext {
            can_add,
            is_premium: false,
            current_count: Some(count),
            max_allowed: Some(max),
            checkout_url: if can_add { None } else { self.checkout_url.clone() },
        }
    }

    pub(crate) fn history(
        &self,
        user_id: UserId,
        context_id: ContextId,
        limit: usize,
    ) -> Vec<BatteryHistoryEntry> {
        match self.rows.get(&(user_id, context_id)) {
            Some(row) => row.history.iter().rev().take(limit).cloned().collect(),
            None => Vec::new(),
        }
    }

    /// Balance invariant, checked by tests after every operation
    #[cfg(test)]
    fn invariant_holds(&self) -> bool {
        self.rows.values().all(|row| row.current <= row.max)
    }
}

/// Async facade over the ledger state
///
/// Implements `BatteryAuthority`, so the client/store stack runs unchanged
/// against it. All operations lock the single mutex, which is the strict
/// serialization the consume contract requires.
pub struct InMemoryLedger {
    state: Mutex<LedgerState>,
}

impl InMemoryLedger {
    pub fn new(settings: BatterySettings) -> Self {
        Self::with_checkout_url(settings, None)
    }

    pub fn with_checkout_url(settings: BatterySettings, checkout_url: Option<String>) -> Self {
        Self {
            state: Mutex::new(LedgerState::new(settings, checkout_url)),
        }
    }

    pub async fn enroll(&self, user_id: UserId, context_id: ContextId) {
        self.state.lock().await.enroll(user_id, context_id, Utc::now());
    }

    pub async fn set_premium(&self, user_id: UserId, premium: bool) {
        self.state.lock().await.set_premium(user_id, premium);
    }

    pub async fn grant_unlimited(
        &self,
        user_id: UserId,
        context_id: ContextId,
        expires_at: Option<DateTime<Utc>>,
    ) -> bool {
        self.state
            .lock()
            .await
            .grant_unlimited(user_id, context_id, expires_at)
    }

    pub async fn admin_recharge(&self, user_id: UserId, context_id: ContextId) -> bool {
        self.state
            .lock()
            .await
            .admin_recharge(user_id, context_id, Utc::now())
    }
}

impl BatteryAuthority for InMemoryLedger {
    async fn get_settings(&self) -> Result<BatterySettings> {
        Ok(self.state.lock().await.settings.clone())
    }

    async fn get_status(&self, user_id: UserId, context_id: ContextId) -> Result<BatteryStatus> {
        self.state.lock().await.status(user_id, context_id, Utc::now())
    }

    async fn consume(
        &self,
        user_id: UserId,
        context_id: ContextId,
        action: BatteryAction,
        _context: Value,
    ) -> Result<ConsumeResult> {
        Ok(self
            .state
            .lock()
            .await
            .consume(user_id, context_id, action, Utc::now()))
    }

    async fn check_can_add_context(&self, user_id: UserId) -> Result<CanAddContext> {
        Ok(self.state.lock().await.can_add_context(user_id))
    }

    async fn history(
        &self,
        user_id: UserId,
        context_id: ContextId,
        limit: usize,
    ) -> Result<Vec<BatteryHistoryEntry>> {
        Ok(self.state.lock().await.history(user_id, context_id, limit))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use proptest::prelude::*;

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 8, 7, hour, 30, 0).unwrap()
    }

    fn state() -> (LedgerState, UserId, ContextId) {
        let mut state = LedgerState::new(BatterySettings::default(), None);
        let user = UserId::new();
        let ctx = ContextId::new();
        state.enroll(user, ctx, at(8));
        (state, user, ctx)
    }

    #[test]
    fn test_consume_decrements_by_cost() {
        let (mut state, user, ctx) = state();
        let result = state.consume(user, ctx, BatteryAction::Question, at(9));
        match result {
            ConsumeResult::Consumed {
                battery_before,
                battery_current,
                cost,
                is_premium,
            } => {
                assert_eq!(battery_before, 100);
                assert_eq!(battery_current, 98);
                assert_eq!(cost, 2);
                assert!(!is_premium);
            }
            other => panic!("expected success, got {:?}", other),
        }
    }

    #[test]
    fn test_insufficient_battery_leaves_balance_untouched() {
        let settings = BatterySettings {
            max_battery: 4,
            cost_per_mission_start: 5,
            ..Default::default()
        };
        let mut state = LedgerState::new(settings, Some("https://checkout".into()));
        let user = UserId::new();
        let ctx = ContextId::new();
        state.enroll(user, ctx, at(8));

        let result = state.consume(user, ctx, BatteryAction::MissionStart, at(9));
        match result {
            ConsumeResult::Rejected {
                error,
                battery_current,
                checkout_url,
            } => {
                assert_eq!(error, ConsumeError::InsufficientBattery);
                assert_eq!(battery_current, Some(4));
                assert_eq!(checkout_url.as_deref(), Some("https://checkout"));
            }
            other => panic!("expected rejection, got {:?}", other),
        }
        // Balance unchanged
        let status = state.status(user, ctx, at(9)).unwrap();
        assert_eq!(status.battery_current, 4);
    }

    #[test]
    fn test_unknown_context_is_rejected() {
        let mut state = LedgerState::new(BatterySettings::default(), None);
        let result = state.consume(
            UserId::new(),
            ContextId::new(),
            BatteryAction::Question,
            at(9),
        );
        assert_eq!(result.error(), Some(ConsumeError::ContextNotFound));
    }

    #[test]
    fn test_premium_consumes_for_free() {
        let (mut state, user, ctx) = state();
        state.set_premium(user, true);
        let result = state.consume(user, ctx, BatteryAction::ChatPodcast, at(9));
        match result {
            ConsumeResult::Consumed {
                battery_current,
                cost,
                is_premium,
                ..
            } => {
                assert_eq!(battery_current, 100);
                assert_eq!(cost, 0);
                assert!(is_premium);
            }
            other => panic!("expected success, got {:?}", other),
        }
    }

    #[test]
    fn test_expired_unlimited_grant_charges_again() {
        let (mut state, user, ctx) = state();
        state.grant_unlimited(user, ctx, Some(at(10)));

        // Before expiry: free
        let result = state.consume(user, ctx, BatteryAction::Question, at(9));
        assert!(matches!(result, ConsumeResult::Consumed { cost: 0, .. }));

        // After expiry: normal cost
        let result = state.consume(user, ctx, BatteryAction::Question, at(11));
        assert!(matches!(result, ConsumeResult::Consumed { cost: 2, .. }));
    }

    #[test]
    fn test_daily_recharge_at_boundary() {
        let settings = BatterySettings {
            daily_recharge: 50,
            recharge_hour: 3,
            ..Default::default()
        };
        let mut state = LedgerState::new(settings, None);
        let user = UserId::new();
        let ctx = ContextId::new();
        let day1 = Utc.with_ymd_and_hms(2026, 8, 6, 12, 0, 0).unwrap();
        state.enroll(user, ctx, day1);

        // Burn down to 60
        for _ in 0..20 {
            state.consume(user, ctx, BatteryAction::Question, day1);
        }
        assert_eq!(state.status(user, ctx, day1).unwrap().battery_current, 60);

        // Same day, before the 03:00 boundary of the next day: no recharge
        let later = Utc.with_ymd_and_hms(2026, 8, 6, 23, 0, 0).unwrap();
        assert_eq!(state.status(user, ctx, later).unwrap().battery_current, 60);

        // Next day past 03:00: one recharge, clamped to max
        let day2 = Utc.with_ymd_and_hms(2026, 8, 7, 3, 5, 0).unwrap();
        assert_eq!(state.status(user, ctx, day2).unwrap().battery_current, 100);
    }

    #[test]
    fn test_recharge_clamps_to_max() {
        let settings = BatterySettings {
            daily_recharge: 100,
            ..Default::default()
        };
        let mut state = LedgerState::new(settings, None);
        let user = UserId::new();
        let ctx = ContextId::new();
        let day1 = Utc.with_ymd_and_hms(2026, 8, 6, 12, 0, 0).unwrap();
        state.enroll(user, ctx, day1);
        state.consume(user, ctx, BatteryAction::Question, day1);

        let day2 = Utc.with_ymd_and_hms(2026, 8, 7, 12, 0, 0).unwrap();
        let status = state.status(user, ctx, day2).unwrap();
        assert_eq!(status.battery_current, 100);
        assert!(state.invariant_holds());
    }

    #[test]
    fn test_needs_recharge_when_flat() {
        let settings = BatterySettings {
            max_battery: 2,
            cost_per_question: 2,
            daily_recharge: 0,
            ..Default::default()
        };
        let mut state = LedgerState::new(settings, None);
        let user = UserId::new();
        let ctx = ContextId::new();
        state.enroll(user, ctx, at(8));

        state.consume(user, ctx, BatteryAction::Question, at(9));
        let status = state.status(user, ctx, at(9)).unwrap();
        assert_eq!(status.battery_current, 0);
        assert!(status.needs_recharge);
    }

    #[test]
    fn test_context_limit_for_free_users() {
        let (mut state, user, _ctx) = state();
        let check = state.can_add_context(user);
        assert!(!check.can_add);
        assert_eq!(check.current_count, Some(1));
        assert_eq!(check.max_allowed, Some(1));

        state.set_premium(user, true);
        let check = state.can_add_context(user);
        assert!(check.can_add);
        assert!(check.is_premium);
    }

    #[test]
    fn test_history_is_newest_first_and_bounded() {
        let (mut state, user, ctx) = state();
        state.consume(user, ctx, BatteryAction::Question, at(9));
        state.consume(user, ctx, BatteryAction::ChatMessage, at(10));

        let history = state.history(user, ctx, 10);
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].action, BatteryAction::ChatMessage);
        assert_eq!(history[1].action, BatteryAction::Question);

        let limited = state.history(user, ctx, 1);
        assert_eq!(limited.len(), 1);
    }

    proptest! {
        /// Any interleaving of operations keeps 0 <= current <= max
        #[test]
        fn prop_balance_stays_within_bounds(ops in prop::collection::vec(0u8..5, 1..60)) {
            let settings = BatterySettings {
                max_battery: 20,
                daily_recharge: 7,
                cost_per_question: 2,
                cost_per_mission_start: 5,
                ..Default::default()
            };
            let mut state = LedgerState::new(settings, None);
            let user = UserId::new();
            let ctx = ContextId::new();
            let mut now = Utc.with_ymd_and_hms(2026, 1, 1, 12, 0, 0).unwrap();
            state.enroll(user, ctx, now);

            for op in ops {
                match op {
                    0 => { state.consume(user, ctx, BatteryAction::Question, now); }
                    1 => { state.consume(user, ctx, BatteryAction::MissionStart, now); }
                    2 => { state.admin_recharge(user, ctx, now); }
                    3 => { now = now + Duration::days(1); }
                    _ => { let _ = state.status(user, ctx, now); }
                }
                prop_assert!(state.invariant_holds());
            }
        }
    }
}
