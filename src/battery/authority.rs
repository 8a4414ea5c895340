//! Battery authority contract
//!
//! The authority owns the true, concurrency-safe balance. The client never
//! decrements locally; it applies whatever post-operation balance the
//! authority reports. Two implementations exist: `HttpAuthority` (remote,
//! opaque) and `InMemoryLedger` (self-contained single-writer ledger).

use serde_json::Value;

use crate::battery::action::BatteryAction;
use crate::battery::settings::BatterySettings;
use crate::battery::status::{BatteryHistoryEntry, BatteryStatus, CanAddContext, ConsumeResult};
use crate::core::error::Result;
use crate::core::types::{ContextId, UserId};

/// Operations the balance authority must provide
pub trait BatteryAuthority: Send + Sync {
    /// Fetch the global settings (cost table, limits)
    fn get_settings(&self) -> impl std::future::Future<Output = Result<BatterySettings>> + Send;

    /// Fetch the live status for one (user, context) pair
    ///
    /// A domain error reported by the authority (e.g. no trail for this
    /// context) surfaces as `TrilhaError::Authority`, not as a status.
    fn get_status(
        &self,
        user_id: UserId,
        context_id: ContextId,
    ) -> impl std::future::Future<Output = Result<BatteryStatus>> + Send;

    /// Atomically consume energy for one action
    ///
    /// `context` is free-form metadata recorded with the event (mission id,
    /// question id, ...). The authority serializes concurrent consumes and
    /// reports the resulting balance.
    fn consume(
        &self,
        user_id: UserId,
        context_id: ContextId,
        action: BatteryAction,
        context: Value,
    ) -> impl std::future::Future<Output = Result<ConsumeResult>> + Send;

    /// Check whether the user may enroll in another context
    fn check_can_add_context(
        &self,
        user_id: UserId,
    ) -> impl std::future::Future<Output = Result<CanAddContext>> + Send;

    /// Recent consumption events, newest first
    fn history(
        &self,
        user_id: UserId,
        context_id: ContextId,
        limit: usize,
    ) -> impl std::future::Future<Output = Result<Vec<BatteryHistoryEntry>>> + Send;
}

// Shared authorities (store + admin handle pointing at the same ledger)
impl<A: BatteryAuthority> BatteryAuthority for std::sync::Arc<A> {
    async fn get_settings(&self) -> Result<BatterySettings> {
        (**self).get_settings().await
    }

    async fn get_status(&self, user_id: UserId, context_id: ContextId) -> Result<BatteryStatus> {
        (**self).get_status(user_id, context_id).await
    }

    async fn consume(
        &self,
        user_id: UserId,
        context_id: ContextId,
        action: BatteryAction,
        context: Value,
    ) -> Result<ConsumeResult> {
        (**self).consume(user_id, context_id, action, context).await
    }

    async fn check_can_add_context(&self, user_id: UserId) -> Result<CanAddContext> {
        (**self).check_can_add_context(user_id).await
    }

    async fn history(
        &self,
        user_id: UserId,
        context_id: ContextId,
        limit: usize,
    ) -> Result<Vec<BatteryHistoryEntry>> {
        (**self).history(user_id, context_id, limit).await
    }
}
