//! HTTP battery authority
//!
//! Thin JSON-RPC wrapper over the remote authority. The remote owns the
//! atomic balance mutation; this module only frames requests and decodes the
//! loosely typed responses into the typed battery model.

use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;

use crate::battery::action::BatteryAction;
use crate::battery::authority::BatteryAuthority;
use crate::battery::settings::BatterySettings;
use crate::battery::status::{
    BatteryHistoryEntry, BatteryStatus, CanAddContext, ConsumeError, ConsumeResult,
};
use crate::core::config::ClientConfig;
use crate::core::error::{Result, TrilhaError};
use crate::core::types::{ContextId, UserId};

/// Remote balance authority reached over HTTP
pub struct HttpAuthority {
    client: Client,
    base_url: String,
    api_key: String,
}

impl HttpAuthority {
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| TrilhaError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            base_url: config.authority_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
        })
    }

    /// Call one remote procedure and return its JSON payload
    async fn rpc(&self, function: &str, params: Value) -> Result<Value> {
        let url = format!("{}/rpc/{}", self.base_url, function);

        let response = self
            .client
            .post(&url)
            .header("apikey", &self.api_key)
            .header("content-type", "application/json")
            .json(&params)
            .send()
            .await
            .map_err(|e| TrilhaError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(TrilhaError::Authority(format!(
                "{} returned {}: {}",
                function, status, body
            )));
        }

        response
            .json()
            .await
            .map_err(|e| TrilhaError::Transport(e.to_string()))
    }
}

#[derive(Deserialize)]
struct StatusWire {
    error: Option<String>,
    battery_current: Option<u32>,
    battery_max: Option<u32>,
    last_recharge: Option<DateTime<Utc>>,
    needs_recharge: Option<bool>,
    is_premium: Option<bool>,
    has_unlimited_battery: Option<bool>,
    unlimited_expires_at: Option<DateTime<Utc>>,
    active_contexts: Option<u32>,
    settings: Option<Value>,
}

impl StatusWire {
    /// A payload carrying an error field is "no status available"
    fn into_status(self) -> Result<BatteryStatus> {
        if let Some(error) = self.error {
            return Err(TrilhaError::Authority(error));
        }

        let settings = match &self.settings {
            Some(v) => BatterySettings::from_value(v),
            None => BatterySettings::default(),
        };

        Ok(BatteryStatus {
            battery_current: self.battery_current.unwrap_or(0),
            battery_max: self.battery_max.unwrap_or(settings.max_battery),
            last_recharge: self.last_recharge,
            needs_recharge: self.needs_recharge.unwrap_or(false),
            is_premium: self.is_premium.unwrap_or(false),
            has_unlimited_battery: self.has_unlimited_battery.unwrap_or(false),
            unlimited_expires_at: self.unlimited_expires_at,
            active_contexts: self.active_contexts.unwrap_or(0),
            max_contexts_free: settings.max_contexts_free,
            settings,
        })
    }
}

#[derive(Deserialize)]
struct ConsumeWire {
    success: bool,
    battery_before: Option<u32>,
    battery_current: Option<u32>,
    cost: Option<u32>,
    is_premium: Option<bool>,
    error: Option<String>,
    checkout_url: Option<String>,
}

impl ConsumeWire {
    fn into_result(self) -> ConsumeResult {
        if self.success {
            let current = self.battery_current.unwrap_or(0);
            return ConsumeResult::Consumed {
                battery_before: self.battery_before.unwrap_or(current),
                battery_current: current,
                cost: self.cost.unwrap_or(0),
                is_premium: self.is_premium.unwrap_or(false),
            };
        }

        let error = match self.error.as_deref() {
            Some("insufficient_battery") => ConsumeError::InsufficientBattery,
            Some("user_trail_not_found") | None => ConsumeError::ContextNotFound,
            Some(other) => {
                tracing::warn!("[HttpAuthority] unknown consume error tag: {}", other);
                ConsumeError::ContextNotFound
            }
        };

        ConsumeResult::Rejected {
            error,
            battery_current: self.battery_current,
            checkout_url: self.checkout_url,
        }
    }
}

#[derive(Deserialize)]
struct CanAddWire {
    can_add: bool,
    is_premium: bool,
    current_count: Option<u32>,
    max_allowed: Option<u32>,
    checkout_url: Option<String>,
}

#[derive(Deserialize)]
struct HistoryWire {
    action_type: BatteryAction,
    cost: u32,
    battery_after: u32,
    created_at: DateTime<Utc>,
}

impl BatteryAuthority for HttpAuthority {
    async fn get_settings(&self) -> Result<BatterySettings> {
        let data = self.rpc("get_battery_settings", json!({})).await?;
        Ok(BatterySettings::from_value(&data))
    }

    async fn get_status(&self, user_id: UserId, context_id: ContextId) -> Result<BatteryStatus> {
        let data = self
            .rpc(
                "get_user_battery_status",
                json!({
                    "p_user_id": user_id,
                    "p_context_id": context_id,
                }),
            )
            .await?;

        let wire: StatusWire = serde_json::from_value(data)?;
        wire.into_status()
    }

    async fn consume(
        &self,
        user_id: UserId,
        context_id: ContextId,
        action: BatteryAction,
        context: Value,
    ) -> Result<ConsumeResult> {
        let data = self
            .rpc(
                "consume_battery",
                json!({
                    "p_user_id": user_id,
                    "p_context_id": context_id,
                    "p_action_type": action.as_str(),
                    "p_context": context,
                }),
            )
            .await?;

        let wire: ConsumeWire = serde_json::from_value(data)?;
        Ok(wire.into_result())
    }

    async fn check_can_add_context(&self, user_id: UserId) -> Result<CanAddContext> {
        let data = self
            .rpc("check_can_add_context", json!({ "p_user_id": user_id }))
            .await?;

        let wire: CanAddWire = serde_json::from_value(data)?;
        Ok(CanAddContext {
            can_add: wire.can_add,
            is_premium: wire.is_premium,
            current_count: wire.current_count,
            max_allowed: wire.max_allowed,
            checkout_url: wire.checkout_url,
        })
    }

    async fn history(
        &self,
        user_id: UserId,
        context_id: ContextId,
        limit: usize,
    ) -> Result<Vec<BatteryHistoryEntry>> {
        let data = self
            .rpc(
                "get_battery_history",
                json!({
                    "p_user_id": user_id,
                    "p_context_id": context_id,
                    "p_limit": limit,
                }),
            )
            .await?;

        let wire: Vec<HistoryWire> = serde_json::from_value(data)?;
        Ok(wire
            .into_iter()
            .map(|entry| BatteryHistoryEntry {
                action: entry.action_type,
                cost: entry.cost,
                battery_after: entry.battery_after,
                created_at: entry.created_at,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_status_wire_with_error_is_no_status() {
        let wire: StatusWire = serde_json::from_value(json!({
            "error": "user_trail_not_found",
            "battery_current": 0,
        }))
        .unwrap();
        assert!(matches!(
            wire.into_status(),
            Err(TrilhaError::Authority(msg)) if msg == "user_trail_not_found"
        ));
    }

    #[test]
    fn test_status_wire_decodes_loose_settings() {
        let wire: StatusWire = serde_json::from_value(json!({
            "battery_current": 42,
            "battery_max": 100,
            "is_premium": false,
            "settings": { "cost_per_question": "3" },
        }))
        .unwrap();
        let status = wire.into_status().unwrap();
        assert_eq!(status.battery_current, 42);
        assert_eq!(status.settings.cost_per_question, 3);
    }

    #[test]
    fn test_consume_wire_success() {
        let wire: ConsumeWire = serde_json::from_value(json!({
            "success": true,
            "battery_before": 10,
            "battery_current": 8,
            "cost": 2,
            "is_premium": false,
        }))
        .unwrap();
        assert_eq!(
            wire.into_result(),
            ConsumeResult::Consumed {
                battery_before: 10,
                battery_current: 8,
                cost: 2,
                is_premium: false,
            }
        );
    }

    #[test]
    fn test_consume_wire_failure_tags() {
        let wire: ConsumeWire = serde_json::from_value(json!({
            "success": false,
            "error": "insufficient_battery",
            "battery_current": 1,
            "checkout_url": "https://checkout",
        }))
        .unwrap();
        match wire.into_result() {
            ConsumeResult::Rejected {
                error,
                battery_current,
                checkout_url,
            } => {
                assert_eq!(error, ConsumeError::InsufficientBattery);
                assert_eq!(battery_current, Some(1));
                assert_eq!(checkout_url.as_deref(), Some("https://checkout"));
            }
            other => panic!("expected rejection, got {:?}", other),
        }
    }
}
