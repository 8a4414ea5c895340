//! Battery settings - global cost table and free-tier limits
//!
//! The authority stores these as loosely typed key/value pairs, so booleans
//! and integers may arrive as strings. Normalization happens here, exactly
//! once, at the authority boundary: malformed fields are logged and replaced
//! by the defaults below. Everything past this module sees typed values.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::battery::action::BatteryAction;

/// Default maximum battery charge
pub const DEFAULT_MAX_BATTERY: u32 = 100;

/// Default energy restored by the daily recharge
pub const DEFAULT_DAILY_RECHARGE: u32 = 100;

/// Default hour of day (UTC) at which the daily recharge lands
pub const DEFAULT_RECHARGE_HOUR: u8 = 0;

/// Default cost of answering one question
pub const DEFAULT_COST_QUESTION: u32 = 2;

/// Default cost of starting a mission
pub const DEFAULT_COST_MISSION_START: u32 = 5;

/// Default cost of one chat message
pub const DEFAULT_COST_CHAT_MESSAGE: u32 = 3;

/// Default cost of generating chat audio
pub const DEFAULT_COST_CHAT_AUDIO: u32 = 5;

/// Default cost of generating a chat podcast
pub const DEFAULT_COST_CHAT_PODCAST: u32 = 10;

/// Default cost of generating a quick summary
pub const DEFAULT_COST_CHAT_SUMMARY: u32 = 5;

/// Default cost of creating a notebook
pub const DEFAULT_COST_NOTEBOOK_CREATE: u32 = 10;

/// Default cost of a practice session
pub const DEFAULT_COST_PRACTICE_SESSION: u32 = 5;

/// Default number of concurrent contexts on the free tier
pub const DEFAULT_MAX_CONTEXTS_FREE: u32 = 1;

/// Default minimum answered questions before chat unlocks
pub const DEFAULT_CHAT_MIN_QUESTIONS: u32 = 10;

/// Default notebook cap on the free tier
pub const DEFAULT_NOTEBOOKS_MAX_FREE: u32 = 3;

/// Global battery settings as served by the authority
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatterySettings {
    pub is_enabled: bool,
    pub max_battery: u32,
    pub daily_recharge: u32,
    pub recharge_hour: u8,

    // Cost table
    pub cost_per_question: u32,
    pub cost_per_mission_start: u32,
    pub cost_per_chat_message: u32,
    pub cost_per_chat_audio: u32,
    pub cost_per_chat_podcast: u32,
    pub cost_per_chat_summary: u32,
    pub cost_per_notebook_create: u32,
    pub cost_per_practice_session: u32,

    // Free-tier limits
    pub max_contexts_free: u32,
    pub chat_enabled_free: bool,
    pub chat_requires_practice: bool,
    pub chat_min_questions: u32,
    pub notebooks_enabled_free: bool,
    pub notebooks_max_free: u32,
    pub practice_enabled_free: bool,
}

impl Default for BatterySettings {
    fn default() -> Self {
        Self {
            is_enabled: true,
            max_battery: DEFAULT_MAX_BATTERY,
            daily_recharge: DEFAULT_DAILY_RECHARGE,
            recharge_hour: DEFAULT_RECHARGE_HOUR,
            cost_per_question: DEFAULT_COST_QUESTION,
            cost_per_mission_start: DEFAULT_COST_MISSION_START,
            cost_per_chat_message: DEFAULT_COST_CHAT_MESSAGE,
            cost_per_chat_audio: DEFAULT_COST_CHAT_AUDIO,
            cost_per_chat_podcast: DEFAULT_COST_CHAT_PODCAST,
            cost_per_chat_summary: DEFAULT_COST_CHAT_SUMMARY,
            cost_per_notebook_create: DEFAULT_COST_NOTEBOOK_CREATE,
            cost_per_practice_session: DEFAULT_COST_PRACTICE_SESSION,
            max_contexts_free: DEFAULT_MAX_CONTEXTS_FREE,
            chat_enabled_free: true,
            chat_requires_practice: false,
            chat_min_questions: DEFAULT_CHAT_MIN_QUESTIONS,
            notebooks_enabled_free: true,
            notebooks_max_free: DEFAULT_NOTEBOOKS_MAX_FREE,
            practice_enabled_free: true,
        }
    }
}

impl BatterySettings {
    /// Normalize a loosely typed settings payload into typed settings
    ///
    /// Absent fields take the documented defaults. Present-but-malformed
    /// fields are logged and also take the defaults.
    pub fn from_value(data: &Value) -> Self {
        let defaults = Self::default();
        Self {
            is_enabled: bool_field(data, "is_enabled", defaults.is_enabled),
            max_battery: u32_field(data, "max_battery", defaults.max_battery),
            daily_recharge: u32_field(data, "daily_recharge", defaults.daily_recharge),
            recharge_hour: u32_field(data, "recharge_hour", defaults.recharge_hour as u32)
                .min(23) as u8,
            cost_per_question: u32_field(data, "cost_per_question", defaults.cost_per_question),
            cost_per_mission_start: u32_field(
                data,
                "cost_per_mission_start",
                defaults.cost_per_mission_start,
            ),
            cost_per_chat_message: u32_field(
                data,
                "cost_per_chat_message",
                defaults.cost_per_chat_message,
            ),
            cost_per_chat_audio: u32_field(
                data,
                "cost_per_chat_audio",
                defaults.cost_per_chat_audio,
            ),
            cost_per_chat_podcast: u32_field(
                data,
                "cost_per_chat_podcast",
                defaults.cost_per_chat_podcast,
            ),
            cost_per_chat_summary: u32_field(
                data,
                "cost_per_chat_summary",
                defaults.cost_per_chat_summary,
            ),
            cost_per_notebook_create: u32_field(
                data,
                "cost_per_notebook_create",
                defaults.cost_per_notebook_create,
            ),
            cost_per_practice_session: u32_field(
                data,
                "cost_per_practice_session",
                defaults.cost_per_practice_session,
            ),
            max_contexts_free: u32_field(data, "max_preparatorios_free", defaults.max_contexts_free),
            chat_enabled_free: bool_field(data, "chat_enabled_free", defaults.chat_enabled_free),
            chat_requires_practice: bool_field(
                data,
                "chat_requires_practice",
                defaults.chat_requires_practice,
            ),
            chat_min_questions: u32_field(data, "chat_min_questions", defaults.chat_min_questions),
            notebooks_enabled_free: bool_field(
                data,
                "notebooks_enabled_free",
                defaults.notebooks_enabled_free,
            ),
            notebooks_max_free: u32_field(data, "notebooks_max_free", defaults.notebooks_max_free),
            practice_enabled_free: bool_field(
                data,
                "practice_enabled_free",
                defaults.practice_enabled_free,
            ),
        }
    }

    /// Cost of a single action
    pub fn cost_for(&self, action: BatteryAction) -> u32 {
        match action {
            BatteryAction::Question => self.cost_per_question,
            BatteryAction::MissionStart => self.cost_per_mission_start,
            BatteryAction::ChatMessage => self.cost_per_chat_message,
            BatteryAction::ChatAudio => self.cost_per_chat_audio,
            BatteryAction::ChatPodcast => self.cost_per_chat_podcast,
            BatteryAction::ChatSummary => self.cost_per_chat_summary,
            BatteryAction::NotebookCreate => self.cost_per_notebook_create,
            BatteryAction::PracticeSession => self.cost_per_practice_session,
        }
    }

    /// Validate settings for internal consistency
    pub fn validate(&self) -> Result<(), String> {
        if self.is_enabled && self.max_battery == 0 {
            return Err("max_battery must be positive when battery is enabled".into());
        }
        if self.recharge_hour > 23 {
            return Err(format!("recharge_hour out of range: {}", self.recharge_hour));
        }
        Ok(())
    }
}

/// Read a bool that may be encoded as a bool or the strings "true"/"false"
fn loose_bool(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::String(s) => match s.as_str() {
            "true" => Some(true),
            "false" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

/// Read an integer that may be encoded as a number or a numeric string
fn loose_u32(value: &Value) -> Option<u32> {
    match value {
        Value::Number(n) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn bool_field(data: &Value, name: &str, default: bool) -> bool {
    match data.get(name) {
        None | Some(Value::Null) => default,
        Some(v) => loose_bool(v).unwrap_or_else(|| {
            tracing::warn!("[BatterySettings] malformed field {}: {:?}", name, v);
            default
        }),
    }
}

fn u32_field(data: &Value, name: &str, default: u32) -> u32 {
    match data.get(name) {
        None | Some(Value::Null) => default,
        Some(v) => loose_u32(v).unwrap_or_else(|| {
            tracing::warn!("[BatterySettings] malformed field {}: {:?}", name, v);
            default
        }),
    }
}
