//! Battery-gated action kinds
//!
//! Closed set of actions that cost energy. An unrecognized kind coming from
//! our own code is a caller bug, so there is no "other" variant.

use serde::{Deserialize, Serialize};

/// Action kinds that consume battery
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatteryAction {
    Question,
    MissionStart,
    ChatMessage,
    ChatAudio,
    ChatPodcast,
    ChatSummary,
    NotebookCreate,
    PracticeSession,
}

impl BatteryAction {
    /// Wire literal sent to the authority
    pub fn as_str(&self) -> &'static str {
        match self {
            BatteryAction::Question => "question",
            BatteryAction::MissionStart => "mission_start",
            BatteryAction::ChatMessage => "chat_message",
            BatteryAction::ChatAudio => "chat_audio",
            BatteryAction::ChatPodcast => "chat_podcast",
            BatteryAction::ChatSummary => "chat_summary",
            BatteryAction::NotebookCreate => "notebook_create",
            BatteryAction::PracticeSession => "practice_session",
        }
    }

    /// All action kinds, in cost-table order
    pub fn all() -> [BatteryAction; 8] {
        [
            BatteryAction::Question,
            BatteryAction::MissionStart,
            BatteryAction::ChatMessage,
            BatteryAction::ChatAudio,
            BatteryAction::ChatPodcast,
            BatteryAction::ChatSummary,
            BatteryAction::NotebookCreate,
            BatteryAction::PracticeSession,
        ]
    }
}

impl std::fmt::Display for BatteryAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_literals_are_snake_case() {
        assert_eq!(BatteryAction::MissionStart.as_str(), "mission_start");
        assert_eq!(BatteryAction::ChatPodcast.as_str(), "chat_podcast");
    }

    #[test]
    fn test_serde_round_trip() {
        let json = serde_json::to_string(&BatteryAction::NotebookCreate).unwrap();
        assert_eq!(json, "\"notebook_create\"");
        let back: BatteryAction = serde_json::from_str(&json).unwrap();
        assert_eq!(back, BatteryAction::NotebookCreate);
    }
}
