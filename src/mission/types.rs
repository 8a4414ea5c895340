//! Mission domain types
//!
//! A mission is one learning unit: optional reading content followed by a
//! graded question set. Scores are percentages in 0..=100.

use serde::{Deserialize, Serialize};

use crate::core::types::{MissionId, QuestionId};

/// Minimum score (percent) to pass a mission; anything below triggers the
/// massification retry flow
pub const PASSING_SCORE: f32 = 50.0;

/// Mission flavor within a round
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissionKind {
    Normal,
    Review,
    RoundExam,
    Massification,
}

/// One mission on the trail
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mission {
    pub id: MissionId,
    pub subject: String,
    pub kind: MissionKind,
    pub order: u32,
}

/// Reading material shown before the questions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Content {
    pub id: String,
    pub text: String,
    pub audio_url: Option<String>,
}

/// One multiple-choice question
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    pub id: QuestionId,
    pub statement: String,
    pub options: Vec<String>,
    pub correct_option: usize,
}

impl Question {
    pub fn is_correct(&self, option: usize) -> bool {
        option == self.correct_option
    }
}

/// One recorded answer; at most one per question id
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MissionAnswer {
    pub question_id: QuestionId,
    pub selected_option: usize,
    pub is_correct: bool,
    pub time_spent_secs: Option<u32>,
}

/// Final outcome of one attempt, immutable once computed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MissionResult {
    pub mission_id: Option<MissionId>,
    pub total_questions: usize,
    pub correct_answers: usize,
    /// Percentage, `correct / total * 100`; 0 when there are no questions
    pub score: f32,
    pub time_spent_secs: u64,
    pub answers: Vec<MissionAnswer>,
}

/// What happens after a finished attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MassificationAction {
    UnlockNext,
    MassificationRequired,
}

/// Pass/fail verdict against the fixed passing threshold
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MassificationCheck {
    pub passed: bool,
    pub score: f32,
    pub required_score: f32,
    pub action: MassificationAction,
}

/// Where the attempt currently is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissionPhase {
    #[default]
    Content,
    Questions,
    Result,
    Massification,
}

/// Position within the question set
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Progress {
    pub current: usize,
    pub total: usize,
    pub percentage: f32,
}

/// Running score over the answers recorded so far
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreSummary {
    pub correct: usize,
    pub total: usize,
    pub percentage: f32,
}
