//! Mission progression engine
//!
//! State machine for one learning attempt:
//! content -> questions -> (result | massification)
//!
//! Fully synchronous; the battery system gates entry from outside, nothing
//! here does I/O. Scoring happens in exactly one place, `finish_mission`.
//! A failed attempt transitions to massification, from which `retry_mission`
//! restarts the same mission with the same question set.

use chrono::{DateTime, Utc};

use crate::mission::types::{
    Content, MassificationAction, MassificationCheck, Mission, MissionAnswer, MissionPhase,
    MissionResult, Progress, Question, ScoreSummary, PASSING_SCORE,
};

/// One mission attempt and its bookkeeping
#[derive(Debug, Clone, Default)]
pub struct MissionEngine {
    current_mission: Option<Mission>,
    phase: MissionPhase,

    content: Option<Content>,
    content_read: bool,

    questions: Vec<Question>,
    current_question_index: usize,
    answers: Vec<MissionAnswer>,
    started_at: Option<DateTime<Utc>>,

    result: Option<MissionResult>,
    massification_check: Option<MassificationCheck>,
}

impl MissionEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Begin a fresh attempt
    ///
    /// Missions without reading material go straight to the questions phase.
    pub fn start_mission(
        &mut self,
        mission: Mission,
        content: Option<Content>,
        questions: Vec<Question>,
    ) {
        self.phase = if content.is_some() {
            MissionPhase::Content
        } else {
            MissionPhase::Questions
        };
        self.current_mission = Some(mission);
        self.content = content;
        self.content_read = false;
        self.questions = questions;
        self.current_question_index = 0;
        self.answers.clear();
        self.started_at = None;
        self.result = None;
        self.massification_check = None;
    }

    /// Flag the reading material as read; does not change phase
    pub fn mark_content_read(&mut self) {
        self.content_read = true;
    }

    /// Enter the questions phase and start the attempt clock
    pub fn start_questions(&mut self) {
        self.phase = MissionPhase::Questions;
        self.started_at = Some(Utc::now());
    }

    /// Record an answer, replacing any previous answer to the same question
    ///
    /// Idempotent under repeated identical submissions; re-answering keeps
    /// exactly one entry per question id.
    pub fn answer_question(&mut self, answer: MissionAnswer) {
        match self
            .answers
            .iter_mut()
            .find(|a| a.question_id == answer.question_id)
        {
            Some(existing) => *existing = answer,
            None => self.answers.push(answer),
        }
    }

    pub fn next_question(&mut self) {
        self.go_to_question(self.current_question_index + 1);
    }

    pub fn previous_question(&mut self) {
        self.go_to_question(self.current_question_index.saturating_sub(1));
    }

    /// Jump to a question, clamping out-of-range indexes instead of failing
    pub fn go_to_question(&mut self, index: usize) {
        let last = self.questions.len().saturating_sub(1);
        self.current_question_index = index.min(last);
    }

    /// Compute the result, run the massification check, and transition
    ///
    /// The single source of truth for scoring: `correct / total * 100`, or 0
    /// for an empty question set. Elapsed time falls back to 0 when the
    /// clock was never started.
    pub fn finish_mission(&mut self) -> MissionResult {
        let correct_answers = self.answers.iter().filter(|a| a.is_correct).count();
        let total_questions = self.questions.len();
        let score = if total_questions > 0 {
            (correct_answers as f32 / total_questions as f32) * 100.0
        } else {
            0.0
        };
        let time_spent_secs = self
            .started_at
            .map(|start| (Utc::now() - start).num_seconds().max(0) as u64)
            .unwrap_or(0);

        let result = MissionResult {
            mission_id: self.current_mission.as_ref().map(|m| m.id),
            total_questions,
            correct_answers,
            score,
            time_spent_secs,
            answers: self.answers.clone(),
        };

        let check = Self::check_massification(&result);
        self.phase = if check.passed {
            MissionPhase::Result
        } else {
            MissionPhase::Massification
        };
        self.result = Some(result.clone());
        self.massification_check = Some(check);

        result
    }

    /// Verdict for a finished result against the fixed passing threshold
    pub fn check_massification(result: &MissionResult) -> MassificationCheck {
        let passed = result.score >= PASSING_SCORE;
        MassificationCheck {
            passed,
            score: result.score,
            required_score: PASSING_SCORE,
            action: if passed {
                MassificationAction::UnlockNext
            } else {
                MassificationAction::MassificationRequired
            },
        }
    }

    /// Retry the same mission with the same question set
    ///
    /// Attempt-scoped state resets; mission identity, content, and questions
    /// are preserved so no refetch is needed.
    pub fn retry_mission(&mut self) {
        if self.current_mission.is_none() {
            return;
        }
        self.phase = if self.content.is_some() {
            MissionPhase::Content
        } else {
            MissionPhase::Questions
        };
        self.content_read = false;
        self.current_question_index = 0;
        self.answers.clear();
        self.started_at = None;
        self.result = None;
        self.massification_check = None;
    }

    /// Full teardown, used when abandoning a mission entirely
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    // Derived queries: pure projections, safe to call in any phase

    pub fn current_question(&self) -> Option<&Question> {
        self.questions.get(self.current_question_index)
    }

    pub fn progress(&self) -> Progress {
        let total = self.questions.len();
        let current = if total > 0 {
            self.current_question_index + 1
        } else {
            0
        };
        let percentage = if total > 0 {
            (current as f32 / total as f32) * 100.0
        } else {
            0.0
        };
        Progress {
            current,
            total,
            percentage,
        }
    }

    pub fn score(&self) -> ScoreSummary {
        let total = self.questions.len();
        let correct = self.answers.iter().filter(|a| a.is_correct).count();
        let percentage = if total > 0 {
            (correct as f32 / total as f32) * 100.0
        } else {
            0.0
        };
        ScoreSummary {
            correct,
            total,
            percentage,
        }
    }

    pub fn phase(&self) -> MissionPhase {
        self.phase
    }

    pub fn current_mission(&self) -> Option<&Mission> {
        self.current_mission.as_ref()
    }

    pub fn content(&self) -> Option<&Content> {
        self.content.as_ref()
    }

    pub fn content_read(&self) -> bool {
        self.content_read
    }

    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    pub fn current_question_index(&self) -> usize {
        self.current_question_index
    }

    pub fn answers(&self) -> &[MissionAnswer] {
        &self.answers
    }

    pub fn result(&self) -> Option<&MissionResult> {
        self.result.as_ref()
    }

    pub fn massification_check(&self) -> Option<&MassificationCheck> {
        self.massification_check.as_ref()
    }

    pub fn is_finished(&self) -> bool {
        matches!(
            self.phase,
            MissionPhase::Result | MissionPhase::Massification
        )
    }
}
