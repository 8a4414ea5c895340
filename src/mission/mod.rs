//! Mission layer - the learning-attempt state machine

pub mod engine;
pub mod types;

pub use engine::MissionEngine;
pub use types::{
    Content, MassificationAction, MassificationCheck, Mission, MissionAnswer, MissionKind,
    MissionPhase, MissionResult, Progress, Question, ScoreSummary, PASSING_SCORE,
};
