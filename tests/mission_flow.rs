//! Integration tests for the mission progression flow
//!
//! Drives whole attempts through the engine, including the battery-gated
//! entry the surrounding flow performs before each attempt.

use std::sync::Arc;

use trilha_core::battery::{
    BatteryAction, BatteryClient, BatterySettings, BatteryStore, InMemoryLedger,
};
use trilha_core::core::types::{ContextId, MissionId, QuestionId, UserId};
use trilha_core::mission::{
    Content, MassificationAction, Mission, MissionAnswer, MissionEngine, MissionKind, MissionPhase,
    Question, PASSING_SCORE,
};

fn mission() -> Mission {
    Mission {
        id: MissionId::new(),
        subject: "Portugues".into(),
        kind: MissionKind::Normal,
        order: 1,
    }
}

fn content() -> Content {
    Content {
        id: "crase".into(),
        text: "Regras de crase...".into(),
        audio_url: None,
    }
}

fn questions(n: usize) -> Vec<Question> {
    (0..n)
        .map(|i| Question {
            id: QuestionId::new(),
            statement: format!("Questao {}", i + 1),
            options: vec!["A".into(), "B".into(), "C".into(), "D".into()],
            correct_option: i % 4,
        })
        .collect()
}

fn answer(engine: &mut MissionEngine, correct: bool) {
    let question = engine.current_question().expect("a current question").clone();
    let selected = if correct {
        question.correct_option
    } else {
        (question.correct_option + 1) % question.options.len()
    };
    engine.answer_question(MissionAnswer {
        question_id: question.id,
        selected_option: selected,
        is_correct: question.is_correct(selected),
        time_spent_secs: None,
    });
    engine.next_question();
}

/// Test 1: a clean pass walks content -> questions -> result
#[test]
fn test_passing_attempt_reaches_result() {
    let mut engine = MissionEngine::new();
    engine.start_mission(mission(), Some(content()), questions(10));
    assert_eq!(engine.phase(), MissionPhase::Content);

    engine.mark_content_read();
    engine.start_questions();
    assert_eq!(engine.phase(), MissionPhase::Questions);

    for i in 0..10 {
        answer(&mut engine, i < 8);
    }

    let result = engine.finish_mission();
    assert_eq!(result.score, 80.0);
    assert!(result.score >= PASSING_SCORE);
    assert_eq!(engine.phase(), MissionPhase::Result);

    let check = engine.massification_check().unwrap();
    assert!(check.passed);
    assert_eq!(check.action, MassificationAction::UnlockNext);
}

/// Test 2: a failed attempt drops into massification, and a retry of the
/// same mission can then pass with the identical question set
#[test]
fn test_failed_attempt_retries_through_massification() {
    let mut engine = MissionEngine::new();
    let m = mission();
    let qs = questions(10);
    engine.start_mission(m.clone(), None, qs.clone());
    engine.start_questions();

    for i in 0..10 {
        answer(&mut engine, i < 3);
    }
    let result = engine.finish_mission();
    assert_eq!(result.score, 30.0);
    assert_eq!(engine.phase(), MissionPhase::Massification);
    assert_eq!(
        engine.massification_check().unwrap().action,
        MassificationAction::MassificationRequired
    );

    engine.retry_mission();
    assert_eq!(engine.current_mission(), Some(&m));
    assert_eq!(engine.questions(), &qs[..]);
    assert!(engine.answers().is_empty());
    assert_eq!(engine.phase(), MissionPhase::Questions);

    engine.start_questions();
    for _ in 0..10 {
        answer(&mut engine, true);
    }
    let result = engine.finish_mission();
    assert_eq!(result.score, 100.0);
    assert_eq!(engine.phase(), MissionPhase::Result);
}

/// Test 3: changing an answer before finishing counts the latest choice
#[test]
fn test_reanswer_before_finish_counts_latest() {
    let mut engine = MissionEngine::new();
    let qs = questions(2);
    engine.start_mission(mission(), None, qs.clone());
    engine.start_questions();

    // Wrong on both, then fix the first
    answer(&mut engine, false);
    answer(&mut engine, false);
    engine.go_to_question(0);
    answer(&mut engine, true);

    let result = engine.finish_mission();
    assert_eq!(result.correct_answers, 1);
    assert_eq!(result.answers.len(), 2);
    assert_eq!(result.score, 50.0);
}

/// Test 4: the battery-gated entry the flow performs before starting and
/// per answered question, composed with the engine
#[tokio::test]
async fn test_battery_gated_mission_flow() {
    let settings = BatterySettings {
        // Enough for the start plus three questions, not four
        max_battery: 11,
        daily_recharge: 0,
        cost_per_mission_start: 5,
        cost_per_question: 2,
        ..Default::default()
    };
    let ledger = Arc::new(InMemoryLedger::new(settings));
    let user = UserId::new();
    let ctx = ContextId::new();
    ledger.enroll(user, ctx).await;
    let mut store = BatteryStore::new(BatteryClient::new(ledger.clone()));
    store.fetch_status(user, ctx).await;

    let result = store
        .consume(user, ctx, BatteryAction::MissionStart, None)
        .await;
    assert!(result.is_success());

    let mut engine = MissionEngine::new();
    let qs = questions(4);
    engine.start_mission(mission(), None, qs.clone());
    engine.start_questions();

    let mut answered = 0;
    for _ in 0..4 {
        let gate = store.consume(user, ctx, BatteryAction::Question, None).await;
        if !gate.is_success() {
            break;
        }
        answer(&mut engine, true);
        answered += 1;
    }

    // The fourth question was blocked by the empty battery
    assert_eq!(answered, 3);
    assert!(store.empty_modal_open());

    // The attempt still finishes deterministically with what was answered
    let result = engine.finish_mission();
    assert_eq!(result.correct_answers, 3);
    assert_eq!(result.total_questions, 4);
    assert_eq!(result.score, 75.0);
    assert_eq!(engine.phase(), MissionPhase::Result);
}
