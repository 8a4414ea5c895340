//! Trilha - entry point
//!
//! Interactive demo of the battery + mission core against the in-memory
//! ledger authority. It walks one user through the real control flow: every
//! gated action asks the battery store first, and the mission engine drives
//! the attempt from content to result or massification.

use trilha_core::battery::{
    BatteryAction, BatteryClient, BatterySettings, BatteryStore, ConsumeResult, InMemoryLedger,
};
use trilha_core::core::error::Result;
use trilha_core::core::types::{ContextId, MissionId, QuestionId, UserId};
use trilha_core::mission::{
    Content, Mission, MissionAnswer, MissionEngine, MissionKind, MissionPhase, Question,
};

use std::io::{self, Write};
use std::sync::Arc;
use tokio::runtime::Runtime;

fn main() -> Result<()> {
    // Initialize tracing for logging
    tracing_subscriber::fmt()
        .with_env_filter("trilha_core=debug")
        .init();

    tracing::info!("Trilha starting...");

    // Async runtime for the authority calls
    let rt = Runtime::new()?;

    // Self-contained authority with one enrolled demo user
    let ledger = Arc::new(InMemoryLedger::new(BatterySettings::default()));
    let user_id = UserId::new();
    let context_id = ContextId::new();
    rt.block_on(ledger.enroll(user_id, context_id));

    let mut store = BatteryStore::new(BatteryClient::new(ledger.clone()));
    rt.block_on(store.fetch_status(user_id, context_id));

    let mut engine = MissionEngine::new();

    println!("\n=== TRILHA ===");
    println!("Battery-gated mission demo");
    println!();
    println!("Commands:");
    println!("  status / s      - Show battery and mission state");
    println!("  start           - Start the demo mission (costs battery)");
    println!("  read            - Mark content read and begin questions");
    println!("  answer <a-d>    - Answer the current question (costs battery)");
    println!("  next / prev     - Navigate questions");
    println!("  finish          - Finish the mission and see the verdict");
    println!("  retry           - Retry after massification");
    println!("  history         - Show recent battery consumption");
    println!("  recharge        - Admin refill to max");
    println!("  quit / q        - Exit");
    println!();

    loop {
        display_status(&store, &engine);

        print!("> ");
        io::stdout().flush()?;
        let mut input = String::new();
        io::stdin().read_line(&mut input)?;
        let input = input.trim();

        let mut parts = input.split_whitespace();
        let command = parts.next().unwrap_or("");
        let arg = parts.next();

        match command {
            "quit" | "q" => break,
            "status" | "s" => {
                rt.block_on(store.fetch_status(user_id, context_id));
            }
            "start" => {
                let result = rt.block_on(store.consume(
                    user_id,
                    context_id,
                    BatteryAction::MissionStart,
                    None,
                ));
                if handle_consume("mission start", &result, &mut store) {
                    let (mission, content, questions) = demo_mission();
                    engine.start_mission(mission, content, questions);
                    println!("Mission started. Read the content, then type 'read'.");
                }
            }
            "read" => {
                engine.mark_content_read();
                engine.start_questions();
                println!("Questions begin now.");
            }
            "answer" => {
                let Some(option) = arg.and_then(parse_option) else {
                    println!("Usage: answer <a-d>");
                    continue;
                };
                if engine.phase() != MissionPhase::Questions {
                    println!("Not in the questions phase.");
                    continue;
                }
                let Some(question) = engine.current_question().cloned() else {
                    println!("No current question.");
                    continue;
                };
                let result = rt.block_on(store.consume(
                    user_id,
                    context_id,
                    BatteryAction::Question,
                    None,
                ));
                if handle_consume("answer", &result, &mut store) {
                    let correct = question.is_correct(option);
                    engine.answer_question(MissionAnswer {
                        question_id: question.id,
                        selected_option: option,
                        is_correct: correct,
                        time_spent_secs: None,
                    });
                    println!("{}", if correct { "Correct!" } else { "Wrong." });
                    engine.next_question();
                }
            }
            "next" => engine.next_question(),
            "prev" => engine.previous_question(),
            "finish" => {
                let result = engine.finish_mission();
                println!(
                    "Score: {:.0}% ({}/{}) in {}s",
                    result.score,
                    result.correct_answers,
                    result.total_questions,
                    result.time_spent_secs
                );
                if let Some(check) = engine.massification_check() {
                    if check.passed {
                        println!("Passed - next mission unlocked.");
                    } else {
                        println!(
                            "Below {:.0}% - massification required. Type 'retry' to try again.",
                            check.required_score
                        );
                    }
                }
            }
            "retry" => {
                engine.retry_mission();
                println!("Same mission, fresh attempt.");
            }
            "history" => {
                let entries = rt.block_on(store.history(user_id, context_id, 10));
                for entry in entries {
                    println!(
                        "  {} -{} => {} ({})",
                        entry.action, entry.cost, entry.battery_after, entry.created_at
                    );
                }
            }
            "recharge" => {
                rt.block_on(ledger.admin_recharge(user_id, context_id));
                rt.block_on(store.fetch_status(user_id, context_id));
                println!("Battery refilled.");
            }
            "" => {}
            other => println!("Unknown command: {}", other),
        }
    }

    tracing::info!("Trilha shutting down");
    Ok(())
}

/// React to a consume outcome; returns true when the action may proceed
fn handle_consume(
    what: &str,
    result: &ConsumeResult,
    store: &mut BatteryStore<Arc<InMemoryLedger>>,
) -> bool {
    match result {
        ConsumeResult::Consumed {
            cost,
            battery_current,
            ..
        } => {
            if *cost > 0 {
                println!("({} cost {} energy, {} left)", what, cost, battery_current);
            }
            true
        }
        ConsumeResult::Rejected { error, .. } => {
            println!("Cannot {}: {:?}", what, error);
            if store.empty_modal_open() {
                println!("[battery empty - wait for the daily recharge or upgrade]");
                store.close_empty_modal();
            }
            false
        }
    }
}

fn parse_option(arg: &str) -> Option<usize> {
    match arg {
        "a" | "A" => Some(0),
        "b" | "B" => Some(1),
        "c" | "C" => Some(2),
        "d" | "D" => Some(3),
        _ => None,
    }
}

fn display_status(store: &BatteryStore<Arc<InMemoryLedger>>, engine: &MissionEngine) {
    if let Some(status) = store.status() {
        print!(
            "[battery {}/{}{}]",
            status.battery_current,
            status.battery_max,
            if status.is_premium { " premium" } else { "" }
        );
    } else {
        print!("[battery unknown]");
    }

    match engine.phase() {
        MissionPhase::Content => {
            if engine.current_mission().is_some() {
                print!(" [mission: content phase]");
            }
        }
        MissionPhase::Questions => {
            let p = engine.progress();
            print!(" [question {}/{}]", p.current, p.total);
            if let Some(q) = engine.current_question() {
                println!();
                println!("  {}", q.statement);
                for (i, option) in q.options.iter().enumerate() {
                    println!("    {}) {}", (b'a' + i as u8) as char, option);
                }
            }
        }
        MissionPhase::Result => print!(" [mission passed]"),
        MissionPhase::Massification => print!(" [massification pending]"),
    }
    println!();
}

/// A small fixed mission so the demo is self-contained
fn demo_mission() -> (Mission, Option<Content>, Vec<Question>) {
    let mission = Mission {
        id: MissionId::new(),
        subject: "Direito Constitucional".into(),
        kind: MissionKind::Normal,
        order: 1,
    };
    let content = Content {
        id: "art5".into(),
        text: "Art. 5o - Todos sao iguais perante a lei...".into(),
        audio_url: None,
    };
    let questions = vec![
        Question {
            id: QuestionId::new(),
            statement: "Habeas corpus protects which right?".into(),
            options: vec![
                "Freedom of movement".into(),
                "Property".into(),
                "Privacy".into(),
                "Assembly".into(),
            ],
            correct_option: 0,
        },
        Question {
            id: QuestionId::new(),
            statement: "Which remedy protects a liquid and certain right?".into(),
            options: vec![
                "Habeas data".into(),
                "Mandado de seguranca".into(),
                "Acao popular".into(),
                "Habeas corpus".into(),
            ],
            correct_option: 1,
        },
    ];
    (mission, Some(content), questions)
}
