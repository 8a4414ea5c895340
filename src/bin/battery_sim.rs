//! Battery simulation
//!
//! Drives random free-tier usage through the store against the in-memory
//! ledger and checks the balance invariant after every action. Useful for
//! eyeballing how far a day of battery goes under different cost tables.

use clap::Parser;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::sync::Arc;

use trilha_core::battery::{
    BatteryAction, BatteryClient, BatterySettings, BatteryStore, ConsumeError, InMemoryLedger,
};
use trilha_core::core::types::{ContextId, UserId};

/// Battery sim - random usage against the in-memory ledger
#[derive(Parser, Debug)]
#[command(name = "battery_sim")]
#[command(about = "Simulate battery consumption over several days")]
struct Args {
    /// Random seed for reproducible runs
    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// Days to simulate
    #[arg(long, default_value_t = 7)]
    days: u32,

    /// Actions attempted per day
    #[arg(long, default_value_t = 40)]
    actions_per_day: u32,

    /// Print every action
    #[arg(long, default_value_t = false)]
    verbose: bool,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter("trilha_core=info")
        .init();

    let args = Args::parse();
    let mut rng = ChaCha8Rng::seed_from_u64(args.seed);

    let ledger = Arc::new(InMemoryLedger::new(BatterySettings::default()));
    let user_id = UserId::new();
    let context_id = ContextId::new();
    ledger.enroll(user_id, context_id).await;

    let mut store = BatteryStore::new(BatteryClient::new(ledger.clone()));
    store.fetch_status(user_id, context_id).await;

    let actions = BatteryAction::all();
    let mut consumed_total = 0u64;
    let mut performed = 0u32;
    let mut rejected = 0u32;

    for day in 1..=args.days {
        // Stand-in for the daily recharge cycle
        ledger.admin_recharge(user_id, context_id).await;
        store.fetch_status(user_id, context_id).await;
        store.close_empty_modal();

        for _ in 0..args.actions_per_day {
            let action = actions[rng.gen_range(0..actions.len())];

            let check = store
                .check_can_perform_action(None, user_id, context_id, action)
                .await;
            if !check.can_perform {
                rejected += 1;
                if args.verbose {
                    println!(
                        "day {} | {} blocked (cost {}, battery {})",
                        day, action, check.cost, check.battery_current
                    );
                }
                continue;
            }

            let result = store.consume(user_id, context_id, action, None).await;
            match result.error() {
                None => {
                    performed += 1;
                    consumed_total += check.cost as u64;
                    if args.verbose {
                        let status = store.status().expect("status fetched above");
                        println!(
                            "day {} | {} -{} => {}",
                            day, action, check.cost, status.battery_current
                        );
                    }
                }
                Some(ConsumeError::InsufficientBattery) => rejected += 1,
                Some(other) => panic!("unexpected rejection: {:?}", other),
            }

            // Invariant: the authoritative balance never leaves 0..=max
            let status = store.status().expect("status fetched above");
            assert!(status.battery_current <= status.battery_max);
        }

        let status = store.status().expect("status fetched above");
        println!(
            "day {:>2}: battery {:>3}/{} | performed {} | blocked {}",
            day, status.battery_current, status.battery_max, performed, rejected
        );
    }

    println!();
    println!(
        "{} days, {} actions performed, {} blocked, {} energy consumed (seed {})",
        args.days, performed, rejected, consumed_total, args.seed
    );
}
