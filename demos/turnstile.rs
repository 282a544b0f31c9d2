//! Turnstile Gates
//!
//! This demo drives a bank of turnstiles, one machine per gate, from several
//! threads.
//!
//! Key concepts:
//! - One shared transition graph for many keyed machines
//! - Actions that can refuse a transition (a bad coin)
//! - Idle timeout relocking a gate nobody walked through
//! - Audit trail and metrics after the run
//!
//! Run with: cargo run --example turnstile

use keyed_fsm::logging::init_tracing;
use keyed_fsm::{noop, state_enum, KeyedStateMachine};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

state_enum! {
    enum Gate {
        Locked,
        Unlocked,
    }
}

fn insert_coin(gate: &u32, _from: &Gate, _to: &Gate) -> Result<(), String> {
    if gate % 3 == 0 {
        Err(format!("gate {gate} rejected a foreign coin"))
    } else {
        Ok(())
    }
}

fn main() {
    init_tracing();
    println!("=== Turnstile Gates ===\n");

    let machine = Arc::new(
        KeyedStateMachine::builder()
            .transition(Gate::Locked, Gate::Unlocked)
            .transition(Gate::Unlocked, Gate::Locked)
            .scan_interval(Duration::from_millis(50))
            .with_tracing()
            .build()
            .unwrap(),
    );

    for gate in 1..=6u32 {
        machine.initialize_state(gate, Gate::Locked);
    }

    let workers: Vec<_> = (1..=6u32)
        .map(|gate| {
            let machine = Arc::clone(&machine);
            thread::spawn(move || {
                if !machine.transition(&gate, Gate::Unlocked, insert_coin, "coin") {
                    return;
                }
                machine
                    .set_timeout(&gate, Duration::from_millis(150), Gate::Locked)
                    .unwrap();
                // Even gates see a visitor walk through; odd gates are left open.
                if gate % 2 == 0 {
                    machine.transition(&gate, Gate::Locked, noop, "push");
                }
            })
        })
        .collect();
    for worker in workers {
        worker.join().unwrap();
    }

    println!("Waiting for idle gates to relock...\n");
    thread::sleep(Duration::from_millis(400));

    let mut gates = machine.keys();
    gates.sort_unstable();
    for gate in gates {
        let path: Vec<_> = machine
            .state_history(&gate)
            .into_iter()
            .map(|entry| format!("{:?} ({})", entry.state, entry.reason))
            .collect();
        println!(
            "gate {gate}: {:?}  history: [{}]",
            machine.current_state(&gate).unwrap(),
            path.join(", ")
        );
    }

    let metrics = machine.metrics();
    println!(
        "\nattempts: {}, committed: {}, failed: {}",
        metrics.total, metrics.succeeded, metrics.failed
    );
    for entry in machine.audit_logs().iter().filter(|entry| !entry.success) {
        println!(
            "audit: gate {} {:?} -> {:?}: {}",
            entry.key,
            entry.from,
            entry.to,
            entry.error.as_deref().unwrap_or("")
        );
    }

    machine.shutdown();
    println!("\n=== Demo Complete ===");
}
