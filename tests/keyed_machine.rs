//! Integration tests for transitions, hooks, auditing and concurrency.

use keyed_fsm::{noop, KeyedStateMachine, MachineError, TransitionError};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc;
use std::sync::{Arc, Barrier, OnceLock, Weak};
use std::thread;
use std::time::Duration;

type Machine = KeyedStateMachine<&'static str, &'static str>;

fn idle_processing() -> Machine {
    KeyedStateMachine::builder()
        .transition("Idle", "Processing")
        .transition("Processing", "Idle")
        .auto_start_scanner(false)
        .build()
        .unwrap()
}

#[test]
fn initialized_key_reports_its_initial_state() {
    let machine = idle_processing();
    assert!(machine.initialize_state("M", "Idle"));

    assert_eq!(machine.current_state(&"M"), Some("Idle"));
    assert!(machine.state_history(&"M").is_empty());
    assert_eq!(machine.current_state(&"other"), None);
    assert_eq!(machine.keys(), vec!["M"]);
    assert_eq!(machine.len(), 1);
}

#[test]
fn legal_transition_commits() {
    let machine = Machine::builder()
        .auto_start_scanner(false)
        .build()
        .unwrap();
    machine.initialize_state("M", "Idle");
    machine.add_transition("Idle", "Processing");
    machine.add_transition("Processing", "Idle");

    assert!(machine.transition(&"M", "Processing", noop, "start"));
    assert_eq!(machine.current_state(&"M"), Some("Processing"));

    let history = machine.state_history(&"M");
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].state, "Processing");
    assert_eq!(history[0].reason, "start");

    let logs = machine.audit_logs();
    assert_eq!(logs.len(), 1);
    assert!(logs[0].success);
    assert_eq!((logs[0].from, logs[0].to), ("Idle", "Processing"));
    assert_eq!(logs[0].error, None);
}

#[test]
fn reinitializing_a_key_keeps_its_state() {
    let machine = idle_processing();
    assert!(machine.initialize_state("M", "Idle"));
    assert!(machine.transition(&"M", "Processing", noop, ""));

    assert!(!machine.initialize_state("M", "Idle"));
    assert_eq!(machine.current_state(&"M"), Some("Processing"));
    assert_eq!(machine.state_history(&"M").len(), 1);
}

#[test]
fn failing_action_leaves_state_unchanged() {
    let failures = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&failures);
    let machine = Machine::builder()
        .transition("Idle", "Processing")
        .on_failed(move |_, _, _, error| {
            assert!(matches!(error, TransitionError::ActionFailed(_)));
            counter.fetch_add(1, Ordering::SeqCst);
        })
        .auto_start_scanner(false)
        .build()
        .unwrap();
    machine.initialize_state("M", "Idle");

    let result = machine.try_transition(
        &"M",
        "Processing",
        |_: &&str, _: &&str, _: &&str| Err("disk full"),
        "write",
    );

    assert_eq!(
        result,
        Err(TransitionError::ActionFailed("disk full".to_string()))
    );
    assert_eq!(machine.current_state(&"M"), Some("Idle"));
    assert!(machine.state_history(&"M").is_empty());
    assert_eq!(failures.load(Ordering::SeqCst), 1);

    let logs = machine.audit_logs();
    assert_eq!(logs.len(), 1);
    assert!(!logs[0].success);
    assert!(logs[0].error.as_deref().unwrap().contains("disk full"));
    assert_eq!(machine.metrics().failed, 1);
}

#[test]
fn panicking_action_is_reported_as_failure() {
    let machine = idle_processing();
    machine.initialize_state("M", "Idle");

    let result = machine.try_transition(
        &"M",
        "Processing",
        |_: &&str, _: &&str, _: &&str| -> Result<(), String> { panic!("action exploded") },
        "",
    );

    assert_eq!(
        result,
        Err(TransitionError::ActionFailed("action exploded".to_string()))
    );
    assert_eq!(machine.current_state(&"M"), Some("Idle"));
    assert!(machine.transition(&"M", "Processing", noop, "recovered"));
}

#[test]
fn illegal_transition_is_audited() {
    let failures = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&failures);
    let machine = Machine::builder()
        .transition("Idle", "Processing")
        .on_failed(move |_, _, _, _| {
            counter.fetch_add(1, Ordering::SeqCst);
        })
        .auto_start_scanner(false)
        .build()
        .unwrap();
    machine.initialize_state("M", "Idle");

    let result = machine.try_transition(&"M", "Done", noop, "skip ahead");

    assert_eq!(
        result,
        Err(TransitionError::IllegalTransition {
            from: "Idle".to_string(),
            to: "Done".to_string(),
        })
    );
    assert_eq!(failures.load(Ordering::SeqCst), 1);
    assert_eq!(machine.audit_logs().len(), 1);
    assert!(!machine.audit_logs()[0].success);

    let metrics = machine.metrics();
    assert_eq!((metrics.total, metrics.succeeded, metrics.failed), (1, 0, 1));
}

#[test]
fn unknown_key_is_counted_but_not_audited() {
    let failures = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&failures);
    let machine = Machine::builder()
        .transition("Idle", "Processing")
        .on_failed(move |_, _, _, _| {
            counter.fetch_add(1, Ordering::SeqCst);
        })
        .auto_start_scanner(false)
        .build()
        .unwrap();

    assert!(matches!(
        machine.try_transition(&"ghost", "Processing", noop, ""),
        Err(TransitionError::UnknownKey { .. })
    ));
    assert!(machine.audit_logs().is_empty());
    assert_eq!(failures.load(Ordering::SeqCst), 0);

    let metrics = machine.metrics();
    assert_eq!((metrics.total, metrics.succeeded, metrics.failed), (1, 0, 0));

    assert!(matches!(
        machine.set_timeout(&"ghost", Duration::from_secs(1), "Idle"),
        Err(MachineError::UnknownKey { .. })
    ));
    assert!(matches!(
        machine.clear_timeout(&"ghost"),
        Err(MachineError::UnknownKey { .. })
    ));
}

#[test]
fn history_keeps_the_latest_hundred_entries() {
    let machine = idle_processing();
    machine.initialize_state("M", "Idle");

    for i in 0..150 {
        let to = if i % 2 == 0 { "Processing" } else { "Idle" };
        assert!(machine.transition(&"M", to, noop, "cycle"));
    }

    let history = machine.state_history(&"M");
    assert_eq!(history.len(), 100);
    assert_eq!(history.last().map(|entry| entry.state), Some("Idle"));
    assert_eq!(machine.audit_logs().len(), 150);
}

#[test]
fn audit_logs_snapshot_and_drain() {
    let machine = idle_processing();
    machine.initialize_state("M", "Idle");
    assert!(machine.transition(&"M", "Processing", noop, ""));

    assert_eq!(machine.audit_logs().len(), 1);
    assert_eq!(machine.audit_logs().len(), 1);

    let drained = machine.drain_audit_logs();
    assert_eq!(drained.len(), 1);
    assert!(machine.audit_logs().is_empty());
}

#[test]
fn hooks_run_in_order_around_the_action() {
    let events = Arc::new(parking_lot::Mutex::new(Vec::new()));
    let before = Arc::clone(&events);
    let after = Arc::clone(&events);
    let machine = Machine::builder()
        .transition("Idle", "Processing")
        .on_before(move |_, from, to| before.lock().push(format!("before {from}->{to}")))
        .on_after(move |_, from, to| after.lock().push(format!("after {from}->{to}")))
        .auto_start_scanner(false)
        .build()
        .unwrap();
    machine.initialize_state("M", "Idle");

    let action_events = Arc::clone(&events);
    assert!(machine.transition(
        &"M",
        "Processing",
        move |_: &&str, _: &&str, _: &&str| {
            action_events.lock().push("action".to_string());
            Ok::<_, String>(())
        },
        "",
    ));

    assert_eq!(
        *events.lock(),
        vec![
            "before Idle->Processing".to_string(),
            "action".to_string(),
            "after Idle->Processing".to_string(),
        ]
    );
}

#[test]
fn after_hook_may_transition_the_same_key() {
    let cell: Arc<OnceLock<Weak<Machine>>> = Arc::new(OnceLock::new());
    let hook_cell = Arc::clone(&cell);
    let machine = Arc::new(
        Machine::builder()
            .transition("Idle", "Processing")
            .transition("Processing", "Done")
            .on_after(move |key: &&'static str, _from: &&'static str, to: &&'static str| {
                if *to != "Processing" {
                    return;
                }
                if let Some(machine) = hook_cell.get().and_then(Weak::upgrade) {
                    assert!(machine.transition(key, "Done", noop, "chained"));
                }
            })
            .auto_start_scanner(false)
            .build()
            .unwrap(),
    );
    assert!(cell.set(Arc::downgrade(&machine)).is_ok());
    machine.initialize_state("M", "Idle");

    assert!(machine.transition(&"M", "Processing", noop, "start"));

    assert_eq!(machine.current_state(&"M"), Some("Done"));
    let path: Vec<_> = machine
        .state_history(&"M")
        .into_iter()
        .map(|entry| entry.state)
        .collect();
    assert_eq!(path, vec!["Processing", "Done"]);
}

#[test]
fn concurrent_racers_have_a_single_winner() {
    const RACERS: usize = 8;
    let machine = Machine::builder()
        .transition("Idle", "Processing")
        .auto_start_scanner(false)
        .build()
        .unwrap();
    machine.initialize_state("M", "Idle");
    let barrier = Barrier::new(RACERS);

    let results: Vec<_> = thread::scope(|scope| {
        let handles: Vec<_> = (0..RACERS)
            .map(|_| {
                scope.spawn(|| {
                    machine.try_transition(
                        &"M",
                        "Processing",
                        |_: &&str, _: &&str, _: &&str| {
                            barrier.wait();
                            Ok::<_, String>(())
                        },
                        "race",
                    )
                })
            })
            .collect();
        handles
            .into_iter()
            .map(|handle| handle.join().unwrap())
            .collect()
    });

    let winners = results.iter().filter(|result| result.is_ok()).count();
    assert_eq!(winners, 1);
    assert!(results.iter().filter(|result| result.is_err()).all(|result| matches!(
        result,
        Err(TransitionError::ConcurrentConflict { .. })
    )));
    assert_eq!(machine.current_state(&"M"), Some("Processing"));
    assert_eq!(machine.state_history(&"M").len(), 1);

    let metrics = machine.metrics();
    assert_eq!(metrics.total, RACERS as u64);
    assert_eq!(metrics.succeeded, 1);
    assert_eq!(metrics.failed, RACERS as u64 - 1);
}

#[test]
fn commit_effect_runs_only_for_the_winner() {
    const RACERS: usize = 4;
    let machine = Machine::builder()
        .transition("Idle", "Processing")
        .auto_start_scanner(false)
        .build()
        .unwrap();
    machine.initialize_state("M", "Idle");
    let barrier = Barrier::new(RACERS);
    let charged = AtomicUsize::new(0);

    thread::scope(|scope| {
        for _ in 0..RACERS {
            scope.spawn(|| {
                let _ = machine.try_transition_with_commit(
                    &"M",
                    "Processing",
                    |_: &&str, _: &&str, _: &&str| {
                        barrier.wait();
                        Ok::<_, String>(|_: &&str, _: &&str, _: &&str| {
                            charged.fetch_add(1, Ordering::SeqCst);
                        })
                    },
                    "charge",
                );
            });
        }
    });

    assert_eq!(charged.load(Ordering::SeqCst), 1);
    assert_eq!(machine.metrics().succeeded, 1);
}

#[test]
fn returning_to_the_probed_state_is_still_a_conflict() {
    let machine = idle_processing();
    machine.initialize_state("M", "Idle");
    let (probed_tx, probed_rx) = mpsc::channel();
    let (go_tx, go_rx) = mpsc::channel::<()>();

    let slow = thread::scope(|scope| {
        let slow = scope.spawn(|| {
            machine.try_transition(
                &"M",
                "Processing",
                move |_: &&str, _: &&str, _: &&str| {
                    probed_tx.send(()).unwrap();
                    go_rx.recv().unwrap();
                    Ok::<_, String>(())
                },
                "slow",
            )
        });

        probed_rx.recv().unwrap();
        assert!(machine.transition(&"M", "Processing", noop, "fast"));
        assert!(machine.transition(&"M", "Idle", noop, "fast"));
        go_tx.send(()).unwrap();
        slow.join().unwrap()
    });

    assert_eq!(
        slow,
        Err(TransitionError::ConcurrentConflict {
            from: "Idle".to_string(),
            to: "Processing".to_string(),
        })
    );
    assert_eq!(machine.current_state(&"M"), Some("Idle"));
    assert_eq!(machine.state_history(&"M").len(), 2);
}

#[test]
fn independent_keys_transition_in_parallel() {
    let machine = idle_processing();
    let keys = ["a", "b", "c", "d"];
    for key in keys {
        machine.initialize_state(key, "Idle");
    }

    thread::scope(|scope| {
        for key in keys {
            let machine = &machine;
            scope.spawn(move || {
                for i in 0..50 {
                    let to = if i % 2 == 0 { "Processing" } else { "Idle" };
                    assert!(machine.transition(&key, to, noop, "worker"));
                }
            });
        }
    });

    for key in keys {
        assert_eq!(machine.current_state(&key), Some("Idle"));
        assert_eq!(machine.state_history(&key).len(), 50);
    }
    assert_eq!(machine.metrics().succeeded, 200);
}

#[test]
fn panicking_before_hook_aborts_the_transition() {
    let machine = Machine::builder()
        .transition("Idle", "Processing")
        .on_before(|_, _, _| panic!("before hook exploded"))
        .auto_start_scanner(false)
        .build()
        .unwrap();
    machine.initialize_state("M", "Idle");

    let result = machine.try_transition(&"M", "Processing", noop, "start");

    assert!(matches!(
        result,
        Err(TransitionError::ActionFailed(ref message)) if message.contains("before hook exploded")
    ));
    assert_eq!(machine.current_state(&"M"), Some("Idle"));
    assert!(machine.state_history(&"M").is_empty());

    let logs = machine.audit_logs();
    assert_eq!(logs.len(), 1);
    assert!(!logs[0].success);

    let metrics = machine.metrics();
    assert_eq!((metrics.total, metrics.succeeded, metrics.failed), (1, 0, 1));
}

#[test]
fn panicking_after_hook_keeps_the_commit() {
    let machine = Machine::builder()
        .transition("Idle", "Processing")
        .on_after(|_, _, _| panic!("after hook exploded"))
        .auto_start_scanner(false)
        .build()
        .unwrap();
    machine.initialize_state("M", "Idle");

    assert!(machine.try_transition(&"M", "Processing", noop, "start").is_ok());

    assert_eq!(machine.current_state(&"M"), Some("Processing"));
    assert_eq!(machine.state_history(&"M").len(), 1);
    assert_eq!(machine.audit_logs().len(), 1);
    assert!(machine.audit_logs()[0].success);

    let metrics = machine.metrics();
    assert_eq!((metrics.total, metrics.succeeded, metrics.failed), (1, 1, 0));
}

#[test]
fn panicking_failed_hook_still_reports_the_failure() {
    let machine = Machine::builder()
        .transition("Idle", "Processing")
        .on_failed(|_, _, _, _| panic!("failed hook exploded"))
        .auto_start_scanner(false)
        .build()
        .unwrap();
    machine.initialize_state("M", "Idle");

    let result = machine.try_transition(&"M", "Done", noop, "");

    assert!(matches!(
        result,
        Err(TransitionError::IllegalTransition { .. })
    ));
    assert_eq!(machine.audit_logs().len(), 1);
    assert_eq!(machine.metrics().failed, 1);
}
