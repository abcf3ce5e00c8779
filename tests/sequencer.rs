use orbital_mission_engine::core::time::Tick;
use orbital_mission_engine::sequencer::{
    NodeKind, NodeStatus, PropertyStore, Sequencer, SequencerError, SequencerNode,
    SequencerStatus, Value,
};

fn wait_relative(name: &str, seconds: f64) -> SequencerNode {
    SequencerNode::new(name, NodeKind::WaitRelative { seconds })
}

/// Drive the sequencer one tick at a time up to and including `until`.
fn run_until(seq: &mut Sequencer, store: &mut PropertyStore, from: u64, until: u64) {
    for t in from..=until {
        seq.tick(Tick(t), store);
    }
}

#[test]
fn waits_complete_at_their_exact_ticks() {
    // 20 ticks per second: 0.5 s relative -> tick 10, absolute tick 20.
    let nodes = vec![
        wait_relative("coast", 0.5),
        SequencerNode::new("cutoff", NodeKind::WaitAbsolute { tick: Tick(20) }),
    ];
    let mut seq = Sequencer::new("timing", nodes).unwrap();
    let mut store = PropertyStore::default();
    seq.start(Tick(0)).unwrap();

    for t in 1..10 {
        seq.tick(Tick(t), &mut store);
        assert_ne!(
            seq.node_status(0),
            Some(NodeStatus::Success),
            "relative wait finished early at tick {t}"
        );
    }
    seq.tick(Tick(10), &mut store);
    assert_eq!(seq.node_status(0), Some(NodeStatus::Success));
    assert_eq!(*seq.status(), SequencerStatus::Running);

    run_until(&mut seq, &mut store, 11, 19);
    assert_ne!(*seq.status(), SequencerStatus::Completed);
    seq.tick(Tick(20), &mut store);
    assert_eq!(seq.node_status(1), Some(NodeStatus::Success));
    assert_eq!(*seq.status(), SequencerStatus::Completed);
}

#[test]
fn completion_to_start_takes_one_tick() {
    // A zero-second wait is already due when the node starts; the successor
    // must still start on a later tick, never within the same dispatch.
    let nodes = vec![
        wait_relative("first", 0.0),
        wait_relative("second", 0.0),
        wait_relative("third", 0.0),
    ];
    let mut seq = Sequencer::new("latency", nodes).unwrap();
    let mut store = PropertyStore::default();
    seq.start(Tick(0)).unwrap();

    // Node n starts at tick 2n+1 and succeeds at tick 2n+2.
    seq.tick(Tick(1), &mut store);
    assert_eq!(seq.node_status(0), Some(NodeStatus::Wait));
    seq.tick(Tick(2), &mut store);
    assert_eq!(seq.node_status(0), Some(NodeStatus::Success));
    assert_eq!(seq.node_status(1), Some(NodeStatus::Idle));
    run_until(&mut seq, &mut store, 3, 6);
    assert_eq!(*seq.status(), SequencerStatus::Completed);
}

#[test]
fn abort_jumps_and_clears_every_option() {
    let nodes = vec![
        wait_relative("burn", 100.0),
        wait_relative("coast", 10.0),
        wait_relative("contingency-b", 0.0),
        wait_relative("safe-mode", 0.0),
    ];
    let mut seq = Sequencer::new("abortable", nodes).unwrap();
    seq.register_abort("safe", 3).unwrap();
    seq.register_abort("alt", 2).unwrap();
    let mut store = PropertyStore::default();
    seq.start(Tick(0)).unwrap();

    run_until(&mut seq, &mut store, 1, 5);
    assert_eq!(seq.node_status(0), Some(NodeStatus::Wait));

    seq.abort("safe", Tick(5)).unwrap();
    // The interrupted node is stopped, not failed.
    assert_eq!(seq.node_status(0), Some(NodeStatus::Stopped));
    // One-tick latency applies to abort jumps too.
    seq.tick(Tick(6), &mut store);
    assert_eq!(seq.cursor(), 3);

    // All options were cleared, including the one that fired.
    assert!(matches!(
        seq.abort("alt", Tick(7)),
        Err(SequencerError::UnknownAbortOption(_))
    ));
    assert!(matches!(
        seq.abort("safe", Tick(7)),
        Err(SequencerError::UnknownAbortOption(_))
    ));

    seq.tick(Tick(7), &mut store);
    assert_eq!(*seq.status(), SequencerStatus::Completed);
}

#[test]
fn monitor_condition_runs_alongside_its_successors() {
    let nodes = vec![
        SequencerNode::new(
            "watch-flag",
            NodeKind::Condition {
                property: "engines-nominal".to_string(),
                poll_interval_s: 0.1,
                timeout_s: None,
                monitor: true,
            },
        ),
        wait_relative("main-burn", 1.0),
    ];
    let mut seq = Sequencer::new("monitored", nodes).unwrap();
    let mut store = PropertyStore::default();
    seq.start(Tick(0)).unwrap();

    // The monitor starts polling and the cursor moves on immediately.
    seq.tick(Tick(1), &mut store);
    assert_eq!(seq.node_status(0), Some(NodeStatus::Monitor));
    seq.tick(Tick(2), &mut store);
    assert_eq!(seq.node_status(1), Some(NodeStatus::Wait));

    // Flag comes up mid-burn; the next poll resolves the monitor while the
    // burn node is still waiting.
    store.set("engines-nominal", Value::Flag(true));
    run_until(&mut seq, &mut store, 3, 6);
    assert_eq!(seq.node_status(0), Some(NodeStatus::Success));
    assert_eq!(seq.node_status(1), Some(NodeStatus::Wait));
    assert_eq!(*seq.status(), SequencerStatus::Running);

    run_until(&mut seq, &mut store, 7, 20);
    assert_eq!(*seq.status(), SequencerStatus::Completed);
}

#[test]
fn condition_timeout_routes_to_the_fail_index() {
    let nodes = vec![
        SequencerNode::new(
            "wait-for-lock",
            NodeKind::Condition {
                property: "guidance-lock".to_string(),
                poll_interval_s: 0.1,
                timeout_s: Some(1.0),
                monitor: false,
            },
        )
        .with_fail_index(2),
        wait_relative("nominal-path", 0.0),
        wait_relative("fallback-path", 0.0),
    ];
    let mut seq = Sequencer::new("timeout", nodes).unwrap();
    let mut store = PropertyStore::default();
    seq.start(Tick(0)).unwrap();

    // Node starts at tick 1; the 1 s deadline lands on tick 21.
    run_until(&mut seq, &mut store, 1, 20);
    assert_eq!(seq.node_status(0), Some(NodeStatus::Wait));
    seq.tick(Tick(21), &mut store);
    assert_eq!(seq.node_status(0), Some(NodeStatus::Timeout));

    // Fallback runs, nominal path never does.
    run_until(&mut seq, &mut store, 22, 25);
    assert_eq!(seq.node_status(2), Some(NodeStatus::Success));
    assert_eq!(seq.node_status(1), Some(NodeStatus::Idle));
    assert_eq!(*seq.status(), SequencerStatus::Completed);
}

#[test]
fn unrouted_failure_halts_the_sequencer() {
    let nodes = vec![SequencerNode::new(
        "read-missing",
        NodeKind::WaitProperty {
            property: "no-such-key".to_string(),
        },
    )];
    let mut seq = Sequencer::new("fatal", nodes).unwrap();
    let mut store = PropertyStore::default();
    seq.start(Tick(0)).unwrap();

    seq.tick(Tick(1), &mut store);
    assert_eq!(seq.node_status(0), Some(NodeStatus::Fail));
    assert_eq!(*seq.status(), SequencerStatus::Failed { node: 0 });

    // A failed sequencer ignores further ticks until reset.
    seq.tick(Tick(2), &mut store);
    assert_eq!(*seq.status(), SequencerStatus::Failed { node: 0 });
    seq.reset();
    assert_eq!(*seq.status(), SequencerStatus::Idle);
    assert_eq!(seq.node_status(0), Some(NodeStatus::Idle));
}

#[test]
fn long_polling_condition_still_completes_and_skips_the_fail_path() {
    // Many polls fire before the property turns true; the pending timeout
    // must die with the node and never route to the fallback.
    let nodes = vec![
        SequencerNode::new(
            "wait-for-ullage",
            NodeKind::Condition {
                property: "ullage-settled".to_string(),
                poll_interval_s: 0.05,
                timeout_s: Some(5.0),
                monitor: false,
            },
        )
        .with_fail_index(2),
        SequencerNode::new("ignition", NodeKind::WaitAbsolute { tick: Tick(120) }),
        wait_relative("abort-path", 0.0),
    ];
    let mut seq = Sequencer::new("polling", nodes).unwrap();
    let mut store = PropertyStore::default();
    seq.start(Tick(0)).unwrap();

    // Node starts at tick 1, polls every tick from tick 2 on.
    run_until(&mut seq, &mut store, 1, 39);
    assert_eq!(seq.node_status(0), Some(NodeStatus::Wait));
    store.set("ullage-settled", Value::Flag(true));
    seq.tick(Tick(40), &mut store);
    assert_eq!(seq.node_status(0), Some(NodeStatus::Success));

    // Run well past the 5 s deadline (tick 101) while node 1 is waiting: a
    // surviving timeout would flip node 0 to Timeout and start the abort path.
    run_until(&mut seq, &mut store, 41, 110);
    assert_eq!(seq.node_status(0), Some(NodeStatus::Success));
    assert_eq!(seq.node_status(1), Some(NodeStatus::Wait));
    assert_eq!(seq.node_status(2), Some(NodeStatus::Idle));

    run_until(&mut seq, &mut store, 111, 125);
    assert_eq!(*seq.status(), SequencerStatus::Completed);
}
