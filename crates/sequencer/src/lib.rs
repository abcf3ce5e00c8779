//! Tick-driven mission script sequencer.
//!
//! A [`Sequencer`] executes an ordered, fixed list of nodes. Every state
//! transition goes through a per-sequencer [`EventQueue`]: completing a node
//! schedules the successor's start at least one tick later, never within the
//! same dispatch, so callers can inspect sequencer state mid-tick without
//! reentrancy hazards. The driver owns the clock and calls [`Sequencer::tick`]
//! once per simulation tick.

use std::collections::HashMap;

use orbital_core::time::{TICKS_PER_SECOND, Tick};
use thiserror::Error;

pub mod property;
pub mod queue;

pub use property::{PropertyStore, Value};
pub use queue::{EventHandle, EventQueue};

#[derive(Debug, Error)]
pub enum SequencerError {
    #[error("unknown abort option {0:?}")]
    UnknownAbortOption(String),
    #[error("node {name:?} targets index {target}, but there are {len} nodes")]
    TargetOutOfRange {
        name: String,
        target: usize,
        len: usize,
    },
    #[error("sequencer has no nodes")]
    Empty,
    #[error("sequencer already started")]
    AlreadyStarted,
}

/// Lifecycle of a single node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeStatus {
    Idle,
    /// Current node, waiting on its scheduled event.
    Wait,
    /// Running in the background while the cursor has moved on.
    Monitor,
    Success,
    Fail,
    Timeout,
    Stopped,
}

/// What a node does once started.
#[derive(Debug, Clone)]
pub enum NodeKind {
    /// Wait until `seconds` after the sequence zero time.
    WaitRelative { seconds: f64 },
    /// Wait until an absolute simulation tick.
    WaitAbsolute { tick: Tick },
    /// Wait `seconds` from this node's start.
    WaitDuration { seconds: f64 },
    /// Wait a number of seconds read from a property at node start.
    /// A missing or non-numeric property fails the node.
    WaitProperty { property: String },
    /// Poll a flag property at a fixed interval until it reads true.
    Condition {
        property: String,
        poll_interval_s: f64,
        timeout_s: Option<f64>,
        /// Keep polling in the background while the cursor advances.
        monitor: bool,
    },
    /// Unconditional jump.
    Branch { target: usize },
    /// Write a property, either a literal or a copy of another property.
    /// With `optional`, a missing source counts as success.
    SetProperty {
        name: String,
        value: Option<Value>,
        from: Option<String>,
        optional: bool,
    },
}

#[derive(Debug, Clone)]
pub struct SequencerNode {
    pub name: String,
    pub kind: NodeKind,
    /// Node index to jump to when this node fails or times out.
    /// Without one, a failure halts the whole sequencer.
    pub fail_index: Option<usize>,
}

impl SequencerNode {
    pub fn new(name: impl Into<String>, kind: NodeKind) -> Self {
        Self {
            name: name.into(),
            kind,
            fail_index: None,
        }
    }

    pub fn with_fail_index(mut self, fail_index: usize) -> Self {
        self.fail_index = Some(fail_index);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SequencerStatus {
    Idle,
    Running,
    Completed,
    Failed { node: usize },
    Stopped,
}

#[derive(Debug, Clone, Copy)]
enum Event {
    Start { index: usize },
    WaitElapsed { index: usize },
    Poll { index: usize },
    Timeout { index: usize },
}

pub struct Sequencer {
    name: String,
    nodes: Vec<SequencerNode>,
    statuses: Vec<NodeStatus>,
    node_handles: Vec<Vec<EventHandle>>,
    cursor: usize,
    zero_tick: Tick,
    status: SequencerStatus,
    queue: EventQueue<Event>,
    abort_options: HashMap<String, usize>,
}

impl Sequencer {
    pub fn new(
        name: impl Into<String>,
        nodes: Vec<SequencerNode>,
    ) -> Result<Self, SequencerError> {
        if nodes.is_empty() {
            return Err(SequencerError::Empty);
        }
        let len = nodes.len();
        for node in &nodes {
            let mut targets = Vec::new();
            if let NodeKind::Branch { target } = &node.kind {
                targets.push(*target);
            }
            if let Some(fail) = node.fail_index {
                targets.push(fail);
            }
            for target in targets {
                if target >= len {
                    return Err(SequencerError::TargetOutOfRange {
                        name: node.name.clone(),
                        target,
                        len,
                    });
                }
            }
        }
        let statuses = vec![NodeStatus::Idle; len];
        let node_handles = vec![Vec::new(); len];
        Ok(Self {
            name: name.into(),
            nodes,
            statuses,
            node_handles,
            cursor: 0,
            zero_tick: Tick(0),
            status: SequencerStatus::Idle,
            queue: EventQueue::new(),
            abort_options: HashMap::new(),
        })
    }

    /// Register a named abort path.
    pub fn register_abort(
        &mut self,
        option: impl Into<String>,
        target: usize,
    ) -> Result<(), SequencerError> {
        let option = option.into();
        if target >= self.nodes.len() {
            return Err(SequencerError::TargetOutOfRange {
                name: option,
                target,
                len: self.nodes.len(),
            });
        }
        self.abort_options.insert(option, target);
        Ok(())
    }

    pub fn status(&self) -> &SequencerStatus {
        &self.status
    }

    pub fn node_status(&self, index: usize) -> Option<NodeStatus> {
        self.statuses.get(index).copied()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Begin executing at node 0. `now` becomes the sequence zero time; the
    /// first node starts on the next tick.
    pub fn start(&mut self, now: Tick) -> Result<(), SequencerError> {
        if self.status != SequencerStatus::Idle {
            return Err(SequencerError::AlreadyStarted);
        }
        self.zero_tick = now;
        self.status = SequencerStatus::Running;
        log::debug!("sequencer {:?} started at tick {}", self.name, now.0);
        self.queue.schedule(now.plus(1), Event::Start { index: 0 });
        Ok(())
    }

    /// Dispatch every event due at or before `now`, in queue order.
    pub fn tick(&mut self, now: Tick, store: &mut PropertyStore) {
        if !matches!(self.status, SequencerStatus::Running) {
            return;
        }
        while let Some(event) = self.queue.pop_due(now) {
            self.dispatch(event, now, store);
            if !matches!(self.status, SequencerStatus::Running) {
                break;
            }
        }
    }

    /// Jump to the node registered for `option`, clearing every other abort
    /// option and all pending work.
    pub fn abort(&mut self, option: &str, now: Tick) -> Result<(), SequencerError> {
        let target = *self
            .abort_options
            .get(option)
            .ok_or_else(|| SequencerError::UnknownAbortOption(option.to_string()))?;
        log::warn!(
            "sequencer {:?}: abort {option:?} -> node {target}",
            self.name
        );
        self.abort_options.clear();
        self.halt_active_nodes();
        self.status = SequencerStatus::Running;
        self.cursor = target;
        self.queue.schedule(now.plus(1), Event::Start { index: target });
        Ok(())
    }

    /// Stop executing and revoke every pending event.
    pub fn stop(&mut self) {
        self.halt_active_nodes();
        self.status = SequencerStatus::Stopped;
        log::debug!("sequencer {:?} stopped", self.name);
    }

    /// Return to the pristine pre-start state.
    pub fn reset(&mut self) {
        self.queue.clear();
        for status in &mut self.statuses {
            *status = NodeStatus::Idle;
        }
        for handles in &mut self.node_handles {
            handles.clear();
        }
        self.cursor = 0;
        self.status = SequencerStatus::Idle;
    }

    fn halt_active_nodes(&mut self) {
        self.queue.clear();
        for handles in &mut self.node_handles {
            handles.clear();
        }
        for status in &mut self.statuses {
            if matches!(status, NodeStatus::Wait | NodeStatus::Monitor) {
                *status = NodeStatus::Stopped;
            }
        }
    }

    fn dispatch(&mut self, event: Event, now: Tick, store: &mut PropertyStore) {
        match event {
            Event::Start { index } => self.start_node(index, now, store),
            Event::WaitElapsed { index } => {
                self.succeed(index, now);
            }
            Event::Poll { index } => self.poll_condition(index, now, store),
            Event::Timeout { index } => {
                if matches!(self.statuses[index], NodeStatus::Wait | NodeStatus::Monitor) {
                    log::debug!(
                        "sequencer {:?}: node {index} ({:?}) timed out",
                        self.name,
                        self.nodes[index].name
                    );
                    self.cancel_node_events(index);
                    self.statuses[index] = NodeStatus::Timeout;
                    self.route_failure(index, now);
                }
            }
        }
    }

    fn start_node(&mut self, index: usize, now: Tick, store: &mut PropertyStore) {
        self.cursor = index;
        self.statuses[index] = NodeStatus::Wait;
        log::debug!(
            "sequencer {:?}: node {index} ({:?}) started at tick {}",
            self.name,
            self.nodes[index].name,
            now.0
        );

        let kind = self.nodes[index].kind.clone();
        match kind {
            NodeKind::WaitRelative { seconds } => {
                let due = self.zero_tick.plus_seconds(seconds);
                self.schedule_for_node(index, self.at_least_next(due, now), Event::WaitElapsed { index });
            }
            NodeKind::WaitAbsolute { tick } => {
                self.schedule_for_node(index, self.at_least_next(tick, now), Event::WaitElapsed { index });
            }
            NodeKind::WaitDuration { seconds } => {
                let due = now.plus_seconds(seconds);
                self.schedule_for_node(index, self.at_least_next(due, now), Event::WaitElapsed { index });
            }
            NodeKind::WaitProperty { property } => match store.number(&property) {
                Some(seconds) => {
                    let due = now.plus_seconds(seconds);
                    self.schedule_for_node(
                        index,
                        self.at_least_next(due, now),
                        Event::WaitElapsed { index },
                    );
                }
                None => {
                    self.fail(index, now);
                }
            },
            NodeKind::Condition {
                poll_interval_s,
                timeout_s,
                monitor,
                ..
            } => {
                let first_poll = self.at_least_next(now.plus_seconds(poll_interval_s), now);
                self.schedule_for_node(index, first_poll, Event::Poll { index });
                if let Some(timeout) = timeout_s {
                    let deadline = self.at_least_next(now.plus_seconds(timeout), now);
                    self.schedule_for_node(index, deadline, Event::Timeout { index });
                }
                if monitor {
                    // Background watch: the cursor moves on while this node
                    // keeps polling.
                    self.statuses[index] = NodeStatus::Monitor;
                    self.advance_from(index, now);
                }
            }
            NodeKind::Branch { target } => {
                self.statuses[index] = NodeStatus::Success;
                self.queue.schedule(now.plus(1), Event::Start { index: target });
            }
            NodeKind::SetProperty {
                name,
                value,
                from,
                optional,
            } => {
                let resolved = match (&from, value) {
                    (Some(source), _) => store.get(source).cloned(),
                    (None, literal) => literal,
                };
                match resolved {
                    Some(v) => {
                        store.set(name, v);
                        self.succeed(index, now);
                    }
                    None if optional => {
                        self.succeed(index, now);
                    }
                    None => {
                        self.fail(index, now);
                    }
                }
            }
        }
    }

    fn poll_condition(&mut self, index: usize, now: Tick, store: &mut PropertyStore) {
        if !matches!(self.statuses[index], NodeStatus::Wait | NodeStatus::Monitor) {
            return;
        }
        let NodeKind::Condition {
            property,
            poll_interval_s,
            monitor,
            ..
        } = &self.nodes[index].kind
        else {
            return;
        };
        let property = property.clone();
        let interval = *poll_interval_s;
        let monitor = *monitor;

        if store.flag(&property) == Some(true) {
            self.cancel_node_events(index);
            self.statuses[index] = NodeStatus::Success;
            log::debug!(
                "sequencer {:?}: condition node {index} satisfied",
                self.name
            );
            if !monitor {
                self.advance_from(index, now);
            }
        } else {
            let next = self.at_least_next(now.plus_seconds(interval), now);
            self.schedule_for_node(index, next, Event::Poll { index });
        }
    }

    fn succeed(&mut self, index: usize, now: Tick) {
        self.cancel_node_events(index);
        self.statuses[index] = NodeStatus::Success;
        self.advance_from(index, now);
    }

    fn fail(&mut self, index: usize, now: Tick) {
        self.cancel_node_events(index);
        self.statuses[index] = NodeStatus::Fail;
        log::debug!(
            "sequencer {:?}: node {index} ({:?}) failed",
            self.name,
            self.nodes[index].name
        );
        self.route_failure(index, now);
    }

    fn route_failure(&mut self, index: usize, now: Tick) {
        match self.nodes[index].fail_index {
            Some(target) => {
                self.queue.schedule(now.plus(1), Event::Start { index: target });
            }
            None => {
                // No route configured: a fatal mission-logic error, surfaced
                // through the status.
                self.halt_active_nodes();
                self.status = SequencerStatus::Failed { node: index };
                log::warn!(
                    "sequencer {:?} failed at node {index} ({:?})",
                    self.name,
                    self.nodes[index].name
                );
            }
        }
    }

    fn advance_from(&mut self, index: usize, now: Tick) {
        let next = index + 1;
        if next < self.nodes.len() {
            self.queue.schedule(now.plus(1), Event::Start { index: next });
        } else {
            self.status = SequencerStatus::Completed;
            log::debug!("sequencer {:?} completed at tick {}", self.name, now.0);
        }
    }

    fn schedule_for_node(&mut self, index: usize, due: Tick, event: Event) {
        // A repeatedly polling node re-schedules itself every dispatch; drop
        // its fired handles here so the list holds only pending events.
        let queue = &self.queue;
        self.node_handles[index].retain(|handle| queue.is_live(*handle));
        let handle = self.queue.schedule(due, event);
        self.node_handles[index].push(handle);
    }

    fn cancel_node_events(&mut self, index: usize) {
        for handle in self.node_handles[index].drain(..) {
            self.queue.cancel(handle);
        }
    }

    /// Events scheduled while dispatching must land on a later tick than the
    /// dispatch itself; clamp already-due times forward by one tick.
    fn at_least_next(&self, due: Tick, now: Tick) -> Tick {
        if due <= now { now.plus(1) } else { due }
    }
}

/// Ticks for a whole number of seconds, for script authoring.
pub fn seconds_to_ticks(seconds: f64) -> u64 {
    (seconds * TICKS_PER_SECOND as f64).round() as u64
}
