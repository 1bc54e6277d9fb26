//! Lightweight session tracing.
//!
//! A session optionally records its mutating operations into a bounded ring
//! buffer, inspectable from tests and debugging tools. Disabled by default;
//! recording is a no-op until a capacity is configured.

use std::collections::VecDeque;
use std::sync::Arc;

// =============================================================================
// Trace Event
// =============================================================================

/// Events recorded by a session.
#[derive(Clone, Debug)]
pub enum TraceEvent {
    /// A tuple was asserted.
    Asserted {
        /// The asserted tuple's key rendering.
        key: String,
    },

    /// A tuple was retracted.
    Retracted {
        /// The retracted tuple's key rendering.
        key: String,
    },

    /// A rule was registered.
    RuleAdded {
        /// The rule name.
        rule: Arc<str>,
    },

    /// A rule was removed.
    RuleDeleted {
        /// The rule name.
        rule: Arc<str>,
    },

    /// A rule's action fired for one completed match.
    RuleFired {
        /// The rule name.
        rule: Arc<str>,
    },

    /// A delayed assert was scheduled.
    AssertScheduled {
        /// Caller-chosen id for later cancellation.
        correlation_id: String,
        /// Delay before the assert runs.
        delay_ms: u64,
    },

    /// A delayed assert was cancelled before it ran.
    AssertCancelled {
        /// The cancelled schedule's id.
        correlation_id: String,
    },
}

impl TraceEvent {
    /// Returns a short, stable label for the event kind.
    #[must_use]
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::Asserted { .. } => "asserted",
            Self::Retracted { .. } => "retracted",
            Self::RuleAdded { .. } => "rule-added",
            Self::RuleDeleted { .. } => "rule-deleted",
            Self::RuleFired { .. } => "rule-fired",
            Self::AssertScheduled { .. } => "assert-scheduled",
            Self::AssertCancelled { .. } => "assert-cancelled",
        }
    }
}

// =============================================================================
// Trace Record
// =============================================================================

/// One recorded event with its monotonically increasing id.
#[derive(Clone, Debug)]
pub struct TraceRecord {
    /// Record id; increases across evictions.
    pub id: u64,
    /// The recorded event.
    pub event: TraceEvent,
}

// =============================================================================
// Tracer
// =============================================================================

/// A bounded event recorder.
///
/// Holds the most recent events up to its capacity, discarding the oldest
/// when full. A disabled tracer records nothing.
#[derive(Clone, Debug)]
pub struct Tracer {
    records: VecDeque<TraceRecord>,
    capacity: usize,
    next_id: u64,
    enabled: bool,
}

impl Tracer {
    /// Creates a tracer that records nothing.
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            records: VecDeque::new(),
            capacity: 0,
            next_id: 0,
            enabled: false,
        }
    }

    /// Creates an enabled tracer holding at most `capacity` records.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            records: VecDeque::with_capacity(capacity.min(1024)),
            capacity,
            next_id: 0,
            enabled: capacity > 0,
        }
    }

    /// Returns true if events are being recorded.
    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Records an event, evicting the oldest record when at capacity.
    /// No-op when disabled.
    pub fn record(&mut self, event: TraceEvent) {
        if !self.enabled {
            return;
        }
        let id = self.next_id;
        self.next_id += 1;
        self.records.push_back(TraceRecord { id, event });
        while self.records.len() > self.capacity {
            self.records.pop_front();
        }
    }

    /// Number of records currently held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns true if no records are held.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// A copy of the current records, oldest first.
    #[must_use]
    pub fn records(&self) -> Vec<TraceRecord> {
        self.records.iter().cloned().collect()
    }

    /// Records of one event kind, oldest first.
    #[must_use]
    pub fn by_event_type(&self, event_type: &str) -> Vec<TraceRecord> {
        self.records
            .iter()
            .filter(|r| r.event.event_type() == event_type)
            .cloned()
            .collect()
    }

    /// Drops all records. The record id sequence keeps increasing.
    pub fn clear(&mut self) {
        self.records.clear();
    }
}

impl Default for Tracer {
    fn default() -> Self {
        Self::disabled()
    }
}
