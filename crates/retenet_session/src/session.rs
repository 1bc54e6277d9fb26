//! Named rule sessions.
//!
//! A [`RuleSession`] owns one type registry and one matching network behind
//! a single mutex. Every mutating entry point takes that lock, so asserts,
//! retracts, rule management, and delayed asserts arriving from timer
//! threads are fully serialized. Actions fire synchronously while the lock
//! is held; an action that re-enters assert/retract on its own session will
//! deadlock, and must instead hand work to another thread or session.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::Duration;

use once_cell::sync::Lazy;

use retenet_foundation::{ErrorKind, Result};
use retenet_model::{Rule, SessionContext, Tuple, TupleKey, TypeRegistry};
use retenet_network::{Activation, Network};

use crate::trace::{TraceEvent, TraceRecord, Tracer};

/// Process-wide registry of named sessions.
static SESSIONS: Lazy<Mutex<HashMap<String, RuleSession>>> =
    Lazy::new(|| Mutex::new(HashMap::new()));

fn sessions() -> MutexGuard<'static, HashMap<String, RuleSession>> {
    SESSIONS.lock().unwrap_or_else(PoisonError::into_inner)
}

// =============================================================================
// Session Configuration
// =============================================================================

/// Startup configuration for a rule session.
#[derive(Clone, Copy, Debug, Default)]
pub struct SessionConfig {
    trace_capacity: Option<usize>,
}

impl SessionConfig {
    /// Creates the default configuration: tracing disabled.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Enables the trace buffer, holding at most `capacity` records.
    #[must_use]
    pub const fn with_trace_capacity(mut self, capacity: usize) -> Self {
        self.trace_capacity = Some(capacity);
        self
    }
}

// =============================================================================
// Rule Session
// =============================================================================

/// State behind the session lock.
struct SessionState {
    registry: TypeRegistry,
    network: Network,
    started: bool,
    closed: bool,
    scheduled: HashMap<String, Arc<AtomicBool>>,
    tracer: Tracer,
}

struct SessionInner {
    name: Arc<str>,
    state: Mutex<SessionState>,
}

impl SessionInner {
    fn state(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// A named rule session: type registry, rules, working memory, and agenda.
///
/// Sessions are cheap-clone handles over shared state; clones observe and
/// mutate the same session. Obtain one via [`RuleSession::get_or_create`].
#[derive(Clone)]
pub struct RuleSession {
    inner: Arc<SessionInner>,
}

impl RuleSession {
    fn new(name: &str) -> Self {
        Self {
            inner: Arc::new(SessionInner {
                name: name.into(),
                state: Mutex::new(SessionState {
                    registry: TypeRegistry::new(),
                    network: Network::new(),
                    started: false,
                    closed: false,
                    scheduled: HashMap::new(),
                    tracer: Tracer::disabled(),
                }),
            }),
        }
    }

    /// Returns the session registered under `name`, creating it if absent.
    #[must_use]
    pub fn get_or_create(name: &str) -> Self {
        sessions()
            .entry(name.to_string())
            .or_insert_with(|| Self::new(name))
            .clone()
    }

    /// Looks up an existing session by name.
    #[must_use]
    pub fn get(name: &str) -> Option<Self> {
        sessions().get(name).cloned()
    }

    /// The session name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Registers tuple descriptors from a JSON descriptor document.
    /// May be called repeatedly; each call adds to the registry.
    ///
    /// # Errors
    /// Fails on a malformed document, a duplicate tuple-type name, or an
    /// invalid descriptor, leaving the registry unchanged. Fails on a
    /// closed session.
    pub fn register_types(&self, json: &str) -> Result<()> {
        let mut state = self.inner.state();
        self.ensure_open(&state)?;
        state.registry.register_json(json)
    }

    /// Compiles and registers a rule. Rules may be added before or after
    /// `start`; a rule only matches tuples asserted after it was added.
    ///
    /// # Errors
    /// Fails for a duplicate rule name, an invalid rule, a condition
    /// referencing an unregistered tuple type, or a closed session.
    pub fn add_rule(&self, rule: Rule) -> Result<()> {
        let mut state = self.inner.state();
        self.ensure_open(&state)?;
        let name = rule.name().clone();
        let SessionState {
            registry,
            network,
            tracer,
            ..
        } = &mut *state;
        network.add_rule(registry, rule)?;
        tracer.record(TraceEvent::RuleAdded { rule: name });
        Ok(())
    }

    /// Removes a rule and all of its join state. Other rules keep their
    /// matches.
    ///
    /// # Errors
    /// Fails if no rule with this name is registered, or on a closed
    /// session.
    pub fn delete_rule(&self, name: &str) -> Result<()> {
        let mut state = self.inner.state();
        self.ensure_open(&state)?;
        state.network.delete_rule(name)?;
        state
            .tracer
            .record(TraceEvent::RuleDeleted { rule: name.into() });
        Ok(())
    }

    /// Starts the session, enabling assert/retract traffic. Idempotent;
    /// the configuration of the first `start` wins.
    ///
    /// # Errors
    /// Fails on a closed session.
    pub fn start(&self, config: SessionConfig) -> Result<()> {
        let mut state = self.inner.state();
        self.ensure_open(&state)?;
        if state.started {
            return Ok(());
        }
        state.started = true;
        state.tracer = config
            .trace_capacity
            .map_or_else(Tracer::disabled, Tracer::with_capacity);
        Ok(())
    }

    /// Asserts a tuple into working memory, propagates it through every
    /// rule network, and fires the resulting completed matches before
    /// returning. Matches fire in priority order (higher first), ties in
    /// rule registration order, then match creation order.
    ///
    /// # Errors
    /// Fails on a non-started or closed session, or if a tuple with the
    /// same key is already asserted.
    pub fn assert(&self, tuple: Arc<Tuple>) -> Result<()> {
        let mut state = self.inner.state();
        self.ensure_started(&state)?;
        let activations = state.network.assert(&tuple)?;
        state.tracer.record(TraceEvent::Asserted {
            key: tuple.key().to_string(),
        });
        self.fire(&mut state, activations);
        Ok(())
    }

    /// Retracts a previously asserted tuple. Every match the tuple
    /// participated in is removed; no actions fire.
    ///
    /// # Errors
    /// Fails on a non-started or closed session, or if the tuple is not
    /// in working memory.
    pub fn retract(&self, tuple: &Tuple) -> Result<()> {
        self.retract_key(tuple.key())
    }

    /// Retracts by tuple key. See [`RuleSession::retract`].
    ///
    /// # Errors
    /// Fails on a non-started or closed session, or if no tuple with this
    /// key is in working memory.
    pub fn retract_key(&self, key: &TupleKey) -> Result<()> {
        let mut state = self.inner.state();
        self.ensure_started(&state)?;
        state.network.retract(key)?;
        state.tracer.record(TraceEvent::Retracted {
            key: key.to_string(),
        });
        Ok(())
    }

    /// Schedules `tuple` for assertion after `delay_ms` milliseconds, on a
    /// timer thread that goes through the normal [`RuleSession::assert`]
    /// path. `correlation_id` names the schedule for cancellation;
    /// scheduling under an id that is already pending cancels the earlier
    /// schedule. A delayed assert that fails (say, the session was closed
    /// in the meantime) is dropped.
    ///
    /// # Errors
    /// Fails on a non-started or closed session.
    pub fn schedule_assert(
        &self,
        delay_ms: u64,
        correlation_id: impl Into<String>,
        tuple: Arc<Tuple>,
    ) -> Result<()> {
        let id = correlation_id.into();
        let cancelled = Arc::new(AtomicBool::new(false));
        {
            let mut state = self.inner.state();
            self.ensure_started(&state)?;
            if let Some(prev) = state.scheduled.insert(id.clone(), cancelled.clone()) {
                prev.store(true, Ordering::SeqCst);
            }
            state.tracer.record(TraceEvent::AssertScheduled {
                correlation_id: id.clone(),
                delay_ms,
            });
        }

        let session = self.clone();
        thread::spawn(move || {
            thread::sleep(Duration::from_millis(delay_ms));
            if !cancelled.load(Ordering::SeqCst) {
                let _ = session.assert(tuple);
            }
            let mut state = session.inner.state();
            if state
                .scheduled
                .get(&id)
                .is_some_and(|flag| Arc::ptr_eq(flag, &cancelled))
            {
                state.scheduled.remove(&id);
            }
        });
        Ok(())
    }

    /// Cancels a pending delayed assert. Returns true if a schedule with
    /// this id was still pending. Best-effort: a timer that has already
    /// passed its cancellation check will complete its assert.
    pub fn cancel_scheduled_assert(&self, correlation_id: &str) -> bool {
        let mut state = self.inner.state();
        if let Some(flag) = state.scheduled.remove(correlation_id) {
            flag.store(true, Ordering::SeqCst);
            state.tracer.record(TraceEvent::AssertCancelled {
                correlation_id: correlation_id.to_string(),
            });
            true
        } else {
            false
        }
    }

    /// Closes the session: cancels pending delayed asserts, releases all
    /// network state, and removes the session from the named registry.
    /// Idempotent; later calls are no-ops. A closed session rejects all
    /// further operations, and `get_or_create` under the same name makes
    /// a fresh session.
    pub fn unregister(&self) {
        sessions().remove(self.name());
        let mut state = self.inner.state();
        if state.closed {
            return;
        }
        state.closed = true;
        for flag in state.scheduled.values() {
            flag.store(true, Ordering::SeqCst);
        }
        state.scheduled.clear();
        state.network.clear();
    }

    /// Returns true if a tuple with this key is in working memory.
    #[must_use]
    pub fn contains_fact(&self, key: &TupleKey) -> bool {
        self.inner.state().network.contains_fact(key)
    }

    /// Number of tuples in working memory.
    #[must_use]
    pub fn fact_count(&self) -> usize {
        self.inner.state().network.handle_count()
    }

    /// Registered rule names in registration order.
    #[must_use]
    pub fn rule_names(&self) -> Vec<Arc<str>> {
        self.inner.state().network.rule_names()
    }

    /// Returns true if the session has been started and not closed.
    #[must_use]
    pub fn is_started(&self) -> bool {
        let state = self.inner.state();
        state.started && !state.closed
    }

    /// A copy of the current trace records, oldest first. Empty when
    /// tracing is disabled.
    #[must_use]
    pub fn trace_records(&self) -> Vec<TraceRecord> {
        self.inner.state().tracer.records()
    }

    fn fire(&self, state: &mut SessionState, mut agenda: Vec<Activation>) {
        // Stable sort: within one rule and priority, match creation order
        // is preserved.
        agenda.sort_by(|a, b| b.priority.cmp(&a.priority).then(a.seq.cmp(&b.seq)));
        for act in agenda {
            let Some(rn) = state.network.rule(&act.rule_name).cloned() else {
                continue;
            };
            if let Some(action) = rn.rule().action().cloned() {
                state.tracer.record(TraceEvent::RuleFired {
                    rule: act.rule_name.clone(),
                });
                action(self, rn.rule().name(), &act.tuples, rn.rule().context());
            }
        }
    }

    fn ensure_open(&self, state: &SessionState) -> Result<()> {
        if state.closed {
            return Err(ErrorKind::SessionClosed(self.name().to_string()).into());
        }
        Ok(())
    }

    fn ensure_started(&self, state: &SessionState) -> Result<()> {
        self.ensure_open(state)?;
        if !state.started {
            return Err(ErrorKind::NotStarted(self.name().to_string()).into());
        }
        Ok(())
    }
}

impl SessionContext for RuleSession {
    fn session_name(&self) -> &str {
        self.name()
    }
}
