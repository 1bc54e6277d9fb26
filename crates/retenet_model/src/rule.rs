//! Rule definitions and the callback contracts the network invokes.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use retenet_foundation::{ErrorKind, Result, Value};

use crate::tuple::Tuple;

/// Tuples bound to a match, keyed by tuple type name.
///
/// The engine guarantees an entry for every type a condition or action
/// declared; types outside a callback's declaration may be absent.
pub type TupleMap = HashMap<Arc<str>, Arc<Tuple>>;

/// Condition callback contract.
///
/// Invoked as `(rule_name, condition_name, tuples, rule_context) -> bool`.
pub type ConditionFn =
    Arc<dyn Fn(&str, &str, &TupleMap, Option<&Value>) -> bool + Send + Sync>;

/// Action callback contract.
///
/// Invoked at most once per completed match per assert, as
/// `(session, rule_name, tuples, rule_context)`. Actions run while the
/// session lock is held and must not re-enter assert/retract on the same
/// session.
pub type ActionFn =
    Arc<dyn Fn(&dyn SessionContext, &str, &TupleMap, Option<&Value>) + Send + Sync>;

/// The slice of the rule session an action callback may observe.
///
/// Defined here, beneath the session layer, so that rule definitions do not
/// depend on the session implementation.
pub trait SessionContext: Send + Sync {
    /// Name of the session the action is firing in.
    fn session_name(&self) -> &str;
}

/// One named condition of a rule, bound to one or more tuple types.
#[derive(Clone)]
pub struct Condition {
    name: String,
    identifiers: Vec<Arc<str>>,
    callback: ConditionFn,
}

impl Condition {
    /// Condition name (unique within its rule by convention).
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Tuple types this condition is bound to, in declaration order.
    #[must_use]
    pub fn identifiers(&self) -> &[Arc<str>] {
        &self.identifiers
    }

    /// Evaluates the condition callback.
    #[must_use]
    pub fn evaluate(&self, rule_name: &str, tuples: &TupleMap, context: Option<&Value>) -> bool {
        (self.callback)(rule_name, &self.name, tuples, context)
    }
}

impl fmt::Debug for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Condition")
            .field("name", &self.name)
            .field("identifiers", &self.identifiers)
            .finish_non_exhaustive()
    }
}

/// A rule: an ordered list of named conditions, one action, a priority,
/// and an optional opaque context value passed to every callback.
///
/// The rule name is often an informal rendering of the conditions, used as
/// a label.
#[derive(Clone)]
pub struct Rule {
    name: Arc<str>,
    conditions: Vec<Condition>,
    action: Option<ActionFn>,
    priority: i32,
    context: Option<Value>,
}

impl Rule {
    /// Creates an empty rule with the given name, priority 0, no context.
    #[must_use]
    pub fn new(name: impl Into<Arc<str>>) -> Self {
        Self {
            name: name.into(),
            conditions: Vec::new(),
            action: None,
            priority: 0,
            context: None,
        }
    }

    /// Appends a named condition bound to the given tuple types.
    ///
    /// # Errors
    /// Fails if the identifier list is empty; a condition must be bound to
    /// at least one tuple type.
    pub fn add_condition(
        &mut self,
        name: impl Into<String>,
        identifiers: &[&str],
        callback: ConditionFn,
    ) -> Result<()> {
        let name = name.into();
        if identifiers.is_empty() {
            return Err(ErrorKind::InvalidRule {
                rule: self.name.to_string(),
                reason: format!("condition {name} declares no tuple types"),
            }
            .into());
        }
        self.conditions.push(Condition {
            name,
            identifiers: identifiers.iter().map(|i| Arc::from(*i)).collect(),
            callback,
        });
        Ok(())
    }

    /// Sets the action fired for each completed match.
    pub fn set_action(&mut self, action: ActionFn) {
        self.action = Some(action);
    }

    /// Sets the firing priority (higher fires first).
    pub fn set_priority(&mut self, priority: i32) {
        self.priority = priority;
    }

    /// Sets the opaque context value passed to every callback.
    pub fn set_context(&mut self, context: Value) {
        self.context = Some(context);
    }

    /// Rule name.
    #[must_use]
    pub fn name(&self) -> &Arc<str> {
        &self.name
    }

    /// Conditions in declaration order.
    #[must_use]
    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    /// The registered action, if any.
    #[must_use]
    pub fn action(&self) -> Option<&ActionFn> {
        self.action.as_ref()
    }

    /// Firing priority.
    #[must_use]
    pub const fn priority(&self) -> i32 {
        self.priority
    }

    /// Opaque rule context.
    #[must_use]
    pub fn context(&self) -> Option<&Value> {
        self.context.as_ref()
    }

    /// Tuple types referenced by this rule, in order of first appearance
    /// across its conditions. This is the join order of the compiled
    /// network.
    #[must_use]
    pub fn identifiers(&self) -> Vec<Arc<str>> {
        let mut seen = Vec::new();
        for cond in &self.conditions {
            for id in cond.identifiers() {
                if !seen.iter().any(|s: &Arc<str>| s == id) {
                    seen.push(id.clone());
                }
            }
        }
        seen
    }

    /// Validates the rule is complete enough to compile.
    ///
    /// # Errors
    /// Fails if the rule has no conditions or no action.
    pub fn validate(&self) -> Result<()> {
        if self.conditions.is_empty() {
            return Err(ErrorKind::InvalidRule {
                rule: self.name.to_string(),
                reason: "rule has no conditions".to_string(),
            }
            .into());
        }
        if self.action.is_none() {
            return Err(ErrorKind::InvalidRule {
                rule: self.name.to_string(),
                reason: "rule has no action".to_string(),
            }
            .into());
        }
        Ok(())
    }
}

impl fmt::Debug for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rule")
            .field("name", &self.name)
            .field("conditions", &self.conditions)
            .field("priority", &self.priority)
            .finish_non_exhaustive()
    }
}
