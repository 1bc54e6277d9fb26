//! Integration tests for agenda firing
//!
//! The full assert-to-action path: filters, joins, fire-once semantics,
//! and priority ordering.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use retenet::model::{ConditionFn, Rule, Tuple, TupleMap, TypeRegistry};
use retenet::session::{RuleSession, SessionConfig};

const DESCRIPTORS: &str = r#"[
    {"name": "n1", "properties": [
        {"name": "name", "type": "string", "key": true},
        {"name": "age", "type": "int"},
        {"name": "address", "type": "string"}
    ]},
    {"name": "n2", "properties": [
        {"name": "name", "type": "string", "key": true},
        {"name": "wife_name", "type": "string"},
        {"name": "child_name", "type": "string"}
    ]}
]"#;

fn started_session(name: &str) -> RuleSession {
    let session = RuleSession::get_or_create(name);
    session.register_types(DESCRIPTORS).unwrap();
    session.start(SessionConfig::new()).unwrap();
    session
}

fn scratch_registry() -> TypeRegistry {
    TypeRegistry::from_json(DESCRIPTORS).unwrap()
}

fn n1(reg: &TypeRegistry, name: &str, age: i64) -> Arc<Tuple> {
    let mut t = Tuple::new(reg, "n1", &[name.into()]).unwrap();
    t.set_int("age", age).unwrap();
    Arc::new(t)
}

fn n2(reg: &TypeRegistry, name: &str, wife: &str) -> Arc<Tuple> {
    let mut t = Tuple::new(reg, "n2", &[name.into()]).unwrap();
    t.set_string("wife_name", wife).unwrap();
    Arc::new(t)
}

fn names_match() -> ConditionFn {
    Arc::new(|_, _, tuples, _| {
        let (Some(t1), Some(t2)) = (tuples.get("n1"), tuples.get("n2")) else {
            return false;
        };
        t1.get_string("name").ok() == t2.get_string("name").ok()
    })
}

/// The Bob/maria rule, with a counting action.
fn family_rule(fired: &Arc<AtomicUsize>) -> Rule {
    let fired = fired.clone();
    let mut rule = Rule::new("bob_family");
    rule.add_condition(
        "is_bob",
        &["n1"],
        Arc::new(|_, _, tuples: &TupleMap, _| {
            tuples
                .get("n1")
                .is_some_and(|t| t.get_string("name").is_ok_and(|n| n == "Bob"))
        }),
    )
    .unwrap();
    rule.add_condition(
        "teen_or_older",
        &["n1"],
        Arc::new(|_, _, tuples: &TupleMap, _| {
            tuples
                .get("n1")
                .is_some_and(|t| t.get_int("age").is_ok_and(|a| a > 12))
        }),
    )
    .unwrap();
    rule.add_condition("same_name", &["n1", "n2"], names_match())
        .unwrap();
    rule.add_condition(
        "wife_is_maria",
        &["n2"],
        Arc::new(|_, _, tuples: &TupleMap, _| {
            tuples
                .get("n2")
                .is_some_and(|t| t.get_string("wife_name").is_ok_and(|w| w == "maria"))
        }),
    )
    .unwrap();
    rule.set_action(Arc::new(move |_, _, _, _| {
        fired.fetch_add(1, Ordering::SeqCst);
    }));
    rule
}

#[test]
fn completed_match_fires_exactly_once() {
    let session = started_session("it_fire_once");
    let reg = scratch_registry();
    let fired = Arc::new(AtomicUsize::new(0));
    session.add_rule(family_rule(&fired)).unwrap();

    session.assert(n1(&reg, "Bob", 15)).unwrap();
    assert_eq!(fired.load(Ordering::SeqCst), 0);

    session.assert(n2(&reg, "Bob", "maria")).unwrap();
    assert_eq!(fired.load(Ordering::SeqCst), 1);

    // An unrelated assert does not re-fire the existing match.
    session.assert(n1(&reg, "Tom", 40)).unwrap();
    assert_eq!(fired.load(Ordering::SeqCst), 1);
    session.unregister();
}

#[test]
fn firing_is_order_independent() {
    for (name, flipped) in [("it_order_ab", false), ("it_order_ba", true)] {
        let session = started_session(name);
        let reg = scratch_registry();
        let fired = Arc::new(AtomicUsize::new(0));
        session.add_rule(family_rule(&fired)).unwrap();

        let a = n1(&reg, "Bob", 15);
        let b = n2(&reg, "Bob", "maria");
        if flipped {
            session.assert(b).unwrap();
            session.assert(a).unwrap();
        } else {
            session.assert(a).unwrap();
            session.assert(b).unwrap();
        }
        assert_eq!(fired.load(Ordering::SeqCst), 1, "flipped={flipped}");
        session.unregister();
    }
}

#[test]
fn action_receives_matched_tuples_and_context() {
    let session = started_session("it_action_args");
    let reg = scratch_registry();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let seen_in_action = seen.clone();

    let mut rule = Rule::new("observer");
    rule.set_context("fleet-42".into());
    rule.add_condition("any", &["n1"], Arc::new(|_, _, _, _| true))
        .unwrap();
    rule.set_action(Arc::new(move |_, rule_name, tuples, ctx| {
        let name = tuples
            .get("n1")
            .and_then(|t| t.get_string("name").ok().map(str::to_string))
            .unwrap_or_default();
        let ctx = ctx.and_then(retenet::foundation::Value::as_str).unwrap_or("").to_string();
        seen_in_action
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((rule_name.to_string(), name, ctx));
    }));
    session.add_rule(rule).unwrap();

    session.assert(n1(&reg, "Bob", 15)).unwrap();
    let seen = seen.lock().unwrap_or_else(PoisonError::into_inner);
    assert_eq!(
        *seen,
        vec![(
            "observer".to_string(),
            "Bob".to_string(),
            "fleet-42".to_string()
        )]
    );
    session.unregister();
}

#[test]
fn priority_then_registration_order() {
    let session = started_session("it_priorities");
    let reg = scratch_registry();
    let order = Arc::new(Mutex::new(Vec::new()));

    // Same priority for b1/b2: registration order breaks the tie.
    for (name, priority) in [("b1", 0), ("top", 10), ("b2", 0)] {
        let order = order.clone();
        let mut rule = Rule::new(name);
        rule.add_condition("any", &["n1"], Arc::new(|_, _, _, _| true))
            .unwrap();
        rule.set_priority(priority);
        rule.set_action(Arc::new(move |_, rule_name, _, _| {
            order
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(rule_name.to_string());
        }));
        session.add_rule(rule).unwrap();
    }

    session.assert(n1(&reg, "Bob", 15)).unwrap();
    let order = order.lock().unwrap_or_else(PoisonError::into_inner);
    assert_eq!(*order, vec!["top", "b1", "b2"]);
    session.unregister();
}

#[test]
fn one_assert_can_complete_several_matches() {
    let session = started_session("it_multi_match");
    let reg = scratch_registry();
    let fired = Arc::new(AtomicUsize::new(0));

    let counter = fired.clone();
    let mut rule = Rule::new("pairs");
    rule.add_condition("any_pair", &["n1", "n2"], Arc::new(|_, _, _, _| true))
        .unwrap();
    rule.set_action(Arc::new(move |_, _, _, _| {
        counter.fetch_add(1, Ordering::SeqCst);
    }));
    session.add_rule(rule).unwrap();

    session.assert(n2(&reg, "Bob", "maria")).unwrap();
    session.assert(n2(&reg, "Rob", "ann")).unwrap();
    assert_eq!(fired.load(Ordering::SeqCst), 0);

    // The single n1 pairs with both stored n2 tuples.
    session.assert(n1(&reg, "Tom", 30)).unwrap();
    assert_eq!(fired.load(Ordering::SeqCst), 2);
    session.unregister();
}
