//! Integration tests for join propagation
//!
//! Multi-type joins against the raw network, including order independence
//! and three-way joins.

use std::sync::Arc;

use retenet::model::{ConditionFn, Rule, Tuple, TypeRegistry};
use retenet::network::Network;

fn registry() -> TypeRegistry {
    TypeRegistry::from_json(
        r#"[
            {"name": "n1", "properties": [
                {"name": "name", "type": "string", "key": true},
                {"name": "age", "type": "int"},
                {"name": "address", "type": "string"}
            ]},
            {"name": "n2", "properties": [
                {"name": "name", "type": "string", "key": true},
                {"name": "wife_name", "type": "string"},
                {"name": "child_name", "type": "string"}
            ]},
            {"name": "n3", "properties": [
                {"name": "name", "type": "string", "key": true}
            ]}
        ]"#,
    )
    .unwrap()
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

fn n3(reg: &TypeRegistry, name: &str) -> Arc<Tuple> {
    Arc::new(Tuple::new(reg, "n3", &[name.into()]).unwrap())
}

fn string_eq(ident: &'static str, prop: &'static str, expected: &'static str) -> ConditionFn {
    Arc::new(move |_, _, tuples, _| {
        tuples
            .get(ident)
            .is_some_and(|t| t.get_string(prop).is_ok_and(|v| v == expected))
    })
}

fn age_over(threshold: i64) -> ConditionFn {
    Arc::new(move |_, _, tuples, _| {
        tuples
            .get("n1")
            .is_some_and(|t| t.get_int("age").is_ok_and(|a| a > threshold))
    })
}

fn names_match() -> ConditionFn {
    Arc::new(|_, _, tuples, _| {
        let (Some(t1), Some(t2)) = (tuples.get("n1"), tuples.get("n2")) else {
            return false;
        };
        t1.get_string("name").ok() == t2.get_string("name").ok()
    })
}

/// The Bob/maria rule: n1 named Bob, older than 12, joined to an n2 with
/// the same name whose wife is maria.
fn family_rule() -> Rule {
    let mut rule = Rule::new("bob_family");
    rule.add_condition("c1", &["n1"], string_eq("n1", "name", "Bob"))
        .unwrap();
    rule.add_condition("c2", &["n1"], age_over(12)).unwrap();
    rule.add_condition("c3", &["n1", "n2"], names_match()).unwrap();
    rule.add_condition("c4", &["n2"], string_eq("n2", "wife_name", "maria"))
        .unwrap();
    rule.set_action(Arc::new(|_, _, _, _| {}));
    rule
}

#[test]
fn completed_join_activates_with_both_tuples() {
    let reg = registry();
    let mut nw = Network::new();
    nw.add_rule(&reg, family_rule()).unwrap();

    assert!(nw.assert(&n1(&reg, "Bob", 15)).unwrap().is_empty());
    let acts = nw.assert(&n2(&reg, "Bob", "maria")).unwrap();

    assert_eq!(acts.len(), 1);
    assert_eq!(acts[0].rule_name.as_ref(), "bob_family");
    let tuples = &acts[0].tuples;
    assert_eq!(tuples.get("n1").unwrap().get_int("age").unwrap(), 15);
    assert_eq!(
        tuples.get("n2").unwrap().get_string("wife_name").unwrap(),
        "maria"
    );
}

#[test]
fn activation_count_is_order_independent() {
    let reg = registry();

    let count_for = |order: &[&Arc<Tuple>]| {
        let mut nw = Network::new();
        nw.add_rule(&reg, family_rule()).unwrap();
        let mut total = 0;
        for t in order {
            total += nw.assert(t).unwrap().len();
        }
        total
    };

    let a = n1(&reg, "Bob", 15);
    let b = n2(&reg, "Bob", "maria");
    assert_eq!(count_for(&[&a, &b]), 1);
    assert_eq!(count_for(&[&b, &a]), 1);
}

#[test]
fn failed_filters_suppress_the_join() {
    let reg = registry();

    for (name, age, wife) in [
        ("Tom", 15, "maria"), // c1 fails
        ("Bob", 10, "maria"), // c2 fails
        ("Bob", 15, "ann"),   // c4 fails
    ] {
        let mut nw = Network::new();
        nw.add_rule(&reg, family_rule()).unwrap();
        let mut total = 0;
        total += nw.assert(&n1(&reg, name, age)).unwrap().len();
        total += nw.assert(&n2(&reg, name, wife)).unwrap().len();
        assert_eq!(total, 0, "case ({name}, {age}, {wife})");
    }
}

#[test]
fn join_condition_sees_only_matching_pairs() {
    let reg = registry();
    let mut nw = Network::new();

    let mut rule = Rule::new("pairs");
    rule.add_condition("same_name", &["n1", "n2"], names_match())
        .unwrap();
    rule.set_action(Arc::new(|_, _, _, _| {}));
    nw.add_rule(&reg, rule).unwrap();

    nw.assert(&n1(&reg, "Bob", 15)).unwrap();
    nw.assert(&n1(&reg, "Tom", 20)).unwrap();

    // Only the Bob pair joins; the Tom tuple stays in its alpha table.
    let acts = nw.assert(&n2(&reg, "Bob", "maria")).unwrap();
    assert_eq!(acts.len(), 1);
    assert_eq!(
        acts[0].tuples.get("n1").unwrap().get_string("name").unwrap(),
        "Bob"
    );
}

#[test]
fn three_way_join_cascades() {
    let reg = registry();
    let mut nw = Network::new();

    let mut rule = Rule::new("triple");
    rule.add_condition("same_12", &["n1", "n2"], names_match())
        .unwrap();
    rule.add_condition(
        "same_23",
        &["n2", "n3"],
        Arc::new(|_, _, tuples, _| {
            let (Some(t2), Some(t3)) = (tuples.get("n2"), tuples.get("n3")) else {
                return false;
            };
            t2.get_string("name").ok() == t3.get_string("name").ok()
        }),
    )
    .unwrap();
    rule.set_action(Arc::new(|_, _, _, _| {}));
    nw.add_rule(&reg, rule).unwrap();

    assert!(nw.assert(&n1(&reg, "Bob", 15)).unwrap().is_empty());
    assert!(nw.assert(&n2(&reg, "Bob", "maria")).unwrap().is_empty());
    let acts = nw.assert(&n3(&reg, "Bob")).unwrap();

    assert_eq!(acts.len(), 1);
    assert_eq!(acts[0].tuples.len(), 3);
}

#[test]
fn middle_assert_completes_three_way_join() {
    let reg = registry();
    let mut nw = Network::new();

    let mut rule = Rule::new("triple");
    rule.add_condition("same_12", &["n1", "n2"], names_match())
        .unwrap();
    rule.add_condition(
        "has_n3",
        &["n2", "n3"],
        Arc::new(|_, _, tuples, _| tuples.contains_key("n3")),
    )
    .unwrap();
    rule.set_action(Arc::new(|_, _, _, _| {}));
    nw.add_rule(&reg, rule).unwrap();

    // The n2 arrives last even though it sits in the middle of the join
    // order; the right-side cross still finds both neighbours.
    assert!(nw.assert(&n1(&reg, "Bob", 15)).unwrap().is_empty());
    assert!(nw.assert(&n3(&reg, "Bob")).unwrap().is_empty());
    let acts = nw.assert(&n2(&reg, "Bob", "maria")).unwrap();
    assert_eq!(acts.len(), 1);
}
