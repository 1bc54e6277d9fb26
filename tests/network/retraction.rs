//! Integration tests for retraction
//!
//! Retracting a tuple must remove every combination it participates in,
//! across every rule, and leave the network ready for a fresh assert.

use std::sync::Arc;

use retenet::foundation::ErrorKind;
use retenet::model::{Rule, Tuple, TypeRegistry};
use retenet::network::Network;

fn registry() -> TypeRegistry {
    TypeRegistry::from_json(
        r#"[
            {"name": "n1", "properties": [
                {"name": "name", "type": "string", "key": true},
                {"name": "age", "type": "int"}
            ]},
            {"name": "n2", "properties": [
                {"name": "name", "type": "string", "key": true},
                {"name": "wife_name", "type": "string"}
            ]}
        ]"#,
    )
    .unwrap()
}

fn n1(reg: &TypeRegistry, name: &str) -> Arc<Tuple> {
    let mut t = Tuple::new(reg, "n1", &[name.into()]).unwrap();
    t.set_int("age", 20).unwrap();
    Arc::new(t)
}

fn n2(reg: &TypeRegistry, name: &str) -> Arc<Tuple> {
    Arc::new(Tuple::new(reg, "n2", &[name.into()]).unwrap())
}

fn join_rule(name: &str) -> Rule {
    let mut rule = Rule::new(name);
    rule.add_condition(
        "same_name",
        &["n1", "n2"],
        Arc::new(|_, _, tuples, _| {
            let (Some(t1), Some(t2)) = (tuples.get("n1"), tuples.get("n2")) else {
                return false;
            };
            t1.get_string("name").ok() == t2.get_string("name").ok()
        }),
    )
    .unwrap();
    rule.set_action(Arc::new(|_, _, _, _| {}));
    rule
}

#[test]
fn retract_restores_pre_assert_row_counts() {
    let reg = registry();
    let mut nw = Network::new();
    nw.add_rule(&reg, join_rule("r1")).unwrap();

    nw.assert(&n2(&reg, "Bob")).unwrap();
    let baseline_rows = nw.total_row_count();
    let baseline_handles = nw.handle_count();

    let t = n1(&reg, "Bob");
    nw.assert(&t).unwrap();
    assert!(nw.total_row_count() > baseline_rows);

    nw.retract(t.key()).unwrap();
    assert_eq!(nw.total_row_count(), baseline_rows);
    assert_eq!(nw.handle_count(), baseline_handles);
    assert!(!nw.contains_fact(t.key()));
}

#[test]
fn retract_spans_all_rules() {
    let reg = registry();
    let mut nw = Network::new();
    nw.add_rule(&reg, join_rule("r1")).unwrap();
    nw.add_rule(&reg, join_rule("r2")).unwrap();

    let t = n1(&reg, "Bob");
    nw.assert(&t).unwrap();
    nw.assert(&n2(&reg, "Bob")).unwrap();
    assert!(nw.rule_row_count("r1").unwrap() > 0);
    assert!(nw.rule_row_count("r2").unwrap() > 0);

    nw.retract(t.key()).unwrap();
    // Only the n2 alpha rows survive in each rule.
    assert_eq!(nw.rule_row_count("r1").unwrap(), 1);
    assert_eq!(nw.rule_row_count("r2").unwrap(), 1);
}

#[test]
fn reassert_after_retract_joins_again() {
    let reg = registry();
    let mut nw = Network::new();
    nw.add_rule(&reg, join_rule("r1")).unwrap();

    let t = n1(&reg, "Bob");
    nw.assert(&t).unwrap();
    nw.assert(&n2(&reg, "Bob")).unwrap();
    nw.retract(t.key()).unwrap();

    let acts = nw.assert(&n1(&reg, "Bob")).unwrap();
    assert_eq!(acts.len(), 1);
}

#[test]
fn retract_unknown_and_double_retract_fail() {
    let reg = registry();
    let mut nw = Network::new();

    let t = n1(&reg, "Bob");
    assert!(matches!(
        nw.retract(t.key()).unwrap_err().kind,
        ErrorKind::HandleNotFound(_)
    ));

    nw.assert(&t).unwrap();
    nw.retract(t.key()).unwrap();
    assert!(matches!(
        nw.retract(t.key()).unwrap_err().kind,
        ErrorKind::HandleNotFound(_)
    ));
}

#[test]
fn retract_with_many_counterparts_drains_everything() {
    let reg = registry();
    let mut nw = Network::new();

    let mut rule = Rule::new("any_pair");
    rule.add_condition("pair", &["n1", "n2"], Arc::new(|_, _, _, _| true))
        .unwrap();
    rule.set_action(Arc::new(|_, _, _, _| {}));
    nw.add_rule(&reg, rule).unwrap();

    for i in 0..50 {
        nw.assert(&n2(&reg, &format!("w{i}"))).unwrap();
    }
    let t = n1(&reg, "Bob");
    nw.assert(&t).unwrap();
    // 50 alpha rows + 1 alpha row + 50 joined rows.
    assert_eq!(nw.total_row_count(), 101);

    nw.retract(t.key()).unwrap();
    assert_eq!(nw.total_row_count(), 50);
    assert_eq!(nw.handle_count(), 50);
}
