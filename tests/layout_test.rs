mod common;

use common::killing_event;
use fluent_event_sink::transform::{convert_layout_template, LayoutError, LayoutTemplate};
use fluent_event_sink::Event;
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use serde_json::{json, Map, Value};

fn literal_leaf() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(Value::from),
        // no leading `$` and no `{{`, so these are never selectors
        "[a-zA-Z0-9 _./-]{0,16}".prop_map(Value::String),
    ]
}

fn literal_layout() -> impl Strategy<Value = Map<String, Value>> {
    let value = literal_leaf().prop_recursive(3, 24, 4, |inner| {
        prop_oneof![
            proptest::collection::vec(inner.clone(), 0..4).prop_map(Value::Array),
            proptest::collection::btree_map("[a-z]{1,6}", inner, 0..4)
                .prop_map(|map| Value::Object(map.into_iter().collect())),
        ]
    });
    proptest::collection::btree_map("[a-zA-Z]{1,8}", value, 0..6)
        .prop_map(|map| map.into_iter().collect())
}

proptest! {
    #[test]
    fn literal_only_layout_renders_itself(layout in literal_layout(), reason in "[A-Za-z]{0,12}") {
        let event = Event { reason, ..killing_event() };
        let record = convert_layout_template(&layout, &event).unwrap();
        prop_assert_eq!(record.into_inner(), layout);
    }

    #[test]
    fn absent_field_is_never_emitted(field in "[a-z]{4,10}") {
        let layout = json!({ "missing": format!("$.nonexistent{field}"), "msg": "$.reason" });
        let record = convert_layout_template(layout.as_object().unwrap(), &killing_event()).unwrap();
        prop_assert!(!record.contains_key("missing"));
        prop_assert_eq!(record.get("msg"), Some(&json!("Killing")));
    }
}

#[test]
fn test_field_references_keep_json_types() {
    let layout = json!({
        "count": "$.count",
        "source": "$.source",
        "labels": "$.involvedObject.labels",
        "name": "$.involvedObject.labels[\"app.kubernetes.io/name\"]"
    });

    let record = convert_layout_template(layout.as_object().unwrap(), &killing_event()).unwrap();
    assert_eq!(
        Value::from(record),
        json!({
            "count": 1,
            "source": {"component": "kubelet", "host": "node-1"},
            "labels": {"app.kubernetes.io/name": "x"},
            "name": "x"
        })
    );
}

#[test]
fn test_nested_layout_with_lists() {
    let layout = json!({
        "kubernetes": {
            "pod": "$.involvedObject.name",
            "owner": "$.involvedObject.ownerReferences[0].name"
        },
        "tags": ["events", "$.reason", "$.nope"]
    });

    let record = convert_layout_template(layout.as_object().unwrap(), &killing_event()).unwrap();
    assert_eq!(
        Value::from(record),
        json!({
            "kubernetes": {"pod": "x"},
            "tags": ["events", "Killing", null]
        })
    );
}

#[test]
fn test_interpolation_and_escape() {
    let layout = json!({
        "text": "{{ .InvolvedObject.Kind }} {{ .involvedObject.name }}: {{ .Reason }} ({{ .Count }})",
        "blank": "[{{ .Missing }}]",
        "price": "$$5"
    });

    let record = convert_layout_template(layout.as_object().unwrap(), &killing_event()).unwrap();
    assert_eq!(
        Value::from(record),
        json!({
            "text": "Pod x: Killing (1)",
            "blank": "[]",
            "price": "$5"
        })
    );
}

#[test]
fn test_compile_errors_name_the_offending_key() {
    let err = LayoutTemplate::compile(json!({"outer": {"inner": "$.a[oops]"}}).as_object().unwrap())
        .unwrap_err();
    match &err {
        LayoutError::InvalidPath { key, .. } => assert_eq!(key, "outer.inner"),
        other => panic!("unexpected error: {other}"),
    }

    let err = LayoutTemplate::compile(json!({"msg": "{{ .Reason "}).as_object().unwrap()).unwrap_err();
    assert_eq!(err, LayoutError::UnterminatedPlaceholder { key: "msg".to_string() });

    let err = LayoutTemplate::from_value(&json!(["$.reason"])).unwrap_err();
    assert!(matches!(err, LayoutError::NotAMapping(_)));
}

#[test]
fn test_compiled_template_is_reusable() {
    let template = LayoutTemplate::compile(json!({"msg": "$.reason"}).as_object().unwrap()).unwrap();
    assert_eq!(template.keys().collect::<Vec<_>>(), vec!["msg"]);

    for reason in ["Killing", "Pulled", "BackOff"] {
        let event = Event {
            reason: reason.to_string(),
            ..Default::default()
        };
        assert_eq!(template.render(&event).unwrap().get("msg"), Some(&json!(reason)));
    }
}

#[test]
fn test_label_lookup_is_case_sensitive() {
    let layout = json!({
        "upper": "$.involvedObject.labels[\"APP.KUBERNETES.IO/NAME\"]",
        "short": "$.involvedObject.labels[\"APP\"]",
        "dotted": "{{ .InvolvedObject.Labels.APP }}",
        "name": "$.involvedObject.labels[\"app.kubernetes.io/name\"]"
    });

    let record = convert_layout_template(layout.as_object().unwrap(), &killing_event()).unwrap();
    assert_eq!(Value::from(record), json!({"dotted": "", "name": "x"}));
}
