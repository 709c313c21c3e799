//! Property tests for readable rendering and the outbound pipeline.
//!
//! Uses proptest to verify:
//! 1. Every nested string comes back verbatim after marker replacement,
//!    both token by token and in the fully rendered text.
//! 2. Rendering never changes the structure outside of strings.
//! 3. The outbound pipeline accepts anything `serde_json` printed.
//! 4. Arbitrary text never makes the inbound formatter panic.

use proptest::prelude::*;
use serde_json::{Map, Value};

use wsprobe_core::markers::{mark_for_replacement, render_readable, replace_markers};
use wsprobe_core::pipeline::{Outbound, format_inbound, prepare_outbound};

// --- Strategies ---

/// Strings that include quotes, newlines and marker-like text.
fn arb_text() -> impl Strategy<Value = String> {
    prop_oneof![
        "[a-z ]{0,16}",
        "[\"\\\\\n\t{}%0-9]{0,16}",
        (0u32..2000).prop_map(|n| format!("{{%{n}%}}")),
    ]
}

/// Scalar leaves other than strings.
fn arb_scalar() -> BoxedStrategy<Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i32>().prop_map(Value::from),
    ]
    .boxed()
}

/// Arrays and objects nested up to four levels over `leaf`.
fn arb_tree(leaf: BoxedStrategy<Value>) -> impl Strategy<Value = Value> {
    leaf.prop_recursive(4, 48, 6, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..6).prop_map(Value::Array),
            prop::collection::vec(("[a-z]{1,6}", inner), 0..6)
                .prop_map(|pairs| Value::Object(pairs.into_iter().collect::<Map<_, _>>())),
        ]
    })
}

/// JSON values whose leaves are scalars or [`arb_text`] strings.
fn arb_json() -> impl Strategy<Value = Value> {
    arb_tree(prop_oneof![arb_scalar(), arb_text().prop_map(Value::String)].boxed())
}

/// Every string nested inside an object or array, in document order.
fn nested_strings(value: &Value, out: &mut Vec<String>) {
    let children: Vec<&Value> = match value {
        Value::Array(items) => items.iter().collect(),
        Value::Object(map) => map.values().collect(),
        _ => return,
    };
    for child in children {
        match child {
            Value::String(s) => out.push(s.clone()),
            other => nested_strings(other, out),
        }
    }
}

// --- Properties ---

proptest! {
    #[test]
    fn marked_strings_round_trip(value in arb_json()) {
        let mut expected = Vec::new();
        nested_strings(&value, &mut expected);

        let marked = mark_for_replacement(value);
        prop_assert_eq!(marked.markers.len(), expected.len());

        let mut originals: Vec<String> = marked.markers.iter().map(|(_, s)| s.to_string()).collect();
        originals.sort();
        expected.sort();
        prop_assert_eq!(originals, expected);

        for (token, original) in marked.markers.iter() {
            prop_assert_eq!(replace_markers(&token, &marked.markers), original);
        }
    }

    #[test]
    fn rendered_text_shows_every_string_verbatim(value in arb_json()) {
        let mut expected = Vec::new();
        nested_strings(&value, &mut expected);

        let rendered = render_readable(value).unwrap();
        for original in expected {
            let quoted = format!("\"{original}\"");
            prop_assert!(
                rendered.contains(&quoted),
                "missing {:?} in {:?}", quoted, rendered
            );
        }
    }

    #[test]
    fn rendering_without_strings_matches_pretty_print(value in arb_tree(arb_scalar())) {
        let rendered = render_readable(value.clone()).unwrap();
        let reparsed: Value = serde_json::from_str(&rendered).unwrap();
        prop_assert_eq!(reparsed, value);
    }

    #[test]
    fn printed_json_is_always_accepted(value in arb_json()) {
        let text = serde_json::to_string(&value).unwrap();
        match prepare_outbound(&text) {
            Outbound::Json(pretty) => {
                let reparsed: Value = serde_json::from_str(&pretty).unwrap();
                prop_assert_eq!(reparsed, value);
            }
            Outbound::Empty => {}
            Outbound::NotJson { reason } => prop_assert!(false, "rejected: {}", reason),
        }
    }

    #[test]
    fn inbound_formatting_never_panics(text in "\\PC{0,64}") {
        let _ = format_inbound(&text);
    }
}
