//! Property tests for the sealing pipeline.
//!
//! The CID must depend on a document's content alone: key order and
//! whitespace never change it, and the structural rules hold for arbitrary
//! keys and depths.

use ldcas_canon::{FormKind, SealConfig, SealError, Sealer, ValidationError, DEFAULT_MAX_DEPTH};
use proptest::prelude::*;
use serde_json::{json, Value};

/// Render an object body from ordered `(key, value)` pairs, with optional padding.
fn render(entries: &[(String, Value)], pad: &str) -> String {
    let body: Vec<String> = entries
        .iter()
        .map(|(k, v)| {
            format!(
                "{pad}{}{pad}:{pad}{}",
                serde_json::to_string(k).unwrap(),
                serde_json::to_string(v).unwrap()
            )
        })
        .collect();
    format!("{{{pad}\"@context\":\"https://schema.org\",{}{pad}}}", body.join(","))
}

fn scalar() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i32>().prop_map(|n| json!(n)),
        "[a-zA-Z0-9 ]{0,16}".prop_map(Value::String),
    ]
}

fn entries() -> impl Strategy<Value = Vec<(String, Value)>> {
    prop::collection::btree_map("[a-z][a-z0-9_]{0,7}", scalar(), 1..10)
        // schema.org aliases these to @id and @type
        .prop_filter("keyword aliases", |map| !map.contains_key("id") && !map.contains_key("type"))
        .prop_map(|map| map.into_iter().collect())
}

fn nested(levels: usize) -> Value {
    let mut inner = json!(1);
    for _ in 0..levels {
        inner = json!({ "n": inner });
    }
    json!({"@context": null, "body": inner})
}

proptest! {
    #[test]
    fn key_order_never_changes_the_cid(entries in entries()) {
        let sealer = Sealer::default();
        let forward = render(&entries, "");
        let mut reversed = entries.clone();
        reversed.reverse();
        let backward = render(&reversed, "");

        let a = sealer.seal(forward.as_bytes()).unwrap();
        let b = sealer.seal(backward.as_bytes()).unwrap();
        prop_assert_eq!(a.cid, b.cid);
        prop_assert_eq!(a.canonical, b.canonical);
    }

    #[test]
    fn whitespace_never_changes_the_cid(entries in entries(), pad in "[ \t\n]{1,3}") {
        let sealer = Sealer::default();
        let compact = sealer.seal(render(&entries, "").as_bytes()).unwrap();
        let padded = sealer.seal(render(&entries, &pad).as_bytes()).unwrap();
        prop_assert_eq!(compact.cid, padded.cid);
    }

    #[test]
    fn blank_node_labels_never_change_the_cid(
        entries in entries(),
        first in "[a-z][a-z0-9]{0,6}",
        second in "[a-z][a-z0-9]{0,6}",
    ) {
        let sealer = Sealer::default();
        let labelled = |label: &str| {
            let mut with_id = entries.clone();
            with_id.push(("@id".to_string(), Value::String(format!("_:{label}"))));
            with_id.push(("zz_fixed".to_string(), json!("present")));
            render(&with_id, "")
        };
        let a = sealer.seal(labelled(&first).as_bytes()).unwrap();
        let b = sealer.seal(labelled(&second).as_bytes()).unwrap();
        prop_assert_eq!(a.cid, b.cid);
    }

    #[test]
    fn sealing_is_repeatable(entries in entries()) {
        let sealer = Sealer::new(SealConfig::plain());
        let raw = render(&entries, "");
        let first = sealer.seal(raw.as_bytes()).unwrap();
        let second = sealer.seal(&first.canonical).unwrap();
        prop_assert_eq!(first.form, FormKind::Plain);
        prop_assert_eq!(first.cid, second.cid);
    }

    #[test]
    fn control_bytes_in_keys_are_rejected(
        prefix in "[a-z]{0,4}",
        byte in (0u8..0x20).prop_filter("tab and newline are allowed", |b| *b != b'\t' && *b != b'\n'),
    ) {
        let key = format!("{prefix}{}", byte as char);
        let doc = json!({"@context": null, "outer": { key: 1 }});
        let err = Sealer::default().seal(doc.to_string().as_bytes()).unwrap_err();
        let is_key_error = matches!(
            err,
            SealError::Invalid(ValidationError::ControlCharacterInKey { .. })
        );
        prop_assert!(is_key_error);
    }

    #[test]
    fn depth_limit_is_exact(levels in 1usize..80) {
        let raw = nested(levels).to_string();
        let result = Sealer::default().seal(raw.as_bytes());
        if levels <= DEFAULT_MAX_DEPTH {
            prop_assert!(result.is_ok());
        } else {
            let too_deep = matches!(result, Err(SealError::Invalid(ValidationError::TooDeep { .. })));
            prop_assert!(too_deep);
        }
    }
}
