use std::sync::Arc;

use pretty_assertions::assert_eq;
use serde_json::json;

use super::support::*;
use crate::path::PathElement;
use crate::schema::{OutputType, ResolvedValue};
use crate::value::{Value, Variables};
use crate::compile;

/// §8 Scenario 2: a non-null leaf field resolving to `null` bubbles past
/// its own non-null object ancestor all the way to the root, since nothing
/// between the violation and the root is nullable.
#[tokio::test]
async fn non_null_violation_bubbles_to_root() {
    let schema: crate::schema::Schema<()> = schema(
        "Query",
        None,
        vec![
            string_leaf(),
            object_type(
                "Query",
                vec![field_def(
                    "a",
                    OutputType::named("A").non_null(),
                    Some(Arc::new(|_p, _a, _c, _i| Ok(ResolvedValue::value(json!({}))))),
                )],
            ),
            object_type(
                "A",
                vec![field_def("b", OutputType::named("String").non_null(), Some(Arc::new(|_p, _a, _c, _i| Ok(ResolvedValue::Value(Value::Null)))))],
            ),
        ],
    );

    let doc = query_doc(vec![field("a", vec![field("b", vec![])])]);
    let plan = compile(Arc::new(schema), doc, None).unwrap();
    let response = plan.run(Value::Null, (), Variables::new()).await;

    assert_eq!(response.data, Value::Null);
    assert_eq!(response.errors.len(), 1);
    assert_eq!(response.errors[0].path, vec![PathElement::Key("a".to_string()), PathElement::Key("b".to_string())]);
    assert!(response.errors[0].message.contains("Cannot return null for non-nullable field A.b"));
}

/// The same violation, but with `a` declared nullable: the null is
/// contained at `a` instead of reaching the root (§4.5).
#[tokio::test]
async fn non_null_violation_stops_at_nearest_nullable_ancestor() {
    let schema: crate::schema::Schema<()> = schema(
        "Query",
        None,
        vec![
            string_leaf(),
            object_type(
                "Query",
                vec![
                    field_def("a", OutputType::named("A"), Some(Arc::new(|_p, _a, _c, _i| Ok(ResolvedValue::value(json!({}))))))
                ],
            ),
            object_type(
                "A",
                vec![field_def("b", OutputType::named("String").non_null(), Some(Arc::new(|_p, _a, _c, _i| Ok(ResolvedValue::Value(Value::Null)))))],
            ),
        ],
    );

    let doc = query_doc(vec![field("a", vec![field("b", vec![])])]);
    let plan = compile(Arc::new(schema), doc, None).unwrap();
    let response = plan.run(Value::Null, (), Variables::new()).await;

    assert_eq!(response.data, json!({"a": null}));
    assert_eq!(response.errors.len(), 1);
}

/// A resolver that itself fails on a non-null field bubbles the same way a
/// null value would.
#[tokio::test]
async fn resolver_error_on_non_null_field_bubbles() {
    let schema: crate::schema::Schema<()> = schema(
        "Query",
        None,
        vec![
            string_leaf(),
            object_type(
                "Query",
                vec![field_def(
                    "greeting",
                    OutputType::named("String").non_null(),
                    Some(Arc::new(|_p, _a, _c, _i| Err(crate::error::FieldError::new("boom")))),
                )],
            ),
        ],
    );

    let doc = query_doc(vec![field("greeting", vec![])]);
    let plan = compile(Arc::new(schema), doc, None).unwrap();
    let response = plan.run(Value::Null, (), Variables::new()).await;

    assert_eq!(response.data, Value::Null);
    assert_eq!(response.errors.len(), 1);
    assert_eq!(response.errors[0].path, vec![PathElement::Key("greeting".to_string())]);
    assert_eq!(response.errors[0].message, "boom");
}
