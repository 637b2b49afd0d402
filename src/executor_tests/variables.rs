use std::sync::Arc;

use pretty_assertions::assert_eq;
use serde_json::json;

use super::support::*;
use crate::schema::{OutputType, ResolvedValue};
use crate::value::{Value, Variables};
use crate::compile;

fn greet_schema() -> crate::schema::Schema<()> {
    schema(
        "Query",
        None,
        vec![
            string_leaf(),
            object_type(
                "Query",
                vec![field_def_with_args(
                    "greet",
                    OutputType::named("String"),
                    vec![("name", Some(Value::String("anon".to_string())))],
                    Some(Arc::new(|_p, args, _c, _i| {
                        let name = args.get("name").and_then(Value::as_str).unwrap_or("anon");
                        Ok(ResolvedValue::value(name))
                    })),
                )],
            ),
        ],
    )
}

/// §8 Scenario 6: a variable missing from `variables`, with no value
/// provided, falls back to the argument's declared default rather than
/// resolving to an explicit `null` (§4.2 "Argument binding").
#[tokio::test]
async fn missing_variable_falls_back_to_argument_default() {
    let doc = query_doc(vec![field_with_args("greet", vec![variable_arg("name", "n")], vec![])]);
    let plan = compile(Arc::new(greet_schema()), doc, None).unwrap();
    let response = plan.run(Value::Null, (), Variables::new()).await;

    assert_eq!(response.data, json!({"greet": "anon"}));
}

/// An argument omitted from the query text altogether still receives its
/// schema-declared default - this resolver doesn't duplicate the default
/// itself, so the assertion only passes if the binding layer supplied it
/// (§4.2 "Argument binding").
#[tokio::test]
async fn omitted_argument_receives_schema_default() {
    let schema = schema(
        "Query",
        None,
        vec![
            string_leaf(),
            object_type(
                "Query",
                vec![field_def_with_args(
                    "greet",
                    OutputType::named("String"),
                    vec![("name", Some(Value::String("anon".to_string())))],
                    Some(Arc::new(|_p, args, _c, _i| match args.get("name").and_then(Value::as_str) {
                        Some(name) => Ok(ResolvedValue::value(name)),
                        None => Ok(ResolvedValue::Err("greet called with no name argument bound".into())),
                    })),
                )],
            ),
        ],
    );

    let doc = query_doc(vec![field("greet", vec![])]);
    let plan = compile(Arc::new(schema), doc, None).unwrap();
    let response = plan.run(Value::Null, (), Variables::new()).await;

    assert_eq!(response.data, json!({"greet": "anon"}));
    assert!(response.errors.is_empty());
}

/// The same query, with the variable actually bound, uses the bound value
/// instead of the default.
#[tokio::test]
async fn present_variable_overrides_default() {
    let doc = query_doc(vec![field_with_args("greet", vec![variable_arg("name", "n")], vec![])]);
    let plan = compile(Arc::new(greet_schema()), doc, None).unwrap();

    let mut variables = Variables::new();
    variables.insert("n".to_string(), Value::String("hi".to_string()));
    let response = plan.run(Value::Null, (), variables).await;

    assert_eq!(response.data, json!({"greet": "hi"}));
}

/// A literal (non-variable) argument value is bound once at compile time
/// and needs no variable lookup at all.
#[tokio::test]
async fn static_argument_literal_ignores_variables() {
    let doc = query_doc(vec![field_with_args(
        "greet",
        vec![crate::ast::Argument { name: "name".to_string(), value: crate::parser::Spanning::unlocated(crate::ast::InputValue::String("literal".to_string())) }],
        vec![],
    )]);
    let plan = compile(Arc::new(greet_schema()), doc, None).unwrap();
    let response = plan.run(Value::Null, (), Variables::new()).await;

    assert_eq!(response.data, json!({"greet": "literal"}));
}

/// A list literal containing a nested variable reference is a `Composite`
/// binding, re-substituted against `variables` on every run rather than
/// bound once at compile time (§4.2).
#[tokio::test]
async fn composite_list_argument_substitutes_nested_variable() {
    let schema: crate::schema::Schema<()> = schema(
        "Query",
        None,
        vec![
            string_leaf(),
            object_type(
                "Query",
                vec![field_def_with_args(
                    "join",
                    OutputType::named("String"),
                    vec![("parts", None)],
                    Some(Arc::new(|_p, args, _c, _i| {
                        let parts = args
                            .get("parts")
                            .and_then(Value::as_array)
                            .map(|items| items.iter().filter_map(Value::as_str).collect::<Vec<_>>().join(","))
                            .unwrap_or_default();
                        Ok(ResolvedValue::value(parts))
                    })),
                )],
            ),
        ],
    );

    let list_literal = crate::ast::InputValue::List(vec![crate::ast::InputValue::String("a".to_string()), crate::ast::InputValue::Variable("b".to_string())]);
    let doc = query_doc(vec![field_with_args(
        "join",
        vec![crate::ast::Argument { name: "parts".to_string(), value: crate::parser::Spanning::unlocated(list_literal) }],
        vec![],
    )]);

    let plan = compile(Arc::new(schema), doc, None).unwrap();
    let mut variables = Variables::new();
    variables.insert("b".to_string(), Value::String("b".to_string()));
    let response = plan.run(Value::Null, (), variables).await;

    assert_eq!(response.data, json!({"join": "a,b"}));
}
