use std::sync::{Arc, Mutex};
use std::time::Duration;

use pretty_assertions::assert_eq;
use serde_json::json;

use super::support::*;
use crate::schema::{OutputType, ResolvedValue};
use crate::value::Variables;
use crate::{compile, Response};

type Counter = Arc<Mutex<i32>>;

/// §8 Scenario 5: a mutation's top-level fields run strictly in
/// declaration order, even though `inc` defers through a future and `snap`
/// does not - the next top-level field is never scheduled until the
/// previous one's whole subtree has settled (§4.6 "Serial executor").
#[tokio::test]
async fn mutation_top_level_fields_run_in_declaration_order() {
    let schema: crate::schema::Schema<Counter> = schema(
        "Query",
        Some("Mutation"),
        vec![
            int_leaf(),
            object_type("Query", vec![]),
            object_type(
                "Mutation",
                vec![
                    field_def(
                        "inc",
                        OutputType::named("Int"),
                        Some(Arc::new(|_p, _a, counter, _i| {
                            let counter = Arc::clone(counter);
                            Ok(ResolvedValue::Pending(Box::pin(async move {
                                tokio::time::sleep(Duration::from_millis(5)).await;
                                let mut guard = counter.lock().unwrap();
                                *guard += 1;
                                Ok(crate::value::Value::from(*guard))
                            })))
                        })),
                    ),
                    field_def("snap", OutputType::named("Int"), Some(Arc::new(|_p, _a, counter, _i| Ok(ResolvedValue::value(*counter.lock().unwrap()))))),
                ],
            ),
        ],
    );

    let doc = mutation_doc(vec![
        aliased_field(Some("a"), "inc", vec![], vec![]),
        aliased_field(Some("b"), "snap", vec![], vec![]),
        aliased_field(Some("c"), "inc", vec![], vec![]),
        aliased_field(Some("d"), "snap", vec![], vec![]),
    ]);

    let plan = compile(Arc::new(schema), doc, None).unwrap();
    let counter: Counter = Arc::new(Mutex::new(0));
    let Response { data, errors } = plan.run(crate::value::Value::Null, counter, Variables::new()).await;

    assert!(errors.is_empty());
    assert_eq!(data, json!({"a": 1, "b": 1, "c": 2, "d": 2}));
}
