use std::sync::Arc;

use pretty_assertions::assert_eq;

use super::support::*;
use crate::error::CompileError;
use crate::{compile, ast::{Definition, Operation, OperationType}};
use crate::parser::Spanning;

fn empty_query_schema() -> crate::schema::Schema<()> {
    schema("Query", None, vec![object_type::<()>("Query", vec![])])
}

fn named_operation(name: &str) -> Definition {
    Definition::Operation(Spanning::unlocated(Operation {
        operation_type: OperationType::Query,
        name: Some(name.to_string()),
        variable_definitions: Vec::new(),
        selection_set: Vec::new(),
    }))
}

/// §7 "No operation": an empty document has nothing to select.
#[test]
fn no_operation_in_document_is_a_compile_error() {
    let doc: Arc<[Definition]> = vec![].into();
    let err = compile(Arc::new(empty_query_schema()), doc, None).unwrap_err();
    assert_eq!(err, CompileError::NoOperation);
}

/// §7 "Ambiguous operations": more than one operation with no
/// `operationName` to disambiguate.
#[test]
fn multiple_operations_without_a_name_is_ambiguous() {
    let doc: Arc<[Definition]> = vec![named_operation("One"), named_operation("Two")].into();
    let err = compile(Arc::new(empty_query_schema()), doc, None).unwrap_err();
    assert_eq!(err, CompileError::AmbiguousOperation);
}

/// §7 "Unknown operation": `operationName` names no operation in the
/// document.
#[test]
fn unknown_operation_name_is_a_compile_error() {
    let doc: Arc<[Definition]> = vec![named_operation("One")].into();
    let err = compile(Arc::new(empty_query_schema()), doc, Some("Missing")).unwrap_err();
    assert_eq!(err, CompileError::UnknownOperation("Missing".to_string()));
}

/// A single unnamed operation compiles fine with no `operationName` given.
#[test]
fn single_operation_needs_no_name() {
    let doc: Arc<[Definition]> = vec![Definition::Operation(Spanning::unlocated(Operation {
        operation_type: OperationType::Query,
        name: None,
        variable_definitions: Vec::new(),
        selection_set: Vec::new(),
    }))]
    .into();
    assert!(compile(Arc::new(empty_query_schema()), doc, None).is_ok());
}
