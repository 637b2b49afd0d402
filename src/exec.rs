//! The executor runtimes (§4.6) and null trimmer (§4.5): walks a compiled
//! plan tree against a root value, a context, and a set of variables,
//! producing a materialized result tree plus the errors collected along
//! the way.
//!
//! There is no stack-based bubbling here. An async resolver can still be
//! in flight for field `a` when field `b`'s subtree has already finished
//! and "returned" its slot in the parent object; by the time `a`'s
//! non-null violation is discovered, there is nothing left on a call stack
//! to unwind. So every violation is recorded as a standalone fact - the
//! path it occurred at, and the nearest ancestor position still allowed to
//! be null - and the whole tree is trimmed once, after every field has
//! settled (§4.5).

use std::sync::Mutex;

use futures::future::{BoxFuture, join_all};

use crate::ast;
use crate::error::{ErrorObject, ExecutionError, SourceLocation};
use crate::path::{PathElement, ResponsePath};
use crate::plan::{self, AbstractPlan, FieldSlot, ObjectPlan, PlanNode, ResolverPlan, TypedPlan};
use crate::schema::{ResolveInfo, ResolvedValue, Schema};
use crate::value::{Object, Value, Variables};
use crate::CompileOptions;

/// Whether an operation's top-level fields resolve independently (query,
/// subscription) or strictly in declaration order (mutation) (§4.6).
#[derive(Clone, Copy, PartialEq, Eq)]
pub(crate) enum Concurrency {
    Parallel,
    Serial,
}

/// One recorded non-null violation, carrying the chain of ancestor
/// positions (path, is-this-position-nullable) it was captured under. The
/// trimmer walks this chain backwards to find where the null actually has
/// to land (§4.5).
struct NullBubble {
    error: ExecutionError,
    ancestors: Vec<(ResponsePath, bool)>,
}

/// Per-run state threaded through the whole interpretation: read-only
/// inputs, plus the two error sinks a violation can land in (§7 "contained"
/// vs "propagating").
struct ExecCx<'a, C> {
    schema: &'a Schema<C>,
    operation: &'a ast::Operation,
    fragments: &'a ast::Fragments<'a>,
    root_value: &'a Value,
    variables: &'a Variables,
    context: &'a C,
    options: &'a CompileOptions,
    errors: Mutex<Vec<ExecutionError>>,
    null_errors: Mutex<Vec<NullBubble>>,
}

/// The path/ancestor-chain/location bookkeeping threaded alongside each
/// recursive step.
#[derive(Clone)]
struct Frame {
    path: ResponsePath,
    ancestors: Vec<(ResponsePath, bool)>,
    locations: Vec<SourceLocation>,
}

impl Frame {
    fn root() -> Self {
        Self { path: ResponsePath::root(), ancestors: vec![(ResponsePath::root(), true)], locations: Vec::new() }
    }

    fn enter_field(&self, key: &str, nullable: bool, locations: Vec<SourceLocation>) -> Self {
        let path = self.path.field(key);
        let mut ancestors = self.ancestors.clone();
        ancestors.push((path.clone(), nullable));
        Self { path, ancestors, locations }
    }

    fn enter_index(&self, index: usize, nullable: bool) -> Self {
        let path = self.path.index(index);
        let mut ancestors = self.ancestors.clone();
        ancestors.push((path.clone(), nullable));
        Self { path, ancestors, locations: self.locations.clone() }
    }
}

/// Records a violation and returns the `Null` to place at its slot. When
/// `nullable` is true the value is simply replaced in place (a "contained"
/// error, §7); when false the violation is queued for the trimmer to bubble
/// to the nearest nullable ancestor.
fn fail<C>(cx: &ExecCx<'_, C>, nullable: bool, message: String, frame: &Frame) -> Value {
    let error = ExecutionError::at(message, frame.locations.clone(), frame.path.clone());
    if nullable {
        cx.errors.lock().unwrap().push(error);
    } else {
        cx.null_errors.lock().unwrap().push(NullBubble { error, ancestors: frame.ancestors.clone() });
    }
    Value::Null
}

/// Runs a compiled root object (query or mutation selection) to completion
/// and returns the final `(data, errors)` pair, after trimming (§4.5).
pub(crate) async fn run<C: Send + Sync + 'static>(
    schema: &Schema<C>,
    operation: &ast::Operation,
    fragments: &ast::Fragments<'_>,
    root: &ObjectPlan<C>,
    root_value: Value,
    context: C,
    variables: Variables,
    options: &CompileOptions,
    concurrency: Concurrency,
) -> (Value, Vec<ErrorObject>) {
    let cx = ExecCx {
        schema,
        operation,
        fragments,
        root_value: &root_value,
        variables: &variables,
        context: &context,
        options,
        errors: Mutex::new(Vec::new()),
        null_errors: Mutex::new(Vec::new()),
    };
    let data = run_object(&cx, root, &root_value, Frame::root(), concurrency).await;
    let errors = cx.errors.into_inner().unwrap();
    let null_errors = cx.null_errors.into_inner().unwrap();
    trim(data, null_errors, errors)
}

/// Applies every recorded non-null violation to the materialized tree,
/// nulling the nearest ancestor slot still allowed to be null, then
/// flattens both error sinks into the wire error list (§4.5, §6).
fn trim(mut data: Value, null_errors: Vec<NullBubble>, errors: Vec<ExecutionError>) -> (Value, Vec<ErrorObject>) {
    for bubble in &null_errors {
        let anchor = bubble.ancestors.iter().rev().find(|(_, nullable)| *nullable).map(|(path, _)| path.clone()).unwrap_or_else(ResponsePath::root);
        set_at_path(&mut data, &anchor.to_vec(), Value::Null);
    }

    let mut out: Vec<ErrorObject> = errors.into_iter().map(ExecutionError::into_object).collect();
    out.extend(null_errors.into_iter().map(|b| b.error.into_object()));
    (data, out)
}

/// Sets the value at `path` to `new_value`, silently doing nothing if the
/// path no longer resolves to a container (an earlier, shallower trim
/// already replaced it with `Null`).
fn set_at_path(data: &mut Value, path: &[PathElement], new_value: Value) {
    if path.is_empty() {
        *data = new_value;
        return;
    }
    let mut current = data;
    for segment in &path[..path.len() - 1] {
        let next = match (segment, &mut *current) {
            (PathElement::Key(k), Value::Object(m)) => m.get_mut(k),
            (PathElement::Index(i), Value::Array(a)) => a.get_mut(*i),
            _ => None,
        };
        match next {
            Some(n) => current = n,
            None => return,
        }
    }
    match (&path[path.len() - 1], &mut *current) {
        (PathElement::Key(k), Value::Object(m)) => {
            m.insert(k.clone(), new_value);
        }
        (PathElement::Index(i), Value::Array(a)) => {
            if let Some(slot) = a.get_mut(*i) {
                *slot = new_value;
            }
        }
        _ => {}
    }
}

fn run_object<'a, C: Send + Sync + 'static>(cx: &'a ExecCx<'a, C>, object: &'a ObjectPlan<C>, value: &'a Value, frame: Frame, concurrency: Concurrency) -> BoxFuture<'a, Value> {
    Box::pin(async move {
        match concurrency {
            Concurrency::Parallel => {
                let results = join_all(object.fields.iter().map(|slot| run_object_field(cx, &object.type_name, slot, value, &frame))).await;
                let mut map = Object::new();
                for (slot, v) in object.fields.iter().zip(results) {
                    map.insert(slot.response_key.clone(), v);
                }
                Value::Object(map)
            }
            Concurrency::Serial => {
                let mut map = Object::new();
                for slot in &object.fields {
                    let v = run_object_field(cx, &object.type_name, slot, value, &frame).await;
                    map.insert(slot.response_key.clone(), v);
                }
                Value::Object(map)
            }
        }
    })
}

async fn run_object_field<'a, C: Send + Sync + 'static>(cx: &'a ExecCx<'a, C>, parent_type: &str, slot: &'a FieldSlot<C>, parent_value: &Value, frame: &Frame) -> Value {
    let child_frame = frame.enter_field(&slot.response_key, slot.plan.nullable, slot.locations.clone());

    if let PlanNode::Resolver(resolver) = &slot.plan.node {
        return run_resolver(cx, parent_type, &slot.field_name, resolver, slot.plan.nullable, parent_value, child_frame).await;
    }

    let value = parent_value.get(&slot.field_name).cloned().unwrap_or(Value::Null);
    run_field_value(cx, &slot.plan, parent_type, &slot.field_name, value, child_frame).await
}

/// Applies a field's own null check, then interprets its plan node if the
/// value is present. Shared by inline (default-resolved) fields, resolved
/// fields, and `__typename`-adjacent recursion into list elements of
/// resolver output (§4.1, §4.6).
fn run_field_value<'a, C: Send + Sync + 'static>(cx: &'a ExecCx<'a, C>, plan: &'a TypedPlan<C>, parent_type: &'a str, field_name: &'a str, value: Value, frame: Frame) -> BoxFuture<'a, Value> {
    Box::pin(async move {
        if value.is_null() {
            if plan.nullable {
                return Value::Null;
            }
            return fail(cx, false, format!("Cannot return null for non-nullable field {parent_type}.{field_name}"), &frame);
        }
        run_node(cx, &plan.node, plan.nullable, value, frame).await
    })
}

fn run_node<'a, C: Send + Sync + 'static>(cx: &'a ExecCx<'a, C>, node: &'a PlanNode<C>, nullable: bool, value: Value, frame: Frame) -> BoxFuture<'a, Value> {
    Box::pin(async move {
        match node {
            PlanNode::TypeName(name) => Value::String(name.clone()),
            PlanNode::Leaf(leaf) => {
                if cx.options.disable_leaf_serialization && leaf.builtin {
                    value
                } else {
                    match (leaf.serialize)(&value) {
                        Ok(v) => v,
                        Err(message) => fail(cx, nullable, message, &frame),
                    }
                }
            }
            PlanNode::Object(object) => run_object(cx, object, &value, frame, Concurrency::Parallel).await,
            PlanNode::List(element) => run_list(cx, element, nullable, value, frame).await,
            PlanNode::Abstract(abstract_plan) => run_abstract(cx, abstract_plan, nullable, &value, frame).await,
            // A resolver only ever occupies a field slot; `run_object_field`
            // intercepts it before reaching here.
            PlanNode::Resolver(_) => unreachable!("a Resolver node is only ever a field's own plan node"),
        }
    })
}

async fn run_list<'a, C: Send + Sync + 'static>(cx: &'a ExecCx<'a, C>, element: &'a TypedPlan<C>, nullable: bool, value: Value, frame: Frame) -> Value {
    let Value::Array(items) = value else {
        // Strings are JSON-iterable in some languages but are rejected here
        // deliberately (§4.4 "non-iterable values, including strings").
        return fail(cx, nullable, "Expected Iterable, but did not find one".to_string(), &frame);
    };
    let futures = items.into_iter().enumerate().map(|(index, item)| {
        let child_frame = frame.enter_index(index, element.nullable);
        run_list_element(cx, element, item, child_frame)
    });
    Value::Array(join_all(futures).await)
}

fn run_list_element<'a, C: Send + Sync + 'static>(cx: &'a ExecCx<'a, C>, element: &'a TypedPlan<C>, value: Value, frame: Frame) -> BoxFuture<'a, Value> {
    Box::pin(async move {
        if value.is_null() {
            if element.nullable {
                return Value::Null;
            }
            return fail(cx, false, "Cannot return null for non-nullable list element".to_string(), &frame);
        }
        run_node(cx, &element.node, element.nullable, value, frame).await
    })
}

async fn run_abstract<'a, C: Send + Sync + 'static>(cx: &'a ExecCx<'a, C>, abstract_plan: &'a AbstractPlan<C>, nullable: bool, value: &Value, frame: Frame) -> Value {
    match resolve_concrete_type(cx, abstract_plan, value) {
        Some(type_name) => match abstract_plan.branches.get(&type_name) {
            Some(branch) => run_node(cx, &branch.node, branch.nullable, value.clone(), frame).await,
            None => fail(
                cx,
                nullable,
                format!("Runtime Object type \"{type_name}\" is not a possible type for \"{}\"", abstract_plan.type_name),
                &frame,
            ),
        },
        None => fail(
            cx,
            nullable,
            format!("Abstract type \"{}\" must resolve to an Object type at runtime", abstract_plan.type_name),
            &frame,
        ),
    }
}

/// Dispatches a concrete type for an abstract-typed value (§4.3): an
/// explicit resolver first, then `__typename` duck-typing, then a linear
/// `isTypeOf` scan. `isTypeOf` is synchronous by construction here, so the
/// "asynchronous type resolution is unsupported" constraint the original
/// engine checks at run time is instead enforced by the type system.
fn resolve_concrete_type<C>(cx: &ExecCx<'_, C>, abstract_plan: &AbstractPlan<C>, value: &Value) -> Option<String> {
    if let Some(resolve_type) = &abstract_plan.resolve_type {
        if let Some(name) = resolve_type(value, cx.context) {
            return Some(name);
        }
    }
    if let Some(name) = value.get("__typename").and_then(Value::as_str) {
        if !name.is_empty() {
            return Some(name.to_string());
        }
    }
    for possible_type in &abstract_plan.possible_types {
        if let Some(is_type_of) = abstract_plan.is_type_of.get(possible_type) {
            if is_type_of(value, cx.context) {
                return Some(possible_type.clone());
            }
        }
    }
    None
}

async fn run_resolver<'a, C: Send + Sync + 'static>(
    cx: &'a ExecCx<'a, C>,
    parent_type: &'a str,
    field_name: &'a str,
    resolver: &'a ResolverPlan<C>,
    nullable: bool,
    parent_value: &Value,
    frame: Frame,
) -> Value {
    let arguments = plan::bind_argument_values(&resolver.arguments, cx.variables);
    let info = ResolveInfo {
        field_name,
        field_nodes: &resolver.field_nodes,
        return_type: &resolver.return_type,
        parent_type,
        path: &frame.path,
        schema: cx.schema,
        operation: cx.operation,
        fragments: cx.fragments,
        root_value: cx.root_value,
        variable_values: cx.variables,
    };

    let resolved = match (resolver.resolve)(parent_value, arguments, cx.context, info) {
        Ok(r) => r,
        Err(e) => return fail(cx, nullable, e.message().to_string(), &frame),
    };

    let value = match resolved {
        // A resolver that itself returns a list of maybe-future, maybe-failed
        // elements is adapted here, with one level of per-element error
        // attribution (§4.6 "the list itself never fails catastrophically").
        // Deeper nesting falls back to `materialize_scalar`'s best-effort
        // flattening, since a second list layer has no field/type context of
        // its own to attribute an error against.
        ResolvedValue::List(items) => {
            let element_nullable = match &resolver.sub_plan.node {
                PlanNode::List(element) => element.nullable,
                _ => true,
            };
            let futures = items.into_iter().enumerate().map(|(index, item)| {
                let child_frame = frame.enter_index(index, element_nullable);
                async move {
                    match materialize_scalar(item).await {
                        Ok(v) => v,
                        Err(e) => fail(cx, element_nullable, e.message().to_string(), &child_frame),
                    }
                }
            });
            Value::Array(join_all(futures).await)
        }
        other => match materialize_scalar(other).await {
            Ok(v) => v,
            Err(e) => return fail(cx, nullable, e.message().to_string(), &frame),
        },
    };

    run_field_value(cx, &resolver.sub_plan, parent_type, field_name, value, frame).await
}

/// The value-or-future adapter (§4.6): flattens a resolver's `Value`,
/// `Err`, `Pending`, or (one level of) `List` into a plain awaited result.
fn materialize_scalar(resolved: ResolvedValue) -> BoxFuture<'static, Result<Value, crate::error::FieldError>> {
    Box::pin(async move {
        match resolved {
            ResolvedValue::Value(v) => Ok(v),
            ResolvedValue::Err(e) => Err(e),
            ResolvedValue::Pending(fut) => fut.await,
            ResolvedValue::List(items) => {
                let materialized = join_all(items.into_iter().map(materialize_scalar)).await;
                Ok(Value::Array(materialized.into_iter().map(|r| r.unwrap_or(Value::Null)).collect()))
            }
        }
    })
}
