//! Plan builder (§4.1): compiles a selected operation, against a schema
//! view, into a tree of [`PlanNode`]s that the executor (`exec.rs`) walks
//! without ever looking at the AST again.
//!
//! This is the piece a code-generating engine would instead turn into Rust
//! source and hand to `rustc`; here it stays data, and `exec.rs` is the
//! interpreter for it. §9 explicitly licenses that trade for a systems
//! language with a fast match-based dispatch.

use std::sync::Arc;

use fnv::FnvHashSet;
use indexmap::IndexMap;

use crate::ast::{self, Definition, Directive, Document, Field, Fragments, Selection};
use crate::error::{CompileError, SourceLocation};
use crate::parser::Spanning;
use crate::schema::{ArgumentDef, FieldDef, IsTypeOfFn, NamedType, OutputType, ResolveFn, ResolveTypeFn, Schema};
use crate::value::{Object, Value};

/// A plan node paired with the nullability policy governing its slot (§3:
/// "Non-Null is not its own variant; it is carried as a flag").
pub struct TypedPlan<C> {
    pub nullable: bool,
    pub node: PlanNode<C>,
}

/// One node of a compiled plan tree (§3 "Plan node").
pub enum PlanNode<C> {
    /// A scalar or enum: serialize the incoming value and stop.
    Leaf(LeafPlan),
    /// An object with a known concrete type: one slot per selected field.
    Object(ObjectPlan<C>),
    /// A list: one `TypedPlan` shared by every element.
    List(Box<TypedPlan<C>>),
    /// An interface or union: dispatched to one of several object branches
    /// at run time.
    Abstract(AbstractPlan<C>),
    /// A field whose value is produced by calling into user code, possibly
    /// asynchronously, rather than by direct property access (§4.2).
    Resolver(Box<ResolverPlan<C>>),
    /// The meta-field `__typename`: the enclosing concrete type's name,
    /// independent of the parent value.
    TypeName(String),
}

pub struct LeafPlan {
    pub serialize: crate::schema::SerializeFn,
    pub builtin: bool,
}

/// A compiled object: an ordered list of field slots, each keyed by its
/// response key (alias or name).
pub struct ObjectPlan<C> {
    pub type_name: String,
    pub fields: Vec<FieldSlot<C>>,
}

/// One selected field of an [`ObjectPlan`].
pub struct FieldSlot<C> {
    pub response_key: String,
    pub field_name: String,
    pub locations: Vec<SourceLocation>,
    pub plan: TypedPlan<C>,
}

/// A compiled abstract-type dispatch (§4.3): one object branch compiled per
/// possible type, selected at run time by resolver, `__typename`, or
/// `isTypeOf`.
pub struct AbstractPlan<C> {
    pub type_name: String,
    pub possible_types: Vec<String>,
    pub resolve_type: Option<ResolveTypeFn<C>>,
    pub is_type_of: IndexMap<String, IsTypeOfFn<C>>,
    pub branches: IndexMap<String, TypedPlan<C>>,
}

/// A field resolved by calling into user code (§4.2).
pub struct ResolverPlan<C> {
    pub arguments: Vec<(String, ArgBinding)>,
    pub resolve: ResolveFn<C>,
    pub return_type: OutputType,
    pub sub_plan: TypedPlan<C>,
    /// The field nodes selecting this field, merged across every fragment
    /// spread or inline fragment that contributed one (§4.2 "Resolve-info"
    /// `fieldNodes`).
    pub field_nodes: Vec<Spanning<Field>>,
}

/// How one argument's value is produced at run time (§4.2 "Argument
/// binding").
#[derive(Clone, Debug)]
pub enum ArgBinding {
    /// No variable reference anywhere in the literal: bind once, here.
    Static(Value),
    /// A bare `$variable` reference, with the field argument's own default
    /// used when the variable is absent.
    Variable { variable: String, default: Option<Value> },
    /// A list or input-object literal containing at least one nested
    /// variable reference: re-substituted against `variables` on every run.
    Composite(ast::InputValue),
}

struct Compiler<'a, C> {
    schema: &'a Schema<C>,
    fragments: &'a Fragments<'a>,
}

/// Selects the operation to compile (§4.1 step 1), collects its fragments,
/// and compiles its selection set into an [`ObjectPlan`] rooted at the
/// schema's query or mutation type.
///
/// Top-level fields are always given a [`PlanNode::Resolver`] slot, even
/// when the field has no explicit resolver, so that every top-level field
/// is scheduled through the same deferred path uniformly (§4.1 "forced
/// deferral").
pub(crate) fn build<C>(
    schema: &Schema<C>,
    document: &Document,
    operation_name: Option<&str>,
) -> Result<(usize, ObjectPlan<C>, bool), CompileError> {
    let (operation_index, operation) = select_operation(document, operation_name)?;
    let fragments = ast::collect_fragments(document);
    let is_mutation = operation.operation_type == ast::OperationType::Mutation;
    let root_type_name = if is_mutation {
        schema
            .mutation_type
            .as_deref()
            .ok_or(CompileError::UnknownOperation("mutation".to_string()))?
    } else {
        schema.query_type.as_str()
    };

    let cx = Compiler { schema, fragments: &fragments };
    let root = compile_object(&cx, root_type_name, &operation.selection_set, true);
    Ok((operation_index, root, is_mutation))
}

fn select_operation(document: &Document, operation_name: Option<&str>) -> Result<(usize, &ast::Operation), CompileError> {
    let operations: Vec<(usize, &ast::Operation)> = document
        .iter()
        .enumerate()
        .filter_map(|(i, def)| match def {
            Definition::Operation(op) => Some((i, &op.item)),
            Definition::Fragment(_) => None,
        })
        .collect();

    match operation_name {
        Some(name) => operations
            .into_iter()
            .find(|(_, op)| op.name.as_deref() == Some(name))
            .ok_or_else(|| CompileError::UnknownOperation(name.to_string())),
        None => match operations.len() {
            0 => Err(CompileError::NoOperation),
            1 => Ok(operations[0]),
            _ => Err(CompileError::AmbiguousOperation),
        },
    }
}

/// Collects the fields (and fields reached through fragments) selected
/// against `parent_type`, merging same-response-key entries in selection
/// order (§4.1 "Field collection").
fn collect_fields<'a, C>(
    cx: &Compiler<'a, C>,
    selection_set: &'a [Selection],
    parent_type: &str,
    visited_fragments: &mut FnvHashSet<&'a str>,
    out: &mut IndexMap<String, Vec<&'a Spanning<Field>>>,
) {
    for selection in selection_set {
        match selection {
            Selection::Field(f) => {
                if f.item.directives.iter().any(Directive::statically_excludes) {
                    continue;
                }
                out.entry(f.item.response_key().to_string()).or_default().push(f);
            }
            Selection::FragmentSpread(spread) => {
                if spread.item.directives.iter().any(Directive::statically_excludes) {
                    continue;
                }
                if !visited_fragments.insert(spread.item.name.as_str()) {
                    continue;
                }
                let Some(fragment) = cx.fragments.get(spread.item.name.as_str()) else {
                    continue;
                };
                if !type_condition_applies(cx.schema, &fragment.type_condition, parent_type) {
                    continue;
                }
                collect_fields(cx, &fragment.selection_set, parent_type, visited_fragments, out);
            }
            Selection::InlineFragment(inline) => {
                if inline.item.directives.iter().any(Directive::statically_excludes) {
                    continue;
                }
                if let Some(condition) = &inline.item.type_condition {
                    if !type_condition_applies(cx.schema, condition, parent_type) {
                        continue;
                    }
                }
                collect_fields(cx, &inline.item.selection_set, parent_type, visited_fragments, out);
            }
        }
    }
}

/// Whether a fragment's type condition admits `object_type_name`: either the
/// condition names that exact object, or it names an abstract type the
/// object is a possible type of.
///
/// Schema construction is external (§1 Non-goal); this assumes, as most
/// schema builders do, that an implementing object's `fields` already
/// include every field declared by the interfaces it implements.
fn type_condition_applies<C>(schema: &Schema<C>, condition: &str, object_type_name: &str) -> bool {
    if condition == object_type_name {
        return true;
    }
    matches!(
        schema.named_type(condition),
        Some(NamedType::Abstract(a)) if a.possible_types.iter().any(|t| t == object_type_name)
    )
}

/// Concatenates the selection sets of every field node sharing a response
/// key, preserving source order. Full same-response-key merge validation is
/// external (§1); this only needs enough to recurse into the union of what
/// was selected.
fn merged_selection_set(nodes: &[&Spanning<Field>]) -> Vec<Selection> {
    nodes.iter().flat_map(|f| f.item.selection_set.clone()).collect()
}

fn locations_of(nodes: &[&Spanning<Field>]) -> Vec<SourceLocation> {
    nodes.iter().map(|f| SourceLocation::from(*f.start())).collect()
}

/// Compiles the fields selected against a concrete object type (§4.1
/// "Object compilation").
///
/// `force_resolver` is only ever `true` for an operation's root selection
/// set: every top-level field gets a [`PlanNode::Resolver`] slot even
/// without its own declared resolver, so the deferred path schedules it
/// uniformly (§4.1).
fn compile_object<C>(cx: &Compiler<'_, C>, object_type_name: &str, selection_set: &[Selection], force_resolver: bool) -> ObjectPlan<C> {
    let mut collected = IndexMap::new();
    collect_fields(cx, selection_set, object_type_name, &mut FnvHashSet::default(), &mut collected);

    let object_type = cx
        .schema
        .object(object_type_name)
        .unwrap_or_else(|| panic!("schema is missing object type {object_type_name:?} reached by a compiled selection"));

    let mut fields = Vec::with_capacity(collected.len());
    for (response_key, nodes) in collected {
        let field_name = nodes[0].item.name.clone();
        let locations = locations_of(&nodes);

        if field_name == "__typename" {
            fields.push(FieldSlot {
                response_key,
                field_name,
                locations,
                plan: TypedPlan { nullable: false, node: PlanNode::TypeName(object_type_name.to_string()) },
            });
            continue;
        }

        let Some(field_def) = object_type.fields.get(&field_name) else {
            // Unknown field against this concrete type: validation is out
            // of scope (§1), so we simply have nothing to compile here.
            continue;
        };

        let plan = compile_field(cx, field_def, &nodes, force_resolver);
        fields.push(FieldSlot { response_key, field_name, locations, plan });
    }

    ObjectPlan { type_name: object_type_name.to_string(), fields }
}

fn compile_field<C>(cx: &Compiler<'_, C>, field_def: &FieldDef<C>, nodes: &[&Spanning<Field>], force_resolver: bool) -> TypedPlan<C> {
    let merged_selection = merged_selection_set(nodes);
    let sub_plan = compile_type(cx, &field_def.output_type, &merged_selection);

    let deferred = force_resolver || field_def.resolve.is_some();
    if !deferred {
        return sub_plan;
    }

    let resolve = field_def
        .resolve
        .clone()
        .unwrap_or_else(|| default_property_resolver(field_def.name.clone()));
    let arguments = bind_arguments(&nodes[0].item.arguments, &field_def.arguments);
    let field_nodes = nodes.iter().map(|n| (*n).clone()).collect();
    let nullable = sub_plan.nullable;
    TypedPlan {
        nullable,
        node: PlanNode::Resolver(Box::new(ResolverPlan {
            arguments,
            resolve,
            return_type: field_def.output_type.clone(),
            sub_plan,
            field_nodes,
        })),
    }
}

/// Compiles one output type reference, peeling `NonNull`/`List` wrappers
/// until a named type is reached (§4.1 "compileType"). `selection_set` is
/// the field's own (merged) selection; it only matters once a named Object
/// or Abstract type is reached, since wrapper layers don't change it.
fn compile_type<C>(cx: &Compiler<'_, C>, output_type: &OutputType, selection_set: &[Selection]) -> TypedPlan<C> {
    match output_type {
        OutputType::NonNull(inner) => {
            let mut plan = compile_type(cx, inner, selection_set);
            plan.nullable = false;
            plan
        }
        OutputType::List(inner) => {
            let element = compile_type(cx, inner, selection_set);
            TypedPlan { nullable: true, node: PlanNode::List(Box::new(element)) }
        }
        OutputType::Named(name) => match cx.schema.named_type(name) {
            Some(NamedType::Leaf(leaf)) => TypedPlan {
                nullable: true,
                node: PlanNode::Leaf(LeafPlan { serialize: leaf.serialize.clone(), builtin: leaf.builtin }),
            },
            Some(NamedType::Object(obj)) => TypedPlan {
                nullable: true,
                node: PlanNode::Object(compile_object(cx, &obj.name, selection_set, false)),
            },
            Some(NamedType::Abstract(abstract_type)) => TypedPlan {
                nullable: true,
                node: compile_abstract(cx, abstract_type, selection_set),
            },
            None => panic!("schema is missing named type {name:?} reached by a compiled field"),
        },
    }
}

/// Compiles an interface/union dispatch by compiling one object branch per
/// possible type (§4.3).
fn compile_abstract<C>(cx: &Compiler<'_, C>, abstract_type: &crate::schema::AbstractType<C>, selection_set: &[Selection]) -> PlanNode<C> {
    let mut branches = IndexMap::new();
    let mut is_type_of = IndexMap::new();
    for possible_type in &abstract_type.possible_types {
        branches.insert(
            possible_type.clone(),
            TypedPlan { nullable: true, node: PlanNode::Object(compile_object(cx, possible_type, selection_set, false)) },
        );
        if let Some(object) = cx.schema.object(possible_type) {
            if let Some(f) = &object.is_type_of {
                is_type_of.insert(possible_type.clone(), f.clone());
            }
        }
    }
    PlanNode::Abstract(AbstractPlan {
        type_name: abstract_type.name.clone(),
        possible_types: abstract_type.possible_types.clone(),
        resolve_type: abstract_type.resolve_type.clone(),
        is_type_of,
        branches,
    })
}

/// The implicit resolver used for a field with no declared `resolve`: plain
/// property access on the parent value (§4.1 step 3, "default resolution").
fn default_property_resolver<C>(field_name: String) -> ResolveFn<C> {
    Arc::new(move |parent, _args, _ctx, _info| {
        let value = parent.get(&field_name).cloned().unwrap_or(Value::Null);
        Ok(crate::schema::ResolvedValue::Value(value))
    })
}

/// Binds every argument a resolver will see: both the ones the query text
/// actually supplies, and any schema-declared argument the query text
/// omits entirely but which carries its own default (§4.2 "Argument
/// binding" is this compiler's job, not an external one - `schema.rs`'s
/// `ArgumentDef` doc comment).
fn bind_arguments(arguments: &[ast::Argument], argument_defs: &IndexMap<String, ArgumentDef>) -> Vec<(String, ArgBinding)> {
    let mut present = FnvHashSet::default();
    let mut bindings: Vec<(String, ArgBinding)> = arguments
        .iter()
        .map(|arg| {
            present.insert(arg.name.as_str());
            let default = argument_defs.get(&arg.name).and_then(|d| d.default_value.clone());
            let binding = match &arg.value.item {
                ast::InputValue::Variable(name) => ArgBinding::Variable { variable: name.clone(), default },
                literal if contains_variable(literal) => ArgBinding::Composite(literal.clone()),
                literal => ArgBinding::Static(literal.to_const_value()),
            };
            (arg.name.clone(), binding)
        })
        .collect();

    for (name, def) in argument_defs {
        if present.contains(name.as_str()) {
            continue;
        }
        if let Some(default) = &def.default_value {
            bindings.push((name.clone(), ArgBinding::Static(default.clone())));
        }
    }

    bindings
}

fn contains_variable(value: &ast::InputValue) -> bool {
    match value {
        ast::InputValue::Variable(_) => true,
        ast::InputValue::List(items) => items.iter().any(contains_variable),
        ast::InputValue::Object(fields) => fields.iter().any(|(_, v)| contains_variable(v)),
        _ => false,
    }
}

/// Resolves an `ArgBinding` to its final argument value for one invocation
/// (§4.2 "Argument binding"), given the caller-supplied `variables`.
///
/// A `Variable` binding whose variable is absent from `variables` *and* has
/// no argument-schema default contributes no entry at all, rather than an
/// explicit `null` - matching "include the variable's current value only
/// if the variables map actually contains that variable key" (§4.2), with
/// the default filling the gap when one was declared (§8 scenario 6).
pub(crate) fn bind_argument_values(bindings: &[(String, ArgBinding)], variables: &crate::value::Variables) -> crate::schema::ArgumentValues {
    bindings
        .iter()
        .filter_map(|(name, binding)| resolve_binding(binding, variables).map(|value| (name.clone(), value)))
        .collect()
}

fn resolve_binding(binding: &ArgBinding, variables: &crate::value::Variables) -> Option<Value> {
    match binding {
        ArgBinding::Static(v) => Some(v.clone()),
        ArgBinding::Variable { variable, default } => variables.get(variable).cloned().or_else(|| default.clone()),
        ArgBinding::Composite(literal) => Some(substitute_variables(literal, variables)),
    }
}

fn substitute_variables(value: &ast::InputValue, variables: &crate::value::Variables) -> Value {
    match value {
        ast::InputValue::Null => Value::Null,
        ast::InputValue::Int(i) => Value::from(*i),
        ast::InputValue::Float(f) => Value::from(*f),
        ast::InputValue::String(s) | ast::InputValue::Enum(s) => Value::String(s.clone()),
        ast::InputValue::Boolean(b) => Value::Bool(*b),
        ast::InputValue::Variable(name) => variables.get(name).cloned().unwrap_or(Value::Null),
        ast::InputValue::List(items) => Value::Array(items.iter().map(|i| substitute_variables(i, variables)).collect()),
        ast::InputValue::Object(fields) => {
            let mut map = Object::new();
            for (k, v) in fields {
                map.insert(k.clone(), substitute_variables(v, variables));
            }
            Value::Object(map)
        }
    }
}
