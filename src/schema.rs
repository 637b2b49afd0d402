//! The schema view (§3): a read-only, data-described mapping from type
//! names to type descriptors, plus the external resolver/type-resolver/
//! serializer contracts (§6).
//!
//! Unlike a macro-driven schema, where each GraphQL type corresponds to a
//! concrete Rust type implementing a trait, this compiler consumes a schema
//! built entirely from data: every type is one of the four variants below,
//! and every resolver is an opaque callable. This mirrors how the query
//! document itself is consumed (already parsed, already validated) and is
//! what makes a single `Plan` reusable across unrelated Rust types - the
//! schema can describe a type the compiler never sees at compile time.

use std::sync::Arc;

use futures::future::BoxFuture;
use indexmap::IndexMap;

use crate::{error::FieldError, value::Value};

/// A reference to an output type: a named type, or a wrapper around one.
///
/// Non-null is a wrapper here for schema-authoring convenience, but the
/// compiler never keeps it as its own plan-node variant (§3 invariant) - it
/// collapses into a nullability flag on whichever plan node the wrapped type
/// produces.
#[derive(Clone, Debug, PartialEq)]
pub enum OutputType {
    Named(String),
    List(Box<OutputType>),
    NonNull(Box<OutputType>),
}

impl OutputType {
    pub fn named(name: impl Into<String>) -> Self {
        Self::Named(name.into())
    }

    #[must_use]
    pub fn list(self) -> Self {
        Self::List(Box::new(self))
    }

    #[must_use]
    pub fn non_null(self) -> Self {
        Self::NonNull(Box::new(self))
    }

    pub fn is_non_null(&self) -> bool {
        matches!(self, Self::NonNull(_))
    }

    /// The type with any top-level non-null wrapper removed.
    pub fn nullable_inner(&self) -> &Self {
        match self {
            Self::NonNull(inner) => inner,
            other => other,
        }
    }
}

/// A single named type in the schema: object, leaf, or abstract.
pub enum NamedType<C> {
    Object(ObjectType<C>),
    Leaf(LeafType),
    Abstract(AbstractType<C>),
}

impl<C> NamedType<C> {
    pub fn name(&self) -> &str {
        match self {
            Self::Object(o) => &o.name,
            Self::Leaf(l) => &l.name,
            Self::Abstract(a) => &a.name,
        }
    }
}

/// An object type: an ordered map of fields (§3 "Object").
pub struct ObjectType<C> {
    pub name: String,
    pub fields: IndexMap<String, FieldDef<C>>,
    /// Used by abstract dispatch when no explicit type resolver is set
    /// (§4.3 step 1(c)).
    pub is_type_of: Option<IsTypeOfFn<C>>,
}

/// A scalar or enum type: terminal in the result tree (§3 "Leaf").
pub struct LeafType {
    pub name: String,
    pub serialize: SerializeFn,
    /// Whether this is one of the schema's built-in scalars (e.g. `Int`,
    /// `String`) rather than a user-supplied custom scalar. Only built-ins
    /// are skipped by `disable_leaf_serialization` (§6) - a custom scalar's
    /// serializer is the only thing validating that value, so skipping it
    /// would let malformed values reach the wire silently.
    pub builtin: bool,
}

/// An interface or union type (§3 "Abstract").
pub struct AbstractType<C> {
    pub name: String,
    pub possible_types: Vec<String>,
    pub resolve_type: Option<ResolveTypeFn<C>>,
}

/// One field of an [`ObjectType`].
pub struct FieldDef<C> {
    pub name: String,
    pub output_type: OutputType,
    pub arguments: IndexMap<String, ArgumentDef>,
    pub resolve: Option<ResolveFn<C>>,
}

/// The declared schema for one field argument; only its default value
/// matters to this compiler (argument *type* coercion is out of scope -
/// §1, "Variable-value coercion... is an external function").
pub struct ArgumentDef {
    pub name: String,
    pub default_value: Option<Value>,
}

/// A read-only view over a set of named types plus the root operation
/// types (§3 "Schema view").
pub struct Schema<C> {
    pub query_type: String,
    pub mutation_type: Option<String>,
    pub types: IndexMap<String, NamedType<C>>,
}

impl<C> Schema<C> {
    pub fn object(&self, name: &str) -> Option<&ObjectType<C>> {
        match self.types.get(name)? {
            NamedType::Object(o) => Some(o),
            _ => None,
        }
    }

    pub fn named_type(&self, name: &str) -> Option<&NamedType<C>> {
        self.types.get(name)
    }
}

/// Scalar/enum serialization (§4.1 "Leaf"): validates and converts a
/// resolved value into wire-ready JSON, or fails with a message.
pub type SerializeFn = Arc<dyn Fn(&Value) -> Result<Value, String> + Send + Sync>;

/// Duck-typed or explicit concrete-type resolution for an object possibly
/// satisfying an abstract type (§4.3 step 1(c)).
pub type IsTypeOfFn<C> = Arc<dyn Fn(&Value, &C) -> bool + Send + Sync>;

/// The external type-resolver contract (§6): must be synchronous.
pub type ResolveTypeFn<C> = Arc<dyn Fn(&Value, &C) -> Option<String> + Send + Sync>;

/// The shapes a resolver may hand back to the executor (§4.6 "Value-or-future
/// adapter"): a plain value, a future, an already-failed slot, or a list
/// whose elements may themselves be any of these.
///
/// `Err` lets a resolver embed a per-element failure directly in a `List`
/// without the list itself failing (§4.1 "Value-is-Error check") - the
/// in-band error marker the original JS engine gets from duck-typing an
/// arbitrary thrown value is, here, a variant of a closed enum instead.
pub enum ResolvedValue {
    Value(Value),
    Err(FieldError),
    Pending(BoxFuture<'static, Result<Value, FieldError>>),
    List(Vec<ResolvedValue>),
}

impl ResolvedValue {
    pub fn value(v: impl Into<Value>) -> Self {
        Self::Value(v.into())
    }
}

/// The already-bound arguments passed to a resolver (§4.2 "Argument
/// binding").
pub type ArgumentValues = IndexMap<String, Value>;

/// The external resolver contract (§6): `resolve(parent, args, context,
/// info) -> value | Future<value> | Error`.
pub type ResolveFn<C> =
    Arc<dyn Fn(&Value, ArgumentValues, &C, ResolveInfo<'_, C>) -> Result<ResolvedValue, FieldError> + Send + Sync>;

/// A lazily-relevant descriptor exposing what a resolver needs to know
/// about the call site it was invoked from (§4.2 "Resolve-info").
pub struct ResolveInfo<'a, C> {
    pub field_name: &'a str,
    /// The field nodes selecting this field, merged across every fragment
    /// spread or inline fragment that contributed one - lets a resolver
    /// inspect its own call site (e.g. directives this compiler doesn't
    /// itself interpret) rather than only the bound argument values.
    pub field_nodes: &'a [crate::parser::Spanning<crate::ast::Field>],
    pub return_type: &'a OutputType,
    pub parent_type: &'a str,
    pub path: &'a crate::path::ResponsePath,
    pub schema: &'a Schema<C>,
    pub operation: &'a crate::ast::Operation,
    pub fragments: &'a crate::ast::Fragments<'a>,
    pub root_value: &'a Value,
    pub variable_values: &'a crate::value::Variables,
}
