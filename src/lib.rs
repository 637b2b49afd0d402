//! A just-in-time query compiler and executor.
//!
//! Given a schema view and an already-parsed, already-validated query
//! document, [`compile`] produces a [`CompiledQuery`]: a plan that has
//! already done the work of walking the document against the schema, so
//! that running it against a root value, a context, and a set of
//! variables never has to look at the AST again. The plan can be run any
//! number of times, concurrently, against different roots and variables
//! (§2, §5).
//!
//! What this crate does *not* do: parse query text, build a schema,
//! validate a query against one, or coerce raw variable JSON against
//! variable-definition types. All of that is expected to have already
//! happened by the time a [`ast::Document`] and [`schema::Schema`] reach
//! [`compile`].

#![cfg_attr(docsrs, feature(doc_cfg))]
#![cfg_attr(not(any(doc, test)), doc = env!("CARGO_PKG_NAME"))]

pub mod ast;
pub mod error;
mod exec;
pub mod parser;
pub mod path;
mod plan;
pub mod schema;
pub mod value;

#[cfg(test)]
mod executor_tests;

use std::sync::Arc;

pub use arcstr::{self, ArcStr};
#[doc(inline)]
pub use futures::future::BoxFuture;

use error::{CompileError, ErrorObject};
use exec::Concurrency;
use schema::Schema;
use value::{Value, Variables};

/// Options controlling how a [`CompiledQuery`] runs and serializes its
/// results (§6 "Options").
#[derive(Clone, Default)]
pub struct CompileOptions {
    /// Skip running the schema's *built-in* scalar/enum serializers and
    /// pass resolved leaf values through unchanged. Custom scalars still
    /// run their own serializer - it is the only thing validating that
    /// value, so skipping it would let malformed values reach the wire
    /// silently (§6).
    pub disable_leaf_serialization: bool,
    /// Overrides how [`CompiledQuery::stringify`] turns a [`Response`]
    /// into a wire string. Building a serializer *from* the compiled plan
    /// shape is external to this crate (§1 Non-goal: "custom fast JSON
    /// serializer internals"); this only lets one be plugged in.
    pub custom_json_serializer: Option<Arc<dyn Fn(&Response) -> String + Send + Sync>>,
}

impl std::fmt::Debug for CompileOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompileOptions")
            .field("disable_leaf_serialization", &self.disable_leaf_serialization)
            .field("custom_json_serializer", &self.custom_json_serializer.is_some())
            .finish()
    }
}

/// The compiled result of one operation selected out of a query document:
/// bound to a schema and a document, ready to be run any number of times
/// against different roots, contexts, and variables (§2, §6 "compile").
///
/// Nothing about running a `CompiledQuery` mutates it, so the same value
/// can be shared (e.g. behind an `Arc`) and run concurrently from many
/// tasks (§5).
pub struct CompiledQuery<C> {
    schema: Arc<Schema<C>>,
    document: Arc<[ast::Definition]>,
    operation_index: usize,
    root: plan::ObjectPlan<C>,
    concurrency: Concurrency,
    options: CompileOptions,
}

/// A query execution result: the materialized data tree (possibly
/// containing nulls where errors were contained) plus the errors collected
/// while producing it (§6 "Result shape").
///
/// `data` is always present once execution starts; a document that fails
/// to even select an operation never reaches this type; see [`compile`]'s
/// `Result::Err` for that case instead.
#[derive(Clone, Debug, serde::Serialize)]
pub struct Response {
    pub data: Value,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<ErrorObject>,
}

/// Selects an operation from `document` (by `operation_name`, or the
/// document's only operation if it has just one) and compiles it against
/// `schema` into a reusable [`CompiledQuery`] (§4.1, §6 "compile").
///
/// `document` is expected to already be parsed and validated (§1
/// Non-goal): fragment and operation lookups here assume that validation
/// already ran and that every reference resolves.
pub fn compile<C>(schema: Arc<Schema<C>>, document: Arc<[ast::Definition]>, operation_name: Option<&str>) -> Result<CompiledQuery<C>, CompileError> {
    compile_with_options(schema, document, operation_name, CompileOptions::default())
}

/// Like [`compile`], with explicit [`CompileOptions`].
pub fn compile_with_options<C>(
    schema: Arc<Schema<C>>,
    document: Arc<[ast::Definition]>,
    operation_name: Option<&str>,
    options: CompileOptions,
) -> Result<CompiledQuery<C>, CompileError> {
    let (operation_index, root, is_mutation) = plan::build(&schema, &document, operation_name)?;
    Ok(CompiledQuery {
        schema,
        document,
        operation_index,
        root,
        // Mutations resolve their top-level fields strictly in declaration
        // order; queries (and each mutation field's own subtree) resolve
        // independently (§4.6, §8 property 5).
        concurrency: if is_mutation { Concurrency::Serial } else { Concurrency::Parallel },
        options,
    })
}

impl<C> CompiledQuery<C> {
    fn operation(&self) -> &ast::Operation {
        match &self.document[self.operation_index] {
            ast::Definition::Operation(op) => &op.item,
            ast::Definition::Fragment(_) => {
                unreachable!("operation_index is only ever set to an Operation definition by plan::build")
            }
        }
    }

    /// Runs this plan once against `root`, `context`, and `variables`
    /// (§6 "run"). `variables` is expected to already be coerced against
    /// the operation's variable definitions (§1 Non-goal).
    pub async fn run(&self, root: Value, context: C, variables: Variables) -> Response
    where
        C: Send + Sync + 'static,
    {
        let fragments = ast::collect_fragments(&self.document);
        let (data, errors) = exec::run(
            &self.schema,
            self.operation(),
            &fragments,
            &self.root,
            root,
            context,
            variables,
            &self.options,
            self.concurrency,
        )
        .await;
        Response { data, errors }
    }

    /// Runs this plan to completion on the calling thread via a minimal
    /// single-threaded executor, blocking on any deferred resolver work.
    /// Convenient for tests and for callers with no genuinely async
    /// resolvers (§4.6 "Executor runtimes").
    pub fn run_sync(&self, root: Value, context: C, variables: Variables) -> Response
    where
        C: Send + Sync + 'static,
    {
        futures::executor::block_on(self.run(root, context, variables))
    }

    /// Serializes a [`Response`] using `custom_json_serializer` if one was
    /// supplied at compile time, else plain `serde_json`.
    pub fn stringify(&self, response: &Response) -> String {
        match &self.options.custom_json_serializer {
            Some(f) => f(response),
            None => serde_json::to_string(response).expect("Response always serializes"),
        }
    }
}
