//! End-to-end tests driving [`compile`](crate::compile) and
//! [`CompiledQuery::run`](crate::CompiledQuery::run) against hand-built
//! schemas and documents, one concern per file - mirroring the executor's
//! own component boundaries (§4).


mod compile_errors;
mod mutation;
mod non_null;
mod variables;
