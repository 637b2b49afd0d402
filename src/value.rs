//! The value type produced by execution.
//!
//! Plan nodes do not carry a generic `ScalarValue` parameter the way a
//! macro-driven schema would: since the schema itself is a runtime
//! description rather than a set of Rust types, every value flowing through
//! compilation and execution (resolver parents, resolved field values,
//! serialized leaves) is represented uniformly as a JSON value. This is also
//! exactly what the default (non-custom) serializer produces, so there is no
//! translation step between "the executor's result" and "the wire format".

/// Serializable value returned from query and field execution.
pub use serde_json::Value;

/// An ordered field/value map, as used for response objects and argument maps.
///
/// Order matters: response-object key order must mirror selection-set order
/// (§8, property 1), which is why `serde_json` is configured with the
/// `preserve_order` feature.
pub type Object = serde_json::Map<String, Value>;

/// The map of variables supplied for a single execution.
pub type Variables = std::collections::HashMap<String, Value>;
