//! Response paths: the chain of field names and list indices identifying a
//! field's location in the response (§3 "ResponsePath").
//!
//! A path is a persistent singly-linked list so that extending it at a field
//! or list-element boundary is O(1) and shares structure with every sibling
//! path built from the same ancestor - the same trick [`FieldPath`] in a
//! recursive-descent executor uses, generalized with a list-index segment.
//!
//! [`FieldPath`]: https://docs.rs/juniper

use std::sync::Arc;

use arcstr::ArcStr;

#[derive(Clone, Debug)]
enum Segment {
    /// A static field name or alias.
    Literal(ArcStr),
    /// A list index, realized against the element actually being visited.
    ///
    /// In a code-generating implementation this would be a symbolic loop
    /// variable name, resolved against an index-variable scope at error
    /// time. An interpreter has the concrete index in hand the moment it
    /// descends into the element, so there is nothing left to resolve -
    /// the value is stored directly.
    Index(usize),
}

/// A persistent path from a field back to the root of the query.
///
/// Cloning a [`ResponsePath`] is O(1): it shares the chain with every path
/// it was extended from.
#[derive(Clone, Debug, Default)]
pub struct ResponsePath(Option<Arc<Node>>);

#[derive(Debug)]
struct Node {
    segment: Segment,
    parent: ResponsePath,
}

/// One element of a realized, user-facing path.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize)]
#[serde(untagged)]
pub enum PathElement {
    Key(String),
    Index(usize),
}

impl ResponsePath {
    /// The empty path, at the root of the response.
    pub fn root() -> Self {
        Self(None)
    }

    /// Extends this path with a static field name or alias.
    #[must_use]
    pub fn field(&self, key: impl Into<ArcStr>) -> Self {
        self.push(Segment::Literal(key.into()))
    }

    /// Extends this path with a list index.
    #[must_use]
    pub fn index(&self, i: usize) -> Self {
        self.push(Segment::Index(i))
    }

    fn push(&self, segment: Segment) -> Self {
        Self(Some(Arc::new(Node {
            segment,
            parent: self.clone(),
        })))
    }

    /// Is this the root path (no segments at all)?
    pub fn is_root(&self) -> bool {
        self.0.is_none()
    }

    /// The user-facing path: field names and list indices, in order (the
    /// invariant in §3).
    pub fn to_vec(&self) -> Vec<PathElement> {
        let mut out = Vec::new();
        self.collect(&mut out);
        out
    }

    fn collect(&self, out: &mut Vec<PathElement>) {
        let Some(node) = &self.0 else { return };
        node.parent.collect(out);
        match &node.segment {
            Segment::Literal(s) => out.push(PathElement::Key(s.to_string())),
            Segment::Index(i) => out.push(PathElement::Index(*i)),
        }
    }

    /// The nearest ancestor path one segment up, if any.
    pub fn parent(&self) -> Option<&ResponsePath> {
        self.0.as_ref().map(|n| &n.parent)
    }
}
