//! Item model: atomic values, nodes wrapped as items, and sequences of items.

mod atomic;
mod sequence;
pub mod temporal;

pub use atomic::{AtomicItem, AtomicType, decimal64};
pub use sequence::Sequence;

use crate::model::MetapathNode;
use core::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ExpandedName {
    pub ns_uri: Option<String>,
    pub local: String,
}

impl ExpandedName {
    pub fn new(ns_uri: Option<String>, local: impl Into<String>) -> Self {
        Self { ns_uri, local: local.into() }
    }

    pub fn local(local: impl Into<String>) -> Self {
        Self { ns_uri: None, local: local.into() }
    }

    pub fn ns(ns_uri: &str, local: impl Into<String>) -> Self {
        Self { ns_uri: Some(ns_uri.to_string()), local: local.into() }
    }
}

impl From<&str> for ExpandedName {
    fn from(local: &str) -> Self {
        ExpandedName::local(local)
    }
}

impl From<String> for ExpandedName {
    fn from(local: String) -> Self {
        ExpandedName::local(local)
    }
}

impl fmt::Display for ExpandedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.ns_uri {
            Some(ns) => write!(f, "Q{{{ns}}}{}", self.local),
            None => f.write_str(&self.local),
        }
    }
}

/// A single value flowing through evaluation: either a node of the document tree or an atomic
/// value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Item<N> {
    Node(N),
    Atomic(AtomicItem),
}

impl<N> Item<N> {
    pub fn as_node(&self) -> Option<&N> {
        match self {
            Item::Node(n) => Some(n),
            Item::Atomic(_) => None,
        }
    }

    pub fn as_atomic(&self) -> Option<&AtomicItem> {
        match self {
            Item::Atomic(a) => Some(a),
            Item::Node(_) => None,
        }
    }

    pub fn is_node(&self) -> bool {
        matches!(self, Item::Node(_))
    }
}

impl<N: MetapathNode> Item<N> {
    /// Atomize a single item. Fields and flags yield their typed value; containers have none.
    pub fn atomize(&self) -> Result<AtomicItem, crate::Error> {
        match self {
            Item::Atomic(a) => Ok(a.clone()),
            Item::Node(n) => n.typed_value().ok_or_else(|| {
                crate::Error::dynamic(
                    crate::ErrorCode::FOTY0012,
                    format!("the {} node '{}' has no typed value", n.kind(), n.location()),
                )
            }),
        }
    }

    pub fn string_value(&self) -> String {
        match self {
            Item::Atomic(a) => a.string_value(),
            Item::Node(n) => n.string_value(),
        }
    }

    /// Short type label used in diagnostics.
    pub fn type_label(&self) -> String {
        match self {
            Item::Atomic(a) => a.atomic_type().to_string(),
            Item::Node(n) => format!("{}()", n.kind()),
        }
    }
}

impl<N> From<AtomicItem> for Item<N> {
    fn from(a: AtomicItem) -> Self {
        Item::Atomic(a)
    }
}

impl<N: MetapathNode> fmt::Display for Item<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Item::Node(n) => f.write_str(&n.location()),
            Item::Atomic(a) => write!(f, "{a}"),
        }
    }
}
