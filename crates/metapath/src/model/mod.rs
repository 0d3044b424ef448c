//! The node tree consumed by the evaluator.
//!
//! A document tree is made of a document node whose single child is the root assembly.
//! Assemblies contain flags and model children (assemblies or fields); fields carry a value
//! and may have flags of their own.

pub mod simple;

use crate::xdm::{AtomicItem, ExpandedName};
use core::fmt;
use std::hash::Hash;
use url::Url;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Document,
    Assembly,
    Field,
    Flag,
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            NodeKind::Document => "document",
            NodeKind::Assembly => "assembly",
            NodeKind::Field => "field",
            NodeKind::Flag => "flag",
        })
    }
}

/// Adapter contract for document trees navigated by the evaluator.
///
/// Node identity is `Eq`/`Hash`: two handles are equal only when they denote the same node.
pub trait MetapathNode: Clone + Eq + Hash + fmt::Debug + Send + Sync + 'static {
    fn kind(&self) -> NodeKind;
    fn name(&self) -> Option<ExpandedName>;
    fn parent(&self) -> Option<Self>;

    /// Flag children in declaration order.
    fn flags(&self) -> Vec<Self>;

    /// Model children (assemblies and fields) in document order.
    fn model_children(&self) -> Vec<Self>;

    fn model_children_named(&self, name: &ExpandedName) -> Vec<Self> {
        self.model_children()
            .into_iter()
            .filter(|c| c.name().as_ref() == Some(name))
            .collect()
    }

    /// Typed value of a field or flag. Documents and assemblies have none.
    fn typed_value(&self) -> Option<AtomicItem>;

    /// Marks a node that re-enters a recursive part of the model; descendant searches include
    /// it but do not recurse into it.
    fn is_cycle_sentinel(&self) -> bool {
        false
    }

    fn base_uri(&self) -> Option<Url> {
        self.parent().and_then(|p| p.base_uri())
    }

    fn document_uri(&self) -> Option<Url> {
        None
    }

    /// String value: the typed value's lexical form, or the concatenated values of all
    /// descendant fields for containers.
    fn string_value(&self) -> String {
        if let Some(v) = self.typed_value() {
            return v.string_value();
        }
        let mut out = String::new();
        let mut stack = self.model_children();
        stack.reverse();
        while let Some(n) = stack.pop() {
            if let Some(v) = n.typed_value() {
                out.push_str(&v.string_value());
            }
            let mut children = n.model_children();
            children.reverse();
            stack.extend(children);
        }
        out
    }

    fn root(&self) -> Self {
        let mut cur = self.clone();
        while let Some(p) = cur.parent() {
            cur = p;
        }
        cur
    }

    /// Positional path of this node, e.g. `/catalog[1]/group[2]/@id`.
    fn location(&self) -> String {
        let mut segments = Vec::new();
        let mut cur = self.clone();
        while let Some(parent) = cur.parent() {
            let local = cur.name().map(|n| n.local).unwrap_or_default();
            if cur.kind() == NodeKind::Flag {
                segments.push(format!("@{local}"));
            } else {
                let name = cur.name();
                let position = parent
                    .model_children()
                    .iter()
                    .filter(|c| c.name() == name)
                    .position(|c| *c == cur)
                    .map_or(1, |p| p + 1);
                segments.push(format!("{local}[{position}]"));
            }
            cur = parent;
        }
        if segments.is_empty() {
            return match self.kind() {
                NodeKind::Document => "/".to_string(),
                _ => self.name().map(|n| n.local).unwrap_or_default(),
            };
        }
        segments.reverse();
        let prefix = if cur.kind() == NodeKind::Document { "/" } else { "" };
        format!("{prefix}{}", segments.join("/"))
    }
}
