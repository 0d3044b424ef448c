//! Simple in-memory tree implementation of [`MetapathNode`] used in tests and by the CLI.
//!
//! Nodes are immutable once built; parent links are weak so a tree is dropped together with
//! its document node.
//!
//! Example:
//! ```
//! use metapath::model::simple::{doc, assembly, field, flag};
//! use metapath::model::MetapathNode;
//!
//! let document = doc()
//!     .child(
//!         assembly("catalog")
//!             .flag(flag("uuid", "abc"))
//!             .child(field("title", "Sample"))
//!     )
//!     .build();
//! let catalog = document.model_children()[0].clone();
//! assert_eq!(catalog.flags().len(), 1);
//! assert_eq!(catalog.string_value(), "Sample");
//! ```
use std::fmt;
use std::sync::{Arc, OnceLock, Weak};

use url::Url;

use crate::model::{MetapathNode, NodeKind};
use crate::xdm::{AtomicItem, ExpandedName};

pub(crate) struct Inner {
    kind: NodeKind,
    name: Option<ExpandedName>,
    value: Option<AtomicItem>,
    parent: OnceLock<Weak<Inner>>,
    flags: Vec<SimpleNode>,
    children: Vec<SimpleNode>,
    cycle_sentinel: bool,
    base_uri: Option<Url>,
    document_uri: Option<Url>,
}

/// A simple Arc-backed node implementation with pointer identity.
#[derive(Clone)]
pub struct SimpleNode(pub(crate) Arc<Inner>);

impl PartialEq for SimpleNode {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}
impl Eq for SimpleNode {}
impl std::hash::Hash for SimpleNode {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        Arc::as_ptr(&self.0).hash(state)
    }
}

impl fmt::Debug for SimpleNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SimpleNode")
            .field("kind", &self.0.kind)
            .field("name", &self.0.name)
            .field("value", &self.0.value)
            .finish()
    }
}

impl SimpleNode {
    pub fn document() -> SimpleNodeBuilder {
        SimpleNodeBuilder::new(NodeKind::Document, None, None)
    }

    pub fn assembly(name: impl Into<ExpandedName>) -> SimpleNodeBuilder {
        SimpleNodeBuilder::new(NodeKind::Assembly, Some(name.into()), None)
    }

    pub fn field(name: impl Into<ExpandedName>, value: impl Into<AtomicItem>) -> SimpleNodeBuilder {
        SimpleNodeBuilder::new(NodeKind::Field, Some(name.into()), Some(value.into()))
    }

    pub fn flag(name: impl Into<ExpandedName>, value: impl Into<AtomicItem>) -> SimpleNode {
        SimpleNodeBuilder::new(NodeKind::Flag, Some(name.into()), Some(value.into())).build()
    }
}

pub struct SimpleNodeBuilder {
    kind: NodeKind,
    name: Option<ExpandedName>,
    value: Option<AtomicItem>,
    flags: Vec<SimpleNode>,
    children: Vec<SimpleNode>,
    cycle_sentinel: bool,
    base_uri: Option<Url>,
    document_uri: Option<Url>,
}

impl SimpleNodeBuilder {
    fn new(kind: NodeKind, name: Option<ExpandedName>, value: Option<AtomicItem>) -> Self {
        Self {
            kind,
            name,
            value,
            flags: Vec::new(),
            children: Vec::new(),
            cycle_sentinel: false,
            base_uri: None,
            document_uri: None,
        }
    }

    pub fn child(mut self, child: impl Into<SimpleNodeOrBuilder>) -> Self {
        self.children.push(child.into().into_node());
        self
    }

    pub fn children<I: IntoIterator<Item = SimpleNodeOrBuilder>>(mut self, it: I) -> Self {
        self.children.extend(it.into_iter().map(SimpleNodeOrBuilder::into_node));
        self
    }

    pub fn flag(mut self, flag: SimpleNode) -> Self {
        debug_assert!(flag.kind() == NodeKind::Flag);
        self.flags.push(flag);
        self
    }

    pub fn flags<I: IntoIterator<Item = SimpleNode>>(mut self, it: I) -> Self {
        for f in it {
            self = self.flag(f);
        }
        self
    }

    /// Marks the node as re-entering a recursive model definition.
    pub fn cycle_sentinel(mut self) -> Self {
        self.cycle_sentinel = true;
        self
    }

    /// Sets the base URI; on a document node also its document URI.
    pub fn uri(mut self, uri: Url) -> Self {
        if self.kind == NodeKind::Document {
            self.document_uri = Some(uri.clone());
        }
        self.base_uri = Some(uri);
        self
    }

    pub fn build(self) -> SimpleNode {
        let SimpleNodeBuilder {
            kind,
            name,
            value,
            flags,
            children,
            cycle_sentinel,
            base_uri,
            document_uri,
        } = self;
        let inner = Arc::new_cyclic(|weak: &Weak<Inner>| {
            // a node attached to a second parent keeps its first one
            for c in flags.iter().chain(children.iter()) {
                let _ = c.0.parent.set(weak.clone());
            }
            Inner {
                kind,
                name,
                value,
                parent: OnceLock::new(),
                flags,
                children,
                cycle_sentinel,
                base_uri,
                document_uri,
            }
        });
        SimpleNode(inner)
    }
}

pub enum SimpleNodeOrBuilder {
    Built(SimpleNode),
    Builder(SimpleNodeBuilder),
}

impl SimpleNodeOrBuilder {
    fn into_node(self) -> SimpleNode {
        match self {
            SimpleNodeOrBuilder::Built(n) => n,
            SimpleNodeOrBuilder::Builder(b) => b.build(),
        }
    }
}

impl From<SimpleNode> for SimpleNodeOrBuilder {
    fn from(n: SimpleNode) -> Self {
        SimpleNodeOrBuilder::Built(n)
    }
}
impl From<SimpleNodeBuilder> for SimpleNodeOrBuilder {
    fn from(b: SimpleNodeBuilder) -> Self {
        SimpleNodeOrBuilder::Builder(b)
    }
}

// Convenience free functions for concise tree construction
pub fn doc() -> SimpleNodeBuilder {
    SimpleNode::document()
}
pub fn assembly(name: &str) -> SimpleNodeBuilder {
    SimpleNode::assembly(name)
}
pub fn field(name: &str, value: impl Into<AtomicItem>) -> SimpleNodeBuilder {
    SimpleNode::field(name, value)
}
pub fn flag(name: &str, value: impl Into<AtomicItem>) -> SimpleNode {
    SimpleNode::flag(name, value)
}

impl MetapathNode for SimpleNode {
    fn kind(&self) -> NodeKind {
        self.0.kind
    }
    fn name(&self) -> Option<ExpandedName> {
        self.0.name.clone()
    }
    fn parent(&self) -> Option<Self> {
        self.0.parent.get().and_then(Weak::upgrade).map(SimpleNode)
    }
    fn flags(&self) -> Vec<Self> {
        self.0.flags.clone()
    }
    fn model_children(&self) -> Vec<Self> {
        self.0.children.clone()
    }
    fn typed_value(&self) -> Option<AtomicItem> {
        self.0.value.clone()
    }
    fn is_cycle_sentinel(&self) -> bool {
        self.0.cycle_sentinel
    }
    fn base_uri(&self) -> Option<Url> {
        self.0.base_uri.clone().or_else(|| self.parent().and_then(|p| p.base_uri()))
    }
    fn document_uri(&self) -> Option<Url> {
        self.0.document_uri.clone()
    }
}
