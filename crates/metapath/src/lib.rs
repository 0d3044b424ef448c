//! Metapath: a typed, XPath-inspired expression language for navigating hierarchical model
//! trees.
//!
//! ```
//! use metapath::model::simple::{assembly, doc, field, flag};
//! use metapath::{Item, StaticContext, compile};
//!
//! let document = doc()
//!     .child(
//!         assembly("catalog")
//!             .child(assembly("group").flag(flag("id", "g1")).child(field("title", "Alpha")))
//!             .child(assembly("group").flag(flag("id", "g2")).child(field("title", "Beta"))),
//!     )
//!     .build();
//! let expr = compile("//group[@id = 'g2']/title", &StaticContext::default()).unwrap();
//! let result = expr.evaluate(Some(Item::Node(document)), None).unwrap();
//! assert_eq!(result.first().map(Item::string_value).as_deref(), Some("Beta"));
//! ```

pub mod compiler;
pub mod consts;
pub mod engine;
pub mod model;
pub mod parser;
pub mod xdm;

pub use compiler::{MetapathExpression, ResultType, ResultValue, compile};
pub use engine::analysis::{Analyzer, static_result_type};
pub use engine::context::{
    Configuration, DynamicContext, DynamicContextBuilder, Feature, StaticContext, StaticContextBuilder,
};
pub use engine::error::{Error, ErrorCode, ErrorKind};
pub use engine::evaluator::evaluate;
pub use engine::functions::{
    Argument, CallContext, Function, FunctionBuilder, FunctionImpl, FunctionLibrary, FunctionProperty, ItemType,
    Occurrence, SequenceType,
};
pub use engine::loader::{CachingDocumentLoader, DocumentLoader};
pub use model::{MetapathNode, NodeKind};
pub use xdm::{AtomicItem, AtomicType, ExpandedName, Item, Sequence};
