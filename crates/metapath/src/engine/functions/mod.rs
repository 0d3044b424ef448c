//! Function signatures, argument conversion, and the name+arity function library.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use tracing::{trace, warn};

use crate::consts::FNS;
use crate::engine::context::DynamicContext;
use crate::engine::error::{Error, ErrorCode};
use crate::model::MetapathNode;
use crate::xdm::{AtomicItem, AtomicType, ExpandedName, Item, Sequence};

pub(crate) mod arithmetic;
mod boolean;
pub(crate) mod common;
pub(crate) mod comparison;
mod constructors;
mod datetime;
mod documents;
mod nodes;
mod numeric;
mod sequences;
mod standard;
mod strings;

/// Behavioural properties that decide whether a call result may be memoized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FunctionProperty {
    /// Same arguments always give the same result.
    Deterministic,
    /// Reads the dynamic context (clock, documents, variables).
    ContextDependent,
    /// Reads the focus (context item, position or size).
    FocusDependent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Occurrence {
    One,
    ZeroOrOne,
    ZeroOrMore,
    OneOrMore,
}

impl Occurrence {
    fn admits(self, len: usize) -> bool {
        match self {
            Occurrence::One => len == 1,
            Occurrence::ZeroOrOne => len <= 1,
            Occurrence::ZeroOrMore => true,
            Occurrence::OneOrMore => len >= 1,
        }
    }

    fn indicator(self) -> &'static str {
        match self {
            Occurrence::One => "",
            Occurrence::ZeroOrOne => "?",
            Occurrence::ZeroOrMore => "*",
            Occurrence::OneOrMore => "+",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ItemType {
    Item,
    Node,
    AnyAtomic,
    Numeric,
    Atomic(AtomicType),
}

impl ItemType {
    fn is_atomic(self) -> bool {
        matches!(self, ItemType::AnyAtomic | ItemType::Numeric | ItemType::Atomic(_))
    }
}

impl fmt::Display for ItemType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ItemType::Item => f.write_str("item()"),
            ItemType::Node => f.write_str("node()"),
            ItemType::AnyAtomic => f.write_str("xs:anyAtomicType"),
            ItemType::Numeric => f.write_str("xs:numeric"),
            ItemType::Atomic(t) => write!(f, "{t}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SequenceType {
    pub item: ItemType,
    pub occurrence: Occurrence,
}

impl SequenceType {
    pub const fn one(item: ItemType) -> Self {
        Self { item, occurrence: Occurrence::One }
    }

    pub const fn optional(item: ItemType) -> Self {
        Self { item, occurrence: Occurrence::ZeroOrOne }
    }

    pub const fn zero_or_more(item: ItemType) -> Self {
        Self { item, occurrence: Occurrence::ZeroOrMore }
    }

    pub const fn one_or_more(item: ItemType) -> Self {
        Self { item, occurrence: Occurrence::OneOrMore }
    }
}

impl fmt::Display for SequenceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.item, self.occurrence.indicator())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Argument {
    pub name: String,
    pub ty: SequenceType,
}

/// Call-site view handed to function bodies.
pub struct CallContext<'a, N> {
    pub dynamic: &'a DynamicContext<N>,
    pub focus: &'a Sequence<N>,
    pub function: &'a Function<N>,
}

impl<N: MetapathNode> CallContext<'_, N> {
    /// The single context item of the focus.
    pub fn context_item(&self) -> Result<&Item<N>, Error> {
        self.focus.first_item(true)?.ok_or_else(|| {
            Error::dynamic(
                ErrorCode::MPDY0002,
                format!("{}#{} requires a context item, but the focus is empty", self.function.name, self.function.min_arity()),
            )
        })
    }
}

pub type FunctionImpl<N> =
    Arc<dyn Fn(&CallContext<'_, N>, &[Sequence<N>]) -> Result<Sequence<N>, Error> + Send + Sync>;

/// A callable function: signature, properties and implementation.
pub struct Function<N> {
    name: ExpandedName,
    arguments: Vec<Argument>,
    unbounded: bool,
    result: SequenceType,
    properties: Vec<FunctionProperty>,
    body: FunctionImpl<N>,
}

impl<N> fmt::Debug for Function<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Function")
            .field("name", &self.name)
            .field("arity", &self.arguments.len())
            .field("unbounded", &self.unbounded)
            .field("result", &self.result)
            .field("properties", &self.properties)
            .finish_non_exhaustive()
    }
}

impl<N: MetapathNode> Function<N> {
    pub fn builder(name: ExpandedName) -> FunctionBuilder<N> {
        FunctionBuilder {
            name,
            arguments: Vec::new(),
            unbounded: false,
            result: SequenceType::zero_or_more(ItemType::Item),
            properties: vec![FunctionProperty::Deterministic],
            body: None,
        }
    }
}

impl<N> Function<N> {
    pub fn name(&self) -> &ExpandedName {
        &self.name
    }

    pub fn arguments(&self) -> &[Argument] {
        &self.arguments
    }

    /// Declared argument count; an unbounded function accepts this many or more.
    pub fn min_arity(&self) -> usize {
        self.arguments.len()
    }

    pub fn is_unbounded(&self) -> bool {
        self.unbounded
    }

    pub fn accepts_arity(&self, arity: usize) -> bool {
        arity == self.min_arity() || (self.unbounded && arity > self.min_arity())
    }

    pub fn result_type(&self) -> SequenceType {
        self.result
    }

    pub fn has_property(&self, property: FunctionProperty) -> bool {
        self.properties.contains(&property)
    }

    fn is_memoizable(&self) -> bool {
        self.has_property(FunctionProperty::Deterministic)
            && !self.has_property(FunctionProperty::ContextDependent)
            && !self.has_property(FunctionProperty::FocusDependent)
    }

    /// Declared type of the argument at `index`; an unbounded function repeats its last one.
    fn argument_type(&self, index: usize) -> Option<SequenceType> {
        self.arguments.get(index).or_else(|| self.arguments.last().filter(|_| self.unbounded)).map(|a| a.ty)
    }

}

impl<N: MetapathNode> Function<N> {
    /// Convert the arguments, consult the result cache, and invoke the body.
    pub fn execute(
        &self,
        dynamic: &DynamicContext<N>,
        focus: &Sequence<N>,
        args: Vec<Sequence<N>>,
    ) -> Result<Sequence<N>, Error> {
        let converted = args
            .into_iter()
            .enumerate()
            .map(|(index, arg)| self.convert_argument(index, arg))
            .collect::<Result<Vec<_>, _>>()?;
        let key = self.is_memoizable().then(|| (self.name.clone(), converted.len(), converted.clone()));
        if let Some(key) = &key {
            if let Some(hit) = dynamic.cached_result(key) {
                trace!(function = %self.name, arity = converted.len(), "function result cache hit");
                return Ok(hit);
            }
        }
        let call = CallContext { dynamic, focus, function: self };
        let result = (self.body)(&call, &converted)?;
        if let Some(key) = key {
            dynamic.cache_result(key, result.clone());
        }
        Ok(result)
    }

    /// Function conversion: atomize where an atomic type is declared, cast untyped values to
    /// the declared type, promote anyURI to string, then check cardinality and item types.
    fn convert_argument(&self, index: usize, arg: Sequence<N>) -> Result<Sequence<N>, Error> {
        let Some(ty) = self.argument_type(index) else {
            return Ok(arg);
        };
        let mismatch = |detail: String| {
            Error::dynamic(
                ErrorCode::MPTY0004,
                format!("argument {} of {}#{}: expected {ty}, {detail}", index + 1, self.name, self.min_arity()),
            )
        };
        if !ty.occurrence.admits(arg.len()) {
            return Err(mismatch(format!("got a sequence of {} items", arg.len())));
        }
        match ty.item {
            ItemType::Item => Ok(arg),
            ItemType::Node => {
                if let Some(other) = arg.iter().find(|i| !i.is_node()) {
                    return Err(mismatch(format!("got {}", other.type_label())));
                }
                Ok(arg)
            }
            expected => {
                debug_assert!(expected.is_atomic());
                let mut out = Vec::with_capacity(arg.len());
                for item in &arg {
                    let atomic = convert_atomic(item.atomize()?, expected)
                        .map_err(|a| mismatch(format!("got {}", a.atomic_type())))?;
                    out.push(Item::Atomic(atomic));
                }
                Ok(Sequence::from_vec(out))
            }
        }
    }
}

/// Coerce one atomized value to an expected atomic item type. `Err` carries the offending
/// value when the coercion is not permitted.
fn convert_atomic(value: AtomicItem, expected: ItemType) -> Result<AtomicItem, AtomicItem> {
    match (expected, &value) {
        (ItemType::AnyAtomic, _) => Ok(value),
        (ItemType::Numeric, AtomicItem::UntypedAtomic(s)) => {
            AtomicType::Decimal.parse(s.trim()).map_err(|_| value.clone())
        }
        (ItemType::Numeric, v) if v.is_numeric() => Ok(value),
        (ItemType::Atomic(t), AtomicItem::UntypedAtomic(_)) => t.cast(&value).map_err(|_| value.clone()),
        (ItemType::Atomic(AtomicType::String), AtomicItem::AnyUri(s)) => Ok(AtomicItem::String(s.clone())),
        (ItemType::Atomic(AtomicType::Decimal), AtomicItem::Integer(_)) => Ok(value),
        (ItemType::Atomic(t), v) if v.atomic_type() == t => Ok(value),
        _ => Err(value),
    }
}

pub struct FunctionBuilder<N> {
    name: ExpandedName,
    arguments: Vec<Argument>,
    unbounded: bool,
    result: SequenceType,
    properties: Vec<FunctionProperty>,
    body: Option<FunctionImpl<N>>,
}

impl<N: MetapathNode> FunctionBuilder<N> {
    pub fn argument(mut self, name: impl Into<String>, ty: SequenceType) -> Self {
        self.arguments.push(Argument { name: name.into(), ty });
        self
    }

    /// The last declared argument may repeat any number of additional times.
    pub fn unbounded(mut self) -> Self {
        self.unbounded = true;
        self
    }

    pub fn returns(mut self, ty: SequenceType) -> Self {
        self.result = ty;
        self
    }

    pub fn property(mut self, property: FunctionProperty) -> Self {
        if !self.properties.contains(&property) {
            self.properties.push(property);
        }
        self
    }

    pub fn nondeterministic(mut self) -> Self {
        self.properties.retain(|p| *p != FunctionProperty::Deterministic);
        self
    }

    pub fn focus_dependent(self) -> Self {
        self.property(FunctionProperty::FocusDependent)
    }

    pub fn context_dependent(self) -> Self {
        self.property(FunctionProperty::ContextDependent)
    }

    pub fn body<F>(mut self, f: F) -> Self
    where
        F: Fn(&CallContext<'_, N>, &[Sequence<N>]) -> Result<Sequence<N>, Error> + Send + Sync + 'static,
    {
        self.body = Some(Arc::new(f));
        self
    }

    pub fn build(self) -> Result<Function<N>, Error> {
        let body = self.body.ok_or_else(|| {
            Error::static_err(ErrorCode::FOER0000, format!("function {} has no implementation", self.name))
        })?;
        if self.unbounded && self.arguments.is_empty() {
            return Err(Error::static_err(
                ErrorCode::FOER0000,
                format!("unbounded function {} must declare at least one argument", self.name),
            ));
        }
        Ok(Function {
            name: self.name,
            arguments: self.arguments,
            unbounded: self.unbounded,
            result: self.result,
            properties: self.properties,
            body,
        })
    }
}

/// Functions of one name: at most one per fixed arity plus at most one unbounded function.
struct ArityBucket<N> {
    fixed: HashMap<usize, Arc<Function<N>>>,
    unbounded: Option<Arc<Function<N>>>,
}

impl<N> Default for ArityBucket<N> {
    fn default() -> Self {
        Self { fixed: HashMap::new(), unbounded: None }
    }
}

impl<N: MetapathNode> ArityBucket<N> {
    fn get(&self, arity: usize) -> Option<Arc<Function<N>>> {
        self.fixed
            .get(&arity)
            .or_else(|| self.unbounded.as_ref().filter(|f| arity > f.min_arity()))
            .cloned()
    }

    fn occupant(&self, function: &Function<N>) -> Option<&Arc<Function<N>>> {
        self.fixed
            .get(&function.min_arity())
            .or_else(|| self.unbounded.as_ref().filter(|_| function.is_unbounded()))
    }

    fn insert(&mut self, function: Arc<Function<N>>) {
        if function.is_unbounded() {
            self.unbounded = Some(Arc::clone(&function));
        }
        self.fixed.insert(function.min_arity(), function);
    }
}

/// Registry of callable functions indexed by (qualified name, arity) and (local name, arity).
///
/// Built once and shared by reference through the static context.
pub struct FunctionLibrary<N> {
    by_qname: HashMap<ExpandedName, ArityBucket<N>>,
    by_local: HashMap<String, ArityBucket<N>>,
}

impl<N> fmt::Debug for FunctionLibrary<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FunctionLibrary").field("names", &self.by_qname.len()).finish()
    }
}

impl<N: MetapathNode> Default for FunctionLibrary<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<N: MetapathNode> FunctionLibrary<N> {
    /// An empty library.
    pub fn new() -> Self {
        Self { by_qname: HashMap::new(), by_local: HashMap::new() }
    }

    /// The standard `fn:` and `xs:` function library.
    pub fn standard() -> Self {
        let mut lib = Self::new();
        standard::register_all(&mut lib);
        lib
    }

    /// Register a function. Registering a second function with the same qualified name and
    /// arity (or a second unbounded function of the same name) is an error.
    pub fn register(&mut self, function: Function<N>) -> Result<(), Error> {
        let bucket = self.by_qname.entry(function.name.clone()).or_default();
        if bucket.occupant(&function).is_some() {
            return Err(Error::static_err(
                ErrorCode::MPST0034,
                format!("function {}#{} is already registered", function.name, function.min_arity()),
            ));
        }
        let function = Arc::new(function);
        bucket.insert(Arc::clone(&function));

        let local = self.by_local.entry(function.name.local.clone()).or_default();
        match local.occupant(&function) {
            Some(existing) if existing.name.ns_uri.as_deref() == Some(FNS) => {
                trace!(function = %function.name, "local name already taken by a standard function");
            }
            Some(existing) => {
                warn!(
                    replaced = %existing.name,
                    by = %function.name,
                    arity = function.min_arity(),
                    "function shadows an earlier registration for its local name"
                );
                local.insert(function);
            }
            None => local.insert(function),
        }
        Ok(())
    }

    pub fn lookup(&self, name: &ExpandedName, arity: usize) -> Option<Arc<Function<N>>> {
        self.by_qname.get(name).and_then(|b| b.get(arity))
    }

    pub fn lookup_local(&self, local: &str, arity: usize) -> Option<Arc<Function<N>>> {
        self.by_local.get(local).and_then(|b| b.get(arity))
    }

    /// Like [`Self::lookup`], raising the static "no function match" error on a miss.
    pub fn resolve(&self, name: &ExpandedName, arity: usize) -> Result<Arc<Function<N>>, Error> {
        self.lookup(name, arity).ok_or_else(|| no_match(&name.to_string(), arity))
    }

    pub fn resolve_local(&self, local: &str, arity: usize) -> Result<Arc<Function<N>>, Error> {
        self.lookup_local(local, arity).ok_or_else(|| no_match(local, arity))
    }

    pub fn len(&self) -> usize {
        self.by_qname.values().map(|b| b.fixed.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.by_qname.is_empty()
    }
}

fn no_match(name: &str, arity: usize) -> Error {
    Error::static_err(ErrorCode::MPST0017, format!("no function {name} with arity {arity} is defined"))
}
