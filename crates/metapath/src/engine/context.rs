use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, FixedOffset};
use dashmap::DashMap;
use url::Url;

use crate::consts::{FNS, MATH, MP, XML_URI, XS};
use crate::engine::error::{Error, ErrorCode};
use crate::engine::functions::FunctionLibrary;
use crate::engine::loader::{CachingDocumentLoader, DocumentLoader};
use crate::model::MetapathNode;
use crate::xdm::{ExpandedName, Sequence};

/// Switchable evaluation features.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Feature {
    /// Apply predicates; when disabled `base[...]` yields `base` unfiltered.
    PredicateEvaluation,
}

/// Feature configuration of an evaluation session. Every feature is enabled by default.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Configuration {
    disabled: HashSet<Feature>,
}

impl Configuration {
    pub fn is_enabled(&self, feature: Feature) -> bool {
        !self.disabled.contains(&feature)
    }

    pub fn enable(mut self, feature: Feature) -> Self {
        self.disabled.remove(&feature);
        self
    }

    pub fn disable(mut self, feature: Feature) -> Self {
        self.disabled.insert(feature);
        self
    }
}

/// Compile-time environment: base URI, namespace bindings and the function library used to
/// resolve calls.
pub struct StaticContext<N> {
    base_uri: Option<Url>,
    namespaces: HashMap<String, String>,
    functions: Arc<FunctionLibrary<N>>,
}

impl<N> Clone for StaticContext<N> {
    fn clone(&self) -> Self {
        Self {
            base_uri: self.base_uri.clone(),
            namespaces: self.namespaces.clone(),
            functions: Arc::clone(&self.functions),
        }
    }
}

impl<N> fmt::Debug for StaticContext<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StaticContext")
            .field("base_uri", &self.base_uri)
            .field("namespaces", &self.namespaces)
            .finish_non_exhaustive()
    }
}

impl<N: MetapathNode> Default for StaticContext<N> {
    fn default() -> Self {
        StaticContextBuilder::new().build()
    }
}

impl<N: MetapathNode> StaticContext<N> {
    pub fn builder() -> StaticContextBuilder<N> {
        StaticContextBuilder::new()
    }

    pub fn base_uri(&self) -> Option<&Url> {
        self.base_uri.as_ref()
    }

    pub fn namespace_uri(&self, prefix: &str) -> Option<&str> {
        self.namespaces.get(prefix).map(String::as_str)
    }

    pub fn functions(&self) -> &FunctionLibrary<N> {
        &self.functions
    }

    /// Expand a `prefix:local` name using the namespace bindings.
    pub fn expand_prefixed(&self, lexical: &str) -> Result<ExpandedName, Error> {
        match lexical.split_once(':') {
            Some((prefix, local)) => {
                let uri = self.namespace_uri(prefix).ok_or_else(|| {
                    Error::static_err(
                        ErrorCode::MPST0081,
                        format!("the namespace prefix '{prefix}' is not bound"),
                    )
                })?;
                Ok(ExpandedName::ns(uri, local))
            }
            None => Ok(ExpandedName::local(lexical)),
        }
    }

    /// Start configuring an evaluation session for expressions compiled in this context.
    pub fn dynamic_context(&self) -> DynamicContextBuilder<N> {
        DynamicContextBuilder::new(self.clone())
    }
}

pub struct StaticContextBuilder<N> {
    base_uri: Option<Url>,
    namespaces: HashMap<String, String>,
    functions: Option<Arc<FunctionLibrary<N>>>,
}

impl<N: MetapathNode> Default for StaticContextBuilder<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<N: MetapathNode> StaticContextBuilder<N> {
    /// A builder pre-seeded with the well-known prefixes `xs`, `fn`, `math`, `mp` and `xml`.
    pub fn new() -> Self {
        let namespaces = [("xs", XS), ("fn", FNS), ("math", MATH), ("mp", MP), ("xml", XML_URI)]
            .into_iter()
            .map(|(p, u)| (p.to_string(), u.to_string()))
            .collect();
        Self { base_uri: None, namespaces, functions: None }
    }

    pub fn with_base_uri(mut self, uri: Url) -> Self {
        self.base_uri = Some(uri);
        self
    }

    /// Bind a prefix, replacing an existing binding of the same prefix.
    pub fn with_namespace(mut self, prefix: impl Into<String>, uri: impl Into<String>) -> Self {
        self.namespaces.insert(prefix.into(), uri.into());
        self
    }

    pub fn with_functions(mut self, functions: Arc<FunctionLibrary<N>>) -> Self {
        self.functions = Some(functions);
        self
    }

    pub fn build(self) -> StaticContext<N> {
        StaticContext {
            base_uri: self.base_uri,
            namespaces: self.namespaces,
            functions: self.functions.unwrap_or_else(|| Arc::new(FunctionLibrary::standard())),
        }
    }
}

/// Cache key of a memoized function result: function name, arity and argument values.
pub(crate) type CallKey<N> = (ExpandedName, usize, Vec<Sequence<N>>);

/// Session state shared by a dynamic context and every sub-context derived from it.
struct SessionState<N> {
    static_context: StaticContext<N>,
    current_date_time: DateTime<FixedOffset>,
    implicit_timezone: FixedOffset,
    documents: Option<CachingDocumentLoader<N>>,
    function_results: DashMap<CallKey<N>, Sequence<N>>,
    configuration: Configuration,
}

/// Evaluation-time environment.
///
/// Cloning (or [`DynamicContext::sub_context`]) copies the variable bindings on write and
/// shares the session state (clock, caches, configuration).
pub struct DynamicContext<N> {
    variables: Arc<HashMap<ExpandedName, Sequence<N>>>,
    position: Option<(usize, usize)>,
    session: Arc<SessionState<N>>,
}

impl<N> Clone for DynamicContext<N> {
    fn clone(&self) -> Self {
        Self {
            variables: Arc::clone(&self.variables),
            position: self.position,
            session: Arc::clone(&self.session),
        }
    }
}

impl<N: MetapathNode> fmt::Debug for DynamicContext<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DynamicContext")
            .field("variables", &self.variables.keys().collect::<Vec<_>>())
            .field("current_date_time", &self.session.current_date_time)
            .field("configuration", &self.session.configuration)
            .finish_non_exhaustive()
    }
}

impl<N: MetapathNode> Default for DynamicContext<N> {
    fn default() -> Self {
        DynamicContextBuilder::new(StaticContext::default()).build()
    }
}

impl<N: MetapathNode> DynamicContext<N> {
    pub fn static_context(&self) -> &StaticContext<N> {
        &self.session.static_context
    }

    /// The date-time captured when the session was built; stable for the whole session.
    pub fn current_date_time(&self) -> DateTime<FixedOffset> {
        self.session.current_date_time
    }

    pub fn implicit_timezone(&self) -> FixedOffset {
        self.session.implicit_timezone
    }

    pub fn configuration(&self) -> &Configuration {
        &self.session.configuration
    }

    pub fn documents(&self) -> Option<&CachingDocumentLoader<N>> {
        self.session.documents.as_ref()
    }

    pub fn variable(&self, name: &ExpandedName) -> Result<Sequence<N>, Error> {
        self.variables.get(name).cloned().ok_or_else(|| {
            Error::dynamic(ErrorCode::MPDY0002, format!("variable ${name} is not bound"))
        })
    }

    /// A context with its own copy of the variable bindings, sharing all session state.
    pub fn sub_context(&self) -> Self {
        self.clone()
    }

    pub fn bind_variable(&mut self, name: ExpandedName, value: Sequence<N>) {
        Arc::make_mut(&mut self.variables).insert(name, value);
    }

    /// Position and size of the item currently being filtered by a predicate.
    pub fn focus_position(&self) -> Option<(usize, usize)> {
        self.position
    }

    pub(crate) fn with_focus_position(&self, position: usize, size: usize) -> Self {
        let mut ctx = self.clone();
        ctx.position = Some((position, size));
        ctx
    }

    pub(crate) fn cached_result(&self, key: &CallKey<N>) -> Option<Sequence<N>> {
        self.session.function_results.get(key).map(|entry| entry.value().clone())
    }

    pub(crate) fn cache_result(&self, key: CallKey<N>, value: Sequence<N>) {
        self.session.function_results.insert(key, value);
    }
}

pub struct DynamicContextBuilder<N> {
    static_context: StaticContext<N>,
    current_date_time: Option<DateTime<FixedOffset>>,
    implicit_timezone: Option<FixedOffset>,
    loader: Option<Arc<dyn DocumentLoader<N>>>,
    variables: HashMap<ExpandedName, Sequence<N>>,
    configuration: Configuration,
}

impl<N: MetapathNode> DynamicContextBuilder<N> {
    pub fn new(static_context: StaticContext<N>) -> Self {
        Self {
            static_context,
            current_date_time: None,
            implicit_timezone: None,
            loader: None,
            variables: HashMap::new(),
            configuration: Configuration::default(),
        }
    }

    /// Fix the session's current date-time (defaults to the wall clock at build time).
    pub fn with_current_date_time(mut self, now: DateTime<FixedOffset>) -> Self {
        self.current_date_time = Some(now);
        self
    }

    /// Defaults to the offset of the current date-time.
    pub fn with_implicit_timezone(mut self, tz: FixedOffset) -> Self {
        self.implicit_timezone = Some(tz);
        self
    }

    pub fn with_document_loader(mut self, loader: Arc<dyn DocumentLoader<N>>) -> Self {
        self.loader = Some(loader);
        self
    }

    pub fn with_variable(mut self, name: impl Into<ExpandedName>, value: impl Into<Sequence<N>>) -> Self {
        self.variables.insert(name.into(), value.into());
        self
    }

    pub fn with_configuration(mut self, configuration: Configuration) -> Self {
        self.configuration = configuration;
        self
    }

    pub fn build(self) -> DynamicContext<N> {
        let implicit_timezone = self
            .implicit_timezone
            .or_else(|| self.current_date_time.map(|now| *now.offset()))
            .unwrap_or_else(|| *chrono::Local::now().fixed_offset().offset());
        let current_date_time = self
            .current_date_time
            .unwrap_or_else(|| chrono::Utc::now().with_timezone(&implicit_timezone));
        let documents = self
            .loader
            .map(|loader| CachingDocumentLoader::new(loader, self.static_context.base_uri().cloned()));
        DynamicContext {
            variables: Arc::new(self.variables),
            position: None,
            session: Arc::new(SessionState {
                static_context: self.static_context,
                current_date_time,
                implicit_timezone,
                documents,
                function_results: DashMap::new(),
                configuration: self.configuration,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::simple::SimpleNode;
    use crate::xdm::AtomicItem;
    use rstest::rstest;

    #[rstest]
    fn well_known_prefixes_are_bound_and_overridable() {
        let sc: StaticContext<SimpleNode> = StaticContext::default();
        assert_eq!(sc.namespace_uri("fn"), Some(FNS));
        assert_eq!(sc.namespace_uri("xs"), Some(XS));
        let sc: StaticContext<SimpleNode> =
            StaticContext::builder().with_namespace("fn", "urn:other").build();
        assert_eq!(sc.namespace_uri("fn"), Some("urn:other"));
        assert_eq!(sc.namespace_uri("mp"), Some(MP));
    }

    #[rstest]
    fn unknown_prefix_is_a_static_error() {
        let sc: StaticContext<SimpleNode> = StaticContext::default();
        let err = sc.expand_prefixed("zz:a").unwrap_err();
        assert_eq!(err.code, ErrorCode::MPST0081);
        assert!(err.is_static());
    }

    #[rstest]
    fn sub_context_bindings_do_not_leak_upward() {
        let mut parent: DynamicContext<SimpleNode> = DynamicContext::default();
        parent.bind_variable(ExpandedName::local("a"), Sequence::from(AtomicItem::Integer(1)));
        let mut child = parent.sub_context();
        child.bind_variable(ExpandedName::local("b"), Sequence::from(AtomicItem::Integer(2)));
        assert!(child.variable(&ExpandedName::local("a")).is_ok());
        assert!(child.variable(&ExpandedName::local("b")).is_ok());
        assert_eq!(
            parent.variable(&ExpandedName::local("b")).unwrap_err().code,
            ErrorCode::MPDY0002
        );
        assert_eq!(parent.current_date_time(), child.current_date_time());
    }

    #[rstest]
    fn current_date_time_is_fixed() {
        let ctx: DynamicContext<SimpleNode> = DynamicContext::default();
        let first = ctx.current_date_time();
        std::thread::sleep(std::time::Duration::from_millis(5));
        assert_eq!(ctx.sub_context().current_date_time(), first);
    }

    #[rstest]
    fn predicate_evaluation_is_switchable() {
        let config = Configuration::default();
        assert!(config.is_enabled(Feature::PredicateEvaluation));
        let config = config.disable(Feature::PredicateEvaluation);
        assert!(!config.is_enabled(Feature::PredicateEvaluation));
        assert!(config.enable(Feature::PredicateEvaluation).is_enabled(Feature::PredicateEvaluation));
    }
}
