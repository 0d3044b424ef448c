//! Document loading contract and the session-level caching decorator.

use std::fmt;
use std::sync::Arc;

use dashmap::DashMap;
use tracing::debug;
use url::Url;

use crate::engine::error::{Error, ErrorCode};
use crate::model::MetapathNode;

/// Loads external documents referenced by `fn:doc` and friends.
pub trait DocumentLoader<N>: Send + Sync {
    /// Load the document at an absolute URI and return its document node.
    fn load(&self, uri: &Url) -> Result<N, Error>;

    /// Loader-specific URI resolution applied after resolving against the static base URI.
    fn resolve(&self, uri: Url) -> Result<Url, Error> {
        Ok(uri)
    }
}

impl<N, F> DocumentLoader<N> for F
where
    F: Fn(&Url) -> Result<N, Error> + Send + Sync,
{
    fn load(&self, uri: &Url) -> Result<N, Error> {
        self(uri)
    }
}

/// Wraps a [`DocumentLoader`] with URI resolution and a per-session cache keyed by absolute URI.
pub struct CachingDocumentLoader<N> {
    loader: Arc<dyn DocumentLoader<N>>,
    base_uri: Option<Url>,
    cache: DashMap<Url, N>,
}

impl<N> fmt::Debug for CachingDocumentLoader<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CachingDocumentLoader")
            .field("base_uri", &self.base_uri)
            .field("cached", &self.cache.len())
            .finish_non_exhaustive()
    }
}

impl<N: MetapathNode> CachingDocumentLoader<N> {
    pub fn new(loader: Arc<dyn DocumentLoader<N>>, base_uri: Option<Url>) -> Self {
        Self { loader, base_uri, cache: DashMap::new() }
    }

    /// Resolve a possibly relative reference: first against the base URI, then through the
    /// wrapped loader's resolver.
    pub fn resolve(&self, uri: &str) -> Result<Url, Error> {
        let absolute = match &self.base_uri {
            Some(base) => base.join(uri),
            None => Url::parse(uri),
        }
        .map_err(|e| {
            Error::dynamic(ErrorCode::FODC0005, format!("invalid document URI '{uri}': {e}"))
                .with_source(Some(Arc::new(e) as Arc<dyn std::error::Error + Send + Sync>))
        })?;
        self.loader.resolve(absolute)
    }

    /// Load (or fetch from cache) the document at `uri`.
    pub fn load_as_node_item(&self, uri: &str) -> Result<N, Error> {
        let absolute = self.resolve(uri)?;
        if let Some(hit) = self.cache.get(&absolute) {
            return Ok(hit.value().clone());
        }
        debug!(uri = %absolute, "loading document");
        let node = self.loader.load(&absolute)?;
        // a concurrent load of the same URI keeps the first stored node
        Ok(self.cache.entry(absolute).or_insert(node).value().clone())
    }

    pub fn is_cached(&self, uri: &Url) -> bool {
        self.cache.contains_key(uri)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::simple::{SimpleNode, doc};
    use rstest::rstest;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Counting {
        loads: AtomicUsize,
    }

    impl DocumentLoader<SimpleNode> for Counting {
        fn load(&self, uri: &Url) -> Result<SimpleNode, Error> {
            self.loads.fetch_add(1, Ordering::SeqCst);
            Ok(doc().uri(uri.clone()).build())
        }
    }

    #[rstest]
    fn relative_uris_resolve_against_base_and_are_cached() {
        let counting = Arc::new(Counting { loads: AtomicUsize::new(0) });
        let base = Url::parse("file:///data/").unwrap();
        let loader = CachingDocumentLoader::new(counting.clone(), Some(base));
        let a = loader.load_as_node_item("a.json").unwrap();
        let b = loader.load_as_node_item("file:///data/a.json").unwrap();
        assert_eq!(a, b);
        assert_eq!(counting.loads.load(Ordering::SeqCst), 1);
        assert!(loader.is_cached(&Url::parse("file:///data/a.json").unwrap()));
    }

    #[rstest]
    fn relative_uri_without_base_is_invalid() {
        let loader: CachingDocumentLoader<SimpleNode> =
            CachingDocumentLoader::new(Arc::new(|_: &Url| -> Result<SimpleNode, Error> { Ok(doc().build()) }), None);
        assert_eq!(loader.load_as_node_item("a.json").unwrap_err().code, ErrorCode::FODC0005);
    }
}
