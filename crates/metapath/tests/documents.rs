use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use metapath::model::simple::{SimpleNode, assembly, doc, field};
use metapath::{DocumentLoader, DynamicContext, Error, ErrorCode, Item, StaticContext, compile};
use rstest::{fixture, rstest};
use url::Url;

/// Serves prebuilt trees by absolute URI and counts real loads.
struct InMemoryLoader {
    documents: HashMap<Url, SimpleNode>,
    loads: AtomicUsize,
}

impl DocumentLoader<SimpleNode> for InMemoryLoader {
    fn load(&self, uri: &Url) -> Result<SimpleNode, Error> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        self.documents
            .get(uri)
            .cloned()
            .ok_or_else(|| Error::dynamic(ErrorCode::FODC0002, format!("no document at {uri}")))
    }
}

fn url(s: &str) -> Url {
    Url::parse(s).unwrap()
}

#[fixture]
fn loader() -> Arc<InMemoryLoader> {
    let profile = doc()
        .uri(url("http://example.com/docs/profile.json"))
        .child(assembly("profile").child(field("title", "Baseline")))
        .build();
    let catalog = doc()
        .uri(url("http://example.com/catalogs/catalog.json"))
        .child(assembly("catalog").child(field("title", "Catalog")))
        .build();
    Arc::new(InMemoryLoader {
        documents: HashMap::from([
            (url("http://example.com/docs/profile.json"), profile),
            (url("http://example.com/catalogs/catalog.json"), catalog),
        ]),
        loads: AtomicUsize::new(0),
    })
}

fn session(loader: &Arc<InMemoryLoader>) -> DynamicContext<SimpleNode> {
    let static_ctx = StaticContext::builder().with_base_uri(url("http://example.com/docs/")).build();
    let loader: Arc<dyn DocumentLoader<SimpleNode>> = loader.clone();
    static_ctx.dynamic_context().with_document_loader(loader).build()
}

fn run(src: &str, ctx: &DynamicContext<SimpleNode>) -> Result<Vec<String>, Error> {
    let expr = compile(src, ctx.static_context())?;
    Ok(expr.evaluate(None, Some(ctx))?.iter().map(Item::string_value).collect())
}

#[rstest]
fn relative_references_resolve_against_the_base_uri(loader: Arc<InMemoryLoader>) {
    let ctx = session(&loader);
    assert_eq!(run("doc('profile.json')/profile/title", &ctx).unwrap(), ["Baseline"]);
    assert_eq!(run("doc('../catalogs/catalog.json')/catalog/title", &ctx).unwrap(), ["Catalog"]);
}

#[rstest]
fn documents_are_cached_per_session(loader: Arc<InMemoryLoader>) {
    let ctx = session(&loader);
    run("doc('profile.json'), doc('profile.json'), doc('http://example.com/docs/profile.json')", &ctx).unwrap();
    assert_eq!(loader.loads.load(Ordering::SeqCst), 1);
    let result = compile("doc('profile.json') | doc('profile.json')", ctx.static_context())
        .unwrap()
        .evaluate(None, Some(&ctx))
        .unwrap();
    assert_eq!(result.len(), 1);
}

#[rstest]
fn availability_and_uris(loader: Arc<InMemoryLoader>) {
    let ctx = session(&loader);
    assert_eq!(run("doc-available('profile.json')", &ctx).unwrap(), ["true"]);
    assert_eq!(run("doc-available('missing.json')", &ctx).unwrap(), ["false"]);
    assert_eq!(
        run("document-uri(doc('profile.json'))", &ctx).unwrap(),
        ["http://example.com/docs/profile.json"]
    );
    assert_eq!(
        run("base-uri(doc('profile.json')/profile/title)", &ctx).unwrap(),
        ["http://example.com/docs/profile.json"]
    );
    assert_eq!(run("resolve-uri('x.json')", &ctx).unwrap(), ["http://example.com/docs/x.json"]);
}

#[rstest]
fn missing_documents_and_loaders(loader: Arc<InMemoryLoader>) {
    let ctx = session(&loader);
    assert_eq!(run("doc('missing.json')", &ctx).unwrap_err().code, ErrorCode::FODC0002);

    let bare: DynamicContext<SimpleNode> = DynamicContext::default();
    assert_eq!(run("doc('http://example.com/a.json')", &bare).unwrap_err().code, ErrorCode::FODC0002);

    // without a base URI a relative reference cannot be resolved
    let loader: Arc<dyn DocumentLoader<SimpleNode>> = loader;
    let unresolved = StaticContext::default().dynamic_context().with_document_loader(loader).build();
    assert_eq!(run("doc('profile.json')", &unresolved).unwrap_err().code, ErrorCode::FODC0005);
    assert_eq!(run("doc-available('profile.json')", &unresolved).unwrap(), ["false"]);
}
