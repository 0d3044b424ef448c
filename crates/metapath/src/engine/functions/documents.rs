use tracing::debug;
use url::Url;

use super::CallContext;
use super::common::{boolean, node_or_context, string_arg};
use crate::engine::error::{Error, ErrorCode};
use crate::model::MetapathNode;
use crate::xdm::{AtomicItem, Item, Sequence};

fn load<N: MetapathNode>(ctx: &CallContext<'_, N>, uri: &str) -> Result<N, Error> {
    let loader = ctx.dynamic.documents().ok_or_else(|| {
        Error::dynamic(ErrorCode::FODC0002, format!("cannot load '{uri}': no document loader is configured"))
    })?;
    loader.load_as_node_item(uri)
}

pub(super) fn doc_fn<N: MetapathNode>(ctx: &CallContext<'_, N>, args: &[Sequence<N>]) -> Result<Sequence<N>, Error> {
    if args[0].is_empty() {
        return Ok(Sequence::empty());
    }
    Ok(Sequence::from(Item::Node(load(ctx, &string_arg(&args[0]))?)))
}

pub(super) fn doc_available_fn<N: MetapathNode>(
    ctx: &CallContext<'_, N>,
    args: &[Sequence<N>],
) -> Result<Sequence<N>, Error> {
    if args[0].is_empty() {
        return Ok(boolean(false));
    }
    let uri = string_arg(&args[0]);
    match load(ctx, &uri) {
        Ok(_) => Ok(boolean(true)),
        Err(e) => {
            debug!(%uri, error = %e, "document is not available");
            Ok(boolean(false))
        }
    }
}

fn uri_item<N>(uri: Option<Url>) -> Sequence<N> {
    Sequence::of(uri.map(|u| Item::Atomic(AtomicItem::AnyUri(u.to_string()))))
}

pub(super) fn base_uri_fn<N: MetapathNode>(ctx: &CallContext<'_, N>, args: &[Sequence<N>]) -> Result<Sequence<N>, Error> {
    Ok(uri_item(node_or_context(ctx, args)?.and_then(|n| n.base_uri())))
}

pub(super) fn document_uri_fn<N: MetapathNode>(
    ctx: &CallContext<'_, N>,
    args: &[Sequence<N>],
) -> Result<Sequence<N>, Error> {
    Ok(uri_item(node_or_context(ctx, args)?.and_then(|n| n.document_uri())))
}

fn invalid_uri(what: &str, value: &str, e: &url::ParseError) -> Error {
    Error::dynamic(ErrorCode::FORG0002, format!("invalid {what} '{value}': {e}"))
}

pub(super) fn resolve_uri_fn<N: MetapathNode>(
    ctx: &CallContext<'_, N>,
    args: &[Sequence<N>],
) -> Result<Sequence<N>, Error> {
    if args[0].is_empty() {
        return Ok(Sequence::empty());
    }
    let relative = string_arg(&args[0]);
    let base = match args.get(1) {
        Some(base) => {
            let base = string_arg(base);
            Url::parse(&base).map_err(|e| invalid_uri("base URI", &base, &e))?
        }
        None => match ctx.dynamic.static_context().base_uri() {
            Some(base) => base.clone(),
            None => {
                // without a base only absolute references resolve
                let absolute = Url::parse(&relative).map_err(|e| invalid_uri("URI reference", &relative, &e))?;
                return Ok(uri_item(Some(absolute)));
            }
        },
    };
    let resolved = base.join(&relative).map_err(|e| invalid_uri("URI reference", &relative, &e))?;
    Ok(uri_item(Some(resolved)))
}
