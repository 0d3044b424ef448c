use super::CallContext;
use super::common::{boolean, node_or_context, string};
use crate::engine::error::Error;
use crate::model::MetapathNode;
use crate::xdm::{Item, Sequence};

pub(super) fn data_fn<N: MetapathNode>(ctx: &CallContext<'_, N>, args: &[Sequence<N>]) -> Result<Sequence<N>, Error> {
    let input = match args.first() {
        Some(arg) => arg.clone(),
        None => Sequence::from(ctx.context_item()?.clone()),
    };
    input.iter().map(|i| i.atomize().map(Item::Atomic)).collect()
}

pub(super) fn name_fn<N: MetapathNode>(ctx: &CallContext<'_, N>, args: &[Sequence<N>]) -> Result<Sequence<N>, Error> {
    let name = node_or_context(ctx, args)?.and_then(|n| n.name()).map(|n| n.local).unwrap_or_default();
    Ok(string(name))
}

pub(super) fn root_fn<N: MetapathNode>(ctx: &CallContext<'_, N>, args: &[Sequence<N>]) -> Result<Sequence<N>, Error> {
    Ok(Sequence::of(node_or_context(ctx, args)?.map(|n| Item::Node(n.root()))))
}

pub(super) fn path_fn<N: MetapathNode>(ctx: &CallContext<'_, N>, args: &[Sequence<N>]) -> Result<Sequence<N>, Error> {
    Ok(node_or_context(ctx, args)?.map(|n| string(n.location())).unwrap_or_default())
}

pub(super) fn has_children_fn<N: MetapathNode>(
    ctx: &CallContext<'_, N>,
    args: &[Sequence<N>],
) -> Result<Sequence<N>, Error> {
    let has = node_or_context(ctx, args)?.is_some_and(|n| !n.model_children().is_empty());
    Ok(boolean(has))
}
