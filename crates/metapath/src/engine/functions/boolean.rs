use super::CallContext;
use super::common::{boolean, ebv};
use crate::engine::error::Error;
use crate::model::MetapathNode;
use crate::xdm::Sequence;

pub(super) fn true_fn<N: MetapathNode>(_ctx: &CallContext<'_, N>, _args: &[Sequence<N>]) -> Result<Sequence<N>, Error> {
    Ok(boolean(true))
}

pub(super) fn false_fn<N: MetapathNode>(_ctx: &CallContext<'_, N>, _args: &[Sequence<N>]) -> Result<Sequence<N>, Error> {
    Ok(boolean(false))
}

pub(super) fn not_fn<N: MetapathNode>(_ctx: &CallContext<'_, N>, args: &[Sequence<N>]) -> Result<Sequence<N>, Error> {
    Ok(boolean(!ebv(&args[0])?))
}

pub(super) fn boolean_fn<N: MetapathNode>(_ctx: &CallContext<'_, N>, args: &[Sequence<N>]) -> Result<Sequence<N>, Error> {
    Ok(boolean(ebv(&args[0])?))
}
