use rust_decimal::Decimal;

use super::CallContext;
use super::common::{boolean, decimal_arg, integer, round_half_up};
use super::comparison::value_compare;
use crate::engine::error::{Error, ErrorCode};
use crate::model::MetapathNode;
use crate::parser::ast::ComparisonOperator;
use crate::xdm::{AtomicItem, Item, Sequence};

pub(super) fn count_fn<N: MetapathNode>(_ctx: &CallContext<'_, N>, args: &[Sequence<N>]) -> Result<Sequence<N>, Error> {
    Ok(integer(i64::try_from(args[0].len()).unwrap_or(i64::MAX)))
}

pub(super) fn empty_fn<N: MetapathNode>(_ctx: &CallContext<'_, N>, args: &[Sequence<N>]) -> Result<Sequence<N>, Error> {
    Ok(boolean(args[0].is_empty()))
}

pub(super) fn exists_fn<N: MetapathNode>(_ctx: &CallContext<'_, N>, args: &[Sequence<N>]) -> Result<Sequence<N>, Error> {
    Ok(boolean(!args[0].is_empty()))
}

pub(super) fn head_fn<N: MetapathNode>(_ctx: &CallContext<'_, N>, args: &[Sequence<N>]) -> Result<Sequence<N>, Error> {
    Ok(Sequence::of(args[0].first().cloned()))
}

pub(super) fn tail_fn<N: MetapathNode>(_ctx: &CallContext<'_, N>, args: &[Sequence<N>]) -> Result<Sequence<N>, Error> {
    Ok(args[0].iter().skip(1).cloned().collect())
}

pub(super) fn reverse_fn<N: MetapathNode>(_ctx: &CallContext<'_, N>, args: &[Sequence<N>]) -> Result<Sequence<N>, Error> {
    Ok(args[0].iter().rev().cloned().collect())
}

pub(super) fn subsequence_fn<N: MetapathNode>(
    _ctx: &CallContext<'_, N>,
    args: &[Sequence<N>],
) -> Result<Sequence<N>, Error> {
    let start = decimal_arg(&args[1]).map(round_half_up).unwrap_or(Decimal::ONE);
    let end = match args.get(2) {
        Some(length) => decimal_arg(length).map(|l| start + round_half_up(l)),
        None => None,
    };
    Ok(args[0]
        .iter()
        .enumerate()
        .filter(|(index, _)| {
            let position = Decimal::from(*index) + Decimal::ONE;
            position >= start && end.is_none_or(|end| position < end)
        })
        .map(|(_, item)| item.clone())
        .collect())
}

pub(super) fn distinct_values_fn<N: MetapathNode>(
    ctx: &CallContext<'_, N>,
    args: &[Sequence<N>],
) -> Result<Sequence<N>, Error> {
    let tz = ctx.dynamic.implicit_timezone();
    let mut seen: Vec<AtomicItem> = Vec::new();
    for item in &args[0] {
        let Item::Atomic(value) = item else { continue };
        // values that cannot be compared with each other are distinct
        let duplicate = seen
            .iter()
            .any(|s| value_compare(s, ComparisonOperator::Eq, value, tz).unwrap_or(false));
        if !duplicate {
            seen.push(value.clone());
        }
    }
    Ok(seen.into_iter().map(Item::Atomic).collect())
}

fn cardinality_error(code: ErrorCode, function: &str, expected: &str, len: usize) -> Error {
    Error::dynamic(code, format!("fn:{function} expects {expected}, got {len} items"))
}

pub(super) fn exactly_one_fn<N: MetapathNode>(
    _ctx: &CallContext<'_, N>,
    args: &[Sequence<N>],
) -> Result<Sequence<N>, Error> {
    match args[0].len() {
        1 => Ok(args[0].clone()),
        n => Err(cardinality_error(ErrorCode::FORG0005, "exactly-one", "exactly one item", n)),
    }
}

pub(super) fn one_or_more_fn<N: MetapathNode>(
    _ctx: &CallContext<'_, N>,
    args: &[Sequence<N>],
) -> Result<Sequence<N>, Error> {
    if args[0].is_empty() {
        return Err(cardinality_error(ErrorCode::FORG0004, "one-or-more", "at least one item", 0));
    }
    Ok(args[0].clone())
}

pub(super) fn zero_or_one_fn<N: MetapathNode>(
    _ctx: &CallContext<'_, N>,
    args: &[Sequence<N>],
) -> Result<Sequence<N>, Error> {
    match args[0].len() {
        0 | 1 => Ok(args[0].clone()),
        n => Err(cardinality_error(ErrorCode::FORG0003, "zero-or-one", "at most one item", n)),
    }
}

fn absent_focus(function: &str) -> Error {
    Error::dynamic(ErrorCode::MPDY0002, format!("fn:{function}() requires a focus, but the focus is empty"))
}

pub(super) fn last_fn<N: MetapathNode>(ctx: &CallContext<'_, N>, _args: &[Sequence<N>]) -> Result<Sequence<N>, Error> {
    if let Some((_, size)) = ctx.dynamic.focus_position() {
        return Ok(integer(i64::try_from(size).unwrap_or(i64::MAX)));
    }
    if ctx.focus.is_empty() {
        return Err(absent_focus("last"));
    }
    Ok(integer(i64::try_from(ctx.focus.len()).unwrap_or(i64::MAX)))
}

pub(super) fn position_fn<N: MetapathNode>(
    ctx: &CallContext<'_, N>,
    _args: &[Sequence<N>],
) -> Result<Sequence<N>, Error> {
    if let Some((position, _)) = ctx.dynamic.focus_position() {
        return Ok(integer(i64::try_from(position).unwrap_or(i64::MAX)));
    }
    if ctx.focus.is_empty() {
        return Err(absent_focus("position"));
    }
    Ok(integer(1))
}
