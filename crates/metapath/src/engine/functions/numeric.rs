use super::CallContext;
use super::arithmetic::{ArithmeticOp, arithmetic};
use super::common::{opt_atomic, round_half_up};
use super::comparison::value_compare;
use crate::engine::error::{Error, ErrorCode};
use crate::model::MetapathNode;
use crate::parser::ast::ComparisonOperator;
use crate::xdm::{AtomicItem, AtomicType, Item, Sequence};

fn map_numeric<N: MetapathNode>(
    args: &[Sequence<N>],
    on_integer: impl Fn(i64) -> Option<i64>,
    on_decimal: impl Fn(rust_decimal::Decimal) -> rust_decimal::Decimal,
) -> Result<Sequence<N>, Error> {
    match opt_atomic(&args[0]) {
        None => Ok(Sequence::empty()),
        Some(AtomicItem::Integer(i)) => on_integer(*i)
            .map(|v| Sequence::from(AtomicItem::Integer(v)))
            .ok_or_else(|| Error::dynamic(ErrorCode::FOAR0002, format!("numeric overflow for {i}"))),
        Some(AtomicItem::Decimal(d)) => Ok(Sequence::from(AtomicItem::decimal(on_decimal(*d)))),
        Some(other) => Err(Error::dynamic(
            ErrorCode::MPTY0004,
            format!("expected a numeric value, got {}", other.atomic_type()),
        )),
    }
}

pub(super) fn abs_fn<N: MetapathNode>(_ctx: &CallContext<'_, N>, args: &[Sequence<N>]) -> Result<Sequence<N>, Error> {
    map_numeric(args, i64::checked_abs, |d| d.abs())
}

pub(super) fn ceiling_fn<N: MetapathNode>(_ctx: &CallContext<'_, N>, args: &[Sequence<N>]) -> Result<Sequence<N>, Error> {
    map_numeric(args, Some, |d| d.ceil())
}

pub(super) fn floor_fn<N: MetapathNode>(_ctx: &CallContext<'_, N>, args: &[Sequence<N>]) -> Result<Sequence<N>, Error> {
    map_numeric(args, Some, |d| d.floor())
}

pub(super) fn round_fn<N: MetapathNode>(_ctx: &CallContext<'_, N>, args: &[Sequence<N>]) -> Result<Sequence<N>, Error> {
    map_numeric(args, Some, round_half_up)
}

/// Atomized values with untyped atomics read as decimals, as aggregate functions expect.
fn aggregate_values<N: MetapathNode>(arg: &Sequence<N>) -> Result<Vec<AtomicItem>, Error> {
    arg.iter()
        .filter_map(Item::as_atomic)
        .map(|a| match a {
            AtomicItem::UntypedAtomic(_) => AtomicType::Decimal.cast(a),
            other => Ok(other.clone()),
        })
        .collect()
}

fn total<N: MetapathNode>(ctx: &CallContext<'_, N>, values: &[AtomicItem]) -> Result<Option<AtomicItem>, Error> {
    let tz = ctx.dynamic.implicit_timezone();
    let mut iter = values.iter();
    let Some(first) = iter.next() else {
        return Ok(None);
    };
    iter.try_fold(first.clone(), |acc, v| arithmetic(ArithmeticOp::Add, &acc, v, tz)).map(Some)
}

pub(super) fn sum_fn<N: MetapathNode>(ctx: &CallContext<'_, N>, args: &[Sequence<N>]) -> Result<Sequence<N>, Error> {
    let values = aggregate_values(&args[0])?;
    let sum = total(ctx, &values)?.unwrap_or(AtomicItem::Integer(0));
    if values.len() == 1 && !(sum.is_numeric() || sum.atomic_type().is_duration()) {
        return Err(Error::dynamic(
            ErrorCode::MPTY0004,
            format!("fn:sum is not defined for {}", sum.atomic_type()),
        ));
    }
    Ok(Sequence::from(sum))
}

pub(super) fn avg_fn<N: MetapathNode>(ctx: &CallContext<'_, N>, args: &[Sequence<N>]) -> Result<Sequence<N>, Error> {
    let values = aggregate_values(&args[0])?;
    let Some(sum) = total(ctx, &values)? else {
        return Ok(Sequence::empty());
    };
    let count = AtomicItem::Integer(i64::try_from(values.len()).unwrap_or(i64::MAX));
    Ok(Sequence::from(arithmetic(ArithmeticOp::Divide, &sum, &count, ctx.dynamic.implicit_timezone())?))
}

fn extreme<N: MetapathNode>(
    ctx: &CallContext<'_, N>,
    args: &[Sequence<N>],
    replace_when: ComparisonOperator,
) -> Result<Sequence<N>, Error> {
    let tz = ctx.dynamic.implicit_timezone();
    let mut best: Option<AtomicItem> = None;
    for value in aggregate_values(&args[0])? {
        let replace = match &best {
            Some(current) => value_compare(&value, replace_when, current, tz)?,
            None => true,
        };
        if replace {
            best = Some(value);
        }
    }
    Ok(Sequence::of(best.map(Item::Atomic)))
}

pub(super) fn min_fn<N: MetapathNode>(ctx: &CallContext<'_, N>, args: &[Sequence<N>]) -> Result<Sequence<N>, Error> {
    extreme(ctx, args, ComparisonOperator::Lt)
}

pub(super) fn max_fn<N: MetapathNode>(ctx: &CallContext<'_, N>, args: &[Sequence<N>]) -> Result<Sequence<N>, Error> {
    extreme(ctx, args, ComparisonOperator::Gt)
}
