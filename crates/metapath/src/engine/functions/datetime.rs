use chrono::{Datelike, NaiveDate, TimeDelta};

use super::CallContext;
use super::common::{integer, opt_atomic};
use crate::engine::error::{Error, ErrorCode};
use crate::model::MetapathNode;
use crate::xdm::{AtomicItem, Sequence};

pub(super) fn current_date_time_fn<N: MetapathNode>(
    ctx: &CallContext<'_, N>,
    _args: &[Sequence<N>],
) -> Result<Sequence<N>, Error> {
    let now = ctx.dynamic.current_date_time();
    Ok(Sequence::from(AtomicItem::DateTime { value: now.naive_local(), tz: Some(*now.offset()) }))
}

pub(super) fn current_date_fn<N: MetapathNode>(
    ctx: &CallContext<'_, N>,
    _args: &[Sequence<N>],
) -> Result<Sequence<N>, Error> {
    let now = ctx.dynamic.current_date_time();
    Ok(Sequence::from(AtomicItem::Date { date: now.date_naive(), tz: Some(*now.offset()) }))
}

pub(super) fn implicit_timezone_fn<N: MetapathNode>(
    ctx: &CallContext<'_, N>,
    _args: &[Sequence<N>],
) -> Result<Sequence<N>, Error> {
    let offset = ctx.dynamic.implicit_timezone().local_minus_utc();
    Ok(Sequence::from(AtomicItem::DayTimeDuration(TimeDelta::seconds(i64::from(offset)))))
}

fn date_component<N: MetapathNode>(args: &[Sequence<N>], component: impl Fn(&NaiveDate) -> i64) -> Sequence<N> {
    match opt_atomic(&args[0]) {
        Some(AtomicItem::Date { date, .. }) => integer(component(date)),
        _ => Sequence::empty(),
    }
}

pub(super) fn year_from_date_fn<N: MetapathNode>(
    _ctx: &CallContext<'_, N>,
    args: &[Sequence<N>],
) -> Result<Sequence<N>, Error> {
    Ok(date_component(args, |d| i64::from(d.year())))
}

pub(super) fn month_from_date_fn<N: MetapathNode>(
    _ctx: &CallContext<'_, N>,
    args: &[Sequence<N>],
) -> Result<Sequence<N>, Error> {
    Ok(date_component(args, |d| i64::from(d.month())))
}

pub(super) fn day_from_date_fn<N: MetapathNode>(
    _ctx: &CallContext<'_, N>,
    args: &[Sequence<N>],
) -> Result<Sequence<N>, Error> {
    Ok(date_component(args, |d| i64::from(d.day())))
}

fn not_a_duration(other: &AtomicItem) -> Error {
    Error::dynamic(ErrorCode::MPTY0004, format!("expected a duration, got {}", other.atomic_type()))
}

pub(super) fn years_from_duration_fn<N: MetapathNode>(
    _ctx: &CallContext<'_, N>,
    args: &[Sequence<N>],
) -> Result<Sequence<N>, Error> {
    match opt_atomic(&args[0]) {
        None => Ok(Sequence::empty()),
        Some(AtomicItem::YearMonthDuration(months)) => Ok(integer(i64::from(months / 12))),
        Some(AtomicItem::DayTimeDuration(_)) => Ok(integer(0)),
        Some(other) => Err(not_a_duration(other)),
    }
}

pub(super) fn days_from_duration_fn<N: MetapathNode>(
    _ctx: &CallContext<'_, N>,
    args: &[Sequence<N>],
) -> Result<Sequence<N>, Error> {
    match opt_atomic(&args[0]) {
        None => Ok(Sequence::empty()),
        Some(AtomicItem::DayTimeDuration(d)) => Ok(integer(d.num_days())),
        Some(AtomicItem::YearMonthDuration(_)) => Ok(integer(0)),
        Some(other) => Err(not_a_duration(other)),
    }
}
