//! Operator functions behind `+ - * div idiv mod` and unary minus.

use chrono::{FixedOffset, NaiveDateTime, NaiveTime, TimeDelta};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};

use crate::engine::error::{Error, ErrorCode};
use crate::xdm::temporal::add_months_saturating;
use crate::xdm::{AtomicItem, decimal64};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArithmeticOp {
    Add,
    Subtract,
    Multiply,
    Divide,
    IntegerDivide,
    Mod,
}

impl ArithmeticOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            ArithmeticOp::Add => "+",
            ArithmeticOp::Subtract => "-",
            ArithmeticOp::Multiply => "*",
            ArithmeticOp::Divide => "div",
            ArithmeticOp::IntegerDivide => "idiv",
            ArithmeticOp::Mod => "mod",
        }
    }
}

fn overflow(op: ArithmeticOp) -> Error {
    Error::dynamic(ErrorCode::FOAR0002, format!("numeric overflow in '{}'", op.symbol()))
}

fn division_by_zero(op: ArithmeticOp) -> Error {
    Error::dynamic(ErrorCode::FOAR0001, format!("division by zero in '{}'", op.symbol()))
}

fn date_overflow(op: ArithmeticOp) -> Error {
    Error::dynamic(ErrorCode::FODT0001, format!("date/time overflow in '{}'", op.symbol()))
}

fn duration_overflow(op: ArithmeticOp) -> Error {
    Error::dynamic(ErrorCode::FODT0002, format!("duration overflow in '{}'", op.symbol()))
}

fn unsupported(op: ArithmeticOp, left: &AtomicItem, right: &AtomicItem) -> Error {
    Error::invalid_types(
        &format!("'{}'", op.symbol()),
        &left.atomic_type().to_string(),
        &right.atomic_type().to_string(),
    )
}

/// Apply a binary arithmetic operator to two atomized operands.
///
/// `implicit_tz` supplies the zone of dates and dateTimes that carry none, for subtraction of
/// two points in time.
pub fn arithmetic(
    op: ArithmeticOp,
    left: &AtomicItem,
    right: &AtomicItem,
    implicit_tz: FixedOffset,
) -> Result<AtomicItem, Error> {
    use AtomicItem as A;
    match (left, right) {
        (A::Integer(l), A::Integer(r)) => integer_op(op, *l, *r),
        (l, r) if l.is_numeric() && r.is_numeric() => {
            let (Some(l), Some(r)) = (l.as_decimal(), r.as_decimal()) else {
                return Err(unsupported(op, left, right));
            };
            decimal_op(op, l, r)
        }

        (A::YearMonthDuration(m), n) | (n, A::YearMonthDuration(m))
            if n.is_numeric() && op == ArithmeticOp::Multiply =>
        {
            scale_months(op, *m, n.as_decimal().unwrap_or_default(), false)
        }
        (A::YearMonthDuration(m), n) if n.is_numeric() && op == ArithmeticOp::Divide => {
            scale_months(op, *m, n.as_decimal().unwrap_or_default(), true)
        }
        (A::DayTimeDuration(d), n) | (n, A::DayTimeDuration(d))
            if n.is_numeric() && op == ArithmeticOp::Multiply =>
        {
            scale_delta(op, *d, n.as_decimal().unwrap_or_default(), false)
        }
        (A::DayTimeDuration(d), n) if n.is_numeric() && op == ArithmeticOp::Divide => {
            scale_delta(op, *d, n.as_decimal().unwrap_or_default(), true)
        }

        (A::YearMonthDuration(l), A::YearMonthDuration(r)) => match op {
            ArithmeticOp::Add => l.checked_add(*r).map(A::YearMonthDuration).ok_or_else(|| duration_overflow(op)),
            ArithmeticOp::Subtract => {
                l.checked_sub(*r).map(A::YearMonthDuration).ok_or_else(|| duration_overflow(op))
            }
            ArithmeticOp::Divide => ratio(op, Decimal::from(*l), Decimal::from(*r)),
            _ => Err(unsupported(op, left, right)),
        },
        (A::DayTimeDuration(l), A::DayTimeDuration(r)) => match op {
            ArithmeticOp::Add => l.checked_add(r).map(A::DayTimeDuration).ok_or_else(|| duration_overflow(op)),
            ArithmeticOp::Subtract => {
                l.checked_sub(r).map(A::DayTimeDuration).ok_or_else(|| duration_overflow(op))
            }
            ArithmeticOp::Divide => ratio(op, delta_seconds(l), delta_seconds(r)),
            _ => Err(unsupported(op, left, right)),
        },

        (A::Date { .. } | A::DateTime { .. }, A::YearMonthDuration(_) | A::DayTimeDuration(_))
            if matches!(op, ArithmeticOp::Add | ArithmeticOp::Subtract) =>
        {
            shift(op, left, right)
        }
        (A::YearMonthDuration(_) | A::DayTimeDuration(_), A::Date { .. } | A::DateTime { .. })
            if op == ArithmeticOp::Add =>
        {
            shift(op, right, left)
        }

        (A::Date { date: l, tz: ltz }, A::Date { date: r, tz: rtz }) if op == ArithmeticOp::Subtract => {
            let l = instant(l.and_time(NaiveTime::MIN), ltz.unwrap_or(implicit_tz)).ok_or_else(|| date_overflow(op))?;
            let r = instant(r.and_time(NaiveTime::MIN), rtz.unwrap_or(implicit_tz)).ok_or_else(|| date_overflow(op))?;
            Ok(A::DayTimeDuration(l.signed_duration_since(r)))
        }
        (A::DateTime { value: l, tz: ltz }, A::DateTime { value: r, tz: rtz })
            if op == ArithmeticOp::Subtract =>
        {
            let l = instant(*l, ltz.unwrap_or(implicit_tz)).ok_or_else(|| date_overflow(op))?;
            let r = instant(*r, rtz.unwrap_or(implicit_tz)).ok_or_else(|| date_overflow(op))?;
            Ok(A::DayTimeDuration(l.signed_duration_since(r)))
        }

        _ => Err(unsupported(op, left, right)),
    }
}

/// Unary minus.
pub fn negate(value: &AtomicItem) -> Result<AtomicItem, Error> {
    match value {
        AtomicItem::Integer(i) => i.checked_neg().map(AtomicItem::Integer).ok_or_else(|| {
            Error::dynamic(ErrorCode::FOAR0002, format!("numeric overflow negating {i}"))
        }),
        AtomicItem::Decimal(d) => Ok(AtomicItem::Decimal(-*d)),
        AtomicItem::YearMonthDuration(m) => m.checked_neg().map(AtomicItem::YearMonthDuration).ok_or_else(|| {
            Error::dynamic(ErrorCode::FODT0002, "duration overflow negating a yearMonthDuration")
        }),
        AtomicItem::DayTimeDuration(d) => Ok(AtomicItem::DayTimeDuration(-*d)),
        other => Err(Error::dynamic(
            ErrorCode::MPTY0004,
            format!("unary minus is not supported for '{}'", other.atomic_type()),
        )),
    }
}

fn integer_op(op: ArithmeticOp, l: i64, r: i64) -> Result<AtomicItem, Error> {
    let result = match op {
        ArithmeticOp::Add => l.checked_add(r),
        ArithmeticOp::Subtract => l.checked_sub(r),
        ArithmeticOp::Multiply => l.checked_mul(r),
        ArithmeticOp::Divide => return decimal_op(op, Decimal::from(l), Decimal::from(r)),
        ArithmeticOp::IntegerDivide => {
            if r == 0 {
                return Err(division_by_zero(op));
            }
            l.checked_div(r)
        }
        ArithmeticOp::Mod => {
            if r == 0 {
                return Err(division_by_zero(op));
            }
            // i64::MIN mod -1 is mathematically zero
            Some(l.checked_rem(r).unwrap_or(0))
        }
    };
    result.map(AtomicItem::Integer).ok_or_else(|| overflow(op))
}

fn decimal_op(op: ArithmeticOp, l: Decimal, r: Decimal) -> Result<AtomicItem, Error> {
    let result = match op {
        ArithmeticOp::Add => l.checked_add(r),
        ArithmeticOp::Subtract => l.checked_sub(r),
        ArithmeticOp::Multiply => l.checked_mul(r),
        ArithmeticOp::Divide => {
            if r.is_zero() {
                return Err(division_by_zero(op));
            }
            l.checked_div(r)
        }
        ArithmeticOp::IntegerDivide => {
            if r.is_zero() {
                return Err(division_by_zero(op));
            }
            let quotient = l.checked_div(r).ok_or_else(|| overflow(op))?;
            return quotient.trunc().to_i64().map(AtomicItem::Integer).ok_or_else(|| overflow(op));
        }
        ArithmeticOp::Mod => {
            if r.is_zero() {
                return Err(division_by_zero(op));
            }
            // truncating remainder: the result takes the sign of the dividend
            l.checked_rem(r)
        }
    };
    result.map(|d| AtomicItem::Decimal(decimal64(d))).ok_or_else(|| overflow(op))
}

fn ratio(op: ArithmeticOp, l: Decimal, r: Decimal) -> Result<AtomicItem, Error> {
    if r.is_zero() {
        return Err(division_by_zero(op));
    }
    l.checked_div(r).map(AtomicItem::decimal).ok_or_else(|| overflow(op))
}

/// Multiply or divide a month count, rounding to the nearest month (halves away from zero).
fn scale_months(op: ArithmeticOp, months: i32, factor: Decimal, divide: bool) -> Result<AtomicItem, Error> {
    let months = Decimal::from(months);
    let scaled = if divide {
        if factor.is_zero() {
            return Err(division_by_zero(op));
        }
        months.checked_div(factor)
    } else {
        months.checked_mul(factor)
    };
    scaled
        .and_then(|d| d.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero).to_i32())
        .map(AtomicItem::YearMonthDuration)
        .ok_or_else(|| duration_overflow(op))
}

fn scale_delta(op: ArithmeticOp, delta: TimeDelta, factor: Decimal, divide: bool) -> Result<AtomicItem, Error> {
    let seconds = delta_seconds(&delta);
    let scaled = if divide {
        if factor.is_zero() {
            return Err(division_by_zero(op));
        }
        seconds.checked_div(factor)
    } else {
        seconds.checked_mul(factor)
    };
    scaled.and_then(seconds_delta).map(AtomicItem::DayTimeDuration).ok_or_else(|| duration_overflow(op))
}

/// A day-time duration as decimal seconds.
fn delta_seconds(delta: &TimeDelta) -> Decimal {
    Decimal::from(delta.num_seconds()) + Decimal::new(i64::from(delta.subsec_nanos()), 9)
}

/// Decimal seconds back to a day-time duration, rounded to nanoseconds.
fn seconds_delta(seconds: Decimal) -> Option<TimeDelta> {
    let whole = seconds.trunc();
    let nanos = ((seconds - whole) * Decimal::from(1_000_000_000)).round().to_i64()?;
    TimeDelta::try_seconds(whole.to_i64()?)?.checked_add(&TimeDelta::nanoseconds(nanos))
}

/// The UTC instant of a local date-time in the given zone.
pub(crate) fn instant(local: NaiveDateTime, tz: FixedOffset) -> Option<NaiveDateTime> {
    local.checked_sub_signed(TimeDelta::seconds(i64::from(tz.local_minus_utc())))
}

/// Shift a date or dateTime by a duration; subtraction shifts by the negated duration.
fn shift(op: ArithmeticOp, point: &AtomicItem, duration: &AtomicItem) -> Result<AtomicItem, Error> {
    let duration = if op == ArithmeticOp::Subtract { negate(duration)? } else { duration.clone() };
    let shift_date_time = |value: NaiveDateTime| -> Option<NaiveDateTime> {
        match &duration {
            AtomicItem::YearMonthDuration(m) => {
                add_months_saturating(value.date(), *m).map(|d| d.and_time(value.time()))
            }
            AtomicItem::DayTimeDuration(d) => value.checked_add_signed(*d),
            _ => None,
        }
    };
    match point {
        AtomicItem::Date { date, tz } => {
            let shifted = shift_date_time(date.and_time(NaiveTime::MIN)).ok_or_else(|| date_overflow(op))?;
            Ok(AtomicItem::Date { date: shifted.date(), tz: *tz })
        }
        AtomicItem::DateTime { value, tz } => {
            let shifted = shift_date_time(*value).ok_or_else(|| date_overflow(op))?;
            Ok(AtomicItem::DateTime { value: shifted, tz: *tz })
        }
        _ => Err(unsupported(op, point, &duration)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::str::FromStr;

    fn dec(s: &str) -> AtomicItem {
        AtomicItem::Decimal(Decimal::from_str(s).unwrap())
    }

    fn utc() -> FixedOffset {
        FixedOffset::east_opt(0).unwrap()
    }

    fn date(s: &str) -> AtomicItem {
        crate::xdm::AtomicType::Date.parse(s).unwrap()
    }

    fn date_time(s: &str) -> AtomicItem {
        crate::xdm::AtomicType::DateTime.parse(s).unwrap()
    }

    #[rstest]
    #[case(ArithmeticOp::Add, AtomicItem::Integer(2), AtomicItem::Integer(3), AtomicItem::Integer(5))]
    #[case(ArithmeticOp::Divide, AtomicItem::Integer(1), AtomicItem::Integer(4), dec("0.25"))]
    #[case(ArithmeticOp::Add, AtomicItem::Integer(1), dec("0.5"), dec("1.5"))]
    #[case(ArithmeticOp::IntegerDivide, AtomicItem::Integer(7), AtomicItem::Integer(-2), AtomicItem::Integer(-3))]
    #[case(ArithmeticOp::Mod, AtomicItem::Integer(-7), AtomicItem::Integer(2), AtomicItem::Integer(-1))]
    #[case(ArithmeticOp::Mod, dec("-7.5"), AtomicItem::Integer(2), dec("-1.5"))]
    #[case(ArithmeticOp::IntegerDivide, dec("7.5"), dec("2"), AtomicItem::Integer(3))]
    fn numeric_operations(
        #[case] op: ArithmeticOp,
        #[case] l: AtomicItem,
        #[case] r: AtomicItem,
        #[case] expected: AtomicItem,
    ) {
        assert_eq!(arithmetic(op, &l, &r, utc()).unwrap(), expected);
    }

    #[rstest]
    fn division_rounds_to_sixteen_digits() {
        let AtomicItem::Decimal(d) =
            arithmetic(ArithmeticOp::Divide, &AtomicItem::Integer(1), &AtomicItem::Integer(3), utc()).unwrap()
        else {
            panic!("expected decimal")
        };
        assert_eq!(d.to_string(), "0.3333333333333333");
    }

    #[rstest]
    #[case(ArithmeticOp::Divide)]
    #[case(ArithmeticOp::IntegerDivide)]
    #[case(ArithmeticOp::Mod)]
    fn division_by_zero_is_distinct_from_overflow(#[case] op: ArithmeticOp) {
        let err = arithmetic(op, &AtomicItem::Integer(1), &AtomicItem::Integer(0), utc()).unwrap_err();
        assert_eq!(err.code, ErrorCode::FOAR0001);
        let err = arithmetic(op, &dec("1.5"), &dec("0.0"), utc()).unwrap_err();
        assert_eq!(err.code, ErrorCode::FOAR0001);
    }

    #[rstest]
    fn integer_overflow() {
        let err = arithmetic(ArithmeticOp::Add, &AtomicItem::Integer(i64::MAX), &AtomicItem::Integer(1), utc())
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::FOAR0002);
    }

    #[rstest]
    fn durations_scale_and_combine() {
        let ym = AtomicItem::YearMonthDuration(12);
        assert_eq!(
            arithmetic(ArithmeticOp::Multiply, &AtomicItem::Integer(2), &ym, utc()).unwrap(),
            AtomicItem::YearMonthDuration(24)
        );
        assert_eq!(
            arithmetic(ArithmeticOp::Divide, &ym, &dec("5"), utc()).unwrap(),
            AtomicItem::YearMonthDuration(2)
        );
        let dt = AtomicItem::DayTimeDuration(TimeDelta::hours(3));
        assert_eq!(
            arithmetic(ArithmeticOp::Divide, &dt, &AtomicItem::Integer(2), utc()).unwrap(),
            AtomicItem::DayTimeDuration(TimeDelta::minutes(90))
        );
        assert_eq!(
            arithmetic(ArithmeticOp::Divide, &dt, &AtomicItem::DayTimeDuration(TimeDelta::hours(1)), utc()).unwrap(),
            dec("3")
        );
        let err = arithmetic(ArithmeticOp::Add, &ym, &dt, utc()).unwrap_err();
        assert_eq!(err.code, ErrorCode::MPTY0004);
    }

    #[rstest]
    fn dates_shift_by_durations() {
        assert_eq!(
            arithmetic(ArithmeticOp::Add, &date("2024-01-31"), &AtomicItem::YearMonthDuration(1), utc()).unwrap(),
            date("2024-02-29")
        );
        assert_eq!(
            arithmetic(
                ArithmeticOp::Subtract,
                &date_time("2024-03-01T00:30:00Z"),
                &AtomicItem::DayTimeDuration(TimeDelta::hours(1)),
                utc()
            )
            .unwrap(),
            date_time("2024-02-29T23:30:00Z")
        );
    }

    #[rstest]
    fn subtracting_points_in_time_yields_day_time_duration() {
        assert_eq!(
            arithmetic(ArithmeticOp::Subtract, &date("2024-03-01"), &date("2024-02-28"), utc()).unwrap(),
            AtomicItem::DayTimeDuration(TimeDelta::days(2))
        );
        // the zoneless operand takes the implicit zone
        let plus_two = FixedOffset::east_opt(2 * 3600).unwrap();
        assert_eq!(
            arithmetic(
                ArithmeticOp::Subtract,
                &date_time("2024-01-01T12:00:00"),
                &date_time("2024-01-01T10:00:00Z"),
                plus_two
            )
            .unwrap(),
            AtomicItem::DayTimeDuration(TimeDelta::zero())
        );
    }

    #[rstest]
    fn untyped_operands_are_rejected() {
        let err = arithmetic(ArithmeticOp::Add, &AtomicItem::untyped("1"), &AtomicItem::Integer(1), utc())
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::MPTY0004);
    }

    #[rstest]
    fn negation() {
        assert_eq!(negate(&AtomicItem::Integer(3)).unwrap(), AtomicItem::Integer(-3));
        assert_eq!(negate(&AtomicItem::Integer(i64::MIN)).unwrap_err().code, ErrorCode::FOAR0002);
        assert_eq!(negate(&AtomicItem::string("a")).unwrap_err().code, ErrorCode::MPTY0004);
    }
}
