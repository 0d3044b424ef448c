//! Value (`eq`, `lt`, ...) and general (`=`, `<`, ...) comparison.

use std::cmp::Ordering;

use chrono::{FixedOffset, NaiveDateTime, NaiveTime};
use itertools::iproduct;

use super::arithmetic::instant;
use crate::engine::error::{Error, ErrorCode};
use crate::parser::ast::ComparisonOperator;
use crate::xdm::{AtomicItem, AtomicType};

fn holds(op: ComparisonOperator, ordering: Ordering) -> bool {
    match op {
        ComparisonOperator::Eq => ordering == Ordering::Equal,
        ComparisonOperator::Ne => ordering != Ordering::Equal,
        ComparisonOperator::Lt => ordering == Ordering::Less,
        ComparisonOperator::Le => ordering != Ordering::Greater,
        ComparisonOperator::Gt => ordering == Ordering::Greater,
        ComparisonOperator::Ge => ordering != Ordering::Less,
    }
}

fn is_equality(op: ComparisonOperator) -> bool {
    matches!(op, ComparisonOperator::Eq | ComparisonOperator::Ne)
}

fn incomparable(op: ComparisonOperator, left: &AtomicItem, right: &AtomicItem) -> Error {
    Error::invalid_types(
        &format!("comparison '{}'", op.symbol()),
        &left.atomic_type().to_string(),
        &right.atomic_type().to_string(),
    )
}

fn point_in_time(local: NaiveDateTime, tz: Option<FixedOffset>, implicit_tz: FixedOffset) -> Result<NaiveDateTime, Error> {
    instant(local, tz.unwrap_or(implicit_tz))
        .ok_or_else(|| Error::dynamic(ErrorCode::FODT0001, "date/time overflow while normalizing to UTC"))
}

/// Compare two single atomic values.
///
/// Untyped atomics compare as strings here; the general comparison casts them beforehand.
pub fn value_compare(
    left: &AtomicItem,
    op: ComparisonOperator,
    right: &AtomicItem,
    implicit_tz: FixedOffset,
) -> Result<bool, Error> {
    use AtomicItem as A;
    let ordering = match (left, right) {
        (l, r) if l.as_str().is_some() && r.as_str().is_some() => {
            // string-likes order by code point; a single three-way compare serves every operator
            l.as_str().cmp(&r.as_str())
        }
        (l, r) if l.is_numeric() && r.is_numeric() => match (l, r) {
            (A::Integer(a), A::Integer(b)) => a.cmp(b),
            _ => l.as_decimal().cmp(&r.as_decimal()),
        },
        (A::Boolean(a), A::Boolean(b)) => a.cmp(b),
        (A::Date { date: a, tz: atz }, A::Date { date: b, tz: btz }) => {
            let a = point_in_time(a.and_time(NaiveTime::MIN), *atz, implicit_tz)?;
            let b = point_in_time(b.and_time(NaiveTime::MIN), *btz, implicit_tz)?;
            a.cmp(&b)
        }
        (A::DateTime { value: a, tz: atz }, A::DateTime { value: b, tz: btz }) => {
            point_in_time(*a, *atz, implicit_tz)?.cmp(&point_in_time(*b, *btz, implicit_tz)?)
        }
        (A::YearMonthDuration(a), A::YearMonthDuration(b)) => a.cmp(b),
        (A::DayTimeDuration(a), A::DayTimeDuration(b)) => a.cmp(b),
        (A::YearMonthDuration(m), A::DayTimeDuration(d)) | (A::DayTimeDuration(d), A::YearMonthDuration(m))
            if is_equality(op) =>
        {
            // durations of different kinds are equal only when both are zero
            if *m == 0 && d.is_zero() { Ordering::Equal } else { Ordering::Less }
        }
        (A::Base64Binary(a), A::Base64Binary(b)) if is_equality(op) => a.cmp(b),
        _ => return Err(incomparable(op, left, right)),
    };
    Ok(holds(op, ordering))
}

/// The type an untyped operand is cast to when compared with `other`.
fn coercion_target(other: &AtomicItem) -> AtomicType {
    match other {
        o if o.is_numeric() => AtomicType::Decimal,
        AtomicItem::DayTimeDuration(_) => AtomicType::DayTimeDuration,
        AtomicItem::YearMonthDuration(_) => AtomicType::YearMonthDuration,
        AtomicItem::AnyUri(_) => AtomicType::String,
        o => o.atomic_type(),
    }
}

/// Apply the untyped-atomic rule to one pair of operands.
fn coerce_pair(left: &AtomicItem, right: &AtomicItem) -> Result<(AtomicItem, AtomicItem), Error> {
    match (left, right) {
        (AtomicItem::UntypedAtomic(l), AtomicItem::UntypedAtomic(r)) => {
            Ok((AtomicItem::String(l.clone()), AtomicItem::String(r.clone())))
        }
        (AtomicItem::UntypedAtomic(_), other) => Ok((coercion_target(other).cast(left)?, other.clone())),
        (other, AtomicItem::UntypedAtomic(_)) => Ok((other.clone(), coercion_target(other).cast(right)?)),
        _ => Ok((left.clone(), right.clone())),
    }
}

/// Existential comparison over the cross product of both atomized sequences.
///
/// True as soon as one pair satisfies the operator; an empty side yields false.
pub fn general_compare(
    left: &[AtomicItem],
    op: ComparisonOperator,
    right: &[AtomicItem],
    implicit_tz: FixedOffset,
) -> Result<bool, Error> {
    for (l, r) in iproduct!(left, right) {
        let (l, r) = coerce_pair(l, r)?;
        if value_compare(&l, op, &r, implicit_tz)? {
            return Ok(true);
        }
    }
    Ok(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeDelta;
    use rstest::rstest;
    use rust_decimal::Decimal;

    fn utc() -> FixedOffset {
        FixedOffset::east_opt(0).unwrap()
    }

    fn int(i: i64) -> AtomicItem {
        AtomicItem::Integer(i)
    }

    #[rstest]
    #[case(int(1), ComparisonOperator::Lt, AtomicItem::decimal(Decimal::new(15, 1)), true)]
    #[case(int(2), ComparisonOperator::Le, int(2), true)]
    #[case(AtomicItem::string("abc"), ComparisonOperator::Lt, AtomicItem::string("abd"), true)]
    #[case(AtomicItem::string("b"), ComparisonOperator::Ge, AtomicItem::string("a"), true)]
    #[case(AtomicItem::Boolean(false), ComparisonOperator::Lt, AtomicItem::Boolean(true), true)]
    #[case(AtomicItem::YearMonthDuration(0), ComparisonOperator::Eq, AtomicItem::DayTimeDuration(TimeDelta::zero()), true)]
    #[case(AtomicItem::YearMonthDuration(1), ComparisonOperator::Ne, AtomicItem::DayTimeDuration(TimeDelta::zero()), true)]
    #[case(AtomicItem::AnyUri("urn:a".into()), ComparisonOperator::Eq, AtomicItem::string("urn:a"), true)]
    fn value_comparisons(
        #[case] l: AtomicItem,
        #[case] op: ComparisonOperator,
        #[case] r: AtomicItem,
        #[case] expected: bool,
    ) {
        assert_eq!(value_compare(&l, op, &r, utc()).unwrap(), expected);
    }

    #[rstest]
    #[case(int(1), AtomicItem::string("1"))]
    #[case(AtomicItem::Boolean(true), int(1))]
    fn incompatible_pairs_name_both_types(#[case] l: AtomicItem, #[case] r: AtomicItem) {
        let err = value_compare(&l, ComparisonOperator::Eq, &r, utc()).unwrap_err();
        assert_eq!(err.code, ErrorCode::MPTY0004);
        assert!(err.message.contains(&l.atomic_type().to_string()));
        assert!(err.message.contains(&r.atomic_type().to_string()));
    }

    #[rstest]
    fn cross_kind_durations_are_unordered() {
        let err = value_compare(
            &AtomicItem::YearMonthDuration(1),
            ComparisonOperator::Lt,
            &AtomicItem::DayTimeDuration(TimeDelta::days(1)),
            utc(),
        )
        .unwrap_err();
        assert_eq!(err.code, ErrorCode::MPTY0004);
    }

    #[rstest]
    fn date_times_compare_as_instants() {
        let a = AtomicType::DateTime.parse("2024-01-01T12:00:00+02:00").unwrap();
        let b = AtomicType::DateTime.parse("2024-01-01T10:00:00Z").unwrap();
        assert!(value_compare(&a, ComparisonOperator::Eq, &b, utc()).unwrap());
    }

    #[rstest]
    fn general_comparison_is_existential() {
        assert!(general_compare(&[int(1), int(2)], ComparisonOperator::Eq, &[int(2), int(3)], utc()).unwrap());
        assert!(!general_compare(&[], ComparisonOperator::Eq, &[int(1), int(2)], utc()).unwrap());
        assert!(!general_compare(&[int(1)], ComparisonOperator::Gt, &[int(1), int(2)], utc()).unwrap());
    }

    #[rstest]
    fn untyped_side_takes_the_other_sides_type() {
        let untyped = [AtomicItem::untyped("1"), AtomicItem::untyped("x")];
        assert!(general_compare(&untyped, ComparisonOperator::Eq, &[int(1)], utc()).unwrap());
        assert!(
            general_compare(&[AtomicItem::untyped("P1Y")], ComparisonOperator::Eq, &[AtomicItem::YearMonthDuration(12)], utc())
                .unwrap()
        );
        assert!(
            general_compare(&[AtomicItem::untyped("a")], ComparisonOperator::Lt, &[AtomicItem::untyped("b")], utc())
                .unwrap()
        );
    }

    #[rstest]
    fn uncastable_untyped_value_is_a_cast_error() {
        let err = general_compare(&[AtomicItem::untyped("x")], ComparisonOperator::Eq, &[int(1)], utc()).unwrap_err();
        assert_eq!(err.code, ErrorCode::FORG0001);
    }
}
