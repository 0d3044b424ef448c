use rust_decimal::Decimal;

use super::CallContext;
use crate::engine::error::{Error, ErrorCode};
use crate::model::MetapathNode;
use crate::xdm::{AtomicItem, Item, Sequence};

/// Effective boolean value of a sequence.
pub(crate) fn ebv<N: MetapathNode>(seq: &Sequence<N>) -> Result<bool, Error> {
    let Some(first) = seq.first() else {
        return Ok(false);
    };
    let atomic = match first {
        Item::Node(_) => return Ok(true),
        Item::Atomic(a) if seq.len() == 1 => a,
        Item::Atomic(_) => {
            return Err(Error::dynamic(
                ErrorCode::FORG0006,
                format!("effective boolean value is not defined for a sequence of {} atomic values", seq.len()),
            ));
        }
    };
    match atomic {
        AtomicItem::Boolean(b) => Ok(*b),
        AtomicItem::String(s) | AtomicItem::AnyUri(s) | AtomicItem::UntypedAtomic(s) => Ok(!s.is_empty()),
        AtomicItem::Integer(i) => Ok(*i != 0),
        AtomicItem::Decimal(d) => Ok(!d.is_zero()),
        other => Err(Error::dynamic(
            ErrorCode::FORG0006,
            format!("effective boolean value is not defined for {}", other.atomic_type()),
        )),
    }
}

pub(crate) fn boolean<N>(b: bool) -> Sequence<N> {
    Sequence::from(AtomicItem::Boolean(b))
}

pub(crate) fn integer<N>(i: i64) -> Sequence<N> {
    Sequence::from(AtomicItem::Integer(i))
}

pub(crate) fn string<N>(s: impl Into<String>) -> Sequence<N> {
    Sequence::from(AtomicItem::String(s.into()))
}

/// The optional atomic value of an already converted `xs:anyAtomicType?` argument.
pub(crate) fn opt_atomic<N>(arg: &Sequence<N>) -> Option<&AtomicItem> {
    arg.first().and_then(Item::as_atomic)
}

/// String value of an optional string argument; the empty sequence reads as `""`.
pub(crate) fn string_arg<N: MetapathNode>(arg: &Sequence<N>) -> String {
    arg.first().map(Item::string_value).unwrap_or_default()
}

/// Numeric value of an already converted numeric argument.
pub(crate) fn decimal_arg<N>(arg: &Sequence<N>) -> Option<Decimal> {
    opt_atomic(arg).and_then(AtomicItem::as_decimal)
}

/// `fn:round` semantics: halves go toward positive infinity.
pub(crate) fn round_half_up(d: Decimal) -> Decimal {
    (d + Decimal::new(5, 1)).floor()
}

/// The optional node argument, or the context item for the zero-argument form.
pub(crate) fn node_or_context<N: MetapathNode>(ctx: &CallContext<'_, N>, args: &[Sequence<N>]) -> Result<Option<N>, Error> {
    let item = match args.first() {
        Some(arg) => arg.first(),
        None => Some(ctx.context_item()?),
    };
    match item {
        None => Ok(None),
        Some(Item::Node(n)) => Ok(Some(n.clone())),
        Some(other) => Err(Error::dynamic(
            ErrorCode::MPTY0004,
            format!("{} expects a node, got {}", ctx.function.name(), other.type_label()),
        )),
    }
}

/// Atomize every item of a sequence.
pub(crate) fn atomize_all<N: MetapathNode>(seq: &Sequence<N>) -> Result<Vec<AtomicItem>, Error> {
    seq.iter().map(Item::atomize).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::simple::{SimpleNode, assembly};
    use rstest::rstest;

    fn seq(items: Vec<AtomicItem>) -> Sequence<SimpleNode> {
        items.into_iter().map(Item::Atomic).collect()
    }

    #[rstest]
    #[case(seq(vec![]), false)]
    #[case(seq(vec![AtomicItem::Boolean(true)]), true)]
    #[case(seq(vec![AtomicItem::string("")]), false)]
    #[case(seq(vec![AtomicItem::untyped("x")]), true)]
    #[case(seq(vec![AtomicItem::Integer(0)]), false)]
    #[case(seq(vec![AtomicItem::decimal(Decimal::new(5, 1))]), true)]
    fn effective_boolean_value(#[case] input: Sequence<SimpleNode>, #[case] expected: bool) {
        assert_eq!(ebv(&input).unwrap(), expected);
    }

    #[rstest]
    fn node_first_is_true_regardless_of_length() {
        let n = assembly("a").build();
        let s: Sequence<SimpleNode> = vec![Item::Node(n), Item::Atomic(AtomicItem::Integer(0))].into();
        assert!(ebv(&s).unwrap());
    }

    #[rstest]
    fn multiple_atomics_have_no_boolean_value() {
        let s = seq(vec![AtomicItem::Integer(1), AtomicItem::Integer(2)]);
        assert_eq!(ebv(&s).unwrap_err().code, ErrorCode::FORG0006);
        let s = seq(vec![AtomicItem::YearMonthDuration(1)]);
        assert_eq!(ebv(&s).unwrap_err().code, ErrorCode::FORG0006);
    }
}
