use std::cmp::Ordering;

use fancy_regex::Regex;
use rust_decimal::Decimal;

use super::CallContext;
use super::common::{boolean, decimal_arg, integer, round_half_up, string, string_arg};
use crate::engine::error::{Error, ErrorCode};
use crate::model::MetapathNode;
use crate::xdm::Sequence;

/// The string argument at `index`, or the context item's string value when the function was
/// called without it.
fn string_or_context<N: MetapathNode>(ctx: &CallContext<'_, N>, args: &[Sequence<N>], index: usize) -> Result<String, Error> {
    match args.get(index) {
        Some(arg) => Ok(string_arg(arg)),
        None => Ok(ctx.context_item()?.string_value()),
    }
}

pub(super) fn string_fn<N: MetapathNode>(ctx: &CallContext<'_, N>, args: &[Sequence<N>]) -> Result<Sequence<N>, Error> {
    Ok(string(string_or_context(ctx, args, 0)?))
}

pub(super) fn string_length_fn<N: MetapathNode>(
    ctx: &CallContext<'_, N>,
    args: &[Sequence<N>],
) -> Result<Sequence<N>, Error> {
    let s = string_or_context(ctx, args, 0)?;
    Ok(integer(i64::try_from(s.chars().count()).unwrap_or(i64::MAX)))
}

pub(super) fn concat_fn<N: MetapathNode>(_ctx: &CallContext<'_, N>, args: &[Sequence<N>]) -> Result<Sequence<N>, Error> {
    Ok(string(args.iter().map(string_arg).collect::<String>()))
}

pub(super) fn string_join_fn<N: MetapathNode>(
    _ctx: &CallContext<'_, N>,
    args: &[Sequence<N>],
) -> Result<Sequence<N>, Error> {
    let separator = args.get(1).map(string_arg).unwrap_or_default();
    let parts: Vec<String> = args[0].iter().map(|i| i.string_value()).collect();
    Ok(string(parts.join(&separator)))
}

pub(super) fn starts_with_fn<N: MetapathNode>(
    _ctx: &CallContext<'_, N>,
    args: &[Sequence<N>],
) -> Result<Sequence<N>, Error> {
    Ok(boolean(string_arg(&args[0]).starts_with(&string_arg(&args[1]))))
}

pub(super) fn ends_with_fn<N: MetapathNode>(
    _ctx: &CallContext<'_, N>,
    args: &[Sequence<N>],
) -> Result<Sequence<N>, Error> {
    Ok(boolean(string_arg(&args[0]).ends_with(&string_arg(&args[1]))))
}

pub(super) fn contains_fn<N: MetapathNode>(_ctx: &CallContext<'_, N>, args: &[Sequence<N>]) -> Result<Sequence<N>, Error> {
    Ok(boolean(string_arg(&args[0]).contains(&string_arg(&args[1]))))
}

/// Characters at 1-based positions `p` with `round(start) <= p < round(start) + round(length)`.
pub(super) fn substring_fn<N: MetapathNode>(
    _ctx: &CallContext<'_, N>,
    args: &[Sequence<N>],
) -> Result<Sequence<N>, Error> {
    let source = string_arg(&args[0]);
    let start = decimal_arg(&args[1]).map(round_half_up).unwrap_or(Decimal::ONE);
    let end = args.get(2).and_then(decimal_arg).map(|l| start + round_half_up(l));
    let out: String = source
        .chars()
        .enumerate()
        .filter(|(index, _)| {
            let position = Decimal::from(*index) + Decimal::ONE;
            position >= start && end.is_none_or(|end| position < end)
        })
        .map(|(_, c)| c)
        .collect();
    Ok(string(out))
}

pub(super) fn upper_case_fn<N: MetapathNode>(
    _ctx: &CallContext<'_, N>,
    args: &[Sequence<N>],
) -> Result<Sequence<N>, Error> {
    Ok(string(string_arg(&args[0]).to_uppercase()))
}

pub(super) fn lower_case_fn<N: MetapathNode>(
    _ctx: &CallContext<'_, N>,
    args: &[Sequence<N>],
) -> Result<Sequence<N>, Error> {
    Ok(string(string_arg(&args[0]).to_lowercase()))
}

pub(super) fn normalize_space_fn<N: MetapathNode>(
    ctx: &CallContext<'_, N>,
    args: &[Sequence<N>],
) -> Result<Sequence<N>, Error> {
    let s = string_or_context(ctx, args, 0)?;
    Ok(string(s.split_whitespace().collect::<Vec<_>>().join(" ")))
}

/// Compile a pattern with `fn:matches` flags (`s`, `m`, `i`, `x`) applied inline.
fn compile_pattern(pattern: &str, flags: &str) -> Result<Regex, Error> {
    if let Some(bad) = flags.chars().find(|c| !matches!(c, 's' | 'm' | 'i' | 'x')) {
        return Err(Error::dynamic(ErrorCode::FORG0001, format!("invalid regular expression flag '{bad}'")));
    }
    let source = if flags.is_empty() { pattern.to_string() } else { format!("(?{flags}){pattern}") };
    Ok(Regex::new(&source)?)
}

pub(super) fn matches_fn<N: MetapathNode>(_ctx: &CallContext<'_, N>, args: &[Sequence<N>]) -> Result<Sequence<N>, Error> {
    let input = string_arg(&args[0]);
    let flags = args.get(2).map(string_arg).unwrap_or_default();
    let regex = compile_pattern(&string_arg(&args[1]), &flags)?;
    Ok(boolean(regex.is_match(&input)?))
}

pub(super) fn compare_fn<N: MetapathNode>(_ctx: &CallContext<'_, N>, args: &[Sequence<N>]) -> Result<Sequence<N>, Error> {
    if args[0].is_empty() || args[1].is_empty() {
        return Ok(Sequence::empty());
    }
    let ordering = string_arg(&args[0]).cmp(&string_arg(&args[1]));
    Ok(integer(match ordering {
        Ordering::Less => -1,
        Ordering::Equal => 0,
        Ordering::Greater => 1,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("abc", "", "b", true)]
    #[case("ABC", "i", "b", true)]
    #[case("a\nb", "", "^b$", false)]
    #[case("a\nb", "m", "^b$", true)]
    #[case("a b", "x", "a b", false)]
    fn pattern_flags(#[case] input: &str, #[case] flags: &str, #[case] pattern: &str, #[case] expected: bool) {
        assert_eq!(compile_pattern(pattern, flags).unwrap().is_match(input).unwrap(), expected);
    }

    #[rstest]
    fn unknown_flag_is_rejected() {
        assert_eq!(compile_pattern("a", "q").unwrap_err().code, ErrorCode::FORG0001);
        assert_eq!(compile_pattern("(", "").unwrap_err().code, ErrorCode::FORG0001);
    }
}
