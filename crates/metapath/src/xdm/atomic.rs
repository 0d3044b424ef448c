use super::temporal::{self, TemporalErr};
use crate::engine::error::{Error, ErrorCode};
use base64::Engine as _;
use chrono::{FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, TimeDelta};
use core::fmt;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use std::str::FromStr;

/// Significant digits kept by decimal arithmetic (decimal64 context).
const DECIMAL_DIGITS: u32 = 16;

/// Round a decimal to the decimal64 context: 16 significant digits, half-even.
pub fn decimal64(d: Decimal) -> Decimal {
    d.round_sf_with_strategy(DECIMAL_DIGITS, RoundingStrategy::MidpointNearestEven)
        .unwrap_or(d)
        .normalize()
}

/// The leaf atomic types known to the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AtomicType {
    String,
    Boolean,
    Integer,
    Decimal,
    Date,
    DateTime,
    YearMonthDuration,
    DayTimeDuration,
    Base64Binary,
    AnyUri,
    UntypedAtomic,
}

impl AtomicType {
    pub const ALL: [AtomicType; 11] = [
        AtomicType::String,
        AtomicType::Boolean,
        AtomicType::Integer,
        AtomicType::Decimal,
        AtomicType::Date,
        AtomicType::DateTime,
        AtomicType::YearMonthDuration,
        AtomicType::DayTimeDuration,
        AtomicType::Base64Binary,
        AtomicType::AnyUri,
        AtomicType::UntypedAtomic,
    ];

    /// Local name in the `xs` namespace.
    pub fn local_name(&self) -> &'static str {
        match self {
            AtomicType::String => "string",
            AtomicType::Boolean => "boolean",
            AtomicType::Integer => "integer",
            AtomicType::Decimal => "decimal",
            AtomicType::Date => "date",
            AtomicType::DateTime => "dateTime",
            AtomicType::YearMonthDuration => "yearMonthDuration",
            AtomicType::DayTimeDuration => "dayTimeDuration",
            AtomicType::Base64Binary => "base64Binary",
            AtomicType::AnyUri => "anyURI",
            AtomicType::UntypedAtomic => "untypedAtomic",
        }
    }

    pub fn from_local_name(local: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.local_name() == local)
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, AtomicType::Integer | AtomicType::Decimal)
    }

    pub fn is_duration(&self) -> bool {
        matches!(self, AtomicType::YearMonthDuration | AtomicType::DayTimeDuration)
    }

    /// Read a value of this type from its lexical form.
    pub fn parse(&self, lexical: &str) -> Result<AtomicItem, Error> {
        let s = lexical.trim();
        let invalid = || {
            Error::dynamic(
                ErrorCode::FORG0001,
                format!("'{lexical}' is not a valid lexical value of {self}"),
            )
        };
        let temporal_invalid = |_: TemporalErr| invalid();
        Ok(match self {
            AtomicType::String => AtomicItem::String(lexical.to_string()),
            AtomicType::UntypedAtomic => AtomicItem::UntypedAtomic(lexical.to_string()),
            AtomicType::AnyUri => AtomicItem::AnyUri(s.to_string()),
            AtomicType::Boolean => match s {
                "true" | "1" => AtomicItem::Boolean(true),
                "false" | "0" => AtomicItem::Boolean(false),
                _ => return Err(invalid()),
            },
            AtomicType::Integer => {
                let digits = s.strip_prefix(['+', '-']).unwrap_or(s);
                if digits.is_empty() || !digits.bytes().all(|c| c.is_ascii_digit()) {
                    return Err(invalid());
                }
                let v = s.strip_prefix('+').unwrap_or(s).parse::<i64>().map_err(|_| {
                    Error::dynamic(ErrorCode::FOAR0002, format!("integer '{s}' is out of range"))
                })?;
                AtomicItem::Integer(v)
            }
            AtomicType::Decimal => AtomicItem::Decimal(parse_decimal(s).ok_or_else(invalid)?),
            AtomicType::Date => {
                let (date, tz) = temporal::parse_date(s).map_err(temporal_invalid)?;
                AtomicItem::Date { date, tz }
            }
            AtomicType::DateTime => {
                let (value, tz) = temporal::parse_date_time(s).map_err(temporal_invalid)?;
                AtomicItem::DateTime { value, tz }
            }
            AtomicType::YearMonthDuration => AtomicItem::YearMonthDuration(
                temporal::parse_year_month_duration(s).map_err(temporal_invalid)?,
            ),
            AtomicType::DayTimeDuration => AtomicItem::DayTimeDuration(
                temporal::parse_day_time_duration(s).map_err(temporal_invalid)?,
            ),
            AtomicType::Base64Binary => {
                let compact: String = s.chars().filter(|c| !c.is_whitespace()).collect();
                let bytes = base64::engine::general_purpose::STANDARD
                    .decode(compact.as_bytes())
                    .map_err(|e| {
                        invalid().with_source(Some(std::sync::Arc::new(e)
                            as std::sync::Arc<dyn std::error::Error + Send + Sync>))
                    })?;
                AtomicItem::Base64Binary(bytes)
            }
        })
    }

    /// Cast an atomic value to this type.
    pub fn cast(&self, item: &AtomicItem) -> Result<AtomicItem, Error> {
        use AtomicItem as A;
        if item.atomic_type() == *self {
            return Ok(item.clone());
        }
        match (self, item) {
            (AtomicType::String, _) => Ok(A::String(item.string_value())),
            (AtomicType::UntypedAtomic, _) => Ok(A::UntypedAtomic(item.string_value())),
            (_, A::String(s) | A::UntypedAtomic(s)) => self.parse(s),
            (AtomicType::AnyUri, A::AnyUri(s)) => Ok(A::AnyUri(s.clone())),
            (AtomicType::Boolean, A::Integer(i)) => Ok(A::Boolean(*i != 0)),
            (AtomicType::Boolean, A::Decimal(d)) => Ok(A::Boolean(!d.is_zero())),
            (AtomicType::Integer, A::Boolean(b)) => Ok(A::Integer(i64::from(*b))),
            (AtomicType::Integer, A::Decimal(d)) => d.trunc().to_i64().map(A::Integer).ok_or_else(|| {
                Error::dynamic(ErrorCode::FOAR0002, format!("decimal {d} is out of integer range"))
            }),
            (AtomicType::Decimal, A::Integer(i)) => Ok(A::Decimal(Decimal::from(*i))),
            (AtomicType::Decimal, A::Boolean(b)) => {
                Ok(A::Decimal(if *b { Decimal::ONE } else { Decimal::ZERO }))
            }
            (AtomicType::Date, A::DateTime { value, tz }) => Ok(A::Date { date: value.date(), tz: *tz }),
            (AtomicType::DateTime, A::Date { date, tz }) => {
                Ok(A::DateTime { value: date.and_time(NaiveTime::MIN), tz: *tz })
            }
            _ => Err(Error::dynamic(
                ErrorCode::FORG0001,
                format!("cannot cast {} to {self}", item.atomic_type()),
            )),
        }
    }
}

impl fmt::Display for AtomicType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "xs:{}", self.local_name())
    }
}

/// XSD decimal lexical form, `[+-]?(\d+(\.\d*)?|\.\d+)`.
fn parse_decimal(s: &str) -> Option<Decimal> {
    let unsigned = s.strip_prefix(['+', '-']).unwrap_or(s);
    let (whole, frac) = unsigned.split_once('.').unwrap_or((unsigned, ""));
    if (whole.is_empty() && frac.is_empty())
        || !whole.bytes().all(|c| c.is_ascii_digit())
        || !frac.bytes().all(|c| c.is_ascii_digit())
    {
        return None;
    }
    let negative = s.starts_with('-');
    let normalized = format!(
        "{}{}.{}",
        if negative { "-" } else { "" },
        if whole.is_empty() { "0" } else { whole },
        if frac.is_empty() { "0" } else { frac }
    );
    Decimal::from_str(&normalized).ok().map(decimal64)
}

/// Immutable, strongly typed scalar value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum AtomicItem {
    String(String),
    Boolean(bool),
    Integer(i64),
    Decimal(Decimal),
    Date { date: NaiveDate, tz: Option<FixedOffset> },
    DateTime { value: NaiveDateTime, tz: Option<FixedOffset> },
    /// Signed total months.
    YearMonthDuration(i32),
    DayTimeDuration(TimeDelta),
    Base64Binary(Vec<u8>),
    AnyUri(String),
    UntypedAtomic(String),
}

impl AtomicItem {
    pub fn string(s: impl Into<String>) -> Self {
        AtomicItem::String(s.into())
    }

    pub fn untyped(s: impl Into<String>) -> Self {
        AtomicItem::UntypedAtomic(s.into())
    }

    /// Decimal rounded to the decimal64 context.
    pub fn decimal(d: Decimal) -> Self {
        AtomicItem::Decimal(decimal64(d))
    }

    pub fn atomic_type(&self) -> AtomicType {
        match self {
            AtomicItem::String(_) => AtomicType::String,
            AtomicItem::Boolean(_) => AtomicType::Boolean,
            AtomicItem::Integer(_) => AtomicType::Integer,
            AtomicItem::Decimal(_) => AtomicType::Decimal,
            AtomicItem::Date { .. } => AtomicType::Date,
            AtomicItem::DateTime { .. } => AtomicType::DateTime,
            AtomicItem::YearMonthDuration(_) => AtomicType::YearMonthDuration,
            AtomicItem::DayTimeDuration(_) => AtomicType::DayTimeDuration,
            AtomicItem::Base64Binary(_) => AtomicType::Base64Binary,
            AtomicItem::AnyUri(_) => AtomicType::AnyUri,
            AtomicItem::UntypedAtomic(_) => AtomicType::UntypedAtomic,
        }
    }

    pub fn is_numeric(&self) -> bool {
        self.atomic_type().is_numeric()
    }

    /// String-like values: strings, URIs and untyped atomics.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            AtomicItem::String(s) | AtomicItem::AnyUri(s) | AtomicItem::UntypedAtomic(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_decimal(&self) -> Option<Decimal> {
        match self {
            AtomicItem::Integer(i) => Some(Decimal::from(*i)),
            AtomicItem::Decimal(d) => Some(*d),
            _ => None,
        }
    }

    /// Canonical lexical representation.
    pub fn string_value(&self) -> String {
        match self {
            AtomicItem::String(s) | AtomicItem::AnyUri(s) | AtomicItem::UntypedAtomic(s) => s.clone(),
            AtomicItem::Boolean(b) => b.to_string(),
            AtomicItem::Integer(i) => i.to_string(),
            AtomicItem::Decimal(d) => d.normalize().to_string(),
            AtomicItem::Date { date, tz } => temporal::format_date(date, tz.as_ref()),
            AtomicItem::DateTime { value, tz } => temporal::format_date_time(value, tz.as_ref()),
            AtomicItem::YearMonthDuration(m) => temporal::format_year_month_duration(*m),
            AtomicItem::DayTimeDuration(d) => temporal::format_day_time_duration(d),
            AtomicItem::Base64Binary(bytes) => base64::engine::general_purpose::STANDARD.encode(bytes),
        }
    }
}

impl fmt::Display for AtomicItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.string_value())
    }
}

impl From<bool> for AtomicItem {
    fn from(b: bool) -> Self {
        AtomicItem::Boolean(b)
    }
}

impl From<i64> for AtomicItem {
    fn from(i: i64) -> Self {
        AtomicItem::Integer(i)
    }
}

impl From<&str> for AtomicItem {
    fn from(s: &str) -> Self {
        AtomicItem::String(s.to_string())
    }
}

impl From<String> for AtomicItem {
    fn from(s: String) -> Self {
        AtomicItem::String(s)
    }
}

impl From<Decimal> for AtomicItem {
    fn from(d: Decimal) -> Self {
        AtomicItem::decimal(d)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[rstest]
    #[case(AtomicType::Integer, " 42 ", AtomicItem::Integer(42))]
    #[case(AtomicType::Integer, "-7", AtomicItem::Integer(-7))]
    #[case(AtomicType::Decimal, ".5", AtomicItem::Decimal(dec("0.5")))]
    #[case(AtomicType::Decimal, "+2.50", AtomicItem::Decimal(dec("2.5")))]
    #[case(AtomicType::Boolean, "1", AtomicItem::Boolean(true))]
    #[case(AtomicType::Boolean, "false", AtomicItem::Boolean(false))]
    #[case(AtomicType::YearMonthDuration, "P1Y", AtomicItem::YearMonthDuration(12))]
    #[case(AtomicType::Base64Binary, "AQID", AtomicItem::Base64Binary(vec![1, 2, 3]))]
    fn parse_lexical(#[case] ty: AtomicType, #[case] lexical: &str, #[case] expected: AtomicItem) {
        assert_eq!(ty.parse(lexical).unwrap(), expected);
    }

    #[rstest]
    #[case(AtomicType::Integer, "1.5")]
    #[case(AtomicType::Integer, "")]
    #[case(AtomicType::Decimal, "1e3")]
    #[case(AtomicType::Boolean, "yes")]
    #[case(AtomicType::Date, "2020-13-01")]
    #[case(AtomicType::Base64Binary, "not base64!")]
    fn parse_rejects(#[case] ty: AtomicType, #[case] lexical: &str) {
        assert_eq!(ty.parse(lexical).unwrap_err().code, ErrorCode::FORG0001);
    }

    #[rstest]
    fn integer_literal_overflow() {
        let err = AtomicType::Integer.parse("99999999999999999999").unwrap_err();
        assert_eq!(err.code, ErrorCode::FOAR0002);
    }

    #[rstest]
    #[case(AtomicType::Integer, AtomicItem::Decimal(dec("-3.9")), AtomicItem::Integer(-3))]
    #[case(AtomicType::Decimal, AtomicItem::Integer(4), AtomicItem::Decimal(dec("4")))]
    #[case(AtomicType::Boolean, AtomicItem::Integer(0), AtomicItem::Boolean(false))]
    #[case(AtomicType::String, AtomicItem::Decimal(dec("1.50")), AtomicItem::string("1.5"))]
    #[case(AtomicType::Date, AtomicType::DateTime.parse("2020-05-06T07:08:09Z").unwrap(), AtomicType::Date.parse("2020-05-06Z").unwrap())]
    fn cast_between_types(#[case] ty: AtomicType, #[case] from: AtomicItem, #[case] expected: AtomicItem) {
        assert_eq!(ty.cast(&from).unwrap(), expected);
    }

    #[rstest]
    fn cast_rejects_unrelated_types() {
        let err = AtomicType::Date.cast(&AtomicItem::Boolean(true)).unwrap_err();
        assert_eq!(err.code, ErrorCode::FORG0001);
        assert!(err.message.contains("xs:boolean"));
    }

    #[rstest]
    fn decimal_rounds_half_even_at_sixteen_digits() {
        let third = Decimal::ONE / Decimal::from(3);
        assert_eq!(decimal64(third).to_string(), "0.3333333333333333");
        assert_eq!(decimal64(dec("0.12345678901234565")).to_string(), "0.1234567890123456");
    }
}
