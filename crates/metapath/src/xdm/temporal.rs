//! Lexical parsing and canonical rendering of the date, dateTime and duration types.

use chrono::{Datelike, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, TimeDelta, Timelike};

/// Failure to read a temporal lexical form. Callers map it onto their own error code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TemporalErr;

type TResult<T> = Result<T, TemporalErr>;

/// Split an optional trailing time zone (`Z`, `+hh:mm`, `-hh:mm`) from a lexical value.
pub fn split_tz(s: &str) -> TResult<(&str, Option<FixedOffset>)> {
    if let Some(body) = s.strip_suffix('Z') {
        return Ok((body, FixedOffset::east_opt(0)));
    }
    let b = s.as_bytes();
    if b.len() >= 6 {
        let sign = b[b.len() - 6];
        if (sign == b'+' || sign == b'-') && b[b.len() - 3] == b':' {
            let tz = parse_offset(&s[s.len() - 6..])?;
            return Ok((&s[..s.len() - 6], Some(tz)));
        }
    }
    Ok((s, None))
}

/// Parse `+hh:mm` / `-hh:mm` (also accepts `Z`).
pub fn parse_offset(s: &str) -> TResult<FixedOffset> {
    if s == "Z" {
        return FixedOffset::east_opt(0).ok_or(TemporalErr);
    }
    let (sign, rest) = match s.as_bytes().first() {
        Some(b'+') => (1, &s[1..]),
        Some(b'-') => (-1, &s[1..]),
        _ => return Err(TemporalErr),
    };
    let (h, m) = rest.split_once(':').ok_or(TemporalErr)?;
    if h.len() != 2 || m.len() != 2 {
        return Err(TemporalErr);
    }
    let h: i32 = h.parse().map_err(|_| TemporalErr)?;
    let m: i32 = m.parse().map_err(|_| TemporalErr)?;
    if h > 14 || m > 59 || (h == 14 && m != 0) {
        return Err(TemporalErr);
    }
    FixedOffset::east_opt(sign * (h * 3600 + m * 60)).ok_or(TemporalErr)
}

fn all_digits(s: &str) -> bool {
    s.bytes().all(|b| b.is_ascii_digit())
}

/// `YYYY-MM-DD` with at least four year digits and exactly two month and day digits.
fn lexical_date(s: &str) -> TResult<NaiveDate> {
    let unsigned = s.strip_prefix('-').unwrap_or(s);
    let mut parts = unsigned.splitn(3, '-');
    let (Some(year), Some(month), Some(day)) = (parts.next(), parts.next(), parts.next()) else {
        return Err(TemporalErr);
    };
    if year.len() < 4 || month.len() != 2 || day.len() != 2 || ![year, month, day].into_iter().all(all_digits) {
        return Err(TemporalErr);
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|_| TemporalErr)
}

/// `hh:mm:ss(.s+)?` with two-digit fields.
fn lexical_time(s: &str) -> TResult<NaiveTime> {
    let (whole, fraction) = match s.split_once('.') {
        Some((whole, fraction)) => (whole, Some(fraction)),
        None => (s, None),
    };
    let fields: Vec<&str> = whole.split(':').collect();
    if fields.len() != 3 || fields.iter().any(|f| f.len() != 2 || !all_digits(f)) {
        return Err(TemporalErr);
    }
    if fraction.is_some_and(|f| f.is_empty() || !all_digits(f)) {
        return Err(TemporalErr);
    }
    NaiveTime::parse_from_str(s, "%H:%M:%S%.f").map_err(|_| TemporalErr)
}

pub fn parse_date(s: &str) -> TResult<(NaiveDate, Option<FixedOffset>)> {
    let (body, tz) = split_tz(s.trim())?;
    Ok((lexical_date(body)?, tz))
}

pub fn parse_date_time(s: &str) -> TResult<(NaiveDateTime, Option<FixedOffset>)> {
    let (body, tz) = split_tz(s.trim())?;
    let (d, t) = body.split_once('T').ok_or(TemporalErr)?;
    let date = lexical_date(d)?;
    // 24:00:00 denotes the first instant of the next day
    if t == "24:00:00" || (t.starts_with("24:00:00.") && t[9..].bytes().all(|c| c == b'0')) {
        let next = date.succ_opt().ok_or(TemporalErr)?;
        return Ok((next.and_time(NaiveTime::MIN), tz));
    }
    let time = lexical_time(t)?;
    Ok((date.and_time(time), tz))
}

/// Parse `-?P(nY)?(nM)?` into a signed month count.
pub fn parse_year_month_duration(s: &str) -> TResult<i32> {
    let s = s.trim();
    let (neg, body) = match s.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, s),
    };
    let mut cur = body.strip_prefix('P').ok_or(TemporalErr)?;
    let mut years: i32 = 0;
    let mut months: i32 = 0;
    let mut seen = false;
    for designator in ['Y', 'M'] {
        let digits = cur.bytes().take_while(u8::is_ascii_digit).count();
        if digits > 0 && cur[digits..].starts_with(designator) {
            let n: i32 = cur[..digits].parse().map_err(|_| TemporalErr)?;
            if designator == 'Y' {
                years = n;
            } else {
                months = n;
            }
            cur = &cur[digits + 1..];
            seen = true;
        }
    }
    if !seen || !cur.is_empty() {
        return Err(TemporalErr);
    }
    let total = years.checked_mul(12).and_then(|y| y.checked_add(months)).ok_or(TemporalErr)?;
    Ok(if neg { -total } else { total })
}

/// Parse `-?P(nD)?(T(nH)?(nM)?(n(.n)?S)?)?`.
pub fn parse_day_time_duration(s: &str) -> TResult<TimeDelta> {
    let s = s.trim();
    let (neg, body) = match s.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, s),
    };
    let mut cur = body.strip_prefix('P').ok_or(TemporalErr)?;
    let mut total = TimeDelta::zero();
    let mut seen = false;

    let digits = cur.bytes().take_while(u8::is_ascii_digit).count();
    if digits > 0 && cur[digits..].starts_with('D') {
        let days: i64 = cur[..digits].parse().map_err(|_| TemporalErr)?;
        total = TimeDelta::try_days(days).ok_or(TemporalErr)?;
        cur = &cur[digits + 1..];
        seen = true;
    }
    if let Some(rest) = cur.strip_prefix('T') {
        cur = rest;
        let mut seen_time = false;
        for (designator, unit) in [('H', 3600i64), ('M', 60)] {
            let digits = cur.bytes().take_while(u8::is_ascii_digit).count();
            if digits > 0 && cur[digits..].starts_with(designator) {
                let n: i64 = cur[..digits].parse().map_err(|_| TemporalErr)?;
                let part = n
                    .checked_mul(unit)
                    .and_then(TimeDelta::try_seconds)
                    .ok_or(TemporalErr)?;
                total = total.checked_add(&part).ok_or(TemporalErr)?;
                cur = &cur[digits + 1..];
                seen_time = true;
            }
        }
        let len = cur.bytes().take_while(|c| c.is_ascii_digit() || *c == b'.').count();
        if len > 0 && cur[len..].starts_with('S') {
            total = total.checked_add(&parse_seconds(&cur[..len])?).ok_or(TemporalErr)?;
            cur = &cur[len + 1..];
            seen_time = true;
        }
        if !seen_time {
            return Err(TemporalErr);
        }
        seen = true;
    }
    if !seen || !cur.is_empty() {
        return Err(TemporalErr);
    }
    Ok(if neg { -total } else { total })
}

fn parse_seconds(s: &str) -> TResult<TimeDelta> {
    let (whole, frac) = match s.split_once('.') {
        Some((w, f)) => (w, f),
        None => (s, ""),
    };
    if whole.is_empty() || !frac.bytes().all(|c| c.is_ascii_digit()) {
        return Err(TemporalErr);
    }
    let secs: i64 = whole.parse().map_err(|_| TemporalErr)?;
    let mut nanos: i64 = 0;
    for (i, c) in frac.bytes().take(9).enumerate() {
        nanos += i64::from(c - b'0') * 10i64.pow(8 - i as u32);
    }
    TimeDelta::try_seconds(secs)
        .and_then(|d| d.checked_add(&TimeDelta::nanoseconds(nanos)))
        .ok_or(TemporalErr)
}

pub fn format_offset(tz: &FixedOffset) -> String {
    let secs = tz.local_minus_utc();
    if secs == 0 {
        return "Z".to_string();
    }
    let sign = if secs < 0 { '-' } else { '+' };
    let abs = secs.abs();
    format!("{sign}{:02}:{:02}", abs / 3600, (abs % 3600) / 60)
}

pub fn format_date(date: &NaiveDate, tz: Option<&FixedOffset>) -> String {
    let mut out = format!("{:04}-{:02}-{:02}", date.year(), date.month(), date.day());
    if let Some(tz) = tz {
        out.push_str(&format_offset(tz));
    }
    out
}

pub fn format_date_time(dt: &NaiveDateTime, tz: Option<&FixedOffset>) -> String {
    let mut out = format!(
        "{}T{:02}:{:02}:{:02}",
        format_date(&dt.date(), None),
        dt.hour(),
        dt.minute(),
        dt.second()
    );
    push_fraction(&mut out, dt.nanosecond());
    if let Some(tz) = tz {
        out.push_str(&format_offset(tz));
    }
    out
}

fn push_fraction(out: &mut String, nanos: u32) {
    if nanos == 0 {
        return;
    }
    let frac = format!("{nanos:09}");
    out.push('.');
    out.push_str(frac.trim_end_matches('0'));
}

pub fn format_year_month_duration(months: i32) -> String {
    if months == 0 {
        return "P0M".to_string();
    }
    let mut out = String::new();
    if months < 0 {
        out.push('-');
    }
    out.push('P');
    let m = months.unsigned_abs();
    let (y, m) = (m / 12, m % 12);
    if y != 0 {
        out.push_str(&format!("{y}Y"));
    }
    if m != 0 {
        out.push_str(&format!("{m}M"));
    }
    out
}

pub fn format_day_time_duration(d: &TimeDelta) -> String {
    if d.is_zero() {
        return "PT0S".to_string();
    }
    let mut out = String::new();
    if *d < TimeDelta::zero() {
        out.push('-');
    }
    out.push('P');
    let abs = d.abs();
    let total = abs.num_seconds();
    let nanos = abs.subsec_nanos().unsigned_abs();
    let (days, rem) = (total / 86_400, total % 86_400);
    let (hours, mins, secs) = (rem / 3600, (rem % 3600) / 60, rem % 60);
    if days != 0 {
        out.push_str(&format!("{days}D"));
    }
    if hours != 0 || mins != 0 || secs != 0 || nanos != 0 {
        out.push('T');
        if hours != 0 {
            out.push_str(&format!("{hours}H"));
        }
        if mins != 0 {
            out.push_str(&format!("{mins}M"));
        }
        if secs != 0 || nanos != 0 {
            out.push_str(&secs.to_string());
            push_fraction(&mut out, nanos);
            out.push('S');
        }
    }
    out
}

/// Shift a date by a number of months, clamping the day to the end of the target month.
pub fn add_months_saturating(date: NaiveDate, delta_months: i32) -> Option<NaiveDate> {
    let total = date.year().checked_mul(12)?.checked_add(date.month0() as i32)?.checked_add(delta_months)?;
    let year = total.div_euclid(12);
    let month = total.rem_euclid(12) as u32 + 1;
    let first_of_next = if month == 12 {
        NaiveDate::from_ymd_opt(year.checked_add(1)?, 1, 1)?
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)?
    };
    let last_day = first_of_next.pred_opt()?.day();
    NaiveDate::from_ymd_opt(year, month, date.day().min(last_day))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("P1Y2M", 14)]
    #[case("-P3M", -3)]
    #[case("P0Y", 0)]
    #[case("P24M", 24)]
    fn year_month_lexical(#[case] s: &str, #[case] months: i32) {
        assert_eq!(parse_year_month_duration(s), Ok(months));
    }

    #[rstest]
    #[case("P")]
    #[case("P1D")]
    #[case("1Y")]
    #[case("P1M2Y")]
    fn year_month_rejects(#[case] s: &str) {
        assert!(parse_year_month_duration(s).is_err());
    }

    #[rstest]
    #[case("2024-1-05")]
    #[case("2024-01-5")]
    #[case("24-01-05")]
    #[case("2024-01-05T1:00:00")]
    #[case("2024-01-05T10:00:0")]
    #[case("2024-01-05T10:00:00.")]
    fn unpadded_fields_are_rejected(#[case] s: &str) {
        if s.contains('T') {
            assert!(parse_date_time(s).is_err());
        } else {
            assert!(parse_date(s).is_err());
        }
    }

    #[rstest]
    fn padded_forms_parse() {
        assert!(parse_date("2024-01-05Z").is_ok());
        assert!(parse_date_time("2024-01-05T10:00:00.25+01:00").is_ok());
    }

    #[rstest]
    #[case("P1DT2H", "P1DT2H")]
    #[case("PT90M", "PT1H30M")]
    #[case("PT1.5S", "PT1.5S")]
    #[case("-P2D", "-P2D")]
    #[case("PT0S", "PT0S")]
    fn day_time_canonical(#[case] lexical: &str, #[case] canonical: &str) {
        let d = parse_day_time_duration(lexical).unwrap();
        assert_eq!(format_day_time_duration(&d), canonical);
    }

    #[rstest]
    #[case("PT")]
    #[case("P1Y")]
    #[case("P1DT")]
    fn day_time_rejects(#[case] s: &str) {
        assert!(parse_day_time_duration(s).is_err());
    }

    #[rstest]
    #[case("2024-02-29", "2024-02-29")]
    #[case("2024-02-29Z", "2024-02-29Z")]
    #[case("2024-02-29+05:30", "2024-02-29+05:30")]
    fn date_round_trip(#[case] lexical: &str, #[case] canonical: &str) {
        let (d, tz) = parse_date(lexical).unwrap();
        assert_eq!(format_date(&d, tz.as_ref()), canonical);
    }

    #[rstest]
    fn date_time_with_fraction_and_zone() {
        let (dt, tz) = parse_date_time("2020-01-02T03:04:05.250-01:00").unwrap();
        assert_eq!(format_date_time(&dt, tz.as_ref()), "2020-01-02T03:04:05.25-01:00");
        let (dt, _) = parse_date_time("2020-12-31T24:00:00").unwrap();
        assert_eq!(format_date_time(&dt, None), "2021-01-01T00:00:00");
    }

    #[rstest]
    #[case((2024, 1, 31), 1, (2024, 2, 29))]
    #[case((2023, 1, 31), 1, (2023, 2, 28))]
    #[case((2024, 3, 15), -3, (2023, 12, 15))]
    fn month_shift_clamps_day(#[case] from: (i32, u32, u32), #[case] delta: i32, #[case] to: (i32, u32, u32)) {
        let d = NaiveDate::from_ymd_opt(from.0, from.1, from.2).unwrap();
        let expected = NaiveDate::from_ymd_opt(to.0, to.1, to.2).unwrap();
        assert_eq!(add_months_saturating(d, delta), Some(expected));
    }
}
