#![deny(unsafe_code)]

//! Legacy timestamp parsing with precision tracking.
//!
//! Accepts the compact DTM notation (`YYYYMMDDHHMMSS.ffff±zzzz`), the
//! punctuated notation (`YYYY-MM-DDTHH:MM:SS`), and the broken-out TS
//! composite (value plus degree-of-precision component). The precision of
//! the result is inferred from the significant digits present and is
//! preserved in the emitted FHIR string; a zone offset, when present,
//! survives at every precision.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde_json::{Value, json};

use v2f_model::message::SourceValue;

/// Result precision, inferred from the number of significant digits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Precision {
    Year,
    Month,
    Day,
    Minute,
    Second,
    SubSecond,
}

/// A parsed legacy timestamp.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedDateTime {
    pub year: i32,
    pub month: Option<u32>,
    pub day: Option<u32>,
    pub hour: Option<u32>,
    pub minute: Option<u32>,
    pub second: Option<u32>,
    /// Fractional-second digits, verbatim.
    pub fraction: Option<String>,
    /// Normalized zone offset (`+05:30`, `-08:00`, or `Z`).
    pub offset: Option<String>,
    pub precision: Precision,
}

impl ParsedDateTime {
    /// Clamp the precision down (never up).
    fn clamp_precision(&mut self, limit: Precision) {
        if limit < self.precision {
            self.precision = limit;
        }
    }

    /// FHIR dateTime text at this value's precision.
    pub fn to_datetime_string(&self) -> String {
        let mut out = format!("{:04}", self.year);
        let date_done = |out: &mut String, offset: &Option<String>| {
            if let Some(tz) = offset {
                out.push_str(tz);
            }
        };
        if self.precision == Precision::Year {
            date_done(&mut out, &self.offset);
            return out;
        }
        out.push_str(&format!("-{:02}", self.month.unwrap_or(1)));
        if self.precision == Precision::Month {
            date_done(&mut out, &self.offset);
            return out;
        }
        out.push_str(&format!("-{:02}", self.day.unwrap_or(1)));
        if self.precision == Precision::Day {
            date_done(&mut out, &self.offset);
            return out;
        }
        out.push_str(&format!(
            "T{:02}:{:02}",
            self.hour.unwrap_or(0),
            self.minute.unwrap_or(0)
        ));
        if self.precision >= Precision::Second {
            out.push_str(&format!(":{:02}", self.second.unwrap_or(0)));
        }
        if self.precision == Precision::SubSecond {
            if let Some(fraction) = &self.fraction {
                out.push('.');
                out.push_str(fraction);
            }
        }
        date_done(&mut out, &self.offset);
        out
    }

    /// FHIR date text (precision clamped to day).
    pub fn to_date_string(&self) -> String {
        let mut clamped = self.clone();
        clamped.offset = None;
        clamped.clamp_precision(Precision::Day);
        clamped.to_datetime_string()
    }
}

fn split_zone(raw: &str) -> (&str, Option<String>) {
    if let Some(body) = raw.strip_suffix('Z') {
        return (body, Some("Z".to_string()));
    }
    // A zone marker is +/-HHMM or +/-HH:MM at the tail; a leading '-' in
    // punctuated dates is not a zone.
    for (pos, ch) in raw.char_indices().rev() {
        if ch == '+' || ch == '-' {
            let tail = &raw[pos..];
            let digits: String = tail[1..].chars().filter(|c| *c != ':').collect();
            if digits.len() == 4 && digits.chars().all(|c| c.is_ascii_digit()) && pos >= 4 {
                let sign = ch;
                let normalized = format!("{sign}{}:{}", &digits[..2], &digits[2..]);
                return (&raw[..pos], Some(normalized));
            }
            break;
        }
        if !ch.is_ascii_digit() && ch != ':' {
            break;
        }
    }
    (raw, None)
}

fn two(digits: &str, at: usize) -> Option<u32> {
    digits.get(at..at + 2)?.parse().ok()
}

/// Strict compact-DTM grammar: 4 to 14 digits plus optional fraction.
fn parse_compact(body: &str, offset: Option<String>) -> Option<ParsedDateTime> {
    let (digits, fraction) = match body.split_once('.') {
        Some((whole, frac)) => (whole, Some(frac)),
        None => (body, None),
    };
    if !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    if let Some(frac) = fraction {
        if frac.is_empty() || !frac.chars().all(|c| c.is_ascii_digit()) {
            return None;
        }
    }
    let precision = match (digits.len(), fraction.is_some()) {
        (_, true) if digits.len() >= 14 => Precision::SubSecond,
        (4, false) => Precision::Year,
        (6, false) => Precision::Month,
        (8, false) => Precision::Day,
        (10, false) | (12, false) => Precision::Minute,
        (14, false) => Precision::Second,
        _ => return None,
    };
    let year: i32 = digits.get(..4)?.parse().ok()?;
    let month = two(digits, 4).filter(|m| (1..=12).contains(m));
    let day = two(digits, 6).filter(|d| (1..=31).contains(d));
    if digits.len() >= 6 && month.is_none() {
        return None;
    }
    if digits.len() >= 8 && day.is_none() {
        return None;
    }
    let hour = two(digits, 8).filter(|h| *h < 24);
    let minute = two(digits, 10).filter(|m| *m < 60);
    let second = two(digits, 12).filter(|s| *s < 60);
    if digits.len() >= 10 && hour.is_none()
        || digits.len() >= 12 && minute.is_none()
        || digits.len() >= 14 && second.is_none()
    {
        return None;
    }
    Some(ParsedDateTime {
        year,
        month,
        day,
        hour,
        minute: minute.or(if digits.len() == 10 { Some(0) } else { None }),
        second,
        fraction: fraction.map(str::to_string),
        offset,
        precision,
    })
}

/// Punctuated notation: `YYYY[-MM[-DD[Thh:mm[:ss[.fff]]]]]`.
fn parse_punctuated(body: &str, offset: Option<String>) -> Option<ParsedDateTime> {
    if !body.contains('-') && !body.contains(':') {
        return None;
    }
    let (date_part, time_part) = match body.split_once(['T', ' ']) {
        Some((d, t)) => (d, Some(t)),
        None => (body, None),
    };
    let mut date_fields = date_part.split('-');
    let year: i32 = date_fields.next()?.parse().ok()?;
    if date_part.len() < 4 {
        return None;
    }
    let month: Option<u32> = match date_fields.next() {
        Some(m) => Some(m.parse().ok().filter(|m| (1..=12).contains(m))?),
        None => None,
    };
    let day: Option<u32> = match date_fields.next() {
        Some(d) => Some(d.parse().ok().filter(|d| (1..=31).contains(d))?),
        None => None,
    };
    if date_fields.next().is_some() {
        return None;
    }

    let mut parsed = ParsedDateTime {
        year,
        month,
        day,
        hour: None,
        minute: None,
        second: None,
        fraction: None,
        offset,
        precision: match (month, day) {
            (None, _) => Precision::Year,
            (Some(_), None) => Precision::Month,
            (Some(_), Some(_)) => Precision::Day,
        },
    };
    let Some(time) = time_part.filter(|t| !t.is_empty()) else {
        return Some(parsed);
    };
    if day.is_none() {
        return None;
    }
    let mut time_fields = time.split(':');
    parsed.hour = Some(time_fields.next()?.parse().ok().filter(|h| *h < 24)?);
    parsed.minute = Some(
        time_fields
            .next()
            .unwrap_or("0")
            .parse()
            .ok()
            .filter(|m| *m < 60)?,
    );
    parsed.precision = Precision::Minute;
    if let Some(seconds) = time_fields.next() {
        let (whole, fraction) = match seconds.split_once('.') {
            Some((w, f)) => (w, Some(f.to_string())),
            None => (seconds, None),
        };
        parsed.second = Some(whole.parse().ok().filter(|s| *s < 60)?);
        parsed.precision = if fraction.is_some() {
            Precision::SubSecond
        } else {
            Precision::Second
        };
        parsed.fraction = fraction;
    }
    Some(parsed)
}

/// Generic fallback: whatever chrono can make of it, precision preserved
/// as closely as the matched format allows.
fn parse_fallback(raw: &str) -> Option<ParsedDateTime> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        let naive = parsed.naive_local();
        let offset = parsed.offset().to_string();
        return Some(from_naive(naive, Some(offset), Precision::Second));
    }
    for format in ["%Y/%m/%d %H:%M:%S", "%m/%d/%Y %H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(from_naive(naive, None, Precision::Second));
        }
    }
    for format in ["%Y/%m/%d", "%m/%d/%Y", "%d-%b-%Y"] {
        if let Ok(date) = NaiveDate::parse_from_str(raw, format) {
            return Some(from_naive(
                date.and_hms_opt(0, 0, 0)?,
                None,
                Precision::Day,
            ));
        }
    }
    None
}

fn from_naive(naive: NaiveDateTime, offset: Option<String>, precision: Precision) -> ParsedDateTime {
    use chrono::{Datelike, Timelike};
    ParsedDateTime {
        year: naive.year(),
        month: Some(naive.month()),
        day: Some(naive.day()),
        hour: Some(naive.hour()),
        minute: Some(naive.minute()),
        second: Some(naive.second()),
        fraction: None,
        offset,
        precision,
    }
}

/// Parse one timestamp string: strict legacy grammar first, punctuated
/// next, generic fallback last. `None` when all three fail.
pub fn parse(raw: &str) -> Option<ParsedDateTime> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    let (body, offset) = split_zone(trimmed);
    parse_compact(body, offset.clone())
        .or_else(|| parse_punctuated(body, offset))
        .or_else(|| parse_fallback(trimmed))
}

/// Degree-of-precision codes from the broken-out TS composite.
fn precision_from_code(code: &str) -> Option<Precision> {
    match code.trim().to_uppercase().as_str() {
        "Y" => Some(Precision::Year),
        "L" => Some(Precision::Month),
        "D" => Some(Precision::Day),
        "H" | "M" => Some(Precision::Minute),
        "S" => Some(Precision::Second),
        _ => None,
    }
}

fn parse_source(value: &SourceValue) -> Option<ParsedDateTime> {
    let text = value.component(1).map(str::to_string)?;
    let mut parsed = parse(&text)?;
    if let Some(limit) = value.component(2).and_then(precision_from_code) {
        parsed.clamp_precision(limit);
    }
    Some(parsed)
}

pub fn to_fhir_datetime(value: &SourceValue) -> Option<Value> {
    Some(json!(parse_source(value)?.to_datetime_string()))
}

pub fn to_fhir_date(value: &SourceValue) -> Option<Value> {
    Some(json!(parse_source(value)?.to_date_string()))
}

/// Instant requires at least second precision; a missing zone is taken
/// as UTC.
pub fn to_fhir_instant(value: &SourceValue) -> Option<Value> {
    let mut parsed = parse_source(value)?;
    if parsed.precision < Precision::Second {
        return None;
    }
    if parsed.offset.is_none() {
        parsed.offset = Some("Z".to_string());
    }
    Some(json!(parsed.to_datetime_string()))
}

/// Legacy TM (`HHMM[SS[.ffff]]`) to FHIR time (`hh:mm:ss`).
pub fn to_fhir_time(value: &SourceValue) -> Option<Value> {
    let raw = value.component(1)?.trim().to_string();
    let (digits, fraction) = match raw.split_once('.') {
        Some((whole, frac)) => (whole, Some(frac)),
        None => (raw.as_str(), None),
    };
    if !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    let hour = two(digits, 0).filter(|h| *h < 24)?;
    let minute = match digits.len() {
        2 => 0,
        4 | 6 => two(digits, 2).filter(|m| *m < 60)?,
        _ => return None,
    };
    let second = if digits.len() == 6 {
        two(digits, 4).filter(|s| *s < 60)?
    } else {
        0
    };
    let mut out = format!("{hour:02}:{minute:02}:{second:02}");
    if let Some(frac) = fraction {
        if !frac.is_empty() && frac.chars().all(|c| c.is_ascii_digit()) {
            out.push('.');
            out.push_str(frac);
        }
    }
    Some(json!(out))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dtm(raw: &str) -> Option<String> {
        to_fhir_datetime(&SourceValue::scalar("DTM", raw)).map(|v| v.as_str().unwrap().to_string())
    }

    #[test]
    fn precision_follows_significant_digits() {
        assert_eq!(dtm("2020").as_deref(), Some("2020"));
        assert_eq!(dtm("202003").as_deref(), Some("2020-03"));
        assert_eq!(dtm("20200304").as_deref(), Some("2020-03-04"));
        assert_eq!(dtm("202003040830").as_deref(), Some("2020-03-04T08:30"));
        assert_eq!(
            dtm("20200304083015").as_deref(),
            Some("2020-03-04T08:30:15")
        );
        assert_eq!(
            dtm("20200304083015.123").as_deref(),
            Some("2020-03-04T08:30:15.123")
        );
    }

    #[test]
    fn zone_offset_is_preserved_across_precisions() {
        assert_eq!(dtm("2020+0500").as_deref(), Some("2020+05:00"));
        assert_eq!(dtm("20200304-0800").as_deref(), Some("2020-03-04-08:00"));
        assert_eq!(
            dtm("202003040830+0530").as_deref(),
            Some("2020-03-04T08:30+05:30")
        );
        assert_eq!(
            dtm("20200304083015.123Z").as_deref(),
            Some("2020-03-04T08:30:15.123Z")
        );
    }

    #[test]
    fn punctuated_notation_parses() {
        assert_eq!(dtm("2020-03-04").as_deref(), Some("2020-03-04"));
        assert_eq!(dtm("2020-03").as_deref(), Some("2020-03"));
        assert_eq!(
            dtm("2020-03-04T08:30:15").as_deref(),
            Some("2020-03-04T08:30:15")
        );
        assert_eq!(
            dtm("2020-03-04T08:30:15+01:00").as_deref(),
            Some("2020-03-04T08:30:15+01:00")
        );
    }

    #[test]
    fn fallback_formats_parse() {
        assert_eq!(dtm("2020/03/04").as_deref(), Some("2020-03-04"));
        assert_eq!(
            dtm("03/04/2020 08:30:15").as_deref(),
            Some("2020-03-04T08:30:15")
        );
    }

    #[test]
    fn broken_out_composite_clamps_precision() {
        let value = SourceValue::new(
            "TS",
            vec![vec!["20200304083015".to_string()], vec!["D".to_string()]],
        );
        assert_eq!(
            to_fhir_datetime(&value).unwrap(),
            serde_json::json!("2020-03-04")
        );
    }

    #[test]
    fn garbage_is_none_not_panic() {
        for raw in ["notadate", "20", "2020139999", "99999999", "202x03"] {
            assert_eq!(dtm(raw), None, "input {raw}");
        }
    }

    #[test]
    fn date_clamps_to_day_and_drops_zone() {
        let value = SourceValue::scalar("DTM", "20200304083015+0500");
        assert_eq!(to_fhir_date(&value).unwrap(), serde_json::json!("2020-03-04"));
    }

    #[test]
    fn instant_requires_seconds_and_defaults_utc() {
        assert_eq!(
            to_fhir_instant(&SourceValue::scalar("DTM", "202003040830")),
            None
        );
        assert_eq!(
            to_fhir_instant(&SourceValue::scalar("DTM", "20200304083015")).unwrap(),
            serde_json::json!("2020-03-04T08:30:15Z")
        );
    }

    #[test]
    fn time_values_normalize() {
        let time = |raw: &str| to_fhir_time(&SourceValue::scalar("TM", raw));
        assert_eq!(time("0830").unwrap(), serde_json::json!("08:30:00"));
        assert_eq!(time("083015").unwrap(), serde_json::json!("08:30:15"));
        assert_eq!(time("083015.25").unwrap(), serde_json::json!("08:30:15.25"));
        assert_eq!(time("8:30"), None);
        assert_eq!(time("2560"), None);
    }
}
