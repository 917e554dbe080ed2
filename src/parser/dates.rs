//! Date constructor rewriting.
//!
//! Date calls are replaced by quoted instants before literal decoding,
//! and the spelling of each call is recorded so the generator can write
//! it back the same way.

use std::fmt;

use chrono::{DateTime, Duration, Utc};
use nom::{
    IResult,
    branch::alt,
    character::complete::{char, digit1, multispace0, one_of},
    combinator::{all_consuming, map, map_res, opt, recognize},
    multi::fold_many0,
    sequence::{delimited, pair, preceded},
};
use regex::Captures;

use crate::ast::{DateSpelling, DateSpellings};
use crate::patterns::{EPOCH_INSTANT, INSTANT_FORMAT, Patterns};

/// Source of "now" for `newDate()` and relative dates.
pub trait Clock: fmt::Debug + Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock pinned to one instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

pub fn format_instant(t: DateTime<Utc>) -> String {
    t.format(INSTANT_FORMAT).to_string()
}

fn quote(s: &str) -> String {
    serde_json::Value::String(s.to_string()).to_string()
}

fn quoted_capture(caps: &Captures<'_>) -> String {
    caps.get(1)
        .or_else(|| caps.get(2))
        .map(|m| m.as_str().to_string())
        .unwrap_or_default()
}

/// Replace every date constructor in `text` with a quoted instant.
///
/// Order matters: relative calls contain a `newDate()` of their own, and
/// the catch-all `newDate(...)` form runs last.
pub(crate) fn rewrite_dates(
    text: &str,
    patterns: &Patterns,
    now: DateTime<Utc>,
    spellings: &mut DateSpellings,
) -> String {
    let text = patterns.iso_date_call.replace_all(text, |caps: &Captures<'_>| {
        let instant = quoted_capture(caps);
        spellings.record(instant.as_str(), DateSpelling::IsoDate);
        quote(&instant)
    });

    let text = patterns
        .relative_date_call
        .replace_all(&text, |caps: &Captures<'_>| {
            let instant = relative_instant(now, &caps[1]);
            spellings.record(instant.as_str(), DateSpelling::Relative(caps[0].to_string()));
            quote(&instant)
        });

    let now_instant = format_instant(now);
    let text = patterns.now_call.replace_all(&text, |_: &Captures<'_>| {
        spellings.record(now_instant.as_str(), DateSpelling::Now);
        quote(&now_instant)
    });

    let text = patterns
        .new_date_quoted
        .replace_all(&text, |caps: &Captures<'_>| {
            let instant = quoted_capture(caps);
            spellings.record(instant.as_str(), DateSpelling::NewDate);
            quote(&instant)
        });

    patterns
        .new_date_any
        .replace_all(&text, |caps: &Captures<'_>| quote(&caps[1]))
        .into_owned()
}

/// `now + expr` milliseconds, or the epoch when `expr` cannot be evaluated.
pub(crate) fn relative_instant(now: DateTime<Utc>, expr: &str) -> String {
    evaluate_millis(expr)
        .and_then(Duration::try_milliseconds)
        .and_then(|offset| now.checked_add_signed(offset))
        .map(format_instant)
        .unwrap_or_else(|| EPOCH_INSTANT.to_string())
}

/// Evaluate an integer arithmetic expression (`+ - * /`, unary sign),
/// truncating the result toward zero.
pub(crate) fn evaluate_millis(expr: &str) -> Option<i64> {
    let (_, value) = all_consuming(sum)(expr).ok()?;
    if !value.is_finite() || value.abs() >= i64::MAX as f64 {
        return None;
    }
    Some(value.trunc() as i64)
}

fn sum(input: &str) -> IResult<&str, f64> {
    let (input, first) = product(input)?;
    fold_many0(
        pair(delimited(multispace0, one_of("+-"), multispace0), product),
        move || first,
        |acc, (op, rhs)| if op == '+' { acc + rhs } else { acc - rhs },
    )(input)
}

fn product(input: &str) -> IResult<&str, f64> {
    let (input, first) = factor(input)?;
    fold_many0(
        pair(delimited(multispace0, one_of("*/"), multispace0), factor),
        move || first,
        |acc, (op, rhs)| if op == '*' { acc * rhs } else { acc / rhs },
    )(input)
}

fn factor(input: &str) -> IResult<&str, f64> {
    delimited(
        multispace0,
        alt((
            map(preceded(char('-'), factor), |v| -v),
            preceded(char('+'), factor),
            map_res(recognize(pair(digit1, opt(pair(char('.'), digit1)))), |s: &str| {
                s.parse::<f64>()
            }),
        )),
        multispace0,
    )(input)
}
