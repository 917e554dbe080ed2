//! Query string parser.
//!
//! Turns shell-style query text into a nested predicate, cursor options
//! and the side channel the generator needs to write it back.
//!
//! # Grammar
//!
//! ```text
//! db.events.find({"severity":{"$gt":5}}, {"_id":0}).sort({"t":-1}).skip(10).limit(5)
//! ─┬ ──┬─── ──┬─ ────────────┬───────── ────┬────  ─────────────────┬───────────────
//!  │   │      │              │              │                      │
//!  │   │      │              │              │                      └── Modifiers (any order)
//!  │   │      │              │              └── Projection (optional)
//!  │   │      │              └── Filter (may be empty or truncated)
//!  │   │      └── Operation (only `find`)
//!  │   └── Collection
//!  └── Database handle
//! ```

pub mod dates;
pub mod literal;
pub(crate) mod scan;


use nom::{
    IResult,
    bytes::complete::{tag, take_while1},
    character::complete::{char, multispace0},
    sequence::{preceded, terminated, tuple},
};
use serde_json::{Map, Value};

use crate::ast::{OriginalNumbers, ParseMeta, ParsedQuery, Predicate, QueryOptions, SortKey};
use crate::canon::format_float;
use crate::error::{MqlError, MqlResult};
use crate::patterns::Patterns;

pub use dates::{Clock, FixedClock, SystemClock};
pub use literal::{LiteralStrategy, decode_literal};

/// Parser bound to a pattern set and a clock.
#[derive(Debug, Clone, Copy)]
pub struct Parser<'p> {
    patterns: &'p Patterns,
    clock: &'p dyn Clock,
}

impl<'p> Parser<'p> {
    pub fn new(patterns: &'p Patterns, clock: &'p dyn Clock) -> Self {
        Self { patterns, clock }
    }

    /// Parse a complete query invocation.
    pub fn parse(&self, text: &str) -> MqlResult<ParsedQuery> {
        let text = text.trim();
        let mut meta = ParseMeta::default();

        record_numbers(self.patterns, text, &mut meta.original_numbers);

        let text = dates::rewrite_dates(text, self.patterns, self.clock.now(), &mut meta.dates);

        let (rest, (collection, op)) =
            call_head(&text).map_err(|_| MqlError::UnsupportedCall(text.clone()))?;
        if op != "find" {
            return Err(MqlError::UnsupportedCall(op.to_string()));
        }

        let args_start = text.len() - rest.len();
        let (args, _) = scan::call_args(&text, args_start);
        let (filter_text, projection_text) = scan::split_first_arg(args);

        let filter = parse_filter(filter_text)?;
        let projection = projection_text
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(|p| literal::decode_object(p, "projection"))
            .transpose()?
            .filter(|p| !p.is_empty());

        let options = QueryOptions {
            projection,
            sort: parse_sort(&text)?,
            skip: parse_count(&text, "skip")?,
            limit: parse_count(&text, "limit")?,
        };

        Ok(ParsedQuery {
            collection: collection.to_string(),
            filter: Predicate::root(filter),
            options,
            meta,
        })
    }
}

/// Record the spelling of every decimal literal under its canonical form.
///
/// Digits inside string literals or glued to a word are not numbers.
pub(crate) fn record_numbers(patterns: &Patterns, text: &str, table: &mut OriginalNumbers) {
    let outside: Vec<usize> = scan::Unquoted::new(text).map(|(i, _)| i).collect();
    for m in patterns.decimal.find_iter(text) {
        if outside.binary_search(&m.start()).is_err() {
            continue;
        }
        let glued = text[..m.start()]
            .chars()
            .next_back()
            .is_some_and(|c| c.is_alphanumeric() || c == '_');
        if glued {
            continue;
        }
        if let Ok(f) = m.as_str().parse::<f64>() {
            table.record(format_float(f), m.as_str());
        }
    }
}

/// `db.<collection>.<op>(`
fn call_head(input: &str) -> IResult<&str, (&str, &str)> {
    let name = |c: char| c.is_alphanumeric() || c == '_' || c == '-' || c == '$';
    let (input, _) = tuple((multispace0, tag("db"), char('.')))(input)?;
    let (input, collection) = take_while1(name)(input)?;
    let (input, op) = preceded(char('.'), take_while1(name))(input)?;
    let (input, _) = terminated(multispace0, char('('))(input)?;
    Ok((input, (collection, op)))
}

/// Decode the filter literal, closing any braces left open.
fn parse_filter(text: &str) -> MqlResult<Map<String, Value>> {
    let text = text.trim();
    if text.is_empty() {
        return Ok(Map::new());
    }
    let missing = scan::missing_braces(text);
    if missing == 0 {
        return literal::decode_object(text, "filter");
    }
    let repaired = format!("{}{}", text, "}".repeat(missing));
    literal::decode_object(&repaired, "filter")
}

fn parse_sort(text: &str) -> MqlResult<Vec<SortKey>> {
    let Some(args) = scan::find_call(text, "sort").map(str::trim) else {
        return Ok(Vec::new());
    };
    if args.is_empty() {
        return Ok(Vec::new());
    }
    let value = literal::decode_literal(args).map_err(|_| MqlError::modifier("sort", args))?;
    SortKey::list_from_json(&value).ok_or_else(|| MqlError::modifier("sort", args))
}

fn parse_count(text: &str, name: &'static str) -> MqlResult<Option<u64>> {
    match scan::find_call(text, name).map(str::trim) {
        None | Some("") => Ok(None),
        Some(args) => args
            .parse::<u64>()
            .map(Some)
            .map_err(|_| MqlError::modifier(name, args)),
    }
}
