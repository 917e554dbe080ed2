//! Structural literal decoding.
//!
//! Literals are tried against an ordered list of strategies; the first one
//! that succeeds wins.
//!
//! ```text
//! Strict       {"a": [1, 2.5, null]}          plain JSON
//! Permissive   {a: 'x', 'b': (1, 2), c: True,} shell style
//! QuoteRepair  {"a': 1}                        ' → " then JSON
//! ```

use nom::{
    IResult,
    branch::alt,
    bytes::complete::take_while1,
    character::complete::{char, digit1, multispace0, one_of},
    combinator::{all_consuming, map, opt, recognize},
    error::{Error, ErrorKind},
    multi::separated_list0,
    sequence::{delimited, pair, preceded, separated_pair, terminated, tuple},
};
use serde_json::{Map, Number, Value};

use crate::error::{MqlError, MqlResult};

/// One way of turning literal text into a JSON value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LiteralStrategy {
    Strict,
    Permissive,
    QuoteRepair,
}

impl LiteralStrategy {
    /// Strategies in the order they are attempted.
    pub const ORDER: [LiteralStrategy; 3] = [
        LiteralStrategy::Strict,
        LiteralStrategy::Permissive,
        LiteralStrategy::QuoteRepair,
    ];

    pub fn decode(self, text: &str) -> Result<Value, String> {
        match self {
            LiteralStrategy::Strict => serde_json::from_str(text).map_err(|e| e.to_string()),
            LiteralStrategy::Permissive => all_consuming(ws(literal))(text)
                .map(|(_, v)| v)
                .map_err(|e| e.to_string()),
            LiteralStrategy::QuoteRepair => {
                serde_json::from_str(&text.replace('\'', "\"")).map_err(|e| e.to_string())
            }
        }
    }
}

/// Decode a literal with the first strategy that accepts it.
pub fn decode_literal(text: &str) -> MqlResult<Value> {
    for strategy in LiteralStrategy::ORDER {
        match strategy.decode(text) {
            Ok(v) => {
                if strategy != LiteralStrategy::Strict {
                    tracing::trace!(?strategy, "literal decoded by fallback strategy");
                }
                return Ok(v);
            }
            Err(reason) => tracing::trace!(?strategy, %reason, "literal strategy rejected input"),
        }
    }
    Err(MqlError::parse(text))
}

/// Decode a literal that must be an object.
pub fn decode_object(text: &str, what: &'static str) -> MqlResult<Map<String, Value>> {
    match decode_literal(text)? {
        Value::Object(map) => Ok(map),
        _ => Err(MqlError::NotAnObject {
            what,
            literal: text.to_string(),
        }),
    }
}

fn ws<'a, O>(
    inner: impl FnMut(&'a str) -> IResult<&'a str, O>,
) -> impl FnMut(&'a str) -> IResult<&'a str, O> {
    delimited(multispace0, inner, multispace0)
}

/// Parse any permissive literal.
fn literal(input: &str) -> IResult<&str, Value> {
    alt((
        object,
        sequence('[', ']'),
        sequence('(', ')'),
        map(quoted, Value::String),
        keyword,
        number,
    ))(input)
}

fn keyword(input: &str) -> IResult<&str, Value> {
    let (rest, word) = take_while1(|c: char| c.is_ascii_alphabetic())(input)?;
    let v = match word {
        "true" | "True" => Value::Bool(true),
        "false" | "False" => Value::Bool(false),
        "null" | "None" => Value::Null,
        _ => return Err(nom::Err::Error(Error::new(input, ErrorKind::Tag))),
    };
    Ok((rest, v))
}

fn number(input: &str) -> IResult<&str, Value> {
    let exponent = tuple((one_of("eE"), opt(one_of("+-")), digit1));
    let (rest, text) = recognize(tuple((
        opt(char('-')),
        digit1,
        opt(pair(char('.'), digit1)),
        opt(exponent),
    )))(input)?;

    let v = if let Ok(n) = text.parse::<i64>() {
        Some(Value::Number(n.into()))
    } else if let Ok(n) = text.parse::<u64>() {
        Some(Value::Number(n.into()))
    } else {
        text.parse::<f64>()
            .ok()
            .and_then(Number::from_f64)
            .map(Value::Number)
    };
    match v {
        Some(v) => Ok((rest, v)),
        None => Err(nom::Err::Error(Error::new(input, ErrorKind::Float))),
    }
}

/// `"..."` or `'...'` with backslash escapes.
fn quoted(input: &str) -> IResult<&str, String> {
    let mut chars = input.char_indices();
    let quote = match chars.next() {
        Some((_, q)) if q == '"' || q == '\'' => q,
        _ => return Err(nom::Err::Error(Error::new(input, ErrorKind::Char))),
    };

    let mut out = String::new();
    while let Some((i, c)) = chars.next() {
        if c == quote {
            return Ok((&input[i + c.len_utf8()..], out));
        }
        if c != '\\' {
            out.push(c);
            continue;
        }
        let Some((_, esc)) = chars.next() else { break };
        match esc {
            'n' => out.push('\n'),
            't' => out.push('\t'),
            'r' => out.push('\r'),
            'b' => out.push('\u{8}'),
            'f' => out.push('\u{c}'),
            'u' => {
                let hex: String = chars.by_ref().take(4).map(|(_, h)| h).collect();
                match u32::from_str_radix(&hex, 16).ok().and_then(char::from_u32) {
                    Some(ch) => out.push(ch),
                    None => return Err(nom::Err::Error(Error::new(input, ErrorKind::Escaped))),
                }
            }
            other => out.push(other),
        }
    }
    Err(nom::Err::Error(Error::new(input, ErrorKind::Char)))
}

/// Unquoted object key: identifier characters, `$` and `.`.
fn bare_key(input: &str) -> IResult<&str, String> {
    map(
        take_while1(|c: char| c.is_alphanumeric() || c == '_' || c == '$' || c == '.'),
        str::to_string,
    )(input)
}

fn object(input: &str) -> IResult<&str, Value> {
    let entry = separated_pair(ws(alt((quoted, bare_key))), char(':'), ws(literal));
    let (rest, entries) = delimited(
        char('{'),
        terminated(ws(separated_list0(char(','), entry)), opt(ws(char(',')))),
        char('}'),
    )(input)?;
    Ok((rest, Value::Object(entries.into_iter().collect())))
}

fn sequence(open: char, close: char) -> impl FnMut(&str) -> IResult<&str, Value> {
    move |input| {
        let (rest, items) = delimited(
            char(open),
            terminated(
                preceded(multispace0, separated_list0(char(','), ws(literal))),
                opt(ws(char(','))),
            ),
            preceded(multispace0, char(close)),
        )(input)?;
        Ok((rest, Value::Array(items)))
    }
}
