use serde_json::{Map, Number, Value};

use super::{ENTRY_KEYS, EQUALS, LIST_OPERATORS, VALUE_KEYS};
use crate::ast::{Fields, FlatPredicate, OPERATOR_SIGIL, Predicate};
use crate::error::{MqlError, MqlResult};
use crate::parser::LiteralStrategy;

/// Decode line-based text into a flat predicate.
///
/// Blank lines and lines with a single token are skipped. Clauses listed in
/// `_float_leaves` come back as floats; the table itself is dropped.
pub fn decode(text: &str) -> MqlResult<FlatPredicate> {
    let mut builder = FlatBuilder::default();
    for line in text.lines() {
        builder.line(line)?;
    }
    Ok(builder.finish())
}

/// Accumulates clauses for one decode call.
#[derive(Debug, Default)]
struct FlatBuilder {
    fields: Fields,
}

impl FlatBuilder {
    fn line(&mut self, line: &str) -> MqlResult<()> {
        let Some((field, rest)) = next_token(line) else {
            return Ok(());
        };
        let Some((op, value)) = next_token(rest) else {
            return Ok(());
        };
        let value = value.trim();

        if ENTRY_KEYS.contains(&field) {
            return self.entry(field, op, value);
        }
        if VALUE_KEYS.contains(&field) || op == EQUALS {
            return self.direct(field, single_value(value));
        }
        self.operator(field, op, value)
    }

    /// `sort timestamp -1`, `sort = {...}`, `_original_numbers 1.5 '1.50'`.
    fn entry(&mut self, field: &str, entry: &str, value: &str) -> MqlResult<()> {
        if entry == EQUALS {
            self.fields.insert(field, Predicate::from_json(single_value(value)));
            return Ok(());
        }
        let parsed = single_value(value);

        if !self.fields.contains_key(field) {
            self.fields.insert(field, Predicate::empty_object());
        }
        match self.fields.get_mut(field) {
            Some(Predicate::Object(entries)) => {
                entries.insert(entry, Predicate::from_json(parsed));
                Ok(())
            }
            _ => Err(MqlError::LineConflict {
                field: field.to_string(),
            }),
        }
    }

    fn direct(&mut self, field: &str, value: Value) -> MqlResult<()> {
        if matches!(self.fields.get(field), Some(Predicate::Operator(_))) {
            return Err(MqlError::LineConflict {
                field: field.to_string(),
            });
        }
        self.fields.insert(field, Predicate::from_json(value));
        Ok(())
    }

    fn operator(&mut self, field: &str, op: &str, value: &str) -> MqlResult<()> {
        let bare = op.strip_prefix(OPERATOR_SIGIL).unwrap_or(op);
        let mut ops = Map::new();

        match bare {
            _ if LIST_OPERATORS.contains(&bare) && value.is_empty() => {
                ops.insert(format!("${}", bare), Value::Array(Vec::new()));
            }
            "ne" => {
                let v = match value {
                    "''" | "\"\"" => Value::String(String::new()),
                    "[]" | "" => Value::Array(Vec::new()),
                    _ => parse_value(value, bare),
                };
                ops.insert("$ne".to_string(), v);
            }
            "regex" => match split_regex(value) {
                Some((pattern, flags)) => {
                    ops.insert("$regex".to_string(), Value::String(pattern));
                    ops.insert("$options".to_string(), Value::String(flags));
                }
                None => {
                    ops.insert("$regex".to_string(), parse_value(value, bare));
                }
            },
            _ => {
                ops.insert(format!("${}", bare), parse_value(value, bare));
            }
        }

        match self.fields.get_mut(field) {
            Some(Predicate::Operator(existing)) => {
                existing.extend(ops);
                Ok(())
            }
            Some(_) => Err(MqlError::LineConflict {
                field: field.to_string(),
            }),
            None => {
                self.fields.insert(field, Predicate::Operator(ops));
                Ok(())
            }
        }
    }

    fn finish(self) -> FlatPredicate {
        let mut flat = FlatPredicate::from(self.fields);
        flat.restore_floats();
        flat
    }
}

/// First whitespace-delimited token and the remainder.
fn next_token(s: &str) -> Option<(&str, &str)> {
    let s = s.trim_start();
    if s.is_empty() {
        return None;
    }
    match s.find(char::is_whitespace) {
        Some(i) => Some((&s[..i], &s[i..])),
        None => Some((s, "")),
    }
}

fn unquote(s: &str) -> Option<&str> {
    let bytes = s.as_bytes();
    let (first, last) = (*bytes.first()?, *bytes.last()?);
    (s.len() >= 2 && first == last && (first == b'\'' || first == b'"')).then(|| &s[1..s.len() - 1])
}

/// Operator-aware value: list operators also accept `a,b,c`.
fn parse_value(value: &str, op: &str) -> Value {
    let bare_list = LIST_OPERATORS.contains(&op)
        && value.contains(',')
        && !value.starts_with('[')
        && unquote(value).is_none();
    if bare_list {
        return Value::Array(value.split(',').map(single_value).collect());
    }
    single_value(value)
}

/// Quoted string, `None`, structural literal, boolean, integer, float,
/// else the raw text.
///
/// A double-quoted value is read as a JSON string when it is one, so
/// escaped control characters come back.
fn single_value(s: &str) -> Value {
    let s = s.trim();
    if s.starts_with('"') {
        if let Ok(decoded) = serde_json::from_str::<String>(s) {
            return Value::String(decoded);
        }
    }
    if let Some(inner) = unquote(s) {
        return Value::String(inner.to_string());
    }
    if s == "None" {
        return Value::Null;
    }
    let structural = (s.starts_with('{') && s.ends_with('}')) || (s.starts_with('[') && s.ends_with(']'));
    if structural {
        if let Ok(v) = LiteralStrategy::Permissive.decode(s) {
            return v;
        }
    }
    if s.eq_ignore_ascii_case("true") {
        return Value::Bool(true);
    }
    if s.eq_ignore_ascii_case("false") {
        return Value::Bool(false);
    }
    if let Ok(n) = s.parse::<i64>() {
        return Value::Number(n.into());
    }
    if let Some(n) = s.parse::<f64>().ok().and_then(Number::from_f64) {
        return Value::Number(n);
    }
    Value::String(s.to_string())
}

/// `^MH12 i` → (`^MH12`, `i`). Quoted patterns may be followed by flags
/// too: `'^a b' im`.
fn split_regex(value: &str) -> Option<(String, String)> {
    if let Some(quote) = value.chars().next().filter(|c| *c == '\'' || *c == '"') {
        let close = value.rfind(quote).filter(|&i| i > 0)?;
        let flags = value[close + 1..].trim();
        if flags.is_empty() || !flags.chars().all(|c| c.is_ascii_alphabetic()) {
            return None;
        }
        let pattern = match single_value(&value[..=close]) {
            Value::String(pattern) => pattern,
            _ => value[1..close].to_string(),
        };
        return Some((pattern, flags.to_string()));
    }
    let mut parts = value.split_whitespace();
    let pattern = parts.next()?;
    let flags: String = parts.collect();
    (!flags.is_empty()).then(|| (pattern.to_string(), flags))
}
