use serde_json::Value;

use super::{ENTRY_KEYS, EQUALS};
use crate::ast::flat::{FLOAT_LEAVES_KEY, is_integral};
use crate::ast::{FlatPredicate, OPERATOR_SIGIL, Predicate};
use crate::canon::format_float;

/// Encode a flat predicate as line-based text.
///
/// Top-level `null`, `""`, `[]` and `{}` values are pruned first. Clauses
/// holding an integral float are listed under `_float_leaves` at the end.
pub fn encode(flat: &FlatPredicate) -> String {
    let mut flat = flat.pruned();
    flat.remove(FLOAT_LEAVES_KEY);
    if let Some(table) = flat.float_leaves() {
        flat.insert(FLOAT_LEAVES_KEY, table);
    }

    let mut lines = Vec::new();
    for (key, value) in flat.iter() {
        match value {
            Predicate::Object(entries) if ENTRY_KEYS.contains(&key) => {
                for (entry, v) in entries.iter() {
                    lines.push(format!("{} {} {}", key, entry, scalar(&v.to_json())));
                }
            }
            Predicate::Operator(ops) => {
                for (op, v) in ops {
                    let op = op.strip_prefix(OPERATOR_SIGIL).unwrap_or(op);
                    lines.push(format!("{} {} {}", key, op, scalar(v)));
                }
            }
            Predicate::Literal(lit) => {
                lines.push(format!("{} {} {}", key, EQUALS, scalar(&lit.to_json())));
            }
            Predicate::Sequence(_) | Predicate::Object(_) => {
                lines.push(format!("{} {} {}", key, EQUALS, structural(&value.to_json())));
            }
        }
    }
    lines.join("\n")
}

/// Value in clause position: strings single-quoted as-is (JSON-quoted
/// when they hold control characters), integral floats without a
/// fractional part.
fn scalar(value: &Value) -> String {
    match value {
        Value::String(s) if s.chars().any(char::is_control) => value.to_string(),
        Value::String(s) => format!("'{}'", s),
        Value::Number(n) if n.is_f64() => match n.as_f64() {
            Some(f) if is_integral(f) => (f as i64).to_string(),
            Some(f) => format_float(f),
            None => n.to_string(),
        },
        other => structural(other),
    }
}

/// Compact shell-style literal: `[1,'a',True]`, `{'k':None}`.
fn structural(value: &Value) -> String {
    match value {
        Value::Null => "None".to_string(),
        Value::Bool(true) => "True".to_string(),
        Value::Bool(false) => "False".to_string(),
        Value::Number(n) => match n.as_f64().filter(|_| n.is_f64()) {
            Some(f) => format_float(f),
            None => n.to_string(),
        },
        Value::String(s) => quote_single(s),
        Value::Array(items) => {
            let items: Vec<String> = items.iter().map(structural).collect();
            format!("[{}]", items.join(","))
        }
        Value::Object(map) => {
            let entries: Vec<String> = map
                .iter()
                .map(|(k, v)| format!("{}:{}", quote_single(k), structural(v)))
                .collect();
            format!("{{{}}}", entries.join(","))
        }
    }
}

fn quote_single(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('\'');
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            c if c.is_control() => out.push_str(&format!("\\u{:04x}", c as u32)),
            c => out.push(c),
        }
    }
    out.push('\'');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn flat(v: Value) -> FlatPredicate {
        let Predicate::Object(fields) = Predicate::from_json(v) else {
            panic!("not an object")
        };
        FlatPredicate::from(fields)
    }

    #[test]
    fn test_operator_lines() {
        assert_eq!(encode(&flat(json!({"severity": {"$gt": 5}}))), "severity gt 5");
        assert_eq!(
            encode(&flat(json!({"camera_id": {"$in": [1, 2, 3]}}))),
            "camera_id in [1,2,3]"
        );
    }

    #[test]
    fn test_equality_lines() {
        let out = encode(&flat(json!({
            "camera_name": "Gate 4",
            "flagged": true,
            "speed": 20.0,
            "ratio": 0.25,
            "tags": ["a", "b"]
        })));
        assert_eq!(
            out,
            "camera_name = 'Gate 4'\nflagged = True\nspeed = 20\nratio = 0.25\ntags = ['a','b']\n_float_leaves speed ['=']"
        );
    }

    #[test]
    fn test_reserved_entry_lines() {
        let out = encode(&flat(json!({
            "sort": {"timestamp": -1, "severity": 1},
            "projection": {"_id": 0},
            "_original_numbers": {"20.5": "20.50"},
            "limit": 50
        })));
        assert_eq!(
            out,
            "sort timestamp -1\nsort severity 1\nprojection _id 0\n_original_numbers 20.5 '20.50'\nlimit = 50"
        );
    }

    #[test]
    fn test_ne_empty_values() {
        assert_eq!(encode(&flat(json!({"zone": {"$ne": ""}}))), "zone ne ''");
        assert_eq!(encode(&flat(json!({"zone": {"$ne": []}}))), "zone ne []");
        assert_eq!(encode(&flat(json!({"zone": {"$ne": null}}))), "zone ne None");
    }

    #[test]
    fn test_structural_floats_keep_fraction() {
        assert_eq!(
            encode(&flat(json!({"speed": {"$in": [1.0, 2.5]}}))),
            "speed in [1.0,2.5]"
        );
    }

    #[test]
    fn test_structural_escapes() {
        assert_eq!(
            encode(&flat(json!({"names": {"$in": ["it's", "a\\b"]}}))),
            r"names in ['it\'s','a\\b']"
        );
    }

    #[test]
    fn test_integral_floats_are_listed() {
        let out = encode(&flat(json!({
            "severity": 20,
            "speed": {"$gt": 20.0, "$lt": 90.5},
            "_float_leaves": {"severity": ["="]}
        })));
        assert_eq!(out, "severity = 20\nspeed gt 20\nspeed lt 90.5\n_float_leaves speed ['gt']");
    }

    #[test]
    fn test_control_characters_are_escaped() {
        assert_eq!(
            encode(&flat(json!({"note": "a\nb", "plain": "a b"}))),
            "note = \"a\\nb\"\nplain = 'a b'"
        );
        assert_eq!(
            encode(&flat(json!({"notes": {"$in": ["a\tb", "c\u{1}"]}}))),
            r"notes in ['a\tb','c\u0001']"
        );
    }
}
