//! Parser side channel: surface details needed to regenerate a query
//! exactly as it was written.

use std::collections::HashMap;

use super::{Fields, Literal, Predicate};

/// How a date literal was spelled in the source text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DateSpelling {
    /// `ISODate("...")`
    IsoDate,
    /// `newDate("...")`
    NewDate,
    /// `newDate()`
    Now,
    /// `newDate(newDate().getTime()-...)`, kept verbatim.
    Relative(String),
}

impl DateSpelling {
    /// Render `instant` in this spelling.
    pub fn render(&self, instant: &str) -> String {
        let quoted = serde_json::Value::String(instant.to_string()).to_string();
        match self {
            DateSpelling::IsoDate => format!("ISODate({})", quoted),
            DateSpelling::NewDate => format!("newDate({})", quoted),
            DateSpelling::Now => "newDate()".to_string(),
            DateSpelling::Relative(expr) => expr.clone(),
        }
    }
}

/// Instant string → the spelling it came from.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DateSpellings {
    by_instant: HashMap<String, DateSpelling>,
}

impl DateSpellings {
    pub fn record(&mut self, instant: impl Into<String>, spelling: DateSpelling) {
        self.by_instant.insert(instant.into(), spelling);
    }

    pub fn get(&self, instant: &str) -> Option<&DateSpelling> {
        self.by_instant.get(instant)
    }

    pub fn len(&self) -> usize {
        self.by_instant.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_instant.is_empty()
    }
}

/// Canonical float text → longest original spelling (`"1.5" → "1.50"`).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OriginalNumbers {
    entries: Vec<(String, String)>,
}

impl OriginalNumbers {
    /// Record a spelling, keeping the longest one seen per canonical key.
    pub fn record(&mut self, canonical: impl Into<String>, original: impl Into<String>) {
        let canonical = canonical.into();
        let original = original.into();
        match self.entries.iter_mut().find(|(k, _)| *k == canonical) {
            Some((_, existing)) => {
                if original.len() > existing.len() {
                    *existing = original;
                }
            }
            None => self.entries.push((canonical, original)),
        }
    }

    pub fn get(&self, canonical: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == canonical)
            .map(|(_, v)| v.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Table as a flat-predicate value.
    pub fn to_predicate(&self) -> Predicate {
        Predicate::Object(
            self.entries
                .iter()
                .map(|(k, v)| (k.clone(), Predicate::string(v.as_str())))
                .collect::<Fields>(),
        )
    }

    /// Read the table back from a flat-predicate value.
    ///
    /// Numeric entries (as written by hand in line-based text) are kept
    /// in their decimal form.
    pub fn from_predicate(p: &Predicate) -> Self {
        let mut table = Self::default();
        if let Some(fields) = p.as_object() {
            for (k, v) in fields.iter() {
                let original = match v {
                    Predicate::Literal(Literal::String(s)) => s.clone(),
                    Predicate::Literal(Literal::Int(n)) => n.to_string(),
                    Predicate::Literal(Literal::Float(f)) => crate::canon::format_float(*f),
                    _ => continue,
                };
                table.record(k, original);
            }
        }
        table
    }
}

/// Everything the parser learns besides the predicate and options.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParseMeta {
    pub original_numbers: OriginalNumbers,
    pub dates: DateSpellings,
}
