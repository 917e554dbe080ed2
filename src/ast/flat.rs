//! Schema-flattened predicate: one level, leaf name → leaf value.

use serde_json::{Number, Value};

use super::{Fields, Literal, OPERATOR_SIGIL, OriginalNumbers, Predicate};

/// Cursor option keys, in extraction order.
pub const OPTION_KEYS: [&str; 4] = ["limit", "skip", "sort", "projection"];

/// Side table of original decimal spellings.
pub const ORIGINAL_NUMBERS_KEY: &str = "_original_numbers";

/// Clauses whose integral float was written without its fraction.
pub const FLOAT_LEAVES_KEY: &str = "_float_leaves";

/// Clause name for an equality in the [`FLOAT_LEAVES_KEY`] table.
pub const EQUALITY_CLAUSE: &str = "=";

/// Largest magnitude an integral float may have and still be written as
/// an integer.
const MAX_EXACT_INT: f64 = 9_007_199_254_740_992.0;

/// A single-level mapping from flat field names to predicate leaves.
///
/// Besides filter fields it may carry the cursor option keys
/// ([`OPTION_KEYS`], plus `order_by`/`offset` from line-based text) and
/// the [`ORIGINAL_NUMBERS_KEY`] and [`FLOAT_LEAVES_KEY`] side tables.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FlatPredicate {
    fields: Fields,
}

impl FlatPredicate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&Predicate> {
        self.fields.get(key)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut Predicate> {
        self.fields.get_mut(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: Predicate) -> Option<Predicate> {
        self.fields.insert(key, value)
    }

    pub fn remove(&mut self, key: &str) -> Option<Predicate> {
        self.fields.remove(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Predicate)> {
        self.fields.iter()
    }

    pub fn fields(&self) -> &Fields {
        &self.fields
    }

    pub fn into_fields(self) -> Fields {
        self.fields
    }

    /// The `_original_numbers` side table, if present.
    pub fn original_numbers(&self) -> Option<OriginalNumbers> {
        self.get(ORIGINAL_NUMBERS_KEY).map(OriginalNumbers::from_predicate)
    }

    /// Drop top-level values that are `null`, `""`, `[]` or `{}`.
    pub fn pruned(&self) -> FlatPredicate {
        let mut fields = self.fields.clone();
        fields.retain(|_, v| !v.is_empty_value());
        FlatPredicate { fields }
    }

    /// Clauses whose value is an integral float, as `{key: ['gt', '=']}`
    /// (`=` for an equality). `None` when there are none.
    ///
    /// Line-based text writes such values without a fractional part; this
    /// table lets [`restore_floats`](Self::restore_floats) undo that per
    /// clause.
    pub fn float_leaves(&self) -> Option<Predicate> {
        let mut table = Fields::new();
        for (key, value) in self.fields.iter() {
            if key.starts_with('_') {
                continue;
            }
            let clauses: Vec<Value> = match value {
                Predicate::Literal(Literal::Float(f)) if is_integral(*f) => {
                    vec![Value::String(EQUALITY_CLAUSE.to_string())]
                }
                Predicate::Operator(map) => map
                    .iter()
                    .filter(|(_, v)| v.is_f64() && v.as_f64().is_some_and(is_integral))
                    .map(|(op, _)| Value::String(op.trim_start_matches(OPERATOR_SIGIL).to_string()))
                    .collect(),
                _ => Vec::new(),
            };
            if !clauses.is_empty() {
                table.insert(key, Predicate::Sequence(clauses));
            }
        }
        (!table.is_empty()).then_some(Predicate::Object(table))
    }

    /// Remove the [`FLOAT_LEAVES_KEY`] table and turn the integer values it
    /// lists back into floats. Clauses it does not list are left alone.
    pub fn restore_floats(&mut self) {
        let Some(Predicate::Object(table)) = self.remove(FLOAT_LEAVES_KEY) else {
            return;
        };
        for (key, clauses) in table.iter() {
            let clauses: Vec<&str> = match clauses {
                Predicate::Sequence(items) => items.iter().filter_map(Value::as_str).collect(),
                Predicate::Literal(Literal::String(s)) => vec![s.as_str()],
                _ => continue,
            };
            let Some(value) = self.fields.get_mut(key) else {
                continue;
            };
            for clause in clauses {
                match &mut *value {
                    Predicate::Literal(lit) if clause == EQUALITY_CLAUSE => {
                        if let Literal::Int(n) = *lit {
                            *lit = Literal::Float(n as f64);
                        }
                    }
                    Predicate::Operator(map) => {
                        let op =
                            format!("{}{}", OPERATOR_SIGIL, clause.trim_start_matches(OPERATOR_SIGIL));
                        let Some(v) = map.get_mut(&op) else { continue };
                        let float = v.as_i64().and_then(|n| Number::from_f64(n as f64));
                        if let Some(num) = float {
                            *v = Value::Number(num);
                        }
                    }
                    _ => {}
                }
            }
        }
    }
}

/// Whether a float is written as an integer in line-based text.
pub(crate) fn is_integral(f: f64) -> bool {
    f.fract() == 0.0 && f.abs() < MAX_EXACT_INT
}

impl From<Fields> for FlatPredicate {
    fn from(fields: Fields) -> Self {
        Self { fields }
    }
}

impl FromIterator<(String, Predicate)> for FlatPredicate {
    fn from_iter<I: IntoIterator<Item = (String, Predicate)>>(iter: I) -> Self {
        Self {
            fields: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for FlatPredicate {
    type Item = (String, Predicate);
    type IntoIter = std::vec::IntoIter<(String, Predicate)>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.into_iter()
    }
}
