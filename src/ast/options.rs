use serde_json::{Map, Value};

use super::{Fields, Predicate};

/// Sort direction, `1` or `-1` on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn from_i64(n: i64) -> Option<Self> {
        match n {
            1 => Some(SortDirection::Asc),
            -1 => Some(SortDirection::Desc),
            _ => None,
        }
    }

    /// Accepts `1`, `-1`, `1.0` and `-1.0`.
    pub fn from_json(v: &Value) -> Option<Self> {
        match v.as_i64() {
            Some(n) => Self::from_i64(n),
            None => match v.as_f64() {
                Some(f) if f == 1.0 => Some(SortDirection::Asc),
                Some(f) if f == -1.0 => Some(SortDirection::Desc),
                _ => None,
            },
        }
    }

    pub fn as_i64(self) -> i64 {
        match self {
            SortDirection::Asc => 1,
            SortDirection::Desc => -1,
        }
    }
}

/// One `(field, direction)` pair of a sort specification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortKey {
    pub field: String,
    pub direction: SortDirection,
}

impl SortKey {
    pub fn new(field: impl Into<String>, direction: SortDirection) -> Self {
        Self {
            field: field.into(),
            direction,
        }
    }

    pub fn asc(field: impl Into<String>) -> Self {
        Self::new(field, SortDirection::Asc)
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self::new(field, SortDirection::Desc)
    }

    /// Normalize a sort literal into ordered pairs.
    ///
    /// Accepts `{"a": 1, "b": -1}`, `[["a", 1], ["b", -1]]` and a single
    /// pair `["a", 1]`.
    pub fn list_from_json(value: &Value) -> Option<Vec<SortKey>> {
        match value {
            Value::Object(map) => map
                .iter()
                .map(|(field, dir)| Some(SortKey::new(field.as_str(), SortDirection::from_json(dir)?)))
                .collect(),
            Value::Array(items) => {
                if let Some(key) = Self::pair_from_json(value) {
                    return Some(vec![key]);
                }
                items.iter().map(Self::pair_from_json).collect()
            }
            _ => None,
        }
    }

    fn pair_from_json(value: &Value) -> Option<SortKey> {
        match value.as_array()?.as_slice() {
            [Value::String(field), dir] => {
                Some(SortKey::new(field.as_str(), SortDirection::from_json(dir)?))
            }
            _ => None,
        }
    }
}

/// Cursor options attached to a `find` call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryOptions {
    /// `path → 0/1`. `None` when absent or empty.
    pub projection: Option<Map<String, Value>>,
    /// Empty when the query has no `.sort()`.
    pub sort: Vec<SortKey>,
    pub skip: Option<u64>,
    pub limit: Option<u64>,
}

impl QueryOptions {
    pub fn is_empty(&self) -> bool {
        self.projection.as_ref().is_none_or(|p| p.is_empty())
            && self.sort.is_empty()
            && self.skip.is_none()
            && self.limit.is_none()
    }

    /// Sort specification as `{field: direction}` fields.
    pub fn sort_fields(&self) -> Fields {
        self.sort
            .iter()
            .map(|key| (key.field.clone(), Predicate::int(key.direction.as_i64())))
            .collect()
    }
}
