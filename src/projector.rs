//! Nested ⇄ flat predicate projection through a [`PathMap`].
//!
//! ```text
//! {"vehicle_details": {"license_plate_number": {"$regex": "^MH12"}}}
//!                          ⇅
//! {"license_plate_number": {"$regex": "^MH12"}}
//! ```
//!
//! Paths the map does not know are carried verbatim in both directions.

use serde_json::Value;

use crate::ast::flat::{FLOAT_LEAVES_KEY, ORIGINAL_NUMBERS_KEY};
use crate::ast::{
    Fields, FlatPredicate, Literal, Predicate, PredicateVisitor, QueryOptions, SortKey,
};
use crate::error::{MqlError, MqlResult};
use crate::schema::PathMap;

/// Collects leaves under their flat names.
struct Flattener<'m> {
    paths: &'m PathMap,
    out: FlatPredicate,
}

impl<'a> PredicateVisitor<'a> for Flattener<'_> {
    fn visit_leaf(&mut self, path: &str, leaf: &'a Predicate) {
        let key = self.paths.flat_name(path).unwrap_or(path);
        self.out.insert(key, leaf.clone());
    }
}

/// Flatten a nested predicate.
pub fn flatten(nested: &Predicate, paths: &PathMap) -> FlatPredicate {
    let mut visitor = Flattener {
        paths,
        out: FlatPredicate::new(),
    };
    nested.walk(&mut visitor);
    visitor.out
}

/// Split cursor options off a flat predicate and nest the rest.
///
/// `offset` and `order_by` stand in for `skip` and `sort` when those are
/// absent. The `_original_numbers` and `_float_leaves` side tables are
/// dropped.
pub fn nest(mut flat: FlatPredicate, paths: &PathMap) -> MqlResult<(Predicate, QueryOptions)> {
    let limit = take_option(&mut flat, "limit", None);
    let skip = take_option(&mut flat, "skip", Some("offset"));
    let sort = take_option(&mut flat, "sort", Some("order_by"));
    let projection = take_option(&mut flat, "projection", None);
    flat.remove(ORIGINAL_NUMBERS_KEY);
    flat.remove(FLOAT_LEAVES_KEY);

    let options = QueryOptions {
        projection: projection.map(|p| projection_map(&p)).transpose()?.flatten(),
        sort: sort.map(|s| sort_keys(&s)).transpose()?.unwrap_or_default(),
        skip: skip.map(|s| count("skip", &s)).transpose()?.flatten(),
        limit: limit.map(|l| count("limit", &l)).transpose()?.flatten(),
    };

    let mut root = Fields::new();
    for (key, value) in flat {
        let path = paths.dot_path(&key).unwrap_or(&key);
        set_nested(&mut root, path, value);
    }

    Ok((Predicate::Object(root), options))
}

/// Remove `key` (and its alias) and return the value that applies.
fn take_option(flat: &mut FlatPredicate, key: &str, alias: Option<&str>) -> Option<Predicate> {
    let primary = flat.remove(key);
    let fallback = alias.and_then(|a| flat.remove(a));
    primary.or(fallback)
}

/// Write `value` at `path`, creating intermediate objects.
///
/// When an intermediate node is already a leaf, the rest of the path is
/// kept as a dotted key next to it.
fn set_nested(fields: &mut Fields, path: &str, value: Predicate) {
    let Some((head, tail)) = path.split_once('.') else {
        fields.insert(path, value);
        return;
    };
    if !fields.contains_key(head) {
        fields.insert(head, Predicate::empty_object());
    }
    match fields.get_mut(head) {
        Some(Predicate::Object(child)) => set_nested(child, tail, value),
        _ => {
            fields.insert(path, value);
        }
    }
}

fn count(key: &str, value: &Predicate) -> MqlResult<Option<u64>> {
    let n = match value {
        Predicate::Literal(Literal::Null) => return Ok(None),
        Predicate::Literal(Literal::Int(n)) => u64::try_from(*n).ok(),
        Predicate::Literal(Literal::Float(f)) if f.fract() == 0.0 && *f >= 0.0 => Some(*f as u64),
        Predicate::Literal(Literal::String(s)) => s.trim().parse().ok(),
        _ => None,
    };
    n.map(Some).ok_or_else(|| MqlError::option(key, value.to_json()))
}

fn sort_keys(value: &Predicate) -> MqlResult<Vec<SortKey>> {
    if value.is_empty_value() {
        return Ok(Vec::new());
    }
    let json = value.to_json();
    SortKey::list_from_json(&json).ok_or_else(|| MqlError::option("sort", json))
}

fn projection_map(value: &Predicate) -> MqlResult<Option<serde_json::Map<String, Value>>> {
    if value.is_empty_value() {
        return Ok(None);
    }
    match value.to_json() {
        Value::Object(map) => Ok(Some(map)),
        other => Err(MqlError::option("projection", other)),
    }
}

/// Fold parsed cursor options back into a flat predicate.
pub fn merge_options(flat: &mut FlatPredicate, options: &QueryOptions) {
    if let Some(projection) = options.projection.as_ref().filter(|p| !p.is_empty()) {
        flat.insert("projection", Predicate::root(projection.clone()));
    }
    if !options.sort.is_empty() {
        flat.insert("sort", Predicate::Object(options.sort_fields()));
    }
    if let Some(skip) = options.skip {
        flat.insert("skip", Predicate::int(i64::try_from(skip).unwrap_or(i64::MAX)));
    }
    if let Some(limit) = options.limit {
        flat.insert("limit", Predicate::int(i64::try_from(limit).unwrap_or(i64::MAX)));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::DocumentSchema;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn paths() -> PathMap {
        let schema = DocumentSchema::from_json(
            r#"{"collections": [{"name": "events", "document": {"properties": {
                "severity": {"bsonType": "int"},
                "timestamp": {"bsonType": "date"},
                "vehicle_details": {"bsonType": "object", "properties": {
                    "license_plate_number": {"bsonType": "string"},
                    "color": {"bsonType": "string"}
                }}
            }}}]}"#,
        )
        .unwrap();
        PathMap::from_schema(&schema)
    }

    fn flat(v: serde_json::Value) -> FlatPredicate {
        let Predicate::Object(fields) = Predicate::from_json(v) else {
            panic!("not an object")
        };
        FlatPredicate::from(fields)
    }

    #[test]
    fn test_flatten_mapped_and_unmapped() {
        let nested = Predicate::from_json(json!({
            "vehicle_details": {"license_plate_number": {"$regex": "^MH12"}, "make": "Tata"},
            "severity": {"$gt": 5}
        }));
        let out = flatten(&nested, &paths());
        assert_eq!(
            out,
            flat(json!({
                "license_plate_number": {"$regex": "^MH12"},
                "vehicle_details.make": "Tata",
                "severity": {"$gt": 5}
            }))
        );
    }

    #[test]
    fn test_nest_creates_objects() {
        let (filter, options) =
            nest(flat(json!({"license_plate_number": {"$regex": "^MH12"}})), &paths()).unwrap();
        assert_eq!(
            filter.to_json(),
            json!({"vehicle_details": {"license_plate_number": {"$regex": "^MH12"}}})
        );
        assert!(options.is_empty());
    }

    #[test]
    fn test_nest_extracts_options() {
        let input = flat(json!({
            "severity": 3,
            "limit": 50,
            "skip": 10,
            "sort": {"timestamp": -1},
            "projection": {"_id": 0},
            "_original_numbers": {"1.5": "1.50"}
        }));
        let (filter, options) = nest(input, &paths()).unwrap();
        assert_eq!(filter.to_json(), json!({"severity": 3}));
        assert_eq!(options.limit, Some(50));
        assert_eq!(options.skip, Some(10));
        assert_eq!(options.sort, vec![SortKey::desc("timestamp")]);
        assert_eq!(options.projection.map(Value::Object), Some(json!({"_id": 0})));
    }

    #[test]
    fn test_nest_aliases() {
        let input = flat(json!({"offset": 5, "order_by": [["timestamp", 1]], "_id": 7}));
        let (filter, options) = nest(input, &paths()).unwrap();
        assert_eq!(options.skip, Some(5));
        assert_eq!(options.sort, vec![SortKey::asc("timestamp")]);
        assert_eq!(filter.to_json(), json!({"_id": 7}));
    }

    #[test]
    fn test_nest_primary_option_wins_over_alias() {
        let (_, options) = nest(flat(json!({"skip": 1, "offset": 9})), &paths()).unwrap();
        assert_eq!(options.skip, Some(1));
    }

    #[test]
    fn test_nest_invalid_option() {
        let err = nest(flat(json!({"limit": "many"})), &paths()).unwrap_err();
        assert!(matches!(err, MqlError::InvalidOption { key, .. } if key == "limit"));
        let err = nest(flat(json!({"sort": {"t": 3}})), &paths()).unwrap_err();
        assert!(matches!(err, MqlError::InvalidOption { key, .. } if key == "sort"));
    }

    #[test]
    fn test_nest_under_leaf_keeps_dotted_key() {
        let input = flat(json!({"a": 1, "a.b": 2}));
        let (filter, _) = nest(input, &PathMap::default()).unwrap();
        assert_eq!(filter.to_json(), json!({"a": 1, "a.b": 2}));
    }

    #[test]
    fn test_projection_inverse() {
        let nested = Predicate::from_json(json!({
            "severity": {"$gte": 2, "$lt": 8},
            "vehicle_details": {"license_plate_number": "MH12AB1234", "color": {"$in": ["red"]}},
            "timestamp": {"$gte": "2025-01-01T00:00:00Z"}
        }));
        let paths = paths();
        let (back, options) = nest(flatten(&nested, &paths), &paths).unwrap();
        assert_eq!(back, nested);
        assert!(options.is_empty());
    }

    #[test]
    fn test_flatten_of_nest_is_identity() {
        let input = flat(json!({"license_plate_number": "X", "severity": {"$ne": 1}, "extra.path": 1}));
        let paths = paths();
        let (nested, _) = nest(input.clone(), &paths).unwrap();
        assert_eq!(flatten(&nested, &paths), input);
    }

    #[test]
    fn test_merge_options() {
        let mut out = FlatPredicate::new();
        let options = QueryOptions {
            projection: Some(serde_json::Map::new()),
            sort: vec![SortKey::desc("timestamp")],
            skip: None,
            limit: Some(5),
        };
        merge_options(&mut out, &options);
        assert_eq!(out, flat(json!({"sort": {"timestamp": -1}, "limit": 5})));
    }
}
