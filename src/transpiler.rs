//! Query string generator.
//!
//! Renders a predicate and its cursor options as canonical query text.
//! Filters are always written with dot-notation keys:
//!
//! ```text
//! {"vehicle_details": {"license_plate_number": {"$regex": "^MH12"}}}
//!   → db.events.find({"vehicle_details.license_plate_number":{"$regex":"^MH12"}})
//! ```

use serde::Deserialize;
use serde_json::Value;

use crate::ast::{DateSpelling, FlatPredicate, ParseMeta, Predicate, QueryOptions};
use crate::canon::format_float;
use crate::error::MqlResult;
use crate::patterns::Patterns;
use crate::projector;
use crate::schema::PathMap;

/// Constructor used for instants with no recorded spelling.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DateStyle {
    #[default]
    IsoDate,
    NewDate,
}

impl DateStyle {
    fn spelling(self) -> DateSpelling {
        match self {
            DateStyle::IsoDate => DateSpelling::IsoDate,
            DateStyle::NewDate => DateSpelling::NewDate,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GeneratorConfig {
    pub date_style: DateStyle,
    /// Write floats with their recorded original spelling (`1.50`).
    pub restore_numbers: bool,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            date_style: DateStyle::IsoDate,
            restore_numbers: true,
        }
    }
}

#[derive(Debug)]
pub struct Generator<'p> {
    patterns: &'p Patterns,
    config: GeneratorConfig,
}

impl<'p> Generator<'p> {
    pub fn new(patterns: &'p Patterns, config: GeneratorConfig) -> Self {
        Self { patterns, config }
    }

    /// Nest a flat predicate and render it.
    pub fn generate(
        &self,
        flat: &FlatPredicate,
        paths: &PathMap,
        collection: &str,
    ) -> MqlResult<String> {
        self.generate_with(flat, paths, collection, &ParseMeta::default())
    }

    /// Like [`generate`](Self::generate), reproducing the surface details
    /// a parse recorded.
    ///
    /// Spellings stored under the flat predicate's `_original_numbers` key
    /// are merged with those in `meta`; clauses listed under
    /// `_float_leaves` are written as floats.
    pub fn generate_with(
        &self,
        flat: &FlatPredicate,
        paths: &PathMap,
        collection: &str,
        meta: &ParseMeta,
    ) -> MqlResult<String> {
        let mut meta = meta.clone();
        if let Some(table) = flat.original_numbers() {
            for (canonical, original) in table.iter() {
                meta.original_numbers.record(canonical, original);
            }
        }
        let mut flat = flat.clone();
        flat.restore_floats();
        let (filter, options) = projector::nest(flat, paths)?;
        Ok(self.render(&filter, &options, collection, &meta))
    }

    /// Render an already nested predicate.
    pub fn render(
        &self,
        filter: &Predicate,
        options: &QueryOptions,
        collection: &str,
        meta: &ParseMeta,
    ) -> String {
        let writer = Writer {
            patterns: self.patterns,
            config: &self.config,
            meta,
        };

        let mut out = format!("db.{}.find(", collection);
        writer.filter(&mut out, filter);
        if let Some(projection) = options.projection.as_ref().filter(|p| !p.is_empty()) {
            out.push_str(", ");
            writer.object(&mut out, projection.iter().map(|(k, v)| (k.as_str(), v)));
        }
        out.push(')');

        if !options.sort.is_empty() {
            let keys: Vec<String> = options
                .sort
                .iter()
                .map(|key| format!("{}:{}", quote(&key.field), key.direction.as_i64()))
                .collect();
            out.push_str(&format!(".sort({{{}}})", keys.join(",")));
        }
        if let Some(skip) = options.skip.filter(|n| *n != 0) {
            out.push_str(&format!(".skip({})", skip));
        }
        if let Some(limit) = options.limit.filter(|n| *n != 0) {
            out.push_str(&format!(".limit({})", limit));
        }
        out
    }
}

fn quote(s: &str) -> String {
    Value::String(s.to_string()).to_string()
}

/// Compact JSON writer with date and number spellings.
struct Writer<'a> {
    patterns: &'a Patterns,
    config: &'a GeneratorConfig,
    meta: &'a ParseMeta,
}

impl Writer<'_> {
    /// Root filter with one dot-notation key per leaf.
    fn filter(&self, out: &mut String, filter: &Predicate) {
        let leaves: Vec<(String, Value)> = filter
            .leaves()
            .into_iter()
            .map(|(path, leaf)| (path, leaf.to_json()))
            .collect();
        self.object(out, leaves.iter().map(|(k, v)| (k.as_str(), v)));
    }

    fn object<'v>(&self, out: &mut String, entries: impl Iterator<Item = (&'v str, &'v Value)>) {
        out.push('{');
        for (i, (key, value)) in entries.enumerate() {
            if i > 0 {
                out.push(',');
            }
            out.push_str(&quote(key));
            out.push(':');
            self.value(out, value);
        }
        out.push('}');
    }

    fn value(&self, out: &mut String, value: &Value) {
        match value {
            Value::Null => out.push_str("null"),
            Value::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
            Value::Number(n) => match n.as_f64().filter(|_| n.is_f64()) {
                Some(f) => out.push_str(&self.float(f)),
                None => out.push_str(&n.to_string()),
            },
            Value::String(s) => out.push_str(&self.string(s)),
            Value::Array(items) => {
                out.push('[');
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        out.push(',');
                    }
                    self.value(out, item);
                }
                out.push(']');
            }
            Value::Object(map) => self.object(out, map.iter().map(|(k, v)| (k.as_str(), v))),
        }
    }

    fn float(&self, f: f64) -> String {
        let canonical = format_float(f);
        if self.config.restore_numbers {
            if let Some(original) = self.meta.original_numbers.get(&canonical) {
                return original.to_string();
            }
        }
        canonical
    }

    fn string(&self, s: &str) -> String {
        if self.patterns.is_relative_marker(s) {
            return s.to_string();
        }
        if let Some(spelling) = self.meta.dates.get(s) {
            return spelling.render(s);
        }
        if self.patterns.is_instant(s) {
            return self.config.date_style.spelling().render(s);
        }
        quote(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{Fields, OriginalNumbers, SortKey};
    use crate::schema::DocumentSchema;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn paths() -> PathMap {
        let schema = DocumentSchema::from_json(
            r#"{"collections": [{"name": "events", "document": {"properties": {
                "severity": {"bsonType": "int"},
                "timestamp": {"bsonType": "date"},
                "speed": {"bsonType": "double"},
                "vehicle_details": {"bsonType": "object", "properties": {
                    "license_plate_number": {"bsonType": "string"}
                }}
            }}}]}"#,
        )
        .unwrap();
        PathMap::from_schema(&schema)
    }

    fn flat(v: Value) -> FlatPredicate {
        let Predicate::Object(fields) = Predicate::from_json(v) else {
            panic!("not an object")
        };
        FlatPredicate::from(fields)
    }

    fn generate(v: Value) -> String {
        let patterns = Patterns::new().unwrap();
        Generator::new(&patterns, GeneratorConfig::default())
            .generate(&flat(v), &paths(), "events")
            .unwrap()
    }

    #[test]
    fn test_simple_filter() {
        assert_eq!(
            generate(json!({"severity": {"$gt": 5}})),
            r#"db.events.find({"severity":{"$gt":5}})"#
        );
    }

    #[test]
    fn test_dot_notation() {
        assert_eq!(
            generate(json!({"license_plate_number": {"$regex": "^MH12"}})),
            r#"db.events.find({"vehicle_details.license_plate_number":{"$regex":"^MH12"}})"#
        );
    }

    #[test]
    fn test_instant_defaults_to_iso_date() {
        assert_eq!(
            generate(json!({"timestamp": {"$gte": "2025-01-01T00:00:00Z"}})),
            r#"db.events.find({"timestamp":{"$gte":ISODate("2025-01-01T00:00:00Z")}})"#
        );
    }

    #[test]
    fn test_new_date_style() {
        let patterns = Patterns::new().unwrap();
        let config = GeneratorConfig {
            date_style: DateStyle::NewDate,
            ..GeneratorConfig::default()
        };
        let out = Generator::new(&patterns, config)
            .generate(&flat(json!({"timestamp": "2025-01-01T00:00:00Z"})), &paths(), "events")
            .unwrap();
        assert_eq!(out, r#"db.events.find({"timestamp":newDate("2025-01-01T00:00:00Z")})"#);
    }

    #[test]
    fn test_recorded_spellings() {
        let patterns = Patterns::new().unwrap();
        let mut meta = ParseMeta::default();
        meta.dates.record("2025-06-01T08:30:00Z", DateSpelling::Now);
        meta.dates.record(
            "2025-05-31T08:30:00Z",
            DateSpelling::Relative("newDate(newDate().getTime()-86400000)".into()),
        );
        let out = Generator::new(&patterns, GeneratorConfig::default())
            .generate_with(
                &flat(json!({"timestamp": {"$gte": "2025-05-31T08:30:00Z", "$lte": "2025-06-01T08:30:00Z"}})),
                &paths(),
                "events",
                &meta,
            )
            .unwrap();
        assert_eq!(
            out,
            r#"db.events.find({"timestamp":{"$gte":newDate(newDate().getTime()-86400000),"$lte":newDate()}})"#
        );
    }

    #[test]
    fn test_relative_marker_verbatim() {
        assert_eq!(
            generate(json!({"timestamp": {"$gte": "newDate(newDate().getTime()-3600000)"}})),
            r#"db.events.find({"timestamp":{"$gte":newDate(newDate().getTime()-3600000)}})"#
        );
    }

    #[test]
    fn test_options_chain() {
        let out = generate(json!({
            "severity": 3,
            "limit": 50,
            "skip": 10,
            "sort": {"timestamp": -1, "severity": 1},
            "projection": {"_id": 0}
        }));
        assert_eq!(
            out,
            r#"db.events.find({"severity":3}, {"_id":0}).sort({"timestamp":-1,"severity":1}).skip(10).limit(50)"#
        );
    }

    #[test]
    fn test_zero_and_empty_options_omitted() {
        let out = generate(json!({"severity": 3, "limit": 0, "skip": 0, "sort": {}, "projection": {}}));
        assert_eq!(out, r#"db.events.find({"severity":3})"#);
    }

    #[test]
    fn test_original_number_spelling() {
        let patterns = Patterns::new().unwrap();
        let mut table = OriginalNumbers::default();
        table.record("20.5", "20.50");
        let mut input = flat(json!({"speed": {"$gt": 20.5}, "severity": 2.0}));
        input.insert("_original_numbers", table.to_predicate());
        let out = Generator::new(&patterns, GeneratorConfig::default())
            .generate(&input, &paths(), "events")
            .unwrap();
        assert_eq!(out, r#"db.events.find({"speed":{"$gt":20.50},"severity":2.0})"#);
    }

    #[test]
    fn test_float_leaves_table() {
        let patterns = Patterns::new().unwrap();
        let mut input = flat(json!({"speed": {"$gt": 20}, "severity": 20}));
        input.insert("_float_leaves", Predicate::from_json(json!({"speed": ["gt"]})));
        let out = Generator::new(&patterns, GeneratorConfig::default())
            .generate(&input, &paths(), "events")
            .unwrap();
        assert_eq!(out, r#"db.events.find({"speed":{"$gt":20.0},"severity":20})"#);
    }

    #[test]
    fn test_render_empty_filter() {
        let patterns = Patterns::new().unwrap();
        let options = QueryOptions {
            sort: vec![SortKey::desc("timestamp")],
            ..QueryOptions::default()
        };
        let out = Generator::new(&patterns, GeneratorConfig::default()).render(
            &Predicate::Object(Fields::new()),
            &options,
            "events",
            &ParseMeta::default(),
        );
        assert_eq!(out, r#"db.events.find({}).sort({"timestamp":-1})"#);
    }
}
