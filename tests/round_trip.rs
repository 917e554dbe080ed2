//! End-to-end conversions over the events schema.

use chrono::{TimeZone, Utc};
use pretty_assertions::assert_eq;
use qail_mql::prelude::*;
use serde_json::json;

const SCHEMA: &str = include_str!("fixtures/events.json");

fn mql() -> Transpiler {
    Transpiler::from_schema_json(SCHEMA)
        .unwrap()
        .with_clock(FixedClock(Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()))
}

fn flat(v: serde_json::Value) -> FlatPredicate {
    let Predicate::Object(fields) = Predicate::from_json(v) else {
        panic!("not an object")
    };
    FlatPredicate::from(fields)
}

#[test]
fn test_top_level_operator() {
    let mql = mql();
    let query = r#"db.events.find({"severity":{"$gt":5}})"#;

    let parsed = mql.parse(query).unwrap();
    assert_eq!(mql.flatten(&parsed.filter), flat(json!({"severity": {"$gt": 5}})));

    let lines = mql.to_lines(query).unwrap();
    assert_eq!(lines, "severity gt 5");
    assert_eq!(qail_mql::decode(&lines).unwrap(), mql.to_flat(query).unwrap());
    assert_eq!(mql.from_lines(&lines).unwrap(), query);
}

#[test]
fn test_nested_path_generates_dot_notation() {
    let mql = mql();
    let input = flat(json!({"license_plate_number": {"$regex": "^MH12"}}));

    let (nested, _) = mql.nest(input.clone()).unwrap();
    assert_eq!(
        nested.to_json(),
        json!({"vehicle_details": {"license_plate_number": {"$regex": "^MH12"}}})
    );
    assert_eq!(
        mql.generate(&input).unwrap(),
        r#"db.events.find({"vehicle_details.license_plate_number":{"$regex":"^MH12"}})"#
    );
}

#[test]
fn test_options_extracted_before_nesting() {
    let mql = mql();
    let decoded = qail_mql::decode("limit = 50\nskip = 10\nsort = {\"timestamp\":-1}").unwrap();
    let (filter, options) = mql.nest(decoded).unwrap();

    assert_eq!(filter.to_json(), json!({}));
    assert_eq!(options.limit, Some(50));
    assert_eq!(options.skip, Some(10));
    assert_eq!(options.sort, vec![SortKey::desc("timestamp")]);
}

#[test]
fn test_in_list_keeps_order() {
    let input = flat(json!({"camera_id": {"$in": [1, 2, 3]}}));
    let lines = qail_mql::encode(&input);
    assert_eq!(lines, "camera_id in [1,2,3]");
    assert_eq!(qail_mql::decode(&lines).unwrap(), input);
}

#[test]
fn test_iso_date_regenerates_as_iso_date() {
    let mql = mql();
    let query = r#"db.events.find({"timestamp":{"$gte":ISODate("2025-01-01T00:00:00Z")}})"#;

    let parsed = mql.parse(query).unwrap();
    assert_eq!(
        parsed.filter.to_json(),
        json!({"timestamp": {"$gte": "2025-01-01T00:00:00Z"}})
    );

    let target = mql.verify(query).unwrap();
    assert_eq!(target.lines, "timestamp gte '2025-01-01T00:00:00Z'");
    assert_eq!(mql.from_lines(&target.lines).unwrap(), query);
}

#[test]
fn test_missing_brace_is_repaired() {
    let parsed = mql().parse(r#"db.events.find({"a":1"#).unwrap();
    assert_eq!(parsed.filter.to_json(), json!({"a": 1}));
}

#[test]
fn test_corpus_round_trips() {
    let mql = mql();
    let corpus = [
        r#"db.events.find({"severity":{"$gte":7},"event_type":"speeding"}).sort({"timestamp":-1}).limit(10)"#,
        r#"db.events.find({"vehicle_details.license_plate_number":{"$regex":"^MH12","$options":"i"}})"#,
        r#"db.events.find({"location.coordinates.latitude":{"$gte":18.50,"$lte":19.25}},{"_id":0,"timestamp":1}).skip(20).limit(20)"#,
        r#"db.events.find({"timestamp":{"$gte":ISODate("2025-01-01T00:00:00Z"),"$lt":ISODate("2025-02-01T00:00:00Z")},"camera_id":{"$in":[1,2,3]}})"#,
        r#"db.events.find({"speed":{"$gt":80.0},"vehicle_details.vehicle_color":{"$ne":"white"}})"#,
        r#"db.events.find({"$or":[{"severity":{"$gte":9}},{"event_type":"collision"}]})"#,
        r#"db.events.find({"camera_name":"Gate4","involved_persons.role":"driver"})"#,
    ];

    let report = mql.convert_all(corpus);
    assert!(report.failures.is_empty(), "failures: {:?}", report.failures);
    assert_eq!(report.targets.len(), corpus.len());

    for (query, target) in corpus.iter().zip(&report.targets) {
        assert_eq!(qail_mql::decode(&target.lines).unwrap(), target.flat);
        let regenerated = mql.from_lines(&target.lines).unwrap();
        assert_eq!(
            qail_mql::canonicalize(&regenerated),
            qail_mql::canonicalize(query)
        );
    }
}

#[test]
fn test_shell_formatting_is_canonicalized() {
    let mql = mql();
    let lines = mql
        .to_lines(
            "db.events.find( { 'location.zone' : 'north', 'speed' : { '$lt' : 20.50 } } ).toArray()",
        )
        .unwrap();
    assert_eq!(
        lines,
        "zone = 'north'\nspeed lt 20.5\n_original_numbers 20.5 '20.50'"
    );
    assert_eq!(
        mql.from_lines(&lines).unwrap(),
        r#"db.events.find({"location.zone":"north","speed":{"$lt":20.50}})"#
    );
}

#[test]
fn test_integral_float_needs_side_table() {
    let mql = mql();
    let with_table = mql.from_lines("speed gt 80\n_float_leaves speed ['gt']").unwrap();
    assert_eq!(with_table, r#"db.events.find({"speed":{"$gt":80.0}})"#);

    let without = mql.from_lines("speed gt 80").unwrap();
    assert_eq!(without, r#"db.events.find({"speed":{"$gt":80}})"#);

    // The spelling table alone does not turn integers into floats.
    let spelling_only = mql.from_lines("speed gt 80\n_original_numbers 80.0 '80.0'").unwrap();
    assert_eq!(spelling_only, r#"db.events.find({"speed":{"$gt":80}})"#);
}

#[test]
fn test_integers_survive_next_to_integral_floats() {
    let mql = mql();
    let queries = [
        (
            r#"db.events.find({"severity":20,"speed":{"$gt":20.0}})"#,
            "severity = 20\nspeed gt 20\n_original_numbers 20.0 '20.0'\n_float_leaves speed ['gt']",
        ),
        (
            r#"db.events.find({"severity":3,"camera_name":"cam3.0"})"#,
            "severity = 3\ncamera_name = 'cam3.0'",
        ),
    ];

    for (query, expected) in queries {
        let lines = mql.to_lines(query).unwrap();
        assert_eq!(lines, expected);
        let regenerated = mql.from_lines(&lines).unwrap();
        assert_eq!(regenerated, query);
        assert_eq!(
            qail_mql::canonicalize(&regenerated),
            qail_mql::canonicalize(query)
        );
    }
}

#[test]
fn test_exponent_literals_verify() {
    let mql = mql();
    for query in [
        r#"db.events.find({"speed":{"$gt":1e3}})"#,
        r#"db.events.find({"location.coordinates.latitude":{"$lt":1.85E1}})"#,
    ] {
        let target = mql.verify(query).unwrap();
        let regenerated = mql.from_lines(&target.lines).unwrap();
        assert_eq!(
            qail_mql::canonicalize(&regenerated),
            qail_mql::canonicalize(query)
        );
    }
}

#[test]
fn test_control_characters_in_strings() {
    let mql = mql();
    let query = r#"db.events.find({"camera_name":"Gate\n4"})"#;
    let lines = mql.to_lines(query).unwrap();
    assert_eq!(lines, r#"camera_name = "Gate\n4""#);
    assert_eq!(mql.from_lines(&lines).unwrap(), query);
}

#[test]
fn test_whitespace_inside_strings_is_dropped() {
    let lines = mql()
        .to_lines(r#"db.events.find({"camera_name":"Gate 4"})"#)
        .unwrap();
    assert_eq!(lines, "camera_name = 'Gate4'");
}

#[test]
fn test_now_and_relative_dates_verify() {
    let mql = mql();
    let target = mql
        .verify("db.events.find({\"timestamp\":{\"$gte\":new Date(new Date().getTime() - 3600000),\"$lte\":new Date()}})")
        .unwrap();
    assert_eq!(
        target.lines,
        "timestamp gte '2025-06-01T11:00:00Z'\ntimestamp lte '2025-06-01T12:00:00Z'"
    );
}

#[test]
fn test_new_date_style() {
    let mql = mql().with_config(GeneratorConfig {
        date_style: DateStyle::NewDate,
        ..GeneratorConfig::default()
    });
    assert_eq!(
        mql.from_lines("timestamp lt '2025-01-01T00:00:00Z'").unwrap(),
        r#"db.events.find({"timestamp":{"$lt":newDate("2025-01-01T00:00:00Z")}})"#
    );
}

#[test]
fn test_inference_errors() {
    let mql = mql();
    assert!(matches!(
        mql.from_lines("severity = 3\nseverity gt 1").unwrap_err(),
        MqlError::LineConflict { .. }
    ));
    assert!(matches!(
        mql.from_lines("severity gt 1\nlimit = many").unwrap_err(),
        MqlError::InvalidOption { .. }
    ));
    assert!(matches!(
        mql.to_lines(r#"db.events.aggregate([{"$match":{}}])"#).unwrap_err(),
        MqlError::UnsupportedCall(_)
    ));
}

#[test]
fn test_schema_listing() {
    let schema = DocumentSchema::from_json(SCHEMA).unwrap();
    let paths = PathMap::from_schema(&schema);
    assert_eq!(paths.dot_path("latitude"), Some("location.coordinates.latitude"));
    assert_eq!(paths.flat_name("vehicle_details.make"), Some("make"));
    assert_eq!(paths.dot_path("involved_persons"), Some("involved_persons"));

    let listing = schema.describe();
    assert!(listing.contains("severity  // 1 (low) to 10 (critical) (int)"));
    assert!(listing.contains("make  // (string|null)"));
    assert!(listing.contains("role  // (string)"));
}
