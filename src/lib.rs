//! # qail-mql — Schema-aware MongoDB filter transpiler
//!
//! Converts shell-style `db.<collection>.find(...)` queries into a flat,
//! line-based intermediate representation (LBIR) keyed by schema leaf
//! names, and back.
//!
//! ## Quick Example
//!
//! ```
//! use qail_mql::prelude::*;
//!
//! let schema = r#"{"collections": [{"name": "events", "document": {"properties": {
//!     "severity": {"bsonType": "int"},
//!     "vehicle_details": {"bsonType": "object", "properties": {
//!         "license_plate_number": {"bsonType": "string"}
//!     }}
//! }}}]}"#;
//! let mql = Transpiler::from_schema_json(schema).unwrap();
//!
//! let lines = mql
//!     .to_lines(r#"db.events.find({"vehicle_details.license_plate_number": {"$regex": "^MH12"}}).limit(5)"#)
//!     .unwrap();
//! assert_eq!(lines, "license_plate_number regex '^MH12'\nlimit = 5");
//!
//! let query = mql.from_lines(&lines).unwrap();
//! assert_eq!(
//!     query,
//!     r#"db.events.find({"vehicle_details.license_plate_number":{"$regex":"^MH12"}}).limit(5)"#
//! );
//! ```
//!
//! ## Pipeline
//!
//! | Stage         | Module         | Output                  |
//! |---------------|----------------|-------------------------|
//! | Canonicalize  | [`canon`]      | whitespace-free text    |
//! | Parse         | [`parser`]     | nested [`ast::Predicate`] |
//! | Flatten       | [`projector`]  | [`ast::FlatPredicate`]  |
//! | Encode        | [`lines`]      | LBIR text               |
//! | Decode + nest | [`lines`], [`projector`] | predicate + options |
//! | Generate      | [`transpiler`] | query text              |

pub mod ast;
pub mod canon;
pub mod config;
pub mod error;
pub mod lines;
pub mod parser;
pub mod patterns;
pub mod projector;
pub mod schema;
pub mod session;
pub mod transpiler;

pub mod prelude {
    pub use crate::ast::*;
    pub use crate::config::MqlConfig;
    pub use crate::error::*;
    pub use crate::parser::{Clock, FixedClock, SystemClock};
    pub use crate::schema::{DocumentSchema, PathMap};
    pub use crate::session::{BatchReport, TrainingTarget, Transpiler};
    pub use crate::transpiler::{DateStyle, GeneratorConfig};
}

/// Canonicalize query text.
///
/// # Example
///
/// ```
/// assert_eq!(
///     qail_mql::canonicalize(r#"db.events.find( { "a" : 1.50 } )"#),
///     r#"db.events.find({"a":1.5})"#
/// );
/// ```
pub fn canonicalize(text: &str) -> String {
    canon::canonicalize(text)
}

/// Encode a flat predicate as LBIR text.
pub fn encode(flat: &ast::FlatPredicate) -> String {
    lines::encode(flat)
}

/// Decode LBIR text into a flat predicate.
pub fn decode(text: &str) -> error::MqlResult<ast::FlatPredicate> {
    lines::decode(text)
}
