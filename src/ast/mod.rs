//! Abstract Syntax Tree for MongoDB filter queries.
//!
//! This module defines the data structures shared by the parser, the
//! projector, the generator and the line-based codec.

pub mod fields;
pub mod flat;
pub mod meta;
pub mod options;
pub mod predicate;
pub mod visit;

pub use fields::Fields;
pub use flat::FlatPredicate;
pub use meta::{DateSpelling, DateSpellings, OriginalNumbers, ParseMeta};
pub use options::{QueryOptions, SortDirection, SortKey};
pub use predicate::{Literal, OperatorObject, Predicate};
pub use visit::PredicateVisitor;

/// Prefix carried by every MongoDB operator key (`$gt`, `$regex`, ...).
pub const OPERATOR_SIGIL: char = '$';

/// Whether a key is an operator tag.
pub fn is_operator_key(key: &str) -> bool {
    key.starts_with(OPERATOR_SIGIL)
}

/// A fully parsed query invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedQuery {
    /// Collection token from `db.<collection>.find(...)`.
    ///
    /// Informational only; the generator takes its collection name
    /// from the caller.
    pub collection: String,
    /// Nested filter predicate. Always an [`Predicate::Object`].
    pub filter: Predicate,
    pub options: QueryOptions,
    pub meta: ParseMeta,
}
