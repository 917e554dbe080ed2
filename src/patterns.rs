//! Compiled regular expressions shared by the parser and the generator.
//!
//! Built once per [`Transpiler`](crate::session::Transpiler) and handed
//! out by reference; there is no global pattern state.

use regex::Regex;

use crate::error::MqlResult;

/// `YYYY-MM-DDTHH:MM:SSZ`
pub const INSTANT_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// Fallback instant for relative dates that cannot be evaluated.
pub const EPOCH_INSTANT: &str = "1970-01-01T00:00:00Z";

#[derive(Debug, Clone)]
pub struct Patterns {
    /// `ISODate("…")` / `ISODate('…')`
    pub(crate) iso_date_call: Regex,
    /// `newDate(newDate().getTime()<expr>)`
    pub(crate) relative_date_call: Regex,
    /// `newDate()`
    pub(crate) now_call: Regex,
    /// `newDate("…")` / `newDate('…')`
    pub(crate) new_date_quoted: Regex,
    /// `newDate(<anything>)`
    pub(crate) new_date_any: Regex,
    /// A whole string that is an instant.
    pub(crate) instant: Regex,
    /// A whole string that is a relative-time marker.
    pub(crate) relative_marker: Regex,
    /// `-?\d+\.\d+` with an optional exponent
    pub(crate) decimal: Regex,
}

impl Patterns {
    pub fn new() -> MqlResult<Self> {
        Ok(Self {
            iso_date_call: Regex::new(r#"ISODate\(\s*(?:"([^"]*)"|'([^']*)')\s*\)"#)?,
            relative_date_call: Regex::new(
                r"new\s*Date\(\s*new\s*Date\(\s*\)\s*\.\s*getTime\(\s*\)([-+*/0-9\s]+)\)",
            )?,
            now_call: Regex::new(r"new\s*Date\(\s*\)")?,
            new_date_quoted: Regex::new(r#"new\s*Date\(\s*(?:"([^"]*)"|'([^']*)')\s*\)"#)?,
            new_date_any: Regex::new(r"new\s*Date\((.*?)\)")?,
            instant: Regex::new(r"^\d{4}-\d{2}-\d{2}T\d{2}:\d{2}:\d{2}Z$")?,
            relative_marker: Regex::new(
                r"^(?:newDate\(newDate\(\)\.getTime\(\)[-+*/0-9]+\)|newDate\.getTime\(\)-\d+)$",
            )?,
            decimal: Regex::new(r"-?\d+\.\d+(?:[eE][+-]?\d+)?")?,
        })
    }

    pub fn is_instant(&self, s: &str) -> bool {
        self.instant.is_match(s)
    }

    pub fn is_relative_marker(&self, s: &str) -> bool {
        self.relative_marker.is_match(s)
    }
}
