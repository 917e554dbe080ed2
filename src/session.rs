//! Conversion session over one schema.
//!
//! A [`Transpiler`] owns the path maps and compiled patterns for a schema
//! and runs both pipeline directions:
//!
//! ```text
//! training   text  → canonicalize → parse → flatten → encode → lines
//! inference  lines → decode → nest → generate → text
//! ```

use crate::ast::flat::ORIGINAL_NUMBERS_KEY;
use crate::ast::{FlatPredicate, ParseMeta, ParsedQuery, Predicate, QueryOptions};
use crate::canon;
use crate::error::{MqlError, MqlResult};
use crate::lines;
use crate::parser::{self, Clock, Parser, SystemClock};
use crate::patterns::Patterns;
use crate::projector;
use crate::schema::{DocumentSchema, PathMap};
use crate::transpiler::{Generator, GeneratorConfig};

/// Collection name used when the schema declares none.
pub const DEFAULT_COLLECTION: &str = "events";

/// Schema-bound transpiler. Immutable once built; share it freely.
#[derive(Debug)]
pub struct Transpiler {
    paths: PathMap,
    collection: String,
    patterns: Patterns,
    clock: Box<dyn Clock>,
    config: GeneratorConfig,
}

/// A query that survived the round trip, ready to use as a model target.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingTarget {
    pub collection: String,
    pub flat: FlatPredicate,
    pub lines: String,
}

/// Outcome of a batch conversion.
#[derive(Debug, Default)]
pub struct BatchReport {
    pub targets: Vec<TrainingTarget>,
    /// Input index and the error it failed with.
    pub failures: Vec<(usize, MqlError)>,
}

impl BatchReport {
    pub fn total(&self) -> usize {
        self.targets.len() + self.failures.len()
    }
}

impl Transpiler {
    /// Build a session for the first collection of `schema`.
    pub fn new(schema: &DocumentSchema) -> MqlResult<Self> {
        Ok(Self {
            paths: PathMap::from_schema(schema),
            collection: schema
                .collection_name()
                .unwrap_or(DEFAULT_COLLECTION)
                .to_string(),
            patterns: Patterns::new()?,
            clock: Box::new(SystemClock),
            config: GeneratorConfig::default(),
        })
    }

    /// Load the schema from JSON text.
    pub fn from_schema_json(json: &str) -> MqlResult<Self> {
        Self::new(&DocumentSchema::from_json(json)?)
    }

    pub fn with_collection(mut self, collection: impl Into<String>) -> Self {
        self.collection = collection.into();
        self
    }

    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    pub fn with_config(mut self, config: GeneratorConfig) -> Self {
        self.config = config;
        self
    }

    pub fn paths(&self) -> &PathMap {
        &self.paths
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    pub fn canonicalize(&self, text: &str) -> String {
        canon::canonicalize(text)
    }

    pub fn parser(&self) -> Parser<'_> {
        Parser::new(&self.patterns, self.clock.as_ref())
    }

    pub fn generator(&self) -> Generator<'_> {
        Generator::new(&self.patterns, self.config)
    }

    pub fn parse(&self, text: &str) -> MqlResult<ParsedQuery> {
        self.parser().parse(text)
    }

    pub fn flatten(&self, nested: &Predicate) -> FlatPredicate {
        projector::flatten(nested, &self.paths)
    }

    pub fn nest(&self, flat: FlatPredicate) -> MqlResult<(Predicate, QueryOptions)> {
        projector::nest(flat, &self.paths)
    }

    pub fn generate(&self, flat: &FlatPredicate) -> MqlResult<String> {
        self.generator().generate(flat, &self.paths, &self.collection)
    }

    /// Query text → flat predicate with options and the number side table.
    pub fn to_flat(&self, text: &str) -> MqlResult<FlatPredicate> {
        self.flat_with_meta(text).map(|(flat, _)| flat)
    }

    fn flat_with_meta(&self, text: &str) -> MqlResult<(FlatPredicate, ParseMeta)> {
        let canonical = self.canonicalize(text);
        tracing::debug!(%canonical, "canonicalized query");

        let mut parsed = self.parse(&canonical)?;
        // Canonicalization rewrites decimals, so take spellings from the raw text.
        parser::record_numbers(&self.patterns, text, &mut parsed.meta.original_numbers);
        tracing::debug!(
            collection = %parsed.collection,
            dates = parsed.meta.dates.len(),
            numbers = parsed.meta.original_numbers.len(),
            "parsed query"
        );

        let mut flat = self.flatten(&parsed.filter);
        projector::merge_options(&mut flat, &parsed.options);
        if !parsed.meta.original_numbers.is_empty() {
            flat.insert(ORIGINAL_NUMBERS_KEY, parsed.meta.original_numbers.to_predicate());
        }
        tracing::debug!(fields = flat.len(), "flattened query");
        Ok((flat, parsed.meta))
    }

    /// Query text → line-based text.
    pub fn to_lines(&self, text: &str) -> MqlResult<String> {
        Ok(lines::encode(&self.to_flat(text)?))
    }

    /// Line-based text → query text.
    pub fn from_lines(&self, text: &str) -> MqlResult<String> {
        let flat = lines::decode(text)?;
        tracing::debug!(fields = flat.len(), "decoded lines");
        let query = self.generate(&flat)?;
        tracing::debug!(%query, "generated query");
        Ok(query)
    }

    /// Convert a query and check that it regenerates to the same
    /// canonical text.
    pub fn verify(&self, text: &str) -> MqlResult<TrainingTarget> {
        let original = self.canonicalize(text);
        let (flat, meta) = self.flat_with_meta(text)?;
        let regenerated =
            self.generator()
                .generate_with(&flat, &self.paths, &self.collection, &meta)?;
        let reconstructed = self.canonicalize(&regenerated);

        if reconstructed != original {
            tracing::warn!(%original, %reconstructed, "round trip mismatch");
            return Err(MqlError::RoundTrip {
                original,
                reconstructed,
            });
        }

        Ok(TrainingTarget {
            collection: self.collection.clone(),
            lines: lines::encode(&flat),
            flat,
        })
    }

    /// Verify every query, collecting failures instead of stopping.
    pub fn convert_all<I>(&self, queries: I) -> BatchReport
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        let mut report = BatchReport::default();
        for (index, query) in queries.into_iter().enumerate() {
            match self.verify(query.as_ref()) {
                Ok(target) => report.targets.push(target),
                Err(err) => {
                    tracing::warn!(index, error = %err, "query rejected");
                    report.failures.push((index, err));
                }
            }
        }
        tracing::debug!(
            converted = report.targets.len(),
            failed = report.failures.len(),
            "batch finished"
        );
        report
    }
}
