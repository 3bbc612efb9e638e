// 🔍 Uniqueness Check - duplicate rows and duplicate business keys
// Needs the whole dataset, so it runs once after the per-record pass.
// The earliest row for a key is canonical and never flagged.

use crate::exception::{Exception, Rule};
use crate::record::Record;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// ============================================================================
// MATCH STRATEGY
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatchStrategy {
    /// Every field equal to an earlier row (error)
    ExactRow,

    /// Same business key, other fields differ (warning)
    BusinessKey,
}

// ============================================================================
// DUPLICATE MATCH
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DuplicateMatch {
    /// Earliest row carrying the key
    pub canonical_row: usize,

    /// The later occurrence being flagged
    pub duplicate_row: usize,

    /// Row the duplicate repeats: the first identical row for `ExactRow`,
    /// the canonical row otherwise
    pub matched_row: usize,

    pub strategy: MatchStrategy,

    /// Business key rendered as `col=value|col=value`
    pub key: String,
}

impl DuplicateMatch {
    pub fn to_exception(&self) -> Exception {
        match self.strategy {
            MatchStrategy::ExactRow => Exception::error(
                self.duplicate_row,
                Rule::DuplicateRow,
                format!(
                    "Identical to row {} ({})",
                    self.matched_row, self.key
                ),
            ),
            MatchStrategy::BusinessKey => Exception::warning(
                self.duplicate_row,
                Rule::DuplicateBusinessKey,
                format!(
                    "Business key {} already used by row {}",
                    self.key, self.canonical_row
                ),
            ),
        }
    }
}

// ============================================================================
// UNIQUENESS CHECKER
// ============================================================================

pub struct UniquenessChecker {
    /// Columns forming the business key
    pub key_columns: Vec<String>,
}

impl UniquenessChecker {
    pub fn new(key_columns: Vec<String>) -> Self {
        UniquenessChecker { key_columns }
    }

    /// Find every duplicate occurrence, ordered by the duplicate's row.
    ///
    /// Malformed rows and rows with a blank key column are left out; the
    /// schema and completeness checks already report them.
    pub fn find_duplicates(&self, records: &[Record]) -> Vec<DuplicateMatch> {
        let mut groups: HashMap<String, Vec<&Record>> = HashMap::new();
        let mut key_order: Vec<String> = Vec::new();

        for record in records.iter().filter(|r| !r.is_malformed()) {
            let key = match self.business_key(record) {
                Some(key) => key,
                None => continue,
            };
            let group = groups.entry(key.clone()).or_insert_with(|| {
                key_order.push(key);
                Vec::new()
            });
            group.push(record);
        }

        let mut matches = Vec::new();
        for key in key_order {
            let group = &groups[&key];
            if group.len() < 2 {
                continue;
            }

            let canonical_row = group[0].position;
            // fingerprint -> first row carrying it
            let mut first_seen: HashMap<String, usize> = HashMap::new();
            first_seen.insert(group[0].fingerprint(), canonical_row);

            for record in &group[1..] {
                let fingerprint = record.fingerprint();
                let (strategy, matched_row) = match first_seen.get(&fingerprint) {
                    Some(&row) => (MatchStrategy::ExactRow, row),
                    None => {
                        first_seen.insert(fingerprint, record.position);
                        (MatchStrategy::BusinessKey, canonical_row)
                    }
                };

                matches.push(DuplicateMatch {
                    canonical_row,
                    duplicate_row: record.position,
                    matched_row,
                    strategy,
                    key: key.clone(),
                });
            }
        }

        matches.sort_by_key(|m| m.duplicate_row);
        matches
    }

    pub fn check(&self, records: &[Record]) -> Vec<Exception> {
        self.find_duplicates(records)
            .iter()
            .map(DuplicateMatch::to_exception)
            .collect()
    }

    fn business_key(&self, record: &Record) -> Option<String> {
        let mut parts = Vec::with_capacity(self.key_columns.len());
        for column in &self.key_columns {
            let value = record.field(column).map(str::trim).filter(|v| !v.is_empty())?;
            parts.push(format!("{}={}", column, value));
        }
        Some(parts.join("|"))
    }
}

// ============================================================================
// TESTS
// ============================================================================
