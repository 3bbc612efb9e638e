// 🔄 Validation Pipeline - one linear pass over the dataset
//
//   for each record: RowType → Completeness → Validity → Mapping → Outlier
//   then once:       Uniqueness over the whole sequence
//
// Per-record exceptions come first in row order, duplicate exceptions are
// appended at the end. The product master is only ever read.

use crate::checks::{check_record, CheckContext};
use crate::config::ValidationConfig;
use crate::error::InputResult;
use crate::exception::{Category, Exception, Severity};
use crate::record::{Record, ReferenceMaster};
use crate::uniqueness::UniquenessChecker;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

// ============================================================================
// DATASET REPORT
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetReport {
    pub total_records: usize,
    pub total_exceptions: usize,

    /// Every exception, in detection order
    pub exceptions: Vec<Exception>,

    /// Exceptions per category; every category present, zero included
    pub category_counts: BTreeMap<Category, usize>,

    pub duplicate_key_count: usize,
    pub unmapped_code_count: usize,
    pub outlier_count: usize,
    pub error_count: usize,
    pub warning_count: usize,

    /// Exceptions per row position
    pub record_exception_counts: Vec<usize>,
}

impl DatasetReport {
    /// Row positions must be below `total_records`; the pipeline guarantees
    /// it, so construction stays inside the crate.
    pub(crate) fn from_exceptions(total_records: usize, exceptions: Vec<Exception>) -> Self {
        let mut category_counts: BTreeMap<Category, usize> =
            Category::ALL.iter().map(|&c| (c, 0)).collect();
        let mut record_exception_counts = vec![0; total_records];
        let mut error_count = 0;

        for ex in &exceptions {
            *category_counts.entry(ex.category).or_insert(0) += 1;
            match record_exception_counts.get_mut(ex.row) {
                Some(count) => *count += 1,
                None => warn!(
                    row = ex.row,
                    total_records,
                    rule = ex.rule.code(),
                    "exception for unknown row"
                ),
            }
            if ex.severity == Severity::Error {
                error_count += 1;
            }
        }

        DatasetReport {
            total_records,
            total_exceptions: exceptions.len(),
            duplicate_key_count: category_counts[&Category::Uniqueness],
            unmapped_code_count: category_counts[&Category::Mapping],
            outlier_count: category_counts[&Category::Outlier],
            error_count,
            warning_count: exceptions.len() - error_count,
            category_counts,
            record_exception_counts,
            exceptions,
        }
    }

    pub fn count(&self, category: Category) -> usize {
        self.category_counts.get(&category).copied().unwrap_or(0)
    }

    pub fn exceptions_for(&self, row: usize) -> impl Iterator<Item = &Exception> {
        self.exceptions.iter().filter(move |ex| ex.row == row)
    }

    pub fn records_with_exceptions(&self) -> usize {
        self.record_exception_counts.iter().filter(|&&n| n > 0).count()
    }

    pub fn summary(&self) -> String {
        format!(
            "{} records, {} exceptions ({} errors, {} warnings) | {} duplicates, {} unmapped, {} outliers",
            self.total_records,
            self.total_exceptions,
            self.error_count,
            self.warning_count,
            self.duplicate_key_count,
            self.unmapped_code_count,
            self.outlier_count
        )
    }
}

// ============================================================================
// VALIDATION PIPELINE
// ============================================================================

pub struct ValidationPipeline<'a> {
    ctx: CheckContext<'a>,
    uniqueness: UniquenessChecker,
}

impl<'a> ValidationPipeline<'a> {
    pub fn new(reference: &'a ReferenceMaster, config: &'a ValidationConfig) -> InputResult<Self> {
        Ok(ValidationPipeline {
            ctx: CheckContext::new(reference, config)?,
            uniqueness: UniquenessChecker::new(config.business_key.clone()),
        })
    }

    pub fn run(&self, records: &[Record]) -> DatasetReport {
        info!(
            records = records.len(),
            products = self.ctx.reference.len(),
            "validating transactions"
        );

        let mut exceptions = Vec::new();
        for record in records {
            let issues = check_record(record, &self.ctx);
            if !issues.is_empty() {
                debug!(row = record.position, issues = issues.len(), "record checks");
            }
            exceptions.extend(issues);
        }

        let duplicates = self.uniqueness.check(records);
        debug!(duplicates = duplicates.len(), "uniqueness pass");
        exceptions.extend(duplicates);

        let report = DatasetReport::from_exceptions(records.len(), exceptions);
        info!(
            exceptions = report.total_exceptions,
            errors = report.error_count,
            warnings = report.warning_count,
            "validation finished"
        );
        report
    }
}

// ============================================================================
// TESTS
// ============================================================================
