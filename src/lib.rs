// Retail Data Quality - Core Library
// Validation engine, scoring and report sinks used by the CLI and tests

pub mod error;
pub mod record;        // Transactions + product master loading
pub mod exception;     // Categories, severities, rules
pub mod config;        // Tunable rules as data
pub mod checks;        // Per-record checks
pub mod uniqueness;    // Whole-dataset duplicate pass
pub mod pipeline;      // Orchestration + DatasetReport
pub mod score;         // Score + grade
pub mod summary;       // KPIs, issue roll-up, samples
pub mod value_report;  // Weekly trend + top products
pub mod report;        // Output writers
pub mod logging;

// Re-export commonly used types
pub use error::{InputError, InputResult};
pub use record::{
    Record, RawTransaction, ReferenceEntry, ReferenceMaster,
    load_transactions, load_reference, transactions_from_reader, reference_from_reader,
};
pub use exception::{Category, Exception, Rule, Severity};
pub use config::ValidationConfig;
pub use checks::{CheckContext, RecordCheck, check_record};
pub use uniqueness::{UniquenessChecker, DuplicateMatch, MatchStrategy};
pub use pipeline::{ValidationPipeline, DatasetReport};
pub use score::{ScoreCalculator, ScoringPolicy, QualityScore, GradeBand, CategoryWeights};
pub use summary::{SummaryKpis, IssueSummaryRow, ExceptionSample, issue_summary, exception_samples};
pub use value_report::{WeeklyRow, TopProductRow, weekly_trend, top_products};
pub use report::{ReportWriter, CsvReportWriter, RunOutputs, ScoreReport};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
