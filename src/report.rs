// 💾 Report Writer - persists the outputs of one run
// Outputs are flushed once, after the pipeline has finished.

use crate::exception::Exception;
use crate::score::QualityScore;
use crate::summary::{ExceptionSample, IssueSummaryRow, SummaryKpis};
use crate::value_report::{TopProductRow, WeeklyRow};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use tracing::info;

pub const EXCEPTION_LOG_FILE: &str = "exception_log.csv";
pub const EXCEPTION_SAMPLES_FILE: &str = "exception_samples.csv";
pub const ISSUE_SUMMARY_FILE: &str = "issue_summary.csv";
pub const SCORE_FILE: &str = "data_quality_score.json";
pub const KPI_FILE: &str = "summary_kpis.csv";
pub const WEEKLY_FILE: &str = "value_report_weekly.csv";
pub const TOP_PRODUCTS_FILE: &str = "value_report_top_products.csv";

// ============================================================================
// SCORE REPORT
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreReport {
    pub run_id: String,
    pub generated_at: DateTime<Utc>,
    #[serde(flatten)]
    pub score: QualityScore,
}

impl ScoreReport {
    pub fn new(score: QualityScore) -> Self {
        ScoreReport {
            run_id: uuid::Uuid::new_v4().to_string(),
            generated_at: Utc::now(),
            score,
        }
    }
}

// ============================================================================
// RUN OUTPUTS
// ============================================================================

/// Everything a validation run hands to a writer
pub struct RunOutputs<'a> {
    pub exceptions: &'a [Exception],
    pub samples: &'a [ExceptionSample],
    pub issue_summary: &'a [IssueSummaryRow],
    pub score: &'a ScoreReport,
    pub kpis: &'a SummaryKpis,
}

// ============================================================================
// REPORT WRITER
// ============================================================================

pub trait ReportWriter {
    fn write_exception_log(&mut self, exceptions: &[Exception]) -> Result<()>;
    fn write_samples(&mut self, samples: &[ExceptionSample]) -> Result<()>;
    fn write_issue_summary(&mut self, rows: &[IssueSummaryRow]) -> Result<()>;
    fn write_score(&mut self, score: &ScoreReport) -> Result<()>;
    fn write_kpis(&mut self, kpis: &SummaryKpis) -> Result<()>;

    fn write_all(&mut self, outputs: &RunOutputs<'_>) -> Result<()> {
        self.write_exception_log(outputs.exceptions)?;
        self.write_samples(outputs.samples)?;
        self.write_issue_summary(outputs.issue_summary)?;
        self.write_score(outputs.score)?;
        self.write_kpis(outputs.kpis)
    }
}

/// Writes CSV/JSON files into one output directory
pub struct CsvReportWriter {
    outdir: PathBuf,
}

impl CsvReportWriter {
    /// Create the output directory if it does not exist yet
    pub fn new<P: AsRef<Path>>(outdir: P) -> Result<Self> {
        let outdir = outdir.as_ref().to_path_buf();
        fs::create_dir_all(&outdir)
            .with_context(|| format!("Failed to create output directory: {:?}", outdir))?;
        Ok(CsvReportWriter { outdir })
    }

    pub fn outdir(&self) -> &Path {
        &self.outdir
    }

    pub fn write_weekly(&mut self, rows: &[WeeklyRow]) -> Result<()> {
        self.write_csv(WEEKLY_FILE, rows)
    }

    pub fn write_top_products(&mut self, rows: &[TopProductRow]) -> Result<()> {
        self.write_csv(TOP_PRODUCTS_FILE, rows)
    }

    fn write_csv<T: Serialize>(&self, name: &str, rows: &[T]) -> Result<()> {
        let path = self.outdir.join(name);
        let mut wtr = csv::Writer::from_path(&path)
            .with_context(|| format!("Failed to create {:?}", path))?;
        for row in rows {
            wtr.serialize(row)
                .with_context(|| format!("Failed to write row to {:?}", path))?;
        }
        wtr.flush().with_context(|| format!("Failed to flush {:?}", path))?;
        info!(file = %path.display(), rows = rows.len(), "wrote report");
        Ok(())
    }
}

impl ReportWriter for CsvReportWriter {
    fn write_exception_log(&mut self, exceptions: &[Exception]) -> Result<()> {
        self.write_csv(EXCEPTION_LOG_FILE, exceptions)
    }

    fn write_samples(&mut self, samples: &[ExceptionSample]) -> Result<()> {
        self.write_csv(EXCEPTION_SAMPLES_FILE, samples)
    }

    fn write_issue_summary(&mut self, rows: &[IssueSummaryRow]) -> Result<()> {
        self.write_csv(ISSUE_SUMMARY_FILE, rows)
    }

    fn write_score(&mut self, score: &ScoreReport) -> Result<()> {
        let path = self.outdir.join(SCORE_FILE);
        let file = File::create(&path).with_context(|| format!("Failed to create {:?}", path))?;
        serde_json::to_writer_pretty(file, score)
            .with_context(|| format!("Failed to write {:?}", path))?;
        info!(file = %path.display(), "wrote score");
        Ok(())
    }

    fn write_kpis(&mut self, kpis: &SummaryKpis) -> Result<()> {
        self.write_csv(KPI_FILE, std::slice::from_ref(kpis))
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exception::Rule;
    use crate::pipeline::DatasetReport;
    use crate::score::ScoreCalculator;
    use crate::summary::issue_summary;

    #[test]
    fn test_write_all_outputs() {
        let dir = tempfile::tempdir().unwrap();
        let outdir = dir.path().join("outputs");
        let mut writer = CsvReportWriter::new(&outdir).unwrap();

        let report = DatasetReport::from_exceptions(
            2,
            vec![
                Exception::error(0, Rule::NonPositiveQuantity, "Quantity must be > 0, got -5")
                    .on_field("Quantity"),
                Exception::warning(1, Rule::DuplicateBusinessKey, "dup"),
            ],
        );
        let score = ScoreReport::new(ScoreCalculator::default().calculate(&report));
        let kpis = SummaryKpis::compute(&[], &report);
        let summary = issue_summary(&report);

        writer
            .write_all(&RunOutputs {
                exceptions: &report.exceptions,
                samples: &[],
                issue_summary: &summary,
                score: &score,
                kpis: &kpis,
            })
            .unwrap();

        let log = fs::read_to_string(outdir.join(EXCEPTION_LOG_FILE)).unwrap();
        let mut lines = log.lines();
        assert_eq!(lines.next(), Some("row,category,severity,rule,field,message"));
        assert_eq!(
            lines.next(),
            Some("0,validity,error,NON_POSITIVE_QUANTITY,Quantity,\"Quantity must be > 0, got -5\"")
        );
        assert_eq!(lines.next(), Some("1,uniqueness,warning,DUPLICATE_BUSINESS_KEY,,dup"));

        let json: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(outdir.join(SCORE_FILE)).unwrap()).unwrap();
        assert_eq!(json["total_records"], 2);
        assert_eq!(json["category_counts"]["validity"], 1);
        assert!(json["run_id"].is_string());
        assert!(json["grade"].is_string());

        assert!(outdir.join(KPI_FILE).exists());
        assert!(outdir.join(ISSUE_SUMMARY_FILE).exists());
        assert!(outdir.join(EXCEPTION_SAMPLES_FILE).exists());
    }
}
