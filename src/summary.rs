// 📈 Summary - KPIs, issue roll-up and exception samples
// Everything here is derived from (records, DatasetReport) after the run.

use crate::exception::{Category, Rule, Severity};
use crate::pipeline::DatasetReport;
use crate::record::Record;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};

// ============================================================================
// SUMMARY KPIS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryKpis {
    pub total_records: usize,
    pub duplicate_count: usize,
    pub unmapped_count: usize,
    pub outlier_count: usize,
    pub error_count: usize,
    pub warning_count: usize,
    pub unique_invoices: usize,
    pub unique_customers: usize,
    pub countries: usize,
    pub gross_revenue: f64,
    pub avg_order_value: f64,
}

impl SummaryKpis {
    pub fn compute(records: &[Record], report: &DatasetReport) -> Self {
        let mut invoices: HashSet<&str> = HashSet::new();
        let mut customers: HashSet<&str> = HashSet::new();
        let mut countries: HashSet<&str> = HashSet::new();
        let mut revenue_by_invoice: HashMap<&str, f64> = HashMap::new();
        let mut gross_revenue = 0.0;

        for record in records.iter().filter(|r| !r.is_malformed()) {
            if let Some(invoice) = present(record.invoice_no()) {
                invoices.insert(invoice);
            }
            if let Some(customer) = present(record.customer_id()) {
                customers.insert(customer);
            }
            if let Some(country) = present(record.country()) {
                countries.insert(country);
            }
            if let Some(revenue) = record.extended_price() {
                gross_revenue += revenue;
                if let Some(invoice) = present(record.invoice_no()) {
                    *revenue_by_invoice.entry(invoice).or_insert(0.0) += revenue;
                }
            }
        }

        let avg_order_value = if revenue_by_invoice.is_empty() {
            0.0
        } else {
            revenue_by_invoice.values().sum::<f64>() / revenue_by_invoice.len() as f64
        };

        SummaryKpis {
            total_records: report.total_records,
            duplicate_count: report.duplicate_key_count,
            unmapped_count: report.unmapped_code_count,
            outlier_count: report.outlier_count,
            error_count: report.error_count,
            warning_count: report.warning_count,
            unique_invoices: invoices.len(),
            unique_customers: customers.len(),
            countries: countries.len(),
            gross_revenue: round2(gross_revenue),
            avg_order_value: round2(avg_order_value),
        }
    }
}

// ============================================================================
// ISSUE SUMMARY (one line per rule)
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IssueSummaryRow {
    pub rule: Rule,
    pub category: Category,
    pub severity: Severity,
    /// Distinct rows hit by the rule
    pub row_count: usize,
    pub exception_count: usize,
    pub owner: String,
    pub recommended_fix: String,
}

/// Errors first, then by affected rows, most first
pub fn issue_summary(report: &DatasetReport) -> Vec<IssueSummaryRow> {
    let mut by_rule: BTreeMap<Rule, (Severity, HashSet<usize>, usize)> = BTreeMap::new();
    for ex in &report.exceptions {
        let entry = by_rule
            .entry(ex.rule)
            .or_insert_with(|| (ex.severity, HashSet::new(), 0));
        entry.1.insert(ex.row);
        entry.2 += 1;
    }

    let mut rows: Vec<IssueSummaryRow> = by_rule
        .into_iter()
        .map(|(rule, (severity, rows, exception_count))| IssueSummaryRow {
            rule,
            category: rule.category(),
            severity,
            row_count: rows.len(),
            exception_count,
            owner: rule.owner().to_string(),
            recommended_fix: rule.recommended_fix().to_string(),
        })
        .collect();

    rows.sort_by(|a, b| {
        a.severity
            .cmp(&b.severity)
            .then(b.row_count.cmp(&a.row_count))
            .then(a.rule.cmp(&b.rule))
    });
    rows
}

// ============================================================================
// EXCEPTION SAMPLES
// ============================================================================

/// A full offending row, tagged with the issue that selected it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExceptionSample {
    pub row: usize,
    pub category: Category,
    pub severity: Severity,
    pub rule: Rule,
    pub message: String,
    #[serde(rename = "InvoiceNo")]
    pub invoice_no: Option<String>,
    #[serde(rename = "StockCode")]
    pub stock_code: Option<String>,
    #[serde(rename = "Description")]
    pub description: Option<String>,
    #[serde(rename = "Quantity")]
    pub quantity: Option<String>,
    #[serde(rename = "InvoiceDate")]
    pub invoice_date: Option<String>,
    #[serde(rename = "UnitPrice")]
    pub unit_price: Option<String>,
    #[serde(rename = "CustomerID")]
    pub customer_id: Option<String>,
    #[serde(rename = "Country")]
    pub country: Option<String>,
}

/// Up to `limit` distinct rows per category, earliest exceptions first.
pub fn exception_samples(records: &[Record], report: &DatasetReport, limit: usize) -> Vec<ExceptionSample> {
    let mut samples = Vec::new();

    for category in Category::ALL {
        let mut seen: HashSet<usize> = HashSet::new();
        for ex in report.exceptions.iter().filter(|e| e.category == category) {
            if seen.len() >= limit {
                break;
            }
            if !seen.insert(ex.row) {
                continue;
            }
            let raw = match records.get(ex.row) {
                Some(record) => record.raw.clone(),
                None => continue,
            };
            samples.push(ExceptionSample {
                row: ex.row,
                category: ex.category,
                severity: ex.severity,
                rule: ex.rule,
                message: ex.message.clone(),
                invoice_no: raw.invoice_no,
                stock_code: raw.stock_code,
                description: raw.description,
                quantity: raw.quantity,
                invoice_date: raw.invoice_date,
                unit_price: raw.unit_price,
                customer_id: raw.customer_id,
                country: raw.country,
            });
        }
    }

    samples
}

fn present(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exception::Exception;
    use crate::record::RawTransaction;

    fn create_record(position: usize, invoice: &str, customer: Option<&str>, qty: &str, price: &str) -> Record {
        Record::from_raw(
            position,
            RawTransaction {
                invoice_no: Some(invoice.to_string()),
                stock_code: Some("A1".to_string()),
                description: Some("Mug".to_string()),
                quantity: Some(qty.to_string()),
                unit_price: Some(price.to_string()),
                customer_id: customer.map(|c| c.to_string()),
                country: Some("France".to_string()),
                ..Default::default()
            },
        )
    }

    #[test]
    fn test_kpis() {
        let records = vec![
            create_record(0, "1", Some("C1"), "2", "5.00"),
            create_record(1, "1", Some("C1"), "1", "10.00"),
            create_record(2, "2", None, "4", "2.50"),
            Record::malformed(3, "bad"),
        ];
        let report = DatasetReport::from_exceptions(
            4,
            vec![
                Exception::warning(2, Rule::MissingRequiredField, "CustomerID is missing"),
                Exception::error(3, Rule::MalformedRow, "bad"),
            ],
        );

        let kpis = SummaryKpis::compute(&records, &report);

        assert_eq!(kpis.total_records, 4);
        assert_eq!(kpis.unique_invoices, 2);
        assert_eq!(kpis.unique_customers, 1);
        assert_eq!(kpis.countries, 1);
        assert_eq!(kpis.gross_revenue, 30.0);
        // invoice 1 = 20, invoice 2 = 10
        assert_eq!(kpis.avg_order_value, 15.0);
        assert_eq!(kpis.error_count, 1);
        assert_eq!(kpis.warning_count, 1);
    }

    #[test]
    fn test_kpis_empty() {
        let kpis = SummaryKpis::compute(&[], &DatasetReport::from_exceptions(0, Vec::new()));
        assert_eq!(kpis.avg_order_value, 0.0);
        assert_eq!(kpis.gross_revenue, 0.0);
    }

    #[test]
    fn test_issue_summary_sorted_errors_first() {
        let report = DatasetReport::from_exceptions(
            5,
            vec![
                Exception::warning(0, Rule::MissingRequiredField, "a"),
                Exception::warning(0, Rule::MissingRequiredField, "b"),
                Exception::warning(1, Rule::MissingRequiredField, "c"),
                Exception::error(2, Rule::StockCodeNotInProductMaster, "d"),
            ],
        );

        let rows = issue_summary(&report);

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].rule, Rule::StockCodeNotInProductMaster);
        assert_eq!(rows[0].owner, "Master Data Owner");
        assert_eq!(rows[1].row_count, 2);
        assert_eq!(rows[1].exception_count, 3);
    }

    #[test]
    fn test_samples_capped_per_category() {
        let records: Vec<Record> = (0..5)
            .map(|i| create_record(i, &i.to_string(), Some("C"), "-1", "1.00"))
            .collect();
        let exceptions = (0..5)
            .map(|i| Exception::error(i, Rule::NonPositiveQuantity, "qty"))
            .chain(std::iter::once(Exception::error(4, Rule::StockCodeNotInProductMaster, "map")))
            .collect();
        let report = DatasetReport::from_exceptions(5, exceptions);

        let samples = exception_samples(&records, &report, 2);

        assert_eq!(samples.len(), 3);
        assert_eq!(samples[0].row, 0);
        assert_eq!(samples[1].row, 1);
        assert_eq!(samples[2].category, Category::Mapping);
        assert_eq!(samples[2].quantity.as_deref(), Some("-1"));
    }
}
