// ✅ Record Checks - per-record data-quality rules
// Five independent checks, each a pure function of (record, context).
// None of them short-circuits another: a record with a bad quantity is
// still checked for completeness, mapping and so on.

use crate::config::ValidationConfig;
use crate::error::InputResult;
use crate::exception::{Exception, Rule};
use crate::record::{
    Record, ReferenceMaster, COL_DESCRIPTION, COL_INVOICE_DATE, COL_QUANTITY, COL_STOCK_CODE,
    COL_UNIT_PRICE,
};
use regex::Regex;

// ============================================================================
// CHECK CONTEXT (shared, read-only for the whole run)
// ============================================================================

pub struct CheckContext<'a> {
    pub reference: &'a ReferenceMaster,
    pub required_fields: &'a [String],
    pub stock_code_pattern: Regex,
    pub outlier_threshold: f64,
}

impl<'a> CheckContext<'a> {
    pub fn new(reference: &'a ReferenceMaster, config: &'a ValidationConfig) -> InputResult<Self> {
        Ok(CheckContext {
            reference,
            required_fields: &config.required_fields,
            stock_code_pattern: config.compile_stock_code_pattern()?,
            outlier_threshold: config.outlier_threshold,
        })
    }
}

// ============================================================================
// RECORD CHECK (fixed ordered dispatch)
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordCheck {
    RowType,
    Completeness,
    Validity,
    Mapping,
    Outlier,
}

impl RecordCheck {
    /// Order in which checks run on every record
    pub const ORDER: [RecordCheck; 5] = [
        RecordCheck::RowType,
        RecordCheck::Completeness,
        RecordCheck::Validity,
        RecordCheck::Mapping,
        RecordCheck::Outlier,
    ];

    pub fn run(&self, record: &Record, ctx: &CheckContext<'_>) -> Vec<Exception> {
        match self {
            RecordCheck::RowType => check_row_types(record),
            RecordCheck::Completeness => check_completeness(record, ctx.required_fields),
            RecordCheck::Validity => check_validity(record, &ctx.stock_code_pattern),
            RecordCheck::Mapping => check_mapping(record, ctx.reference),
            RecordCheck::Outlier => check_outlier(record, ctx.reference, ctx.outlier_threshold),
        }
    }
}

/// Run every check on one record, in `RecordCheck::ORDER`.
///
/// A malformed row yields a single schema error and nothing else, so an
/// unparseable line does not cascade into completeness or validity noise.
pub fn check_record(record: &Record, ctx: &CheckContext<'_>) -> Vec<Exception> {
    if let Some(reason) = &record.malformed {
        return vec![Exception::error(
            record.position,
            Rule::MalformedRow,
            format!("Row could not be parsed: {}", reason),
        )];
    }

    RecordCheck::ORDER
        .iter()
        .flat_map(|check| check.run(record, ctx))
        .collect()
}

// ============================================================================
// CHECKS
// ============================================================================

/// Present values must parse to their column type. Absent values are
/// the completeness check's business, and sign is the validity check's.
pub fn check_row_types(record: &Record) -> Vec<Exception> {
    let mut issues = Vec::new();
    let row = record.position;

    if let Some(text) = non_blank(record.field(COL_QUANTITY)) {
        if record.quantity.is_none() {
            issues.push(
                Exception::error(row, Rule::QuantityNotInteger, format!("Quantity is not an integer: {}", text))
                    .on_field(COL_QUANTITY),
            );
        }
    }

    if let Some(text) = non_blank(record.field(COL_UNIT_PRICE)) {
        if record.unit_price.is_none() {
            issues.push(
                Exception::error(row, Rule::UnitPriceNotNumeric, format!("UnitPrice is not a number: {}", text))
                    .on_field(COL_UNIT_PRICE),
            );
        }
    }

    if let Some(text) = non_blank(record.field(COL_INVOICE_DATE)) {
        if record.invoice_date.is_none() {
            issues.push(
                Exception::error(row, Rule::InvalidInvoiceDate, format!("Invalid invoice date: {}", text))
                    .on_field(COL_INVOICE_DATE),
            );
        }
    }

    issues
}

pub fn check_completeness(record: &Record, required_fields: &[String]) -> Vec<Exception> {
    required_fields
        .iter()
        .filter(|field| non_blank(record.field(field)).is_none())
        .map(|field| {
            Exception::warning(
                record.position,
                Rule::MissingRequiredField,
                format!("{} is missing", field),
            )
            .on_field(field)
        })
        .collect()
}

pub fn check_validity(record: &Record, stock_code_pattern: &Regex) -> Vec<Exception> {
    let mut issues = Vec::new();
    let row = record.position;

    if let Some(qty) = record.quantity {
        if qty <= 0 {
            issues.push(
                Exception::error(row, Rule::NonPositiveQuantity, format!("Quantity must be > 0, got {}", qty))
                    .on_field(COL_QUANTITY),
            );
        }
    }

    if let Some(price) = record.unit_price {
        if price <= 0.0 {
            issues.push(
                Exception::error(row, Rule::NonPositiveUnitPrice, format!("UnitPrice must be > 0, got {}", price))
                    .on_field(COL_UNIT_PRICE),
            );
        }
    }

    if non_blank(record.description()).is_none() {
        issues.push(
            Exception::warning(row, Rule::EmptyDescription, "Description is empty")
                .on_field(COL_DESCRIPTION),
        );
    }

    if let Some(code) = non_blank(record.stock_code()) {
        if !stock_code_pattern.is_match(code) {
            issues.push(
                Exception::error(row, Rule::InvalidStockCodeFormat, format!("Invalid StockCode format: {}", code))
                    .on_field(COL_STOCK_CODE),
            );
        }
    }

    issues
}

pub fn check_mapping(record: &Record, reference: &ReferenceMaster) -> Vec<Exception> {
    let message = match record.stock_code() {
        Some(code) if reference.contains(code) => return Vec::new(),
        Some(code) => format!("StockCode {} not in product master", code),
        None => "StockCode missing; cannot map to product master".to_string(),
    };

    vec![Exception::error(record.position, Rule::StockCodeNotInProductMaster, message)
        .on_field(COL_STOCK_CODE)]
}

/// Relative deviation from the reference price. Unmapped codes and
/// unparsed prices are skipped, as is a non-positive or non-finite
/// expected price.
pub fn check_outlier(record: &Record, reference: &ReferenceMaster, threshold: f64) -> Vec<Exception> {
    let entry = match record.stock_code().and_then(|code| reference.get(code)) {
        Some(entry) => entry,
        None => return Vec::new(),
    };
    let price = match record.unit_price {
        Some(price) => price,
        None => return Vec::new(),
    };
    if !entry.expected_price.is_finite() || entry.expected_price <= 0.0 {
        return Vec::new();
    }

    let deviation = (price - entry.expected_price).abs() / entry.expected_price;
    if deviation <= threshold {
        return Vec::new();
    }

    vec![Exception::warning(
        record.position,
        Rule::UnitPriceOutlierVsReference,
        format!(
            "UnitPrice {:.2} deviates {:.0}% from reference {:.2}",
            price,
            deviation * 100.0,
            entry.expected_price
        ),
    )
    .on_field(COL_UNIT_PRICE)]
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

// ============================================================================
// TESTS
// ============================================================================
