// ⚠️ Exceptions - detected data-quality issues
// An Exception is data, not a control-flow fault. Checks create them,
// nothing mutates them, and the log keeps them in detection order.

use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// CATEGORY
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Schema,
    Completeness,
    Uniqueness,
    Validity,
    Mapping,
    Outlier,
}

impl Category {
    /// Every category, in reporting order
    pub const ALL: [Category; 6] = [
        Category::Schema,
        Category::Completeness,
        Category::Uniqueness,
        Category::Validity,
        Category::Mapping,
        Category::Outlier,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Category::Schema => "schema",
            Category::Completeness => "completeness",
            Category::Uniqueness => "uniqueness",
            Category::Validity => "validity",
            Category::Mapping => "mapping",
            Category::Outlier => "outlier",
        }
    }

    pub fn index(&self) -> usize {
        *self as usize
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ============================================================================
// SEVERITY
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,   // Record is wrong and must be fixed before reporting
    Warning, // Record is questionable or incomplete
}

impl Severity {
    pub fn name(&self) -> &'static str {
        match self {
            Severity::Error => "error",
            Severity::Warning => "warning",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ============================================================================
// RULE
// ============================================================================

/// The specific rule that fired. Each rule belongs to exactly one category
/// and names who owns the fix upstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Rule {
    MalformedRow,
    QuantityNotInteger,
    UnitPriceNotNumeric,
    InvalidInvoiceDate,
    MissingRequiredField,
    NonPositiveQuantity,
    NonPositiveUnitPrice,
    EmptyDescription,
    #[serde(rename = "INVALID_STOCKCODE_FORMAT")]
    InvalidStockCodeFormat,
    #[serde(rename = "STOCKCODE_NOT_IN_PRODUCT_MASTER")]
    StockCodeNotInProductMaster,
    #[serde(rename = "UNITPRICE_OUTLIER_VS_REFERENCE")]
    UnitPriceOutlierVsReference,
    DuplicateRow,
    DuplicateBusinessKey,
}

impl Rule {
    pub fn code(&self) -> &'static str {
        match self {
            Rule::MalformedRow => "MALFORMED_ROW",
            Rule::QuantityNotInteger => "QUANTITY_NOT_INTEGER",
            Rule::UnitPriceNotNumeric => "UNIT_PRICE_NOT_NUMERIC",
            Rule::InvalidInvoiceDate => "INVALID_INVOICE_DATE",
            Rule::MissingRequiredField => "MISSING_REQUIRED_FIELD",
            Rule::NonPositiveQuantity => "NON_POSITIVE_QUANTITY",
            Rule::NonPositiveUnitPrice => "NON_POSITIVE_UNIT_PRICE",
            Rule::EmptyDescription => "EMPTY_DESCRIPTION",
            Rule::InvalidStockCodeFormat => "INVALID_STOCKCODE_FORMAT",
            Rule::StockCodeNotInProductMaster => "STOCKCODE_NOT_IN_PRODUCT_MASTER",
            Rule::UnitPriceOutlierVsReference => "UNITPRICE_OUTLIER_VS_REFERENCE",
            Rule::DuplicateRow => "DUPLICATE_ROW",
            Rule::DuplicateBusinessKey => "DUPLICATE_BUSINESS_KEY",
        }
    }

    pub fn category(&self) -> Category {
        match self {
            Rule::MalformedRow
            | Rule::QuantityNotInteger
            | Rule::UnitPriceNotNumeric
            | Rule::InvalidInvoiceDate => Category::Schema,
            Rule::MissingRequiredField => Category::Completeness,
            Rule::NonPositiveQuantity
            | Rule::NonPositiveUnitPrice
            | Rule::EmptyDescription
            | Rule::InvalidStockCodeFormat => Category::Validity,
            Rule::StockCodeNotInProductMaster => Category::Mapping,
            Rule::UnitPriceOutlierVsReference => Category::Outlier,
            Rule::DuplicateRow | Rule::DuplicateBusinessKey => Category::Uniqueness,
        }
    }

    pub fn owner(&self) -> &'static str {
        match self {
            Rule::MalformedRow
            | Rule::QuantityNotInteger
            | Rule::UnitPriceNotNumeric
            | Rule::DuplicateRow
            | Rule::DuplicateBusinessKey => "Reporting Owner",
            Rule::NonPositiveQuantity => "Process Owner",
            Rule::NonPositiveUnitPrice
            | Rule::InvalidStockCodeFormat
            | Rule::StockCodeNotInProductMaster => "Master Data Owner",
            Rule::UnitPriceOutlierVsReference => "Finance/Reporting",
            Rule::InvalidInvoiceDate | Rule::MissingRequiredField | Rule::EmptyDescription => {
                "Data Owner"
            }
        }
    }

    pub fn recommended_fix(&self) -> &'static str {
        match self {
            Rule::MalformedRow => "Re-export the file with a consistent delimiter and column count.",
            Rule::QuantityNotInteger | Rule::UnitPriceNotNumeric => {
                "Align column types; enforce a consistent export template."
            }
            Rule::InvalidInvoiceDate => {
                "Ensure InvoiceDate exports are consistent; fix locale/time format; re-export if needed."
            }
            Rule::MissingRequiredField => {
                "Make the field mandatory upstream, or exclude it from dependent KPIs."
            }
            Rule::NonPositiveQuantity => {
                "Separate returns vs sales; enforce Quantity>0 for sales extracts; tag returns with a flag."
            }
            Rule::NonPositiveUnitPrice => {
                "Fix price master / ensure UnitPrice is extracted correctly; block reporting until corrected."
            }
            Rule::EmptyDescription => "Fill from product master or enforce description capture upstream.",
            Rule::InvalidStockCodeFormat => {
                "Standardize StockCode format; strip spaces; validate during data entry/export."
            }
            Rule::StockCodeNotInProductMaster => {
                "Update product master mapping table or correct StockCodes in the source export."
            }
            Rule::UnitPriceOutlierVsReference => {
                "Review outliers; check currency/decimal issues; fix master price or export transformation."
            }
            Rule::DuplicateRow | Rule::DuplicateBusinessKey => {
                "Define a unique key; deduplicate by latest timestamp; investigate double-exports."
            }
        }
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

// ============================================================================
// EXCEPTION
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Exception {
    /// Row position of the offending record
    pub row: usize,

    pub category: Category,

    pub severity: Severity,

    pub rule: Rule,

    /// Column the issue is about, when there is a single one
    pub field: Option<String>,

    pub message: String,
}

impl Exception {
    pub fn error(row: usize, rule: Rule, message: impl Into<String>) -> Self {
        Self::new(row, rule, Severity::Error, message)
    }

    pub fn warning(row: usize, rule: Rule, message: impl Into<String>) -> Self {
        Self::new(row, rule, Severity::Warning, message)
    }

    fn new(row: usize, rule: Rule, severity: Severity, message: impl Into<String>) -> Self {
        Exception {
            row,
            category: rule.category(),
            severity,
            rule,
            field: None,
            message: message.into(),
        }
    }

    pub fn on_field(mut self, field: &str) -> Self {
        self.field = Some(field.to_string());
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl fmt::Display for Exception {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "row {} [{}/{}] {}: {}",
            self.row, self.category, self.severity, self.rule, self.message
        )
    }
}
