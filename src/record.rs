// 🧾 Records - transaction rows and the product master
// Both inputs are fully materialized before validation starts.

use crate::error::{InputError, InputResult};
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::io::Read;
use std::path::Path;
use tracing::{debug, warn};

// ============================================================================
// COLUMN NAMES
// ============================================================================

pub const COL_INVOICE_NO: &str = "InvoiceNo";
pub const COL_STOCK_CODE: &str = "StockCode";
pub const COL_DESCRIPTION: &str = "Description";
pub const COL_QUANTITY: &str = "Quantity";
pub const COL_INVOICE_DATE: &str = "InvoiceDate";
pub const COL_UNIT_PRICE: &str = "UnitPrice";
pub const COL_CUSTOMER_ID: &str = "CustomerID";
pub const COL_COUNTRY: &str = "Country";
pub const COL_UNIT_PRICE_REF: &str = "UnitPrice_Ref";

/// Columns every transactions file must carry. `InvoiceDate` is optional.
pub const TRANSACTION_COLUMNS: [&str; 7] = [
    COL_INVOICE_NO,
    COL_STOCK_CODE,
    COL_DESCRIPTION,
    COL_QUANTITY,
    COL_UNIT_PRICE,
    COL_CUSTOMER_ID,
    COL_COUNTRY,
];

/// All columns a record knows about, in export order.
pub const KNOWN_COLUMNS: [&str; 8] = [
    COL_INVOICE_NO,
    COL_STOCK_CODE,
    COL_DESCRIPTION,
    COL_QUANTITY,
    COL_INVOICE_DATE,
    COL_UNIT_PRICE,
    COL_CUSTOMER_ID,
    COL_COUNTRY,
];

pub const REFERENCE_COLUMNS: [&str; 3] = [COL_STOCK_CODE, COL_DESCRIPTION, COL_UNIT_PRICE_REF];

const INVOICE_DATE_FORMATS: [&str; 3] = ["%m/%d/%Y %H:%M", "%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M"];
const INVOICE_DAY_FORMATS: [&str; 2] = ["%Y-%m-%d", "%m/%d/%Y"];

// ============================================================================
// RAW TRANSACTION (text exactly as exported)
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawTransaction {
    #[serde(rename = "InvoiceNo", default)]
    pub invoice_no: Option<String>,

    #[serde(rename = "StockCode", default)]
    pub stock_code: Option<String>,

    #[serde(rename = "Description", default)]
    pub description: Option<String>,

    #[serde(rename = "Quantity", default)]
    pub quantity: Option<String>,

    #[serde(rename = "InvoiceDate", default)]
    pub invoice_date: Option<String>,

    #[serde(rename = "UnitPrice", default)]
    pub unit_price: Option<String>,

    #[serde(rename = "CustomerID", default)]
    pub customer_id: Option<String>,

    #[serde(rename = "Country", default)]
    pub country: Option<String>,
}

impl RawTransaction {
    /// Look up a field by its column name
    pub fn get(&self, column: &str) -> Option<&str> {
        let value = match column {
            COL_INVOICE_NO => &self.invoice_no,
            COL_STOCK_CODE => &self.stock_code,
            COL_DESCRIPTION => &self.description,
            COL_QUANTITY => &self.quantity,
            COL_INVOICE_DATE => &self.invoice_date,
            COL_UNIT_PRICE => &self.unit_price,
            COL_CUSTOMER_ID => &self.customer_id,
            COL_COUNTRY => &self.country,
            _ => return None,
        };
        value.as_deref()
    }
}

// ============================================================================
// RECORD
// ============================================================================

/// One transaction row plus the typed values parsed from it.
///
/// Typed values are `None` when the text is absent or does not parse;
/// the raw text is kept so checks can tell those two cases apart.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    /// Row position in the input (0-based, header excluded)
    pub position: usize,

    pub raw: RawTransaction,

    pub quantity: Option<i64>,

    pub unit_price: Option<f64>,

    pub invoice_date: Option<NaiveDateTime>,

    /// Set when the row could not be parsed at all
    pub malformed: Option<String>,
}

impl Record {
    pub fn from_raw(position: usize, raw: RawTransaction) -> Self {
        let quantity = raw.quantity.as_deref().and_then(parse_quantity);
        let unit_price = raw.unit_price.as_deref().and_then(parse_price);
        let invoice_date = raw.invoice_date.as_deref().and_then(parse_invoice_date);

        Record {
            position,
            raw,
            quantity,
            unit_price,
            invoice_date,
            malformed: None,
        }
    }

    pub fn malformed(position: usize, reason: impl Into<String>) -> Self {
        Record {
            position,
            raw: RawTransaction::default(),
            quantity: None,
            unit_price: None,
            invoice_date: None,
            malformed: Some(reason.into()),
        }
    }

    pub fn is_malformed(&self) -> bool {
        self.malformed.is_some()
    }

    pub fn field(&self, column: &str) -> Option<&str> {
        self.raw.get(column)
    }

    pub fn invoice_no(&self) -> Option<&str> {
        self.raw.invoice_no.as_deref()
    }

    pub fn stock_code(&self) -> Option<&str> {
        self.raw.stock_code.as_deref()
    }

    pub fn description(&self) -> Option<&str> {
        self.raw.description.as_deref()
    }

    pub fn customer_id(&self) -> Option<&str> {
        self.raw.customer_id.as_deref()
    }

    pub fn country(&self) -> Option<&str> {
        self.raw.country.as_deref()
    }

    /// Line revenue: quantity × unit price
    pub fn extended_price(&self) -> Option<f64> {
        match (self.quantity, self.unit_price) {
            (Some(qty), Some(price)) => Some(qty as f64 * price),
            _ => None,
        }
    }

    /// SHA-256 over every raw field, used to spot fully identical rows
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        for column in KNOWN_COLUMNS {
            hasher.update(self.field(column).unwrap_or(""));
            hasher.update([0x1fu8]);
        }
        format!("{:x}", hasher.finalize())
    }
}

// ============================================================================
// VALUE PARSERS
// ============================================================================

/// Integer quantity. Integral decimals such as `6.0` are accepted since
/// spreadsheet exports often write them that way; values outside the i64
/// range are not.
pub fn parse_quantity(text: &str) -> Option<i64> {
    let text = text.trim();
    if let Ok(qty) = text.parse::<i64>() {
        return Some(qty);
    }
    match text.parse::<f64>() {
        Ok(value)
            if value.fract() == 0.0 && value >= i64::MIN as f64 && value < i64::MAX as f64 =>
        {
            Some(value as i64)
        }
        _ => None,
    }
}

pub fn parse_price(text: &str) -> Option<f64> {
    text.trim()
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
}

pub fn parse_invoice_date(text: &str) -> Option<NaiveDateTime> {
    let text = text.trim();
    for format in INVOICE_DATE_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(text, format) {
            return Some(dt);
        }
    }
    for format in INVOICE_DAY_FORMATS {
        if let Ok(day) = NaiveDate::parse_from_str(text, format) {
            return day.and_hms_opt(0, 0, 0);
        }
    }
    None
}

// ============================================================================
// TRANSACTIONS LOADER
// ============================================================================

pub fn load_transactions(path: &Path) -> InputResult<Vec<Record>> {
    if !path.exists() {
        return Err(InputError::NotFound(path.to_path_buf()));
    }
    let reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::Headers)
        .from_path(path)
        .map_err(|source| InputError::Unreadable {
            path: path.to_path_buf(),
            source,
        })?;
    read_transactions(reader, path)
}

/// Parse transactions from any reader (used by tests and piped input)
pub fn transactions_from_reader<R: Read>(input: R) -> InputResult<Vec<Record>> {
    let reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::Headers)
        .from_reader(input);
    read_transactions(reader, Path::new("<memory>"))
}

fn read_transactions<R: Read>(mut reader: csv::Reader<R>, path: &Path) -> InputResult<Vec<Record>> {
    let unreadable = |source: csv::Error| InputError::Unreadable {
        path: path.to_path_buf(),
        source,
    };

    let headers = reader.headers().map_err(unreadable)?.clone();
    require_columns(path, &headers, &TRANSACTION_COLUMNS)?;

    let mut records = Vec::new();
    for (position, result) in reader.records().enumerate() {
        let record = match result {
            Ok(row) if row.len() != headers.len() => Record::malformed(
                position,
                format!("expected {} fields, found {}", headers.len(), row.len()),
            ),
            Ok(row) => match row.deserialize::<RawTransaction>(Some(&headers)) {
                Ok(raw) => Record::from_raw(position, raw),
                Err(e) => Record::malformed(position, e.to_string()),
            },
            Err(e) if matches!(e.kind(), csv::ErrorKind::Io(_)) => return Err(unreadable(e)),
            Err(e) => Record::malformed(position, e.to_string()),
        };

        if let Some(reason) = &record.malformed {
            debug!(position, reason = %reason, "unparseable transaction row");
        }
        records.push(record);
    }

    Ok(records)
}

fn require_columns(path: &Path, headers: &csv::StringRecord, columns: &[&str]) -> InputResult<()> {
    let missing: Vec<String> = columns
        .iter()
        .filter(|col| !headers.iter().any(|h| h.trim() == **col))
        .map(|col| col.to_string())
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(InputError::MissingColumns {
            path: path.to_path_buf(),
            columns: missing,
        })
    }
}

// ============================================================================
// PRODUCT MASTER
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferenceEntry {
    #[serde(rename = "StockCode")]
    pub stock_code: String,

    #[serde(rename = "Description", default)]
    pub description: Option<String>,

    #[serde(rename = "UnitPrice_Ref")]
    pub expected_price: f64,
}

impl ReferenceEntry {
    pub fn new(stock_code: &str, description: &str, expected_price: f64) -> Self {
        ReferenceEntry {
            stock_code: stock_code.to_string(),
            description: Some(description.to_string()),
            expected_price,
        }
    }
}

/// Product code → reference entry. Read-only once loaded.
#[derive(Debug, Clone, Default)]
pub struct ReferenceMaster {
    entries: HashMap<String, ReferenceEntry>,
}

impl ReferenceMaster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from entries; the first entry for a code wins
    pub fn from_entries(entries: impl IntoIterator<Item = ReferenceEntry>) -> Self {
        let mut master = ReferenceMaster::new();
        for entry in entries {
            if master.entries.contains_key(&entry.stock_code) {
                warn!(stock_code = %entry.stock_code, "duplicate product code in product master, keeping first");
                continue;
            }
            master.entries.insert(entry.stock_code.clone(), entry);
        }
        master
    }

    pub fn get(&self, stock_code: &str) -> Option<&ReferenceEntry> {
        self.entries.get(stock_code)
    }

    pub fn contains(&self, stock_code: &str) -> bool {
        self.entries.contains_key(stock_code)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

pub fn load_reference(path: &Path) -> InputResult<ReferenceMaster> {
    if !path.exists() {
        return Err(InputError::NotFound(path.to_path_buf()));
    }
    let reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|source| InputError::Unreadable {
            path: path.to_path_buf(),
            source,
        })?;
    read_reference(reader, path)
}

pub fn reference_from_reader<R: Read>(input: R) -> InputResult<ReferenceMaster> {
    let reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(input);
    read_reference(reader, Path::new("<memory>"))
}

fn read_reference<R: Read>(mut reader: csv::Reader<R>, path: &Path) -> InputResult<ReferenceMaster> {
    let headers = reader
        .headers()
        .map_err(|source| InputError::Unreadable {
            path: path.to_path_buf(),
            source,
        })?
        .clone();
    require_columns(path, &headers, &REFERENCE_COLUMNS)?;

    let mut entries = Vec::new();
    for (index, result) in reader.deserialize::<ReferenceEntry>().enumerate() {
        let row = index + 1;
        let entry = result.map_err(|e| InputError::Reference {
            row,
            message: e.to_string(),
        })?;
        if entry.stock_code.is_empty() {
            return Err(InputError::Reference {
                row,
                message: "empty StockCode".to_string(),
            });
        }
        if !entry.expected_price.is_finite() {
            return Err(InputError::Reference {
                row,
                message: format!("UnitPrice_Ref is not a finite number: {}", entry.expected_price),
            });
        }
        entries.push(entry);
    }

    Ok(ReferenceMaster::from_entries(entries))
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = "InvoiceNo,StockCode,Description,Quantity,InvoiceDate,UnitPrice,CustomerID,Country\n";

    #[test]
    fn test_load_well_formed_rows() {
        let csv = format!(
            "{}536365,85123A,WHITE HANGING HEART,6,12/1/2010 8:26,2.55,17850,United Kingdom\n",
            HEADER
        );
        let records = transactions_from_reader(csv.as_bytes()).unwrap();

        assert_eq!(records.len(), 1);
        let rec = &records[0];
        assert_eq!(rec.position, 0);
        assert_eq!(rec.quantity, Some(6));
        assert_eq!(rec.unit_price, Some(2.55));
        assert!(rec.invoice_date.is_some());
        assert_eq!(rec.stock_code(), Some("85123A"));
        assert!((rec.extended_price().unwrap() - 15.3).abs() < 1e-9);
    }

    #[test]
    fn test_empty_field_reads_as_none() {
        let csv = format!("{}536365,85123A,,6,,2.55,,United Kingdom\n", HEADER);
        let records = transactions_from_reader(csv.as_bytes()).unwrap();

        assert_eq!(records[0].description(), None);
        assert_eq!(records[0].customer_id(), None);
    }

    #[test]
    fn test_wrong_field_count_is_malformed_not_fatal() {
        let csv = format!(
            "{}536365,85123A\n536366,22633,HAND WARMER,6,12/1/2010 8:28,1.85,17850,United Kingdom\n",
            HEADER
        );
        let records = transactions_from_reader(csv.as_bytes()).unwrap();

        assert_eq!(records.len(), 2);
        assert!(records[0].is_malformed());
        assert!(!records[1].is_malformed());
        assert_eq!(records[1].position, 1);
    }

    #[test]
    fn test_missing_columns_is_fatal() {
        let csv = "InvoiceNo,StockCode\n1,A\n";
        let err = transactions_from_reader(csv.as_bytes()).unwrap_err();

        match err {
            InputError::MissingColumns { columns, .. } => {
                assert!(columns.contains(&"Quantity".to_string()));
                assert!(!columns.contains(&"InvoiceNo".to_string()));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_missing_file_is_fatal() {
        let err = load_transactions(Path::new("/definitely/not/here.csv")).unwrap_err();
        assert!(matches!(err, InputError::NotFound(_)));
    }

    #[test]
    fn test_parse_quantity() {
        assert_eq!(parse_quantity("12"), Some(12));
        assert_eq!(parse_quantity("-5"), Some(-5));
        assert_eq!(parse_quantity("6.0"), Some(6));
        assert_eq!(parse_quantity("2.5"), None);
        assert_eq!(parse_quantity("six"), None);
    }

    #[test]
    fn test_parse_quantity_rejects_out_of_range() {
        assert_eq!(parse_quantity("1e30"), None);
        assert_eq!(parse_quantity("99999999999999999999"), None);
        assert_eq!(parse_quantity("-1e30"), None);
        assert_eq!(parse_quantity("inf"), None);
        assert_eq!(parse_quantity("NaN"), None);
        assert_eq!(parse_quantity("1e3"), Some(1000));
    }

    #[test]
    fn test_padded_header_names_still_bind() {
        let csv = "InvoiceNo, StockCode ,Description,Quantity,InvoiceDate, UnitPrice,CustomerID,Country\n\
                   536365,85123A,WHITE HANGING HEART,6,12/1/2010 8:26,2.55,17850,United Kingdom\n";
        let records = transactions_from_reader(csv.as_bytes()).unwrap();

        assert_eq!(records[0].stock_code(), Some("85123A"));
        assert_eq!(records[0].unit_price, Some(2.55));
    }

    #[test]
    fn test_parse_invoice_date_formats() {
        assert!(parse_invoice_date("12/1/2010 8:26").is_some());
        assert!(parse_invoice_date("2010-12-01 08:26:00").is_some());
        assert!(parse_invoice_date("2010-12-01").is_some());
        assert!(parse_invoice_date("yesterday").is_none());
    }

    #[test]
    fn test_fingerprint_identical_rows() {
        let raw = RawTransaction {
            invoice_no: Some("1".to_string()),
            stock_code: Some("A1".to_string()),
            ..Default::default()
        };
        let a = Record::from_raw(0, raw.clone());
        let b = Record::from_raw(1, raw.clone());
        let mut other = raw;
        other.country = Some("France".to_string());
        let c = Record::from_raw(2, other);

        assert_eq!(a.fingerprint(), b.fingerprint());
        assert_ne!(a.fingerprint(), c.fingerprint());
    }

    #[test]
    fn test_reference_keeps_first_duplicate_code() {
        let csv = "StockCode,Description,UnitPrice_Ref\nA1,First,1.00\nB2,Other,2.00\nA1,Second,9.00\n";
        let master = reference_from_reader(csv.as_bytes()).unwrap();

        assert_eq!(master.len(), 2);
        assert_eq!(master.get("A1").unwrap().expected_price, 1.0);
    }

    #[test]
    fn test_reference_bad_price_is_fatal() {
        let csv = "StockCode,Description,UnitPrice_Ref\nA1,First,cheap\n";
        let err = reference_from_reader(csv.as_bytes()).unwrap_err();
        assert!(matches!(err, InputError::Reference { row: 1, .. }));
    }

    #[test]
    fn test_reference_rejects_non_finite_price() {
        for bad in ["NaN", "inf", "-inf"] {
            let csv = format!("StockCode,Description,UnitPrice_Ref\nA1,Mug,1.00\nB2,Plate,{}\n", bad);
            let err = reference_from_reader(csv.as_bytes()).unwrap_err();
            assert!(matches!(err, InputError::Reference { row: 2, .. }), "{bad}: {err}");
        }
    }
}
