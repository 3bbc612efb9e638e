// ⚙️ Validation Config - Rules as Data
// Every tunable the checks and the score use. Loaded from JSON; any field
// left out falls back to its default.

use crate::error::{InputError, InputResult};
use crate::record::{
    COL_COUNTRY, COL_CUSTOMER_ID, COL_INVOICE_NO, COL_QUANTITY, COL_STOCK_CODE, COL_UNIT_PRICE,
    KNOWN_COLUMNS,
};
use crate::score::ScoringPolicy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

pub const DEFAULT_STOCK_CODE_PATTERN: &str = "^[A-Z0-9]+$";
pub const DEFAULT_OUTLIER_THRESHOLD: f64 = 0.5;
pub const DEFAULT_SAMPLE_LIMIT: usize = 50;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    /// Columns that must hold a non-blank value
    pub required_fields: Vec<String>,

    /// Columns that together identify one sales line
    pub business_key: Vec<String>,

    /// Regex a present StockCode must match
    pub stock_code_pattern: String,

    /// Relative price deviation above which a record is an outlier (0.5 = 50%)
    pub outlier_threshold: f64,

    /// Category weights and grade bands
    pub scoring: ScoringPolicy,

    /// Max offending rows kept per category in the samples file
    pub sample_limit: usize,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        ValidationConfig {
            required_fields: [
                COL_INVOICE_NO,
                COL_STOCK_CODE,
                COL_QUANTITY,
                COL_UNIT_PRICE,
                COL_CUSTOMER_ID,
                COL_COUNTRY,
            ]
            .iter()
            .map(|c| c.to_string())
            .collect(),
            business_key: vec![COL_INVOICE_NO.to_string(), COL_STOCK_CODE.to_string()],
            stock_code_pattern: DEFAULT_STOCK_CODE_PATTERN.to_string(),
            outlier_threshold: DEFAULT_OUTLIER_THRESHOLD,
            scoring: ScoringPolicy::default(),
            sample_limit: DEFAULT_SAMPLE_LIMIT,
        }
    }
}

impl ValidationConfig {
    /// Load config from a JSON file and validate it
    pub fn from_file<P: AsRef<Path>>(path: P) -> InputResult<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            InputError::Config(format!("failed to read {}: {}", path.display(), e))
        })?;

        let config: ValidationConfig = serde_json::from_str(&content).map_err(|e| {
            InputError::Config(format!("failed to parse {}: {}", path.display(), e))
        })?;

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> InputResult<()> {
        for column in self.required_fields.iter().chain(self.business_key.iter()) {
            if !KNOWN_COLUMNS.contains(&column.as_str()) {
                return Err(InputError::Config(format!("unknown column '{}'", column)));
            }
        }

        if self.business_key.is_empty() {
            return Err(InputError::Config("business_key must name at least one column".to_string()));
        }

        self.compile_stock_code_pattern()?;

        if !self.outlier_threshold.is_finite() || self.outlier_threshold < 0.0 {
            return Err(InputError::Config(format!(
                "outlier_threshold must be a non-negative number, got {}",
                self.outlier_threshold
            )));
        }

        self.scoring.validate()
    }

    pub fn compile_stock_code_pattern(&self) -> InputResult<Regex> {
        Regex::new(&self.stock_code_pattern).map_err(|e| {
            InputError::Config(format!("invalid stock_code_pattern: {}", e))
        })
    }
}
