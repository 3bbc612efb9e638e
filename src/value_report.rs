// 💷 Value Report - weekly trend and top products by revenue
// Business-facing companion to the quality run, built from the same records.

use crate::record::Record;
use chrono::{Datelike, Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

pub const DEFAULT_TOP_PRODUCTS: usize = 25;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeeklyRow {
    /// Monday–Sunday span, `YYYY-MM-DD/YYYY-MM-DD`
    pub week: String,
    pub invoices: usize,
    pub customers: usize,
    pub revenue: f64,
    pub lines: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopProductRow {
    #[serde(rename = "StockCode")]
    pub stock_code: String,
    #[serde(rename = "Description")]
    pub description: String,
    pub revenue: f64,
    pub qty: i64,
    pub invoices: usize,
}

#[derive(Default)]
struct WeekAccumulator<'a> {
    invoices: HashSet<&'a str>,
    customers: HashSet<&'a str>,
    revenue: f64,
    lines: usize,
}

#[derive(Default)]
struct ProductAccumulator<'a> {
    revenue: f64,
    qty: i64,
    invoices: HashSet<&'a str>,
}

/// Rows without a parseable invoice date are left out.
pub fn weekly_trend(records: &[Record]) -> Vec<WeeklyRow> {
    let mut weeks: BTreeMap<NaiveDate, WeekAccumulator> = BTreeMap::new();

    for record in records {
        let date = match record.invoice_date {
            Some(dt) => dt.date(),
            None => continue,
        };
        let monday = date - Duration::days(date.weekday().num_days_from_monday() as i64);
        let week = weeks.entry(monday).or_default();

        if let Some(invoice) = record.invoice_no() {
            week.invoices.insert(invoice);
        }
        if let Some(customer) = record.customer_id() {
            week.customers.insert(customer);
        }
        week.revenue += record.extended_price().unwrap_or(0.0);
        week.lines += 1;
    }

    weeks
        .into_iter()
        .map(|(monday, acc)| WeeklyRow {
            week: format!("{}/{}", monday, monday + Duration::days(6)),
            invoices: acc.invoices.len(),
            customers: acc.customers.len(),
            revenue: round2(acc.revenue),
            lines: acc.lines,
        })
        .collect()
}

/// Highest-revenue (StockCode, Description) pairs; ties keep key order.
pub fn top_products(records: &[Record], limit: usize) -> Vec<TopProductRow> {
    let mut products: BTreeMap<(&str, &str), ProductAccumulator> = BTreeMap::new();

    for record in records {
        let key = match (record.stock_code(), record.description()) {
            (Some(code), Some(desc)) => (code, desc),
            _ => continue,
        };
        let product = products.entry(key).or_default();
        product.revenue += record.extended_price().unwrap_or(0.0);
        product.qty += record.quantity.unwrap_or(0);
        if let Some(invoice) = record.invoice_no() {
            product.invoices.insert(invoice);
        }
    }

    let mut rows: Vec<TopProductRow> = products
        .into_iter()
        .map(|((code, desc), acc)| TopProductRow {
            stock_code: code.to_string(),
            description: desc.to_string(),
            revenue: round2(acc.revenue),
            qty: acc.qty,
            invoices: acc.invoices.len(),
        })
        .collect();

    rows.sort_by(|a, b| b.revenue.total_cmp(&a.revenue));
    rows.truncate(limit);
    rows
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
