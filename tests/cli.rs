use anyhow::Result;
use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

const TRANSACTIONS: &str = "\
InvoiceNo,StockCode,Description,Quantity,InvoiceDate,UnitPrice,CustomerID,Country
536365,85123A,WHITE HANGING HEART,6,12/1/2010 8:26,2.55,17850,United Kingdom
536366,71053,WHITE METAL LANTERN,6,12/1/2010 8:28,3.39,17850,United Kingdom
536367,84406B,CREAM CUPID HEARTS,8,12/8/2010 9:00,2.75,13047,France
";

const PRODUCT_MASTER: &str = "\
StockCode,Description,UnitPrice_Ref
85123A,WHITE HANGING HEART,2.55
71053,WHITE METAL LANTERN,3.39
84406B,CREAM CUPID HEARTS,2.75
";

/// Scratch directory holding the input files of one run
struct RunEnv {
    _tmp: TempDir,
    root: PathBuf,
}

impl RunEnv {
    fn new(transactions: &str, product_master: &str) -> Result<Self> {
        let tmp = tempfile::tempdir()?;
        let root = tmp.path().to_path_buf();
        fs::write(root.join("transactions.csv"), transactions)?;
        fs::write(root.join("products.csv"), product_master)?;
        Ok(Self { _tmp: tmp, root })
    }

    fn path(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    fn outdir(&self) -> PathBuf {
        self.path("outputs")
    }

    fn validate(&self) -> Result<Command> {
        let mut cmd = Command::cargo_bin("retail-dq")?;
        cmd.arg("validate")
            .arg("--input")
            .arg(self.path("transactions.csv"))
            .arg("--product-master")
            .arg(self.path("products.csv"))
            .arg("--outdir")
            .arg(self.outdir())
            .env_remove("RETAIL_DQ_CONFIG")
            .env_remove("RUST_LOG");
        Ok(cmd)
    }
}

fn exception_rules(outdir: &Path) -> Result<Vec<String>> {
    let mut rdr = csv::Reader::from_path(outdir.join("exception_log.csv"))?;
    let mut rules = Vec::new();
    for row in rdr.records() {
        rules.push(row?[3].to_string());
    }
    Ok(rules)
}

#[test]
fn test_clean_run_writes_all_outputs() -> Result<()> {
    let env = RunEnv::new(TRANSACTIONS, PRODUCT_MASTER)?;

    env.validate()?
        .assert()
        .success()
        .stdout(predicate::str::contains("Loaded 3 transactions"));

    let outdir = env.outdir();
    for file in [
        "exception_log.csv",
        "exception_samples.csv",
        "issue_summary.csv",
        "data_quality_score.json",
        "summary_kpis.csv",
    ] {
        assert!(outdir.join(file).exists(), "missing {}", file);
    }

    assert!(exception_rules(&outdir)?.is_empty());

    let score: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(outdir.join("data_quality_score.json"))?)?;
    assert_eq!(score["score"], 100.0);
    assert_eq!(score["grade"], "A");
    assert_eq!(score["total_records"], 3);
    Ok(())
}

#[test]
fn test_data_issues_still_exit_zero() -> Result<()> {
    let transactions = "\
InvoiceNo,StockCode,Description,Quantity,InvoiceDate,UnitPrice,CustomerID,Country
536365,85123A,WHITE HANGING HEART,-5,12/1/2010 8:26,2.55,,United Kingdom
536366,zz-9,MYSTERY ITEM,1,12/1/2010 8:28,2.00,17850,United Kingdom
536367,71053,WHITE METAL LANTERN,6,12/1/2010 8:28,9.99,17850,United Kingdom
";
    let env = RunEnv::new(transactions, PRODUCT_MASTER)?;

    env.validate()?.assert().success();

    let rules = exception_rules(&env.outdir())?;
    assert!(rules.contains(&"NON_POSITIVE_QUANTITY".to_string()));
    assert!(rules.contains(&"MISSING_REQUIRED_FIELD".to_string()));
    assert!(rules.contains(&"INVALID_STOCKCODE_FORMAT".to_string()));
    assert!(rules.contains(&"STOCKCODE_NOT_IN_PRODUCT_MASTER".to_string()));
    assert!(rules.contains(&"UNITPRICE_OUTLIER_VS_REFERENCE".to_string()));

    let score: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(env.outdir().join("data_quality_score.json"))?)?;
    assert!(score["score"].as_f64().unwrap_or(100.0) < 100.0);
    Ok(())
}

#[test]
fn test_missing_product_master_fails() -> Result<()> {
    let env = RunEnv::new(TRANSACTIONS, PRODUCT_MASTER)?;
    fs::remove_file(env.path("products.csv"))?;

    env.validate()?
        .assert()
        .failure()
        .stderr(predicate::str::contains("not found"));

    assert!(!env.outdir().join("exception_log.csv").exists());
    Ok(())
}

#[test]
fn test_missing_required_columns_fails() -> Result<()> {
    let transactions = "\
InvoiceNo,StockCode,Description,Quantity
536365,85123A,WHITE HANGING HEART,6
";
    let env = RunEnv::new(transactions, PRODUCT_MASTER)?;

    env.validate()?
        .assert()
        .failure()
        .stderr(predicate::str::contains("UnitPrice"));
    Ok(())
}

#[test]
fn test_config_overrides_business_key() -> Result<()> {
    let transactions = "\
InvoiceNo,StockCode,Description,Quantity,InvoiceDate,UnitPrice,CustomerID,Country
536365,85123A,WHITE HANGING HEART,6,12/1/2010 8:26,2.55,17850,United Kingdom
536365,71053,WHITE METAL LANTERN,6,12/1/2010 8:28,3.39,17850,United Kingdom
";
    let env = RunEnv::new(transactions, PRODUCT_MASTER)?;
    fs::write(env.path("rules.json"), r#"{ "business_key": ["InvoiceNo"] }"#)?;

    env.validate()?
        .arg("--config")
        .arg(env.path("rules.json"))
        .assert()
        .success();

    assert_eq!(exception_rules(&env.outdir())?, vec!["DUPLICATE_BUSINESS_KEY"]);
    Ok(())
}

#[test]
fn test_invalid_config_fails() -> Result<()> {
    let env = RunEnv::new(TRANSACTIONS, PRODUCT_MASTER)?;
    fs::write(env.path("rules.json"), r#"{ "business_key": ["NoSuchColumn"] }"#)?;

    env.validate()?
        .arg("--config")
        .arg(env.path("rules.json"))
        .assert()
        .failure();
    Ok(())
}

#[test]
fn test_value_report_writes_files() -> Result<()> {
    let env = RunEnv::new(TRANSACTIONS, PRODUCT_MASTER)?;

    Command::cargo_bin("retail-dq")?
        .arg("value-report")
        .arg("--input")
        .arg(env.path("transactions.csv"))
        .arg("--outdir")
        .arg(env.outdir())
        .assert()
        .success();

    let weekly = fs::read_to_string(env.outdir().join("value_report_weekly.csv"))?;
    assert!(weekly.starts_with("week,invoices,customers,revenue,lines"));
    assert!(weekly.contains("2010-11-29/2010-12-05"));

    let top = fs::read_to_string(env.outdir().join("value_report_top_products.csv"))?;
    assert!(top.starts_with("StockCode,Description,revenue,qty,invoices"));
    Ok(())
}
