use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use std::io::{self, IsTerminal};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::info;

use retail_dq::logging::{init_logging, LogConfig, LogFormat};
use retail_dq::value_report::DEFAULT_TOP_PRODUCTS;
use retail_dq::{
    exception_samples, issue_summary, load_reference, load_transactions, top_products,
    weekly_trend, CsvReportWriter, ReportWriter, RunOutputs, ScoreCalculator, ScoreReport,
    SummaryKpis, ValidationConfig, ValidationPipeline,
};

#[derive(Parser)]
#[command(name = "retail-dq")]
#[command(about = "Data-quality gate for retail transaction exports", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// More log output (-v info, -vv debug, -vvv trace); RUST_LOG wins when set
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Log output format
    #[arg(long, value_enum, default_value = "pretty", global = true)]
    log_format: LogFormatArg,
}

#[derive(Subcommand)]
enum Command {
    /// 🔍 Validate transactions against the product master and score them
    Validate {
        /// Transactions CSV
        #[arg(long)]
        input: PathBuf,

        /// Product master CSV (StockCode, Description, UnitPrice_Ref)
        #[arg(long, alias = "reference")]
        product_master: PathBuf,

        /// Output directory
        #[arg(long, default_value = "outputs")]
        outdir: PathBuf,

        /// JSON file overriding rule defaults
        #[arg(long, env = "RETAIL_DQ_CONFIG")]
        config: Option<PathBuf>,
    },

    /// 💷 Weekly trend and top products by revenue
    ValueReport {
        /// Transactions CSV
        #[arg(long)]
        input: PathBuf,

        /// Output directory
        #[arg(long, default_value = "outputs")]
        outdir: PathBuf,

        /// Number of products to keep
        #[arg(long, default_value_t = DEFAULT_TOP_PRODUCTS)]
        top: usize,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum LogFormatArg {
    Pretty,
    Compact,
    Json,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let log_config = LogConfig {
        format: match cli.log_format {
            LogFormatArg::Pretty => LogFormat::Pretty,
            LogFormatArg::Compact => LogFormat::Compact,
            LogFormatArg::Json => LogFormat::Json,
        },
        with_ansi: io::stderr().is_terminal(),
        ..LogConfig::from_verbosity(cli.verbose)
    };
    if let Err(e) = init_logging(&log_config) {
        eprintln!("❌ Failed to initialize logging: {}", e);
        return ExitCode::FAILURE;
    }

    let result = match cli.command {
        Command::Validate {
            input,
            product_master,
            outdir,
            config,
        } => run_validate(input, product_master, outdir, config),
        Command::ValueReport { input, outdir, top } => run_value_report(input, outdir, top),
    };

    // Data-quality findings never fail the run; only unusable input does
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("❌ {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run_validate(
    input: PathBuf,
    product_master: PathBuf,
    outdir: PathBuf,
    config_path: Option<PathBuf>,
) -> Result<()> {
    println!("🔍 Retail data quality check");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    let config = match &config_path {
        Some(path) => ValidationConfig::from_file(path)?,
        None => ValidationConfig::default(),
    };

    // 1. Product master first: every record is checked against it
    let reference = load_reference(&product_master)?;
    println!("✓ Loaded {} products from {}", reference.len(), product_master.display());

    // 2. Transactions
    let records = load_transactions(&input)?;
    println!("✓ Loaded {} transactions from {}", records.len(), input.display());

    // 3. Validate + score
    let pipeline = ValidationPipeline::new(&reference, &config)?;
    let report = pipeline.run(&records);
    let score = ScoreCalculator::new(config.scoring.clone()).calculate(&report);
    info!(score = score.score, grade = %score.grade, "scored dataset");

    // 4. Outputs
    let kpis = SummaryKpis::compute(&records, &report);
    let samples = exception_samples(&records, &report, config.sample_limit);
    let summary = issue_summary(&report);
    let score_report = ScoreReport::new(score);

    let mut writer = CsvReportWriter::new(&outdir)?;
    writer.write_all(&RunOutputs {
        exceptions: &report.exceptions,
        samples: &samples,
        issue_summary: &summary,
        score: &score_report,
        kpis: &kpis,
    })?;

    println!("\n━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("📊 {}", report.summary());
    println!("🏅 {}", score_report.score.summary());
    println!("✅ Outputs written to {}", writer.outdir().display());

    Ok(())
}

fn run_value_report(input: PathBuf, outdir: PathBuf, top: usize) -> Result<()> {
    let records = load_transactions(&input)?;
    println!("✓ Loaded {} transactions from {}", records.len(), input.display());

    let weekly = weekly_trend(&records);
    let products = top_products(&records, top);

    let mut writer = CsvReportWriter::new(&outdir)?;
    writer.write_weekly(&weekly)?;
    writer.write_top_products(&products)?;

    println!("✅ Value report files written to {}", writer.outdir().display());
    Ok(())
}
