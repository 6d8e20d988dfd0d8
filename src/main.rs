use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use circulars::budget::BudgetLedger;
use circulars::config::{self, Config};
use circulars::extract::sinhala_chars;
use circulars::models::Language;
use circulars::pipeline::{build_ladder, Pipeline};

#[derive(Parser)]
#[command(
    name = "circulars",
    version,
    about = "Sri Lanka government circulars ingestion pipeline"
)]
struct Cli {
    /// SQLite database file.
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// Root directory for downloads, extracted text, ledger and report.
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Full detect → fetch → extract → summarise → persist pass (default).
    Run,
    /// Print the cloud OCR budget ledger without processing anything.
    Status,
    /// Run the extraction ladder on one PDF and report per-tier page counts.
    Test {
        pdf: PathBuf,
        /// Language code of the document (E or S).
        #[arg(long, default_value = "S")]
        language: String,
    },
    /// Re-extract and re-summarise stored Sinhala rows with garbled text.
    Reprocess,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .init();

    let cli = Cli::parse();

    let mut config = Config::from_env();
    if let Some(dir) = &cli.data_dir {
        config = config.with_data_dir(dir);
    }
    if let Some(db) = &cli.db {
        config.db_path = db.clone();
    }

    match cli.command.unwrap_or(Command::Run) {
        Command::Run => run_pipeline(&config),
        Command::Status => show_status(&config),
        Command::Test { pdf, language } => test_one_pdf(&config, &pdf, &language),
        Command::Reprocess => run_reprocess(&config),
    }
}

fn run_pipeline(config: &Config) -> ExitCode {
    tracing::info!(version = config::APP_VERSION, "Circulars pipeline starting");

    let mut pipeline = match Pipeline::build(config) {
        Ok(pipeline) => pipeline,
        Err(e) => {
            tracing::error!(error = %e, "Startup failed");
            return ExitCode::from(2);
        }
    };

    println!("{}", pipeline.ledger().status_report(config.monthly_cap));

    let (stats, report) = match pipeline.run() {
        Ok(result) => result,
        Err(e) => {
            tracing::error!(error = %e, "Pipeline run failed");
            return ExitCode::from(2);
        }
    };

    println!();
    println!("Run complete — {stats}");
    println!("{}", pipeline.ledger().status_report(config.monthly_cap));

    // Non-zero exit when actionable circulars were found, so external
    // scheduling logic can chain further steps on $?.
    if report.actionable() > 0 {
        tracing::info!(actionable = report.actionable(), "Actionable circulars found");
        ExitCode::from(1)
    } else {
        ExitCode::SUCCESS
    }
}

fn show_status(config: &Config) -> ExitCode {
    let ledger = BudgetLedger::load(
        &config.ledger_path,
        config.monthly_cap,
        config.safety_buffer,
    );
    println!("{}", ledger.status_report(config.monthly_cap));
    ExitCode::SUCCESS
}

fn test_one_pdf(config: &Config, pdf: &std::path::Path, language: &str) -> ExitCode {
    let Some(language) = Language::from_code(&language.to_uppercase()) else {
        eprintln!("Unknown language code {language:?} (expected E, S or T)");
        return ExitCode::from(2);
    };
    if !pdf.exists() {
        eprintln!("Not found: {}", pdf.display());
        return ExitCode::from(2);
    }

    let mut ledger = BudgetLedger::load(
        &config.ledger_path,
        config.monthly_cap,
        config.safety_buffer,
    );
    println!("{}", ledger.status_report(config.monthly_cap));

    let ladder = build_ladder(config);
    let document = match ladder.extract_file(pdf, language, &mut ledger) {
        Ok(document) => document,
        Err(e) => {
            tracing::error!(error = %e, "Extraction failed");
            return ExitCode::from(2);
        }
    };

    let si_chars = sinhala_chars(&document.full_text);
    println!();
    println!("Pages         : {}", document.page_count);
    println!(
        "Tiers         : native {}  cloud {}  local {}",
        document.tally.native, document.tally.cloud, document.tally.local
    );
    println!("Total chars   : {}", document.text_chars);
    println!("Sinhala chars : {si_chars}");
    println!(
        "Garbled       : {}",
        circulars::extract::is_garbled(&document.full_text)
    );
    println!();
    println!("First 600 chars:");
    println!("{}", document.full_text.chars().take(600).collect::<String>());
    println!();
    println!("{}", ledger.status_report(config.monthly_cap));
    ExitCode::SUCCESS
}

fn run_reprocess(config: &Config) -> ExitCode {
    let mut pipeline = match Pipeline::build(config) {
        Ok(pipeline) => pipeline,
        Err(e) => {
            tracing::error!(error = %e, "Startup failed");
            return ExitCode::from(2);
        }
    };

    println!("{}", pipeline.ledger().status_report(config.monthly_cap));

    match pipeline.reprocess() {
        Ok(stats) => {
            println!();
            println!(
                "Reprocess complete — candidates: {}  fixed: {}  skipped: {}  failed: {}",
                stats.candidates, stats.fixed, stats.skipped, stats.failed
            );
            println!("{}", pipeline.ledger().status_report(config.monthly_cap));
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(error = %e, "Reprocess failed");
            ExitCode::from(2)
        }
    }
}
