use anyhow::{Context, Result};
use chrono::Local;
use clap::Parser;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

mod cli;

use cli::{Args, Command};
use marksix::config::{self, Config, StoreBackend};
use marksix::database::SqliteRecordStore;
use marksix::migrate::migrate_legacy_records;
use marksix::{FileRecordStore, HkjcClient, NoDrawDates, RecordStore, Reconciler, reports, stats};

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(args.log_level()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    match run(args).await {
        Ok(code) => code,
        Err(e) => {
            tracing::error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> Result<ExitCode> {
    let mut config = config::load()?;
    if let Some(dir) = args.records_dir {
        config.records_dir = dir;
    }
    if let Some(path) = args.no_draw_file {
        config.no_draw_dates_path = path;
    }

    match args.command {
        Command::Fetch { today } => fetch(&config, today).await,
        Command::Stats { report } => show_stats(&config, report),
        Command::Migrate => migrate(&config),
    }
}

fn open_store(config: &Config) -> Result<Box<dyn RecordStore>> {
    Ok(match config.store {
        StoreBackend::Json => Box::new(
            FileRecordStore::open(&config.records_dir)
                .context("failed to open records directory")?,
        ),
        StoreBackend::Sqlite => Box::new(
            SqliteRecordStore::open(&config.database_path)
                .context("failed to open records database")?,
        ),
    })
}

async fn fetch(config: &Config, today: Option<chrono::NaiveDate>) -> Result<ExitCode> {
    let today = today.unwrap_or_else(|| Local::now().date_naive());
    let store = open_store(config)?;
    let no_draw = NoDrawDates::load(&config.no_draw_dates_path)
        .context("failed to load no draw dates")?;
    let client = HkjcClient::new(
        &config.host,
        &config.user_agent,
        config.retry.clone(),
        config.request_interval,
    )?;

    let mut reconciler = Reconciler::new(&client, &*store, no_draw, config.first_draw_date);
    match reconciler.run(today).await {
        Ok(summary) => {
            println!(
                "🎯 Successfully fetched {} Mark Six records",
                summary.saved.len()
            );
            Ok(ExitCode::SUCCESS)
        }
        Err(aborted) => {
            tracing::error!("{:#}", anyhow::Error::new(aborted.source));
            match aborted.date {
                Some(date) => println!(
                    "❌ Stopped at {} after fetching {} Mark Six records",
                    date,
                    aborted.summary.saved.len()
                ),
                None => println!("❌ Could not work out which dates to fetch"),
            }
            Ok(ExitCode::FAILURE)
        }
    }
}

fn show_stats(config: &Config, report: bool) -> Result<ExitCode> {
    let store = open_store(config)?;
    let records = store.find_all().context("failed to read stored records")?;
    let stats = stats::compute(&records);
    println!("{}", serde_json::to_string_pretty(&stats)?);

    if report {
        let today = Local::now().date_naive();
        let html = reports::generate_html_report(&stats, today);
        let path = reports::save_html_report(&html, &config.report_dir, today)?;
        println!("📄 Report written to {}", path.display());
    }
    Ok(ExitCode::SUCCESS)
}

fn migrate(config: &Config) -> Result<ExitCode> {
    let store = FileRecordStore::open(&config.records_dir)?;
    let report = migrate_legacy_records(&store).context("migration failed")?;
    println!(
        "✅ Migrated {} records, {} already up to date",
        report.migrated, report.canonical
    );
    Ok(ExitCode::SUCCESS)
}
