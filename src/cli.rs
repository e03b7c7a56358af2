use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Fetch Mark Six draw history and summarise it.
#[derive(Parser, Debug)]
#[command(name = "marksix", version, about)]
pub struct Args {
    /// Increase log verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Only log errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Directory holding one JSON file per draw
    #[arg(long, global = true)]
    pub records_dir: Option<PathBuf>,

    /// JSON list of dates without a draw
    #[arg(long, global = true)]
    pub no_draw_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Fetch every draw not stored yet
    Fetch {
        /// Treat this day as today (YYYY-MM-DD); days before it are fetched
        #[arg(long)]
        today: Option<NaiveDate>,
    },
    /// Print number frequencies over the stored draws
    Stats {
        /// Also write an HTML report
        #[arg(long)]
        report: bool,
    },
    /// Rewrite stored files from the old {date, number, result} layout
    Migrate,
}

impl Args {
    pub fn log_level(&self) -> &'static str {
        if self.quiet {
            return "error";
        }
        match self.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    }
}
