//! Command-line argument definitions.

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};

/// Tutoring invoice generator.
///
/// Reconciles calendar events against the client roster and renders
/// per-client invoices for a billing period.
#[derive(Debug, Parser)]
#[command(name = "tb", version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to config file.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Generate invoices for a billing period.
    Generate {
        /// Period start date (YYYY-MM-DD). Defaults to the last full month.
        #[arg(long, requires = "end")]
        start: Option<NaiveDate>,

        /// Period end date (YYYY-MM-DD), inclusive.
        #[arg(long, requires = "start")]
        end: Option<NaiveDate>,

        /// Only invoice these students (repeatable).
        #[arg(long = "student")]
        students: Vec<String>,

        /// Read events from a JSON file instead of the calendar API.
        #[arg(long)]
        events_file: Option<PathBuf>,
    },

    /// Show assembled lessons and diagnostics without writing invoices.
    Lessons {
        /// Period start date (YYYY-MM-DD). Defaults to the last full month.
        #[arg(long, requires = "end")]
        start: Option<NaiveDate>,

        /// Period end date (YYYY-MM-DD), inclusive.
        #[arg(long, requires = "start")]
        end: Option<NaiveDate>,

        /// Only include these students (repeatable).
        #[arg(long = "student")]
        students: Vec<String>,

        /// Read events from a JSON file instead of the calendar API.
        #[arg(long)]
        events_file: Option<PathBuf>,

        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },
}
