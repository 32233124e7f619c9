//! The generate command: fetch events, assemble lessons, write invoices.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};

use tb_core::{Assembly, Roster, SkipReason, assemble_lessons};

use crate::commands::util;
use crate::{Config, data, dates, invoice};

pub fn run(
    config: &Config,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
    students: &[String],
    events_file: Option<&Path>,
) -> Result<()> {
    let today = Local::now().date_naive();
    let (start, end) = dates::resolve_period(start, end, today)?;
    println!(
        "Invoicing {} to {}.",
        start.format("%d %B %Y"),
        end.format("%d %B %Y")
    );

    let roster = data::load_roster(&config.data_dir).context("failed to load roster")?;
    let bank =
        data::load_bank_details(&config.data_dir).context("failed to load bank details")?;
    let contact =
        data::load_contact_details(&config.data_dir).context("failed to load contact details")?;

    let events = util::load_events(&config.data_dir, start, end, events_file)?;
    let assembly = assemble_lessons(&events, &roster, students);

    fs::create_dir_all(&config.output_dir)
        .with_context(|| format!("failed to create {}", config.output_dir.display()))?;
    let period = invoice::invoice_period(start, end);
    let written = invoice::write_invoices(
        &config.output_dir,
        &assembly.lessons,
        &period,
        &bank,
        &contact,
    )?;

    print_summary(&assembly, events.len(), &roster, &written);
    Ok(())
}

fn print_summary(assembly: &Assembly, event_count: usize, roster: &Roster, written: &[PathBuf]) {
    println!(
        "Processed {} lessons from {} events.",
        assembly.lessons.len(),
        event_count
    );

    // Filtered-out skips were requested by the caller; nothing to report.
    let counts = assembly.skip_counts();
    let reported: Vec<_> = counts
        .iter()
        .filter(|(reason, _)| **reason != SkipReason::FilteredOut)
        .collect();
    if !reported.is_empty() {
        println!("\nSkipped events:");
        for (reason, count) in reported {
            println!("  {reason}: {count}");
        }
    }

    if !assembly.faults.is_empty() {
        println!("\nEvents with invalid times:");
        for fault in &assembly.faults {
            println!("  '{}': {}", fault.title, fault.message);
        }
    }

    // The actionable list: sessions happened but billing config is missing.
    let missing = assembly.missing_students();
    if !missing.is_empty() {
        println!("\nStudents missing from {}:", data::STUDENTS_FILE);
        for name in missing {
            println!("  {name}");
        }
        println!("Add their details before generating invoices.");
    }

    let inactive = inactive_students(assembly, roster);
    if !inactive.is_empty() {
        println!("\nNot seen this period:");
        for name in inactive {
            println!("  {name}");
        }
    }

    if written.is_empty() {
        println!("\nNo invoices to write.");
    } else {
        println!("\nInvoices written:");
        for path in written {
            println!("  {}", path.display());
        }
    }
}

/// Roster entries with no lessons in the period; a prompt for the operator
/// to check in with inactive clients.
fn inactive_students<'a>(assembly: &Assembly, roster: &'a Roster) -> Vec<&'a str> {
    roster
        .names()
        .filter(|name| !assembly.lessons.iter().any(|lesson| lesson.student == *name))
        .collect()
}
