//! The lessons command: show assembled lessons without writing invoices.

use std::path::Path;

use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use serde::Serialize;

use tb_core::{Fault, Lesson, Skip, assemble_lessons};

use crate::commands::util;
use crate::{Config, data, dates, invoice};

#[derive(Serialize)]
struct LessonsOutput<'a> {
    start: NaiveDate,
    end: NaiveDate,
    lessons: &'a [Lesson],
    skips: &'a [Skip],
    faults: &'a [Fault],
}

pub fn run(
    config: &Config,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
    students: &[String],
    events_file: Option<&Path>,
    json: bool,
) -> Result<()> {
    let today = Local::now().date_naive();
    let (start, end) = dates::resolve_period(start, end, today)?;

    let roster = data::load_roster(&config.data_dir).context("failed to load roster")?;
    let events = util::load_events(&config.data_dir, start, end, events_file)?;
    let assembly = assemble_lessons(&events, &roster, students);

    if json {
        let output = LessonsOutput {
            start,
            end,
            lessons: &assembly.lessons,
            skips: &assembly.skips,
            faults: &assembly.faults,
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    println!(
        "Lessons from {} to {}:",
        start.format("%d %B %Y"),
        end.format("%d %B %Y")
    );
    if assembly.lessons.is_empty() {
        println!("  (none)");
    }
    for lesson in &assembly.lessons {
        let local_start = lesson.start.with_timezone(&Local);
        let local_end = lesson.end.with_timezone(&Local);
        println!(
            "  {}  {} {}-{}  {}/h  {}",
            lesson.student,
            invoice::format_british_date(&local_start),
            invoice::format_24h_time(&local_start),
            invoice::format_24h_time(&local_end),
            invoice::format_currency(lesson.rate),
            lesson.client_type,
        );
    }

    // Filtered-out skips were requested by the caller; nothing to report.
    let counts = assembly.skip_counts();
    let reported: Vec<_> = counts
        .iter()
        .filter(|(reason, _)| **reason != tb_core::SkipReason::FilteredOut)
        .collect();
    if !reported.is_empty() {
        println!("\nSkipped events:");
        for (reason, count) in reported {
            println!("  {reason}: {count}");
        }
    }

    Ok(())
}
