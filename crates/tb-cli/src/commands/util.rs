//! Shared helpers for commands that consume calendar events.

use std::path::Path;

use anyhow::{Context, Result};
use chrono::NaiveDate;

use tb_core::RawEvent;

use crate::{data, dates};

/// Loads the event batch for the period: from a JSON file when one is
/// given, otherwise from the calendar API.
pub(crate) fn load_events(
    data_dir: &Path,
    start: NaiveDate,
    end: NaiveDate,
    events_file: Option<&Path>,
) -> Result<Vec<RawEvent>> {
    if let Some(path) = events_file {
        return Ok(data::load_events_file(path)?);
    }

    let mut auth = data::load_token(data_dir).context("failed to load calendar token")?;
    let (lower, upper) = dates::period_bounds(start, end);

    let runtime = tokio::runtime::Runtime::new().context("failed to start async runtime")?;
    runtime.block_on(async {
        // The stored access token is short-lived; refresh up front whenever
        // we can, and persist the result for the next run.
        if auth.can_refresh() {
            auth.token = tb_calendar::refresh_access_token(&auth)
                .await
                .context("failed to refresh access token")?;
            data::save_token(data_dir, &auth).context("failed to persist refreshed token")?;
        }

        let client = tb_calendar::Client::new(&auth.token)?;
        let outcome = client
            .fetch_events(lower, upper)
            .await
            .context("failed to fetch calendar events")?;

        if !outcome.rejected.is_empty() {
            println!(
                "{} event(s) had no usable times (all-day or malformed) and were not processed.",
                outcome.rejected.len()
            );
        }
        Ok(outcome.events)
    })
}
