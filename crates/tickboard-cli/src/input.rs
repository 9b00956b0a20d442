//! Reading ticket snapshots and other JSON inputs.

use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use tickboard_core::Ticket;
use tickboard_core::filter::parse_timestamp;
use tracing::debug;

/// Read a whole file, or stdin when `source` is `-`.
pub fn read_source(source: &str) -> Result<String> {
    if source == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("failed to read stdin")?;
        return Ok(buf);
    }
    std::fs::read_to_string(Path::new(source)).with_context(|| format!("failed to read {source}"))
}

/// Load a JSON array of tickets.
pub fn load_tickets(source: &str) -> Result<Vec<Ticket>> {
    let raw = read_source(source)?;
    let tickets: Vec<Ticket> = serde_json::from_str(&raw)
        .with_context(|| format!("{source} is not a JSON array of tickets"))?;
    debug!(source, count = tickets.len(), "loaded tickets");
    Ok(tickets)
}

/// Resolve `--now`, defaulting to the current time.
pub fn reference_time(raw: Option<&str>) -> Result<DateTime<Utc>> {
    match raw {
        None => Ok(Utc::now()),
        Some(value) => parse_timestamp(value)
            .with_context(|| format!("--now expects an ISO-8601 timestamp, got '{value}'")),
    }
}
