//! `tb select`: replay recorded pointer/keyboard events against a board.
//!
//! The visible rows are exactly what `tb query` with the same flags would
//! list: ticket rows of the flattened grouping (collapsed groups hide their
//! tickets), or the sorted list when ungrouped. Event indices refer to that
//! order.

use std::collections::BTreeSet;
use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;
use tickboard_core::config::BoardConfig;
use tickboard_core::model::Status;
use tickboard_core::selection::{EventResponse, ListHost, PointerEvent, SelectionMachine};
use tickboard_core::Ticket;
use tracing::debug;

use super::query::{QueryArgs, board_rows};
use crate::input::{load_tickets, read_source, reference_time};
use crate::output::{OutputMode, field, render_mode, section};

/// Arguments for `tb select`.
#[derive(Args, Debug)]
pub struct SelectArgs {
    #[command(flatten)]
    pub query: QueryArgs,

    /// JSON array of events, e.g. `[{"type":"click","index":0}]`.
    #[arg(long, value_name = "FILE")]
    pub events: PathBuf,

    /// Override the configured drag threshold (pixels).
    #[arg(long)]
    pub threshold: Option<u32>,
}

#[derive(Debug, Serialize)]
struct StatusChange {
    id: String,
    status: Status,
}

#[derive(Debug, Serialize)]
pub struct SelectReport {
    pub visible: Vec<String>,
    pub selection: BTreeSet<String>,
    pub context_targets: Vec<String>,
    pub navigations: Vec<String>,
    status_changes: Vec<StatusChange>,
    /// Number of `on_change` notifications delivered.
    pub changes: usize,
    pub responses: Vec<EventResponse>,
}

/// Run `events` through a fresh machine over `visible`.
pub fn replay(visible: Vec<&Ticket>, threshold: u32, events: &[PointerEvent]) -> SelectReport {
    let ids = visible.iter().map(|t| t.id.clone()).collect();
    let mut machine = SelectionMachine::with_threshold(ListHost::new(visible), threshold);
    let responses = events.iter().map(|event| machine.dispatch(*event)).collect();

    let selection = machine.selection().clone();
    let context_targets = machine
        .context_targets()
        .iter()
        .map(|t| t.id.clone())
        .collect();
    let host = machine.into_host();
    SelectReport {
        visible: ids,
        selection,
        context_targets,
        navigations: host.navigations,
        status_changes: host
            .status_changes
            .into_iter()
            .map(|(id, status)| StatusChange { id, status })
            .collect(),
        changes: host.snapshots.len(),
        responses,
    }
}

pub fn run_select(args: &SelectArgs, config: &BoardConfig, output: OutputMode) -> Result<()> {
    let tickets = load_tickets(&args.query.tickets)?;
    let view = args.query.resolve_view(config)?;
    let now = reference_time(args.query.now.as_deref())?;

    let raw = read_source(&args.events.to_string_lossy())?;
    let events: Vec<PointerEvent> = serde_json::from_str(&raw)
        .with_context(|| format!("{} is not a JSON array of events", args.events.display()))?;

    let visible = view.query().run_at(&tickets, now);
    let order: Vec<&Ticket> = match board_rows(&tickets, &visible, &view) {
        Some(rows) => rows.iter().filter_map(|row| row.ticket()).collect(),
        None => visible,
    };
    debug!(rows = order.len(), events = events.len(), "replaying selection");

    let threshold = args.threshold.unwrap_or(config.selection.drag_threshold_px);
    let report = replay(order, threshold, &events);
    render_mode(output, &report, write_text, write_pretty)
}

fn write_text(report: &SelectReport, w: &mut dyn Write) -> io::Result<()> {
    for id in &report.selection {
        writeln!(w, "selected\t{id}")?;
    }
    for id in &report.context_targets {
        writeln!(w, "context\t{id}")?;
    }
    for id in &report.navigations {
        writeln!(w, "navigate\t{id}")?;
    }
    for change in &report.status_changes {
        writeln!(w, "status\t{}\t{}", change.id, change.status)?;
    }
    Ok(())
}

fn write_pretty(report: &SelectReport, w: &mut dyn Write) -> io::Result<()> {
    section(w, "Selection")?;
    field(w, "Visible", report.visible.len())?;
    field(w, "Events", report.responses.len())?;
    field(w, "Changes", report.changes)?;
    let selected: Vec<&str> = report.selection.iter().map(String::as_str).collect();
    let selected = if selected.is_empty() {
        "(none)".to_string()
    } else {
        selected.join(", ")
    };
    field(w, "Selected", selected)?;
    if !report.context_targets.is_empty() {
        field(w, "Context", report.context_targets.join(", "))?;
    }
    if !report.navigations.is_empty() {
        field(w, "Navigated", report.navigations.join(", "))?;
    }
    for change in &report.status_changes {
        field(w, "Status", format!("{} -> {}", change.id, change.status.label()))?;
    }
    Ok(())
}
