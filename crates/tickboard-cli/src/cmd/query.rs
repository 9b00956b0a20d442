//! `tb query`: filter, search, sort, and group a ticket snapshot.

use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::Args;
use serde::Serialize;
use tickboard_core::config::BoardConfig;
use tickboard_core::group::{FlatRow, flatten_groups, group_tickets_within};
use tickboard_core::ids::{IdSource, MonotonicIds};
use tickboard_core::model::{
    FilterClause, FilterField, FilterOperator, FilterValue, GroupBy, Scalar, SortDir, SortField,
};
use tickboard_core::view::ViewState;
use tickboard_core::Ticket;

use crate::input::{load_tickets, read_source, reference_time};
use crate::output::{OutputMode, render_mode, section};

/// Arguments for `tb query` (also embedded in `tb select`).
#[derive(Args, Debug, Clone, Default)]
pub struct QueryArgs {
    /// Ticket snapshot: a JSON array of tickets, or `-` for stdin.
    pub tickets: String,

    /// Filter clause `field:operator:value`; repeat to AND clauses.
    ///
    /// List operators take comma-separated values (`status:any_of:open,closed`),
    /// `between` takes `from..to`.
    #[arg(short = 'f', long = "filter", value_name = "CLAUSE")]
    pub filters: Vec<String>,

    /// Saved view JSON; other flags are applied on top of it.
    #[arg(long, value_name = "FILE")]
    pub view: Option<PathBuf>,

    /// Case-insensitive substring of title or id.
    #[arg(short, long)]
    pub search: Option<String>,

    /// Sort field: id, title, status, type, priority, assignee, created, modified.
    #[arg(long)]
    pub sort: Option<SortField>,

    /// Sort direction: asc or desc.
    #[arg(long)]
    pub dir: Option<SortDir>,

    /// Grouping: none, status, type, epic.
    #[arg(short, long)]
    pub group: Option<GroupBy>,

    /// Group key to collapse; repeatable.
    #[arg(long, value_name = "KEY")]
    pub collapse: Vec<String>,

    /// Reference time for relative date filters (ISO-8601); defaults to now.
    #[arg(long)]
    pub now: Option<String>,
}

impl QueryArgs {
    /// The configured default view, replaced by `--view` when given, with
    /// the remaining flags applied on top.
    pub fn resolve_view(&self, config: &BoardConfig) -> Result<ViewState> {
        let mut view = match &self.view {
            Some(path) => {
                let raw = read_source(&path.to_string_lossy())?;
                ViewState::from_json(&raw)
                    .with_context(|| format!("failed to load view {}", path.display()))?
            }
            None => config.default_view(),
        };

        let mut ids = MonotonicIds::new();
        for spec in &self.filters {
            view.filters.push(parse_filter(spec, &mut ids)?);
        }
        if let Some(search) = &self.search {
            view.search = Some(search.clone());
        }
        if let Some(sort) = self.sort {
            view.sort_field = sort;
        }
        if let Some(dir) = self.dir {
            view.sort_dir = dir;
        }
        if let Some(group) = self.group {
            view.group_by = group;
        }
        view.collapsed.extend(self.collapse.iter().cloned());
        Ok(view)
    }
}

/// Parse `field:operator:value`. The value may itself contain `:`.
pub fn parse_filter(spec: &str, ids: &mut impl IdSource) -> Result<FilterClause> {
    let mut parts = spec.splitn(3, ':');
    let (Some(field), Some(operator), Some(raw)) = (parts.next(), parts.next(), parts.next()) else {
        bail!("filter '{spec}' must look like field:operator:value");
    };
    let field: FilterField = field
        .parse()
        .map_err(tickboard_core::Error::from)
        .with_context(|| format!("in filter '{spec}'"))?;
    let operator: FilterOperator = operator
        .parse()
        .map_err(tickboard_core::Error::from)
        .with_context(|| format!("in filter '{spec}'"))?;
    Ok(FilterClause::new(ids, field, operator, parse_value(operator, raw)))
}

fn parse_value(operator: FilterOperator, raw: &str) -> FilterValue {
    match operator {
        FilterOperator::AnyOf | FilterOperator::NoneOf => FilterValue::List(
            raw.split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(|s| Scalar::Text(s.to_string()))
                .collect(),
        ),
        FilterOperator::Between => match raw.split_once("..") {
            Some((from, to)) => FilterValue::range(from.trim(), to.trim()),
            None => FilterValue::text(raw),
        },
        FilterOperator::LastNDays | FilterOperator::NewerThan | FilterOperator::OlderThan => raw
            .trim()
            .parse::<f64>()
            .map_or_else(|_| FilterValue::text(raw), FilterValue::Number),
        _ => FilterValue::text(raw),
    }
}

/// Flattened rows for a grouped view; `None` when the view is ungrouped.
pub fn board_rows<'a>(
    tickets: &'a [Ticket],
    visible: &[&'a Ticket],
    view: &ViewState,
) -> Option<Vec<FlatRow<'a>>> {
    if view.group_by == GroupBy::None {
        return None;
    }
    let groups = group_tickets_within(visible, tickets, view.group_by);
    Some(flatten_groups(&groups, &view.collapsed_set()))
}

#[derive(Debug, Serialize)]
struct QueryReport<'a> {
    count: usize,
    group_by: GroupBy,
    #[serde(skip_serializing_if = "Option::is_none")]
    tickets: Option<Vec<&'a Ticket>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    rows: Option<Vec<FlatRow<'a>>>,
}

pub fn run_query(args: &QueryArgs, config: &BoardConfig, output: OutputMode) -> Result<()> {
    let tickets = load_tickets(&args.tickets)?;
    let view = args.resolve_view(config)?;
    let now = reference_time(args.now.as_deref())?;

    let visible = view.query().run_at(&tickets, now);
    let rows = board_rows(&tickets, &visible, &view);
    let report = QueryReport {
        count: visible.len(),
        group_by: view.group_by,
        tickets: if rows.is_none() { Some(visible) } else { None },
        rows,
    };
    render_mode(output, &report, write_text, write_pretty)
}

fn ticket_line(ticket: &Ticket) -> String {
    format!(
        "{}\t{}\tP{}\t{}\t{}",
        ticket.id, ticket.status, ticket.priority, ticket.ticket_type, ticket.title
    )
}

fn write_text(report: &QueryReport<'_>, w: &mut dyn Write) -> io::Result<()> {
    if let Some(tickets) = &report.tickets {
        for ticket in tickets {
            writeln!(w, "{}", ticket_line(ticket))?;
        }
    }
    for row in report.rows.iter().flatten() {
        match row {
            FlatRow::Header {
                label,
                count,
                collapsed,
                ..
            } => {
                let marker = if *collapsed { " [collapsed]" } else { "" };
                writeln!(w, "# {label} ({count}){marker}")?;
            }
            FlatRow::Ticket { ticket, .. } => writeln!(w, "{}", ticket_line(ticket))?,
        }
    }
    Ok(())
}

fn pretty_ticket(w: &mut dyn Write, ticket: &Ticket) -> io::Result<()> {
    writeln!(
        w,
        "  {:<14} {:<12} P{}  {:<8} {}",
        ticket.id,
        ticket.status.label(),
        ticket.priority,
        ticket.ticket_type,
        ticket.title
    )
}

fn write_pretty(report: &QueryReport<'_>, w: &mut dyn Write) -> io::Result<()> {
    section(w, &format!("Tickets ({})", report.count))?;
    if let Some(tickets) = &report.tickets {
        for ticket in tickets {
            pretty_ticket(w, ticket)?;
        }
    }
    for row in report.rows.iter().flatten() {
        match row {
            FlatRow::Header {
                label,
                count,
                collapsed,
                ..
            } => {
                let marker = if *collapsed { "[+]" } else { "[-]" };
                writeln!(w, "{marker} {label} ({count})")?;
            }
            FlatRow::Ticket { ticket, .. } => pretty_ticket(w, ticket)?,
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frozen() -> u64 {
        1_700_000_000_000
    }

    #[test]
    fn list_filter_splits_on_commas() {
        let mut ids = MonotonicIds::with_clock(frozen);
        let clause = parse_filter("status:any_of:open, in_progress", &mut ids).unwrap();
        assert_eq!(clause.field, FilterField::Status);
        assert_eq!(clause.operator, FilterOperator::AnyOf);
        assert_eq!(clause.value, FilterValue::list(&["open", "in_progress"]));
        assert!(clause.id.starts_with("f-"));
    }

    #[test]
    fn date_values_keep_their_colons() {
        let mut ids = MonotonicIds::with_clock(frozen);
        let clause = parse_filter("created:before:2024-05-01T10:30:00Z", &mut ids).unwrap();
        assert_eq!(clause.value, FilterValue::text("2024-05-01T10:30:00Z"));

        let clause = parse_filter("modified:between:2024-01-01..2024-02-01", &mut ids).unwrap();
        assert_eq!(clause.value, FilterValue::range("2024-01-01", "2024-02-01"));

        let clause = parse_filter("created:last_n_days:7", &mut ids).unwrap();
        assert_eq!(clause.value, FilterValue::Number(7.0));
    }

    #[test]
    fn malformed_specs_are_rejected() {
        let mut ids = MonotonicIds::with_clock(frozen);
        assert!(parse_filter("status", &mut ids).is_err());
        let err = parse_filter("colour:is:red", &mut ids).unwrap_err();
        assert!(format!("{err:#}").contains("colour"));
    }

    #[test]
    fn flags_override_configured_view() {
        let mut config = BoardConfig::default();
        config.group.group_by = GroupBy::Status;
        let args = QueryArgs {
            tickets: "-".to_string(),
            sort: Some(SortField::Title),
            collapse: vec!["closed".to_string()],
            ..QueryArgs::default()
        };
        let view = args.resolve_view(&config).unwrap();
        assert_eq!(view.group_by, GroupBy::Status);
        assert_eq!(view.sort_field, SortField::Title);
        assert_eq!(view.collapsed, vec!["closed"]);
    }

    #[test]
    fn ungrouped_view_has_no_rows() {
        let tickets = vec![Ticket::new("a")];
        let visible: Vec<&Ticket> = tickets.iter().collect();
        assert!(board_rows(&tickets, &visible, &ViewState::default()).is_none());

        let grouped = ViewState {
            group_by: GroupBy::Type,
            ..ViewState::default()
        };
        let rows = board_rows(&tickets, &visible, &grouped).unwrap();
        assert_eq!(rows.len(), 2);
    }
}
