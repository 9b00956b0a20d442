//! `tb refs`: find ticket-id references in free text.

use std::io::{self, Write};

use anyhow::Result;
use clap::Args;
use serde::Serialize;
use tickboard_core::config::BoardConfig;
use tickboard_core::refs::RefSpan;

use crate::input::{load_tickets, read_source};
use crate::output::{OutputMode, field, render_mode, section};

/// Arguments for `tb refs`.
#[derive(Args, Debug)]
pub struct RefsArgs {
    /// File to scan, or `-` for stdin.
    pub source: String,

    /// Only report ids present in this ticket snapshot.
    #[arg(long, value_name = "FILE")]
    pub tickets: Option<String>,

    /// Override the configured reference pattern.
    #[arg(long)]
    pub pattern: Option<String>,
}

#[derive(Debug, Serialize)]
struct RefsReport {
    pattern: String,
    refs: Vec<RefSpan>,
}

pub fn run_refs(args: &RefsArgs, config: &BoardConfig, output: OutputMode) -> Result<()> {
    let matcher = match &args.pattern {
        Some(pattern) => tickboard_core::refs::RefMatcher::new(pattern)?,
        None => config.ref_matcher()?,
    };
    let text = read_source(&args.source)?;
    let refs = match &args.tickets {
        Some(source) => matcher.find_known(&text, &load_tickets(source)?),
        None => matcher.find_spans(&text),
    };
    let report = RefsReport {
        pattern: matcher.as_str().to_string(),
        refs,
    };
    render_mode(output, &report, write_text, write_pretty)
}

fn write_text(report: &RefsReport, w: &mut dyn Write) -> io::Result<()> {
    for span in &report.refs {
        writeln!(w, "{}\t{}\t{}", span.id, span.start, span.end)?;
    }
    Ok(())
}

fn write_pretty(report: &RefsReport, w: &mut dyn Write) -> io::Result<()> {
    section(w, &format!("References ({})", report.refs.len()))?;
    field(w, "Pattern", &report.pattern)?;
    for span in &report.refs {
        writeln!(w, "  {:<14} bytes {}..{}", span.id, span.start, span.end)?;
    }
    Ok(())
}
