//! `tb graph`: dependency/link graph layout for a ticket snapshot.
//!
//! # Edge Direction
//!
//! A `dep` edge points from the blocker to the ticket that lists it in
//! `deps`. `link` edges are undirected and emitted once per pair.

use std::io::{self, Write};

use anyhow::Result;
use clap::Args;
use serde::Serialize;
use tickboard_core::layout::{
    GraphLayout, LayeredLayout, LayoutInput, LayoutOutput, build_layout_input, default_node_size,
};
use tickboard_core::Ticket;

use crate::input::load_tickets;
use crate::output::{OutputMode, field, render_mode, section};

/// Arguments for `tb graph`.
#[derive(Args, Debug)]
pub struct GraphArgs {
    /// Ticket snapshot: a JSON array of tickets, or `-` for stdin.
    pub tickets: String,

    /// Horizontal gap between nodes in a layer.
    #[arg(long, default_value_t = 40.0)]
    pub node_gap: f64,

    /// Vertical gap between layers.
    #[arg(long, default_value_t = 80.0)]
    pub layer_gap: f64,
}

#[derive(Debug, Serialize)]
struct GraphReport {
    input: LayoutInput,
    layout: LayoutOutput,
}

pub fn layout_tickets(
    tickets: &[Ticket],
    engine: &impl GraphLayout,
) -> (LayoutInput, LayoutOutput) {
    let input = build_layout_input(tickets, default_node_size);
    let layout = engine.layout(&input);
    (input, layout)
}

pub fn run_graph(args: &GraphArgs, output: OutputMode) -> Result<()> {
    let tickets = load_tickets(&args.tickets)?;
    let engine = LayeredLayout {
        node_gap: args.node_gap,
        layer_gap: args.layer_gap,
    };
    let (input, layout) = layout_tickets(&tickets, &engine);
    let report = GraphReport { input, layout };
    render_mode(output, &report, write_text, write_pretty)
}

fn write_text(report: &GraphReport, w: &mut dyn Write) -> io::Result<()> {
    for node in &report.layout.nodes {
        writeln!(w, "node\t{}\t{}\t{}", node.id, node.position.x, node.position.y)?;
    }
    for edge in &report.input.edges {
        let kind = match edge.kind {
            tickboard_core::layout::EdgeKind::Dep => "dep",
            tickboard_core::layout::EdgeKind::Link => "link",
        };
        writeln!(w, "edge\t{}\t{}\t{kind}", edge.from, edge.to)?;
    }
    Ok(())
}

fn write_pretty(report: &GraphReport, w: &mut dyn Write) -> io::Result<()> {
    section(w, "Dependency graph")?;
    field(w, "Nodes", report.input.nodes.len())?;
    field(w, "Edges", report.input.edges.len())?;
    writeln!(w)?;
    for node in &report.layout.nodes {
        writeln!(
            w,
            "  {:<14} ({:>7.1}, {:>7.1})",
            node.id, node.position.x, node.position.y
        )?;
    }
    if !report.input.edges.is_empty() {
        writeln!(w)?;
        for edge in &report.input.edges {
            let arrow = match edge.kind {
                tickboard_core::layout::EdgeKind::Dep => "->",
                tickboard_core::layout::EdgeKind::Link => "--",
            };
            writeln!(w, "  {} {arrow} {}", edge.from, edge.to)?;
        }
    }
    Ok(())
}
