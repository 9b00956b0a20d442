#![forbid(unsafe_code)]

mod cmd;
mod input;
mod output;

use std::env;
use std::path::PathBuf;

use anyhow::Context;
use clap::{CommandFactory, Parser, Subcommand};
use output::{CliError, OutputMode, render_error, resolve_output_mode};
use tracing::debug;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "tb: query, group, and select tickets from a board snapshot",
    long_about = None
)]
struct Cli {
    /// Output format: pretty, text, or json.
    #[arg(long, global = true, value_enum)]
    format: Option<OutputMode>,

    /// Shorthand for `--format json`.
    #[arg(long, global = true, hide = true)]
    json: bool,

    /// Project root holding `.tickboard/config.toml`; defaults to the
    /// current directory.
    #[arg(long, global = true, value_name = "DIR")]
    root: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

impl Cli {
    fn output_mode(&self) -> OutputMode {
        resolve_output_mode(self.format, self.json)
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(
        next_help_heading = "Read",
        about = "Filter, search, sort, and group tickets",
        long_about = "Apply filter clauses, search, and sort to a ticket snapshot, then optionally group and flatten it into board rows.",
        after_help = "EXAMPLES:\n    # Open bugs, highest priority first\n    tb query tickets.json -f status:any_of:open -f type:any_of:bug --sort priority\n\n    # Group by epic, collapsing one\n    tb query tickets.json --group epic --collapse e-1\n\n    # Apply a saved view\n    tb query tickets.json --view view.json --json"
    )]
    Query(cmd::query::QueryArgs),

    #[command(
        next_help_heading = "Interaction",
        about = "Replay selection events against a board",
        long_about = "Build the visible row order from a query, then replay recorded pointer and keyboard events through the selection state machine.",
        after_help = "EXAMPLES:\n    # Replay events over status groups\n    tb select tickets.json --group status --events events.json\n\n    # Emit machine-readable output\n    tb select tickets.json --events events.json --json"
    )]
    Select(cmd::select::SelectArgs),

    #[command(
        next_help_heading = "Read",
        about = "Lay out the dependency graph",
        long_about = "Build dependency and link edges from a ticket snapshot and compute layered node positions.",
        after_help = "EXAMPLES:\n    # Print node positions and edges\n    tb graph tickets.json --format text"
    )]
    Graph(cmd::graph::GraphArgs),

    #[command(
        next_help_heading = "Read",
        about = "Find ticket references in text",
        long_about = "Scan free text for ticket-id references using the configured pattern.",
        after_help = "EXAMPLES:\n    # References in a commit message\n    git log -1 --format=%B | tb refs -\n\n    # Only ids that exist on the board\n    tb refs notes.md --tickets tickets.json"
    )]
    Refs(cmd::refs::RefsArgs),

    #[command(
        next_help_heading = "Project Maintenance",
        about = "Generate shell completion scripts",
        long_about = "Generate shell completion scripts for supported shells.",
        after_help = "EXAMPLES:\n    # Generate bash completions\n    tb completions bash\n\n    # Generate zsh completions\n    tb completions zsh"
    )]
    Completions(cmd::completions::CompletionsArgs),
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("TICKBOARD_LOG").unwrap_or_else(|_| {
        EnvFilter::new(if env::var("DEBUG").is_ok() {
            "tickboard=debug,info"
        } else {
            "tickboard=info,warn"
        })
    });

    let format = env::var("TICKBOARD_LOG_FORMAT").unwrap_or_else(|_| "compact".to_string());

    let registry = tracing_subscriber::registry().with(filter);

    match format.as_str() {
        "json" => {
            registry
                .with(fmt::layer().json().with_ansi(false).with_writer(std::io::stderr))
                .init();
        }
        _ => {
            registry
                .with(fmt::layer().compact().with_writer(std::io::stderr))
                .init();
        }
    }
}

fn run(cli: Cli, output: OutputMode) -> anyhow::Result<()> {
    if let Commands::Completions(args) = &cli.command {
        let mut command = Cli::command();
        return cmd::completions::run_completions(args.shell, &mut command);
    }

    let project_root = match cli.root {
        Some(root) => root,
        None => env::current_dir().context("failed to resolve current directory")?,
    };
    let config = tickboard_core::config::load_effective_config(&project_root)
        .with_context(|| format!("failed to load config under {}", project_root.display()))?;
    debug!(root = %project_root.display(), ?output, "config loaded");

    match &cli.command {
        Commands::Query(args) => cmd::query::run_query(args, &config, output),
        Commands::Select(args) => cmd::select::run_select(args, &config, output),
        Commands::Graph(args) => cmd::graph::run_graph(args, output),
        Commands::Refs(args) => cmd::refs::run_refs(args, &config, output),
        Commands::Completions(_) => Ok(()),
    }
}

fn main() {
    init_tracing();

    let cli = Cli::parse();
    let output = cli.output_mode();

    if let Err(err) = run(cli, output) {
        let _ = render_error(output, &CliError::from(&err));
        std::process::exit(1);
    }
}
