//! Rendering shared by every `tb` command.
//!
//! A report is serialized as JSON, or handed to the command's own text or
//! pretty writer. The mode comes from `--format`, then `--json`, then the
//! `FORMAT` env var, and otherwise depends on whether stdout is a terminal
//! (pretty) or a pipe (text). Errors go to stderr in the same mode.

use clap::ValueEnum;
use serde::Serialize;
use std::fmt::Display;
use std::io::{self, IsTerminal, Write};

const RULE_WIDTH: usize = 72;
const KEY_WIDTH: usize = 12;

/// Heading line with a rule under it.
pub fn section(w: &mut dyn Write, heading: &str) -> io::Result<()> {
    writeln!(w, "{heading}\n{}", "-".repeat(RULE_WIDTH))
}

/// `key:` padded to a fixed column, then the value.
pub fn field(w: &mut dyn Write, key: &str, value: impl Display) -> io::Result<()> {
    writeln!(w, "{:<width$} {value}", format!("{key}:"), width = KEY_WIDTH)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputMode {
    /// Sections and aligned columns for a terminal.
    Pretty,
    /// Tab-separated rows for scripts and pipes.
    Text,
    /// Machine-readable JSON.
    Json,
}

/// Everything that can pick an output mode, highest precedence first.
#[derive(Debug, Clone, Copy)]
struct ModeInputs<'a> {
    format_flag: Option<OutputMode>,
    json_flag: bool,
    format_env: Option<&'a str>,
    stdout_is_tty: bool,
}

impl ModeInputs<'_> {
    fn resolve(self) -> OutputMode {
        // Unrecognised env values are ignored.
        let from_env = self
            .format_env
            .and_then(|value| <OutputMode as ValueEnum>::from_str(value.trim(), true).ok());
        let fallback = if self.stdout_is_tty {
            OutputMode::Pretty
        } else {
            OutputMode::Text
        };
        self.format_flag
            .or_else(|| self.json_flag.then_some(OutputMode::Json))
            .or(from_env)
            .unwrap_or(fallback)
    }
}

/// Pick the output mode from the CLI flags, `FORMAT`, and whether stdout is
/// a terminal.
pub fn resolve_output_mode(format_flag: Option<OutputMode>, json_flag: bool) -> OutputMode {
    let format_env = std::env::var("FORMAT").ok();
    ModeInputs {
        format_flag,
        json_flag,
        format_env: format_env.as_deref(),
        stdout_is_tty: io::stdout().is_terminal(),
    }
    .resolve()
}

/// Write `value` in the requested mode with explicit text/pretty renderers.
pub fn write_mode<T: Serialize>(
    out: &mut dyn Write,
    mode: OutputMode,
    value: &T,
    text_fn: impl FnOnce(&T, &mut dyn Write) -> io::Result<()>,
    pretty_fn: impl FnOnce(&T, &mut dyn Write) -> io::Result<()>,
) -> anyhow::Result<()> {
    match mode {
        OutputMode::Json => {
            serde_json::to_writer_pretty(&mut *out, value)?;
            writeln!(out)?;
        }
        OutputMode::Text => text_fn(value, out)?,
        OutputMode::Pretty => pretty_fn(value, out)?,
    }
    Ok(())
}

/// [`write_mode`] to stdout.
pub fn render_mode<T: Serialize>(
    mode: OutputMode,
    value: &T,
    text_fn: impl FnOnce(&T, &mut dyn Write) -> io::Result<()>,
    pretty_fn: impl FnOnce(&T, &mut dyn Write) -> io::Result<()>,
) -> anyhow::Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    write_mode(&mut out, mode, value, text_fn, pretty_fn)
}

/// A structured error with optional suggestion and error code.
#[derive(Debug, Serialize)]
pub struct CliError {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
    /// Machine-readable error code (`E####`) when the failure came from the
    /// engine library.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
}

impl CliError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            suggestion: None,
            error_code: None,
        }
    }
}

impl From<&tickboard_core::Error> for CliError {
    fn from(err: &tickboard_core::Error) -> Self {
        let code = err.code();
        Self {
            message: err.to_string(),
            suggestion: code.hint().map(str::to_string),
            error_code: Some(code.code().to_string()),
        }
    }
}

impl From<&anyhow::Error> for CliError {
    /// Full context chain as the message; engine errors anywhere in the
    /// chain contribute their code and hint.
    fn from(err: &anyhow::Error) -> Self {
        let message = format!("{err:#}");
        err.chain()
            .find_map(|cause| cause.downcast_ref::<tickboard_core::Error>())
            .map_or_else(
                || Self::new(message.clone()),
                |core| Self {
                    message: message.clone(),
                    ..Self::from(core)
                },
            )
    }
}

/// Write an error in the requested format.
pub fn write_error(out: &mut dyn Write, mode: OutputMode, error: &CliError) -> anyhow::Result<()> {
    match mode {
        OutputMode::Json => {
            let wrapper = serde_json::json!({
                "error": error,
            });
            serde_json::to_writer_pretty(&mut *out, &wrapper)?;
            writeln!(out)?;
        }
        OutputMode::Pretty | OutputMode::Text => {
            match &error.error_code {
                Some(code) => writeln!(out, "error[{code}]: {}", error.message)?,
                None => writeln!(out, "error: {}", error.message)?,
            }
            if let Some(ref suggestion) = error.suggestion {
                writeln!(out, "  suggestion: {suggestion}")?;
            }
        }
    }
    Ok(())
}

/// Render an error to stderr in the requested format.
pub fn render_error(mode: OutputMode, error: &CliError) -> anyhow::Result<()> {
    let stderr = io::stderr();
    let mut out = stderr.lock();
    write_error(&mut out, mode, error)
}
