//! Command handlers and shared helpers.

pub mod check;
pub mod diff;
pub mod firewall;
pub mod run;

use std::path::{Path, PathBuf};

use netweave_config::DaemonConfig;
use netweave_core::Properties;
use netweave_core::interpret::network::{self, ParsedNetwork};

use crate::cli::{Command, GlobalOpts, OutputFormat};
use crate::error::CliError;
use crate::output;

/// Global flags resolved once per invocation.
pub struct Context {
    pub output: OutputFormat,
    pub color: bool,
    pub quiet: bool,
    pub daemon: DaemonConfig,
}

impl Context {
    pub fn new(global: &GlobalOpts, daemon: DaemonConfig) -> Self {
        Self {
            output: global.output,
            color: output::should_color(global.color),
            quiet: global.quiet,
            daemon,
        }
    }

    /// The explicit path, else the one from the daemon config.
    pub fn properties_path(&self, arg: Option<PathBuf>) -> PathBuf {
        arg.unwrap_or_else(|| self.daemon.properties.clone())
    }
}

pub async fn dispatch(cmd: Command, ctx: &Context) -> Result<(), CliError> {
    match cmd {
        Command::Check(args) => check::handle(args, ctx),
        Command::Diff(args) => diff::handle(&args, ctx),
        Command::Firewall(args) => firewall::handle(args, ctx),
        Command::Run(args) => run::handle(args, ctx).await,
    }
}

// ── Property files ───────────────────────────────────────────────────

pub fn load_properties(path: &Path) -> Result<Properties, CliError> {
    let text = std::fs::read_to_string(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => CliError::PropertiesNotFound {
            path: path.display().to_string(),
        },
        _ => CliError::Io(e),
    })?;
    toml::from_str(&text).map_err(|source| CliError::PropertiesSyntax {
        path: path.display().to_string(),
        source,
    })
}

/// Interpret a property file, logging every interface that was rejected.
pub fn interpret(path: &Path) -> Result<ParsedNetwork, CliError> {
    let props = load_properties(path)?;
    let parsed = network::parse(&props);
    for rejected in &parsed.rejected {
        tracing::warn!(interface = %rejected.name, error = %rejected.error, "interface rejected");
    }
    tracing::debug!(
        path = %path.display(),
        interfaces = parsed.configuration.len(),
        "property file interpreted"
    );
    Ok(parsed)
}

/// Fail with the names of interfaces that could not be interpreted.
pub fn ensure_none_rejected(parsed: &ParsedNetwork) -> Result<(), CliError> {
    if parsed.rejected.is_empty() {
        return Ok(());
    }
    Err(CliError::RejectedInterfaces {
        count: parsed.rejected.len(),
        names: parsed
            .rejected
            .iter()
            .map(|r| format!("{} ({})", r.name, r.error))
            .collect::<Vec<_>>()
            .join(", "),
    })
}
