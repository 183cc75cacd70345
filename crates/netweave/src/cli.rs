//! Clap derive structures for the `netweave` CLI.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// netweave -- network configuration reconciliation for embedded gateways
#[derive(Debug, Parser)]
#[command(
    name = "netweave",
    version,
    about = "Check, diff and dry-run gateway network configurations",
    long_about = "Interprets the flat property namespace that describes a gateway's\n\
        interfaces, firewall rules and modems, and drives the reconciliation\n\
        loops against a simulated host.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Daemon config file (defaults to the platform config directory)
    #[arg(long, env = "NETWEAVE_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(long, short = 'o', default_value = "table", global = true)]
    pub output: OutputFormat,

    /// When to use color output
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorMode,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// Plain text, one value per line (scripting)
    Plain,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum Family {
    Ipv4,
    Ipv6,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Interpret a property file and report every interface
    Check(CheckArgs),

    /// List interfaces that must be reconfigured between two property files
    Diff(DiffArgs),

    /// Decode the firewall rule lists of a property file
    #[command(alias = "fw")]
    Firewall(FirewallArgs),

    /// Run the reconciliation loops against a simulated host
    Run(RunArgs),
}

#[derive(Debug, Args)]
pub struct CheckArgs {
    /// Property file (defaults to `properties` from the daemon config)
    pub properties: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct DiffArgs {
    /// Currently applied property file
    pub old: PathBuf,

    /// Proposed property file
    pub new: PathBuf,
}

#[derive(Debug, Args)]
pub struct FirewallArgs {
    /// Property file (defaults to `properties` from the daemon config)
    pub properties: Option<PathBuf>,

    /// Only show one address family
    #[arg(long, short = 'f')]
    pub family: Option<Family>,
}

#[derive(Debug, Args)]
pub struct RunArgs {
    /// Property file (defaults to `properties` from the daemon config)
    pub properties: Option<PathBuf>,

    /// Stop after this many seconds instead of waiting for Ctrl-C
    #[arg(long, short = 'd')]
    pub duration: Option<u64>,
}
