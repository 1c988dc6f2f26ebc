//! Command-line interface definitions for uiwin.

use std::{path::PathBuf, time::Duration};

use clap::{Args, Parser, Subcommand};
use logging::LogArgs;

/// Command-line interface for the `uiwin` binary.
#[derive(Parser, Debug)]
#[command(
    name = "uiwin",
    about = "Drive the window lifecycle manager against a bundle directory",
    version
)]
pub struct Cli {
    /// Logging controls shared across uiwin binaries.
    #[command(flatten)]
    pub log: LogArgs,

    /// Path to a configuration file (RON). Defaults to `~/.uiwin/config.ron` when present.
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Directory the bundle paths are resolved against.
    #[arg(long, global = true, default_value = ".", value_name = "DIR")]
    pub root: PathBuf,

    /// What to do.
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run a sequence of lifecycle steps and print the events they produce.
    Run(RunArgs),
    /// Print the dependency manifest of a window.
    Manifest {
        /// Window (template) name.
        name: String,
    },
}

/// Arguments for the `run` subcommand.
#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    /// Steps, executed in order: `open:NAME[:JSON]`, `toggle:NAME[:JSON]`,
    /// `close:NAME`, `dynamic:TEMPLATE:INSTANCE[:JSON]`, `destroy:NAME`,
    /// `close-all`, `destroy-all`, `wait:DURATION`. JSON is an argument array.
    #[arg(value_name = "STEP", num_args = 1..)]
    pub steps: Vec<String>,

    /// How long to let loads progress after each step.
    #[arg(
        long,
        value_parser = humantime::parse_duration,
        default_value = "20ms",
        value_name = "DURATION"
    )]
    pub settle: Duration,

    /// How long to wait for outstanding loads before exiting.
    #[arg(
        long,
        value_parser = humantime::parse_duration,
        default_value = "5s",
        value_name = "DURATION"
    )]
    pub drain_timeout: Duration,
}
