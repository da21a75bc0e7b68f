//! axmdb — command-line client for the Axis Message Broker.
//!
//! `topics` lists the supported message kinds, `replay` decodes recorded
//! payloads offline, and `subscribe` prints live analytics from the device.

#![allow(
    missing_docs,
    missing_debug_implementations,
    clippy::print_stderr,
    clippy::print_stdout
)]

mod cmd;

use std::io;
use std::process;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::cmd::config::CliConfig;
use crate::cmd::{Cli, CliError, Command};

/// Filter used when neither `RUST_LOG`, `--log-level` nor the config sets one.
const DEFAULT_LOG_LEVEL: &str = "warn";

fn main() {
    if let Err(e) = run(Cli::parse()) {
        eprintln!("fatal: {e}");
        process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), CliError> {
    let cfg = CliConfig::load(cli.config.as_deref())?;
    init_logging(cli.log_level.as_deref().or(cfg.log_level.as_deref()));

    let stdout = io::stdout();
    let mut out = stdout.lock();
    match cli.command {
        Command::Topics => cmd::topics(&mut out),
        Command::Replay(args) => cmd::replay::run(&args, &cfg, &mut out),
        Command::Subscribe(args) => cmd::subscribe::run(&args, &cfg, &mut out),
    }
}

/// Install a stderr `tracing` subscriber. `RUST_LOG` wins over `level`.
fn init_logging(level: Option<&str>) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.unwrap_or(DEFAULT_LOG_LEVEL)));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}
