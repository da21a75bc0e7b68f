//! CLI argument definitions and subcommand routing.

pub mod config;
pub mod replay;
pub mod subscribe;

use std::fmt::Display;
use std::io::{self, Write};
use std::path::PathBuf;

use axmdb::{ConsolidatedTrack, MessageType, SceneDescription};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;

/// Axis Message Broker client.
#[derive(Parser)]
#[command(name = "axmdb", version, about)]
pub struct Cli {
    /// Config file (defaults to `<config_dir>/axmdb/axmdb.toml`).
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Log filter when `RUST_LOG` is unset (e.g. `info`, `axmdb=debug`).
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

/// What to do.
#[derive(Subcommand)]
pub enum Command {
    /// List supported message kinds and their topics.
    Topics,
    /// Feed recorded payloads (one JSON document per line) through a provider.
    Replay(ReplayArgs),
    /// Subscribe to the device broker and print messages as they arrive.
    Subscribe(SubscribeArgs),
}

/// Message kind selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Kind {
    /// Analytics scene descriptions.
    Scene,
    /// Consolidated tracks.
    Track,
}

/// Arguments for `replay`.
#[derive(clap::Args)]
pub struct ReplayArgs {
    /// JSON-lines file with one payload per line.
    pub file: PathBuf,

    /// Message kind stored in the file.
    #[arg(short, long, value_enum)]
    pub kind: Kind,

    /// Source the payloads are published on.
    #[arg(short, long)]
    pub source: Option<String>,

    /// Print decoded messages as JSON instead of a summary line.
    #[arg(long)]
    pub json: bool,
}

/// Arguments for `subscribe`.
#[derive(clap::Args)]
pub struct SubscribeArgs {
    /// Message kind to subscribe to.
    #[arg(short, long, value_enum)]
    pub kind: Kind,

    /// Source (video channel) to subscribe to.
    #[arg(short, long)]
    pub source: Option<String>,

    /// Exit after this many messages.
    #[arg(short = 'n', long)]
    pub count: Option<usize>,

    /// Print decoded messages as JSON instead of a summary line.
    #[arg(long)]
    pub json: bool,
}

/// Errors surfaced by CLI commands.
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Reading a file failed.
    #[error("{}: {source}", path.display())]
    Io {
        /// Offending file.
        path: PathBuf,
        /// Cause.
        source: io::Error,
    },

    /// The config file is malformed.
    #[error("{}: {message}", path.display())]
    Config {
        /// Offending file.
        path: PathBuf,
        /// Parser message.
        message: String,
    },

    /// Provider setup failed.
    #[error(transparent)]
    Provider(#[from] axmdb::ProviderError),

    /// Writing output failed.
    #[error("output: {0}")]
    Output(#[from] io::Error),

    /// The command cannot run in this build or situation.
    #[error("{0}")]
    Unsupported(String),
}

/// Print every supported kind with its topic.
pub fn topics(out: &mut impl Write) -> Result<(), CliError> {
    for (name, topic) in axmdb::topics() {
        writeln!(out, "{name:<8}{topic}")?;
    }
    Ok(())
}

/// Write one decoded message, as JSON or via `Display`.
pub fn print_message<T: Display + Serialize>(
    out: &mut impl Write,
    message: &T,
    json: bool,
) -> Result<(), CliError> {
    if json {
        let text = serde_json::to_string(message)
            .map_err(|e| CliError::Output(io::Error::other(e)))?;
        writeln!(out, "{text}")?;
    } else {
        writeln!(out, "{message}")?;
    }
    Ok(())
}

/// Message types the CLI can print.
pub trait Printable: MessageType + Display + Serialize {}

impl Printable for SceneDescription {}
impl Printable for ConsolidatedTrack {}
