//! `replay`: push recorded payloads through a provider on an in-process broker.

use std::fs;
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use axmdb::{ConsolidatedTrack, LocalBroker, Provider, ProviderConfig, SceneDescription};
use tracing::info;

use super::config::CliConfig;
use super::{CliError, Kind, Printable, ReplayArgs, print_message};

/// How long to wait for the local subscriber to come up.
const READY_TIMEOUT: Duration = Duration::from_secs(5);

/// Counts reported after a replay.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Summary {
    /// Payload lines published.
    pub published: usize,
    /// Messages decoded.
    pub decoded: usize,
    /// Errors reported by the provider.
    pub errors: usize,
}

/// Run the `replay` subcommand.
pub fn run(args: &ReplayArgs, cfg: &CliConfig, out: &mut impl Write) -> Result<(), CliError> {
    let text = fs::read_to_string(&args.file).map_err(|source| CliError::Io {
        path: args.file.clone(),
        source,
    })?;
    let source = cfg.source_or(args.source.as_deref());
    let summary = match args.kind {
        Kind::Scene => {
            replay::<SceneDescription>(&text, &source, cfg.provider, args.json, out)?
        }
        Kind::Track => {
            replay::<ConsolidatedTrack>(&text, &source, cfg.provider, args.json, out)?
        }
    };
    writeln!(
        out,
        "replayed {} payloads: {} decoded, {} errors",
        summary.published, summary.decoded, summary.errors
    )?;
    Ok(())
}

/// Publish every non-blank line of `text` and print what the provider yields.
pub fn replay<T: Printable>(
    text: &str,
    source: &str,
    config: ProviderConfig,
    json: bool,
    out: &mut impl Write,
) -> Result<Summary, CliError> {
    let broker = LocalBroker::new();
    let provider = Provider::<T>::with_config(Arc::new(broker.clone()), source, config);
    provider.connect()?;
    if !broker.wait_for_subscribers(1, READY_TIMEOUT) {
        return Err(CliError::Unsupported(
            "local subscriber did not become ready".into(),
        ));
    }

    let mut summary = Summary::default();
    for line in text.lines().map(str::trim).filter(|l| !l.is_empty()) {
        broker.publish(T::TOPIC, source, line);
        summary.published += 1;

        // Delivery is synchronous, so the line's outcome is already queued.
        while let Some(message) = provider.try_recv() {
            print_message(out, &message, json)?;
            summary.decoded += 1;
        }
        while let Some(err) = provider.try_recv_error() {
            writeln!(out, "error: {err}")?;
            summary.errors += 1;
        }
    }
    provider.disconnect();
    info!(
        published = summary.published,
        decoded = summary.decoded,
        errors = summary.errors,
        "replay finished"
    );
    Ok(summary)
}
