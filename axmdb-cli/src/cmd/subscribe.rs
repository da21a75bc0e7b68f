//! `subscribe`: live messages from the device broker.

use std::io::Write;

use super::config::CliConfig;
use super::{CliError, SubscribeArgs};

/// Run the `subscribe` subcommand.
#[cfg(feature = "native")]
pub fn run(args: &SubscribeArgs, cfg: &CliConfig, out: &mut impl Write) -> Result<(), CliError> {
    use axmdb::{ConsolidatedTrack, NativeBroker, SceneDescription};

    use super::Kind;

    let source = cfg.source_or(args.source.as_deref());
    match args.kind {
        Kind::Scene => live::stream::<SceneDescription>(NativeBroker::new(), &source, args, cfg, out),
        Kind::Track => {
            live::stream::<ConsolidatedTrack>(NativeBroker::new(), &source, args, cfg, out)
        }
    }
}

/// Run the `subscribe` subcommand.
#[cfg(not(feature = "native"))]
pub fn run(args: &SubscribeArgs, cfg: &CliConfig, out: &mut impl Write) -> Result<(), CliError> {
    let _ = (args, cfg, out);
    Err(CliError::Unsupported(
        "live subscriptions need libmdb; rebuild with `--features native`".into(),
    ))
}

#[cfg(feature = "native")]
mod live {
    use std::io::Write;
    use std::sync::Arc;
    use std::time::Duration;

    use axmdb::{Broker, Provider};
    use tracing::{info, warn};

    use super::super::{CliError, Printable, SubscribeArgs, print_message};
    use super::CliConfig;

    const POLL: Duration = Duration::from_millis(200);

    /// Print messages until `--count` is reached or the provider closes.
    pub fn stream<T: Printable>(
        broker: impl Broker + 'static,
        source: &str,
        args: &SubscribeArgs,
        cfg: &CliConfig,
        out: &mut impl Write,
    ) -> Result<(), CliError> {
        let provider = Provider::<T>::with_config(Arc::new(broker), source, cfg.provider);
        provider.connect()?;
        info!(topic = T::TOPIC, source, "subscribed");

        let mut received = 0usize;
        loop {
            while let Some(err) = provider.try_recv_error() {
                warn!(error = %err, "provider error");
                writeln!(out, "error: {err}")?;
            }
            if let Some(message) = provider.recv_timeout(POLL) {
                print_message(out, &message, args.json)?;
                out.flush()?;
                received += 1;
                if args.count.is_some_and(|n| received >= n) {
                    break;
                }
            } else if !provider.is_connected() {
                break;
            }
        }
        provider.disconnect();
        Ok(())
    }
}
