//! Typed, channel-based message provider.
//!
//! A [`Provider<T>`] subscribes to the topic of `T`, decodes every payload
//! and hands the results out through two bounded channels: one for decoded
//! messages and one for [`ProviderError`]s. Broker callbacks never block: a
//! full channel drops the event and logs a warning.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, SyncSender, TrySendError};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::analytics::MessageType;
use crate::broker::Broker;
use crate::config::ProviderConfig;
use crate::error::{Error, ProviderError, ProviderErrorKind, Result};
use crate::message::Message;
use crate::observer::ConnectionObserver;
use crate::session::Session;

/// Subscribes to `T::TOPIC` and yields decoded `T` values.
///
/// ```no_run
/// use std::sync::Arc;
/// use axmdb::{LocalBroker, Provider, SceneDescription};
///
/// let broker = LocalBroker::new();
/// let provider = Provider::<SceneDescription>::new(Arc::new(broker), "1");
/// provider.connect()?;
/// for scene in provider.messages() {
///     println!("{scene}");
/// }
/// # Ok::<(), axmdb::ProviderError>(())
/// ```
pub struct Provider<T: MessageType> {
    broker: Arc<dyn Broker>,
    source: String,
    config: ProviderConfig,
    sink: Arc<Sink<T>>,
    messages: Receiver<T>,
    errors: Receiver<ProviderError>,
    state: Mutex<State>,
}

enum State {
    Idle,
    Connected(Session),
    Closed,
}

impl<T: MessageType> Provider<T> {
    /// Create a provider for messages from `source` with default channel sizes.
    #[must_use]
    pub fn new(broker: Arc<dyn Broker>, source: impl Into<String>) -> Self {
        Self::with_config(broker, source, ProviderConfig::default())
    }

    /// Create a provider with explicit channel sizes. Zero capacities are
    /// raised to one.
    #[must_use]
    pub fn with_config(
        broker: Arc<dyn Broker>,
        source: impl Into<String>,
        config: ProviderConfig,
    ) -> Self {
        let (msg_tx, messages) = mpsc::sync_channel(config.message_capacity.max(1));
        let (err_tx, errors) = mpsc::sync_channel(config.error_capacity.max(1));
        Self {
            broker,
            source: source.into(),
            config,
            sink: Arc::new(Sink {
                messages: Mutex::new(Some(msg_tx)),
                errors: Mutex::new(Some(err_tx)),
                subscribed: AtomicBool::new(false),
            }),
            messages,
            errors,
            state: Mutex::new(State::Idle),
        }
    }

    /// Topic this provider subscribes to.
    #[must_use]
    pub const fn topic(&self) -> &'static str {
        T::TOPIC
    }

    /// Source this provider subscribes to.
    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Channel sizes in use.
    #[must_use]
    pub const fn config(&self) -> &ProviderConfig {
        &self.config
    }

    /// Open the connection and request the subscriber.
    ///
    /// Setup failures are returned and leave the provider closed, with both
    /// channels ended. Failures after setup (connection errors, a failed
    /// subscriber creation, undecodable payloads) arrive on the error channel.
    ///
    /// # Errors
    ///
    /// Returns the failing setup step, or [`Error::AlreadyConnected`] /
    /// [`Error::Closed`] (kind [`ProviderErrorKind::Connection`]) when the
    /// provider is not idle.
    pub fn connect(&self) -> std::result::Result<(), ProviderError> {
        let mut state = self.state.lock();
        match *state {
            State::Idle => {}
            State::Connected(_) => {
                return Err(ProviderError::new(
                    ProviderErrorKind::Connection,
                    Error::AlreadyConnected,
                ));
            }
            State::Closed => {
                return Err(ProviderError::new(ProviderErrorKind::Connection, Error::Closed));
            }
        }

        let sink: Arc<Sink<T>> = Arc::clone(&self.sink);
        let observer: Arc<dyn ConnectionObserver> = sink;
        match Session::open(self.broker.as_ref(), T::TOPIC, &self.source, observer) {
            Ok(session) => {
                debug!(topic = T::TOPIC, source = %self.source, "provider connected");
                *state = State::Connected(session);
                Ok(())
            }
            Err(e) => {
                warn!(topic = T::TOPIC, source = %self.source, error = %e, "provider setup failed");
                *state = State::Closed;
                drop(state);
                self.sink.close();
                Err(e)
            }
        }
    }

    /// Release subscriber and connection and end both channels. Buffered
    /// events stay readable. Safe to call more than once.
    pub fn disconnect(&self) {
        let previous = std::mem::replace(&mut *self.state.lock(), State::Closed);
        if let State::Connected(session) = previous {
            session.close();
            debug!(topic = T::TOPIC, source = %self.source, "provider disconnected");
        }
        self.sink.close();
    }

    /// Whether a session is open.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        matches!(*self.state.lock(), State::Connected(_))
    }

    /// Whether the broker confirmed the subscriber.
    #[must_use]
    pub fn is_subscribed(&self) -> bool {
        self.sink.subscribed.load(Ordering::Acquire)
    }

    /// Block until the next message, or `None` once disconnected and drained.
    #[must_use]
    pub fn recv(&self) -> Option<T> {
        self.messages.recv().ok()
    }

    /// Next message if one is ready.
    #[must_use]
    pub fn try_recv(&self) -> Option<T> {
        self.messages.try_recv().ok()
    }

    /// Wait up to `timeout` for the next message.
    #[must_use]
    pub fn recv_timeout(&self, timeout: Duration) -> Option<T> {
        self.messages.recv_timeout(timeout).ok()
    }

    /// Block until the next error, or `None` once disconnected and drained.
    #[must_use]
    pub fn recv_error(&self) -> Option<ProviderError> {
        self.errors.recv().ok()
    }

    /// Next error if one is ready.
    #[must_use]
    pub fn try_recv_error(&self) -> Option<ProviderError> {
        self.errors.try_recv().ok()
    }

    /// Wait up to `timeout` for the next error.
    #[must_use]
    pub fn recv_error_timeout(&self, timeout: Duration) -> Option<ProviderError> {
        self.errors.recv_timeout(timeout).ok()
    }

    /// Blocking iterator over messages; ends after [`disconnect`](Self::disconnect).
    pub fn messages(&self) -> impl Iterator<Item = T> + '_ {
        self.messages.iter()
    }
}

impl<T: MessageType> Drop for Provider<T> {
    fn drop(&mut self) {
        self.disconnect();
    }
}

impl<T: MessageType> fmt::Debug for Provider<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Provider")
            .field("topic", &T::TOPIC)
            .field("source", &self.source)
            .field("connected", &self.is_connected())
            .field("subscribed", &self.is_subscribed())
            .finish()
    }
}

/// Observer side of a provider: decodes and forwards into the channels.
struct Sink<T> {
    messages: Mutex<Option<SyncSender<T>>>,
    errors: Mutex<Option<SyncSender<ProviderError>>>,
    subscribed: AtomicBool,
}

impl<T: MessageType> Sink<T> {
    fn close(&self) {
        self.messages.lock().take();
        self.errors.lock().take();
        self.subscribed.store(false, Ordering::Release);
    }

    fn error(&self, kind: ProviderErrorKind, error: Error) {
        debug!(topic = T::TOPIC, %kind, %error, "provider error");
        push(&self.errors, ProviderError::new(kind, error), "error");
    }
}

fn push<V>(slot: &Mutex<Option<SyncSender<V>>>, value: V, channel: &str) {
    let guard = slot.lock();
    let Some(tx) = guard.as_ref() else {
        return;
    };
    match tx.try_send(value) {
        Ok(()) | Err(TrySendError::Disconnected(_)) => {}
        Err(TrySendError::Full(_)) => warn!(channel, "provider channel full; dropping event"),
    }
}

impl<T: MessageType> ConnectionObserver for Sink<T> {
    fn on_connection_error(&self, error: Error) {
        self.error(ProviderErrorKind::Connection, error);
    }

    fn on_message(&self, message: Message) {
        if message.is_empty() {
            self.error(ProviderErrorKind::EmptyPayload, Error::EmptyPayload);
            return;
        }
        let text = match message.payload_str() {
            Ok(text) => text,
            Err(e) => {
                self.error(ProviderErrorKind::ParseMessage, e);
                return;
            }
        };
        match T::transform(text) {
            Ok(decoded) => push(&self.messages, decoded, "message"),
            Err(e) => self.error(ProviderErrorKind::InvalidMessage, e),
        }
    }

    fn on_subscriber_ready(&self, result: Result<()>) {
        match result {
            Ok(()) => {
                self.subscribed.store(true, Ordering::Release);
                debug!(topic = T::TOPIC, "subscriber ready");
            }
            Err(e) => self.error(ProviderErrorKind::SubscribeDone, e),
        }
    }
}
