//! One connection plus one subscriber, wired to a [`ConnectionObserver`].

use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::broker::{Broker, Connection, Subscriber, SubscriberConfig};
use crate::error::{ProviderError, ProviderErrorKind};
use crate::observer::{Callbacks, ConnectionObserver};

/// A live subscription. Dropping it releases the subscriber, then the
/// connection.
pub struct Session {
    subscriber: Option<Subscriber>,
    connection: Option<Box<dyn Connection>>,
}

impl Session {
    /// Connect, configure and request a subscriber for `topic` from `source`.
    ///
    /// Returns once the subscriber request is accepted; the observer learns
    /// the final outcome through
    /// [`on_subscriber_ready`](ConnectionObserver::on_subscriber_ready).
    /// On failure, everything created so far is released.
    ///
    /// # Errors
    ///
    /// The error kind names the failing step: [`ProviderErrorKind::Connection`],
    /// [`ProviderErrorKind::SubscriberConfigCreate`] for a configuration
    /// refused here or by the backend, otherwise whatever
    /// [`Connection::subscribe`] reported.
    pub fn open(
        broker: &dyn Broker,
        topic: &str,
        source: &str,
        observer: Arc<dyn ConnectionObserver>,
    ) -> Result<Self, ProviderError> {
        let Callbacks {
            on_error,
            on_message,
            on_done,
        } = Callbacks::from_observer(observer);

        let connection = broker
            .connect(on_error)
            .map_err(|e| ProviderError::new(ProviderErrorKind::Connection, e))?;

        let config = SubscriberConfig::new(topic, source, on_message)
            .map_err(|e| ProviderError::new(ProviderErrorKind::SubscriberConfigCreate, e))?;

        let subscriber = connection.subscribe(config, on_done)?;

        debug!(topic, source, "session opened");
        Ok(Self {
            subscriber: Some(subscriber),
            connection: Some(connection),
        })
    }

    /// The subscriber of this session.
    #[must_use]
    pub fn subscriber(&self) -> Option<&Subscriber> {
        self.subscriber.as_ref()
    }

    /// Release the subscriber and the connection.
    pub fn close(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if let Some(sub) = self.subscriber.take() {
            debug!(topic = sub.topic(), source = sub.source(), "session closing");
            drop(sub);
        }
        self.connection.take();
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.release();
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("subscriber", &self.subscriber)
            .field("connected", &self.connection.is_some())
            .finish()
    }
}
