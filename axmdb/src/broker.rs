//! Backend abstraction: connections, subscriber configurations, subscribers.
//!
//! A [`Broker`] opens [`Connection`]s; a connection turns a
//! [`SubscriberConfig`] into a [`Subscriber`]. Subscriber creation is
//! asynchronous: `subscribe` returns as soon as the request is accepted and the
//! outcome arrives through the [`DoneCallback`].

use std::any::Any;
use std::fmt;

use crate::error::{Error, ProviderError, Result};
use crate::observer::{DoneCallback, ErrorCallback, MessageCallback};

/// Opens connections to a message broker.
pub trait Broker: Send + Sync {
    /// Open a connection. `on_error` fires for failures after this returns.
    fn connect(&self, on_error: ErrorCallback) -> Result<Box<dyn Connection>>;
}

/// A live connection. Dropping it closes the connection.
pub trait Connection: Send {
    /// Start creating a subscriber for `config`.
    ///
    /// An `Err` means the request was not accepted and `on_done` will never
    /// fire. Otherwise `on_done` is called exactly once with the outcome.
    ///
    /// # Errors
    ///
    /// The kind names the step that failed:
    /// [`SubscriberConfigCreate`](crate::ProviderErrorKind::SubscriberConfigCreate)
    /// when the backend refused the configuration,
    /// [`Subscribe`](crate::ProviderErrorKind::Subscribe) when it refused the
    /// request, and
    /// [`SubscriberCreate`](crate::ProviderErrorKind::SubscriberCreate) when it
    /// accepted the request without producing a subscriber.
    fn subscribe(
        &self,
        config: SubscriberConfig,
        on_done: DoneCallback,
    ) -> std::result::Result<Subscriber, ProviderError>;
}

/// What to subscribe to and where to deliver messages.
pub struct SubscriberConfig {
    topic: String,
    source: String,
    on_message: MessageCallback,
}

impl SubscriberConfig {
    /// Validate and build a configuration.
    ///
    /// The topic must be non-empty; neither topic nor source may contain NUL.
    pub fn new(
        topic: impl Into<String>,
        source: impl Into<String>,
        on_message: MessageCallback,
    ) -> Result<Self> {
        let topic = topic.into();
        let source = source.into();
        if topic.is_empty() {
            return Err(Error::InvalidArgument("topic must not be empty".into()));
        }
        if topic.contains('\0') || source.contains('\0') {
            return Err(Error::InvalidArgument(
                "topic and source must not contain NUL".into(),
            ));
        }
        Ok(Self {
            topic,
            source,
            on_message,
        })
    }

    /// Topic name.
    #[must_use]
    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Source identifier (for example a video channel).
    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Split into `(topic, source, on_message)`.
    #[must_use]
    pub fn into_parts(self) -> (String, String, MessageCallback) {
        (self.topic, self.source, self.on_message)
    }
}

impl fmt::Debug for SubscriberConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubscriberConfig")
            .field("topic", &self.topic)
            .field("source", &self.source)
            .finish_non_exhaustive()
    }
}

/// An active subscription. Dropping it stops message delivery.
pub struct Subscriber {
    topic: String,
    source: String,
    _resources: Box<dyn Any + Send>,
}

impl Subscriber {
    /// Wrap backend `resources`, which are dropped with the subscriber.
    #[must_use]
    pub fn new(topic: String, source: String, resources: Box<dyn Any + Send>) -> Self {
        Self {
            topic,
            source,
            _resources: resources,
        }
    }

    /// Subscribed topic.
    #[must_use]
    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Subscribed source.
    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }
}

impl fmt::Debug for Subscriber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscriber")
            .field("topic", &self.topic)
            .field("source", &self.source)
            .finish_non_exhaustive()
    }
}
