//! Unified error types for the message broker client.

use std::fmt;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error type for the message broker client.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// An error object produced by the message broker library.
    #[error("mdb error {code}: {message}")]
    Mdb {
        /// Library error code.
        code: i32,
        /// Library error message.
        message: String,
    },

    /// The library returned null without reporting an error.
    #[error("unexpected null pointer from libmdb")]
    NullPointer,

    /// An argument passed to the client was invalid.
    #[error("{0}")]
    InvalidArgument(String),

    /// A message arrived without payload bytes.
    #[error("message has no payload")]
    EmptyPayload,

    /// A payload that must be text contained invalid UTF-8.
    #[error("invalid UTF-8 in message payload")]
    InvalidUtf8,

    /// A payload could not be decoded into the requested message type.
    #[error("decode: {0}")]
    Decode(String),

    /// The provider is already connected.
    #[error("provider is already connected")]
    AlreadyConnected,

    /// The provider has been disconnected and cannot be reused.
    #[error("provider is closed")]
    Closed,

    /// The broker refused the request.
    #[error("rejected: {0}")]
    Rejected(String),
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Self::Decode(e.to_string())
    }
}

/// The stage of a provider at which an error was raised.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderErrorKind {
    /// Creating the connection failed, or the connection reported an error.
    Connection,
    /// The subscriber configuration was rejected.
    SubscriberConfigCreate,
    /// The subscriber could not be created.
    SubscriberCreate,
    /// A payload could not be decoded into the message type.
    InvalidMessage,
    /// A payload could not be read as text.
    ParseMessage,
    /// A message arrived without payload.
    EmptyPayload,
    /// Asynchronous subscriber creation completed with an error.
    SubscribeDone,
    /// Starting the asynchronous subscriber creation failed.
    Subscribe,
}

impl fmt::Display for ProviderErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Connection => "connection",
            Self::SubscriberConfigCreate => "subscriber config",
            Self::SubscriberCreate => "subscriber create",
            Self::InvalidMessage => "invalid message",
            Self::ParseMessage => "parse message",
            Self::EmptyPayload => "empty payload",
            Self::SubscribeDone => "subscribe done",
            Self::Subscribe => "subscribe",
        })
    }
}

/// An error tagged with the provider stage that produced it.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind}: {error}")]
pub struct ProviderError {
    /// Where the error happened.
    pub kind: ProviderErrorKind,
    /// The underlying error.
    #[source]
    pub error: Error,
}

impl ProviderError {
    /// Tag `error` with `kind`.
    #[must_use]
    pub const fn new(kind: ProviderErrorKind, error: Error) -> Self {
        Self { kind, error }
    }
}
