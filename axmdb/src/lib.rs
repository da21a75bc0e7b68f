#![doc = include_str!("../README.md")]

pub mod analytics;
pub mod broker;
pub mod config;
pub mod error;
pub mod local;
pub mod message;
#[cfg(feature = "native")]
pub mod native;
pub mod observer;
pub mod provider;
pub mod session;

#[cfg(feature = "native")]
mod ffi;

// Re-export core public API at crate root.
pub use analytics::{
    BoundingBox, Class, ColorInfo, ConsolidatedTrack, Frame, Image, MessageType, Observation,
    Operation, SceneDescription, topics,
};
pub use broker::{Broker, Connection, Subscriber, SubscriberConfig};
pub use config::ProviderConfig;
pub use error::{Error, ProviderError, ProviderErrorKind, Result};
pub use local::LocalBroker;
pub use message::Message;
#[cfg(feature = "native")]
pub use native::NativeBroker;
pub use observer::{Callbacks, ConnectionObserver, DoneCallback, ErrorCallback, MessageCallback};
pub use provider::Provider;
pub use session::Session;
