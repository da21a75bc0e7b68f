//! Callback types and the connection observer interface.
//!
//! The broker reports three kinds of events: connection errors, delivered
//! messages, and the outcome of asynchronous subscriber creation. Backends
//! receive them as pre-erased boxed closures; applications usually implement
//! [`ConnectionObserver`] and let [`Callbacks::from_observer`] do the split.

use std::fmt;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::message::Message;

/// Invoked when the connection reports a failure.
pub type ErrorCallback = Box<dyn Fn(Error) + Send + Sync>;

/// Invoked for every delivered message.
pub type MessageCallback = Box<dyn Fn(Message) + Send + Sync>;

/// Invoked once when asynchronous subscriber creation completes.
pub type DoneCallback = Box<dyn Fn(Result<()>) + Send + Sync>;

/// Receives every event of one connection and its subscriber.
///
/// Methods may be called from a thread owned by the broker library and must
/// not block for long.
pub trait ConnectionObserver: Send + Sync {
    /// The connection failed.
    fn on_connection_error(&self, error: Error);

    /// A message was delivered.
    fn on_message(&self, message: Message);

    /// Subscriber creation completed. `Ok(())` means messages will flow.
    fn on_subscriber_ready(&self, result: Result<()>);
}

/// The three callbacks a backend needs, split from one observer.
pub struct Callbacks {
    /// Connection error callback.
    pub on_error: ErrorCallback,
    /// Message callback.
    pub on_message: MessageCallback,
    /// Subscriber creation callback.
    pub on_done: DoneCallback,
}

impl Callbacks {
    /// Route all three callbacks to `observer`.
    #[must_use]
    pub fn from_observer(observer: Arc<dyn ConnectionObserver>) -> Self {
        let on_error = Arc::clone(&observer);
        let on_message = Arc::clone(&observer);
        Self {
            on_error: Box::new(move |e| on_error.on_connection_error(e)),
            on_message: Box::new(move |m| on_message.on_message(m)),
            on_done: Box::new(move |r| observer.on_subscriber_ready(r)),
        }
    }
}

impl fmt::Debug for Callbacks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Callbacks").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::time::UNIX_EPOCH;

    use parking_lot::Mutex;

    use super::*;

    #[derive(Default)]
    struct Recorder {
        events: Mutex<Vec<String>>,
    }

    impl ConnectionObserver for Recorder {
        fn on_connection_error(&self, error: Error) {
            self.events.lock().push(format!("error:{error}"));
        }

        fn on_message(&self, message: Message) {
            self.events
                .lock()
                .push(format!("message:{}", message.payload_str().unwrap()));
        }

        fn on_subscriber_ready(&self, result: Result<()>) {
            self.events.lock().push(format!("ready:{}", result.is_ok()));
        }
    }

    #[test]
    fn callbacks_forward_to_observer() {
        let recorder = Arc::new(Recorder::default());
        let cbs = Callbacks::from_observer(recorder.clone());

        (cbs.on_done)(Ok(()));
        (cbs.on_message)(Message::new(UNIX_EPOCH, "hello"));
        (cbs.on_error)(Error::NullPointer);

        let events = recorder.events.lock().clone();
        assert_eq!(
            events,
            [
                "ready:true",
                "message:hello",
                "error:unexpected null pointer from libmdb"
            ]
        );
    }
}
