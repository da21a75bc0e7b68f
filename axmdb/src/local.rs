//! In-process broker backend.
//!
//! [`LocalBroker`] routes messages between publishers and subscribers living
//! in the same process. It follows the same contract as the native backend:
//! subscriber creation completes on another thread, delivery happens on the
//! publishing thread, and connection failures can be injected. Tests and the
//! `replay` command use it to run providers without a camera.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant, SystemTime};

use parking_lot::{Condvar, Mutex};
use tracing::{debug, warn};

use crate::broker::{Broker, Connection, Subscriber, SubscriberConfig};
use crate::error::{Error, ProviderError, ProviderErrorKind, Result};
use crate::message::Message;
use crate::observer::{DoneCallback, ErrorCallback, MessageCallback};

/// A cloneable in-memory message broker. Clones share the same routes.
#[derive(Clone, Default)]
pub struct LocalBroker {
    shared: Arc<Shared>,
}

#[derive(Default)]
struct Shared {
    state: Mutex<State>,
    changed: Condvar,
}

#[derive(Default)]
struct State {
    next_id: u64,
    connections: HashMap<u64, Arc<ErrorCallback>>,
    routes: HashMap<u64, Route>,
    refuse_connections: Option<String>,
    rejected_topics: HashMap<String, String>,
    rejected_sources: HashMap<String, String>,
    withhold_subscribers: bool,
}

impl State {
    const fn allocate_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    fn active_routes(&self) -> usize {
        self.routes.values().filter(|r| r.active).count()
    }
}

struct Route {
    connection: u64,
    topic: String,
    source: String,
    active: bool,
    on_message: Arc<MessageCallback>,
}

impl LocalBroker {
    /// Create an empty broker.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every later `connect` fail with [`Error::Rejected`].
    pub fn refuse_connections(&self, reason: impl Into<String>) {
        self.shared.state.lock().refuse_connections = Some(reason.into());
    }

    /// Make subscriber creation for `topic` complete with [`Error::Rejected`].
    pub fn reject_topic(&self, topic: impl Into<String>, reason: impl Into<String>) {
        self.shared
            .state
            .lock()
            .rejected_topics
            .insert(topic.into(), reason.into());
    }

    /// Make subscriber configuration for `source` fail with [`Error::Rejected`].
    pub fn reject_source(&self, source: impl Into<String>, reason: impl Into<String>) {
        self.shared
            .state
            .lock()
            .rejected_sources
            .insert(source.into(), reason.into());
    }

    /// While set, subscribe requests are accepted but yield no subscriber,
    /// failing with [`Error::NullPointer`].
    pub fn withhold_subscribers(&self, withhold: bool) {
        self.shared.state.lock().withhold_subscribers = withhold;
    }

    /// Drop every open connection from the broker side. Their subscribers
    /// stop receiving and later subscribe requests fail with [`Error::Closed`].
    pub fn close_connections(&self) -> usize {
        let mut state = self.shared.state.lock();
        let closed = state.connections.len();
        state.connections.clear();
        state.routes.clear();
        self.shared.changed.notify_all();
        closed
    }

    /// Deliver `payload` stamped with the current time. Returns the number of
    /// subscribers that received it.
    pub fn publish(&self, topic: &str, source: &str, payload: impl Into<Vec<u8>>) -> usize {
        self.publish_message(topic, source, &Message::new(SystemTime::now(), payload))
    }

    /// Deliver a prebuilt message to every ready subscriber of `topic` and
    /// `source`. Returns the number of receivers.
    pub fn publish_message(&self, topic: &str, source: &str, message: &Message) -> usize {
        let targets: Vec<Arc<MessageCallback>> = {
            let state = self.shared.state.lock();
            state
                .routes
                .values()
                .filter(|r| r.active && r.topic == topic && r.source == source)
                .map(|r| Arc::clone(&r.on_message))
                .collect()
        };
        for cb in &targets {
            cb(message.clone());
        }
        targets.len()
    }

    /// Report a connection failure to every open connection. Returns the
    /// number of connections notified.
    pub fn fail_connections(&self, code: i32, message: &str) -> usize {
        let targets: Vec<Arc<ErrorCallback>> =
            self.shared.state.lock().connections.values().cloned().collect();
        for cb in &targets {
            cb(Error::Mdb {
                code,
                message: message.to_owned(),
            });
        }
        targets.len()
    }

    /// Number of open connections.
    #[must_use]
    pub fn connection_count(&self) -> usize {
        self.shared.state.lock().connections.len()
    }

    /// Number of subscribers whose creation completed successfully.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.shared.state.lock().active_routes()
    }

    /// Block until at least `count` subscribers are ready or `timeout` elapses.
    /// Returns whether the count was reached.
    #[must_use]
    pub fn wait_for_subscribers(&self, count: usize, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut state = self.shared.state.lock();
        while state.active_routes() < count {
            if self.shared.changed.wait_until(&mut state, deadline).timed_out() {
                return state.active_routes() >= count;
            }
        }
        true
    }
}

impl fmt::Debug for LocalBroker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.shared.state.lock();
        f.debug_struct("LocalBroker")
            .field("connections", &state.connections.len())
            .field("routes", &state.routes.len())
            .finish()
    }
}

impl Broker for LocalBroker {
    fn connect(&self, on_error: ErrorCallback) -> Result<Box<dyn Connection>> {
        let mut state = self.shared.state.lock();
        if let Some(reason) = &state.refuse_connections {
            return Err(Error::Rejected(reason.clone()));
        }
        let id = state.allocate_id();
        state.connections.insert(id, Arc::new(on_error));
        debug!(connection = id, "local connection opened");
        Ok(Box::new(LocalConnection {
            shared: Arc::clone(&self.shared),
            id,
        }))
    }
}

struct LocalConnection {
    shared: Arc<Shared>,
    id: u64,
}

impl Connection for LocalConnection {
    fn subscribe(
        &self,
        config: SubscriberConfig,
        on_done: DoneCallback,
    ) -> std::result::Result<Subscriber, ProviderError> {
        let (topic, source, on_message) = config.into_parts();
        let mut state = self.shared.state.lock();
        if let Some(reason) = state.rejected_sources.get(&source) {
            return Err(ProviderError::new(
                ProviderErrorKind::SubscriberConfigCreate,
                Error::Rejected(reason.clone()),
            ));
        }
        if !state.connections.contains_key(&self.id) {
            return Err(ProviderError::new(ProviderErrorKind::Subscribe, Error::Closed));
        }
        if state.withhold_subscribers {
            return Err(ProviderError::new(
                ProviderErrorKind::SubscriberCreate,
                Error::NullPointer,
            ));
        }

        if let Some(reason) = state.rejected_topics.get(&topic).cloned() {
            drop(state);
            complete(move || on_done(Err(Error::Rejected(reason))));
            return Ok(Subscriber::new(topic, source, Box::new(())));
        }

        let id = state.allocate_id();
        state.routes.insert(
            id,
            Route {
                connection: self.id,
                topic: topic.clone(),
                source: source.clone(),
                active: false,
                on_message: Arc::new(on_message),
            },
        );
        drop(state);
        debug!(route = id, %topic, %source, "local subscriber requested");

        let shared = Arc::clone(&self.shared);
        // Completion is reported before the route goes live, so no message
        // reaches a subscriber that has not been told it is ready.
        complete(move || {
            if !shared.state.lock().routes.contains_key(&id) {
                on_done(Err(Error::Closed));
                return;
            }
            on_done(Ok(()));
            if let Some(route) = shared.state.lock().routes.get_mut(&id) {
                route.active = true;
            }
            shared.changed.notify_all();
        });

        let guard = RouteGuard {
            shared: Arc::clone(&self.shared),
            id,
        };
        Ok(Subscriber::new(topic, source, Box::new(guard)))
    }
}

impl Drop for LocalConnection {
    fn drop(&mut self) {
        let mut state = self.shared.state.lock();
        state.connections.remove(&self.id);
        let id = self.id;
        state.routes.retain(|_, r| r.connection != id);
        self.shared.changed.notify_all();
        debug!(connection = id, "local connection closed");
    }
}

struct RouteGuard {
    shared: Arc<Shared>,
    id: u64,
}

impl Drop for RouteGuard {
    fn drop(&mut self) {
        self.shared.state.lock().routes.remove(&self.id);
        self.shared.changed.notify_all();
    }
}

/// Run a completion on its own thread, the way the library reports
/// asynchronous results. Falls back to the calling thread if spawning fails.
fn complete(job: impl FnOnce() + Send + 'static) {
    let job = Arc::new(Mutex::new(Some(job)));
    let remote = Arc::clone(&job);
    let spawned = thread::Builder::new()
        .name("mdb-local-done".into())
        .spawn(move || {
            if let Some(job) = remote.lock().take() {
                job();
            }
        });
    if let Err(e) = spawned {
        warn!(error = %e, "spawning completion thread failed; completing inline");
        if let Some(job) = job.lock().take() {
            job();
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::mpsc;

    use super::*;

    const WAIT: Duration = Duration::from_secs(5);

    fn sink() -> (MessageCallback, mpsc::Receiver<Message>) {
        let (tx, rx) = mpsc::channel();
        let tx = Mutex::new(tx);
        (
            Box::new(move |m| {
                let _ = tx.lock().send(m);
            }),
            rx,
        )
    }

    fn done() -> (DoneCallback, mpsc::Receiver<Result<()>>) {
        let (tx, rx) = mpsc::channel();
        let tx = Mutex::new(tx);
        (
            Box::new(move |r| {
                let _ = tx.lock().send(r);
            }),
            rx,
        )
    }

    #[test]
    fn delivers_only_to_matching_topic_and_source() {
        let broker = LocalBroker::new();
        let conn = broker.connect(Box::new(|_| {})).unwrap();
        let (on_message, messages) = sink();
        let (on_done, ready) = done();
        let config = SubscriberConfig::new("topic.a", "1", on_message).unwrap();
        let _sub = conn.subscribe(config, on_done).unwrap();
        ready.recv_timeout(WAIT).unwrap().unwrap();

        assert_eq!(broker.publish("topic.a", "2", "wrong source"), 0);
        assert_eq!(broker.publish("topic.b", "1", "wrong topic"), 0);
        assert_eq!(broker.publish("topic.a", "1", "hit"), 1);

        let msg = messages.recv_timeout(WAIT).unwrap();
        assert_eq!(msg.payload_str().unwrap(), "hit");
        assert!(messages.try_recv().is_err());
    }

    #[test]
    fn rejected_topic_reports_through_done_callback() {
        let broker = LocalBroker::new();
        broker.reject_topic("topic.a", "not licensed");
        let conn = broker.connect(Box::new(|_| {})).unwrap();
        let (on_message, _messages) = sink();
        let (on_done, ready) = done();
        let config = SubscriberConfig::new("topic.a", "1", on_message).unwrap();
        let _sub = conn.subscribe(config, on_done).unwrap();

        let outcome = ready.recv_timeout(WAIT).unwrap();
        assert_eq!(outcome, Err(Error::Rejected("not licensed".into())));
        assert_eq!(broker.subscriber_count(), 0);
    }

    #[test]
    fn refused_connection_fails_synchronously() {
        let broker = LocalBroker::new();
        broker.refuse_connections("broker offline");
        let err = broker.connect(Box::new(|_| {})).err().unwrap();
        assert_eq!(err, Error::Rejected("broker offline".into()));
        assert_eq!(broker.connection_count(), 0);
    }

    #[test]
    fn dropping_subscriber_and_connection_removes_routes() {
        let broker = LocalBroker::new();
        let conn = broker.connect(Box::new(|_| {})).unwrap();
        let (on_message, _messages) = sink();
        let (on_done, ready) = done();
        let sub = conn
            .subscribe(
                SubscriberConfig::new("topic.a", "1", on_message).unwrap(),
                on_done,
            )
            .unwrap();
        ready.recv_timeout(WAIT).unwrap().unwrap();
        assert_eq!(broker.subscriber_count(), 1);

        drop(sub);
        assert_eq!(broker.subscriber_count(), 0);
        assert_eq!(broker.connection_count(), 1);

        drop(conn);
        assert_eq!(broker.connection_count(), 0);
    }

    #[test]
    fn fail_connections_reaches_error_callbacks() {
        let broker = LocalBroker::new();
        let (tx, rx) = mpsc::channel();
        let tx = Mutex::new(tx);
        let _conn = broker
            .connect(Box::new(move |e| {
                let _ = tx.lock().send(e);
            }))
            .unwrap();

        assert_eq!(broker.fail_connections(7, "socket closed"), 1);
        assert_eq!(
            rx.recv_timeout(WAIT).unwrap(),
            Error::Mdb {
                code: 7,
                message: "socket closed".into()
            }
        );
    }

    #[test]
    fn close_connections_stops_delivery() {
        let broker = LocalBroker::new();
        let conn = broker.connect(Box::new(|_| {})).unwrap();
        let (on_message, _messages) = sink();
        let (on_done, ready) = done();
        let config = SubscriberConfig::new("topic.a", "1", on_message).unwrap();
        let _sub = conn.subscribe(config, on_done).unwrap();
        ready.recv_timeout(WAIT).unwrap().unwrap();

        assert_eq!(broker.close_connections(), 1);
        assert_eq!(broker.publish("topic.a", "1", "late"), 0);
        assert_eq!(broker.connection_count(), 0);
    }

    #[test]
    fn wait_for_subscribers_times_out_without_subscribers() {
        let broker = LocalBroker::new();
        assert!(!broker.wait_for_subscribers(1, Duration::from_millis(20)));
        assert!(broker.wait_for_subscribers(0, Duration::ZERO));
    }
}
