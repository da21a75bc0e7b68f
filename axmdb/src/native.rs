#![allow(unsafe_code)]
//! Broker backend driving `libmdb` on the device.
//!
//! Each callback registered with the library is a trampoline below. The
//! `user_data` pointer it receives is a [`CallbackContext`] holding the boxed
//! Rust closure; the context outlives the library object it was registered
//! with.

use std::ffi::c_void;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use tracing::{debug, error};

use crate::broker::{Broker, Connection, Subscriber, SubscriberConfig};
use crate::error::{Error, ProviderError, ProviderErrorKind, Result};
use crate::ffi::{self, CallbackContext, OwnedHandle, borrow_error, created, to_c_string};
use crate::message::Message;
use crate::observer::{DoneCallback, ErrorCallback, MessageCallback};

/// Opens connections through the system's `libmdb`.
#[derive(Debug, Clone, Copy, Default)]
pub struct NativeBroker;

impl NativeBroker {
    /// Create the backend.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Broker for NativeBroker {
    fn connect(&self, on_error: ErrorCallback) -> Result<Box<dyn Connection>> {
        let on_error = CallbackContext::new(on_error);
        let mut err = ffi::no_error();
        let ptr = unsafe {
            mdb_sys::mdb_connection_create(
                Some(on_connection_error),
                on_error.user_data(),
                &raw mut err,
            )
        };
        let handle = unsafe { created(ptr, err, mdb_sys::mdb_connection_destroy) }?;
        debug!("mdb connection created");
        Ok(Box::new(NativeConnection {
            inner: Arc::new(ConnectionInner {
                handle,
                _on_error: on_error,
            }),
        }))
    }
}

// Field order is drop order: the library object goes before its context.
struct ConnectionInner {
    handle: OwnedHandle<mdb_sys::mdb_connection_t>,
    _on_error: CallbackContext<ErrorCallback>,
}

struct NativeConnection {
    inner: Arc<ConnectionInner>,
}

impl Connection for NativeConnection {
    fn subscribe(
        &self,
        config: SubscriberConfig,
        on_done: DoneCallback,
    ) -> std::result::Result<Subscriber, ProviderError> {
        let (topic, source, on_message) = config.into_parts();
        let on_message = CallbackContext::new(on_message);
        let config = create_config(&topic, &source, &on_message)
            .map_err(|e| ProviderError::new(ProviderErrorKind::SubscriberConfigCreate, e))?;

        let on_done = CallbackContext::new(on_done);
        let mut err = ffi::no_error();
        let ptr = unsafe {
            mdb_sys::mdb_subscriber_create_async(
                self.inner.handle.as_ptr(),
                config.as_ptr(),
                Some(on_subscriber_create_done),
                on_done.user_data(),
                &raw mut err,
            )
        };
        let subscriber =
            unsafe { created(ptr, err, mdb_sys::mdb_subscriber_destroy) }.map_err(subscribe_failure)?;
        debug!(%topic, %source, "mdb subscriber requested");

        let resources = NativeSubscriber {
            _subscriber: subscriber,
            _config: config,
            _on_done: on_done,
            _on_message: on_message,
            _connection: Arc::clone(&self.inner),
        };
        Ok(Subscriber::new(topic, source, Box::new(resources)))
    }
}

fn create_config(
    topic: &str,
    source: &str,
    on_message: &CallbackContext<MessageCallback>,
) -> Result<OwnedHandle<mdb_sys::mdb_subscriber_config_t>> {
    let c_topic = to_c_string(topic)?;
    let c_source = to_c_string(source)?;
    let mut err = ffi::no_error();
    let ptr = unsafe {
        mdb_sys::mdb_subscriber_config_create(
            c_topic.as_ptr(),
            c_source.as_ptr(),
            Some(on_message_trampoline),
            on_message.user_data(),
            &raw mut err,
        )
    };
    unsafe { created(ptr, err, mdb_sys::mdb_subscriber_config_destroy) }
}

/// A library error means the request was refused; a null subscriber without
/// one means it was accepted but nothing was created.
fn subscribe_failure(error: Error) -> ProviderError {
    let kind = if error == Error::NullPointer {
        ProviderErrorKind::SubscriberCreate
    } else {
        ProviderErrorKind::Subscribe
    };
    ProviderError::new(kind, error)
}

// Dropped top to bottom: subscriber, config, contexts, then the connection
// reference, so a connection always outlives its subscribers.
struct NativeSubscriber {
    _subscriber: OwnedHandle<mdb_sys::mdb_subscriber_t>,
    _config: OwnedHandle<mdb_sys::mdb_subscriber_config_t>,
    _on_done: CallbackContext<DoneCallback>,
    _on_message: CallbackContext<MessageCallback>,
    _connection: Arc<ConnectionInner>,
}

/// Run a user callback, keeping panics from unwinding into libmdb.
fn guarded(what: &str, f: impl FnOnce()) {
    if panic::catch_unwind(AssertUnwindSafe(f)).is_err() {
        error!(callback = what, "callback panicked");
    }
}

/// Connection-level failure reported by libmdb.
unsafe extern "C" fn on_connection_error(error: *const mdb_sys::mdb_error_t, user_data: *mut c_void) {
    unsafe {
        if user_data.is_null() || error.is_null() {
            return;
        }
        let cb = &*user_data.cast::<ErrorCallback>();
        let error = borrow_error(error);
        guarded("connection error", || cb(error));
    }
}

/// Message delivery from libmdb.
unsafe extern "C" fn on_message_trampoline(
    message: *const mdb_sys::mdb_message_t,
    user_data: *mut c_void,
) {
    unsafe {
        if user_data.is_null() || message.is_null() {
            return;
        }
        let cb = &*user_data.cast::<MessageCallback>();
        let message = message_from_raw(message);
        guarded("message", || cb(message));
    }
}

/// Completion of `mdb_subscriber_create_async`. A null error means success.
unsafe extern "C" fn on_subscriber_create_done(
    error: *const mdb_sys::mdb_error_t,
    user_data: *mut c_void,
) {
    unsafe {
        if user_data.is_null() {
            return;
        }
        let cb = &*user_data.cast::<DoneCallback>();
        let result = if error.is_null() {
            Ok(())
        } else {
            Err(borrow_error(error))
        };
        guarded("subscriber create done", || cb(result));
    }
}

/// Copy timestamp and payload out of a library-owned message.
unsafe fn message_from_raw(message: *const mdb_sys::mdb_message_t) -> Message {
    unsafe {
        message_from_parts(
            mdb_sys::mdb_message_get_timestamp(message),
            mdb_sys::mdb_message_get_payload(message),
        )
    }
}

/// Build a [`Message`]. A null timestamp reads as the epoch; a null payload,
/// null data or zero size reads as empty.
unsafe fn message_from_parts(
    ts: *const mdb_sys::timespec,
    payload: *const mdb_sys::mdb_message_payload_t,
) -> Message {
    unsafe {
        let (secs, nanos) = if ts.is_null() {
            (0, 0)
        } else {
            (i64::from((*ts).tv_sec), i64::from((*ts).tv_nsec))
        };

        let bytes = if payload.is_null() || (*payload).data.is_null() || (*payload).size == 0 {
            Vec::new()
        } else {
            std::slice::from_raw_parts((*payload).data, (*payload).size).to_vec()
        };

        Message::from_unix(secs, nanos, bytes)
    }
}
