//! Messages delivered by the broker.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use crate::error::{Error, Result};

/// A raw message received from the broker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    /// When the producer stamped the message.
    pub timestamp: SystemTime,
    /// Payload bytes, usually a JSON document.
    pub payload: Vec<u8>,
}

impl Message {
    /// Build a message from its parts.
    #[must_use]
    pub fn new(timestamp: SystemTime, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            timestamp,
            payload: payload.into(),
        }
    }

    /// Build a message from a `timespec`-style pair. Negative or out-of-range
    /// components clamp to the epoch.
    #[must_use]
    pub fn from_unix(secs: i64, nanos: i64, payload: impl Into<Vec<u8>>) -> Self {
        let secs = u64::try_from(secs).unwrap_or(0);
        let nanos = u32::try_from(nanos).unwrap_or(0).min(999_999_999);
        Self::new(UNIX_EPOCH + Duration::new(secs, nanos), payload)
    }

    /// Payload bytes.
    #[must_use]
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Payload as text.
    pub fn payload_str(&self) -> Result<&str> {
        std::str::from_utf8(&self.payload).map_err(|_| Error::InvalidUtf8)
    }

    /// Whether the message carries no payload.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_unix_keeps_seconds_and_nanos() {
        let msg = Message::from_unix(1_700_000_000, 250, "{}");
        let since = msg.timestamp.duration_since(UNIX_EPOCH).unwrap();
        assert_eq!(since.as_secs(), 1_700_000_000);
        assert_eq!(since.subsec_nanos(), 250);
    }

    #[test]
    fn from_unix_clamps_negative_time() {
        let msg = Message::from_unix(-5, -1, "");
        assert_eq!(msg.timestamp, UNIX_EPOCH);
        assert!(msg.is_empty());
    }

    #[test]
    fn payload_str_rejects_invalid_utf8() {
        let msg = Message::new(UNIX_EPOCH, vec![0xff, 0xfe]);
        assert_eq!(msg.payload_str(), Err(Error::InvalidUtf8));
    }
}
