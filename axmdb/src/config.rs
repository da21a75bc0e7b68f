//! Provider tuning.

use serde::{Deserialize, Serialize};

/// Default capacity of the message channel.
pub const DEFAULT_MESSAGE_CAPACITY: usize = 100;

/// Default capacity of the error channel.
pub const DEFAULT_ERROR_CAPACITY: usize = 10;

/// Channel sizes of a [`Provider`](crate::Provider).
///
/// When a channel is full, new events are dropped with a warning rather than
/// blocking the broker's delivery thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProviderConfig {
    /// Decoded messages buffered before dropping.
    pub message_capacity: usize,
    /// Errors buffered before dropping.
    pub error_capacity: usize,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            message_capacity: DEFAULT_MESSAGE_CAPACITY,
            error_capacity: DEFAULT_ERROR_CAPACITY,
        }
    }
}

impl ProviderConfig {
    /// Set the message channel capacity.
    #[must_use]
    pub const fn message_capacity(mut self, capacity: usize) -> Self {
        self.message_capacity = capacity;
        self
    }

    /// Set the error channel capacity.
    #[must_use]
    pub const fn error_capacity(mut self, capacity: usize) -> Self {
        self.error_capacity = capacity;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_take_defaults() {
        let cfg: ProviderConfig = serde_json::from_str(r#"{"error_capacity": 3}"#).unwrap();
        assert_eq!(cfg.message_capacity, DEFAULT_MESSAGE_CAPACITY);
        assert_eq!(cfg.error_capacity, 3);
    }

    #[test]
    fn unknown_fields_are_rejected() {
        assert!(serde_json::from_str::<ProviderConfig>(r#"{"capacity": 3}"#).is_err());
    }
}
