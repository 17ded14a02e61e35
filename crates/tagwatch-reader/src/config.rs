//! Reader session and recovery configuration.

use std::time::Duration;

use crate::catalog::ModulationCatalog;
use crate::error::{ReaderError, Result};

/// Default number of targets requested per poll.
pub const DEFAULT_TARGET_COUNT: u8 = 1;

/// Default bound on a single poll.
pub const DEFAULT_POLL_TIMEOUT: Duration = Duration::from_millis(300);

/// Default delay between poll cycles.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Default identifier channel capacity.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 32;

/// Default time a full channel is waited on before an identifier is dropped.
pub const DEFAULT_PUBLISH_TIMEOUT: Duration = Duration::from_millis(300);

/// Configuration for a [`ReaderSession`](crate::ReaderSession) and its
/// polling worker.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use tagwatch_reader::ReaderConfig;
///
/// let config = ReaderConfig::default()
///     .with_connstring("pcsc:ACR122U")
///     .with_poll_interval(Duration::from_millis(500));
///
/// assert!(config.validate().is_ok());
/// assert_eq!(config.poll_timeout, Duration::from_millis(300));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReaderConfig {
    /// Device address; empty selects the first reader found.
    pub connstring: String,

    /// Modulations probed on every poll.
    pub catalog: ModulationCatalog,

    /// Maximum number of targets requested per poll.
    pub target_count: u8,

    /// Bound on a single poll.
    pub poll_timeout: Duration,

    /// Delay between poll cycles.
    pub poll_interval: Duration,

    /// Capacity of the identifier channel.
    pub channel_capacity: usize,

    /// How long a full channel is waited on before an identifier is dropped.
    pub publish_timeout: Duration,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            connstring: String::new(),
            catalog: ModulationCatalog::standard(),
            target_count: DEFAULT_TARGET_COUNT,
            poll_timeout: DEFAULT_POLL_TIMEOUT,
            poll_interval: DEFAULT_POLL_INTERVAL,
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
            publish_timeout: DEFAULT_PUBLISH_TIMEOUT,
        }
    }
}

impl ReaderConfig {
    /// Set the device connection string.
    pub fn with_connstring(mut self, connstring: impl Into<String>) -> Self {
        self.connstring = connstring.into();
        self
    }

    /// Set the modulation catalog.
    pub fn with_catalog(mut self, catalog: ModulationCatalog) -> Self {
        self.catalog = catalog;
        self
    }

    /// Set the number of targets requested per poll.
    pub fn with_target_count(mut self, target_count: u8) -> Self {
        self.target_count = target_count;
        self
    }

    /// Set the poll timeout.
    pub fn with_poll_timeout(mut self, poll_timeout: Duration) -> Self {
        self.poll_timeout = poll_timeout;
        self
    }

    /// Set the delay between poll cycles.
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Set the identifier channel capacity.
    pub fn with_channel_capacity(mut self, channel_capacity: usize) -> Self {
        self.channel_capacity = channel_capacity;
        self
    }

    /// Set the publish timeout.
    pub fn with_publish_timeout(mut self, publish_timeout: Duration) -> Self {
        self.publish_timeout = publish_timeout;
        self
    }

    /// Check that every value is usable.
    ///
    /// # Errors
    ///
    /// Returns [`ReaderError::InvalidConfig`] naming the first bad field.
    pub fn validate(&self) -> Result<()> {
        if self.target_count == 0 {
            return Err(ReaderError::invalid_config("target_count must be at least 1"));
        }
        if self.poll_timeout.is_zero() {
            return Err(ReaderError::invalid_config("poll_timeout must be non-zero"));
        }
        if self.poll_interval.is_zero() {
            return Err(ReaderError::invalid_config("poll_interval must be non-zero"));
        }
        if self.channel_capacity == 0 {
            return Err(ReaderError::invalid_config("channel_capacity must be at least 1"));
        }
        if self.publish_timeout.is_zero() {
            return Err(ReaderError::invalid_config("publish_timeout must be non-zero"));
        }
        Ok(())
    }
}

/// Hold times of the reset pulse.
///
/// The line is driven high for `high_hold`, low for `low_hold`, then high
/// again and left to `settle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResetTimings {
    /// Hold after the first high write.
    pub high_hold: Duration,

    /// Hold after the low write.
    pub low_hold: Duration,

    /// Hold after the final high write.
    pub settle: Duration,
}

impl Default for ResetTimings {
    fn default() -> Self {
        Self {
            high_hold: Duration::from_millis(400),
            low_hold: Duration::from_millis(400),
            settle: Duration::from_millis(100),
        }
    }
}
