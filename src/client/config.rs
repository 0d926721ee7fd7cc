//! Timing and capacity settings for the client loops.

use std::time::Duration;

/// Default capacity of the queue between the reader and event loops.
pub const DEFAULT_QUEUE_CAPACITY: usize = 1024;
/// Default window in which `auth_success` must be called.
pub const DEFAULT_AUTH_TIMEOUT: Duration = Duration::from_secs(10);
/// Default interval between heartbeats.
pub const DEFAULT_HEARTBEAT_INTERVAL: Duration = Duration::from_secs(15);
/// Default bound on the best-effort close frame sent during teardown.
pub const DEFAULT_CLOSE_FRAME_TIMEOUT: Duration = Duration::from_secs(1);

const MIN_DURATION: Duration = Duration::from_millis(1);

/// Settings applied to every connection a client runs.
///
/// # Default Values
/// - `queue_capacity`: 1024 messages
/// - `auth_timeout`: 10 seconds
/// - `heartbeat_interval`: 15 seconds
/// - `close_frame_timeout`: 1 second
///
/// # Examples
///
/// ```
/// use std::time::Duration;
///
/// use opframe::client::ClientConfig;
///
/// let config = ClientConfig {
///     heartbeat_interval: Duration::from_secs(30),
///     ..ClientConfig::default()
/// };
/// assert_eq!(config.queue_capacity, 1024);
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ClientConfig {
    /// Messages buffered between the reader and event loops before the
    /// reader waits.
    pub queue_capacity: usize,
    /// Time from loop start within which authentication must succeed.
    pub auth_timeout: Duration,
    /// Interval between heartbeats.
    pub heartbeat_interval: Duration,
    /// How long teardown waits for the close frame to be written.
    pub close_frame_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            auth_timeout: DEFAULT_AUTH_TIMEOUT,
            heartbeat_interval: DEFAULT_HEARTBEAT_INTERVAL,
            close_frame_timeout: DEFAULT_CLOSE_FRAME_TIMEOUT,
        }
    }
}

impl ClientConfig {
    /// Clamp settings to values the loops can run with.
    ///
    /// The queue holds at least one message and every duration is at least
    /// one millisecond; `tokio::time::interval` panics on a zero period.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::time::Duration;
    ///
    /// use opframe::client::ClientConfig;
    ///
    /// let config = ClientConfig {
    ///     queue_capacity: 0,
    ///     heartbeat_interval: Duration::ZERO,
    ///     ..ClientConfig::default()
    /// }
    /// .normalized();
    /// assert_eq!(config.queue_capacity, 1);
    /// assert_eq!(config.heartbeat_interval, Duration::from_millis(1));
    /// ```
    #[must_use]
    pub fn normalized(mut self) -> Self {
        self.queue_capacity = self.queue_capacity.max(1);
        self.auth_timeout = self.auth_timeout.max(MIN_DURATION);
        self.heartbeat_interval = self.heartbeat_interval.max(MIN_DURATION);
        self.close_frame_timeout = self.close_frame_timeout.max(MIN_DURATION);
        self
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[test]
    fn defaults_match_protocol_timings() {
        let config = ClientConfig::default();
        assert_eq!(config.queue_capacity, 1024);
        assert_eq!(config.auth_timeout, Duration::from_secs(10));
        assert_eq!(config.heartbeat_interval, Duration::from_secs(15));
    }

    #[rstest]
    #[case(Duration::ZERO, MIN_DURATION)]
    #[case(Duration::from_secs(3), Duration::from_secs(3))]
    fn normalized_clamps_auth_timeout(#[case] input: Duration, #[case] expected: Duration) {
        let config = ClientConfig {
            auth_timeout: input,
            ..ClientConfig::default()
        }
        .normalized();
        assert_eq!(config.auth_timeout, expected);
    }

    #[test]
    fn normalized_keeps_valid_settings() {
        let config = ClientConfig::default();
        assert_eq!(config.normalized(), config);
    }
}
