//! Per-connection configuration.

use std::time::Duration;

use crate::core::constants::{
    DEFAULT_RECV_WINDOW, DEFAULT_RETRANSMISSION_TIMEOUT, DEFAULT_SEND_WINDOW,
    DEFAULT_TICK_INTERVAL, LINGER_MULTIPLIER, MAX_SEGMENT_DATA_SIZE,
};

/// Configuration fixed at connection establishment.
///
/// Window sizes are given in bytes and converted internally to counts of
/// maximum-segment-size units, with a minimum of one unit. There is no
/// process-wide configuration: every connection owns its values.
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    /// Interval at which the external driver invokes the timer sweep.
    pub tick_interval: Duration,
    /// Timeout after which an unacknowledged segment is retransmitted.
    pub retransmission_timeout: Duration,
    /// Send window in bytes.
    pub send_window: usize,
    /// Receive window in bytes.
    pub recv_window: usize,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            tick_interval: DEFAULT_TICK_INTERVAL,
            retransmission_timeout: DEFAULT_RETRANSMISSION_TIMEOUT,
            send_window: DEFAULT_SEND_WINDOW,
            recv_window: DEFAULT_RECV_WINDOW,
        }
    }
}

impl ConnectionConfig {
    /// Send window in segment units (at least one).
    pub(crate) fn send_window_units(&self) -> u32 {
        (self.send_window / MAX_SEGMENT_DATA_SIZE).max(1) as u32
    }

    /// Receive window in segment units (at least one).
    pub(crate) fn recv_window_units(&self) -> u32 {
        (self.recv_window / MAX_SEGMENT_DATA_SIZE).max(1) as u32
    }

    /// Linger duration for the TimeWait state.
    pub(crate) fn linger(&self) -> Duration {
        self.retransmission_timeout * LINGER_MULTIPLIER
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_windows_are_one_unit() {
        let config = ConnectionConfig::default();
        assert_eq!(config.send_window_units(), 1);
        assert_eq!(config.recv_window_units(), 1);
    }

    #[test]
    fn test_window_unit_conversion() {
        let config = ConnectionConfig {
            send_window: 4 * MAX_SEGMENT_DATA_SIZE,
            recv_window: 2 * MAX_SEGMENT_DATA_SIZE + 100,
            ..ConnectionConfig::default()
        };
        assert_eq!(config.send_window_units(), 4);
        assert_eq!(config.recv_window_units(), 2);
    }

    #[test]
    fn test_tiny_window_rounds_up_to_one_unit() {
        let config = ConnectionConfig {
            send_window: 1,
            recv_window: 0,
            ..ConnectionConfig::default()
        };
        assert_eq!(config.send_window_units(), 1);
        assert_eq!(config.recv_window_units(), 1);
    }

    #[test]
    fn test_linger_is_a_timeout_multiple() {
        let config = ConnectionConfig {
            retransmission_timeout: Duration::from_millis(200),
            ..ConnectionConfig::default()
        };
        assert_eq!(config.linger(), Duration::from_millis(200 * 35));
    }
}
