//! Protocol constants.
//!
//! Fixed values of the wire format plus the reference defaults for timers
//! and windows. Timer and window values are defaults only; each connection
//! carries its own configuration.

use std::time::Duration;

// =============================================================================
// WIRE FORMAT
// =============================================================================

/// Segment header size in bytes (seqno + ackno + len + flags + window + cksum).
pub const SEGMENT_HEADER_SIZE: usize = 18;

/// Maximum payload bytes carried by a single segment.
pub const MAX_SEGMENT_DATA_SIZE: usize = 1440;

/// Maximum total segment size on the wire.
pub const MAX_SEGMENT_SIZE: usize = SEGMENT_HEADER_SIZE + MAX_SEGMENT_DATA_SIZE;

/// First sequence number of each direction of a connection.
pub const INITIAL_SEQNO: u32 = 1;

// =============================================================================
// TIMERS
// =============================================================================

/// Default interval at which the external driver ticks the engine.
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_millis(40);

/// Default timeout after which an unacknowledged segment is retransmitted.
pub const DEFAULT_RETRANSMISSION_TIMEOUT: Duration = Duration::from_millis(2000);

/// Timeout intervals an outstanding segment may expire before the
/// connection is torn down as unrecoverable.
pub const RETRY_BUDGET: u32 = 5;

/// TimeWait linger duration, as a multiple of the retransmission timeout.
pub const LINGER_MULTIPLIER: u32 = 35;

// =============================================================================
// WINDOWS
// =============================================================================

/// Default send window in bytes (one segment: stop-and-wait).
pub const DEFAULT_SEND_WINDOW: usize = MAX_SEGMENT_DATA_SIZE;

/// Default receive window in bytes.
pub const DEFAULT_RECV_WINDOW: usize = MAX_SEGMENT_DATA_SIZE;
