//! Error types for the STRAND protocol.

use thiserror::Error;

/// Errors raised while decoding or validating an inbound segment.
///
/// Every variant leads to the same engine behavior: the segment is dropped
/// silently, without acknowledgment or state change, and the peer's
/// retransmission timer recovers the loss.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SegmentError {
    /// Fewer bytes than a segment header.
    #[error("segment too short: expected at least {expected} bytes, got {actual}")]
    TooShort {
        /// Minimum bytes required.
        expected: usize,
        /// Actual bytes received.
        actual: usize,
    },

    /// The header's length field disagrees with the received byte count.
    #[error("length mismatch: header declares {declared} bytes, received {received}")]
    LengthMismatch {
        /// Length declared in the header.
        declared: usize,
        /// Bytes physically received.
        received: usize,
    },

    /// The checksum failed to validate.
    #[error("checksum mismatch: received {received:#06x}, computed {computed:#06x}")]
    ChecksumMismatch {
        /// Checksum carried in the header.
        received: u16,
        /// Checksum recomputed over the received bytes.
        computed: u16,
    },
}

/// The application's inbound buffer cannot accept a chunk right now.
///
/// Not a protocol failure: the engine defers delivery and the bytes reach
/// the application on a later event.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("application inbound buffer cannot accept the chunk")]
pub struct DeliverError;
