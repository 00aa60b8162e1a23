//! Collaborator traits at the engine boundary.
//!
//! The engine is generic over these traits; the embedding process supplies
//! the unreliable datagram channel and the application byte stream.

use super::error::DeliverError;

/// Result of pulling outbound bytes from the application.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pull {
    /// `n` bytes were copied into the buffer; 0 means none ready right now.
    Data(usize),
    /// The outbound stream is complete; no further data will ever be ready.
    End,
}

/// Application-side endpoints of the byte stream.
///
/// The outbound direction is pull-based: the engine asks for the next chunk
/// when window credit permits sending. The inbound direction is push-based
/// and bounded: the engine checks [`capacity`](Application::capacity) before
/// [`deliver`](Application::deliver), and a refused or skipped delivery is
/// retried on a later event. Bytes handed to `deliver` arrive exactly once
/// and in order.
pub trait Application {
    /// Pull the next chunk of outbound bytes into `buf`.
    ///
    /// Returns [`Pull::Data`] with the number of bytes copied (0 when
    /// nothing is ready yet) or [`Pull::End`] once the outbound stream is
    /// finished.
    fn pull(&mut self, buf: &mut [u8]) -> Pull;

    /// Deliver in-order inbound bytes to the application.
    fn deliver(&mut self, bytes: &[u8]) -> Result<(), DeliverError>;

    /// Current inbound buffer capacity in bytes.
    fn capacity(&self) -> usize;

    /// Signal that the inbound stream has ended (the peer closed its side).
    fn deliver_eof(&mut self);
}

/// One endpoint of the unreliable datagram channel.
///
/// Delivery is best-effort: datagrams may be dropped, duplicated, or
/// reordered, and [`transmit`](Channel::transmit) never reports an outcome.
/// Loss recovery belongs entirely to the protocol engine.
pub trait Channel {
    /// Transmit one serialized segment, fire-and-forget.
    fn transmit(&mut self, segment: &[u8]);

    /// Release the underlying handle.
    ///
    /// Invoked exactly once, when the owning connection is destroyed.
    fn release(&mut self) {}
}
