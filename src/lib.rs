//! # STRAND Protocol
//!
//! **S**tream **Tra**nsport over raw **N**etwork **D**atagrams
//!
//! STRAND is a minimal TCP-like reliability engine: a reliable, ordered
//! byte-stream transport layered over an unreliable, unordered,
//! message-oriented channel. It provides:
//!
//! - **Reliability**: per-segment retransmission with a bounded retry budget
//! - **Ordering**: out-of-order reassembly with exactly-once in-order delivery
//! - **Flow control**: sliding-window credit on both the send and receive side
//! - **Lifecycle**: half-close and mutual teardown with a TimeWait linger
//!
//! The engine is single-threaded, cooperative, and externally driven. The
//! embedding process serially invokes three entry points (application data
//! ready, inbound segment arrived, periodic timer tick) and supplies the
//! datagram channel and the application byte stream through the
//! [`Channel`] and [`Application`] traits. No handler blocks; work that
//! cannot complete now (exhausted windows, application backpressure) is
//! deferred and retried on a later event.
//!
//! ## Feature Flags
//!
//! - `net` (default): UDP-backed channel adapter over a tokio socket
//!
//! ## Modules
//!
//! - [`core`]: Constants, error types, and collaborator traits
//! - [`transport`]: The protocol engine (codec, queues, state machine, driver)
//! - [`net`]: UDP channel adapter (requires `net` feature)
//!
//! ## Example Usage
//!
//! ```rust
//! use strand_protocol::prelude::*;
//!
//! // Minimal in-process collaborators: a channel that drops every datagram
//! // and an application with one outbound chunk.
//! struct NullChannel;
//!
//! impl Channel for NullChannel {
//!     fn transmit(&mut self, _segment: &[u8]) {}
//! }
//!
//! struct OneShot(Option<Vec<u8>>);
//!
//! impl Application for OneShot {
//!     fn pull(&mut self, buf: &mut [u8]) -> Pull {
//!         match self.0.take() {
//!             Some(chunk) => {
//!                 buf[..chunk.len()].copy_from_slice(&chunk);
//!                 Pull::Data(chunk.len())
//!             }
//!             None => Pull::Data(0),
//!         }
//!     }
//!
//!     fn deliver(&mut self, _bytes: &[u8]) -> Result<(), DeliverError> {
//!         Ok(())
//!     }
//!
//!     fn capacity(&self) -> usize {
//!         usize::MAX
//!     }
//!
//!     fn deliver_eof(&mut self) {}
//! }
//!
//! let mut engine = Engine::new();
//! let id = engine.establish(
//!     NullChannel,
//!     OneShot(Some(b"hello".to_vec())),
//!     ConnectionConfig::default(),
//! );
//!
//! engine.on_app_ready(id);
//! assert_eq!(engine.active(), 1);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

// Core module (always included)
pub mod core;

// Protocol engine (always included)
pub mod transport;

// UDP channel adapter (feature-gated)
#[cfg(feature = "net")]
#[cfg_attr(docsrs, doc(cfg(feature = "net")))]
pub mod net;

/// Prelude module for convenient imports.
pub mod prelude {
    // Core traits and types
    pub use crate::core::*;

    // Engine types
    pub use crate::transport::{
        AckOutcome, ConnState, Connection, ConnectionConfig, ConnectionId, DataOutcome,
        Disposition, Engine, ReassemblyBuffer, Segment, SegmentFlags, SendQueue, SweepOutcome,
    };

    // UDP adapter (when enabled)
    #[cfg(feature = "net")]
    pub use crate::net::UdpChannel;
}

// Re-export commonly used items at crate root
pub use crate::core::{Application, Channel, DeliverError, Pull, SegmentError};

pub use transport::{
    ConnState, Connection, ConnectionConfig, ConnectionId, Disposition, Engine, Segment,
    SegmentFlags,
};

#[cfg(feature = "net")]
pub use net::UdpChannel;
