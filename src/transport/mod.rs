//! STRAND Protocol - Transport Engine
//!
//! This module implements the whole reliability engine:
//!
//! - **Segment codec**: [`Segment`] framing, validation, internet checksum
//! - **Send/retransmission queue**: [`SendQueue`] with cumulative-ack
//!   retirement and bounded retries
//! - **Receive reassembly**: [`ReassemblyBuffer`] ordering out-of-order data
//! - **Connection state machine**: [`Connection`] lifecycle from established
//!   through half-close to teardown
//! - **Engine driver**: [`Engine`] routing events and sweeping every active
//!   connection per timer tick
//!
//! # Architecture
//!
//! ```text
//! application bytes            raw datagrams
//!       │  ▲                        │
//!       ▼  │                        ▼
//! ┌─────────────────────────────────────────┐
//! │         Connection state machine        │
//! │  ┌───────────────┐  ┌────────────────┐  │
//! │  │   SendQueue   │  │ ReassemblyBuf  │  │
//! │  └───────────────┘  └────────────────┘  │
//! ├─────────────────────────────────────────┤
//! │             Segment codec               │
//! └─────────────────────────────────────────┘
//!       │
//!       ▼
//!  unreliable datagram channel
//! ```
//!
//! An application-write event frames at most one segment (subject to window
//! credit) and queues it for retransmission; an inbound datagram is
//! validated and dispatched by state and flags; a timer tick ages the
//! retransmission queue and the TimeWait linger of every connection.

mod config;
mod connection;
mod engine;
mod reassembly;
mod segment;
mod send_queue;

#[cfg(test)]
pub(crate) mod mock;

pub use config::ConnectionConfig;
pub use connection::{ConnState, Connection, Disposition};
pub use engine::{ConnectionId, Engine};
pub use reassembly::{DataOutcome, ReassemblyBuffer};
pub use segment::{Segment, SegmentFlags};
pub use send_queue::{AckOutcome, SendQueue, SweepOutcome};
