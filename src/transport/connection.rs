//! Per-connection protocol state machine.
//!
//! Dispatches inbound segments by state and flags, drives the send queue
//! and the reassembly buffer, and owns the half-close/teardown lifecycle.
//! There is no handshake: a connection starts out established.

use std::time::Duration;

use tracing::{debug, trace, warn};

use crate::core::constants::{INITIAL_SEQNO, MAX_SEGMENT_DATA_SIZE};
use crate::core::{Application, Channel, Pull};

use super::config::ConnectionConfig;
use super::reassembly::ReassemblyBuffer;
use super::segment::Segment;
use super::send_queue::{SendQueue, SweepOutcome};

/// Protocol states of a connection.
///
/// The handshake states exist for compatibility with the classic TCP
/// diagram but carry no transition rules: a connection is created directly
/// in [`Established`](ConnState::Established), and `Closed` is never
/// entered because destruction is immediate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnState {
    /// No connection. Never entered.
    Closed,
    /// Waiting for an inbound handshake. Never entered.
    Listen,
    /// Handshake received. Never entered.
    SynRcvd,
    /// Handshake sent. Never entered.
    SynSent,
    /// Data transfer in both directions.
    Established,
    /// Peer closed its side, local close pending. Passed through within a
    /// single handler invocation; the local FIN follows immediately.
    CloseWait,
    /// Local FIN sent after the peer's; waiting for its acknowledgment.
    LastAck,
    /// Local FIN sent first; waiting for its acknowledgment.
    FinWait1,
    /// Local FIN acknowledged; waiting for the peer's FIN.
    FinWait2,
    /// Simultaneous close; waiting for the acknowledgment of the local FIN.
    Closing,
    /// Both sides closed; lingering to absorb stray retransmissions.
    TimeWait,
}

/// Whether a connection survives the event that was just handled.
#[must_use]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// The connection remains active.
    Active,
    /// The connection has been torn down; the owner must drop it now.
    Destroyed,
}

impl Disposition {
    /// Whether the event destroyed the connection.
    pub fn is_destroyed(self) -> bool {
        matches!(self, Self::Destroyed)
    }
}

/// One reliable byte-stream connection over an unreliable channel.
///
/// A connection exclusively owns its send queue, its reassembly buffer, its
/// channel handle, and its application stream. The entry points
/// [`on_app_ready`](Self::on_app_ready), [`on_segment`](Self::on_segment),
/// and [`on_tick`](Self::on_tick) must be invoked serially and never block;
/// whatever cannot complete now is retried on a later event. Once a handler
/// returns [`Disposition::Destroyed`] the connection must not be touched
/// again.
#[derive(Debug)]
pub struct Connection<C: Channel, A: Application> {
    state: ConnState,
    /// Next sequence number to send.
    next_seq: u32,
    send_queue: SendQueue,
    reassembly: ReassemblyBuffer,
    channel: C,
    app: A,
    config: ConnectionConfig,
    /// Remaining TimeWait linger; armed on entering TimeWait.
    linger: Duration,
}

impl<C: Channel, A: Application> Connection<C, A> {
    /// Create a connection directly in the established state.
    pub fn new(channel: C, app: A, config: ConnectionConfig) -> Self {
        Self {
            state: ConnState::Established,
            next_seq: INITIAL_SEQNO,
            send_queue: SendQueue::new(&config),
            reassembly: ReassemblyBuffer::new(&config),
            channel,
            app,
            config,
            linger: Duration::ZERO,
        }
    }

    /// Current protocol state.
    pub fn state(&self) -> ConnState {
        self.state
    }

    /// Next expected inbound sequence number.
    pub fn watermark(&self) -> u32 {
        self.reassembly.watermark()
    }

    /// Remaining send-window credit in segment units.
    pub fn send_credit(&self) -> u32 {
        self.send_queue.credit()
    }

    /// The application has outbound bytes ready, or end-of-input to signal.
    ///
    /// Pulls at most one maximum-segment-size chunk, and only while send
    /// window credit is available; otherwise the write is deferred to a
    /// later event.
    pub fn on_app_ready(&mut self) -> Disposition {
        if self.state != ConnState::Established {
            return Disposition::Active;
        }
        if !self.send_queue.can_send() {
            trace!("send window exhausted, write deferred");
            return Disposition::Active;
        }

        let mut chunk = [0u8; MAX_SEGMENT_DATA_SIZE];
        match self.app.pull(&mut chunk) {
            Pull::Data(0) => {}
            Pull::Data(n) => self.send_data(&chunk[..n]),
            Pull::End => {
                debug!("end of input, closing outbound side");
                self.send_fin();
                self.state = ConnState::FinWait1;
            }
        }
        Disposition::Active
    }

    /// A raw datagram arrived from the channel.
    ///
    /// Segments failing validation are dropped without response or state
    /// change; unexpected flag/state combinations are ignored.
    pub fn on_segment(&mut self, raw: &[u8]) -> Disposition {
        let segment = match Segment::decode(raw) {
            Ok(segment) => segment,
            Err(err) => {
                debug!(%err, "invalid segment dropped");
                return Disposition::Active;
            }
        };
        trace!(
            state = ?self.state,
            seqno = segment.seqno,
            ackno = segment.ackno,
            len = segment.payload.len(),
            "segment accepted for dispatch"
        );

        match self.state {
            ConnState::Established => self.on_segment_established(segment),
            ConnState::FinWait1 => self.on_segment_fin_wait_1(segment),
            ConnState::FinWait2 => self.on_segment_fin_wait_2(segment),
            ConnState::Closing => self.on_segment_closing(segment),
            ConnState::LastAck => self.on_segment_last_ack(segment),
            // TimeWait absorbs stray traffic until the linger expires; the
            // handshake states are never entered.
            _ => Disposition::Active,
        }
    }

    /// Periodic timer sweep for this connection.
    ///
    /// In TimeWait only the linger counts down; otherwise the send queue
    /// head is aged and retry exhaustion tears the connection down.
    pub fn on_tick(&mut self) -> Disposition {
        if self.state == ConnState::TimeWait {
            self.linger = self.linger.saturating_sub(self.config.tick_interval);
            if self.linger.is_zero() {
                debug!("linger elapsed, destroying connection");
                return self.destroy();
            }
            return Disposition::Active;
        }

        match self
            .send_queue
            .on_tick(self.config.tick_interval, &mut self.channel)
        {
            SweepOutcome::Exhausted => {
                warn!("peer unresponsive, destroying connection");
                self.destroy()
            }
            SweepOutcome::Idle | SweepOutcome::Retransmitted => Disposition::Active,
        }
    }

    /// Tear the connection down immediately, bypassing the close sequence.
    pub fn teardown(&mut self) -> Disposition {
        debug!("explicit teardown");
        self.destroy()
    }

    fn on_segment_established(&mut self, segment: Segment) -> Disposition {
        if segment.flags.is_fin() {
            return self.on_peer_fin_established(segment);
        }
        if !segment.flags.is_ack() {
            return Disposition::Active;
        }

        if segment.is_pure_ack() {
            self.send_queue.on_ack(segment.ackno);
            return Disposition::Active;
        }

        let outcome = self.reassembly.on_data(segment, &mut self.app);
        if outcome.should_ack() {
            self.send_ack(self.reassembly.watermark());
        }
        Disposition::Active
    }

    /// Peer closed its side: flush whatever is deliverable, acknowledge the
    /// FIN, then close the local side as well.
    fn on_peer_fin_established(&mut self, segment: Segment) -> Disposition {
        debug!(seqno = segment.seqno, "peer FIN received while established");
        self.reassembly.drain(&mut self.app);
        self.app.deliver_eof();

        let ackno = self.reassembly.on_fin(segment.seqno);
        self.send_ack(ackno);
        self.state = ConnState::CloseWait;

        // CloseWait is passed through within this handler; the local FIN
        // follows at once rather than waiting for a separate close event.
        self.send_fin();
        self.state = ConnState::LastAck;
        Disposition::Active
    }

    fn on_segment_fin_wait_1(&mut self, segment: Segment) -> Disposition {
        if segment.flags.is_fin() {
            debug!("simultaneous close, acknowledging peer FIN");
            let ackno = self.reassembly.on_fin(segment.seqno);
            self.send_ack(ackno);
            self.state = ConnState::Closing;
        } else if self.is_fin_ack(&segment) {
            self.send_queue.on_ack(segment.ackno);
            self.state = ConnState::FinWait2;
        }
        Disposition::Active
    }

    fn on_segment_fin_wait_2(&mut self, segment: Segment) -> Disposition {
        if !segment.flags.is_fin() {
            return Disposition::Active;
        }

        self.reassembly.drain(&mut self.app);
        self.app.deliver_eof();
        let ackno = self.reassembly.on_fin(segment.seqno);
        self.send_ack(ackno);
        self.enter_time_wait();
        Disposition::Active
    }

    fn on_segment_closing(&mut self, segment: Segment) -> Disposition {
        if self.is_fin_ack(&segment) {
            self.send_queue.on_ack(segment.ackno);
            self.enter_time_wait();
        }
        Disposition::Active
    }

    fn on_segment_last_ack(&mut self, segment: Segment) -> Disposition {
        if self.is_fin_ack(&segment) {
            debug!("local FIN acknowledged, destroying connection");
            return self.destroy();
        }
        Disposition::Active
    }

    /// Whether the segment acknowledges the local FIN. The FIN occupies one
    /// sequence unit past the last payload byte.
    fn is_fin_ack(&self, segment: &Segment) -> bool {
        segment.flags.is_ack() && segment.ackno == self.next_seq.wrapping_add(1)
    }

    fn send_data(&mut self, bytes: &[u8]) {
        let segment = Segment::data(self.next_seq, self.reassembly.watermark(), bytes.to_vec());
        self.send_queue.dispatch(&segment, &mut self.channel);
        self.next_seq = self.next_seq.wrapping_add(bytes.len() as u32);
    }

    fn send_fin(&mut self) {
        let segment = Segment::fin(self.next_seq, self.reassembly.watermark());
        self.send_queue.dispatch(&segment, &mut self.channel);
    }

    /// Acknowledgments are not queued: they are never retransmitted, the
    /// data they confirm is.
    fn send_ack(&mut self, ackno: u32) {
        let segment = Segment::ack(self.next_seq, ackno);
        self.channel.transmit(&segment.encode());
    }

    fn enter_time_wait(&mut self) {
        self.linger = self.config.linger();
        self.state = ConnState::TimeWait;
        debug!(linger = ?self.linger, "entering TimeWait");
    }

    fn destroy(&mut self) -> Disposition {
        self.channel.release();
        Disposition::Destroyed
    }
}
