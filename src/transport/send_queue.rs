//! Send-side retransmission queue.
//!
//! Transmitted segments wait here in transmission order until a cumulative
//! acknowledgment retires them. Each record carries an independent
//! retransmit countdown and retry budget; window credit is counted in
//! maximum-segment-size units and restored only when a record actually
//! leaves the queue.

use std::collections::VecDeque;
use std::time::Duration;

use tracing::{debug, trace};

use crate::core::constants::RETRY_BUDGET;
use crate::core::Channel;

use super::config::ConnectionConfig;
use super::segment::Segment;

/// One transmitted segment awaiting acknowledgment.
#[derive(Debug, Clone)]
struct OutstandingSegment {
    /// Serialized wire bytes, retransmitted verbatim on timeout.
    wire: Vec<u8>,
    /// Cumulative acknowledgment value that retires this record.
    ack_target: u32,
    /// Cleared when a non-head acknowledgment matched this record
    /// (done, but not retired until the head reaches it).
    awaiting_ack: bool,
    /// Remaining timeout intervals before the connection must be torn down.
    retries_left: u32,
    /// Time until the next retransmission.
    countdown: Duration,
}

/// Outcome of processing a cumulative acknowledgment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AckOutcome {
    /// The head was retired, along with any run of already-done records
    /// behind it. Carries the number of records retired.
    Retired(usize),
    /// A record behind the head was marked done; nothing retired yet.
    Marked,
    /// The acknowledgment matched no outstanding record.
    Ignored,
}

/// Outcome of a timer sweep over the queue head.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SweepOutcome {
    /// Nothing to do: queue empty, head already done, or countdown pending.
    Idle,
    /// The head was retransmitted and its countdown reset.
    Retransmitted,
    /// The head's retry budget is exhausted; the caller must destroy the
    /// connection.
    Exhausted,
}

/// FIFO of outstanding segments plus send-window accounting.
#[derive(Debug)]
pub struct SendQueue {
    records: VecDeque<OutstandingSegment>,
    credit: u32,
    retransmission_timeout: Duration,
}

impl SendQueue {
    /// Create a queue with the full window credit available.
    pub fn new(config: &ConnectionConfig) -> Self {
        Self {
            records: VecDeque::new(),
            credit: config.send_window_units(),
            retransmission_timeout: config.retransmission_timeout,
        }
    }

    /// Whether window credit permits sending another segment.
    pub fn can_send(&self) -> bool {
        self.credit > 0
    }

    /// Remaining window credit in segment units.
    pub fn credit(&self) -> u32 {
        self.credit
    }

    /// Number of records awaiting retirement.
    pub fn outstanding(&self) -> usize {
        self.records.len()
    }

    /// Transmit a segment and append it to the queue tail.
    ///
    /// Consumes one unit of window credit; data senders must check
    /// [`can_send`](Self::can_send) first. A FIN is dispatched regardless of
    /// credit since teardown must not stall behind the window.
    pub fn dispatch<C: Channel>(&mut self, segment: &Segment, channel: &mut C) {
        let wire = segment.encode();
        channel.transmit(&wire);
        trace!(
            seqno = segment.seqno,
            len = wire.len(),
            "segment dispatched"
        );

        self.credit = self.credit.saturating_sub(1);
        self.records.push_back(OutstandingSegment {
            wire,
            ack_target: segment.seq_end(),
            awaiting_ack: true,
            retries_left: RETRY_BUDGET,
            countdown: self.retransmission_timeout,
        });
    }

    /// Apply a cumulative acknowledgment.
    ///
    /// Prefix-only retirement: an acknowledgment matching the head retires
    /// it and then any run of records behind it that earlier acknowledgments
    /// already marked done. A match further back only marks that record;
    /// window credit is restored per retired record, never on marking.
    pub fn on_ack(&mut self, ackno: u32) -> AckOutcome {
        let Some(head) = self.records.front() else {
            return AckOutcome::Ignored;
        };

        if head.ack_target == ackno {
            self.records.pop_front();
            self.credit += 1;
            let mut retired = 1;
            while let Some(next) = self.records.front() {
                if next.awaiting_ack {
                    break;
                }
                self.records.pop_front();
                self.credit += 1;
                retired += 1;
            }
            trace!(ackno, retired, "acknowledgment retired queue prefix");
            return AckOutcome::Retired(retired);
        }

        match self
            .records
            .iter_mut()
            .skip(1)
            .find(|record| record.ack_target == ackno)
        {
            Some(record) => {
                record.awaiting_ack = false;
                trace!(ackno, "out-of-order acknowledgment marked, retirement deferred");
                AckOutcome::Marked
            }
            None => AckOutcome::Ignored,
        }
    }

    /// Timer sweep: age the queue head and retransmit on expiry.
    ///
    /// Only the head is inspected; later records start aging once they reach
    /// the head. The retry budget is spent per expired interval; when it
    /// reaches zero the head is not retransmitted again and the caller must
    /// destroy the connection.
    pub fn on_tick<C: Channel>(&mut self, tick: Duration, channel: &mut C) -> SweepOutcome {
        let Some(head) = self.records.front_mut() else {
            return SweepOutcome::Idle;
        };
        if !head.awaiting_ack {
            return SweepOutcome::Idle;
        }

        head.countdown = head.countdown.saturating_sub(tick);
        if !head.countdown.is_zero() {
            return SweepOutcome::Idle;
        }

        head.retries_left -= 1;
        if head.retries_left == 0 {
            debug!("retry budget exhausted for outstanding segment");
            return SweepOutcome::Exhausted;
        }

        channel.transmit(&head.wire);
        head.countdown = self.retransmission_timeout;
        debug!(retries_left = head.retries_left, "retransmitted queue head");
        SweepOutcome::Retransmitted
    }
}
