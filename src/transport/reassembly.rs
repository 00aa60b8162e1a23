//! Receive-side reassembly buffer.
//!
//! Orders out-of-order inbound data, delivers in-order runs to the
//! application exactly once, and tracks the receive watermark (the next
//! expected sequence number) together with receive-window credit.

use std::collections::BTreeMap;

use tracing::{debug, trace};

use crate::core::constants::INITIAL_SEQNO;
use crate::core::Application;

use super::config::ConnectionConfig;
use super::segment::Segment;

/// Outcome of accepting one inbound data segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataOutcome {
    /// Delivered in order, along with any buffered run that followed;
    /// acknowledge the advanced watermark.
    Delivered,
    /// Out of order; buffered. Acknowledge the unchanged watermark so the
    /// sender can infer the gap.
    Buffered,
    /// Duplicate of an already-buffered segment; acknowledge the unchanged
    /// watermark.
    Duplicate,
    /// Below the watermark; dropped. Acknowledge the unchanged watermark in
    /// case the sender missed an earlier acknowledgment.
    Stale,
    /// The application cannot take the bytes right now; dropped without
    /// acknowledgment; the peer's retransmission redelivers.
    Deferred,
    /// No receive-window credit; dropped without acknowledgment.
    WindowFull,
}

impl DataOutcome {
    /// Whether the engine should respond with an acknowledgment.
    pub fn should_ack(self) -> bool {
        matches!(
            self,
            Self::Delivered | Self::Buffered | Self::Duplicate | Self::Stale
        )
    }
}

/// Sorted buffer of out-of-order segments plus the receive watermark.
#[derive(Debug)]
pub struct ReassemblyBuffer {
    /// Next expected sequence number; advances only on in-order delivery.
    watermark: u32,
    /// Receive-window credit in segment units; held by buffered records.
    credit: u32,
    /// Out-of-order segments keyed by sequence number.
    buffered: BTreeMap<u32, Segment>,
}

impl ReassemblyBuffer {
    /// Create an empty buffer with the full window credit available.
    pub fn new(config: &ConnectionConfig) -> Self {
        Self {
            watermark: INITIAL_SEQNO,
            credit: config.recv_window_units(),
            buffered: BTreeMap::new(),
        }
    }

    /// Next expected sequence number.
    pub fn watermark(&self) -> u32 {
        self.watermark
    }

    /// Remaining window credit in segment units.
    pub fn credit(&self) -> u32 {
        self.credit
    }

    /// Count of buffered out-of-order segments.
    pub fn buffered_len(&self) -> usize {
        self.buffered.len()
    }

    /// Accept one validated data segment.
    pub fn on_data<A: Application>(&mut self, segment: Segment, app: &mut A) -> DataOutcome {
        if segment.seqno < self.watermark {
            trace!(
                seqno = segment.seqno,
                watermark = self.watermark,
                "stale segment dropped"
            );
            return DataOutcome::Stale;
        }

        if segment.seqno == self.watermark {
            if !deliver(app, &segment.payload) {
                debug!(seqno = segment.seqno, "application backpressure, delivery deferred");
                return DataOutcome::Deferred;
            }
            self.watermark = self.watermark.wrapping_add(segment.payload.len() as u32);
            self.drain(app);
            return DataOutcome::Delivered;
        }

        if self.buffered.contains_key(&segment.seqno) {
            trace!(seqno = segment.seqno, "duplicate of buffered segment dropped");
            return DataOutcome::Duplicate;
        }
        if self.credit == 0 {
            debug!(seqno = segment.seqno, "receive window exhausted, segment deferred");
            return DataOutcome::WindowFull;
        }

        self.credit -= 1;
        trace!(
            seqno = segment.seqno,
            watermark = self.watermark,
            "segment buffered out of order"
        );
        self.buffered.insert(segment.seqno, segment);
        DataOutcome::Buffered
    }

    /// Deliver buffered records that now sit exactly at the watermark.
    ///
    /// Stops at a gap, or when the application runs out of capacity; an
    /// undeliverable record stays buffered so the bytes are never lost.
    pub fn drain<A: Application>(&mut self, app: &mut A) {
        while let Some(entry) = self.buffered.first_entry() {
            if *entry.key() != self.watermark {
                break;
            }
            if !deliver(app, &entry.get().payload) {
                break;
            }
            let segment = entry.remove();
            self.credit += 1;
            self.watermark = self.watermark.wrapping_add(segment.payload.len() as u32);
        }
    }

    /// Advance the watermark past a peer FIN, which consumes one sequence
    /// unit. Returns the new watermark (the value to acknowledge).
    pub fn on_fin(&mut self, fin_seqno: u32) -> u32 {
        let past_fin = fin_seqno.wrapping_add(1);
        if past_fin > self.watermark {
            self.watermark = past_fin;
        }
        self.watermark
    }
}

fn deliver<A: Application>(app: &mut A, bytes: &[u8]) -> bool {
    app.capacity() >= bytes.len() && app.deliver(bytes).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::constants::MAX_SEGMENT_DATA_SIZE;
    use crate::transport::mock::MockApplication;

    fn buffer(window_units: usize) -> ReassemblyBuffer {
        ReassemblyBuffer::new(&ConnectionConfig {
            recv_window: window_units * MAX_SEGMENT_DATA_SIZE,
            ..ConnectionConfig::default()
        })
    }

    fn seg(seqno: u32, payload: &[u8]) -> Segment {
        Segment::data(seqno, 1, payload.to_vec())
    }

    #[test]
    fn test_in_order_delivery() {
        let mut buf = buffer(1);
        let mut app = MockApplication::new();

        assert_eq!(buf.on_data(seg(1, b"AAAA"), &mut app), DataOutcome::Delivered);
        assert_eq!(buf.on_data(seg(5, b"BBBB"), &mut app), DataOutcome::Delivered);

        assert_eq!(app.inbound, b"AAAABBBB");
        assert_eq!(buf.watermark(), 9);
    }

    #[test]
    fn test_out_of_order_arrival_9_1_5() {
        let mut buf = buffer(4);
        let mut app = MockApplication::new();

        assert_eq!(buf.on_data(seg(9, b"CCCC"), &mut app), DataOutcome::Buffered);
        assert_eq!(buf.on_data(seg(1, b"AAAA"), &mut app), DataOutcome::Delivered);
        // 9 is still gapped behind 5.
        assert_eq!(buf.watermark(), 5);
        assert_eq!(buf.on_data(seg(5, b"BBBB"), &mut app), DataOutcome::Delivered);

        assert_eq!(app.inbound, b"AAAABBBBCCCC");
        assert_eq!(buf.watermark(), 13);
        assert_eq!(buf.buffered_len(), 0);
    }

    #[test]
    fn test_every_arrival_permutation_reassembles() {
        let segments = [(1u32, b"AAAA"), (5, b"BBBB"), (9, b"CCCC")];
        let orders = [
            [0, 1, 2],
            [0, 2, 1],
            [1, 0, 2],
            [1, 2, 0],
            [2, 0, 1],
            [2, 1, 0],
        ];

        for order in orders {
            let mut buf = buffer(4);
            let mut app = MockApplication::new();
            for index in order {
                let (seqno, payload) = segments[index];
                buf.on_data(seg(seqno, payload), &mut app);
            }
            assert_eq!(app.inbound, b"AAAABBBBCCCC", "arrival order {order:?}");
            assert_eq!(buf.watermark(), 13);
        }
    }

    #[test]
    fn test_duplicates_contribute_nothing() {
        let mut buf = buffer(4);
        let mut app = MockApplication::new();

        buf.on_data(seg(5, b"BBBB"), &mut app);
        assert_eq!(buf.on_data(seg(5, b"BBBB"), &mut app), DataOutcome::Duplicate);
        assert_eq!(buf.credit(), 3);

        buf.on_data(seg(1, b"AAAA"), &mut app);
        assert_eq!(buf.on_data(seg(1, b"AAAA"), &mut app), DataOutcome::Stale);

        assert_eq!(app.inbound, b"AAAABBBB");
    }

    #[test]
    fn test_stale_segment_is_a_no_op() {
        let mut buf = buffer(1);
        let mut app = MockApplication::new();

        buf.on_data(seg(1, b"AAAA"), &mut app);
        let outcome = buf.on_data(seg(1, b"AAAA"), &mut app);

        assert_eq!(outcome, DataOutcome::Stale);
        // Still acknowledged, so a sender whose ack was lost can retire.
        assert!(outcome.should_ack());
        assert_eq!(buf.watermark(), 5);
        assert_eq!(buf.buffered_len(), 0);
        assert_eq!(app.inbound, b"AAAA");
    }

    #[test]
    fn test_backpressure_defers_in_order_segment() {
        let mut buf = buffer(1);
        let mut app = MockApplication::with_capacity(2);

        let outcome = buf.on_data(seg(1, b"AAAA"), &mut app);

        assert_eq!(outcome, DataOutcome::Deferred);
        assert!(!outcome.should_ack());
        assert_eq!(buf.watermark(), 1);
        assert!(app.inbound.is_empty());

        // The peer retransmits; capacity has been freed in the meantime.
        app.capacity = 4;
        assert_eq!(buf.on_data(seg(1, b"AAAA"), &mut app), DataOutcome::Delivered);
        assert_eq!(app.inbound, b"AAAA");
    }

    #[test]
    fn test_backpressure_retains_buffered_record() {
        let mut buf = buffer(2);
        let mut app = MockApplication::with_capacity(4);

        buf.on_data(seg(5, b"BBBB"), &mut app);
        // Delivering 1 exhausts the capacity, so 5 must stay buffered.
        assert_eq!(buf.on_data(seg(1, b"AAAA"), &mut app), DataOutcome::Delivered);
        assert_eq!(app.inbound, b"AAAA");
        assert_eq!(buf.watermark(), 5);
        assert_eq!(buf.buffered_len(), 1);

        // A later event finds capacity again and drains the retained record.
        app.capacity = 4;
        buf.drain(&mut app);
        assert_eq!(app.inbound, b"AAAABBBB");
        assert_eq!(buf.watermark(), 9);
        assert_eq!(buf.buffered_len(), 0);
        assert_eq!(buf.credit(), 2);
    }

    #[test]
    fn test_window_exhaustion_defers_silently() {
        let mut buf = buffer(1);
        let mut app = MockApplication::new();

        assert_eq!(buf.on_data(seg(5, b"BBBB"), &mut app), DataOutcome::Buffered);
        let outcome = buf.on_data(seg(9, b"CCCC"), &mut app);

        assert_eq!(outcome, DataOutcome::WindowFull);
        assert!(!outcome.should_ack());
        assert_eq!(buf.buffered_len(), 1);
    }

    #[test]
    fn test_credit_restored_as_watermark_advances() {
        let mut buf = buffer(2);
        let mut app = MockApplication::new();

        buf.on_data(seg(5, b"BBBB"), &mut app);
        buf.on_data(seg(9, b"CCCC"), &mut app);
        assert_eq!(buf.credit(), 0);

        buf.on_data(seg(1, b"AAAA"), &mut app);
        assert_eq!(buf.credit(), 2);
        assert_eq!(app.inbound, b"AAAABBBBCCCC");
    }

    #[test]
    fn test_fin_advances_watermark_once() {
        let mut buf = buffer(1);
        let mut app = MockApplication::new();

        buf.on_data(seg(1, b"AAAA"), &mut app);
        assert_eq!(buf.on_fin(5), 6);

        // A retransmitted FIN must not regress the watermark.
        assert_eq!(buf.on_fin(5), 6);
        assert_eq!(buf.watermark(), 6);
    }
}
