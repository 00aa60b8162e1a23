//! Test doubles for the collaborator traits.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use crate::core::{Application, Channel, DeliverError, Pull};

use super::segment::Segment;

/// Channel that records every transmitted datagram.
#[derive(Debug, Default)]
pub struct MockChannel {
    /// Transmitted datagrams, in order.
    pub sent: Vec<Vec<u8>>,
    /// Set once `release` has been called.
    pub released: bool,
}

impl MockChannel {
    /// Decode the `index`-th transmitted datagram.
    pub fn segment(&self, index: usize) -> Segment {
        Segment::decode(&self.sent[index]).expect("transmitted segment must decode")
    }

    /// Decode the most recently transmitted datagram.
    pub fn last_segment(&self) -> Segment {
        self.segment(self.sent.len() - 1)
    }
}

impl Channel for MockChannel {
    fn transmit(&mut self, segment: &[u8]) {
        self.sent.push(segment.to_vec());
    }

    fn release(&mut self) {
        self.released = true;
    }
}

/// Cloneable handle to a [`MockChannel`], for tests that must observe the
/// channel after handing it to a connection.
#[derive(Debug, Clone, Default)]
pub struct SharedChannel(pub Rc<RefCell<MockChannel>>);

impl Channel for SharedChannel {
    fn transmit(&mut self, segment: &[u8]) {
        self.0.borrow_mut().transmit(segment);
    }

    fn release(&mut self) {
        self.0.borrow_mut().release();
    }
}

/// Application stream with scripted outbound chunks and a bounded inbound
/// buffer.
#[derive(Debug)]
pub struct MockApplication {
    /// Chunks handed out by `pull`, in order.
    pub outbound: VecDeque<Vec<u8>>,
    /// Once the outbound chunks run dry, `pull` reports end-of-input.
    pub outbound_finished: bool,
    /// Bytes accepted by `deliver`, in order.
    pub inbound: Vec<u8>,
    /// Remaining inbound capacity; consumed by `deliver`.
    pub capacity: usize,
    /// Set once `deliver_eof` has been called.
    pub eof: bool,
}

impl Default for MockApplication {
    fn default() -> Self {
        Self {
            outbound: VecDeque::new(),
            outbound_finished: false,
            inbound: Vec::new(),
            capacity: usize::MAX,
            eof: false,
        }
    }
}

impl MockApplication {
    /// Application with nothing to send and unbounded inbound capacity.
    pub fn new() -> Self {
        Self::default()
    }

    /// Application with bounded inbound capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity,
            ..Self::default()
        }
    }

    /// Queue one outbound chunk.
    pub fn queue_outbound(&mut self, bytes: &[u8]) {
        self.outbound.push_back(bytes.to_vec());
    }
}

impl Application for MockApplication {
    fn pull(&mut self, buf: &mut [u8]) -> Pull {
        match self.outbound.pop_front() {
            Some(chunk) => {
                let n = chunk.len().min(buf.len());
                buf[..n].copy_from_slice(&chunk[..n]);
                Pull::Data(n)
            }
            None if self.outbound_finished => Pull::End,
            None => Pull::Data(0),
        }
    }

    fn deliver(&mut self, bytes: &[u8]) -> Result<(), DeliverError> {
        if self.capacity < bytes.len() {
            return Err(DeliverError);
        }
        self.capacity -= bytes.len();
        self.inbound.extend_from_slice(bytes);
        Ok(())
    }

    fn capacity(&self) -> usize {
        self.capacity
    }

    fn deliver_eof(&mut self) {
        self.eof = true;
    }
}
