//! Segment framing, validation, and the internet checksum.
//!
//! Wire format (all integers big-endian):
//!
//! ```text
//! +0   seqno   (u32)
//! +4   ackno   (u32)
//! +8   len     (u16)  header + payload
//! +10  flags   (u32)  bitmask: FIN 0x001, SYN 0x002 (unused), ACK 0x010
//! +14  window  (u16)  advertised window, constant and informational
//! +16  cksum   (u16)  internet checksum, computed with this field zeroed
//! +18  payload (len - 18 bytes)
//! ```
//!
//! Validation on receipt recomputes the checksum and separately compares
//! the declared length against the received byte count; either mismatch
//! discards the segment.

use crate::core::constants::{MAX_SEGMENT_DATA_SIZE, SEGMENT_HEADER_SIZE};
use crate::core::SegmentError;

/// Flag bitmask of a segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SegmentFlags(u32);

impl SegmentFlags {
    /// No flags set.
    pub const NONE: Self = Self(0);
    /// The sender has finished its outbound stream.
    pub const FIN: Self = Self(0x001);
    /// Connection handshake; declared for wire compatibility, never sent.
    pub const SYN: Self = Self(0x002);
    /// The `ackno` field is meaningful.
    pub const ACK: Self = Self(0x010);

    /// Create flags from the raw wire value.
    pub fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    /// Raw wire value.
    pub fn bits(self) -> u32 {
        self.0
    }

    /// Check the FIN bit.
    pub fn is_fin(self) -> bool {
        self.0 & Self::FIN.0 != 0
    }

    /// Check the ACK bit.
    pub fn is_ack(self) -> bool {
        self.0 & Self::ACK.0 != 0
    }

    /// Set the FIN bit.
    pub fn with_fin(self) -> Self {
        Self(self.0 | Self::FIN.0)
    }

    /// Set the ACK bit.
    pub fn with_ack(self) -> Self {
        Self(self.0 | Self::ACK.0)
    }
}

/// One framed unit of the protocol: header plus optional payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    /// Sequence number of the first payload byte.
    pub seqno: u32,
    /// Cumulative acknowledgment: the next byte expected from the peer.
    pub ackno: u32,
    /// Flag bitmask.
    pub flags: SegmentFlags,
    /// Advertised window; serialized as a constant, never interpreted.
    pub window: u16,
    /// Payload bytes (empty for pure acknowledgments and FINs).
    pub payload: Vec<u8>,
}

impl Segment {
    /// Construct a data-bearing segment (ACK flag plus payload).
    pub fn data(seqno: u32, ackno: u32, payload: Vec<u8>) -> Self {
        Self {
            seqno,
            ackno,
            flags: SegmentFlags::ACK,
            window: MAX_SEGMENT_DATA_SIZE as u16,
            payload,
        }
    }

    /// Construct a pure acknowledgment.
    pub fn ack(seqno: u32, ackno: u32) -> Self {
        Self {
            seqno,
            ackno,
            flags: SegmentFlags::ACK,
            window: MAX_SEGMENT_DATA_SIZE as u16,
            payload: Vec::new(),
        }
    }

    /// Construct a FIN.
    pub fn fin(seqno: u32, ackno: u32) -> Self {
        Self {
            seqno,
            ackno,
            flags: SegmentFlags::FIN,
            window: MAX_SEGMENT_DATA_SIZE as u16,
            payload: Vec::new(),
        }
    }

    /// Total wire length.
    pub fn wire_len(&self) -> usize {
        SEGMENT_HEADER_SIZE + self.payload.len()
    }

    /// First sequence number after this segment; a FIN consumes one unit.
    pub fn seq_end(&self) -> u32 {
        let end = self.seqno.wrapping_add(self.payload.len() as u32);
        if self.flags.is_fin() {
            end.wrapping_add(1)
        } else {
            end
        }
    }

    /// Whether this is a pure acknowledgment (ACK set, no payload, no FIN).
    pub fn is_pure_ack(&self) -> bool {
        self.flags.is_ack() && !self.flags.is_fin() && self.payload.is_empty()
    }

    /// Serialize to wire bytes with a freshly computed checksum.
    pub fn encode(&self) -> Vec<u8> {
        debug_assert!(self.payload.len() <= MAX_SEGMENT_DATA_SIZE);

        let len = self.wire_len();
        let mut buf = Vec::with_capacity(len);
        buf.extend_from_slice(&self.seqno.to_be_bytes());
        buf.extend_from_slice(&self.ackno.to_be_bytes());
        buf.extend_from_slice(&(len as u16).to_be_bytes());
        buf.extend_from_slice(&self.flags.bits().to_be_bytes());
        buf.extend_from_slice(&self.window.to_be_bytes());
        buf.extend_from_slice(&0u16.to_be_bytes());
        buf.extend_from_slice(&self.payload);

        let cksum = internet_checksum(&buf);
        buf[16..18].copy_from_slice(&cksum.to_be_bytes());
        buf
    }

    /// Parse and validate wire bytes.
    ///
    /// A segment that fails validation must be discarded without response;
    /// the peer's retransmission timer recovers the loss.
    pub fn decode(raw: &[u8]) -> Result<Self, SegmentError> {
        if raw.len() < SEGMENT_HEADER_SIZE {
            return Err(SegmentError::TooShort {
                expected: SEGMENT_HEADER_SIZE,
                actual: raw.len(),
            });
        }

        let declared = u16::from_be_bytes([raw[8], raw[9]]) as usize;
        if declared != raw.len() {
            return Err(SegmentError::LengthMismatch {
                declared,
                received: raw.len(),
            });
        }

        let received = u16::from_be_bytes([raw[16], raw[17]]);
        let mut scratch = raw.to_vec();
        scratch[16..18].copy_from_slice(&[0, 0]);
        let computed = internet_checksum(&scratch);
        if received != computed {
            return Err(SegmentError::ChecksumMismatch { received, computed });
        }

        Ok(Self {
            seqno: u32::from_be_bytes([raw[0], raw[1], raw[2], raw[3]]),
            ackno: u32::from_be_bytes([raw[4], raw[5], raw[6], raw[7]]),
            flags: SegmentFlags::from_bits(u32::from_be_bytes([
                raw[10], raw[11], raw[12], raw[13],
            ])),
            window: u16::from_be_bytes([raw[14], raw[15]]),
            payload: raw[SEGMENT_HEADER_SIZE..].to_vec(),
        })
    }
}

/// RFC 1071 internet checksum: the one's complement of the one's-complement
/// sum of the data taken as big-endian 16-bit words, an odd trailing byte
/// padded with zero.
pub(crate) fn internet_checksum(data: &[u8]) -> u16 {
    let mut sum: u32 = 0;
    let mut words = data.chunks_exact(2);
    for word in &mut words {
        sum += u32::from(u16::from_be_bytes([word[0], word[1]]));
    }
    if let &[last] = words.remainder() {
        sum += u32::from(u16::from_be_bytes([last, 0]));
    }
    while sum > 0xffff {
        sum = (sum & 0xffff) + (sum >> 16);
    }
    !(sum as u16)
}
