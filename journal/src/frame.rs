//! Fixed wire layout of the journal page and its frames
//!
//! All integers little-endian, floats IEEE-754 double, strings
//! fixed-length NUL-padded byte arrays. Every frame starts at an
//! 8-byte-aligned offset.

use byteorder::{ByteOrder, LittleEndian};
use crate::error::JournalError;
use std::sync::atomic::AtomicU64;

/// Magic stamped at offset 0 of every journal file (`TICKBUS1`)
pub const PAGE_MAGIC: u64 = 0x5449_434b_4255_5331;

/// Layout version; readers refuse a mismatch
pub const PAGE_VERSION: u32 = 1;

/// Size of the page header; frames start here
pub const PAGE_HEADER_SIZE: usize = 64;

/// Size of every frame header
pub const FRAME_HEADER_SIZE: usize = 32;

/// Round a payload length up to the 8-byte frame alignment
#[must_use]
pub const fn align8(len: usize) -> usize {
    (len + 7) & !7
}

/// Page header: one per mapped file, cache-line aligned
///
/// The writer owns `write_cursor` (byte offset of the next free slot,
/// published with release stores). `read_hint` is advisory only; readers
/// may stamp their progress there for observability.
#[repr(C, align(64))]
pub struct PageHeader {
    /// [`PAGE_MAGIC`]
    pub magic: u64,
    /// [`PAGE_VERSION`]
    pub version: u32,
    /// Total file size in bytes, header included
    pub page_size: u32,
    /// Byte offset of the next free slot
    pub write_cursor: AtomicU64,
    /// Advisory reader progress
    pub read_hint: AtomicU64,
    /// Creation wall-clock time in nanoseconds
    pub created_ns: u64,
    _pad: [u8; 24],
}

const _: () = assert!(std::mem::size_of::<PageHeader>() == PAGE_HEADER_SIZE);

/// Frame type tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum FrameKind {
    /// Ticker snapshot
    Ticker = 1,
    /// Public trade
    Trade = 2,
    /// Order book snapshot
    OrderBook = 3,
    /// Confirmed kline
    Kline = 4,
    /// Funding rate update
    Funding = 5,
    /// Order lifecycle transition
    Order = 6,
    /// Position update
    Position = 7,
    /// Balance update
    Account = 8,
    /// Session lifecycle notification
    Session = 9,
    /// Inbound command
    Command = 10,
    /// End-of-page sentinel: the next frame is at the page start
    Wrap = 0xFFFF,
}

impl FrameKind {
    /// Decode the wire tag
    #[must_use]
    pub const fn from_u16(tag: u16) -> Option<Self> {
        match tag {
            1 => Some(Self::Ticker),
            2 => Some(Self::Trade),
            3 => Some(Self::OrderBook),
            4 => Some(Self::Kline),
            5 => Some(Self::Funding),
            6 => Some(Self::Order),
            7 => Some(Self::Position),
            8 => Some(Self::Account),
            9 => Some(Self::Session),
            10 => Some(Self::Command),
            0xFFFF => Some(Self::Wrap),
            _ => None,
        }
    }
}

/// Frame header preceding every payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    /// Payload length in bytes, header excluded, before alignment padding
    pub len: u32,
    /// Frame type tag
    pub kind: u16,
    /// Session id of the producer
    pub source: u16,
    /// Writer-assigned sequence, strictly increasing across the file
    pub seq: u64,
    /// Nanosecond timestamp stamped by the producer
    pub ts_ns: u64,
    /// CRC32 of the payload bytes
    pub crc: u32,
}

impl FrameHeader {
    /// Serialize into a 32-byte slice
    pub fn encode(&self, buf: &mut [u8]) {
        debug_assert!(buf.len() >= FRAME_HEADER_SIZE);
        LittleEndian::write_u32(&mut buf[0..4], self.len);
        LittleEndian::write_u16(&mut buf[4..6], self.kind);
        LittleEndian::write_u16(&mut buf[6..8], self.source);
        LittleEndian::write_u64(&mut buf[8..16], self.seq);
        LittleEndian::write_u64(&mut buf[16..24], self.ts_ns);
        LittleEndian::write_u32(&mut buf[24..28], self.crc);
        LittleEndian::write_u32(&mut buf[28..32], 0);
    }

    /// Deserialize from a 32-byte slice
    #[must_use]
    pub fn decode(buf: &[u8]) -> Self {
        debug_assert!(buf.len() >= FRAME_HEADER_SIZE);
        Self {
            len: LittleEndian::read_u32(&buf[0..4]),
            kind: LittleEndian::read_u16(&buf[4..6]),
            source: LittleEndian::read_u16(&buf[6..8]),
            seq: LittleEndian::read_u64(&buf[8..16]),
            ts_ns: LittleEndian::read_u64(&buf[16..24]),
            crc: LittleEndian::read_u32(&buf[24..28]),
        }
    }
}

/// Validate the mapped page header against this build's layout
pub(crate) fn validate_page(buf: &[u8]) -> Result<u32, JournalError> {
    if buf.len() < PAGE_HEADER_SIZE {
        return Err(JournalError::InvalidPage(
            "journal file shorter than page header".to_string(),
        ));
    }
    let magic = LittleEndian::read_u64(&buf[0..8]);
    if magic != PAGE_MAGIC {
        return Err(JournalError::InvalidPage(format!(
            "bad journal magic {magic:#018x}"
        )));
    }
    let version = LittleEndian::read_u32(&buf[8..12]);
    if version != PAGE_VERSION {
        return Err(JournalError::InvalidPage(format!(
            "journal version {version} incompatible with {PAGE_VERSION}"
        )));
    }
    let page_size = LittleEndian::read_u32(&buf[12..16]);
    if page_size as usize != buf.len() {
        return Err(JournalError::InvalidPage(format!(
            "journal header claims {page_size} bytes, file has {}",
            buf.len()
        )));
    }
    Ok(page_size)
}
