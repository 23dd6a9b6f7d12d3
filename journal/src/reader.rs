//! Many-consumer pull side of the journal

use crate::codec;
use crate::error::JournalError;
use crate::frame::{
    FRAME_HEADER_SIZE, FrameHeader, FrameKind, PAGE_HEADER_SIZE, PageHeader, align8, validate_page,
};
use common::{Event, SourceId, Ts};
use memmap2::MmapMut;
use std::fs::OpenOptions;
use std::path::Path;
use std::sync::atomic::Ordering;
use std::time::Duration;
use tracing::debug;

/// Idle strategy knobs for [`JournalReader`]
#[derive(Debug, Clone)]
pub struct ReaderConfig {
    /// Busy-spin iterations before yielding the CPU
    pub busy_spin_count: u32,
    /// Sleep applied after the spin budget is exhausted
    pub idle_sleep: Duration,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            busy_spin_count: 1000,
            idle_sleep: Duration::from_micros(1),
        }
    }
}

/// One frame as observed by a reader; the payload is copied out of the
/// page so a wrapping writer cannot mutate it under the consumer
#[derive(Debug, Clone)]
pub struct RawFrame {
    /// Decoded frame header
    pub header: FrameHeader,
    /// Payload bytes
    pub payload: Vec<u8>,
}

impl RawFrame {
    /// Producer session id
    #[must_use]
    pub const fn source(&self) -> SourceId {
        SourceId(self.header.source)
    }

    /// Producer timestamp
    #[must_use]
    pub const fn ts(&self) -> Ts {
        Ts::from_nanos(self.header.ts_ns)
    }

    /// Decode the payload into a canonical event
    pub fn decode(&self) -> Result<Event, JournalError> {
        let kind = FrameKind::from_u16(self.header.kind).ok_or_else(|| {
            JournalError::Corrupt(format!("unknown frame kind {}", self.header.kind))
        })?;
        codec::decode_event(kind, &self.payload)
    }
}

/// Cursor-based consumer over a journal file
///
/// Each reader holds only a private cursor; it can never block the
/// writer. If the writer laps a slow reader the sequence-number check
/// (backed by the payload crc) surfaces [`JournalError::Lag`];
/// recovery policy is the consumer's via [`JournalReader::resync`].
pub struct JournalReader {
    mmap: MmapMut,
    page_size: usize,
    local: usize,
    expect_seq: Option<u64>,
    config: ReaderConfig,
}

impl JournalReader {
    /// Attach to a journal file, starting at the beginning of the stream
    pub fn open(path: &Path) -> Result<Self, JournalError> {
        Self::open_with(path, ReaderConfig::default())
    }

    /// Attach with explicit idle-strategy knobs
    pub fn open_with(path: &Path, config: ReaderConfig) -> Result<Self, JournalError> {
        let file = OpenOptions::new().read(true).write(true).open(path)?;
        // SAFETY: the mapping is shared with the writer by design; all
        // cross-process coordination goes through the page atomics.
        let mmap = unsafe { MmapMut::map_mut(&file)? };
        let page_size = validate_page(&mmap[..])? as usize;
        Ok(Self {
            mmap,
            page_size,
            local: PAGE_HEADER_SIZE,
            expect_seq: Some(0),
            config,
        })
    }

    fn page(&self) -> &PageHeader {
        // SAFETY: validated by `validate_page`; the map is page-aligned.
        unsafe { &*self.mmap.as_ptr().cast::<PageHeader>() }
    }

    /// Acquire-load the writer's published cursor
    #[must_use]
    pub fn cursor(&self) -> u64 {
        self.page().write_cursor.load(Ordering::Acquire)
    }

    /// Drop everything published so far and continue from the live
    /// cursor; the next frame observed re-seeds the sequence check
    pub fn resync(&mut self) {
        self.local = self.cursor() as usize;
        self.expect_seq = None;
        debug!(cursor = self.local, "journal reader resynced");
    }

    /// Pull the next frame without blocking
    ///
    /// Returns `Ok(None)` when the reader has consumed everything the
    /// writer published.
    pub fn try_next(&mut self) -> Result<Option<RawFrame>, JournalError> {
        loop {
            let remote = self.cursor() as usize;
            if self.local == remote {
                return Ok(None);
            }

            let header = FrameHeader::decode(&self.mmap[self.local..self.local + FRAME_HEADER_SIZE]);

            if let Some(expected) = self.expect_seq {
                if header.seq != expected {
                    return Err(JournalError::Lag {
                        expected,
                        found: header.seq,
                    });
                }
            }

            if header.kind == FrameKind::Wrap as u16 {
                self.local = PAGE_HEADER_SIZE;
                self.expect_seq = Some(header.seq + 1);
                continue;
            }

            let len = header.len as usize;
            let end = self.local + FRAME_HEADER_SIZE + align8(len);
            if FrameKind::from_u16(header.kind).is_none() || end > self.page_size {
                // Garbage where a frame should be: the writer lapped us
                // mid-read and overwrote this region.
                return Err(JournalError::Lag {
                    expected: self.expect_seq.unwrap_or(header.seq),
                    found: header.seq,
                });
            }

            let data_start = self.local + FRAME_HEADER_SIZE;
            let payload = self.mmap[data_start..data_start + len].to_vec();
            if crc32fast::hash(&payload) != header.crc {
                return Err(JournalError::Lag {
                    expected: self.expect_seq.unwrap_or(header.seq),
                    found: header.seq,
                });
            }

            self.local = end;
            self.expect_seq = Some(header.seq + 1);
            self.page()
                .read_hint
                .store(self.local as u64, Ordering::Relaxed);
            return Ok(Some(RawFrame { header, payload }));
        }
    }

    /// Pull the next frame, busy-spinning then sleeping while the
    /// journal is drained
    pub fn next_blocking(&mut self) -> Result<RawFrame, JournalError> {
        let mut spins = 0u32;
        loop {
            if let Some(frame) = self.try_next()? {
                return Ok(frame);
            }
            spins += 1;
            if spins >= self.config.busy_spin_count {
                spins = 0;
                std::thread::sleep(self.config.idle_sleep);
            } else {
                std::hint::spin_loop();
            }
        }
    }
}
