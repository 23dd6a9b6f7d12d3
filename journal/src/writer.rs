//! Single-producer append side of the journal

use crate::codec;
use crate::error::JournalError;
use crate::frame::{
    FRAME_HEADER_SIZE, FrameHeader, FrameKind, PAGE_HEADER_SIZE, PAGE_MAGIC, PAGE_VERSION,
    PageHeader, align8,
};
use common::{Event, SourceId, Ts};
use memmap2::MmapMut;
use std::fs::OpenOptions;
use std::path::Path;
use std::sync::atomic::Ordering;
use tracing::info;

/// Appends frames into a mapped page and publishes them with a release
/// store on the page cursor
///
/// Writer monopoly is enforced by construction: exactly one instance is
/// created per file and it is not `Clone`. Nothing on the append path
/// allocates or enters the kernel.
pub struct JournalWriter {
    mmap: MmapMut,
    page_size: usize,
    write_pos: usize,
    next_seq: u64,
    scratch: Box<[u8]>,
}

impl JournalWriter {
    /// Create a journal file of `page_size` bytes, truncating any
    /// previous file at `path`
    pub fn create(path: &Path, page_size: usize) -> Result<Self, JournalError> {
        if page_size < PAGE_HEADER_SIZE + 2 * FRAME_HEADER_SIZE {
            return Err(JournalError::InvalidPage(format!(
                "page size {page_size} too small for a single frame"
            )));
        }
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)?;
        file.set_len(page_size as u64)?;
        // SAFETY: the file is exclusively owned until readers attach and
        // stays at the length set above.
        let mut mmap = unsafe { MmapMut::map_mut(&file)? };
        #[cfg(target_os = "linux")]
        if let Err(e) = mmap.advise(memmap2::Advice::HugePage) {
            tracing::debug!(error = %e, "huge-page advise not honored");
        }

        use byteorder::{ByteOrder, LittleEndian};
        LittleEndian::write_u64(&mut mmap[0..8], PAGE_MAGIC);
        LittleEndian::write_u32(&mut mmap[8..12], PAGE_VERSION);
        LittleEndian::write_u32(&mut mmap[12..16], page_size as u32);
        LittleEndian::write_u64(&mut mmap[32..40], Ts::now().as_nanos());

        let writer = Self {
            mmap,
            page_size,
            write_pos: PAGE_HEADER_SIZE,
            next_seq: 0,
            scratch: vec![0u8; codec::MAX_PAYLOAD].into_boxed_slice(),
        };
        writer
            .page()
            .write_cursor
            .store(PAGE_HEADER_SIZE as u64, Ordering::Release);
        info!(path = %path.display(), page_size, "created journal");
        Ok(writer)
    }

    fn page(&self) -> &PageHeader {
        // SAFETY: the map is page-aligned and at least PAGE_HEADER_SIZE
        // bytes; PageHeader is repr(C, align(64)).
        unsafe { &*self.mmap.as_ptr().cast::<PageHeader>() }
    }

    /// Sequence number the next frame will carry
    #[must_use]
    pub const fn next_seq(&self) -> u64 {
        self.next_seq
    }

    /// Append one frame; returns the sequence number it was stamped with
    ///
    /// The payload is copied first, then the frame header, then the
    /// cursor is published with a release store, so a reader that
    /// acquires the new cursor always observes a complete frame.
    pub fn append(
        &mut self,
        kind: FrameKind,
        source: SourceId,
        ts: Ts,
        payload: &[u8],
    ) -> Result<u64, JournalError> {
        let need = FRAME_HEADER_SIZE + align8(payload.len());
        let capacity = self.page_size - PAGE_HEADER_SIZE - FRAME_HEADER_SIZE;
        if need > capacity {
            return Err(JournalError::FrameTooLarge {
                len: payload.len(),
                max: capacity - FRAME_HEADER_SIZE,
            });
        }
        // A sentinel header must always fit after this frame.
        if self.write_pos + need + FRAME_HEADER_SIZE > self.page_size {
            self.wrap();
        }

        let seq = self.next_seq;
        self.next_seq += 1;

        let crc = crc32fast::hash(payload);
        let start = self.write_pos;
        let data_start = start + FRAME_HEADER_SIZE;
        self.mmap[data_start..data_start + payload.len()].copy_from_slice(payload);

        let header = FrameHeader {
            len: payload.len() as u32,
            kind: kind as u16,
            source: source.0,
            seq,
            ts_ns: ts.as_nanos(),
            crc,
        };
        header.encode(&mut self.mmap[start..start + FRAME_HEADER_SIZE]);

        self.write_pos = start + need;
        self.page()
            .write_cursor
            .store(self.write_pos as u64, Ordering::Release);
        Ok(seq)
    }

    /// Encode a canonical event into the internal scratch buffer and
    /// append it
    pub fn append_event(
        &mut self,
        source: SourceId,
        ingest_ts: Ts,
        event: &Event,
    ) -> Result<u64, JournalError> {
        let mut scratch = std::mem::take(&mut self.scratch);
        let result = codec::encode_event(event, &mut scratch);
        let appended = match result {
            Ok((kind, len)) => self.append(kind, source, ingest_ts, &scratch[..len]),
            Err(e) => Err(e),
        };
        self.scratch = scratch;
        appended
    }

    /// Stamp the end-of-page sentinel and continue at the page start
    fn wrap(&mut self) {
        let seq = self.next_seq;
        self.next_seq += 1;
        let header = FrameHeader {
            len: 0,
            kind: FrameKind::Wrap as u16,
            source: SourceId::LOCAL.0,
            seq,
            ts_ns: Ts::now().as_nanos(),
            crc: 0,
        };
        let start = self.write_pos;
        header.encode(&mut self.mmap[start..start + FRAME_HEADER_SIZE]);
        self.write_pos = PAGE_HEADER_SIZE;
        self.page()
            .write_cursor
            .store(self.write_pos as u64, Ordering::Release);
    }

    /// Number of times the writer can still fit `len` payload bytes
    /// before the next wrap
    #[must_use]
    pub fn remaining_before_wrap(&self, len: usize) -> usize {
        let need = FRAME_HEADER_SIZE + align8(len);
        let mut pos = self.write_pos;
        let mut count = 0;
        while pos + need + FRAME_HEADER_SIZE <= self.page_size {
            pos += need;
            count += 1;
        }
        count
    }

    /// Flush the mapping to disk; never called on the hot path
    pub fn flush(&self) -> Result<(), JournalError> {
        self.mmap.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::validate_page;
    use tempfile::TempDir;

    #[test]
    fn create_initializes_header() -> Result<(), JournalError> {
        let dir = TempDir::new()?;
        let path = dir.path().join("test.journal");
        let writer = JournalWriter::create(&path, 1024 * 1024)?;
        assert_eq!(validate_page(&writer.mmap[..])?, 1024 * 1024);
        assert_eq!(
            writer.page().write_cursor.load(Ordering::Acquire),
            PAGE_HEADER_SIZE as u64
        );
        Ok(())
    }

    #[test]
    fn frames_are_aligned() -> Result<(), JournalError> {
        let dir = TempDir::new()?;
        let path = dir.path().join("test.journal");
        let mut writer = JournalWriter::create(&path, 1024 * 1024)?;
        for len in [1usize, 7, 8, 13, 96] {
            let payload = vec![0xAB; len];
            writer.append(FrameKind::Ticker, SourceId::new(1), Ts::now(), &payload)?;
            assert_eq!(writer.write_pos % 8, 0);
        }
        Ok(())
    }

    #[test]
    fn oversized_payload_is_rejected() -> Result<(), JournalError> {
        let dir = TempDir::new()?;
        let path = dir.path().join("test.journal");
        let mut writer = JournalWriter::create(&path, 4096)?;
        let payload = vec![0u8; 8192];
        let err = writer
            .append(FrameKind::Ticker, SourceId::new(1), Ts::now(), &payload)
            .unwrap_err();
        assert!(matches!(err, JournalError::FrameTooLarge { .. }));
        Ok(())
    }
}
