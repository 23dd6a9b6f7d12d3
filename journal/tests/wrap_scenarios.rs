//! Full-page wrap and overrun behavior over a real mapped file

use common::{SourceId, Ts};
use journal::{FrameKind, JournalError, JournalReader, JournalWriter};
use tempfile::TempDir;

const PAGE: usize = 1024 * 1024;
// 160-byte payloads make each frame exactly 192 bytes with its header.
const PAYLOAD: usize = 160;
const FRAMES: usize = 6000;

#[test]
fn one_mib_page_wraps_exactly_once_for_6000_frames() -> Result<(), JournalError> {
    let dir = TempDir::new()?;
    let path = dir.path().join("wrap.journal");
    let mut writer = JournalWriter::create(&path, PAGE)?;
    let mut reader = JournalReader::open(&path)?;

    let per_lap = writer.remaining_before_wrap(PAYLOAD);
    assert!(per_lap < FRAMES && FRAMES < 2 * per_lap, "page sized to wrap once");

    let mut read = 0usize;
    let mut sentinels = 0u64;
    for i in 0..FRAMES {
        let payload = [i as u8; PAYLOAD];
        writer.append(
            FrameKind::Ticker,
            SourceId::new(1),
            Ts::from_nanos(i as u64),
            &payload,
        )?;
        // Keep up with the writer so nothing is lost.
        while let Some(frame) = reader.try_next()? {
            assert_eq!(frame.payload[0], read as u8);
            assert_eq!(frame.payload.len(), PAYLOAD);
            // Data seqs skip one number at each wrap sentinel.
            sentinels = frame.header.seq - read as u64;
            read += 1;
        }
    }

    assert_eq!(read, FRAMES);
    assert_eq!(sentinels, 1, "writer wrapped exactly once");
    Ok(())
}

#[test]
fn paused_reader_observes_lag_with_overrun_gap() -> Result<(), JournalError> {
    let dir = TempDir::new()?;
    let path = dir.path().join("lag.journal");
    let mut writer = JournalWriter::create(&path, PAGE)?;
    let mut reader = JournalReader::open(&path)?;

    // The reader pauses for the entire run; the writer laps it.
    for i in 0..FRAMES {
        writer.append(
            FrameKind::Ticker,
            SourceId::new(1),
            Ts::from_nanos(i as u64),
            &[0u8; PAYLOAD],
        )?;
    }

    let err = loop {
        match reader.try_next() {
            Ok(Some(_)) => {}
            Ok(None) => panic!("reader drained without observing lag"),
            Err(e) => break e,
        }
    };
    match err {
        JournalError::Lag { expected, found } => {
            assert!(found > expected, "gap reports the overrun");
        }
        other => panic!("expected JournalLag, got {other}"),
    }
    Ok(())
}

#[test]
fn reader_at_sentinel_follows_to_page_start() -> Result<(), JournalError> {
    let dir = TempDir::new()?;
    let path = dir.path().join("sentinel.journal");
    let mut writer = JournalWriter::create(&path, PAGE)?;
    let mut reader = JournalReader::open(&path)?;

    let per_lap = writer.remaining_before_wrap(PAYLOAD);
    // Land the writer exactly at the wrap point, reader fully caught up.
    for i in 0..per_lap {
        writer.append(
            FrameKind::Ticker,
            SourceId::new(1),
            Ts::from_nanos(i as u64),
            &[3u8; PAYLOAD],
        )?;
    }
    while reader.try_next()?.is_some() {}

    // The next append stamps the sentinel and lands at the page start.
    writer.append(FrameKind::Ticker, SourceId::new(1), Ts::from_nanos(0), &[9u8; PAYLOAD])?;
    let frame = reader.try_next()?.expect("frame after the sentinel");
    assert_eq!(frame.payload, vec![9u8; PAYLOAD]);
    assert!(reader.try_next()?.is_none());
    Ok(())
}
