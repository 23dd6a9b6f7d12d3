//! Journal append latency benchmark

use common::{Event, Px, Qty, SourceId, TickerEvent, Ts, Venue};
use criterion::{Criterion, criterion_group, criterion_main};
use journal::{FrameKind, JournalWriter};
use tempfile::TempDir;

fn ticker() -> Event {
    Event::Ticker(TickerEvent {
        venue: Venue::Okx,
        symbol: "BTC-USDT-SWAP".to_string(),
        last: Px::new(50_000.0),
        bid: Some(Px::new(49_999.5)),
        ask: Some(Px::new(50_000.5)),
        high_24h: Some(Px::new(51_000.0)),
        low_24h: Some(Px::new(48_500.0)),
        open_24h: Some(Px::new(49_000.0)),
        volume_24h: Some(Qty::new(12_345.0)),
        venue_ts: 1_700_000_000_000,
    })
}

fn bench_append(c: &mut Criterion) {
    let dir = TempDir::new().expect("temp dir");
    let path = dir.path().join("bench.journal");
    let mut writer = JournalWriter::create(&path, 128 * 1024 * 1024).expect("create journal");
    let event = ticker();
    let ts = Ts::now();

    c.bench_function("append_ticker_event", |b| {
        b.iter(|| {
            writer
                .append_event(SourceId::new(1), ts, &event)
                .expect("append")
        });
    });

    let raw = [0u8; 160];
    c.bench_function("append_raw_160b", |b| {
        b.iter(|| {
            writer
                .append(FrameKind::Ticker, SourceId::new(1), ts, &raw)
                .expect("append")
        });
    });
}

criterion_group!(benches, bench_append);
criterion_main!(benches);
