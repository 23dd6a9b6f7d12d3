//! Fixed-layout payload codecs for every canonical event
//!
//! Each event type encodes into a bounded little-endian layout so the
//! writer's space reservation is pure arithmetic. Strings are truncated
//! to their field width and NUL-padded. `decode(encode(e)) == e` for
//! every event whose strings fit their fields.

use crate::error::JournalError;
use crate::frame::FrameKind;
use byteorder::{ByteOrder, LittleEndian};
use common::{
    AccountEvent, BookLevel, CommandEvent, Event, FundingRateEvent, KlineEvent, Order,
    OrderBookEvent, OrderState, OrderType, PositionEvent, Px, Qty, SessionEvent, SessionState,
    Side, SourceId, TickerEvent, TimeInForce, TradeEvent, Venue,
};

/// Width of symbol fields
pub const SYM_LEN: usize = 32;
/// Width of id fields (trade id, order ids)
pub const ID_LEN: usize = 32;
/// Width of channel tags
pub const CHAN_LEN: usize = 16;
/// Width of currency codes
pub const CCY_LEN: usize = 16;
/// Width of kline interval tags
pub const INTERVAL_LEN: usize = 8;
/// Width of instrument type tags
pub const INST_LEN: usize = 8;
/// Width of preserved decimal strings
pub const TEXT_LEN: usize = 24;
/// Width of session detail text
pub const DETAIL_LEN: usize = 64;
/// Book depth cap per side; deeper venue channels are truncated upstream
pub const MAX_BOOK_LEVELS: usize = 50;

/// Upper bound of any payload this codec emits
pub const MAX_PAYLOAD: usize = 2048;

const SIDE_NONE: u8 = 0xFF;

struct Enc<'a> {
    buf: &'a mut [u8],
    pos: usize,
}

impl<'a> Enc<'a> {
    fn new(buf: &'a mut [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    fn u8(&mut self, v: u8) {
        self.buf[self.pos] = v;
        self.pos += 1;
    }

    fn u16(&mut self, v: u16) {
        LittleEndian::write_u16(&mut self.buf[self.pos..self.pos + 2], v);
        self.pos += 2;
    }

    fn u64(&mut self, v: u64) {
        LittleEndian::write_u64(&mut self.buf[self.pos..self.pos + 8], v);
        self.pos += 8;
    }

    fn f64(&mut self, v: f64) {
        LittleEndian::write_f64(&mut self.buf[self.pos..self.pos + 8], v);
        self.pos += 8;
    }

    fn pad(&mut self, n: usize) {
        self.buf[self.pos..self.pos + n].fill(0);
        self.pos += n;
    }

    fn fixed_str(&mut self, s: &str, width: usize) {
        let bytes = s.as_bytes();
        let n = bytes.len().min(width);
        self.buf[self.pos..self.pos + n].copy_from_slice(&bytes[..n]);
        self.buf[self.pos + n..self.pos + width].fill(0);
        self.pos += width;
    }

    fn finish(self) -> usize {
        self.pos
    }
}

struct Dec<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Dec<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    fn need(&self, n: usize) -> Result<(), JournalError> {
        if self.pos + n > self.buf.len() {
            return Err(JournalError::Corrupt(format!(
                "truncated frame payload: need {} bytes at offset {}, have {}",
                n,
                self.pos,
                self.buf.len()
            )));
        }
        Ok(())
    }

    fn u8(&mut self) -> Result<u8, JournalError> {
        self.need(1)?;
        let v = self.buf[self.pos];
        self.pos += 1;
        Ok(v)
    }

    fn u16(&mut self) -> Result<u16, JournalError> {
        self.need(2)?;
        let v = LittleEndian::read_u16(&self.buf[self.pos..self.pos + 2]);
        self.pos += 2;
        Ok(v)
    }

    fn u64(&mut self) -> Result<u64, JournalError> {
        self.need(8)?;
        let v = LittleEndian::read_u64(&self.buf[self.pos..self.pos + 8]);
        self.pos += 8;
        Ok(v)
    }

    fn f64(&mut self) -> Result<f64, JournalError> {
        self.need(8)?;
        let v = LittleEndian::read_f64(&self.buf[self.pos..self.pos + 8]);
        self.pos += 8;
        Ok(v)
    }

    fn skip(&mut self, n: usize) -> Result<(), JournalError> {
        self.need(n)?;
        self.pos += n;
        Ok(())
    }

    fn fixed_str(&mut self, width: usize) -> Result<String, JournalError> {
        self.need(width)?;
        let raw = &self.buf[self.pos..self.pos + width];
        self.pos += width;
        let end = raw.iter().position(|&b| b == 0).unwrap_or(width);
        std::str::from_utf8(&raw[..end])
            .map(str::to_owned)
            .map_err(|e| JournalError::Corrupt(format!("non-utf8 string field: {e}")))
    }
}

fn venue_of(code: u8) -> Result<Venue, JournalError> {
    Venue::from_code(code)
        .ok_or_else(|| JournalError::Corrupt(format!("unknown venue code {code}")))
}

/// Encode an event into `buf`; returns the frame kind and payload length
pub fn encode_event(event: &Event, buf: &mut [u8]) -> Result<(FrameKind, usize), JournalError> {
    debug_assert!(buf.len() >= MAX_PAYLOAD);
    match event {
        Event::Ticker(e) => Ok((FrameKind::Ticker, encode_ticker(e, buf))),
        Event::Trade(e) => Ok((FrameKind::Trade, encode_trade(e, buf))),
        Event::OrderBook(e) => encode_book(e, buf).map(|n| (FrameKind::OrderBook, n)),
        Event::Kline(e) => Ok((FrameKind::Kline, encode_kline(e, buf))),
        Event::Funding(e) => Ok((FrameKind::Funding, encode_funding(e, buf))),
        Event::Order(o) => Ok((FrameKind::Order, encode_order(o, buf))),
        Event::Position(e) => Ok((FrameKind::Position, encode_position(e, buf))),
        Event::Account(e) => Ok((FrameKind::Account, encode_account(e, buf))),
        Event::Session(e) => Ok((FrameKind::Session, encode_session(e, buf))),
        Event::Command(c) => Ok((FrameKind::Command, encode_command(c, buf))),
    }
}

/// Decode a frame payload back into a canonical event
pub fn decode_event(kind: FrameKind, payload: &[u8]) -> Result<Event, JournalError> {
    match kind {
        FrameKind::Ticker => decode_ticker(payload).map(Event::Ticker),
        FrameKind::Trade => decode_trade(payload).map(Event::Trade),
        FrameKind::OrderBook => decode_book(payload).map(Event::OrderBook),
        FrameKind::Kline => decode_kline(payload).map(Event::Kline),
        FrameKind::Funding => decode_funding(payload).map(Event::Funding),
        FrameKind::Order => decode_order(payload).map(Event::Order),
        FrameKind::Position => decode_position(payload).map(Event::Position),
        FrameKind::Account => decode_account(payload).map(Event::Account),
        FrameKind::Session => decode_session(payload).map(Event::Session),
        FrameKind::Command => decode_command(payload).map(Event::Command),
        FrameKind::Wrap => Err(JournalError::Corrupt(
            "wrap sentinel carries no payload".to_string(),
        )),
    }
}

fn encode_ticker(e: &TickerEvent, buf: &mut [u8]) -> usize {
    let mut w = Enc::new(buf);
    w.fixed_str(&e.symbol, SYM_LEN);
    w.u8(e.venue.code());
    let mut flags = 0u8;
    for (bit, present) in [
        e.bid.is_some(),
        e.ask.is_some(),
        e.high_24h.is_some(),
        e.low_24h.is_some(),
        e.open_24h.is_some(),
        e.volume_24h.is_some(),
    ]
    .into_iter()
    .enumerate()
    {
        if present {
            flags |= 1 << bit;
        }
    }
    w.u8(flags);
    w.pad(6);
    w.f64(e.last.as_f64());
    w.f64(e.bid.map_or(0.0, |p| p.as_f64()));
    w.f64(e.ask.map_or(0.0, |p| p.as_f64()));
    w.f64(e.high_24h.map_or(0.0, |p| p.as_f64()));
    w.f64(e.low_24h.map_or(0.0, |p| p.as_f64()));
    w.f64(e.open_24h.map_or(0.0, |p| p.as_f64()));
    w.f64(e.volume_24h.map_or(0.0, |q| q.as_f64()));
    w.u64(e.venue_ts);
    w.finish()
}

fn decode_ticker(payload: &[u8]) -> Result<TickerEvent, JournalError> {
    let mut r = Dec::new(payload);
    let symbol = r.fixed_str(SYM_LEN)?;
    let venue = venue_of(r.u8()?)?;
    let flags = r.u8()?;
    r.skip(6)?;
    let last = Px::new(r.f64()?);
    let opt = |bit: u8, v: f64| (flags & (1 << bit) != 0).then_some(v);
    let bid = opt(0, r.f64()?).map(Px::new);
    let ask = opt(1, r.f64()?).map(Px::new);
    let high_24h = opt(2, r.f64()?).map(Px::new);
    let low_24h = opt(3, r.f64()?).map(Px::new);
    let open_24h = opt(4, r.f64()?).map(Px::new);
    let volume_24h = opt(5, r.f64()?).map(Qty::new);
    let venue_ts = r.u64()?;
    Ok(TickerEvent {
        venue,
        symbol,
        last,
        bid,
        ask,
        high_24h,
        low_24h,
        open_24h,
        volume_24h,
        venue_ts,
    })
}

fn encode_trade(e: &TradeEvent, buf: &mut [u8]) -> usize {
    let mut w = Enc::new(buf);
    w.fixed_str(&e.symbol, SYM_LEN);
    w.u8(e.venue.code());
    w.u8(e.side.map_or(SIDE_NONE, Side::code));
    w.pad(6);
    w.fixed_str(&e.trade_id, ID_LEN);
    w.f64(e.price.as_f64());
    w.f64(e.qty.as_f64());
    w.u64(e.venue_ts);
    w.finish()
}

fn decode_trade(payload: &[u8]) -> Result<TradeEvent, JournalError> {
    let mut r = Dec::new(payload);
    let symbol = r.fixed_str(SYM_LEN)?;
    let venue = venue_of(r.u8()?)?;
    let side_code = r.u8()?;
    let side = if side_code == SIDE_NONE {
        None
    } else {
        Some(Side::from_code(side_code).ok_or_else(|| {
            JournalError::Corrupt(format!("unknown side code {side_code}"))
        })?)
    };
    r.skip(6)?;
    let trade_id = r.fixed_str(ID_LEN)?;
    let price = Px::new(r.f64()?);
    let qty = Qty::new(r.f64()?);
    let venue_ts = r.u64()?;
    Ok(TradeEvent {
        venue,
        symbol,
        trade_id,
        price,
        qty,
        side,
        venue_ts,
    })
}

fn encode_book(e: &OrderBookEvent, buf: &mut [u8]) -> Result<usize, JournalError> {
    if e.bids.len() > MAX_BOOK_LEVELS || e.asks.len() > MAX_BOOK_LEVELS {
        return Err(JournalError::FrameTooLarge {
            len: (e.bids.len() + e.asks.len()) * 16,
            max: MAX_BOOK_LEVELS * 32,
        });
    }
    let mut w = Enc::new(buf);
    w.fixed_str(&e.symbol, SYM_LEN);
    w.u8(e.venue.code());
    w.u8(0);
    w.u16(e.bids.len() as u16);
    w.u16(e.asks.len() as u16);
    w.pad(2);
    w.fixed_str(&e.channel, CHAN_LEN);
    w.u64(e.venue_ts);
    for level in e.bids.iter().chain(e.asks.iter()) {
        w.f64(level.price.as_f64());
        w.f64(level.qty.as_f64());
    }
    Ok(w.finish())
}

fn decode_book(payload: &[u8]) -> Result<OrderBookEvent, JournalError> {
    let mut r = Dec::new(payload);
    let symbol = r.fixed_str(SYM_LEN)?;
    let venue = venue_of(r.u8()?)?;
    r.skip(1)?;
    let n_bids = r.u16()? as usize;
    let n_asks = r.u16()? as usize;
    r.skip(2)?;
    let channel = r.fixed_str(CHAN_LEN)?;
    let venue_ts = r.u64()?;
    if n_bids > MAX_BOOK_LEVELS || n_asks > MAX_BOOK_LEVELS {
        return Err(JournalError::Corrupt(format!(
            "book frame claims {n_bids}x{n_asks} levels"
        )));
    }
    let mut read_side = |n: usize| -> Result<Vec<BookLevel>, JournalError> {
        let mut levels = Vec::with_capacity(n);
        for _ in 0..n {
            let price = Px::new(r.f64()?);
            let qty = Qty::new(r.f64()?);
            levels.push(BookLevel::new(price, qty));
        }
        Ok(levels)
    };
    let bids = read_side(n_bids)?;
    let asks = read_side(n_asks)?;
    Ok(OrderBookEvent {
        venue,
        symbol,
        channel,
        bids,
        asks,
        venue_ts,
    })
}

fn encode_kline(e: &KlineEvent, buf: &mut [u8]) -> usize {
    let mut w = Enc::new(buf);
    w.fixed_str(&e.symbol, SYM_LEN);
    w.u8(e.venue.code());
    w.u8(u8::from(e.confirmed));
    w.pad(6);
    w.fixed_str(&e.interval, INTERVAL_LEN);
    w.f64(e.open.as_f64());
    w.f64(e.high.as_f64());
    w.f64(e.low.as_f64());
    w.f64(e.close.as_f64());
    w.f64(e.volume.as_f64());
    w.u64(e.venue_ts);
    w.finish()
}

fn decode_kline(payload: &[u8]) -> Result<KlineEvent, JournalError> {
    let mut r = Dec::new(payload);
    let symbol = r.fixed_str(SYM_LEN)?;
    let venue = venue_of(r.u8()?)?;
    let confirmed = r.u8()? != 0;
    r.skip(6)?;
    let interval = r.fixed_str(INTERVAL_LEN)?;
    let open = Px::new(r.f64()?);
    let high = Px::new(r.f64()?);
    let low = Px::new(r.f64()?);
    let close = Px::new(r.f64()?);
    let volume = Qty::new(r.f64()?);
    let venue_ts = r.u64()?;
    Ok(KlineEvent {
        venue,
        symbol,
        interval,
        open,
        high,
        low,
        close,
        volume,
        venue_ts,
        confirmed,
    })
}

fn encode_funding(e: &FundingRateEvent, buf: &mut [u8]) -> usize {
    let mut w = Enc::new(buf);
    w.fixed_str(&e.symbol, SYM_LEN);
    w.u8(e.venue.code());
    let mut flags = 0u8;
    for (bit, present) in [
        e.next_funding_rate.is_some(),
        e.next_funding_time.is_some(),
        e.min_funding_rate.is_some(),
        e.max_funding_rate.is_some(),
    ]
    .into_iter()
    .enumerate()
    {
        if present {
            flags |= 1 << bit;
        }
    }
    w.u8(flags);
    w.pad(6);
    w.fixed_str(&e.inst_type, INST_LEN);
    w.f64(e.funding_rate);
    w.f64(e.next_funding_rate.unwrap_or(0.0));
    w.u64(e.funding_time);
    w.u64(e.next_funding_time.unwrap_or(0));
    w.f64(e.min_funding_rate.unwrap_or(0.0));
    w.f64(e.max_funding_rate.unwrap_or(0.0));
    w.u64(e.venue_ts);
    w.finish()
}

fn decode_funding(payload: &[u8]) -> Result<FundingRateEvent, JournalError> {
    let mut r = Dec::new(payload);
    let symbol = r.fixed_str(SYM_LEN)?;
    let venue = venue_of(r.u8()?)?;
    let flags = r.u8()?;
    r.skip(6)?;
    let inst_type = r.fixed_str(INST_LEN)?;
    let funding_rate = r.f64()?;
    let next_rate = r.f64()?;
    let funding_time = r.u64()?;
    let next_time = r.u64()?;
    let min_rate = r.f64()?;
    let max_rate = r.f64()?;
    let venue_ts = r.u64()?;
    let set = |bit: u8| flags & (1 << bit) != 0;
    Ok(FundingRateEvent {
        venue,
        symbol,
        inst_type,
        funding_rate,
        next_funding_rate: set(0).then_some(next_rate),
        funding_time,
        next_funding_time: set(1).then_some(next_time),
        min_funding_rate: set(2).then_some(min_rate),
        max_funding_rate: set(3).then_some(max_rate),
        venue_ts,
    })
}

fn encode_order(o: &Order, buf: &mut [u8]) -> usize {
    let mut w = Enc::new(buf);
    w.u64(o.order_id);
    w.u8(o.venue.code());
    w.u8(o.side.code());
    w.u8(o.order_type.code());
    w.u8(o.state.code());
    let mut flags = 0u8;
    if o.exchange_order_id.is_some() {
        flags |= 1;
    }
    if o.fee.is_some() {
        flags |= 2;
    }
    w.u8(flags);
    w.pad(3);
    w.fixed_str(o.exchange_order_id.as_deref().unwrap_or(""), ID_LEN);
    w.fixed_str(&o.client_order_id, ID_LEN);
    w.fixed_str(&o.symbol, SYM_LEN);
    w.f64(o.price.as_f64());
    w.f64(o.qty.as_f64());
    w.f64(o.filled_qty.as_f64());
    w.f64(o.filled_price.as_f64());
    w.f64(o.fee.unwrap_or(0.0));
    w.u64(o.venue_ts);
    w.fixed_str(&o.price_text, TEXT_LEN);
    w.fixed_str(&o.qty_text, TEXT_LEN);
    w.finish()
}

fn decode_order(payload: &[u8]) -> Result<Order, JournalError> {
    let mut r = Dec::new(payload);
    let order_id = r.u64()?;
    let venue = venue_of(r.u8()?)?;
    let side_code = r.u8()?;
    let side = Side::from_code(side_code)
        .ok_or_else(|| JournalError::Corrupt(format!("unknown side code {side_code}")))?;
    let type_code = r.u8()?;
    let order_type = OrderType::from_code(type_code)
        .ok_or_else(|| JournalError::Corrupt(format!("unknown order type code {type_code}")))?;
    let state_code = r.u8()?;
    let state = OrderState::from_code(state_code)
        .ok_or_else(|| JournalError::Corrupt(format!("unknown state code {state_code}")))?;
    let flags = r.u8()?;
    r.skip(3)?;
    let exchange_order_id = r.fixed_str(ID_LEN)?;
    let client_order_id = r.fixed_str(ID_LEN)?;
    let symbol = r.fixed_str(SYM_LEN)?;
    let price = Px::new(r.f64()?);
    let qty = Qty::new(r.f64()?);
    let filled_qty = Qty::new(r.f64()?);
    let filled_price = Px::new(r.f64()?);
    let fee = r.f64()?;
    let venue_ts = r.u64()?;
    let price_text = r.fixed_str(TEXT_LEN)?;
    let qty_text = r.fixed_str(TEXT_LEN)?;
    Ok(Order {
        order_id,
        exchange_order_id: (flags & 1 != 0).then_some(exchange_order_id),
        client_order_id,
        venue,
        symbol,
        side,
        order_type,
        price,
        qty,
        filled_qty,
        filled_price,
        fee: (flags & 2 != 0).then_some(fee),
        state,
        venue_ts,
        price_text,
        qty_text,
    })
}

fn encode_position(e: &PositionEvent, buf: &mut [u8]) -> usize {
    let mut w = Enc::new(buf);
    w.fixed_str(&e.symbol, SYM_LEN);
    w.u8(e.venue.code());
    w.pad(7);
    w.f64(e.qty);
    w.f64(e.avg_price.as_f64());
    w.f64(e.unrealized_pnl);
    w.f64(e.realized_pnl);
    w.u64(e.ts);
    w.finish()
}

fn decode_position(payload: &[u8]) -> Result<PositionEvent, JournalError> {
    let mut r = Dec::new(payload);
    let symbol = r.fixed_str(SYM_LEN)?;
    let venue = venue_of(r.u8()?)?;
    r.skip(7)?;
    let qty = r.f64()?;
    let avg_price = Px::new(r.f64()?);
    let unrealized_pnl = r.f64()?;
    let realized_pnl = r.f64()?;
    let ts = r.u64()?;
    Ok(PositionEvent {
        venue,
        symbol,
        qty,
        avg_price,
        unrealized_pnl,
        realized_pnl,
        ts,
    })
}

fn encode_account(e: &AccountEvent, buf: &mut [u8]) -> usize {
    let mut w = Enc::new(buf);
    w.fixed_str(&e.currency, CCY_LEN);
    w.u8(e.venue.code());
    w.pad(7);
    w.f64(e.balance);
    w.f64(e.available);
    w.f64(e.frozen);
    w.u64(e.venue_ts);
    w.finish()
}

fn decode_account(payload: &[u8]) -> Result<AccountEvent, JournalError> {
    let mut r = Dec::new(payload);
    let currency = r.fixed_str(CCY_LEN)?;
    let venue = venue_of(r.u8()?)?;
    r.skip(7)?;
    let balance = r.f64()?;
    let available = r.f64()?;
    let frozen = r.f64()?;
    let venue_ts = r.u64()?;
    Ok(AccountEvent {
        venue,
        currency,
        balance,
        available,
        frozen,
        venue_ts,
    })
}

fn encode_session(e: &SessionEvent, buf: &mut [u8]) -> usize {
    let mut w = Enc::new(buf);
    w.u8(e.venue.code());
    w.u8(e.state.code());
    w.u16(e.session.0);
    w.pad(4);
    w.fixed_str(&e.detail, DETAIL_LEN);
    w.finish()
}

fn decode_session(payload: &[u8]) -> Result<SessionEvent, JournalError> {
    let mut r = Dec::new(payload);
    let venue = venue_of(r.u8()?)?;
    let state_code = r.u8()?;
    let state = SessionState::from_code(state_code).ok_or_else(|| {
        JournalError::Corrupt(format!("unknown session state code {state_code}"))
    })?;
    let session = SourceId(r.u16()?);
    r.skip(4)?;
    let detail = r.fixed_str(DETAIL_LEN)?;
    Ok(SessionEvent {
        venue,
        session,
        state,
        detail,
    })
}

const CMD_PLACE: u8 = 0;
const CMD_CANCEL: u8 = 1;
const CMD_SUBSCRIBE: u8 = 2;
const CMD_UNSUBSCRIBE: u8 = 3;

fn encode_command(c: &CommandEvent, buf: &mut [u8]) -> usize {
    let mut w = Enc::new(buf);
    match c {
        CommandEvent::PlaceOrder {
            venue,
            symbol,
            side,
            order_type,
            price,
            qty,
            client_order_id,
            tif,
        } => {
            w.u8(CMD_PLACE);
            w.u8(venue.code());
            w.u8(side.code());
            w.u8(order_type.code());
            w.u8(tif.code());
            w.u8(u8::from(price.is_some()));
            w.pad(2);
            w.f64(price.map_or(0.0, |p| p.as_f64()));
            w.f64(qty.as_f64());
            w.u64(0);
            w.fixed_str(symbol, SYM_LEN);
            w.fixed_str("", CHAN_LEN);
            w.fixed_str(client_order_id, ID_LEN);
        }
        CommandEvent::CancelOrder {
            venue,
            symbol,
            order_id,
        } => {
            w.u8(CMD_CANCEL);
            w.u8(venue.code());
            w.pad(6);
            w.f64(0.0);
            w.f64(0.0);
            w.u64(*order_id);
            w.fixed_str(symbol, SYM_LEN);
            w.fixed_str("", CHAN_LEN);
            w.fixed_str("", ID_LEN);
        }
        CommandEvent::Subscribe {
            venue,
            channel,
            symbol,
        }
        | CommandEvent::Unsubscribe {
            venue,
            channel,
            symbol,
        } => {
            w.u8(if matches!(c, CommandEvent::Subscribe { .. }) {
                CMD_SUBSCRIBE
            } else {
                CMD_UNSUBSCRIBE
            });
            w.u8(venue.code());
            w.pad(6);
            w.f64(0.0);
            w.f64(0.0);
            w.u64(0);
            w.fixed_str(symbol, SYM_LEN);
            w.fixed_str(channel, CHAN_LEN);
            w.fixed_str("", ID_LEN);
        }
    }
    w.finish()
}

fn decode_command(payload: &[u8]) -> Result<CommandEvent, JournalError> {
    let mut r = Dec::new(payload);
    let tag = r.u8()?;
    let venue = venue_of(r.u8()?)?;
    match tag {
        CMD_PLACE => {
            let side_code = r.u8()?;
            let side = Side::from_code(side_code).ok_or_else(|| {
                JournalError::Corrupt(format!("unknown side code {side_code}"))
            })?;
            let type_code = r.u8()?;
            let order_type = OrderType::from_code(type_code).ok_or_else(|| {
                JournalError::Corrupt(format!("unknown order type code {type_code}"))
            })?;
            let tif_code = r.u8()?;
            let tif = TimeInForce::from_code(tif_code).ok_or_else(|| {
                JournalError::Corrupt(format!("unknown tif code {tif_code}"))
            })?;
            let has_price = r.u8()? != 0;
            r.skip(2)?;
            let price = r.f64()?;
            let qty = Qty::new(r.f64()?);
            r.u64()?;
            let symbol = r.fixed_str(SYM_LEN)?;
            r.fixed_str(CHAN_LEN)?;
            let client_order_id = r.fixed_str(ID_LEN)?;
            Ok(CommandEvent::PlaceOrder {
                venue,
                symbol,
                side,
                order_type,
                price: has_price.then_some(Px::new(price)),
                qty,
                client_order_id,
                tif,
            })
        }
        CMD_CANCEL => {
            r.skip(6)?;
            r.f64()?;
            r.f64()?;
            let order_id = r.u64()?;
            let symbol = r.fixed_str(SYM_LEN)?;
            Ok(CommandEvent::CancelOrder {
                venue,
                symbol,
                order_id,
            })
        }
        CMD_SUBSCRIBE | CMD_UNSUBSCRIBE => {
            r.skip(6)?;
            r.f64()?;
            r.f64()?;
            r.u64()?;
            let symbol = r.fixed_str(SYM_LEN)?;
            let channel = r.fixed_str(CHAN_LEN)?;
            if tag == CMD_SUBSCRIBE {
                Ok(CommandEvent::Subscribe {
                    venue,
                    channel,
                    symbol,
                })
            } else {
                Ok(CommandEvent::Unsubscribe {
                    venue,
                    channel,
                    symbol,
                })
            }
        }
        _ => Err(JournalError::Corrupt(format!(
            "unknown command tag {tag}"
        ))),
    }
}
