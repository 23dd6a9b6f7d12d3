//! OKX v5 websocket payload shapes

use serde::Deserialize;

/// Outer shape of every OKX websocket frame
#[derive(Debug, Deserialize)]
pub struct WsFrame {
    /// Present on control frames: `login`, `subscribe`, `error`, ...
    pub event: Option<String>,
    /// Venue status code on control frames (`"0"` = ok)
    pub code: Option<String>,
    /// Venue message on control frames
    pub msg: Option<String>,
    /// Channel routing of data frames
    pub arg: Option<WsArg>,
    /// Channel payload, shape depends on `arg.channel`
    pub data: Option<serde_json::Value>,
}

/// Channel routing argument
#[derive(Debug, Deserialize)]
pub struct WsArg {
    /// Channel tag (`tickers`, `books5`, `candle1m`, ...)
    pub channel: String,
    #[serde(rename = "instId")]
    /// Instrument the frame is about, absent on account channels
    pub inst_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct TickerData {
    #[serde(rename = "instId")]
    pub inst_id: String,
    pub last: String,
    #[serde(rename = "bidPx", default)]
    pub bid_px: String,
    #[serde(rename = "askPx", default)]
    pub ask_px: String,
    #[serde(rename = "high24h", default)]
    pub high_24h: String,
    #[serde(rename = "low24h", default)]
    pub low_24h: String,
    #[serde(rename = "open24h", default)]
    pub open_24h: String,
    #[serde(rename = "vol24h", default)]
    pub vol_24h: String,
    pub ts: String,
}

#[derive(Debug, Deserialize)]
pub struct TradeData {
    #[serde(rename = "instId")]
    pub inst_id: String,
    #[serde(rename = "tradeId")]
    pub trade_id: String,
    pub px: String,
    pub sz: String,
    pub side: String,
    pub ts: String,
}

#[derive(Debug, Deserialize)]
pub struct BookData {
    /// Levels are `[price, size, liquidated, order-count]` string arrays
    pub bids: Vec<Vec<String>>,
    pub asks: Vec<Vec<String>>,
    pub ts: String,
}

#[derive(Debug, Deserialize)]
pub struct FundingData {
    #[serde(rename = "instType", default)]
    pub inst_type: String,
    #[serde(rename = "instId")]
    pub inst_id: String,
    #[serde(rename = "fundingRate")]
    pub funding_rate: String,
    #[serde(rename = "nextFundingRate", default)]
    pub next_funding_rate: String,
    #[serde(rename = "fundingTime", default)]
    pub funding_time: String,
    #[serde(rename = "nextFundingTime", default)]
    pub next_funding_time: String,
    #[serde(rename = "minFundingRate", default)]
    pub min_funding_rate: String,
    #[serde(rename = "maxFundingRate", default)]
    pub max_funding_rate: String,
    pub ts: String,
}

#[derive(Debug, Deserialize)]
pub struct OrderData {
    #[serde(rename = "instId")]
    pub inst_id: String,
    #[serde(rename = "ordId")]
    pub ord_id: String,
    #[serde(rename = "clOrdId", default)]
    pub cl_ord_id: String,
    #[serde(default)]
    pub px: String,
    pub sz: String,
    #[serde(rename = "ordType")]
    pub ord_type: String,
    pub side: String,
    #[serde(rename = "accFillSz", default)]
    pub acc_fill_sz: String,
    #[serde(rename = "avgPx", default)]
    pub avg_px: String,
    pub state: String,
    #[serde(default)]
    pub fee: String,
    #[serde(rename = "uTime")]
    pub u_time: String,
}

#[derive(Debug, Deserialize)]
pub struct AccountData {
    #[serde(rename = "uTime", default)]
    pub u_time: String,
    pub details: Vec<AccountDetail>,
}

#[derive(Debug, Deserialize)]
pub struct AccountDetail {
    pub ccy: String,
    #[serde(rename = "cashBal", default)]
    pub cash_bal: String,
    #[serde(rename = "availBal", default)]
    pub avail_bal: String,
    #[serde(rename = "frozenBal", default)]
    pub frozen_bal: String,
}
