//! Venue endpoint selection (production vs testnet)

/// OKX endpoint set
#[derive(Debug, Clone, Copy)]
pub struct OkxEndpoints {
    /// Public market data websocket
    pub ws_public: &'static str,
    /// Business websocket (candles)
    pub ws_business: &'static str,
    /// Private websocket (orders, account)
    pub ws_private: &'static str,
    /// REST base for time probes
    pub api: &'static str,
}

/// Binance endpoint set
#[derive(Debug, Clone, Copy)]
pub struct BinanceEndpoints {
    /// Market stream base (`/stream` combined endpoint)
    pub ws_market: &'static str,
    /// User-data stream base (`/ws/<listenKey>` is appended)
    pub ws_user: &'static str,
    /// REST base for the listenKey lifecycle
    pub api: &'static str,
}

/// OKX endpoints for the selected network
#[must_use]
pub const fn okx(testnet: bool) -> OkxEndpoints {
    if testnet {
        OkxEndpoints {
            ws_public: "wss://wspap.okx.com:8443/ws/v5/public",
            ws_business: "wss://wspap.okx.com:8443/ws/v5/business",
            ws_private: "wss://wspap.okx.com:8443/ws/v5/private",
            api: "https://www.okx.com",
        }
    } else {
        OkxEndpoints {
            ws_public: "wss://ws.okx.com:8443/ws/v5/public",
            ws_business: "wss://ws.okx.com:8443/ws/v5/business",
            ws_private: "wss://ws.okx.com:8443/ws/v5/private",
            api: "https://www.okx.com",
        }
    }
}

/// Binance endpoints for the selected network
#[must_use]
pub const fn binance(testnet: bool) -> BinanceEndpoints {
    if testnet {
        BinanceEndpoints {
            ws_market: "wss://testnet.binance.vision/stream",
            ws_user: "wss://testnet.binance.vision/ws",
            api: "https://testnet.binance.vision",
        }
    } else {
        BinanceEndpoints {
            ws_market: "wss://stream.binance.com:9443/stream",
            ws_user: "wss://stream.binance.com:9443/ws",
            api: "https://api.binance.com",
        }
    }
}
