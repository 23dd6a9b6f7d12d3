//! tickbus trading node: engine, journal bridge, OMS and venue sessions

mod config;

use anyhow::Result;
use auth::{BinanceCredentials, BinanceSigner, OkxCredentials, OkxSigner};
use bridge::{BridgeConfig, JournalBridge};
use common::SourceId;
use config::Config;
use engine::{Engine, EngineConfig};
use feeds::{
    BinanceMarketProtocol, BinanceUserProtocol, CommandRouter, OkxProtocol, Session,
    SessionConfig, SessionHandle, Topic, binance_market_channel, okx_business_channel,
    okx_public_channel,
};
use oms::{AccountManager, OrderManager};
use oms::transport::NullTransport;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const SRC_OKX_PUBLIC: SourceId = SourceId(1);
const SRC_OKX_BUSINESS: SourceId = SourceId(2);
const SRC_OKX_PRIVATE: SourceId = SourceId(3);
const SRC_BINANCE_MARKET: SourceId = SourceId(4);
const SRC_BINANCE_USER: SourceId = SourceId(5);

/// Binance wants the listenKey refreshed every 30 minutes.
const LISTEN_KEY_KEEPALIVE: Duration = Duration::from_secs(30 * 60);

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = Config::load();
    info!(
        journal = %config.journal_path.display(),
        testnet = config.testnet,
        "starting tickbus node"
    );

    let engine = Engine::new(EngineConfig::default());

    engine.attach(Box::new(JournalBridge::new(
        BridgeConfig::new(&config.journal_path)
            .with_size(config.journal_size)
            .with_command_journal(&config.command_journal_path),
    )))?;
    // The REST order-entry client plugs in here; without one, orders
    // stay local.
    engine.attach(Box::new(OrderManager::new(Arc::new(NullTransport))))?;
    engine.attach(Box::new(AccountManager::new()))?;

    let mut router = CommandRouter::new();
    let mut session_handles: Vec<SessionHandle> = Vec::new();
    let mut session_tasks = Vec::new();

    // OKX market data.
    let okx_endpoints = feeds::endpoints::okx(config.testnet);
    if !config.args.okx_symbols.is_empty() {
        let topics: Vec<Topic> = config
            .args
            .okx_symbols
            .iter()
            .flat_map(|s| {
                [
                    Topic::new("tickers", s.clone()),
                    Topic::new("trades", s.clone()),
                    Topic::new("books5", s.clone()),
                    Topic::new("funding-rate", s.clone()),
                ]
            })
            .collect();
        let (session, handle) = Session::new(
            SessionConfig::new("okx-public", SRC_OKX_PUBLIC),
            OkxProtocol::public(okx_endpoints),
            engine.handle(),
            topics,
        );
        router.add_route(handle.clone(), okx_public_channel);
        session_handles.push(handle);
        session_tasks.push(tokio::spawn(session.run()));

        let candles: Vec<Topic> = config
            .args
            .okx_symbols
            .iter()
            .map(|s| Topic::new("candle1m", s.clone()))
            .collect();
        let (session, handle) = Session::new(
            SessionConfig::new("okx-business", SRC_OKX_BUSINESS),
            OkxProtocol::business(okx_endpoints),
            engine.handle(),
            candles,
        );
        router.add_route(handle.clone(), okx_business_channel);
        session_handles.push(handle);
        session_tasks.push(tokio::spawn(session.run()));
    }

    // OKX private stream, only with credentials.
    if let Some((key, secret, passphrase)) = &config.credentials.okx {
        let signer = OkxSigner::new(OkxCredentials::new(key, secret, passphrase));
        let (session, handle) = Session::new(
            SessionConfig::new("okx-private", SRC_OKX_PRIVATE),
            OkxProtocol::private(okx_endpoints, signer),
            engine.handle(),
            vec![Topic::new("orders", ""), Topic::new("account", "")],
        );
        session_handles.push(handle);
        session_tasks.push(tokio::spawn(session.run()));
    } else {
        warn!("no OKX credentials; private stream disabled");
    }

    // Binance market data.
    let binance_endpoints = feeds::endpoints::binance(config.testnet);
    if !config.args.binance_symbols.is_empty() {
        let topics: Vec<Topic> = config
            .args
            .binance_symbols
            .iter()
            .flat_map(|s| {
                [
                    Topic::new("ticker", s.clone()),
                    Topic::new("trade", s.clone()),
                    Topic::new("depth20", s.clone()),
                    Topic::new("kline_1m", s.clone()),
                ]
            })
            .collect();
        let (session, handle) = Session::new(
            SessionConfig::new("binance-market", SRC_BINANCE_MARKET),
            BinanceMarketProtocol::new(binance_endpoints),
            engine.handle(),
            topics,
        );
        router.add_route(handle.clone(), binance_market_channel);
        session_handles.push(handle);
        session_tasks.push(tokio::spawn(session.run()));
    }

    // Binance user-data stream, only with credentials.
    if let Some((key, secret)) = &config.credentials.binance {
        let signer = BinanceSigner::new(BinanceCredentials::new(key, secret));
        let (session, handle) = Session::new(
            SessionConfig::new("binance-user", SRC_BINANCE_USER)
                .with_keepalive(LISTEN_KEY_KEEPALIVE),
            BinanceUserProtocol::new(binance_endpoints, signer),
            engine.handle(),
            vec![],
        );
        session_handles.push(handle);
        session_tasks.push(tokio::spawn(session.run()));
    } else {
        warn!("no Binance credentials; user-data stream disabled");
    }

    engine.attach(Box::new(router))?;

    info!(sessions = session_tasks.len(), "node up");
    tokio::signal::ctrl_c().await?;
    info!("shutting down");

    for handle in &session_handles {
        handle.shutdown().await;
    }
    for task in session_tasks {
        let _ = task.await;
    }
    engine.shutdown();
    Ok(())
}
