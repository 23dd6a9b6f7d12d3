//! Routes subscribe/unsubscribe commands from the engine into live
//! venue sessions

use crate::session::{SessionHandle, Topic};
use anyhow::Result;
use common::{CommandEvent, Event, EventEnvelope, EventKind};
use engine::{Component, EngineHandle, EventHandler, HandlerId};
use std::sync::Arc;
use tracing::warn;

type ChannelFilter = Box<dyn Fn(&str) -> bool + Send + Sync>;

struct Route {
    handle: SessionHandle,
    accepts: ChannelFilter,
}

struct RouterHandler {
    routes: Arc<[Route]>,
}

impl RouterHandler {
    fn route_for(&self, command: &CommandEvent, channel: &str) -> Option<&Route> {
        self.routes
            .iter()
            .find(|r| r.handle.venue() == command.venue() && (r.accepts)(channel))
    }
}

impl EventHandler for RouterHandler {
    fn name(&self) -> &str {
        "command-router"
    }

    fn handle(&self, envelope: &Arc<EventEnvelope>) -> Result<()> {
        let Event::Command(command) = &envelope.event else {
            return Ok(());
        };
        match command {
            CommandEvent::Subscribe {
                venue,
                channel,
                symbol,
            } => match self.route_for(command, channel) {
                Some(route) => route.handle.subscribe(Topic::new(channel.clone(), symbol.clone())),
                None => warn!(%venue, channel, "no session accepts this channel"),
            },
            CommandEvent::Unsubscribe {
                venue,
                channel,
                symbol,
            } => match self.route_for(command, channel) {
                Some(route) => {
                    route
                        .handle
                        .unsubscribe(&Topic::new(channel.clone(), symbol.clone()));
                }
                None => warn!(%venue, channel, "no session accepts this channel"),
            },
            // Order commands belong to the order manager.
            CommandEvent::PlaceOrder { .. } | CommandEvent::CancelOrder { .. } => {}
        }
        Ok(())
    }
}

/// Engine component mapping market-data commands onto sessions
#[derive(Default)]
pub struct CommandRouter {
    routes: Vec<Route>,
    registration: Option<HandlerId>,
    engine: Option<EngineHandle>,
}

impl CommandRouter {
    /// Create an empty router
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Route channels matched by `accepts` to `handle`'s session
    ///
    /// Routes are consulted in insertion order; the first match wins.
    pub fn add_route(
        &mut self,
        handle: SessionHandle,
        accepts: impl Fn(&str) -> bool + Send + Sync + 'static,
    ) -> &mut Self {
        self.routes.push(Route {
            handle,
            accepts: Box::new(accepts),
        });
        self
    }
}

impl Component for CommandRouter {
    fn name(&self) -> &str {
        "command-router"
    }

    fn start(&mut self, engine: EngineHandle) -> Result<()> {
        let routes: Arc<[Route]> = std::mem::take(&mut self.routes).into();
        let handler = Arc::new(RouterHandler { routes });
        self.registration = Some(engine.register(EventKind::Command, handler));
        self.engine = Some(engine);
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        if let Some(engine) = self.engine.take() {
            if let Some(id) = self.registration.take() {
                engine.detach(id);
            }
        }
        Ok(())
    }
}

/// OKX public-endpoint channels (tickers, trades, books, funding)
#[must_use]
pub fn okx_public_channel(channel: &str) -> bool {
    matches!(channel, "tickers" | "trades" | "funding-rate") || channel.starts_with("books")
}

/// OKX business-endpoint channels (candles)
#[must_use]
pub fn okx_business_channel(channel: &str) -> bool {
    channel.starts_with("candle")
}

/// Binance market-stream channels
#[must_use]
pub fn binance_market_channel(channel: &str) -> bool {
    matches!(channel, "ticker" | "trade")
        || channel.starts_with("depth")
        || channel.starts_with("kline")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::endpoints;
    use crate::okx::OkxProtocol;
    use crate::session::{Session, SessionConfig};
    use common::{SourceId, Venue};
    use engine::{Engine, EngineConfig};

    #[test]
    fn channel_filters() {
        assert!(okx_public_channel("tickers"));
        assert!(okx_public_channel("books5"));
        assert!(!okx_public_channel("candle1m"));
        assert!(okx_business_channel("candle1m"));
        assert!(binance_market_channel("depth20"));
        assert!(binance_market_channel("kline_1m"));
        assert!(!binance_market_channel("tickers"));
    }

    #[test]
    fn subscribe_command_lands_in_the_right_session() {
        let engine = Engine::new(EngineConfig::default());
        let (_session, handle) = Session::new(
            SessionConfig::new("okx-public", SourceId::new(1)),
            OkxProtocol::public(endpoints::okx(false)),
            engine.handle(),
            vec![],
        );

        let handler = RouterHandler {
            routes: vec![Route {
                handle: handle.clone(),
                accepts: Box::new(okx_public_channel),
            }]
            .into(),
        };

        let envelope = Arc::new(EventEnvelope {
            seq: 0,
            source: SourceId::new(9),
            ingest_ts: common::Ts::from_nanos(0),
            event: Event::Command(CommandEvent::Subscribe {
                venue: Venue::Okx,
                channel: "tickers".to_string(),
                symbol: "BTC-USDT-SWAP".to_string(),
            }),
        });
        handler.handle(&envelope).unwrap();
        assert_eq!(handle.topics(), vec![Topic::new("tickers", "BTC-USDT-SWAP")]);

        // A channel no route accepts is ignored.
        let envelope = Arc::new(EventEnvelope {
            seq: 1,
            source: SourceId::new(9),
            ingest_ts: common::Ts::from_nanos(0),
            event: Event::Command(CommandEvent::Subscribe {
                venue: Venue::Okx,
                channel: "candle1m".to_string(),
                symbol: "BTC-USDT-SWAP".to_string(),
            }),
        });
        handler.handle(&envelope).unwrap();
        assert_eq!(handle.topics().len(), 1);
    }
}
