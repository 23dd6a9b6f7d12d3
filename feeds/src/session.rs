//! Venue-agnostic websocket session state machine
//!
//! One session owns one connection and walks
//! `Disconnected -> Connecting -> Connected -> (Authenticating ->
//! Authenticated)? -> Subscribing -> Active`, falling back through
//! `Reconnecting` with capped exponential backoff on any failure except
//! a rejected login, which is terminal. The in-memory subscription set
//! is the source of truth across reconnects.

use async_trait::async_trait;
use common::{Event, SessionEvent, SessionState, SourceId, TransportError, Venue};
use engine::EngineHandle;
use futures_util::{SinkExt, StreamExt};
use rand::Rng;
use std::collections::BTreeSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{Instant, interval_at, timeout};
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, error, info, warn};

/// One subscribed channel/symbol pair
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct Topic {
    /// Venue channel tag (e.g. `tickers`, `depth20`)
    pub channel: String,
    /// Venue-native symbol; empty for account-wide channels
    pub symbol: String,
}

impl Topic {
    /// Create a new topic
    pub fn new(channel: impl Into<String>, symbol: impl Into<String>) -> Self {
        Self {
            channel: channel.into(),
            symbol: symbol.into(),
        }
    }
}

/// Control messages for a live session
#[derive(Debug)]
pub enum SessionCommand {
    /// Add a subscription on the live connection
    Subscribe(Topic),
    /// Remove a subscription on the live connection
    Unsubscribe(Topic),
    /// Stop the session for good
    Shutdown,
}

/// Login progress reported by the protocol
#[derive(Debug)]
pub enum LoginOutcome {
    /// Frame was not the login reply; keep waiting
    Pending,
    /// Login accepted
    Success,
    /// Venue rejected the timestamp; resync the clock and retry once
    InvalidTimestamp,
    /// Login rejected; terminal for this session
    Failed {
        /// Venue error code
        code: String,
        /// Venue error message
        message: String,
    },
}

/// What one inbound frame amounted to
#[derive(Debug, PartialEq, Eq)]
pub enum Pulse {
    /// Produced canonical events
    Data,
    /// Venue heartbeat reply
    Heartbeat,
    /// Subscription ack or other control traffic
    Control,
    /// Not for us
    Ignored,
}

/// Venue-specific half of a session
#[async_trait]
pub trait VenueProtocol: Send {
    /// Venue this protocol speaks
    fn venue(&self) -> Venue;

    /// Connection URL for the next attempt; may do venue I/O (listenKey)
    async fn endpoint(&mut self, topics: &[Topic]) -> anyhow::Result<String>;

    /// Login frame to send once connected; `None` for public sessions
    fn login_request(&mut self) -> anyhow::Result<Option<String>>;

    /// Interpret a frame while waiting for the login reply
    fn check_login(&mut self, text: &str) -> LoginOutcome;

    /// Resync local clock against the venue after `InvalidTimestamp`
    async fn resync_clock(&mut self) -> anyhow::Result<()>;

    /// Subscribe message covering `topics`; `None` when the venue
    /// subscribes through the connection URL instead
    fn subscribe_request(&mut self, topics: &[Topic]) -> anyhow::Result<Option<String>>;

    /// Unsubscribe message covering `topics`
    fn unsubscribe_request(&mut self, topics: &[Topic]) -> anyhow::Result<Option<String>>;

    /// Client-initiated keepalive payload, if the venue expects one
    fn ping_message(&self) -> Option<String>;

    /// Out-of-band maintenance driven by
    /// [`SessionConfig::keepalive_interval`] (e.g. listenKey refresh)
    async fn keepalive(&mut self) -> anyhow::Result<()> {
        Ok(())
    }

    /// Normalize one text frame into canonical events
    fn handle_text(&mut self, text: &str, out: &mut Vec<Event>) -> Result<Pulse, TransportError>;
}

/// Session timing and identity knobs
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Name used in logs (e.g. `okx-public`)
    pub name: String,
    /// Producer id stamped on every event this session emits
    pub source: SourceId,
    /// TCP/TLS/websocket handshake budget
    pub connect_timeout: Duration,
    /// Budget for login and subscription acks
    pub ack_timeout: Duration,
    /// Keepalive cadence; also the liveness check interval
    pub heartbeat_interval: Duration,
    /// Consecutive missed heartbeats tolerated before reconnecting
    pub max_heartbeat_misses: u32,
    /// First reconnect delay
    pub backoff_base: Duration,
    /// Reconnect delay cap
    pub backoff_cap: Duration,
    /// Cadence of [`VenueProtocol::keepalive`], when the venue needs one
    pub keepalive_interval: Option<Duration>,
}

impl SessionConfig {
    /// Defaults per the transport design: 5 s connect and ack budgets,
    /// 25 s heartbeat, 3 tolerated misses, 1 s..30 s backoff
    #[must_use]
    pub fn new(name: impl Into<String>, source: SourceId) -> Self {
        Self {
            name: name.into(),
            source,
            connect_timeout: Duration::from_secs(5),
            ack_timeout: Duration::from_secs(5),
            heartbeat_interval: Duration::from_secs(25),
            max_heartbeat_misses: 3,
            backoff_base: Duration::from_secs(1),
            backoff_cap: Duration::from_secs(30),
            keepalive_interval: None,
        }
    }

    /// Enable periodic [`VenueProtocol::keepalive`] calls
    #[must_use]
    pub const fn with_keepalive(mut self, interval: Duration) -> Self {
        self.keepalive_interval = Some(interval);
        self
    }
}

/// Handle held by the command router; the shared topic set is the
/// replay source of truth
#[derive(Clone)]
pub struct SessionHandle {
    venue: Venue,
    source: SourceId,
    topics: Arc<Mutex<BTreeSet<Topic>>>,
    cmd_tx: mpsc::Sender<SessionCommand>,
}

impl SessionHandle {
    /// Venue the session talks to
    #[must_use]
    pub const fn venue(&self) -> Venue {
        self.venue
    }

    /// Producer id of the session
    #[must_use]
    pub const fn source(&self) -> SourceId {
        self.source
    }

    /// Add a topic; idempotent, the set ignores duplicates
    pub fn subscribe(&self, topic: Topic) {
        let added = self.topics.lock().expect("topics lock").insert(topic.clone());
        if added {
            // Nudge the live connection if there is one; a reconnect
            // replays from the set either way.
            let _ = self.cmd_tx.try_send(SessionCommand::Subscribe(topic));
        }
    }

    /// Remove a topic
    pub fn unsubscribe(&self, topic: &Topic) {
        let removed = self.topics.lock().expect("topics lock").remove(topic);
        if removed {
            let _ = self
                .cmd_tx
                .try_send(SessionCommand::Unsubscribe(topic.clone()));
        }
    }

    /// Snapshot of the subscription set
    #[must_use]
    pub fn topics(&self) -> Vec<Topic> {
        self.topics.lock().expect("topics lock").iter().cloned().collect()
    }

    /// Stop the session for good
    pub async fn shutdown(&self) {
        let _ = self.cmd_tx.send(SessionCommand::Shutdown).await;
    }
}

enum SessionExit {
    Shutdown,
    AuthRejected,
    Retry { was_active: bool, reason: String },
}

/// A running venue session
pub struct Session<P: VenueProtocol> {
    config: SessionConfig,
    protocol: P,
    engine: EngineHandle,
    topics: Arc<Mutex<BTreeSet<Topic>>>,
    cmd_rx: mpsc::Receiver<SessionCommand>,
}

impl<P: VenueProtocol> Session<P> {
    /// Build a session seeded with `initial_topics`
    pub fn new(
        config: SessionConfig,
        protocol: P,
        engine: EngineHandle,
        initial_topics: Vec<Topic>,
    ) -> (Self, SessionHandle) {
        let topics = Arc::new(Mutex::new(initial_topics.into_iter().collect::<BTreeSet<_>>()));
        let (cmd_tx, cmd_rx) = mpsc::channel(64);
        let handle = SessionHandle {
            venue: protocol.venue(),
            source: config.source,
            topics: Arc::clone(&topics),
            cmd_tx,
        };
        (
            Self {
                config,
                protocol,
                engine,
                topics,
                cmd_rx,
            },
            handle,
        )
    }

    fn set_state(&self, state: SessionState, detail: &str) {
        info!(session = %self.config.name, %state, detail, "session state");
        let event = Event::Session(SessionEvent {
            venue: self.protocol.venue(),
            session: self.config.source,
            state,
            detail: detail.to_string(),
        });
        if let Err(e) = self.engine.put(self.config.source, event) {
            warn!(session = %self.config.name, error = %e, "failed to publish session event");
        }
    }

    /// Drive the session until shutdown or a terminal auth failure
    pub async fn run(mut self) -> anyhow::Result<()> {
        let mut attempt: u32 = 0;
        loop {
            match self.run_once().await {
                Ok(SessionExit::Shutdown) => {
                    self.set_state(SessionState::Disconnected, "shutdown");
                    return Ok(());
                }
                Ok(SessionExit::AuthRejected) => return Ok(()),
                Ok(SessionExit::Retry { was_active, reason }) => {
                    if was_active {
                        attempt = 0;
                    }
                    attempt += 1;
                    let delay = backoff_delay(attempt, self.config.backoff_base, self.config.backoff_cap);
                    self.set_state(SessionState::Error, &reason);
                    self.set_state(SessionState::Reconnecting, &reason);
                    warn!(
                        session = %self.config.name,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        reason = %reason,
                        "reconnecting"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => {
                    attempt += 1;
                    let delay = backoff_delay(attempt, self.config.backoff_base, self.config.backoff_cap);
                    self.set_state(SessionState::Error, &e.to_string());
                    self.set_state(SessionState::Reconnecting, &e.to_string());
                    error!(session = %self.config.name, error = %e, "session error; reconnecting");
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }

    async fn run_once(&mut self) -> anyhow::Result<SessionExit> {
        self.set_state(SessionState::Connecting, "");
        let topics = self.snapshot_topics();
        let url = self.protocol.endpoint(&topics).await?;

        let connected = timeout(self.config.connect_timeout, connect_async(url.as_str())).await;
        let (ws, _) = match connected {
            Ok(Ok(pair)) => pair,
            Ok(Err(e)) => {
                return Ok(SessionExit::Retry {
                    was_active: false,
                    reason: format!("connect failed: {e}"),
                });
            }
            Err(_) => {
                return Ok(SessionExit::Retry {
                    was_active: false,
                    reason: "connect timeout".to_string(),
                });
            }
        };
        self.set_state(SessionState::Connected, "");
        let (mut write, mut read) = ws.split();

        if let Some(login) = self.protocol.login_request()? {
            self.set_state(SessionState::Authenticating, "");
            write.send(Message::Text(login)).await?;
            let mut resynced = false;
            loop {
                let frame = match timeout(self.config.ack_timeout, read.next()).await {
                    Ok(Some(Ok(Message::Text(text)))) => text,
                    Ok(Some(Ok(_))) => continue,
                    Ok(Some(Err(e))) => {
                        return Ok(SessionExit::Retry {
                            was_active: false,
                            reason: format!("login read failed: {e}"),
                        });
                    }
                    Ok(None) => {
                        return Ok(SessionExit::Retry {
                            was_active: false,
                            reason: "closed during login".to_string(),
                        });
                    }
                    Err(_) => {
                        return Ok(SessionExit::Retry {
                            was_active: false,
                            reason: "login ack timeout".to_string(),
                        });
                    }
                };
                match self.protocol.check_login(&frame) {
                    LoginOutcome::Pending => {}
                    LoginOutcome::Success => {
                        self.set_state(SessionState::Authenticated, "");
                        break;
                    }
                    LoginOutcome::InvalidTimestamp if !resynced => {
                        info!(session = %self.config.name, "login timestamp rejected; resyncing clock");
                        self.protocol.resync_clock().await?;
                        resynced = true;
                        if let Some(retry) = self.protocol.login_request()? {
                            write.send(Message::Text(retry)).await?;
                        }
                    }
                    LoginOutcome::InvalidTimestamp => {
                        self.set_state(SessionState::Error, "login failed after clock resync");
                        return Ok(SessionExit::AuthRejected);
                    }
                    LoginOutcome::Failed { code, message } => {
                        // Bad credentials are terminal: no reconnect, an
                        // operator has to act.
                        self.set_state(
                            SessionState::Error,
                            &format!("login failed: {code} {message}"),
                        );
                        return Ok(SessionExit::AuthRejected);
                    }
                }
            }
        }

        self.set_state(SessionState::Subscribing, "");
        if !topics.is_empty() {
            if let Some(request) = self.protocol.subscribe_request(&topics)? {
                write.send(Message::Text(request)).await?;
            }
        }
        self.set_state(SessionState::Active, "");

        let mut heartbeat = interval_at(
            Instant::now() + self.config.heartbeat_interval,
            self.config.heartbeat_interval,
        );
        heartbeat.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        let keepalive_period = self
            .config
            .keepalive_interval
            .unwrap_or(Duration::from_secs(24 * 60 * 60));
        let mut keepalive = interval_at(Instant::now() + keepalive_period, keepalive_period);
        keepalive.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        let mut missed: u32 = 0;
        let mut was_active = false;
        let mut events = Vec::new();

        // Split the borrows so the select arms can drive the command
        // channel and the protocol independently.
        let config = &self.config;
        let protocol = &mut self.protocol;
        let engine = &self.engine;
        let cmd_rx = &mut self.cmd_rx;

        loop {
            tokio::select! {
                inbound = read.next() => match inbound {
                    Some(Ok(Message::Text(text))) => {
                        missed = 0;
                        match protocol.handle_text(&text, &mut events) {
                            Ok(Pulse::Data) => {
                                was_active = true;
                                for event in events.drain(..) {
                                    engine.put(config.source, event)?;
                                }
                            }
                            Ok(_) => {}
                            Err(TransportError::Protocol(msg)) => {
                                // Unparseable frame: drop it, keep the session.
                                debug!(session = %config.name, error = %msg, "dropping frame");
                            }
                            Err(e) => {
                                warn!(session = %config.name, error = %e, "frame handling failed");
                            }
                        }
                    }
                    Some(Ok(Message::Ping(data))) => {
                        missed = 0;
                        write.send(Message::Pong(data)).await?;
                    }
                    Some(Ok(Message::Pong(_))) => {
                        missed = 0;
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        return Ok(SessionExit::Retry {
                            was_active,
                            reason: "connection closed".to_string(),
                        });
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        return Ok(SessionExit::Retry {
                            was_active,
                            reason: format!("read failed: {e}"),
                        });
                    }
                },
                _ = heartbeat.tick() => {
                    missed += 1;
                    if missed > config.max_heartbeat_misses {
                        return Ok(SessionExit::Retry {
                            was_active,
                            reason: format!("{missed} heartbeats missed"),
                        });
                    }
                    if let Some(ping) = protocol.ping_message() {
                        write.send(Message::Text(ping)).await?;
                    }
                },
                _ = keepalive.tick() => {
                    if config.keepalive_interval.is_some() {
                        if let Err(e) = protocol.keepalive().await {
                            warn!(session = %config.name, error = %e, "keepalive failed");
                        }
                    }
                },
                command = cmd_rx.recv() => match command {
                    Some(SessionCommand::Subscribe(topic)) => {
                        if let Some(request) = protocol.subscribe_request(&[topic])? {
                            write.send(Message::Text(request)).await?;
                        }
                    }
                    Some(SessionCommand::Unsubscribe(topic)) => {
                        if let Some(request) = protocol.unsubscribe_request(&[topic])? {
                            write.send(Message::Text(request)).await?;
                        }
                    }
                    Some(SessionCommand::Shutdown) | None => return Ok(SessionExit::Shutdown),
                },
            }
        }
    }

    fn snapshot_topics(&self) -> Vec<Topic> {
        self.topics.lock().expect("topics lock").iter().cloned().collect()
    }
}

/// Exponential backoff with uniform jitter: 1 s, 2 s, 4 s ... capped
fn backoff_delay(attempt: u32, base: Duration, cap: Duration) -> Duration {
    let exp = base.saturating_mul(1u32 << attempt.saturating_sub(1).min(16));
    let capped = exp.min(cap);
    let jitter = rand::thread_rng().gen_range(0.8..1.2);
    capped.mul_f64(jitter)
}
