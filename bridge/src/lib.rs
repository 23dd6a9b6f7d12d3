//! Bridge between the engine and the shared-memory journal
//!
//! A global listener hands every envelope to a bounded channel; a
//! dedicated thread owns the single `JournalWriter` and drains into the
//! page, so listener callbacks never block on I/O. A second thread
//! tails the command journal written by out-of-process consumers (UI,
//! Python strategies) and feeds decoded commands back into the engine.

#![deny(clippy::all)]
#![deny(missing_docs)]
#![forbid(unsafe_code)]

use anyhow::{Context, Result};
use common::{Event, EventEnvelope, SourceId, TransportError};
use crossbeam::channel::{self, Receiver, Sender};
use engine::{Component, EngineHandle, EventHandler, HandlerId};
use journal::{JournalError, JournalReader, JournalWriter};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::thread::JoinHandle;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Producer id stamped on commands ingested from the command journal
pub const COMMAND_SOURCE: SourceId = SourceId(0xFFFE);

/// Bridge configuration
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// Outbound journal file
    pub journal_path: PathBuf,
    /// Outbound journal size in bytes
    pub journal_size: usize,
    /// Inbound command journal, tailed when the file exists
    pub command_path: Option<PathBuf>,
    /// Handoff queue capacity between listener and writer thread
    pub queue_capacity: usize,
}

impl BridgeConfig {
    /// Bridge writing to `journal_path` with the default 128 MiB page
    #[must_use]
    pub fn new(journal_path: impl Into<PathBuf>) -> Self {
        Self {
            journal_path: journal_path.into(),
            journal_size: journal::DEFAULT_PAGE_SIZE,
            command_path: None,
            queue_capacity: 65_536,
        }
    }

    /// Set the journal size
    #[must_use]
    pub const fn with_size(mut self, size: usize) -> Self {
        self.journal_size = size;
        self
    }

    /// Tail `path` for inbound commands
    #[must_use]
    pub fn with_command_journal(mut self, path: impl Into<PathBuf>) -> Self {
        self.command_path = Some(path.into());
        self
    }
}

/// Frames dropped instead of written, by reason
#[derive(Debug, Default)]
pub struct BridgeStats {
    /// Encoder or writer rejected the event
    pub dropped: AtomicU64,
    /// Handoff queue was full
    pub overflowed: AtomicU64,
}

struct BridgeTap {
    tx: Sender<Arc<EventEnvelope>>,
    stats: Arc<BridgeStats>,
}

impl EventHandler for BridgeTap {
    fn name(&self) -> &str {
        "journal-bridge"
    }

    fn handle(&self, envelope: &Arc<EventEnvelope>) -> Result<()> {
        // Never block the dispatch thread: shed load instead.
        if self.tx.try_send(Arc::clone(envelope)).is_err() {
            self.stats.overflowed.fetch_add(1, Ordering::Relaxed);
        }
        Ok(())
    }
}

/// Engine component owning the journal writer and command tailer
pub struct JournalBridge {
    config: BridgeConfig,
    stats: Arc<BridgeStats>,
    stop: Arc<AtomicBool>,
    registration: Option<HandlerId>,
    engine: Option<EngineHandle>,
    writer_thread: Option<JoinHandle<()>>,
    command_thread: Option<JoinHandle<()>>,
}

impl JournalBridge {
    /// Create a bridge from config; nothing runs until `start`
    #[must_use]
    pub fn new(config: BridgeConfig) -> Self {
        Self {
            config,
            stats: Arc::new(BridgeStats::default()),
            stop: Arc::new(AtomicBool::new(false)),
            registration: None,
            engine: None,
            writer_thread: None,
            command_thread: None,
        }
    }

    /// Drop counters
    #[must_use]
    pub fn stats(&self) -> Arc<BridgeStats> {
        Arc::clone(&self.stats)
    }

    fn spawn_writer(&mut self, rx: Receiver<Arc<EventEnvelope>>) -> Result<()> {
        let mut writer = JournalWriter::create(&self.config.journal_path, self.config.journal_size)
            .map_err(TransportError::from)
            .with_context(|| {
                format!("creating journal at {}", self.config.journal_path.display())
            })?;
        let stats = Arc::clone(&self.stats);
        let thread = std::thread::Builder::new()
            .name("journal-writer".to_string())
            .spawn(move || {
                while let Ok(envelope) = rx.recv() {
                    match writer.append_event(envelope.source, envelope.ingest_ts, &envelope.event)
                    {
                        Ok(_) => {}
                        Err(JournalError::Io(e)) => {
                            error!(error = %e, "journal writer died");
                            return;
                        }
                        Err(e) => {
                            stats.dropped.fetch_add(1, Ordering::Relaxed);
                            warn!(error = %e, "event not journaled");
                        }
                    }
                }
                debug!("journal writer drained and stopped");
            })
            .context("spawn journal writer thread")?;
        self.writer_thread = Some(thread);
        Ok(())
    }

    fn spawn_command_tailer(&mut self, engine: EngineHandle) -> Result<()> {
        let Some(path) = self.config.command_path.clone() else {
            return Ok(());
        };
        if !path.exists() {
            info!(path = %path.display(), "no command journal; inbound commands disabled");
            return Ok(());
        }
        let stop = Arc::clone(&self.stop);
        let thread = std::thread::Builder::new()
            .name("command-tailer".to_string())
            .spawn(move || {
                let mut reader = match JournalReader::open(&path) {
                    Ok(reader) => reader,
                    Err(e) => {
                        error!(error = %e, path = %path.display(), "cannot open command journal");
                        return;
                    }
                };
                // Only commands published after attach are interesting.
                reader.resync();
                while !stop.load(Ordering::Relaxed) {
                    match reader.try_next() {
                        Ok(Some(frame)) => match frame.decode() {
                            Ok(event @ Event::Command(_)) => {
                                if let Err(e) = engine.put(COMMAND_SOURCE, event) {
                                    warn!(error = %e, "engine rejected journal command");
                                    return;
                                }
                            }
                            Ok(other) => {
                                debug!(kind = ?other.kind(), "non-command frame in command journal");
                            }
                            Err(e) => {
                                warn!(error = %e, "undecodable command frame dropped");
                            }
                        },
                        Ok(None) => std::thread::sleep(Duration::from_micros(100)),
                        Err(JournalError::Lag { expected, found }) => {
                            warn!(expected, found, "lagged behind command journal; resyncing");
                            reader.resync();
                        }
                        Err(e) => {
                            error!(error = %e, "command journal read failed");
                            return;
                        }
                    }
                }
            })
            .context("spawn command tailer thread")?;
        self.command_thread = Some(thread);
        Ok(())
    }
}

impl Component for JournalBridge {
    fn name(&self) -> &str {
        "journal-bridge"
    }

    fn start(&mut self, engine: EngineHandle) -> Result<()> {
        let (tx, rx) = channel::bounded(self.config.queue_capacity);
        self.spawn_writer(rx)?;

        let tap = Arc::new(BridgeTap {
            tx,
            stats: Arc::clone(&self.stats),
        });
        // Ignore the commands this bridge itself ingests, so nothing it
        // produces loops back through it.
        self.registration = Some(engine.register_global(tap, Some(COMMAND_SOURCE)));

        self.spawn_command_tailer(engine.clone())?;
        self.engine = Some(engine);
        info!(path = %self.config.journal_path.display(), "journal bridge started");
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(engine) = self.engine.take() {
            if let Some(id) = self.registration.take() {
                // Detaching drops the tap, closing the handoff channel
                // and letting the writer thread drain out.
                engine.detach(id);
            }
        }
        if let Some(thread) = self.writer_thread.take() {
            let _ = thread.join();
        }
        if let Some(thread) = self.command_thread.take() {
            let _ = thread.join();
        }
        Ok(())
    }
}
