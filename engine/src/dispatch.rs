//! Event engine: bounded MPSC inbound queue, single dispatch thread,
//! type-indexed and global listener tables

use crate::capability::{Capability, CapabilityTable};
use crate::component::Component;
use anyhow::{Context, Result};
use common::{Event, EventEnvelope, EventKind, SourceId, Ts};
use crossbeam::channel::{self, Receiver, Sender};
use parking_lot::{Mutex, RwLock};
use rustc_hash::FxHashMap;
use serde_json::Value;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread::JoinHandle;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Listener invoked from the dispatch thread
///
/// Handlers must not block; anything needing venue I/O posts a command
/// event and returns. Errors are logged and isolated, never aborting
/// dispatch.
pub trait EventHandler: Send + Sync {
    /// Name used when logging handler failures
    fn name(&self) -> &str;

    /// Handle one event
    fn handle(&self, envelope: &Arc<EventEnvelope>) -> Result<()>;
}

/// Token returned by registration, used to detach
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HandlerId(u64);

/// Engine configuration
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Capacity of the inbound MPSC queue; producers block when full
    pub queue_capacity: usize,
    /// Timeout of the dispatch loop's idle wait
    pub idle_wait: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 65_536,
            idle_wait: Duration::from_millis(100),
        }
    }
}

/// Dispatch counters
#[derive(Debug, Default)]
pub struct EngineStats {
    /// Events delivered to at least one listener
    pub dispatched: AtomicU64,
    /// Listener invocations that returned an error
    pub handler_errors: AtomicU64,
}

enum Inbound {
    Event(Arc<EventEnvelope>),
    Shutdown,
}

struct Entry {
    id: HandlerId,
    handler: Arc<dyn EventHandler>,
}

struct GlobalEntry {
    id: HandlerId,
    handler: Arc<dyn EventHandler>,
    ignore_source: Option<SourceId>,
}

#[derive(Default)]
struct Registry {
    by_kind: FxHashMap<EventKind, Vec<Entry>>,
    global: Vec<GlobalEntry>,
}

struct Shared {
    registry: RwLock<Registry>,
    capabilities: CapabilityTable,
    stats: EngineStats,
    next_handler: AtomicU64,
    next_seq: AtomicU64,
}

/// Cloneable, non-owning handle to a running engine
#[derive(Clone)]
pub struct EngineHandle {
    tx: Sender<Inbound>,
    shared: Arc<Shared>,
}

impl EngineHandle {
    /// Publish an event into the engine
    ///
    /// Events put from one producer thread are delivered in put order.
    /// The engine stamps the global sequence and the nanosecond ingest
    /// timestamp here.
    pub fn put(&self, source: SourceId, event: Event) -> Result<()> {
        let envelope = Arc::new(EventEnvelope {
            seq: self.shared.next_seq.fetch_add(1, Ordering::Relaxed),
            source,
            ingest_ts: Ts::now(),
            event,
        });
        self.tx
            .send(Inbound::Event(envelope))
            .context("engine inbound queue closed")
    }

    /// Attach a listener for one event kind; delivery among listeners of
    /// a kind follows registration order
    pub fn register(&self, kind: EventKind, handler: Arc<dyn EventHandler>) -> HandlerId {
        let id = HandlerId(self.shared.next_handler.fetch_add(1, Ordering::Relaxed));
        debug!(?kind, handler = handler.name(), "listener registered");
        self.shared
            .registry
            .write()
            .by_kind
            .entry(kind)
            .or_default()
            .push(Entry { id, handler });
        id
    }

    /// Attach a listener that receives every event
    ///
    /// `ignore_source` suppresses delivery of events the listener's own
    /// component produced, preventing feedback loops.
    pub fn register_global(
        &self,
        handler: Arc<dyn EventHandler>,
        ignore_source: Option<SourceId>,
    ) -> HandlerId {
        let id = HandlerId(self.shared.next_handler.fetch_add(1, Ordering::Relaxed));
        debug!(handler = handler.name(), ?ignore_source, "global listener registered");
        self.shared.registry.write().global.push(GlobalEntry {
            id,
            handler,
            ignore_source,
        });
        id
    }

    /// Detach a listener; takes effect at the next dispatch boundary
    pub fn detach(&self, id: HandlerId) {
        let mut registry = self.shared.registry.write();
        for entries in registry.by_kind.values_mut() {
            entries.retain(|e| e.id != id);
        }
        registry.global.retain(|e| e.id != id);
    }

    /// Inject a capability under `name`
    pub fn inject(&self, name: &str, capability: Capability) {
        self.shared.capabilities.inject(name, capability);
    }

    /// Call an injected capability
    pub fn call(&self, name: &str, args: Value) -> Result<Value> {
        self.shared.capabilities.call(name, args)
    }

    /// Dispatch counters
    #[must_use]
    pub fn stats(&self) -> &EngineStats {
        &self.shared.stats
    }
}

/// The engine: owns the dispatch thread and attached components
pub struct Engine {
    handle: EngineHandle,
    rx_for_worker: Option<Receiver<Inbound>>,
    config: EngineConfig,
    components: Mutex<Vec<Box<dyn Component>>>,
    worker: Option<JoinHandle<()>>,
}

impl Engine {
    /// Create an engine and start its dispatch thread
    #[must_use]
    pub fn new(config: EngineConfig) -> Self {
        let (tx, rx) = channel::bounded(config.queue_capacity);
        let shared = Arc::new(Shared {
            registry: RwLock::new(Registry::default()),
            capabilities: CapabilityTable::new(),
            stats: EngineStats::default(),
            next_handler: AtomicU64::new(0),
            next_seq: AtomicU64::new(0),
        });
        let handle = EngineHandle { tx, shared };
        let mut engine = Self {
            handle,
            rx_for_worker: Some(rx),
            config,
            components: Mutex::new(Vec::new()),
            worker: None,
        };
        engine.spawn_dispatch();
        engine
    }

    fn spawn_dispatch(&mut self) {
        let rx = self.rx_for_worker.take().expect("dispatch spawned once");
        let shared = Arc::clone(&self.handle.shared);
        let idle_wait = self.config.idle_wait;
        let worker = std::thread::Builder::new()
            .name("engine-dispatch".to_string())
            .spawn(move || dispatch_loop(&rx, &shared, idle_wait))
            .expect("spawn engine dispatch thread");
        self.worker = Some(worker);
        info!("engine dispatch thread started");
    }

    /// Cloneable handle for producers and components
    #[must_use]
    pub fn handle(&self) -> EngineHandle {
        self.handle.clone()
    }

    /// Attach and start a component; the engine owns it until shutdown
    pub fn attach(&self, mut component: Box<dyn Component>) -> Result<()> {
        info!(component = component.name(), "attaching component");
        component.start(self.handle())?;
        self.components.lock().push(component);
        Ok(())
    }

    /// Stop components in reverse attach order, then stop dispatch
    pub fn shutdown(mut self) {
        self.shutdown_inner();
    }

    fn shutdown_inner(&mut self) {
        let mut components = std::mem::take(&mut *self.components.lock());
        for component in components.iter_mut().rev() {
            if let Err(e) = component.stop() {
                warn!(component = component.name(), error = %e, "component stop failed");
            }
        }
        if self.handle.tx.send(Inbound::Shutdown).is_ok() {
            if let Some(worker) = self.worker.take() {
                let _ = worker.join();
            }
        }
        info!("engine stopped");
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        if self.worker.is_some() {
            self.shutdown_inner();
        }
    }
}

fn dispatch_loop(rx: &Receiver<Inbound>, shared: &Arc<Shared>, idle_wait: Duration) {
    loop {
        match rx.recv_timeout(idle_wait) {
            Ok(Inbound::Event(envelope)) => deliver(shared, &envelope),
            Ok(Inbound::Shutdown) => break,
            Err(channel::RecvTimeoutError::Timeout) => {}
            Err(channel::RecvTimeoutError::Disconnected) => break,
        }
    }
}

fn deliver(shared: &Arc<Shared>, envelope: &Arc<EventEnvelope>) {
    let kind = envelope.event.kind();
    let registry = shared.registry.read();

    if let Some(entries) = registry.by_kind.get(&kind) {
        for entry in entries {
            invoke(shared, entry.handler.as_ref(), envelope);
        }
    }
    for entry in &registry.global {
        if entry.ignore_source == Some(envelope.source) {
            continue;
        }
        invoke(shared, entry.handler.as_ref(), envelope);
    }
    shared.stats.dispatched.fetch_add(1, Ordering::Relaxed);
}

fn invoke(shared: &Arc<Shared>, handler: &dyn EventHandler, envelope: &Arc<EventEnvelope>) {
    if let Err(e) = handler.handle(envelope) {
        shared.stats.handler_errors.fetch_add(1, Ordering::Relaxed);
        error!(
            handler = handler.name(),
            seq = envelope.seq,
            kind = ?envelope.event.kind(),
            error = %e,
            "listener failed; continuing dispatch"
        );
    }
}
