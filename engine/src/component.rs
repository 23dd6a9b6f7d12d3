//! Engine-managed component lifecycle

use crate::dispatch::EngineHandle;
use anyhow::Result;

/// Anything the engine owns and drives through start/stop
///
/// `start` receives a handle for registering listeners, injecting
/// capabilities and publishing events. Components hold only that
/// non-owning handle; no component outlives the engine.
pub trait Component: Send {
    /// Name used in logs
    fn name(&self) -> &str;

    /// Called once when the component is attached
    fn start(&mut self, engine: EngineHandle) -> Result<()>;

    /// Called once at engine shutdown, in reverse attach order
    fn stop(&mut self) -> Result<()>;
}
