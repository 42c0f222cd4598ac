//! The seam to the external RPC listener.

use async_trait::async_trait;

use crate::error::DaemonError;

/// The RPC listener the daemon orchestrates.
///
/// The orchestrator never knows what is being served; it only sequences
/// binding, serving, and shutdown around this trait. `serve` runs on a
/// dedicated task so the orchestrator can wait for termination triggers while
/// the listener keeps accepting connections.
#[async_trait]
pub trait Server: Send + Sync + 'static {
    /// Open the listener. Ready hooks run only after this returns; no
    /// traffic is served if it fails.
    async fn bind(&self) -> Result<(), DaemonError>;

    /// Accept and serve until shutdown. An error return is a termination
    /// trigger for the whole daemon.
    async fn serve(&self) -> Result<(), DaemonError>;

    /// Stop accepting new work and resolve once in-flight work has drained.
    /// The orchestrator bounds this with the grace period.
    async fn graceful_shutdown(&self);

    /// Forcibly terminate outstanding work. Called when the grace period
    /// elapses before drain completes.
    fn abort(&self);
}
