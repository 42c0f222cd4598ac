//! Long-running server mode: config resolution per service, ordered
//! lifecycle hooks, and timed graceful shutdown.

mod hooks;
mod orchestrator;
mod server;

pub use hooks::{HookContext, HookError};
pub use orchestrator::{Daemon, DaemonBuilder, DaemonHandle, DaemonState};
pub use server::Server;
