//! Lifecycle hooks and their execution context.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use tokio::time::Instant;

/// Error type hooks and service construction functions may return.
pub type HookError = Box<dyn std::error::Error + Send + Sync>;

pub(crate) type BoxFuture<T> = Pin<Box<dyn Future<Output = T> + Send>>;

/// Context handed to shutdown hooks: the grace-period deadline, so hooks can
/// observe how much time remains before the server is force-stopped.
#[derive(Debug, Clone, Copy)]
pub struct HookContext {
    deadline: Instant,
}

impl HookContext {
    pub(crate) fn new(deadline: Instant) -> Self {
        Self { deadline }
    }

    /// The absolute deadline after which shutdown proceeds regardless.
    pub fn deadline(&self) -> Instant {
        self.deadline
    }

    /// Time remaining until the deadline; zero once it has passed.
    pub fn remaining(&self) -> Duration {
        self.deadline.saturating_duration_since(Instant::now())
    }
}

/// A startup hook. Runs in registration order before the listener binds; an
/// error aborts daemon start.
pub(crate) struct StartHook {
    pub(crate) name: String,
    pub(crate) run: Box<dyn Fn() -> BoxFuture<Result<(), HookError>> + Send + Sync>,
}

/// A readiness hook. Runs in registration order once the listener is
/// accepting connections; cannot fail, so errors must be handled inside.
pub(crate) struct ReadyHook {
    pub(crate) name: String,
    pub(crate) run: Box<dyn Fn() -> BoxFuture<()> + Send + Sync>,
}

/// A shutdown hook. Runs in reverse registration order; failures are logged
/// only and never stop the remaining hooks.
pub(crate) struct StopHook {
    pub(crate) name: String,
    pub(crate) run: Box<dyn Fn(HookContext) -> BoxFuture<Result<(), HookError>> + Send + Sync>,
}
