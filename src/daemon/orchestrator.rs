//! Daemon construction and the lifecycle state machine.

use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::{timeout_at, Instant};
use tracing::{error, info, warn};

use crate::daemon::hooks::{HookContext, HookError, ReadyHook, StartHook, StopHook};
use crate::daemon::Server;
use crate::error::DaemonError;
use crate::loader::Loader;
use crate::schema::{MessageDescriptor, Record};
use crate::sources::EnvReader;

/// Lifecycle states of a daemon run.
///
/// The current state is observable through [`DaemonHandle::state`].
/// `Failed` is absorbing and reachable only before serving begins: from
/// config resolution or a startup hook (or bind) failing. Shutdown-side
/// failures never enter `Failed`; shutdown always proceeds to `Terminated`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DaemonState {
    /// Constructed, not yet run.
    Idle,
    /// Resolving per-service configuration (flags excluded).
    ResolvingConfig,
    /// Running startup hooks; the listener is not yet bound.
    HooksStarting,
    /// Listener bound and accepting; ready hooks run concurrently.
    Serving,
    /// Stop triggered; shutdown hooks and drain in progress.
    HooksStopping,
    /// Shutdown complete.
    Terminated,
    /// Startup aborted.
    Failed,
}

type BuildFn = Box<dyn FnMut(Record) -> Result<(), HookError> + Send>;

struct ServiceRegistration {
    name: String,
    descriptor: Arc<MessageDescriptor>,
    build: BuildFn,
}

/// Fluent construction of a [`Daemon`].
///
/// # Examples
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use std::time::Duration;
/// use svckit::daemon::Daemon;
/// use svckit::schema::{FieldDescriptor, FieldKind, MessageDescriptor};
///
/// let desc = Arc::new(
///     MessageDescriptor::new("UserService")
///         .with_field(FieldDescriptor::new("max_connections", FieldKind::U32)),
/// );
///
/// let daemon = Daemon::builder()
///     .config_file("config/default.yaml")
///     .env_prefix("APP")
///     .register("user-service", desc, |record| {
///         // hand the resolved record to the service constructor
///         let _ = record;
///         Ok(())
///     })
///     .grace_period(Duration::from_secs(10))
///     .build();
/// ```
pub struct DaemonBuilder {
    services: Vec<ServiceRegistration>,
    start_hooks: Vec<StartHook>,
    ready_hooks: Vec<ReadyHook>,
    stop_hooks: Vec<StopHook>,
    files: Vec<PathBuf>,
    readers: Vec<(String, String)>,
    env_prefix: Option<String>,
    env: Option<Arc<dyn EnvReader>>,
    grace: Duration,
    only: Option<Vec<String>>,
}

impl DaemonBuilder {
    /// Create a builder with no services and a 30-second grace period.
    pub fn new() -> Self {
        Self {
            services: Vec::new(),
            start_hooks: Vec::new(),
            ready_hooks: Vec::new(),
            stop_hooks: Vec::new(),
            files: Vec::new(),
            readers: Vec::new(),
            env_prefix: None,
            env: None,
            grace: Duration::from_secs(30),
            only: None,
        }
    }

    /// Register a service: its name, record shape, and construction function.
    ///
    /// At startup the resolved record is handed to `build`; an error from it
    /// aborts the whole daemon start.
    pub fn register<F>(
        mut self,
        name: impl Into<String>,
        descriptor: Arc<MessageDescriptor>,
        build: F,
    ) -> Self
    where
        F: FnMut(Record) -> Result<(), HookError> + Send + 'static,
    {
        self.services.push(ServiceRegistration {
            name: name.into(),
            descriptor,
            build: Box::new(build),
        });
        self
    }

    /// Add a config file, lowest precedence first. Flags are always excluded
    /// in daemon mode; files and environment are the only sources.
    pub fn config_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.files.push(path.into());
        self
    }

    /// Add an injected reader source, applied after all files.
    pub fn config_reader(mut self, name: impl Into<String>, text: impl Into<String>) -> Self {
        self.readers.push((name.into(), text.into()));
        self
    }

    /// Enable environment overrides under the given prefix.
    pub fn env_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.env_prefix = Some(prefix.into());
        self
    }

    /// Replace the process environment with an injected reader.
    pub fn env_reader(mut self, reader: Arc<dyn EnvReader>) -> Self {
        self.env = Some(reader);
        self
    }

    /// Register a startup hook. Startup hooks run in registration order
    /// before the listener binds; an error aborts startup.
    pub fn on_start<F, Fut>(mut self, name: impl Into<String>, hook: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), HookError>> + Send + 'static,
    {
        self.start_hooks.push(StartHook {
            name: name.into(),
            run: Box::new(move || Box::pin(hook())),
        });
        self
    }

    /// Register a readiness hook. Ready hooks run in registration order once
    /// the listener is accepting connections, concurrently with serving.
    pub fn on_ready<F, Fut>(mut self, name: impl Into<String>, hook: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.ready_hooks.push(ReadyHook {
            name: name.into(),
            run: Box::new(move || Box::pin(hook())),
        });
        self
    }

    /// Register a shutdown hook. Shutdown hooks run in strict reverse
    /// registration order: resources acquired last are released first.
    /// Failures are logged and shutdown proceeds.
    pub fn on_stop<F, Fut>(mut self, name: impl Into<String>, hook: F) -> Self
    where
        F: Fn(HookContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), HookError>> + Send + 'static,
    {
        self.stop_hooks.push(StopHook {
            name: name.into(),
            run: Box::new(move |ctx| Box::pin(hook(ctx))),
        });
        self
    }

    /// Bound the drain-and-hooks window during shutdown.
    pub fn grace_period(mut self, grace: Duration) -> Self {
        self.grace = grace;
        self
    }

    /// Activate only the named services. Names that match no registered
    /// service produce a diagnostic, not an error.
    pub fn only<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.only = Some(names.into_iter().map(Into::into).collect());
        self
    }

    /// Build the daemon.
    pub fn build(self) -> Daemon {
        let (stop_tx, stop_rx) = watch::channel(false);
        let (state_tx, state_rx) = watch::channel(DaemonState::Idle);
        Daemon {
            services: self.services,
            start_hooks: self.start_hooks,
            ready_hooks: self.ready_hooks,
            stop_hooks: self.stop_hooks,
            files: self.files,
            readers: self.readers,
            env_prefix: self.env_prefix,
            env: self.env,
            grace: self.grace,
            only: self.only,
            stop_tx: Arc::new(stop_tx),
            stop_rx,
            state_tx,
            state_rx,
        }
    }
}

impl Default for DaemonBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Cancellation handle for a running daemon.
///
/// Cloneable; calling [`DaemonHandle::stop`] triggers the same shutdown path
/// as an OS termination signal.
#[derive(Clone)]
pub struct DaemonHandle {
    stop: Arc<watch::Sender<bool>>,
    state: watch::Receiver<DaemonState>,
}

impl DaemonHandle {
    /// Trigger graceful shutdown.
    pub fn stop(&self) {
        let _ = self.stop.send(true);
    }

    /// The daemon's current lifecycle state.
    pub fn state(&self) -> DaemonState {
        *self.state.borrow()
    }
}

/// The daemon lifecycle orchestrator.
///
/// Resolves per-service configuration through the resolution engine (files
/// and environment only; flags are excluded in daemon mode), sequences
/// startup/ready/shutdown hooks, and performs timed graceful shutdown under
/// signal and cancellation pressure.
pub struct Daemon {
    services: Vec<ServiceRegistration>,
    start_hooks: Vec<StartHook>,
    ready_hooks: Vec<ReadyHook>,
    stop_hooks: Vec<StopHook>,
    files: Vec<PathBuf>,
    readers: Vec<(String, String)>,
    env_prefix: Option<String>,
    env: Option<Arc<dyn EnvReader>>,
    grace: Duration,
    only: Option<Vec<String>>,
    stop_tx: Arc<watch::Sender<bool>>,
    stop_rx: watch::Receiver<bool>,
    state_tx: watch::Sender<DaemonState>,
    state_rx: watch::Receiver<DaemonState>,
}

impl Daemon {
    /// Start building a daemon.
    pub fn builder() -> DaemonBuilder {
        DaemonBuilder::new()
    }

    /// A cancellation handle usable from other tasks.
    pub fn handle(&self) -> DaemonHandle {
        DaemonHandle {
            stop: Arc::clone(&self.stop_tx),
            state: self.state_rx.clone(),
        }
    }

    /// Run the full lifecycle: resolve config, start hooks, bind, serve
    /// until a termination trigger, then shut down under the grace period.
    ///
    /// # Errors
    ///
    /// Returns the startup-side failure that aborted the daemon, or the
    /// serve loop's error if serving terminated abnormally. Shutdown-hook
    /// failures are logged only and never surface here.
    pub async fn run<S: Server>(mut self, server: S) -> Result<(), DaemonError> {
        let server = Arc::new(server);
        if let Err(e) = self.start(&server).await {
            self.state_tx.send_replace(DaemonState::Failed);
            error!(state = ?DaemonState::Failed, error = %e, "daemon start failed");
            return Err(e);
        }
        self.serve_until_stopped(server).await
    }

    async fn start<S: Server>(&mut self, server: &Arc<S>) -> Result<(), DaemonError> {
        self.state_tx.send_replace(DaemonState::ResolvingConfig);
        info!(state = ?DaemonState::ResolvingConfig, "resolving service configuration");
        self.resolve_services()?;

        self.state_tx.send_replace(DaemonState::HooksStarting);
        info!(state = ?DaemonState::HooksStarting, "running startup hooks");
        for hook in &self.start_hooks {
            (hook.run)().await.map_err(|e| DaemonError::StartHook {
                name: hook.name.clone(),
                reason: e.to_string(),
            })?;
            info!(hook = %hook.name, "startup hook completed");
        }

        // No traffic is ever served behind a failed startup hook: bind only
        // happens after every hook succeeded.
        server.bind().await?;
        Ok(())
    }

    /// Resolve configuration for every active service and hand the records
    /// to their construction functions. Any failure aborts the whole start;
    /// there is no partial daemon with some services misconfigured.
    fn resolve_services(&mut self) -> Result<(), DaemonError> {
        if let Some(only) = &self.only {
            for name in only {
                if !self.services.iter().any(|s| &s.name == name) {
                    warn!(service = %name, "allow-list entry matches no registered service");
                }
            }
        }

        let files = self.files.clone();
        let readers = self.readers.clone();
        let env_prefix = self.env_prefix.clone();
        let env = self.env.clone();
        let only = self.only.clone();

        for svc in self.services.iter_mut() {
            if let Some(only) = &only {
                if !only.contains(&svc.name) {
                    info!(service = %svc.name, "not in allow-list, skipping");
                    continue;
                }
            }

            let mut builder = Loader::builder();
            for path in &files {
                builder = builder.with_file(path.clone());
            }
            for (name, text) in &readers {
                builder = builder.with_reader(name.clone(), text.clone());
            }
            if let Some(prefix) = &env_prefix {
                builder = builder.with_env_prefix(prefix.clone());
            }
            if let Some(env) = &env {
                builder = builder.with_env_reader(Arc::clone(env));
            }
            // Flags deliberately never wired here: daemon mode is
            // flag-excluded by construction.
            let mut loader = builder.build();

            let mut record = Record::new(Arc::clone(&svc.descriptor));
            loader
                .load(&svc.name, &mut record)
                .map_err(|e| DaemonError::Config {
                    service: svc.name.clone(),
                    source: e,
                })?;
            (svc.build)(record).map_err(|e| DaemonError::Build {
                service: svc.name.clone(),
                reason: e.to_string(),
            })?;
            info!(service = %svc.name, "service configured");
        }
        Ok(())
    }

    async fn serve_until_stopped<S: Server>(mut self, server: Arc<S>) -> Result<(), DaemonError> {
        let serve_server = Arc::clone(&server);
        let mut serve_task = tokio::spawn(async move { serve_server.serve().await });

        self.state_tx.send_replace(DaemonState::Serving);
        info!(state = ?DaemonState::Serving, "listener accepting connections");
        // Ready hooks run on the control task; serving continues on its own
        // task, so a slow hook never blocks the accept loop.
        for hook in &self.ready_hooks {
            (hook.run)().await;
            info!(hook = %hook.name, "ready hook completed");
        }

        let mut stop_rx = self.stop_rx.clone();
        let mut serve_exit: Option<Result<(), DaemonError>> = None;
        tokio::select! {
            _ = shutdown_signal() => {
                info!("termination signal received");
            }
            _ = stop_rx.changed() => {
                info!("stop requested by caller");
            }
            res = &mut serve_task => {
                serve_exit = Some(match res {
                    Ok(inner) => inner,
                    Err(e) => Err(DaemonError::Serve(format!("serve task panicked: {e}"))),
                });
            }
        }

        self.state_tx.send_replace(DaemonState::HooksStopping);
        info!(state = ?DaemonState::HooksStopping, grace = ?self.grace, "shutting down");
        let deadline = Instant::now() + self.grace;
        let stop_hooks = std::mem::take(&mut self.stop_hooks);
        let hooks_task = tokio::spawn(async move {
            for hook in stop_hooks.iter().rev() {
                let ctx = HookContext::new(deadline);
                if let Err(e) = (hook.run)(ctx).await {
                    warn!(hook = %hook.name, error = %e, "shutdown hook failed, continuing");
                }
            }
        });

        if timeout_at(deadline, server.graceful_shutdown()).await.is_err() {
            warn!("grace period elapsed before drain completed, forcing stop");
            server.abort();
        }
        // Hooks get the remainder of the grace period too; past the deadline
        // they are abandoned, not awaited. Shutdown completion is "drain
        // completed or grace elapsed", never "all hooks returned".
        if timeout_at(deadline, hooks_task).await.is_err() {
            warn!("grace period elapsed with shutdown hooks still running, abandoning them");
        }
        if serve_exit.is_none() {
            if timeout_at(deadline, &mut serve_task).await.is_err() {
                serve_task.abort();
            }
        }

        self.state_tx.send_replace(DaemonState::Terminated);
        info!(state = ?DaemonState::Terminated, "daemon terminated");
        match serve_exit {
            Some(Err(e)) => Err(e),
            _ => Ok(()),
        }
    }
}

/// Resolves when the process receives SIGINT or, on unix, SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
