//! Integration tests for the daemon lifecycle orchestrator.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::watch;

use svckit::daemon::{Daemon, DaemonState, Server};
use svckit::error::DaemonError;
use svckit::schema::{FieldDescriptor, FieldKind, MessageDescriptor, Value};
use svckit::sources::MapEnv;

/// In-memory listener standing in for the RPC server.
struct MockServer {
    bound: Arc<AtomicBool>,
    aborted: Arc<AtomicBool>,
    stop_tx: watch::Sender<bool>,
    drain_forever: bool,
}

impl MockServer {
    fn new(drain_forever: bool) -> (Self, Arc<AtomicBool>, Arc<AtomicBool>) {
        let bound = Arc::new(AtomicBool::new(false));
        let aborted = Arc::new(AtomicBool::new(false));
        let (stop_tx, _) = watch::channel(false);
        (
            Self {
                bound: Arc::clone(&bound),
                aborted: Arc::clone(&aborted),
                stop_tx,
                drain_forever,
            },
            bound,
            aborted,
        )
    }
}

#[async_trait]
impl Server for MockServer {
    async fn bind(&self) -> Result<(), DaemonError> {
        self.bound.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn serve(&self) -> Result<(), DaemonError> {
        let mut rx = self.stop_tx.subscribe();
        while !*rx.borrow() {
            if rx.changed().await.is_err() {
                break;
            }
        }
        Ok(())
    }

    async fn graceful_shutdown(&self) {
        let _ = self.stop_tx.send(true);
        if self.drain_forever {
            std::future::pending::<()>().await;
        }
    }

    fn abort(&self) {
        self.aborted.store(true, Ordering::SeqCst);
        let _ = self.stop_tx.send(true);
    }
}

fn service_desc() -> Arc<MessageDescriptor> {
    Arc::new(
        MessageDescriptor::new("UserService")
            .with_field(FieldDescriptor::new("max_connections", FieldKind::U32)),
    )
}

type EventLog = Arc<Mutex<Vec<String>>>;

fn push(log: &EventLog, event: &str) {
    log.lock().unwrap().push(event.to_string());
}

#[tokio::test(start_paused = true)]
async fn full_cycle_runs_hooks_in_order_and_reverse() {
    let log: EventLog = Arc::new(Mutex::new(Vec::new()));
    let (server, _, _) = MockServer::new(false);

    let l = Arc::clone(&log);
    let mut builder = Daemon::builder()
        .register("user-service", service_desc(), move |_record| {
            push(&l, "build");
            Ok(())
        })
        .grace_period(Duration::from_secs(5));

    for name in ["A", "B", "C"] {
        let l = Arc::clone(&log);
        builder = builder.on_start(name, move || {
            let l = Arc::clone(&l);
            async move {
                push(&l, &format!("start:{name}"));
                Ok(())
            }
        });
    }
    let l = Arc::clone(&log);
    builder = builder.on_ready("R", move || {
        let l = Arc::clone(&l);
        async move { push(&l, "ready:R") }
    });
    for name in ["X", "Y", "Z"] {
        let l = Arc::clone(&log);
        builder = builder.on_stop(name, move |_ctx| {
            let l = Arc::clone(&l);
            async move {
                push(&l, &format!("stop:{name}"));
                Ok(())
            }
        });
    }

    let daemon = builder.build();
    let handle = daemon.handle();
    let run = tokio::spawn(daemon.run(server));

    // Give startup a chance to complete, then trigger shutdown.
    tokio::time::sleep(Duration::from_millis(50)).await;
    handle.stop();
    run.await.unwrap().unwrap();

    let events = log.lock().unwrap().clone();
    assert_eq!(
        events,
        [
            "build", "start:A", "start:B", "start:C", "ready:R", "stop:Z", "stop:Y", "stop:X",
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn slow_shutdown_hook_does_not_block_termination() {
    let hook_finished = Arc::new(AtomicBool::new(false));
    let (server, _, aborted) = MockServer::new(false);

    let finished = Arc::clone(&hook_finished);
    let daemon = Daemon::builder()
        .register("user-service", service_desc(), |_record| Ok(()))
        .grace_period(Duration::from_secs(1))
        .on_stop("sleeper", move |_ctx| {
            let finished = Arc::clone(&finished);
            async move {
                tokio::time::sleep(Duration::from_secs(600)).await;
                finished.store(true, Ordering::SeqCst);
                Ok(())
            }
        })
        .build();

    let handle = daemon.handle();
    let run = tokio::spawn(daemon.run(server));
    tokio::time::sleep(Duration::from_millis(50)).await;
    handle.stop();

    run.await.unwrap().unwrap();
    // The hook was abandoned at the deadline, not awaited.
    assert!(!hook_finished.load(Ordering::SeqCst));
    // Drain itself completed, so no force-stop was needed.
    assert!(!aborted.load(Ordering::SeqCst));
}

#[tokio::test(start_paused = true)]
async fn stuck_drain_is_force_stopped_at_the_deadline() {
    let (server, _, aborted) = MockServer::new(true);

    let daemon = Daemon::builder()
        .register("user-service", service_desc(), |_record| Ok(()))
        .grace_period(Duration::from_secs(1))
        .build();

    let handle = daemon.handle();
    let run = tokio::spawn(daemon.run(server));
    tokio::time::sleep(Duration::from_millis(50)).await;
    handle.stop();

    run.await.unwrap().unwrap();
    assert!(aborted.load(Ordering::SeqCst));
}

#[tokio::test(start_paused = true)]
async fn handle_observes_lifecycle_states() {
    let (server, _, _) = MockServer::new(false);
    let daemon = Daemon::builder()
        .register("user-service", service_desc(), |_record| Ok(()))
        .grace_period(Duration::from_secs(1))
        .build();
    let handle = daemon.handle();
    assert_eq!(handle.state(), DaemonState::Idle);

    let run = tokio::spawn(daemon.run(server));
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(handle.state(), DaemonState::Serving);

    handle.stop();
    run.await.unwrap().unwrap();
    assert_eq!(handle.state(), DaemonState::Terminated);
}

#[tokio::test]
async fn failed_startup_hook_aborts_before_bind() {
    let log: EventLog = Arc::new(Mutex::new(Vec::new()));
    let (server, bound, _) = MockServer::new(false);

    let l1 = Arc::clone(&log);
    let l2 = Arc::clone(&log);
    let daemon = Daemon::builder()
        .register("user-service", service_desc(), |_record| Ok(()))
        .on_start("ok", move || {
            let l = Arc::clone(&l1);
            async move {
                push(&l, "start:ok");
                Ok(())
            }
        })
        .on_start("boom", move || {
            let l = Arc::clone(&l2);
            async move {
                push(&l, "start:boom");
                Err("subsystem unavailable".into())
            }
        })
        .on_start("never", || async { Ok(()) })
        .build();

    let handle = daemon.handle();
    let err = daemon.run(server).await.unwrap_err();
    assert!(matches!(err, DaemonError::StartHook { .. }));
    assert!(err.to_string().contains("boom"));
    assert_eq!(handle.state(), DaemonState::Failed);
    // The listener was never bound; no traffic behind a failed hook.
    assert!(!bound.load(Ordering::SeqCst));
    assert_eq!(log.lock().unwrap().clone(), ["start:ok", "start:boom"]);
}

#[tokio::test]
async fn config_failure_is_fatal_to_daemon_start() {
    let (server, bound, _) = MockServer::new(false);

    let daemon = Daemon::builder()
        .config_reader(
            "inline",
            "services:\n  user-service:\n    max_conections: 10\n",
        )
        .register("user-service", service_desc(), |_record| Ok(()))
        .build();

    let err = daemon.run(server).await.unwrap_err();
    assert!(matches!(err, DaemonError::Config { .. }));
    assert!(err.to_string().contains("max_conections"));
    assert!(!bound.load(Ordering::SeqCst));
}

#[tokio::test(start_paused = true)]
async fn allow_list_filters_registered_services() {
    let log: EventLog = Arc::new(Mutex::new(Vec::new()));
    let (server, _, _) = MockServer::new(false);

    let l1 = Arc::clone(&log);
    let l2 = Arc::clone(&log);
    let daemon = Daemon::builder()
        .register("user-service", service_desc(), move |_record| {
            push(&l1, "build:user-service");
            Ok(())
        })
        .register("billing", service_desc(), move |_record| {
            push(&l2, "build:billing");
            Ok(())
        })
        // "ghost" matches nothing: a diagnostic, not an error.
        .only(["user-service", "ghost"])
        .grace_period(Duration::from_secs(1))
        .build();

    let handle = daemon.handle();
    let run = tokio::spawn(daemon.run(server));
    tokio::time::sleep(Duration::from_millis(50)).await;
    handle.stop();
    run.await.unwrap().unwrap();

    assert_eq!(log.lock().unwrap().clone(), ["build:user-service"]);
}

#[tokio::test(start_paused = true)]
async fn daemon_resolves_config_with_env_overrides_but_no_flags() {
    let resolved: Arc<Mutex<Option<Value>>> = Arc::new(Mutex::new(None));
    let (server, _, _) = MockServer::new(false);

    let out = Arc::clone(&resolved);
    let daemon = Daemon::builder()
        .config_reader(
            "inline",
            "services:\n  user-service:\n    max_connections: 10\n",
        )
        .env_prefix("APP")
        .env_reader(Arc::new(MapEnv::new().with("APP_MAX_CONNECTIONS", "50")))
        .register("user-service", service_desc(), move |record| {
            *out.lock().unwrap() = record.get("max_connections").cloned();
            Ok(())
        })
        .grace_period(Duration::from_secs(1))
        .build();

    let handle = daemon.handle();
    let run = tokio::spawn(daemon.run(server));
    tokio::time::sleep(Duration::from_millis(50)).await;
    handle.stop();
    run.await.unwrap().unwrap();

    assert_eq!(resolved.lock().unwrap().clone(), Some(Value::U32(50)));
}
