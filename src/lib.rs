//! # svckit
//!
//! Runtime configuration resolution and daemon lifecycle orchestration for
//! schema-described RPC services.
//!
//! ## Overview
//!
//! `svckit` provides the runtime half of a schema-to-CLI toolchain:
//! - A resolution engine that merges layered config files, environment
//!   variables, and explicitly-set command-line flags into arbitrarily
//!   shaped, schema-described records (flags > env > files, deep merge)
//! - Path-qualified errors: every mismatch names the full dotted path from
//!   the record root
//! - A daemon orchestrator that resolves per-service config, sequences
//!   startup/ready/shutdown hooks, and drains under a bounded grace period
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use svckit::prelude::*;
//!
//! let desc = Arc::new(
//!     MessageDescriptor::new("UserService")
//!         .with_field(FieldDescriptor::new("max_connections", FieldKind::U32)),
//! );
//!
//! // Resolve with standard precedence: flags > env > files
//! let mut loader = Loader::builder()
//!     .with_file("config/default.yaml")
//!     .with_env_prefix("APP")
//!     .build();
//!
//! let mut record = Record::new(desc);
//! loader.load("user-service", &mut record)?;
//! # Ok::<(), svckit::error::ConfigError>(())
//! ```
//!
//! ## Long-running mode
//!
//! Daemon mode resolves each registered service through the same engine
//! (files and environment only; flags are a single-invocation concept),
//! runs startup hooks in order, serves until a signal or caller stop, and
//! runs shutdown hooks in reverse order under the grace period. See
//! [`daemon::Daemon`].

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod daemon;
pub mod error;
pub mod loader;
pub mod schema;
pub mod sources;

/// Convenient re-exports for common usage patterns.
pub mod prelude {
    pub use crate::daemon::{Daemon, DaemonBuilder, DaemonHandle, HookContext, Server};
    pub use crate::error::{ConfigError, DaemonError, Result};
    pub use crate::loader::{Loader, LoaderBuilder};
    pub use crate::schema::{
        Cardinality, EnumDescriptor, FieldDescriptor, FieldKind, MessageDescriptor, Record, Value,
    };
    pub use crate::sources::{FlagSet, MapEnv};
}
