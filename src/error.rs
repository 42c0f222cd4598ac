//! Error types for svckit.

/// Result type alias for configuration-resolution operations.
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Errors that can occur while resolving configuration into a record.
///
/// Every schema-level error carries the fully-qualified dotted path from the
/// record root (`database.pool.max_size`, not `max_size`), so mismatches in
/// deeply nested config remain debuggable.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A config file or reader was present but could not be parsed.
    #[error("Failed to parse configuration source '{source_name}': {reason}")]
    Parse {
        /// Name of the offending source (file path or reader label).
        source_name: String,
        /// Underlying parser message.
        reason: String,
    },

    /// Source data referenced a field name absent from the schema.
    #[error("Unknown field '{path}'")]
    UnknownField {
        /// Fully-qualified dotted path of the unknown name.
        path: String,
    },

    /// A value was present but of the wrong kind for its field.
    #[error("Type mismatch at '{path}': expected {expected}, got {actual}")]
    TypeMismatch {
        /// Fully-qualified dotted path of the field.
        path: String,
        /// The kind the schema declares.
        expected: String,
        /// The kind the source supplied.
        actual: String,
    },

    /// A numeric value exceeds the representable range of its target field.
    #[error("Value {value} overflows field '{path}'")]
    Overflow {
        /// Fully-qualified dotted path of the field.
        path: String,
        /// The offending value, rendered as supplied.
        value: String,
    },

    /// The field kind cannot accept data from this source at all.
    ///
    /// Raised for legacy group fields, and for message-typed fields fed from
    /// single-string sources (environment, flags), where silently dropping
    /// the data would be worse than failing.
    #[error("Unsupported kind {kind} at '{path}'")]
    UnsupportedKind {
        /// Fully-qualified dotted path of the field.
        path: String,
        /// The rejected kind.
        kind: String,
    },

    /// An enum value did not match any symbolic name in the value table.
    #[error("Unknown enum value '{value}' at '{path}'")]
    UnknownEnumValue {
        /// Fully-qualified dotted path of the field.
        path: String,
        /// The unmatched name.
        value: String,
    },

    /// IO error reading a config source.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ConfigError {
    /// Build an unknown-field error for the given dotted path.
    pub fn unknown_field(path: impl Into<String>) -> Self {
        Self::UnknownField { path: path.into() }
    }

    /// Build a type-mismatch error naming expected vs. actual kinds.
    pub fn type_mismatch(
        path: impl Into<String>,
        expected: impl Into<String>,
        actual: impl Into<String>,
    ) -> Self {
        Self::TypeMismatch {
            path: path.into(),
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    /// Build an overflow error for the given path and rendered value.
    pub fn overflow(path: impl Into<String>, value: impl std::fmt::Display) -> Self {
        Self::Overflow {
            path: path.into(),
            value: value.to_string(),
        }
    }
}

/// Errors surfaced by the daemon lifecycle orchestrator.
///
/// Startup-side failures (config resolution, start hooks, bind) are fatal to
/// daemon start. Shutdown-hook failures are deliberately *not* represented
/// here: they are logged and shutdown proceeds.
#[derive(Debug, thiserror::Error)]
pub enum DaemonError {
    /// Configuration resolution failed for a registered service.
    #[error("Configuration for service '{service}' failed: {source}")]
    Config {
        /// The registered service name.
        service: String,
        /// The underlying resolution error.
        #[source]
        source: ConfigError,
    },

    /// A service construction function rejected its resolved record.
    #[error("Service '{service}' failed to construct: {reason}")]
    Build {
        /// The registered service name.
        service: String,
        /// Why construction failed.
        reason: String,
    },

    /// A startup hook returned an error; the listener was never bound.
    #[error("Startup hook '{name}' failed: {reason}")]
    StartHook {
        /// The hook's registered name.
        name: String,
        /// The hook's error message.
        reason: String,
    },

    /// The server failed to bind its listener.
    #[error("Failed to bind listener: {0}")]
    Bind(String),

    /// The serve loop exited with an error.
    #[error("Server error: {0}")]
    Serve(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_mismatch_names_full_path() {
        let err = ConfigError::type_mismatch("database.pool.max_size", "integer", "string");
        let msg = err.to_string();
        assert!(msg.contains("database.pool.max_size"));
        assert!(msg.contains("expected integer"));
        assert!(msg.contains("got string"));
    }

    #[test]
    fn daemon_config_error_wraps_source() {
        let err = DaemonError::Config {
            service: "user-service".to_string(),
            source: ConfigError::unknown_field("server.prot"),
        };
        assert!(err.to_string().contains("user-service"));
        assert!(err.to_string().contains("server.prot"));
    }
}
