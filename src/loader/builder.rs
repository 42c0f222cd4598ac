//! Builder for constructing [`Loader`] instances.

use std::path::PathBuf;
use std::sync::Arc;

use crate::loader::debug::DebugRecord;
use crate::loader::Loader;
use crate::sources::{default_search_paths, EnvReader, FlagReader, ProcessEnv, ReaderSource};

/// Fluent construction of a [`Loader`].
///
/// File sources merge in the order they are added: later files override
/// earlier ones per leaf field. Flag overrides are permitted only when a
/// flag reader is supplied; daemon mode builds loaders without one.
///
/// # Examples
///
/// ```rust,no_run
/// use svckit::loader::Loader;
///
/// let loader = Loader::builder()
///     .with_file("config/default.yaml")
///     .with_file("config/production.yaml")
///     .with_env_prefix("APP")
///     .build();
/// ```
pub struct LoaderBuilder {
    files: Vec<PathBuf>,
    readers: Vec<ReaderSource>,
    env_prefix: Option<String>,
    env: Option<Arc<dyn EnvReader>>,
    flags: Option<Arc<dyn FlagReader>>,
    debug: bool,
}

impl LoaderBuilder {
    /// Create a builder with no sources.
    pub fn new() -> Self {
        Self {
            files: Vec::new(),
            readers: Vec::new(),
            env_prefix: None,
            env: None,
            flags: None,
            debug: false,
        }
    }

    /// Add a file source. Files are optional; a missing file contributes
    /// nothing. Order matters: later files override earlier ones.
    pub fn with_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.files.push(path.into());
        self
    }

    /// Add the conventional file locations for an application:
    /// `./<app>.yaml` plus the per-user config directory.
    pub fn with_default_files(mut self, app: &str) -> Self {
        self.files.extend(default_search_paths(app));
        self
    }

    /// Add a named reader source: raw structured text that follows the
    /// identical parse-then-merge path as a file. Applied after all files.
    pub fn with_reader(mut self, name: impl Into<String>, text: impl Into<String>) -> Self {
        self.readers.push(ReaderSource::new(name, text));
        self
    }

    /// Enable environment overrides under the given prefix.
    ///
    /// Variables are named `<PREFIX>_<FIELD_PATH>` with the field path
    /// upper-snake-cased from the record root to the leaf.
    pub fn with_env_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.env_prefix = Some(prefix.into());
        self
    }

    /// Replace the process environment with an injected reader (tests,
    /// programmatic use). Defaults to the real process environment.
    pub fn with_env_reader(mut self, reader: Arc<dyn EnvReader>) -> Self {
        self.env = Some(reader);
        self
    }

    /// Permit flag overrides, read from the given reader. The reader must
    /// report only flags the invocation explicitly set.
    pub fn with_flags(mut self, reader: Arc<dyn FlagReader>) -> Self {
        self.flags = Some(reader);
        self
    }

    /// Enable debug tracking for this load sequence.
    pub fn with_debug(mut self) -> Self {
        self.debug = true;
        self
    }

    /// Build the loader.
    pub fn build(self) -> Loader {
        Loader {
            files: self.files,
            readers: self.readers,
            env_prefix: self.env_prefix,
            env: self.env.unwrap_or_else(|| Arc::new(ProcessEnv)),
            flags: self.flags,
            debug: self.debug.then(DebugRecord::default),
        }
    }
}

impl Default for LoaderBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_accumulates_files_in_order() {
        let loader = LoaderBuilder::new()
            .with_file("a.yaml")
            .with_file("b.yaml")
            .build();
        assert_eq!(loader.files, vec![PathBuf::from("a.yaml"), PathBuf::from("b.yaml")]);
    }

    #[test]
    fn debug_disabled_by_default() {
        let loader = LoaderBuilder::new().build();
        assert!(loader.debug().is_none());
    }

    #[test]
    fn flags_excluded_unless_supplied() {
        let loader = LoaderBuilder::new().build();
        assert!(loader.flags.is_none());
    }
}
