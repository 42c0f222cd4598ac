//! Declarative-file configuration sources.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{ConfigError, Result};

/// A config file at a known path.
///
/// Files are optional by contract: a missing file is a normal "no overrides
/// from this source" outcome, reported as `Ok(None)` by [`FileSource::probe`].
/// A file that exists but cannot be parsed is a fatal error.
///
/// # Examples
///
/// ```rust,no_run
/// use svckit::sources::FileSource;
///
/// let source = FileSource::new("config/default.yaml");
/// let doc = source.probe()?;
/// # Ok::<(), svckit::error::ConfigError>(())
/// ```
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    /// Create a source for the given path.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The path this source reads.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Human-readable source name for logging and debug tracking.
    pub fn name(&self) -> String {
        format!("file:{}", self.path.display())
    }

    /// Read and parse the file.
    ///
    /// Returns `Ok(None)` if the file does not exist.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Io` if the file exists but cannot be read, and
    /// `ConfigError::Parse` if its contents are not valid structured text.
    pub fn probe(&self) -> Result<Option<serde_yaml::Value>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let text = fs::read_to_string(&self.path)?;
        let doc = serde_yaml::from_str(&text).map_err(|e| ConfigError::Parse {
            source_name: self.name(),
            reason: e.to_string(),
        })?;
        Ok(Some(doc))
    }
}

/// A programmatically injected source: a named blob of structured text that
/// follows the identical parse-then-merge path as a file.
pub struct ReaderSource {
    name: String,
    text: String,
}

impl ReaderSource {
    /// Create a source from a label and raw structured text.
    pub fn new(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            text: text.into(),
        }
    }

    /// Human-readable source name for logging and debug tracking.
    pub fn name(&self) -> String {
        format!("reader:{}", self.name)
    }

    /// Parse the injected text.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Parse` if the text is not valid structured text.
    pub fn parse(&self) -> Result<serde_yaml::Value> {
        serde_yaml::from_str(&self.text).map_err(|e| ConfigError::Parse {
            source_name: self.name(),
            reason: e.to_string(),
        })
    }
}

/// Extract the nested map scoped to one service from a parsed document.
///
/// Looks up `services.<service>`. Returns `Ok(None)` when the `services` key
/// or the service's own section is absent; not every file need mention every
/// service. A section that is present but not a map is a type error.
pub fn service_section<'a>(
    doc: &'a serde_yaml::Value,
    service: &str,
) -> Result<Option<&'a serde_yaml::Mapping>> {
    let Some(services) = doc.get("services") else {
        return Ok(None);
    };
    let Some(section) = services.get(service) else {
        return Ok(None);
    };
    section
        .as_mapping()
        .map(Some)
        .ok_or_else(|| ConfigError::type_mismatch(format!("services.{service}"), "mapping", yaml_kind(section)))
}

/// Conventional config locations for an application: `./<app>.yaml` plus the
/// per-user config directory.
pub fn default_search_paths(app: &str) -> Vec<PathBuf> {
    let mut paths = vec![PathBuf::from(format!("{app}.yaml"))];
    if let Some(dir) = dirs::config_dir() {
        paths.push(dir.join(app).join(format!("{app}.yaml")));
    }
    paths
}

/// Short kind name for a parsed value, used in error messages.
pub(crate) fn yaml_kind(value: &serde_yaml::Value) -> &'static str {
    match value {
        serde_yaml::Value::Null => "null",
        serde_yaml::Value::Bool(_) => "bool",
        serde_yaml::Value::Number(n) if n.is_f64() => "float",
        serde_yaml::Value::Number(_) => "integer",
        serde_yaml::Value::String(_) => "string",
        serde_yaml::Value::Sequence(_) => "sequence",
        serde_yaml::Value::Mapping(_) => "mapping",
        serde_yaml::Value::Tagged(_) => "tagged",
    }
}
