//! Environment-variable reading.
//!
//! Environment access is pull-based: the engine asks "is this derived name
//! set?" during its schema walk, because the derived name depends on a
//! field's position in the schema tree, which is only known mid-walk.

use std::collections::BTreeMap;

/// Pull-based environment lookup.
pub trait EnvReader: Send + Sync {
    /// The raw value of the named variable, or `None` if unset.
    fn lookup(&self, name: &str) -> Option<String>;
}

/// Reads the real process environment.
pub struct ProcessEnv;

impl EnvReader for ProcessEnv {
    fn lookup(&self, name: &str) -> Option<String> {
        std::env::var(name).ok()
    }
}

/// A fixed in-memory environment, for programmatic injection and tests.
///
/// # Examples
///
/// ```rust
/// use svckit::sources::{EnvReader, MapEnv};
///
/// let env = MapEnv::new().with("APP_PORT", "8080");
/// assert_eq!(env.lookup("APP_PORT").as_deref(), Some("8080"));
/// assert_eq!(env.lookup("APP_HOST"), None);
/// ```
#[derive(Debug, Default, Clone)]
pub struct MapEnv {
    vars: BTreeMap<String, String>,
}

impl MapEnv {
    /// Create an empty environment.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a variable.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.vars.insert(name.into(), value.into());
        self
    }
}

impl EnvReader for MapEnv {
    fn lookup(&self, name: &str) -> Option<String> {
        self.vars.get(name).cloned()
    }
}
