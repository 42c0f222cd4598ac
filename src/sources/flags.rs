//! Command-line flag reading.
//!
//! The CLI parser framework itself is an external collaborator; this module
//! is the interface the engine needs from it. Like environment access, flag
//! lookup is pull-based and keyed by derived names.

use std::collections::BTreeMap;

/// Pull-based flag lookup.
///
/// Implementations must report a flag only when it was *explicitly set* by
/// the invocation. A flag merely carrying its declared default must read as
/// absent. The engine relies on this to let file- and environment-supplied
/// values survive unset flags.
pub trait FlagReader: Send + Sync {
    /// The raw value of the named flag, or `None` if it was not explicitly
    /// passed.
    fn lookup(&self, name: &str) -> Option<String>;
}

/// The set of flags an invocation explicitly passed.
///
/// The CLI layer populates this after parsing, inserting only flags the user
/// actually supplied. Flags resting at their defaults are never inserted,
/// which is what makes "set" distinguishable from "default".
///
/// # Examples
///
/// ```rust
/// use svckit::sources::{FlagReader, FlagSet};
///
/// let mut flags = FlagSet::new();
/// flags.set("max-conns", "99");
/// assert_eq!(flags.lookup("max-conns").as_deref(), Some("99"));
/// assert_eq!(flags.lookup("host"), None);
/// ```
#[derive(Debug, Default, Clone)]
pub struct FlagSet {
    values: BTreeMap<String, String>,
}

impl FlagSet {
    /// Create an empty flag set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an explicitly passed flag.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.values.insert(name.into(), value.into());
    }

    /// Builder-style variant of [`FlagSet::set`].
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set(name, value);
        self
    }

    /// Whether any flags were passed at all.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl FlagReader for FlagSet {
    fn lookup(&self, name: &str) -> Option<String> {
        self.values.get(name).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unset_flag_reads_as_absent() {
        let flags = FlagSet::new().with("verbose", "true");
        assert!(flags.lookup("verbose").is_some());
        assert!(flags.lookup("quiet").is_none());
    }
}
