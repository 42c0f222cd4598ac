//! Debug tracking for one load sequence.

use std::collections::BTreeMap;

use crate::schema::Record;

/// Accumulated introspection data for a single load.
///
/// Created fresh per loader instance when debug mode is enabled. One loader
/// instance is intended for one load sequence; the record is read-only to
/// external callers and is meant to be rendered by a diagnostic command
/// surface.
#[derive(Debug, Default, Clone)]
pub struct DebugRecord {
    sources_probed: Vec<String>,
    sources_loaded: Vec<String>,
    sources_failed: BTreeMap<String, String>,
    env_applied: BTreeMap<String, String>,
    flags_applied: BTreeMap<String, String>,
    resolved: Option<Record>,
}

impl DebugRecord {
    /// Every file or reader the load probed, in probe order.
    pub fn sources_probed(&self) -> &[String] {
        &self.sources_probed
    }

    /// The subset of probed sources that parsed successfully.
    pub fn sources_loaded(&self) -> &[String] {
        &self.sources_loaded
    }

    /// Probed sources that did not contribute, with the reason (absent file,
    /// parse failure).
    pub fn sources_failed(&self) -> &BTreeMap<String, String> {
        &self.sources_failed
    }

    /// Environment variables that were applied, name to raw value.
    pub fn env_applied(&self) -> &BTreeMap<String, String> {
        &self.env_applied
    }

    /// Flags that were applied, name to raw value.
    pub fn flags_applied(&self) -> &BTreeMap<String, String> {
        &self.flags_applied
    }

    /// Snapshot of the final resolved record.
    pub fn resolved(&self) -> Option<&Record> {
        self.resolved.as_ref()
    }

    pub(crate) fn record_probe(&mut self, name: String) {
        self.sources_probed.push(name);
    }

    pub(crate) fn record_loaded(&mut self, name: String) {
        self.sources_loaded.push(name);
    }

    pub(crate) fn record_failure(&mut self, name: String, reason: String) {
        self.sources_failed.insert(name, reason);
    }

    pub(crate) fn record_env(&mut self, name: String, raw: String) {
        self.env_applied.insert(name, raw);
    }

    pub(crate) fn record_flag(&mut self, name: String, raw: String) {
        self.flags_applied.insert(name, raw);
    }

    pub(crate) fn set_resolved(&mut self, record: Record) {
        self.resolved = Some(record);
    }
}
