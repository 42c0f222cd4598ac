//! The resolution engine: merges files, environment, and flags into a record.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use tracing::debug;

use crate::error::Result;
use crate::loader::debug::DebugRecord;
use crate::loader::merge::{merge_mapping, scalar_from_str};
use crate::loader::LoaderBuilder;
use crate::schema::{names, Cardinality, FieldDescriptor, FieldKind, Record};
use crate::sources::{service_section, EnvReader, FileSource, FlagReader, ReaderSource};

/// Resolves configuration for one service from all sources, in strict
/// precedence order: flags over environment over files, with later files
/// overriding earlier ones per leaf field.
///
/// Flag overrides are permitted only when the loader was built with a flag
/// reader; daemon mode builds loaders without one. One loader instance is
/// intended for one load sequence; the debug record is not safe for
/// concurrent loads on the same loader.
///
/// # Examples
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use svckit::loader::Loader;
/// use svckit::schema::{FieldDescriptor, FieldKind, MessageDescriptor, Record};
///
/// let desc = Arc::new(
///     MessageDescriptor::new("Server")
///         .with_field(FieldDescriptor::new("max_connections", FieldKind::U32)),
/// );
///
/// let mut loader = Loader::builder()
///     .with_file("config/default.yaml")
///     .with_env_prefix("APP")
///     .build();
///
/// let mut record = Record::new(desc);
/// loader.load("user-service", &mut record)?;
/// # Ok::<(), svckit::error::ConfigError>(())
/// ```
pub struct Loader {
    pub(crate) files: Vec<PathBuf>,
    pub(crate) readers: Vec<ReaderSource>,
    pub(crate) env_prefix: Option<String>,
    pub(crate) env: Arc<dyn EnvReader>,
    pub(crate) flags: Option<Arc<dyn FlagReader>>,
    pub(crate) debug: Option<DebugRecord>,
}

impl Loader {
    /// Start building a loader.
    pub fn builder() -> LoaderBuilder {
        LoaderBuilder::new()
    }

    /// Resolve the named service's configuration into `record`.
    ///
    /// Sources are applied in increasing precedence: files in the order they
    /// were added, then injected readers, then environment variables, then
    /// explicitly set flags. Absence (missing file, missing service section,
    /// unset variable, unset flag) is never an error; structural mismatches
    /// abort the load immediately.
    ///
    /// # Errors
    ///
    /// Returns a parse error for malformed sources, and path-qualified
    /// unknown-field / type-mismatch / overflow / unsupported-kind errors
    /// from the merge.
    pub fn load(&mut self, service: &str, record: &mut Record) -> Result<()> {
        for path in &self.files {
            let source = FileSource::new(path);
            let name = source.name();
            if let Some(d) = self.debug.as_mut() {
                d.record_probe(name.clone());
            }
            let doc = match source.probe() {
                Ok(Some(doc)) => doc,
                Ok(None) => {
                    debug!(source = %name, "config file absent, skipping");
                    if let Some(d) = self.debug.as_mut() {
                        d.record_failure(name, "not found".to_string());
                    }
                    continue;
                }
                Err(e) => {
                    if let Some(d) = self.debug.as_mut() {
                        d.record_failure(name, e.to_string());
                    }
                    return Err(e);
                }
            };
            if let Some(d) = self.debug.as_mut() {
                d.record_loaded(name.clone());
            }
            match service_section(&doc, service)? {
                Some(section) => {
                    merge_mapping(record, section, "")?;
                    debug!(source = %name, service, "merged service section");
                }
                None => debug!(source = %name, service, "no service section, skipping"),
            }
        }

        for reader in &self.readers {
            let name = reader.name();
            if let Some(d) = self.debug.as_mut() {
                d.record_probe(name.clone());
            }
            let doc = match reader.parse() {
                Ok(doc) => doc,
                Err(e) => {
                    if let Some(d) = self.debug.as_mut() {
                        d.record_failure(name, e.to_string());
                    }
                    return Err(e);
                }
            };
            if let Some(d) = self.debug.as_mut() {
                d.record_loaded(name.clone());
            }
            if let Some(section) = service_section(&doc, service)? {
                merge_mapping(record, section, "")?;
                debug!(source = %name, service, "merged service section");
            }
        }

        if let Some(prefix) = self.env_prefix.clone() {
            let env = Arc::clone(&self.env);
            let mut applied = BTreeMap::new();
            apply_overrides(
                record,
                &NameScheme::Env { prefix: &prefix },
                &|name| env.lookup(name),
                &mut Vec::new(),
                &mut Vec::new(),
                &mut applied,
            )?;
            if let Some(d) = self.debug.as_mut() {
                for (name, raw) in applied {
                    d.record_env(name, raw);
                }
            }
        }

        if let Some(flags) = self.flags.clone() {
            let mut applied = BTreeMap::new();
            apply_overrides(
                record,
                &NameScheme::Flag,
                &|name| flags.lookup(name),
                &mut Vec::new(),
                &mut Vec::new(),
                &mut applied,
            )?;
            if let Some(d) = self.debug.as_mut() {
                for (name, raw) in applied {
                    d.record_flag(name, raw);
                }
            }
        }

        if let Some(d) = self.debug.as_mut() {
            d.set_resolved(record.clone());
        }
        Ok(())
    }

    /// The debug record for this load sequence, if debug mode was enabled.
    pub fn debug(&self) -> Option<&DebugRecord> {
        self.debug.as_ref()
    }
}

/// Which derived-name convention a schema walk uses.
enum NameScheme<'a> {
    Env { prefix: &'a str },
    Flag,
}

impl NameScheme<'_> {
    fn segment(&self, field: &FieldDescriptor) -> String {
        match self {
            Self::Env { .. } => names::env_segment(field),
            Self::Flag => names::flag_token(field),
        }
    }

    fn full(&self, segments: &[String]) -> String {
        match self {
            Self::Env { prefix } => names::env_name(prefix, segments),
            Self::Flag => names::flag_name(segments),
        }
    }
}

fn dotted(path_segments: &[String], leaf: &str) -> String {
    if path_segments.is_empty() {
        leaf.to_string()
    } else {
        format!("{}.{}", path_segments.join("."), leaf)
    }
}

/// Walk the record's own schema (not the source data) so nested records are
/// visited even when no file supplied them, applying any set overrides.
///
/// Intermediate records are instantiated lazily, only when some leaf beneath
/// them is actually set; the walk never spuriously activates an empty
/// record or a oneof branch. Repeated and map fields cannot be addressed
/// from single-string sources and are skipped.
fn apply_overrides(
    record: &mut Record,
    scheme: &NameScheme<'_>,
    lookup: &dyn Fn(&str) -> Option<String>,
    name_segments: &mut Vec<String>,
    path_segments: &mut Vec<String>,
    applied: &mut BTreeMap<String, String>,
) -> Result<()> {
    let descriptor = Arc::clone(record.descriptor());
    for field in descriptor.fields() {
        match (field.cardinality, &field.kind) {
            (Cardinality::Singular, FieldKind::Message(_)) => {
                name_segments.push(scheme.segment(field));
                if subtree_has_override(field, scheme, lookup, name_segments) {
                    path_segments.push(field.name.clone());
                    if let Some(child) = record.ensure_child(field) {
                        apply_overrides(child, scheme, lookup, name_segments, path_segments, applied)?;
                    }
                    path_segments.pop();
                }
                name_segments.pop();
            }
            (Cardinality::Singular, FieldKind::Group) => {}
            (Cardinality::Singular, _) => {
                name_segments.push(scheme.segment(field));
                let name = scheme.full(name_segments);
                name_segments.pop();
                if let Some(raw) = lookup(&name) {
                    let path = dotted(path_segments, &field.name);
                    let value = scalar_from_str(&field.kind, &raw, &path)?;
                    record.set(&field.name, value);
                    applied.insert(name, raw);
                }
            }
            _ => {}
        }
    }
    Ok(())
}

/// Whether any scalar leaf under a message-typed field has an override set.
fn subtree_has_override(
    field: &FieldDescriptor,
    scheme: &NameScheme<'_>,
    lookup: &dyn Fn(&str) -> Option<String>,
    name_segments: &mut Vec<String>,
) -> bool {
    let FieldKind::Message(descriptor) = &field.kind else {
        return false;
    };
    for child in descriptor.fields() {
        match (child.cardinality, &child.kind) {
            (Cardinality::Singular, FieldKind::Message(_)) => {
                name_segments.push(scheme.segment(child));
                let found = subtree_has_override(child, scheme, lookup, name_segments);
                name_segments.pop();
                if found {
                    return true;
                }
            }
            (Cardinality::Singular, FieldKind::Group) => {}
            (Cardinality::Singular, _) => {
                name_segments.push(scheme.segment(child));
                let name = scheme.full(name_segments);
                name_segments.pop();
                if lookup(&name).is_some() {
                    return true;
                }
            }
            _ => {}
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{MessageDescriptor, Value};
    use crate::sources::{FlagSet, MapEnv};

    fn app_descriptor() -> Arc<MessageDescriptor> {
        let pool = Arc::new(
            MessageDescriptor::new("Pool")
                .with_field(FieldDescriptor::new("max_size", FieldKind::U32)),
        );
        let database = Arc::new(
            MessageDescriptor::new("Database")
                .with_field(FieldDescriptor::new("url", FieldKind::String))
                .with_field(FieldDescriptor::new("pool", FieldKind::Message(pool))),
        );
        Arc::new(
            MessageDescriptor::new("App")
                .with_field(
                    FieldDescriptor::new("max_connections", FieldKind::U32)
                        .with_flag_token("max-conns"),
                )
                .with_field(FieldDescriptor::new("database", FieldKind::Message(database))),
        )
    }

    #[test]
    fn env_reaches_fields_files_never_mentioned() {
        let env = MapEnv::new().with("APP_DATABASE_POOL_MAX_SIZE", "32");
        let mut loader = Loader::builder()
            .with_env_prefix("APP")
            .with_env_reader(Arc::new(env))
            .build();

        let mut record = Record::new(app_descriptor());
        loader.load("svc", &mut record).unwrap();

        let db = record.get("database").and_then(Value::as_record).unwrap();
        let pool = db.get("pool").and_then(Value::as_record).unwrap();
        assert_eq!(pool.get("max_size"), Some(&Value::U32(32)));
        // url had no override and must stay unset
        assert!(!db.is_set("url"));
    }

    #[test]
    fn unset_env_leaves_record_untouched() {
        let mut loader = Loader::builder()
            .with_env_prefix("APP")
            .with_env_reader(Arc::new(MapEnv::new()))
            .build();

        let mut record = Record::new(app_descriptor());
        loader.load("svc", &mut record).unwrap();
        assert!(!record.is_set("database"));
        assert!(!record.is_set("max_connections"));
    }

    #[test]
    fn flags_override_env() {
        let env = MapEnv::new().with("APP_MAX_CONNECTIONS", "50");
        let flags = FlagSet::new().with("max-conns", "99");
        let mut loader = Loader::builder()
            .with_env_prefix("APP")
            .with_env_reader(Arc::new(env))
            .with_flags(Arc::new(flags))
            .build();

        let mut record = Record::new(app_descriptor());
        loader.load("svc", &mut record).unwrap();
        assert_eq!(record.get("max_connections"), Some(&Value::U32(99)));
    }

    #[test]
    fn env_override_switches_active_union_branch() {
        let desc = Arc::new(
            MessageDescriptor::new("Transport")
                .with_oneof("endpoint")
                .with_field(FieldDescriptor::new("tcp", FieldKind::String).in_oneof(0))
                .with_field(FieldDescriptor::new("unix", FieldKind::String).in_oneof(0)),
        );
        let env = MapEnv::new().with("APP_UNIX", "/run/svc.sock");
        let mut loader = Loader::builder()
            .with_reader("inline", "services:\n  svc:\n    tcp: 127.0.0.1:50051\n")
            .with_env_prefix("APP")
            .with_env_reader(Arc::new(env))
            .build();

        let mut record = Record::new(desc);
        loader.load("svc", &mut record).unwrap();

        assert_eq!(record.active_oneof_member(0), Some("unix"));
        assert!(!record.is_set("tcp"));
    }

    #[test]
    fn env_parse_failure_is_path_qualified() {
        let env = MapEnv::new().with("APP_DATABASE_POOL_MAX_SIZE", "lots");
        let mut loader = Loader::builder()
            .with_env_prefix("APP")
            .with_env_reader(Arc::new(env))
            .build();

        let mut record = Record::new(app_descriptor());
        let err = loader.load("svc", &mut record).unwrap_err();
        assert!(err.to_string().contains("database.pool.max_size"));
    }

    #[test]
    fn debug_record_tracks_sources_and_overrides() {
        let env = MapEnv::new().with("APP_MAX_CONNECTIONS", "50");
        let mut loader = Loader::builder()
            .with_file("/nonexistent/app.yaml")
            .with_reader("inline", "services:\n  svc:\n    max_connections: 10\n")
            .with_env_prefix("APP")
            .with_env_reader(Arc::new(env))
            .with_debug()
            .build();

        let mut record = Record::new(app_descriptor());
        loader.load("svc", &mut record).unwrap();

        let debug = loader.debug().unwrap();
        assert_eq!(debug.sources_probed().len(), 2);
        assert_eq!(debug.sources_loaded(), ["reader:inline"]);
        assert!(debug.sources_failed().contains_key("file:/nonexistent/app.yaml"));
        assert_eq!(
            debug.env_applied().get("APP_MAX_CONNECTIONS").map(String::as_str),
            Some("50")
        );
        let resolved = debug.resolved().unwrap();
        assert_eq!(resolved.get("max_connections"), Some(&Value::U32(50)));
    }
}
