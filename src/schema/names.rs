//! Derived flag and environment-variable names.
//!
//! Each leaf field maps to a token derived either from an explicit per-field
//! annotation or from a mechanical case transform of its schema name. Nested
//! fields compound their ancestors' tokens:
//!
//! - flags: `database.pool.max_size` -> `database-pool-max-size`
//! - env:   `database.pool.max_size` -> `<PREFIX>_DATABASE_POOL_MAX_SIZE`

use super::descriptor::FieldDescriptor;

/// The flag token for one field: the explicit annotation if present,
/// otherwise the schema name in kebab-case.
pub fn flag_token(field: &FieldDescriptor) -> String {
    field
        .flag_token
        .clone()
        .unwrap_or_else(|| field.name.replace('_', "-").to_ascii_lowercase())
}

/// The environment-name segment for one field: upper-snake of the schema
/// name. Explicit flag annotations do not affect env names.
pub fn env_segment(field: &FieldDescriptor) -> String {
    field.name.replace('-', "_").to_ascii_uppercase()
}

/// Join accumulated flag tokens into a full flag name.
pub fn flag_name(segments: &[String]) -> String {
    segments.join("-")
}

/// Join accumulated env segments under a prefix into a full variable name.
pub fn env_name(prefix: &str, segments: &[String]) -> String {
    format!("{}_{}", prefix, segments.join("_"))
}
