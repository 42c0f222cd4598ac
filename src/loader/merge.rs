//! Recursive merge of parsed source trees into target records.
//!
//! Per-field-kind dispatch: each key in a source mapping is resolved to a
//! field descriptor, then merged according to the field's kind and
//! cardinality. Unknown names, kind mismatches and numeric overflow abort the
//! load with an error carrying the fully-qualified dotted path; a partially
//! merged record with silently dropped fields is worse than an aborted load.

use std::collections::BTreeMap;

use serde_yaml::Value as Yaml;

use crate::error::{ConfigError, Result};
use crate::schema::{Cardinality, EnumDescriptor, FieldDescriptor, FieldKind, Record, Value};
use crate::sources::yaml_kind;

/// Render a non-string mapping key so errors can name it in the path.
fn render_key(key: &Yaml) -> String {
    serde_yaml::to_string(key)
        .map(|s| s.trim_end().to_string())
        .unwrap_or_else(|_| "?".to_string())
}

/// Extend a dotted path by one segment.
pub(crate) fn join_path(path: &str, segment: &str) -> String {
    if path.is_empty() {
        segment.to_string()
    } else {
        format!("{path}.{segment}")
    }
}

/// Merge one source mapping into the target record, descending recursively.
pub(crate) fn merge_mapping(
    record: &mut Record,
    mapping: &serde_yaml::Mapping,
    path: &str,
) -> Result<()> {
    for (key, value) in mapping {
        let Some(key) = key.as_str() else {
            return Err(ConfigError::type_mismatch(
                join_path(path, &render_key(key)),
                "string key",
                yaml_kind(key),
            ));
        };
        let Some(field) = record.descriptor().field_for_key(key).cloned() else {
            return Err(ConfigError::unknown_field(join_path(path, key)));
        };
        let field_path = join_path(path, &field.name);
        merge_field(record, &field, value, &field_path)?;
    }
    Ok(())
}

fn merge_field(record: &mut Record, field: &FieldDescriptor, value: &Yaml, path: &str) -> Result<()> {
    match field.cardinality {
        Cardinality::Repeated => {
            let Yaml::Sequence(items) = value else {
                return Err(ConfigError::type_mismatch(path, "sequence", yaml_kind(value)));
            };
            let mut out = Vec::with_capacity(items.len());
            for (index, item) in items.iter().enumerate() {
                out.push(element_value(&field.kind, item, &format!("{path}[{index}]"))?);
            }
            // A later source's list replaces the whole field, never appends.
            record.set(&field.name, Value::List(out));
        }
        Cardinality::Map => {
            let Yaml::Mapping(entries) = value else {
                return Err(ConfigError::type_mismatch(path, "mapping", yaml_kind(value)));
            };
            let mut out = BTreeMap::new();
            for (key, entry) in entries {
                let Some(key) = key.as_str() else {
                    return Err(ConfigError::type_mismatch(
                        join_path(path, &render_key(key)),
                        "string key",
                        yaml_kind(key),
                    ));
                };
                out.insert(key.to_string(), element_value(&field.kind, entry, &join_path(path, key))?);
            }
            record.set(&field.name, Value::Map(out));
        }
        Cardinality::Singular => match &field.kind {
            FieldKind::Message(desc) => {
                let Yaml::Mapping(section) = value else {
                    return Err(ConfigError::type_mismatch(path, "mapping", yaml_kind(value)));
                };
                // Deep merge: keep leaves an earlier source already set. A
                // oneof member re-enters through set(), clearing siblings.
                let mut child = match record.take(&field.name) {
                    Some(Value::Record(existing)) => existing,
                    _ => Record::new(desc.clone()),
                };
                merge_mapping(&mut child, section, path)?;
                record.set(&field.name, Value::Record(child));
            }
            FieldKind::Group => {
                return Err(ConfigError::UnsupportedKind {
                    path: path.to_string(),
                    kind: "group".to_string(),
                });
            }
            _ => {
                let parsed = scalar_from_yaml(&field.kind, value, path)?;
                record.set(&field.name, parsed);
            }
        },
    }
    Ok(())
}

/// Convert one list element or map entry per the declared value kind.
fn element_value(kind: &FieldKind, value: &Yaml, path: &str) -> Result<Value> {
    match kind {
        FieldKind::Message(desc) => {
            let Yaml::Mapping(section) = value else {
                return Err(ConfigError::type_mismatch(path, "mapping", yaml_kind(value)));
            };
            let mut child = Record::new(desc.clone());
            merge_mapping(&mut child, section, path)?;
            Ok(Value::Record(child))
        }
        FieldKind::Group => Err(ConfigError::UnsupportedKind {
            path: path.to_string(),
            kind: "group".to_string(),
        }),
        _ => scalar_from_yaml(kind, value, path),
    }
}

fn scalar_from_yaml(kind: &FieldKind, value: &Yaml, path: &str) -> Result<Value> {
    match kind {
        FieldKind::Bool => match value {
            Yaml::Bool(b) => Ok(Value::Bool(*b)),
            _ => Err(ConfigError::type_mismatch(path, "bool", yaml_kind(value))),
        },
        FieldKind::String => match value {
            Yaml::String(s) => Ok(Value::String(s.clone())),
            _ => Err(ConfigError::type_mismatch(path, "string", yaml_kind(value))),
        },
        FieldKind::Bytes => match value {
            Yaml::String(s) => Ok(Value::Bytes(s.clone().into_bytes())),
            _ => Err(ConfigError::type_mismatch(path, "bytes", yaml_kind(value))),
        },
        FieldKind::F64 => match value {
            Yaml::Number(n) => n
                .as_f64()
                .map(Value::F64)
                .ok_or_else(|| ConfigError::type_mismatch(path, "double", yaml_kind(value))),
            _ => Err(ConfigError::type_mismatch(path, "double", yaml_kind(value))),
        },
        FieldKind::I32 => {
            int_from_yaml(value, path, "int32", i128::from(i32::MIN), i128::from(i32::MAX))
                .map(|v| Value::I32(v as i32))
        }
        FieldKind::I64 => int_from_yaml(value, path, "int64", i128::from(i64::MIN), i128::from(i64::MAX))
            .map(|v| Value::I64(v as i64)),
        FieldKind::U32 => int_from_yaml(value, path, "uint32", 0, i128::from(u32::MAX))
            .map(|v| Value::U32(v as u32)),
        FieldKind::U64 => int_from_yaml(value, path, "uint64", 0, i128::from(u64::MAX))
            .map(|v| Value::U64(v as u64)),
        FieldKind::Enum(desc) => enum_from_yaml(desc, value, path),
        FieldKind::Message(_) | FieldKind::Group => Err(ConfigError::UnsupportedKind {
            path: path.to_string(),
            kind: kind.name().to_string(),
        }),
    }
}

/// Widen any source number to i128, rejecting lossy narrowing.
///
/// Integral floats are accepted (a YAML layer may hand back `10.0` for `10`);
/// anything with a fractional part is a type mismatch, and integral values
/// outside the target range are overflow. Never silently truncate.
fn int_from_yaml(value: &Yaml, path: &str, expected: &str, min: i128, max: i128) -> Result<i128> {
    let Yaml::Number(n) = value else {
        return Err(ConfigError::type_mismatch(path, expected, yaml_kind(value)));
    };
    let wide: i128 = if let Some(i) = n.as_i64() {
        i128::from(i)
    } else if let Some(u) = n.as_u64() {
        i128::from(u)
    } else {
        let Some(f) = n.as_f64() else {
            return Err(ConfigError::type_mismatch(path, expected, "number"));
        };
        if f.fract() != 0.0 {
            return Err(ConfigError::type_mismatch(path, expected, "float"));
        }
        if f < min as f64 || f > max as f64 {
            return Err(ConfigError::overflow(path, n));
        }
        f as i128
    };
    if wide < min || wide > max {
        return Err(ConfigError::overflow(path, n));
    }
    Ok(wide)
}

fn enum_from_yaml(desc: &EnumDescriptor, value: &Yaml, path: &str) -> Result<Value> {
    match value {
        Yaml::String(name) => desc
            .by_name(name)
            .map(Value::Enum)
            .ok_or_else(|| ConfigError::UnknownEnumValue {
                path: path.to_string(),
                value: name.clone(),
            }),
        Yaml::Number(_) => {
            int_from_yaml(value, path, "enum", i128::from(i32::MIN), i128::from(i32::MAX))
                .map(|v| Value::Enum(v as i32))
        }
        _ => Err(ConfigError::type_mismatch(path, "enum", yaml_kind(value))),
    }
}

/// Parse a single-string source value (environment variable or flag) into
/// the field's native kind.
///
/// Message-typed targets are structurally impossible from a single string
/// and fail loudly rather than dropping data.
pub(crate) fn scalar_from_str(kind: &FieldKind, raw: &str, path: &str) -> Result<Value> {
    match kind {
        FieldKind::Bool => match raw {
            "true" => Ok(Value::Bool(true)),
            "false" => Ok(Value::Bool(false)),
            _ => Err(ConfigError::type_mismatch(path, "bool", format!("'{raw}'"))),
        },
        FieldKind::String => Ok(Value::String(raw.to_string())),
        FieldKind::Bytes => Ok(Value::Bytes(raw.as_bytes().to_vec())),
        FieldKind::F64 => raw
            .parse::<f64>()
            .map(Value::F64)
            .map_err(|_| ConfigError::type_mismatch(path, "double", format!("'{raw}'"))),
        FieldKind::I32 => {
            int_from_str(raw, path, "int32", i128::from(i32::MIN), i128::from(i32::MAX))
                .map(|v| Value::I32(v as i32))
        }
        FieldKind::I64 => int_from_str(raw, path, "int64", i128::from(i64::MIN), i128::from(i64::MAX))
            .map(|v| Value::I64(v as i64)),
        FieldKind::U32 => int_from_str(raw, path, "uint32", 0, i128::from(u32::MAX))
            .map(|v| Value::U32(v as u32)),
        FieldKind::U64 => int_from_str(raw, path, "uint64", 0, i128::from(u64::MAX))
            .map(|v| Value::U64(v as u64)),
        FieldKind::Enum(desc) => {
            if let Some(number) = desc.by_name(raw) {
                return Ok(Value::Enum(number));
            }
            match raw.parse::<i128>() {
                Ok(wide) if wide >= i128::from(i32::MIN) && wide <= i128::from(i32::MAX) => {
                    Ok(Value::Enum(wide as i32))
                }
                Ok(_) => Err(ConfigError::overflow(path, raw)),
                Err(_) => Err(ConfigError::UnknownEnumValue {
                    path: path.to_string(),
                    value: raw.to_string(),
                }),
            }
        }
        FieldKind::Message(_) | FieldKind::Group => Err(ConfigError::UnsupportedKind {
            path: path.to_string(),
            kind: kind.name().to_string(),
        }),
    }
}

fn int_from_str(raw: &str, path: &str, expected: &str, min: i128, max: i128) -> Result<i128> {
    let wide = raw
        .parse::<i128>()
        .map_err(|_| ConfigError::type_mismatch(path, expected, format!("'{raw}'")))?;
    if wide < min || wide > max {
        return Err(ConfigError::overflow(path, raw));
    }
    Ok(wide)
}
