//! Field, enum, message, and oneof descriptors.
//!
//! Descriptors are the structural-reflection surface the resolution engine is
//! written against: immutable metadata describing the shape of a record. They
//! are built programmatically (typically by generated code) and shared via
//! `Arc`.

use std::sync::Arc;

/// The kind of value a field holds.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldKind {
    /// Boolean.
    Bool,
    /// 32-bit signed integer.
    I32,
    /// 64-bit signed integer.
    I64,
    /// 32-bit unsigned integer.
    U32,
    /// 64-bit unsigned integer.
    U64,
    /// Double-precision float.
    F64,
    /// UTF-8 string.
    String,
    /// Raw byte string.
    Bytes,
    /// Enumeration with a name/number value table.
    Enum(Arc<EnumDescriptor>),
    /// Nested record.
    Message(Arc<MessageDescriptor>),
    /// Legacy group construct. Never populated; always rejected by the
    /// resolution engine.
    Group,
}

impl FieldKind {
    /// Short kind name used in error messages.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Bool => "bool",
            Self::I32 => "int32",
            Self::I64 => "int64",
            Self::U32 => "uint32",
            Self::U64 => "uint64",
            Self::F64 => "double",
            Self::String => "string",
            Self::Bytes => "bytes",
            Self::Enum(_) => "enum",
            Self::Message(_) => "message",
            Self::Group => "group",
        }
    }
}

/// How many values a field holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cardinality {
    /// Exactly zero or one value.
    Singular,
    /// An ordered list of values.
    Repeated,
    /// A string-keyed map; the field's `FieldKind` describes the values.
    Map,
}

/// Schema metadata for a single named, typed field.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDescriptor {
    /// Schema name, conventionally `lower_snake_case`.
    pub name: String,
    /// The kind of value the field holds (map value kind for map fields).
    pub kind: FieldKind,
    /// Singular, repeated, or map.
    pub cardinality: Cardinality,
    /// Index into the parent message's oneof table, if this field is a
    /// tagged-union member.
    pub oneof: Option<usize>,
    /// Explicit flag-token annotation. When present it replaces the
    /// mechanically derived leaf token for flag names.
    pub flag_token: Option<String>,
}

impl FieldDescriptor {
    /// Create a singular field of the given kind.
    pub fn new(name: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            kind,
            cardinality: Cardinality::Singular,
            oneof: None,
            flag_token: None,
        }
    }

    /// Mark the field repeated.
    pub fn repeated(mut self) -> Self {
        self.cardinality = Cardinality::Repeated;
        self
    }

    /// Mark the field a string-keyed map of the declared kind.
    pub fn map(mut self) -> Self {
        self.cardinality = Cardinality::Map;
        self
    }

    /// Place the field in the oneof at the given index.
    pub fn in_oneof(mut self, index: usize) -> Self {
        self.oneof = Some(index);
        self
    }

    /// Override the derived flag token with an explicit annotation.
    pub fn with_flag_token(mut self, token: impl Into<String>) -> Self {
        self.flag_token = Some(token.into());
        self
    }
}

/// A tagged-union group: at most one member field may hold a value at a time.
#[derive(Debug, Clone, PartialEq)]
pub struct OneofDescriptor {
    /// The union's name.
    pub name: String,
}

/// Schema metadata for one record shape.
#[derive(Debug, Clone, PartialEq)]
pub struct MessageDescriptor {
    name: String,
    fields: Vec<FieldDescriptor>,
    oneofs: Vec<OneofDescriptor>,
}

impl MessageDescriptor {
    /// Create an empty message descriptor.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
            oneofs: Vec::new(),
        }
    }

    /// Append a field.
    pub fn with_field(mut self, field: FieldDescriptor) -> Self {
        self.fields.push(field);
        self
    }

    /// Append a oneof group. Fields reference it by declaration order: the
    /// first oneof added is index 0.
    pub fn with_oneof(mut self, name: impl Into<String>) -> Self {
        self.oneofs.push(OneofDescriptor { name: name.into() });
        self
    }

    /// The message's name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// All fields, in declaration order.
    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    /// All oneof groups, in declaration order.
    pub fn oneofs(&self) -> &[OneofDescriptor] {
        &self.oneofs
    }

    /// Look up a field by exact schema name.
    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Resolve a source-data key to a field.
    ///
    /// Tries the schema name with hyphens normalized to underscores first,
    /// then falls back to the field's display (flag-token) name, so config
    /// files may spell `max-connections` for a field named `max_connections`.
    pub fn field_for_key(&self, key: &str) -> Option<&FieldDescriptor> {
        let normalized = key.replace('-', "_");
        self.field(&normalized)
            .or_else(|| self.fields.iter().find(|f| f.flag_token.as_deref() == Some(key)))
    }

    /// Iterate the member fields of the oneof at `index`.
    pub fn oneof_members(&self, index: usize) -> impl Iterator<Item = &FieldDescriptor> {
        self.fields.iter().filter(move |f| f.oneof == Some(index))
    }
}

/// An enumeration's name/number value table.
#[derive(Debug, Clone, PartialEq)]
pub struct EnumDescriptor {
    name: String,
    values: Vec<(String, i32)>,
}

impl EnumDescriptor {
    /// Create an empty enum descriptor.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            values: Vec::new(),
        }
    }

    /// Append a named value.
    pub fn with_value(mut self, name: impl Into<String>, number: i32) -> Self {
        self.values.push((name.into(), number));
        self
    }

    /// The enum's name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Resolve a symbolic name to its number. Exact match only.
    pub fn by_name(&self, name: &str) -> Option<i32> {
        self.values
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, num)| *num)
    }

    /// Resolve a number to its first declared symbolic name.
    pub fn by_number(&self, number: i32) -> Option<&str> {
        self.values
            .iter()
            .find(|(_, n)| *n == number)
            .map(|(name, _)| name.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_lookup_normalizes_hyphens() {
        let desc = MessageDescriptor::new("Server")
            .with_field(FieldDescriptor::new("max_connections", FieldKind::U32));

        assert!(desc.field_for_key("max_connections").is_some());
        assert!(desc.field_for_key("max-connections").is_some());
        assert!(desc.field_for_key("maxConnections").is_none());
    }

    #[test]
    fn field_lookup_falls_back_to_flag_token() {
        let desc = MessageDescriptor::new("Server").with_field(
            FieldDescriptor::new("max_connections", FieldKind::U32).with_flag_token("max-conns"),
        );

        assert!(desc.field_for_key("max-conns").is_some());
    }

    #[test]
    fn oneof_members_filters_by_index() {
        let desc = MessageDescriptor::new("Transport")
            .with_oneof("endpoint")
            .with_field(FieldDescriptor::new("tcp", FieldKind::String).in_oneof(0))
            .with_field(FieldDescriptor::new("unix", FieldKind::String).in_oneof(0))
            .with_field(FieldDescriptor::new("timeout", FieldKind::U32));

        let members: Vec<_> = desc.oneof_members(0).map(|f| f.name.as_str()).collect();
        assert_eq!(members, vec!["tcp", "unix"]);
    }

    #[test]
    fn enum_table_lookups() {
        let desc = EnumDescriptor::new("LogLevel")
            .with_value("DEBUG", 0)
            .with_value("INFO", 1);

        assert_eq!(desc.by_name("INFO"), Some(1));
        assert_eq!(desc.by_name("info"), None);
        assert_eq!(desc.by_number(0), Some("DEBUG"));
        assert_eq!(desc.by_number(9), None);
    }
}
