//! Dynamic values and the mutable target record.

use std::collections::BTreeMap;
use std::sync::Arc;

use super::descriptor::{FieldDescriptor, MessageDescriptor};

/// A dynamically-typed field value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Boolean.
    Bool(bool),
    /// 32-bit signed integer.
    I32(i32),
    /// 64-bit signed integer.
    I64(i64),
    /// 32-bit unsigned integer.
    U32(u32),
    /// 64-bit unsigned integer.
    U64(u64),
    /// Double-precision float.
    F64(f64),
    /// UTF-8 string.
    String(String),
    /// Raw bytes.
    Bytes(Vec<u8>),
    /// Enum value, stored by number.
    Enum(i32),
    /// Nested record.
    Record(Record),
    /// Repeated field contents.
    List(Vec<Value>),
    /// Map field contents, keyed by string.
    Map(BTreeMap<String, Value>),
}

impl Value {
    /// Convenience accessor for record values.
    pub fn as_record(&self) -> Option<&Record> {
        match self {
            Self::Record(r) => Some(r),
            _ => None,
        }
    }

    /// Convenience accessor for list values.
    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Self::List(items) => Some(items),
            _ => None,
        }
    }

    /// Convenience accessor for map values.
    pub fn as_map(&self) -> Option<&BTreeMap<String, Value>> {
        match self {
            Self::Map(entries) => Some(entries),
            _ => None,
        }
    }
}

/// A mutable instance of a schema-described record: the target the resolution
/// engine populates.
///
/// A record starts empty; fields supplied by no source stay unset and read as
/// the schema's declared default from the caller's point of view. Setting a
/// tagged-union member clears any other member of the same union, so at most
/// one branch is ever populated.
///
/// # Examples
///
/// ```rust
/// use std::sync::Arc;
/// use svckit::schema::{FieldDescriptor, FieldKind, MessageDescriptor, Record, Value};
///
/// let desc = Arc::new(
///     MessageDescriptor::new("Server")
///         .with_field(FieldDescriptor::new("port", FieldKind::U32)),
/// );
///
/// let mut record = Record::new(desc);
/// record.set("port", Value::U32(8080));
/// assert_eq!(record.get("port"), Some(&Value::U32(8080)));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    descriptor: Arc<MessageDescriptor>,
    fields: BTreeMap<String, Value>,
}

impl Record {
    /// Create an empty record for the given shape.
    pub fn new(descriptor: Arc<MessageDescriptor>) -> Self {
        Self {
            descriptor,
            fields: BTreeMap::new(),
        }
    }

    /// The record's shape.
    pub fn descriptor(&self) -> &Arc<MessageDescriptor> {
        &self.descriptor
    }

    /// Set a field by schema name.
    ///
    /// If the field is a tagged-union member, every other member of the same
    /// union is cleared first.
    pub fn set(&mut self, name: &str, value: Value) {
        if let Some(index) = self.descriptor.field(name).and_then(|f| f.oneof) {
            let siblings: Vec<String> = self
                .descriptor
                .oneof_members(index)
                .filter(|f| f.name != name)
                .map(|f| f.name.clone())
                .collect();
            for sibling in siblings {
                self.fields.remove(&sibling);
            }
        }
        self.fields.insert(name.to_string(), value);
    }

    /// Read a field by schema name. `None` means unset.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    /// Mutable access to a set field.
    pub fn get_mut(&mut self, name: &str) -> Option<&mut Value> {
        self.fields.get_mut(name)
    }

    /// Remove and return a field's value.
    pub fn take(&mut self, name: &str) -> Option<Value> {
        self.fields.remove(name)
    }

    /// Whether any source has supplied the field.
    pub fn is_set(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    /// The name of the populated member of the oneof at `index`, if any.
    pub fn active_oneof_member(&self, index: usize) -> Option<&str> {
        self.descriptor
            .oneof_members(index)
            .find(|f| self.fields.contains_key(&f.name))
            .map(|f| f.name.as_str())
    }

    /// Iterate set fields in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Ensure a nested record exists under a message-typed field, creating an
    /// empty one (and clearing oneof siblings) if absent, and return it.
    pub(crate) fn ensure_child(&mut self, field: &FieldDescriptor) -> Option<&mut Record> {
        let super::descriptor::FieldKind::Message(child_desc) = &field.kind else {
            return None;
        };
        if !matches!(self.get(&field.name), Some(Value::Record(_))) {
            self.set(&field.name, Value::Record(Record::new(child_desc.clone())));
        }
        match self.get_mut(&field.name) {
            Some(Value::Record(r)) => Some(r),
            _ => None,
        }
    }
}
