//! Structural schema reflection: descriptors, dynamic values, derived names.
//!
//! This module is the seam between the resolution engine and whatever schema
//! ecosystem supplies record shapes. The engine only ever touches records
//! through [`Record`] and the descriptor types, so adapting to a different
//! schema API means swapping this module, not the engine.

mod descriptor;
pub mod names;
mod value;

pub use descriptor::{
    Cardinality, EnumDescriptor, FieldDescriptor, FieldKind, MessageDescriptor, OneofDescriptor,
};
pub use value::{Record, Value};
