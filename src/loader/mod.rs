//! The resolution engine: layered files, environment, and flag overrides
//! merged into schema-described records.

mod builder;
mod debug;
mod engine;
mod merge;

pub use builder::LoaderBuilder;
pub use debug::DebugRecord;
pub use engine::Loader;
