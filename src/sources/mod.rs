//! Configuration source readers: files, environment variables, flags.

mod env;
mod file;
mod flags;

pub use env::{EnvReader, MapEnv, ProcessEnv};
pub use file::{default_search_paths, service_section, FileSource, ReaderSource};
pub use flags::{FlagReader, FlagSet};

pub(crate) use file::yaml_kind;
