//! Populate command-line flags from an input source file.
//!
//! Flags marked as eligible for an alternate source can take their value from
//! a YAML or JSON file when neither the command line nor the environment
//! supplies one. The precedence is always
//! command line > environment > file > default.

pub mod command;
pub mod env;
pub mod error;
pub mod flag;
pub mod hook;
pub mod logging;
pub mod resolve;
pub mod source;
pub mod value;

pub use command::{BeforeHook, Command, Context};
pub use env::{EnvSource, MockEnv, StdEnv};
pub use error::{Error, Result, ValueOrigin};
pub use flag::Flag;
pub use hook::{
    FromFile, FromFlag, InitInputSource, SourceLoader, json_source_from_flag, source_from_flag,
    yaml_source_from_file, yaml_source_from_flag,
};
pub use resolve::{CliValues, Provenance, Resolution, Resolved, Resolver};
pub use source::{Document, FileFormat};
pub use value::{FlagKind, FlagValue};
