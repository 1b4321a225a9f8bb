//! Error types for flag resolution.

use crate::value::FlagKind;
use std::fmt;
use std::path::PathBuf;

/// Where a raw string value came from when it failed to parse.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValueOrigin {
    /// Supplied on the command line.
    CommandLine,
    /// Read from the named environment variable.
    Environment(String),
}

impl fmt::Display for ValueOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueOrigin::CommandLine => write!(f, "command line"),
            ValueOrigin::Environment(var) => write!(f, "environment variable {}", var),
        }
    }
}

/// Errors raised while loading an input source or resolving flag values.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The alternate-source file could not be read.
    #[error("failed to read input source {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The alternate-source file is not a well-formed document.
    #[error("failed to decode input source {}: {message}", path.display())]
    Decode { path: PathBuf, message: String },

    /// A document value could not be converted to the flag's kind.
    #[error("flag {flag}: cannot use {found} from input source as {expected}")]
    Coerce {
        flag: String,
        expected: FlagKind,
        found: String,
    },

    /// A command-line or environment value failed to parse.
    #[error("flag {flag}: invalid value {value:?} from {origin}: {reason}")]
    InvalidValue {
        flag: String,
        origin: ValueOrigin,
        value: String,
        reason: String,
    },

    /// No flag with this name or alias is declared.
    #[error("flag provided but not defined: {0}")]
    UnknownFlag(String),

    /// The accessor asked for a different kind than the flag declares.
    #[error("flag {flag} is declared as {declared}, not {requested}")]
    WrongKind {
        flag: String,
        declared: FlagKind,
        requested: FlagKind,
    },

    /// Command-line parsing failed (includes `--help`).
    #[error(transparent)]
    Cli(#[from] clap::Error),

    /// The command's action returned an error.
    #[error(transparent)]
    Action(#[from] anyhow::Error),
}

impl Error {
    /// Name of the flag this error is about, if any.
    pub fn flag(&self) -> Option<&str> {
        match self {
            Error::Coerce { flag, .. }
            | Error::InvalidValue { flag, .. }
            | Error::WrongKind { flag, .. } => Some(flag),
            Error::UnknownFlag(name) => Some(name),
            _ => None,
        }
    }
}

/// Result type for resolution operations.
pub type Result<T> = std::result::Result<T, Error>;
