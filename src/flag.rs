//! Flag declarations.

use crate::error::{Error, Result};
use crate::value::{FlagKind, FlagValue};
use std::path::PathBuf;
use std::time::Duration;

/// A declared command-line flag.
///
/// Built once when the command is registered:
///
/// ```
/// use altsrc::Flag;
///
/// let flag = Flag::int("top.test")
///     .env(["THE_TEST"])
///     .default_value(7)
///     .alternate_source();
/// assert_eq!(flag.name(), "top.test");
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Flag {
    name: String,
    kind: FlagKind,
    aliases: Vec<String>,
    env_vars: Vec<String>,
    default: Option<FlagValue>,
    /// A default that could not be converted to `kind`, reported by `validate`.
    rejected_default: Option<FlagValue>,
    usage: Option<String>,
    alternate_source: bool,
}

impl Flag {
    /// Declare a flag of any kind.
    pub fn new(name: impl Into<String>, kind: FlagKind) -> Self {
        Self {
            name: name.into(),
            kind,
            aliases: Vec::new(),
            env_vars: Vec::new(),
            default: None,
            rejected_default: None,
            usage: None,
            alternate_source: false,
        }
    }

    pub fn int(name: impl Into<String>) -> Self {
        Self::new(name, FlagKind::Int)
    }

    pub fn uint(name: impl Into<String>) -> Self {
        Self::new(name, FlagKind::Uint)
    }

    pub fn float(name: impl Into<String>) -> Self {
        Self::new(name, FlagKind::Float)
    }

    pub fn bool(name: impl Into<String>) -> Self {
        Self::new(name, FlagKind::Bool)
    }

    pub fn string(name: impl Into<String>) -> Self {
        Self::new(name, FlagKind::String)
    }

    pub fn path(name: impl Into<String>) -> Self {
        Self::new(name, FlagKind::Path)
    }

    pub fn duration(name: impl Into<String>) -> Self {
        Self::new(name, FlagKind::Duration)
    }

    pub fn string_list(name: impl Into<String>) -> Self {
        Self::new(name, FlagKind::StringList)
    }

    pub fn int_list(name: impl Into<String>) -> Self {
        Self::new(name, FlagKind::IntList)
    }

    pub fn float_list(name: impl Into<String>) -> Self {
        Self::new(name, FlagKind::FloatList)
    }

    /// Add alternative names. Single-character aliases become short flags.
    pub fn aliases<I, S>(mut self, aliases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.aliases.extend(aliases.into_iter().map(Into::into));
        self
    }

    /// Bind environment variables, checked in the given order.
    pub fn env<I, S>(mut self, vars: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.env_vars.extend(vars.into_iter().map(Into::into));
        self
    }

    /// Set the compiled-in default.
    ///
    /// The value is converted to the flag's kind where that loses nothing,
    /// so `Flag::uint("port").default_value(8080)` and
    /// `Flag::path("p").default_value("a.yaml")` work as written. Any other
    /// mismatch is reported by [`Flag::validate`] when the command parses.
    pub fn default_value(mut self, value: impl Into<FlagValue>) -> Self {
        match value.into().fit(self.kind) {
            Ok(value) => {
                self.default = Some(value);
                self.rejected_default = None;
            }
            Err(value) => {
                self.default = None;
                self.rejected_default = Some(value);
            }
        }
        self
    }

    /// Check the declaration is usable.
    pub fn validate(&self) -> Result<()> {
        match &self.rejected_default {
            Some(value) => Err(Error::WrongKind {
                flag: self.name.clone(),
                declared: self.kind,
                requested: value.kind(),
            }),
            None => Ok(()),
        }
    }

    pub fn usage(mut self, usage: impl Into<String>) -> Self {
        self.usage = Some(usage.into());
        self
    }

    /// Mark the flag as eligible to be populated from an input source file.
    pub fn alternate_source(mut self) -> Self {
        self.alternate_source = true;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> FlagKind {
        self.kind
    }

    pub fn alias_names(&self) -> &[String] {
        &self.aliases
    }

    pub fn env_vars(&self) -> &[String] {
        &self.env_vars
    }

    pub fn usage_text(&self) -> Option<&str> {
        self.usage.as_deref()
    }

    pub fn is_alternate_source(&self) -> bool {
        self.alternate_source
    }

    /// The declared default, or the kind's zero value.
    pub fn default_or_zero(&self) -> FlagValue {
        self.default.clone().unwrap_or_else(|| self.kind.zero())
    }

    /// Whether `name` is this flag's name or one of its aliases.
    pub fn matches(&self, name: &str) -> bool {
        self.name == name || self.aliases.iter().any(|a| a == name)
    }
}

impl From<i64> for FlagValue {
    fn from(v: i64) -> Self {
        FlagValue::Int(v)
    }
}

impl From<i32> for FlagValue {
    fn from(v: i32) -> Self {
        FlagValue::Int(v.into())
    }
}

impl From<u64> for FlagValue {
    fn from(v: u64) -> Self {
        FlagValue::Uint(v)
    }
}

impl From<f64> for FlagValue {
    fn from(v: f64) -> Self {
        FlagValue::Float(v)
    }
}

impl From<bool> for FlagValue {
    fn from(v: bool) -> Self {
        FlagValue::Bool(v)
    }
}

impl From<&str> for FlagValue {
    fn from(v: &str) -> Self {
        FlagValue::String(v.to_string())
    }
}

impl From<String> for FlagValue {
    fn from(v: String) -> Self {
        FlagValue::String(v)
    }
}

impl From<PathBuf> for FlagValue {
    fn from(v: PathBuf) -> Self {
        FlagValue::Path(v)
    }
}

impl From<Duration> for FlagValue {
    fn from(v: Duration) -> Self {
        FlagValue::Duration(v)
    }
}

impl From<Vec<String>> for FlagValue {
    fn from(v: Vec<String>) -> Self {
        FlagValue::StringList(v)
    }
}

impl From<Vec<i64>> for FlagValue {
    fn from(v: Vec<i64>) -> Self {
        FlagValue::IntList(v)
    }
}

impl From<Vec<f64>> for FlagValue {
    fn from(v: Vec<f64>) -> Self {
        FlagValue::FloatList(v)
    }
}
