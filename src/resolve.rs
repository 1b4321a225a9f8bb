//! Precedence resolution.
//!
//! A flag's value comes from exactly one source, chosen in a fixed order:
//! 1. **Command line** - an explicitly supplied argument always wins
//! 2. **Environment** - the first bound variable that is present
//! 3. **File** - the flag's dotted name looked up in the input source
//! 4. **Default** - the declared default, or the kind's zero value
//!
//! The order does not depend on which sources exist, only on which ones
//! produced a value. A file can therefore replace a default but never an
//! environment variable or an argument.

use crate::env::EnvSource;
use crate::error::{Error, Result, ValueOrigin};
use crate::flag::Flag;
use crate::source::Document;
use crate::value::FlagValue;
use indexmap::IndexMap;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, trace};

/// Source that supplied a resolved value, lowest precedence first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Provenance {
    /// Declared default or zero value (lowest priority)
    Default = 0,
    /// Input source file
    File = 1,
    /// Bound environment variable
    Environment = 2,
    /// Command-line argument (highest priority)
    CommandLine = 3,
}

impl std::fmt::Display for Provenance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Provenance::Default => write!(f, "default"),
            Provenance::File => write!(f, "file"),
            Provenance::Environment => write!(f, "environment"),
            Provenance::CommandLine => write!(f, "command line"),
        }
    }
}

/// A flag's value for one invocation, with where it came from.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Resolved {
    pub value: FlagValue,
    pub provenance: Provenance,
}

impl Resolved {
    pub fn new(value: FlagValue, provenance: Provenance) -> Self {
        Self { value, provenance }
    }
}

/// Values supplied explicitly on the command line, keyed by flag name.
pub type CliValues = IndexMap<String, FlagValue>;

/// Resolved values keyed by flag name, in declaration order.
pub type Resolution = IndexMap<String, Resolved>;

/// Applies the precedence chain to flags.
#[derive(Clone)]
pub struct Resolver {
    env: Arc<dyn EnvSource>,
}

impl std::fmt::Debug for Resolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Resolver").finish_non_exhaustive()
    }
}

impl Resolver {
    pub fn new(env: Arc<dyn EnvSource>) -> Self {
        Self { env }
    }

    /// Resolve one flag.
    ///
    /// `cli` is the value given on the command line, if any. `document` is
    /// the loaded input source, if any; a missing key falls through to the
    /// default, a value of the wrong type is an error.
    pub fn resolve(
        &self,
        flag: &Flag,
        cli: Option<&FlagValue>,
        document: Option<&Document>,
    ) -> Result<Resolved> {
        let resolved = self.resolve_inner(flag, cli, document)?;
        debug!(
            flag = %flag.name(),
            provenance = %resolved.provenance,
            value = %resolved.value,
            "Resolved flag"
        );
        Ok(resolved)
    }

    fn resolve_inner(
        &self,
        flag: &Flag,
        cli: Option<&FlagValue>,
        document: Option<&Document>,
    ) -> Result<Resolved> {
        if let Some(value) = cli {
            return Ok(Resolved::new(value.clone(), Provenance::CommandLine));
        }

        if let Some(resolved) = self.env_value(flag)? {
            return Ok(resolved);
        }

        if let Some(document) = document {
            if let Some(value) = document.value(flag.name(), flag.kind())? {
                return Ok(Resolved::new(value, Provenance::File));
            }
            trace!(flag = %flag.name(), "Not present in input source");
        }

        Ok(Resolved::new(flag.default_or_zero(), Provenance::Default))
    }

    /// Check the flag's environment variables in declaration order.
    fn env_value(&self, flag: &Flag) -> Result<Option<Resolved>> {
        for var in flag.env_vars() {
            let Some(raw) = self.env.get(var) else {
                continue;
            };
            trace!(flag = %flag.name(), var = %var, "Environment variable is set");

            // A present but empty variable still claims the flag.
            if raw.is_empty() && !flag.kind().accepts_empty() {
                return Ok(Some(Resolved::new(
                    flag.default_or_zero(),
                    Provenance::Environment,
                )));
            }

            let value = flag
                .kind()
                .parse(&raw)
                .map_err(|reason| Error::InvalidValue {
                    flag: flag.name().to_string(),
                    origin: ValueOrigin::Environment(var.clone()),
                    value: raw.clone(),
                    reason,
                })?;
            return Ok(Some(Resolved::new(value, Provenance::Environment)));
        }
        Ok(None)
    }

    /// Resolve every flag, stopping at the first error.
    pub fn resolve_all<'a>(
        &self,
        flags: impl IntoIterator<Item = &'a Flag>,
        cli: &CliValues,
        document: Option<&Document>,
    ) -> Result<Resolution> {
        let mut resolution = Resolution::new();
        for flag in flags {
            let resolved = self.resolve(flag, cli.get(flag.name()), document)?;
            resolution.insert(flag.name().to_string(), resolved);
        }
        Ok(resolution)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env::MockEnv;
    use std::time::Duration;

    fn resolver(env: MockEnv) -> Resolver {
        Resolver::new(Arc::new(env))
    }

    fn doc(src: &str) -> Document {
        Document::from_yaml_str(src).unwrap()
    }

    #[test]
    fn test_file_beats_missing_default() {
        let r = resolver(MockEnv::new());
        let flag = Flag::int("test").alternate_source();
        let resolved = r.resolve(&flag, None, Some(&doc("test: 15"))).unwrap();
        assert_eq!(resolved, Resolved::new(FlagValue::Int(15), Provenance::File));
    }

    #[test]
    fn test_file_beats_declared_default() {
        let r = resolver(MockEnv::new());
        let flag = Flag::int("test").default_value(7).alternate_source();
        let resolved = r.resolve(&flag, None, Some(&doc("test: 15"))).unwrap();
        assert_eq!(resolved.value, FlagValue::Int(15));
    }

    #[test]
    fn test_env_beats_file() {
        let r = resolver(MockEnv::from_pairs([("THE_TEST", "10")]));
        let flag = Flag::int("test").env(["THE_TEST"]).alternate_source();
        let resolved = r.resolve(&flag, None, Some(&doc("test: 15"))).unwrap();
        assert_eq!(
            resolved,
            Resolved::new(FlagValue::Int(10), Provenance::Environment)
        );
    }

    #[test]
    fn test_cli_beats_env_and_file() {
        let r = resolver(MockEnv::from_pairs([("THE_TEST", "10")]));
        let flag = Flag::int("test").env(["THE_TEST"]).alternate_source();
        let cli = FlagValue::Int(7);
        let resolved = r
            .resolve(&flag, Some(&cli), Some(&doc("test: 15")))
            .unwrap();
        assert_eq!(
            resolved,
            Resolved::new(FlagValue::Int(7), Provenance::CommandLine)
        );
    }

    #[test]
    fn test_first_present_env_var_wins() {
        let r = resolver(MockEnv::from_pairs([("SECOND", "2"), ("THIRD", "3")]));
        let flag = Flag::int("n").env(["FIRST", "SECOND", "THIRD"]);
        let resolved = r.resolve(&flag, None, None).unwrap();
        assert_eq!(resolved.value, FlagValue::Int(2));
    }

    #[test]
    fn test_empty_env_var_keeps_default_but_blocks_file() {
        let r = resolver(MockEnv::from_pairs([("THE_TEST", "")]));
        let flag = Flag::int("test")
            .default_value(7)
            .env(["THE_TEST"])
            .alternate_source();
        let resolved = r.resolve(&flag, None, Some(&doc("test: 15"))).unwrap();
        assert_eq!(
            resolved,
            Resolved::new(FlagValue::Int(7), Provenance::Environment)
        );
    }

    #[test]
    fn test_empty_env_var_is_empty_string() {
        let r = resolver(MockEnv::from_pairs([("NAME", "")]));
        let flag = Flag::string("name").default_value("svc").env(["NAME"]);
        let resolved = r.resolve(&flag, None, None).unwrap();
        assert_eq!(resolved.value, FlagValue::String(String::new()));
    }

    #[test]
    fn test_unparseable_env_var_is_error() {
        let r = resolver(MockEnv::from_pairs([("THE_TEST", "ten")]));
        let flag = Flag::int("test").env(["THE_TEST"]);
        let err = r.resolve(&flag, None, None).unwrap_err();
        match err {
            Error::InvalidValue { flag, origin, .. } => {
                assert_eq!(flag, "test");
                assert_eq!(origin, ValueOrigin::Environment("THE_TEST".into()));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_missing_key_falls_back_to_default() {
        let r = resolver(MockEnv::new());
        let flag = Flag::duration("timeout")
            .default_value(Duration::from_secs(5))
            .alternate_source();
        let resolved = r.resolve(&flag, None, Some(&doc("other: 1"))).unwrap();
        assert_eq!(
            resolved,
            Resolved::new(
                FlagValue::Duration(Duration::from_secs(5)),
                Provenance::Default
            )
        );
    }

    #[test]
    fn test_no_default_resolves_to_zero() {
        let r = resolver(MockEnv::new());
        let resolved = r.resolve(&Flag::string("name"), None, None).unwrap();
        assert_eq!(
            resolved,
            Resolved::new(FlagValue::String(String::new()), Provenance::Default)
        );
    }

    #[test]
    fn test_nested_and_flat_resolve_identically() {
        let r = resolver(MockEnv::new());
        let flat = r
            .resolve(&Flag::int("test"), None, Some(&doc("test: 15")))
            .unwrap();
        let nested = r
            .resolve(&Flag::int("top.test"), None, Some(&doc("top:\n  test: 15")))
            .unwrap();
        assert_eq!(flat, nested);
    }

    #[test]
    fn test_resolve_all_fails_fast_on_coercion() {
        let r = resolver(MockEnv::new());
        let flags = vec![Flag::int("a"), Flag::int("b"), Flag::int("c")];
        let err = r
            .resolve_all(&flags, &CliValues::new(), Some(&doc("a: 1\nb: nope\nc: 3")))
            .unwrap_err();
        assert_eq!(err.flag(), Some("b"));
    }

    #[test]
    fn test_resolve_all_uses_cli_values() {
        let r = resolver(MockEnv::new());
        let flags = vec![Flag::int("a"), Flag::int("b")];
        let mut cli = CliValues::new();
        cli.insert("b".into(), FlagValue::Int(9));
        let resolution = r
            .resolve_all(&flags, &cli, Some(&doc("a: 1\nb: 2")))
            .unwrap();
        assert_eq!(resolution["a"].value, FlagValue::Int(1));
        assert_eq!(resolution["b"].provenance, Provenance::CommandLine);
    }

    #[test]
    fn test_provenance_order() {
        assert!(Provenance::CommandLine > Provenance::Environment);
        assert!(Provenance::Environment > Provenance::File);
        assert!(Provenance::File > Provenance::Default);
    }
}
