//! Setup hook that populates flags from an input source file.
//!
//! ```no_run
//! use altsrc::{Command, Flag, InitInputSource, yaml_source_from_flag};
//!
//! let flags = vec![
//!     Flag::int("test").alternate_source(),
//!     Flag::string("load"),
//! ];
//! let command = Command::new("test-cmd")
//!     .flags(flags.clone())
//!     .before(InitInputSource::new(&flags, yaml_source_from_flag("load")))
//!     .action(|ctx| {
//!         println!("test = {}", ctx.int("test")?);
//!         Ok(())
//!     });
//! command.run(["test-cmd", "--load", "current.yaml"])?;
//! # Ok::<(), altsrc::Error>(())
//! ```

use crate::command::{BeforeHook, Context};
use crate::error::{Error, Result};
use crate::flag::Flag;
use crate::resolve::Resolution;
use crate::source::{Document, FileFormat};
use crate::value::{FlagKind, FlagValue};
use std::path::PathBuf;
use tracing::{debug, trace};

/// Produces the input source for one invocation.
///
/// `Ok(None)` means there is nothing to load and the hook does nothing.
pub trait SourceLoader {
    fn load(&self, ctx: &Context) -> Result<Option<Document>>;
}

impl<F> SourceLoader for F
where
    F: Fn(&Context) -> Result<Option<Document>>,
{
    fn load(&self, ctx: &Context) -> Result<Option<Document>> {
        self(ctx)
    }
}

/// Loads the file named by another flag's value.
#[derive(Debug, Clone)]
pub struct FromFlag {
    flag: String,
    format: Option<FileFormat>,
}

impl FromFlag {
    /// Pick the file format from the file's extension.
    pub fn new(flag: impl Into<String>) -> Self {
        Self {
            flag: flag.into(),
            format: None,
        }
    }

    /// Always decode as `format`.
    pub fn with_format(mut self, format: FileFormat) -> Self {
        self.format = Some(format);
        self
    }

    /// The path given by the flag; `None` if the flag is unset, empty, or
    /// not declared. A flag that cannot hold a path is an error.
    fn path(&self, ctx: &Context) -> Result<Option<PathBuf>> {
        let path = match ctx.value(&self.flag) {
            Ok(FlagValue::String(s)) => PathBuf::from(s),
            Ok(FlagValue::Path(p)) => p.clone(),
            Ok(other) => {
                return Err(Error::WrongKind {
                    flag: self.flag.clone(),
                    declared: other.kind(),
                    requested: FlagKind::Path,
                });
            }
            Err(Error::UnknownFlag(_)) => return Ok(None),
            Err(e) => return Err(e),
        };
        if path.as_os_str().is_empty() {
            Ok(None)
        } else {
            Ok(Some(path))
        }
    }
}

impl SourceLoader for FromFlag {
    fn load(&self, ctx: &Context) -> Result<Option<Document>> {
        let Some(path) = self.path(ctx)? else {
            trace!(flag = %self.flag, "No input source path given");
            return Ok(None);
        };
        let document = match self.format {
            Some(format) => Document::from_file_as(&path, format)?,
            None => Document::from_file(&path)?,
        };
        Ok(Some(document))
    }
}

/// Loads a fixed file.
#[derive(Debug, Clone)]
pub struct FromFile {
    path: PathBuf,
    format: Option<FileFormat>,
}

impl FromFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            format: None,
        }
    }

    pub fn with_format(mut self, format: FileFormat) -> Self {
        self.format = Some(format);
        self
    }
}

impl SourceLoader for FromFile {
    fn load(&self, _ctx: &Context) -> Result<Option<Document>> {
        let document = match self.format {
            Some(format) => Document::from_file_as(&self.path, format)?,
            None => Document::from_file(&self.path)?,
        };
        Ok(Some(document))
    }
}

/// Load a YAML file named by the `flag` flag.
pub fn yaml_source_from_flag(flag: impl Into<String>) -> FromFlag {
    FromFlag::new(flag).with_format(FileFormat::Yaml)
}

/// Load a JSON file named by the `flag` flag.
pub fn json_source_from_flag(flag: impl Into<String>) -> FromFlag {
    FromFlag::new(flag).with_format(FileFormat::Json)
}

/// Load the file named by the `flag` flag, format chosen by extension.
pub fn source_from_flag(flag: impl Into<String>) -> FromFlag {
    FromFlag::new(flag)
}

/// Load a fixed YAML file.
pub fn yaml_source_from_file(path: impl Into<PathBuf>) -> FromFile {
    FromFile::new(path).with_format(FileFormat::Yaml)
}

/// Before-hook that resolves alternate-source flags against a loaded file.
///
/// Only flags marked with [`Flag::alternate_source`] are considered. When the
/// loader yields no document the hook changes nothing. Read and decode
/// errors, as well as values that do not fit a flag's kind, abort the
/// invocation before any value is applied.
pub struct InitInputSource<L> {
    flags: Vec<Flag>,
    loader: L,
}

impl<L: SourceLoader> InitInputSource<L> {
    pub fn new<'a>(flags: impl IntoIterator<Item = &'a Flag>, loader: L) -> Self {
        Self {
            flags: flags
                .into_iter()
                .filter(|f| f.is_alternate_source())
                .cloned()
                .collect(),
            loader,
        }
    }

    /// The flags this hook resolves.
    pub fn eligible_flags(&self) -> &[Flag] {
        &self.flags
    }
}

impl<L: SourceLoader> BeforeHook for InitInputSource<L> {
    fn before(&self, ctx: &Context) -> Result<Resolution> {
        let Some(document) = self.loader.load(ctx)? else {
            return Ok(Resolution::new());
        };
        debug!(
            origin = ?document.origin(),
            flags = self.flags.len(),
            "Resolving flags from input source"
        );
        ctx.resolver()
            .resolve_all(&self.flags, ctx.cli_values(), Some(&document))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::Command;
    use crate::env::MockEnv;
    use tempfile::TempDir;

    fn write(temp: &TempDir, name: &str, content: &str) -> String {
        let path = temp.path().join(name);
        std::fs::write(&path, content).unwrap();
        path.to_string_lossy().into_owned()
    }

    #[test]
    fn test_only_eligible_flags_are_kept() {
        let flags = vec![Flag::int("a").alternate_source(), Flag::string("load")];
        let hook = InitInputSource::new(&flags, yaml_source_from_flag("load"));
        assert_eq!(hook.eligible_flags().len(), 1);
        assert_eq!(hook.eligible_flags()[0].name(), "a");
    }

    #[test]
    fn test_ineligible_flag_ignores_file() {
        let temp = TempDir::new().unwrap();
        let file = write(&temp, "current.yaml", "a: 1\nb: 2\n");
        let flags = vec![
            Flag::int("a").alternate_source(),
            Flag::int("b"),
            Flag::string("load"),
        ];
        let ctx = Command::new("cmd")
            .env(MockEnv::new())
            .flags(flags.clone())
            .before(InitInputSource::new(&flags, yaml_source_from_flag("load")))
            .parse(["cmd", "--load", file.as_str()])
            .unwrap();
        assert_eq!(ctx.int("a").unwrap(), 1);
        assert_eq!(ctx.int("b").unwrap(), 0);
    }

    #[test]
    fn test_load_flag_from_env() {
        let temp = TempDir::new().unwrap();
        let file = write(&temp, "current.yaml", "a: 3\n");
        let flags = vec![
            Flag::int("a").alternate_source(),
            Flag::string("load").env(["APP_CONFIG"]),
        ];
        let ctx = Command::new("cmd")
            .env(MockEnv::from_pairs([("APP_CONFIG", file)]))
            .flags(flags.clone())
            .before(InitInputSource::new(&flags, yaml_source_from_flag("load")))
            .parse(["cmd"])
            .unwrap();
        assert_eq!(ctx.int("a").unwrap(), 3);
    }

    #[test]
    fn test_source_from_flag_detects_json() {
        let temp = TempDir::new().unwrap();
        let file = write(&temp, "current.json", r#"{"top": {"test": 15}}"#);
        let flags = vec![
            Flag::int("top.test").alternate_source(),
            Flag::path("config"),
        ];
        let ctx = Command::new("cmd")
            .env(MockEnv::new())
            .flags(flags.clone())
            .before(InitInputSource::new(&flags, source_from_flag("config")))
            .parse(["cmd", "--config", file.as_str()])
            .unwrap();
        assert_eq!(ctx.int("top.test").unwrap(), 15);
    }

    #[test]
    fn test_fixed_file_loader() {
        let temp = TempDir::new().unwrap();
        let file = write(&temp, "fixed.yaml", "name: fixed\n");
        let flags = vec![Flag::string("name").alternate_source()];
        let ctx = Command::new("cmd")
            .env(MockEnv::new())
            .flags(flags.clone())
            .before(InitInputSource::new(&flags, yaml_source_from_file(file)))
            .parse(["cmd"])
            .unwrap();
        assert_eq!(ctx.string("name").unwrap(), "fixed");
    }

    #[test]
    fn test_closure_loader() {
        let flags = vec![Flag::bool("debug").alternate_source()];
        let loader = |_ctx: &Context| -> Result<Option<Document>> {
            Document::from_yaml_str("debug: true").map(Some)
        };
        let ctx = Command::new("cmd")
            .env(MockEnv::new())
            .flags(flags.clone())
            .before(InitInputSource::new(&flags, loader))
            .parse(["cmd"])
            .unwrap();
        assert!(ctx.bool("debug").unwrap());
    }

    #[test]
    fn test_relative_path_values_follow_the_file() {
        let temp = TempDir::new().unwrap();
        let file = write(&temp, "current.yaml", "cert: certs/server.pem\n");
        let flags = vec![Flag::path("cert").alternate_source(), Flag::string("load")];
        let ctx = Command::new("cmd")
            .env(MockEnv::new())
            .flags(flags.clone())
            .before(InitInputSource::new(&flags, yaml_source_from_flag("load")))
            .parse(["cmd", "--load", file.as_str()])
            .unwrap();
        assert_eq!(
            ctx.path("cert").unwrap(),
            temp.path().join("certs/server.pem")
        );
    }

    #[test]
    fn test_load_flag_of_wrong_kind_is_error() {
        let flags = vec![Flag::int("test").alternate_source(), Flag::int("load")];
        let err = Command::new("cmd")
            .env(MockEnv::new())
            .flags(flags.clone())
            .before(InitInputSource::new(&flags, yaml_source_from_flag("load")))
            .parse(["cmd", "--load", "3"])
            .unwrap_err();
        match err {
            Error::WrongKind {
                flag,
                declared,
                requested,
            } => {
                assert_eq!(flag, "load");
                assert_eq!(declared, FlagKind::Int);
                assert_eq!(requested, FlagKind::Path);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_undeclared_or_empty_load_flag_is_noop() {
        let flags = vec![Flag::int("test").alternate_source(), Flag::path("load")];
        let ctx = Command::new("cmd")
            .env(MockEnv::new())
            .flags(flags.clone())
            .before(InitInputSource::new(&flags, yaml_source_from_flag("config")))
            .before(InitInputSource::new(&flags, yaml_source_from_flag("load")))
            .parse(["cmd"])
            .unwrap();
        assert_eq!(ctx.int("test").unwrap(), 0);
    }

    #[test]
    fn test_decode_error_aborts() {
        let temp = TempDir::new().unwrap();
        let file = write(&temp, "bad.yaml", "test: [1, 2");
        let flags = vec![Flag::int("test").alternate_source(), Flag::string("load")];
        let err = Command::new("cmd")
            .env(MockEnv::new())
            .flags(flags.clone())
            .before(InitInputSource::new(&flags, yaml_source_from_flag("load")))
            .parse(["cmd", "--load", file.as_str()])
            .unwrap_err();
        assert!(matches!(err, Error::Decode { .. }));
    }
}
