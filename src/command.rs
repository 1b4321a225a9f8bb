//! Command runner and flag accessors.
//!
//! A [`Command`] turns its flag declarations into a `clap` command, parses
//! the arguments, resolves every flag (command line, environment, default),
//! lets before-hooks contribute further resolutions, and finally runs the
//! action with a [`Context`] holding the final values.

use crate::env::{EnvSource, StdEnv};
use crate::error::{Error, Result, ValueOrigin};
use crate::flag::Flag;
use crate::resolve::{CliValues, Provenance, Resolution, Resolver};
use crate::value::{FlagKind, FlagValue};
use clap::parser::ValueSource;
use clap::{Arg, ArgAction, ArgMatches};
use std::ffi::OsString;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Runs before the action and may supply values for some flags.
///
/// Returned resolutions replace the command's own resolution for the named
/// flags. Hooks run in registration order and see earlier hooks' values.
pub trait BeforeHook {
    fn before(&self, ctx: &Context) -> Result<Resolution>;
}

impl<F> BeforeHook for F
where
    F: Fn(&Context) -> Result<Resolution>,
{
    fn before(&self, ctx: &Context) -> Result<Resolution> {
        self(ctx)
    }
}

type Action = Box<dyn Fn(&Context) -> anyhow::Result<()>>;

/// A command with declared flags, optional before-hooks, and an action.
pub struct Command {
    name: String,
    about: Option<String>,
    flags: Vec<Flag>,
    before: Vec<Box<dyn BeforeHook>>,
    action: Option<Action>,
    env: Arc<dyn EnvSource>,
}

impl std::fmt::Debug for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Command")
            .field("name", &self.name)
            .field("flags", &self.flags)
            .field("before", &self.before.len())
            .finish_non_exhaustive()
    }
}

impl Command {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            about: None,
            flags: Vec::new(),
            before: Vec::new(),
            action: None,
            env: Arc::new(StdEnv),
        }
    }

    pub fn about(mut self, about: impl Into<String>) -> Self {
        self.about = Some(about.into());
        self
    }

    pub fn flag(mut self, flag: Flag) -> Self {
        self.flags.push(flag);
        self
    }

    pub fn flags(mut self, flags: impl IntoIterator<Item = Flag>) -> Self {
        self.flags.extend(flags);
        self
    }

    /// Add a before-hook.
    pub fn before(mut self, hook: impl BeforeHook + 'static) -> Self {
        self.before.push(Box::new(hook));
        self
    }

    pub fn action(mut self, action: impl Fn(&Context) -> anyhow::Result<()> + 'static) -> Self {
        self.action = Some(Box::new(action));
        self
    }

    /// Replace the environment the command reads from (defaults to the process environment).
    pub fn env(mut self, env: impl EnvSource + 'static) -> Self {
        self.env = Arc::new(env);
        self
    }

    pub fn declared_flags(&self) -> &[Flag] {
        &self.flags
    }

    /// Parse `args` (the first item is the program name) and run the action.
    pub fn run<I, T>(&self, args: I) -> Result<()>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        let ctx = self.parse(args)?;
        if let Some(action) = &self.action {
            action(&ctx)?;
        }
        Ok(())
    }

    /// Parse `args` and run the before-hooks without running the action.
    pub fn parse<I, T>(&self, args: I) -> Result<Context>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        let matches = self.clap_command().try_get_matches_from(args)?;
        let mut ctx = self.context(self.cli_values(&matches)?)?;

        for hook in &self.before {
            let resolution = hook.before(&ctx)?;
            ctx.install(resolution)?;
        }

        debug!(command = %self.name, flags = ctx.values.len(), "Flags resolved");
        Ok(ctx)
    }

    /// Resolve flags from the command line, environment and defaults only.
    ///
    /// Parsing stops quietly at the first unknown argument and no hooks run.
    /// Meant for settings that must be in place before [`Command::run`],
    /// such as logging. `--help` yields the environment and default values.
    pub fn parse_early<I, T>(&self, args: I) -> Result<Context>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        let cmd = self.clap_command().ignore_errors(true);
        let cli = match cmd.try_get_matches_from(args) {
            Ok(matches) => self.cli_values(&matches)?,
            Err(_) => CliValues::new(),
        };
        self.context(cli)
    }

    /// Validate declarations and resolve every flag without an input source.
    fn context(&self, cli: CliValues) -> Result<Context> {
        for flag in &self.flags {
            flag.validate()?;
        }

        let resolver = Resolver::new(Arc::clone(&self.env));
        let values = resolver.resolve_all(&self.flags, &cli, None)?;

        Ok(Context {
            command: self.name.clone(),
            flags: self.flags.clone(),
            cli,
            values,
            env: Arc::clone(&self.env),
        })
    }

    /// Build the `clap` command for the declared flags.
    pub fn clap_command(&self) -> clap::Command {
        let mut cmd = clap::Command::new(self.name.clone()).disable_version_flag(true);
        if let Some(about) = &self.about {
            cmd = cmd.about(about.clone());
        }
        for flag in &self.flags {
            cmd = cmd.arg(clap_arg(flag));
        }
        cmd
    }

    /// Parse the values that were given on the command line.
    fn cli_values(&self, matches: &ArgMatches) -> Result<CliValues> {
        let mut cli = CliValues::new();
        for flag in &self.flags {
            if matches.value_source(flag.name()) != Some(ValueSource::CommandLine) {
                continue;
            }
            let raws: Vec<&String> = matches
                .get_many::<String>(flag.name())
                .map(|values| values.collect())
                .unwrap_or_default();
            let parsed = flag
                .kind()
                .parse_all(raws.iter().map(|s| s.as_str()))
                .map_err(|reason| Error::InvalidValue {
                    flag: flag.name().to_string(),
                    origin: ValueOrigin::CommandLine,
                    value: raws
                        .iter()
                        .map(|s| s.as_str())
                        .collect::<Vec<_>>()
                        .join(","),
                    reason,
                })?;
            if let Some(value) = parsed {
                cli.insert(flag.name().to_string(), value);
            }
        }
        Ok(cli)
    }
}

/// Map a flag declaration to a `clap` argument.
///
/// Every flag is repeatable; scalar kinds keep the last occurrence.
fn clap_arg(flag: &Flag) -> Arg {
    let mut arg = Arg::new(flag.name().to_string())
        .long(flag.name().to_string())
        .action(ArgAction::Append);

    let mut has_short = false;
    for alias in flag.alias_names() {
        let mut chars = alias.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) if !has_short => {
                arg = arg.short(c);
                has_short = true;
            }
            (Some(c), None) => arg = arg.visible_short_alias(c),
            _ => arg = arg.visible_alias(alias.clone()),
        }
    }

    let mut help = flag.usage_text().unwrap_or_default().to_string();
    if !flag.env_vars().is_empty() {
        help.push_str(&format!(" [env: {}]", flag.env_vars().join(", ")));
    }
    let default = flag.default_or_zero();
    if default != flag.kind().zero() {
        help.push_str(&format!(" [default: {}]", default));
    }
    arg = arg.help(help.trim().to_string());

    match flag.kind() {
        FlagKind::Bool => arg
            .num_args(0..=1)
            .require_equals(true)
            .default_missing_value("true"),
        // Values may start with '-': negative numbers, `-` for stdin paths.
        FlagKind::StringList | FlagKind::IntList | FlagKind::FloatList => arg
            .value_name(flag.kind().to_string().replace(' ', "-").to_uppercase())
            .allow_hyphen_values(true),
        kind => arg
            .value_name(kind.to_string().to_uppercase())
            .allow_hyphen_values(true),
    }
}

fn wrong_kind(name: &str, found: &FlagValue, requested: FlagKind) -> Error {
    Error::WrongKind {
        flag: name.to_string(),
        declared: found.kind(),
        requested,
    }
}

/// Flag values for one invocation.
///
/// Values are read by flag name or alias. Where a value came from is not
/// visible here; only whether it was set at all.
pub struct Context {
    command: String,
    flags: Vec<Flag>,
    cli: CliValues,
    values: Resolution,
    env: Arc<dyn EnvSource>,
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("command", &self.command)
            .field("cli", &self.cli)
            .finish_non_exhaustive()
    }
}

impl Context {
    pub fn command_name(&self) -> &str {
        &self.command
    }

    pub fn flags(&self) -> &[Flag] {
        &self.flags
    }

    /// Look up a declared flag by name or alias.
    pub fn flag(&self, name: &str) -> Result<&Flag> {
        self.flags
            .iter()
            .find(|f| f.matches(name))
            .ok_or_else(|| Error::UnknownFlag(name.to_string()))
    }

    /// The value given on the command line for this flag, if any.
    pub fn cli_value(&self, name: &str) -> Option<&FlagValue> {
        let flag = self.flag(name).ok()?;
        self.cli.get(flag.name())
    }

    pub fn cli_values(&self) -> &CliValues {
        &self.cli
    }

    /// The environment this invocation reads from.
    pub fn env(&self) -> Arc<dyn EnvSource> {
        Arc::clone(&self.env)
    }

    /// A resolver over this invocation's environment.
    pub fn resolver(&self) -> Resolver {
        Resolver::new(self.env())
    }

    /// The final value of a flag.
    pub fn value(&self, name: &str) -> Result<&FlagValue> {
        let flag = self.flag(name)?;
        self.values
            .get(flag.name())
            .map(|resolved| &resolved.value)
            .ok_or_else(|| Error::UnknownFlag(name.to_string()))
    }

    /// Whether the flag got its value from anywhere other than its default.
    pub fn is_set(&self, name: &str) -> bool {
        self.flag(name)
            .ok()
            .and_then(|flag| self.values.get(flag.name()))
            .is_some_and(|resolved| resolved.provenance != Provenance::Default)
    }

    pub fn int(&self, name: &str) -> Result<i64> {
        match self.value(name)? {
            FlagValue::Int(v) => Ok(*v),
            other => Err(wrong_kind(name, other, FlagKind::Int)),
        }
    }

    pub fn uint(&self, name: &str) -> Result<u64> {
        match self.value(name)? {
            FlagValue::Uint(v) => Ok(*v),
            other => Err(wrong_kind(name, other, FlagKind::Uint)),
        }
    }

    pub fn float(&self, name: &str) -> Result<f64> {
        match self.value(name)? {
            FlagValue::Float(v) => Ok(*v),
            other => Err(wrong_kind(name, other, FlagKind::Float)),
        }
    }

    pub fn bool(&self, name: &str) -> Result<bool> {
        match self.value(name)? {
            FlagValue::Bool(v) => Ok(*v),
            other => Err(wrong_kind(name, other, FlagKind::Bool)),
        }
    }

    pub fn string(&self, name: &str) -> Result<&str> {
        match self.value(name)? {
            FlagValue::String(v) => Ok(v),
            other => Err(wrong_kind(name, other, FlagKind::String)),
        }
    }

    pub fn path(&self, name: &str) -> Result<&Path> {
        match self.value(name)? {
            FlagValue::Path(v) => Ok(v),
            other => Err(wrong_kind(name, other, FlagKind::Path)),
        }
    }

    pub fn duration(&self, name: &str) -> Result<Duration> {
        match self.value(name)? {
            FlagValue::Duration(v) => Ok(*v),
            other => Err(wrong_kind(name, other, FlagKind::Duration)),
        }
    }

    pub fn string_list(&self, name: &str) -> Result<&[String]> {
        match self.value(name)? {
            FlagValue::StringList(v) => Ok(v),
            other => Err(wrong_kind(name, other, FlagKind::StringList)),
        }
    }

    pub fn int_list(&self, name: &str) -> Result<&[i64]> {
        match self.value(name)? {
            FlagValue::IntList(v) => Ok(v),
            other => Err(wrong_kind(name, other, FlagKind::IntList)),
        }
    }

    pub fn float_list(&self, name: &str) -> Result<&[f64]> {
        match self.value(name)? {
            FlagValue::FloatList(v) => Ok(v),
            other => Err(wrong_kind(name, other, FlagKind::FloatList)),
        }
    }

    /// Replace values with a hook's resolution.
    ///
    /// Checked in full before anything is applied.
    fn install(&mut self, resolution: Resolution) -> Result<()> {
        for (name, resolved) in &resolution {
            let flag = self
                .flags
                .iter()
                .find(|f| f.name() == name)
                .ok_or_else(|| Error::UnknownFlag(name.clone()))?;
            if resolved.value.kind() != flag.kind() {
                return Err(Error::WrongKind {
                    flag: name.clone(),
                    declared: flag.kind(),
                    requested: resolved.value.kind(),
                });
            }
        }
        self.values.extend(resolution);
        Ok(())
    }
}
