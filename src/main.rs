//! altsrc demo
//!
//! Prints the resolved value of a handful of flags. Any flag marked with
//! `alternate_source` can be supplied from the file given by `--load`:
//!
//! ```text
//! $ cat server.yaml
//! server:
//!   port: 9000
//! timeout: 1m
//! $ ALTSRC_HOST=0.0.0.0 altsrc --load server.yaml
//! server.host = 0.0.0.0
//! server.port = 9000
//! timeout = 1m
//! tags =
//! ```

use altsrc::logging::{self, LogTarget};
use altsrc::{Command, Context, Error, Flag, InitInputSource, source_from_flag};
use anyhow::Result;
use serde_json::{Map, Value};
use std::ffi::OsString;
use std::time::Duration;

fn flags() -> Vec<Flag> {
    vec![
        Flag::path("load")
            .aliases(["c", "config"])
            .env(["ALTSRC_CONFIG"])
            .usage("YAML or JSON file to read flag values from"),
        Flag::string("log")
            .default_value("2")
            .usage("Logging output: 0/off, 1/stdout, 2/stderr, or filename"),
        Flag::bool("verbose")
            .aliases(["v"])
            .usage("Enable verbose logging"),
        Flag::string("format")
            .default_value("text")
            .usage("Output format: text or json"),
        Flag::string("server.host")
            .env(["ALTSRC_HOST"])
            .default_value("127.0.0.1")
            .usage("Address to listen on")
            .alternate_source(),
        Flag::uint("server.port")
            .env(["ALTSRC_PORT", "PORT"])
            .default_value(8080)
            .usage("Port to listen on")
            .alternate_source(),
        Flag::duration("timeout")
            .default_value(Duration::from_secs(30))
            .usage("Request timeout")
            .alternate_source(),
        Flag::string_list("tags")
            .usage("Tags attached to the instance")
            .alternate_source(),
    ]
}

/// Install logging from an early pass over the arguments, so the
/// resolution and file loading done by `run` are already traced.
fn init_logging(command: &Command, args: &[OsString]) -> Result<()> {
    let Ok(ctx) = command.parse_early(args) else {
        // `run` reports the error itself.
        return logging::init(&LogTarget::Stderr, false);
    };
    let Ok(target) = ctx.string("log")?.parse::<LogTarget>();
    logging::init(&target, ctx.bool("verbose")?)
}

fn print_values(ctx: &Context) -> Result<()> {
    let shown = ctx.flags().iter().filter(|f| f.is_alternate_source());
    match ctx.string("format")? {
        "json" => {
            let mut out = Map::new();
            for flag in shown {
                out.insert(
                    flag.name().to_string(),
                    serde_json::to_value(ctx.value(flag.name())?)?,
                );
            }
            println!("{}", serde_json::to_string_pretty(&Value::Object(out))?);
        }
        "text" => {
            for flag in shown {
                println!("{} = {}", flag.name(), ctx.value(flag.name())?);
            }
        }
        other => anyhow::bail!("unknown output format: {}", other),
    }
    Ok(())
}

fn main() -> Result<()> {
    let flags = flags();
    let command = Command::new("altsrc")
        .about("Resolve flags from the command line, environment, and a config file")
        .flags(flags.clone())
        .before(InitInputSource::new(&flags, source_from_flag("load")))
        .action(print_values);

    let args: Vec<OsString> = std::env::args_os().collect();
    init_logging(&command, &args)?;

    match command.run(args) {
        Ok(()) => Ok(()),
        Err(Error::Cli(e)) => e.exit(),
        Err(e) => Err(e.into()),
    }
}
