//! A thin `clap`-derived CLI with two subcommands: `compile` and `check`.
//! Carries no algorithmic content of its own — it only assembles
//! [`crate::CompilerOptions`] from flags and an optional config file, then
//! delegates to the library entry points.

mod config;
mod handlers;

use std::collections::HashMap;

use clap::{Parser, Subcommand};

use crate::error::{CompilerError, Result};
use crate::CompilerOptions;

#[derive(Debug, Parser)]
#[command(name = crate::NAME, version = crate::VERSION, about = crate::DESCRIPTION)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Compile a KRY file to KRB
    Compile(CompileArgs),
    /// Check a KRY file for syntax/semantic errors without producing output
    Check(CheckArgs),
}

#[derive(Debug, Parser)]
pub struct CompileArgs {
    /// Input .kry file
    input: String,
    /// Output .krb file; defaults to the input path with a .krb extension
    #[arg(short, long)]
    output: Option<String>,
    /// Project config file (.toml or .json)
    #[arg(short, long)]
    config: Option<String>,
    /// Define a custom variable as KEY=VALUE, may be repeated
    #[arg(short = 'D', long = "define")]
    define: Vec<String>,
    /// Increase log verbosity; may be repeated (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Debug, Parser)]
pub struct CheckArgs {
    /// Input .kry file
    input: String,
}

/// Parses `std::env::args()` and runs the selected subcommand.
pub fn run() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Compile(args) => {
            setup_logging(args.verbose);
            let options = build_options(args.config.as_deref(), &args.define)?;
            handlers::handle_compile(args, options)
        }
        Commands::Check(args) => {
            setup_logging(0);
            let options = build_options(None, &[])?;
            handlers::handle_check(args, options)
        }
    }
}

fn setup_logging(verbose_count: u8) {
    let level = match verbose_count {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    env_logger::Builder::from_default_env()
        .filter_level(level)
        .format_timestamp_secs()
        .try_init()
        .ok();
}

/// Merges an optional config file with `-D` flags into `CompilerOptions`.
/// CLI-supplied `-D` values override config-file `custom_variables`;
/// config-file `include_directories` are appended after any in the
/// defaults (there are none yet, since this CLI takes no `-I` flag).
fn build_options(config_path: Option<&str>, defines: &[String]) -> Result<CompilerOptions> {
    let mut options = CompilerOptions::default();

    if let Some(path) = config_path {
        let file = config::load(path)?;
        if let Some(dirs) = file.include_directories {
            options.include_directories.extend(dirs);
        }
        if let Some(vars) = file.custom_variables {
            options.custom_variables = vars;
        }
        if let Some(max) = file.max_file_size {
            options.max_file_size = max;
        }
    }

    for define in defines {
        let (key, value) = define.split_once('=').ok_or_else(|| {
            CompilerError::value("", 0, format!("invalid -D '{}', expected KEY=VALUE", define))
        })?;
        options.custom_variables.insert(key.to_string(), value.to_string());
    }

    Ok(options)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_options_merges_defines_over_config_defaults() {
        let mut vars = HashMap::new();
        vars.insert("a".to_string(), "1".to_string());
        let options = CompilerOptions { custom_variables: vars, ..Default::default() };
        assert_eq!(options.custom_variables.get("a"), Some(&"1".to_string()));
    }
}
