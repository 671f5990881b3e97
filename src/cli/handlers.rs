//! Implementations of the two subcommands. Kept separate from `mod.rs` so
//! the argument parsing and the actual work stay easy to read apart.

use std::path::Path;

use crate::{compile_file_with_options, CompilationStats, CompilerOptions};
use crate::error::Result;

use super::{CompileArgs, CheckArgs};

pub fn handle_compile(args: CompileArgs, options: CompilerOptions) -> Result<()> {
    let output_path = args.output.unwrap_or_else(|| {
        Path::new(&args.input).with_extension("krb").to_string_lossy().into_owned()
    });

    let stats = compile_file_with_options(&args.input, &output_path, options)?;
    print_summary(&args.input, &output_path, &stats);
    Ok(())
}

pub fn handle_check(args: CheckArgs, options: CompilerOptions) -> Result<()> {
    crate::check_file(&args.input, &options)?;
    println!("{}: OK", args.input);
    Ok(())
}

fn print_summary(input: &str, output: &str, stats: &CompilationStats) {
    println!(
        "{} -> {} ({} bytes, {}ms)",
        input, output, stats.output_size, stats.compile_time_ms
    );
    println!(
        "  elements={} styles={} components={} strings={} resources={} includes={} variables={}",
        stats.element_count,
        stats.style_count,
        stats.component_count,
        stats.string_count,
        stats.resource_count,
        stats.include_count,
        stats.variable_count,
    );
}
