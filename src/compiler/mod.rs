//! Orchestrates the six-pass pipeline end to end: Include Preprocessor,
//! Variable Processor, Parser, Style Resolver, Element Resolver, Writer.
//! Each pass lives in its own module below and is run strictly in order;
//! none of them are re-entrant or interleaved.

pub mod backend;
pub mod frontend;
pub mod middle_end;

use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::time::Instant;

use crate::core::state::{CompilerState, VariableDef};
use crate::core::util::is_valid_identifier;
use crate::error::{CompilerError, Result};
use crate::{CompilationStats, CompilerOptions};

/// Runs every pass through the Element Resolver (no Writer), for the CLI's
/// `check` command: reports the same errors a full compile would without
/// ever touching the filesystem for output.
pub fn check_with_options(input_path: &str, options: &CompilerOptions) -> Result<CompilerState> {
    let (_stats, state) = run_front_and_middle(input_path, options)?;
    Ok(state)
}

/// Full pipeline: preprocess, substitute variables, parse, resolve styles
/// and elements, then write the KRB binary to `output_path`. On any fatal
/// error the partially written output file (if one exists from this run)
/// is unlinked before the error propagates, per the resource-scoping rule.
pub fn compile_with_options(
    input_path: &str,
    output_path: &str,
    options: CompilerOptions,
) -> Result<CompilationStats> {
    let start_time = Instant::now();
    match compile_inner(input_path, output_path, &options, start_time) {
        Ok(stats) => Ok(stats),
        Err(e) => {
            if let Err(remove_err) = fs::remove_file(output_path) {
                if remove_err.kind() != std::io::ErrorKind::NotFound {
                    log::warn!("failed to remove partial output '{}': {}", output_path, remove_err);
                }
            }
            Err(e)
        }
    }
}

fn compile_inner(
    input_path: &str,
    output_path: &str,
    options: &CompilerOptions,
    start_time: Instant,
) -> Result<CompilationStats> {
    let source_size = fs::metadata(input_path).map_err(|_| CompilerError::FileNotFound {
        path: input_path.to_string(),
    })?.len();
    if options.max_file_size > 0 && source_size > options.max_file_size {
        return Err(CompilerError::limit("source_file_bytes", options.max_file_size as usize, source_size as usize));
    }

    let (include_count, variable_count, mut state) = run_front_end(input_path, options)?;

    style_resolver_pass(input_path, &mut state)?;
    element_resolver_pass(input_path, &mut state)?;

    let krb_data = backend::generate(input_path, &mut state)?;
    fs::write(output_path, &krb_data)?;

    let mut stats = CompilationStats::default();
    stats.source_size = source_size;
    stats.output_size = krb_data.len() as u64;
    stats.compression_ratio = if source_size > 0 {
        krb_data.len() as f64 / source_size as f64
    } else {
        0.0
    };
    stats.element_count = state.elements.iter().filter(|e| !e.is_template_element).count();
    stats.style_count = state.styles.len();
    stats.component_count = state.component_defs.len();
    stats.resource_count = state.resources.len();
    stats.string_count = state.strings.len();
    stats.include_count = include_count;
    stats.variable_count = variable_count;
    stats.compile_time_ms = start_time.elapsed().as_millis() as u64;
    Ok(stats)
}

/// Runs passes 1-3 (preprocessor, variables, parser), returning include and
/// variable counts alongside the resulting state. Shared by `check` (which
/// stops before the writer) and the full compile.
fn run_front_end(input_path: &str, options: &CompilerOptions) -> Result<(usize, usize, CompilerState)> {
    let mut seeded = HashMap::new();
    for (name, value) in &options.custom_variables {
        if !is_valid_identifier(name) {
            return Err(CompilerError::value(input_path, 0, format!("invalid custom variable name '{}'", name)));
        }
        let mut def = VariableDef::new(name.clone(), value.clone(), 0);
        def.is_resolved = true;
        def.resolved_value = Some(value.clone());
        seeded.insert(name.clone(), def);
    }

    let (preprocessed, include_count) = middle_end::preprocessor::preprocess(Path::new(input_path))?;
    let (substituted, variable_count) = middle_end::variables::process(input_path, &preprocessed, seeded)?;
    let state = frontend::parse_to_state(input_path, &substituted)?;
    Ok((include_count, variable_count, state))
}

fn run_front_and_middle(input_path: &str, options: &CompilerOptions) -> Result<(CompilationStats, CompilerState)> {
    let (include_count, variable_count, mut state) = run_front_end(input_path, options)?;
    style_resolver_pass(input_path, &mut state)?;
    element_resolver_pass(input_path, &mut state)?;

    let mut stats = CompilationStats::default();
    stats.element_count = state.elements.iter().filter(|e| !e.is_template_element).count();
    stats.style_count = state.styles.len();
    stats.component_count = state.component_defs.len();
    stats.resource_count = state.resources.len();
    stats.string_count = state.strings.len();
    stats.include_count = include_count;
    stats.variable_count = variable_count;
    Ok((stats, state))
}

fn style_resolver_pass(input_path: &str, state: &mut CompilerState) -> Result<()> {
    middle_end::style_resolver::resolve_styles(input_path, state)
}

fn element_resolver_pass(input_path: &str, state: &mut CompilerState) -> Result<()> {
    middle_end::element_resolver::resolve_elements(input_path, state)
}
