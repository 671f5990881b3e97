//! Kryon UI Language Compiler
//!
//! Compiles KRY declarative UI source into KRB v0.4 binary files via a
//! six-pass pipeline: Include Preprocessor, Variable Processor, Parser,
//! Style Resolver, Element Resolver, Writer.
//!
//! # Basic usage
//!
//! ```no_run
//! use kryc::{compile_file, Result};
//!
//! fn main() -> Result<()> {
//!     compile_file("app.kry", "app.krb")?;
//!     Ok(())
//! }
//! ```
//!
//! This library only emits warnings (unknown property, style not found,
//! redefined variable) through the `log` facade; callers that want to see
//! them must install their own `log` subscriber (the `kryc` binary installs
//! `env_logger`).

pub mod cli;
pub mod compiler;
pub mod core;
pub mod error;

pub use core::state::CompilerState;
pub use error::{CompilerError, Result};

use std::collections::HashMap;

/// Compiler version, read from `Cargo.toml` at build time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
pub const DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");

/// Static build information, useful for tools embedding this compiler.
#[derive(Debug, Clone)]
pub struct BuildInfo {
    pub version: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub target_krb_version: (u8, u8),
}

pub const BUILD_INFO: BuildInfo = BuildInfo {
    version: VERSION,
    name: NAME,
    description: DESCRIPTION,
    target_krb_version: (core::constants::KRB_VERSION_MAJOR, core::constants::KRB_VERSION_MINOR),
};

/// Target platform, carried through for parity with the teacher's options
/// struct; this compiler performs no platform-specific codegen, so it is
/// presently inert metadata only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TargetPlatform {
    #[default]
    Universal,
    Desktop,
    Mobile,
    Web,
    Embedded,
}

/// Compilation options, mirroring `kryc.toml`'s shape one-for-one.
#[derive(Debug, Clone, Default)]
pub struct CompilerOptions {
    pub debug_mode: bool,
    pub target_platform: TargetPlatform,
    /// directories searched for `@include`d files relative to the input
    /// file (currently advisory: the preprocessor resolves includes
    /// relative to the including file; this list is carried for config
    /// compatibility and future search-path support).
    pub include_directories: Vec<String>,
    pub custom_variables: HashMap<String, String>,
    /// 0 means unbounded.
    pub max_file_size: u64,
}

/// Compilation statistics returned alongside a successful compile.
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct CompilationStats {
    pub source_size: u64,
    pub output_size: u64,
    pub compression_ratio: f64,
    pub element_count: usize,
    pub style_count: usize,
    pub component_count: usize,
    pub resource_count: usize,
    pub string_count: usize,
    pub include_count: usize,
    pub variable_count: usize,
    pub compile_time_ms: u64,
}

/// Header and section summary read back out of a compiled `.krb` file,
/// without re-running the pipeline. Used by the `check`/`analyze` CLI
/// paths and by tests that want to assert on a compiled file's shape.
#[derive(Debug, Clone, serde::Serialize)]
pub struct KrbFileInfo {
    pub version_major: u8,
    pub version_minor: u8,
    pub flags: u16,
    pub element_count: u16,
    pub style_count: u16,
    pub component_def_count: u16,
    pub animation_count: u16,
    pub string_count: u16,
    pub resource_count: u16,
    pub element_offset: u32,
    pub style_offset: u32,
    pub component_def_offset: u32,
    pub animation_offset: u32,
    pub string_offset: u32,
    pub resource_offset: u32,
    pub total_size: u32,
}

/// Main entry point: compiles `input_path` to `output_path` under `options`.
pub fn compile_file_with_options(
    input_path: &str,
    output_path: &str,
    options: CompilerOptions,
) -> Result<CompilationStats> {
    compiler::compile_with_options(input_path, output_path, options)
}

/// Convenience wrapper over [`compile_file_with_options`] with defaults.
pub fn compile_file(input_path: &str, output_path: &str) -> Result<CompilationStats> {
    compile_file_with_options(input_path, output_path, CompilerOptions::default())
}

/// Runs the pipeline through the Element Resolver (no Writer) and
/// discards the result, surfacing only success/failure. Used by `kryc
/// check` and by editors/CI that just want a verdict.
pub fn check_file(input_path: &str, options: &CompilerOptions) -> Result<()> {
    compiler::check_with_options(input_path, options)?;
    Ok(())
}

/// Parses and validates a compiled `.krb` file's 48-byte header and
/// section layout without interpreting the sections themselves.
pub fn analyze_krb_file(file_path: &str) -> Result<KrbFileInfo> {
    let data = std::fs::read(file_path).map_err(|_| CompilerError::FileNotFound {
        path: file_path.to_string(),
    })?;
    validate_krb_file(&data)
}

/// Parses a KRB buffer's 48-byte header, checking the magic number and
/// that every section offset lies within the buffer, without decoding the
/// sections themselves.
pub fn validate_krb_file(data: &[u8]) -> Result<KrbFileInfo> {
    use byteorder::{LittleEndian, ReadBytesExt};

    if data.len() < core::constants::KRB_HEADER_SIZE {
        return Err(CompilerError::internal(format!(
            "file is {} bytes, shorter than the {}-byte header",
            data.len(),
            core::constants::KRB_HEADER_SIZE
        )));
    }
    if &data[0..4] != core::constants::KRB_MAGIC.as_slice() {
        return Err(CompilerError::internal("bad magic number, not a KRB file".to_string()));
    }

    let mut cursor = &data[4..];
    let version = cursor.read_u16::<LittleEndian>()?;
    let info = KrbFileInfo {
        version_minor: (version >> 8) as u8,
        version_major: (version & 0xFF) as u8,
        flags: cursor.read_u16::<LittleEndian>()?,
        element_count: cursor.read_u16::<LittleEndian>()?,
        style_count: cursor.read_u16::<LittleEndian>()?,
        component_def_count: cursor.read_u16::<LittleEndian>()?,
        animation_count: cursor.read_u16::<LittleEndian>()?,
        string_count: cursor.read_u16::<LittleEndian>()?,
        resource_count: cursor.read_u16::<LittleEndian>()?,
        element_offset: cursor.read_u32::<LittleEndian>()?,
        style_offset: cursor.read_u32::<LittleEndian>()?,
        component_def_offset: cursor.read_u32::<LittleEndian>()?,
        animation_offset: cursor.read_u32::<LittleEndian>()?,
        string_offset: cursor.read_u32::<LittleEndian>()?,
        resource_offset: cursor.read_u32::<LittleEndian>()?,
        total_size: cursor.read_u32::<LittleEndian>()?,
    };

    if info.total_size as usize != data.len() {
        return Err(CompilerError::internal(format!(
            "header declares total size {} but file is {} bytes",
            info.total_size,
            data.len()
        )));
    }
    for (name, offset) in [
        ("element", info.element_offset),
        ("style", info.style_offset),
        ("component_def", info.component_def_offset),
        ("animation", info.animation_offset),
        ("string", info.string_offset),
        ("resource", info.resource_offset),
    ] {
        if offset as usize > data.len() {
            return Err(CompilerError::internal(format!("{} offset {} is past end of file", name, offset)));
        }
    }

    Ok(info)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn compiles_a_minimal_app_and_validates_the_header() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("app.kry");
        let mut f = std::fs::File::create(&input).unwrap();
        writeln!(f, "App {{ window_title: \"Hi\" }}").unwrap();
        let output = dir.path().join("app.krb");

        let stats = compile_file(input.to_str().unwrap(), output.to_str().unwrap()).unwrap();
        assert!(stats.output_size > 0);

        let info = analyze_krb_file(output.to_str().unwrap()).unwrap();
        assert_eq!(info.version_major, core::constants::KRB_VERSION_MAJOR);
        assert_eq!(info.version_minor, core::constants::KRB_VERSION_MINOR);
        assert_eq!(info.element_count, 1);
    }

    #[test]
    fn removes_partial_output_on_failure() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("bad.kry");
        std::fs::write(&input, "Container {\n").unwrap();
        let output = dir.path().join("bad.krb");
        std::fs::write(&output, b"stale").unwrap();

        assert!(compile_file(input.to_str().unwrap(), output.to_str().unwrap()).is_err());
        assert!(!output.exists());
    }
}
