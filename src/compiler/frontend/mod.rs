//! Pass 3 (Parser) and the lowering step that turns its output into a
//! [`crate::core::state::CompilerState`].

pub mod ast;
pub mod lexer;
pub mod parser;
pub mod semantic;

use crate::core::state::CompilerState;
use crate::error::Result;

/// Parses `source` and lowers it directly into a `CompilerState`, ready for
/// the style and element resolvers.
pub fn parse_to_state(file: &str, source: &str) -> Result<CompilerState> {
    let ast = parser::parse(file, source)?;
    semantic::build_state(file, ast)
}
