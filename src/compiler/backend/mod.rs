//! Pass 6 (Writer). Two sub-passes, run strictly in order: `size_calculator`
//! (6a) computes every section's size and every element/style/definition's
//! absolute or blob-relative offset; `writer` (6b) emits the header and
//! sections, checking the precomputed size against the actual bytes written
//! after every structure.

pub mod size_calculator;
pub mod writer;

use crate::core::state::CompilerState;
use crate::error::Result;

/// Runs both sub-passes, returning the finished KRB v0.4 byte buffer.
pub fn generate(file: &str, state: &mut CompilerState) -> Result<Vec<u8>> {
    size_calculator::calculate_sizes(file, state)?;
    writer::write_krb(file, state)
}
