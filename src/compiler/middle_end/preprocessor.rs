//! Pass 1: Include Preprocessor. Splices `@include "path"` lines into one
//! flat source buffer, relative to the including file, before any other
//! pass sees the text. Cycle-free by assumption (spec.md §4.1); only the
//! depth limit is enforced.

use std::fs;
use std::path::Path;

use crate::core::constants::MAX_INCLUDE_DEPTH;
use crate::error::{CompilerError, Result};

/// Reads `path` and recursively inlines every `@include`d file, returning
/// the combined buffer and the number of files successfully included.
pub fn preprocess(path: &Path) -> Result<(String, usize)> {
    let mut include_count = 0usize;
    let buffer = process_file(path, 1, &mut include_count)?;
    Ok((buffer, include_count))
}

fn process_file(path: &Path, depth: usize, include_count: &mut usize) -> Result<String> {
    let label = path.display().to_string();
    if depth > MAX_INCLUDE_DEPTH {
        return Err(CompilerError::include(
            label,
            0,
            format!("include depth exceeds the limit of {}", MAX_INCLUDE_DEPTH),
        ));
    }
    let content = fs::read_to_string(path)
        .map_err(|e| CompilerError::include(label.clone(), 0, format!("failed to open '{}': {}", label, e)))?;

    let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
    let mut out = String::new();
    for (i, line) in content.lines().enumerate() {
        let line_num = i + 1;
        match parse_include_line(line) {
            Some(Some(include_path)) => {
                *include_count += 1;
                let resolved = base_dir.join(&include_path);
                let nested = process_file(&resolved, depth + 1, include_count)?;
                out.push_str(&nested);
                out.push('\n');
            }
            Some(None) => {
                log::warn!(
                    "{}:{}: malformed @include line, passing through unchanged",
                    label,
                    line_num
                );
                out.push_str(line);
                out.push('\n');
            }
            None => {
                out.push_str(line);
                out.push('\n');
            }
        }
    }
    Ok(out)
}

/// Classifies a line: `None` if it isn't an `@include` line at all,
/// `Some(None)` if it looks like one but is malformed, `Some(Some(path))`
/// for a well-formed `@include "path"` (with an optional trailing `#`
/// comment).
fn parse_include_line(line: &str) -> Option<Option<String>> {
    let trimmed = line.trim_start();
    let rest = trimmed.strip_prefix("@include")?;
    let rest = rest.trim_start();
    if !rest.starts_with('"') {
        return Some(None);
    }
    let bytes = rest.as_bytes();
    let mut end = None;
    for (i, &b) in bytes.iter().enumerate().skip(1) {
        if b == b'"' {
            end = Some(i);
            break;
        }
    }
    let end = match end {
        Some(e) => e,
        None => return Some(None),
    };
    let path = &rest[1..end];
    let trailing = rest[end + 1..].trim();
    if !trailing.is_empty() && !trailing.starts_with('#') {
        return Some(None);
    }
    Some(Some(path.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn inlines_a_single_include() {
        let dir = tempfile::tempdir().unwrap();
        let child = dir.path().join("child.kry");
        std::fs::write(&child, "Text { text: \"hi\" }\n").unwrap();
        let root = dir.path().join("root.kry");
        let mut f = std::fs::File::create(&root).unwrap();
        writeln!(f, "App {{").unwrap();
        writeln!(f, "@include \"child.kry\"").unwrap();
        writeln!(f, "}}").unwrap();

        let (buffer, count) = preprocess(&root).unwrap();
        assert_eq!(count, 1);
        assert!(buffer.contains("Text { text: \"hi\" }"));
    }

    #[test]
    fn malformed_include_passes_through_with_warning() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("root.kry");
        std::fs::write(&root, "@include missing_quotes\n").unwrap();
        let (buffer, count) = preprocess(&root).unwrap();
        assert_eq!(count, 0);
        assert!(buffer.contains("@include missing_quotes"));
    }

    #[test]
    fn depth_limit_is_enforced() {
        let dir = tempfile::tempdir().unwrap();
        for i in 0..=MAX_INCLUDE_DEPTH {
            let name = format!("f{}.kry", i);
            let next = format!("f{}.kry", i + 1);
            let content = if i == MAX_INCLUDE_DEPTH {
                "Text { text: \"leaf\" }\n".to_string()
            } else {
                format!("@include \"{}\"\n", next)
            };
            std::fs::write(dir.path().join(name), content).unwrap();
        }
        let result = preprocess(&dir.path().join("f0.kry"));
        assert!(result.is_err());
    }
}
