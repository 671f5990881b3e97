//! Pass 2: Variable Processor. Collects `@variables { ... }` blocks,
//! resolves `$other` references between them with cycle detection, then
//! textually substitutes every `$name` occurrence in the remaining buffer
//! and strips the variable blocks entirely.

use std::collections::HashMap;

use regex::Regex;

use crate::core::state::VariableDef;
use crate::core::util::is_valid_identifier;
use crate::error::{CompilerError, Result};

/// Runs the full pass with no externally-seeded variables.
pub fn process_variables(file: &str, source: &str) -> Result<String> {
    let (buffer, _count) = process(file, source, HashMap::new())?;
    Ok(buffer)
}

/// Runs the full pass, seeding `vars` (e.g. from `--define` / config custom
/// variables) before collecting `@variables` blocks; a block-declared name
/// that collides with a seed overwrites it, with the same warning as any
/// other redefinition. Returns the substituted buffer and the number of
/// variables that were defined (seeded + collected).
pub fn process(file: &str, source: &str, mut vars: HashMap<String, VariableDef>) -> Result<(String, usize)> {
    let stripped = collect(file, source, &mut vars);
    resolve_all(file, &mut vars)?;
    let substituted = substitute(file, &stripped, &vars)?;
    Ok((substituted, vars.len()))
}

fn collect(file: &str, source: &str, vars: &mut HashMap<String, VariableDef>) -> String {
    let lines: Vec<&str> = source.lines().collect();
    let mut out = Vec::with_capacity(lines.len());
    let mut i = 0;
    while i < lines.len() {
        let raw_line = lines[i];
        if is_variables_block_opener(raw_line.trim()) {
            i += 1;
            while i < lines.len() {
                let block_line = lines[i];
                let trimmed = block_line.trim();
                if trimmed == "}" {
                    i += 1;
                    break;
                }
                if !trimmed.is_empty() && !trimmed.starts_with('#') {
                    match split_variable_line(trimmed) {
                        Some((name, value)) => {
                            if vars.contains_key(&name) {
                                log::warn!("{}:{}: variable '{}' redefined, overwriting", file, i + 1, name);
                            }
                            vars.insert(name.clone(), VariableDef::new(name, value, i + 1));
                        }
                        None => {
                            log::warn!("{}:{}: malformed variable declaration, ignoring", file, i + 1);
                        }
                    }
                }
                i += 1;
            }
            continue;
        }
        out.push(raw_line.to_string());
        i += 1;
    }
    out.join("\n")
}

fn is_variables_block_opener(trimmed: &str) -> bool {
    match trimmed.strip_prefix("@variables") {
        Some(rest) => rest.trim_start().starts_with('{'),
        None => false,
    }
}

fn split_variable_line(line: &str) -> Option<(String, String)> {
    let idx = line.find(':')?;
    let name = line[..idx].trim().to_string();
    if !is_valid_identifier(&name) {
        return None;
    }
    let mut value = line[idx + 1..].trim().to_string();
    if let Some(hash) = find_unquoted_hash(&value) {
        value = value[..hash].trim().to_string();
    }
    Some((name, value))
}

fn find_unquoted_hash(s: &str) -> Option<usize> {
    let mut in_quotes = false;
    for (i, c) in s.char_indices() {
        match c {
            '"' => in_quotes = !in_quotes,
            '#' if !in_quotes => return Some(i),
            _ => {}
        }
    }
    None
}

fn var_pattern() -> Regex {
    Regex::new(r"\$([A-Za-z_][A-Za-z0-9_]*)").expect("static pattern")
}

fn resolve_all(file: &str, vars: &mut HashMap<String, VariableDef>) -> Result<()> {
    let names: Vec<String> = vars.keys().cloned().collect();
    for name in names {
        resolve_one(file, &name, vars)?;
    }
    Ok(())
}

/// Resolves one variable's raw value, recursively resolving any `$other`
/// references it contains. A reference to a variable that isn't defined at
/// all is left untouched here — spec.md defers that failure to the final
/// substitution phase, where it's reported against the actual usage site.
fn resolve_one(file: &str, name: &str, vars: &mut HashMap<String, VariableDef>) -> Result<String> {
    {
        let def = vars
            .get(name)
            .ok_or_else(|| CompilerError::internal(format!("resolve_one on undefined variable '{}'", name)))?;
        if def.is_resolved {
            return Ok(def.resolved_value.clone().unwrap_or_default());
        }
        if def.is_resolving {
            return Err(CompilerError::cycle(
                file,
                def.source_line,
                format!("variable cycle involving '{}'", name),
            ));
        }
    }
    vars.get_mut(name).unwrap().is_resolving = true;
    let raw_value = vars.get(name).unwrap().raw_value.clone();

    let pattern = var_pattern();
    let mut resolved = String::new();
    let mut last = 0;
    for caps in pattern.captures_iter(&raw_value) {
        let m = caps.get(0).unwrap();
        resolved.push_str(&raw_value[last..m.start()]);
        let ref_name = &caps[1];
        if vars.contains_key(ref_name) {
            resolved.push_str(&resolve_one(file, ref_name, vars)?);
        } else {
            resolved.push_str(m.as_str());
        }
        last = m.end();
    }
    resolved.push_str(&raw_value[last..]);

    let def = vars.get_mut(name).unwrap();
    def.is_resolving = false;
    def.is_resolved = true;
    def.resolved_value = Some(resolved.clone());
    Ok(resolved)
}

fn substitute(file: &str, buffer: &str, vars: &HashMap<String, VariableDef>) -> Result<String> {
    let define_ranges = compute_define_ranges(buffer);
    let pattern = var_pattern();
    let mut out = String::with_capacity(buffer.len());
    let mut offset = 0usize;
    for (line_idx, line) in buffer.lines().enumerate() {
        let line_num = line_idx + 1;
        let line_start = offset;
        let mut last = 0;
        for caps in pattern.captures_iter(line) {
            let m = caps.get(0).unwrap();
            out.push_str(&line[last..m.start()]);
            let name = &caps[1];
            match vars.get(name) {
                Some(def) => out.push_str(def.resolved_value.as_deref().unwrap_or("")),
                None if in_any_range(line_start + m.start(), &define_ranges) => {
                    // Unresolved within a `Define` block: almost certainly a
                    // component-property placeholder (e.g. `$title`), left
                    // for the element resolver to substitute at usage time.
                    out.push_str(m.as_str());
                }
                None => {
                    return Err(CompilerError::unresolved(
                        file,
                        line_num,
                        format!("undefined variable '${}'", name),
                    ))
                }
            }
            last = m.end();
        }
        out.push_str(&line[last..]);
        out.push('\n');
        offset = line_start + line.len() + 1;
    }
    Ok(out)
}

fn in_any_range(pos: usize, ranges: &[(usize, usize)]) -> bool {
    ranges.iter().any(|(start, end)| pos >= *start && pos < *end)
}

/// Finds the byte ranges of every top-level `Define Name { ... }` block in
/// `buffer`, via a quote-aware, brace-depth-counting scan rather than a full
/// parse — this pass stays textually isolated from the lexical grammar, per
/// its design.
fn compute_define_ranges(buffer: &str) -> Vec<(usize, usize)> {
    let bytes = buffer.as_bytes();
    let mut ranges = Vec::new();
    let mut i = 0;
    let mut in_quotes = false;
    let mut depth: i32 = 0;
    let mut define_start: Option<(usize, i32)> = None;
    while i < bytes.len() {
        let c = bytes[i] as char;
        match c {
            '"' => in_quotes = !in_quotes,
            '{' if !in_quotes => {
                if depth == 0 && define_start.is_none() && is_define_opener(buffer, i) {
                    define_start = Some((i, depth));
                }
                depth += 1;
            }
            '}' if !in_quotes => {
                depth -= 1;
                if let Some((start, base_depth)) = define_start {
                    if depth == base_depth {
                        ranges.push((start, i + 1));
                        define_start = None;
                    }
                }
            }
            _ => {}
        }
        i += 1;
    }
    ranges
}

/// True if the `{` at byte offset `brace_pos` opens a `Define Name { ... }`
/// block, i.e. the text immediately before it (ignoring whitespace) matches
/// `Define <identifier>`.
fn is_define_opener(buffer: &str, brace_pos: usize) -> bool {
    let before = &buffer[..brace_pos];
    let trimmed = before.trim_end();
    let name_end = trimmed.len();
    let name_start = trimmed
        .rfind(|c: char| c.is_whitespace())
        .map(|i| i + 1)
        .unwrap_or(0);
    if name_start >= name_end {
        return false;
    }
    let name = &trimmed[name_start..name_end];
    if !is_valid_identifier(name) {
        return false;
    }
    let rest = trimmed[..name_start].trim_end();
    rest.ends_with("Define")
        && rest[..rest.len() - "Define".len()]
            .chars()
            .next_back()
            .map(|c| !c.is_alphanumeric() && c != '_')
            .unwrap_or(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn substitutes_simple_variable() {
        let src = "@variables {\n  title: \"Hi\"\n}\nApp { window_title: $title }\n";
        let out = process_variables("t", src).unwrap();
        assert!(!out.contains("@variables"));
        assert!(out.contains("window_title: \"Hi\""));
    }

    #[test]
    fn detects_variable_cycle() {
        let src = "@variables {\n  a: $b\n  b: $a\n}\nApp { }\n";
        assert!(process_variables("t", src).is_err());
    }

    #[test]
    fn undefined_variable_fails_at_substitution() {
        let src = "App { window_title: $nope }\n";
        assert!(process_variables("t", src).is_err());
    }

    #[test]
    fn redefinition_overwrites_with_warning() {
        let src = "@variables {\n  a: \"1\"\n  a: \"2\"\n}\nApp { id: $a }\n";
        let out = process_variables("t", src).unwrap();
        assert!(out.contains("id: \"2\""));
    }

    #[test]
    fn undefined_reference_inside_define_block_is_deferred() {
        let src = "Define Card {\n  Properties { title: String = \"untitled\" }\n  Container { text: $title }\n}\nApp { Card { title: \"Hello\" } }\n";
        let out = process_variables("t", src).unwrap();
        assert!(out.contains("text: $title"));
    }

    #[test]
    fn undefined_reference_outside_define_block_still_fails() {
        let src = "App { window_title: $nope }\n";
        assert!(process_variables("t", src).is_err());
    }
}
