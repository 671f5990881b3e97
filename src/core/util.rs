//! Small value-parsing helpers shared across passes.

use crate::error::{CompilerError, Result};

/// `true` if `name` is a valid KRY identifier: starts with a letter or
/// underscore, followed by letters, digits, or underscores.
pub fn is_valid_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Color { r, g, b, a }
    }
}

/// Parses `#RGB`, `#RGBA`, `#RRGGBB`, `#RRGGBBAA`, or the keyword
/// `transparent`. Anything else is a `ValueError`.
pub fn parse_color(file: &str, line: usize, value: &str) -> Result<Color> {
    let v = value.trim();
    if v.eq_ignore_ascii_case("transparent") {
        return Ok(Color::rgba(0, 0, 0, 0));
    }
    let hex = match v.strip_prefix('#') {
        Some(h) => h,
        None => {
            return Err(CompilerError::value(
                file,
                line,
                format!("invalid color '{value}': expected #RGB, #RGBA, #RRGGBB, #RRGGBBAA, or transparent"),
            ))
        }
    };

    let expand = |c: char| -> Result<u8> {
        let s: String = [c, c].iter().collect();
        u8::from_str_radix(&s, 16)
            .map_err(|_| CompilerError::value(file, line, format!("invalid color '{value}'")))
    };
    let pair = |s: &str| -> Result<u8> {
        u8::from_str_radix(s, 16)
            .map_err(|_| CompilerError::value(file, line, format!("invalid color '{value}'")))
    };

    match hex.len() {
        3 => {
            let mut cs = hex.chars();
            let r = expand(cs.next().unwrap())?;
            let g = expand(cs.next().unwrap())?;
            let b = expand(cs.next().unwrap())?;
            Ok(Color::rgba(r, g, b, 255))
        }
        4 => {
            let mut cs = hex.chars();
            let r = expand(cs.next().unwrap())?;
            let g = expand(cs.next().unwrap())?;
            let b = expand(cs.next().unwrap())?;
            let a = expand(cs.next().unwrap())?;
            Ok(Color::rgba(r, g, b, a))
        }
        6 => {
            let r = pair(&hex[0..2])?;
            let g = pair(&hex[2..4])?;
            let b = pair(&hex[4..6])?;
            Ok(Color::rgba(r, g, b, 255))
        }
        8 => {
            let r = pair(&hex[0..2])?;
            let g = pair(&hex[2..4])?;
            let b = pair(&hex[4..6])?;
            let a = pair(&hex[6..8])?;
            Ok(Color::rgba(r, g, b, a))
        }
        _ => Err(CompilerError::value(
            file,
            line,
            format!("invalid color '{value}': wrong digit count"),
        )),
    }
}

/// Strips a surrounding pair of matching quotes, if present, and reports
/// whether the value was quoted (quoted strings are never reinterpreted
/// as keywords/numbers by later passes).
pub fn clean_and_quote_value(raw: &str) -> (String, bool) {
    let t = raw.trim();
    if t.len() >= 2 {
        let bytes = t.as_bytes();
        if (bytes[0] == b'"' && bytes[t.len() - 1] == b'"')
            || (bytes[0] == b'\'' && bytes[t.len() - 1] == b'\'')
        {
            return (t[1..t.len() - 1].to_string(), true);
        }
    }
    (t.to_string(), false)
}

/// Splits a `;`-delimited edge-inset value (`padding`/`margin`) into 1, 2,
/// or 4 numeric tokens per the CSS-shorthand convention:
/// 1 -> all sides, 2 -> (vertical, horizontal), 4 -> (top, right, bottom, left).
pub fn parse_edge_insets(file: &str, line: usize, value: &str) -> Result<(f32, f32, f32, f32)> {
    let tokens: Vec<&str> = value.split_whitespace().collect();
    let parse = |s: &str| -> Result<f32> {
        s.trim_end_matches("px")
            .parse::<f32>()
            .map_err(|_| CompilerError::value(file, line, format!("invalid edge inset token '{s}'")))
    };
    match tokens.len() {
        1 => {
            let v = parse(tokens[0])?;
            Ok((v, v, v, v))
        }
        2 => {
            let v = parse(tokens[0])?;
            let h = parse(tokens[1])?;
            Ok((v, h, v, h))
        }
        4 => {
            let top = parse(tokens[0])?;
            let right = parse(tokens[1])?;
            let bottom = parse(tokens[2])?;
            let left = parse(tokens[3])?;
            Ok((top, right, bottom, left))
        }
        n => Err(CompilerError::value(
            file,
            line,
            format!("edge inset value must have 1, 2, or 4 tokens, got {n}"),
        )),
    }
}

/// Splits a single-line `key: value;` run into individual `key: value`
/// statements, respecting quoted strings (a `;` inside quotes does not split).
pub fn split_properties_by_semicolon(line: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut quote_char = ' ';
    for c in line.chars() {
        match c {
            '"' | '\'' if !in_quotes => {
                in_quotes = true;
                quote_char = c;
                current.push(c);
            }
            c2 if in_quotes && c2 == quote_char => {
                in_quotes = false;
                current.push(c2);
            }
            ';' if !in_quotes => {
                if !current.trim().is_empty() {
                    out.push(current.trim().to_string());
                }
                current.clear();
            }
            c => current.push(c),
        }
    }
    if !current.trim().is_empty() {
        out.push(current.trim().to_string());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identifier_validation() {
        assert!(is_valid_identifier("foo_bar"));
        assert!(is_valid_identifier("_private"));
        assert!(!is_valid_identifier("1foo"));
        assert!(!is_valid_identifier("foo-bar"));
        assert!(!is_valid_identifier(""));
    }

    #[test]
    fn color_parsing_all_forms() {
        assert_eq!(parse_color("t", 1, "#fff").unwrap(), Color::rgba(255, 255, 255, 255));
        assert_eq!(parse_color("t", 1, "#f00a").unwrap(), Color::rgba(255, 0, 0, 170));
        assert_eq!(parse_color("t", 1, "#112233").unwrap(), Color::rgba(0x11, 0x22, 0x33, 255));
        assert_eq!(
            parse_color("t", 1, "#11223344").unwrap(),
            Color::rgba(0x11, 0x22, 0x33, 0x44)
        );
        assert_eq!(parse_color("t", 1, "transparent").unwrap(), Color::rgba(0, 0, 0, 0));
        assert!(parse_color("t", 1, "#12").is_err());
        assert!(parse_color("t", 1, "blue").is_err());
    }

    #[test]
    fn edge_insets_boundary_counts() {
        assert_eq!(parse_edge_insets("t", 1, "10").unwrap(), (10.0, 10.0, 10.0, 10.0));
        assert_eq!(parse_edge_insets("t", 1, "10 20").unwrap(), (10.0, 20.0, 10.0, 20.0));
        assert_eq!(
            parse_edge_insets("t", 1, "1 2 3 4").unwrap(),
            (1.0, 2.0, 3.0, 4.0)
        );
        assert!(parse_edge_insets("t", 1, "1 2 3").is_err());
    }

    #[test]
    fn semicolon_split_respects_quotes() {
        let parts = split_properties_by_semicolon(r#"text: "a; b"; width: 10"#);
        assert_eq!(parts, vec![r#"text: "a; b""#, "width: 10"]);
    }

    #[test]
    fn quote_stripping_reports_was_quoted() {
        assert_eq!(clean_and_quote_value("\"hi\""), ("hi".to_string(), true));
        assert_eq!(clean_and_quote_value("42"), ("42".to_string(), false));
    }
}
