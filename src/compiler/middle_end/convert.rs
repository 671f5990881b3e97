//! Shared `key: value` → binary-property conversion, used by both the
//! style resolver (pass 4) and the element resolver (pass 5) so the two
//! passes can't silently diverge on what a given property name means.

use crate::core::constants::{
    LAYOUT_ABSOLUTE_BIT, LAYOUT_ALIGNMENT_CENTER, LAYOUT_ALIGNMENT_END, LAYOUT_ALIGNMENT_SPACE_BETWEEN,
    LAYOUT_ALIGNMENT_START, LAYOUT_DIRECTION_COLUMN, LAYOUT_DIRECTION_COLUMN_REV, LAYOUT_DIRECTION_ROW,
    LAYOUT_DIRECTION_ROW_REV, LAYOUT_GROW_BIT, LAYOUT_WRAP_BIT,
};
use crate::core::properties::PropertyId;
use crate::core::state::{CompilerState, KrbProperty, SourceProperty};
use crate::core::types::{ResourceFormat, ResourceType, ValueType};
use crate::core::util::{clean_and_quote_value, parse_color, parse_edge_insets};
use crate::error::{CompilerError, Result};

/// Converts one recognized property id's source value into its binary
/// form. Returns `Ok(None)` for a `Custom` id — the caller decides whether
/// that's a declared component property or simply unhandled.
pub fn convert_standard_property(
    file: &str,
    line: usize,
    property_id: &PropertyId,
    value: &str,
    state: &mut CompilerState,
) -> Result<Option<KrbProperty>> {
    let v = value.trim();
    let prop = |value_type: ValueType, bytes: Vec<u8>| -> Option<KrbProperty> {
        Some(KrbProperty {
            id: property_id.clone(),
            value_type,
            value: bytes,
        })
    };

    let result = match property_id {
        PropertyId::BackgroundColor | PropertyId::ForegroundColor | PropertyId::BorderColor => {
            let c = parse_color(file, line, v)?;
            prop(ValueType::Color, vec![c.r, c.g, c.b, c.a])
        }
        PropertyId::BorderWidth | PropertyId::BorderRadius | PropertyId::Gap => {
            prop(ValueType::Byte, vec![parse_byte(file, line, v)?])
        }
        PropertyId::FontSize | PropertyId::ZIndex | PropertyId::WindowWidth | PropertyId::WindowHeight => {
            prop(ValueType::Short, parse_short(file, line, v)?.to_le_bytes().to_vec())
        }
        PropertyId::FontWeight => {
            let byte = match v {
                "light" => 0,
                "normal" => 1,
                "bold" => 2,
                other => parse_byte(file, line, other)?,
            };
            prop(ValueType::Enum, vec![byte])
        }
        PropertyId::TextAlignment => {
            let byte = match v {
                "left" | "start" => 0,
                "center" => 1,
                "right" | "end" => 2,
                "justify" => 3,
                other => {
                    return Err(CompilerError::value(
                        file,
                        line,
                        format!("invalid text_alignment '{other}'"),
                    ))
                }
            };
            prop(ValueType::Enum, vec![byte])
        }
        PropertyId::Opacity => {
            let f: f32 = v
                .parse()
                .map_err(|_| CompilerError::value(file, line, format!("invalid opacity '{v}'")))?;
            prop(ValueType::Percentage, encode_percentage(f).to_le_bytes().to_vec())
        }
        PropertyId::Visibility => {
            let visible = parse_bool_like(v)
                .ok_or_else(|| CompilerError::value(file, line, format!("invalid boolean '{v}'")))?;
            prop(ValueType::Byte, vec![visible as u8])
        }
        PropertyId::Resizable => {
            let b = parse_bool_like(v)
                .ok_or_else(|| CompilerError::value(file, line, format!("invalid boolean '{v}'")))?;
            prop(ValueType::Byte, vec![b as u8])
        }
        PropertyId::Padding | PropertyId::Margin => {
            let (top, right, bottom, left) = parse_edge_insets(file, line, v)?;
            prop(
                ValueType::EdgeInsets,
                vec![
                    clamp_to_byte(top),
                    clamp_to_byte(right),
                    clamp_to_byte(bottom),
                    clamp_to_byte(left),
                ],
            )
        }
        PropertyId::Width
        | PropertyId::Height
        | PropertyId::MinWidth
        | PropertyId::MinHeight
        | PropertyId::MaxWidth
        | PropertyId::MaxHeight => {
            prop(ValueType::Short, parse_short(file, line, v)?.to_le_bytes().to_vec())
        }
        PropertyId::Image => {
            let (path, _) = clean_and_quote_value(v);
            let name_index = state.add_string(&path)?;
            let data_index = state.add_string(&path)?;
            let resource_index =
                state.add_resource(ResourceType::Image, name_index, ResourceFormat::External, data_index)?;
            prop(ValueType::Resource, vec![resource_index])
        }
        PropertyId::Text | PropertyId::WindowTitle => {
            let (text, _) = clean_and_quote_value(v);
            let idx = state.add_string(&text)?;
            prop(ValueType::String, vec![idx])
        }
        PropertyId::LayoutFlags => {
            prop(ValueType::Byte, vec![parse_layout_string(file, line, v)?])
        }
        PropertyId::Custom(_) => None,
    };
    Ok(result)
}

fn parse_byte(file: &str, line: usize, v: &str) -> Result<u8> {
    v.trim_end_matches("px")
        .parse::<f32>()
        .map(|f| f.round().clamp(0.0, 255.0) as u8)
        .map_err(|_| CompilerError::value(file, line, format!("invalid numeric value '{v}'")))
}

pub(crate) fn parse_short(file: &str, line: usize, v: &str) -> Result<u16> {
    v.trim_end_matches("px")
        .parse::<f32>()
        .map(|f| f.round().clamp(0.0, u16::MAX as f32) as u16)
        .map_err(|_| CompilerError::value(file, line, format!("invalid numeric value '{v}'")))
}

fn clamp_to_byte(f: f32) -> u8 {
    f.round().clamp(0.0, 255.0) as u8
}

/// 8.8 fixed-point encoding: accepts either a bare fraction (`0.5`) or a
/// percentage (`50%`), both meaning the same thing.
pub fn encode_percentage(value: f32) -> u16 {
    let fraction = if value > 1.0 { value / 100.0 } else { value };
    (fraction.clamp(0.0, 255.0) * 256.0).round() as u16
}

pub fn parse_bool_like(v: &str) -> Option<bool> {
    match v.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "visible" => Some(true),
        "false" | "0" | "hidden" => Some(false),
        _ => None,
    }
}

/// Parses a space-separated layout keyword string into the single layout
/// byte spec.md §6 defines. Unrecognized tokens warn and are skipped.
pub fn parse_layout_string(file: &str, line: usize, value: &str) -> Result<u8> {
    let mut byte = 0u8;
    for token in value.split_whitespace() {
        match token {
            "row" => byte = (byte & !0x03) | LAYOUT_DIRECTION_ROW,
            "column" | "col" => byte = (byte & !0x03) | LAYOUT_DIRECTION_COLUMN,
            "row_rev" => byte = (byte & !0x03) | LAYOUT_DIRECTION_ROW_REV,
            "col_rev" | "column_rev" => byte = (byte & !0x03) | LAYOUT_DIRECTION_COLUMN_REV,
            "start" => byte = (byte & !0x0C) | LAYOUT_ALIGNMENT_START,
            "center" => byte = (byte & !0x0C) | LAYOUT_ALIGNMENT_CENTER,
            "end" => byte = (byte & !0x0C) | LAYOUT_ALIGNMENT_END,
            "space_between" => byte = (byte & !0x0C) | LAYOUT_ALIGNMENT_SPACE_BETWEEN,
            "wrap" => byte |= LAYOUT_WRAP_BIT,
            "grow" => byte |= LAYOUT_GROW_BIT,
            "absolute" => byte |= crate::core::constants::LAYOUT_ABSOLUTE_BIT,
            other => log::warn!("{}:{}: unrecognized layout keyword '{}'", file, line, other),
        }
    }
    Ok(byte)
}

pub fn event_type_from_key(key: &str) -> Option<u8> {
    use crate::core::constants::*;
    let normalized = key.trim_start_matches("on_").trim_start_matches("on");
    let normalized = normalized.trim_start_matches('_').to_ascii_lowercase();
    match normalized.as_str() {
        "click" => Some(EVENT_TYPE_CLICK),
        "press" => Some(EVENT_TYPE_PRESS),
        "release" => Some(EVENT_TYPE_RELEASE),
        "hover" => Some(EVENT_TYPE_HOVER),
        "focus" => Some(EVENT_TYPE_FOCUS),
        "blur" => Some(EVENT_TYPE_BLUR),
        "change" => Some(EVENT_TYPE_CHANGE),
        "submit" => Some(EVENT_TYPE_SUBMIT),
        _ => None,
    }
}

/// The four shorthand/long-form keys that fold into one `padding`/`margin`
/// `EdgeInsets` property; callers skip these during the generic per-key
/// conversion loop and call [`extract_edge_insets`] once up front instead.
pub fn edge_inset_keys(prefix: &str) -> [String; 5] {
    [
        prefix.to_string(),
        format!("{prefix}_top"),
        format!("{prefix}_right"),
        format!("{prefix}_bottom"),
        format!("{prefix}_left"),
    ]
}

/// Combines a `padding`/`margin` shorthand value (1, 2, or 4 tokens) with any
/// long-form `{prefix}_{side}` overrides into a single `EdgeInsets`
/// property, per spec.md §4.5's padding-shorthand rule: long-form keys win,
/// logged at info level when both forms are present for the same side.
pub fn extract_edge_insets(
    file: &str,
    properties: &[SourceProperty],
    prefix: &str,
    property_id: PropertyId,
) -> Result<Option<KrbProperty>> {
    let shorthand = properties.iter().find(|p| p.key == prefix);
    let mut sides = shorthand
        .map(|p| parse_edge_insets(file, p.line, &p.value))
        .transpose()?;

    let side_names = ["top", "right", "bottom", "left"];
    let mut have_long_form = false;
    for (i, side) in side_names.iter().enumerate() {
        let key = format!("{prefix}_{side}");
        if let Some(p) = properties.iter().find(|sp| sp.key == key) {
            have_long_form = true;
            let v = parse_byte_f32(file, p.line, &p.value)?;
            let (t, r, b, l) = sides.unwrap_or((0.0, 0.0, 0.0, 0.0));
            let mut arr = [t, r, b, l];
            if shorthand.is_some() {
                log::info!(
                    "{}:{}: '{}' overrides the '{}' shorthand for the {} side",
                    file,
                    p.line,
                    key,
                    prefix,
                    side
                );
            }
            arr[i] = v;
            sides = Some((arr[0], arr[1], arr[2], arr[3]));
        }
    }

    if shorthand.is_none() && !have_long_form {
        return Ok(None);
    }
    let (top, right, bottom, left) = sides.unwrap_or((0.0, 0.0, 0.0, 0.0));
    Ok(Some(KrbProperty {
        id: property_id,
        value_type: ValueType::EdgeInsets,
        value: vec![
            clamp_to_byte(top),
            clamp_to_byte(right),
            clamp_to_byte(bottom),
            clamp_to_byte(left),
        ],
    }))
}

fn parse_byte_f32(file: &str, line: usize, v: &str) -> Result<f32> {
    v.trim()
        .trim_end_matches("px")
        .parse::<f32>()
        .map_err(|_| CompilerError::value(file, line, format!("invalid edge inset token '{v}'")))
}

/// Converts a component-declared custom property (from a `Define`'s
/// `Properties` block) per its type hint, per spec.md §4.5's "Custom
/// properties" rule. An unrecognized type hint falls back to `String` with
/// a warning, matching the parser's "Custom hint with a warning" rule for
/// unknown `Properties` block types.
pub fn convert_custom_property_value(
    file: &str,
    line: usize,
    type_hint: &str,
    value: &str,
    state: &mut CompilerState,
) -> Result<(ValueType, Vec<u8>)> {
    let v = value.trim();
    if let Some(rest) = type_hint.strip_prefix("Enum(") {
        let variants: Vec<&str> = rest.trim_end_matches(')').split(',').map(|s| s.trim()).collect();
        let (clean, _) = clean_and_quote_value(v);
        let idx = variants
            .iter()
            .position(|variant| variant.eq_ignore_ascii_case(&clean))
            .unwrap_or_else(|| {
                log::warn!(
                    "{}:{}: value '{}' is not one of the declared enum variants {:?}",
                    file,
                    line,
                    clean,
                    variants
                );
                0
            });
        return Ok((ValueType::Enum, vec![idx as u8]));
    }

    match type_hint {
        "String" => {
            let (clean, _) = clean_and_quote_value(v);
            let idx = state.add_string(&clean)?;
            Ok((ValueType::String, vec![idx]))
        }
        "Int" => Ok((ValueType::Short, parse_short(file, line, v)?.to_le_bytes().to_vec())),
        "Float" => {
            let f: f32 = v
                .parse()
                .map_err(|_| CompilerError::value(file, line, format!("invalid float '{v}'")))?;
            Ok((ValueType::Percentage, encode_percentage(f).to_le_bytes().to_vec()))
        }
        "Bool" => {
            let b = parse_bool_like(v)
                .ok_or_else(|| CompilerError::value(file, line, format!("invalid boolean '{v}'")))?;
            Ok((ValueType::Byte, vec![b as u8]))
        }
        "Color" => {
            let c = parse_color(file, line, v)?;
            Ok((ValueType::Color, vec![c.r, c.g, c.b, c.a]))
        }
        "StyleID" => {
            let (clean, _) = clean_and_quote_value(v);
            let id = state.find_style_index(&clean).map(|i| state.styles[i].id).unwrap_or_else(|| {
                log::warn!("{}:{}: style '{}' not found, using style id 0", file, line, clean);
                0
            });
            Ok((ValueType::Byte, vec![id]))
        }
        "Resource" => {
            let (path, _) = clean_and_quote_value(v);
            let name_index = state.add_string(&path)?;
            let data_index = state.add_string(&path)?;
            let resource_index =
                state.add_resource(ResourceType::Custom(0xFF), name_index, ResourceFormat::External, data_index)?;
            Ok((ValueType::Resource, vec![resource_index]))
        }
        other => {
            log::warn!(
                "{}:{}: unknown component property type '{}', treating as String",
                file,
                line,
                other
            );
            let (clean, _) = clean_and_quote_value(v);
            let idx = state.add_string(&clean)?;
            Ok((ValueType::String, vec![idx]))
        }
    }
}

/// First direction keyword (`row`/`column`/`row_rev`/`col_rev`) found in a
/// `layout:` value string, used to derive a component's orientation hint
/// when no explicit `orientation` property was given (spec.md §4.5 step 4).
pub fn first_direction_token(value: &str) -> Option<String> {
    value
        .split_whitespace()
        .find(|t| matches!(*t, "row" | "column" | "col" | "row_rev" | "col_rev" | "column_rev"))
        .map(|t| t.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_string_combines_direction_alignment_and_flags() {
        let byte = parse_layout_string("t", 1, "row center grow").unwrap();
        assert_eq!(byte & 0x03, LAYOUT_DIRECTION_ROW);
        assert_eq!(byte & 0x0C, LAYOUT_ALIGNMENT_CENTER);
        assert_eq!(byte & LAYOUT_GROW_BIT, LAYOUT_GROW_BIT);
        assert_eq!(byte & LAYOUT_ABSOLUTE_BIT, 0);
    }

    #[test]
    fn percentage_accepts_fraction_and_percent_form() {
        assert_eq!(encode_percentage(0.5), 128);
        assert_eq!(encode_percentage(50.0), 128);
        assert_eq!(encode_percentage(1.0), 256);
    }

    #[test]
    fn event_keys_normalize_camel_and_snake_case() {
        assert_eq!(event_type_from_key("onClick"), Some(crate::core::constants::EVENT_TYPE_CLICK));
        assert_eq!(event_type_from_key("on_click"), Some(crate::core::constants::EVENT_TYPE_CLICK));
        assert_eq!(event_type_from_key("on_submit"), Some(crate::core::constants::EVENT_TYPE_SUBMIT));
        assert_eq!(event_type_from_key("background_color"), None);
    }

    #[test]
    fn bool_like_accepts_visible_hidden_and_numeric() {
        assert_eq!(parse_bool_like("visible"), Some(true));
        assert_eq!(parse_bool_like("hidden"), Some(false));
        assert_eq!(parse_bool_like("1"), Some(true));
        assert_eq!(parse_bool_like("maybe"), None);
    }
}
