//! Pass 6a: Size & Offset computation. Walks every structure in emission
//! order, computes its byte size, and assigns it an absolute (main tree) or
//! blob-relative (component templates) offset — all before a single byte of
//! output exists, per spec.md §4.6 and §9's "never compute an offset from
//! the file position during emission" rule.

use std::collections::HashMap;

use crate::core::constants::{
    FLAG_HAS_APP, FLAG_HAS_COMPONENT_DEFS, FLAG_HAS_RESOURCES, FLAG_HAS_STYLES, KRB_ELEMENT_HEADER_SIZE,
    KRB_HEADER_SIZE,
};
use crate::core::state::{CompilerState, Element};
use crate::core::types::{ResourceFormat, ValueType};
use crate::error::{CompilerError, Result};

/// A main-tree parent/child offset must be strictly positive (the child
/// always follows the parent) and fit in 16 bits (spec.md §3's invariant
/// for every parent/child pair, §8's quantified invariant).
const MAX_RELATIVE_OFFSET: u32 = u16::MAX as u32;

pub fn calculate_sizes(file: &str, state: &mut CompilerState) -> Result<()> {
    for resource in &state.resources {
        if resource.format == ResourceFormat::Inline {
            return Err(CompilerError::Unsupported {
                message: "inline resource data is not supported (spec.md's open question on format 1)".to_string(),
            });
        }
    }

    let element_offset = KRB_HEADER_SIZE as u32;
    let element_section_size = if let Some(root) = state.root_element {
        let end = assign_element_offsets(root, element_offset, file, state)?;
        end - element_offset
    } else {
        0
    };

    let style_offset = element_offset + element_section_size;
    let mut style_section_size = 0u32;
    for style in &mut state.styles {
        let size = 3 + style.properties.iter().map(|p| 3 + p.value.len() as u32).sum::<u32>();
        style.calculated_size = size;
        style_section_size += size;
    }

    let component_def_offset = style_offset + style_section_size;
    let mut component_def_section_size = 0u32;
    let component_def_count = state.component_defs.len();
    for def_idx in 0..component_def_count {
        let size = calculate_component_def_size(def_idx, file, state)?;
        state.component_defs[def_idx].calculated_size = size;
        component_def_section_size += size;
    }

    // Animation data is flagged but never encoded (spec.md §1's Non-goals);
    // the section exists in the header layout but is always empty.
    let animation_offset = component_def_offset + component_def_section_size;
    let animation_section_size = 0u32;

    let string_offset = animation_offset + animation_section_size;
    let string_section_size =
        2 + state.strings.iter().map(|s| 1 + s.value.len() as u32).sum::<u32>();

    let resource_offset = string_offset + string_section_size;
    let resource_section_size = 2 + 4 * state.resources.len() as u32;

    let total_size = resource_offset + resource_section_size;

    state.element_offset = element_offset;
    state.style_offset = style_offset;
    state.component_def_offset = component_def_offset;
    state.animation_offset = animation_offset;
    state.string_offset = string_offset;
    state.resource_offset = resource_offset;
    state.total_size = total_size;
    state.header_flags = compute_flags(state);

    Ok(())
}

fn compute_flags(state: &CompilerState) -> u16 {
    let mut flags = 0u16;
    if !state.styles.is_empty() {
        flags |= FLAG_HAS_STYLES;
    }
    if !state.component_defs.is_empty() {
        flags |= FLAG_HAS_COMPONENT_DEFS;
    }
    // FLAG_HAS_ANIMATIONS is never set: animation data is flagged but
    // unencoded (spec.md §1 Non-goals).
    if !state.resources.is_empty() {
        flags |= FLAG_HAS_RESOURCES;
    }
    // FLAG_COMPRESSED is never set: compression is out of scope (spec.md §1).
    if uses_percentage(state) {
        flags |= crate::core::constants::FLAG_FIXED_POINT;
    }
    if uses_color(state) {
        flags |= crate::core::constants::FLAG_EXTENDED_COLOR;
    }
    if state.has_app {
        flags |= FLAG_HAS_APP;
    }
    flags
}

fn uses_percentage(state: &CompilerState) -> bool {
    let in_styles = state.styles.iter().any(|s| s.properties.iter().any(|p| p.value_type == ValueType::Percentage));
    let in_elements = state
        .elements
        .iter()
        .any(|e| e.properties.iter().any(|p| p.value_type == ValueType::Percentage));
    in_styles || in_elements
}

fn uses_color(state: &CompilerState) -> bool {
    let in_styles = state.styles.iter().any(|s| s.properties.iter().any(|p| p.value_type == ValueType::Color));
    let in_elements = state
        .elements
        .iter()
        .any(|e| e.properties.iter().any(|p| p.value_type == ValueType::Color));
    in_styles || in_elements
}

/// An element's own wire size: header plus its properties/custom
/// properties/events/child-pointer slots, per spec.md §4.6's per-element
/// size formula. Does *not* include descendants — those get their own
/// offsets and are written as separate entries right after this one.
pub(crate) fn element_own_size(element: &Element) -> u32 {
    let mut size = KRB_ELEMENT_HEADER_SIZE as u32;
    size += element.properties.iter().map(|p| 3 + p.value.len() as u32).sum::<u32>();
    size += element.custom_properties.iter().map(|p| 3 + p.value.len() as u32).sum::<u32>();
    size += 2 * element.events.len() as u32;
    size += 2 * element.children.len() as u32;
    size
}

/// Assigns absolute offsets to `idx` and its whole subtree via a pre-order
/// (DFS) walk, starting at `offset`. Returns the offset one past the end of
/// the subtree, so the caller can place the next sibling there.
fn assign_element_offsets(idx: usize, offset: u32, file: &str, state: &mut CompilerState) -> Result<u32> {
    state.elements[idx].absolute_offset = offset;
    let own_size = element_own_size(&state.elements[idx]);
    state.elements[idx].calculated_size = own_size;

    let mut cursor = offset + own_size;
    let children = state.elements[idx].children.clone();
    for child in children {
        let child_start = cursor;
        let rel = child_start - offset;
        if rel == 0 || rel > MAX_RELATIVE_OFFSET {
            return Err(CompilerError::internal(format!(
                "child offset {} out of range for element at offset {} in {}",
                rel, offset, file
            )));
        }
        cursor = assign_element_offsets(child, child_start, file, state)?;
    }
    Ok(cursor)
}

fn calculate_component_def_size(def_idx: usize, file: &str, state: &mut CompilerState) -> Result<u32> {
    let property_defs = state.component_defs[def_idx].property_defs.clone();
    let mut header_size = 2u32; // name-index(1) + prop-def-count(1)
    let mut defs_encoded: Vec<(u8, u8, Vec<u8>)> = Vec::with_capacity(property_defs.len());
    for def in &property_defs {
        let (type_hint_byte, default_bytes) = encode_property_def_default(file, def, state)?;
        let name_index = state.add_string(&def.name)?;
        header_size += 3 + default_bytes.len() as u32;
        defs_encoded.push((name_index, type_hint_byte, default_bytes));
    }
    // stash the encoded property-def bytes so the writer doesn't redo this
    // (potentially value-consuming, e.g. string interning) work.
    state.component_defs[def_idx].encoded_property_defs = defs_encoded;

    let template_root = state.component_defs[def_idx].template_root;
    let mut offsets = HashMap::new();
    let template_size = if let Some(root) = template_root {
        let end = assign_template_offsets(root, header_size, file, state, &mut offsets)?;
        end - header_size
    } else {
        0
    };
    state.component_defs[def_idx].template_offsets = offsets;
    Ok(header_size + template_size)
}

fn assign_template_offsets(
    idx: usize,
    offset: u32,
    file: &str,
    state: &mut CompilerState,
    offsets: &mut HashMap<usize, u32>,
) -> Result<u32> {
    offsets.insert(idx, offset);
    state.elements[idx].absolute_offset = offset;
    let own_size = element_own_size(&state.elements[idx]);
    state.elements[idx].calculated_size = own_size;

    let mut cursor = offset + own_size;
    let children = state.elements[idx].children.clone();
    for child in children {
        let child_start = cursor;
        let rel = child_start - offset;
        if rel == 0 || rel > MAX_RELATIVE_OFFSET {
            return Err(CompilerError::internal(format!(
                "template child offset {} out of range in {}",
                rel, file
            )));
        }
        cursor = assign_template_offsets(child, child_start, file, state, offsets)?;
    }
    Ok(cursor)
}

/// Encodes a component property definition's declared type and default
/// value, per spec.md §4.6's `name-index(1) + type-hint(1) + default-size(1)
/// + default-value-bytes` layout.
fn encode_property_def_default(
    file: &str,
    def: &crate::core::state::ComponentPropertyDef,
    state: &mut CompilerState,
) -> Result<(u8, Vec<u8>)> {
    let type_hint_byte = property_type_hint_byte(&def.property_type);
    let bytes = match &def.default_value {
        Some(value) => {
            let (_, bytes) = crate::compiler::middle_end::convert::convert_custom_property_value(
                file,
                def.source_line,
                &def.property_type,
                value,
                state,
            )?;
            if bytes.len() > crate::core::constants::MAX_PROPERTY_VALUE_SIZE {
                return Err(CompilerError::limit(
                    "property_value_size",
                    crate::core::constants::MAX_PROPERTY_VALUE_SIZE,
                    bytes.len(),
                ));
            }
            bytes
        }
        None => Vec::new(),
    };
    Ok((type_hint_byte, bytes))
}

fn property_type_hint_byte(property_type: &str) -> u8 {
    if property_type.starts_with("Enum(") {
        return 7;
    }
    match property_type {
        "String" => 0,
        "Int" => 1,
        "Bool" => 2,
        "Color" => 3,
        "StyleID" => 4,
        "Resource" => 5,
        "Float" => 6,
        _ => 8,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::frontend::parse_to_state;
    use crate::compiler::middle_end::element_resolver::resolve_elements;
    use crate::compiler::middle_end::style_resolver::resolve_styles;
    use crate::core::constants::KRB_HEADER_SIZE;

    fn build(src: &str) -> CompilerState {
        let mut state = parse_to_state("t", src).unwrap();
        resolve_styles("t", &mut state).unwrap();
        resolve_elements("t", &mut state).unwrap();
        state
    }

    #[test]
    fn single_element_offsets_start_after_header() {
        let mut state = build(r#"App { window_title: "Hi" }"#);
        calculate_sizes("t", &mut state).unwrap();

        let root = state.root_element.unwrap();
        assert_eq!(state.elements[root].absolute_offset, KRB_HEADER_SIZE as u32);
        assert_eq!(state.element_offset, KRB_HEADER_SIZE as u32);
        assert_eq!(state.style_offset, state.element_offset + state.elements[root].calculated_size);
    }

    #[test]
    fn siblings_are_offset_by_preceding_subtree_size() {
        let mut state = build(
            r#"App {
                Container { Text { text: "a" } }
                Container { Text { text: "b" } }
            }"#,
        );
        calculate_sizes("t", &mut state).unwrap();

        let root = state.root_element.unwrap();
        let first = state.elements[root].children[0];
        let second = state.elements[root].children[1];

        // first child starts right after the root's own header/property slots.
        assert_eq!(state.elements[first].absolute_offset - state.elements[root].absolute_offset, element_own_size(&state.elements[root]));

        // first child's subtree (its own size plus its Text child) must not overlap the second.
        let first_subtree_size = subtree_size(first, &state);
        assert_eq!(
            state.elements[second].absolute_offset,
            state.elements[first].absolute_offset + first_subtree_size
        );

        // every child strictly follows its parent and fits in 16 bits, per spec.md §3/§8.
        for element in &state.elements {
            if let Some(parent) = element.parent {
                let rel = element.absolute_offset as i64 - state.elements[parent].absolute_offset as i64;
                assert!(rel > 0 && rel <= u16::MAX as i64);
            }
        }
    }

    #[test]
    fn section_boundaries_sum_to_total_size() {
        let mut state = build(
            r#"style "s" { background_color: "#FF0000FF" }
               App { style: "s"; Text { text: "hi" } }"#,
        );
        calculate_sizes("t", &mut state).unwrap();

        assert!(state.style_offset > state.element_offset);
        assert!(state.component_def_offset >= state.style_offset);
        assert!(state.string_offset >= state.component_def_offset);
        assert!(state.resource_offset >= state.string_offset);
        assert!(state.total_size >= state.resource_offset);
    }

    #[test]
    fn header_flags_reflect_state_contents() {
        let mut state = build(
            r#"style "s" { background_color: "#FF0000FF" }
               App { style: "s" }"#,
        );
        calculate_sizes("t", &mut state).unwrap();
        assert_ne!(state.header_flags & crate::core::constants::FLAG_HAS_STYLES, 0);
        assert_ne!(state.header_flags & crate::core::constants::FLAG_HAS_APP, 0);
        assert_ne!(state.header_flags & crate::core::constants::FLAG_EXTENDED_COLOR, 0);
        assert_eq!(state.header_flags & crate::core::constants::FLAG_HAS_COMPONENT_DEFS, 0);
    }

    fn subtree_size(idx: usize, state: &CompilerState) -> u32 {
        let element = &state.elements[idx];
        let mut size = element.calculated_size;
        for &child in &element.children {
            size += subtree_size(child, state);
        }
        size
    }
}
