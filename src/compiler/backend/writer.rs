//! Pass 6b: Emission. Writes the header and every section using the
//! offsets and sizes `size_calculator` already computed; never derives an
//! offset from the buffer's current length, per spec.md §9.

use byteorder::{LittleEndian, WriteBytesExt};

use crate::core::constants::{KRB_MAGIC, KRB_VERSION_MAJOR, KRB_VERSION_MINOR};
use crate::core::state::{CompilerState, Element};
use crate::error::{CompilerError, Result};

pub fn write_krb(file: &str, state: &CompilerState) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(state.total_size as usize);

    write_header(&mut out, state)?;
    write_elements(&mut out, file, state)?;
    write_styles(&mut out, state)?;
    write_component_defs(&mut out, state)?;
    // animation section is always empty (spec.md §1 Non-goals).
    write_strings(&mut out, state)?;
    write_resources(&mut out, state)?;

    if out.len() as u32 != state.total_size {
        return Err(CompilerError::internal(format!(
            "emitted {} bytes but pre-computed total size was {}",
            out.len(),
            state.total_size
        )));
    }
    Ok(out)
}

fn write_header(out: &mut Vec<u8>, state: &CompilerState) -> Result<()> {
    let element_count = state.elements.iter().filter(|e| !e.is_template_element).count() as u16;

    out.extend_from_slice(KRB_MAGIC);
    out.write_u16::<LittleEndian>(((KRB_VERSION_MINOR as u16) << 8) | KRB_VERSION_MAJOR as u16)?;
    out.write_u16::<LittleEndian>(state.header_flags)?;
    out.write_u16::<LittleEndian>(element_count)?;
    out.write_u16::<LittleEndian>(state.styles.len() as u16)?;
    out.write_u16::<LittleEndian>(state.component_defs.len() as u16)?;
    out.write_u16::<LittleEndian>(0)?; // animation-count
    out.write_u16::<LittleEndian>(state.strings.len() as u16)?;
    out.write_u16::<LittleEndian>(state.resources.len() as u16)?;
    out.write_u32::<LittleEndian>(state.element_offset)?;
    out.write_u32::<LittleEndian>(state.style_offset)?;
    out.write_u32::<LittleEndian>(state.component_def_offset)?;
    out.write_u32::<LittleEndian>(state.animation_offset)?;
    out.write_u32::<LittleEndian>(state.string_offset)?;
    out.write_u32::<LittleEndian>(state.resource_offset)?;
    out.write_u32::<LittleEndian>(state.total_size)?;
    Ok(())
}

fn write_elements(out: &mut Vec<u8>, file: &str, state: &CompilerState) -> Result<()> {
    if let Some(root) = state.root_element {
        write_element_subtree(out, file, root, state)?;
    }
    Ok(())
}

fn write_element_subtree(out: &mut Vec<u8>, file: &str, idx: usize, state: &CompilerState) -> Result<()> {
    let element = &state.elements[idx];
    let start = out.len();
    write_element_header_and_body(out, element, state)?;

    let written = (out.len() - start) as u32;
    if written != element.calculated_size {
        return Err(CompilerError::internal(format!(
            "element at {}:{} wrote {} bytes, expected {}",
            file, element.source_line, written, element.calculated_size
        )));
    }

    for &child in &element.children {
        write_element_subtree(out, file, child, state)?;
    }
    Ok(())
}

fn write_element_header_and_body(out: &mut Vec<u8>, element: &Element, state: &CompilerState) -> Result<()> {
    out.write_u8(element.element_type.to_byte())?;
    out.write_u8(element.id_string_index)?;
    out.write_u16::<LittleEndian>(element.pos_x)?;
    out.write_u16::<LittleEndian>(element.pos_y)?;
    out.write_u16::<LittleEndian>(element.width)?;
    out.write_u16::<LittleEndian>(element.height)?;
    out.write_u8(element.layout_byte)?;
    out.write_u8(element.style_index)?;
    out.write_u8(element.properties.len() as u8)?;
    out.write_u8(element.children.len() as u8)?;
    out.write_u8(element.events.len() as u8)?;
    out.write_u8(0)?; // animation-count, always 0
    out.write_u8(element.custom_properties.len() as u8)?;

    for p in &element.properties {
        out.write_u8(p.id.to_byte())?;
        out.write_u8(p.value_type.to_byte())?;
        out.write_u8(p.value.len() as u8)?;
        out.extend_from_slice(&p.value);
    }
    for p in &element.custom_properties {
        out.write_u8(p.key_index)?;
        out.write_u8(p.value_type.to_byte())?;
        out.write_u8(p.value.len() as u8)?;
        out.extend_from_slice(&p.value);
    }
    for e in &element.events {
        out.write_u8(e.event_type)?;
        out.write_u8(e.handler_index)?;
    }
    for &child in &element.children {
        let rel = state.elements[child].absolute_offset - element.absolute_offset;
        out.write_u16::<LittleEndian>(rel as u16)?;
    }
    Ok(())
}

fn write_styles(out: &mut Vec<u8>, state: &CompilerState) -> Result<()> {
    for style in &state.styles {
        let start = out.len();
        out.write_u8(style.id)?;
        out.write_u8(style.name_string_index)?;
        out.write_u8(style.properties.len() as u8)?;
        for p in &style.properties {
            out.write_u8(p.id.to_byte())?;
            out.write_u8(p.value_type.to_byte())?;
            out.write_u8(p.value.len() as u8)?;
            out.extend_from_slice(&p.value);
        }
        let written = (out.len() - start) as u32;
        if written != style.calculated_size {
            return Err(CompilerError::internal(format!(
                "style '{}' wrote {} bytes, expected {}",
                style.name, written, style.calculated_size
            )));
        }
    }
    Ok(())
}

fn write_component_defs(out: &mut Vec<u8>, state: &CompilerState) -> Result<()> {
    for (def_idx, def) in state.component_defs.iter().enumerate() {
        let start = out.len();
        let name_index = state
            .strings
            .iter()
            .position(|s| s.value == def.name)
            .map(|i| i as u8)
            .unwrap_or(0);
        out.write_u8(name_index)?;
        out.write_u8(def.encoded_property_defs.len() as u8)?;
        for (prop_name_index, type_hint, default_bytes) in &def.encoded_property_defs {
            out.write_u8(*prop_name_index)?;
            out.write_u8(*type_hint)?;
            out.write_u8(default_bytes.len() as u8)?;
            out.extend_from_slice(default_bytes);
        }

        if let Some(root) = def.template_root {
            write_template_subtree(out, def_idx, root, state)?;
        }

        let written = (out.len() - start) as u32;
        if written != def.calculated_size {
            return Err(CompilerError::internal(format!(
                "component definition '{}' wrote {} bytes, expected {}",
                def.name, written, def.calculated_size
            )));
        }
    }
    Ok(())
}

fn write_template_subtree(out: &mut Vec<u8>, def_idx: usize, idx: usize, state: &CompilerState) -> Result<()> {
    let element = &state.elements[idx];
    let offsets = &state.component_defs[def_idx].template_offsets;
    let own_offset = offsets[&idx];

    out.write_u8(element.element_type.to_byte())?;
    out.write_u8(element.id_string_index)?;
    out.write_u16::<LittleEndian>(element.pos_x)?;
    out.write_u16::<LittleEndian>(element.pos_y)?;
    out.write_u16::<LittleEndian>(element.width)?;
    out.write_u16::<LittleEndian>(element.height)?;
    out.write_u8(element.layout_byte)?;
    out.write_u8(element.style_index)?;
    out.write_u8(element.properties.len() as u8)?;
    out.write_u8(element.children.len() as u8)?;
    out.write_u8(element.events.len() as u8)?;
    out.write_u8(0)?;
    out.write_u8(element.custom_properties.len() as u8)?;

    for p in &element.properties {
        out.write_u8(p.id.to_byte())?;
        out.write_u8(p.value_type.to_byte())?;
        out.write_u8(p.value.len() as u8)?;
        out.extend_from_slice(&p.value);
    }
    for p in &element.custom_properties {
        out.write_u8(p.key_index)?;
        out.write_u8(p.value_type.to_byte())?;
        out.write_u8(p.value.len() as u8)?;
        out.extend_from_slice(&p.value);
    }
    for e in &element.events {
        out.write_u8(e.event_type)?;
        out.write_u8(e.handler_index)?;
    }
    for &child in &element.children {
        let child_offset = offsets[&child];
        let rel = child_offset - own_offset;
        out.write_u16::<LittleEndian>(rel as u16)?;
    }

    for &child in &element.children {
        write_template_subtree(out, def_idx, child, state)?;
    }
    Ok(())
}

fn write_strings(out: &mut Vec<u8>, state: &CompilerState) -> Result<()> {
    out.write_u16::<LittleEndian>(state.strings.len() as u16)?;
    for s in &state.strings {
        out.write_u8(s.value.len() as u8)?;
        out.extend_from_slice(s.value.as_bytes());
    }
    Ok(())
}

fn write_resources(out: &mut Vec<u8>, state: &CompilerState) -> Result<()> {
    out.write_u16::<LittleEndian>(state.resources.len() as u16)?;
    for r in &state.resources {
        out.write_u8(r.resource_type.to_byte())?;
        out.write_u8(r.name_index)?;
        out.write_u8(r.format.to_byte())?;
        out.write_u8(r.data_index)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::backend::size_calculator::calculate_sizes;
    use crate::compiler::frontend::parse_to_state;
    use crate::compiler::middle_end::element_resolver::resolve_elements;
    use crate::compiler::middle_end::style_resolver::resolve_styles;
    use crate::core::constants::{KRB_ELEMENT_HEADER_SIZE, KRB_HEADER_SIZE};

    fn compile(src: &str) -> (Vec<u8>, CompilerState) {
        let mut state = parse_to_state("t", src).unwrap();
        resolve_styles("t", &mut state).unwrap();
        resolve_elements("t", &mut state).unwrap();
        calculate_sizes("t", &mut state).unwrap();
        let bytes = write_krb("t", &state).unwrap();
        (bytes, state)
    }

    #[test]
    fn smallest_valid_program_matches_scenario_1() {
        let (bytes, state) = compile(r#"App { window_title: "Hi" }"#);

        assert_eq!(&bytes[0..4], KRB_MAGIC);
        let version = u16::from_le_bytes([bytes[4], bytes[5]]);
        assert_eq!((version >> 8) & 0xFF, KRB_VERSION_MINOR as u16);
        assert_eq!(version & 0xFF, KRB_VERSION_MAJOR as u16);

        let flags = u16::from_le_bytes([bytes[6], bytes[7]]);
        assert_ne!(flags & crate::core::constants::FLAG_HAS_APP, 0);

        let element_count = u16::from_le_bytes([bytes[8], bytes[9]]);
        assert_eq!(element_count, 1);

        let element_offset = state.element_offset as usize;
        assert_eq!(element_offset, KRB_HEADER_SIZE);
        // type byte: App == 0x00
        assert_eq!(bytes[element_offset], 0x00);
        // property-count is the 9th byte of the 17-byte element header
        let property_count = bytes[element_offset + 8];
        assert_eq!(property_count, 1);

        let prop_id = bytes[element_offset + KRB_ELEMENT_HEADER_SIZE];
        assert_eq!(prop_id, crate::core::properties::PropertyId::WindowTitle.to_byte());
    }

    #[test]
    fn total_size_matches_emitted_byte_length() {
        let (bytes, state) = compile(
            r#"style "s" { background_color: "#FF0000FF" }
               App {
                   style: "s";
                   Container { Text { text: "a" } }
                   Container { Text { text: "b" } }
               }"#,
        );
        assert_eq!(bytes.len() as u32, state.total_size);
    }

    #[test]
    fn child_offsets_are_relative_and_positive() {
        let (bytes, state) = compile(
            r#"App {
                Container { Text { text: "a" } }
                Container { Text { text: "b" } }
            }"#,
        );
        let root = state.root_element.unwrap();
        let root_off = state.elements[root].absolute_offset as usize;
        // child-offset u16 slots follow header + properties + custom-properties + events
        let slot_start = root_off + KRB_ELEMENT_HEADER_SIZE
            + state.elements[root].properties.iter().map(|p| 3 + p.value.len()).sum::<usize>()
            + state.elements[root].custom_properties.iter().map(|p| 3 + p.value.len()).sum::<usize>()
            + 2 * state.elements[root].events.len();

        for (i, &child) in state.elements[root].children.iter().enumerate() {
            let off_bytes = &bytes[slot_start + i * 2..slot_start + i * 2 + 2];
            let rel = u16::from_le_bytes([off_bytes[0], off_bytes[1]]);
            assert_eq!(
                rel as u32,
                state.elements[child].absolute_offset - state.elements[root].absolute_offset
            );
            assert!(rel > 0);
        }
    }
}
