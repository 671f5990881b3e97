//! Lowers the parser's untyped [`AstFile`] into a [`CompilerState`],
//! enforcing the root rules spec.md assigns to this stage: at most one
//! main-tree root, and if present it must be `App` or a component usage.

use super::ast::{AstFile, ElementNode, TopLevelNode};
use crate::core::constants::MAX_COMPONENT_DEFS;
use crate::core::state::{
    CompilerState, ComponentDefinition, ComponentPropertyDef, Element, SourceProperty, StyleEntry,
};
use crate::core::types::ElementType;
use crate::error::{CompilerError, Result};

pub fn build_state(file: &str, ast: AstFile) -> Result<CompilerState> {
    let mut state = CompilerState::new();
    let mut root: Option<usize> = None;

    for node in ast.nodes {
        match node {
            TopLevelNode::Style(s) => {
                if state.find_style_index(&s.name).is_some() {
                    return Err(CompilerError::semantic(
                        file,
                        s.line,
                        format!("style '{}' is already defined", s.name),
                    ));
                }
                let mut entry = StyleEntry::new(0, s.name.clone(), s.line);
                entry.extends = s.extends;
                entry.source_properties = s
                    .properties
                    .iter()
                    .filter(|p| p.key != "extends")
                    .map(|p| SourceProperty {
                        key: p.key.clone(),
                        value: p.value.clone(),
                        line: p.line,
                    })
                    .collect();
                state.add_style(entry)?;
            }
            TopLevelNode::Component(c) => {
                if state.find_component_def(&c.name).is_some() {
                    return Err(CompilerError::semantic(
                        file,
                        c.line,
                        format!("component '{}' is already defined", c.name),
                    ));
                }
                if state.component_defs.len() >= MAX_COMPONENT_DEFS {
                    return Err(CompilerError::limit(
                        "component_defs",
                        MAX_COMPONENT_DEFS,
                        state.component_defs.len() + 1,
                    ));
                }
                state.add_string(&c.name)?;
                let property_defs = c
                    .property_defs
                    .iter()
                    .map(|p| {
                        state.add_string(&p.name)?;
                        Ok(ComponentPropertyDef {
                            name: p.name.clone(),
                            property_type: p.property_type.clone(),
                            default_value: p.default_value.clone(),
                            source_line: p.line,
                        })
                    })
                    .collect::<Result<Vec<_>>>()?;
                let template_root = lower_element(&c.template, file, &mut state, true)?;
                state.component_defs.push(ComponentDefinition {
                    name: c.name,
                    property_defs,
                    template_root: Some(template_root),
                    source_line: c.line,
                    ..Default::default()
                });
            }
            TopLevelNode::Element(e) => {
                if root.is_some() {
                    return Err(CompilerError::semantic(
                        file,
                        e.line,
                        "a KRY file may have at most one main-tree root".to_string(),
                    ));
                }
                let is_component_usage = state.find_component_def(&e.type_name).is_some();
                if e.type_name != "App" && !is_component_usage {
                    return Err(CompilerError::semantic(
                        file,
                        e.line,
                        format!(
                            "root element must be 'App' or a component usage, found '{}'",
                            e.type_name
                        ),
                    ));
                }
                state.has_app = e.type_name == "App";
                root = Some(lower_element(&e, file, &mut state, false)?);
            }
        }
    }

    state.root_element = root;
    Ok(state)
}

/// Converts one parsed element node (and its children) into flat `Element`
/// entries. `is_template` marks every element in a `Define` block's tree so
/// the element resolver and writer never treat them as main-tree elements.
fn lower_element(
    node: &ElementNode,
    file: &str,
    state: &mut CompilerState,
    is_template: bool,
) -> Result<usize> {
    let component_usage = state.find_component_def(&node.type_name).map(|_| node.type_name.clone());
    let (element_type, custom_type_name) = if component_usage.is_some() {
        // fixed up by the element resolver once the usage is expanded
        (ElementType::Custom(0x00), None)
    } else {
        let et = ElementType::from_name(&node.type_name);
        match et {
            ElementType::Custom(_) => {
                log::warn!(
                    "{}:{}: unknown element type '{}', treating as custom",
                    file,
                    node.line,
                    node.type_name
                );
                (et, Some(node.type_name.clone()))
            }
            _ => (et, None),
        }
    };

    let mut element = Element::new(element_type, file.to_string(), node.line);
    element.custom_type_name = custom_type_name;
    element.component_usage_name = component_usage;
    element.is_template_element = is_template;
    element.source_properties = node
        .properties
        .iter()
        .map(|p| SourceProperty {
            key: p.key.clone(),
            value: p.value.clone(),
            line: p.line,
        })
        .collect();

    let idx = state.add_element(element)?;
    for child in &node.children {
        let child_idx = lower_element(child, file, state, is_template)?;
        state.elements[child_idx].parent = Some(idx);
        state.elements[idx].children.push(child_idx);
    }
    Ok(idx)
}
