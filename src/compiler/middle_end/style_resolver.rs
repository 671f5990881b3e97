//! Pass 4: Style Resolver. Resolves `extends` inheritance into a flat,
//! canonically-sorted property list per style, iteratively so that a style
//! whose base isn't resolved yet is simply retried on a later sweep.

use crate::compiler::middle_end::convert::{convert_standard_property, edge_inset_keys, extract_edge_insets};
use crate::core::properties::PropertyId;
use crate::core::state::{CompilerState, KrbProperty};
use crate::error::{CompilerError, Result};

pub fn resolve_styles(file: &str, state: &mut CompilerState) -> Result<()> {
    for s in &mut state.styles {
        s.is_resolved = false;
        s.is_resolving = false;
    }

    let total = state.styles.len();
    let mut remaining = total;
    let mut iterations = 0usize;
    // worst case every style forms a chain through every other style
    let max_iterations = total.saturating_add(1);

    while remaining > 0 {
        if iterations > max_iterations {
            let stuck = state
                .styles
                .iter()
                .find(|s| !s.is_resolved)
                .map(|s| s.name.clone())
                .unwrap_or_default();
            return Err(CompilerError::cycle(
                file,
                0,
                format!("unresolvable style inheritance involving '{}'", stuck),
            ));
        }
        iterations += 1;

        let mut made_progress = false;
        for idx in 0..state.styles.len() {
            if state.styles[idx].is_resolved {
                continue;
            }
            match try_resolve(file, idx, state)? {
                true => {
                    remaining -= 1;
                    made_progress = true;
                }
                false => {}
            }
        }
        if !made_progress && remaining > 0 {
            let stuck = state
                .styles
                .iter()
                .find(|s| !s.is_resolved)
                .map(|s| s.name.clone())
                .unwrap_or_default();
            return Err(CompilerError::cycle(
                file,
                0,
                format!("unresolvable style inheritance involving '{}'", stuck),
            ));
        }
    }
    Ok(())
}

/// Attempts to resolve one style. Returns `Ok(true)` if it became resolved
/// this call, `Ok(false)` if a base isn't resolved yet (retry later).
fn try_resolve(file: &str, idx: usize, state: &mut CompilerState) -> Result<bool> {
    let extends = state.styles[idx].extends.clone();
    let mut base_indices = Vec::with_capacity(extends.len());
    for base_name in &extends {
        let base_idx = state.find_style_index(base_name).ok_or_else(|| {
            CompilerError::unresolved(
                file,
                state.styles[idx].source_line,
                format!("style '{}' extends undefined style '{}'", state.styles[idx].name, base_name),
            )
        })?;
        if base_idx == idx {
            return Err(CompilerError::cycle(
                file,
                state.styles[idx].source_line,
                format!("style '{}' extends itself", state.styles[idx].name),
            ));
        }
        if state.styles[base_idx].is_resolving {
            return Err(CompilerError::cycle(
                file,
                state.styles[idx].source_line,
                format!("cycle detected resolving style '{}'", state.styles[idx].name),
            ));
        }
        if !state.styles[base_idx].is_resolved {
            return Ok(false);
        }
        base_indices.push(base_idx);
    }

    state.styles[idx].is_resolving = true;

    let mut merged: Vec<KrbProperty> = Vec::new();
    for base_idx in base_indices {
        merge_in(&mut merged, &state.styles[base_idx].properties);
    }

    let source_properties = state.styles[idx].source_properties.clone();
    let own_line = state.styles[idx].source_line;
    let style_name = state.styles[idx].name.clone();
    let mut own: Vec<KrbProperty> = Vec::new();

    let padding_keys = edge_inset_keys("padding");
    let margin_keys = edge_inset_keys("margin");
    if let Some(p) = extract_edge_insets(file, &source_properties, "padding", PropertyId::Padding)? {
        own.push(p);
    }
    if let Some(p) = extract_edge_insets(file, &source_properties, "margin", PropertyId::Margin)? {
        own.push(p);
    }

    for sp in &source_properties {
        if padding_keys.contains(&sp.key) || margin_keys.contains(&sp.key) {
            continue;
        }
        let property_id = PropertyId::from_name(&sp.key);
        if property_id.is_custom() {
            log::warn!(
                "{}:{}: unrecognized style property '{}' on style '{}', ignoring",
                file,
                sp.line,
                sp.key,
                style_name
            );
            continue;
        }
        match convert_standard_property(file, sp.line, &property_id, &sp.value, state)? {
            Some(p) => own.push(p),
            None => log::warn!(
                "{}:{}: property '{}' could not be converted on style '{}', ignoring",
                file,
                sp.line,
                sp.key,
                style_name
            ),
        }
    }
    merge_in(&mut merged, &own);
    merged.sort_by_key(|p| p.id.to_byte());

    let entry = &mut state.styles[idx];
    entry.properties = merged;
    entry.is_resolving = false;
    entry.is_resolved = true;
    let _ = own_line;
    Ok(true)
}

/// Overrides `base` entries with `overrides` ones sharing the same
/// property id, appending any override that had no counterpart.
fn merge_in(base: &mut Vec<KrbProperty>, overrides: &[KrbProperty]) {
    for o in overrides {
        match base.iter().position(|p| p.id == o.id) {
            Some(i) => base[i] = o.clone(),
            None => base.push(o.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::state::StyleEntry;

    fn make_style(state: &mut CompilerState, name: &str, extends: Vec<&str>, props: Vec<(&str, &str)>) {
        let mut entry = StyleEntry::new(0, name.to_string(), 1);
        entry.extends = extends.into_iter().map(String::from).collect();
        entry.source_properties = props
            .into_iter()
            .map(|(k, v)| crate::core::state::SourceProperty {
                key: k.to_string(),
                value: v.to_string(),
                line: 1,
            })
            .collect();
        state.add_style(entry).unwrap();
    }

    #[test]
    fn single_base_inheritance_overrides_by_property_id() {
        let mut state = CompilerState::new();
        make_style(&mut state, "base", vec![], vec![("background_color", "#FF0000FF"), ("gap", "4")]);
        make_style(&mut state, "child", vec!["base"], vec![("gap", "8")]);
        resolve_styles("t", &mut state).unwrap();
        let child = &state.styles[1];
        assert_eq!(child.properties.len(), 2);
        let gap = child.properties.iter().find(|p| p.id == PropertyId::Gap).unwrap();
        assert_eq!(gap.value, vec![8]);
    }

    #[test]
    fn self_cycle_is_an_error() {
        let mut state = CompilerState::new();
        make_style(&mut state, "a", vec!["a"], vec![]);
        assert!(resolve_styles("t", &mut state).is_err());
    }

    #[test]
    fn mutual_cycle_is_an_error() {
        let mut state = CompilerState::new();
        make_style(&mut state, "a", vec!["b"], vec![]);
        make_style(&mut state, "b", vec!["a"], vec![]);
        assert!(resolve_styles("t", &mut state).is_err());
    }

    #[test]
    fn properties_are_sorted_by_id() {
        let mut state = CompilerState::new();
        make_style(&mut state, "s", vec![], vec![("gap", "1"), ("background_color", "#000000FF")]);
        resolve_styles("t", &mut state).unwrap();
        let props = &state.styles[0].properties;
        assert!(props[0].id.to_byte() < props[1].id.to_byte());
    }
}
