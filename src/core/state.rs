//! The compiler's working data model: the mutable state threaded through
//! all six passes, built up by the parser and progressively resolved.

use std::collections::HashMap;

use crate::core::properties::PropertyId;
use crate::core::types::{ElementType, ResourceFormat, ResourceType, ValueType};

#[derive(Debug, Clone)]
pub struct KrbProperty {
    pub id: PropertyId,
    pub value_type: ValueType,
    pub value: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct KrbCustomProperty {
    /// index into the string table for the property's name (e.g. `_componentName`)
    pub key_index: u8,
    pub value_type: ValueType,
    pub value: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct KrbEvent {
    pub event_type: u8,
    /// index into the string table for the handler name
    pub handler_index: u8,
}

/// A `key: value` pair as written in source, before the style/element
/// resolvers convert it to a typed [`KrbProperty`]. Lives in `core` (not
/// `compiler::frontend`) so the data model has no dependency on the AST.
#[derive(Debug, Clone)]
pub struct SourceProperty {
    pub key: String,
    pub value: String,
    pub line: usize,
}

/// One parsed element node, pre- and post-resolution. Children are stored
/// as indices into `CompilerState::elements` rather than nested, so every
/// pass can address any element by a stable index.
#[derive(Debug, Clone)]
pub struct Element {
    pub element_type: ElementType,
    pub custom_type_name: Option<String>,
    pub id_string_index: u8,
    pub pos_x: u16,
    pub pos_y: u16,
    pub width: u16,
    pub height: u16,
    pub style_name: Option<String>,
    pub style_index: u8,
    /// raw `key: value` pairs from source, pre-resolution.
    pub source_properties: Vec<SourceProperty>,
    pub properties: Vec<KrbProperty>,
    pub custom_properties: Vec<KrbCustomProperty>,
    pub events: Vec<KrbEvent>,
    pub children: Vec<usize>,
    pub parent: Option<usize>,
    pub layout_byte: u8,
    /// `true` once an explicit `layout:` source property was applied to
    /// `layout_byte`; lets layout-byte finalization tell "explicit" from
    /// "still at the global default" apart.
    pub layout_explicit: bool,
    pub source_file: String,
    pub source_line: usize,

    /// set only for elements produced by component expansion; the name of
    /// the originating `Define` block, used for the `_componentName`
    /// custom property injected at the expanded root.
    pub component_name: Option<String>,
    /// orientation hint computed during component expansion (e.g. "row",
    /// "column"), consulted by layout-byte finalization step 3.
    pub orientation_hint: Option<String>,
    /// metadata-only per spec.md's open question; never drives reordering.
    pub position_hint: Option<String>,

    /// `true` once this element has been visited by the element-resolver
    /// recursion; guards against cycles, reset at the start of the pass.
    pub processed: bool,
    /// `true` for elements that belong to a component definition's
    /// template tree; these are never emitted in the main UI section.
    pub is_template_element: bool,
    /// set by the parser/semantic pass when this element's type name
    /// matched a known `Define` block; cleared by the element resolver
    /// once the usage has been expanded into its template.
    pub component_usage_name: Option<String>,

    /// computed by the size_calculator pass, consumed by codegen.
    pub absolute_offset: u32,
    pub calculated_size: u32,
}

impl Element {
    pub fn new(element_type: ElementType, source_file: String, source_line: usize) -> Self {
        Element {
            element_type,
            custom_type_name: None,
            id_string_index: 0,
            pos_x: 0,
            pos_y: 0,
            width: 0,
            height: 0,
            style_name: None,
            style_index: 0,
            source_properties: Vec::new(),
            properties: Vec::new(),
            custom_properties: Vec::new(),
            events: Vec::new(),
            children: Vec::new(),
            parent: None,
            layout_byte: 0,
            layout_explicit: false,
            source_file,
            source_line,
            component_name: None,
            orientation_hint: None,
            position_hint: None,
            processed: false,
            is_template_element: false,
            component_usage_name: None,
            absolute_offset: 0,
            calculated_size: 0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct StyleEntry {
    /// 1-based id, assigned in definition order; 0 means "no style".
    pub id: u8,
    pub name: String,
    pub name_string_index: u8,
    pub extends: Vec<String>,
    pub source_properties: Vec<SourceProperty>,
    /// resolved, sorted-by-property-id binary property list; empty until
    /// the style resolver runs.
    pub properties: Vec<KrbProperty>,
    pub source_line: usize,

    /// resolution bookkeeping (cycle detection + memoization)
    pub is_resolved: bool,
    pub is_resolving: bool,

    /// `3 + Σ(3 + value-size)`, filled in by the size & offset pass.
    pub calculated_size: u32,
}

impl StyleEntry {
    pub fn new(id: u8, name: String, source_line: usize) -> Self {
        StyleEntry {
            id,
            name,
            name_string_index: 0,
            extends: Vec::new(),
            source_properties: Vec::new(),
            properties: Vec::new(),
            source_line,
            is_resolved: false,
            is_resolving: false,
            calculated_size: 0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ComponentPropertyDef {
    pub name: String,
    pub property_type: String,
    pub default_value: Option<String>,
    pub source_line: usize,
}

/// A `Define Name { Properties { ... } <template-root> }` block.
#[derive(Debug, Clone, Default)]
pub struct ComponentDefinition {
    pub name: String,
    pub property_defs: Vec<ComponentPropertyDef>,
    /// index into `CompilerState::elements` of the template root, present
    /// once the parser has attached the template tree.
    pub template_root: Option<usize>,
    pub source_line: usize,

    /// total serialized size of this definition's blob (name-index +
    /// prop-def-count + property defs + the serialized template tree),
    /// filled in by the size & offset pass.
    pub calculated_size: u32,
    /// maps a template element's index in `CompilerState::elements` to its
    /// byte offset within this definition's serialized blob (measured from
    /// the start of the blob, i.e. including the property-def header).
    pub template_offsets: HashMap<usize, u32>,
    /// `(name-index, type-hint-byte, default-value-bytes)` per property
    /// def, computed once by the size pass and reused by the writer so
    /// string interning (which mutates `CompilerState::strings`) happens
    /// exactly once.
    pub encoded_property_defs: Vec<(u8, u8, Vec<u8>)>,
}

#[derive(Debug, Clone)]
pub struct VariableDef {
    pub name: String,
    pub raw_value: String,
    pub resolved_value: Option<String>,
    pub source_line: usize,
    pub is_resolved: bool,
    pub is_resolving: bool,
}

impl VariableDef {
    pub fn new(name: String, raw_value: String, source_line: usize) -> Self {
        VariableDef {
            name,
            raw_value,
            resolved_value: None,
            source_line,
            is_resolved: false,
            is_resolving: false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct StringEntry {
    pub value: String,
}

#[derive(Debug, Clone)]
pub struct ResourceEntry {
    pub resource_type: ResourceType,
    pub name_index: u8,
    pub format: ResourceFormat,
    pub data_index: u8,
}

/// The god-object threaded through every pass: built incrementally by the
/// parser, mutated in place by the style/element resolvers, and read by
/// the size calculator and writer. Indices into the vectors below (not
/// pointers) are how elements/styles/strings/resources refer to each
/// other, so the whole structure stays `Clone`-free to pass by `&mut`.
#[derive(Debug, Default)]
pub struct CompilerState {
    pub elements: Vec<Element>,
    pub root_element: Option<usize>,

    pub styles: Vec<StyleEntry>,
    pub component_defs: Vec<ComponentDefinition>,
    pub variables: HashMap<String, VariableDef>,

    pub strings: Vec<StringEntry>,
    string_lookup: HashMap<String, u8>,

    pub resources: Vec<ResourceEntry>,
    resource_lookup: HashMap<(ResourceType, ResourceFormat, u8), u8>,

    pub has_app: bool,

    /// header flags bitset, computed by the writer's size & offset pass
    /// (spec.md §6's flag bits).
    pub header_flags: u16,
    pub element_offset: u32,
    pub style_offset: u32,
    pub component_def_offset: u32,
    pub animation_offset: u32,
    pub string_offset: u32,
    pub resource_offset: u32,
    pub total_size: u32,
}

impl CompilerState {
    pub fn new() -> Self {
        let mut state = CompilerState::default();
        // index 0 is reserved for "no string"
        state.strings.push(StringEntry { value: String::new() });
        state
    }

    /// Interns `value`, returning its 1-byte table index. Deduplicates on
    /// exact string match; index 0 is reserved for the empty string.
    pub fn add_string(&mut self, value: &str) -> crate::error::Result<u8> {
        if value.is_empty() {
            return Ok(0);
        }
        if let Some(&idx) = self.string_lookup.get(value) {
            return Ok(idx);
        }
        if self.strings.len() >= crate::core::constants::MAX_STRINGS {
            return Err(crate::error::CompilerError::limit(
                "strings",
                crate::core::constants::MAX_STRINGS,
                self.strings.len() + 1,
            ));
        }
        if value.len() > crate::core::constants::MAX_STRING_LENGTH {
            return Err(crate::error::CompilerError::value(
                "",
                0,
                format!(
                    "string exceeds max length of {} bytes",
                    crate::core::constants::MAX_STRING_LENGTH
                ),
            ));
        }
        let idx = self.strings.len() as u8;
        self.strings.push(StringEntry { value: value.to_string() });
        self.string_lookup.insert(value.to_string(), idx);
        Ok(idx)
    }

    /// Interns a resource, deduplicating on `(type, format, data_index)` as
    /// spec.md requires (not on name — two different names can point at the
    /// same bytes and collapse to one resource entry).
    pub fn add_resource(
        &mut self,
        resource_type: ResourceType,
        name_index: u8,
        format: ResourceFormat,
        data_index: u8,
    ) -> crate::error::Result<u8> {
        let key = (resource_type, format, data_index);
        if let Some(&idx) = self.resource_lookup.get(&key) {
            return Ok(idx);
        }
        if self.resources.len() >= crate::core::constants::MAX_RESOURCES {
            return Err(crate::error::CompilerError::limit(
                "resources",
                crate::core::constants::MAX_RESOURCES,
                self.resources.len() + 1,
            ));
        }
        let idx = self.resources.len() as u8;
        self.resources.push(ResourceEntry {
            resource_type,
            name_index,
            format,
            data_index,
        });
        self.resource_lookup.insert(key, idx);
        Ok(idx)
    }

    /// Appends a new style, assigning it the next 1-based id in
    /// definition order, enforcing `MAX_STYLES`.
    pub fn add_style(&mut self, mut entry: StyleEntry) -> crate::error::Result<usize> {
        // ids are 1-based bytes (0 means "no style"), so at most 255 fit
        // even if MAX_STYLES itself is 256.
        if self.styles.len() >= crate::core::constants::MAX_STYLES.min(255) {
            return Err(crate::error::CompilerError::limit(
                "styles",
                crate::core::constants::MAX_STYLES,
                self.styles.len() + 1,
            ));
        }
        entry.id = (self.styles.len() + 1) as u8;
        entry.name_string_index = self.add_string(&entry.name.clone())?;
        let idx = self.styles.len();
        self.styles.push(entry);
        Ok(idx)
    }

    pub fn find_style_index(&self, name: &str) -> Option<usize> {
        self.styles.iter().position(|s| s.name == name)
    }

    pub fn find_component_def(&self, name: &str) -> Option<usize> {
        self.component_defs.iter().position(|c| c.name == name)
    }

    /// Appends an element to the flat sequence, returning its index.
    pub fn add_element(&mut self, element: Element) -> crate::error::Result<usize> {
        if self.elements.len() >= crate::core::constants::MAX_ELEMENTS {
            return Err(crate::error::CompilerError::limit(
                "elements",
                crate::core::constants::MAX_ELEMENTS,
                self.elements.len() + 1,
            ));
        }
        let idx = self.elements.len();
        self.elements.push(element);
        Ok(idx)
    }
}
