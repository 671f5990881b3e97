//! Core enums shared by every compiler pass.

/// Element tag as written in KRY source, and its wire-format type byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementType {
    App,
    Container,
    Text,
    Image,
    Button,
    Input,
    Checkbox,
    Slider,
    List,
    Grid,
    Scrollable,
    Video,
    Canvas,
    Custom(u8),
}

impl ElementType {
    pub fn from_name(name: &str) -> Self {
        match name {
            "App" => ElementType::App,
            "Container" => ElementType::Container,
            "Text" => ElementType::Text,
            "Image" => ElementType::Image,
            "Button" => ElementType::Button,
            "Input" => ElementType::Input,
            "Checkbox" => ElementType::Checkbox,
            "Slider" => ElementType::Slider,
            "List" => ElementType::List,
            "Grid" => ElementType::Grid,
            "Scrollable" => ElementType::Scrollable,
            "Video" => ElementType::Video,
            "Canvas" => ElementType::Canvas,
            _ => ElementType::Custom(0x00),
        }
    }

    pub fn to_byte(self) -> u8 {
        match self {
            ElementType::App => 0x00,
            ElementType::Container => 0x01,
            ElementType::Text => 0x02,
            ElementType::Image => 0x03,
            ElementType::Button => 0x04,
            ElementType::Input => 0x05,
            ElementType::Checkbox => 0x06,
            ElementType::Slider => 0x07,
            ElementType::List => 0x08,
            ElementType::Grid => 0x09,
            ElementType::Scrollable => 0x0A,
            ElementType::Video => 0x0B,
            ElementType::Canvas => 0x0C,
            ElementType::Custom(b) => b,
        }
    }
}

/// Wire-format tag for a property's value bytes (spec.md §6).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueType {
    None,
    Byte,
    Short,
    Color,
    String,
    Resource,
    Percentage,
    Rect,
    EdgeInsets,
    Enum,
    Vector,
    Custom,
}

impl ValueType {
    pub fn to_byte(self) -> u8 {
        match self {
            ValueType::None => 0,
            ValueType::Byte => 1,
            ValueType::Short => 2,
            ValueType::Color => 3,
            ValueType::String => 4,
            ValueType::Resource => 5,
            ValueType::Percentage => 6,
            ValueType::Rect => 7,
            ValueType::EdgeInsets => 8,
            ValueType::Enum => 9,
            ValueType::Vector => 10,
            ValueType::Custom => 11,
        }
    }
}

/// Resource kind, matching spec.md's resource table entry (type,name,format,data).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceType {
    Image,
    Font,
    Sound,
    Video,
    Custom(u8),
}

impl ResourceType {
    pub fn from_name(name: &str) -> Self {
        match name {
            "image" => ResourceType::Image,
            "font" => ResourceType::Font,
            "sound" => ResourceType::Sound,
            "video" => ResourceType::Video,
            _ => ResourceType::Custom(0xFF),
        }
    }

    pub fn to_byte(self) -> u8 {
        match self {
            ResourceType::Image => 0x01,
            ResourceType::Font => 0x02,
            ResourceType::Sound => 0x03,
            ResourceType::Video => 0x04,
            ResourceType::Custom(b) => b,
        }
    }
}

/// Resource storage format. Only `External` is implemented; `Inline` is
/// recognized so a source author gets `Unsupported` rather than a parse
/// error, but no inline bytes are ever written into the resource table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceFormat {
    External,
    Inline,
}

impl ResourceFormat {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "external" => Some(ResourceFormat::External),
            "inline" => Some(ResourceFormat::Inline),
            _ => None,
        }
    }

    pub fn to_byte(self) -> u8 {
        match self {
            ResourceFormat::External => 0x00,
            ResourceFormat::Inline => 0x01,
        }
    }
}
