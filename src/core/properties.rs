//! Known KRY property names and their mapping to KRB property IDs.

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PropertyId {
    BackgroundColor,
    ForegroundColor,
    BorderColor,
    BorderWidth,
    BorderRadius,
    FontSize,
    FontWeight,
    TextAlignment,
    Opacity,
    Visibility,
    Padding,
    Margin,
    Width,
    Height,
    MinWidth,
    MinHeight,
    MaxWidth,
    MaxHeight,
    LayoutFlags,
    Image,
    Text,
    Gap,
    ZIndex,
    WindowTitle,
    WindowWidth,
    WindowHeight,
    Resizable,
    Custom(String),
}

impl PropertyId {
    pub fn from_name(name: &str) -> Self {
        match name {
            "background_color" => PropertyId::BackgroundColor,
            "color" | "foreground_color" => PropertyId::ForegroundColor,
            "border_color" => PropertyId::BorderColor,
            "border_width" => PropertyId::BorderWidth,
            "border_radius" => PropertyId::BorderRadius,
            "font_size" => PropertyId::FontSize,
            "font_weight" => PropertyId::FontWeight,
            "text_alignment" => PropertyId::TextAlignment,
            "opacity" => PropertyId::Opacity,
            "visibility" | "visible" => PropertyId::Visibility,
            "padding" => PropertyId::Padding,
            "margin" => PropertyId::Margin,
            "width" => PropertyId::Width,
            "height" => PropertyId::Height,
            "min_width" => PropertyId::MinWidth,
            "min_height" => PropertyId::MinHeight,
            "max_width" => PropertyId::MaxWidth,
            "max_height" => PropertyId::MaxHeight,
            "layout" => PropertyId::LayoutFlags,
            "image" | "src" => PropertyId::Image,
            "text" => PropertyId::Text,
            "gap" => PropertyId::Gap,
            "z_index" => PropertyId::ZIndex,
            "window_title" => PropertyId::WindowTitle,
            "window_width" => PropertyId::WindowWidth,
            "window_height" => PropertyId::WindowHeight,
            "resizable" => PropertyId::Resizable,
            other => PropertyId::Custom(other.to_string()),
        }
    }

    /// KRB property id byte, for non-custom properties.
    pub fn to_byte(&self) -> u8 {
        match self {
            PropertyId::BackgroundColor => 0x01,
            PropertyId::ForegroundColor => 0x02,
            PropertyId::BorderColor => 0x03,
            PropertyId::BorderWidth => 0x04,
            PropertyId::BorderRadius => 0x05,
            PropertyId::FontSize => 0x06,
            PropertyId::FontWeight => 0x07,
            PropertyId::TextAlignment => 0x08,
            PropertyId::Opacity => 0x09,
            PropertyId::Visibility => 0x0A,
            PropertyId::Padding => 0x0B,
            PropertyId::Margin => 0x0C,
            PropertyId::Width => 0x0D,
            PropertyId::Height => 0x0E,
            PropertyId::MinWidth => 0x0F,
            PropertyId::MinHeight => 0x10,
            PropertyId::MaxWidth => 0x11,
            PropertyId::MaxHeight => 0x12,
            PropertyId::LayoutFlags => 0x13,
            PropertyId::Image => 0x14,
            PropertyId::Text => 0x15,
            PropertyId::Gap => 0x16,
            PropertyId::ZIndex => 0x17,
            PropertyId::WindowTitle => 0x18,
            PropertyId::WindowWidth => 0x19,
            PropertyId::WindowHeight => 0x1A,
            PropertyId::Resizable => 0x1B,
            PropertyId::Custom(_) => 0xFF,
        }
    }

    pub fn is_custom(&self) -> bool {
        matches!(self, PropertyId::Custom(_))
    }
}
