//! Style attribute vocabulary shared between the host control and the text
//! formatter.

use crate::color::Color;

/// Font weight for text rendering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FontWeight {
    Thin,        // 100
    ExtraLight,  // 200
    Light,       // 300
    Normal,      // 400 (default)
    Medium,      // 500
    SemiBold,    // 600
    Bold,        // 700
    ExtraBold,   // 800
    Black,       // 900
    Custom(u16), // Exact weight for variable fonts
}

impl FontWeight {
    pub fn to_weight(self) -> u16 {
        match self {
            FontWeight::Thin => 100,
            FontWeight::ExtraLight => 200,
            FontWeight::Light => 300,
            FontWeight::Normal => 400,
            FontWeight::Medium => 500,
            FontWeight::SemiBold => 600,
            FontWeight::Bold => 700,
            FontWeight::ExtraBold => 800,
            FontWeight::Black => 900,
            FontWeight::Custom(w) => w.clamp(100, 900),
        }
    }
}

impl Default for FontWeight {
    fn default() -> Self {
        Self::Normal
    }
}

/// Font style (normal, italic or oblique)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FontStyle {
    #[default]
    Normal,
    Italic,
    Oblique,
}

/// Paragraph text alignment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TextAlign {
    /// Aligned to the leading (left, in LTR scripts) edge
    #[default]
    Leading,
    /// Aligned to the trailing edge
    Trailing,
    Center,
    Justified,
}

/// Text wrapping mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Wrap {
    /// No wrapping, text overflows
    None,
    /// Wrap at word boundaries
    Word,
    /// Wrap at character boundaries
    Glyph,
    /// Try word boundaries, fall back to character wrap
    WordOrGlyph,
}

impl Default for Wrap {
    fn default() -> Self {
        Self::None
    }
}

/// A style-affecting attribute change, delivered by the host framework.
///
/// This is the explicit observer entry point replacing property-path
/// binding: the host observes whatever property system it has and forwards
/// the new value here. Variants carry the value so the control never reads
/// host state back.
#[derive(Debug, Clone, PartialEq)]
pub enum StyleAttribute {
    Text(String),
    FontFamily(String),
    FontSize(f64),
    FontWeight(FontWeight),
    FontStyle(FontStyle),
    Alignment(TextAlign),
    Wrap(Wrap),
    Foreground(Color),
    ShadowColor(Color),
    ShadowOffset(f64),
}

impl StyleAttribute {
    /// Whether this attribute can change the control's measured size, and
    /// therefore needs a layout pass in addition to a re-render.
    pub fn affects_measure(&self) -> bool {
        match self {
            StyleAttribute::Text(_)
            | StyleAttribute::FontFamily(_)
            | StyleAttribute::FontSize(_)
            | StyleAttribute::FontWeight(_)
            | StyleAttribute::FontStyle(_)
            | StyleAttribute::Alignment(_)
            | StyleAttribute::Wrap(_)
            | StyleAttribute::ShadowOffset(_) => true,
            StyleAttribute::Foreground(_) | StyleAttribute::ShadowColor(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_weight_values() {
        assert_eq!(FontWeight::Normal.to_weight(), 400);
        assert_eq!(FontWeight::Bold.to_weight(), 700);
        assert_eq!(FontWeight::Custom(50).to_weight(), 100);
        assert_eq!(FontWeight::Custom(950).to_weight(), 900);
    }

    #[test]
    fn test_color_only_attributes_skip_measure() {
        assert!(!StyleAttribute::Foreground(Color::rgb(1.0, 1.0, 1.0)).affects_measure());
        assert!(!StyleAttribute::ShadowColor(Color::rgb(0.0, 0.0, 0.0)).affects_measure());
        assert!(StyleAttribute::ShadowOffset(4.0).affects_measure());
        assert!(StyleAttribute::Text("x".into()).affects_measure());
    }
}
