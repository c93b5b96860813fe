//! Drawing definitions.
//!
//! A [`DrawingDef`] is the per-layer style record. It is never mutated: the
//! `with_*` methods return a new value, and [`DrawParams::resolve`] composes it
//! with one object's overrides to get the parameters actually used.

use std::fmt;

use glam::DVec2;

use super::defaults;
use super::object::DrawObject;
use crate::types::Color;

/// Point marker glyph
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum Symbol {
    #[default]
    X,
    Square,
    Cross,
    Diamond,
    Dot,
    Circle,
    SquareX,
    EmpCross,
    EmpSquareX,
    BoxCircle,
    Arrow,
}

impl Symbol {
    /// DS9 `point=` name
    pub fn region_name(self) -> &'static str {
        match self {
            Symbol::X | Symbol::SquareX | Symbol::EmpSquareX => "x",
            Symbol::Square => "box",
            Symbol::Cross | Symbol::EmpCross => "cross",
            Symbol::Diamond => "diamond",
            Symbol::Dot | Symbol::Circle => "circle",
            Symbol::BoxCircle => "boxcircle",
            Symbol::Arrow => "arrow",
        }
    }

    /// Two-color glyphs stroke twice and cannot join a shared path.
    pub fn batches(self) -> bool {
        !matches!(self, Symbol::EmpCross | Symbol::EmpSquareX)
    }

    /// Half-extent of the glyph for a nominal symbol size.
    pub fn drawing_size(self, size: f64) -> f64 {
        match self {
            Symbol::EmpCross => size + 2.0,
            Symbol::Dot => (size / 2.0).max(1.0),
            _ => size,
        }
    }
}

/// How outlines are rendered
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum Style {
    #[default]
    Standard,
    /// Closed outlines are filled with the stroke color
    Fill,
    /// Vertices get small square handles
    Handled,
}

/// Label placement relative to the object
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum TextLocation {
    #[default]
    Default,
    North,
    South,
    East,
    West,
    Center,
}

impl TextLocation {
    /// Screen-space direction of the label from the object center (y down).
    pub fn direction(self) -> DVec2 {
        match self {
            TextLocation::Default => DVec2::new(1.0, -1.0),
            TextLocation::North => DVec2::new(0.0, -1.0),
            TextLocation::South => DVec2::new(0.0, 1.0),
            TextLocation::East => DVec2::new(1.0, 0.0),
            TextLocation::West => DVec2::new(-1.0, 0.0),
            TextLocation::Center => DVec2::ZERO,
        }
    }
}

/// Font used for labels
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct FontSpec {
    pub name: String,
    pub size: String,
    pub weight: String,
    pub style: String,
}

impl Default for FontSpec {
    fn default() -> Self {
        FontSpec {
            name: defaults::FONT_NAME.to_string(),
            size: defaults::FONT_SIZE.to_string(),
            weight: defaults::FONT_WEIGHT.to_string(),
            style: defaults::FONT_STYLE.to_string(),
        }
    }
}

impl FontSpec {
    /// Font size in pixels, parsed from strings like `9px` or `12pt`.
    pub fn size_px(&self) -> f64 {
        let digits: String = self
            .size
            .chars()
            .take_while(|c| c.is_ascii_digit() || *c == '.')
            .collect();
        digits.parse().unwrap_or(9.0)
    }

    pub fn is_default(&self) -> bool {
        *self == FontSpec::default()
    }
}

impl fmt::Display for FontSpec {
    /// DS9 form: `helvetica 9 normal roman`
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let slant = if self.style == "italic" { "italic" } else { "roman" };
        write!(f, "{} {} {} {}", self.name, self.size_px(), self.weight, slant)
    }
}

/// Immutable per-layer style record
#[derive(Clone, Debug, PartialEq)]
pub struct DrawingDef {
    pub color: Color,
    pub selected_color: Color,
    pub highlight_color: Color,
    pub symbol: Symbol,
    pub size: f64,
    pub line_width: f64,
    pub style: Style,
    pub text_loc: TextLocation,
    pub font: FontSpec,
}

impl Default for DrawingDef {
    fn default() -> Self {
        DrawingDef {
            color: Color::named(defaults::COLOR),
            selected_color: Color::named(defaults::SELECTED_COLOR),
            highlight_color: Color::named(defaults::HIGHLIGHT_COLOR),
            symbol: Symbol::default(),
            size: defaults::SYMBOL_SIZE,
            line_width: defaults::LINE_WIDTH,
            style: Style::default(),
            text_loc: TextLocation::default(),
            font: FontSpec::default(),
        }
    }
}

impl DrawingDef {
    pub fn new(color: impl Into<Color>) -> Self {
        DrawingDef {
            color: color.into(),
            ..Default::default()
        }
    }

    pub fn with_color(self, color: impl Into<Color>) -> Self {
        DrawingDef {
            color: color.into(),
            ..self
        }
    }

    pub fn with_symbol(self, symbol: Symbol) -> Self {
        DrawingDef { symbol, ..self }
    }

    pub fn with_size(self, size: f64) -> Self {
        DrawingDef { size, ..self }
    }

    pub fn with_line_width(self, line_width: f64) -> Self {
        DrawingDef { line_width, ..self }
    }

    pub fn with_style(self, style: Style) -> Self {
        DrawingDef { style, ..self }
    }

    pub fn with_text_loc(self, text_loc: TextLocation) -> Self {
        DrawingDef { text_loc, ..self }
    }

    pub fn with_font(self, font: FontSpec) -> Self {
        DrawingDef { font, ..self }
    }
}

/// Effective parameters for drawing one object
#[derive(Clone, Debug, PartialEq)]
pub struct DrawParams {
    pub color: Color,
    pub line_width: f64,
    pub style: Style,
    pub symbol: Symbol,
    pub size: f64,
    pub text_loc: TextLocation,
    pub font: FontSpec,
}

impl DrawParams {
    /// Object overrides win over the layer definition.
    pub fn resolve(def: &DrawingDef, obj: &DrawObject) -> Self {
        DrawParams {
            color: obj.color.clone().unwrap_or_else(|| def.color.clone()),
            line_width: obj.line_width.unwrap_or(def.line_width),
            style: obj.style.unwrap_or(def.style),
            symbol: obj.symbol().unwrap_or(def.symbol),
            size: obj.symbol_size().unwrap_or(def.size),
            text_loc: obj.text_loc.unwrap_or(def.text_loc),
            font: obj.font.clone().unwrap_or_else(|| def.font.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::draw::object::DrawObject;
    use crate::types::Pt;

    #[test]
    fn object_overrides_win() {
        let def = DrawingDef::new("red").with_line_width(2.0);
        let obj = DrawObject::point(Pt::image(1.0, 1.0)).with_color("cyan");
        let p = DrawParams::resolve(&def, &obj);
        assert_eq!(p.color, Color::named("cyan"));
        assert_eq!(p.line_width, 2.0);
        assert_eq!(p.symbol, Symbol::X);
    }

    #[test]
    fn with_methods_leave_original_untouched() {
        let def = DrawingDef::default();
        let red = def.clone().with_color("red");
        assert_eq!(def.color, Color::named("green"));
        assert_eq!(red.color, Color::named("red"));
        assert_eq!(red.line_width, def.line_width);
    }

    #[test]
    fn font_region_form() {
        assert_eq!(FontSpec::default().to_string(), "helvetica 9 normal roman");
        let italic = FontSpec {
            size: "12pt".into(),
            style: "italic".into(),
            ..Default::default()
        };
        assert_eq!(italic.to_string(), "helvetica 12 normal italic");
        assert!(!italic.is_default());
    }
}
