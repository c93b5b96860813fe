//! Strongly-typed primitives shared by the drawing engine.
//!
//! Points always carry their coordinate kind so a draw object can be placed in
//! sky, image or screen space and converted only through a `CoordConverter`.

use std::fmt;

use glam::DVec2;

/// Error type for invalid numeric values
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumericError {
    /// Value is NaN
    NaN,
    /// Value is infinite
    Infinite,
    /// Value is zero when non-zero required
    Zero,
    /// Value is negative when positive required
    Negative,
}

impl fmt::Display for NumericError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NumericError::NaN => write!(f, "value is NaN"),
            NumericError::Infinite => write!(f, "value is infinite"),
            NumericError::Zero => write!(f, "value is zero"),
            NumericError::Negative => write!(f, "value is negative"),
        }
    }
}

impl std::error::Error for NumericError {}

/// Validate a value that must be finite and strictly positive.
pub fn positive(val: f64) -> Result<f64, NumericError> {
    if val.is_nan() {
        Err(NumericError::NaN)
    } else if val.is_infinite() {
        Err(NumericError::Infinite)
    } else if val == 0.0 {
        Err(NumericError::Zero)
    } else if val < 0.0 {
        Err(NumericError::Negative)
    } else {
        Ok(val)
    }
}

/// Identifier of one viewport ("plot")
pub type PlotId = String;

/// The coordinate space a point lives in
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CoordSys {
    /// Sky coordinates in degrees (J2000 longitude, latitude)
    World,
    /// Image pixel coordinates
    Image,
    /// Device pixels on the drawing surface
    Screen,
}

/// A point tagged with its coordinate space
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Pt {
    pub x: f64,
    pub y: f64,
    pub sys: CoordSys,
}

impl Pt {
    pub const fn new(x: f64, y: f64, sys: CoordSys) -> Self {
        Pt { x, y, sys }
    }

    pub const fn world(lon: f64, lat: f64) -> Self {
        Pt::new(lon, lat, CoordSys::World)
    }

    pub const fn image(x: f64, y: f64) -> Self {
        Pt::new(x, y, CoordSys::Image)
    }

    pub const fn screen(x: f64, y: f64) -> Self {
        Pt::new(x, y, CoordSys::Screen)
    }

    pub fn vec(self) -> DVec2 {
        DVec2::new(self.x, self.y)
    }

    /// Same coordinate space, new position.
    pub fn with_vec(self, v: DVec2) -> Self {
        Pt::new(v.x, v.y, self.sys)
    }
}

impl fmt::Display for Pt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self.sys {
            CoordSys::World => "w",
            CoordSys::Image => "i",
            CoordSys::Screen => "s",
        };
        write!(f, "{}:{:.6},{:.6}", tag, self.x, self.y)
    }
}

/// Width and height of a surface or an image, in pixels
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub struct Dims {
    pub width: u32,
    pub height: u32,
}

impl Dims {
    pub const fn new(width: u32, height: u32) -> Self {
        Dims { width, height }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    pub fn center(&self) -> DVec2 {
        DVec2::new(self.width as f64 / 2.0, self.height as f64 / 2.0)
    }

    /// True when the device point falls on the surface.
    pub fn contains(&self, p: DVec2) -> bool {
        p.x >= 0.0 && p.y >= 0.0 && p.x <= self.width as f64 && p.y <= self.height as f64
    }

    pub fn bbox(&self) -> BBox {
        BBox {
            min: DVec2::ZERO,
            max: DVec2::new(self.width as f64, self.height as f64),
        }
    }
}

/// Axis-aligned bounding box in screen space
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BBox {
    pub min: DVec2,
    pub max: DVec2,
}

impl Default for BBox {
    fn default() -> Self {
        Self::new()
    }
}

impl BBox {
    /// Create an empty bounding box (will expand on first point)
    pub fn new() -> Self {
        BBox {
            min: DVec2::splat(f64::MAX),
            max: DVec2::splat(f64::MIN),
        }
    }

    pub fn from_corners(a: DVec2, b: DVec2) -> Self {
        BBox {
            min: a.min(b),
            max: a.max(b),
        }
    }

    /// Check if the bbox is empty (never expanded)
    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x || self.min.y > self.max.y
    }

    /// Expand to include a point
    pub fn expand_point(&mut self, p: DVec2) {
        self.min = self.min.min(p);
        self.max = self.max.max(p);
    }

    pub fn contains(&self, p: DVec2) -> bool {
        p.x >= self.min.x && p.x <= self.max.x && p.y >= self.min.y && p.y <= self.max.y
    }

    pub fn intersects(&self, other: &BBox) -> bool {
        !(self.is_empty() || other.is_empty())
            && self.min.x <= other.max.x
            && other.min.x <= self.max.x
            && self.min.y <= other.max.y
            && other.min.y <= self.max.y
    }

    pub fn center(&self) -> DVec2 {
        (self.min + self.max) / 2.0
    }

    pub fn size(&self) -> DVec2 {
        if self.is_empty() {
            DVec2::ZERO
        } else {
            self.max - self.min
        }
    }
}

impl FromIterator<DVec2> for BBox {
    fn from_iter<I: IntoIterator<Item = DVec2>>(iter: I) -> Self {
        let mut bbox = BBox::new();
        for p in iter {
            bbox.expand_point(p);
        }
        bbox
    }
}

/// Color as written by producers: a CSS-style name, hex triple or rgba tuple.
#[derive(Clone, Debug, PartialEq)]
pub enum Color {
    Named(String),
    Rgb(u8, u8, u8),
    Rgba(u8, u8, u8, f64),
}

impl Color {
    pub fn named(name: &str) -> Self {
        Color::Named(name.to_ascii_lowercase())
    }

    /// Parse `#rgb`, `#rrggbb`, `rgb(r,g,b)`, `rgba(r,g,b,a)` or a color name.
    pub fn parse(s: &str) -> Self {
        let s = s.trim();
        if let Some(hex) = s.strip_prefix('#') {
            if let Some(c) = parse_hex(hex) {
                return c;
            }
        }
        let lower = s.to_ascii_lowercase();
        if let Some(body) = lower.strip_prefix("rgba(").and_then(|b| b.strip_suffix(')')) {
            let parts: Vec<&str> = body.split(',').map(str::trim).collect();
            if let [r, g, b, a] = parts.as_slice() {
                if let (Ok(r), Ok(g), Ok(b), Ok(a)) =
                    (r.parse(), g.parse(), b.parse(), a.parse::<f64>())
                {
                    return Color::Rgba(r, g, b, a.clamp(0.0, 1.0));
                }
            }
        }
        if let Some(body) = lower.strip_prefix("rgb(").and_then(|b| b.strip_suffix(')')) {
            let parts: Vec<&str> = body.split(',').map(str::trim).collect();
            if let [r, g, b] = parts.as_slice() {
                if let (Ok(r), Ok(g), Ok(b)) = (r.parse(), g.parse(), b.parse()) {
                    return Color::Rgb(r, g, b);
                }
            }
        }
        Color::Named(lower)
    }

    /// RGB components, when known.
    pub fn rgb(&self) -> Option<(u8, u8, u8)> {
        match self {
            Color::Rgb(r, g, b) | Color::Rgba(r, g, b, _) => Some((*r, *g, *b)),
            Color::Named(name) => named_rgb(name),
        }
    }

    /// The same color with the given opacity. Unknown names are returned unchanged.
    pub fn with_alpha(&self, alpha: f64) -> Color {
        match self.rgb() {
            Some((r, g, b)) => Color::Rgba(r, g, b, alpha.clamp(0.0, 1.0)),
            None => self.clone(),
        }
    }
}

impl From<&str> for Color {
    fn from(s: &str) -> Self {
        Color::parse(s)
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Color::Named(s) => write!(f, "{}", s),
            Color::Rgb(r, g, b) => write!(f, "#{:02x}{:02x}{:02x}", r, g, b),
            Color::Rgba(r, g, b, a) => write!(f, "rgba({},{},{},{})", r, g, b, a),
        }
    }
}

fn parse_hex(hex: &str) -> Option<Color> {
    let digit = |c: char| c.to_digit(16).map(|d| d as u8);
    let chars: Vec<char> = hex.chars().collect();
    match chars.len() {
        3 => {
            let r = digit(chars[0])?;
            let g = digit(chars[1])?;
            let b = digit(chars[2])?;
            Some(Color::Rgb(r * 17, g * 17, b * 17))
        }
        6 => {
            let byte = |i: usize| Some(digit(chars[i])? * 16 + digit(chars[i + 1])?);
            Some(Color::Rgb(byte(0)?, byte(2)?, byte(4)?))
        }
        _ => None,
    }
}

fn named_rgb(name: &str) -> Option<(u8, u8, u8)> {
    let rgb = match name {
        "black" => (0, 0, 0),
        "white" => (255, 255, 255),
        "red" => (255, 0, 0),
        "green" => (0, 128, 0),
        "lime" => (0, 255, 0),
        "blue" => (0, 0, 255),
        "cyan" => (0, 255, 255),
        "magenta" => (255, 0, 255),
        "yellow" => (255, 255, 0),
        "orange" => (255, 165, 0),
        "purple" => (128, 0, 128),
        "pink" => (255, 192, 203),
        "gray" | "grey" => (128, 128, 128),
        _ => return None,
    };
    Some(rgb)
}
