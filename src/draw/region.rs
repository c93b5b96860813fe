//! DS9 region strings.
//!
//! Output looks like `image;circle 120 45 10 # color=red`. The frame prefix
//! follows the first source point: world points give `J2000;`, image and
//! screen points give `image;`. Properties equal to the defaults are left out.

use glam::DVec2;

use super::def::{DrawParams, FontSpec};
use super::defaults;
use super::object::Distance;
use crate::convert::CoordConverter;
use crate::types::{Color, CoordSys, Pt};

/// Coordinate frame of a region line
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RegionFrame {
    Image,
    J2000,
}

impl RegionFrame {
    pub fn for_sys(sys: CoordSys) -> Self {
        match sys {
            CoordSys::World => RegionFrame::J2000,
            CoordSys::Image | CoordSys::Screen => RegionFrame::Image,
        }
    }

    pub fn prefix(self) -> &'static str {
        match self {
            RegionFrame::Image => "image;",
            RegionFrame::J2000 => "J2000;",
        }
    }

    /// Position of `pt` in this frame.
    pub fn coords(self, cc: &dyn CoordConverter, pt: &Pt) -> Option<DVec2> {
        match self {
            RegionFrame::Image => cc.to_image(pt),
            RegionFrame::J2000 => cc.to_world(pt),
        }
    }

    /// All points in this frame, or `None` if any fails to convert.
    pub fn all_coords(self, cc: &dyn CoordConverter, pts: &[Pt]) -> Option<Vec<DVec2>> {
        pts.iter().map(|p| self.coords(cc, p)).collect()
    }

    /// A length written in this frame's native unit.
    pub fn distance(self, cc: &dyn CoordConverter, d: Distance) -> Option<String> {
        match self {
            RegionFrame::Image => d.to_image(cc).map(fmt_num),
            RegionFrame::J2000 => d.to_arcsec(cc).map(|v| format!("{}\"", fmt_num(v))),
        }
    }
}

/// Format a number with at most 6 decimals and no trailing zeros.
pub fn fmt_num(v: f64) -> String {
    let s = format!("{:.6}", v);
    let s = s.trim_end_matches('0').trim_end_matches('.');
    if s == "-0" { "0".to_string() } else { s.to_string() }
}

/// Builds one region line
#[derive(Clone, Debug)]
pub struct RegionBuilder {
    line: String,
    props: Vec<String>,
}

impl RegionBuilder {
    pub fn new(frame: RegionFrame, shape: &str) -> Self {
        RegionBuilder {
            line: format!("{}{}", frame.prefix(), shape),
            props: Vec::new(),
        }
    }

    pub fn num(mut self, v: f64) -> Self {
        self.line.push(' ');
        self.line.push_str(&fmt_num(v));
        self
    }

    pub fn pt(self, p: DVec2) -> Self {
        self.num(p.x).num(p.y)
    }

    pub fn pts(self, pts: &[DVec2]) -> Self {
        pts.iter().fold(self, |b, p| b.pt(*p))
    }

    pub fn raw(mut self, value: &str) -> Self {
        self.line.push(' ');
        self.line.push_str(value);
        self
    }

    pub fn prop(mut self, prop: impl Into<String>) -> Self {
        self.props.push(prop.into());
        self
    }

    pub fn color(self, color: &Color) -> Self {
        if *color == Color::named(defaults::COLOR) {
            self
        } else {
            self.prop(format!("color={}", color))
        }
    }

    pub fn width(self, width: f64) -> Self {
        if width == defaults::LINE_WIDTH {
            self
        } else {
            self.prop(format!("width={}", fmt_num(width)))
        }
    }

    pub fn text(self, text: Option<&str>) -> Self {
        match text {
            Some(t) if !t.is_empty() => self.prop(format!("text={{{}}}", t)),
            _ => self,
        }
    }

    pub fn font(self, font: &FontSpec) -> Self {
        if font.is_default() {
            self
        } else {
            self.prop(format!("font=\"{}\"", font))
        }
    }

    /// Color and width from the effective parameters.
    pub fn common(self, params: &DrawParams) -> Self {
        self.color(&params.color).width(params.line_width)
    }

    pub fn build(self) -> String {
        if self.props.is_empty() {
            self.line
        } else {
            format!("{} # {}", self.line, self.props.join(" "))
        }
    }
}

/// Stand-alone text region.
pub fn text_region(
    cc: &dyn CoordConverter,
    pt: &Pt,
    text: &str,
    params: &DrawParams,
) -> Option<String> {
    let frame = RegionFrame::for_sys(pt.sys);
    let at = frame.coords(cc, pt)?;
    Some(
        RegionBuilder::new(frame, "text")
            .pt(at)
            .color(&params.color)
            .text(Some(text))
            .font(&params.font)
            .build(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numbers_trim_zeros() {
        assert_eq!(fmt_num(120.0), "120");
        assert_eq!(fmt_num(10.1), "10.1");
        assert_eq!(fmt_num(-0.0000001), "0");
        assert_eq!(fmt_num(1.23456789), "1.234568");
    }

    #[test]
    fn defaults_are_omitted() {
        let line = RegionBuilder::new(RegionFrame::Image, "point")
            .pt(DVec2::new(1.0, 2.0))
            .color(&Color::named("green"))
            .width(1.0)
            .build();
        assert_eq!(line, "image;point 1 2");
    }

    #[test]
    fn properties_in_order() {
        let line = RegionBuilder::new(RegionFrame::J2000, "polygon")
            .pts(&[DVec2::new(10.1, 20.2), DVec2::new(10.3, 20.4)])
            .color(&Color::named("red"))
            .width(2.0)
            .text(Some("M31"))
            .build();
        assert_eq!(line, "J2000;polygon 10.1 20.2 10.3 20.4 # color=red width=2 text={M31}");
    }
}
