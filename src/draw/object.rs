//! The draw object model.
//!
//! A [`DrawObject`] is a [`DrawKind`] payload plus optional style overrides.
//! Producers build them, the drawer consumes them read-only, and nobody
//! mutates one after it lands in a frame's draw list.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use enum_dispatch::enum_dispatch;
use glam::DVec2;

use super::def::{FontSpec, Style, Symbol, TextLocation};
use super::ops::DrawOp;
use crate::convert::CoordConverter;
use crate::surface::Shadow;
use crate::types::{Color, Pt};

// ============================================================================
// Type tags
// ============================================================================

pub const POINT_TAG: &str = "point";
pub const SHAPE_TAG: &str = "shape";
pub const FOOTPRINT_TAG: &str = "footprint";
pub const SELECT_BOX_TAG: &str = "select-box";
pub const DIRECTION_ARROW_TAG: &str = "direction-arrow";
pub const MARKER_TAG: &str = "marker";
pub const MOC_TILE_TAG: &str = "moc-tile";
pub const IMAGE_LINE_TAG: &str = "image-line-footprint";

// ============================================================================
// Distances
// ============================================================================

/// Unit of a radius, width or height
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum Unit {
    #[default]
    ScreenPixel,
    ImagePixel,
    Arcsec,
}

/// A length with its unit
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Distance {
    pub value: f64,
    pub unit: Unit,
}

impl Distance {
    pub const fn screen(value: f64) -> Self {
        Distance {
            value,
            unit: Unit::ScreenPixel,
        }
    }

    pub const fn image(value: f64) -> Self {
        Distance {
            value,
            unit: Unit::ImagePixel,
        }
    }

    pub const fn arcsec(value: f64) -> Self {
        Distance {
            value,
            unit: Unit::Arcsec,
        }
    }

    pub fn to_screen(self, cc: &dyn CoordConverter) -> Option<f64> {
        match self.unit {
            Unit::ScreenPixel => Some(self.value),
            Unit::ImagePixel => Some(self.value * cc.zoom_factor()),
            Unit::Arcsec => cc.arcsec_per_screen_pixel().map(|s| self.value / s),
        }
    }

    pub fn to_image(self, cc: &dyn CoordConverter) -> Option<f64> {
        self.to_screen(cc).map(|s| s / cc.zoom_factor())
    }

    pub fn to_arcsec(self, cc: &dyn CoordConverter) -> Option<f64> {
        match self.unit {
            Unit::Arcsec => Some(self.value),
            _ => Some(self.to_screen(cc)? * cc.arcsec_per_screen_pixel()?),
        }
    }

    pub fn scaled(self, factor: f64) -> Self {
        Distance {
            value: self.value * factor,
            ..self
        }
    }
}

// ============================================================================
// Geometry
// ============================================================================

/// Anchor-point access shared by every payload
#[enum_dispatch]
pub trait Geometry {
    /// Registry key for this payload
    fn type_tag(&self) -> &str;
    /// Every anchor point, in declaration order
    fn points(&self) -> Vec<Pt>;
    /// Rewrite every anchor point in place
    fn map_points(&mut self, f: &mut dyn FnMut(Pt) -> Pt);
}

/// A single marker at one position
#[derive(Clone, Debug, PartialEq)]
pub struct PointData {
    pub pt: Pt,
    pub symbol: Option<Symbol>,
    pub size: Option<f64>,
}

impl Geometry for PointData {
    fn type_tag(&self) -> &str {
        POINT_TAG
    }

    fn points(&self) -> Vec<Pt> {
        vec![self.pt]
    }

    fn map_points(&mut self, f: &mut dyn FnMut(Pt) -> Pt) {
        self.pt = f(self.pt);
    }
}

/// Primitive shape kinds
#[derive(Clone, Debug, PartialEq)]
pub enum ShapeKind {
    Line { from: Pt, to: Pt },
    Circle { center: Pt, radius: Distance },
    Rectangle { center: Pt, width: Distance, height: Distance, angle: f64 },
    Ellipse { center: Pt, r1: Distance, r2: Distance, angle: f64 },
    Polygon { pts: Vec<Pt> },
    Text { pt: Pt },
    Annulus { center: Pt, radii: Vec<Distance> },
}

#[derive(Clone, Debug, PartialEq)]
pub struct ShapeData {
    pub shape: ShapeKind,
}

impl Geometry for ShapeData {
    fn type_tag(&self) -> &str {
        SHAPE_TAG
    }

    fn points(&self) -> Vec<Pt> {
        match &self.shape {
            ShapeKind::Line { from, to } => vec![*from, *to],
            ShapeKind::Polygon { pts } => pts.clone(),
            ShapeKind::Circle { center, .. }
            | ShapeKind::Rectangle { center, .. }
            | ShapeKind::Ellipse { center, .. }
            | ShapeKind::Annulus { center, .. } => vec![*center],
            ShapeKind::Text { pt } => vec![*pt],
        }
    }

    fn map_points(&mut self, f: &mut dyn FnMut(Pt) -> Pt) {
        match &mut self.shape {
            ShapeKind::Line { from, to } => {
                *from = f(*from);
                *to = f(*to);
            }
            ShapeKind::Polygon { pts } => pts.iter_mut().for_each(|p| *p = f(*p)),
            ShapeKind::Circle { center, .. }
            | ShapeKind::Rectangle { center, .. }
            | ShapeKind::Ellipse { center, .. }
            | ShapeKind::Annulus { center, .. } => *center = f(*center),
            ShapeKind::Text { pt } => *pt = f(*pt),
        }
    }
}

/// Instrument footprint: one or more closed polygons
#[derive(Clone, Debug, PartialEq)]
pub struct FootprintData {
    pub polys: Vec<Vec<Pt>>,
}

impl Geometry for FootprintData {
    fn type_tag(&self) -> &str {
        FOOTPRINT_TAG
    }

    fn points(&self) -> Vec<Pt> {
        self.polys.iter().flatten().copied().collect()
    }

    fn map_points(&mut self, f: &mut dyn FnMut(Pt) -> Pt) {
        self.polys
            .iter_mut()
            .flatten()
            .for_each(|p| *p = f(*p));
    }
}

/// Rubber-band selection rectangle between two corners
#[derive(Clone, Debug, PartialEq)]
pub struct SelectBoxData {
    pub pt1: Pt,
    pub pt2: Pt,
}

impl Geometry for SelectBoxData {
    fn type_tag(&self) -> &str {
        SELECT_BOX_TAG
    }

    fn points(&self) -> Vec<Pt> {
        vec![self.pt1, self.pt2]
    }

    fn map_points(&mut self, f: &mut dyn FnMut(Pt) -> Pt) {
        self.pt1 = f(self.pt1);
        self.pt2 = f(self.pt2);
    }
}

/// Compass arrow (north/east indicators)
#[derive(Clone, Debug, PartialEq)]
pub struct DirectionArrowData {
    pub start: Pt,
    pub end: Pt,
}

impl Geometry for DirectionArrowData {
    fn type_tag(&self) -> &str {
        DIRECTION_ARROW_TAG
    }

    fn points(&self) -> Vec<Pt> {
        vec![self.start, self.end]
    }

    fn map_points(&mut self, f: &mut dyn FnMut(Pt) -> Pt) {
        self.start = f(self.start);
        self.end = f(self.end);
    }
}

/// Circular marker with optional label
#[derive(Clone, Debug, PartialEq)]
pub struct MarkerData {
    pub center: Pt,
    pub radius: Distance,
}

impl Geometry for MarkerData {
    fn type_tag(&self) -> &str {
        MARKER_TAG
    }

    fn points(&self) -> Vec<Pt> {
        vec![self.center]
    }

    fn map_points(&mut self, f: &mut dyn FnMut(Pt) -> Pt) {
        self.center = f(self.center);
    }
}

/// One HEALPix cell selected by the MOC culler
#[derive(Clone, Debug, PartialEq)]
pub struct MocTileData {
    pub order: u8,
    pub npix: u64,
    /// N, W, S, E corners in world coordinates
    pub corners: Vec<Pt>,
    /// Stands in for finer cells below the display order
    pub is_parent_tile: bool,
}

impl Geometry for MocTileData {
    fn type_tag(&self) -> &str {
        MOC_TILE_TAG
    }

    fn points(&self) -> Vec<Pt> {
        self.corners.clone()
    }

    fn map_points(&mut self, f: &mut dyn FnMut(Pt) -> Pt) {
        self.corners.iter_mut().for_each(|p| *p = f(*p));
    }
}

/// Traced outline of a pixel-mask footprint
#[derive(Clone, Debug, PartialEq)]
pub struct ImageLineData {
    pub polygons: Vec<Vec<Pt>>,
    pub peaks: Vec<Pt>,
}

impl Geometry for ImageLineData {
    fn type_tag(&self) -> &str {
        IMAGE_LINE_TAG
    }

    fn points(&self) -> Vec<Pt> {
        self.polygons
            .iter()
            .flatten()
            .chain(self.peaks.iter())
            .copied()
            .collect()
    }

    fn map_points(&mut self, f: &mut dyn FnMut(Pt) -> Pt) {
        self.polygons
            .iter_mut()
            .flatten()
            .chain(self.peaks.iter_mut())
            .for_each(|p| *p = f(*p));
    }
}

/// Payload for object types that live outside this crate
#[derive(Clone)]
pub struct CustomData {
    pub tag: String,
    pub pts: Vec<Pt>,
    pub payload: Option<Arc<dyn Any + Send + Sync>>,
}

impl fmt::Debug for CustomData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CustomData")
            .field("tag", &self.tag)
            .field("pts", &self.pts)
            .field("payload", &self.payload.is_some())
            .finish()
    }
}

impl Geometry for CustomData {
    fn type_tag(&self) -> &str {
        &self.tag
    }

    fn points(&self) -> Vec<Pt> {
        self.pts.clone()
    }

    fn map_points(&mut self, f: &mut dyn FnMut(Pt) -> Pt) {
        self.pts.iter_mut().for_each(|p| *p = f(*p));
    }
}

/// Geometry payload of a draw object
#[enum_dispatch(Geometry)]
#[derive(Clone, Debug)]
pub enum DrawKind {
    Point(PointData),
    Shape(ShapeData),
    Footprint(FootprintData),
    SelectBox(SelectBoxData),
    DirectionArrow(DirectionArrowData),
    Marker(MarkerData),
    MocTile(MocTileData),
    ImageLine(ImageLineData),
    Custom(CustomData),
}

// ============================================================================
// Draw object
// ============================================================================

/// Per-object render tweaks
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RenderOptions {
    pub shadow: Option<Shadow>,
    /// Rotation in radians about the object's screen center
    pub rotation_angle: Option<f64>,
    /// Screen-space offset applied before drawing
    pub translation: Option<DVec2>,
}

impl RenderOptions {
    pub fn is_empty(&self) -> bool {
        self.shadow.is_none() && self.rotation_angle.is_none() && self.translation.is_none()
    }
}

/// A typed geometric annotation
#[derive(Clone, Debug)]
pub struct DrawObject {
    pub kind: DrawKind,
    pub id: Option<String>,
    pub color: Option<Color>,
    pub line_width: Option<f64>,
    pub style: Option<Style>,
    pub text: Option<String>,
    pub text_loc: Option<TextLocation>,
    /// Label offset in screen pixels
    pub text_offset: Option<DVec2>,
    pub font: Option<FontSpec>,
    pub render_options: RenderOptions,
    /// Instance-level operations, consulted before the registry
    pub ops: Option<Arc<dyn DrawOp>>,
}

impl DrawObject {
    pub fn new(kind: impl Into<DrawKind>) -> Self {
        DrawObject {
            kind: kind.into(),
            id: None,
            color: None,
            line_width: None,
            style: None,
            text: None,
            text_loc: None,
            text_offset: None,
            font: None,
            render_options: RenderOptions::default(),
            ops: None,
        }
    }

    pub fn point(pt: Pt) -> Self {
        DrawObject::new(PointData {
            pt,
            symbol: None,
            size: None,
        })
    }

    pub fn point_with_symbol(pt: Pt, symbol: Symbol, size: Option<f64>) -> Self {
        DrawObject::new(PointData {
            pt,
            symbol: Some(symbol),
            size,
        })
    }

    pub fn shape(shape: ShapeKind) -> Self {
        DrawObject::new(ShapeData { shape })
    }

    pub fn line(from: Pt, to: Pt) -> Self {
        DrawObject::shape(ShapeKind::Line { from, to })
    }

    pub fn circle(center: Pt, radius: Distance) -> Self {
        DrawObject::shape(ShapeKind::Circle { center, radius })
    }

    pub fn rectangle(center: Pt, width: Distance, height: Distance, angle: f64) -> Self {
        DrawObject::shape(ShapeKind::Rectangle {
            center,
            width,
            height,
            angle,
        })
    }

    pub fn ellipse(center: Pt, r1: Distance, r2: Distance, angle: f64) -> Self {
        DrawObject::shape(ShapeKind::Ellipse {
            center,
            r1,
            r2,
            angle,
        })
    }

    pub fn polygon(pts: Vec<Pt>) -> Self {
        DrawObject::shape(ShapeKind::Polygon { pts })
    }

    pub fn label(pt: Pt, text: impl Into<String>) -> Self {
        DrawObject::shape(ShapeKind::Text { pt }).with_text(text)
    }

    pub fn annulus(center: Pt, radii: Vec<Distance>) -> Self {
        DrawObject::shape(ShapeKind::Annulus { center, radii })
    }

    pub fn footprint(polys: Vec<Vec<Pt>>) -> Self {
        DrawObject::new(FootprintData { polys })
    }

    pub fn select_box(pt1: Pt, pt2: Pt) -> Self {
        DrawObject::new(SelectBoxData { pt1, pt2 })
    }

    pub fn direction_arrow(start: Pt, end: Pt, label: impl Into<String>) -> Self {
        DrawObject::new(DirectionArrowData { start, end }).with_text(label)
    }

    pub fn marker(center: Pt, radius: Distance) -> Self {
        DrawObject::new(MarkerData { center, radius })
    }

    pub fn custom(tag: impl Into<String>, pts: Vec<Pt>) -> Self {
        DrawObject::new(CustomData {
            tag: tag.into(),
            pts,
            payload: None,
        })
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_color(mut self, color: impl Into<Color>) -> Self {
        self.color = Some(color.into());
        self
    }

    pub fn with_line_width(mut self, line_width: f64) -> Self {
        self.line_width = Some(line_width);
        self
    }

    pub fn with_style(mut self, style: Style) -> Self {
        self.style = Some(style);
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn with_text_loc(mut self, text_loc: TextLocation) -> Self {
        self.text_loc = Some(text_loc);
        self
    }

    pub fn with_font(mut self, font: FontSpec) -> Self {
        self.font = Some(font);
        self
    }

    pub fn with_render_options(mut self, render_options: RenderOptions) -> Self {
        self.render_options = render_options;
        self
    }

    pub fn with_ops(mut self, ops: Arc<dyn DrawOp>) -> Self {
        self.ops = Some(ops);
        self
    }

    pub fn type_tag(&self) -> &str {
        self.kind.type_tag()
    }

    pub fn points(&self) -> Vec<Pt> {
        self.kind.points()
    }

    pub fn is_point(&self) -> bool {
        matches!(self.kind, DrawKind::Point(_))
    }

    pub fn symbol(&self) -> Option<Symbol> {
        match &self.kind {
            DrawKind::Point(p) => p.symbol,
            _ => None,
        }
    }

    pub fn symbol_size(&self) -> Option<f64> {
        match &self.kind {
            DrawKind::Point(p) => p.size,
            _ => None,
        }
    }
}

/// Draw list shared between producers, layers and drawers
pub type DrawList = Arc<Vec<DrawObject>>;

/// Wrap objects into a shareable draw list.
pub fn draw_list(objects: Vec<DrawObject>) -> DrawList {
    Arc::new(objects)
}
