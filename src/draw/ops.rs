//! Operation dispatch for draw objects.
//!
//! Every operation resolves in two steps: the object's own `ops` override
//! first, then the registry entry for the object's type tag. A [`DrawOp`]
//! method returning `None` means "not provided here", which lets an override
//! implement just the operations it changes.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use glam::DVec2;

use super::def::DrawingDef;
use super::object::{
    DIRECTION_ARROW_TAG, DrawObject, FOOTPRINT_TAG, IMAGE_LINE_TAG, MARKER_TAG, MOC_TILE_TAG,
    POINT_TAG, SELECT_BOX_TAG, SHAPE_TAG,
};
use super::{footprint, moc_tile, point, shape, tool};
use crate::convert::CoordConverter;
use crate::log::{debug, warn};
use crate::surface::Surface;
use crate::types::Pt;

/// Everything a non-drawing operation may read
#[derive(Clone, Copy)]
pub struct OpEnv<'a> {
    pub registry: &'a DrawOpRegistry,
    pub cc: &'a dyn CoordConverter,
    pub def: &'a DrawingDef,
}

impl<'a> OpEnv<'a> {
    pub fn new(registry: &'a DrawOpRegistry, cc: &'a dyn CoordConverter, def: &'a DrawingDef) -> Self {
        OpEnv { registry, cc, def }
    }
}

/// Drawing target plus environment for one `draw` call
pub struct DrawContext<'a> {
    pub env: OpEnv<'a>,
    pub surface: &'a mut dyn Surface,
    /// Append geometry to the caller's open path instead of stroking
    pub only_add_to_path: bool,
}

/// Operation set for one object type
pub trait DrawOp: fmt::Debug + Send + Sync {
    fn draw(&self, _obj: &DrawObject, _ctx: &mut DrawContext<'_>) -> Option<()> {
        None
    }

    fn center_pt(&self, _obj: &DrawObject, _env: &OpEnv<'_>) -> Option<Pt> {
        None
    }

    /// Distance in screen pixels from `pt` to the object
    fn screen_dist(&self, _obj: &DrawObject, _env: &OpEnv<'_>, _pt: DVec2) -> Option<f64> {
        None
    }

    /// DS9 region lines describing the object
    fn to_region(&self, _obj: &DrawObject, _env: &OpEnv<'_>) -> Option<Vec<String>> {
        None
    }

    /// Copy of the object shifted by a screen offset
    fn translate_to(&self, _obj: &DrawObject, _env: &OpEnv<'_>, _offset: DVec2) -> Option<DrawObject> {
        None
    }

    /// Copy of the object rotated by `angle` radians about `center`
    fn rotate_around(
        &self,
        _obj: &DrawObject,
        _env: &OpEnv<'_>,
        _angle: f64,
        _center: &Pt,
    ) -> Option<DrawObject> {
        None
    }

    fn make_highlight(&self, _obj: &DrawObject, _env: &OpEnv<'_>) -> Option<DrawObject> {
        None
    }

    fn is_screen_point_inside(&self, _obj: &DrawObject, _env: &OpEnv<'_>, _pt: DVec2) -> Option<bool> {
        None
    }

    /// Whether consecutive objects may share one stroked path
    fn use_path_optimization(&self, _obj: &DrawObject, _def: &DrawingDef) -> Option<bool> {
        None
    }
}

/// Type-tag keyed operation table
#[derive(Clone, Default)]
pub struct DrawOpRegistry {
    ops: HashMap<String, Arc<dyn DrawOp>>,
}

impl fmt::Debug for DrawOpRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut tags: Vec<&String> = self.ops.keys().collect();
        tags.sort();
        f.debug_struct("DrawOpRegistry").field("tags", &tags).finish()
    }
}

impl DrawOpRegistry {
    /// Empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every built-in object type
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register(POINT_TAG, Arc::new(point::PointOps));
        registry.register(SHAPE_TAG, Arc::new(shape::ShapeOps));
        registry.register(FOOTPRINT_TAG, Arc::new(footprint::FootprintOps));
        registry.register(MARKER_TAG, Arc::new(footprint::MarkerOps));
        registry.register(IMAGE_LINE_TAG, Arc::new(footprint::ImageLineOps));
        registry.register(SELECT_BOX_TAG, Arc::new(tool::SelectBoxOps));
        registry.register(DIRECTION_ARROW_TAG, Arc::new(tool::DirectionArrowOps));
        registry.register(MOC_TILE_TAG, Arc::new(moc_tile::MocTileOps));
        registry
    }

    /// Add or replace the operations for a type tag.
    pub fn register(&mut self, tag: impl Into<String>, ops: Arc<dyn DrawOp>) {
        self.ops.insert(tag.into(), ops);
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.ops.contains_key(tag)
    }

    fn resolve<T>(&self, obj: &DrawObject, mut f: impl FnMut(&dyn DrawOp) -> Option<T>) -> Option<T> {
        if let Some(ops) = &obj.ops {
            if let Some(v) = f(ops.as_ref()) {
                return Some(v);
            }
        }
        self.ops.get(obj.type_tag()).and_then(|ops| f(ops.as_ref()))
    }

    fn missing(&self, _op: &str, obj: &DrawObject) {
        if self.contains(obj.type_tag()) {
            warn!(op = _op, tag = obj.type_tag(), "draw object type does not provide required op");
        } else {
            warn!(op = _op, tag = obj.type_tag(), "unknown draw object type");
        }
    }

    // ==================== Required ops ====================

    /// Draw the object. Returns false when no implementation exists.
    pub fn draw(&self, obj: &DrawObject, ctx: &mut DrawContext<'_>) -> bool {
        match self.resolve(obj, |ops| ops.draw(obj, ctx)) {
            Some(()) => true,
            None => {
                self.missing("draw", obj);
                false
            }
        }
    }

    pub fn center_pt(&self, obj: &DrawObject, env: &OpEnv<'_>) -> Option<Pt> {
        let pt = self.resolve(obj, |ops| ops.center_pt(obj, env));
        if pt.is_none() {
            self.missing("center_pt", obj);
        }
        pt
    }

    /// Screen distance, or `f64::MAX` when it cannot be computed.
    pub fn screen_dist(&self, obj: &DrawObject, env: &OpEnv<'_>, pt: DVec2) -> f64 {
        self.resolve(obj, |ops| ops.screen_dist(obj, env, pt))
            .unwrap_or_else(|| {
                self.missing("screen_dist", obj);
                f64::MAX
            })
    }

    pub fn to_region(&self, obj: &DrawObject, env: &OpEnv<'_>) -> Vec<String> {
        self.resolve(obj, |ops| ops.to_region(obj, env))
            .unwrap_or_else(|| {
                self.missing("to_region", obj);
                Vec::new()
            })
    }

    // ==================== Optional ops ====================

    pub fn translate_to(&self, obj: &DrawObject, env: &OpEnv<'_>, offset: DVec2) -> Option<DrawObject> {
        self.resolve(obj, |ops| ops.translate_to(obj, env, offset))
    }

    pub fn rotate_around(
        &self,
        obj: &DrawObject,
        env: &OpEnv<'_>,
        angle: f64,
        center: &Pt,
    ) -> Option<DrawObject> {
        self.resolve(obj, |ops| ops.rotate_around(obj, env, angle, center))
    }

    pub fn make_highlight(&self, obj: &DrawObject, env: &OpEnv<'_>) -> Option<DrawObject> {
        self.resolve(obj, |ops| ops.make_highlight(obj, env))
    }

    pub fn is_screen_point_inside(&self, obj: &DrawObject, env: &OpEnv<'_>, pt: DVec2) -> bool {
        self.resolve(obj, |ops| ops.is_screen_point_inside(obj, env, pt))
            .unwrap_or(false)
    }

    pub fn use_path_optimization(&self, obj: &DrawObject, def: &DrawingDef) -> bool {
        self.resolve(obj, |ops| ops.use_path_optimization(obj, def))
            .unwrap_or(false)
    }

    /// Closest object within `max_dist` screen pixels, by index.
    pub fn closest(
        &self,
        objects: &[DrawObject],
        env: &OpEnv<'_>,
        pt: DVec2,
        max_dist: f64,
    ) -> Option<usize> {
        let found = objects
            .iter()
            .enumerate()
            .map(|(i, obj)| (i, self.screen_dist(obj, env, pt)))
            .filter(|(_, d)| *d <= max_dist)
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(i, _)| i);
        debug!(?found, "closest draw object");
        found
    }

    /// Region lines for a whole draw list.
    pub fn to_regions(&self, objects: &[DrawObject], env: &OpEnv<'_>) -> Vec<String> {
        objects
            .iter()
            .flat_map(|obj| self.to_region(obj, env))
            .collect()
    }
}
