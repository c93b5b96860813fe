//! Point markers

use glam::DVec2;

use super::def::{DrawParams, DrawingDef};
use super::object::{DrawKind, DrawObject};
use super::ops::{DrawContext, DrawOp, OpEnv};
use super::paint;
use super::region::{RegionBuilder, RegionFrame, fmt_num};
use super::shift;
use crate::types::Pt;

#[derive(Debug)]
pub struct PointOps;

fn point_of(obj: &DrawObject) -> Option<Pt> {
    match &obj.kind {
        DrawKind::Point(p) => Some(p.pt),
        _ => None,
    }
}

impl DrawOp for PointOps {
    fn draw(&self, obj: &DrawObject, ctx: &mut DrawContext<'_>) -> Option<()> {
        let pt = point_of(obj)?;
        let params = DrawParams::resolve(ctx.env.def, obj);
        let Some(sp) = ctx.env.cc.to_screen(&pt) else {
            return Some(());
        };
        let only_add_to_path = ctx.only_add_to_path;
        paint::with_render_options(ctx.surface, &obj.render_options, sp, |surface| {
            paint::draw_symbol(surface, sp, params.symbol, &params, only_add_to_path);
            if let Some(text) = &obj.text {
                let radius = params.symbol.drawing_size(params.size);
                let at = paint::text_anchor(sp, radius, params.text_loc, obj.text_offset);
                paint::draw_text(surface, at, text, &params);
            }
        });
        Some(())
    }

    fn center_pt(&self, obj: &DrawObject, _env: &OpEnv<'_>) -> Option<Pt> {
        point_of(obj)
    }

    fn screen_dist(&self, obj: &DrawObject, env: &OpEnv<'_>, pt: DVec2) -> Option<f64> {
        let sp = env.cc.to_screen(&point_of(obj)?)?;
        Some(sp.distance(pt))
    }

    fn to_region(&self, obj: &DrawObject, env: &OpEnv<'_>) -> Option<Vec<String>> {
        let pt = point_of(obj)?;
        let params = DrawParams::resolve(env.def, obj);
        let frame = RegionFrame::for_sys(pt.sys);
        let Some(at) = frame.coords(env.cc, &pt) else {
            return Some(Vec::new());
        };
        let symbol = if obj.symbol_size().is_some() {
            format!("point={} {}", params.symbol.region_name(), fmt_num(params.size))
        } else {
            format!("point={}", params.symbol.region_name())
        };
        let line = RegionBuilder::new(frame, "point")
            .pt(at)
            .common(&params)
            .prop(symbol)
            .text(obj.text.as_deref())
            .build();
        Some(vec![line])
    }

    fn translate_to(&self, obj: &DrawObject, env: &OpEnv<'_>, offset: DVec2) -> Option<DrawObject> {
        shift::translated(obj, env.cc, offset)
    }

    fn rotate_around(&self, obj: &DrawObject, env: &OpEnv<'_>, angle: f64, center: &Pt) -> Option<DrawObject> {
        shift::rotated(obj, env.cc, angle, center)
    }

    fn is_screen_point_inside(&self, obj: &DrawObject, env: &OpEnv<'_>, pt: DVec2) -> Option<bool> {
        let params = DrawParams::resolve(env.def, obj);
        let sp = env.cc.to_screen(&point_of(obj)?)?;
        let half = params.symbol.drawing_size(params.size);
        Some((sp - pt).abs().cmple(DVec2::splat(half)).all())
    }

    fn make_highlight(&self, obj: &DrawObject, env: &OpEnv<'_>) -> Option<DrawObject> {
        let params = DrawParams::resolve(env.def, obj);
        let DrawKind::Point(data) = &obj.kind else {
            return None;
        };
        let mut highlight = obj.clone();
        highlight.kind = DrawKind::Point(super::object::PointData {
            size: Some(params.size + 2.0),
            ..data.clone()
        });
        highlight.color = Some(env.def.highlight_color.clone());
        highlight.ops = None;
        Some(highlight)
    }

    fn use_path_optimization(&self, obj: &DrawObject, def: &DrawingDef) -> Option<bool> {
        Some(obj.text.is_none() && obj.render_options.is_empty() && obj.symbol().unwrap_or(def.symbol).batches())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::convert::LinearConverter;
    use crate::draw::def::Symbol;
    use crate::draw::ops::DrawOpRegistry;
    use crate::surface::{CommandBuffer, DrawCommand};
    use crate::types::Dims;

    fn cc() -> LinearConverter {
        LinearConverter::new(Dims::new(100, 100), Dims::new(100, 100))
    }

    #[test]
    fn region_carries_symbol() {
        let registry = DrawOpRegistry::with_builtins();
        let def = DrawingDef::default();
        let cc = cc();
        let env = OpEnv::new(&registry, &cc, &def);
        let obj = DrawObject::point_with_symbol(Pt::image(3.0, 4.5), Symbol::Diamond, None)
            .with_color("red");
        insta::assert_snapshot!(registry.to_region(&obj, &env).join("\n"), @"image;point 3 4.5 # color=red point=diamond");
    }

    #[test]
    fn draws_offscreen_conversion_failure_as_nothing() {
        let registry = DrawOpRegistry::with_builtins();
        let def = DrawingDef::default();
        let cc = cc();
        let obj = DrawObject::point(Pt::world(10.0, 10.0));
        let mut surface = CommandBuffer::new(Dims::new(100, 100));
        let mut ctx = DrawContext {
            env: OpEnv::new(&registry, &cc, &def),
            surface: &mut surface,
            only_add_to_path: false,
        };
        assert!(registry.draw(&obj, &mut ctx));
        assert!(surface.is_blank());
    }

    #[test]
    fn label_is_drawn_next_to_symbol() {
        let registry = DrawOpRegistry::with_builtins();
        let def = DrawingDef::default();
        let cc = cc();
        let obj = DrawObject::point(Pt::image(50.0, 50.0)).with_text("src 1");
        let mut surface = CommandBuffer::new(Dims::new(100, 100));
        let mut ctx = DrawContext {
            env: OpEnv::new(&registry, &cc, &def),
            surface: &mut surface,
            only_add_to_path: false,
        };
        registry.draw(&obj, &mut ctx);
        assert!(
            surface
                .commands()
                .iter()
                .any(|c| matches!(c, DrawCommand::Text { text, .. } if text == "src 1"))
        );
    }

    #[test]
    fn hit_box_matches_symbol_size() {
        let registry = DrawOpRegistry::with_builtins();
        let def = DrawingDef::default();
        let cc = cc();
        let env = OpEnv::new(&registry, &cc, &def);
        let obj = DrawObject::point(Pt::image(50.0, 50.0));
        assert!(registry.is_screen_point_inside(&obj, &env, DVec2::new(53.0, 47.0)));
        assert!(!registry.is_screen_point_inside(&obj, &env, DVec2::new(55.0, 50.0)));
    }
}
