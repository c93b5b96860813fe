//! Interactive tool overlays: selection box and direction arrows

use glam::DVec2;

use super::def::{DrawParams, Style};
use super::object::{Distance, DrawKind, DrawObject};
use super::ops::{DrawContext, DrawOp, OpEnv};
use super::paint;
use super::region::{RegionBuilder, RegionFrame};
use super::shift;
use crate::types::{BBox, Pt};

// ============================================================================
// Select box
// ============================================================================

#[derive(Debug)]
pub struct SelectBoxOps;

fn corners_of(obj: &DrawObject) -> Option<(Pt, Pt)> {
    match &obj.kind {
        DrawKind::SelectBox(b) => Some((b.pt1, b.pt2)),
        _ => None,
    }
}

fn screen_box(obj: &DrawObject, env: &OpEnv<'_>) -> Option<BBox> {
    let (a, b) = corners_of(obj)?;
    Some(BBox::from_corners(env.cc.to_screen(&a)?, env.cc.to_screen(&b)?))
}

fn box_outline(b: &BBox) -> [DVec2; 4] {
    [
        b.min,
        DVec2::new(b.max.x, b.min.y),
        b.max,
        DVec2::new(b.min.x, b.max.y),
    ]
}

impl DrawOp for SelectBoxOps {
    fn draw(&self, obj: &DrawObject, ctx: &mut DrawContext<'_>) -> Option<()> {
        let Some(b) = screen_box(obj, &ctx.env) else {
            return Some(());
        };
        let params = DrawParams::resolve(ctx.env.def, obj);
        let outline = box_outline(&b);
        paint::draw_path(ctx.surface, &outline, true, &params, ctx.only_add_to_path);
        if params.style != Style::Handled && obj.style.is_none() {
            // a bare select box always shows its drag handles
            paint::draw_handles(ctx.surface, &outline, &params.color);
        }
        Some(())
    }

    fn center_pt(&self, obj: &DrawObject, env: &OpEnv<'_>) -> Option<Pt> {
        let (a, _) = corners_of(obj)?;
        let c = screen_box(obj, env)?.center();
        env.cc.convert(&Pt::screen(c.x, c.y), a.sys)
    }

    fn screen_dist(&self, obj: &DrawObject, env: &OpEnv<'_>, pt: DVec2) -> Option<f64> {
        let b = screen_box(obj, env)?;
        Some(paint::dist_to_path(pt, &box_outline(&b), true))
    }

    fn to_region(&self, obj: &DrawObject, env: &OpEnv<'_>) -> Option<Vec<String>> {
        let (a, _) = corners_of(obj)?;
        let params = DrawParams::resolve(env.def, obj);
        let frame = RegionFrame::for_sys(a.sys);
        let line = screen_box(obj, env).and_then(|b| {
            let c = b.center();
            let center = frame.coords(env.cc, &Pt::screen(c.x, c.y))?;
            let size = b.size();
            Some(
                RegionBuilder::new(frame, "box")
                    .pt(center)
                    .raw(&frame.distance(env.cc, Distance::screen(size.x))?)
                    .raw(&frame.distance(env.cc, Distance::screen(size.y))?)
                    .common(&params)
                    .build(),
            )
        });
        Some(line.into_iter().collect())
    }

    fn translate_to(&self, obj: &DrawObject, env: &OpEnv<'_>, offset: DVec2) -> Option<DrawObject> {
        shift::translated(obj, env.cc, offset)
    }

    fn is_screen_point_inside(&self, obj: &DrawObject, env: &OpEnv<'_>, pt: DVec2) -> Option<bool> {
        Some(screen_box(obj, env)?.contains(pt))
    }

    fn make_highlight(&self, obj: &DrawObject, env: &OpEnv<'_>) -> Option<DrawObject> {
        corners_of(obj)?;
        let mut highlight = obj.clone().with_style(Style::Handled);
        highlight.color = Some(env.def.highlight_color.clone());
        highlight.ops = None;
        Some(highlight)
    }
}

// ============================================================================
// Direction arrow
// ============================================================================

#[derive(Debug)]
pub struct DirectionArrowOps;

fn ends_of(obj: &DrawObject) -> Option<(Pt, Pt)> {
    match &obj.kind {
        DrawKind::DirectionArrow(a) => Some((a.start, a.end)),
        _ => None,
    }
}

impl DrawOp for DirectionArrowOps {
    fn draw(&self, obj: &DrawObject, ctx: &mut DrawContext<'_>) -> Option<()> {
        let (start, end) = ends_of(obj)?;
        let cc = ctx.env.cc;
        let (Some(s), Some(e)) = (cc.to_screen(&start), cc.to_screen(&end)) else {
            return Some(());
        };
        let params = DrawParams::resolve(ctx.env.def, obj);
        paint::with_render_options(ctx.surface, &obj.render_options, s, |surface| {
            paint::draw_arrow(surface, s, e, &params);
            if let Some(text) = &obj.text {
                let dir = (e - s).normalize_or_zero();
                let at = e + dir * 10.0 + obj.text_offset.unwrap_or(DVec2::ZERO);
                paint::draw_text(surface, at, text, &params);
            }
        });
        Some(())
    }

    fn center_pt(&self, obj: &DrawObject, _env: &OpEnv<'_>) -> Option<Pt> {
        ends_of(obj).map(|(start, _)| start)
    }

    fn screen_dist(&self, obj: &DrawObject, env: &OpEnv<'_>, pt: DVec2) -> Option<f64> {
        let (start, end) = ends_of(obj)?;
        Some(paint::dist_to_segment(pt, env.cc.to_screen(&start)?, env.cc.to_screen(&end)?))
    }

    fn to_region(&self, obj: &DrawObject, env: &OpEnv<'_>) -> Option<Vec<String>> {
        let (start, end) = ends_of(obj)?;
        let params = DrawParams::resolve(env.def, obj);
        let frame = RegionFrame::for_sys(start.sys);
        let line = frame.all_coords(env.cc, &[start, end]).map(|coords| {
            RegionBuilder::new(frame, "line")
                .pts(&coords)
                .common(&params)
                .prop("line=0 1")
                .text(obj.text.as_deref())
                .build()
        });
        Some(line.into_iter().collect())
    }

    fn translate_to(&self, obj: &DrawObject, env: &OpEnv<'_>, offset: DVec2) -> Option<DrawObject> {
        shift::translated(obj, env.cc, offset)
    }

    fn rotate_around(&self, obj: &DrawObject, env: &OpEnv<'_>, angle: f64, center: &Pt) -> Option<DrawObject> {
        shift::rotated(obj, env.cc, angle, center)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::convert::LinearConverter;
    use crate::draw::def::DrawingDef;
    use crate::draw::ops::DrawOpRegistry;
    use crate::types::Dims;

    fn cc() -> LinearConverter {
        LinearConverter::new(Dims::new(100, 100), Dims::new(100, 100)).with_zoom(2.0)
    }

    #[test]
    fn select_box_region_in_image_pixels() {
        let registry = DrawOpRegistry::with_builtins();
        let def = DrawingDef::default();
        let cc = cc();
        let env = OpEnv::new(&registry, &cc, &def);
        let obj = DrawObject::select_box(Pt::image(40.0, 40.0), Pt::image(50.0, 44.0));
        assert_eq!(registry.to_region(&obj, &env), vec!["image;box 45 42 10 4"]);
    }

    #[test]
    fn select_box_contains() {
        let registry = DrawOpRegistry::with_builtins();
        let def = DrawingDef::default();
        let cc = cc();
        let env = OpEnv::new(&registry, &cc, &def);
        let obj = DrawObject::select_box(Pt::screen(10.0, 10.0), Pt::screen(30.0, 20.0));
        assert!(registry.is_screen_point_inside(&obj, &env, DVec2::new(15.0, 15.0)));
        assert!(!registry.is_screen_point_inside(&obj, &env, DVec2::new(35.0, 15.0)));
    }

    #[test]
    fn arrow_region_marks_head() {
        let registry = DrawOpRegistry::with_builtins();
        let def = DrawingDef::default();
        let cc = cc();
        let env = OpEnv::new(&registry, &cc, &def);
        let obj = DrawObject::direction_arrow(Pt::image(10.0, 10.0), Pt::image(10.0, 20.0), "N");
        assert_eq!(
            registry.to_region(&obj, &env),
            vec!["image;line 10 10 10 20 # line=0 1 text={N}"]
        );
    }
}
