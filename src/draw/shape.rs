//! Primitive shapes: line, circle, rectangle, ellipse, polygon, text, annulus

use glam::DVec2;

use super::def::{DrawParams, DrawingDef, Style};
use super::defaults;
use super::object::{Distance, DrawKind, DrawObject, ShapeData, ShapeKind};
use super::ops::{DrawContext, DrawOp, OpEnv};
use super::paint;
use super::region::{RegionBuilder, RegionFrame, fmt_num, text_region};
use super::shift;
use crate::convert::CoordConverter;
use crate::surface::Surface;
use crate::types::Pt;

const ELLIPSE_SEGMENTS: usize = 36;

#[derive(Debug)]
pub struct ShapeOps;

fn shape_of(obj: &DrawObject) -> Option<&ShapeKind> {
    match &obj.kind {
        DrawKind::Shape(ShapeData { shape }) => Some(shape),
        _ => None,
    }
}

/// Screen outline of a shape with an area, used for hit testing.
fn outline(shape: &ShapeKind, cc: &dyn CoordConverter) -> Option<Vec<DVec2>> {
    match shape {
        ShapeKind::Rectangle {
            center,
            width,
            height,
            angle,
        } => {
            let c = cc.to_screen(center)?;
            let half = DVec2::new(width.to_screen(cc)?, height.to_screen(cc)?) / 2.0;
            Some(rect_corners(c, half, *angle))
        }
        ShapeKind::Ellipse { center, r1, r2, angle } => {
            let c = cc.to_screen(center)?;
            let radii = DVec2::new(r1.to_screen(cc)?, r2.to_screen(cc)?);
            Some(ellipse_points(c, radii, *angle))
        }
        ShapeKind::Polygon { pts } => shift::screen_points(pts, cc),
        _ => None,
    }
}

fn rect_corners(c: DVec2, half: DVec2, angle: f64) -> Vec<DVec2> {
    let rot = DVec2::from_angle(angle);
    [
        DVec2::new(-half.x, -half.y),
        DVec2::new(half.x, -half.y),
        DVec2::new(half.x, half.y),
        DVec2::new(-half.x, half.y),
    ]
    .into_iter()
    .map(|v| c + rot.rotate(v))
    .collect()
}

fn ellipse_points(c: DVec2, radii: DVec2, angle: f64) -> Vec<DVec2> {
    let rot = DVec2::from_angle(angle);
    (0..ELLIPSE_SEGMENTS)
        .map(|i| {
            let t = std::f64::consts::TAU * i as f64 / ELLIPSE_SEGMENTS as f64;
            c + rot.rotate(DVec2::new(radii.x * t.cos(), radii.y * t.sin()))
        })
        .collect()
}

/// Screen center and a radius used for label placement.
fn screen_extent(shape: &ShapeKind, cc: &dyn CoordConverter) -> Option<(DVec2, f64)> {
    match shape {
        ShapeKind::Line { from, to } => {
            let (a, b) = (cc.to_screen(from)?, cc.to_screen(to)?);
            Some(((a + b) / 2.0, a.distance(b) / 2.0))
        }
        ShapeKind::Circle { center, radius } => Some((cc.to_screen(center)?, radius.to_screen(cc)?)),
        ShapeKind::Annulus { center, radii } => {
            let c = cc.to_screen(center)?;
            let outer = radii
                .iter()
                .filter_map(|r| r.to_screen(cc))
                .fold(0.0, f64::max);
            Some((c, outer))
        }
        ShapeKind::Text { pt } => Some((cc.to_screen(pt)?, 0.0)),
        _ => {
            let pts = outline(shape, cc)?;
            let c = paint::vertex_mean(&pts)?;
            let r = pts.iter().map(|p| p.distance(c)).fold(0.0, f64::max);
            Some((c, r))
        }
    }
}

fn draw_shape(
    shape: &ShapeKind,
    obj: &DrawObject,
    surface: &mut dyn Surface,
    cc: &dyn CoordConverter,
    params: &DrawParams,
    only_add_to_path: bool,
) -> Option<()> {
    match shape {
        ShapeKind::Line { from, to } => {
            let pts = [cc.to_screen(from)?, cc.to_screen(to)?];
            paint::draw_path(surface, &pts, false, params, only_add_to_path);
        }
        ShapeKind::Circle { center, radius } => {
            let c = cc.to_screen(center)?;
            paint::draw_circle(surface, c, radius.to_screen(cc)?, params, only_add_to_path);
        }
        ShapeKind::Annulus { center, radii } => {
            let c = cc.to_screen(center)?;
            for r in radii {
                paint::draw_circle(surface, c, r.to_screen(cc)?, params, only_add_to_path);
            }
        }
        ShapeKind::Ellipse { center, r1, r2, angle } => {
            let c = cc.to_screen(center)?;
            let radii = DVec2::new(r1.to_screen(cc)?, r2.to_screen(cc)?);
            if !only_add_to_path {
                surface.begin_path(&params.color, params.line_width);
            }
            surface.ellipse(c, radii, *angle);
            if params.style == Style::Fill && !only_add_to_path {
                surface.fill(&params.color);
            }
            if !only_add_to_path {
                surface.stroke();
            }
        }
        ShapeKind::Rectangle { .. } | ShapeKind::Polygon { .. } => {
            let pts = outline(shape, cc)?;
            paint::draw_path(surface, &pts, true, params, only_add_to_path);
        }
        ShapeKind::Text { pt } => {
            let at = cc.to_screen(pt)? + obj.text_offset.unwrap_or(DVec2::ZERO);
            if let Some(text) = &obj.text {
                paint::draw_text(surface, at, text, params);
            }
            return Some(());
        }
    }
    if let Some(text) = &obj.text {
        let (c, r) = screen_extent(shape, cc)?;
        let at = paint::text_anchor(c, r, params.text_loc, obj.text_offset);
        paint::draw_text(surface, at, text, params);
    }
    Some(())
}

/// Anchor point of a shape, in the space of its first point.
fn center_of(shape: &ShapeKind, cc: &dyn CoordConverter) -> Option<Pt> {
    match shape {
        ShapeKind::Circle { center, .. }
        | ShapeKind::Rectangle { center, .. }
        | ShapeKind::Ellipse { center, .. }
        | ShapeKind::Annulus { center, .. } => Some(*center),
        ShapeKind::Text { pt } => Some(*pt),
        ShapeKind::Line { from, to } => {
            let mid = (cc.to_screen(from)? + cc.to_screen(to)?) / 2.0;
            cc.convert(&Pt::screen(mid.x, mid.y), from.sys)
        }
        ShapeKind::Polygon { pts } => shift::centroid(pts, cc),
    }
}

fn region_lines(shape: &ShapeKind, obj: &DrawObject, cc: &dyn CoordConverter, params: &DrawParams) -> Option<Vec<String>> {
    let anchor = match shape {
        ShapeKind::Line { from, .. } => *from,
        ShapeKind::Polygon { pts } => *pts.first()?,
        ShapeKind::Circle { center, .. }
        | ShapeKind::Rectangle { center, .. }
        | ShapeKind::Ellipse { center, .. }
        | ShapeKind::Annulus { center, .. } => *center,
        ShapeKind::Text { pt } => {
            let text = obj.text.as_deref()?;
            return Some(text_region(cc, pt, text, params).into_iter().collect());
        }
    };
    let frame = RegionFrame::for_sys(anchor.sys);
    let dist = |d: &Distance| frame.distance(cc, *d);
    let builder = match shape {
        ShapeKind::Line { from, to } => RegionBuilder::new(frame, "line")
            .pts(&frame.all_coords(cc, &[*from, *to])?),
        ShapeKind::Polygon { pts } => RegionBuilder::new(frame, "polygon").pts(&frame.all_coords(cc, pts)?),
        ShapeKind::Circle { center, radius } => RegionBuilder::new(frame, "circle")
            .pt(frame.coords(cc, center)?)
            .raw(&dist(radius)?),
        ShapeKind::Annulus { center, radii } => radii.iter().try_fold(
            RegionBuilder::new(frame, "annulus").pt(frame.coords(cc, center)?),
            |b, r| Some(b.raw(&dist(r)?)),
        )?,
        ShapeKind::Rectangle {
            center,
            width,
            height,
            angle,
        } => with_angle(
            RegionBuilder::new(frame, "box")
                .pt(frame.coords(cc, center)?)
                .raw(&dist(width)?)
                .raw(&dist(height)?),
            *angle,
        ),
        ShapeKind::Ellipse { center, r1, r2, angle } => with_angle(
            RegionBuilder::new(frame, "ellipse")
                .pt(frame.coords(cc, center)?)
                .raw(&dist(r1)?)
                .raw(&dist(r2)?),
            *angle,
        ),
        ShapeKind::Text { .. } => return None,
    };
    let line = builder
        .common(params)
        .text(obj.text.as_deref())
        .font(&params.font)
        .build();
    Some(vec![line])
}

/// Screen rotation is clockwise (y down); DS9 angles are counterclockwise degrees.
fn with_angle(builder: RegionBuilder, angle: f64) -> RegionBuilder {
    if angle == 0.0 {
        builder
    } else {
        builder.raw(&fmt_num(-angle.to_degrees()))
    }
}

impl DrawOp for ShapeOps {
    fn draw(&self, obj: &DrawObject, ctx: &mut DrawContext<'_>) -> Option<()> {
        let shape = shape_of(obj)?;
        let params = DrawParams::resolve(ctx.env.def, obj);
        let cc = ctx.env.cc;
        let only_add_to_path = ctx.only_add_to_path;
        let Some((center, _)) = screen_extent(shape, cc) else {
            return Some(());
        };
        paint::with_render_options(ctx.surface, &obj.render_options, center, |surface| {
            // conversion failures just leave the object out of this frame
            let _ = draw_shape(shape, obj, surface, cc, &params, only_add_to_path);
        });
        Some(())
    }

    fn center_pt(&self, obj: &DrawObject, env: &OpEnv<'_>) -> Option<Pt> {
        center_of(shape_of(obj)?, env.cc)
    }

    fn screen_dist(&self, obj: &DrawObject, env: &OpEnv<'_>, pt: DVec2) -> Option<f64> {
        let cc = env.cc;
        let dist = match shape_of(obj)? {
            ShapeKind::Line { from, to } => {
                paint::dist_to_segment(pt, cc.to_screen(from)?, cc.to_screen(to)?)
            }
            ShapeKind::Circle { center, radius } => {
                (cc.to_screen(center)?.distance(pt) - radius.to_screen(cc)?).abs()
            }
            ShapeKind::Annulus { center, radii } => {
                let d = cc.to_screen(center)?.distance(pt);
                radii
                    .iter()
                    .filter_map(|r| r.to_screen(cc))
                    .map(|r| (d - r).abs())
                    .fold(f64::MAX, f64::min)
            }
            ShapeKind::Text { pt: anchor } => cc.to_screen(anchor)?.distance(pt),
            shape => paint::dist_to_path(pt, &outline(shape, cc)?, true),
        };
        Some(dist)
    }

    fn to_region(&self, obj: &DrawObject, env: &OpEnv<'_>) -> Option<Vec<String>> {
        let shape = shape_of(obj)?;
        let params = DrawParams::resolve(env.def, obj);
        Some(region_lines(shape, obj, env.cc, &params).unwrap_or_default())
    }

    fn translate_to(&self, obj: &DrawObject, env: &OpEnv<'_>, offset: DVec2) -> Option<DrawObject> {
        shift::translated(obj, env.cc, offset)
    }

    fn rotate_around(&self, obj: &DrawObject, env: &OpEnv<'_>, angle: f64, center: &Pt) -> Option<DrawObject> {
        let mut out = shift::rotated(obj, env.cc, angle, center)?;
        if let DrawKind::Shape(ShapeData {
            shape: ShapeKind::Rectangle { angle: a, .. } | ShapeKind::Ellipse { angle: a, .. },
        }) = &mut out.kind
        {
            *a += angle;
        }
        Some(out)
    }

    fn make_highlight(&self, obj: &DrawObject, env: &OpEnv<'_>) -> Option<DrawObject> {
        shape_of(obj)?;
        let mut highlight = obj.clone();
        highlight.color = Some(env.def.highlight_color.clone());
        highlight.line_width = Some(defaults::HIGHLIGHT_LINE_WIDTH);
        highlight.ops = None;
        Some(highlight)
    }

    fn is_screen_point_inside(&self, obj: &DrawObject, env: &OpEnv<'_>, pt: DVec2) -> Option<bool> {
        let cc = env.cc;
        let inside = match shape_of(obj)? {
            ShapeKind::Circle { center, radius } => {
                cc.to_screen(center)?.distance(pt) <= radius.to_screen(cc)?
            }
            ShapeKind::Annulus { center, radii } => {
                let outer = radii
                    .iter()
                    .filter_map(|r| r.to_screen(cc))
                    .fold(0.0, f64::max);
                cc.to_screen(center)?.distance(pt) <= outer
            }
            ShapeKind::Line { from, to } => {
                paint::dist_to_segment(pt, cc.to_screen(from)?, cc.to_screen(to)?)
                    <= defaults::HIT_TOLERANCE
            }
            ShapeKind::Text { pt: anchor } => {
                let size = DrawParams::resolve(env.def, obj).font.size_px();
                cc.to_screen(anchor)?.distance(pt) <= size
            }
            shape => paint::point_in_polygon(pt, &outline(shape, cc)?),
        };
        Some(inside)
    }

    fn use_path_optimization(&self, obj: &DrawObject, def: &DrawingDef) -> Option<bool> {
        let plain = obj.text.is_none()
            && obj.render_options.is_empty()
            && obj.style.unwrap_or(def.style) == Style::Standard;
        let batchable = matches!(
            shape_of(obj)?,
            ShapeKind::Line { .. } | ShapeKind::Circle { .. } | ShapeKind::Rectangle { .. } | ShapeKind::Polygon { .. }
        );
        Some(plain && batchable)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::convert::LinearConverter;
    use crate::draw::ops::DrawOpRegistry;
    use crate::surface::{CommandBuffer, DrawCommand};
    use crate::types::Dims;

    fn image_cc() -> LinearConverter {
        LinearConverter::new(Dims::new(200, 200), Dims::new(200, 200))
    }

    fn sky_cc() -> LinearConverter {
        LinearConverter::centered_on(
            Dims::new(200, 200),
            Dims::new(200, 200),
            DVec2::new(10.0, 20.0),
            1.0 / 3600.0,
        )
    }

    fn regions(obj: &DrawObject, cc: &dyn CoordConverter) -> String {
        let registry = DrawOpRegistry::with_builtins();
        let def = DrawingDef::default();
        let env = OpEnv::new(&registry, cc, &def);
        registry.to_region(obj, &env).join("\n")
    }

    #[test]
    fn circle_region_omits_defaults() {
        let obj = DrawObject::circle(Pt::image(120.0, 45.0), Distance::image(10.0)).with_color("red");
        assert_eq!(regions(&obj, &image_cc()), "image;circle 120 45 10 # color=red");
    }

    #[test]
    fn screen_radius_becomes_image_pixels() {
        let cc = image_cc().with_zoom(2.0);
        let obj = DrawObject::circle(Pt::image(50.0, 50.0), Distance::screen(10.0));
        assert_eq!(regions(&obj, &cc), "image;circle 50 50 5");
    }

    #[test]
    fn world_shapes_use_arcsec() {
        let obj = DrawObject::rectangle(
            Pt::world(10.0, 20.0),
            Distance::arcsec(30.0),
            Distance::arcsec(15.0),
            0.0,
        )
        .with_line_width(2.0);
        insta::assert_snapshot!(regions(&obj, &sky_cc()), @r#"J2000;box 10 20 30" 15" # width=2"#);
    }

    #[test]
    fn line_polygon_text_ellipse_annulus() {
        let cc = image_cc();
        let all = [
            DrawObject::line(Pt::image(1.0, 2.0), Pt::image(3.0, 4.0)).with_text("edge"),
            DrawObject::polygon(vec![Pt::image(0.0, 0.0), Pt::image(4.0, 0.0), Pt::image(4.0, 3.0)]),
            DrawObject::label(Pt::image(7.0, 8.0), "hello"),
            DrawObject::ellipse(
                Pt::image(10.0, 10.0),
                Distance::image(4.0),
                Distance::image(2.0),
                -std::f64::consts::FRAC_PI_2,
            ),
            DrawObject::annulus(Pt::image(5.0, 5.0), vec![Distance::image(1.0), Distance::image(2.5)]),
        ];
        let out: Vec<String> = all.iter().map(|o| regions(o, &cc)).collect();
        insta::assert_snapshot!(out.join("\n"), @r"
        image;line 1 2 3 4 # text={edge}
        image;polygon 0 0 4 0 4 3
        image;text 7 8 # text={hello}
        image;ellipse 10 10 4 2 90
        image;annulus 5 5 1 2.5
        ");
    }

    #[test]
    fn circle_hit_and_distance() {
        let registry = DrawOpRegistry::with_builtins();
        let def = DrawingDef::default();
        let cc = image_cc();
        let env = OpEnv::new(&registry, &cc, &def);
        // image (100,100) is screen (100,100) on a 200 high image
        let obj = DrawObject::circle(Pt::image(100.0, 100.0), Distance::screen(10.0));
        assert!(registry.is_screen_point_inside(&obj, &env, DVec2::new(105.0, 100.0)));
        assert!(!registry.is_screen_point_inside(&obj, &env, DVec2::new(111.0, 100.0)));
        assert_eq!(registry.screen_dist(&obj, &env, DVec2::new(130.0, 100.0)), 20.0);
    }

    #[test]
    fn rotated_rectangle_accumulates_angle() {
        let registry = DrawOpRegistry::with_builtins();
        let def = DrawingDef::default();
        let cc = image_cc();
        let env = OpEnv::new(&registry, &cc, &def);
        let obj = DrawObject::rectangle(Pt::image(50.0, 50.0), Distance::screen(10.0), Distance::screen(4.0), 0.1);
        let out = registry
            .rotate_around(&obj, &env, 0.2, &Pt::image(50.0, 50.0))
            .unwrap();
        let DrawKind::Shape(ShapeData {
            shape: ShapeKind::Rectangle { angle, center, .. },
        }) = out.kind
        else {
            panic!("expected rectangle");
        };
        assert!((angle - 0.3).abs() < 1e-12);
        assert!((center.vec() - DVec2::new(50.0, 50.0)).length() < 1e-9);
    }

    #[test]
    fn batched_circle_has_no_framing() {
        let registry = DrawOpRegistry::with_builtins();
        let def = DrawingDef::default();
        let cc = image_cc();
        let obj = DrawObject::circle(Pt::image(10.0, 10.0), Distance::screen(3.0));
        assert!(registry.use_path_optimization(&obj, &def));
        let mut surface = CommandBuffer::new(Dims::new(200, 200));
        let mut ctx = DrawContext {
            env: OpEnv::new(&registry, &cc, &def),
            surface: &mut surface,
            only_add_to_path: true,
        };
        registry.draw(&obj, &mut ctx);
        assert_eq!(
            surface.commands(),
            &[
                DrawCommand::MoveTo(DVec2::new(13.0, 190.0)),
                DrawCommand::Arc {
                    center: DVec2::new(10.0, 190.0),
                    radius: 3.0,
                    start: 0.0,
                    end: std::f64::consts::TAU
                }
            ]
        );
    }
}
