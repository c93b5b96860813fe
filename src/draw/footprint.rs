//! Polygon-based objects: instrument footprints, markers and traced
//! image-line footprints.

use glam::DVec2;

use super::def::{DrawParams, DrawingDef, Style};
use super::defaults;
use super::object::{DrawKind, DrawObject};
use super::ops::{DrawContext, DrawOp, OpEnv};
use super::paint;
use super::region::{RegionBuilder, RegionFrame};
use super::shift;
use crate::convert::CoordConverter;
use crate::types::Pt;

/// Screen polygons that convert cleanly; the rest are skipped for this frame.
fn screen_polys(polys: &[Vec<Pt>], cc: &dyn CoordConverter) -> Vec<Vec<DVec2>> {
    polys
        .iter()
        .filter_map(|poly| shift::screen_points(poly, cc))
        .filter(|poly| !poly.is_empty())
        .collect()
}

fn polygon_regions(polys: &[Vec<Pt>], cc: &dyn CoordConverter, params: &DrawParams, text: Option<&str>) -> Vec<String> {
    let mut lines = Vec::new();
    for poly in polys {
        let Some(sys) = shift::same_space(poly) else {
            continue;
        };
        let frame = RegionFrame::for_sys(sys);
        let Some(coords) = frame.all_coords(cc, poly) else {
            continue;
        };
        let label = if lines.is_empty() { text } else { None };
        lines.push(
            RegionBuilder::new(frame, "polygon")
                .pts(&coords)
                .common(params)
                .text(label)
                .build(),
        );
    }
    lines
}

fn highlighted(obj: &DrawObject, def: &DrawingDef) -> DrawObject {
    let mut highlight = obj.clone();
    highlight.color = Some(def.highlight_color.clone());
    highlight.line_width = Some(defaults::HIGHLIGHT_LINE_WIDTH);
    highlight.ops = None;
    highlight
}

fn plain(obj: &DrawObject, def: &DrawingDef) -> bool {
    obj.text.is_none() && obj.render_options.is_empty() && obj.style.unwrap_or(def.style) == Style::Standard
}

// ============================================================================
// Footprint
// ============================================================================

#[derive(Debug)]
pub struct FootprintOps;

fn polys_of(obj: &DrawObject) -> Option<&[Vec<Pt>]> {
    match &obj.kind {
        DrawKind::Footprint(f) => Some(&f.polys),
        _ => None,
    }
}

impl DrawOp for FootprintOps {
    fn draw(&self, obj: &DrawObject, ctx: &mut DrawContext<'_>) -> Option<()> {
        let polys = screen_polys(polys_of(obj)?, ctx.env.cc);
        if polys.is_empty() {
            return Some(());
        }
        let params = DrawParams::resolve(ctx.env.def, obj);
        let all: Vec<DVec2> = polys.iter().flatten().copied().collect();
        let center = paint::vertex_mean(&all)?;
        let only_add_to_path = ctx.only_add_to_path;
        paint::with_render_options(ctx.surface, &obj.render_options, center, |surface| {
            for poly in &polys {
                paint::draw_path(surface, poly, true, &params, only_add_to_path);
            }
            if let Some(text) = &obj.text {
                let radius = all.iter().map(|p| p.distance(center)).fold(0.0, f64::max);
                let at = paint::text_anchor(center, radius, params.text_loc, obj.text_offset);
                paint::draw_text(surface, at, text, &params);
            }
        });
        Some(())
    }

    fn center_pt(&self, obj: &DrawObject, env: &OpEnv<'_>) -> Option<Pt> {
        let pts: Vec<Pt> = polys_of(obj)?.iter().flatten().copied().collect();
        shift::centroid(&pts, env.cc)
    }

    fn screen_dist(&self, obj: &DrawObject, env: &OpEnv<'_>, pt: DVec2) -> Option<f64> {
        let polys = screen_polys(polys_of(obj)?, env.cc);
        Some(
            polys
                .iter()
                .map(|poly| paint::dist_to_path(pt, poly, true))
                .fold(f64::MAX, f64::min),
        )
    }

    fn to_region(&self, obj: &DrawObject, env: &OpEnv<'_>) -> Option<Vec<String>> {
        let params = DrawParams::resolve(env.def, obj);
        Some(polygon_regions(polys_of(obj)?, env.cc, &params, obj.text.as_deref()))
    }

    fn translate_to(&self, obj: &DrawObject, env: &OpEnv<'_>, offset: DVec2) -> Option<DrawObject> {
        shift::translated(obj, env.cc, offset)
    }

    fn rotate_around(&self, obj: &DrawObject, env: &OpEnv<'_>, angle: f64, center: &Pt) -> Option<DrawObject> {
        shift::rotated(obj, env.cc, angle, center)
    }

    fn make_highlight(&self, obj: &DrawObject, env: &OpEnv<'_>) -> Option<DrawObject> {
        polys_of(obj)?;
        Some(highlighted(obj, env.def))
    }

    fn is_screen_point_inside(&self, obj: &DrawObject, env: &OpEnv<'_>, pt: DVec2) -> Option<bool> {
        let polys = screen_polys(polys_of(obj)?, env.cc);
        Some(polys.iter().any(|poly| paint::point_in_polygon(pt, poly)))
    }

    fn use_path_optimization(&self, obj: &DrawObject, def: &DrawingDef) -> Option<bool> {
        Some(plain(obj, def))
    }
}

// ============================================================================
// Marker
// ============================================================================

#[derive(Debug)]
pub struct MarkerOps;

fn marker_of(obj: &DrawObject) -> Option<&super::object::MarkerData> {
    match &obj.kind {
        DrawKind::Marker(m) => Some(m),
        _ => None,
    }
}

impl DrawOp for MarkerOps {
    fn draw(&self, obj: &DrawObject, ctx: &mut DrawContext<'_>) -> Option<()> {
        let marker = marker_of(obj)?;
        let cc = ctx.env.cc;
        let (Some(c), Some(r)) = (cc.to_screen(&marker.center), marker.radius.to_screen(cc)) else {
            return Some(());
        };
        let params = DrawParams::resolve(ctx.env.def, obj);
        let only_add_to_path = ctx.only_add_to_path;
        paint::with_render_options(ctx.surface, &obj.render_options, c, |surface| {
            paint::draw_circle(surface, c, r, &params, only_add_to_path);
            if params.style == Style::Handled {
                let handles = [c + DVec2::new(r, 0.0), c - DVec2::new(r, 0.0), c + DVec2::new(0.0, r), c - DVec2::new(0.0, r)];
                paint::draw_handles(surface, &handles, &params.color);
            }
            if let Some(text) = &obj.text {
                let at = paint::text_anchor(c, r, params.text_loc, obj.text_offset);
                paint::draw_text(surface, at, text, &params);
            }
        });
        Some(())
    }

    fn center_pt(&self, obj: &DrawObject, _env: &OpEnv<'_>) -> Option<Pt> {
        marker_of(obj).map(|m| m.center)
    }

    fn screen_dist(&self, obj: &DrawObject, env: &OpEnv<'_>, pt: DVec2) -> Option<f64> {
        let marker = marker_of(obj)?;
        let d = env.cc.to_screen(&marker.center)?.distance(pt);
        Some((d - marker.radius.to_screen(env.cc)?).max(0.0))
    }

    fn to_region(&self, obj: &DrawObject, env: &OpEnv<'_>) -> Option<Vec<String>> {
        let marker = marker_of(obj)?;
        let params = DrawParams::resolve(env.def, obj);
        let frame = RegionFrame::for_sys(marker.center.sys);
        let line = frame.coords(env.cc, &marker.center).and_then(|c| {
            Some(
                RegionBuilder::new(frame, "circle")
                    .pt(c)
                    .raw(&frame.distance(env.cc, marker.radius)?)
                    .common(&params)
                    .text(obj.text.as_deref())
                    .build(),
            )
        });
        Some(line.into_iter().collect())
    }

    fn translate_to(&self, obj: &DrawObject, env: &OpEnv<'_>, offset: DVec2) -> Option<DrawObject> {
        shift::translated(obj, env.cc, offset)
    }

    fn make_highlight(&self, obj: &DrawObject, env: &OpEnv<'_>) -> Option<DrawObject> {
        marker_of(obj)?;
        Some(highlighted(obj, env.def).with_style(Style::Handled))
    }

    fn is_screen_point_inside(&self, obj: &DrawObject, env: &OpEnv<'_>, pt: DVec2) -> Option<bool> {
        let marker = marker_of(obj)?;
        let d = env.cc.to_screen(&marker.center)?.distance(pt);
        Some(d <= marker.radius.to_screen(env.cc)?)
    }
}

// ============================================================================
// Image-line footprint
// ============================================================================

#[derive(Debug)]
pub struct ImageLineOps;

fn image_line_of(obj: &DrawObject) -> Option<&super::object::ImageLineData> {
    match &obj.kind {
        DrawKind::ImageLine(d) => Some(d),
        _ => None,
    }
}

impl DrawOp for ImageLineOps {
    fn draw(&self, obj: &DrawObject, ctx: &mut DrawContext<'_>) -> Option<()> {
        let data = image_line_of(obj)?;
        let cc = ctx.env.cc;
        let params = DrawParams::resolve(ctx.env.def, obj);
        let only_add_to_path = ctx.only_add_to_path;
        for poly in screen_polys(&data.polygons, cc) {
            paint::draw_path(ctx.surface, &poly, true, &params, only_add_to_path);
        }
        for peak in data.peaks.iter().filter_map(|p| cc.to_screen(p)) {
            paint::draw_symbol(ctx.surface, peak, params.symbol, &params, only_add_to_path);
        }
        Some(())
    }

    fn center_pt(&self, obj: &DrawObject, env: &OpEnv<'_>) -> Option<Pt> {
        let data = image_line_of(obj)?;
        let pts: Vec<Pt> = data.polygons.iter().flatten().copied().collect();
        shift::centroid(&pts, env.cc)
    }

    fn screen_dist(&self, obj: &DrawObject, env: &OpEnv<'_>, pt: DVec2) -> Option<f64> {
        let data = image_line_of(obj)?;
        let edges = screen_polys(&data.polygons, env.cc)
            .iter()
            .map(|poly| paint::dist_to_path(pt, poly, true))
            .fold(f64::MAX, f64::min);
        let peaks = data
            .peaks
            .iter()
            .filter_map(|p| env.cc.to_screen(p))
            .map(|p| p.distance(pt))
            .fold(f64::MAX, f64::min);
        Some(edges.min(peaks))
    }

    fn to_region(&self, obj: &DrawObject, env: &OpEnv<'_>) -> Option<Vec<String>> {
        let data = image_line_of(obj)?;
        let params = DrawParams::resolve(env.def, obj);
        let mut lines = polygon_regions(&data.polygons, env.cc, &params, obj.text.as_deref());
        for peak in &data.peaks {
            let frame = RegionFrame::for_sys(peak.sys);
            if let Some(at) = frame.coords(env.cc, peak) {
                lines.push(
                    RegionBuilder::new(frame, "point")
                        .pt(at)
                        .common(&params)
                        .prop(format!("point={}", params.symbol.region_name()))
                        .build(),
                );
            }
        }
        Some(lines)
    }

    fn make_highlight(&self, obj: &DrawObject, env: &OpEnv<'_>) -> Option<DrawObject> {
        image_line_of(obj)?;
        Some(highlighted(obj, env.def))
    }

    fn is_screen_point_inside(&self, obj: &DrawObject, env: &OpEnv<'_>, pt: DVec2) -> Option<bool> {
        let data = image_line_of(obj)?;
        Some(
            screen_polys(&data.polygons, env.cc)
                .iter()
                .any(|poly| paint::point_in_polygon(pt, poly)),
        )
    }

    fn use_path_optimization(&self, obj: &DrawObject, def: &DrawingDef) -> Option<bool> {
        Some(plain(obj, def) && def.symbol.batches())
    }
}
