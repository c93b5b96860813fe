//! Surface drawing helpers shared by the per-type operations.
//!
//! All coordinates here are screen pixels. Helpers that open their own path
//! honor `only_add_to_path` so the drawer can batch many objects into one
//! stroke.

use glam::DVec2;

use super::def::{DrawParams, Style, Symbol, TextLocation};
use super::defaults;
use super::object::RenderOptions;
use crate::surface::Surface;
use crate::types::Color;

fn open(surface: &mut dyn Surface, params: &DrawParams, only_add_to_path: bool) {
    if !only_add_to_path {
        surface.begin_path(&params.color, params.line_width);
    }
}

fn close(surface: &mut dyn Surface, only_add_to_path: bool) {
    if !only_add_to_path {
        surface.stroke();
    }
}

/// Run `f` with the object's rotation, translation and shadow applied.
pub fn with_render_options(
    surface: &mut dyn Surface,
    ro: &RenderOptions,
    center: DVec2,
    f: impl FnOnce(&mut dyn Surface),
) {
    if ro.is_empty() {
        f(surface);
        return;
    }
    surface.save();
    if let Some(offset) = ro.translation {
        surface.translate(offset);
    }
    if let Some(angle) = ro.rotation_angle {
        surface.translate(center);
        surface.rotate(angle);
        surface.translate(-center);
    }
    if let Some(shadow) = &ro.shadow {
        surface.set_shadow(Some(shadow));
    }
    f(surface);
    surface.restore();
}

/// Polyline or polygon outline, filled when the style asks for it.
pub fn draw_path(
    surface: &mut dyn Surface,
    pts: &[DVec2],
    closed: bool,
    params: &DrawParams,
    only_add_to_path: bool,
) {
    let Some((first, rest)) = pts.split_first() else {
        return;
    };
    let fill = closed && params.style == Style::Fill && !only_add_to_path;
    open(surface, params, only_add_to_path);
    surface.move_to(*first);
    for p in rest {
        surface.line_to(*p);
    }
    if closed {
        surface.close_path();
    }
    if fill {
        surface.fill(&params.color);
    }
    close(surface, only_add_to_path);
    if params.style == Style::Handled {
        draw_handles(surface, pts, &params.color);
    }
}

/// Small square handles at each vertex.
pub fn draw_handles(surface: &mut dyn Surface, pts: &[DVec2], color: &Color) {
    let h = defaults::HANDLE_SIZE;
    for p in pts {
        surface.begin_path(color, 1.0);
        surface.rect(*p - DVec2::splat(h), DVec2::splat(2.0 * h));
        surface.fill(color);
    }
}

/// Circle outline
pub fn draw_circle(
    surface: &mut dyn Surface,
    center: DVec2,
    radius: f64,
    params: &DrawParams,
    only_add_to_path: bool,
) {
    open(surface, params, only_add_to_path);
    if only_add_to_path {
        surface.move_to(center + DVec2::new(radius, 0.0));
    }
    surface.arc(center, radius, 0.0, std::f64::consts::TAU);
    if params.style == Style::Fill && !only_add_to_path {
        surface.fill(&params.color);
    }
    close(surface, only_add_to_path);
}

/// Point glyph centered on `p`
pub fn draw_symbol(
    surface: &mut dyn Surface,
    p: DVec2,
    symbol: Symbol,
    params: &DrawParams,
    only_add_to_path: bool,
) {
    let size = symbol.drawing_size(params.size);
    let (x, y) = (p.x, p.y);
    match symbol {
        Symbol::X => {
            open(surface, params, only_add_to_path);
            x_lines(surface, p, size);
            close(surface, only_add_to_path);
        }
        Symbol::Square => {
            open(surface, params, only_add_to_path);
            surface.rect(p - DVec2::splat(size), DVec2::splat(2.0 * size));
            close(surface, only_add_to_path);
        }
        Symbol::SquareX => {
            open(surface, params, only_add_to_path);
            x_lines(surface, p, size);
            surface.rect(p - DVec2::splat(size), DVec2::splat(2.0 * size));
            close(surface, only_add_to_path);
        }
        Symbol::EmpSquareX => {
            open(surface, params, false);
            x_lines(surface, p, size);
            surface.rect(p - DVec2::splat(size), DVec2::splat(2.0 * size));
            surface.stroke();
            let outer = size + 2.0;
            surface.begin_path(&Color::named("black"), params.line_width);
            surface.rect(p - DVec2::splat(outer), DVec2::splat(2.0 * outer));
            surface.stroke();
        }
        Symbol::Cross => {
            open(surface, params, only_add_to_path);
            surface.move_to(DVec2::new(x - size, y));
            surface.line_to(DVec2::new(x + size, y));
            surface.move_to(DVec2::new(x, y - size));
            surface.line_to(DVec2::new(x, y + size));
            close(surface, only_add_to_path);
        }
        Symbol::EmpCross => {
            let inner = params.size;
            open(surface, params, false);
            surface.move_to(DVec2::new(x - inner, y));
            surface.line_to(DVec2::new(x + inner, y));
            surface.move_to(DVec2::new(x, y - inner));
            surface.line_to(DVec2::new(x, y + inner));
            surface.stroke();
            surface.begin_path(&Color::named("black"), params.line_width);
            for dir in [DVec2::X, DVec2::NEG_X, DVec2::Y, DVec2::NEG_Y] {
                surface.move_to(p + dir * (inner + 1.0));
                surface.line_to(p + dir * size);
            }
            surface.stroke();
        }
        Symbol::Diamond => {
            open(surface, params, only_add_to_path);
            surface.move_to(DVec2::new(x, y - size));
            surface.line_to(DVec2::new(x + size, y));
            surface.line_to(DVec2::new(x, y + size));
            surface.line_to(DVec2::new(x - size, y));
            surface.line_to(DVec2::new(x, y - size));
            close(surface, only_add_to_path);
        }
        Symbol::Dot => {
            open(surface, params, only_add_to_path);
            let mut row = y - size;
            while row <= y + size {
                surface.move_to(DVec2::new(x - size, row));
                surface.line_to(DVec2::new(x + size, row));
                row += 1.0;
            }
            close(surface, only_add_to_path);
        }
        Symbol::Circle => {
            open(surface, params, only_add_to_path);
            if only_add_to_path {
                surface.move_to(DVec2::new(x + size, y));
            }
            surface.arc(p, size, 0.0, std::f64::consts::TAU);
            close(surface, only_add_to_path);
        }
        Symbol::BoxCircle => {
            open(surface, params, only_add_to_path);
            surface.rect(p - DVec2::splat(size), DVec2::splat(2.0 * size));
            surface.move_to(DVec2::new(x + size, y));
            surface.arc(p, size, 0.0, std::f64::consts::TAU);
            close(surface, only_add_to_path);
        }
        Symbol::Arrow => {
            open(surface, params, only_add_to_path);
            surface.move_to(p);
            surface.line_to(DVec2::new(x - size, y - size));
            surface.move_to(p);
            surface.line_to(DVec2::new(x, y - size));
            surface.move_to(p);
            surface.line_to(DVec2::new(x - size, y));
            close(surface, only_add_to_path);
        }
    }
}

fn x_lines(surface: &mut dyn Surface, p: DVec2, size: f64) {
    surface.move_to(p - DVec2::splat(size));
    surface.line_to(p + DVec2::splat(size));
    surface.move_to(DVec2::new(p.x - size, p.y + size));
    surface.line_to(DVec2::new(p.x + size, p.y - size));
}

/// Straight segment with an arrow head at `end`.
pub fn draw_arrow(surface: &mut dyn Surface, start: DVec2, end: DVec2, params: &DrawParams) {
    surface.begin_path(&params.color, params.line_width);
    surface.move_to(start);
    surface.line_to(end);
    let dir = (end - start).normalize_or_zero();
    if dir != DVec2::ZERO {
        let head = 8.0;
        let side = dir.perp() * (head / 2.0);
        let back = end - dir * head;
        surface.move_to(end);
        surface.line_to(back + side);
        surface.move_to(end);
        surface.line_to(back - side);
    }
    surface.stroke();
}

/// Position of a label placed around an object of the given screen radius.
pub fn text_anchor(center: DVec2, radius: f64, loc: TextLocation, offset: Option<DVec2>) -> DVec2 {
    let gap = radius + defaults::TEXT_GAP;
    let dir = loc.direction();
    let base = if dir == DVec2::ZERO { center } else { center + dir.normalize() * gap };
    base + offset.unwrap_or(DVec2::ZERO)
}

/// Label text
pub fn draw_text(surface: &mut dyn Surface, at: DVec2, text: &str, params: &DrawParams) {
    if !text.is_empty() {
        surface.text(at, text, &params.font, &params.color);
    }
}

// ============================================================================
// Screen geometry
// ============================================================================

/// Distance from `p` to the segment `a`-`b`.
pub fn dist_to_segment(p: DVec2, a: DVec2, b: DVec2) -> f64 {
    let ab = b - a;
    let len2 = ab.length_squared();
    if len2 == 0.0 {
        return p.distance(a);
    }
    let t = ((p - a).dot(ab) / len2).clamp(0.0, 1.0);
    p.distance(a + ab * t)
}

/// Distance from `p` to the nearest edge of a polyline or polygon.
pub fn dist_to_path(p: DVec2, pts: &[DVec2], closed: bool) -> f64 {
    match pts {
        [] => f64::MAX,
        [only] => p.distance(*only),
        _ => {
            let open_edges = pts.windows(2).map(|w| dist_to_segment(p, w[0], w[1]));
            let closing = closed.then(|| dist_to_segment(p, pts[pts.len() - 1], pts[0]));
            open_edges.chain(closing).fold(f64::MAX, f64::min)
        }
    }
}

/// Even-odd point-in-polygon test
pub fn point_in_polygon(p: DVec2, poly: &[DVec2]) -> bool {
    if poly.len() < 3 {
        return false;
    }
    let mut inside = false;
    let mut j = poly.len() - 1;
    for i in 0..poly.len() {
        let (a, b) = (poly[i], poly[j]);
        if (a.y > p.y) != (b.y > p.y) && p.x < (b.x - a.x) * (p.y - a.y) / (b.y - a.y) + a.x {
            inside = !inside;
        }
        j = i;
    }
    inside
}

/// Centroid of the vertices (not the area centroid).
pub fn vertex_mean(pts: &[DVec2]) -> Option<DVec2> {
    if pts.is_empty() {
        None
    } else {
        Some(pts.iter().copied().sum::<DVec2>() / pts.len() as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::draw::def::DrawingDef;
    use crate::draw::object::DrawObject;
    use crate::surface::{CommandBuffer, DrawCommand};
    use crate::types::{Dims, Pt};

    fn params() -> DrawParams {
        DrawParams::resolve(&DrawingDef::default(), &DrawObject::point(Pt::screen(0.0, 0.0)))
    }

    #[test]
    fn x_symbol_commands() {
        let mut s = CommandBuffer::new(Dims::new(10, 10));
        draw_symbol(&mut s, DVec2::new(5.0, 5.0), Symbol::X, &params(), false);
        insta::assert_debug_snapshot!(s.commands().len(), @"6");
        assert!(matches!(s.commands()[0], DrawCommand::BeginPath { .. }));
        assert_eq!(s.commands()[5], DrawCommand::Stroke);
    }

    #[test]
    fn path_only_mode_skips_framing() {
        let mut s = CommandBuffer::new(Dims::new(10, 10));
        draw_symbol(&mut s, DVec2::new(5.0, 5.0), Symbol::Cross, &params(), true);
        assert!(s.commands().iter().all(|c| !c.is_framing()));
    }

    #[test]
    fn filled_polygon() {
        let mut s = CommandBuffer::new(Dims::new(10, 10));
        let p = DrawParams {
            style: Style::Fill,
            ..params()
        };
        draw_path(&mut s, &[DVec2::ZERO, DVec2::X, DVec2::ONE], true, &p, false);
        assert!(s.commands().contains(&DrawCommand::ClosePath));
        assert!(s.commands().contains(&DrawCommand::Fill(Color::named("green"))));
    }

    #[test]
    fn segment_distance() {
        let d = dist_to_segment(DVec2::new(5.0, 3.0), DVec2::ZERO, DVec2::new(10.0, 0.0));
        assert_eq!(d, 3.0);
        let end = dist_to_segment(DVec2::new(13.0, 4.0), DVec2::ZERO, DVec2::new(10.0, 0.0));
        assert_eq!(end, 5.0);
    }

    #[test]
    fn polygon_containment() {
        let square = [
            DVec2::ZERO,
            DVec2::new(4.0, 0.0),
            DVec2::new(4.0, 4.0),
            DVec2::new(0.0, 4.0),
        ];
        assert!(point_in_polygon(DVec2::new(2.0, 2.0), &square));
        assert!(!point_in_polygon(DVec2::new(5.0, 2.0), &square));
        assert_eq!(dist_to_path(DVec2::new(2.0, 2.0), &square, true), 2.0);
    }
}
