//! HEALPix tiles produced by the MOC culler

use glam::DVec2;

use super::def::{DrawParams, DrawingDef, Style};
use super::object::{DrawKind, DrawObject, MocTileData};
use super::ops::{DrawContext, DrawOp, OpEnv};
use super::paint;
use super::region::{RegionBuilder, RegionFrame};
use super::shift;
use crate::types::Pt;

/// Fill opacity for tiles standing in for finer cells
pub const PARENT_TILE_OPACITY: f64 = 0.3;
/// Fill opacity for tiles drawn with [`Style::Fill`]
pub const FILL_OPACITY: f64 = 0.5;

#[derive(Debug)]
pub struct MocTileOps;

fn tile_of(obj: &DrawObject) -> Option<&MocTileData> {
    match &obj.kind {
        DrawKind::MocTile(t) => Some(t),
        _ => None,
    }
}

impl DrawOp for MocTileOps {
    fn draw(&self, obj: &DrawObject, ctx: &mut DrawContext<'_>) -> Option<()> {
        let tile = tile_of(obj)?;
        // a tile with any corner off the projection is skipped this frame
        let Some(corners) = shift::screen_points(&tile.corners, ctx.env.cc) else {
            return Some(());
        };
        let params = DrawParams::resolve(ctx.env.def, obj);
        let opacity = match (tile.is_parent_tile, params.style) {
            (true, _) => Some(PARENT_TILE_OPACITY),
            (false, Style::Fill) => Some(FILL_OPACITY),
            _ => None,
        };
        match opacity {
            Some(alpha) if !ctx.only_add_to_path => {
                let Some((first, rest)) = corners.split_first() else {
                    return Some(());
                };
                ctx.surface.begin_path(&params.color, params.line_width);
                ctx.surface.move_to(*first);
                for p in rest {
                    ctx.surface.line_to(*p);
                }
                ctx.surface.close_path();
                ctx.surface.fill(&params.color.with_alpha(alpha));
                ctx.surface.stroke();
            }
            _ => {
                let outline = DrawParams {
                    style: Style::Standard,
                    ..params
                };
                paint::draw_path(ctx.surface, &corners, true, &outline, ctx.only_add_to_path);
            }
        }
        Some(())
    }

    fn center_pt(&self, obj: &DrawObject, env: &OpEnv<'_>) -> Option<Pt> {
        shift::centroid(&tile_of(obj)?.corners, env.cc)
    }

    fn screen_dist(&self, obj: &DrawObject, env: &OpEnv<'_>, pt: DVec2) -> Option<f64> {
        let corners = shift::screen_points(&tile_of(obj)?.corners, env.cc)?;
        Some(paint::dist_to_path(pt, &corners, true))
    }

    fn to_region(&self, obj: &DrawObject, env: &OpEnv<'_>) -> Option<Vec<String>> {
        let tile = tile_of(obj)?;
        let params = DrawParams::resolve(env.def, obj);
        let line = RegionFrame::J2000
            .all_coords(env.cc, &tile.corners)
            .map(|coords| {
                RegionBuilder::new(RegionFrame::J2000, "polygon")
                    .pts(&coords)
                    .common(&params)
                    .build()
            });
        Some(line.into_iter().collect())
    }

    fn is_screen_point_inside(&self, obj: &DrawObject, env: &OpEnv<'_>, pt: DVec2) -> Option<bool> {
        let corners = shift::screen_points(&tile_of(obj)?.corners, env.cc)?;
        Some(paint::point_in_polygon(pt, &corners))
    }

    fn use_path_optimization(&self, obj: &DrawObject, def: &DrawingDef) -> Option<bool> {
        let tile = tile_of(obj)?;
        Some(!tile.is_parent_tile && obj.style.unwrap_or(def.style) == Style::Standard)
    }
}
