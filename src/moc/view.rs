//! The sky view the culler queries.

use std::collections::BTreeSet;

use glam::DVec2;

use super::healpix;
use crate::convert::{CoordConverter, LinearConverter};
use crate::types::Dims;

/// Screen samples are never spaced wider than this fraction of the view.
const MIN_SAMPLES_PER_SIDE: f64 = 8.0;
/// Give up on sampling beyond this many screen points.
const MAX_SAMPLES: usize = 250_000;

/// A [`CoordConverter`] that also knows its HiPS resolution and field of view.
pub trait SkyView: CoordConverter {
    /// HiPS order currently displayed
    fn hips_order(&self) -> u8;

    /// Field of view across the surface, in degrees
    fn fov_deg(&self) -> f64;

    /// Cells of `order` intersecting the view, or `None` when there are
    /// more than `limit` of them or the view cannot tell.
    fn visible_cells(&self, order: u8, limit: usize) -> Option<Vec<u64>> {
        sample_visible_cells(self, order, limit)
    }

    /// World positions of the view center and its four corners
    fn view_probes(&self) -> Vec<DVec2> {
        let Dims { width, height } = self.view_dims();
        let (w, h) = (f64::from(width), f64::from(height));
        [
            DVec2::new(w / 2.0, h / 2.0),
            DVec2::ZERO,
            DVec2::new(w, 0.0),
            DVec2::new(w, h),
            DVec2::new(0.0, h),
        ]
        .into_iter()
        .filter_map(|s| self.screen_to_world(s))
        .collect()
    }

    /// True when the world point lands on the surface.
    fn world_on_display(&self, world: DVec2) -> bool {
        self.world_to_screen(world)
            .is_some_and(|s| self.view_dims().contains(s))
    }
}

/// Cells hit by a grid of screen samples fine enough to land in every
/// cell of `order` that crosses the view, plus cells with a corner on screen.
pub fn sample_visible_cells<V: SkyView + ?Sized>(view: &V, order: u8, limit: usize) -> Option<Vec<u64>> {
    let Dims { width, height } = view.view_dims();
    if width == 0 || height == 0 {
        return Some(Vec::new());
    }
    let (w, h) = (f64::from(width), f64::from(height));
    let deg_per_px = view.arcsec_per_screen_pixel()? / 3600.0;
    let cell_px = healpix::cell_size_deg(order) / deg_per_px;
    let step = (cell_px / 2.0).min(w.min(h) / MIN_SAMPLES_PER_SIDE).max(1.0);
    let (nx, ny) = ((w / step).ceil() as usize + 1, (h / step).ceil() as usize + 1);
    if nx.saturating_mul(ny) > MAX_SAMPLES {
        return None;
    }

    let mut cells = BTreeSet::new();
    for j in 0..ny {
        let y = (j as f64 * step).min(h);
        for i in 0..nx {
            let x = (i as f64 * step).min(w);
            if let Some(world) = view.screen_to_world(DVec2::new(x, y)) {
                cells.insert(healpix::ang2pix(order, world));
                if cells.len() > limit {
                    return None;
                }
            }
        }
    }
    Some(cells.into_iter().collect())
}

impl SkyView for LinearConverter {
    fn hips_order(&self) -> u8 {
        self.arcsec_per_screen_pixel()
            .map_or(0, |arcsec| healpix::hips_order_for(arcsec / 3600.0))
    }

    fn fov_deg(&self) -> f64 {
        self.arcsec_per_screen_pixel()
            .map_or(0.0, |arcsec| arcsec / 3600.0 * f64::from(self.view.width))
    }
}
