//! Coordinate conversion seam.
//!
//! The engine never owns a projection. Every render, hit test and cull step
//! reads positions through a [`CoordConverter`] supplied by the host for the
//! plot being drawn.

use std::fmt;
use std::sync::Arc;

use glam::DVec2;

use crate::types::{CoordSys, Dims, PlotId, Pt};

/// Read-only conversion services for one plot at one moment.
pub trait CoordConverter: Send + Sync {
    fn world_to_image(&self, world: DVec2) -> Option<DVec2>;
    fn image_to_world(&self, image: DVec2) -> Option<DVec2>;
    fn image_to_screen(&self, image: DVec2) -> Option<DVec2>;
    fn screen_to_image(&self, screen: DVec2) -> Option<DVec2>;

    /// Changes whenever the projection (not the zoom or scroll) changes.
    fn projection_identity(&self) -> u64;
    fn zoom_factor(&self) -> f64;
    /// Size of the drawing surface
    fn view_dims(&self) -> Dims;
    /// Size of the underlying image data
    fn data_dims(&self) -> Dims;
    /// Image pixel scale, when the plot has a sky projection
    fn arcsec_per_image_pixel(&self) -> Option<f64>;

    fn world_to_screen(&self, world: DVec2) -> Option<DVec2> {
        self.world_to_image(world)
            .and_then(|image| self.image_to_screen(image))
    }

    fn screen_to_world(&self, screen: DVec2) -> Option<DVec2> {
        self.screen_to_image(screen)
            .and_then(|image| self.image_to_world(image))
    }

    fn arcsec_per_screen_pixel(&self) -> Option<f64> {
        self.arcsec_per_image_pixel()
            .map(|scale| scale / self.zoom_factor())
    }

    fn to_screen(&self, pt: &Pt) -> Option<DVec2> {
        match pt.sys {
            CoordSys::Screen => Some(pt.vec()),
            CoordSys::Image => self.image_to_screen(pt.vec()),
            CoordSys::World => self.world_to_screen(pt.vec()),
        }
    }

    fn to_image(&self, pt: &Pt) -> Option<DVec2> {
        match pt.sys {
            CoordSys::Screen => self.screen_to_image(pt.vec()),
            CoordSys::Image => Some(pt.vec()),
            CoordSys::World => self.world_to_image(pt.vec()),
        }
    }

    fn to_world(&self, pt: &Pt) -> Option<DVec2> {
        match pt.sys {
            CoordSys::Screen => self.screen_to_world(pt.vec()),
            CoordSys::Image => self.image_to_world(pt.vec()),
            CoordSys::World => Some(pt.vec()),
        }
    }

    /// Convert a point into another coordinate space.
    fn convert(&self, pt: &Pt, sys: CoordSys) -> Option<Pt> {
        let v = match sys {
            CoordSys::Screen => self.to_screen(pt)?,
            CoordSys::Image => self.to_image(pt)?,
            CoordSys::World => self.to_world(pt)?,
        };
        Some(Pt::new(v.x, v.y, sys))
    }

    /// True when the point projects onto the visible surface.
    fn point_on_display(&self, pt: &Pt) -> bool {
        self.to_screen(pt)
            .is_some_and(|s| self.view_dims().contains(s))
    }
}

/// One plot's identity plus the converter valid for the current frame
#[derive(Clone)]
pub struct PlotView {
    pub plot_id: PlotId,
    pub cc: Arc<dyn CoordConverter>,
}

impl PlotView {
    pub fn new(plot_id: impl Into<PlotId>, cc: Arc<dyn CoordConverter>) -> Self {
        PlotView {
            plot_id: plot_id.into(),
            cc,
        }
    }
}

impl fmt::Debug for PlotView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlotView")
            .field("plot_id", &self.plot_id)
            .field("projection", &self.cc.projection_identity())
            .field("zoom", &self.cc.zoom_factor())
            .finish()
    }
}

/// Linear sky mapping: degrees per image pixel around a reference pixel
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct WorldMapping {
    /// World position (lon, lat degrees) of the reference pixel
    pub crval: DVec2,
    /// Reference pixel in image coordinates
    pub crpix: DVec2,
    /// Degrees per image pixel; x is usually negative (east to the left)
    pub cdelt: DVec2,
}

/// Plate-carrée projection with a zoomed, scrolled image-to-screen map.
///
/// Screen y grows downward while image y grows upward. `origin` is the image
/// position shown at the top-left corner of the surface.
#[derive(Clone, Debug, PartialEq)]
pub struct LinearConverter {
    pub view: Dims,
    pub data: Dims,
    pub zoom: f64,
    pub origin: DVec2,
    pub world: Option<WorldMapping>,
}

impl LinearConverter {
    /// Image-only plot showing the image at zoom 1 from its top-left corner.
    pub fn new(view: Dims, data: Dims) -> Self {
        LinearConverter {
            view,
            data,
            zoom: 1.0,
            origin: DVec2::new(0.0, data.height as f64),
            world: None,
        }
    }

    /// Sky plot centered on `center` (lon, lat degrees) at `deg_per_pixel` and zoom 1.
    pub fn centered_on(view: Dims, data: Dims, center: DVec2, deg_per_pixel: f64) -> Self {
        let crpix = data.center();
        LinearConverter {
            view,
            data,
            zoom: 1.0,
            origin: DVec2::new(
                crpix.x - view.width as f64 / 2.0,
                crpix.y + view.height as f64 / 2.0,
            ),
            world: Some(WorldMapping {
                crval: center,
                crpix,
                cdelt: DVec2::new(-deg_per_pixel, deg_per_pixel),
            }),
        }
    }

    /// Zoom about the center of the surface.
    pub fn with_zoom(mut self, zoom: f64) -> Self {
        let center_image = self.screen_to_image_raw(self.view.center());
        self.zoom = zoom;
        let half = self.view.center() / zoom;
        self.origin = DVec2::new(center_image.x - half.x, center_image.y + half.y);
        self
    }

    pub fn with_origin(mut self, origin: DVec2) -> Self {
        self.origin = origin;
        self
    }

    fn screen_to_image_raw(&self, s: DVec2) -> DVec2 {
        DVec2::new(s.x / self.zoom + self.origin.x, self.origin.y - s.y / self.zoom)
    }
}

impl CoordConverter for LinearConverter {
    fn world_to_image(&self, world: DVec2) -> Option<DVec2> {
        let w = self.world?;
        if !world.is_finite() || world.y.abs() > 90.0 {
            return None;
        }
        let dlon = wrap_degrees(world.x - w.crval.x);
        let dlat = world.y - w.crval.y;
        Some(DVec2::new(
            w.crpix.x + dlon / w.cdelt.x,
            w.crpix.y + dlat / w.cdelt.y,
        ))
    }

    fn image_to_world(&self, image: DVec2) -> Option<DVec2> {
        let w = self.world?;
        let lat = w.crval.y + (image.y - w.crpix.y) * w.cdelt.y;
        if !lat.is_finite() || lat.abs() > 90.0 {
            return None;
        }
        let lon = (w.crval.x + (image.x - w.crpix.x) * w.cdelt.x).rem_euclid(360.0);
        Some(DVec2::new(lon, lat))
    }

    fn image_to_screen(&self, image: DVec2) -> Option<DVec2> {
        image.is_finite().then(|| {
            DVec2::new(
                (image.x - self.origin.x) * self.zoom,
                (self.origin.y - image.y) * self.zoom,
            )
        })
    }

    fn screen_to_image(&self, screen: DVec2) -> Option<DVec2> {
        screen.is_finite().then(|| self.screen_to_image_raw(screen))
    }

    fn projection_identity(&self) -> u64 {
        match self.world {
            None => 0,
            Some(w) => [w.crval.x, w.crval.y, w.crpix.x, w.crpix.y, w.cdelt.x, w.cdelt.y]
                .iter()
                .fold(0xcbf2_9ce4_8422_2325_u64, |h, v| {
                    (h ^ v.to_bits()).wrapping_mul(0x0100_0000_01b3)
                }),
        }
    }

    fn zoom_factor(&self) -> f64 {
        self.zoom
    }

    fn view_dims(&self) -> Dims {
        self.view
    }

    fn data_dims(&self) -> Dims {
        self.data
    }

    fn arcsec_per_image_pixel(&self) -> Option<f64> {
        self.world.map(|w| w.cdelt.y.abs() * 3600.0)
    }
}

/// Wrap an angle difference into [-180, 180).
pub fn wrap_degrees(d: f64) -> f64 {
    (d + 180.0).rem_euclid(360.0) - 180.0
}
