//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use std::sync::{Arc, Once};

use glam::DVec2;
use skylayer::convert::{CoordConverter, LinearConverter, PlotView};
use skylayer::moc::SkyView;
use skylayer::types::Dims;

/// Install a test-writer subscriber once. Honors `RUST_LOG`.
pub fn init_tracing() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// A plate-carrée sky with a HiPS order pinned by the test.
#[derive(Clone, Debug)]
pub struct PlanarSky {
    pub cc: LinearConverter,
    pub hips_order: u8,
}

impl PlanarSky {
    pub fn new(center: DVec2, deg_per_px: f64, hips_order: u8) -> Self {
        PlanarSky {
            cc: LinearConverter::centered_on(Dims::new(256, 256), Dims::new(8192, 8192), center, deg_per_px),
            hips_order,
        }
    }
}

impl CoordConverter for PlanarSky {
    fn world_to_image(&self, world: DVec2) -> Option<DVec2> {
        self.cc.world_to_image(world)
    }

    fn image_to_world(&self, image: DVec2) -> Option<DVec2> {
        self.cc.image_to_world(image)
    }

    fn image_to_screen(&self, image: DVec2) -> Option<DVec2> {
        self.cc.image_to_screen(image)
    }

    fn screen_to_image(&self, screen: DVec2) -> Option<DVec2> {
        self.cc.screen_to_image(screen)
    }

    fn projection_identity(&self) -> u64 {
        self.cc.projection_identity()
    }

    fn zoom_factor(&self) -> f64 {
        self.cc.zoom_factor()
    }

    fn view_dims(&self) -> Dims {
        self.cc.view_dims()
    }

    fn data_dims(&self) -> Dims {
        self.cc.data_dims()
    }

    fn arcsec_per_image_pixel(&self) -> Option<f64> {
        self.cc.arcsec_per_image_pixel()
    }
}

impl SkyView for PlanarSky {
    fn hips_order(&self) -> u8 {
        self.hips_order
    }

    fn fov_deg(&self) -> f64 {
        self.cc.fov_deg()
    }
}

/// An image-only plot of the given size.
pub fn image_plot(plot_id: &str, size: u32) -> PlotView {
    PlotView::new(plot_id, Arc::new(LinearConverter::new(Dims::new(size, size), Dims::new(size, size))))
}

/// Deterministic pseudo-random sequence for property-style tests.
#[derive(Debug)]
pub struct Lcg(u64);

impl Lcg {
    pub fn new(seed: u64) -> Self {
        Lcg(seed)
    }

    pub fn next_below(&mut self, n: usize) -> usize {
        self.0 = self.0.wrapping_mul(6_364_136_223_846_793_005).wrapping_add(1_442_695_040_888_963_407);
        ((self.0 >> 33) % n as u64) as usize
    }
}
