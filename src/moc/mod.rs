//! Multi-order coverage maps: HEALPix math, the culler and the MOC layer.

pub mod group;
pub mod healpix;
pub mod layer;
pub mod view;

pub use group::{Budget, CollectCursor, CollectProgress, MocGroup, MocTile};
pub use layer::{MocLayerFactory, MocPlotUpdate, MocSource, MocStep, TILES_COLLECTED};
pub use view::SkyView;
