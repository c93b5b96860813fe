//! Overlay drawing layers for sky and image viewers.
//!
//! Producers build [`DrawObject`]s: plain annotations, MOC tiles from the
//! [`moc`] culler, traced footprints from [`contour`]. A [`DrawLayer`] holds
//! them per plot, [`LayerEngine::reduce`] applies actions to the layer set,
//! and a [`Drawer`] paints one layer on one plot, either at once or in
//! chunks polled by the host.
//!
//! Registries ([`DrawOpRegistry`], [`LayerFactoryRegistry`]) are plain values
//! built at startup and passed in; nothing here is global.

pub mod config;
pub mod contour;
pub mod convert;
pub mod draw;
pub mod errors;
pub mod layer;
pub mod log;
pub mod moc;
pub mod render;
pub mod surface;
pub mod types;

pub use config::{CullConfig, EngineConfig, RendererConfig};
pub use contour::{ConnectedObj, ImageLineFootprint};
pub use convert::{CoordConverter, LinearConverter, PlotView};
pub use draw::{DrawObject, DrawOp, DrawOpRegistry, DrawingDef};
pub use errors::{ConfigError, ContourError, MocError};
pub use layer::{Action, DrawLayer, DrawLayerRoot, LayerEngine, LayerFactory, LayerFactoryRegistry};
pub use moc::{MocGroup, MocLayerFactory, SkyView};
pub use render::{Drawer, DrawerStack, RenderOutcome, RenderTicket};
pub use surface::{CommandBuffer, RenderSurface, Surface};
pub use types::{Color, CoordSys, Dims, PlotId, Pt};
