//! Draw objects and the operations that act on them.
//!
//! - [`object`]: the [`DrawObject`] model and its geometry payloads
//! - [`def`]: the per-layer [`DrawingDef`] and effective [`DrawParams`]
//! - [`ops`]: two-level operation dispatch through [`DrawOpRegistry`]
//! - [`region`]: DS9 region serialization
//! - [`paint`]: surface helpers shared by the per-type operations
//!
//! The per-type operations live in [`point`], [`shape`], [`footprint`],
//! [`tool`] and [`moc_tile`].

pub mod def;
pub mod defaults;
pub mod footprint;
pub mod moc_tile;
pub mod object;
pub mod ops;
pub mod paint;
pub mod point;
pub mod region;
pub mod shape;
pub mod shift;
pub mod tool;

pub use def::{DrawParams, DrawingDef, FontSpec, Style, Symbol, TextLocation};
pub use object::{
    Distance, DrawKind, DrawList, DrawObject, Geometry, RenderOptions, ShapeKind, Unit, draw_list,
};
pub use ops::{DrawContext, DrawOp, DrawOpRegistry, OpEnv};
