//! Footprint outlines traced from run-length pixel coverage.
//!
//! A footprint arrives as a bounding box plus covered spans per row.
//! [`ConnectedObj`] fills in the holes it encloses, traces each 8-connected
//! region into a ring and caches the result; [`ImageLineFootprint`] turns a
//! batch of them into draw objects.

pub mod connected;
pub mod image_line;

pub use connected::{ConnectedObj, Outline, PixelBox, Segment, Segments, Span};
pub use image_line::{FootData, FootprintSet, ImageLineFootprint, PixelSys};
