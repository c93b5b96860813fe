//! Rendering draw lists onto surfaces.
//!
//! - [`drawer`]: one layer on one plot, with sync and chunked paths
//! - [`schedule`]: render tickets and the task registry
//! - [`stack`]: every drawer, kept in step with the layer state

pub mod drawer;
pub mod schedule;
pub mod stack;

pub use drawer::{Drawer, RenderOutcome, Selection, ViewSignature};
pub use schedule::{RenderTicket, StepOutcome, TaskCounter, TaskRegistry};
pub use stack::{DrawerStack, SurfaceMaker};
