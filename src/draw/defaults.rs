//! Default style values (region output omits properties equal to these)

pub const COLOR: &str = "green";
pub const SELECTED_COLOR: &str = "orange";
pub const HIGHLIGHT_COLOR: &str = "blue";
pub const LINE_WIDTH: f64 = 1.0;
pub const SYMBOL_SIZE: f64 = 4.0;
pub const FONT_NAME: &str = "helvetica";
pub const FONT_SIZE: &str = "9px";
pub const FONT_WEIGHT: &str = "normal";
pub const FONT_STYLE: &str = "normal";
/// Distance of a label from the object it annotates, in screen pixels
pub const TEXT_GAP: f64 = 6.0;
/// Half-size of the square drawn at a handled vertex
pub const HANDLE_SIZE: f64 = 3.0;
/// Line width used for highlight outlines
pub const HIGHLIGHT_LINE_WIDTH: f64 = 3.0;
/// Tolerance for hit-testing thin outlines, in screen pixels
pub const HIT_TOLERANCE: f64 = 3.0;
