//! Error types with diagnostics using miette
//!
//! Only the boundary constructors return these. The render, cull and reduce
//! paths turn failures into dropped items and a log line instead.

use miette::Diagnostic;
use thiserror::Error;

use crate::types::NumericError;

// ============================================================================
// MOC Errors
// ============================================================================

/// Errors raised while decoding multi-order coverage cells
#[derive(Error, Diagnostic, Debug, Clone, PartialEq, Eq)]
pub enum MocError {
    #[error("invalid NUNIQ value {value}")]
    #[diagnostic(
        code(skylayer::moc::invalid_nuniq),
        help("a NUNIQ value is 4 * 4^order + npix and must be at least 4")
    )]
    InvalidNuniq { value: u64 },

    #[error("HEALPix order {order} is out of range")]
    #[diagnostic(
        code(skylayer::moc::order_out_of_range),
        help("supported orders are 0 through {max}")
    )]
    OrderOutOfRange { order: u8, max: u8 },

    #[error("pixel {npix} does not exist at order {order}")]
    #[diagnostic(code(skylayer::moc::pixel_out_of_range))]
    PixelOutOfRange { order: u8, npix: u64 },
}

// ============================================================================
// Contour Errors
// ============================================================================

/// Errors raised while building a footprint outline from pixel spans
#[derive(Error, Diagnostic, Debug, Clone, PartialEq, Eq)]
pub enum ContourError {
    #[error("footprint has no covered spans")]
    #[diagnostic(code(skylayer::contour::empty_footprint))]
    EmptyFootprint,

    #[error("bounding box ({x1},{y1})-({x2},{y2}) is inverted")]
    #[diagnostic(code(skylayer::contour::inverted_bbox))]
    InvertedBBox { x1: i64, y1: i64, x2: i64, y2: i64 },

    #[error("span y={y} x={x1}..{x2} lies outside the bounding box")]
    #[diagnostic(
        code(skylayer::contour::span_outside_bbox),
        help("every span must satisfy x1 <= x2 and fall inside the footprint box")
    )]
    SpanOutsideBBox { y: i64, x1: i64, x2: i64 },
}

// ============================================================================
// Configuration Errors
// ============================================================================

/// Errors raised while loading engine configuration
#[derive(Error, Diagnostic, Debug)]
pub enum ConfigError {
    #[error("could not parse configuration")]
    #[diagnostic(code(skylayer::config::parse))]
    Parse(#[from] serde_json::Error),

    #[error("invalid value for `{field}`: {source}")]
    #[diagnostic(code(skylayer::config::invalid_value))]
    InvalidValue {
        field: &'static str,
        #[source]
        source: NumericError,
    },

    #[error("`{field}` must be at least {min}, got {value}")]
    #[diagnostic(code(skylayer::config::too_small))]
    TooSmall {
        field: &'static str,
        value: u64,
        min: u64,
    },
}
