//! Coordinate space marker types.
//!
//! These are zero-sized types (ZSTs) used as type parameters to distinguish
//! between different coordinate systems at compile time.

use std::fmt;

/// Marker type for image pixel coordinates (absolute values).
///
/// (0, 0) is the top-left corner of the decoded image. This is the source
/// of truth for every other coordinate system.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub enum Pixel {}

/// Marker type for normalized coordinates (0.0 to 1.0).
///
/// Normalized coordinates only ever appear in persisted label records.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub enum Normalized {}

/// Marker type for on-screen canvas coordinates.
///
/// Viewport coordinates are produced by a
/// [`Projection`](crate::geometry::Projection) and are only meaningful for
/// the canvas size that projection was computed for.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub enum Viewport {}

impl fmt::Debug for Pixel {
    fn fmt(&self, _: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {}
    }
}

impl fmt::Debug for Normalized {
    fn fmt(&self, _: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {}
    }
}

impl fmt::Debug for Viewport {
    fn fmt(&self, _: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {}
    }
}
