//! Core annotation types for labelkit.
//!
//! This module defines the coordinate-space-aware geometry, the in-memory
//! [`Annotation`] sum type, and the persisted [`LabelRecord`] format.
//!
//! # Design Principles
//!
//! 1. **Type Safety**: Marker types keep image pixels, normalized values and
//!    canvas positions apart at compile time.
//!
//! 2. **Single Source of Truth**: Annotations are always held in image pixel
//!    space. Normalization happens only when a label file is written.
//!
//! # Example
//!
//! ```
//! use labelkit::ir::{normalize, Annotation, BBoxXYXY};
//!
//! let ann = Annotation::bbox(2u32, BBoxXYXY::from_xyxy(50.0, 50.0, 150.0, 150.0));
//! let record = normalize(&ann, 1000.0, 500.0).unwrap();
//! assert_eq!(record.to_string(), "2 0.100000 0.200000 0.100000 0.200000");
//! ```

mod bbox;
mod coord;
mod ids;
pub mod io_label;
mod label;
mod model;
mod space;

// Re-export core types for convenient access
pub use bbox::BBoxXYXY;
pub use coord::Coord;
pub use ids::ClassId;
#[cfg(feature = "fuzzing")]
pub use label::fuzz_parse_label_line;
pub use label::{denormalize, normalize, parse_label_line, LabelRecord};
pub use model::{Annotation, MIN_POLYGON_VERTICES};
pub use space::{Normalized, Pixel, Viewport};
