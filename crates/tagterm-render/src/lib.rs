#![forbid(unsafe_code)]

//! Character-cell surface: colors, style flags, cells, and an in-memory grid.
//!
//! Everything that draws text (the print engine and the text view) writes
//! through the [`Surface`] trait, so any grid that can store a lead rune, its
//! combining runes, and a [`Style`] per cell can be targeted.

pub mod buffer;
pub mod cell;
pub mod color;
pub mod geometry;
pub mod surface;

pub use buffer::Buffer;
pub use cell::{Cell, PackedRgba, Style, StyleFlags};
pub use color::ColorParseError;
pub use geometry::Rect;
pub use surface::Surface;
