#![forbid(unsafe_code)]

//! Tagterm public facade crate.
//!
//! Re-exports the render and text crates and adds a small prelude.
//!
//! # Example
//! ```
//! use tagterm::prelude::*;
//!
//! let view = TextView::new();
//! view.set_dynamic_colors(true);
//! tagterm::pipe_ansi(&b"\x1b[32mok\x1b[0m\n"[..], &view).unwrap();
//!
//! let mut buf = Buffer::new(4, 1);
//! view.draw(&mut buf, Rect::from_size(4, 1));
//! assert_eq!(buf.row_text(0), "ok  ");
//! assert_eq!(tagterm::parse_color("green").unwrap(), PackedRgba::GREEN);
//! ```

use std::fmt;
use std::io::{self, Read, Write};

// --- Render re-exports -----------------------------------------------------

pub use tagterm_render::buffer::Buffer;
pub use tagterm_render::cell::{Cell, PackedRgba, Style, StyleFlags};
pub use tagterm_render::color::ColorParseError;
pub use tagterm_render::geometry::Rect;
pub use tagterm_render::surface::Surface;

// --- Text re-exports -------------------------------------------------------

pub use tagterm_text::{
    Align, AnsiTranslator, AnsiWriter, Grammar, Printed, ReflowOptions, TextStream, TextView,
    ViewConfig, WidthCache, WrapMode, decompose, escape, print, print_simple,
    print_with_ellipsis, string_width, translate_ansi, translate_stream, word_wrap,
};

// --- Errors ---------------------------------------------------------------

/// Top-level error type for tagterm.
#[derive(Debug)]
pub enum Error {
    /// I/O failure while reading or writing a stream.
    Io(io::Error),
    /// A color string that names no color.
    Color(ColorParseError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(err) => write!(f, "{err}"),
            Self::Color(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            Self::Color(err) => Some(err),
        }
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<ColorParseError> for Error {
    fn from(err: ColorParseError) -> Self {
        Self::Color(err)
    }
}

/// Standard result type for tagterm APIs.
pub type Result<T> = std::result::Result<T, Error>;

/// Parses a color name or `#rrggbb` triplet.
pub fn parse_color(name: &str) -> Result<PackedRgba> {
    Ok(name.parse::<PackedRgba>()?)
}

/// Copies ANSI-colored output from `reader` into `view` as markup.
///
/// Returns the number of bytes read. Partial escape sequences at the end of
/// the input are dropped.
pub fn pipe_ansi<R: Read>(mut reader: R, view: &TextView) -> Result<u64> {
    let mut writer = translate_stream(view);
    let copied = io::copy(&mut reader, &mut writer)?;
    writer.flush()?;
    Ok(copied)
}

// --- Prelude --------------------------------------------------------------

pub mod prelude {
    pub use crate::{
        Align, Buffer, Error, PackedRgba, Rect, Result, Style, StyleFlags, Surface, TextView,
        ViewConfig,
    };

    pub use crate::{render, text};
}

pub use tagterm_render as render;
pub use tagterm_text as text;
