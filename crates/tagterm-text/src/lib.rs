#![forbid(unsafe_code)]

//! Markup text for character-cell displays.
//!
//! This crate provides:
//! - [`ansi`] - translation of ANSI SGR escape sequences into color tags
//! - [`markup`] - the bracket tag grammar (`[fg:bg:attrs]`, `["region"]`, escapes)
//! - [`grapheme`] - clusters of a lead rune and its combining runes, with widths
//! - [`print`] - drawing one row of markup with clipping and alignment
//! - [`wrap`] - word wrapping under a column budget
//! - [`reflow`] - the row index a viewport draws from
//! - [`TextView`] - a scrollable viewport fed by a byte stream
//!
//! # Example
//! ```
//! use tagterm_render::buffer::Buffer;
//! use tagterm_render::cell::Style;
//! use tagterm_text::{Align, print, string_width, translate_ansi, word_wrap};
//!
//! let markup = translate_ansi("\x1b[31mHello\x1b[0m World");
//! assert_eq!(markup, "[red]Hello[-:-:-] World");
//! assert_eq!(string_width(&markup), 11);
//!
//! assert_eq!(word_wrap(&markup, 6), vec!["[red]Hello", "[-:-:-]World"]);
//!
//! let mut buf = Buffer::new(12, 1);
//! print(&mut buf, &markup, 0, 0, 12, Align::Right, Style::new());
//! assert_eq!(buf.row_text(0), " Hello World");
//! ```

pub mod ansi;
pub mod grapheme;
pub mod markup;
pub mod print;
pub mod reflow;
pub mod stream;
pub mod style;
pub mod units;
pub mod view;
pub mod width_cache;
pub mod wrap;

pub use ansi::{AnsiTranslator, AnsiWriter, translate_ansi, translate_stream};
pub use grapheme::{Cluster, clusters};
pub use markup::{Decomposed, Grammar, MarkupTag, TagKind, decompose, escape, string_width};
pub use print::{Align, Printed, print, print_simple, print_with_ellipsis};
pub use reflow::{LineRecord, ReflowIndex, ReflowOptions};
pub use stream::TextStream;
pub use style::{StyleState, Tri};
pub use units::{ByteOffset, RuneIndex, ScreenColumn};
pub use view::{TextView, ViewConfig};
pub use width_cache::{CacheStats, WidthCache};
pub use wrap::{WrapMode, word_wrap};
