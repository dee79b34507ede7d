#![forbid(unsafe_code)]

//! Cell types.
//!
//! A [`Cell`] holds one screen column worth of content: a lead rune, the
//! combining runes drawn on top of it, and the [`Style`] used to paint it.
//! Colors are [`PackedRgba`] values; `None` in a [`Style`] color slot means
//! "the terminal's default color".
//!
//! # Example
//!
//! ```
//! use tagterm_render::cell::{Cell, PackedRgba, Style, StyleFlags};
//!
//! let style = Style::new().fg(PackedRgba::RED).attrs(StyleFlags::BOLD);
//! let cell = Cell::from_char('x').with_style(style);
//! assert_eq!(cell.style.fg, Some(PackedRgba::RED));
//! ```

use smallvec::SmallVec;

/// A 32-bit RGBA color, packed as `0xRRGGBBAA`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(transparent)]
pub struct PackedRgba(pub u32);

impl PackedRgba {
    /// Fully transparent (alpha = 0).
    pub const TRANSPARENT: Self = Self(0);
    /// Opaque black.
    pub const BLACK: Self = Self::rgb(0, 0, 0);
    /// Opaque white.
    pub const WHITE: Self = Self::rgb(255, 255, 255);
    /// Opaque red.
    pub const RED: Self = Self::rgb(255, 0, 0);
    /// Opaque green (the W3C `green`, not `lime`).
    pub const GREEN: Self = Self::rgb(0, 128, 0);
    /// Opaque blue.
    pub const BLUE: Self = Self::rgb(0, 0, 255);

    /// Create an opaque RGB color (alpha = 255).
    #[inline]
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self::rgba(r, g, b, 255)
    }

    /// Create an RGBA color with explicit alpha.
    #[inline]
    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self(((r as u32) << 24) | ((g as u32) << 16) | ((b as u32) << 8) | (a as u32))
    }

    /// Create an opaque color from a `0xRRGGBB` value.
    #[inline]
    pub const fn from_hex(hex: u32) -> Self {
        Self::rgb((hex >> 16) as u8, (hex >> 8) as u8, hex as u8)
    }

    /// Red channel.
    #[inline]
    pub const fn r(self) -> u8 {
        (self.0 >> 24) as u8
    }

    /// Green channel.
    #[inline]
    pub const fn g(self) -> u8 {
        (self.0 >> 16) as u8
    }

    /// Blue channel.
    #[inline]
    pub const fn b(self) -> u8 {
        (self.0 >> 8) as u8
    }

    /// Alpha channel.
    #[inline]
    pub const fn a(self) -> u8 {
        self.0 as u8
    }

    /// Perceived luminance (BT.709) as a `u8` (0 = black, 255 = white).
    #[must_use]
    pub fn luminance_u8(self) -> u8 {
        let luma = 2126 * self.r() as u32 + 7152 * self.g() as u32 + 722 * self.b() as u32;
        ((luma + 5000) / 10_000) as u8
    }
}

impl core::fmt::Debug for PackedRgba {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r(), self.g(), self.b())?;
        if self.a() != 255 {
            write!(f, "/{:02x}", self.a())?;
        }
        Ok(())
    }
}

bitflags::bitflags! {
    /// 8-bit cell style flags.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct StyleFlags: u8 {
        /// Bold / increased intensity.
        const BOLD          = 0b0000_0001;
        /// Dim / decreased intensity.
        const DIM           = 0b0000_0010;
        /// Italic text.
        const ITALIC        = 0b0000_0100;
        /// Underlined text.
        const UNDERLINE     = 0b0000_1000;
        /// Blinking text.
        const BLINK         = 0b0001_0000;
        /// Reverse video (swap fg/bg).
        const REVERSE       = 0b0010_0000;
        /// Strikethrough text.
        const STRIKETHROUGH = 0b0100_0000;
        /// Hidden / invisible text.
        const HIDDEN        = 0b1000_0000;
    }
}

/// Fully resolved paint style for a cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Style {
    /// Foreground color; `None` is the terminal default.
    pub fg: Option<PackedRgba>,
    /// Background color; `None` is the terminal default.
    pub bg: Option<PackedRgba>,
    /// Text attributes.
    pub attrs: StyleFlags,
}

impl Style {
    /// A style with default colors and no attributes.
    #[inline]
    pub const fn new() -> Self {
        Self {
            fg: None,
            bg: None,
            attrs: StyleFlags::empty(),
        }
    }

    /// Set the foreground color.
    #[must_use]
    pub const fn fg(mut self, color: PackedRgba) -> Self {
        self.fg = Some(color);
        self
    }

    /// Set the background color.
    #[must_use]
    pub const fn bg(mut self, color: PackedRgba) -> Self {
        self.bg = Some(color);
        self
    }

    /// Replace the attribute set.
    #[must_use]
    pub const fn attrs(mut self, attrs: StyleFlags) -> Self {
        self.attrs = attrs;
        self
    }
}

/// One grid cell.
///
/// The trailing columns of a wide cluster hold a blank lead rune carrying the
/// same style as the cluster's first column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cell {
    /// The rune that determines the cell's width.
    pub lead: char,
    /// Combining runes drawn over `lead`.
    pub combining: SmallVec<[char; 2]>,
    /// Paint style.
    pub style: Style,
}

impl Default for Cell {
    fn default() -> Self {
        Self {
            lead: ' ',
            combining: SmallVec::new(),
            style: Style::new(),
        }
    }
}

impl Cell {
    /// A cell containing a single rune and the default style.
    #[inline]
    pub fn from_char(c: char) -> Self {
        Self {
            lead: c,
            ..Self::default()
        }
    }

    /// Replace the style.
    #[must_use]
    pub fn with_style(mut self, style: Style) -> Self {
        self.style = style;
        self
    }

    /// Display width of the lead rune (0, 1 or 2).
    #[inline]
    pub fn width(&self) -> usize {
        unicode_width::UnicodeWidthChar::width(self.lead).unwrap_or(0)
    }

    /// The cell content as a string: lead rune followed by combining runes.
    pub fn symbol(&self) -> String {
        let mut out = String::with_capacity(4 * (1 + self.combining.len()));
        out.push(self.lead);
        out.extend(self.combining.iter());
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rgb_channels_round_trip() {
        let c = PackedRgba::rgb(1, 2, 3);
        assert_eq!((c.r(), c.g(), c.b(), c.a()), (1, 2, 3, 255));
        assert_eq!(PackedRgba::from_hex(0x010203), c);
    }

    #[test]
    fn luminance_extremes() {
        assert_eq!(PackedRgba::BLACK.luminance_u8(), 0);
        assert_eq!(PackedRgba::WHITE.luminance_u8(), 255);
        assert!(PackedRgba::rgb(0, 255, 0).luminance_u8() > PackedRgba::rgb(0, 0, 255).luminance_u8());
    }

    #[test]
    fn debug_prints_hex() {
        assert_eq!(format!("{:?}", PackedRgba::rgb(255, 136, 0)), "#ff8800");
        assert_eq!(format!("{:?}", PackedRgba::TRANSPARENT), "#000000/00");
    }

    #[test]
    fn style_builder() {
        let s = Style::new()
            .fg(PackedRgba::WHITE)
            .bg(PackedRgba::BLUE)
            .attrs(StyleFlags::BOLD | StyleFlags::UNDERLINE);
        assert_eq!(s.fg, Some(PackedRgba::WHITE));
        assert_eq!(s.bg, Some(PackedRgba::BLUE));
        assert!(s.attrs.contains(StyleFlags::UNDERLINE));
    }

    #[test]
    fn cell_symbol_includes_combining() {
        let mut cell = Cell::from_char('e');
        cell.combining.push('\u{301}');
        assert_eq!(cell.symbol(), "e\u{301}");
        assert_eq!(cell.width(), 1);
        assert_eq!(Cell::from_char('漢').width(), 2);
    }
}
