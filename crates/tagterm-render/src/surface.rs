#![forbid(unsafe_code)]

//! The drawing target abstraction.

use crate::cell::{Cell, Style};

/// A grid of cells that text can be drawn into.
///
/// Writes outside the grid are ignored; reads outside it return `None`.
pub trait Surface {
    /// Grid size as `(width, height)` in cells.
    fn size(&self) -> (u16, u16);

    /// Store a lead rune, its combining runes, and a style at `(x, y)`.
    fn set_cell(&mut self, x: u16, y: u16, lead: char, combining: &[char], style: Style);

    /// The cell currently stored at `(x, y)`.
    fn get_cell(&self, x: u16, y: u16) -> Option<&Cell>;
}
