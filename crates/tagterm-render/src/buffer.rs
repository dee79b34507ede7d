#![forbid(unsafe_code)]

//! Buffer grid storage.
//!
//! The `Buffer` is a 2D grid of [`Cell`]s and the reference [`Surface`]
//! implementation.
//!
//! # Layout
//!
//! Cells are stored in row-major order: `index = y * width + x`.
//!
//! # Invariants
//!
//! 1. `cells.len() == width * height`
//! 2. Width and height never change after creation

use crate::cell::{Cell, Style};
use crate::surface::Surface;

/// A 2D grid of terminal cells.
///
/// # Example
///
/// ```
/// use tagterm_render::buffer::Buffer;
/// use tagterm_render::cell::Style;
/// use tagterm_render::surface::Surface;
///
/// let mut buffer = Buffer::new(80, 24);
/// buffer.set_cell(0, 0, 'H', &[], Style::new());
/// buffer.set_cell(1, 0, 'i', &[], Style::new());
/// assert_eq!(buffer.row_text(0).trim_end(), "Hi");
/// ```
#[derive(Debug, Clone)]
pub struct Buffer {
    width: u16,
    height: u16,
    cells: Vec<Cell>,
}

impl Buffer {
    /// Create a new buffer filled with blank default cells.
    pub fn new(width: u16, height: u16) -> Self {
        let size = width as usize * height as usize;
        Self {
            width,
            height,
            cells: vec![Cell::default(); size],
        }
    }

    /// Buffer width in cells.
    #[inline]
    pub const fn width(&self) -> u16 {
        self.width
    }

    /// Buffer height in cells.
    #[inline]
    pub const fn height(&self) -> u16 {
        self.height
    }

    #[inline]
    fn index_of(&self, x: u16, y: u16) -> Option<usize> {
        (x < self.width && y < self.height).then(|| y as usize * self.width as usize + x as usize)
    }

    /// Immutable access to a cell.
    pub fn get(&self, x: u16, y: u16) -> Option<&Cell> {
        self.index_of(x, y).map(|i| &self.cells[i])
    }

    /// Mutable access to a cell.
    pub fn get_mut(&mut self, x: u16, y: u16) -> Option<&mut Cell> {
        self.index_of(x, y).map(|i| &mut self.cells[i])
    }

    /// Replace a whole cell. Out-of-bounds writes are ignored.
    pub fn set(&mut self, x: u16, y: u16, cell: Cell) {
        match self.get_mut(x, y) {
            Some(slot) => *slot = cell,
            None => {
                #[cfg(feature = "tracing")]
                tracing::trace!(x, y, "write outside buffer ignored");
            }
        }
    }

    /// Fill every cell with `style` and a blank rune.
    pub fn fill(&mut self, style: Style) {
        for cell in &mut self.cells {
            *cell = Cell::default().with_style(style);
        }
    }

    /// Reset every cell to the default.
    pub fn clear(&mut self) {
        self.fill(Style::new());
    }

    /// The row's cell symbols concatenated, one entry per column.
    pub fn row_text(&self, y: u16) -> String {
        (0..self.width)
            .filter_map(|x| self.get(x, y))
            .map(Cell::symbol)
            .collect()
    }
}

impl Surface for Buffer {
    fn size(&self) -> (u16, u16) {
        (self.width, self.height)
    }

    fn set_cell(&mut self, x: u16, y: u16, lead: char, combining: &[char], style: Style) {
        let mut cell = Cell::from_char(lead).with_style(style);
        cell.combining.extend_from_slice(combining);
        self.set(x, y, cell);
    }

    fn get_cell(&self, x: u16, y: u16) -> Option<&Cell> {
        self.get(x, y)
    }
}
