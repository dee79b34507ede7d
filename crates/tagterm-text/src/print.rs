#![forbid(unsafe_code)]

//! Drawing markup text into a single row of cells.
//!
//! [`print`] honors color tags and escapes, clips to a column budget, and
//! aligns left, right, or centered. Alignment is resolved by a measuring
//! pass that yields a [`Placement`]; the draw pass is always left-aligned.
//!
//! # Example
//!
//! ```
//! use tagterm_render::buffer::Buffer;
//! use tagterm_render::cell::{PackedRgba, Style};
//! use tagterm_text::print::{Align, print};
//!
//! let mut buf = Buffer::new(10, 1);
//! let printed = print(&mut buf, "[red]Hi", 0, 0, 10, Align::Left, Style::new());
//! assert_eq!(printed.width, 2);
//! assert_eq!(buf.get(0, 0).unwrap().style.fg, Some(PackedRgba::RED));
//! ```

use smallvec::SmallVec;
use tagterm_render::cell::Style;
use tagterm_render::surface::Surface;

use crate::grapheme::{Cluster, clusters};
use crate::markup::{Decomposed, TagKind, decompose};
use crate::style::StyleState;

/// Horizontal alignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Align {
    #[default]
    Left,
    Center,
    Right,
}

/// What a print call drew.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Printed {
    /// Source bytes up to the end of the last drawn cluster, tags included;
    /// the full length when nothing was clipped on the right.
    pub bytes: usize,
    /// Cells drawn.
    pub width: usize,
}

/// Where the left-aligned draw pass starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placement {
    /// Stripped byte offset of the first cluster to draw.
    pub start: usize,
    /// Columns to skip from the left edge of the field.
    pub indent: usize,
    /// Columns available from the indent onward.
    pub budget: usize,
}

/// Measure `decomposed` for a field of `max_width` columns.
pub fn place(decomposed: &Decomposed<'_>, max_width: usize, align: Align) -> Placement {
    let width = decomposed.width;
    let left = |indent: usize| Placement {
        start: 0,
        indent,
        budget: max_width - indent,
    };
    match align {
        Align::Left => left(0),
        Align::Right if width <= max_width => left(max_width - width),
        Align::Right => {
            let mut last = 0;
            for cluster in clusters(&decomposed.stripped) {
                let remaining = width - cluster.column.get();
                if remaining <= max_width {
                    return Placement {
                        start: cluster.offset.get(),
                        indent: max_width - remaining,
                        budget: remaining,
                    };
                }
                last = cluster.offset.get();
            }
            Placement {
                start: last,
                indent: 0,
                budget: max_width,
            }
        }
        Align::Center if width <= max_width => left((max_width - width) / 2),
        Align::Center => {
            let all: Vec<Cluster<'_>> = clusters(&decomposed.stripped).collect();
            let (mut lo, mut hi) = (0, all.len());
            let (mut chopped_left, mut chopped_right) = (0, 0);
            while hi > lo + 1 && width - chopped_left - chopped_right > max_width {
                if chopped_left < chopped_right {
                    chopped_left += all[lo].width;
                    lo += 1;
                } else {
                    hi -= 1;
                    chopped_right += all[hi].width;
                }
            }
            let kept = width - chopped_left - chopped_right;
            let indent = max_width.saturating_sub(kept) / 2;
            Placement {
                start: all.get(lo).map_or(0, |c| c.offset.get()),
                indent,
                budget: max_width - indent,
            }
        }
    }
}

/// Draw `text` at `(x, y)` within `max_width` columns.
///
/// Cells keep the background already on the surface unless a tag or `base`
/// sets one. A cluster that would overflow the budget is not drawn, nor is
/// anything after it.
pub fn print<S: Surface + ?Sized>(
    surface: &mut S,
    text: &str,
    x: u16,
    y: u16,
    max_width: usize,
    align: Align,
    base: Style,
) -> Printed {
    print_placed(surface, text, x, y, max_width, align, base).0
}

/// Draw `text` left-aligned with no width limit and the default style.
pub fn print_simple<S: Surface + ?Sized>(surface: &mut S, text: &str, x: u16, y: u16) -> Printed {
    print(surface, text, x, y, usize::MAX, Align::Left, Style::new())
}

/// Like [`print`], but marks truncation by replacing the cell on the
/// clipped side with `…`.
pub fn print_with_ellipsis<S: Surface + ?Sized>(
    surface: &mut S,
    text: &str,
    x: u16,
    y: u16,
    max_width: usize,
    align: Align,
    base: Style,
) -> Printed {
    let (printed, drawn_from, full_width) = print_placed(surface, text, x, y, max_width, align, base);
    if printed.width == 0 || full_width <= max_width {
        return printed;
    }
    let column = match align {
        Align::Right => drawn_from,
        Align::Left | Align::Center => drawn_from.saturating_add(printed.width - 1),
    };
    if let Ok(cx) = u16::try_from(column) {
        let style = surface.get_cell(cx, y).map_or(base, |c| c.style);
        surface.set_cell(cx, y, '…', &[], style);
    }
    printed
}

/// Returns the result, the first column drawn, and the stripped width.
fn print_placed<S: Surface + ?Sized>(
    surface: &mut S,
    text: &str,
    x: u16,
    y: u16,
    max_width: usize,
    align: Align,
    base: Style,
) -> (Printed, usize, usize) {
    if max_width == 0 || text.is_empty() {
        return (Printed::default(), x as usize, 0);
    }
    let decomposed = decompose(text);
    let placement = place(&decomposed, max_width, align);
    let mut state = StyleState::default();
    let mut region = String::new();
    decomposed.fold_until(placement.start, &mut state, &mut region);
    let left = (x as usize).saturating_add(placement.indent);
    let printed = draw_left(surface, &decomposed, &placement, left, y, state, base);
    (printed, left, decomposed.width)
}

/// The left-aligned draw pass shared by every alignment.
fn draw_left<S: Surface + ?Sized>(
    surface: &mut S,
    decomposed: &Decomposed<'_>,
    placement: &Placement,
    x: usize,
    y: u16,
    mut state: StyleState,
    base: Style,
) -> Printed {
    let start = placement.start;
    let mut tags = decomposed
        .tags
        .iter()
        .skip_while(|t| t.stripped_at.get() < start)
        .peekable();
    let mut drawn = 0;
    let mut end = start;
    let mut clipped = false;

    for cluster in clusters(&decomposed.stripped[start..]) {
        let pos = start + cluster.offset.get();
        if drawn + cluster.width > placement.budget {
            clipped = true;
            break;
        }
        while let Some(tag) = tags.next_if(|t| t.stripped_at.get() <= pos) {
            if let TagKind::Color(delta) = &tag.kind {
                state.apply(delta);
            }
        }
        if cluster.width > 0 {
            let Ok(cx) = u16::try_from(x.saturating_add(drawn)) else {
                clipped = true;
                break;
            };
            let surface_bg = surface.get_cell(cx, y).and_then(|c| c.style.bg);
            let style = state.overlay(base, surface_bg);
            let combining: SmallVec<[char; 4]> = cluster.combining().collect();
            surface.set_cell(cx, y, cluster.lead(), &combining, style);
            for filler in 1..cluster.width {
                if let Ok(fx) = u16::try_from(x.saturating_add(drawn + filler)) {
                    surface.set_cell(fx, y, ' ', &[], style);
                }
            }
        }
        drawn += cluster.width;
        end = pos + cluster.len();
    }

    let bytes = if clipped {
        decomposed.source_offset_before(end)
    } else {
        decomposed.source().len()
    };
    Printed {
        bytes,
        width: drawn,
    }
}
