#![forbid(unsafe_code)]

//! Style state carried by color tags.
//!
//! A color tag `[fg:bg:attrs]` changes only the fields it names. Each field
//! of a [`StyleState`] is therefore tri-state: left alone, reset to the base
//! style (`-`), or set to a value. Folding tags left to right with
//! [`StyleState::apply`] gives the state in effect at any point of a string;
//! [`StyleState::overlay`] resolves it into a concrete [`Style`].
//!
//! # Example
//!
//! ```
//! use tagterm_render::cell::{PackedRgba, Style};
//! use tagterm_text::style::{StyleState, Tri};
//!
//! let mut state = StyleState::default();
//! state.apply(&StyleState { fg: Tri::Set("red".into()), ..StyleState::default() });
//! state.apply(&StyleState { bg: Tri::Set("blue".into()), ..StyleState::default() });
//!
//! let style = state.overlay(Style::new(), None);
//! assert_eq!(style.fg, Some(PackedRgba::RED));
//! assert_eq!(style.bg, Some(PackedRgba::BLUE));
//! ```

use tagterm_render::cell::{PackedRgba, Style, StyleFlags};
use tagterm_render::color;

/// A field that a tag may leave alone, reset, or set.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum Tri<T> {
    /// Not mentioned.
    #[default]
    Unchanged,
    /// `-`: back to the base style.
    Reset,
    /// An explicit value.
    Set(T),
}

impl<T> Tri<T> {
    /// Whether the field carries no instruction.
    pub fn is_unchanged(&self) -> bool {
        matches!(self, Self::Unchanged)
    }

    fn merge(&mut self, other: &Self)
    where
        T: Clone,
    {
        if !other.is_unchanged() {
            *self = other.clone();
        }
    }
}

/// The combined effect of the color tags seen so far.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct StyleState {
    /// Foreground color name or `#rrggbb`.
    pub fg: Tri<String>,
    /// Background color name or `#rrggbb`.
    pub bg: Tri<String>,
    /// Attribute set.
    pub attrs: Tri<StyleFlags>,
}

impl StyleState {
    /// Fold `tag` into this state: every field the tag names overwrites ours.
    pub fn apply(&mut self, tag: &StyleState) {
        self.fg.merge(&tag.fg);
        self.bg.merge(&tag.bg);
        self.attrs.merge(&tag.attrs);
    }

    /// Whether no field has ever been set or reset.
    pub fn is_empty(&self) -> bool {
        self.fg.is_unchanged() && self.bg.is_unchanged() && self.attrs.is_unchanged()
    }

    /// Resolve against `base` and the background already on the surface.
    ///
    /// Unnamed fields keep `base`, except that an unnamed background keeps
    /// `surface_bg` unless `base` supplies its own. Unknown color names
    /// resolve to the terminal default.
    pub fn overlay(&self, base: Style, surface_bg: Option<PackedRgba>) -> Style {
        let fg = match &self.fg {
            Tri::Unchanged | Tri::Reset => base.fg,
            Tri::Set(name) => color::lookup(name),
        };
        let bg = match &self.bg {
            Tri::Unchanged if base.bg.is_none() => surface_bg,
            Tri::Unchanged | Tri::Reset => base.bg,
            Tri::Set(name) => color::lookup(name),
        };
        let attrs = match self.attrs {
            Tri::Unchanged | Tri::Reset => base.attrs,
            Tri::Set(flags) => flags,
        };
        Style { fg, bg, attrs }
    }
}

/// Parse tag attribute letters: `l` blink, `b` bold, `d` dim, `r` reverse,
/// `u` underline. Other letters are ignored.
pub fn parse_attrs(letters: &str) -> StyleFlags {
    letters.chars().fold(StyleFlags::empty(), |flags, c| {
        flags
            | match c {
                'l' => StyleFlags::BLINK,
                'b' => StyleFlags::BOLD,
                'd' => StyleFlags::DIM,
                'r' => StyleFlags::REVERSE,
                'u' => StyleFlags::UNDERLINE,
                _ => StyleFlags::empty(),
            }
    })
}
