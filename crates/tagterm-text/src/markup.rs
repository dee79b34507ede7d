#![forbid(unsafe_code)]

//! Bracket markup parsing.
//!
//! Three tag forms are recognized inside otherwise plain text:
//!
//! - Color tags `[fg:bg:attrs]`. Every field is optional; `-` resets a
//!   field and trailing fields may be dropped (`[red]`, `[:blue]`,
//!   `[::bu]`, `[-:-:-]`). Colors are letters or `#` plus six characters;
//!   attributes are letters from `lbdru`. `[]` is not a tag.
//! - Region tags `["id"]`, opening region `id`; `[""]` ends the region.
//!   Only recognized when [`Grammar::regions`] is set.
//! - Escapes: `[content[]` renders as `[content]`. One `[` before the final
//!   `]` is dropped, so `[content[[]` renders as `[content[]`.
//!
//! Brackets that form none of these are literal text.
//!
//! # Example
//!
//! ```
//! use tagterm_text::markup::{decompose, escape};
//!
//! let d = decompose("[red]Hello[-] [yellow:blue]world");
//! assert_eq!(d.stripped, "Hello world");
//! assert_eq!(d.width, 11);
//! assert_eq!(d.tags.len(), 3);
//!
//! assert_eq!(decompose(&escape("[red]")).stripped, "[red]");
//! ```

use std::borrow::Cow;
use std::ops::Range;
use std::sync::LazyLock;

use regex::{Captures, Regex};

use crate::grapheme;
use crate::style::{StyleState, Tri, parse_attrs};
use crate::units::ByteOffset;

static COLOR_TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"\[([a-zA-Z]+|#[0-9a-zA-Z]{6}|\-)?(:([a-zA-Z]+|#[0-9a-zA-Z]{6}|\-)?(:([lbdru]+|\-)?)?)?\]",
    )
    .unwrap()
});

static REGION_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"\["([a-zA-Z0-9_,;: \-\.]*)"\]"#).unwrap());

static ESCAPE_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r##"\[([a-zA-Z0-9_,;: \-\."#]+)\[(\[*)\]"##).unwrap());

static NON_ESCAPE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r##"(\[[a-zA-Z0-9_,;: \-\."#]+\[*)\]"##).unwrap());

/// Which tag forms to recognize.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Grammar {
    /// Color tags.
    pub colors: bool,
    /// Region tags.
    pub regions: bool,
    /// Escaped brackets.
    pub escapes: bool,
}

impl Grammar {
    /// Colors and escapes: what `print`, `word_wrap` and `string_width` read.
    pub const MARKUP: Self = Self {
        colors: true,
        regions: false,
        escapes: true,
    };

    /// Every tag form.
    pub const ALL: Self = Self {
        colors: true,
        regions: true,
        escapes: true,
    };

    /// No tags at all; text is taken literally.
    pub const PLAIN: Self = Self {
        colors: false,
        regions: false,
        escapes: false,
    };
}

impl Default for Grammar {
    fn default() -> Self {
        Self::MARKUP
    }
}

/// What a tag does.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TagKind {
    /// Style change.
    Color(StyleState),
    /// Start of a region (empty id ends the current one).
    Region(String),
    /// Escaped bracket; only the `[` at `span.end - 2` is removed.
    Escape,
}

/// One tag found in a source string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkupTag {
    /// Byte range in the source.
    pub span: Range<usize>,
    /// Byte offset in the stripped text where the tag sits.
    pub stripped_at: ByteOffset,
    /// Tag payload.
    pub kind: TagKind,
}

impl MarkupTag {
    /// Source position of the bracket an escape drops.
    pub fn escape_bracket(&self) -> Option<usize> {
        matches!(self.kind, TagKind::Escape).then(|| self.span.end - 2)
    }

    /// Bytes this tag removes from the source.
    fn removed_len(&self) -> usize {
        match self.kind {
            TagKind::Escape => 1,
            _ => self.span.len(),
        }
    }

    /// Stripped position of the removed bytes.
    fn removed_at(&self) -> usize {
        match self.kind {
            // The dropped `[` sits right before the escape's `]`.
            TagKind::Escape => self.stripped_at.get() + (self.span.len() - 2),
            _ => self.stripped_at.get(),
        }
    }
}

/// A source string split into tags and the text they leave behind.
#[derive(Debug, Clone)]
pub struct Decomposed<'a> {
    source: &'a str,
    /// Tags in source order, non-overlapping.
    pub tags: Vec<MarkupTag>,
    /// Text with tags removed and escapes resolved.
    pub stripped: String,
    /// Screen width of `stripped`.
    pub width: usize,
}

/// Decompose `text` with color tags and escapes.
pub fn decompose(text: &str) -> Decomposed<'_> {
    Decomposed::with_grammar(text, Grammar::MARKUP)
}

/// Screen width of `text` once color tags and escapes are removed.
pub fn string_width(text: &str) -> usize {
    decompose(text).width
}

/// Escape every bracket sequence so that none is read as a tag.
pub fn escape(text: &str) -> Cow<'_, str> {
    NON_ESCAPE.replace_all(text, "$1[]")
}

fn field(m: Option<regex::Match<'_>>) -> Tri<String> {
    match m.map(|m| m.as_str()) {
        None | Some("") => Tri::Unchanged,
        Some("-") => Tri::Reset,
        Some(value) => Tri::Set(value.to_string()),
    }
}

fn color_state(caps: &Captures<'_>) -> StyleState {
    let attrs = match caps.get(5).map(|m| m.as_str()) {
        None | Some("") => Tri::Unchanged,
        Some("-") => Tri::Reset,
        Some(letters) => Tri::Set(parse_attrs(letters)),
    };
    StyleState {
        fg: field(caps.get(1)),
        bg: field(caps.get(3)),
        attrs,
    }
}

impl<'a> Decomposed<'a> {
    /// Decompose `text`, recognizing only the tag forms `grammar` enables.
    pub fn with_grammar(text: &'a str, grammar: Grammar) -> Self {
        let mut found: Vec<(Range<usize>, TagKind)> = Vec::new();
        if grammar.colors {
            found.extend(
                COLOR_TAG
                    .captures_iter(text)
                    .filter_map(|caps| {
                        let m = caps.get(0)?;
                        (m.len() > 2).then(|| (m.range(), TagKind::Color(color_state(&caps))))
                    }),
            );
        }
        if grammar.regions {
            found.extend(REGION_TAG.captures_iter(text).filter_map(|caps| {
                let m = caps.get(0)?;
                let id = caps.get(1).map_or("", |id| id.as_str());
                Some((m.range(), TagKind::Region(id.to_string())))
            }));
        }
        if grammar.escapes {
            found.extend(
                ESCAPE_TAG
                    .find_iter(text)
                    .map(|m| (m.range(), TagKind::Escape)),
            );
        }
        found.sort_by_key(|(span, _)| span.start);

        let mut tags = Vec::with_capacity(found.len());
        let mut stripped = String::with_capacity(text.len());
        let mut from = 0;
        for (span, kind) in found {
            if span.start < from {
                continue;
            }
            stripped.push_str(&text[from..span.start]);
            let stripped_at = ByteOffset(stripped.len());
            if matches!(kind, TagKind::Escape) {
                stripped.push_str(&text[span.start..span.end - 2]);
                stripped.push(']');
            }
            from = span.end;
            tags.push(MarkupTag {
                span,
                stripped_at,
                kind,
            });
        }
        stripped.push_str(&text[from..]);
        let width = grapheme::plain_width(&stripped);

        Self {
            source: text,
            tags,
            stripped,
            width,
        }
    }

    /// The text this was decomposed from.
    pub fn source(&self) -> &'a str {
        self.source
    }

    /// Source offset of stripped position `pos`, past any tags sitting there.
    pub fn source_offset(&self, pos: usize) -> usize {
        pos + self
            .tags
            .iter()
            .take_while(|t| t.removed_at() <= pos)
            .map(MarkupTag::removed_len)
            .sum::<usize>()
    }

    /// Source offset of stripped position `pos`, before any tags sitting there.
    pub fn source_offset_before(&self, pos: usize) -> usize {
        pos + self
            .tags
            .iter()
            .take_while(|t| t.removed_at() < pos)
            .map(MarkupTag::removed_len)
            .sum::<usize>()
    }

    /// Tags whose stripped position lies in `range`.
    pub fn tags_in(&self, range: Range<usize>) -> impl Iterator<Item = &MarkupTag> + '_ {
        self.tags
            .iter()
            .filter(move |t| range.contains(&t.stripped_at.get()))
    }

    /// Style and region in effect just before stripped position `pos`,
    /// starting from `style` and `region`.
    pub fn fold_until(&self, pos: usize, style: &mut StyleState, region: &mut String) {
        for tag in self.tags.iter().take_while(|t| t.stripped_at.get() < pos) {
            match &tag.kind {
                TagKind::Color(delta) => style.apply(delta),
                TagKind::Region(id) => region.clone_from(id),
                TagKind::Escape => {}
            }
        }
    }

    /// The source text in `range`, with the dropped bracket of any escape
    /// that the range cuts through removed.
    pub fn excerpt(&self, range: Range<usize>) -> Cow<'a, str> {
        let source = self.source;
        let slice = &source[range.clone()];
        let orphans: Vec<usize> = self
            .tags
            .iter()
            .filter(|t| t.span.start < range.start || t.span.end > range.end)
            .filter_map(MarkupTag::escape_bracket)
            .filter(|pos| range.contains(pos))
            .collect();
        if orphans.is_empty() {
            return Cow::Borrowed(slice);
        }
        let mut out = String::with_capacity(slice.len());
        let mut from = range.start;
        for pos in orphans {
            out.push_str(&source[from..pos]);
            from = pos + 1;
        }
        out.push_str(&source[from..range.end]);
        Cow::Owned(out)
    }
}
