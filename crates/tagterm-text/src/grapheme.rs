#![forbid(unsafe_code)]

//! Printable cluster segmentation.
//!
//! A cluster is a lead rune plus the runes that draw on top of it:
//! modifier letters (`Lm`), marks (`Mn`, `Mc`, `Me`), zero-width joiners,
//! and the rune immediately following a joiner. The cluster occupies as many
//! columns as its lead rune (0, 1 or 2); a cluster led by a mark occupies 0.
//!
//! This is not UAX #29 segmentation; regional indicators, Hangul jamo and
//! variation selectors outside the mark categories are separate clusters.
//!
//! # Example
//!
//! ```
//! use tagterm_text::grapheme::clusters;
//!
//! let forward: Vec<_> = clusters("e\u{301}漢").map(|c| (c.text, c.width)).collect();
//! assert_eq!(forward, vec![("e\u{301}", 1), ("漢", 2)]);
//!
//! let backward: Vec<_> = clusters("e\u{301}漢").rev().map(|c| c.column.get()).collect();
//! assert_eq!(backward, vec![1, 0]);
//! ```

use unicode_general_category::{GeneralCategory, get_general_category};
use unicode_width::UnicodeWidthChar;

use crate::units::{ByteOffset, RuneIndex, ScreenColumn};

/// Zero-width joiner.
pub const ZWJ: char = '\u{200D}';

/// Whether `c` attaches to the preceding cluster.
#[inline]
pub fn is_combining(c: char) -> bool {
    if c.is_ascii() {
        return false;
    }
    c == ZWJ
        || matches!(
            get_general_category(c),
            GeneralCategory::ModifierLetter
                | GeneralCategory::NonspacingMark
                | GeneralCategory::SpacingMark
                | GeneralCategory::EnclosingMark
        )
}

/// Columns occupied by a cluster whose lead rune is `c`.
#[inline]
pub fn rune_width(c: char) -> usize {
    if is_combining(c) {
        0
    } else {
        c.width().unwrap_or(0)
    }
}

/// Total columns of `text`, ignoring markup.
pub fn plain_width(text: &str) -> usize {
    clusters(text).map(|c| c.width).sum()
}

/// One printable cluster.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cluster<'a> {
    /// Lead rune followed by its combining runes.
    pub text: &'a str,
    /// Byte offset of the lead rune.
    pub offset: ByteOffset,
    /// Rune index of the lead rune.
    pub rune: RuneIndex,
    /// Screen column of the cluster's first cell.
    pub column: ScreenColumn,
    /// Cells occupied.
    pub width: usize,
}

impl<'a> Cluster<'a> {
    /// The rune that decides the width.
    pub fn lead(&self) -> char {
        self.text.chars().next().unwrap_or(' ')
    }

    /// Runes drawn on top of the lead.
    pub fn combining(&self) -> impl Iterator<Item = char> + 'a {
        self.text.chars().skip(1)
    }

    /// Byte length.
    #[inline]
    pub fn len(&self) -> usize {
        self.text.len()
    }

    /// Always false: a cluster holds at least its lead rune.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Byte offset just past the cluster.
    #[inline]
    pub fn end(&self) -> ByteOffset {
        self.offset + self.text.len()
    }
}

/// Iterate the clusters of `text` front to back; `.rev()` goes back to front.
pub fn clusters(text: &str) -> Clusters<'_> {
    Clusters {
        text,
        front: 0,
        back: text.len(),
        front_rune: 0,
        front_column: 0,
        back_position: None,
    }
}

/// Double-ended cluster iterator returned by [`clusters`].
#[derive(Debug, Clone)]
pub struct Clusters<'a> {
    text: &'a str,
    front: usize,
    back: usize,
    front_rune: usize,
    front_column: usize,
    /// `(rune, column)` at `back`, computed on the first `next_back`.
    back_position: Option<(usize, usize)>,
}

impl<'a> Clusters<'a> {
    fn back_position(&mut self) -> (usize, usize) {
        if let Some(pos) = self.back_position {
            return pos;
        }
        let rest = &self.text[self.front..self.back];
        let runes = rest.chars().count();
        let width: usize = Clusters {
            text: rest,
            front: 0,
            back: rest.len(),
            front_rune: 0,
            front_column: 0,
            back_position: None,
        }
        .map(|c| c.width)
        .sum();
        let pos = (self.front_rune + runes, self.front_column + width);
        self.back_position = Some(pos);
        pos
    }
}

impl<'a> Iterator for Clusters<'a> {
    type Item = Cluster<'a>;

    fn next(&mut self) -> Option<Cluster<'a>> {
        if self.front >= self.back {
            return None;
        }
        let rest = &self.text[self.front..self.back];
        let mut chars = rest.char_indices();
        let (_, lead) = chars.next()?;
        let mut prev = lead;
        let mut len = rest.len();
        let mut runes = 1;
        for (i, c) in chars {
            if !is_combining(c) && prev != ZWJ {
                len = i;
                break;
            }
            prev = c;
            runes += 1;
        }

        let width = rune_width(lead);
        let cluster = Cluster {
            text: &rest[..len],
            offset: ByteOffset(self.front),
            rune: RuneIndex(self.front_rune),
            column: ScreenColumn(self.front_column),
            width,
        };
        self.front += len;
        self.front_rune += runes;
        self.front_column += width;
        Some(cluster)
    }
}

impl<'a> DoubleEndedIterator for Clusters<'a> {
    fn next_back(&mut self) -> Option<Cluster<'a>> {
        if self.front >= self.back {
            return None;
        }
        let (back_rune, back_column) = self.back_position();
        let rest = &self.text[self.front..self.back];
        let mut rev = rest.char_indices().rev().peekable();
        let mut start = 0;
        let mut runes = 0;
        while let Some((i, c)) = rev.next() {
            runes += 1;
            match rev.peek() {
                None => {
                    start = i;
                    break;
                }
                Some(&(_, before)) if !is_combining(c) && before != ZWJ => {
                    start = i;
                    break;
                }
                Some(_) => {}
            }
        }

        let text = &rest[start..];
        let width = text.chars().next().map_or(0, rune_width);
        let rune = back_rune - runes;
        let column = back_column - width;
        let cluster = Cluster {
            text,
            offset: ByteOffset(self.front + start),
            rune: RuneIndex(rune),
            column: ScreenColumn(column),
            width,
        };
        self.back = self.front + start;
        self.back_position = Some((rune, column));
        Some(cluster)
    }
}

impl std::iter::FusedIterator for Clusters<'_> {}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(s: &str) -> Vec<&str> {
        clusters(s).map(|c| c.text).collect()
    }

    // ==========================================================================
    // Segmentation
    // ==========================================================================

    #[test]
    fn ascii_is_one_cluster_per_byte() {
        assert_eq!(texts("abc"), vec!["a", "b", "c"]);
        assert_eq!(plain_width("abc"), 3);
    }

    #[test]
    fn combining_marks_merge() {
        assert_eq!(texts("a\u{301}\u{302}b"), vec!["a\u{301}\u{302}", "b"]);
        assert_eq!(plain_width("a\u{301}b"), 2);
    }

    #[test]
    fn zwj_joins_following_rune() {
        let family = "👨\u{200D}👩\u{200D}👧";
        assert_eq!(texts(family), vec![family]);
        assert_eq!(plain_width(family), 2);
    }

    #[test]
    fn leading_mark_is_its_own_zero_width_cluster() {
        let c: Vec<_> = clusters("\u{301}a").collect();
        assert_eq!(c.len(), 2);
        assert_eq!(c[0].width, 0);
        assert_eq!(c[1].column, ScreenColumn(0));
    }

    #[test]
    fn modifier_letter_merges() {
        // U+02B0 MODIFIER LETTER SMALL H is Lm.
        assert_eq!(texts("t\u{2B0}x"), vec!["t\u{2B0}", "x"]);
    }

    #[test]
    fn wide_and_control_widths() {
        assert_eq!(rune_width('漢'), 2);
        assert_eq!(rune_width('\u{7}'), 0);
        assert_eq!(rune_width('\u{301}'), 0);
        assert_eq!(rune_width('a'), 1);
    }

    #[test]
    fn positions_are_cumulative() {
        let c: Vec<_> = clusters("a漢é!").collect();
        let cols: Vec<_> = c.iter().map(|c| c.column.get()).collect();
        let offs: Vec<_> = c.iter().map(|c| c.offset.get()).collect();
        let runes: Vec<_> = c.iter().map(|c| c.rune.get()).collect();
        assert_eq!(cols, vec![0, 1, 3, 4]);
        assert_eq!(offs, vec![0, 1, 4, 6]);
        assert_eq!(runes, vec![0, 1, 2, 3]);
    }

    #[test]
    fn lead_and_combining_accessors() {
        let c = clusters("o\u{308}").next().unwrap();
        assert_eq!(c.lead(), 'o');
        assert_eq!(c.combining().collect::<Vec<_>>(), vec!['\u{308}']);
        assert_eq!(c.end(), ByteOffset(3));
    }

    // ==========================================================================
    // Reverse iteration
    // ==========================================================================

    #[test]
    fn reverse_matches_forward() {
        let s = "x\u{301}漢👨\u{200D}👩 z";
        let mut fwd: Vec<_> = clusters(s).collect();
        fwd.reverse();
        let back: Vec<_> = clusters(s).rev().collect();
        assert_eq!(fwd, back);
    }

    #[test]
    fn meet_in_the_middle() {
        let mut it = clusters("abcd");
        assert_eq!(it.next().unwrap().text, "a");
        assert_eq!(it.next_back().unwrap().text, "d");
        let last = it.next_back().unwrap();
        assert_eq!((last.text, last.column.get()), ("c", 2));
        assert_eq!(it.next().unwrap().text, "b");
        assert!(it.next().is_none());
        assert!(it.next_back().is_none());
    }

    #[test]
    fn early_stop_reverse() {
        let last_two: Vec<_> = clusters("hello").rev().take(2).map(|c| c.text).collect();
        assert_eq!(last_two, vec!["o", "l"]);
    }

    #[test]
    fn empty_text() {
        assert!(clusters("").next().is_none());
        assert!(clusters("").next_back().is_none());
    }
}
