#![forbid(unsafe_code)]

//! Line breaking under a column budget.
//!
//! Break candidates in the stripped text are:
//! - after an ASCII punctuation mark (and any blanks following it),
//! - before a run of blanks (the run itself is dropped),
//! - at `\n`, which always breaks.
//!
//! A line that would overflow is cut at its last candidate, or hard-cut at
//! the budget when it has none. A single cluster wider than the budget gets
//! a line of its own.
//!
//! # Example
//! ```
//! use tagterm_text::wrap::word_wrap;
//!
//! let lines = word_wrap("The quick brown fox", 10);
//! assert_eq!(lines, vec!["The quick", "brown fox"]);
//!
//! // Tags are carried along and never counted.
//! let lines = word_wrap("[red]Hello[-] world", 5);
//! assert_eq!(lines, vec!["[red]Hello", "[-]world"]);
//! ```

use std::sync::LazyLock;

use regex::Regex;

use crate::grapheme::clusters;
use crate::markup::{TagKind, decompose};

static BOUNDARY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([[:punct:]][ \t\f\r]*)|(\n)|([ \t\f\r]+)").unwrap());

/// Text wrapping mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum WrapMode {
    /// No wrapping - lines may exceed width.
    None,
    /// Wrap at cluster boundaries.
    Char,
    /// Wrap at break candidates, falling back to cluster boundaries.
    #[default]
    Word,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BreakKind {
    Punct,
    Newline,
    Space,
}

#[derive(Debug, Clone, Copy)]
struct Breakpoint {
    at: usize,
    end: usize,
    kind: BreakKind,
}

/// One cut line, in stripped byte offsets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cut {
    /// End of the line's content.
    pub end: usize,
    /// Where the next line starts; the gap from `end` is dropped whitespace.
    pub next: usize,
    /// Columns of `start..end`.
    pub width: usize,
}

/// Cuts stripped text into lines one at a time.
#[derive(Debug, Clone)]
pub struct LineCutter<'t> {
    text: &'t str,
    breakpoints: Vec<Breakpoint>,
}

impl<'t> LineCutter<'t> {
    /// Index the break candidates of `text` (tag-free).
    pub fn new(text: &'t str) -> Self {
        let breakpoints = BOUNDARY
            .captures_iter(text)
            .filter_map(|caps| {
                let m = caps.get(0)?;
                let kind = if caps.get(1).is_some() {
                    BreakKind::Punct
                } else if caps.get(2).is_some() {
                    BreakKind::Newline
                } else {
                    BreakKind::Space
                };
                Some(Breakpoint {
                    at: m.start(),
                    end: m.end(),
                    kind,
                })
            })
            .collect();
        Self { text, breakpoints }
    }

    /// The text being cut.
    pub fn text(&self) -> &'t str {
        self.text
    }

    /// Cut the line starting at `start`. `None` once the text is exhausted.
    pub fn cut(&self, start: usize, width: usize, mode: WrapMode) -> Option<Cut> {
        let len = self.text.len();
        if start >= len {
            return None;
        }
        let words = mode == WrapMode::Word;
        let limit = if mode == WrapMode::None { usize::MAX } else { width };
        let first = self.breakpoints.partition_point(|b| b.at < start);
        let mut candidates = self.breakpoints[first..].iter().peekable();
        let mut line_width = 0;
        let mut last: Option<Cut> = None;

        for cluster in clusters(&self.text[start..]) {
            let pos = start + cluster.offset.get();
            while candidates.next_if(|b| b.at < pos).is_some() {}
            let here = candidates.next_if(|b| b.at == pos);

            if cluster.lead() == '\n' {
                return Some(Cut {
                    end: pos,
                    next: pos + cluster.len(),
                    width: line_width,
                });
            }
            if let Some(b) = here.filter(|b| words && b.kind == BreakKind::Space && pos > start) {
                last = Some(Cut {
                    end: pos,
                    next: b.end,
                    width: line_width,
                });
            }
            if line_width + cluster.width > limit {
                if let Some(cut) = last {
                    return Some(cut);
                }
                let end = if pos == start { pos + cluster.len() } else { pos };
                let width = if pos == start { cluster.width } else { line_width };
                return Some(Cut {
                    end,
                    next: end,
                    width,
                });
            }
            line_width += cluster.width;
            if let Some(b) = here.filter(|b| words && b.kind == BreakKind::Punct) {
                let end = pos + cluster.len();
                last = Some(Cut {
                    end,
                    next: b.end.max(end),
                    width: line_width,
                });
            }
        }

        Some(Cut {
            end: len,
            next: len,
            width: line_width,
        })
    }
}

/// Split markup `text` into lines of at most `width` columns.
///
/// Lines are cut from the source, so each keeps its tags; tags that fall
/// into dropped whitespace move to the start of the following line.
#[must_use]
pub fn word_wrap(text: &str, width: usize) -> Vec<String> {
    if width == 0 || text.is_empty() {
        return Vec::new();
    }
    let decomposed = decompose(text);
    let stripped = decomposed.stripped.as_str();
    let cutter = LineCutter::new(stripped);
    let mut lines = Vec::new();
    let mut start = 0;
    let mut dropped_from = 0;

    while let Some(cut) = cutter.cut(start, width, WrapMode::Word) {
        let mut line: String = decomposed
            .tags_in(dropped_from..start)
            .filter(|t| !matches!(t.kind, TagKind::Escape))
            .map(|t| &text[t.span.clone()])
            .collect();
        let src_start = decomposed.source_offset_before(start);
        let src_end = if cut.end == stripped.len() {
            text.len()
        } else {
            decomposed.source_offset_before(cut.end)
        };
        line.push_str(&decomposed.excerpt(src_start..src_end));
        lines.push(line);
        dropped_from = cut.end;
        start = cut.next;
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    // ==========================================================================
    // LineCutter
    // ==========================================================================

    #[test]
    fn cut_prefers_last_space() {
        let cutter = LineCutter::new("The quick brown fox");
        assert_eq!(
            cutter.cut(0, 10, WrapMode::Word),
            Some(Cut {
                end: 9,
                next: 10,
                width: 9
            })
        );
        assert_eq!(
            cutter.cut(10, 10, WrapMode::Word),
            Some(Cut {
                end: 19,
                next: 19,
                width: 9
            })
        );
        assert_eq!(cutter.cut(19, 10, WrapMode::Word), None);
    }

    #[test]
    fn char_mode_ignores_words() {
        let cutter = LineCutter::new("The quick");
        assert_eq!(cutter.cut(0, 5, WrapMode::Char).map(|c| c.end), Some(5));
    }

    #[test]
    fn none_mode_stops_only_at_newline() {
        let cutter = LineCutter::new("abcdef\ngh");
        let cut = cutter.cut(0, 2, WrapMode::None).unwrap();
        assert_eq!((cut.end, cut.next, cut.width), (6, 7, 6));
    }

    #[test]
    fn whitespace_run_is_dropped() {
        let cutter = LineCutter::new("abc    def");
        let cut = cutter.cut(0, 5, WrapMode::Word).unwrap();
        assert_eq!((cut.end, cut.next), (3, 7));
    }

    #[test]
    fn wide_cluster_alone() {
        let cutter = LineCutter::new("漢字");
        let cut = cutter.cut(0, 1, WrapMode::Word).unwrap();
        assert_eq!((cut.end, cut.next, cut.width), (3, 3, 2));
    }

    #[test]
    fn joiner_before_punctuation_does_not_stall_candidates() {
        // The '.' merges into the joined cluster; the later space still counts.
        let cutter = LineCutter::new("a\u{200D}. bb cc");
        let cut = cutter.cut(0, 5, WrapMode::Word).unwrap();
        assert_eq!(&"a\u{200D}. bb cc"[..cut.end], "a\u{200D}. bb");
    }

    // ==========================================================================
    // word_wrap
    // ==========================================================================

    #[test]
    fn wraps_at_spaces() {
        assert_eq!(word_wrap("The quick brown fox", 10), vec!["The quick", "brown fox"]);
    }

    #[test]
    fn wraps_after_punctuation() {
        assert_eq!(word_wrap("foo,bar baz", 5), vec!["foo,", "bar", "baz"]);
    }

    #[test]
    fn hard_cut_without_candidates() {
        assert_eq!(word_wrap("abcdefgh", 3), vec!["abc", "def", "gh"]);
    }

    #[test]
    fn newline_always_breaks() {
        assert_eq!(word_wrap("ab\ncd", 10), vec!["ab", "cd"]);
        assert_eq!(word_wrap("a\n\nb", 10), vec!["a", "", "b"]);
    }

    #[test]
    fn zero_width_or_empty() {
        assert!(word_wrap("abc", 0).is_empty());
        assert!(word_wrap("", 5).is_empty());
    }

    #[test]
    fn tags_stay_with_their_text() {
        assert_eq!(word_wrap("[red]Hello world", 5), vec!["[red]Hello", "world"]);
        assert_eq!(word_wrap("Hello [red]world", 5), vec!["Hello", "[red]world"]);
    }

    #[test]
    fn tags_in_dropped_whitespace_move_forward() {
        assert_eq!(word_wrap("Hello[red] world", 5), vec!["Hello", "[red]world"]);
        assert_eq!(word_wrap("Hello [red] world", 5), vec!["Hello", "[red]world"]);
    }

    #[test]
    fn split_escape_is_repaired() {
        // "ab[cd[]" renders as "ab[cd]"; '[' is a break candidate.
        let lines = word_wrap("ab[cd[]", 4);
        assert_eq!(lines, vec!["ab[", "cd]"]);
    }

    #[test]
    fn wide_cluster_exceeds_budget_alone() {
        assert_eq!(word_wrap("漢字", 1), vec!["漢", "字"]);
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use crate::markup::string_width;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn lines_fit_the_budget(s in "[a-z ,.\n]{0,48}", width in 1usize..16) {
            for line in word_wrap(&s, width) {
                prop_assert!(string_width(&line) <= width, "{:?} wider than {}", line, width);
            }
        }

        #[test]
        fn only_whitespace_is_dropped(s in "[a-z ,.]{0,48}", width in 1usize..16) {
            let kept: String = word_wrap(&s, width).concat().chars().filter(|c| !c.is_whitespace()).collect();
            let all: String = s.chars().filter(|c| !c.is_whitespace()).collect();
            prop_assert_eq!(kept, all);
        }

        #[test]
        fn tags_never_count(s in "[a-z ]{0,32}", width in 1usize..12) {
            let tagged = format!("[red]{s}");
            let plain = word_wrap(&s, width);
            let with_tags = word_wrap(&tagged, width);
            prop_assert_eq!(plain.len(), with_tags.len());
            for (p, t) in plain.iter().zip(&with_tags) {
                prop_assert_eq!(string_width(p), string_width(t));
            }
        }
    }
}
