#![forbid(unsafe_code)]

//! Line index for drawing a text buffer into a viewport.
//!
//! [`ReflowIndex::build`] turns buffer lines into [`LineRecord`]s, one per
//! screen row. Each record points back into its buffer line and remembers
//! the style and region in effect where it starts, so any record can be
//! drawn without rescanning the text before it.
//!
//! The index is rebuilt from scratch whenever anything it depends on
//! changes; there is no incremental update.
//!
//! # Example
//!
//! ```
//! use rustc_hash::FxHashSet;
//! use tagterm_text::reflow::{ReflowIndex, ReflowOptions};
//! use tagterm_text::width_cache::WidthCache;
//!
//! let lines = ["[red]The quick brown fox"];
//! let options = ReflowOptions::default().word_wrap(true).dynamic_colors(true);
//! let mut cache = WidthCache::new(16);
//! let index = ReflowIndex::build(&lines, &options, 10, &FxHashSet::default(), &mut cache);
//!
//! assert_eq!(index.len(), 2);
//! assert_eq!(index.records()[1].width, 9);
//! assert_eq!(index.longest_line(), 9);
//! ```

use rustc_hash::FxHashSet;

use crate::grapheme::{clusters, plain_width};
use crate::markup::{Decomposed, Grammar, MarkupTag, TagKind};
use crate::print::Align;
use crate::style::StyleState;
use crate::units::ByteOffset;
use crate::width_cache::WidthCache;
use crate::wrap::{Cut, LineCutter, WrapMode};

/// How buffer lines are turned into screen rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ReflowOptions {
    /// Break lines longer than the viewport.
    pub wrap: bool,
    /// When wrapping, break at spaces and after punctuation.
    pub word_wrap: bool,
    /// Recognize color tags and escapes.
    pub dynamic_colors: bool,
    /// Recognize region tags.
    pub regions: bool,
    /// Horizontal alignment of each row.
    pub align: Align,
}

impl Default for ReflowOptions {
    fn default() -> Self {
        Self {
            wrap: true,
            word_wrap: false,
            dynamic_colors: false,
            regions: false,
            align: Align::Left,
        }
    }
}

impl ReflowOptions {
    #[must_use]
    pub fn wrap(mut self, wrap: bool) -> Self {
        self.wrap = wrap;
        self
    }

    #[must_use]
    pub fn word_wrap(mut self, word_wrap: bool) -> Self {
        self.word_wrap = word_wrap;
        self
    }

    #[must_use]
    pub fn dynamic_colors(mut self, dynamic_colors: bool) -> Self {
        self.dynamic_colors = dynamic_colors;
        self
    }

    #[must_use]
    pub fn regions(mut self, regions: bool) -> Self {
        self.regions = regions;
        self
    }

    #[must_use]
    pub fn align(mut self, align: Align) -> Self {
        self.align = align;
        self
    }

    /// Wrapping mode implied by `wrap` and `word_wrap`.
    pub fn mode(&self) -> WrapMode {
        match (self.wrap, self.word_wrap) {
            (false, _) => WrapMode::None,
            (true, false) => WrapMode::Char,
            (true, true) => WrapMode::Word,
        }
    }

    /// Tag forms recognized in buffer lines. Escapes are honored whenever
    /// any tag form is.
    pub fn grammar(&self) -> Grammar {
        Grammar {
            colors: self.dynamic_colors,
            regions: self.regions,
            escapes: self.dynamic_colors || self.regions,
        }
    }
}

/// One screen row of the index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineRecord {
    /// Buffer line this row comes from.
    pub line: usize,
    /// Source byte range within that line, tags included.
    pub start: ByteOffset,
    pub end: ByteOffset,
    /// Screen width of the row's visible text.
    pub width: usize,
    /// Style folded from the start of the buffer line.
    pub style: StyleState,
    /// Region in effect at the row start.
    pub region: String,
}

/// Rows touched by highlighted regions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HighlightSpan {
    /// First row containing a highlighted cluster.
    pub first: usize,
    /// Last row containing a highlighted cluster.
    pub last: usize,
    /// Column of the first highlighted cluster within row `first`.
    pub column: usize,
}

/// Screen rows of a text buffer at one viewport width.
#[derive(Debug, Clone, Default)]
pub struct ReflowIndex {
    records: Vec<LineRecord>,
    highlight: Option<HighlightSpan>,
    longest_line: usize,
}

/// Applies tags in order as stripped positions are passed.
struct TagCursor<'d> {
    tags: &'d [MarkupTag],
    next: usize,
}

impl<'d> TagCursor<'d> {
    fn new(tags: &'d [MarkupTag]) -> Self {
        Self { tags, next: 0 }
    }

    fn advance(
        &mut self,
        mut due: impl FnMut(usize) -> bool,
        style: &mut StyleState,
        region: &mut String,
    ) {
        while let Some(tag) = self
            .tags
            .get(self.next)
            .filter(|t| due(t.stripped_at.get()))
        {
            match &tag.kind {
                TagKind::Color(delta) => style.apply(delta),
                TagKind::Region(id) => region.clone_from(id),
                TagKind::Escape => {}
            }
            self.next += 1;
        }
    }
}

impl ReflowIndex {
    /// Index `lines` for a viewport `width` columns wide.
    ///
    /// Without wrapping or regions a row is a whole line and only its width
    /// is needed; those widths come from `cache`.
    pub fn build<S: AsRef<str>>(
        lines: &[S],
        options: &ReflowOptions,
        width: usize,
        highlights: &FxHashSet<String>,
        cache: &mut WidthCache,
    ) -> Self {
        let mut index = Self::default();
        if width == 0 {
            return index;
        }
        let grammar = options.grammar();
        let mode = options.mode();
        let mut region = String::new();

        for (number, line) in lines.iter().enumerate() {
            let line = line.as_ref();
            if mode == WrapMode::None && !grammar.regions {
                index.records.push(LineRecord {
                    line: number,
                    start: ByteOffset(0),
                    end: ByteOffset(line.len()),
                    width: cache.markup_width(line, grammar),
                    style: StyleState::default(),
                    region: String::new(),
                });
                continue;
            }
            index.reflow_line(number, line, grammar, mode, width, highlights, &mut region);
        }

        index.longest_line = index.records.iter().map(|r| r.width).max().unwrap_or(0);
        tracing::debug!(
            lines = lines.len(),
            rows = index.records.len(),
            width,
            highlight = ?index.highlight,
            "reflowed text buffer"
        );
        index
    }

    #[allow(clippy::too_many_arguments)]
    fn reflow_line(
        &mut self,
        number: usize,
        line: &str,
        grammar: Grammar,
        mode: WrapMode,
        width: usize,
        highlights: &FxHashSet<String>,
        region: &mut String,
    ) {
        let decomposed = Decomposed::with_grammar(line, grammar);
        let stripped = decomposed.stripped.as_str();
        let cutter = LineCutter::new(stripped);
        let mut cursor = TagCursor::new(&decomposed.tags);
        let mut style = StyleState::default();
        let mut start = 0;
        let mut first = true;

        loop {
            let cut = match cutter.cut(start, width, mode) {
                Some(cut) => cut,
                // An empty line still takes a row.
                None if first => Cut {
                    end: 0,
                    next: 0,
                    width: 0,
                },
                None => break,
            };
            first = false;
            cursor.advance(|at| at < start, &mut style, region);

            let (mut end, mut row_width) = (cut.end, cut.width);
            if mode == WrapMode::Word {
                let kept = stripped[start..end].trim_end_matches(char::is_whitespace);
                if kept.len() < end - start {
                    end = start + kept.len();
                    row_width = plain_width(kept);
                }
            }
            let source_end = if end == stripped.len() {
                line.len()
            } else {
                decomposed.source_offset_before(end)
            };
            let record = LineRecord {
                line: number,
                start: ByteOffset(decomposed.source_offset_before(start)),
                end: ByteOffset(source_end),
                width: row_width,
                style: style.clone(),
                region: region.clone(),
            };

            if !highlights.is_empty() {
                let row = self.records.len();
                for cluster in clusters(&stripped[start..end]) {
                    let pos = start + cluster.offset.get();
                    cursor.advance(|at| at <= pos, &mut style, region);
                    if highlights.contains(region.as_str()) {
                        self.mark_highlight(row, cluster.column.get());
                    }
                }
            }
            self.records.push(record);
            start = cut.next;
        }
        cursor.advance(|_| true, &mut style, region);
    }

    fn mark_highlight(&mut self, row: usize, column: usize) {
        match &mut self.highlight {
            Some(span) => span.last = row,
            None => {
                self.highlight = Some(HighlightSpan {
                    first: row,
                    last: row,
                    column,
                });
            }
        }
    }

    pub fn records(&self) -> &[LineRecord] {
        &self.records
    }

    pub fn get(&self, row: usize) -> Option<&LineRecord> {
        self.records.get(row)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Rows touched by highlighted regions, if any.
    pub fn highlight(&self) -> Option<HighlightSpan> {
        self.highlight
    }

    /// Width of the widest row.
    pub fn longest_line(&self) -> usize {
        self.longest_line
    }
}

/// Visible text of region `id` across `lines`, tags removed, one `\n` after
/// each line the region spans to its end.
///
/// Empty when regions are off, `id` is empty, or the region never opens.
pub fn region_text<S: AsRef<str>>(lines: &[S], id: &str, options: &ReflowOptions) -> String {
    let mut out = String::new();
    if !options.regions || id.is_empty() {
        return out;
    }
    let grammar = options.grammar();
    let mut current = String::new();
    for line in lines {
        let decomposed = Decomposed::with_grammar(line.as_ref(), grammar);
        let stripped = decomposed.stripped.as_str();
        let mut from = 0;
        for tag in &decomposed.tags {
            let TagKind::Region(next) = &tag.kind else {
                continue;
            };
            let at = tag.stripped_at.get();
            if current == id {
                out.push_str(&stripped[from..at]);
                return out;
            }
            current.clone_from(next);
            from = at;
        }
        if current == id {
            out.push_str(&stripped[from..]);
            out.push('\n');
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::style::Tri;

    fn build(lines: &[&str], options: ReflowOptions, width: usize) -> ReflowIndex {
        ReflowIndex::build(
            lines,
            &options,
            width,
            &FxHashSet::default(),
            &mut WidthCache::new(64),
        )
    }

    fn build_highlighted(lines: &[&str], options: ReflowOptions, width: usize, ids: &[&str]) -> ReflowIndex {
        let highlights = ids.iter().map(|s| s.to_string()).collect();
        ReflowIndex::build(lines, &options, width, &highlights, &mut WidthCache::new(64))
    }

    fn spans(index: &ReflowIndex) -> Vec<(usize, usize, usize)> {
        index
            .records()
            .iter()
            .map(|r| (r.line, r.start.get(), r.end.get()))
            .collect()
    }

    // ==========================================================================
    // Records
    // ==========================================================================

    #[test]
    fn zero_width_is_empty() {
        assert!(build(&["abc"], ReflowOptions::default(), 0).is_empty());
    }

    #[test]
    fn no_wrap_one_row_per_line() {
        let options = ReflowOptions::default().wrap(false).dynamic_colors(true);
        let index = build(&["hello", "[red]hi", ""], options, 3);
        assert_eq!(spans(&index), vec![(0, 0, 5), (1, 0, 7), (2, 0, 0)]);
        assert_eq!(index.records()[1].width, 2);
        assert_eq!(index.longest_line(), 5);
    }

    #[test]
    fn tags_are_literal_without_dynamic_colors() {
        let index = build(&["[red]hi"], ReflowOptions::default().wrap(false), 10);
        assert_eq!(index.records()[0].width, 7);
    }

    #[test]
    fn char_wrap_cuts_at_budget() {
        let index = build(&["abcdef"], ReflowOptions::default(), 4);
        assert_eq!(spans(&index), vec![(0, 0, 4), (0, 4, 6)]);
    }

    #[test]
    fn empty_line_still_takes_a_row() {
        let index = build(&["a", "", "b"], ReflowOptions::default(), 4);
        assert_eq!(spans(&index), vec![(0, 0, 1), (1, 0, 0), (2, 0, 1)]);
    }

    #[test]
    fn word_wrap_drops_and_trims_whitespace() {
        let options = ReflowOptions::default().word_wrap(true);
        let index = build(&["hello world", "ab  "], options, 8);
        assert_eq!(spans(&index), vec![(0, 0, 5), (0, 6, 11), (1, 0, 2)]);
        assert_eq!(index.records()[2].width, 2);
    }

    #[test]
    fn rows_start_with_folded_style() {
        let options = ReflowOptions::default().word_wrap(true).dynamic_colors(true);
        let index = build(&["[red]abc def", "ghi"], options, 4);
        assert_eq!(spans(&index), vec![(0, 0, 8), (0, 9, 12), (1, 0, 3)]);
        assert_eq!(index.records()[0].style, StyleState::default());
        assert_eq!(index.records()[1].style.fg, Tri::Set("red".into()));
        // Style does not carry into the next buffer line.
        assert_eq!(index.records()[2].style, StyleState::default());
    }

    #[test]
    fn tag_at_row_start_belongs_to_the_row() {
        let options = ReflowOptions::default().dynamic_colors(true);
        let index = build(&["ab[red]cd"], options, 2);
        assert_eq!(spans(&index), vec![(0, 0, 2), (0, 2, 9)]);
        assert!(index.records()[1].style.is_empty());
    }

    #[test]
    fn region_carries_across_lines() {
        let options = ReflowOptions::default().regions(true);
        let index = build(&["x[\"a\"]y", "z", "[\"\"]w"], options, 10);
        let regions: Vec<&str> = index.records().iter().map(|r| r.region.as_str()).collect();
        assert_eq!(regions, vec!["", "a", "a"]);
    }

    // ==========================================================================
    // Highlights
    // ==========================================================================

    #[test]
    fn highlight_span_and_column() {
        let options = ReflowOptions::default().wrap(false).regions(true);
        let index = build_highlighted(&["pre", "ab [\"h\"]cd[\"\"] ef"], options, 20, &["h"]);
        assert_eq!(
            index.highlight(),
            Some(HighlightSpan {
                first: 1,
                last: 1,
                column: 3
            })
        );
    }

    #[test]
    fn highlight_spans_wrapped_rows() {
        let options = ReflowOptions::default().regions(true);
        let index = build_highlighted(&["[\"h\"]abcdefg", "after"], options, 3, &["h"]);
        assert_eq!(
            index.highlight(),
            Some(HighlightSpan {
                first: 0,
                last: 4,
                column: 0
            })
        );
    }

    #[test]
    fn closed_region_stops_highlight() {
        let options = ReflowOptions::default().regions(true);
        let index = build_highlighted(&["[\"h\"]ab[\"\"]", "after"], options, 10, &["h"]);
        let span = index.highlight().unwrap();
        assert_eq!((span.first, span.last), (0, 0));
    }

    #[test]
    fn no_highlight_without_match() {
        let options = ReflowOptions::default().regions(true);
        let index = build_highlighted(&["[\"a\"]text"], options, 10, &["b"]);
        assert_eq!(index.highlight(), None);
    }

    #[test]
    fn unwrapped_plain_rows_hit_the_cache() {
        let lines = ["one", "two", "three"];
        let options = ReflowOptions::default().wrap(false);
        let mut cache = WidthCache::new(16);
        let none = FxHashSet::default();
        ReflowIndex::build(&lines, &options, 80, &none, &mut cache);
        ReflowIndex::build(&lines, &options, 80, &none, &mut cache);
        assert_eq!(cache.stats().hits, 3);
    }

    // ==========================================================================
    // region_text
    // ==========================================================================

    #[test]
    fn region_text_spans_lines() {
        let options = ReflowOptions::default().regions(true);
        let lines = ["a [\"x\"]hello", "world[\"\"] b"];
        assert_eq!(region_text(&lines, "x", &options), "hello\nworld");
    }

    #[test]
    fn region_text_strips_color_tags() {
        let options = ReflowOptions::default().regions(true).dynamic_colors(true);
        let lines = ["[\"x\"][red]hot[-] stuff"];
        assert_eq!(region_text(&lines, "x", &options), "hot stuff\n");
    }

    #[test]
    fn region_text_needs_regions() {
        let lines = ["[\"x\"]hello"];
        assert_eq!(region_text(&lines, "x", &ReflowOptions::default()), "");
        let options = ReflowOptions::default().regions(true);
        assert_eq!(region_text(&lines, "", &options), "");
        assert_eq!(region_text(&lines, "y", &options), "");
    }
}
