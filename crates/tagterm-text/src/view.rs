#![forbid(unsafe_code)]

//! A scrollable viewport over streamed markup text.
//!
//! [`TextView`] owns a [`TextStream`] and draws it into any [`Surface`]. It
//! is written to through `&TextView`, so one thread can stream output into
//! it while another draws. A single lock guards all state; the changed
//! callback runs after the lock is released and may call back into the view.
//!
//! The [`ReflowIndex`] is built lazily on draw and dropped whenever the
//! content, the viewport width (when wrapping), the reflow options, or the
//! highlight set change.
//!
//! # Example
//!
//! ```
//! use std::io::Write;
//! use tagterm_render::buffer::Buffer;
//! use tagterm_render::geometry::Rect;
//! use tagterm_text::view::TextView;
//!
//! let view = TextView::new();
//! view.set_word_wrap(true);
//! let mut writer = &view;
//! write!(writer, "The quick brown fox").unwrap();
//!
//! let mut buf = Buffer::new(10, 2);
//! view.draw(&mut buf, Rect::from_size(10, 2));
//! assert_eq!(buf.row_text(0), "The quick ");
//! assert_eq!(buf.row_text(1), "brown fox ");
//! ```

use std::fmt;
use std::io::{self, Write};
use std::sync::Arc;

use parking_lot::Mutex;
use rustc_hash::FxHashSet;
use smallvec::SmallVec;
use tagterm_render::cell::{PackedRgba, Style};
use tagterm_render::geometry::Rect;
use tagterm_render::surface::Surface;

use crate::grapheme::clusters;
use crate::markup::{Decomposed, TagKind};
use crate::print::Align;
use crate::reflow::{self, ReflowIndex, ReflowOptions};
use crate::stream::{DEFAULT_TAB_SIZE, TextStream};
use crate::width_cache::WidthCache;

type ChangedFn = Arc<dyn Fn() + Send + Sync>;

/// Settings of a [`TextView`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ViewConfig {
    /// Keep all text and allow scrolling; otherwise lines scrolled out of
    /// view are discarded.
    pub scrollable: bool,
    /// Spaces per tab.
    pub tab_size: usize,
    /// Style text starts with.
    pub text_style: Style,
    /// How lines become rows.
    pub options: ReflowOptions,
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            scrollable: true,
            tab_size: DEFAULT_TAB_SIZE,
            text_style: Style::new(),
            options: ReflowOptions::default(),
        }
    }
}

impl ViewConfig {
    #[must_use]
    pub fn scrollable(mut self, scrollable: bool) -> Self {
        self.scrollable = scrollable;
        self
    }

    #[must_use]
    pub fn tab_size(mut self, tab_size: usize) -> Self {
        self.tab_size = tab_size;
        self
    }

    #[must_use]
    pub fn text_style(mut self, style: Style) -> Self {
        self.text_style = style;
        self
    }

    #[must_use]
    pub fn options(mut self, options: ReflowOptions) -> Self {
        self.options = options;
        self
    }
}

struct ViewState {
    config: ViewConfig,
    stream: TextStream,
    index: Option<ReflowIndex>,
    cache: WidthCache,
    highlights: FxHashSet<String>,
    last_width: usize,
    line_offset: isize,
    column_offset: isize,
    track_end: bool,
    page_size: usize,
    scroll_to_highlights: bool,
    changed: Option<ChangedFn>,
}

/// Streamed markup text drawn into a scrollable viewport.
pub struct TextView {
    state: Mutex<ViewState>,
}

impl fmt::Debug for TextView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("TextView")
            .field("config", &state.config)
            .field("lines", &state.stream.len())
            .field("line_offset", &state.line_offset)
            .field("column_offset", &state.column_offset)
            .field("track_end", &state.track_end)
            .finish_non_exhaustive()
    }
}

impl Default for TextView {
    fn default() -> Self {
        Self::new()
    }
}

impl TextView {
    /// An empty, scrollable, wrapping view.
    pub fn new() -> Self {
        Self::with_config(ViewConfig::default())
    }

    pub fn with_config(config: ViewConfig) -> Self {
        Self {
            state: Mutex::new(ViewState {
                config,
                stream: TextStream::new(config.tab_size),
                index: None,
                cache: WidthCache::default(),
                highlights: FxHashSet::default(),
                last_width: 0,
                line_offset: 0,
                column_offset: 0,
                track_end: !config.scrollable,
                page_size: 0,
                scroll_to_highlights: false,
                changed: None,
            }),
        }
    }

    pub fn config(&self) -> ViewConfig {
        self.state.lock().config
    }

    /// A non-scrollable view always shows the end of the text.
    pub fn set_scrollable(&self, scrollable: bool) {
        let mut state = self.state.lock();
        state.config.scrollable = scrollable;
        if !scrollable {
            state.track_end = true;
        }
    }

    pub fn set_wrap(&self, wrap: bool) {
        self.update_options("wrap changed", |o| o.wrap = wrap);
    }

    /// Break at spaces and after punctuation. Ignored without wrapping.
    pub fn set_word_wrap(&self, word_wrap: bool) {
        self.update_options("word wrap changed", |o| o.word_wrap = word_wrap);
    }

    pub fn set_align(&self, align: Align) {
        self.update_options("alignment changed", |o| o.align = align);
    }

    /// Recognize color tags and escapes in the text.
    pub fn set_dynamic_colors(&self, dynamic_colors: bool) {
        self.update_options("dynamic colors changed", |o| {
            o.dynamic_colors = dynamic_colors;
        });
    }

    /// Recognize region tags in the text.
    pub fn set_regions(&self, regions: bool) {
        self.update_options("regions changed", |o| o.regions = regions);
    }

    fn update_options(&self, cause: &'static str, update: impl FnOnce(&mut ReflowOptions)) {
        let mut state = self.state.lock();
        let before = state.config.options;
        update(&mut state.config.options);
        if state.config.options != before {
            state.invalidate(cause);
        }
    }

    pub fn set_text_style(&self, style: Style) {
        self.state.lock().config.text_style = style;
    }

    /// Called after every write, outside the view's lock.
    pub fn set_changed_fn(&self, changed: impl Fn() + Send + Sync + 'static) {
        self.state.lock().changed = Some(Arc::new(changed));
    }

    /// Replace the whole text.
    pub fn set_text(&self, text: &str) {
        let changed = {
            let mut state = self.state.lock();
            let grammar = state.config.options.grammar();
            state.stream.clear();
            state.cache.clear();
            state.stream.write(text.as_bytes(), grammar);
            state.stream.commit();
            state.invalidate("text replaced");
            state.changed.clone()
        };
        if let Some(changed) = changed {
            changed();
        }
    }

    /// Append raw bytes. Incomplete runes and tags are held until completed.
    pub fn append(&self, bytes: &[u8]) {
        let changed = {
            let mut state = self.state.lock();
            let grammar = state.config.options.grammar();
            if state.stream.write(bytes, grammar) {
                state.invalidate("text appended");
            }
            state.changed.clone()
        };
        if let Some(changed) = changed {
            changed();
        }
    }

    /// Release a held open tag as literal text.
    pub fn commit(&self) {
        let mut state = self.state.lock();
        if state.stream.commit() {
            state.invalidate("held text committed");
        }
    }

    /// Remove all text.
    pub fn clear(&self) {
        let mut state = self.state.lock();
        state.stream.clear();
        state.cache.clear();
        state.invalidate("text cleared");
    }

    /// Copy of the buffered lines.
    pub fn lines(&self) -> Vec<String> {
        self.state.lock().stream.lines().to_vec()
    }

    /// Highlight exactly the regions `ids`, ignoring empty ids.
    pub fn highlight<I, S>(&self, ids: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let highlights: FxHashSet<String> = ids
            .into_iter()
            .map(Into::into)
            .filter(|id: &String| !id.is_empty())
            .collect();
        let mut state = self.state.lock();
        state.highlights = highlights;
        state.invalidate("highlights changed");
    }

    /// Highlighted region ids, sorted.
    pub fn highlights(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.state.lock().highlights.iter().cloned().collect();
        ids.sort_unstable();
        ids
    }

    /// Bring the highlighted regions into view on the next draw.
    ///
    /// Does nothing without highlights or regions, or when not scrollable.
    pub fn scroll_to_highlight(&self) {
        let mut state = self.state.lock();
        if state.highlights.is_empty() || !state.config.scrollable || !state.config.options.regions {
            return;
        }
        state.invalidate("scrolling to highlight");
        state.scroll_to_highlights = true;
        state.track_end = false;
    }

    /// Text of region `id`, tags removed, lines joined with `\n`.
    pub fn region_text(&self, id: &str) -> String {
        let state = self.state.lock();
        reflow::region_text(state.stream.lines(), id, &state.config.options)
    }

    /// Scroll so that `row` is the first visible row and `column` columns
    /// are skipped. Offsets are clamped on the next draw.
    pub fn scroll_to(&self, row: usize, column: isize) {
        let mut state = self.state.lock();
        if !state.config.scrollable {
            return;
        }
        state.track_end = false;
        state.line_offset = row.try_into().unwrap_or(isize::MAX);
        state.column_offset = column;
    }

    pub fn scroll_to_beginning(&self) {
        let mut state = self.state.lock();
        if !state.config.scrollable {
            return;
        }
        state.track_end = false;
        state.line_offset = 0;
        state.column_offset = 0;
    }

    /// Show the last rows and keep following new text.
    pub fn scroll_to_end(&self) {
        let mut state = self.state.lock();
        if !state.config.scrollable {
            return;
        }
        state.track_end = true;
        state.column_offset = 0;
    }

    /// `(row, column)` skipped at the top left.
    pub fn scroll_offset(&self) -> (usize, isize) {
        let state = self.state.lock();
        (state.line_offset.max(0).unsigned_abs(), state.column_offset)
    }

    /// Move up by the height of the last draw.
    pub fn page_up(&self) {
        let mut state = self.state.lock();
        let page = state.page_size as isize;
        state.track_end = false;
        state.line_offset = state.line_offset.saturating_sub(page);
    }

    /// Move down by the height of the last draw.
    pub fn page_down(&self) {
        let mut state = self.state.lock();
        let page = state.page_size as isize;
        state.line_offset = state.line_offset.saturating_add(page);
    }

    /// Draw the visible rows into `area` of `surface`.
    pub fn draw<S: Surface + ?Sized>(&self, surface: &mut S, area: Rect) {
        let (width, height) = surface.size();
        let area = area.intersection(&Rect::from_size(width, height));
        self.state.lock().draw(surface, area);
    }
}

impl ViewState {
    fn invalidate(&mut self, cause: &'static str) {
        if self.index.take().is_some() {
            tracing::debug!(cause, "index invalidated");
        }
    }

    fn draw<S: Surface + ?Sized>(&mut self, surface: &mut S, area: Rect) {
        let width = area.width as usize;
        let height = area.height as usize;
        self.page_size = height;
        if width != self.last_width && self.config.options.wrap {
            self.invalidate("width changed");
        }
        self.last_width = width;
        if width == 0 {
            return;
        }

        let index = match self.index.take() {
            Some(index) => index,
            None => ReflowIndex::build(
                self.stream.lines(),
                &self.config.options,
                width,
                &self.highlights,
                &mut self.cache,
            ),
        };

        self.scroll_into_view(&index, width, height);
        let first = self.line_offset.unsigned_abs();
        for (row, record) in index.records().iter().enumerate().skip(first).take(height) {
            let y = area.y + (row - first) as u16;
            self.draw_row(surface, record, area.x, y, width);
        }

        if !self.config.scrollable && first > 0 {
            if let Some(record) = index.get(first) {
                tracing::debug!(lines = record.line, "purging lines scrolled out of view");
                self.stream.drain_front(record.line);
                return;
            }
        }
        self.index = Some(index);
    }

    /// Apply the pending highlight scroll and clamp both offsets.
    fn scroll_into_view(&mut self, index: &ReflowIndex, width: usize, height: usize) {
        let (width, height) = (width as isize, height as isize);
        if self.config.options.regions && self.scroll_to_highlights {
            if let Some(span) = index.highlight() {
                let (from, to) = (span.first as isize, span.last as isize);
                self.line_offset = if to - from + 1 < height {
                    (from + to - height) / 2
                } else {
                    from
                };
                let column = span.column as isize;
                if column.saturating_sub(self.column_offset) > 3 * width / 4 {
                    self.column_offset = column - width / 2;
                }
                if column.saturating_sub(self.column_offset) < 0 {
                    self.column_offset = column - width / 4;
                }
            }
        }
        self.scroll_to_highlights = false;

        let rows = index.len() as isize;
        if self.line_offset.saturating_add(height) > rows {
            self.track_end = true;
        }
        if self.track_end {
            self.line_offset = rows - height;
        }
        self.line_offset = self.line_offset.max(0);

        let longest = index.longest_line() as isize;
        self.column_offset = match self.config.options.align {
            Align::Left => self.column_offset.min(longest - width).max(0),
            Align::Right => self.column_offset.max(width - longest).min(0),
            Align::Center => {
                let half = (longest - width) / 2;
                if half > 0 {
                    self.column_offset.clamp(-half, half)
                } else {
                    0
                }
            }
        };
    }

    fn draw_row<S: Surface + ?Sized>(
        &self,
        surface: &mut S,
        record: &reflow::LineRecord,
        x: u16,
        y: u16,
        width: usize,
    ) {
        let Some(line) = self.stream.lines().get(record.line) else {
            return;
        };
        let options = &self.config.options;
        let grammar = options.grammar();
        let excerpt =
            Decomposed::with_grammar(line, grammar).excerpt(record.start.get()..record.end.get());
        let row = Decomposed::with_grammar(&excerpt, grammar);

        let (field, row_width) = (width as isize, record.width as isize);
        let start = match options.align {
            Align::Left => -self.column_offset,
            Align::Right => field - row_width - self.column_offset,
            Align::Center => (field - row_width) / 2 - self.column_offset,
        };
        let skip = if start < 0 { start.unsigned_abs() } else { 0 };
        let mut pos_x = start.max(0).unsigned_abs();

        let mut style = record.style.clone();
        let mut region = record.region.clone();
        let mut tags = row.tags.iter().peekable();
        let mut skipped = 0;
        for cluster in clusters(&row.stripped) {
            let at = cluster.offset.get();
            while let Some(tag) = tags.next_if(|t| t.stripped_at.get() <= at) {
                match &tag.kind {
                    TagKind::Color(delta) => style.apply(delta),
                    TagKind::Region(id) => region.clone_from(id),
                    TagKind::Escape => {}
                }
            }
            if !options.wrap && skipped < skip {
                skipped += cluster.width;
                continue;
            }
            if pos_x + cluster.width > width {
                break;
            }
            if cluster.width > 0 {
                let cx = x + pos_x as u16;
                let surface_bg = surface.get_cell(cx, y).and_then(|c| c.style.bg);
                let mut cell_style = style.overlay(self.config.text_style, surface_bg);
                if !region.is_empty() && self.highlights.contains(&region) {
                    cell_style = invert(cell_style);
                }
                let combining: SmallVec<[char; 4]> = cluster.combining().collect();
                surface.set_cell(cx, y, cluster.lead(), &combining, cell_style);
                for filler in 1..cluster.width {
                    surface.set_cell(cx + filler as u16, y, ' ', &[], cell_style);
                }
            }
            pos_x += cluster.width;
        }
    }
}

/// Swap foreground and background; a default background becomes white
/// behind dark text and black behind light text.
fn invert(style: Style) -> Style {
    let bg = style.bg.unwrap_or_else(|| match style.fg {
        Some(fg) if fg.luminance_u8() >= 128 => PackedRgba::BLACK,
        _ => PackedRgba::WHITE,
    });
    Style {
        fg: Some(bg),
        bg: style.fg,
        attrs: style.attrs,
    }
}

impl Write for &TextView {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.append(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Write for TextView {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        (&*self).write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
