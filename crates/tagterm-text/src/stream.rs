#![forbid(unsafe_code)]

//! Line buffer fed by a byte stream.
//!
//! Producers write arbitrary chunks; the stream turns them into lines. A
//! chunk may end in the middle of a UTF-8 rune or of a tag, so such tails
//! are held back until the next write completes them. Tabs become spaces
//! and `\n` or `\r\n` start a new line.
//!
//! # Example
//!
//! ```
//! use tagterm_text::markup::Grammar;
//! use tagterm_text::stream::TextStream;
//!
//! let mut stream = TextStream::new(4);
//! stream.write(b"one\ttwo\r\nth", Grammar::MARKUP);
//! stream.write(b"ree [re", Grammar::MARKUP);
//! assert_eq!(stream.lines(), ["one    two", "three "]);
//! assert_eq!(stream.held(), b"[re");
//!
//! stream.write(b"d]!", Grammar::MARKUP);
//! assert_eq!(stream.lines(), ["one    two", "three [red]!"]);
//! ```

use std::sync::LazyLock;

use regex::Regex;

use crate::markup::Grammar;

static OPEN_COLOR_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[([a-zA-Z]*|#[0-9a-zA-Z]*)$").unwrap());

static OPEN_REGION_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"\["[a-zA-Z0-9_,;: \-\.]*"?$"#).unwrap());

static NEWLINE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\r?\n").unwrap());

/// Default number of spaces a tab expands to.
pub const DEFAULT_TAB_SIZE: usize = 4;

/// Text lines built from streamed bytes.
#[derive(Debug, Clone)]
pub struct TextStream {
    lines: Vec<String>,
    held: Vec<u8>,
    tab: String,
}

impl Default for TextStream {
    fn default() -> Self {
        Self::new(DEFAULT_TAB_SIZE)
    }
}

impl TextStream {
    /// An empty stream expanding tabs to `tab_size` spaces.
    pub fn new(tab_size: usize) -> Self {
        Self {
            lines: Vec::new(),
            held: Vec::new(),
            tab: " ".repeat(tab_size),
        }
    }

    /// Append `bytes`, holding back any incomplete rune and, for the tag
    /// forms `grammar` enables, any tag still open at the end.
    ///
    /// Returns whether any line changed.
    pub fn write(&mut self, bytes: &[u8], grammar: Grammar) -> bool {
        let mut data = std::mem::take(&mut self.held);
        data.extend_from_slice(bytes);

        let tail = utf8_tail(&data);
        let mut text = String::from_utf8_lossy(&data[..tail]).into_owned();
        self.held = data[tail..].to_vec();

        if self.held.is_empty() {
            let mut open = text.len();
            if grammar.colors {
                if let Some(m) = OPEN_COLOR_TAG.find(&text) {
                    open = open.min(m.start());
                }
            }
            if grammar.regions {
                if let Some(m) = OPEN_REGION_TAG.find(&text) {
                    open = open.min(m.start());
                }
            }
            self.held = text.split_off(open).into_bytes();
        }
        if !self.held.is_empty() {
            tracing::trace!(held = self.held.len(), "holding incomplete tail");
        }
        self.append(&text)
    }

    /// Release a held open tag as plain text. An incomplete rune stays held.
    pub fn commit(&mut self) -> bool {
        match String::from_utf8(std::mem::take(&mut self.held)) {
            Ok(text) => self.append(&text),
            Err(err) => {
                self.held = err.into_bytes();
                false
            }
        }
    }

    fn append(&mut self, text: &str) -> bool {
        if text.is_empty() {
            return false;
        }
        let text = text.replace('\t', &self.tab);
        let mut pieces = NEWLINE.split(&text);
        if let Some(first) = pieces.next() {
            match self.lines.last_mut() {
                Some(last) => last.push_str(first),
                None => self.lines.push(first.to_string()),
            }
        }
        self.lines.extend(pieces.map(str::to_string));
        true
    }

    /// Drop all lines and held bytes.
    pub fn clear(&mut self) {
        self.lines.clear();
        self.held.clear();
    }

    /// Drop the first `count` lines.
    pub fn drain_front(&mut self, count: usize) {
        let count = count.min(self.lines.len());
        self.lines.drain(..count);
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// Bytes waiting for the rest of a rune or tag.
    pub fn held(&self) -> &[u8] {
        &self.held
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

/// Start of a trailing incomplete UTF-8 sequence, or `bytes.len()`.
fn utf8_tail(bytes: &[u8]) -> usize {
    let floor = bytes.len().saturating_sub(3);
    (floor..bytes.len())
        .rev()
        .find(|&i| bytes[i] & 0xC0 != 0x80)
        .filter(|&i| matches!(std::str::from_utf8(&bytes[i..]), Err(e) if e.error_len().is_none()))
        .unwrap_or(bytes.len())
}
