#![forbid(unsafe_code)]

//! ANSI escape sequence translation.
//!
//! Turns the output of programs that color their text with SGR escape
//! sequences into color-tag markup. Everything else that an escape sequence
//! could do (cursor motion, titles, device queries) is dropped, except
//! `CSI n E`, which becomes `n` newlines, and `ESC c`, which becomes a full
//! style reset.
//!
//! # Design
//!
//! [`AnsiTranslator`] is a state machine fed raw bytes. It keeps its state
//! between calls, so sequences and UTF-8 runes split across reads translate
//! the same as if they had arrived in one piece.
//!
//! # DoS Protection
//!
//! Parameter and intermediate bytes of one control sequence are capped at
//! 256 bytes; longer sequences are abandoned.
//!
//! # Example
//!
//! ```
//! use tagterm_text::ansi::translate_ansi;
//!
//! let markup = translate_ansi("\x1b[31mHello\x1b[0m World");
//! assert_eq!(markup, "[red]Hello[-:-:-] World");
//! ```

use std::io::{self, Write};

use smallvec::SmallVec;

/// DoS protection: maximum parameter plus intermediate length of one CSI.
const MAX_CSI_LEN: usize = 256;

/// Tag emitted for a full reset.
pub const RESET_TAG: &str = "[-:-:-]";

/// The 16 basic and bright colors, in SGR order.
const PALETTE_16: [&str; 16] = [
    "black",
    "red",
    "green",
    "yellow",
    "blue",
    "darkmagenta",
    "darkcyan",
    "white",
    "#7f7f7f",
    "#ff0000",
    "#00ff00",
    "#ffff00",
    "#5c5cff",
    "#ff00ff",
    "#00ffff",
    "#ffffff",
];

/// Markup color for an entry of the 256-color palette.
pub fn palette_color(index: u8) -> String {
    match index {
        0..=15 => PALETTE_16[index as usize].to_string(),
        16..=231 => {
            let n = index as u32 - 16;
            let channel = |c: u32| 255 * c / 5;
            format!(
                "#{:02x}{:02x}{:02x}",
                channel(n / 36),
                channel((n / 6) % 6),
                channel(n % 6)
            )
        }
        232..=255 => {
            let grey = 255 * (index as u32 - 232) / 23;
            format!("#{grey:02x}{grey:02x}{grey:02x}")
        }
    }
}

/// Parser state machine states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum ParserState {
    /// Plain text.
    #[default]
    Text,
    /// After ESC (0x1B).
    Escape,
    /// Inside DCS/OSC/SOS/PM/APC content; waiting for ESC.
    Substring,
    /// After ESC [.
    ControlSequence,
}

/// Translates a byte stream containing ANSI escapes into markup.
#[derive(Debug, Clone, Default)]
pub struct AnsiTranslator {
    state: ParserState,
    parameters: String,
    intermediates: String,
    /// Leading bytes of a UTF-8 rune cut off at the end of the last feed.
    pending: SmallVec<[u8; 4]>,
}

impl AnsiTranslator {
    /// A translator in the text state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Translate `bytes`, returning the markup produced so far.
    ///
    /// An incomplete UTF-8 sequence at the end is held for the next call;
    /// invalid bytes become U+FFFD.
    pub fn feed(&mut self, bytes: &[u8]) -> String {
        let mut out = String::with_capacity(bytes.len());
        let joined;
        let mut input: &[u8] = if self.pending.is_empty() {
            bytes
        } else {
            let mut buf = std::mem::take(&mut self.pending).into_vec();
            buf.extend_from_slice(bytes);
            joined = buf;
            &joined
        };

        loop {
            match std::str::from_utf8(input) {
                Ok(text) => {
                    self.feed_str(text, &mut out);
                    break;
                }
                Err(err) => {
                    let (valid, rest) = input.split_at(err.valid_up_to());
                    // `valid` was just checked.
                    self.feed_str(std::str::from_utf8(valid).unwrap_or_default(), &mut out);
                    match err.error_len() {
                        Some(bad) => {
                            self.process_char(char::REPLACEMENT_CHARACTER, &mut out);
                            input = &rest[bad..];
                        }
                        None => {
                            self.pending.extend_from_slice(rest);
                            break;
                        }
                    }
                }
            }
        }
        out
    }

    /// Translate already-decoded text, appending to `out`.
    pub fn feed_str(&mut self, text: &str, out: &mut String) {
        for c in text.chars() {
            self.process_char(c, out);
        }
    }

    /// Release a held partial rune as U+FFFD.
    pub fn finish(&mut self) -> String {
        let mut out = String::new();
        if !self.pending.is_empty() {
            self.pending.clear();
            self.process_char(char::REPLACEMENT_CHARACTER, &mut out);
        }
        out
    }

    fn process_char(&mut self, c: char, out: &mut String) {
        match self.state {
            ParserState::Text => self.process_text(c, out),
            ParserState::Escape => self.process_escape(c, out),
            ParserState::Substring => {
                if c == '\x1b' {
                    self.state = ParserState::Escape;
                }
            }
            ParserState::ControlSequence => self.process_csi(c, out),
        }
    }

    fn process_text(&mut self, c: char, out: &mut String) {
        if c == '\x1b' {
            self.state = ParserState::Escape;
        } else {
            out.push(c);
        }
    }

    fn process_escape(&mut self, c: char, out: &mut String) {
        self.state = match c {
            '[' => {
                self.parameters.clear();
                self.intermediates.clear();
                ParserState::ControlSequence
            }
            'c' => {
                out.push_str(RESET_TAG);
                ParserState::Text
            }
            'P' | ']' | 'X' | '^' | '_' => ParserState::Substring,
            _ => {
                tracing::trace!(?c, "ignoring escape sequence");
                ParserState::Text
            }
        };
    }

    fn process_csi(&mut self, c: char, out: &mut String) {
        if self.parameters.len() + self.intermediates.len() >= MAX_CSI_LEN {
            tracing::trace!("control sequence too long; abandoned");
            self.state = ParserState::Text;
            return;
        }
        match c {
            '\x30'..='\x3f' => self.parameters.push(c),
            '\x20'..='\x2f' => self.intermediates.push(c),
            '\x40'..='\x7e' => {
                match c {
                    'E' => {
                        let count = self.parameters.parse::<usize>().unwrap_or(0).max(1);
                        out.extend(std::iter::repeat_n('\n', count));
                    }
                    'm' => sgr_tag(&self.parameters, out),
                    _ => tracing::trace!(
                        final_byte = ?c,
                        parameters = %self.parameters,
                        "ignoring control sequence"
                    ),
                }
                self.state = ParserState::Text;
            }
            _ => {
                tracing::trace!(?c, "invalid byte aborts control sequence");
                self.state = ParserState::Text;
            }
        }
    }
}

/// Fields accumulated over one SGR parameter list.
#[derive(Debug, Default)]
struct Sgr {
    fg: String,
    bg: String,
    attrs: String,
    clear: bool,
}

/// Append the tag for SGR parameters `params` (the text between `[` and `m`).
fn sgr_tag(params: &str, out: &mut String) {
    if params.is_empty() || params == "0" {
        out.push_str(RESET_TAG);
        return;
    }

    let fields: Vec<&str> = params.split(';').collect();
    let number = |i: usize| fields.get(i).and_then(|f| f.parse::<u32>().ok());
    let mut sgr = Sgr::default();
    let mut i = 0;
    while i < fields.len() {
        let field = fields[i];
        i += 1;
        match field {
            "1" | "01" => sgr.attrs.push('b'),
            "2" | "02" => sgr.attrs.push('d'),
            "4" | "04" => sgr.attrs.push('u'),
            "5" | "05" => sgr.attrs.push('l'),
            "7" | "07" => sgr.attrs.push('7'),
            "22" | "24" | "25" | "27" => {
                sgr.attrs.clear();
                sgr.clear = true;
            }
            "38" | "48" => {
                let color = match fields.get(i).copied() {
                    Some("5") => {
                        let color = number(i + 1).map(|n| palette_color(n.min(255) as u8));
                        i += 2;
                        color
                    }
                    Some("2") => {
                        let channel = |k: usize| number(k).unwrap_or(0).min(255);
                        let color = (i + 3 < fields.len()).then(|| {
                            format!(
                                "#{:02x}{:02x}{:02x}",
                                channel(i + 1),
                                channel(i + 2),
                                channel(i + 3)
                            )
                        });
                        i += 4;
                        color
                    }
                    _ => None,
                };
                if let Some(color) = color {
                    if field == "38" {
                        sgr.fg = color;
                    } else {
                        sgr.bg = color;
                    }
                }
            }
            _ => match field.parse::<u32>() {
                Ok(n @ 30..=37) => sgr.fg = PALETTE_16[(n - 30) as usize].to_string(),
                Ok(n @ 40..=47) => sgr.bg = PALETTE_16[(n - 40) as usize].to_string(),
                Ok(n @ 90..=97) => sgr.fg = PALETTE_16[(n - 90 + 8) as usize].to_string(),
                Ok(n @ 100..=107) => sgr.bg = PALETTE_16[(n - 100 + 8) as usize].to_string(),
                _ => {}
            },
        }
    }

    let attrs = if sgr.attrs.is_empty() && sgr.clear {
        "-"
    } else {
        sgr.attrs.as_str()
    };
    if !attrs.is_empty() {
        out.push_str(&format!("[{}:{}:{}]", sgr.fg, sgr.bg, attrs));
    } else if !sgr.bg.is_empty() {
        out.push_str(&format!("[{}:{}]", sgr.fg, sgr.bg));
    } else if !sgr.fg.is_empty() {
        out.push_str(&format!("[{}]", sgr.fg));
    }
}

/// Translate a complete string.
pub fn translate_ansi(text: &str) -> String {
    let mut translator = AnsiTranslator::new();
    let mut out = String::with_capacity(text.len());
    translator.feed_str(text, &mut out);
    out
}

/// Wrap `sink` so that everything written to it is translated first.
pub fn translate_stream<W: Write>(sink: W) -> AnsiWriter<W> {
    AnsiWriter::new(sink)
}

/// An [`io::Write`] adapter that translates ANSI escapes into markup.
///
/// # Example
///
/// ```
/// use std::io::Write;
/// use tagterm_text::ansi::AnsiWriter;
///
/// let mut writer = AnsiWriter::new(Vec::new());
/// writer.write_all(b"\x1b[1;32mok\x1b[").unwrap();
/// writer.write_all(b"0m").unwrap();
/// assert_eq!(writer.into_inner(), b"[green::b]ok[-:-:-]");
/// ```
#[derive(Debug)]
pub struct AnsiWriter<W: Write> {
    inner: W,
    translator: AnsiTranslator,
}

impl<W: Write> AnsiWriter<W> {
    /// Wrap `inner`.
    pub fn new(inner: W) -> Self {
        Self {
            inner,
            translator: AnsiTranslator::new(),
        }
    }

    /// The wrapped sink.
    pub fn get_ref(&self) -> &W {
        &self.inner
    }

    /// Unwrap, discarding any held partial rune.
    pub fn into_inner(self) -> W {
        self.inner
    }
}

impl<W: Write> Write for AnsiWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let markup = self.translator.feed(buf);
        self.inner.write_all(markup.as_bytes())?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(s: &str) -> String {
        translate_ansi(s)
    }

    // ==========================================================================
    // SGR
    // ==========================================================================

    #[test]
    fn basic_foreground_and_reset() {
        assert_eq!(t("\x1b[31mHello\x1b[0m World"), "[red]Hello[-:-:-] World");
    }

    #[test]
    fn empty_parameters_reset() {
        assert_eq!(t("\x1b[m"), RESET_TAG);
        assert_eq!(t("\x1b[0m"), RESET_TAG);
    }

    #[test]
    fn shortest_tag_form() {
        assert_eq!(t("\x1b[44m"), "[:blue]");
        assert_eq!(t("\x1b[1m"), "[::b]");
        assert_eq!(t("\x1b[31;42;4m"), "[red:green:u]");
    }

    #[test]
    fn bright_colors() {
        assert_eq!(t("\x1b[91m"), "[#ff0000]");
        assert_eq!(t("\x1b[104m"), "[:#5c5cff]");
        assert_eq!(t("\x1b[90m"), "[#7f7f7f]");
    }

    #[test]
    fn attribute_letters() {
        assert_eq!(t("\x1b[01;02;04;05m"), "[::bdul]");
        assert_eq!(t("\x1b[7m"), "[::7]");
    }

    #[test]
    fn clearing_attributes() {
        assert_eq!(t("\x1b[22m"), "[::-]");
        assert_eq!(t("\x1b[1;22m"), "[::-]");
        assert_eq!(t("\x1b[22;1m"), "[::b]");
    }

    #[test]
    fn zero_inside_a_list_is_ignored() {
        assert_eq!(t("\x1b[0;31m"), "[red]");
        assert_eq!(t("\x1b[0;1;31m"), "[red::b]");
        assert_eq!(t("\x1b[31;0m"), "[red]");
        assert_eq!(t("\x1b[00;0m"), "");
    }

    #[test]
    fn extended_256_colors() {
        assert_eq!(t("\x1b[38;5;1m"), "[red]");
        assert_eq!(t("\x1b[38;5;9m"), "[#ff0000]");
        assert_eq!(t("\x1b[48;5;16m"), "[:#000000]");
        assert_eq!(t("\x1b[38;5;231m"), "[#ffffff]");
        assert_eq!(t("\x1b[38;5;196m"), "[#ff0000]");
        assert_eq!(t("\x1b[38;5;232m"), "[#000000]");
        assert_eq!(t("\x1b[38;5;255m"), "[#ffffff]");
    }

    #[test]
    fn extended_parameters_are_consumed() {
        // "5" and "1" belong to the color and must not add blink or bold.
        assert_eq!(t("\x1b[38;5;1;4m"), "[red::u]");
    }

    #[test]
    fn true_color() {
        assert_eq!(t("\x1b[38;2;255;128;0m"), "[#ff8000]");
        assert_eq!(t("\x1b[48;2;1;2;3m"), "[:#010203]");
        assert_eq!(t("\x1b[38;2;999;0;0m"), "[#ff0000]");
        assert_eq!(t("\x1b[38;2;1m"), "");
    }

    #[test]
    fn unknown_parameters_emit_nothing() {
        assert_eq!(t("a\x1b[3mb"), "ab");
        assert_eq!(t("\x1b[38m"), "");
    }

    // ==========================================================================
    // Other sequences
    // ==========================================================================

    #[test]
    fn next_line() {
        assert_eq!(t("a\x1b[Eb"), "a\nb");
        assert_eq!(t("a\x1b[3Eb"), "a\n\n\nb");
        assert_eq!(t("a\x1b[0Eb"), "a\nb");
        assert_eq!(t("a\x1b[xyEb"), "ayEb");
    }

    #[test]
    fn full_reset() {
        assert_eq!(t("x\x1bcy"), "x[-:-:-]y");
    }

    #[test]
    fn other_sequences_are_dropped() {
        assert_eq!(t("a\x1b[2Jb"), "ab");
        assert_eq!(t("a\x1b[?25lb"), "ab");
        assert_eq!(t("a\x1b7b"), "ab");
    }

    #[test]
    fn substrings_are_dropped() {
        assert_eq!(t("a\x1b]0;title\x07\x1b\\b"), "ab");
        assert_eq!(t("a\x1bPqdata\x1b\\b"), "ab");
    }

    #[test]
    #[tracing_test::traced_test]
    fn ignored_sequences_are_traced() {
        assert_eq!(t("a\x1b[2Jb"), "ab");
        assert!(logs_contain("ignoring control sequence"));
    }

    #[test]
    fn invalid_byte_aborts_csi() {
        assert_eq!(t("a\x1b[1\x01b"), "ab");
    }

    #[test]
    fn overlong_csi_is_abandoned() {
        // The byte after the cap is swallowed along with the sequence.
        let body = "1;".repeat(200);
        let long = format!("\x1b[{body}mX");
        assert_eq!(t(&long), format!("{}mX", &body[MAX_CSI_LEN + 1..]));
    }

    // ==========================================================================
    // Streaming
    // ==========================================================================

    #[test]
    fn sequences_split_across_feeds() {
        let mut tr = AnsiTranslator::new();
        let mut out = tr.feed(b"a\x1b");
        out += &tr.feed(b"[3");
        out += &tr.feed(b"1mb");
        assert_eq!(out, "a[red]b");
    }

    #[test]
    fn runes_split_across_feeds() {
        let bytes = "é漢".as_bytes();
        let mut tr = AnsiTranslator::new();
        let mut out = String::new();
        for b in bytes {
            out += &tr.feed(std::slice::from_ref(b));
        }
        assert_eq!(out, "é漢");
    }

    #[test]
    fn invalid_utf8_is_replaced() {
        let mut tr = AnsiTranslator::new();
        assert_eq!(tr.feed(b"a\xffb"), "a\u{FFFD}b");
    }

    #[test]
    fn finish_releases_partial_rune() {
        let mut tr = AnsiTranslator::new();
        assert_eq!(tr.feed(&"漢".as_bytes()[..2]), "");
        assert_eq!(tr.finish(), "\u{FFFD}");
        assert_eq!(tr.finish(), "");
    }

    #[test]
    fn writer_forwards_translation() {
        let mut w = translate_stream(Vec::new());
        w.write_all(b"\x1b[33mwarn\x1b[m\n").unwrap();
        w.flush().unwrap();
        assert_eq!(String::from_utf8(w.into_inner()).unwrap(), "[yellow]warn[-:-:-]\n");
    }

    #[test]
    fn writer_propagates_sink_errors() {
        struct Broken;
        impl Write for Broken {
            fn write(&mut self, _: &[u8]) -> io::Result<usize> {
                Err(io::Error::other("closed"))
            }
            fn flush(&mut self) -> io::Result<()> {
                Ok(())
            }
        }
        let mut w = AnsiWriter::new(Broken);
        assert!(w.write(b"text").is_err());
    }

    #[test]
    fn grey_ramp_is_monotonic() {
        let greys: Vec<String> = (232..=255u8).map(palette_color).collect();
        for pair in greys.windows(2) {
            assert!(pair[0] < pair[1], "{pair:?}");
        }
    }
}
