//! Raw-markup and final-text coordinate spaces.
//!
//! A lyric line is authored with `[chord]` spans embedded in it. Offsets into
//! that authored line ([`RawOffset`]) and offsets into the text left after the
//! spans are stripped ([`TextOffset`]) are different quantities. The only way
//! to get from one to the other is [`ChordMarkup::to_text_offset`].

use core::ops::Range;

use smallvec::SmallVec;

/// Character offset into a markup line, brackets included.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RawOffset(pub usize);

/// Character offset into the final lyric text, brackets removed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TextOffset(pub usize);

/// One `[...]` span in a markup line.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BracketSpan {
    /// Raw offset of the `[`.
    pub start: RawOffset,
    /// Raw offset one past the `]`.
    pub end: RawOffset,
    /// Byte range of the whole span, brackets included.
    pub bytes: Range<usize>,
}

impl BracketSpan {
    /// Characters removed from the line when this span is stripped.
    pub fn char_len(&self) -> usize {
        self.end.0 - self.start.0
    }
}

/// Bracket spans located in one markup line.
#[derive(Clone, Debug)]
pub struct ChordMarkup<'a> {
    raw: &'a str,
    spans: SmallVec<[BracketSpan; 8]>,
}

impl<'a> ChordMarkup<'a> {
    /// Locate every `[` and pair it with the next `]`.
    ///
    /// A `[` with no closing `]` after it is ordinary text, as is a `]` that
    /// was not opened.
    pub fn scan(raw: &'a str) -> Self {
        let mut spans = SmallVec::new();
        let mut open: Option<(usize, usize)> = None;
        for (char_idx, (byte_idx, ch)) in raw.char_indices().enumerate() {
            match (ch, open) {
                ('[', None) => open = Some((char_idx, byte_idx)),
                (']', Some((start_char, start_byte))) => {
                    spans.push(BracketSpan {
                        start: RawOffset(start_char),
                        end: RawOffset(char_idx + 1),
                        bytes: start_byte..byte_idx + 1,
                    });
                    open = None;
                }
                _ => {}
            }
        }
        Self { raw, spans }
    }

    pub fn raw(&self) -> &'a str {
        self.raw
    }

    pub fn spans(&self) -> &[BracketSpan] {
        &self.spans
    }

    /// Convert a raw offset to the matching offset in the stripped text.
    ///
    /// Every span that ends at or before `raw` has been removed in full. An
    /// offset that falls inside a span maps to where that span starts.
    pub fn to_text_offset(&self, raw: RawOffset) -> TextOffset {
        let mut removed = 0;
        for span in &self.spans {
            if span.end <= raw {
                removed += span.char_len();
            } else if span.start < raw {
                return TextOffset(span.start.0 - removed);
            } else {
                break;
            }
        }
        TextOffset(raw.0 - removed)
    }

    /// The line with every span removed.
    pub fn stripped_text(&self) -> String {
        let mut out = String::with_capacity(self.raw.len());
        let mut cursor = 0;
        for span in &self.spans {
            out.push_str(&self.raw[cursor..span.bytes.start]);
            cursor = span.bytes.end;
        }
        out.push_str(&self.raw[cursor..]);
        out
    }

    /// Chord text and final-text position of every non-empty span.
    ///
    /// The position is the span's end converted to text coordinates, which is
    /// where the next lyric character lands once the span is stripped.
    pub fn chords(&self) -> impl Iterator<Item = (&'a str, TextOffset)> + '_ {
        self.spans.iter().filter_map(move |span| {
            let inner = &self.raw[span.bytes.start + 1..span.bytes.end - 1];
            (!inner.is_empty()).then(|| (inner, self.to_text_offset(span.end)))
        })
    }
}
