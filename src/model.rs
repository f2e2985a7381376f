//! Song document model.
//!
//! A [`Song`] owns [`Stanza`]s, which own [`Line`]s, which own [`Chord`]s.
//! All text offsets are character (Unicode scalar) offsets, never bytes.

use core::fmt;

use serde::{Deserialize, Serialize};

use crate::chord::Chord;

/// Slice `text` by character offsets, clamping both ends to the text.
pub(crate) fn char_slice(text: &str, start: usize, end: usize) -> &str {
    let start_byte = char_to_byte(text, start);
    let end_byte = char_to_byte(text, end.max(start));
    &text[start_byte..end_byte]
}

/// Byte offset of the character at `char_idx`, or the text length past the end.
pub(crate) fn char_to_byte(text: &str, char_idx: usize) -> usize {
    text.char_indices()
        .nth(char_idx)
        .map_or(text.len(), |(byte, _)| byte)
}

/// One lyric line with its chords and optional echo boundary.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Line {
    /// Lyric text with all chord markers removed.
    pub text: String,
    /// Chords in ascending position order.
    pub chords: Vec<Chord>,
    /// Character offset where the echoed suffix begins.
    pub echo_index: Option<usize>,
}

impl Line {
    /// Plain line without chords or echo.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            chords: Vec::new(),
            echo_index: None,
        }
    }

    /// Attach chords.
    pub fn with_chords(mut self, chords: Vec<Chord>) -> Self {
        self.chords = chords;
        self
    }

    /// Attach an echo boundary.
    pub fn with_echo(mut self, echo_index: usize) -> Self {
        self.echo_index = Some(echo_index);
        self
    }

    /// Text length in characters.
    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }

    pub fn has_chords(&self) -> bool {
        !self.chords.is_empty()
    }

    pub fn has_echo(&self) -> bool {
        self.echo_index.is_some()
    }

    /// Text drawn in the normal style.
    ///
    /// The whole line when there is no echo, or when the echo starts at or
    /// past the end of the text.
    pub fn pre_echo_text(&self) -> &str {
        match self.echo_index {
            Some(idx) if idx < self.char_len() => char_slice(&self.text, 0, idx),
            _ => &self.text,
        }
    }

    /// Text drawn in the echoed style; empty when there is nothing to echo.
    pub fn echo_text(&self) -> &str {
        match self.echo_index {
            Some(idx) if idx < self.char_len() => char_slice(&self.text, idx, usize::MAX),
            _ => "",
        }
    }

    /// Lyric text between the previous chord's label and chord `index`.
    ///
    /// For the first chord this is everything before it. Returns an empty
    /// string when `index` is out of range or the previous chord label is so
    /// long that it runs past this chord.
    pub fn text_before_chord(&self, index: usize) -> &str {
        let Some(chord) = self.chords.get(index) else {
            return "";
        };
        let start = match index.checked_sub(1).and_then(|prev| self.chords.get(prev)) {
            None => 0,
            Some(prev) => prev.position + prev.display_char_len(),
        };
        if start > chord.position {
            return "";
        }
        char_slice(&self.text, start, chord.position)
    }
}

/// A block of lines separated from its neighbours by blank lines.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stanza {
    /// Stanza number; choruses share the number of the next verse.
    pub number: u32,
    pub is_chorus: bool,
    /// False when numbering was suppressed for this stanza alone.
    pub show_number: bool,
    pub before_comments: Vec<String>,
    pub after_comments: Vec<String>,
    pub lines: Vec<Line>,
}

impl Stanza {
    /// Numbered, non-chorus stanza with no comments.
    pub fn new(number: u32, lines: Vec<Line>) -> Self {
        Self {
            number,
            is_chorus: false,
            show_number: true,
            before_comments: Vec::new(),
            after_comments: Vec::new(),
            lines,
        }
    }

    /// True when any line carries a chord.
    pub fn has_chords(&self) -> bool {
        self.lines.iter().any(Line::has_chords)
    }

    /// Number of lines that need a chord row.
    pub fn chord_line_count(&self) -> usize {
        self.lines.iter().filter(|line| line.has_chords()).count()
    }

    /// Comments drawn before and after the lines.
    pub fn comment_count(&self) -> usize {
        self.before_comments.len() + self.after_comments.len()
    }
}

/// A parsed song.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Song {
    /// Explicit `{title:}` value, or derived from the first lyric line.
    pub title: String,
    pub section: Option<String>,
    /// File name the song was read from, when known.
    pub source_name: Option<String>,
    /// Number assigned by a songbook.
    pub song_number: Option<u32>,
    pub stanzas: Vec<Stanza>,
    /// Comments shown between the heading and the first stanza.
    pub before_comments: Vec<String>,
    /// Comments shown after the last stanza.
    pub after_comments: Vec<String>,
    pub show_stanza_numbers: bool,
    /// Semitone shift shared by every chord in the song.
    pub transpose: i32,
    /// Set when the source uses characters outside Windows-1252, which the
    /// standard PDF core fonts cannot draw.
    pub needs_unicode_font: bool,
}

impl Song {
    /// Copy of this song with every chord shifted by `semitones`.
    pub fn transposed(&self, semitones: i32) -> Song {
        let mut song = self.clone();
        song.set_transpose(semitones);
        song
    }

    /// Set the semitone shift on the song and on every chord it owns.
    pub fn set_transpose(&mut self, semitones: i32) {
        self.transpose = semitones;
        for chord in self
            .stanzas
            .iter_mut()
            .flat_map(|stanza| stanza.lines.iter_mut())
            .flat_map(|line| line.chords.iter_mut())
        {
            chord.transpose = semitones;
        }
    }

    /// Every chord in document order.
    pub fn chords(&self) -> impl Iterator<Item = &Chord> {
        self.stanzas
            .iter()
            .flat_map(|stanza| stanza.lines.iter())
            .flat_map(|line| line.chords.iter())
    }

    pub fn has_before_comments(&self) -> bool {
        !self.before_comments.is_empty()
    }

    pub fn has_after_comments(&self) -> bool {
        !self.after_comments.is_empty()
    }

    /// Link name for the song: its source name without the `.song` extension.
    pub fn link(&self) -> Option<&str> {
        let name = self.source_name.as_deref()?;
        Some(name.strip_suffix(".song").unwrap_or(name))
    }

    /// First chorus stanza, if any.
    pub fn first_chorus(&self) -> Option<&Stanza> {
        self.stanzas.iter().find(|stanza| stanza.is_chorus)
    }
}

impl fmt::Display for Song {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(section) = &self.section {
            writeln!(f, "Section: {section}")?;
        }
        for comment in &self.before_comments {
            writeln!(f, "/{comment}/")?;
        }
        for stanza in &self.stanzas {
            if stanza.is_chorus {
                writeln!(f, "---CHORUS---")?;
            } else {
                writeln!(f, "STANZA: {}", stanza.number)?;
            }
            for line in &stanza.lines {
                writeln!(f, "{}", line.text)?;
            }
            if stanza.is_chorus {
                writeln!(f, "---END CHORUS---")?;
            }
            writeln!(f)?;
        }
        for comment in &self.after_comments {
            writeln!(f, "/{comment}/")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn has_chords_and_echo() {
        assert!(Line::new("Line1").with_chords(vec![Chord::new("A", 0)]).has_chords());
        assert!(!Line::new("Line2").has_chords());
        assert!(Line::new("Line1").with_echo(0).has_echo());
        assert!(Line::new("Line3").with_echo(100).has_echo());
        assert!(!Line::new("Line2").has_echo());
    }

    #[test]
    fn echo_text_splits() {
        let cases = [
            (Line::new("Test string with no echo"), "Test string with no echo", ""),
            (
                Line::new("Test string with echo index = 10").with_echo(10),
                "Test strin",
                "g with echo index = 10",
            ),
            (
                Line::new("Test string with echo index = 0").with_echo(0),
                "",
                "Test string with echo index = 0",
            ),
            (
                Line::new("Test string with echo index = 32").with_echo(32),
                "Test string with echo index = 32",
                "",
            ),
        ];
        for (line, pre, echo) in cases {
            assert_eq!(line.pre_echo_text(), pre, "{}", line.text);
            assert_eq!(line.echo_text(), echo, "{}", line.text);
        }
    }

    #[test]
    fn echo_text_counts_characters_not_bytes() {
        let line = Line::new("Hāllo wörld").with_echo(6);
        assert_eq!(line.pre_echo_text(), "Hāllo ");
        assert_eq!(line.echo_text(), "wörld");
    }

    #[test]
    fn text_before_chord() {
        let no_chords = Line::new("Test string with no chords");
        assert_eq!(no_chords.text_before_chord(0), "");

        let one = Line::new("Test string with one chord at position 7")
            .with_chords(vec![Chord::new("", 7)]);
        assert_eq!(one.text_before_chord(0), "Test st");

        let two = Line::new("Test string with two chords at position 10 and 20")
            .with_chords(vec![Chord::new("", 10), Chord::new("", 20)]);
        assert_eq!(two.text_before_chord(1), "g with two");
        assert_eq!(two.text_before_chord(2), "");

        let long = Line::new("Test string with long chord text chord").with_chords(vec![
            Chord::new("Text-that-is-too-long", 10),
            Chord::new("", 20),
        ]);
        assert_eq!(long.text_before_chord(1), "");
    }

    #[test]
    fn stanza_chord_queries() {
        assert!(!Stanza::new(1, Vec::new()).has_chords());
        assert!(!Stanza::new(1, vec![Line::new("Line2")]).has_chords());
        let stanza = Stanza::new(
            1,
            vec![
                Line::new("Line1").with_chords(vec![Chord::new("C", 0)]),
                Line::new("Line2"),
            ],
        );
        assert!(stanza.has_chords());
        assert_eq!(stanza.chord_line_count(), 1);
    }

    #[test]
    fn transposed_leaves_original_untouched() {
        let song = Song {
            stanzas: vec![Stanza::new(
                1,
                vec![Line::new("Hello world")
                    .with_chords(vec![Chord::new("C", 0), Chord::new("G", 6)])],
            )],
            ..Song::default()
        };
        let shifted = song.transposed(2);
        assert_eq!(shifted.transpose, 2);
        let shown: Vec<String> = shifted.chords().map(|c| c.display_text().into_owned()).collect();
        assert_eq!(shown, ["D", "A"]);
        assert!(song.chords().all(|c| c.transpose == 0));
        assert!(shifted.chords().all(|c| c.transpose == 2));
    }

    #[test]
    fn link_strips_song_extension() {
        let song = Song {
            source_name: Some("amazing grace.song".to_string()),
            ..Song::default()
        };
        assert_eq!(song.link(), Some("amazing grace"));
        assert_eq!(Song::default().link(), None);
    }

    #[test]
    fn display_dumps_stanzas() {
        let mut chorus = Stanza::new(2, vec![Line::new("Sing it")]);
        chorus.is_chorus = true;
        let song = Song {
            section: Some("Hymns".to_string()),
            stanzas: vec![Stanza::new(1, vec![Line::new("First verse")]), chorus],
            ..Song::default()
        };
        assert_eq!(
            song.to_string(),
            "Section: Hymns\nSTANZA: 1\nFirst verse\n\n---CHORUS---\nSing it\n---END CHORUS---\n\n"
        );
    }
}
