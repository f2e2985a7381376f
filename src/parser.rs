//! Song markup parser.
//!
//! One forward pass over the physical lines of a song source. Each line is a
//! directive, a blank stanza boundary, or a lyric line with `[chord]` spans and
//! an optional inline `{echo: ...}` marker. Structural problems are reported as
//! [`ParseDiagnostic`]s and never stop the parse; only failing to read the
//! source is an error.

use core::fmt;
use std::borrow::Cow;
use std::io::Read;
use std::path::Path;

use crate::chord::Chord;
use crate::directive::{self, Directive};
use crate::error::SongError;
use crate::model::{Line, Song, Stanza};
use crate::offsets::{ChordMarkup, RawOffset};

const ECHO_OPEN: &str = "{echo:";

/// What went wrong on one line.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DiagnosticKind {
    UnknownDirective { text: String },
    /// A directive with no closing `}`.
    MalformedDirective { text: String },
    /// An inline `{echo:` with no closing `}`.
    UnterminatedEcho { text: String },
    /// A `{` or `}` left in the final lyric text at `column` (characters).
    StrayBrace { text: String, column: usize },
}

/// A recoverable problem found while parsing.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParseDiagnostic {
    pub source_name: Option<String>,
    /// 1-based physical line number.
    pub line: usize,
    pub kind: DiagnosticKind,
}

impl fmt::Display for ParseDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let source = self.source_name.as_deref().unwrap_or("<input>");
        write!(f, "{source}:{}: ", self.line)?;
        match &self.kind {
            DiagnosticKind::UnknownDirective { text } => write!(f, "unknown directive: {text}"),
            DiagnosticKind::MalformedDirective { text } => {
                write!(f, "directive is missing its closing brace: {text}")
            }
            DiagnosticKind::UnterminatedEcho { text } => {
                write!(f, "echo marker is missing its closing brace: {text}")
            }
            DiagnosticKind::StrayBrace { text, column } => {
                writeln!(f, "stray brace in lyric text")?;
                writeln!(f, "{text}")?;
                write!(f, "{:width$}^", "", width = column)
            }
        }
    }
}

/// Parser output: the song plus everything that was reported along the way.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParsedSong {
    pub song: Song,
    pub diagnostics: Vec<ParseDiagnostic>,
}

/// Configured song parser.
#[derive(Clone, Debug, Default)]
pub struct SongParser {
    source_name: Option<String>,
    transpose: i32,
}

impl SongParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Name used in diagnostics and stored on the song.
    pub fn with_source_name(mut self, name: impl Into<String>) -> Self {
        self.source_name = Some(name.into());
        self
    }

    /// Semitone shift given to every parsed chord.
    pub fn with_transpose(mut self, semitones: i32) -> Self {
        self.transpose = semitones;
        self
    }

    /// Parse song markup held in memory.
    pub fn parse_str(&self, text: &str) -> ParsedSong {
        let text = text.strip_prefix('\u{feff}').unwrap_or(text);
        let mut state = ParseState::new(self);
        for (idx, line) in physical_lines(text).enumerate() {
            state.line(idx + 1, line);
        }
        state.finish()
    }

    /// Parse UTF-8 encoded markup.
    pub fn parse_bytes(&self, bytes: &[u8]) -> Result<ParsedSong, SongError> {
        let text = core::str::from_utf8(bytes)?;
        Ok(self.parse_str(text))
    }

    /// Read all of `reader`, then parse it.
    pub fn parse_reader<R: Read>(&self, mut reader: R) -> Result<ParsedSong, SongError> {
        let mut bytes = Vec::new();
        reader.read_to_end(&mut bytes).map_err(|err| {
            SongError::from_io(self.source_name.as_deref().unwrap_or("<reader>"), err)
        })?;
        self.parse_bytes(&bytes)
    }

    /// Read and parse a song file. The file name becomes the source name.
    pub fn parse_file(&self, path: impl AsRef<Path>) -> Result<ParsedSong, SongError> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|err| SongError::from_io(path, err))?;
        self.for_path(path).parse_bytes(&bytes)
    }

    /// Async variant of [`parse_file`](Self::parse_file).
    #[cfg(feature = "async")]
    pub async fn parse_file_async(&self, path: impl AsRef<Path>) -> Result<ParsedSong, SongError> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|err| SongError::from_io(path, err))?;
        self.for_path(path).parse_bytes(&bytes)
    }

    fn for_path(&self, path: &Path) -> Self {
        match path.file_name() {
            Some(name) => self.clone().with_source_name(name.to_string_lossy()),
            None => self.clone(),
        }
    }
}

/// Parse markup with default settings, discarding diagnostics.
pub fn parse_song(text: &str) -> Song {
    SongParser::new().parse_str(text).song
}

/// Split on CR, LF, or CRLF. A trailing terminator does not add an empty line.
fn physical_lines(text: &str) -> impl Iterator<Item = &str> {
    let mut rest = text;
    core::iter::from_fn(move || {
        if rest.is_empty() {
            return None;
        }
        match rest.find(['\r', '\n']) {
            Some(end) => {
                let line = &rest[..end];
                let skip = if rest[end..].starts_with("\r\n") { 2 } else { 1 };
                rest = &rest[end + skip..];
                Some(line)
            }
            None => {
                let line = rest;
                rest = "";
                Some(line)
            }
        }
    })
}

/// Derive a title from a lyric line.
///
/// Drops straight and curly double quotes, trims whitespace, then strips
/// non-alphanumeric characters from each end while more than one character
/// remains.
pub fn clean_title(text: &str) -> String {
    let unquoted: String = text
        .chars()
        .filter(|ch| !matches!(ch, '"' | '\u{201c}' | '\u{201d}'))
        .collect();
    let mut chars: &[char] = &unquoted.trim().chars().collect::<Vec<_>>();
    while chars.len() > 1 && !chars[0].is_alphanumeric() {
        chars = &chars[1..];
    }
    while chars.len() > 1 && !chars[chars.len() - 1].is_alphanumeric() {
        chars = &chars[..chars.len() - 1];
    }
    chars.iter().collect()
}

/// True when the standard Windows-1252 PDF core fonts can draw `ch`.
fn encodable_in_cp1252(ch: char) -> bool {
    let code = u32::from(ch);
    code < 0x80
        || (0xa0..=0xff).contains(&code)
        || matches!(
            ch,
            '€' | '‚'
                | 'ƒ'
                | '„'
                | '…'
                | '†'
                | '‡'
                | 'ˆ'
                | '‰'
                | 'Š'
                | '‹'
                | 'Œ'
                | 'Ž'
                | '\u{2018}'
                | '\u{2019}'
                | '\u{201c}'
                | '\u{201d}'
                | '•'
                | '–'
                | '—'
                | '˜'
                | '™'
                | 'š'
                | '›'
                | 'œ'
                | 'ž'
                | 'Ÿ'
        )
}

struct ParseState<'p> {
    parser: &'p SongParser,
    diagnostics: Vec<ParseDiagnostic>,
    title: String,
    section: Option<String>,
    stanzas: Vec<Stanza>,
    song_before: Vec<String>,
    song_after: Vec<String>,
    song_numbered: bool,
    needs_unicode_font: bool,
    song_started: bool,
    next_number: u32,
    lines: Vec<Line>,
    stanza_before: Vec<String>,
    stanza_after: Vec<String>,
    is_chorus: bool,
    stanza_numbered: bool,
}

impl<'p> ParseState<'p> {
    fn new(parser: &'p SongParser) -> Self {
        Self {
            parser,
            diagnostics: Vec::new(),
            title: String::new(),
            section: None,
            stanzas: Vec::new(),
            song_before: Vec::new(),
            song_after: Vec::new(),
            song_numbered: true,
            needs_unicode_font: false,
            song_started: false,
            next_number: 1,
            lines: Vec::new(),
            stanza_before: Vec::new(),
            stanza_after: Vec::new(),
            is_chorus: false,
            stanza_numbered: true,
        }
    }

    fn report(&mut self, line: usize, kind: DiagnosticKind) {
        let diagnostic = ParseDiagnostic {
            source_name: self.parser.source_name.clone(),
            line,
            kind,
        };
        log::warn!("{diagnostic}");
        self.diagnostics.push(diagnostic);
    }

    fn line(&mut self, line_no: usize, line: &str) {
        if !self.needs_unicode_font && !line.chars().all(encodable_in_cp1252) {
            self.needs_unicode_font = true;
        }

        if let Some(token) = directive::tokenize(line) {
            if token.unterminated {
                self.report(
                    line_no,
                    DiagnosticKind::MalformedDirective {
                        text: line.to_string(),
                    },
                );
            }
            match token.directive {
                Directive::StartOfChorus => self.is_chorus = true,
                Directive::EndOfChorus => {}
                Directive::Title(value) => self.title = value,
                Directive::Section(value) => self.section = Some(value),
                Directive::Comment(value) => self.comment(value),
                Directive::NoNumber => {
                    if self.song_started {
                        self.stanza_numbered = false;
                    } else {
                        self.song_numbered = false;
                    }
                }
                Directive::Echo => {
                    self.lyric(line_no, line);
                    return;
                }
                Directive::Unknown(text) => {
                    self.report(line_no, DiagnosticKind::UnknownDirective { text });
                }
            }
            return;
        }

        if line.trim().is_empty() {
            self.song_started = true;
            self.flush_stanza();
        } else {
            self.lyric(line_no, line);
        }
    }

    fn comment(&mut self, value: String) {
        if !self.song_started {
            self.song_before.push(value);
        } else if self.lines.is_empty() {
            self.stanza_before.push(value);
        } else {
            self.stanza_after.push(value);
        }
    }

    fn flush_stanza(&mut self) {
        if self.lines.is_empty() {
            return;
        }
        self.stanzas.push(Stanza {
            number: self.next_number,
            is_chorus: self.is_chorus,
            show_number: self.stanza_numbered,
            before_comments: core::mem::take(&mut self.stanza_before),
            after_comments: core::mem::take(&mut self.stanza_after),
            lines: core::mem::take(&mut self.lines),
        });
        if !self.is_chorus {
            self.next_number += 1;
        }
        self.is_chorus = false;
        self.stanza_numbered = true;
    }

    /// Replace an inline `{echo: text}` with `text`.
    ///
    /// Returns the spliced line and the raw offset where the echo starts.
    fn splice_echo<'l>(&mut self, line_no: usize, line: &'l str) -> (Cow<'l, str>, Option<RawOffset>) {
        let Some(open) = directive::find_ignore_case(line, ECHO_OPEN) else {
            return (Cow::Borrowed(line), None);
        };
        let echo_at = RawOffset(line[..open].chars().count());
        let after_open = &line[open + ECHO_OPEN.len()..];
        let (inner, tail) = match after_open.find('}') {
            Some(close) => (&after_open[..close], &after_open[close + 1..]),
            None => {
                self.report(
                    line_no,
                    DiagnosticKind::UnterminatedEcho {
                        text: line.to_string(),
                    },
                );
                (after_open, "")
            }
        };
        let mut spliced = String::with_capacity(line.len());
        spliced.push_str(&line[..open]);
        spliced.push_str(inner.trim());
        spliced.push_str(tail);
        (Cow::Owned(spliced), Some(echo_at))
    }

    fn lyric(&mut self, line_no: usize, line: &str) {
        self.song_started = true;

        let (spliced, echo_at) = self.splice_echo(line_no, line);
        let markup = ChordMarkup::scan(&spliced);
        let transpose = self.parser.transpose;
        let chords: Vec<Chord> = markup
            .chords()
            .map(|(text, at)| Chord::new(text, at.0).with_transpose(transpose))
            .collect();
        let echo_index = echo_at.map(|raw| markup.to_text_offset(raw).0);
        let text = markup.stripped_text();

        for (column, ch) in text.chars().enumerate() {
            if ch == '{' || ch == '}' {
                self.report(
                    line_no,
                    DiagnosticKind::StrayBrace {
                        text: text.clone(),
                        column,
                    },
                );
            }
        }

        if self.title.is_empty() {
            self.title = clean_title(&text);
        }

        self.lines.push(Line {
            text,
            chords,
            echo_index,
        });
    }

    fn finish(mut self) -> ParsedSong {
        if self.lines.is_empty() {
            if !self.stanza_before.is_empty() {
                self.song_after = core::mem::take(&mut self.stanza_before);
            }
        } else {
            self.flush_stanza();
        }
        let song = Song {
            title: self.title,
            section: self.section,
            source_name: self.parser.source_name.clone(),
            song_number: None,
            stanzas: self.stanzas,
            before_comments: self.song_before,
            after_comments: self.song_after,
            show_stanza_numbers: self.song_numbered,
            transpose: self.parser.transpose,
            needs_unicode_font: self.needs_unicode_font,
        };
        ParsedSong {
            song,
            diagnostics: self.diagnostics,
        }
    }
}
