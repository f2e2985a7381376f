//! # songsheet
//!
//! Parser and document model for chord-sheet song markup.
//!
//! A song source is plain text: lyric lines with inline `[chord]` annotations,
//! `{directive: value}` lines, inline `{echo: text}` markers, and blank lines
//! between stanzas.
//!
//! ```
//! use songsheet::parse_song;
//!
//! let song = parse_song("{title: Test}\n[C]Hello [G]world\n\n[Am]Goodbye\n");
//! assert_eq!(song.title, "Test");
//! assert_eq!(song.stanzas[0].lines[0].text, "Hello world");
//!
//! let up = song.transposed(2);
//! let chords: Vec<_> = up.chords().map(|c| c.display_text().into_owned()).collect();
//! assert_eq!(chords, ["D", "A", "Bm"]);
//! ```
//!
//! Layout into pages lives in the `songsheet-render` crate.
//!
//! ## Features
//!
//! - `async`: `SongParser::parse_file_async` via `tokio::fs`.

#![cfg_attr(docsrs, feature(doc_cfg))]
#![cfg_attr(
    not(test),
    deny(
        clippy::disallowed_methods,
        clippy::expect_used,
        clippy::unwrap_used,
        clippy::panic,
        clippy::panic_in_result_fn,
        clippy::todo,
        clippy::unimplemented
    )
)]

pub mod chord;
pub mod directive;
pub mod error;
pub mod model;
pub mod offsets;
pub mod parser;
pub mod reflow;
pub mod songbook;

pub use chord::{note_index, transpose_key, Chord, NOTE_TABLE};
pub use directive::{Directive, DirectiveToken};
pub use error::SongError;
pub use model::{Line, Song, Stanza};
pub use offsets::{BracketSpan, ChordMarkup, RawOffset, TextOffset};
pub use parser::{
    clean_title, parse_song, DiagnosticKind, ParseDiagnostic, ParsedSong, SongParser,
};
pub use reflow::{preferred_split_offset, split_line, split_line_at, LineSplit};
pub use songbook::{IndexEntry, IndexEntryKind, IndexPosition, Songbook};
