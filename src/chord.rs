//! Chord annotations and key transposition.
//!
//! Transposition works on the chord text as written: every recognized note
//! spelling is shifted, everything else (quality suffixes, separators such as
//! `G-C-G`, bass slashes) is copied through untouched.

use std::borrow::Cow;

use serde::{Deserialize, Serialize};

/// Canonical spelling for each semitone, indexed from A.
///
/// Only one spelling is stored per semitone, so transposed output always
/// uses these forms (`Bb`, never `A#`).
pub const NOTE_TABLE: [&str; 12] = [
    "A", "Bb", "B", "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#",
];

/// Semitone index of an exact note spelling from [`NOTE_TABLE`].
pub fn note_index(token: &str) -> Option<usize> {
    NOTE_TABLE.iter().position(|note| *note == token)
}

/// Shift every note spelling in `key` by `semitones`.
///
/// A zero shift returns the input borrowed and byte-identical. Otherwise the
/// text is scanned left to right, trying a two-character note first (to catch
/// sharps and flats) and then a single character. Unrecognized characters are
/// copied through, so this never fails.
pub fn transpose_key(key: &str, semitones: i32) -> Cow<'_, str> {
    if semitones == 0 {
        return Cow::Borrowed(key);
    }

    let shift = semitones.rem_euclid(NOTE_TABLE.len() as i32) as usize;
    let mut out = String::with_capacity(key.len() + 4);
    let mut rest = key;

    while let Some(first) = rest.chars().next() {
        let first_len = first.len_utf8();
        let pair_len = rest[first_len..]
            .chars()
            .next()
            .map_or(0, |second| first_len + second.len_utf8());

        let matched = (pair_len > 0)
            .then(|| note_index(&rest[..pair_len]).map(|idx| (idx, pair_len)))
            .flatten()
            .or_else(|| note_index(&rest[..first_len]).map(|idx| (idx, first_len)));

        match matched {
            Some((idx, len)) => {
                out.push_str(NOTE_TABLE[(idx + shift) % NOTE_TABLE.len()]);
                rest = &rest[len..];
            }
            None => {
                out.push(first);
                rest = &rest[first_len..];
            }
        }
    }

    Cow::Owned(out)
}

/// A chord annotation anchored to a character offset of a lyric line.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Chord {
    /// Chord text exactly as written between the brackets.
    pub root_text: String,
    /// Character offset into the owning line's final text.
    pub position: usize,
    /// Semitone shift applied when the chord is displayed.
    pub transpose: i32,
}

impl Chord {
    /// Create an untransposed chord at `position`.
    pub fn new(root_text: impl Into<String>, position: usize) -> Self {
        Self {
            root_text: root_text.into(),
            position,
            transpose: 0,
        }
    }

    /// Same chord with a different semitone shift.
    pub fn with_transpose(mut self, transpose: i32) -> Self {
        self.transpose = transpose;
        self
    }

    /// Text to show for this chord, with the transposition applied.
    pub fn display_text(&self) -> Cow<'_, str> {
        transpose_key(&self.root_text, self.transpose)
    }

    /// Character count of [`display_text`](Self::display_text).
    pub fn display_char_len(&self) -> usize {
        self.display_text().chars().count()
    }
}
