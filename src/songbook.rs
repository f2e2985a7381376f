//! Numbered song collections and their index.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::model::Song;
use crate::parser::clean_title;

/// Where a songbook's index pages go.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndexPosition {
    #[default]
    None,
    Start,
    End,
}

/// What an index row points at.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IndexEntryKind {
    Title,
    /// First line of the song's first chorus.
    Chorus,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexEntry {
    pub label: String,
    pub song_number: u32,
    pub section: Option<String>,
    pub kind: IndexEntryKind,
}

/// Songs keyed by song number, with index options.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Songbook {
    pub title: String,
    pub songs: BTreeMap<u32, Song>,
    /// Group index entries by song section.
    pub use_sections: bool,
    /// Add an index entry for each song's first chorus line.
    pub index_chorus: bool,
    pub index_position: IndexPosition,
}

impl Songbook {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    /// Add a song under `number`, or under the first free number from
    /// `len + 1` up when no number is given.
    ///
    /// The song's `song_number` is set to the number used, which is returned.
    /// A song already stored under an explicit number is replaced.
    pub fn add_song(&mut self, mut song: Song, number: Option<u32>) -> u32 {
        let number = number.unwrap_or_else(|| self.next_free_number());
        song.song_number = Some(number);
        if self.songs.insert(number, song).is_some() {
            log::warn!("songbook {:?}: song number {number} replaced", self.title);
        }
        number
    }

    fn next_free_number(&self) -> u32 {
        let mut next =
            u32::try_from(self.songs.len()).map_or(u32::MAX, |len| len.saturating_add(1));
        while next < u32::MAX && self.songs.contains_key(&next) {
            next += 1;
        }
        next
    }

    /// Song numbers in ascending order. Numbers need not be contiguous.
    pub fn song_order(&self) -> Vec<u32> {
        self.songs.keys().copied().collect()
    }

    /// Songs in [`song_order`](Self::song_order).
    pub fn songs(&self) -> impl Iterator<Item = &Song> {
        self.songs.values()
    }

    pub fn len(&self) -> usize {
        self.songs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.songs.is_empty()
    }

    /// Every song with its chords shifted by `semitones`.
    pub fn transposed(&self, semitones: i32) -> Songbook {
        let mut book = self.clone();
        for song in book.songs.values_mut() {
            song.set_transpose(semitones);
        }
        book
    }

    /// Index rows, sorted by section (when grouping) then label.
    pub fn index_entries(&self) -> Vec<IndexEntry> {
        let mut entries = Vec::with_capacity(self.songs.len());
        for (&number, song) in &self.songs {
            let section = if self.use_sections {
                song.section.clone()
            } else {
                None
            };
            entries.push(IndexEntry {
                label: song.title.clone(),
                song_number: number,
                section: section.clone(),
                kind: IndexEntryKind::Title,
            });
            if !self.index_chorus {
                continue;
            }
            let first_line = song
                .first_chorus()
                .and_then(|chorus| chorus.lines.first())
                .map(|line| clean_title(&line.text))
                .filter(|label| !label.is_empty() && *label != song.title);
            if let Some(label) = first_line {
                entries.push(IndexEntry {
                    label,
                    song_number: number,
                    section,
                    kind: IndexEntryKind::Chorus,
                });
            }
        }
        entries.sort_by_cached_key(|entry| {
            (
                entry.section.clone(),
                entry.label.to_lowercase(),
                entry.song_number,
            )
        });
        entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_song;

    fn song(title: &str) -> Song {
        Song {
            title: title.to_string(),
            ..Song::default()
        }
    }

    #[test]
    fn empty_songbook_has_no_order() {
        let book = Songbook::new("Empty");
        assert!(book.song_order().is_empty());
        assert!(book.is_empty());
    }

    #[test]
    fn numbers_default_to_next_count() {
        let mut book = Songbook::new("Mixed");
        assert_eq!(book.add_song(song("a"), None), 1);
        assert_eq!(book.add_song(song("b"), Some(10)), 10);
        assert_eq!(book.add_song(song("c"), None), 3);
        assert_eq!(book.song_order(), [1, 3, 10]);
        let titles: Vec<&str> = book.songs().map(|s| s.title.as_str()).collect();
        assert_eq!(titles, ["a", "c", "b"]);
        assert_eq!(book.songs[&10].song_number, Some(10));
    }

    #[test]
    fn default_numbers_skip_taken_ones() {
        let mut book = Songbook::new("Gaps");
        assert_eq!(book.add_song(song("a"), Some(2)), 2);
        assert_eq!(book.add_song(song("b"), None), 3);
        assert_eq!(book.add_song(song("c"), Some(4)), 4);
        assert_eq!(book.add_song(song("d"), None), 5);
        assert_eq!(book.add_song(song("e"), None), 6);
        assert_eq!(book.song_order(), [2, 3, 4, 5, 6]);
        let titles: Vec<&str> = book.songs().map(|s| s.title.as_str()).collect();
        assert_eq!(titles, ["a", "b", "c", "d", "e"]);
    }

    #[test]
    fn index_sorts_case_insensitively() {
        let mut book = Songbook::new("Index");
        book.add_song(song("zion"), None);
        book.add_song(song("Amazing Grace"), None);
        book.add_song(song("be thou my vision"), None);
        let labels: Vec<String> = book.index_entries().into_iter().map(|e| e.label).collect();
        assert_eq!(labels, ["Amazing Grace", "be thou my vision", "zion"]);
    }

    #[test]
    fn index_groups_sections_and_adds_choruses() {
        let mut book = Songbook::new("Grouped");
        book.use_sections = true;
        book.index_chorus = true;
        book.add_song(
            parse_song("{section: Praise}\n{title: Zeal}\nVerse\n\n{start_of_chorus}\n\u{201c}All hail!\u{201d}\n"),
            None,
        );
        book.add_song(parse_song("{section: Advent}\nO come\n"), None);

        let rows: Vec<(Option<String>, String, IndexEntryKind)> = book
            .index_entries()
            .into_iter()
            .map(|e| (e.section, e.label, e.kind))
            .collect();
        assert_eq!(
            rows,
            [
                (Some("Advent".to_string()), "O come".to_string(), IndexEntryKind::Title),
                (Some("Praise".to_string()), "All hail".to_string(), IndexEntryKind::Chorus),
                (Some("Praise".to_string()), "Zeal".to_string(), IndexEntryKind::Title),
            ]
        );
    }

    #[test]
    fn transposed_book_shifts_every_song() {
        let mut book = Songbook::new("Keys");
        book.add_song(parse_song("[C]one"), None);
        book.add_song(parse_song("[G]two"), None);
        let shifted = book.transposed(2);
        let shown: Vec<String> = shifted
            .songs()
            .flat_map(|s| s.chords())
            .map(|c| c.display_text().into_owned())
            .collect();
        assert_eq!(shown, ["D", "A"]);
        assert!(book.songs().all(|s| s.transpose == 0));
    }
}
