//! Splitting over-wide lines in two.
//!
//! Chords and the echo boundary move with the text they belong to, so the
//! halves render exactly like the original line would have if it had fit.

use crate::chord::Chord;
use crate::model::{char_slice, Line};

/// Result of splitting a line.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LineSplit {
    /// No split was possible; the line is returned unchanged.
    Unsplit(Line),
    Split(Line, Line),
}

impl LineSplit {
    pub fn is_split(&self) -> bool {
        matches!(self, Self::Split(..))
    }
}

/// Split `line` before character `offset`.
///
/// Offsets of zero or at/past the end, and lines shorter than two characters,
/// give [`LineSplit::Unsplit`]; a caller reflowing recursively stops there.
pub fn split_line_at(line: &Line, offset: usize) -> LineSplit {
    let len = line.char_len();
    if len < 2 || offset == 0 || offset >= len {
        return LineSplit::Unsplit(line.clone());
    }

    let (head_chords, tail_chords): (Vec<Chord>, Vec<Chord>) = line
        .chords
        .iter()
        .cloned()
        .partition(|chord| chord.position <= offset);
    let tail_chords = tail_chords
        .into_iter()
        .map(|mut chord| {
            chord.position -= offset;
            chord
        })
        .collect();

    let (head_echo, tail_echo) = match line.echo_index {
        None => (None, None),
        Some(echo) if echo < offset => (Some(echo), Some(0)),
        Some(echo) => (None, Some(echo - offset)),
    };

    LineSplit::Split(
        Line {
            text: char_slice(&line.text, 0, offset).to_string(),
            chords: head_chords,
            echo_index: head_echo,
        },
        Line {
            text: char_slice(&line.text, offset, usize::MAX).to_string(),
            chords: tail_chords,
            echo_index: tail_echo,
        },
    )
}

/// First occurrence of `target` in a window growing around `center`.
///
/// An occurrence at the window's first position does not count; the next,
/// wider window sees it one place in.
fn search_windows(chars: &[char], center: usize, max_window: usize, target: char) -> Option<usize> {
    (1..=max_window).find_map(|window| {
        let start = center.checked_sub(window)?;
        let end = (center + window).min(chars.len());
        chars[start..end]
            .iter()
            .position(|&ch| ch == target)
            .filter(|&pos| pos > 0)
            .map(|pos| start + pos)
    })
}

/// Pick where to split a line that does not fit.
///
/// An echo boundary strictly inside the text wins. Otherwise the nearest
/// comma to the middle, then the nearest space, splitting just after it;
/// otherwise the middle character. A split landing on a space skips it so the
/// second half does not start with one.
pub fn preferred_split_offset(line: &Line) -> usize {
    let len = line.char_len();
    if let Some(echo) = line.echo_index.filter(|&echo| echo > 0 && echo < len) {
        return echo;
    }

    let chars: Vec<char> = line.text.chars().collect();
    let center = len / 2;
    let max_window = (len / 4).max(1);

    let mut split = search_windows(&chars, center, max_window, ',')
        .or_else(|| search_windows(&chars, center, max_window, ' '))
        .map_or(center, |found| found + 1);
    if chars.get(split) == Some(&' ') {
        split += 1;
    }
    if split == 0 || split >= len {
        center
    } else {
        split
    }
}

/// Split `line` at its [`preferred_split_offset`].
pub fn split_line(line: &Line) -> LineSplit {
    split_line_at(line, preferred_split_offset(line))
}
