//! Page layout for `songsheet` songs and songbooks.
//!
//! [`LayoutEngine`] turns a parsed [`Song`](songsheet::Song) or a
//! [`Songbook`](songsheet::Songbook) into a [`LayoutPlan`]: an ordered list of
//! [`DrawCommand`]s a PDF or screen backend can replay. Widths come from an
//! optional [`TextMeasurer`]; without one a glyph-class heuristic is used.
//!
//! ```
//! use songsheet::parse_song;
//! use songsheet_render::{FontRole, LayoutEngine};
//!
//! let song = parse_song("{title: Test}\n[C]Hello [G]world\n\n[Am]Goodbye\n");
//! let plan = LayoutEngine::default().layout_song(&song);
//! assert_eq!(plan.page_count, 1);
//! let chords: Vec<_> = plan
//!     .placements()
//!     .into_iter()
//!     .filter(|p| p.font == FontRole::Chord)
//!     .map(|p| p.text)
//!     .collect();
//! assert_eq!(chords, ["C", "G", "Am"]);
//! ```

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

mod render_index;
mod render_ir;
mod render_layout;

pub use render_index::INDEX_TITLE;
pub use render_ir::{
    DrawCommand, FontFace, FontRole, FontSet, LayoutDiagnostic, LayoutPlan, PlacedText,
    SongMarker, TextCommand, TextTone,
};
pub use render_layout::{
    CursorState, LayoutConfig, LayoutConfigError, LayoutCursor, LayoutEngine, TextMeasurer,
};
