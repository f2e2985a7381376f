//! Songbook index pages.

use songsheet::{IndexEntry, IndexEntryKind, Songbook};

use crate::render_ir::{FontRole, LayoutDiagnostic};
use crate::render_layout::LayoutState;

/// Heading drawn at the top of the first index page.
pub const INDEX_TITLE: &str = "Index";

impl LayoutState<'_> {
    /// Index rows in the songbook's columns, starting on a new page.
    ///
    /// Labels sit at the column's left edge and song numbers are right-aligned
    /// to its right edge. A book without songs gets no index pages.
    pub(crate) fn index(&mut self, book: &Songbook) {
        let entries = book.index_entries();
        if entries.is_empty() {
            return;
        }
        self.context = INDEX_TITLE.to_string();
        self.indent = 0.0;
        self.start_page();
        self.home();
        self.centered_row(INDEX_TITLE, FontRole::Title);
        let body_top = self.cfg.margin_top
            + self.line_height(FontRole::Title)
            + self.line_height(FontRole::Stanza);
        self.begin_body(body_top);

        let section_h = self.line_height(FontRole::Section);
        let row_h = self.line_height(FontRole::Index);
        let mut current_section: Option<&str> = None;
        for entry in &entries {
            if book.use_sections && entry.section.as_deref() != current_section {
                current_section = entry.section.as_deref();
                if let Some(section) = current_section {
                    // Keep the heading with its first row.
                    self.ensure_room(section_h + row_h);
                    self.set_font(FontRole::Section);
                    let width = self.measure(section, FontRole::Section);
                    self.text(section, width, section_h);
                    self.advance_line(section_h);
                }
            }
            self.ensure_room(row_h);
            self.index_row(entry, row_h);
        }
    }

    fn index_row(&mut self, entry: &IndexEntry, row_h: f32) {
        let label_role = match entry.kind {
            IndexEntryKind::Title => FontRole::Index,
            IndexEntryKind::Chorus => FontRole::Comment,
        };
        let number = entry.song_number.to_string();
        let label_w = self.measure(&entry.label, label_role);
        let number_w = self.measure(&number, FontRole::Index);
        let min_gap = self.measure("-", FontRole::Index);
        let available = self.column_width();

        let mut gap = available - label_w - number_w;
        if gap < min_gap {
            self.diagnose(LayoutDiagnostic::LineOverflow {
                song: self.context.clone(),
                text: entry.label.clone(),
                width: label_w + min_gap + number_w,
                available,
            });
            gap = min_gap;
        }

        self.set_font(label_role);
        self.text(entry.label.as_str(), label_w, row_h);
        self.filler(gap, row_h);
        self.set_font(FontRole::Index);
        self.text(number, number_w, row_h);
        self.advance_line(row_h);
    }
}
