use std::sync::Arc;

use songsheet::{split_line, IndexPosition, Line, LineSplit, Song, Songbook, Stanza};
use thiserror::Error;

use crate::render_ir::{
    DrawCommand, FontFace, FontRole, FontSet, LayoutDiagnostic, LayoutPlan, SongMarker,
    TextCommand, TextTone,
};

/// Slack allowed when comparing accumulated float heights and widths.
pub(crate) const FIT_EPSILON: f32 = 1e-3;

/// Text measurement hook for font-accurate layout.
pub trait TextMeasurer: Send + Sync {
    /// Rendered width of `text` in `face`, in layout units.
    fn measure_text(&self, text: &str, face: &FontFace) -> f32;
}

/// Invalid [`LayoutConfig`] values.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum LayoutConfigError {
    #[error("page size {width}x{height} must be positive")]
    PageSize { width: f32, height: f32 },
    #[error("margins leave no content area ({width}x{height})")]
    ContentArea { width: f32, height: f32 },
    #[error("units per point must be positive, got {0}")]
    UnitsPerPoint(f32),
    #[error("{role:?} font size must be positive, got {size_pt}")]
    FontSize { role: FontRole, size_pt: f32 },
    #[error("songbook column count must be at least 1")]
    NoColumns,
    #[error("stanza number indent {number} must lie within stanza indent {stanza}")]
    NumberIndent { number: f32, stanza: f32 },
}

/// Layout configuration for page construction.
///
/// Lengths are in layout units, millimetres by default.
#[derive(Clone, Debug, PartialEq)]
pub struct LayoutConfig {
    pub page_width: f32,
    pub page_height: f32,
    pub margin_left: f32,
    pub margin_right: f32,
    pub margin_top: f32,
    pub margin_bottom: f32,
    /// Points per layout unit; a role's line height is its size divided by this.
    pub units_per_point: f32,
    /// Left indent of verse lines within a column.
    pub stanza_indent: f32,
    /// Where the stanza number starts within the stanza indent.
    pub stanza_number_indent: f32,
    /// Left indent of chorus lines.
    pub chorus_indent: f32,
    /// Columns per page in songbook layout. Single songs use one column.
    pub songbook_columns: usize,
    pub fonts: FontSet,
}

impl LayoutConfig {
    /// Default configuration for another page size.
    pub fn for_page(width: f32, height: f32) -> Self {
        Self {
            page_width: width,
            page_height: height,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), LayoutConfigError> {
        if !(self.page_width > 0.0 && self.page_height > 0.0) {
            return Err(LayoutConfigError::PageSize {
                width: self.page_width,
                height: self.page_height,
            });
        }
        let width = self.page_width - self.margin_left - self.margin_right;
        let height = self.page_height - self.margin_top - self.margin_bottom;
        if !(width > 0.0 && height > 0.0) {
            return Err(LayoutConfigError::ContentArea { width, height });
        }
        if !(self.units_per_point > 0.0) {
            return Err(LayoutConfigError::UnitsPerPoint(self.units_per_point));
        }
        if let Some((role, face)) = self.fonts.iter().find(|(_, face)| !(face.size_pt > 0.0)) {
            return Err(LayoutConfigError::FontSize {
                role,
                size_pt: face.size_pt,
            });
        }
        if self.songbook_columns == 0 {
            return Err(LayoutConfigError::NoColumns);
        }
        if !(0.0..=self.stanza_indent).contains(&self.stanza_number_indent) {
            return Err(LayoutConfigError::NumberIndent {
                number: self.stanza_number_indent,
                stanza: self.stanza_indent,
            });
        }
        Ok(())
    }

    pub fn content_width(&self) -> f32 {
        (self.page_width - self.margin_left - self.margin_right).max(1.0)
    }

    pub fn content_bottom(&self) -> f32 {
        self.page_height - self.margin_bottom
    }

    /// Row height for text in `role`.
    pub fn line_height(&self, role: FontRole) -> f32 {
        self.fonts.face(role).size_pt / self.units_per_point
    }
}

impl Default for LayoutConfig {
    /// A4 portrait in millimetres.
    fn default() -> Self {
        let fonts = FontSet::default();
        let stanza_indent = fonts.stanza.size_pt;
        Self {
            page_width: 210.0,
            page_height: 297.0,
            margin_left: 10.0,
            margin_right: 10.0,
            margin_top: 10.0,
            margin_bottom: 20.0,
            units_per_point: 72.0 / 25.4,
            stanza_indent,
            stanza_number_indent: stanza_indent / 2.0,
            chorus_indent: stanza_indent * 2.0,
            songbook_columns: 2,
            fonts,
        }
    }
}

/// Where the cursor stands relative to its column.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CursorState {
    /// Nothing drawn in the column body yet.
    AtColumnTop,
    MidColumn,
    /// Out of room; the next column on this page follows.
    ColumnFull,
    /// Out of room in the last column; a new page follows.
    PageFull,
}

/// Vertical position within the column grid.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LayoutCursor {
    /// 1-based; 0 before the first page.
    pub page: usize,
    pub column: usize,
    pub columns: usize,
    pub y: f32,
    /// y where body content restarts after a column or page break.
    pub body_top: f32,
    /// Lowest y content may reach.
    pub bottom: f32,
    pub state: CursorState,
}

impl LayoutCursor {
    pub fn new(columns: usize, top: f32, bottom: f32) -> Self {
        Self {
            page: 0,
            column: 0,
            columns: columns.max(1),
            y: top,
            body_top: top,
            bottom,
            state: CursorState::AtColumnTop,
        }
    }

    pub fn fits(&self, height: f32) -> bool {
        self.y + height <= self.bottom + FIT_EPSILON
    }

    pub fn column_height(&self) -> f32 {
        self.bottom - self.body_top
    }

    pub fn advance(&mut self, height: f32) {
        self.y += height;
        self.state = CursorState::MidColumn;
    }

    /// Record that the current column is out of room.
    pub fn mark_full(&mut self) -> CursorState {
        self.state = if self.column + 1 < self.columns {
            CursorState::ColumnFull
        } else {
            CursorState::PageFull
        };
        self.state
    }

    /// Top of the next column, or of the first column on a new page.
    pub fn break_column(&mut self) -> CursorState {
        let reason = match self.state {
            CursorState::ColumnFull | CursorState::PageFull => self.state,
            _ => self.mark_full(),
        };
        if reason == CursorState::ColumnFull {
            self.column += 1;
        } else {
            self.page += 1;
            self.column = 0;
        }
        self.rewind();
        reason
    }

    /// Start a fresh page with body content beginning at `top`.
    pub fn start_page(&mut self, top: f32) {
        self.page += 1;
        self.column = 0;
        self.body_top = top;
        self.rewind();
    }

    /// Back to the body top of the current column.
    pub fn rewind(&mut self) {
        self.y = self.body_top;
        self.state = CursorState::AtColumnTop;
    }
}

/// Song and songbook layout engine.
#[derive(Clone)]
pub struct LayoutEngine {
    cfg: LayoutConfig,
    text_measurer: Option<Arc<dyn TextMeasurer>>,
}

impl core::fmt::Debug for LayoutEngine {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("LayoutEngine")
            .field("cfg", &self.cfg)
            .field("has_text_measurer", &self.text_measurer.is_some())
            .finish()
    }
}

impl Default for LayoutEngine {
    fn default() -> Self {
        Self::new(LayoutConfig::default())
    }
}

impl LayoutEngine {
    /// Create a layout engine. See [`try_new`](Self::try_new) to validate first.
    pub fn new(cfg: LayoutConfig) -> Self {
        Self {
            cfg,
            text_measurer: None,
        }
    }

    /// Create a layout engine from a validated configuration.
    pub fn try_new(cfg: LayoutConfig) -> Result<Self, LayoutConfigError> {
        cfg.validate()?;
        Ok(Self::new(cfg))
    }

    /// Install a shared text measurer. Without one a glyph-class heuristic is used.
    pub fn with_text_measurer(mut self, measurer: Arc<dyn TextMeasurer>) -> Self {
        self.text_measurer = Some(measurer);
        self
    }

    pub fn config(&self) -> &LayoutConfig {
        &self.cfg
    }

    /// Width of `text` in the face assigned to `role`.
    pub fn measure_text(&self, text: &str, role: FontRole) -> f32 {
        measure_with(&self.cfg, self.text_measurer.as_deref(), text, role)
    }

    /// Lay out one song in a single column.
    pub fn layout_song(&self, song: &Song) -> LayoutPlan {
        let mut st = self.state(1);
        st.song(song, false);
        st.finish()
    }

    /// Lay out a songbook in `songbook_columns` columns.
    ///
    /// Every song starts on a new page and shows its song number. Index pages
    /// are added before or after the songs according to the book's
    /// [`IndexPosition`].
    pub fn layout_songbook(&self, book: &Songbook) -> LayoutPlan {
        let mut st = self.state(self.cfg.songbook_columns);
        if book.index_position == IndexPosition::Start {
            st.index(book);
        }
        for song in book.songs() {
            st.song(song, true);
        }
        if book.index_position == IndexPosition::End {
            st.index(book);
        }
        st.finish()
    }

    fn state(&self, columns: usize) -> LayoutState<'_> {
        LayoutState::new(&self.cfg, self.text_measurer.as_deref(), columns)
    }
}

/// Per-call layout state. The engine itself stays immutable.
pub(crate) struct LayoutState<'a> {
    pub(crate) cfg: &'a LayoutConfig,
    text_measurer: Option<&'a dyn TextMeasurer>,
    commands: Vec<DrawCommand>,
    diagnostics: Vec<LayoutDiagnostic>,
    pub(crate) cursor: LayoutCursor,
    font: Option<FontRole>,
    /// Left indent of the current block within its column.
    pub(crate) indent: f32,
    /// Song title (or "Index") for diagnostics.
    pub(crate) context: String,
}

impl<'a> LayoutState<'a> {
    fn new(cfg: &'a LayoutConfig, text_measurer: Option<&'a dyn TextMeasurer>, columns: usize) -> Self {
        Self {
            cfg,
            text_measurer,
            commands: Vec::with_capacity(64),
            diagnostics: Vec::new(),
            cursor: LayoutCursor::new(columns, cfg.margin_top, cfg.content_bottom()),
            font: None,
            indent: 0.0,
            context: String::new(),
        }
    }

    fn finish(self) -> LayoutPlan {
        LayoutPlan {
            page_width: self.cfg.page_width,
            page_height: self.cfg.page_height,
            fonts: self.cfg.fonts.clone(),
            commands: self.commands,
            page_count: self.cursor.page,
            diagnostics: self.diagnostics,
        }
    }

    pub(crate) fn measure(&self, text: &str, role: FontRole) -> f32 {
        measure_with(self.cfg, self.text_measurer, text, role)
    }

    pub(crate) fn line_height(&self, role: FontRole) -> f32 {
        self.cfg.line_height(role)
    }

    pub(crate) fn column_width(&self) -> f32 {
        self.cfg.content_width() / self.cursor.columns as f32
    }

    pub(crate) fn column_x(&self) -> f32 {
        self.cfg.margin_left + self.cursor.column as f32 * self.column_width()
    }

    pub(crate) fn diagnose(&mut self, diagnostic: LayoutDiagnostic) {
        log::warn!("{diagnostic}");
        self.diagnostics.push(diagnostic);
    }

    pub(crate) fn set_font(&mut self, role: FontRole) {
        if self.font != Some(role) {
            self.font = Some(role);
            self.commands.push(DrawCommand::SetFont(role));
        }
    }

    fn set_tone(&mut self, tone: TextTone) {
        self.commands.push(DrawCommand::SetTone(tone));
    }

    pub(crate) fn text(&mut self, text: impl Into<String>, width: f32, height: f32) {
        self.commands.push(DrawCommand::Text(TextCommand {
            text: text.into(),
            width,
            height,
        }));
    }

    pub(crate) fn filler(&mut self, width: f32, height: f32) {
        if width > FIT_EPSILON {
            self.text(String::new(), width, height);
        }
    }

    pub(crate) fn advance_line(&mut self, height: f32) {
        self.commands.push(DrawCommand::AdvanceLine { height });
        self.cursor.advance(height);
    }

    pub(crate) fn move_to(&mut self, x: f32, y: f32) {
        self.commands.push(DrawCommand::MoveTo { x, y });
        self.cursor.y = y;
    }

    pub(crate) fn set_left_margin(&mut self, x: f32) {
        self.commands.push(DrawCommand::SetLeftMargin { x });
    }

    /// Move to the current y at the column's left edge plus the block indent.
    pub(crate) fn place_at_indent(&mut self) {
        let x = self.column_x() + self.indent;
        self.set_left_margin(x);
        self.move_to(x, self.cursor.y);
    }

    /// Open a new page whose body begins at the top margin.
    pub(crate) fn start_page(&mut self) {
        self.cursor.start_page(self.cfg.margin_top);
        self.font = None;
        self.commands.push(DrawCommand::NewPage {
            page_number: self.cursor.page,
        });
    }

    /// Move to the top-left corner of the content area.
    pub(crate) fn home(&mut self) {
        let x = self.cfg.margin_left;
        self.set_left_margin(x);
        self.move_to(x, self.cfg.margin_top);
    }

    /// Set where body content restarts after breaks and move there.
    pub(crate) fn begin_body(&mut self, body_top: f32) {
        self.cursor.body_top = body_top;
        self.cursor.rewind();
        self.place_at_indent();
    }

    fn break_column(&mut self) {
        match self.cursor.break_column() {
            CursorState::ColumnFull => {
                log::debug!(
                    "{}: continuing in column {} of page {}",
                    self.context,
                    self.cursor.column,
                    self.cursor.page
                );
                self.commands.push(DrawCommand::NewColumn {
                    column: self.cursor.column,
                });
            }
            _ => {
                log::debug!("{}: continuing on page {}", self.context, self.cursor.page);
                self.font = None;
                self.commands.push(DrawCommand::NewPage {
                    page_number: self.cursor.page,
                });
            }
        }
        self.place_at_indent();
    }

    /// Break to the next column unless `height` fits or nothing is drawn here yet.
    pub(crate) fn ensure_room(&mut self, height: f32) {
        if !self.cursor.fits(height) && self.cursor.state != CursorState::AtColumnTop {
            self.break_column();
        }
    }

    /// One row of `text` centered across the content width.
    pub(crate) fn centered_row(&mut self, text: &str, role: FontRole) {
        let height = self.line_height(role);
        let width = self.measure(text, role);
        let x = self.cfg.margin_left + ((self.cfg.content_width() - width) / 2.0).max(0.0);
        self.move_to(x, self.cursor.y);
        self.set_font(role);
        self.text(text, width, height);
        self.advance_line(height);
    }

    fn comment_row(&mut self, comment: &str) {
        let height = self.line_height(FontRole::Comment);
        self.ensure_room(height);
        self.set_font(FontRole::Comment);
        let width = self.measure(comment, FontRole::Comment);
        self.text(comment, width, height);
        self.advance_line(height);
    }

    fn song(&mut self, song: &Song, numbered: bool) {
        self.context.clone_from(&song.title);
        self.indent = 0.0;
        self.start_page();
        self.commands.push(DrawCommand::BeginSong(SongMarker {
            title: song.title.clone(),
            song_number: song.song_number,
            needs_unicode_font: song.needs_unicode_font,
        }));
        self.home();

        let top = self.cfg.margin_top;
        let title_h = self.line_height(FontRole::Title);
        let stanza_h = self.line_height(FontRole::Stanza);
        let section_h = self.line_height(FontRole::Section);
        let comment_h = self.line_height(FontRole::Comment);

        if let Some(number) = song.song_number.filter(|_| numbered) {
            let label = number.to_string();
            let width = self.measure(&label, FontRole::SongNumber);
            self.set_font(FontRole::SongNumber);
            self.text(label, width, self.line_height(FontRole::SongNumber));
        }
        self.centered_row(&song.title, FontRole::Title);

        let section = song.section.as_deref().filter(|section| !section.is_empty());
        if let Some(section) = section {
            self.centered_row(section, FontRole::Section);
        }

        let mut body_top = top + title_h + stanza_h;
        if section.is_some() {
            body_top += section_h;
        }
        self.begin_body(body_top);

        if song.has_before_comments() {
            for comment in &song.before_comments {
                self.comment_row(comment);
            }
            self.advance_line(comment_h);
        }

        for stanza in &song.stanzas {
            self.stanza(song, stanza);
        }

        if song.has_after_comments() {
            self.indent = self.cfg.stanza_indent;
            self.place_at_indent();
            for comment in &song.after_comments {
                self.comment_row(comment);
            }
        }
    }

    /// Split `line` until every piece fits `available`, keeping lyric order.
    fn reflow_into(&mut self, line: Line, available: f32, out: &mut Vec<Line>) {
        let width = self.measure(&line.text, FontRole::Stanza);
        if width <= available + FIT_EPSILON {
            out.push(line);
            return;
        }
        match split_line(&line) {
            LineSplit::Split(head, tail) => {
                self.reflow_into(head, available, out);
                self.reflow_into(tail, available, out);
            }
            LineSplit::Unsplit(line) => {
                self.diagnose(LayoutDiagnostic::LineOverflow {
                    song: self.context.clone(),
                    text: line.text.clone(),
                    width,
                    available,
                });
                out.push(line);
            }
        }
    }

    fn stanza(&mut self, song: &Song, stanza: &Stanza) {
        let comment_h = self.line_height(FontRole::Comment);
        let chord_h = self.line_height(FontRole::Chord);
        let stanza_h = self.line_height(FontRole::Stanza);

        let indent = if stanza.is_chorus {
            self.cfg.chorus_indent
        } else {
            self.cfg.stanza_indent
        };
        let available = (self.column_width() - indent).max(0.0);
        let mut lines = Vec::with_capacity(stanza.lines.len());
        for line in &stanza.lines {
            self.reflow_into(line.clone(), available, &mut lines);
        }

        // A stanza with any chord gives every line a chord row.
        let has_chords = lines.iter().any(Line::has_chords);
        let row_h = if has_chords {
            chord_h + stanza_h
        } else {
            stanza_h
        };
        let predicted =
            comment_h * stanza.comment_count() as f32 + row_h * lines.len() as f32 + stanza_h;

        self.indent = indent;
        if !self.cursor.fits(predicted) && self.cursor.state != CursorState::AtColumnTop {
            self.break_column();
        } else {
            self.place_at_indent();
        }
        let column_height = self.cursor.column_height();
        if predicted > column_height + FIT_EPSILON {
            self.diagnose(LayoutDiagnostic::StanzaTallerThanColumn {
                song: self.context.clone(),
                stanza: stanza.number,
                height: predicted,
                available: column_height,
            });
        }

        for comment in &stanza.before_comments {
            self.comment_row(comment);
        }

        let numbered = song.show_stanza_numbers && stanza.show_number && !stanza.is_chorus;
        for (idx, line) in lines.iter().enumerate() {
            self.ensure_room(row_h);
            if has_chords {
                self.chord_row(line);
            }
            let number = (idx == 0 && numbered).then_some(stanza.number);
            self.lyric_row(line, number);
        }

        for comment in &stanza.after_comments {
            self.comment_row(comment);
        }
        self.advance_line(stanza_h);
    }

    /// Chord labels above their lyric positions, never closer than a hyphen.
    fn chord_row(&mut self, line: &Line) {
        let chord_h = self.line_height(FontRole::Chord);
        let hyphen = self.measure("-", FontRole::Stanza);
        self.set_font(FontRole::Chord);

        let mut x = 0.0f32;
        let mut prev_end: Option<f32> = None;
        for chord in &line.chords {
            let target = self.measure(char_prefix(&line.text, chord.position), FontRole::Stanza);
            if target > x {
                self.filler(target - x, chord_h);
                x = target;
            }
            if let Some(end) = prev_end {
                let clear = end + hyphen;
                if x < clear {
                    self.filler(clear - x, chord_h);
                    x = clear;
                }
            }
            let label = chord.display_text();
            let width = self.measure(&label, FontRole::Chord);
            self.text(label.into_owned(), width, chord_h);
            x += width;
            prev_end = Some(x);
        }
        self.advance_line(chord_h);
    }

    fn lyric_row(&mut self, line: &Line, number: Option<u32>) {
        let stanza_h = self.line_height(FontRole::Stanza);
        self.set_font(FontRole::Stanza);

        if let Some(number) = number {
            let x = self.column_x() + self.cfg.stanza_number_indent;
            self.move_to(x, self.cursor.y);
            self.text(
                number.to_string(),
                self.indent - self.cfg.stanza_number_indent,
                stanza_h,
            );
        }

        let echo = line.echo_text();
        if echo.is_empty() {
            let width = self.measure(&line.text, FontRole::Stanza);
            self.text(line.text.as_str(), width, stanza_h);
        } else {
            let pre = line.pre_echo_text();
            if !pre.is_empty() {
                let width = self.measure(pre, FontRole::Stanza);
                self.text(pre, width, stanza_h);
            }
            self.set_tone(TextTone::Echo);
            let width = self.measure(echo, FontRole::Stanza);
            self.text(echo, width, stanza_h);
            self.set_tone(TextTone::Normal);
        }
        self.advance_line(stanza_h);
    }
}

/// Leading `chars` characters of `text`.
fn char_prefix(text: &str, chars: usize) -> &str {
    text.char_indices()
        .nth(chars)
        .map_or(text, |(byte, _)| &text[..byte])
}

fn measure_with(
    cfg: &LayoutConfig,
    text_measurer: Option<&dyn TextMeasurer>,
    text: &str,
    role: FontRole,
) -> f32 {
    let face = cfg.fonts.face(role);
    match text_measurer {
        Some(measurer) => measurer.measure_text(text, face),
        None => heuristic_measure_text(text, face, cfg.units_per_point),
    }
}

/// Width estimate from per-glyph em widths, in layout units.
pub(crate) fn heuristic_measure_text(text: &str, face: &FontFace, units_per_point: f32) -> f32 {
    if text.is_empty() || units_per_point <= 0.0 {
        return 0.0;
    }
    let family = face.family.to_ascii_lowercase();
    let proportional =
        !(family.contains("mono") || family.contains("courier") || family.contains("fixed"));
    let em_sum: f32 = if proportional {
        text.chars().map(proportional_glyph_em_width).sum()
    } else {
        text.chars().count() as f32 * 0.6
    };

    let mut family_scale = if family.contains("times") {
        0.97
    } else {
        1.00
    };
    if face.bold {
        family_scale += 0.03;
    }
    if face.italic {
        family_scale += 0.01;
    }
    em_sum * face.size_pt / units_per_point * family_scale
}

fn proportional_glyph_em_width(ch: char) -> f32 {
    match ch {
        ' ' => 0.28,
        '\t' => 1.12,
        'i' | 'l' | 'I' | '|' | '!' => 0.24,
        '.' | ',' | ':' | ';' | '\'' | '"' | '`' => 0.25,
        '-' | '\u{2010}' | '\u{2011}' | '\u{2012}' => 0.33,
        '\u{2013}' => 0.5,
        '\u{2014}' => 1.0,
        '(' | ')' | '[' | ']' | '{' | '}' => 0.33,
        'f' | 't' | 'j' | 'r' => 0.33,
        'm' | 'w' | 'M' | 'W' | '@' | '%' | '&' => 0.8,
        '#' => 0.5,
        c if c.is_ascii_digit() => 0.5,
        c if c.is_ascii_uppercase() => 0.68,
        c if c.is_ascii_lowercase() => 0.5,
        c if c.is_whitespace() => 0.28,
        c if c.is_ascii_punctuation() => 0.45,
        _ => 0.56,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render_ir::PlacedText;
    use songsheet::{parse_song, Songbook};

    struct FixedWidthMeasurer;

    impl TextMeasurer for FixedWidthMeasurer {
        fn measure_text(&self, text: &str, _face: &FontFace) -> f32 {
            text.chars().count() as f32 * 2.0
        }
    }

    fn engine(cfg: LayoutConfig) -> LayoutEngine {
        LayoutEngine::new(cfg).with_text_measurer(Arc::new(FixedWidthMeasurer))
    }

    fn assert_close(actual: f32, expected: f32) {
        assert!(
            (actual - expected).abs() < 1e-3,
            "expected {expected}, got {actual}"
        );
    }

    fn find<'p>(placed: &'p [PlacedText], text: &str) -> &'p PlacedText {
        placed
            .iter()
            .find(|p| p.text == text)
            .unwrap_or_else(|| panic!("no placement for {text:?}"))
    }

    const TITLE_H: f32 = 18.0 * 25.4 / 72.0;
    const STANZA_H: f32 = 12.0 * 25.4 / 72.0;
    const CHORD_H: f32 = 10.2 * 25.4 / 72.0;
    const BODY_TOP: f32 = 10.0 + TITLE_H + STANZA_H;

    #[test]
    fn default_config_is_valid_a4() {
        let cfg = LayoutConfig::default();
        assert!(cfg.validate().is_ok());
        assert_close(cfg.content_width(), 190.0);
        assert_close(cfg.content_bottom(), 277.0);
        assert_close(cfg.line_height(FontRole::Stanza), STANZA_H);
        assert_close(cfg.line_height(FontRole::Chord), CHORD_H);
        assert_close(cfg.stanza_indent, 12.0);
        assert_close(cfg.stanza_number_indent, 6.0);
        assert_close(cfg.chorus_indent, 24.0);
        assert_eq!(cfg.fonts.section, cfg.fonts.comment);
        assert!(cfg.fonts.chord.bold && cfg.fonts.comment.italic);
    }

    #[test]
    fn validate_rejects_degenerate_configs() {
        let cfg = LayoutConfig::for_page(0.0, 297.0);
        assert!(matches!(cfg.validate(), Err(LayoutConfigError::PageSize { .. })));

        let cfg = LayoutConfig {
            margin_left: 150.0,
            margin_right: 60.0,
            ..LayoutConfig::default()
        };
        assert!(matches!(cfg.validate(), Err(LayoutConfigError::ContentArea { .. })));

        let mut cfg = LayoutConfig::default();
        cfg.fonts.chord.size_pt = 0.0;
        assert_eq!(
            cfg.validate(),
            Err(LayoutConfigError::FontSize {
                role: FontRole::Chord,
                size_pt: 0.0
            })
        );

        let cfg = LayoutConfig {
            songbook_columns: 0,
            ..LayoutConfig::default()
        };
        assert_eq!(cfg.validate(), Err(LayoutConfigError::NoColumns));
        assert!(LayoutEngine::try_new(cfg).is_err());
    }

    #[test]
    fn heuristic_scales_with_size_and_weight() {
        let regular = FontFace::new("Helvetica", 10.0);
        let upp = 72.0 / 25.4;
        assert_eq!(heuristic_measure_text("", &regular, upp), 0.0);
        let narrow = heuristic_measure_text("iiii", &regular, upp);
        let wide = heuristic_measure_text("MMMM", &regular, upp);
        assert!(narrow < wide);
        let bigger = heuristic_measure_text("MMMM", &FontFace::new("Helvetica", 20.0), upp);
        assert_close(bigger, wide * 2.0);
        let bold = heuristic_measure_text("MMMM", &regular.clone().bold(), upp);
        assert!(bold > wide);
        let mono = FontFace::new("Courier", 10.0);
        assert_close(
            heuristic_measure_text("iiii", &mono, upp),
            heuristic_measure_text("MMMM", &mono, upp),
        );
    }

    #[test]
    fn cursor_state_machine() {
        let mut cursor = LayoutCursor::new(2, 20.0, 100.0);
        assert_eq!(cursor.state, CursorState::AtColumnTop);
        cursor.start_page(20.0);
        assert_eq!(cursor.page, 1);
        cursor.advance(50.0);
        assert_eq!(cursor.state, CursorState::MidColumn);
        assert!(cursor.fits(30.0));
        assert!(!cursor.fits(31.0));

        assert_eq!(cursor.break_column(), CursorState::ColumnFull);
        assert_eq!((cursor.page, cursor.column), (1, 1));
        assert_eq!(cursor.state, CursorState::AtColumnTop);
        assert_close(cursor.y, 20.0);

        cursor.advance(10.0);
        assert_eq!(cursor.mark_full(), CursorState::PageFull);
        assert_eq!(cursor.break_column(), CursorState::PageFull);
        assert_eq!((cursor.page, cursor.column), (2, 0));
    }

    #[test]
    fn song_heading_and_first_stanza_positions() {
        let song = parse_song("{title: Test}\n[C]Hello [G]world\n\n[Am]Goodbye\n");
        let plan = engine(LayoutConfig::default()).layout_song(&song);
        assert_eq!(plan.page_count, 1);
        assert!(plan.diagnostics.is_empty());
        assert!(matches!(plan.commands[0], DrawCommand::NewPage { page_number: 1 }));

        let placed = plan.placements();
        let title = find(&placed, "Test");
        assert_close(title.x, 10.0 + (190.0 - 8.0) / 2.0);
        assert_close(title.y, 10.0);
        assert_eq!(title.font, FontRole::Title);

        let c = find(&placed, "C");
        assert_close(c.x, 22.0);
        assert_close(c.y, BODY_TOP);
        let g = find(&placed, "G");
        assert_close(g.x, 22.0 + 12.0);
        assert_eq!(g.font, FontRole::Chord);

        let number = find(&placed, "1");
        assert_close(number.x, 16.0);
        assert_close(number.width, 6.0);
        assert_close(number.y, BODY_TOP + CHORD_H);
        let lyric = find(&placed, "Hello world");
        assert_close(lyric.x, 22.0);
        assert_close(lyric.y, BODY_TOP + CHORD_H);

        let second = find(&placed, "Goodbye");
        let expected = BODY_TOP + CHORD_H + STANZA_H + STANZA_H + CHORD_H;
        assert_close(second.y, expected);
        assert_close(find(&placed, "2").y, expected);
    }

    #[test]
    fn transposed_song_draws_shifted_chords() {
        let song = parse_song("[C]Hello [G]world\n\n[Am]Goodbye").transposed(2);
        let placed = engine(LayoutConfig::default()).layout_song(&song).placements();
        let chords: Vec<&str> = placed
            .iter()
            .filter(|p| p.font == FontRole::Chord)
            .map(|p| p.text.as_str())
            .collect();
        assert_eq!(chords, ["D", "A", "Bm"]);
    }

    #[test]
    fn crowded_chords_keep_a_hyphen_apart() {
        let song = parse_song("[Cmaj7]a[G]b[D]c");
        let placed = engine(LayoutConfig::default()).layout_song(&song).placements();
        let cmaj = find(&placed, "Cmaj7");
        let g = find(&placed, "G");
        let d = find(&placed, "D");
        assert_close(cmaj.x, 22.0);
        assert_close(g.x, cmaj.x + cmaj.width + 2.0);
        assert_close(d.x, g.x + g.width + 2.0);
    }

    #[test]
    fn chorded_stanzas_give_every_line_a_chord_row() {
        let song = parse_song("[C]one\ntwo\n[G]three\n\nfour\nfive");
        let plan = engine(LayoutConfig::default()).layout_song(&song);
        let placed = plan.placements();
        let one = find(&placed, "one");
        let two = find(&placed, "two");
        let three = find(&placed, "three");
        assert_close(one.y, BODY_TOP + CHORD_H);
        assert_close(two.y, one.y + CHORD_H + STANZA_H);
        assert_close(three.y, two.y + CHORD_H + STANZA_H);

        let four = find(&placed, "four");
        let five = find(&placed, "five");
        assert_close(four.y, three.y + STANZA_H + STANZA_H);
        assert_close(five.y, four.y + STANZA_H);

        let chord_advances = plan
            .commands
            .iter()
            .filter(|cmd| matches!(cmd, DrawCommand::AdvanceLine { height } if (*height - CHORD_H).abs() < 1e-4))
            .count();
        assert_eq!(chord_advances, 3);
    }

    #[test]
    fn chorded_stanza_height_counts_every_line() {
        // Room for one chord row and three lyric rows, but not for two chord rows.
        let song = parse_song("{title: T}\n[C]a\nb\n\n[G]c\nd\n");
        let stanza_height = 2.0 * (CHORD_H + STANZA_H) + STANZA_H;
        let bottom = BODY_TOP + stanza_height + CHORD_H + 3.0 * STANZA_H + 1.0;
        let plan = engine(LayoutConfig::for_page(210.0, bottom + 20.0)).layout_song(&song);
        let placed = plan.placements();
        assert_eq!(find(&placed, "b").page_number, 1);
        let c = find(&placed, "c");
        assert_eq!(c.page_number, 2);
        assert_close(c.y, BODY_TOP + CHORD_H);
        assert_eq!(plan.page_count, 2);
    }

    #[test]
    fn echo_is_drawn_as_a_second_segment() {
        let song = parse_song("Sing it {echo: sing it}");
        let placed = engine(LayoutConfig::default()).layout_song(&song).placements();
        let pre = find(&placed, "Sing it ");
        let echo = find(&placed, "sing it");
        assert_eq!(pre.tone, TextTone::Normal);
        assert_eq!(echo.tone, TextTone::Echo);
        assert_close(echo.x, pre.x + pre.width);
        assert_close(echo.y, pre.y);
    }

    #[test]
    fn chorus_is_doubly_indented_and_unnumbered() {
        let song = parse_song("Verse\n\n{start_of_chorus}\nChorus line\n");
        let placed = engine(LayoutConfig::default()).layout_song(&song).placements();
        assert_close(find(&placed, "Chorus line").x, 34.0);
        assert!(placed.iter().all(|p| p.text != "2"));
        assert_close(find(&placed, "Verse").x, 22.0);
    }

    #[test]
    fn no_number_hides_stanza_labels() {
        let song = parse_song("{no_number}\nOne\n\nTwo");
        let placed = engine(LayoutConfig::default()).layout_song(&song).placements();
        assert!(placed.iter().all(|p| p.text != "1" && p.text != "2"));

        let song = parse_song("One\n\n{no_number}\nTwo\n\nThree");
        let placed = engine(LayoutConfig::default()).layout_song(&song).placements();
        let numbers: Vec<&str> = placed
            .iter()
            .filter(|p| p.text.len() == 1)
            .map(|p| p.text.as_str())
            .collect();
        assert_eq!(numbers, ["1", "3"]);
    }

    #[test]
    fn song_comments_frame_the_stanzas() {
        let song = parse_song("{section: Hymns}\n{comments: Capo 2}\nVerse\n\n{comments: Repeat}\n");
        let placed = engine(LayoutConfig::default()).layout_song(&song).placements();
        let section = find(&placed, "Hymns");
        assert_eq!(section.font, FontRole::Section);
        assert_close(section.y, 10.0 + TITLE_H);

        let comment_h = 10.2 * 25.4 / 72.0;
        let top = BODY_TOP + comment_h;
        let capo = find(&placed, "Capo 2");
        assert_close(capo.x, 10.0);
        assert_close(capo.y, top);
        assert_close(find(&placed, "Verse").y, top + 2.0 * comment_h);

        let closing = find(&placed, "Repeat");
        assert_close(closing.x, 22.0);
        assert_close(closing.y, top + 2.0 * comment_h + 2.0 * STANZA_H);
    }

    #[test]
    fn over_wide_lines_reflow_in_order() {
        let cfg = LayoutConfig::for_page(10.0 + 10.0 + 12.0 + 40.0, 297.0);
        let song = parse_song("[G]Amazing grace, how [C]sweet the sound");
        let plan = engine(cfg).layout_song(&song);
        assert!(plan.diagnostics.is_empty());
        let lyrics: Vec<String> = plan
            .placements()
            .into_iter()
            .filter(|p| p.font == FontRole::Stanza && p.text != "1")
            .map(|p| p.text)
            .collect();
        assert!(lyrics.len() > 1);
        assert!(lyrics.iter().all(|l| l.chars().count() * 2 <= 40));
        assert_eq!(lyrics.concat(), "Amazing grace, how sweet the sound");
    }

    #[test]
    fn unsplittable_lines_overflow_with_a_diagnostic() {
        let cfg = LayoutConfig::for_page(10.0 + 10.0 + 12.0 + 1.0, 297.0);
        let plan = engine(cfg).layout_song(&parse_song("ab"));
        assert_eq!(plan.diagnostics.len(), 2);
        assert!(plan
            .diagnostics
            .iter()
            .all(|d| matches!(d, LayoutDiagnostic::LineOverflow { .. })));
    }

    fn three_short_stanzas() -> Song {
        parse_song("{title: T}\na\nb\n\nc\nd\n\ne\nf\n")
    }

    #[test]
    fn stanza_that_does_not_fit_moves_to_next_page() {
        let plan = engine(LayoutConfig::for_page(210.0, 71.0)).layout_song(&three_short_stanzas());
        assert_eq!(plan.page_count, 2);
        let placed = plan.placements();
        assert_eq!(find(&placed, "d").page_number, 1);
        let e = find(&placed, "e");
        assert_eq!(e.page_number, 2);
        assert_close(e.y, BODY_TOP);
        assert_close(e.x, 22.0);
        assert_eq!(find(&placed, "3").page_number, 2);
    }

    #[test]
    fn songbook_uses_columns_then_pages() {
        let mut book = Songbook::new("Book");
        book.add_song(three_short_stanzas(), None);
        book.add_song(parse_song("{title: U}\nlast"), None);
        let plan = engine(LayoutConfig::for_page(210.0, 71.0)).layout_songbook(&book);
        assert_eq!(plan.page_count, 2);
        assert!(plan
            .commands
            .contains(&DrawCommand::NewColumn { column: 1 }));

        let placed = plan.placements();
        let e = find(&placed, "e");
        assert_eq!(e.page_number, 1);
        assert_close(e.x, 10.0 + 95.0 + 12.0);
        assert_close(e.y, BODY_TOP);

        let number = placed
            .iter()
            .find(|p| p.font == FontRole::SongNumber && p.text == "2")
            .expect("second song number");
        assert_eq!(number.page_number, 2);
        assert_close(number.x, 10.0);
        assert_eq!(find(&placed, "last").page_number, 2);
    }

    #[test]
    fn tall_stanza_breaks_between_rows() {
        let song = parse_song("{title: T}\na\nb\nc");
        let plan = engine(LayoutConfig::for_page(210.0, 45.0)).layout_song(&song);
        assert!(plan
            .diagnostics
            .iter()
            .any(|d| matches!(d, LayoutDiagnostic::StanzaTallerThanColumn { stanza: 1, .. })));
        let placed = plan.placements();
        assert_eq!(find(&placed, "a").page_number, 1);
        assert_eq!(find(&placed, "b").page_number, 2);
        assert_eq!(find(&placed, "c").page_number, 3);
        assert_eq!(plan.page_count, 3);
    }

    #[test]
    fn layout_is_deterministic() {
        let song = parse_song("{title: Again}\n[C]one [F]two\n\n{start_of_chorus}\n[G]three {echo: four}\n");
        let engine = engine(LayoutConfig::default());
        assert_eq!(engine.layout_song(&song), engine.layout_song(&song));
    }

    #[test]
    fn begin_song_marker_carries_font_needs() {
        let song = parse_song("Hā");
        let plan = LayoutEngine::default().layout_song(&song);
        assert!(plan.commands.iter().any(|cmd| matches!(
            cmd,
            DrawCommand::BeginSong(SongMarker {
                needs_unicode_font: true,
                ..
            })
        )));
    }
}
