use core::fmt;

use serde::{Deserialize, Serialize};

/// Typographic role of a piece of text.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FontRole {
    Title,
    Section,
    /// Lyric text and stanza numbers.
    Stanza,
    Chord,
    Comment,
    SongNumber,
    Index,
}

/// Concrete font selection for a role.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FontFace {
    /// Font family name.
    pub family: String,
    pub bold: bool,
    pub italic: bool,
    /// Size in points.
    pub size_pt: f32,
}

impl FontFace {
    /// Regular face.
    pub fn new(family: impl Into<String>, size_pt: f32) -> Self {
        Self {
            family: family.into(),
            bold: false,
            italic: false,
            size_pt,
        }
    }

    pub fn bold(mut self) -> Self {
        self.bold = true;
        self
    }

    pub fn italic(mut self) -> Self {
        self.italic = true;
        self
    }
}

/// One face per [`FontRole`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FontSet {
    pub title: FontFace,
    pub section: FontFace,
    pub stanza: FontFace,
    pub chord: FontFace,
    pub comment: FontFace,
    pub song_number: FontFace,
    pub index: FontFace,
}

impl FontSet {
    /// Face used for `role`.
    pub fn face(&self, role: FontRole) -> &FontFace {
        match role {
            FontRole::Title => &self.title,
            FontRole::Section => &self.section,
            FontRole::Stanza => &self.stanza,
            FontRole::Chord => &self.chord,
            FontRole::Comment => &self.comment,
            FontRole::SongNumber => &self.song_number,
            FontRole::Index => &self.index,
        }
    }

    /// Every role paired with its face.
    pub fn iter(&self) -> impl Iterator<Item = (FontRole, &FontFace)> {
        [
            FontRole::Title,
            FontRole::Section,
            FontRole::Stanza,
            FontRole::Chord,
            FontRole::Comment,
            FontRole::SongNumber,
            FontRole::Index,
        ]
        .into_iter()
        .map(move |role| (role, self.face(role)))
    }
}

impl Default for FontSet {
    fn default() -> Self {
        let stanza = FontFace::new("Times", 12.0);
        let chord = FontFace::new("Helvetica", stanza.size_pt * 0.85).bold();
        let comment = FontFace::new("Times", chord.size_pt).italic();
        Self {
            title: FontFace::new("Helvetica", stanza.size_pt * 1.5).bold(),
            section: comment.clone(),
            chord,
            comment,
            song_number: FontFace::new("Helvetica", 15.0).bold(),
            index: FontFace::new("Times", 12.0),
            stanza,
        }
    }
}

/// Text colour treatment.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TextTone {
    #[default]
    Normal,
    /// The echoed tail of a lyric line, drawn de-emphasized.
    Echo,
}

/// Metadata opening a song's commands.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SongMarker {
    pub title: String,
    pub song_number: Option<u32>,
    /// The song needs a font beyond the Windows-1252 core set.
    pub needs_unicode_font: bool,
}

/// Text cell draw command.
///
/// Drawn at the current cursor; the cursor then moves right by `width`.
/// Empty text is a filler cell.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TextCommand {
    pub text: String,
    pub width: f32,
    /// Row height of the cell.
    pub height: f32,
}

impl TextCommand {
    pub fn is_filler(&self) -> bool {
        self.text.is_empty()
    }
}

/// One layout instruction. A renderer executes these in order.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum DrawCommand {
    BeginSong(SongMarker),
    SetFont(FontRole),
    SetTone(TextTone),
    /// x that [`AdvanceLine`](Self::AdvanceLine) returns to.
    SetLeftMargin { x: f32 },
    MoveTo { x: f32, y: f32 },
    Text(TextCommand),
    /// Return to the left margin and move down by `height`.
    AdvanceLine { height: f32 },
    /// Continue in column `column` (0-based) of the current page.
    NewColumn { column: usize },
    /// Start page `page_number` (1-based).
    NewPage { page_number: usize },
}

/// Recoverable layout problem.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum LayoutDiagnostic {
    /// A line wider than its column that could not be split further.
    LineOverflow {
        song: String,
        text: String,
        width: f32,
        available: f32,
    },
    /// A stanza taller than a whole column; it breaks between rows.
    StanzaTallerThanColumn {
        song: String,
        stanza: u32,
        height: f32,
        available: f32,
    },
}

impl fmt::Display for LayoutDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LineOverflow {
                song,
                text,
                width,
                available,
            } => write!(
                f,
                "{song}: line {text:?} is {width:.1} wide but only {available:.1} is available"
            ),
            Self::StanzaTallerThanColumn {
                song,
                stanza,
                height,
                available,
            } => write!(
                f,
                "{song}: stanza {stanza} is {height:.1} tall but a column holds {available:.1}"
            ),
        }
    }
}

/// Output of a layout call.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LayoutPlan {
    pub page_width: f32,
    pub page_height: f32,
    pub fonts: FontSet,
    pub commands: Vec<DrawCommand>,
    pub page_count: usize,
    pub diagnostics: Vec<LayoutDiagnostic>,
}

/// A text cell with its resolved position.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlacedText {
    pub page_number: usize,
    pub x: f32,
    /// Top of the cell.
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub text: String,
    pub font: FontRole,
    pub tone: TextTone,
}

impl fmt::Display for PlacedText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tone = match self.tone {
            TextTone::Normal => "",
            TextTone::Echo => " echo",
        };
        write!(
            f,
            "p{} {:7.2} {:7.2} {:?}{tone} {:?}",
            self.page_number, self.x, self.y, self.font, self.text
        )
    }
}

impl LayoutPlan {
    /// Replay the commands and collect every non-filler text cell.
    pub fn placements(&self) -> Vec<PlacedText> {
        let mut placed = Vec::new();
        let mut page_number = 0;
        let mut left = 0.0f32;
        let mut x = 0.0f32;
        let mut y = 0.0f32;
        let mut font = FontRole::Stanza;
        let mut tone = TextTone::Normal;
        for cmd in &self.commands {
            match cmd {
                DrawCommand::BeginSong(_) | DrawCommand::NewColumn { .. } => {}
                DrawCommand::SetFont(role) => font = *role,
                DrawCommand::SetTone(next) => tone = *next,
                DrawCommand::SetLeftMargin { x: margin } => left = *margin,
                DrawCommand::MoveTo { x: to_x, y: to_y } => {
                    x = *to_x;
                    y = *to_y;
                }
                DrawCommand::Text(text) => {
                    if !text.is_filler() {
                        placed.push(PlacedText {
                            page_number,
                            x,
                            y,
                            width: text.width,
                            height: text.height,
                            text: text.text.clone(),
                            font,
                            tone,
                        });
                    }
                    x += text.width;
                }
                DrawCommand::AdvanceLine { height } => {
                    x = left;
                    y += height;
                }
                DrawCommand::NewPage { page_number: next } => page_number = *next,
            }
        }
        placed
    }

    /// Placements on page `page_number`.
    pub fn page_placements(&self, page_number: usize) -> Vec<PlacedText> {
        self.placements()
            .into_iter()
            .filter(|text| text.page_number == page_number)
            .collect()
    }
}
