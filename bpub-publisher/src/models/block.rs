//! Parsed content blocks
//!
//! A document is an ordered `Vec<Block>`: created once by the parser,
//! consumed once, in order, by the renderer.

use serde::{Deserialize, Serialize};

/// One structurally-typed unit of parsed content
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Block {
    /// `## text ##`
    Heading { text: String },
    /// `> text` or `@@text@@`
    Quote { text: String },
    /// `[이미지N]` (0-based `explicit_index = N-1`) or unindexed `[이미지]`
    ImageMarker { explicit_index: Option<usize> },
    /// Line with at least one balanced `**bold**` pair
    MixedText { text: String },
    PlainText { text: String },
    /// Blank line (paragraph break)
    Empty,
}

impl Block {
    /// Short kind name for reports and logs
    pub fn kind(&self) -> &'static str {
        match self {
            Block::Heading { .. } => "heading",
            Block::Quote { .. } => "quote",
            Block::ImageMarker { .. } => "image",
            Block::MixedText { .. } => "mixed_text",
            Block::PlainText { .. } => "plain_text",
            Block::Empty => "empty",
        }
    }

    /// Text content, if the block carries any
    pub fn text(&self) -> Option<&str> {
        match self {
            Block::Heading { text }
            | Block::Quote { text }
            | Block::MixedText { text }
            | Block::PlainText { text } => Some(text),
            Block::ImageMarker { .. } | Block::Empty => None,
        }
    }

    /// True for blocks that type paragraph text
    pub fn is_body_text(&self) -> bool {
        matches!(self, Block::MixedText { .. } | Block::PlainText { .. })
    }
}

/// A run of a mixed-text line: plain or bold
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BoldRun {
    pub text: String,
    pub bold: bool,
}

impl BoldRun {
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            bold: false,
        }
    }

    pub fn bold(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            bold: true,
        }
    }
}
