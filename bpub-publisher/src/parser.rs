//! Block grammar parser
//!
//! Line-oriented, pure and deterministic. Each line becomes exactly one
//! [`Block`]; the first matching rule wins:
//!
//! | line (trimmed)                         | block                         |
//! |----------------------------------------|-------------------------------|
//! | blank / whitespace only                | `Empty`                       |
//! | `## text`, `## text ##`, `### **t**`    | `Heading`                     |
//! | `> text`, `@@text@@`                   | `Quote`                       |
//! | `[이미지N]`, `[imageN]` (N ≥ 1)          | `ImageMarker{Some(N-1)}`      |
//! | `[이미지]`, `[image]`                    | `ImageMarker{None}`           |
//! | contains a balanced `**bold**` pair    | `MixedText`                   |
//! | anything else                          | `PlainText`                   |
//!
//! Unbalanced `**` never fails the parse; leftover delimiters stay literal.

use crate::models::{Block, BoldRun};
use once_cell::sync::Lazy;
use regex::Regex;

static HEADING: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^#{2,}\s*(.*?)\s*#*\s*$").expect("valid heading regex"));

static QUOTE_ANGLE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^>\s*(.*)$").expect("valid quote regex"));

static QUOTE_AT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^@@(.+?)@@$").expect("valid quote regex"));

static IMAGE_MARKER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^\[\s*(?:이미지|image)\s*(\d*)\s*\]$").expect("valid image marker regex")
});

// Empty pairs (`****`) must match too, or delimiters pair up across the line
static BOLD_PAIR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\*\*(.*?)\*\*").expect("valid bold regex"));

const BOLD_DELIMITER: &str = "**";

/// Parse raw generated text into an ordered block sequence
pub fn parse(text: &str) -> Vec<Block> {
    text.lines().map(parse_line).collect()
}

/// Classify a single line
pub fn parse_line(line: &str) -> Block {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Block::Empty;
    }

    if let Some(caps) = HEADING.captures(trimmed) {
        let text = strip_bold(&caps[1]);
        if !text.is_empty() {
            return Block::Heading { text };
        }
    }

    if let Some(text) = quote_text(trimmed) {
        return Block::Quote { text };
    }

    if let Some(caps) = IMAGE_MARKER.captures(trimmed) {
        let digits = &caps[1];
        if digits.is_empty() {
            return Block::ImageMarker {
                explicit_index: None,
            };
        }
        // [이미지0] and overflowing numbers are not markers
        if let Some(n) = digits.parse::<usize>().ok().filter(|n| *n >= 1) {
            return Block::ImageMarker {
                explicit_index: Some(n - 1),
            };
        }
    }

    let text = line.trim_end().to_string();
    if has_bold_text(&split_bold_runs(trimmed)) {
        Block::MixedText { text }
    } else {
        Block::PlainText { text }
    }
}

fn quote_text(trimmed: &str) -> Option<String> {
    let raw = QUOTE_AT
        .captures(trimmed)
        .or_else(|| QUOTE_ANGLE.captures(trimmed))
        .map(|caps| caps[1].to_string())?;
    let text = strip_bold(&raw);
    (!text.is_empty()).then_some(text)
}

fn strip_bold(text: &str) -> String {
    text.replace(BOLD_DELIMITER, "").trim().to_string()
}

/// Split a mixed-text line into alternating plain/bold runs
///
/// Delimiters pair up left to right, so a line with `2n` delimiters yields
/// exactly `n` bold runs; `****` is an empty bold run. Empty plain runs are
/// omitted; an unmatched trailing `**` stays inside the last plain run.
pub fn split_bold_runs(text: &str) -> Vec<BoldRun> {
    let mut runs = Vec::new();
    let mut cursor = 0;

    for caps in BOLD_PAIR.captures_iter(text) {
        let (Some(whole), Some(inner)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        if whole.start() > cursor {
            runs.push(BoldRun::plain(&text[cursor..whole.start()]));
        }
        runs.push(BoldRun::bold(inner.as_str()));
        cursor = whole.end();
    }

    if cursor < text.len() {
        runs.push(BoldRun::plain(&text[cursor..]));
    }
    runs
}

/// True when at least one bold run has text to type
fn has_bold_text(runs: &[BoldRun]) -> bool {
    runs.iter().any(|r| r.bold && !r.text.is_empty())
}

/// True when a plain run still contains a bold delimiter
pub fn has_stray_delimiter(runs: &[BoldRun]) -> bool {
    runs.iter().any(|r| !r.bold && r.text.contains(BOLD_DELIMITER))
}

/// Number of image markers in a block sequence
pub fn image_marker_count(blocks: &[Block]) -> usize {
    blocks
        .iter()
        .filter(|b| matches!(b, Block::ImageMarker { .. }))
        .count()
}
