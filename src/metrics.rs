// Helvetica advance widths and proportional word wrapping

use textwrap::core::Fragment;
use textwrap::wrap_algorithms::wrap_first_fit;
use textwrap::WordSeparator;

const MM_PER_PT: f32 = 25.4 / 72.0;

/// Widths of the built-in PDF fonts have to be known up front: nothing on a
/// page can be moved once drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Face {
    Regular,
    Bold,
}

// Advance widths for ' ' (0x20) through '~' (0x7e), in 1/1000 em (Adobe AFM)
#[rustfmt::skip]
const HELVETICA: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 278, 278, 584, 584, 584, 556,
    1015, 667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778,
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 278, 278, 278, 469, 556,
    333, 556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556,
    556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, 334, 260, 334, 584,
];

#[rustfmt::skip]
const HELVETICA_BOLD: [u16; 95] = [
    278, 333, 474, 556, 556, 889, 722, 238, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 333, 333, 584, 584, 584, 611,
    975, 722, 722, 722, 722, 667, 611, 778, 722, 278, 556, 722, 611, 833, 722, 778,
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 333, 278, 333, 584, 556,
    333, 556, 611, 556, 611, 556, 333, 611, 611, 278, 278, 556, 278, 889, 611, 611,
    611, 611, 389, 556, 333, 611, 556, 778, 556, 556, 500, 389, 280, 389, 584,
];

/// Fallback for characters outside printable ASCII.
const DEFAULT_WIDTH: u16 = 556;

fn char_width(face: Face, c: char) -> u16 {
    let table = match face {
        Face::Regular => &HELVETICA,
        Face::Bold => &HELVETICA_BOLD,
    };
    let code = c as u32;
    if (0x20..=0x7e).contains(&code) {
        table[(code - 0x20) as usize]
    } else {
        DEFAULT_WIDTH
    }
}

/// Rendered width of `text` in millimetres.
pub fn text_width_mm(text: &str, face: Face, size_pt: f32) -> f32 {
    let units: u32 = text.chars().map(|c| u32::from(char_width(face, c))).sum();
    units as f32 / 1000.0 * size_pt * MM_PER_PT
}

#[derive(Debug)]
struct Measured<'a> {
    text: &'a str,
    whitespace: &'a str,
    width: f64,
    whitespace_width: f64,
}

impl Fragment for Measured<'_> {
    fn width(&self) -> f64 {
        self.width
    }

    fn whitespace_width(&self) -> f64 {
        self.whitespace_width
    }

    fn penalty_width(&self) -> f64 {
        0.0
    }
}

/// Greedy wrap of a single paragraph to `max_width_mm`. Words wider than a
/// whole line are broken between characters. An empty paragraph yields one
/// empty line.
pub fn wrap_paragraph(paragraph: &str, face: Face, size_pt: f32, max_width_mm: f32) -> Vec<String> {
    let paragraph = paragraph.trim();
    if paragraph.is_empty() {
        return vec![String::new()];
    }

    let measure = |s: &str| f64::from(text_width_mm(s, face, size_pt));
    let mut fragments = Vec::new();
    for word in WordSeparator::AsciiSpace.find_words(paragraph) {
        if word.word.is_empty() {
            continue;
        }
        for (piece, last) in split_to_width(word.word, max_width_mm, &measure) {
            let whitespace = if last { word.whitespace } else { "" };
            fragments.push(Measured {
                text: piece,
                whitespace,
                width: measure(piece),
                whitespace_width: measure(whitespace),
            });
        }
    }

    wrap_first_fit(&fragments, &[f64::from(max_width_mm)])
        .into_iter()
        .map(|line| {
            let mut out = String::new();
            for (i, fragment) in line.iter().enumerate() {
                out.push_str(fragment.text);
                if i + 1 < line.len() {
                    out.push_str(fragment.whitespace);
                }
            }
            out
        })
        .collect()
}

/// Split `word` into runs no wider than `max_width_mm`; flags the final run.
fn split_to_width<'a>(
    word: &'a str,
    max_width_mm: f32,
    measure: &dyn Fn(&str) -> f64,
) -> Vec<(&'a str, bool)> {
    let limit = f64::from(max_width_mm);
    if measure(word) <= limit {
        return vec![(word, true)];
    }

    let mut pieces = Vec::new();
    let mut start = 0;
    let mut end = 0;
    for (idx, c) in word.char_indices() {
        let next = idx + c.len_utf8();
        if end > start && measure(&word[start..next]) > limit {
            pieces.push((&word[start..end], false));
            start = end;
        }
        end = next;
    }
    pieces.push((&word[start..], true));
    pieces
}

/// Cut `line` down until `line + "..."` fits `max_width_mm`.
pub fn ellipsize(line: &str, face: Face, size_pt: f32, max_width_mm: f32) -> String {
    let mut kept: String = line.trim_end().to_string();
    loop {
        let candidate = format!("{}...", kept);
        if kept.is_empty() || text_width_mm(&candidate, face, size_pt) <= max_width_mm {
            return candidate;
        }
        kept.pop();
        let trimmed_len = kept.trim_end().len();
        kept.truncate(trimmed_len);
    }
}
