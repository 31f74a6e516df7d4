//! Line and paragraph layout.
//!
//! Runs after character cleanup and again after structural rules. Every
//! step here is a fixed point of itself and of the steps around it, which
//! is what makes normalizing already-normalized text a no-op.
//!
//! ## Steps
//!
//! 1. Paragraph segmentation: split on blank lines, collapse horizontal
//!    whitespace inside lines, drop empty lines and paragraphs
//! 2. List-marker spacing: exactly one space after a leading marker
//! 3. Punctuation spacing: one space between sentence punctuation and a
//!    following capital
//! 4. Header isolation: ALL-CAPS lines get a blank line on both sides
//! 5. Final collapse: trim, at most one blank line anywhere

use once_cell::sync::Lazy;
use regex::Regex;

// ── Compiled regexes ─────────────────────────────────────────────────────────

static RE_PARAGRAPH_BREAK: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n\s*\n").unwrap());

static RE_HORIZONTAL_WS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[ \t]+").unwrap());

static RE_SENTENCE_SPACING: Lazy<Regex> = Lazy::new(|| Regex::new(r"([.!?]) +").unwrap());

/// Leading list marker glued to (or loosely spaced from) its content.
///
/// The marker class covers every glyph that can be the canonical bullet.
/// Content may not start with whitespace, a digit, `.`, or another marker
/// char, so `1.5`, `---` and `* * *` are left alone.
static RE_LIST_MARKER: Lazy<Regex> = Lazy::new(|| {
    let glyphs: String = super::encoding::BULLET_GLYPHS
        .iter()
        .map(|c| format!("\\x{{{:X}}}", *c as u32))
        .collect();
    Regex::new(&format!(
        r"(?m)^(\d+[.)]|[A-Za-z]\)|[-*+{glyphs}])[ \t]*([^\s\d.\-*+{glyphs}])"
    ))
    .unwrap()
});

static RE_PUNCT_CAPITAL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([.!?:;])[ \t]*([A-Z])").unwrap());

static RE_HEADER_LINE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Z][A-Z ]*[A-Z]$").unwrap());

static RE_EXCESS_NEWLINES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").unwrap());

// ── Public API ───────────────────────────────────────────────────────────────

/// Apply all layout steps in order.
pub fn layout(input: &str) -> String {
    let s = segment_paragraphs(input);
    let s = fix_list_spacing(&s);
    let s = fix_punctuation_spacing(&s);
    let s = isolate_headers(&s);
    final_collapse(&s)
}

/// Collapse any run of three or more newlines to a single blank line.
pub fn collapse_blank_runs(input: &str) -> String {
    RE_EXCESS_NEWLINES.replace_all(input, "\n\n").into_owned()
}

// ── Step 1: Paragraph segmentation ───────────────────────────────────────────

fn segment_paragraphs(input: &str) -> String {
    RE_PARAGRAPH_BREAK
        .split(input)
        .filter_map(clean_paragraph)
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn clean_paragraph(paragraph: &str) -> Option<String> {
    let lines: Vec<String> = paragraph
        .lines()
        .map(|line| RE_HORIZONTAL_WS.replace_all(line, " ").trim().to_string())
        .filter(|line| !line.is_empty())
        .collect();
    if lines.is_empty() {
        return None;
    }
    let joined = lines.join("\n");
    Some(RE_SENTENCE_SPACING.replace_all(&joined, "$1 ").into_owned())
}

// ── Step 2: List markers ─────────────────────────────────────────────────────

fn fix_list_spacing(input: &str) -> String {
    RE_LIST_MARKER.replace_all(input, "$1 $2").into_owned()
}

// ── Step 3: Punctuation before capitals ──────────────────────────────────────

fn fix_punctuation_spacing(input: &str) -> String {
    RE_PUNCT_CAPITAL.replace_all(input, "$1 $2").into_owned()
}

// ── Step 4: ALL-CAPS headers ─────────────────────────────────────────────────

fn isolate_headers(input: &str) -> String {
    let mut out: Vec<&str> = Vec::new();
    let mut after_header = false;
    for line in input.split('\n') {
        let is_header = RE_HEADER_LINE.is_match(line);
        let needs_gap = (is_header || after_header)
            && !line.is_empty()
            && out.last().is_some_and(|prev| !prev.is_empty());
        if needs_gap {
            out.push("");
        }
        out.push(line);
        after_header = is_header;
    }
    out.join("\n")
}

// ── Step 5: Final collapse ───────────────────────────────────────────────────

fn final_collapse(input: &str) -> String {
    collapse_blank_runs(input.trim())
}

// ── Tests ────────────────────────────────────────────────────────────────────
