//! Character-level cleanup: everything the normalizer does before it looks
//! at lines and paragraphs.
//!
//! ## Why a generated mojibake table?
//!
//! PDF text that went through a UTF-8 → Windows-1252 → UTF-8 round trip
//! turns `’` into `â€™`, `•` into `â€¢` and a non-breaking space into
//! `Â` followed by U+00A0. Rather than typing those sequences by hand we list
//! the characters we know how to repair and derive the misread form of each
//! one by pushing its UTF-8 bytes through the Windows-1252 code page. The
//! same code page table decodes byte input that is not valid UTF-8.
//!
//! ## Stage order
//!
//! 1. Normalise line endings
//! 2. Strip C0 control characters (keep `\n`, `\t`)
//! 3. Repair mojibake, then fold typographic punctuation to ASCII
//! 4. Unify bullet glyphs to the canonical bullet
//! 5. Clamp to printable ASCII (plus the canonical bullet)
//!
//! Repair has to run before folding (the misread sequences contain `—`, `€`
//! and `™`), and folding before the clamp, otherwise dashes and quotes would
//! be deleted instead of converted.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use tracing::debug;

/// Every glyph treated as a list-item marker.
///
/// The last two are the Symbol/Wingdings private-use bullets that Word
/// exports leave behind in PDF text layers.
pub const BULLET_GLYPHS: &[char] = &[
    '\u{2022}', // •
    '\u{25CF}', // ●
    '\u{25CB}', // ○
    '\u{25E6}', // ◦
    '\u{25A0}', // ■
    '\u{25A1}', // □
    '\u{25AA}', // ▪
    '\u{25AB}', // ▫
    '\u{2023}', // ‣
    '\u{2043}', // ⁃
    '\u{2219}', // ∙
    '\u{25C6}', // ◆
    '\u{25C7}', // ◇
    '\u{25BA}', // ►
    '\u{27A2}', // ➢
    '\u{27A4}', // ➤
    '\u{F0B7}',
    '\u{F0A7}',
];

/// `true` when `c` may serve as the canonical bullet.
///
/// ASCII list markers, or one of the known glyphs. Anything else would
/// either be deleted by the clamp or collide with the mojibake table.
pub fn is_valid_bullet(c: char) -> bool {
    matches!(c, '*' | '-' | '+') || BULLET_GLYPHS.contains(&c)
}

/// Which decoding produced the text the normalizer saw.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SourceEncoding {
    /// Input bytes were valid UTF-8.
    #[default]
    Utf8,
    /// Input bytes were not valid UTF-8 and were decoded as Windows-1252.
    Windows1252,
}

// ── Windows-1252 ─────────────────────────────────────────────────────────────

/// Code points for bytes 0x80–0x9F. Bytes the code page leaves undefined
/// map to the C1 control with the same value, like most decoders do.
#[rustfmt::skip]
const CP1252_HIGH: [char; 32] = [
    '\u{20AC}', '\u{0081}', '\u{201A}', '\u{0192}', '\u{201E}', '\u{2026}', '\u{2020}', '\u{2021}',
    '\u{02C6}', '\u{2030}', '\u{0160}', '\u{2039}', '\u{0152}', '\u{008D}', '\u{017D}', '\u{008F}',
    '\u{0090}', '\u{2018}', '\u{2019}', '\u{201C}', '\u{201D}', '\u{2022}', '\u{2013}', '\u{2014}',
    '\u{02DC}', '\u{2122}', '\u{0161}', '\u{203A}', '\u{0153}', '\u{009D}', '\u{017E}', '\u{0178}',
];

fn cp1252_char(b: u8) -> char {
    match b {
        0x80..=0x9F => CP1252_HIGH[(b - 0x80) as usize],
        _ => char::from(b),
    }
}

/// Decode raw bytes, falling back to Windows-1252 when they are not UTF-8.
///
/// The fallback is total (every byte maps to a character), so decoding never
/// fails; the caller learns which path was taken from the returned
/// [`SourceEncoding`].
pub fn decode_bytes(bytes: &[u8]) -> (Cow<'_, str>, SourceEncoding) {
    match std::str::from_utf8(bytes) {
        Ok(text) => (Cow::Borrowed(text), SourceEncoding::Utf8),
        Err(e) => {
            debug!(
                "Input is not valid UTF-8 (first bad byte at {}), decoding as Windows-1252",
                e.valid_up_to()
            );
            let text: String = bytes.iter().map(|&b| cp1252_char(b)).collect();
            (Cow::Owned(text), SourceEncoding::Windows1252)
        }
    }
}

/// Run stages 1–5 over already-decoded text.
pub fn clean_characters(input: &str, bullet: char) -> String {
    let s = normalise_line_endings(input);
    let s = strip_control_chars(&s);
    let s = repair_mojibake(&s);
    let s = fold_typography(&s, bullet);
    let s = unify_bullets(&s, bullet);
    clamp_charset(&s, bullet)
}

// ── Stage 1: Line endings ────────────────────────────────────────────────────

fn normalise_line_endings(input: &str) -> String {
    input.replace("\r\n", "\n").replace('\r', "\n")
}

// ── Stage 2: C0 controls ─────────────────────────────────────────────────────

fn strip_control_chars(input: &str) -> String {
    input
        .chars()
        .filter(|&c| c == '\n' || c == '\t' || !(c.is_ascii_control()))
        .collect()
}

// ── Stage 3: Mojibake repair + typographic folding ───────────────────────────

/// Characters whose Windows-1252 misreading we undo.
const REPAIRABLE: &[char] = &[
    '\u{2018}', '\u{2019}', '\u{201A}', '\u{201C}', '\u{201D}', '\u{201E}', '\u{2032}',
    '\u{2033}', '\u{2013}', '\u{2014}', '\u{2026}', '\u{2022}', '\u{00A0}', '\u{202F}',
    '\u{00AD}', '\u{200B}', '\u{200C}', '\u{200D}', '\u{2060}', '\u{FEFF}', '\u{25CF}',
    '\u{25CB}', '\u{25E6}', '\u{25A0}', '\u{25AA}', '\u{25AB}', '\u{2023}', '\u{2043}',
];

/// `(misread sequence, repaired text)`, longest sequence first.
static MOJIBAKE: Lazy<Vec<(String, String)>> = Lazy::new(|| {
    let mut table: Vec<(String, String)> = REPAIRABLE
        .iter()
        .map(|&c| (misread_as_cp1252(c), c.to_string()))
        .collect();
    // Truncated closing quote (the 0x9D byte is often dropped) and the
    // leftover lead byte of a mangled non-breaking space.
    table.push(("\u{E2}\u{20AC}".to_string(), "\"".to_string()));
    table.push(("\u{C2}".to_string(), String::new()));
    table.sort_by(|a, b| b.0.chars().count().cmp(&a.0.chars().count()));
    table
});

fn misread_as_cp1252(c: char) -> String {
    let mut buf = [0u8; 4];
    c.encode_utf8(&mut buf).bytes().map(cp1252_char).collect()
}

fn repair_mojibake(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;
    'scan: while let Some(c) = rest.chars().next() {
        if c == '\u{E2}' || c == '\u{C2}' || c == '\u{EF}' {
            for (bad, good) in MOJIBAKE.iter() {
                if rest.starts_with(bad.as_str()) {
                    out.push_str(good);
                    rest = &rest[bad.len()..];
                    continue 'scan;
                }
            }
        }
        out.push(c);
        rest = &rest[c.len_utf8()..];
    }
    out
}

fn fold_typography(input: &str, bullet: char) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        if c == bullet {
            out.push(c);
            continue;
        }
        match c {
            '\u{2018}' | '\u{2019}' | '\u{201A}' | '\u{201B}' | '\u{2032}' => out.push('\''),
            '\u{201C}' | '\u{201D}' | '\u{201E}' | '\u{201F}' | '\u{2033}' | '\u{00AB}'
            | '\u{00BB}' => out.push('"'),
            '\u{2010}'..='\u{2015}' | '\u{2212}' => out.push('-'),
            '\u{2026}' => out.push_str("..."),
            '\u{2039}' => out.push('<'),
            '\u{203A}' => out.push('>'),
            '\u{00A0}' | '\u{202F}' | '\u{2000}'..='\u{200A}' | '\u{3000}' => out.push(' '),
            '\u{200B}'..='\u{200D}' | '\u{2060}' | '\u{FEFF}' | '\u{00AD}' => {}
            _ => out.push(c),
        }
    }
    out
}

// ── Stage 4: Bullets ─────────────────────────────────────────────────────────

fn unify_bullets(input: &str, bullet: char) -> String {
    input
        .chars()
        .map(|c| if BULLET_GLYPHS.contains(&c) { bullet } else { c })
        .collect()
}

// ── Stage 5: Charset clamp ───────────────────────────────────────────────────

fn clamp_charset(input: &str, bullet: char) -> String {
    input
        .chars()
        .filter(|&c| c == '\n' || c == '\t' || (' '..='~').contains(&c) || c == bullet)
        .collect()
}

// ── Tests ────────────────────────────────────────────────────────────────────
