//! Post-processing: deterministic cleanup of exported Markdown.
//!
//! PDF text layers carry artefacts that survive layout analysis: CRLF line
//! ends from some producers, typographic ligatures (`ﬁ`, `ﬂ`), non-breaking
//! and zero-width spaces, soft hyphens. These passes remove them without
//! touching content.
//!
//! ## Rule Order
//!
//! Line endings are normalised before any line-based rule, and the final
//! newline pass runs last.

use once_cell::sync::Lazy;
use regex::Regex;

/// Apply all post-processing rules to exported Markdown.
///
/// Rules (applied in order):
/// 1. Normalise line endings (CRLF/CR → LF)
/// 2. Expand typographic ligatures and fold exotic spaces to ASCII space
/// 3. Strip invisible Unicode (zero-width spaces, BOM, soft hyphens) and
///    C0 control characters other than tab and newline
/// 4. Trim trailing whitespace per line
/// 5. Collapse runs of blank lines to a single blank line
/// 6. Ensure heading lines have a blank line before them
/// 7. Ensure the text ends with exactly one newline
pub fn clean_markdown(input: &str) -> String {
    let s = normalise_line_endings(input);
    let s = expand_ligatures(&s);
    let s = remove_invisible_chars(&s);
    let s = trim_trailing_whitespace(&s);
    let s = collapse_blank_lines(&s);
    let s = normalise_heading_spacing(&s);
    ensure_final_newline(&s)
}

// ── Rule 1: Normalise line endings ───────────────────────────────────────────

fn normalise_line_endings(input: &str) -> String {
    input.replace("\r\n", "\n").replace('\r', "\n")
}

// ── Rule 2: Ligatures and spaces ─────────────────────────────────────────────

const LIGATURES: &[(char, &str)] = &[
    ('\u{FB00}', "ff"),
    ('\u{FB01}', "fi"),
    ('\u{FB02}', "fl"),
    ('\u{FB03}', "ffi"),
    ('\u{FB04}', "ffl"),
    ('\u{FB05}', "st"),
    ('\u{FB06}', "st"),
];

fn expand_ligatures(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '\u{00A0}' | '\u{2007}' | '\u{202F}' => out.push(' '),
            _ => match LIGATURES.iter().find(|(lig, _)| *lig == ch) {
                Some((_, expanded)) => out.push_str(expanded),
                None => out.push(ch),
            },
        }
    }
    out
}

// ── Rule 3: Remove invisible Unicode characters ─────────────────────────────

fn remove_invisible_chars(input: &str) -> String {
    input
        .replace(
            [
                '\u{200B}', '\u{FEFF}', '\u{00AD}', '\u{200C}', '\u{200D}', '\u{2060}',
            ],
            "",
        )
        .replace(|c: char| c.is_ascii_control() && c != '\n' && c != '\t', "")
}

// ── Rule 4: Trim trailing whitespace per line ────────────────────────────────

fn trim_trailing_whitespace(input: &str) -> String {
    input
        .lines()
        .map(|line| line.trim_end())
        .collect::<Vec<_>>()
        .join("\n")
}

// ── Rule 5: Collapse excessive blank lines ───────────────────────────────────

static RE_BLANK_LINES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").unwrap());

fn collapse_blank_lines(input: &str) -> String {
    RE_BLANK_LINES.replace_all(input, "\n\n").to_string()
}

// ── Rule 6: Normalise heading spacing ────────────────────────────────────────

static RE_HEADING: Lazy<Regex> = Lazy::new(|| Regex::new(r"^#{1,6} \S").unwrap());

fn normalise_heading_spacing(input: &str) -> String {
    let mut result = String::with_capacity(input.len() + 64);
    for (i, line) in input.lines().enumerate() {
        if i > 0 && RE_HEADING.is_match(line) {
            let trimmed = result.trim_end_matches('\n').len();
            result.truncate(trimmed);
            result.push_str("\n\n");
        }
        result.push_str(line);
        result.push('\n');
    }
    result
}

// ── Rule 7: Ensure file ends with single newline ─────────────────────────────

fn ensure_final_newline(input: &str) -> String {
    let trimmed = input.trim_end();
    if trimmed.is_empty() {
        String::from("\n")
    } else {
        format!("{}\n", trimmed)
    }
}
