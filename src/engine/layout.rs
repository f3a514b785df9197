//! Layout analysis over positioned text runs.
//!
//! Input is what a PDF text layer gives us: runs of text with a bounding box
//! (top-left origin, points). Output is a list of [`Block`]s in reading order.
//!
//! 1. Group runs into lines by vertical overlap.
//! 2. Split each line into cells at wide horizontal gaps.
//! 3. Mark table regions: consecutive multi-cell lines with a stable cell
//!    count and short cells.
//! 4. Classify remaining lines as headings (taller than body text), list
//!    items (bullet or number marker), or paragraph text, merging wrapped
//!    lines and de-hyphenating at line breaks.
//!
//! Body-text height is measured over the whole document, not per page, so a
//! title page is not mistaken for body text.

use crate::document::{Block, Table};
use once_cell::sync::Lazy;
use regex::Regex;
use std::cmp::Ordering;
use std::collections::HashMap;

/// A run of text with its bounding box. `y` is the top edge, measured down
/// from the top of the page.
#[derive(Debug, Clone, PartialEq)]
pub struct TextRun {
    pub text: String,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl TextRun {
    fn right(&self) -> f32 {
        self.x + self.width
    }

    fn bottom(&self) -> f32 {
        self.y + self.height
    }
}

/// Thresholds, in multiples of line height unless noted.
#[derive(Debug, Clone)]
pub struct LayoutOptions {
    /// Rebuild tables from aligned cells.
    pub detect_tables: bool,
    /// Line height / body height at or above which a line is a heading.
    pub heading_ratio: f32,
    /// Horizontal gap that separates two cells on one line.
    pub cell_gap: f32,
    /// Vertical gap above which a new paragraph starts.
    pub paragraph_gap: f32,
    pub min_table_rows: usize,
    pub min_table_cols: usize,
    /// Mean characters per cell above which a grid is read as text columns.
    pub max_table_cell_chars: usize,
}

impl Default for LayoutOptions {
    fn default() -> Self {
        Self {
            detect_tables: true,
            heading_ratio: 1.15,
            cell_gap: 1.5,
            paragraph_gap: 0.8,
            min_table_rows: 3,
            min_table_cols: 2,
            max_table_cell_chars: 40,
        }
    }
}

// ── Body height ──────────────────────────────────────────────────────────────

/// Dominant text height, weighted by character count.
///
/// Heights are bucketed to whole points; the bucket holding the most
/// characters wins, ties going to the smaller height.
pub fn body_height<'a>(runs: impl IntoIterator<Item = &'a TextRun>) -> Option<f32> {
    let mut buckets: HashMap<i32, usize> = HashMap::new();
    for run in runs {
        let chars = run.text.chars().filter(|c| !c.is_whitespace()).count();
        if chars == 0 || run.height <= 0.0 {
            continue;
        }
        *buckets.entry(run.height.round() as i32).or_default() += chars;
    }
    buckets
        .into_iter()
        .max_by(|(ha, ca), (hb, cb)| ca.cmp(cb).then(hb.cmp(ha)))
        .map(|(h, _)| (h as f32).max(1.0))
}

// ── Lines and cells ──────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
struct Cell {
    text: String,
    x: f32,
    right: f32,
}

#[derive(Debug, Clone)]
struct Line {
    cells: Vec<Cell>,
    top: f32,
    bottom: f32,
    height: f32,
}

impl Line {
    fn left(&self) -> f32 {
        self.cells.first().map(|c| c.x).unwrap_or(0.0)
    }

    fn text(&self) -> String {
        self.cells
            .iter()
            .map(|c| c.text.trim())
            .filter(|t| !t.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

fn by_position(a: &TextRun, b: &TextRun) -> Ordering {
    a.y.partial_cmp(&b.y)
        .unwrap_or(Ordering::Equal)
        .then(a.x.partial_cmp(&b.x).unwrap_or(Ordering::Equal))
}

fn group_lines(runs: &[TextRun], opts: &LayoutOptions) -> Vec<Line> {
    let mut sorted: Vec<&TextRun> = runs
        .iter()
        .filter(|r| r.height > 0.0 && !r.text.trim().is_empty())
        .collect();
    sorted.sort_by(|a, b| by_position(a, b));

    // Runs sharing at least half of the smaller height belong to one line.
    let mut groups: Vec<Vec<&TextRun>> = Vec::new();
    for run in sorted {
        let found = groups.iter_mut().rev().find(|g| {
            let top = g.iter().map(|r| r.y).fold(f32::INFINITY, f32::min);
            let bottom = g.iter().map(|r| r.bottom()).fold(f32::NEG_INFINITY, f32::max);
            let overlap = bottom.min(run.bottom()) - top.max(run.y);
            overlap >= 0.5 * run.height.min(bottom - top)
        });
        match found {
            Some(group) => group.push(run),
            None => groups.push(vec![run]),
        }
    }

    let mut lines: Vec<Line> = groups
        .into_iter()
        .map(|mut group| {
            group.sort_by(|a, b| a.x.partial_cmp(&b.x).unwrap_or(Ordering::Equal));
            build_line(&group, opts)
        })
        .collect();
    lines.sort_by(|a, b| a.top.partial_cmp(&b.top).unwrap_or(Ordering::Equal));
    lines
}

fn build_line(runs: &[&TextRun], opts: &LayoutOptions) -> Line {
    let height = runs.iter().map(|r| r.height).fold(0.0, f32::max);
    let top = runs.iter().map(|r| r.y).fold(f32::INFINITY, f32::min);
    let bottom = runs.iter().map(|r| r.bottom()).fold(f32::NEG_INFINITY, f32::max);

    let mut cells: Vec<Cell> = Vec::new();
    for run in runs {
        match cells.last_mut() {
            Some(cell) if run.x - cell.right <= opts.cell_gap * height => {
                let gap = run.x - cell.right;
                let needs_space = gap > 0.15 * height
                    && !cell.text.ends_with(char::is_whitespace)
                    && !run.text.starts_with(char::is_whitespace);
                if needs_space {
                    cell.text.push(' ');
                }
                cell.text.push_str(&run.text);
                cell.right = cell.right.max(run.right());
            }
            _ => cells.push(Cell {
                text: run.text.clone(),
                x: run.x,
                right: run.right(),
            }),
        }
    }

    Line {
        cells,
        top,
        bottom,
        height,
    }
}

// ── Tables ───────────────────────────────────────────────────────────────────

static RE_BULLET: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[•●▪◦‣∙·\-*]\s+(\S.*)$").unwrap());
static RE_NUMBERED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{1,3})[.)]\s+(\S.*)$").unwrap());
static RE_MARKER_ONLY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?:[•●▪◦‣∙·\-*]|\d{1,3}[.)])$").unwrap());

fn is_table_candidate(line: &Line, opts: &LayoutOptions) -> bool {
    line.cells.len() >= opts.min_table_cols
        && !RE_MARKER_ONLY.is_match(line.cells[0].text.trim())
}

/// Half-open line ranges that form tables.
fn find_table_regions(lines: &[Line], opts: &LayoutOptions) -> Vec<(usize, usize)> {
    let mut regions = Vec::new();
    let mut start: Option<usize> = None;
    let mut expected = 0usize;

    let close = |start: usize, end: usize, regions: &mut Vec<(usize, usize)>| {
        if end - start >= opts.min_table_rows && short_cells(&lines[start..end], opts) {
            regions.push((start, end));
        }
    };

    for (i, line) in lines.iter().enumerate() {
        if !is_table_candidate(line, opts) {
            if let Some(s) = start.take() {
                close(s, i, &mut regions);
            }
            continue;
        }
        let cols = line.cells.len();
        match start {
            Some(_) if cols.abs_diff(expected) <= 1 => {}
            Some(s) => {
                close(s, i, &mut regions);
                start = Some(i);
                expected = cols;
            }
            None => {
                start = Some(i);
                expected = cols;
            }
        }
    }
    if let Some(s) = start {
        close(s, lines.len(), &mut regions);
    }
    regions
}

fn short_cells(lines: &[Line], opts: &LayoutOptions) -> bool {
    let (chars, cells) = lines
        .iter()
        .flat_map(|l| l.cells.iter())
        .fold((0usize, 0usize), |(ch, n), c| {
            (ch + c.text.trim().chars().count(), n + 1)
        });
    cells > 0 && chars / cells <= opts.max_table_cell_chars
}

fn build_table(lines: &[Line], opts: &LayoutOptions) -> Option<Table> {
    let height = lines.iter().map(|l| l.height).sum::<f32>() / lines.len() as f32;
    let tolerance = opts.cell_gap * height;

    let mut xs: Vec<f32> = lines
        .iter()
        .flat_map(|l| l.cells.iter().map(|c| c.x))
        .collect();
    xs.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));

    // Column left edges: start a new column when x jumps past the tolerance.
    let mut columns: Vec<f32> = Vec::new();
    for x in xs {
        match columns.last() {
            Some(&left) if x - left <= tolerance => {}
            _ => columns.push(x),
        }
    }
    if columns.len() < opts.min_table_cols {
        return None;
    }

    let rows = lines
        .iter()
        .map(|line| {
            let mut row = vec![String::new(); columns.len()];
            for cell in &line.cells {
                let col = columns
                    .iter()
                    .rposition(|&left| left <= cell.x + 0.5 * height)
                    .unwrap_or(0);
                let text = cell.text.trim();
                if row[col].is_empty() {
                    row[col] = text.to_string();
                } else {
                    row[col].push(' ');
                    row[col].push_str(text);
                }
            }
            row
        })
        .collect();

    Some(Table { rows })
}

// ── Text flow ────────────────────────────────────────────────────────────────

enum Pending {
    Heading { level: u8, text: String },
    Paragraph { text: String, height: f32 },
    Item { ordinal: Option<u32>, text: String, left: f32, height: f32 },
}

impl Pending {
    fn into_block(self) -> Block {
        match self {
            Pending::Heading { level, text } => Block::Heading { level, text },
            Pending::Paragraph { text, .. } => Block::Paragraph(text),
            Pending::Item { ordinal, text, .. } => Block::ListItem { ordinal, text },
        }
    }
}

fn heading_level(ratio: f32) -> u8 {
    if ratio >= 1.8 {
        1
    } else if ratio >= 1.4 {
        2
    } else {
        3
    }
}

/// Split a list marker off the start of a line.
fn list_marker(text: &str) -> Option<(Option<u32>, String)> {
    if let Some(caps) = RE_NUMBERED.captures(text) {
        let n = caps[1].parse().ok()?;
        return Some((Some(n), caps[2].to_string()));
    }
    RE_BULLET
        .captures(text)
        .map(|caps| (None, caps[1].to_string()))
}

/// PDFium's marker for a hyphen inserted at a line break.
pub const BREAK_HYPHEN: char = '\u{2}';

/// Text of a run as it should reach layout: break hyphens become `-`.
pub fn normalise_run_text(text: &str) -> String {
    text.replace(BREAK_HYPHEN, "-")
}

/// Append a wrapped line, re-joining words hyphenated at the break.
fn join_wrapped(acc: &mut String, next: &str) {
    let mut tail = acc.chars().rev();
    let hyphenated = tail.next().is_some_and(|c| c == '-' || c == BREAK_HYPHEN)
        && tail.next().is_some_and(char::is_alphabetic)
        && next.chars().next().is_some_and(char::is_lowercase);
    if hyphenated {
        acc.pop();
    } else if !acc.is_empty() {
        acc.push(' ');
    }
    acc.push_str(next);
}

fn similar_height(a: f32, b: f32) -> bool {
    (a - b).abs() <= 0.25 * a.max(b)
}

/// Turn one page of runs into blocks.
pub fn analyze_page(runs: &[TextRun], body: f32, opts: &LayoutOptions) -> Vec<Block> {
    let lines = group_lines(runs, opts);
    let regions = if opts.detect_tables {
        find_table_regions(&lines, opts)
    } else {
        Vec::new()
    };

    let mut blocks = Vec::new();
    let mut pending: Option<Pending> = None;
    let mut prev_bottom: Option<f32> = None;
    let mut i = 0;

    while i < lines.len() {
        if let Some(&(start, end)) = regions.iter().find(|(s, _)| *s == i) {
            if let Some(table) = build_table(&lines[start..end], opts) {
                if let Some(p) = pending.take() {
                    blocks.push(p.into_block());
                }
                blocks.push(Block::Table(table));
                prev_bottom = None;
                i = end;
                continue;
            }
        }

        let line = &lines[i];
        i += 1;
        let text = line.text();
        if text.is_empty() {
            continue;
        }

        let gap = prev_bottom.map(|b| line.top - b);
        prev_bottom = Some(line.bottom);
        let close_to_prev = gap.is_some_and(|g| g <= opts.paragraph_gap * line.height);
        let ratio = line.height / body;

        if ratio >= opts.heading_ratio && text.chars().count() <= 150 {
            let level = heading_level(ratio);
            let extends = matches!(
                &pending,
                Some(Pending::Heading { level: l, .. }) if *l == level && close_to_prev
            );
            if extends {
                if let Some(Pending::Heading { text: acc, .. }) = pending.as_mut() {
                    join_wrapped(acc, &text);
                }
            } else {
                if let Some(p) = pending.take() {
                    blocks.push(p.into_block());
                }
                pending = Some(Pending::Heading { level, text });
            }
            continue;
        }

        if let Some((ordinal, rest)) = list_marker(&text) {
            if let Some(p) = pending.take() {
                blocks.push(p.into_block());
            }
            pending = Some(Pending::Item {
                ordinal,
                text: rest,
                left: line.left(),
                height: line.height,
            });
            continue;
        }

        let continues = match &pending {
            Some(Pending::Paragraph { height, .. }) => {
                close_to_prev && similar_height(*height, line.height)
            }
            Some(Pending::Item { left, height, .. }) => {
                close_to_prev
                    && similar_height(*height, line.height)
                    && line.left() >= left + 0.5 * line.height
            }
            _ => false,
        };

        if continues {
            if let Some(Pending::Paragraph { text: acc, .. } | Pending::Item { text: acc, .. }) =
                pending.as_mut()
            {
                join_wrapped(acc, &text);
            }
        } else {
            if let Some(p) = pending.take() {
                blocks.push(p.into_block());
            }
            pending = Some(Pending::Paragraph {
                text,
                height: line.height,
            });
        }
    }

    if let Some(p) = pending {
        blocks.push(p.into_block());
    }
    blocks
}
