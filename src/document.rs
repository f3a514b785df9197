//! Structured document model and Markdown export.
//!
//! A [`Document`] is what a converter hands back: metadata plus pages of
//! layout [`Block`]s in reading order. [`Document::export_to_markdown`] is the
//! single export operation; it renders blocks, joins pages with the chosen
//! separator and runs the result through [`crate::postprocess::clean_markdown`].

use crate::config::PageSeparator;
use crate::postprocess::clean_markdown;
use serde::Serialize;

/// Document-level metadata read from the PDF info dictionary.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DocumentMetadata {
    pub title: Option<String>,
    pub author: Option<String>,
    pub subject: Option<String>,
    pub creator: Option<String>,
    pub producer: Option<String>,
    /// Total pages in the file, not just the selected ones.
    pub page_count: usize,
    pub pdf_version: String,
}

/// One layout element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    /// `level` is 1–6.
    Heading { level: u8, text: String },
    Paragraph(String),
    /// `ordinal` is `Some(n)` for numbered items, `None` for bullets.
    ListItem { ordinal: Option<u32>, text: String },
    Table(Table),
}

/// A reconstructed table; the first row is treated as the header.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Table {
    pub rows: Vec<Vec<String>>,
}

impl Table {
    pub fn columns(&self) -> usize {
        self.rows.iter().map(Vec::len).max().unwrap_or(0)
    }
}

/// A page and its blocks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    /// 1-indexed page number in the source PDF.
    pub number: usize,
    pub blocks: Vec<Block>,
}

/// Export knobs.
#[derive(Debug, Clone, Default)]
pub struct ExportOptions {
    pub page_separator: PageSeparator,
    pub include_metadata: bool,
}

/// A converted document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Document {
    pub metadata: DocumentMetadata,
    pub pages: Vec<Page>,
}

impl Document {
    pub fn block_count(&self) -> usize {
        self.pages.iter().map(|p| p.blocks.len()).sum()
    }

    /// Render the whole document as Markdown.
    ///
    /// Pages without blocks produce no output and no separator.
    pub fn export_to_markdown(&self, options: &ExportOptions) -> String {
        let mut out = String::new();

        if options.include_metadata {
            out.push_str(&front_matter(&self.metadata));
        }

        let mut first = true;
        for page in self.pages.iter().filter(|p| !p.blocks.is_empty()) {
            if !first {
                out.push_str(&options.page_separator.render(page.number));
            }
            first = false;
            out.push_str(&render_blocks(&page.blocks));
        }

        clean_markdown(&out)
    }
}

fn render_blocks(blocks: &[Block]) -> String {
    let mut out = String::new();
    let mut prev: Option<&Block> = None;

    for block in blocks {
        if let Some(p) = prev {
            let both_items =
                matches!(p, Block::ListItem { .. }) && matches!(block, Block::ListItem { .. });
            out.push_str(if both_items { "\n" } else { "\n\n" });
        }
        match block {
            Block::Heading { level, text } => {
                let level = (*level).clamp(1, 6) as usize;
                out.push_str(&"#".repeat(level));
                out.push(' ');
                out.push_str(&single_line(text));
            }
            Block::Paragraph(text) => out.push_str(&escape_paragraph(text)),
            Block::ListItem { ordinal, text } => {
                match ordinal {
                    Some(n) => out.push_str(&format!("{n}. ")),
                    None => out.push_str("- "),
                }
                out.push_str(&single_line(text));
            }
            Block::Table(table) => out.push_str(&render_table(table)),
        }
        prev = Some(block);
    }

    out
}

/// GitHub-flavoured table; ragged rows are padded to the widest row.
fn render_table(table: &Table) -> String {
    let cols = table.columns();
    if cols == 0 {
        return String::new();
    }

    let row_line = |row: &[String]| {
        let mut line = String::from("|");
        for i in 0..cols {
            let cell = row.get(i).map(|c| escape_cell(c)).unwrap_or_default();
            line.push(' ');
            line.push_str(&cell);
            line.push_str(" |");
        }
        line
    };

    let mut lines = Vec::with_capacity(table.rows.len() + 1);
    lines.push(row_line(&table.rows[0]));
    lines.push(format!("|{}", " --- |".repeat(cols)));
    for row in &table.rows[1..] {
        lines.push(row_line(row));
    }
    lines.join("\n")
}

fn single_line(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn escape_cell(text: &str) -> String {
    single_line(text).replace('|', "\\|")
}

/// Keep paragraph text from being read as Markdown structure.
fn escape_paragraph(text: &str) -> String {
    let line = single_line(text);
    match line.chars().next() {
        Some('#') | Some('>') | Some('|') => format!("\\{line}"),
        _ => line,
    }
}

fn front_matter(meta: &DocumentMetadata) -> String {
    let mut yaml = String::from("---\n");
    let mut field = |key: &str, value: &Option<String>| {
        if let Some(v) = value {
            yaml.push_str(&format!("{key}: \"{}\"\n", yaml_escape(v)));
        }
    };
    field("title", &meta.title);
    field("author", &meta.author);
    field("subject", &meta.subject);
    field("creator", &meta.creator);
    field("producer", &meta.producer);
    yaml.push_str(&format!("pages: {}\n", meta.page_count));
    if !meta.pdf_version.is_empty() {
        yaml.push_str(&format!("pdf_version: \"{}\"\n", yaml_escape(&meta.pdf_version)));
    }
    yaml.push_str("---\n\n");
    yaml
}

fn yaml_escape(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(number: usize, blocks: Vec<Block>) -> Page {
        Page { number, blocks }
    }

    fn para(s: &str) -> Block {
        Block::Paragraph(s.to_string())
    }

    #[test]
    fn headings_paragraphs_and_lists() {
        let doc = Document {
            metadata: DocumentMetadata::default(),
            pages: vec![page(
                1,
                vec![
                    Block::Heading {
                        level: 1,
                        text: "Введение".into(),
                    },
                    para("First   paragraph\nwraps."),
                    Block::ListItem {
                        ordinal: None,
                        text: "apples".into(),
                    },
                    Block::ListItem {
                        ordinal: None,
                        text: "pears".into(),
                    },
                    Block::ListItem {
                        ordinal: Some(3),
                        text: "third".into(),
                    },
                    para("Tail."),
                ],
            )],
        };

        let md = doc.export_to_markdown(&ExportOptions::default());
        assert_eq!(
            md,
            "# Введение\n\nFirst paragraph wraps.\n\n- apples\n- pears\n3. third\n\nTail.\n"
        );
    }

    #[test]
    fn heading_level_is_clamped() {
        let doc = Document {
            metadata: DocumentMetadata::default(),
            pages: vec![page(
                1,
                vec![Block::Heading {
                    level: 9,
                    text: "Deep".into(),
                }],
            )],
        };
        assert_eq!(doc.export_to_markdown(&ExportOptions::default()), "###### Deep\n");
    }

    #[test]
    fn table_renders_with_header_and_escapes_pipes() {
        let table = Table {
            rows: vec![
                vec!["Name".into(), "Value".into()],
                vec!["a|b".into(), "1".into()],
                vec!["short".into()],
            ],
        };
        let doc = Document {
            metadata: DocumentMetadata::default(),
            pages: vec![page(1, vec![Block::Table(table)])],
        };
        let md = doc.export_to_markdown(&ExportOptions::default());
        assert_eq!(
            md,
            "| Name | Value |\n| --- | --- |\n| a\\|b | 1 |\n| short |  |\n"
        );
    }

    #[test]
    fn separators_skip_empty_pages() {
        let doc = Document {
            metadata: DocumentMetadata::default(),
            pages: vec![
                page(1, vec![para("one")]),
                page(2, vec![]),
                page(3, vec![para("three")]),
            ],
        };
        let opts = ExportOptions {
            page_separator: PageSeparator::Comment,
            include_metadata: false,
        };
        assert_eq!(
            doc.export_to_markdown(&opts),
            "one\n\n<!-- page 3 -->\n\nthree\n"
        );
    }

    #[test]
    fn front_matter_is_escaped() {
        let doc = Document {
            metadata: DocumentMetadata {
                title: Some("The \"Quoted\" Title".into()),
                author: Some("A. Author".into()),
                page_count: 12,
                pdf_version: "Pdf1_7".into(),
                ..Default::default()
            },
            pages: vec![page(1, vec![para("body")])],
        };
        let opts = ExportOptions {
            include_metadata: true,
            ..Default::default()
        };
        let md = doc.export_to_markdown(&opts);
        assert!(md.starts_with("---\ntitle: \"The \\\"Quoted\\\" Title\"\nauthor: \"A. Author\"\npages: 12\n"));
        assert!(md.ends_with("---\n\nbody\n"));
    }

    #[test]
    fn paragraphs_that_look_like_markup_are_escaped() {
        let doc = Document {
            metadata: DocumentMetadata::default(),
            pages: vec![page(1, vec![para("# not a heading"), para("> not a quote")])],
        };
        assert_eq!(
            doc.export_to_markdown(&ExportOptions::default()),
            "\\# not a heading\n\n\\> not a quote\n"
        );
    }

    #[test]
    fn empty_document_exports_single_newline() {
        let doc = Document::default();
        assert_eq!(doc.export_to_markdown(&ExportOptions::default()), "\n");
        assert_eq!(doc.block_count(), 0);
    }
}
