//! Integration tests for the conversion entry points.
//!
//! A scripted converter stands in for PDFium so these run without the engine
//! library or network access. Model pre-fetch is disabled except where a
//! test needs it with an empty model list.

use local_pdf2md::{
    convert, convert_to_file, Accelerator, Block, ConversionConfig, ConversionProgressCallback,
    ConversionResult, Document, DocumentConverter, DocumentMetadata, Page, PageError,
    PageSeparator, Pdf2MdError,
};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;

// ── Test helpers ─────────────────────────────────────────────────────────────

struct ScriptedConverter {
    document: Document,
    page_errors: Vec<PageError>,
    fail: bool,
    calls: AtomicUsize,
}

impl ScriptedConverter {
    fn new(document: Document) -> Arc<Self> {
        Arc::new(Self {
            document,
            page_errors: Vec::new(),
            fail: false,
            calls: AtomicUsize::new(0),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl DocumentConverter for ScriptedConverter {
    fn name(&self) -> &str {
        "scripted"
    }

    fn convert(
        &self,
        pdf_path: &Path,
        progress: Option<&dyn ConversionProgressCallback>,
    ) -> Result<ConversionResult, Pdf2MdError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(Pdf2MdError::CorruptPdf {
                path: pdf_path.to_path_buf(),
                detail: "xref table missing".into(),
            });
        }

        let total = self.document.pages.len() + self.page_errors.len();
        if let Some(cb) = progress {
            cb.on_document_opened(total);
            for page in &self.document.pages {
                cb.on_page_extracted(page.number, total, page.blocks.len());
            }
            for err in &self.page_errors {
                cb.on_page_error(err.page(), total, &err.to_string());
            }
        }

        Ok(ConversionResult {
            document: self.document.clone(),
            page_errors: self.page_errors.clone(),
            empty_pages: Vec::new(),
        })
    }
}

fn sample_document() -> Document {
    Document {
        metadata: DocumentMetadata {
            title: Some("Годовой отчёт".into()),
            page_count: 2,
            pdf_version: "Pdf1_7".into(),
            ..Default::default()
        },
        pages: vec![
            Page {
                number: 1,
                blocks: vec![
                    Block::Heading {
                        level: 1,
                        text: "Годовой отчёт".into(),
                    },
                    Block::Paragraph("Выручка выросла на 12%.".into()),
                ],
            },
            Page {
                number: 2,
                blocks: vec![Block::Table(local_pdf2md::Table {
                    rows: vec![
                        vec!["Квартал".into(), "Выручка".into()],
                        vec!["Q1".into(), "100".into()],
                    ],
                })],
            },
        ],
    }
}

const SAMPLE_MARKDOWN: &str = "# Годовой отчёт\n\nВыручка выросла на 12%.\n\n\
| Квартал | Выручка |\n| --- | --- |\n| Q1 | 100 |\n";

fn pdf_in(dir: &TempDir, name: &str) -> PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, b"%PDF-1.7\n%%EOF\n").unwrap();
    path
}

fn config_with(converter: Arc<ScriptedConverter>) -> ConversionConfig {
    ConversionConfig::builder()
        .prefetch_models(false)
        .converter(converter)
        .build()
        .unwrap()
}

// ── Writing the output file ──────────────────────────────────────────────────

#[tokio::test]
async fn writes_markdown_next_to_input_by_default() {
    let dir = TempDir::new().unwrap();
    let input = pdf_in(&dir, "report.pdf");
    let converter = ScriptedConverter::new(sample_document());

    let report = convert_to_file(&input, None, &config_with(converter.clone()))
        .await
        .unwrap();

    let expected_path = dir.path().join("report.md");
    let written = std::fs::read_to_string(&expected_path).unwrap();
    assert_eq!(written, SAMPLE_MARKDOWN);
    assert_eq!(converter.calls(), 1);

    assert!(report.output.is_absolute());
    assert!(report.output.ends_with("report.md"));
    assert_eq!(report.output_bytes, SAMPLE_MARKDOWN.len() as u64);
    assert_eq!(report.stats.char_count, SAMPLE_MARKDOWN.chars().count());
    assert_eq!(report.stats.pages_converted, 2);
    assert_eq!(report.stats.pages_failed, 0);
    assert_eq!(report.stats.models_downloaded, 0);
    assert!(report.total_duration_ms >= report.stats.conversion_duration_ms);

    assert!(!dir.path().join("report.md.tmp").exists());
}

#[tokio::test]
async fn explicit_output_creates_parent_directories() {
    let dir = TempDir::new().unwrap();
    let input = pdf_in(&dir, "report.pdf");
    let output = dir.path().join("out").join("nested").join("result.md");

    convert_to_file(
        &input,
        Some(&output),
        &config_with(ScriptedConverter::new(sample_document())),
    )
    .await
    .unwrap();

    assert_eq!(std::fs::read_to_string(&output).unwrap(), SAMPLE_MARKDOWN);
    assert!(!dir.path().join("report.md").exists());
}

#[tokio::test]
async fn uppercase_extension_is_accepted() {
    let dir = TempDir::new().unwrap();
    let input = pdf_in(&dir, "SCAN.PDF");

    convert_to_file(
        &input,
        None,
        &config_with(ScriptedConverter::new(sample_document())),
    )
    .await
    .unwrap();

    assert!(dir.path().join("SCAN.md").exists());
}

#[tokio::test]
async fn existing_output_is_overwritten() {
    let dir = TempDir::new().unwrap();
    let input = pdf_in(&dir, "report.pdf");
    let output = dir.path().join("report.md");
    std::fs::write(&output, "stale").unwrap();

    convert_to_file(
        &input,
        None,
        &config_with(ScriptedConverter::new(sample_document())),
    )
    .await
    .unwrap();

    assert_eq!(std::fs::read_to_string(&output).unwrap(), SAMPLE_MARKDOWN);
}

// ── Input validation ─────────────────────────────────────────────────────────

#[tokio::test]
async fn missing_input_is_file_not_found() {
    let dir = TempDir::new().unwrap();
    let converter = ScriptedConverter::new(sample_document());

    let err = convert_to_file(
        dir.path().join("absent.pdf"),
        None,
        &config_with(converter.clone()),
    )
    .await
    .unwrap_err();

    assert!(matches!(err, Pdf2MdError::FileNotFound { .. }), "{err:?}");
    assert_eq!(converter.calls(), 0);
}

#[tokio::test]
async fn missing_input_wins_over_wrong_extension() {
    let dir = TempDir::new().unwrap();
    let err = convert_to_file(
        dir.path().join("absent.docx"),
        None,
        &config_with(ScriptedConverter::new(sample_document())),
    )
    .await
    .unwrap_err();

    assert!(matches!(err, Pdf2MdError::FileNotFound { .. }), "{err:?}");
}

#[tokio::test]
async fn wrong_extension_is_rejected_before_conversion() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("notes.txt");
    std::fs::write(&input, "plain text").unwrap();
    let converter = ScriptedConverter::new(sample_document());

    let err = convert_to_file(&input, None, &config_with(converter.clone()))
        .await
        .unwrap_err();

    assert!(matches!(err, Pdf2MdError::NotPdfExtension { .. }), "{err:?}");
    assert!(err.to_string().contains("File must have .pdf extension"));
    assert_eq!(converter.calls(), 0);
    assert!(!dir.path().join("notes.md").exists());
}

// ── Converter outcomes ───────────────────────────────────────────────────────

#[tokio::test]
async fn converter_error_leaves_no_output() {
    let dir = TempDir::new().unwrap();
    let input = pdf_in(&dir, "broken.pdf");
    let converter = Arc::new(ScriptedConverter {
        document: Document::default(),
        page_errors: Vec::new(),
        fail: true,
        calls: AtomicUsize::new(0),
    });

    let err = convert_to_file(&input, None, &config_with(converter))
        .await
        .unwrap_err();

    assert!(matches!(err, Pdf2MdError::CorruptPdf { .. }), "{err:?}");
    assert!(!dir.path().join("broken.md").exists());
}

#[tokio::test]
async fn page_errors_are_reported_not_fatal() {
    let dir = TempDir::new().unwrap();
    let input = pdf_in(&dir, "report.pdf");
    let converter = Arc::new(ScriptedConverter {
        document: sample_document(),
        page_errors: vec![PageError::TextFailed {
            page: 3,
            detail: "bad content stream".into(),
        }],
        fail: false,
        calls: AtomicUsize::new(0),
    });

    let report = convert_to_file(&input, None, &config_with(converter))
        .await
        .unwrap();

    assert_eq!(report.stats.pages_failed, 1);
    assert_eq!(report.page_errors.len(), 1);
    assert_eq!(report.page_errors[0].page(), 3);
}

#[tokio::test]
async fn in_memory_convert_applies_export_options() {
    let dir = TempDir::new().unwrap();
    let input = pdf_in(&dir, "report.pdf");
    let config = ConversionConfig::builder()
        .prefetch_models(false)
        .page_separator(PageSeparator::Comment)
        .include_metadata(true)
        .converter(ScriptedConverter::new(sample_document()))
        .build()
        .unwrap();

    let output = convert(&input, &config).await.unwrap();

    assert!(output
        .markdown
        .starts_with("---\ntitle: \"Годовой отчёт\"\npages: 2\n"));
    assert!(output.markdown.contains("<!-- page 2 -->"));
    assert_eq!(output.metadata.page_count, 2);
    assert!(!dir.path().join("report.md").exists());
}

// ── Progress events ──────────────────────────────────────────────────────────

#[derive(Default)]
struct Recorder {
    events: Mutex<Vec<String>>,
}

impl Recorder {
    fn push(&self, event: String) {
        self.events.lock().unwrap().push(event);
    }

    fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }
}

impl ConversionProgressCallback for Recorder {
    fn on_paths_resolved(&self, input: &Path, output: &Path) {
        assert!(input.is_absolute() && output.is_absolute());
        self.push("paths".into());
    }
    fn on_device_selected(&self, _accelerator: Accelerator) {
        self.push("device".into());
    }
    fn on_prefetch_start(&self, total_models: usize) {
        self.push(format!("prefetch:{total_models}"));
    }
    fn on_prefetch_complete(&self, downloaded: usize) {
        self.push(format!("prefetched:{downloaded}"));
    }
    fn on_conversion_start(&self) {
        self.push("convert".into());
    }
    fn on_document_opened(&self, total_pages: usize) {
        self.push(format!("opened:{total_pages}"));
    }
    fn on_page_extracted(&self, page_num: usize, _total: usize, _runs: usize) {
        self.push(format!("page:{page_num}"));
    }
    fn on_conversion_complete(&self, _elapsed: Duration) {
        self.push("converted".into());
    }
    fn on_export_start(&self) {
        self.push("export".into());
    }
}

#[tokio::test]
async fn events_follow_run_order() {
    let dir = TempDir::new().unwrap();
    let input = pdf_in(&dir, "report.pdf");
    let recorder = Arc::new(Recorder::default());

    let config = ConversionConfig::builder()
        .prefetch_models(false)
        .converter(ScriptedConverter::new(sample_document()))
        .progress_callback(recorder.clone())
        .build()
        .unwrap();

    convert_to_file(&input, None, &config).await.unwrap();

    assert_eq!(
        recorder.events(),
        vec![
            "paths", "device", "convert", "opened:2", "page:1", "page:2", "converted", "export"
        ]
    );
}

#[tokio::test]
async fn prefetch_step_runs_before_conversion() {
    let dir = TempDir::new().unwrap();
    let input = pdf_in(&dir, "report.pdf");
    let recorder = Arc::new(Recorder::default());

    let config = ConversionConfig::builder()
        .models(Vec::<String>::new())
        .model_cache_dir(dir.path().join("hub"))
        .download_progress(false)
        .converter(ScriptedConverter::new(sample_document()))
        .progress_callback(recorder.clone())
        .build()
        .unwrap();

    let report = convert_to_file(&input, None, &config).await.unwrap();

    let events = recorder.events();
    assert_eq!(&events[..4], ["paths", "device", "prefetch:0", "prefetched:0"]);
    assert_eq!(events[4], "convert");
    assert_eq!(report.stats.models_downloaded, 0);
}
