//! Conversion entry points.
//!
//! One run, in order: validate the input, report the accelerator, pre-fetch
//! models, convert with the engine, export Markdown. [`convert_to_file`] adds
//! the output path and the atomic write; [`convert`] stops at the string.

use crate::config::ConversionConfig;
use crate::device::Accelerator;
use crate::document::ExportOptions;
use crate::engine::{DocumentConverter, PdfiumConverter};
use crate::error::Pdf2MdError;
use crate::input::{absolute, derive_output_path, validate_input};
use crate::models::prefetch_models;
use crate::output::{ConversionOutput, ConversionReport, ConversionStats};
use pdf2md_prefetch::ensure_engine;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Convert a PDF to Markdown in memory.
///
/// # Errors
/// Returns `Err(Pdf2MdError)` only for fatal errors: bad input path,
/// unreadable PDF, engine unavailable, or every selected page failing.
/// Pre-fetch failures and single-page failures are not fatal.
pub async fn convert(
    input: impl AsRef<Path>,
    config: &ConversionConfig,
) -> Result<ConversionOutput, Pdf2MdError> {
    let pdf_path = validate_input(input)?;
    let (output, _) = run(&pdf_path, config).await?;
    Ok(output)
}

/// Convert a PDF and write the Markdown next to it, or to `output`.
///
/// Missing parent directories are created. The file is written to a
/// `.md.tmp` sibling first and renamed into place.
pub async fn convert_to_file(
    input: impl AsRef<Path>,
    output: Option<&Path>,
    config: &ConversionConfig,
) -> Result<ConversionReport, Pdf2MdError> {
    let pdf_path = validate_input(input)?;
    let out_path = derive_output_path(&pdf_path, output);
    let (input_abs, output_abs) = (absolute(&pdf_path), absolute(&out_path));
    info!(
        "Converting {} -> {}",
        input_abs.display(),
        output_abs.display()
    );
    if let Some(ref cb) = config.progress_callback {
        cb.on_paths_resolved(&input_abs, &output_abs);
    }

    let (converted, conversion_start) = run(&pdf_path, config).await?;
    write_atomic(&out_path, &converted.markdown).await?;

    let total_duration_ms = conversion_start.elapsed().as_millis() as u64;
    info!(
        "Wrote {} bytes to {} ({}ms total)",
        converted.markdown.len(),
        output_abs.display(),
        total_duration_ms
    );

    Ok(ConversionReport {
        input: input_abs,
        output: output_abs,
        output_bytes: converted.markdown.len() as u64,
        stats: converted.stats,
        total_duration_ms,
        page_errors: converted.page_errors,
    })
}

/// Device probe, pre-fetch, conversion and export. Also returns the instant
/// conversion started, which is where total time is measured from.
async fn run(
    pdf_path: &Path,
    config: &ConversionConfig,
) -> Result<(ConversionOutput, Instant), Pdf2MdError> {
    // ── Step 1: Accelerator label ────────────────────────────────────────
    let accelerator = Accelerator::probe();
    info!("Using {}", accelerator.label());
    if let Some(ref cb) = config.progress_callback {
        cb.on_device_selected(accelerator);
    }

    // ── Step 2: Model pre-fetch ──────────────────────────────────────────
    let models_downloaded = if config.prefetch_models {
        let cfg = config.clone();
        tokio::task::spawn_blocking(move || {
            prefetch_models(&cfg, cfg.progress_callback.as_deref()).downloaded()
        })
        .await
        .map_err(|e| Pdf2MdError::Internal(format!("Pre-fetch task panicked: {}", e)))?
    } else {
        debug!("Model pre-fetch disabled");
        0
    };

    // ── Step 3: Engine ───────────────────────────────────────────────────
    let converter = resolve_converter(config).await?;

    // ── Step 4: Convert ──────────────────────────────────────────────────
    let conversion_start = Instant::now();
    info!("Starting conversion with {}", converter.name());
    if let Some(ref cb) = config.progress_callback {
        cb.on_conversion_start();
    }

    let path = pdf_path.to_path_buf();
    let cb = config.progress_callback.clone();
    let result = tokio::task::spawn_blocking(move || converter.convert(&path, cb.as_deref()))
        .await
        .map_err(|e| Pdf2MdError::Internal(format!("Conversion task panicked: {}", e)))??;

    let conversion_elapsed = conversion_start.elapsed();
    info!("PDF processed in {:.1}s", conversion_elapsed.as_secs_f64());
    if let Some(ref cb) = config.progress_callback {
        cb.on_conversion_complete(conversion_elapsed);
    }
    if !result.empty_pages.is_empty() {
        warn!(
            "{} page(s) have no text layer and were left empty (no OCR): {:?}",
            result.empty_pages.len(),
            result.empty_pages
        );
    }

    // ── Step 5: Export ───────────────────────────────────────────────────
    if let Some(ref cb) = config.progress_callback {
        cb.on_export_start();
    }
    let export_start = Instant::now();
    let markdown = result.document.export_to_markdown(&ExportOptions {
        page_separator: config.page_separator.clone(),
        include_metadata: config.include_metadata,
    });
    let export_elapsed = export_start.elapsed();

    let stats = ConversionStats {
        accelerator,
        models_downloaded,
        total_pages: result.document.metadata.page_count,
        pages_converted: result.document.pages.len(),
        pages_failed: result.page_errors.len(),
        empty_pages: result.empty_pages.len(),
        char_count: markdown.chars().count(),
        conversion_duration_ms: conversion_elapsed.as_millis() as u64,
        export_duration_ms: export_elapsed.as_millis() as u64,
    };
    debug!(
        "Exported {} blocks, {} characters",
        result.document.block_count(),
        stats.char_count
    );

    let output = ConversionOutput {
        markdown,
        metadata: result.document.metadata,
        stats,
        page_errors: result.page_errors,
        empty_pages: result.empty_pages,
    };
    Ok((output, conversion_start))
}

/// Use the injected converter, or provision PDFium and wrap it.
async fn resolve_converter(
    config: &ConversionConfig,
) -> Result<Arc<dyn DocumentConverter>, Pdf2MdError> {
    if let Some(ref converter) = config.converter {
        return Ok(Arc::clone(converter));
    }

    let cb = config.progress_callback.clone();
    let library = tokio::task::spawn_blocking(move || {
        let on_progress: &dyn Fn(u64, Option<u64>) = &|done: u64, total: Option<u64>| {
            if let Some(ref cb) = cb {
                cb.on_engine_download(done, total);
            }
        };
        ensure_engine(Some(on_progress))
    })
    .await
    .map_err(|e| Pdf2MdError::Internal(format!("Engine task panicked: {}", e)))??;

    debug!("Using PDFium at {}", library.path.display());
    Ok(Arc::new(PdfiumConverter::new(library.path, config)))
}

async fn write_atomic(path: &Path, contents: &str) -> Result<(), Pdf2MdError> {
    let write_err = |e: std::io::Error| Pdf2MdError::OutputWriteFailed {
        path: path.to_path_buf(),
        source: e,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(write_err)?;
    }

    let tmp_path = path.with_extension("md.tmp");
    tokio::fs::write(&tmp_path, contents)
        .await
        .map_err(write_err)?;
    tokio::fs::rename(&tmp_path, path).await.map_err(write_err)?;
    Ok(())
}
