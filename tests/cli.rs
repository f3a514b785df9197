//! Integration tests for the `pdf2md` binary.
//!
//! Every case here fails or exits before any network access or PDFium
//! download, so they run offline.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

fn cli() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_pdf2md"));
    cmd.env_remove("PDF2MD_OUTPUT");
    cmd
}

// ============ EXIT CODES ============

#[test]
fn version_flag_exits_zero() {
    cli()
        .arg("-v")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn missing_input_exits_one() {
    let dir = TempDir::new().unwrap();
    let missing = dir.path().join("nope").join("x.pdf");

    cli()
        .arg(&missing)
        .arg("--no-prefetch")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("✗ Error:"))
        .stderr(predicate::str::contains("PDF file not found"));

    assert!(!dir.path().join("nope").join("x.md").exists());
}

#[test]
fn non_pdf_input_exits_one() {
    let dir = TempDir::new().unwrap();
    let notes = dir.path().join("notes.txt");
    fs::write(&notes, "plain text").unwrap();

    cli()
        .arg(&notes)
        .arg("--no-prefetch")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("✗ Error:"))
        .stderr(predicate::str::contains("File must have .pdf extension"));

    assert!(!dir.path().join("notes.md").exists());
}

#[test]
fn missing_file_is_reported_before_extension() {
    let dir = TempDir::new().unwrap();

    cli()
        .arg(dir.path().join("absent.txt"))
        .arg("--no-prefetch")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("PDF file not found"));
}

#[test]
fn help_mentions_output_flag() {
    cli()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--output"));
}
