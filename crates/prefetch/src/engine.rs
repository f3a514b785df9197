//! The PDFium engine library.
//!
//! Resolution order, first match wins:
//!
//! 1. `PDFIUM_LIB_PATH` pointing at an existing file.
//! 2. `{cache}/pdfium-{PDFIUM_VERSION}/{lib}` from a previous run.
//! 3. Download `pdfium-{os}-{arch}.tgz` from bblanchon/pdfium-binaries and
//!    extract the one shared library it contains into the cache.
//!
//! The cache root is `PDF2MD_CACHE_DIR` when set, otherwise the platform
//! cache directory (`~/.cache/local-pdf2md` on Linux,
//! `~/Library/Caches/local-pdf2md` on macOS, `%LOCALAPPDATA%\local-pdf2md`
//! on Windows).

use crate::PrefetchError;
use pdfium_render::prelude::Pdfium;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Release tag of bblanchon/pdfium-binaries used for downloads.
pub const PDFIUM_VERSION: &str = "7690";

const RELEASE_URL: &str = "https://github.com/bblanchon/pdfium-binaries/releases/download";

/// Download progress: `(bytes_so_far, total_bytes_if_known)`.
pub type DownloadProgress<'a> = &'a dyn Fn(u64, Option<u64>);

/// Where the engine library was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineSource {
    EnvOverride,
    Cache,
    Downloaded,
}

/// A PDFium shared library present on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineLibrary {
    pub path: PathBuf,
    pub source: EngineSource,
}

// ── Platform table ───────────────────────────────────────────────────────────

/// `(os, arch, archive, member inside archive, file name on disk)`
const PLATFORMS: &[(&str, &str, &str, &str, &str)] = &[
    ("macos", "aarch64", "pdfium-mac-arm64.tgz", "lib/libpdfium.dylib", "libpdfium.dylib"),
    ("macos", "x86_64", "pdfium-mac-x64.tgz", "lib/libpdfium.dylib", "libpdfium.dylib"),
    ("linux", "x86_64", "pdfium-linux-x64.tgz", "lib/libpdfium.so", "libpdfium.so"),
    ("linux", "aarch64", "pdfium-linux-arm64.tgz", "lib/libpdfium.so", "libpdfium.so"),
    ("windows", "x86_64", "pdfium-win-x64.tgz", "bin/pdfium.dll", "pdfium.dll"),
    ("windows", "aarch64", "pdfium-win-arm64.tgz", "bin/pdfium.dll", "pdfium.dll"),
    ("windows", "x86", "pdfium-win-x86.tgz", "bin/pdfium.dll", "pdfium.dll"),
];

#[derive(Debug, Clone, Copy)]
struct Platform {
    archive: &'static str,
    member: &'static str,
    lib_name: &'static str,
}

fn platform_for(os: &str, arch: &str) -> Result<Platform, PrefetchError> {
    PLATFORMS
        .iter()
        .find(|(o, a, ..)| *o == os && *a == arch)
        .map(|&(_, _, archive, member, lib_name)| Platform {
            archive,
            member,
            lib_name,
        })
        .ok_or_else(|| PrefetchError::UnsupportedPlatform {
            os: os.to_string(),
            arch: arch.to_string(),
        })
}

fn current_platform() -> Result<Platform, PrefetchError> {
    platform_for(std::env::consts::OS, std::env::consts::ARCH)
}

// ── Cache layout ─────────────────────────────────────────────────────────────

/// Directory holding the cached engine for [`PDFIUM_VERSION`].
pub fn engine_cache_dir() -> PathBuf {
    let root = match std::env::var_os("PDF2MD_CACHE_DIR") {
        Some(dir) if !dir.is_empty() => PathBuf::from(dir),
        _ => dirs::cache_dir()
            .or_else(|| dirs::home_dir().map(|h| h.join(".cache")))
            .unwrap_or_else(std::env::temp_dir)
            .join("local-pdf2md"),
    };
    root.join(format!("pdfium-{PDFIUM_VERSION}"))
}

fn env_override() -> Option<PathBuf> {
    std::env::var_os("PDFIUM_LIB_PATH")
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
}

/// Find an engine library without touching the network.
pub fn locate_engine() -> Option<EngineLibrary> {
    if let Some(path) = env_override().filter(|p| p.is_file()) {
        return Some(EngineLibrary {
            path,
            source: EngineSource::EnvOverride,
        });
    }
    let platform = current_platform().ok()?;
    let path = engine_cache_dir().join(platform.lib_name);
    path.is_file().then_some(EngineLibrary {
        path,
        source: EngineSource::Cache,
    })
}

static RESOLVED: OnceLock<EngineLibrary> = OnceLock::new();

/// Make sure an engine library is on disk, downloading it if needed.
///
/// The result is memoised for the rest of the process.
pub fn ensure_engine(on_progress: Option<DownloadProgress<'_>>) -> Result<EngineLibrary, PrefetchError> {
    if let Some(lib) = RESOLVED.get() {
        return Ok(lib.clone());
    }

    if let Some(path) = env_override() {
        if !path.is_file() {
            warn!(
                "PDFIUM_LIB_PATH '{}' does not exist; falling back to the cache",
                path.display()
            );
        }
    }

    let lib = match locate_engine() {
        Some(lib) => lib,
        None => download_engine(on_progress)?,
    };
    debug!("PDFium engine: {} ({:?})", lib.path.display(), lib.source);

    let _ = RESOLVED.set(lib.clone());
    Ok(lib)
}

/// Load the library at `path` and hand back a ready `Pdfium`.
pub fn bind_engine(path: &Path) -> Result<Pdfium, PrefetchError> {
    Pdfium::bind_to_library(path)
        .map(Pdfium::new)
        .map_err(|e| PrefetchError::Bind {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
}

// ── Download ─────────────────────────────────────────────────────────────────

fn download_engine(on_progress: Option<DownloadProgress<'_>>) -> Result<EngineLibrary, PrefetchError> {
    let platform = current_platform()?;
    let dir = engine_cache_dir();
    std::fs::create_dir_all(&dir).map_err(|source| PrefetchError::CacheDir {
        path: dir.clone(),
        source,
    })?;

    let url = format!(
        "{RELEASE_URL}/chromium%2F{PDFIUM_VERSION}/{}",
        platform.archive
    );
    info!("Downloading PDFium engine from {}", url);

    let archive = fetch_bytes(&url, on_progress)?;
    let dest = dir.join(platform.lib_name);
    unpack_member(&archive, platform.member, &dest)?;

    info!("PDFium engine cached at {}", dest.display());
    Ok(EngineLibrary {
        path: dest,
        source: EngineSource::Downloaded,
    })
}

fn fetch_bytes(url: &str, on_progress: Option<DownloadProgress<'_>>) -> Result<Vec<u8>, PrefetchError> {
    let client = reqwest::blocking::Client::builder()
        .user_agent(concat!("pdf2md-prefetch/", env!("CARGO_PKG_VERSION")))
        .redirect(reqwest::redirect::Policy::limited(5))
        .connect_timeout(Duration::from_secs(30))
        .timeout(None)
        .build()
        .map_err(|e| PrefetchError::Download(e.to_string()))?;

    let mut response = client
        .get(url)
        .send()
        .map_err(|e| PrefetchError::Download(format!("GET {url}: {e}")))?;

    if !response.status().is_success() {
        return Err(PrefetchError::Download(format!(
            "HTTP {} for {url}",
            response.status()
        )));
    }

    let total = response.content_length();
    let mut buf = Vec::with_capacity(total.unwrap_or(32 * 1024 * 1024) as usize);
    let mut chunk = vec![0u8; 64 * 1024];
    let mut seen: u64 = 0;

    loop {
        match response.read(&mut chunk) {
            Ok(0) => break,
            Ok(n) => {
                buf.extend_from_slice(&chunk[..n]);
                seen += n as u64;
                if let Some(cb) = on_progress {
                    cb(seen, total);
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(PrefetchError::Download(format!("read error: {e}"))),
        }
    }

    Ok(buf)
}

/// Extract `member` from a `.tgz` into `dest`.
///
/// The file is unpacked next to `dest` and renamed into place, so an
/// interrupted run never leaves a truncated library in the cache.
fn unpack_member(archive: &[u8], member: &str, dest: &Path) -> Result<(), PrefetchError> {
    use flate2::read::GzDecoder;
    use tar::Archive;

    let mut tar = Archive::new(GzDecoder::new(archive));
    let entries = tar
        .entries()
        .map_err(|e| PrefetchError::Extract(e.to_string()))?;

    for entry in entries {
        let mut entry = entry.map_err(|e| PrefetchError::Extract(e.to_string()))?;
        let name = entry
            .path()
            .map_err(|e| PrefetchError::Extract(e.to_string()))?
            .to_string_lossy()
            .trim_start_matches("./")
            .to_string();
        if name != member {
            continue;
        }

        let partial = dest.with_extension("partial");
        entry
            .unpack(&partial)
            .map_err(|e| PrefetchError::Extract(format!("unpack {member}: {e}")))?;
        std::fs::rename(&partial, dest).map_err(|source| PrefetchError::CacheDir {
            path: dest.to_path_buf(),
            source,
        })?;
        return Ok(());
    }

    Err(PrefetchError::Extract(format!(
        "'{member}' not found in archive"
    )))
}
