//! Directory walking and payload encoding.
//!
//! First half of generation. Walks the directory tree, keeps regular files,
//! and turns each one into a [`FileEntry`]: the URL path it is served under,
//! its media type, and the bytes to embed.
//!
//! ## Served Paths
//!
//! The path relative to the scanned directory is joined onto the root prefix
//! with `/` separators:
//!
//! ```text
//! dist/                    root "/"         root "docs"
//! ├── index.html           /index.html      /docs/index.html
//! └── css/
//!     └── site.css         /css/site.css    /docs/css/site.css
//! ```
//!
//! ## Ordering
//!
//! Files are read and compressed in parallel with
//! [rayon](https://docs.rs/rayon); the result is always sorted by served path
//! (byte-wise) afterwards, so the order never depends on the filesystem or on
//! which read finished first.
//!
//! ## Symbolic Links
//!
//! The walk does not descend through links. A link pointing at a regular file
//! is served with the target's contents; a link pointing at a directory is
//! skipped.

use crate::config::{GenerationOptions, GzipMtime};
use crate::media::media_type;
use crate::types::FileEntry;
use flate2::{Compression, GzBuilder};
use rayon::prelude::*;
use std::fs;
use std::io::Write;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("Directory not found: {0}")]
    NotFound(PathBuf),
    #[error("Not a directory: {0}")]
    NotADirectory(PathBuf),
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to walk directory: {0}")]
    Walk(#[from] walkdir::Error),
}

/// Walk `dir` and encode every regular file under it.
///
/// Returned entries are sorted by served path.
pub fn scan(
    dir: &Path,
    root: &str,
    options: &GenerationOptions,
) -> Result<Vec<FileEntry>, ScanError> {
    check_root(dir)?;
    let prefix = normalize_root(root);
    let files = collect_files(dir)?;

    let mtime = options.compress.then_some(options.gzip_mtime);
    let mut entries = files
        .par_iter()
        .map(|rel| read_entry(dir, rel, &prefix, mtime))
        .collect::<Result<Vec<_>, _>>()?;

    entries.sort_by(|a, b| a.served_path.as_bytes().cmp(b.served_path.as_bytes()));

    let total: usize = entries.iter().map(|e| e.payload.len()).sum();
    info!(
        dir = %dir.display(),
        files = entries.len(),
        bytes = total,
        compressed = options.compress,
        "scanned directory"
    );
    Ok(entries)
}

fn check_root(dir: &Path) -> Result<(), ScanError> {
    match fs::metadata(dir) {
        Ok(meta) if meta.is_dir() => Ok(()),
        Ok(_) => Err(ScanError::NotADirectory(dir.to_path_buf())),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(ScanError::NotFound(dir.to_path_buf()))
        }
        Err(source) => Err(ScanError::Io {
            path: dir.to_path_buf(),
            source,
        }),
    }
}

/// Relative paths of every regular file (or link to one) under `dir`.
fn collect_files(dir: &Path) -> Result<Vec<PathBuf>, ScanError> {
    let mut files = Vec::new();
    for entry in WalkDir::new(dir).min_depth(1) {
        let entry = entry?;
        let file_type = entry.file_type();
        if file_type.is_dir() {
            continue;
        }
        if file_type.is_symlink() {
            let target_is_file = fs::metadata(entry.path())
                .map(|m| m.is_file())
                .unwrap_or(false);
            if !target_is_file {
                debug!(path = %entry.path().display(), "skipping link to non-file");
                continue;
            }
        }
        // min_depth(1) guarantees every entry lives under `dir`
        if let Ok(rel) = entry.path().strip_prefix(dir) {
            files.push(rel.to_path_buf());
        }
    }
    Ok(files)
}

fn read_entry(
    dir: &Path,
    rel: &Path,
    prefix: &str,
    mtime: Option<GzipMtime>,
) -> Result<FileEntry, ScanError> {
    let path = dir.join(rel);
    let io_err = |source| ScanError::Io {
        path: path.clone(),
        source,
    };

    let contents = fs::read(&path).map_err(io_err)?;
    let served_path = served_path(prefix, rel);
    let payload = match mtime {
        Some(mtime) => gzip(&contents, mtime).map_err(io_err)?,
        None => contents,
    };
    debug!(path = %served_path, bytes = payload.len(), "encoded file");

    Ok(FileEntry {
        media_type: media_type(&served_path),
        served_path,
        payload,
    })
}

/// Normalize the root prefix to `""` (site root) or `/seg/seg`.
///
/// A missing leading slash is implied; empty and `.` segments are dropped.
/// `..` removes the previous segment and never climbs above the site root,
/// the same way request URLs are resolved.
pub fn normalize_root(root: &str) -> String {
    let mut segments: Vec<&str> = Vec::new();
    for seg in root.split('/') {
        match seg {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            _ => segments.push(seg),
        }
    }
    segments.iter().fold(String::new(), |mut acc, seg| {
        acc.push('/');
        acc.push_str(seg);
        acc
    })
}

/// Join a normalized prefix and a path relative to the scanned directory.
pub fn served_path(prefix: &str, rel: &Path) -> String {
    let mut served = prefix.to_string();
    for component in rel.components() {
        if let Component::Normal(seg) = component {
            served.push('/');
            served.push_str(&seg.to_string_lossy());
        }
    }
    served
}

/// Gzip at best compression with a caller-chosen header timestamp.
pub fn gzip(data: &[u8], mtime: GzipMtime) -> std::io::Result<Vec<u8>> {
    let mut encoder = GzBuilder::new()
        .mtime(mtime.resolve())
        .write(Vec::with_capacity(data.len() / 2 + 64), Compression::best());
    encoder.write_all(data)?;
    encoder.finish()
}
