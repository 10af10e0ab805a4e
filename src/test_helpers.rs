//! Shared test utilities.
//!
//! Fixture setup plus helpers that pull the data table back out of a
//! generated program, so tests can check what was embedded without running
//! the program.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use std::io::Read;
use std::path::Path;
use tempfile::TempDir;

// =========================================================================
// Fixture setup
// =========================================================================

/// Copy `fixtures/testdata/` (`foo.txt`, `bar.ts`) to a temp directory.
pub fn setup_fixtures() -> TempDir {
    let tmp = TempDir::new().unwrap();
    let fixtures = Path::new(env!("CARGO_MANIFEST_DIR")).join("fixtures/testdata");
    copy_dir_recursive(&fixtures, tmp.path()).unwrap();
    tmp
}

fn copy_dir_recursive(src: &Path, dst: &Path) -> std::io::Result<()> {
    for entry in std::fs::read_dir(src)? {
        let entry = entry?;
        let src_path = entry.path();
        let dst_path = dst.join(entry.file_name());

        if src_path.is_dir() {
            std::fs::create_dir_all(&dst_path)?;
            copy_dir_recursive(&src_path, &dst_path)?;
        } else {
            std::fs::copy(&src_path, &dst_path)?;
        }
    }
    Ok(())
}

/// Write `contents` to `root/rel`, creating parent directories.
pub fn write_file(root: &Path, rel: &str, contents: &[u8]) {
    let path = root.join(rel);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(path, contents).unwrap();
}

// =========================================================================
// Generated table extraction
// =========================================================================

/// One `dirData[...] = [...]` line parsed back out of generated source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableLine {
    pub served_path: String,
    pub base64: String,
    pub media_type: String,
}

/// Every data-table assignment in `source`, in emitted order.
pub fn table_lines(source: &str) -> Vec<TableLine> {
    source
        .lines()
        .filter_map(|line| {
            let rest = line.strip_prefix("dirData[")?;
            let (path_literal, rest) = rest.split_once("] = [decode(\"")?;
            let (base64, rest) = rest.split_once("\"), \"")?;
            let media_type = rest.strip_suffix("\"];")?;
            Some(TableLine {
                served_path: serde_json::from_str(path_literal).unwrap(),
                base64: base64.to_string(),
                media_type: media_type.to_string(),
            })
        })
        .collect()
}

/// Base64-decode an embedded payload, then gunzip it when `compressed`.
pub fn decode_payload(base64: &str, compressed: bool) -> Vec<u8> {
    let bytes = STANDARD.decode(base64).unwrap();
    if !compressed {
        return bytes;
    }
    let mut out = Vec::new();
    flate2::read::GzDecoder::new(bytes.as_slice())
        .read_to_end(&mut out)
        .unwrap();
    out
}

/// Look up a table line by served path. Panics if not found.
pub fn find_line<'a>(lines: &'a [TableLine], served_path: &str) -> &'a TableLine {
    lines
        .iter()
        .find(|l| l.served_path == served_path)
        .unwrap_or_else(|| {
            let paths: Vec<&str> = lines.iter().map(|l| l.served_path.as_str()).collect();
            panic!("served path '{served_path}' not found. Available: {paths:?}")
        })
}
