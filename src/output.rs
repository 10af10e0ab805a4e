//! CLI output formatting.
//!
//! When the generated program goes to a file, the CLI lists what was
//! embedded:
//!
//! ```text
//! /bar.ts    text/typescript  20 B
//! /foo.txt   text/plain       4 B
//! 2 files, 24 B embedded
//! ```
//!
//! Each `format_*` function returns lines and does no I/O; the `print_*`
//! wrappers write them to stdout.

use crate::types::FileEntry;

/// Human-readable byte count: `512 B`, `1.5 KiB`, `3.2 MiB`.
pub fn format_size(bytes: usize) -> String {
    const UNITS: &[&str] = &["KiB", "MiB", "GiB"];
    if bytes < 1024 {
        return format!("{bytes} B");
    }
    let mut size = bytes as f64 / 1024.0;
    let mut unit = UNITS[0];
    for next in &UNITS[1..] {
        if size < 1024.0 {
            break;
        }
        size /= 1024.0;
        unit = next;
    }
    format!("{size:.1} {unit}")
}

/// One aligned line per entry, then a totals line.
///
/// Sizes are of the embedded payload, so they are the compressed sizes when
/// `compressed` is set.
pub fn format_entries(entries: &[FileEntry], compressed: bool) -> Vec<String> {
    let path_width = entries
        .iter()
        .map(|e| e.served_path.len())
        .max()
        .unwrap_or(0);
    let type_width = entries
        .iter()
        .map(|e| e.media_type.len())
        .max()
        .unwrap_or(0);

    let mut lines: Vec<String> = entries
        .iter()
        .map(|e| {
            format!(
                "{:<path_width$}  {:<type_width$}  {}",
                e.served_path,
                e.media_type,
                format_size(e.payload.len())
            )
        })
        .collect();

    let total: usize = entries.iter().map(|e| e.payload.len()).sum();
    let noun = if entries.len() == 1 { "file" } else { "files" };
    let suffix = if compressed { " (gzip)" } else { "" };
    lines.push(format!(
        "{} {noun}, {} embedded{suffix}",
        entries.len(),
        format_size(total)
    ));
    lines
}

pub fn print_entries(entries: &[FileEntry], compressed: bool) {
    for line in format_entries(entries, compressed) {
        println!("{}", line);
    }
}
