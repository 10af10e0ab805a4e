//! # deploy-dir
//!
//! Turns a directory of static files into one self-contained Deno Deploy
//! worker. Every file is embedded in the generated source as base64 data,
//! together with a `fetch` handler that serves it.
//!
//! # Architecture: Two Stages
//!
//! ```text
//! 1. Scan      dist/      →  Vec<FileEntry>   (filesystem → sorted entries)
//! 2. Render    entries    →  String           (entries + options → worker source)
//! ```
//!
//! [`generate()`] runs both. The stages are separate so rendering can be
//! tested against hand-built entries without touching the filesystem, and so
//! the CLI can report what it embedded.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`scan`] | Walks the directory, reads and optionally gzips files, sorts entries by served path |
//! | [`generate`] | Renders the worker source; [`generate::generate`] is the one-call entry point |
//! | [`config`] | `GenerationOptions`, option-string parsing, layered TOML config loading |
//! | [`media`] | Extension → MIME type table |
//! | [`types`] | `FileEntry`, passed from scan to render |
//! | [`output`] | CLI summary formatting |
//!
//! # Design Decisions
//!
//! ## Reproducible Output
//!
//! Two runs over the same tree with the same options produce byte-identical
//! source. Entries are sorted byte-wise by served path regardless of the
//! order the filesystem lists them in, and gzip headers carry a fixed
//! timestamp (zero unless configured otherwise). A regenerated worker only
//! shows up in a diff when the content actually changed.
//!
//! ## Fail Before Reading
//!
//! Malformed `--basic-auth` and `--cache` values are rejected before the
//! directory is walked. Nothing is written on any error.
//!
//! ## Dialects
//!
//! TypeScript and JavaScript output differ only in the data-table
//! declaration. Everything else, including the request handler, is the same
//! text.

pub mod config;
pub mod generate;
pub mod media;
pub mod output;
pub mod scan;
pub mod types;

pub use config::{CacheDirectives, Dialect, GenerationOptions, GzipMtime};
pub use generate::{GenerateError, Generated, generate, generate_with_entries, render};
pub use scan::ScanError;
pub use types::FileEntry;

#[cfg(test)]
pub(crate) mod test_helpers;
