//! Shared types passed from the walker to the emitter.
//!
//! The walker ([`crate::scan`]) builds the entries; the emitter
//! ([`crate::generate`]) only reads them.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;

/// One regular file found under the scanned directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    /// Absolute URL path the file is served under, always starting with `/`.
    pub served_path: String,
    /// MIME type sent as `content-type`.
    pub media_type: &'static str,
    /// Bytes as they are embedded: gzip-compressed when compression is on,
    /// otherwise the file contents verbatim.
    pub payload: Vec<u8>,
}

impl FileEntry {
    /// Base64 text of the payload, as written into the generated table.
    pub fn encoded_payload(&self) -> String {
        STANDARD.encode(&self.payload)
    }
}
