//! Extension → MIME type table.
//!
//! Only the last extension of the last path segment counts, compared
//! case-insensitively: `archive.tar.gz` is `application/gzip`, not a tarball.
//! Anything unknown, or without an extension, is served as `text/plain`.

const DEFAULT_MEDIA_TYPE: &str = "text/plain";

const MEDIA_TYPES: &[(&str, &str)] = &[
    ("md", "text/markdown"),
    ("html", "text/html"),
    ("htm", "text/html"),
    ("json", "application/json"),
    ("map", "application/json"),
    ("txt", "text/plain"),
    ("ts", "text/typescript"),
    ("tsx", "text/tsx"),
    ("js", "application/javascript"),
    ("mjs", "application/javascript"),
    ("jsx", "text/jsx"),
    ("gz", "application/gzip"),
    ("css", "text/css"),
    ("wasm", "application/wasm"),
    ("svg", "image/svg+xml"),
    ("png", "image/png"),
    ("jpg", "image/jpeg"),
    ("jpeg", "image/jpeg"),
    ("gif", "image/gif"),
    ("webp", "image/webp"),
    ("ico", "image/x-icon"),
    ("xml", "application/xml"),
    ("pdf", "application/pdf"),
    ("woff", "font/woff"),
    ("woff2", "font/woff2"),
];

/// Media type for a file path or served path.
pub fn media_type(path: &str) -> &'static str {
    let name = path.rsplit(['/', '\\']).next().unwrap_or(path);
    let Some((_, ext)) = name.rsplit_once('.') else {
        return DEFAULT_MEDIA_TYPE;
    };
    if ext.is_empty() || !ext.chars().all(|c| c.is_ascii_alphanumeric()) {
        return DEFAULT_MEDIA_TYPE;
    }
    let ext = ext.to_ascii_lowercase();
    MEDIA_TYPES
        .iter()
        .find(|(known, _)| *known == ext)
        .map(|(_, media_type)| *media_type)
        .unwrap_or(DEFAULT_MEDIA_TYPE)
}
