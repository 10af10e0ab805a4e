//! Worker source generation.
//!
//! Second half of generation. Takes the sorted [`FileEntry`] list from
//! [`crate::scan`] and renders a single Deno Deploy worker that serves every
//! entry from an embedded table.
//!
//! ## Generated Program
//!
//! ```text
//! // Generated by deploy-dir 0.4.0. Do not edit.
//! import { decode } from ".../encoding/base64.ts";         always
//! import { gunzip } from ".../denoflate/mod.ts";           compress
//! import { basicAuth } from ".../basic_auth/mod.ts";       basic auth
//! const dirData: Record<string, [Uint8Array, string]> = {};
//! const credentials = {"user":"password"};                 basic auth
//! const cacheControl = [["/img","max-age=86400"]];         cache
//! dirData["/bar.ts"] = [decode("..."), "text/typescript"];
//! dirData["/foo.txt"] = [decode("..."), "text/plain"];
//! addEventListener("fetch", (e) => { ... });
//! ```
//!
//! The JavaScript dialect drops the type annotation on `dirData`; nothing
//! else changes between dialects.
//!
//! ## Request Handling
//!
//! 1. Basic auth, if configured, is checked first. Failing requests get the
//!    401 challenge and never reach the table.
//! 2. The path is percent-decoded, so `/a%20b.html` finds `/a b.html`. A
//!    malformed escape leaves it as sent.
//! 3. A path ending in `/` has `index.html` appended.
//! 4. The table is tried with the exact path, then with `.html` appended.
//! 5. Hits are served with their media type. Compressed payloads go out as-is
//!    with `content-encoding: gzip` when `accept-encoding` lists `gzip`, and
//!    are gunzipped in the worker otherwise.
//! 6. `cache-control` comes from the longest configured prefix of the
//!    request path.
//! 7. Misses are `404 Not Found`.

use crate::config::{BasicAuth, ConfigError, Dialect, GenerationOptions};
use crate::scan::{self, ScanError};
use crate::types::FileEntry;
use std::path::Path;
use thiserror::Error;
use tracing::info;

#[derive(Error, Debug)]
pub enum GenerateError {
    #[error(transparent)]
    FileSystem(#[from] ScanError),
    #[error(transparent)]
    InvalidConfiguration(#[from] ConfigError),
}

const BASE64_IMPORT: &str =
    r#"import { decode } from "https://deno.land/std@0.97.0/encoding/base64.ts";"#;
const GUNZIP_IMPORT: &str = r#"import { gunzip } from "https://deno.land/x/denoflate@1.2.1/mod.ts";"#;
const BASIC_AUTH_IMPORT: &str =
    r#"import { basicAuth } from "https://deno.land/x/basic_auth@v1.0.0/mod.ts";"#;
const BASIC_AUTH_REALM: &str = "Access to the site";

/// A rendered worker together with the entries embedded in it.
#[derive(Debug)]
pub struct Generated {
    pub source: String,
    pub entries: Vec<FileEntry>,
}

/// Walk `dir` and render the worker that serves it.
///
/// Files are served under `root`. [`GenerationOptions::root`] is not
/// consulted here: it is where the config layers resolve the prefix, and
/// callers holding resolved options pass `&options.root`.
///
/// Options are validated before the directory is touched, so a bad
/// credential string fails without reading any files.
pub fn generate(
    dir: &Path,
    root: &str,
    options: &GenerationOptions,
) -> Result<String, GenerateError> {
    generate_with_entries(dir, root, options).map(|generated| generated.source)
}

/// [`generate`], also returning the scanned entries for reporting.
pub fn generate_with_entries(
    dir: &Path,
    root: &str,
    options: &GenerationOptions,
) -> Result<Generated, GenerateError> {
    options.validate()?;
    let entries = scan::scan(dir, root, options)?;
    let source = render(&entries, options)?;
    Ok(Generated { source, entries })
}

/// Render the worker source for already-scanned entries.
///
/// `entries` must be sorted by served path; [`scan::scan`] returns them that
/// way.
pub fn render(entries: &[FileEntry], options: &GenerationOptions) -> Result<String, ConfigError> {
    let credentials = options.credentials()?;
    let cache = options.cache_directives();
    if let Some(cache) = cache {
        cache.validate()?;
    }

    let mut out = Vec::with_capacity(entries.len() + 48);
    out.push(header_comment());
    out.extend(render_imports(options.compress, credentials.is_some()));
    out.push(table_declaration(options.dialect).to_string());
    if let Some(auth) = &credentials {
        out.push(render_credentials(auth));
    }
    if let Some(cache) = cache {
        out.push(render_cache_table(&cache.by_match_order()));
    }
    out.extend(entries.iter().map(render_entry));
    out.extend(render_handler(&HandlerFeatures {
        basic_auth: credentials.is_some(),
        cache: cache.is_some(),
        compressed: options.compress,
    }));

    info!(
        entries = entries.len(),
        dialect = ?options.dialect,
        basic_auth = credentials.is_some(),
        cache = cache.is_some(),
        compressed = options.compress,
        "rendered worker source"
    );

    let mut source = out.join("\n");
    source.push('\n');
    Ok(source)
}

fn header_comment() -> String {
    format!(
        "// Generated by deploy-dir {}. Do not edit.",
        env!("CARGO_PKG_VERSION")
    )
}

fn render_imports(compressed: bool, basic_auth: bool) -> Vec<String> {
    let mut imports = vec![BASE64_IMPORT.to_string()];
    if compressed {
        imports.push(GUNZIP_IMPORT.to_string());
    }
    if basic_auth {
        imports.push(BASIC_AUTH_IMPORT.to_string());
    }
    imports
}

/// The only line whose shape depends on the dialect.
fn table_declaration(dialect: Dialect) -> &'static str {
    match dialect {
        Dialect::TypeScript => "const dirData: Record<string, [Uint8Array, string]> = {};",
        Dialect::JavaScript => "const dirData = {};",
    }
}

fn render_credentials(auth: &BasicAuth) -> String {
    format!(
        "const credentials = {{{}: {}}};",
        js_string(&auth.user),
        js_string(&auth.password)
    )
}

fn render_cache_table(ordered: &[(&str, &str)]) -> String {
    let pairs: Vec<String> = ordered
        .iter()
        .map(|(prefix, value)| format!("[{}, {}]", js_string(prefix), js_string(value)))
        .collect();
    format!("const cacheControl = [{}];", pairs.join(", "))
}

fn render_entry(entry: &FileEntry) -> String {
    format!(
        "dirData[{}] = [decode(\"{}\"), {}];",
        js_string(&entry.served_path),
        entry.encoded_payload(),
        js_string(entry.media_type)
    )
}

/// A JSON string literal, which is also a valid JS/TS string literal.
fn js_string(s: &str) -> String {
    serde_json::Value::from(s).to_string()
}

/// Which optional branches the fetch handler needs.
struct HandlerFeatures {
    basic_auth: bool,
    cache: bool,
    compressed: bool,
}

fn render_handler(features: &HandlerFeatures) -> Vec<String> {
    let mut lines: Vec<String> = Vec::new();
    let mut push = |depth: usize, line: &str| lines.push(format!("{}{}", "  ".repeat(depth), line));

    push(0, r#"addEventListener("fetch", (e) => {"#);
    push(1, "let pathname = new URL(e.request.url).pathname;");
    push(1, "try {");
    push(2, "pathname = decodeURIComponent(pathname);");
    push(1, "} catch {");
    push(2, "// malformed escapes are looked up as sent");
    push(1, "}");
    if features.basic_auth {
        push(
            1,
            &format!(
                "const unauthorized = basicAuth(e.request, {}, credentials);",
                js_string(BASIC_AUTH_REALM)
            ),
        );
        push(1, "if (unauthorized) {");
        push(2, "e.respondWith(unauthorized);");
        push(2, "return;");
        push(1, "}");
    }
    push(1, "let path = pathname;");
    push(1, r#"if (path.endsWith("/")) {"#);
    push(2, r#"path += "index.html";"#);
    push(1, "}");
    push(1, r#"const data = dirData[path] ?? dirData[path + ".html"];"#);
    push(1, "if (data) {");
    push(2, "const [bytes, mediaType] = data;");
    push(2, r#"const headers = new Headers({ "content-type": mediaType });"#);
    if features.cache {
        push(2, "const directive = cacheControl.find(([prefix]) => pathname.startsWith(prefix));");
        push(2, "if (directive) {");
        push(3, r#"headers.set("cache-control", directive[1]);"#);
        push(2, "}");
    }
    if features.compressed {
        push(2, r#"headers.set("vary", "accept-encoding");"#);
        push(2, r#"const acceptsGzip = (e.request.headers.get("accept-encoding") ?? "")"#);
        push(3, r#".split(/[,;\s]+/)"#);
        push(3, r#".includes("gzip");"#);
        push(2, "if (acceptsGzip) {");
        push(3, r#"headers.set("content-encoding", "gzip");"#);
        push(3, "e.respondWith(new Response(bytes, { headers }));");
        push(2, "} else {");
        push(3, "e.respondWith(new Response(gunzip(bytes), { headers }));");
        push(2, "}");
    } else {
        push(2, "e.respondWith(new Response(bytes, { headers }));");
    }
    push(2, "return;");
    push(1, "}");
    push(1, r#"e.respondWith(new Response("404 Not Found", { status: 404 }));"#);
    push(0, "});");
    lines
}
