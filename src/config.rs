//! Generation options and their sources.
//!
//! Options reach the generator from two places: an optional TOML file and
//! command-line flags. Both are layered on top of the stock defaults with the
//! same recursive merge, then validated into a [`GenerationOptions`]:
//!
//! ```text
//! stock defaults  →  --config file  →  command-line flags
//! ```
//!
//! ## Config File
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! root = "/"                 # URL prefix the files are served under
//! dialect = "typescript"     # or "javascript"
//! compress = false           # gzip payloads at build time
//! gzip_mtime = 0             # gzip header timestamp, or "now"
//! # basic_auth = "user:password"
//!
//! [cache]
//! # "/css" = "max-age=3600"
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::str::FromStr;
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid --basic-auth option: {0} (expected <user>:<password>)")]
    InvalidBasicAuth(String),
    #[error("Invalid --cache option: {0} (expected <prefix>:<value>,...)")]
    InvalidCacheOption(String),
    #[error("Invalid gzip mtime: {0} (expected seconds or \"now\")")]
    InvalidGzipMtime(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Which source language the generated program is written in.
///
/// Only the data-table declaration differs between the two; the request
/// handler is the same text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    /// Typed declarations (`deploy.ts`).
    #[default]
    TypeScript,
    /// Untyped declarations (`deploy.js`).
    JavaScript,
}

/// Validated basic-auth credentials.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BasicAuth {
    pub user: String,
    pub password: String,
}

impl BasicAuth {
    /// Parse `<user>:<password>`.
    ///
    /// Exactly one `:` is allowed and neither side may be empty.
    pub fn parse(credentials: &str) -> Result<Self, ConfigError> {
        let invalid = || ConfigError::InvalidBasicAuth(credentials.to_string());
        let (user, password) = credentials.split_once(':').ok_or_else(invalid)?;
        if user.is_empty() || password.is_empty() || password.contains(':') {
            return Err(invalid());
        }
        Ok(Self {
            user: user.to_string(),
            password: password.to_string(),
        })
    }
}

/// Path prefix → `cache-control` value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CacheDirectives(BTreeMap<String, String>);

impl CacheDirectives {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[cfg(test)]
    pub(crate) fn get(&self, prefix: &str) -> Option<&str> {
        self.0.get(prefix).map(String::as_str)
    }

    /// Reject entries with an empty prefix or an empty value.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (prefix, value) in &self.0 {
            if prefix.is_empty() || value.is_empty() {
                return Err(ConfigError::InvalidCacheOption(format!("{prefix}:{value}")));
            }
        }
        Ok(())
    }

    /// Entries in match order: longest prefix first, ties byte-wise.
    ///
    /// The generated handler takes the first prefix the request path starts
    /// with, so this order makes the most specific directive win.
    pub fn by_match_order(&self) -> Vec<(&str, &str)> {
        let mut ordered: Vec<(&str, &str)> = self
            .0
            .iter()
            .map(|(prefix, value)| (prefix.as_str(), value.as_str()))
            .collect();
        ordered.sort_by(|(a, _), (b, _)| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
        ordered
    }

    /// The `[cache]` table as it appears in a config file.
    pub fn to_toml(&self) -> toml::Value {
        toml::Value::Table(
            self.0
                .iter()
                .map(|(prefix, value)| (prefix.clone(), toml::Value::String(value.clone())))
                .collect(),
        )
    }
}

/// Parse a `--cache` option string: `<prefix>:<value>,<prefix>:<value>,...`.
///
/// Each entry is split on its first `:`, so values may themselves contain
/// colons. Whitespace around commas is ignored.
pub fn parse_cache_option(opts: &str) -> Result<CacheDirectives, ConfigError> {
    let mut directives = BTreeMap::new();
    for entry in opts.split(',').map(str::trim) {
        match entry.split_once(':') {
            Some((prefix, value)) if !prefix.is_empty() && !value.is_empty() => {
                directives.insert(prefix.to_string(), value.to_string());
            }
            _ => return Err(ConfigError::InvalidCacheOption(opts.to_string())),
        }
    }
    Ok(CacheDirectives(directives))
}

/// Timestamp written into the gzip header of compressed payloads.
///
/// Defaults to a fixed zero so repeated runs over the same tree produce
/// byte-identical output. `Now` must be asked for explicitly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawGzipMtime", into = "RawGzipMtime")]
pub enum GzipMtime {
    Fixed(u32),
    Now,
}

impl Default for GzipMtime {
    fn default() -> Self {
        GzipMtime::Fixed(0)
    }
}

impl GzipMtime {
    /// Seconds since the Unix epoch to put in the header.
    pub fn resolve(self) -> u32 {
        match self {
            GzipMtime::Fixed(secs) => secs,
            GzipMtime::Now => SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| u32::try_from(d.as_secs()).unwrap_or(u32::MAX))
                .unwrap_or(0),
        }
    }

    /// The `gzip_mtime` value as it appears in a config file.
    pub fn to_toml(self) -> toml::Value {
        match self {
            GzipMtime::Fixed(secs) => toml::Value::Integer(i64::from(secs)),
            GzipMtime::Now => toml::Value::String("now".to_string()),
        }
    }
}

impl FromStr for GzipMtime {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("now") {
            return Ok(GzipMtime::Now);
        }
        s.parse::<u32>()
            .map(GzipMtime::Fixed)
            .map_err(|_| ConfigError::InvalidGzipMtime(s.to_string()))
    }
}

/// TOML shape of [`GzipMtime`]: an integer or the string `"now"`.
#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum RawGzipMtime {
    Seconds(u32),
    Keyword(String),
}

impl TryFrom<RawGzipMtime> for GzipMtime {
    type Error = ConfigError;

    fn try_from(raw: RawGzipMtime) -> Result<Self, Self::Error> {
        match raw {
            RawGzipMtime::Seconds(secs) => Ok(GzipMtime::Fixed(secs)),
            RawGzipMtime::Keyword(keyword) => keyword.parse(),
        }
    }
}

impl From<GzipMtime> for RawGzipMtime {
    fn from(mtime: GzipMtime) -> Self {
        match mtime {
            GzipMtime::Fixed(secs) => RawGzipMtime::Seconds(secs),
            GzipMtime::Now => RawGzipMtime::Keyword("now".to_string()),
        }
    }
}

/// Everything the generator needs besides the directory itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationOptions {
    /// URL prefix the files are served under. A leading `/` is implied.
    pub root: String,
    pub dialect: Dialect,
    /// Raw `<user>:<password>` string; checked by [`Self::validate`].
    pub basic_auth: Option<String>,
    pub cache: Option<CacheDirectives>,
    /// Gzip payloads at build time and negotiate `content-encoding` at runtime.
    pub compress: bool,
    pub gzip_mtime: GzipMtime,
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self {
            root: "/".to_string(),
            dialect: Dialect::default(),
            basic_auth: None,
            cache: None,
            compress: false,
            gzip_mtime: GzipMtime::default(),
        }
    }
}

impl GenerationOptions {
    /// Check the credential string and the cache directives.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.credentials()?;
        if let Some(cache) = &self.cache {
            cache.validate()?;
        }
        Ok(())
    }

    /// Parsed basic-auth credentials, if configured.
    pub fn credentials(&self) -> Result<Option<BasicAuth>, ConfigError> {
        self.basic_auth.as_deref().map(BasicAuth::parse).transpose()
    }

    /// Cache directives, treating an empty mapping as none.
    pub fn cache_directives(&self) -> Option<&CacheDirectives> {
        self.cache.as_ref().filter(|c| !c.is_empty())
    }
}

/// Config file contents after merging, before validation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConfigFile {
    pub root: String,
    pub dialect: Dialect,
    pub compress: bool,
    pub gzip_mtime: GzipMtime,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub basic_auth: Option<String>,
    pub cache: CacheDirectives,
}

impl Default for ConfigFile {
    fn default() -> Self {
        let options = GenerationOptions::default();
        Self {
            root: options.root,
            dialect: options.dialect,
            compress: options.compress,
            gzip_mtime: options.gzip_mtime,
            basic_auth: None,
            cache: CacheDirectives::default(),
        }
    }
}

impl ConfigFile {
    /// Validate and convert into [`GenerationOptions`].
    pub fn into_options(self) -> Result<GenerationOptions, ConfigError> {
        let options = GenerationOptions {
            root: self.root,
            dialect: self.dialect,
            basic_auth: self.basic_auth,
            cache: (!self.cache.is_empty()).then_some(self.cache),
            compress: self.compress,
            gzip_mtime: self.gzip_mtime,
        };
        options.validate()?;
        Ok(options)
    }
}

// =============================================================================
// Config loading and merging
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
pub fn stock_defaults_value() -> toml::Value {
    toml::Value::try_from(ConfigFile::default()).expect("default config must serialize")
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Read a config file as a raw TOML value.
pub fn load_raw_config(path: &Path) -> Result<toml::Value, ConfigError> {
    let content = fs::read_to_string(path)?;
    Ok(toml::from_str(&content)?)
}

/// Merge overlays onto `base` in order, then deserialize and validate.
pub fn resolve_config(
    base: toml::Value,
    overlays: impl IntoIterator<Item = toml::Value>,
) -> Result<GenerationOptions, ConfigError> {
    let merged = overlays.into_iter().fold(base, merge_toml);
    let config: ConfigFile = merged.try_into()?;
    config.into_options()
}

/// Load options from an optional config file with command-line overrides on top.
pub fn load_config(
    path: Option<&Path>,
    overrides: toml::Table,
) -> Result<GenerationOptions, ConfigError> {
    let mut overlays = Vec::new();
    if let Some(path) = path {
        overlays.push(load_raw_config(path)?);
    }
    overlays.push(toml::Value::Table(overrides));
    resolve_config(stock_defaults_value(), overlays)
}

/// A fully-commented `deploy-dir.toml` with every key at its default.
///
/// Printed by `deploy-dir --gen-config`.
pub fn stock_config_toml() -> &'static str {
    r##"# deploy-dir configuration
# ========================
# All settings are optional. Values shown are the defaults.
# Flags given on the command line override this file.
# Unknown keys will cause an error.

# URL prefix the files are served under. A leading "/" is implied.
root = "/"

# Source dialect of the generated program: "typescript" or "javascript".
dialect = "typescript"

# Gzip file contents at build time. Clients that accept gzip get the
# compressed bytes; the rest are decompressed on the fly.
compress = false

# Timestamp written into the gzip headers. Keep it fixed for reproducible
# output, or set "now" to stamp the build time.
gzip_mtime = 0

# Require HTTP basic authentication on every request.
# basic_auth = "user:password"

# cache-control header per path prefix. The longest matching prefix wins.
[cache]
# "/css" = "max-age=3600"
# "/img" = "max-age=86400"
"##
}
