//! Metadata model, frontmatter parsing, and merge rules.
//!
//! Every content file can carry metadata from two independent sources:
//!
//! ## Frontmatter (read from the file)
//!
//! A leading YAML block fenced by `---` lines:
//!
//! ```text
//! ---
//! title: Blogging Like a Hacker
//! author: Vuzi
//! ---
//! <h1>{{ title }}</h1>
//! ```
//!
//! The block must parse to a YAML mapping. A file without an opening fence
//! (or without a closing one) has no frontmatter — the whole file is body.
//!
//! ## Builtins (injected by the engine)
//!
//! - **`fileName`**: the file stem (`posts/page1.yml` → `page1`)
//! - **`filePath`**: the destination path relative to the output root
//!   (`posts/page1.html`)
//! - **`now`**: the generation timestamp, RFC 3339. Fixed once per run so
//!   every file in a build sees the same instant.
//!
//! ## Resolution priority
//!
//! Builtins always win over frontmatter keys of the same name: a file
//! declaring `fileName: lies` still resolves `fileName` to its real stem.
//! During template rendering, a file's own resolved metadata wins over
//! inherited directory metadata on key collision.
//!
//! Merging is shallow. A key maps to exactly one source's value; values are
//! never deep-merged across sources.

use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{Map, Value};
use thiserror::Error;

/// Untyped key→value metadata, as parsed from frontmatter or aggregated
/// across a directory. Directory aggregates nest: a key may map to a child
/// file's metadata or to a child directory's own aggregate.
pub type Metadata = Map<String, Value>;

#[derive(Error, Debug)]
pub enum MetadataError {
    #[error("invalid YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("expected a YAML mapping at the top level")]
    NotAMapping,
}

/// Split content into a frontmatter block and a body.
///
/// Returns `None` when there is no opening `---` fence at the start of the
/// file or no closing fence after it — the caller treats the whole file as
/// body. The returned block is trimmed; the body has leading whitespace
/// stripped so the fence line's trailing newline does not leak into output.
pub fn split_frontmatter(content: &str) -> Option<(&str, &str)> {
    let content = content.trim_start();
    let after_open = content.strip_prefix("---")?;
    let closing = after_open.find("---")?;

    let block = after_open[..closing].trim();
    let body = after_open[closing + 3..].trim_start();

    Some((block, body))
}

/// Parse a YAML block into a [`Metadata`] mapping.
///
/// An empty block parses to an empty mapping. A block whose top level is a
/// scalar or a sequence is refused — keyless metadata has no place in the
/// directory namespace.
pub fn parse_block(block: &str) -> Result<Metadata, MetadataError> {
    match serde_yaml::from_str::<Value>(block)? {
        Value::Null => Ok(Metadata::new()),
        Value::Object(map) => Ok(map),
        _ => Err(MetadataError::NotAMapping),
    }
}

/// Parse a file's frontmatter, returning `(metadata, body)`.
///
/// Absence of a frontmatter block is not an error: the metadata is empty
/// and the body is the entire content.
pub fn parse_frontmatter(content: &str) -> Result<(Metadata, &str), MetadataError> {
    match split_frontmatter(content) {
        Some((block, body)) => Ok((parse_block(block)?, body)),
        None => Ok((Metadata::new(), content)),
    }
}

/// Build the engine-injected metadata for one file.
pub fn builtins(file_name: &str, destination_path: &str, now: DateTime<Utc>) -> Metadata {
    let mut map = Metadata::new();
    map.insert("fileName".into(), Value::String(file_name.to_string()));
    map.insert(
        "filePath".into(),
        Value::String(destination_path.to_string()),
    );
    map.insert(
        "now".into(),
        Value::String(now.to_rfc3339_opts(SecondsFormat::Secs, true)),
    );
    map
}

/// Shallow merge: every key of `overlay` replaces the same key of `base`.
pub fn merge(base: &Metadata, overlay: &Metadata) -> Metadata {
    let mut merged = base.clone();
    for (key, value) in overlay {
        merged.insert(key.clone(), value.clone());
    }
    merged
}
