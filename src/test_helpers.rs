//! Shared test utilities for the canopy test suite.
//!
//! Provides fixture builders for source trees, a frozen engine config so
//! the `now` builtin is stable, and node unwrappers that panic with a
//! useful message instead of a bare mismatch.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let tmp = TempDir::new().unwrap();
//! write_file(tmp.path(), "posts/first.md", "# Hi");
//!
//! let root = scan(tmp.path(), &test_registry(), &test_config()).unwrap();
//! let posts = expect_dir(&root.content[0]);
//! assert_eq!(expect_file(&posts.content[0]).name, "first");
//! ```

use crate::config::GeneratorConfig;
use crate::render::RendererRegistry;
use crate::scan::{DirectoryNode, FileNode, Node};
use chrono::{DateTime, TimeZone, Utc};
use std::fs;
use std::path::{Path, PathBuf};

// =========================================================================
// Fixture setup
// =========================================================================

/// Write a file under `root`, creating parent directories as needed.
/// Returns the full path.
pub fn write_file(root: &Path, relative: &str, content: &str) -> PathBuf {
    let path = root.join(relative);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(&path, content).unwrap();
    path
}

/// The frozen build clock: 2024-05-01 12:00:00 UTC.
pub fn fixed_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
}

/// Engine config with stock names and the frozen clock.
pub fn test_config() -> GeneratorConfig {
    GeneratorConfig {
        now: fixed_now(),
        template_filename: "_template.tera".to_string(),
        asset_directory: "assets".to_string(),
    }
}

/// The stock renderer set.
pub fn test_registry() -> RendererRegistry {
    RendererRegistry::with_defaults()
}

/// A detached file node for exercising renderers directly.
pub fn file_node(name: &str, format: &str) -> FileNode {
    FileNode {
        name: name.to_string(),
        path: PathBuf::from(format!("{name}.{format}")),
        ignored: false,
        is_template: false,
        format: format.to_string(),
        format_description: String::new(),
    }
}

// =========================================================================
// Node unwrappers — panic with a clear message on mismatch
// =========================================================================

/// Unwrap a file entry. Panics naming the entry if it is a directory.
pub fn expect_file(node: &Node) -> &FileNode {
    match node {
        Node::File(file) => file,
        Node::Directory(dir) => panic!("expected a file node, got directory '{}'", dir.name),
    }
}

/// Unwrap a directory entry. Panics naming the entry if it is a file.
pub fn expect_dir(node: &Node) -> &DirectoryNode {
    match node {
        Node::Directory(dir) => dir,
        Node::File(file) => panic!("expected a directory node, got file '{}'", file.name),
    }
}
