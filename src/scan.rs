//! Directory scanning and classification.
//!
//! First stage of a build. Walks the source directory and classifies every
//! entry into an immutable tree of [`FileNode`] and [`DirectoryNode`]
//! values. No rendering happens here and nothing is written; the only side
//! effect is a warning for files that will not be renderable later.
//!
//! ## Content Structure
//!
//! ```text
//! site/                            # Source root
//! ├── _canopy.toml                 # Config (leading `_` keeps it ignored)
//! ├── _template.tera               # Per-directory template (ignored as content)
//! ├── index.tera                   # Rendered → index.html
//! ├── _draft.md                    # Ignored (leading `_`)
//! ├── assets/                      # Asset directory → copied verbatim
//! │   └── style.css
//! ├── posts/                       # Pages directory → recursed
//! │   ├── _template.tera           # posts' own template (never inherited)
//! │   ├── first.md                 # Rendered → posts/first.html
//! │   └── second.md
//! └── _wip/                        # Ignored directory → pruned, never scanned
//!     └── anything.md
//! ```
//!
//! ## Classification Rules
//!
//! - A file is **ignored** when its stem starts with `_` or it is the
//!   configured template file. Template files are detected by exact
//!   filename match and flagged `is_template`.
//! - A directory is `Ignored` when its name starts with `_` (this wins over
//!   everything), `Assets` when its name equals the configured asset
//!   directory name, else `Pages`.
//! - `Assets` and `Ignored` directories are opaque: their content is never
//!   scanned, at any depth — including the scan root itself.
//!
//! ## Ordering
//!
//! A directory's content lists all files first, then all subdirectories,
//! each group sorted by filename. Sorting makes scans (and therefore
//! generation statistics) deterministic across runs and platforms.
//!
//! ## Warnings
//!
//! A non-ignored file whose extension has no registered renderer scans
//! fine but cannot be generated. The scanner emits a `tracing` warning for
//! it; generation of that file will fail if it is ever selected.

use crate::config::GeneratorConfig;
use crate::render::RendererRegistry;
use rayon::prelude::*;
use serde::Serialize;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::warn;

/// Entries whose name starts with this prefix are excluded from rendering
/// and recursion.
pub const IGNORED_PREFIX: char = '_';

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Directory classification, decided purely by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DirectoryKind {
    /// Regular content directory: scanned, recursed, rendered.
    Pages,
    /// Copied verbatim to the output, never scanned as content.
    Assets,
    /// Pruned entirely.
    Ignored,
}

impl fmt::Display for DirectoryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DirectoryKind::Pages => write!(f, "Pages"),
            DirectoryKind::Assets => write!(f, "Assets"),
            DirectoryKind::Ignored => write!(f, "Ignored"),
        }
    }
}

/// A classified file entry.
#[derive(Debug, Clone, Serialize)]
pub struct FileNode {
    /// Filename without extension
    pub name: String,
    /// Full path within the source tree
    pub path: PathBuf,
    /// Excluded from rendering (leading `_`, or a template file)
    pub ignored: bool,
    /// Exact match against the configured template filename
    pub is_template: bool,
    /// Extension without the dot; empty when the file has none
    pub format: String,
    /// Display label: renderer description, "Template", or "Unknown"
    pub format_description: String,
}

/// A classified directory entry with its scanned children.
#[derive(Debug, Clone, Serialize)]
pub struct DirectoryNode {
    pub name: String,
    pub path: PathBuf,
    pub ignored: bool,
    pub kind: DirectoryKind,
    /// Files first, then subdirectories; empty for `Assets`/`Ignored` kinds
    pub content: Vec<Node>,
}

/// One entry of a directory's content.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum Node {
    File(FileNode),
    Directory(DirectoryNode),
}

impl Node {
    pub fn name(&self) -> &str {
        match self {
            Node::File(file) => &file.name,
            Node::Directory(dir) => &dir.name,
        }
    }
}

/// Scan a source directory into a classified tree.
///
/// The root is classified by the same rules as any other directory. A root
/// that classifies `Assets` or `Ignored` scans to an empty node — the
/// opacity invariant holds at every depth, including zero.
pub fn scan(
    source_dir: &Path,
    registry: &RendererRegistry,
    config: &GeneratorConfig,
) -> Result<DirectoryNode, ScanError> {
    let name = directory_name(source_dir);
    let ignored = name.starts_with(IGNORED_PREFIX);
    let kind = classify_directory(&name, ignored, config);

    let content = if kind == DirectoryKind::Pages {
        scan_content(source_dir, registry, config)?
    } else {
        warn!(
            path = %source_dir.display(),
            kind = %kind,
            "source root classifies as a non-pages directory; nothing to scan"
        );
        Vec::new()
    };

    Ok(DirectoryNode {
        name,
        path: source_dir.to_path_buf(),
        ignored,
        kind,
        content,
    })
}

/// Scan one directory level: classify files, recurse into pages
/// subdirectories. Subdirectory scans share no mutable state, so they run
/// in parallel; results keep the sorted input order.
fn scan_content(
    path: &Path,
    registry: &RendererRegistry,
    config: &GeneratorConfig,
) -> Result<Vec<Node>, ScanError> {
    let entries = collect_entries(path)?;
    let (directories, files): (Vec<_>, Vec<_>) = entries.into_iter().partition(|p| p.is_dir());

    let mut content: Vec<Node> = files
        .into_iter()
        .map(|p| Node::File(scan_file(p, registry, config)))
        .collect();

    let subdirs: Vec<Node> = directories
        .par_iter()
        .map(|p| scan_subdirectory(p, registry, config).map(Node::Directory))
        .collect::<Result<_, _>>()?;

    content.extend(subdirs);
    Ok(content)
}

/// List a directory's entries sorted by filename.
fn collect_entries(path: &Path) -> Result<Vec<PathBuf>, ScanError> {
    let mut entries: Vec<PathBuf> = fs::read_dir(path)?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .collect();

    entries.sort();
    Ok(entries)
}

fn scan_file(path: PathBuf, registry: &RendererRegistry, config: &GeneratorConfig) -> FileNode {
    let filename = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let name = path
        .file_stem()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let format = path
        .extension()
        .map(|e| e.to_string_lossy().into_owned())
        .unwrap_or_default();

    let is_template = filename == config.template_filename;
    let ignored = name.starts_with(IGNORED_PREFIX) || is_template;
    let renderer = registry.get(&format);

    if !ignored && renderer.is_none() {
        warn!(
            path = %path.display(),
            format = %format,
            "file has an unknown format and will fail at generation"
        );
    }

    let format_description = if is_template {
        "Template".to_string()
    } else {
        renderer
            .map(|r| r.description().to_string())
            .unwrap_or_else(|| "Unknown".to_string())
    };

    FileNode {
        name,
        path,
        ignored,
        is_template,
        format,
        format_description,
    }
}

fn scan_subdirectory(
    path: &Path,
    registry: &RendererRegistry,
    config: &GeneratorConfig,
) -> Result<DirectoryNode, ScanError> {
    let name = directory_name(path);
    let ignored = name.starts_with(IGNORED_PREFIX);
    let kind = classify_directory(&name, ignored, config);

    // Assets and ignored trees are opaque: no recursion, empty content
    let content = if kind == DirectoryKind::Pages {
        scan_content(path, registry, config)?
    } else {
        Vec::new()
    };

    Ok(DirectoryNode {
        name,
        path: path.to_path_buf(),
        ignored,
        kind,
        content,
    })
}

fn classify_directory(name: &str, ignored: bool, config: &GeneratorConfig) -> DirectoryKind {
    if ignored {
        DirectoryKind::Ignored
    } else if name == config.asset_directory {
        DirectoryKind::Assets
    } else {
        DirectoryKind::Pages
    }
}

fn directory_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string_lossy().into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{expect_dir, expect_file, test_config, test_registry, write_file};
    use tempfile::TempDir;

    fn scan_with_defaults(path: &Path) -> Result<DirectoryNode, ScanError> {
        scan(path, &test_registry(), &test_config())
    }

    // =========================================================================
    // Classification
    // =========================================================================

    #[test]
    fn ignored_entries_are_flagged_and_pruned() {
        let tmp = TempDir::new().unwrap();
        write_file(tmp.path(), "index.html", "<h1>Hello, world</h1>");
        write_file(tmp.path(), "_ignored.txt", "");
        write_file(tmp.path(), "_alsoIgnored/filter.txt", "");
        write_file(tmp.path(), "_alsoIgnored/_ignored.txt", "");

        let root = scan_with_defaults(tmp.path()).unwrap();
        assert_eq!(root.kind, DirectoryKind::Pages);
        assert!(!root.ignored);
        assert_eq!(root.content.len(), 3);

        // Sorted files first: "_ignored.txt" < "index.html"
        let ignored = expect_file(&root.content[0]);
        assert_eq!(ignored.name, "_ignored");
        assert!(ignored.ignored);
        assert!(!ignored.is_template);
        assert_eq!(ignored.format, "txt");
        assert_eq!(ignored.format_description, "Unknown");

        let index = expect_file(&root.content[1]);
        assert_eq!(index.name, "index");
        assert!(!index.ignored);
        assert_eq!(index.format, "html");
        assert_eq!(index.format_description, "HTML");

        let pruned = expect_dir(&root.content[2]);
        assert_eq!(pruned.name, "_alsoIgnored");
        assert!(pruned.ignored);
        assert_eq!(pruned.kind, DirectoryKind::Ignored);
        assert!(pruned.content.is_empty());
    }

    #[test]
    fn template_detected_by_configured_filename() {
        let tmp = TempDir::new().unwrap();
        write_file(tmp.path(), "index.html", "<h1>Hello, world</h1>");
        write_file(tmp.path(), "myCustomTemplate.tera", "");

        let mut config = test_config();
        config.template_filename = "myCustomTemplate.tera".to_string();
        let root = scan(tmp.path(), &test_registry(), &config).unwrap();

        let template = expect_file(&root.content[1]);
        assert_eq!(template.name, "myCustomTemplate");
        assert!(template.is_template);
        // Template files are special-cased out of rendering
        assert!(template.ignored);
        assert_eq!(template.format, "tera");
        assert_eq!(template.format_description, "Template");
    }

    #[test]
    fn default_template_filename_not_special_when_renamed() {
        let tmp = TempDir::new().unwrap();
        write_file(tmp.path(), "_template.tera", "{{ content }}");

        let mut config = test_config();
        config.template_filename = "layout.tera".to_string();
        let root = scan(tmp.path(), &test_registry(), &config).unwrap();

        // Still ignored via the `_` prefix, but not a template
        let node = expect_file(&root.content[0]);
        assert!(node.ignored);
        assert!(!node.is_template);
    }

    #[test]
    fn asset_directory_matches_configured_name_at_any_depth() {
        let tmp = TempDir::new().unwrap();
        write_file(tmp.path(), "a/b/static/deep/file.bin", "bytes");
        write_file(tmp.path(), "a/assets/file.css", "body {}");

        let mut config = test_config();
        config.asset_directory = "static".to_string();
        let root = scan(tmp.path(), &test_registry(), &config).unwrap();

        let a = expect_dir(&root.content[0]);
        // "assets" is an ordinary pages directory under this configuration
        let assets = expect_dir(&a.content[0]);
        assert_eq!(assets.kind, DirectoryKind::Pages);
        assert_eq!(assets.content.len(), 1);

        let b = expect_dir(&a.content[1]);
        let stat = expect_dir(&b.content[0]);
        assert_eq!(stat.name, "static");
        assert_eq!(stat.kind, DirectoryKind::Assets);
        assert!(stat.content.is_empty());
    }

    #[test]
    fn ignored_wins_over_asset_name() {
        let tmp = TempDir::new().unwrap();
        write_file(tmp.path(), "_blobs/file.bin", "bytes");

        let mut config = test_config();
        config.asset_directory = "_blobs".to_string();
        let root = scan(tmp.path(), &test_registry(), &config).unwrap();

        let blobs = expect_dir(&root.content[0]);
        assert_eq!(blobs.kind, DirectoryKind::Ignored);
        assert!(blobs.content.is_empty());
    }

    #[test]
    fn root_classified_by_the_same_rules() {
        let tmp = TempDir::new().unwrap();
        write_file(tmp.path(), "assets/style.css", "body {}");

        let root = scan_with_defaults(&tmp.path().join("assets")).unwrap();
        assert_eq!(root.kind, DirectoryKind::Assets);
        assert!(root.content.is_empty());
    }

    // =========================================================================
    // Name and format splitting
    // =========================================================================

    #[test]
    fn name_splits_on_last_dot() {
        let tmp = TempDir::new().unwrap();
        write_file(tmp.path(), "archive.tar.gz", "");

        let root = scan_with_defaults(tmp.path()).unwrap();
        let file = expect_file(&root.content[0]);
        assert_eq!(file.name, "archive.tar");
        assert_eq!(file.format, "gz");
    }

    #[test]
    fn extensionless_file_has_empty_format() {
        let tmp = TempDir::new().unwrap();
        write_file(tmp.path(), "README", "hello");

        let root = scan_with_defaults(tmp.path()).unwrap();
        let file = expect_file(&root.content[0]);
        assert_eq!(file.name, "README");
        assert_eq!(file.format, "");
        assert_eq!(file.format_description, "Unknown");
    }

    #[test]
    fn unknown_format_does_not_fail_scan() {
        let tmp = TempDir::new().unwrap();
        write_file(tmp.path(), "data.xyz", "???");

        let root = scan_with_defaults(tmp.path()).unwrap();
        assert_eq!(root.content.len(), 1);
    }

    // =========================================================================
    // Tree shape
    // =========================================================================

    #[test]
    fn files_before_directories_each_sorted() {
        let tmp = TempDir::new().unwrap();
        write_file(tmp.path(), "zebra.html", "");
        write_file(tmp.path(), "alpha.html", "");
        write_file(tmp.path(), "posts/one.md", "");
        write_file(tmp.path(), "archive/old.md", "");

        let root = scan_with_defaults(tmp.path()).unwrap();
        let names: Vec<&str> = root.content.iter().map(|n| n.name()).collect();
        assert_eq!(names, vec!["alpha", "zebra", "archive", "posts"]);
    }

    #[test]
    fn nested_tree_combined() {
        let tmp = TempDir::new().unwrap();
        write_file(tmp.path(), "index.tera", "");
        write_file(tmp.path(), "posts/_ignored.txt", "file content here");
        write_file(tmp.path(), "posts/implate.tera", "file content here");
        write_file(tmp.path(), "posts/page1.yml", "title: one");
        write_file(tmp.path(), "posts/page2.yml", "title: two");
        write_file(tmp.path(), "nested/nested/foo.html", "<h1>Hello, world</h1>");
        write_file(tmp.path(), "nested/nested/assets/some.png", "not really a png");

        let root = scan_with_defaults(tmp.path()).unwrap();
        assert_eq!(root.content.len(), 3);

        let index = expect_file(&root.content[0]);
        assert_eq!(index.format_description, "Tera");

        let nested = expect_dir(&root.content[1]);
        assert_eq!(nested.name, "nested");
        let inner = expect_dir(&nested.content[0]);
        assert_eq!(inner.content.len(), 2);
        assert_eq!(expect_file(&inner.content[0]).name, "foo");
        let assets = expect_dir(&inner.content[1]);
        assert_eq!(assets.kind, DirectoryKind::Assets);
        assert!(assets.content.is_empty());

        let posts = expect_dir(&root.content[2]);
        assert_eq!(posts.content.len(), 4);
        assert!(expect_file(&posts.content[0]).ignored);
        assert_eq!(expect_file(&posts.content[1]).name, "implate");
        assert_eq!(expect_file(&posts.content[2]).format_description, "YAML");
        assert_eq!(expect_file(&posts.content[3]).name, "page2");
    }

    #[test]
    fn missing_directory_is_an_io_error() {
        let tmp = TempDir::new().unwrap();
        let result = scan_with_defaults(&tmp.path().join("does-not-exist"));
        assert!(matches!(result, Err(ScanError::Io(_))));
    }
}
