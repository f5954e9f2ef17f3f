//! CLI output formatting.
//!
//! # Output Format
//!
//! ## Scan
//!
//! One line per entry, indented by depth, with the classification in
//! parentheses:
//!
//! ```text
//! content/ (Pages)
//!     _template.tera (Template, ignored)
//!     index.tera (Tera)
//!     assets/ (Assets)
//!     posts/ (Pages)
//!         first.md (Markdown)
//! Scanned 2 files, 2 directories (1 ignored file)
//! ```
//!
//! ## Build
//!
//! Generated files lead with the source stem, then the destination and
//! elapsed time. Asset directories are marked copied:
//!
//! ```text
//! content/ → dist (87ms)
//!     index → dist/index.html (12ms)
//!     assets/ → dist/assets (copied, 3ms)
//!     posts/ (31ms)
//!         first → dist/posts/first.html (9ms)
//! Generated 2 files in 87ms
//! ```
//!
//! # Architecture
//!
//! Each display has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format
//! functions are pure — no I/O, no side effects.

use crate::generate::{DirectoryGenerationStat, GenerationStat};
use crate::metadata::Metadata;
use crate::scan::{DirectoryKind, DirectoryNode, FileNode, Node};

// ============================================================================
// Shared helpers
// ============================================================================

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

/// Human elapsed time: milliseconds below one second, else seconds.
fn format_elapsed(seconds: f64) -> String {
    if seconds < 1.0 {
        format!("{:.0}ms", seconds * 1000.0)
    } else {
        format!("{:.2}s", seconds)
    }
}

/// Reassemble a file's display name from stem and format.
fn file_label(file: &FileNode) -> String {
    if file.format.is_empty() {
        file.name.clone()
    } else {
        format!("{}.{}", file.name, file.format)
    }
}

// ============================================================================
// Scan output
// ============================================================================

/// Format a scanned tree, one entry per line with its classification.
pub fn format_scan_tree(root: &DirectoryNode) -> Vec<String> {
    let mut lines = Vec::new();
    lines.push(format!("{}/ ({})", root.name, root.kind));

    let mut counts = ScanCounts::default();
    walk_scan(&root.content, 1, &mut lines, &mut counts);

    lines.push(format!(
        "Scanned {} files, {} directories ({} ignored file{})",
        counts.files,
        counts.directories,
        counts.ignored_files,
        if counts.ignored_files == 1 { "" } else { "s" },
    ));
    lines
}

#[derive(Default)]
struct ScanCounts {
    files: usize,
    ignored_files: usize,
    directories: usize,
}

fn walk_scan(content: &[Node], depth: usize, lines: &mut Vec<String>, counts: &mut ScanCounts) {
    for node in content {
        match node {
            Node::File(file) => {
                if file.ignored {
                    counts.ignored_files += 1;
                } else {
                    counts.files += 1;
                }
                let marker = if file.ignored { ", ignored" } else { "" };
                lines.push(format!(
                    "{}{} ({}{})",
                    indent(depth),
                    file_label(file),
                    file.format_description,
                    marker
                ));
            }
            Node::Directory(dir) => {
                counts.directories += 1;
                lines.push(format!("{}{}/ ({})", indent(depth), dir.name, dir.kind));
                walk_scan(&dir.content, depth + 1, lines, counts);
            }
        }
    }
}

/// Print a scanned tree to stdout.
pub fn print_scan_tree(root: &DirectoryNode) {
    for line in format_scan_tree(root) {
        println!("{}", line);
    }
}

// ============================================================================
// Build output
// ============================================================================

/// Format a generation statistics tree: every written file with its
/// destination and elapsed time.
pub fn format_stats_tree(root: &DirectoryGenerationStat) -> Vec<String> {
    let mut lines = Vec::new();
    lines.push(format!(
        "{}/ \u{2192} {} ({})",
        root.name,
        root.path.display(),
        format_elapsed(root.elapsed_seconds)
    ));

    walk_stats(&root.content, 1, &mut lines);

    lines.push(format!(
        "Generated {} files in {}",
        root.file_count(),
        format_elapsed(root.elapsed_seconds)
    ));
    lines
}

fn walk_stats(content: &[GenerationStat], depth: usize, lines: &mut Vec<String>) {
    for stat in content {
        match stat {
            GenerationStat::File(file) => {
                lines.push(format!(
                    "{}{} \u{2192} {} ({})",
                    indent(depth),
                    file.name,
                    file.path.display(),
                    format_elapsed(file.elapsed_seconds)
                ));
            }
            GenerationStat::Directory(dir) if dir.kind == DirectoryKind::Assets => {
                lines.push(format!(
                    "{}{}/ \u{2192} {} (copied, {})",
                    indent(depth),
                    dir.name,
                    dir.path.display(),
                    format_elapsed(dir.elapsed_seconds)
                ));
            }
            GenerationStat::Directory(dir) => {
                lines.push(format!(
                    "{}{}/ ({})",
                    indent(depth),
                    dir.name,
                    format_elapsed(dir.elapsed_seconds)
                ));
                walk_stats(&dir.content, depth + 1, lines);
            }
        }
    }
}

/// Print a generation statistics tree to stdout.
pub fn print_stats_tree(root: &DirectoryGenerationStat) {
    for line in format_stats_tree(root) {
        println!("{}", line);
    }
}

/// Pretty-print an aggregate metadata map as JSON, for `--verbose-metadata`.
pub fn format_metadata(metadata: &Metadata) -> String {
    serde_json::to_string_pretty(metadata).expect("metadata maps serialize to JSON")
}

// ============================================================================
// Tests
// ============================================================================
