//! Site generation.
//!
//! Second stage of a build. Consumes the scanned tree and writes the output
//! site: every non-ignored file renders through its format's renderer to
//! `<stem>.html` at the mirrored location, asset directories are copied
//! verbatim, everything else is left behind.
//!
//! ```text
//! content/                         dist/
//! ├── _template.tera               │
//! ├── index.tera          ──────►  ├── index.html
//! ├── assets/             ──────►  ├── assets/          (copied verbatim)
//! │   └── style.css                │   └── style.css
//! └── posts/                       └── posts/
//!     ├── _template.tera           │
//!     └── first.md        ──────►      └── first.html
//! ```
//!
//! ## Metadata flow
//!
//! Directories generate bottom-up. A directory first generates its pages
//! subdirectories and collects each one's resolved metadata under the
//! subdirectory's name; that namespace map is what the directory's own
//! files inherit, so an index page can reach into everything below it
//! (`{{ posts.first.title }}`) while remaining blind to its siblings and
//! ancestors. The directory's own resolved metadata is the namespace map
//! overlaid with one entry per generated file, keyed by stem; on a name
//! clash between a file and a subdirectory the file wins.
//!
//! Templates never flow anywhere: a directory's template applies to its
//! direct files only.
//!
//! ## Failure semantics
//!
//! The first error aborts the whole build. Files already written stay on
//! disk; nothing is rolled back, and stale output is only removed when the
//! caller asks for an erase upfront.
//!
//! ## Parallelism
//!
//! Sibling subdirectories and sibling files fan out on the rayon pool.
//! Results are collected in input order, so the statistics tree for a given
//! source is identical run to run however the work was scheduled. One case
//! opts out: files sharing a stem collapse onto the same destination, so a
//! directory containing such a pair generates its files sequentially and
//! the last in enumeration order wins the bytes.

use crate::config::GeneratorConfig;
use crate::metadata::{self, Metadata};
use crate::render::{CompiledTemplate, RendererRegistry, template_error_message};
use crate::scan::{self, DirectoryKind, DirectoryNode, FileNode, Node, ScanError};
use rayon::prelude::*;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Instant;
use thiserror::Error;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum GenerateError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("scan failed: {0}")]
    Scan(#[from] ScanError),
    #[error("asset walk failed: {0}")]
    Walk(#[from] walkdir::Error),
    #[error("cannot read '{path}': {source}")]
    Read { path: PathBuf, source: io::Error },
    #[error("cannot write '{path}': {source}")]
    Write { path: PathBuf, source: io::Error },
    #[error("cannot copy '{from}' to '{to}': {source}")]
    Copy {
        from: PathBuf,
        to: PathBuf,
        source: io::Error,
    },
    #[error("template '{path}': {message}")]
    Template { path: PathBuf, message: String },
    #[error("cannot generate '{path}': {message}")]
    Generation { path: PathBuf, message: String },
}

impl GenerateError {
    pub(crate) fn generation(path: &Path, message: impl ToString) -> GenerateError {
        GenerateError::Generation {
            path: path.to_path_buf(),
            message: message.to_string(),
        }
    }
}

/// Timing and metadata for one generated file.
#[derive(Debug, Serialize)]
pub struct FileGenerationStat {
    /// Source stem, also the destination stem
    pub name: String,
    /// Destination path the file was written to
    pub path: PathBuf,
    pub elapsed_seconds: f64,
    /// The file's resolved metadata (frontmatter overridden by builtins)
    pub metadata: Metadata,
}

/// Timing and aggregated metadata for one generated directory. Mirrors the
/// scanned tree minus ignored entries; asset directories appear as leaves
/// with empty metadata and content.
#[derive(Debug, Serialize)]
pub struct DirectoryGenerationStat {
    pub name: String,
    /// Destination directory
    pub path: PathBuf,
    pub kind: DirectoryKind,
    /// Wall time including everything below, not a sum of children (they
    /// ran in parallel)
    pub elapsed_seconds: f64,
    /// Namespace map: subdirectory metadata overlaid by file metadata
    pub metadata: Metadata,
    /// Files first, then subdirectories, in scan order
    pub content: Vec<GenerationStat>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum GenerationStat {
    File(FileGenerationStat),
    Directory(DirectoryGenerationStat),
}

impl DirectoryGenerationStat {
    /// Number of files written across the whole tree. Asset copies are not
    /// counted.
    pub fn file_count(&self) -> usize {
        self.content
            .iter()
            .map(|stat| match stat {
                GenerationStat::File(_) => 1,
                GenerationStat::Directory(dir) => dir.file_count(),
            })
            .sum()
    }
}

/// The generation pipeline: scan, then render the tree bottom-up.
///
/// Holds no per-build state, so one generator can run any number of builds.
pub struct Generator {
    config: GeneratorConfig,
    registry: RendererRegistry,
}

impl Generator {
    pub fn new(config: GeneratorConfig, registry: RendererRegistry) -> Generator {
        Generator { config, registry }
    }

    /// Build `source_dir` into `output_dir`.
    ///
    /// With `erase`, a previous output tree is removed first; removal is
    /// best effort and never fails the build. Returns the statistics tree
    /// rooted at the source directory.
    pub fn generate(
        &self,
        source_dir: &Path,
        output_dir: &Path,
        erase: bool,
    ) -> Result<DirectoryGenerationStat, GenerateError> {
        if erase {
            erase_output(output_dir);
        }

        let tree = scan::scan(source_dir, &self.registry, &self.config)?;

        info!(
            source = %source_dir.display(),
            output = %output_dir.display(),
            "generating site"
        );
        let stat = self.generate_directory(&tree, Path::new(""), output_dir)?;
        info!(
            files = stat.file_count(),
            elapsed_seconds = stat.elapsed_seconds,
            "site generated"
        );

        Ok(stat)
    }

    /// Generate one directory level. `rel_dir` is the directory's location
    /// relative to the source root; the output location mirrors it.
    fn generate_directory(
        &self,
        dir: &DirectoryNode,
        rel_dir: &Path,
        output_root: &Path,
    ) -> Result<DirectoryGenerationStat, GenerateError> {
        let started = Instant::now();

        let files: Vec<&FileNode> = dir
            .content
            .iter()
            .filter_map(|node| match node {
                Node::File(file) => Some(file),
                Node::Directory(_) => None,
            })
            .collect();
        let subdirs: Vec<&DirectoryNode> = dir
            .content
            .iter()
            .filter_map(|node| match node {
                Node::Directory(dir) => Some(dir),
                Node::File(_) => None,
            })
            .collect();

        let template = self.compile_directory_template(&files)?;

        // Subdirectories first: their aggregated metadata feeds this
        // directory's own files
        let active_subdirs: Vec<&DirectoryNode> =
            subdirs.iter().filter(|d| !d.ignored).copied().collect();
        let subdir_stats: Vec<DirectoryGenerationStat> = active_subdirs
            .par_iter()
            .map(|child| {
                let child_rel = rel_dir.join(&child.name);
                match child.kind {
                    DirectoryKind::Assets => self.copy_assets(child, &child_rel, output_root),
                    _ => self.generate_directory(child, &child_rel, output_root),
                }
            })
            .collect::<Result<_, _>>()?;

        // The namespace a file inherits: one key per pages subdirectory.
        // Asset directories carry no metadata and contribute nothing.
        let mut namespace = Metadata::new();
        for stat in &subdir_stats {
            if stat.kind == DirectoryKind::Pages {
                namespace.insert(stat.name.clone(), Value::Object(stat.metadata.clone()));
            }
        }

        let active_files: Vec<&FileNode> = files.iter().filter(|f| !f.ignored).copied().collect();

        // Files sharing a stem collapse onto one `<stem>.html` destination.
        // Such a level generates sequentially so the last file in enumeration
        // order wins the written bytes, matching the metadata overlay below.
        let stems: BTreeSet<&str> = active_files.iter().map(|f| f.name.as_str()).collect();
        let file_stats: Vec<FileGenerationStat> = if stems.len() == active_files.len() {
            active_files
                .par_iter()
                .map(|file| {
                    self.generate_file(file, rel_dir, output_root, &namespace, template.as_ref())
                })
                .collect::<Result<_, _>>()?
        } else {
            warn!(
                directory = %dir.path.display(),
                "files sharing a stem write the same destination; the last in enumeration order wins"
            );
            active_files
                .iter()
                .map(|file| {
                    self.generate_file(file, rel_dir, output_root, &namespace, template.as_ref())
                })
                .collect::<Result<_, _>>()?
        };

        // Files overlay subdirectories, so a file and a subdirectory
        // sharing a name resolve to the file
        let mut metadata = namespace;
        for stat in &file_stats {
            metadata.insert(stat.name.clone(), Value::Object(stat.metadata.clone()));
        }

        let content: Vec<GenerationStat> = file_stats
            .into_iter()
            .map(GenerationStat::File)
            .chain(subdir_stats.into_iter().map(GenerationStat::Directory))
            .collect();

        Ok(DirectoryGenerationStat {
            name: dir.name.clone(),
            path: output_root.join(rel_dir),
            kind: dir.kind,
            elapsed_seconds: started.elapsed().as_secs_f64(),
            metadata,
            content,
        })
    }

    /// Find and compile this directory's template, if it has one.
    fn compile_directory_template(
        &self,
        files: &[&FileNode],
    ) -> Result<Option<CompiledTemplate>, GenerateError> {
        let Some(node) = files.iter().find(|f| f.is_template) else {
            return Ok(None);
        };

        let text = fs::read_to_string(&node.path).map_err(|source| GenerateError::Read {
            path: node.path.clone(),
            source,
        })?;
        let template =
            CompiledTemplate::compile(&text).map_err(|err| GenerateError::Template {
                path: node.path.clone(),
                message: template_error_message(&err),
            })?;

        debug!(template = %node.path.display(), "directory template compiled");
        Ok(Some(template))
    }

    /// Render one file and write it to its mirrored destination.
    fn generate_file(
        &self,
        file: &FileNode,
        rel_dir: &Path,
        output_root: &Path,
        inherited: &Metadata,
        template: Option<&CompiledTemplate>,
    ) -> Result<FileGenerationStat, GenerateError> {
        let started = Instant::now();

        let Some(renderer) = self.registry.get(&file.format) else {
            return Err(GenerateError::generation(
                &file.path,
                format!("no renderer found, unknown extension '{}'", file.format),
            ));
        };

        let raw = fs::read_to_string(&file.path).map_err(|source| GenerateError::Read {
            path: file.path.clone(),
            source,
        })?;

        let relative_destination = rel_dir.join(format!("{}.html", file.name));
        let builtins = metadata::builtins(
            &file.name,
            &relative_destination.to_string_lossy(),
            self.config.now,
        );

        let rendered = renderer.render(file, &raw, &builtins, inherited, template)?;

        let destination = output_root.join(&relative_destination);
        if let Some(parent) = destination.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&destination, &rendered.content).map_err(|source| GenerateError::Write {
            path: destination.clone(),
            source,
        })?;

        debug!(
            source = %file.path.display(),
            destination = %destination.display(),
            "file generated"
        );

        Ok(FileGenerationStat {
            name: file.name.clone(),
            path: destination,
            elapsed_seconds: started.elapsed().as_secs_f64(),
            metadata: rendered.metadata,
        })
    }

    /// Copy an asset directory verbatim into its mirrored destination.
    fn copy_assets(
        &self,
        dir: &DirectoryNode,
        rel_dir: &Path,
        output_root: &Path,
    ) -> Result<DirectoryGenerationStat, GenerateError> {
        let started = Instant::now();
        let destination_root = output_root.join(rel_dir);
        fs::create_dir_all(&destination_root)?;

        let mut copied = 0usize;
        for entry in WalkDir::new(&dir.path).min_depth(1) {
            let entry = entry?;
            // Walked entries always live under the walk root
            let relative = entry.path().strip_prefix(&dir.path).map_err(|_| {
                GenerateError::generation(entry.path(), "asset path outside its directory")
            })?;
            let target = destination_root.join(relative);

            if entry.file_type().is_dir() {
                fs::create_dir_all(&target)?;
            } else {
                fs::copy(entry.path(), &target).map_err(|source| GenerateError::Copy {
                    from: entry.path().to_path_buf(),
                    to: target.clone(),
                    source,
                })?;
                copied += 1;
            }
        }

        debug!(assets = %dir.path.display(), copied, "assets copied");

        Ok(DirectoryGenerationStat {
            name: dir.name.clone(),
            path: destination_root,
            kind: dir.kind,
            elapsed_seconds: started.elapsed().as_secs_f64(),
            metadata: Metadata::new(),
            content: Vec::new(),
        })
    }
}

/// Remove a previous output tree. A missing tree is fine; any other
/// failure only warns, since generation overwrites what it touches anyway.
fn erase_output(output_dir: &Path) {
    match fs::remove_dir_all(output_dir) {
        Ok(()) => info!(output = %output_dir.display(), "erased previous output"),
        Err(err) if err.kind() == io::ErrorKind::NotFound => {}
        Err(err) => warn!(
            output = %output_dir.display(),
            error = %err,
            "could not erase previous output"
        ),
    }
}

// ============================================================================
// Tests
// ============================================================================
