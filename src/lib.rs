//! # Canopy
//!
//! A hierarchical static site generator where ancestor pages can see
//! descendant metadata. Your filesystem is the site map: every content file
//! renders to HTML at the same relative location, directories aggregate
//! what is beneath them, and an index page at any level can list everything
//! below it without a query API.
//!
//! # Architecture: Scan, Then Generate
//!
//! A build runs two independent stages:
//!
//! ```text
//! 1. Scan      content/  →  classified tree    (filesystem → structured data)
//! 2. Generate  tree      →  dist/              (render bottom-up, copy assets)
//! ```
//!
//! This separation exists for three reasons:
//!
//! - **Inspectability**: `canopy scan` prints the classified tree without
//!   writing a byte, and surfaces format warnings before a build.
//! - **Testability**: classification is a pure function of names, so the
//!   scanner is tested without rendering anything.
//! - **Determinism**: the tree fixes the work and its order up front;
//!   generation only parallelizes over it.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`scan`] | Stage 1 — walks the source directory, classifies entries into a node tree |
//! | [`generate`] | Stage 2 — renders the tree bottom-up, copies assets, collects statistics |
//! | [`render`] | Format renderers (Markdown, YAML, Tera, HTML) and the registry dispatching to them |
//! | [`metadata`] | Frontmatter parsing, builtin keys, and the merge rules |
//! | [`config`] | `_canopy.toml` loading, merging, validation; the engine config |
//! | [`output`] | CLI output formatting — tree display of scans and build statistics |
//!
//! # Design Decisions
//!
//! ## Bottom-Up Metadata
//!
//! Generation recurses into subdirectories before rendering a directory's
//! own files, and each subdirectory returns its aggregated metadata keyed
//! by name. That inversion — ancestors render last — is what lets a root
//! index write `{{ posts.first.title }}` with no collection API, no
//! taxonomy config, and no second pass. The cost is accepted: a file knows
//! its descendants but never its siblings or ancestors.
//!
//! ## Tera Over Compile-Time HTML
//!
//! Templates are user content living next to the pages they wrap, so they
//! must be parsed at runtime; a compile-time HTML macro cannot express
//! them. [Tera](https://keats.github.io/tera/) renders both directory
//! templates and `.tera` content bodies. Autoescaping is disabled because
//! rendered bodies are already HTML by the time they reach a template's
//! `content` slot.
//!
//! ## Fail Fast, No Rollback
//!
//! The first render error aborts the whole build with the offending source
//! path. Files already written stay on disk — output is cheap to
//! regenerate and half-finished output plus a precise error beats a
//! cleanup pass that can itself fail. `--erase` gives a clean slate when
//! it matters.
//!
//! ## The Filesystem Is the Only Input
//!
//! No database, no content API, no required config. Naming carries all
//! classification: a leading underscore ignores an entry, the configured
//! template filename marks a template, the configured asset name marks a
//! directory as opaque bytes. A site is fully described by a directory you
//! can tar up.

pub mod config;
pub mod generate;
pub mod metadata;
pub mod output;
pub mod render;
pub mod scan;

#[cfg(test)]
pub(crate) mod test_helpers;
