//! Format renderers and the registry that dispatches to them.
//!
//! Every content format implements the [`Renderer`] trait: one capability,
//! `(file, raw text, builtins, inherited metadata, optional template)` →
//! `(final text, resolved metadata)`. The [`RendererRegistry`] keys
//! renderers by extension; adding a format is one `register` call.
//!
//! ## Shipped renderers
//!
//! | Extension | Renderer | Template | Body transform |
//! |-----------|----------|----------|----------------|
//! | `md` | Markdown | required | pulldown-cmark → HTML |
//! | `yml`, `yaml` | YAML | required | none (metadata only) |
//! | `tera` | Tera | optional | body rendered as a template |
//! | `html` | HTML | ignored | none (pass-through) |
//!
//! ## Merge order
//!
//! Renderers resolve metadata and template context in a fixed order:
//!
//! 1. `resolved = frontmatter ∪ builtins` — builtins win.
//! 2. template context = `inherited ∪ resolved` — the file's own keys win
//!    over directory-aggregated keys.
//! 3. Markdown and Tera bind the transformed body to `content` last.
//!
//! The resolved metadata from step 1 (never the template context) is what
//! flows upward into the directory namespace.
//!
//! ## Templates
//!
//! [`CompiledTemplate`] wraps a tera instance holding exactly one parsed
//! template. Autoescaping is off: by the time text reaches a `content`
//! slot it is already HTML.

use crate::generate::GenerateError;
use crate::metadata::{self, Metadata};
use crate::scan::FileNode;
use pulldown_cmark::{Parser, html as md_html};
use serde_json::Value;
use std::collections::BTreeMap;
use std::error::Error as _;
use tera::{Context, Tera};

/// Internal name of the single template held by a [`CompiledTemplate`].
const TEMPLATE_NAME: &str = "directory_template";

/// Output of one render: the text to write and the file's resolved
/// metadata (frontmatter overridden by builtins).
#[derive(Debug)]
pub struct Rendered {
    pub content: String,
    pub metadata: Metadata,
}

/// A format renderer. Implementations are stateless and shared across
/// worker threads.
pub trait Renderer: Send + Sync {
    /// Display label used in scan output ("Markdown", "YAML", ...).
    fn description(&self) -> &'static str;

    /// Render one file.
    fn render(
        &self,
        file: &FileNode,
        raw: &str,
        builtins: &Metadata,
        inherited: &Metadata,
        template: Option<&CompiledTemplate>,
    ) -> Result<Rendered, GenerateError>;
}

/// A directory template compiled once and rendered per file.
pub struct CompiledTemplate {
    tera: Tera,
}

impl CompiledTemplate {
    pub fn compile(text: &str) -> Result<CompiledTemplate, tera::Error> {
        let mut tera = Tera::default();
        tera.autoescape_on(vec![]);
        tera.add_raw_template(TEMPLATE_NAME, text)?;
        Ok(CompiledTemplate { tera })
    }

    pub fn render(&self, context: &Metadata) -> Result<String, tera::Error> {
        let context = Context::from_serialize(context)?;
        self.tera.render(TEMPLATE_NAME, &context)
    }
}

/// Flatten a tera error and its cause chain into one message. Tera's
/// top-level Display often says only "failed to render"; the chain holds
/// the variable or syntax detail worth surfacing.
pub(crate) fn template_error_message(err: &tera::Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

// =============================================================================
// Renderers
// =============================================================================

/// Markdown with optional YAML frontmatter. The body becomes HTML bound to
/// the template's `content` key; a directory template is mandatory since
/// bare article HTML is rarely a page.
pub struct MarkdownRenderer;

impl Renderer for MarkdownRenderer {
    fn description(&self) -> &'static str {
        "Markdown"
    }

    fn render(
        &self,
        file: &FileNode,
        raw: &str,
        builtins: &Metadata,
        inherited: &Metadata,
        template: Option<&CompiledTemplate>,
    ) -> Result<Rendered, GenerateError> {
        let Some(template) = template else {
            return Err(GenerateError::generation(
                &file.path,
                "no template provided for markdown file",
            ));
        };

        let (own, body) = metadata::parse_frontmatter(raw)
            .map_err(|err| GenerateError::generation(&file.path, err))?;
        let resolved = metadata::merge(&own, builtins);

        let mut body_html = String::new();
        md_html::push_html(&mut body_html, Parser::new(body));

        let mut context = metadata::merge(inherited, &resolved);
        context.insert("content".into(), Value::String(body_html));

        let content = template
            .render(&context)
            .map_err(|err| GenerateError::generation(&file.path, template_error_message(&err)))?;

        Ok(Rendered {
            content,
            metadata: resolved,
        })
    }
}

/// Pure-metadata files: the whole file is one YAML mapping, rendered
/// through a mandatory template with no `content` key.
pub struct YamlRenderer;

impl Renderer for YamlRenderer {
    fn description(&self) -> &'static str {
        "YAML"
    }

    fn render(
        &self,
        file: &FileNode,
        raw: &str,
        builtins: &Metadata,
        inherited: &Metadata,
        template: Option<&CompiledTemplate>,
    ) -> Result<Rendered, GenerateError> {
        let Some(template) = template else {
            return Err(GenerateError::generation(
                &file.path,
                "no template provided for yaml file",
            ));
        };

        // A surrounding fence is tolerated; anything after it is ignored
        let block = match metadata::split_frontmatter(raw) {
            Some((block, _)) => block,
            None => raw,
        };
        if block.trim().is_empty() {
            return Err(GenerateError::generation(
                &file.path,
                "no metadata found in file",
            ));
        }

        let own = metadata::parse_block(block)
            .map_err(|err| GenerateError::generation(&file.path, err))?;
        let resolved = metadata::merge(&own, builtins);

        let context = metadata::merge(inherited, &resolved);
        let content = template
            .render(&context)
            .map_err(|err| GenerateError::generation(&file.path, template_error_message(&err)))?;

        Ok(Rendered {
            content,
            metadata: resolved,
        })
    }
}

/// Tera content files. The body is itself a template, rendered against the
/// inherited and resolved metadata; a directory template, when present,
/// wraps the result via `content`. Templateless output is permitted.
pub struct TeraRenderer;

impl Renderer for TeraRenderer {
    fn description(&self) -> &'static str {
        "Tera"
    }

    fn render(
        &self,
        file: &FileNode,
        raw: &str,
        builtins: &Metadata,
        inherited: &Metadata,
        template: Option<&CompiledTemplate>,
    ) -> Result<Rendered, GenerateError> {
        let (own, body) = metadata::parse_frontmatter(raw)
            .map_err(|err| GenerateError::generation(&file.path, err))?;
        let resolved = metadata::merge(&own, builtins);

        let context = metadata::merge(inherited, &resolved);
        let tera_context = Context::from_serialize(&context)
            .map_err(|err| GenerateError::generation(&file.path, template_error_message(&err)))?;
        let rendered_body = Tera::one_off(body, &tera_context, false)
            .map_err(|err| GenerateError::generation(&file.path, template_error_message(&err)))?;

        let content = match template {
            Some(template) => {
                let mut context = context;
                context.insert("content".into(), Value::String(rendered_body));
                template.render(&context).map_err(|err| {
                    GenerateError::generation(&file.path, template_error_message(&err))
                })?
            }
            None => rendered_body,
        };

        Ok(Rendered {
            content,
            metadata: resolved,
        })
    }
}

/// Pass-through: bytes in, bytes out, builtins as metadata.
pub struct HtmlRenderer;

impl Renderer for HtmlRenderer {
    fn description(&self) -> &'static str {
        "HTML"
    }

    fn render(
        &self,
        _file: &FileNode,
        raw: &str,
        builtins: &Metadata,
        _inherited: &Metadata,
        _template: Option<&CompiledTemplate>,
    ) -> Result<Rendered, GenerateError> {
        Ok(Rendered {
            content: raw.to_string(),
            metadata: builtins.clone(),
        })
    }
}

// =============================================================================
// Registry
// =============================================================================

/// Format-string → renderer dispatch table.
pub struct RendererRegistry {
    renderers: BTreeMap<String, Box<dyn Renderer>>,
}

impl RendererRegistry {
    /// An empty registry. Most callers want [`RendererRegistry::with_defaults`].
    pub fn new() -> Self {
        RendererRegistry {
            renderers: BTreeMap::new(),
        }
    }

    /// The stock set: md, yml, yaml, tera, html.
    pub fn with_defaults() -> Self {
        let mut registry = RendererRegistry::new();
        registry.register("md", Box::new(MarkdownRenderer));
        registry.register("yml", Box::new(YamlRenderer));
        registry.register("yaml", Box::new(YamlRenderer));
        registry.register("tera", Box::new(TeraRenderer));
        registry.register("html", Box::new(HtmlRenderer));
        registry
    }

    pub fn register(&mut self, format: impl Into<String>, renderer: Box<dyn Renderer>) {
        self.renderers.insert(format.into(), renderer);
    }

    pub fn get(&self, format: &str) -> Option<&dyn Renderer> {
        self.renderers.get(format).map(|r| r.as_ref())
    }
}

impl Default for RendererRegistry {
    fn default() -> Self {
        RendererRegistry::with_defaults()
    }
}
