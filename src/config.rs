//! Site configuration.
//!
//! Two layers with one direction of flow:
//!
//! - [`SiteConfig`] is what users write in `_canopy.toml`. Loaded, merged
//!   over stock defaults, and validated here; CLI flags may override
//!   individual values afterwards.
//! - [`GeneratorConfig`] is what the engine consumes. It is built from a
//!   `SiteConfig` plus the build clock and passed into scanning and
//!   generation, which never read files or flags themselves.
//!
//! ## Config File Location
//!
//! The config lives at the root of the source directory:
//!
//! ```text
//! content/
//! ├── _canopy.toml             # Site config (underscore keeps it out of the scan)
//! ├── _template.tera
//! ├── index.tera
//! └── ...
//! ```
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! template = "_template.tera"  # Per-directory template filename
//! assets = "assets"            # Directory name copied verbatim
//! ```
//!
//! Config files are sparse — override just the values you want. Unknown
//! keys are rejected to catch typos early.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Filename looked up in the source root. The leading underscore makes the
/// scanner treat it as an ignored file, so no special-casing is needed.
pub const CONFIG_FILENAME: &str = "_canopy.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("config validation error: {0}")]
    Validation(String),
}

/// Everything the engine needs to know about a build. Plain data, no file
/// access; see [`SiteConfig::into_generator_config`].
#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    /// Timestamp bound to the `now` builtin, fixed for the whole build so
    /// every page agrees on it.
    pub now: DateTime<Utc>,
    /// Exact filename marking a directory's template.
    pub template_filename: String,
    /// Directory name classified as assets.
    pub asset_directory: String,
}

/// Site configuration loaded from `_canopy.toml`.
///
/// All fields have defaults. User config files need only specify the
/// values they want to override. Unknown keys are rejected.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SiteConfig {
    /// Exact filename of per-directory templates.
    pub template: String,
    /// Name of directories whose content is copied verbatim instead of
    /// rendered.
    pub assets: String,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            template: "_template.tera".to_string(),
            assets: "assets".to_string(),
        }
    }
}

impl SiteConfig {
    /// Validate config values.
    ///
    /// `template` and `assets` are matched against single path components
    /// during scanning, so they must be bare names.
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_bare_name("template", &self.template)?;
        validate_bare_name("assets", &self.assets)?;
        Ok(())
    }

    /// Bind this config to a build clock.
    pub fn into_generator_config(self, now: DateTime<Utc>) -> GeneratorConfig {
        GeneratorConfig {
            now,
            template_filename: self.template,
            asset_directory: self.assets,
        }
    }
}

fn validate_bare_name(key: &str, value: &str) -> Result<(), ConfigError> {
    if value.is_empty() {
        return Err(ConfigError::Validation(format!("{key} must not be empty")));
    }
    if value.contains('/') || value.contains('\\') {
        return Err(ConfigError::Validation(format!(
            "{key} must be a bare name, got '{value}'"
        )));
    }
    Ok(())
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
///
/// This is the canonical representation of all default values, used as the
/// base layer for merging user overrides on top.
pub fn stock_defaults_value() -> toml::Value {
    toml::Value::try_from(SiteConfig::default()).expect("default config must serialize")
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

/// Load a `_canopy.toml` from a source directory as a raw TOML value.
///
/// Returns `Ok(None)` if the directory has no config file.
/// Returns `Err` if the file exists but contains invalid TOML.
pub fn load_raw_config(source_dir: &Path) -> Result<Option<toml::Value>, ConfigError> {
    let config_path = source_dir.join(CONFIG_FILENAME);
    if !config_path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(&config_path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge an optional overlay onto a base value, then deserialize and validate.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<SiteConfig, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: SiteConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load the config for a source directory.
///
/// Merges user values from `<source>/_canopy.toml` on top of stock
/// defaults, rejects unknown keys, and validates the result. A missing
/// file yields the stock defaults.
pub fn load_config(source_dir: &Path) -> Result<SiteConfig, ConfigError> {
    let base = stock_defaults_value();
    let overlay = load_raw_config(source_dir)?;
    resolve_config(base, overlay)
}

/// Load a config file at an explicit path (the `--config` flag). Unlike
/// [`load_config`], the file must exist.
pub fn load_config_file(path: &Path) -> Result<SiteConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    let value: toml::Value = toml::from_str(&content)?;
    resolve_config(stock_defaults_value(), Some(value))
}

/// Returns a fully-commented stock `_canopy.toml` with all keys and
/// explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r#"# Canopy Configuration
# ====================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults.
#
# This file lives at the root of the source directory as `_canopy.toml`;
# the leading underscore keeps it out of the content scan.
# Unknown keys will cause an error.

# Exact filename of per-directory templates. A directory's template wraps
# that directory's own files only; it is never inherited by subdirectories.
template = "_template.tera"

# Name of directories copied verbatim into the output instead of rendered.
# Matched at any depth of the source tree.
assets = "assets"
"#
}
