//! Site configuration module.
//!
//! Handles loading, validating, and merging `config.toml`. Stock defaults are
//! the base layer; the site's `config.toml`, if present, is merged on top, and
//! command-line path flags override both.
//!
//! ## Config File Location
//!
//! ```text
//! site/
//! ├── config.toml          # Optional, overrides stock defaults
//! ├── post-list.json       # Registry (registry_file)
//! ├── posts/               # Content root (content_dir)
//! │   └── ...
//! └── public/              # Live output (output_dir)
//! ```
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! content_dir = "posts"            # Post directories live here
//! output_dir = "public"            # Published site is swapped in here
//! registry_file = "post-list.json" # Ordered post list
//!
//! [ordering]
//! fresh_placement = "before_retained"  # or "after_retained"
//! fresh_sort = "descending"            # or "ascending"
//!
//! [render]
//! lang = "en"
//! stylesheets = ["/public/shared/water.css", "/public/markdown/style.css"]
//! scripts = ["/public/markdown/main.js"]
//! ```
//!
//! Relative paths are resolved against the site root. Unknown keys are
//! rejected to catch typos early.

use crate::reconcile::OrderingPolicy;
use crate::render::RenderSettings;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;

/// Config filename looked up in the site root.
pub const CONFIG_FILENAME: &str = "config.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("TOML serialize error: {0}")]
    TomlSer(#[from] toml::ser::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Site configuration loaded from `config.toml`.
///
/// All fields have defaults. User config files need only specify the values
/// they want to override.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SiteConfig {
    /// Directory holding one subdirectory per post.
    pub content_dir: String,
    /// Live output directory, replaced wholesale on every publish.
    pub output_dir: String,
    /// Registry JSON file.
    pub registry_file: String,
    /// Where and how newly discovered posts are ordered.
    pub ordering: OrderingPolicy,
    /// Page shell for rendered markdown posts.
    pub render: RenderSettings,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            content_dir: "posts".to_string(),
            output_dir: "public".to_string(),
            registry_file: "post-list.json".to_string(),
            ordering: OrderingPolicy::default(),
            render: RenderSettings::default(),
        }
    }
}

impl SiteConfig {
    /// Validate path settings.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (key, value) in [
            ("content_dir", &self.content_dir),
            ("output_dir", &self.output_dir),
            ("registry_file", &self.registry_file),
        ] {
            if value.trim().is_empty() {
                return Err(ConfigError::Validation(format!("{key} must not be empty")));
            }
        }
        let output = Path::new(&self.output_dir);
        check_output_name(output)?;
        check_layout(Path::new(&self.content_dir), output)
    }

    /// Resolve the configured paths against the site root.
    pub fn paths(&self, root: &Path) -> SitePaths {
        SitePaths {
            content_dir: root.join(&self.content_dir),
            output_dir: root.join(&self.output_dir),
            registry_file: root.join(&self.registry_file),
        }
    }
}

/// Absolute (or root-relative) locations of everything a site touches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SitePaths {
    pub content_dir: PathBuf,
    pub output_dir: PathBuf,
    pub registry_file: PathBuf,
}

impl SitePaths {
    /// Replace paths with command-line overrides. Relative overrides resolve
    /// against `root`, the same as values from `config.toml`.
    pub fn with_overrides(
        mut self,
        root: &Path,
        content_dir: Option<&Path>,
        output_dir: Option<&Path>,
        registry_file: Option<&Path>,
    ) -> Self {
        if let Some(p) = content_dir {
            self.content_dir = root.join(p);
        }
        if let Some(p) = output_dir {
            self.output_dir = root.join(p);
        }
        if let Some(p) = registry_file {
            self.registry_file = root.join(p);
        }
        self
    }

    /// Re-check layout after CLI overrides have been applied.
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_output_name(&self.output_dir)?;
        check_layout(
            &std::path::absolute(&self.content_dir)?,
            &std::path::absolute(&self.output_dir)?,
        )
    }
}

/// Publish renames the output directory within its parent, so the path has to
/// name one: `.`, `..` and `/` do not.
fn check_output_name(output: &Path) -> Result<(), ConfigError> {
    match output.components().next_back() {
        Some(Component::Normal(_)) => Ok(()),
        _ => Err(ConfigError::Validation(format!(
            "output_dir must end in a directory name: {}",
            output.display()
        ))),
    }
}

/// The output directory is deleted and replaced on publish, so it and the
/// content directory must not nest either way.
fn check_layout(content: &Path, output: &Path) -> Result<(), ConfigError> {
    let content = normalize(content);
    let output = normalize(output);
    if content == output {
        return Err(ConfigError::Validation(
            "content_dir and output_dir must be different".into(),
        ));
    }
    if output.starts_with(&content) {
        return Err(ConfigError::Validation(
            "output_dir must not be inside content_dir".into(),
        ));
    }
    if content.starts_with(&output) {
        return Err(ConfigError::Validation(
            "content_dir must not be inside output_dir".into(),
        ));
    }
    Ok(())
}

/// Lexical cleanup so `./posts`, `posts/.` and `x/../posts` compare equal.
/// A leading `..` is kept.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for c in path.components() {
        match c {
            Component::CurDir => {}
            Component::ParentDir
                if matches!(out.components().next_back(), Some(Component::Normal(_))) =>
            {
                out.pop();
            }
            other => out.push(other),
        }
    }
    out
}

/// Returns the stock default config as a `toml::Value::Table`.
///
/// This is the base layer for merging user overrides on top.
pub fn stock_defaults_value() -> Result<toml::Value, ConfigError> {
    Ok(toml::Value::try_from(SiteConfig::default())?)
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

/// Load `config.toml` from a directory as a raw TOML value.
///
/// Returns `Ok(None)` if the directory has no `config.toml`.
/// Returns `Err` if the file exists but contains invalid TOML.
pub fn load_raw_config(dir: &Path) -> Result<Option<toml::Value>, ConfigError> {
    let config_path = dir.join(CONFIG_FILENAME);
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

/// Load config from `config.toml` in the site root.
///
/// Merges user values on top of stock defaults, rejects unknown keys,
/// and validates the result.
pub fn load_config(root: &Path) -> Result<SiteConfig, ConfigError> {
    let base = stock_defaults_value()?;
    let overlay = load_raw_config(root)?;
    resolve_config(base, overlay)
}

/// Returns a fully-commented stock `config.toml` with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# Simple Blog Configuration
# =========================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults.
#
# Place this file at the site root. Relative paths are resolved against
# that root. Unknown keys will cause an error.

# Directory holding one subdirectory per post. A subdirectory is a post when
# it contains index.html (copied verbatim) or index.md (rendered).
content_dir = "posts"

# Live output directory. Replaced as a whole on every publish, so it must not
# be inside content_dir.
output_dir = "public"

# Ordered list of posts, edited by the admin front end.
registry_file = "post-list.json"

# ---------------------------------------------------------------------------
# Ordering of newly discovered posts
# ---------------------------------------------------------------------------
[ordering]
# "before_retained" puts new posts at the top of the list, "after_retained"
# at the bottom. Posts already in the registry keep their order.
fresh_placement = "before_retained"

# Order among new posts, by directory name: "descending" or "ascending".
fresh_sort = "descending"

# ---------------------------------------------------------------------------
# Markdown page shell
# ---------------------------------------------------------------------------
[render]
lang = "en"
stylesheets = ["/public/shared/water.css", "/public/markdown/style.css"]
scripts = ["/public/markdown/main.js"]
"##
}
