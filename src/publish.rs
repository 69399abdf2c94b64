//! Publishing a registry to the live output directory.
//!
//! Publishing is all-or-nothing. Readers of the output directory see either
//! the previous site or the new one, never a mix.
//!
//! ## Stages
//!
//! 1. **Validate**: every item is checked against disk before anything is
//!    written. The directory must exist, its index file must still give the
//!    recorded kind, and its marker must hold the recorded identity. Markers
//!    are only read here, never minted.
//! 2. **Stage**: a fresh hidden directory is created next to the live output
//!    (same parent, so same filesystem).
//! 3. **Materialize**: one subdirectory per item. HTML posts are copied
//!    verbatim; markdown posts are copied except `index.md`, which goes
//!    through the [`ContentRenderer`] and lands as `index.html`.
//! 4. **Commit**: the live directory is renamed aside, the staging directory
//!    is renamed into its place, and the old tree is removed.
//!
//! Any failure before commit discards the staging directory and leaves the
//! live output untouched. If the process dies between the two commit renames,
//! the previous site survives as `.<name>.previous-<id>` beside the live path.

use crate::fingerprint;
use crate::identity::{self, IdentityError};
use crate::registry::Registry;
use crate::render::{ContentRenderer, RenderError};
use crate::scan::{self, MARKDOWN_INDEX};
use crate::types::{ContentKind, Item};
use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum PublishError {
    #[error("Item {item} does not match disk: {reason}")]
    ConsistencyViolation { item: String, reason: String },
    #[error(transparent)]
    Identity(#[from] IdentityError),
    #[error("Failed to render {item}: {source}")]
    RenderFailure {
        item: String,
        #[source]
        source: RenderError,
    },
    #[error("Unsupported file type (not a file or directory): {path}")]
    UnsupportedEntry { path: PathBuf },
    #[error("Invalid output directory {path}: {reason}")]
    InvalidOutput { path: PathBuf, reason: String },
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

fn io_at(path: &Path) -> impl FnOnce(io::Error) -> PublishError + '_ {
    move |source| PublishError::Io {
        path: path.to_path_buf(),
        source,
    }
}

fn label(item: &Item) -> String {
    format!("\"{}\" ({})", item.source_dir, item.identity)
}

fn violation(item: &Item, reason: impl Into<String>) -> PublishError {
    PublishError::ConsistencyViolation {
        item: label(item),
        reason: reason.into(),
    }
}

/// Renders and swaps a registry into the live output directory.
#[derive(Debug, Clone, Default)]
pub struct PublishPipeline<R> {
    renderer: R,
}

impl<R: ContentRenderer> PublishPipeline<R> {
    pub fn new(renderer: R) -> Self {
        Self { renderer }
    }

    /// Publish `registry` from `content_root` into `output_dir`.
    ///
    /// Returns the registry as published: `fingerprint` and `thumbnail` are
    /// re-read from disk and `source_dir` is the bare directory name.
    pub fn publish(
        &self,
        content_root: &Path,
        registry: &Registry,
        output_dir: &Path,
    ) -> Result<Registry, PublishError> {
        let (parent, name) = split_output(output_dir)?;
        reject_enclosing_output(content_root, output_dir)?;
        let published = validate(content_root, registry)?;
        info!(
            items = published.len(),
            output = %output_dir.display(),
            "publishing"
        );

        fs::create_dir_all(&parent).map_err(io_at(&parent))?;
        let staging = tempfile::Builder::new()
            .prefix(&format!(".{name}.staging-"))
            .tempdir_in(&parent)
            .map_err(io_at(&parent))?;
        make_world_readable(staging.path())?;
        debug!(staging = %staging.path().display(), "staging directory created");

        if let Err(e) = self.materialize_all(content_root, &published, staging.path()) {
            let path = staging.path().to_path_buf();
            if let Err(cleanup) = staging.close() {
                warn!(path = %path.display(), error = %cleanup, "failed to remove staging directory");
            }
            return Err(e);
        }

        commit(&staging.keep(), output_dir, &parent, &name)?;
        info!(items = published.len(), output = %output_dir.display(), "published");
        Ok(published)
    }

    fn materialize_all(
        &self,
        content_root: &Path,
        registry: &Registry,
        staging: &Path,
    ) -> Result<(), PublishError> {
        for item in registry {
            let src = content_root.join(&item.source_dir);
            let dst = staging.join(&item.source_dir);
            self.materialize(item, &src, &dst)?;
            debug!(dir = %item.source_dir, kind = %item.kind, "materialized");
        }
        Ok(())
    }

    fn materialize(&self, item: &Item, src: &Path, dst: &Path) -> Result<(), PublishError> {
        fs::create_dir_all(dst).map_err(io_at(dst))?;
        for entry in WalkDir::new(src).min_depth(1).follow_links(false) {
            let entry = entry.map_err(|e| {
                let path = e.path().unwrap_or(src).to_path_buf();
                PublishError::Io {
                    path,
                    source: e.into(),
                }
            })?;
            let rel = entry.path().strip_prefix(src).map_err(|e| PublishError::Io {
                path: entry.path().to_path_buf(),
                source: io::Error::other(e.to_string()),
            })?;
            let target = dst.join(rel);
            let file_type = entry.file_type();

            if file_type.is_dir() {
                fs::create_dir_all(&target).map_err(io_at(&target))?;
            } else if !file_type.is_file() {
                return Err(PublishError::UnsupportedEntry {
                    path: entry.path().to_path_buf(),
                });
            } else if item.kind == ContentKind::Markdown && rel == Path::new(MARKDOWN_INDEX) {
                let source = fs::read(entry.path()).map_err(io_at(entry.path()))?;
                let page = self
                    .renderer
                    .render(&source)
                    .map_err(|source| PublishError::RenderFailure {
                        item: label(item),
                        source,
                    })?;
                let out = dst.join(scan::HTML_INDEX);
                fs::write(&out, page).map_err(io_at(&out))?;
            } else {
                fs::copy(entry.path(), &target).map_err(io_at(entry.path()))?;
            }
        }
        Ok(())
    }
}

/// Check every item against disk and return the registry as it will be
/// published. Nothing is written.
fn validate(content_root: &Path, registry: &Registry) -> Result<Registry, PublishError> {
    let mut identities = HashSet::new();
    let mut dirs = HashSet::new();
    let mut published = Vec::with_capacity(registry.len());

    for item in registry {
        let dir_name = normalize_source_dir(&item.source_dir)
            .ok_or_else(|| violation(item, "source directory has no final path component"))?;
        if !item.kind.is_publishable() {
            return Err(violation(item, "kind None cannot be published"));
        }
        if !identities.insert(item.identity) {
            return Err(violation(item, "identity appears more than once"));
        }
        if !dirs.insert(dir_name.clone()) {
            return Err(violation(item, "source directory appears more than once"));
        }

        let dir = content_root.join(&dir_name);
        match fs::symlink_metadata(&dir) {
            Ok(meta) if meta.is_dir() => {}
            Ok(_) => return Err(violation(item, "source path is not a directory")),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(violation(item, "source directory is missing"));
            }
            Err(source) => return Err(PublishError::Io { path: dir, source }),
        }

        let kind = scan::detect_kind(&dir).map_err(io_at(&dir))?;
        if kind != item.kind {
            return Err(violation(
                item,
                format!("registry says {} but disk has {}", item.kind, kind),
            ));
        }
        match identity::read(&dir)? {
            None => return Err(violation(item, "identity marker is missing")),
            Some(found) if found != item.identity => {
                return Err(violation(item, format!("marker holds identity {found}")));
            }
            Some(_) => {}
        }

        published.push(Item {
            source_dir: dir_name,
            fingerprint: fingerprint::fingerprint_dir(&dir).map_err(io_at(&dir))?,
            thumbnail: scan::find_thumbnail(&dir).map_err(io_at(&dir))?,
            ..item.clone()
        });
    }
    Ok(Registry::new(published))
}

/// A `source_dir` is reduced to its final path component, so an item can
/// only name a directory directly under the content root. `..`, `/` and the
/// empty string have no final component.
fn normalize_source_dir(raw: &str) -> Option<String> {
    Path::new(raw)
        .file_name()
        .and_then(|name| name.to_str())
        .map(str::to_string)
}

/// Publishing swaps out the whole output tree, so it must not hold the posts.
fn reject_enclosing_output(content_root: &Path, output_dir: &Path) -> Result<(), PublishError> {
    let (Ok(content), Ok(output)) = (
        fs::canonicalize(content_root),
        fs::canonicalize(output_dir),
    ) else {
        return Ok(());
    };
    if content.starts_with(&output) {
        return Err(PublishError::InvalidOutput {
            path: output_dir.to_path_buf(),
            reason: format!("contains the content root {}", content_root.display()),
        });
    }
    Ok(())
}

/// Parent directory and final name of the live output path.
fn split_output(output_dir: &Path) -> Result<(PathBuf, String), PublishError> {
    let invalid = |reason: &str| PublishError::InvalidOutput {
        path: output_dir.to_path_buf(),
        reason: reason.to_string(),
    };
    let name = match output_dir.components().next_back() {
        Some(Component::Normal(name)) => name
            .to_str()
            .ok_or_else(|| invalid("name is not valid UTF-8"))?
            .to_string(),
        _ => return Err(invalid("path must end in a directory name")),
    };
    let parent = output_dir
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."))
        .to_path_buf();

    match fs::symlink_metadata(output_dir) {
        Ok(meta) if !meta.is_dir() => Err(invalid("exists and is not a directory")),
        Ok(_) => Ok((parent, name)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok((parent, name)),
        Err(source) => Err(PublishError::Io {
            path: output_dir.to_path_buf(),
            source,
        }),
    }
}

/// Temporary directories are created owner-only; the published site is not.
fn make_world_readable(dir: &Path) -> Result<(), PublishError> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(dir, fs::Permissions::from_mode(0o755)).map_err(io_at(dir))?;
    }
    #[cfg(not(unix))]
    let _ = dir;
    Ok(())
}

/// Swap the staging tree into place.
fn commit(staging: &Path, live: &Path, parent: &Path, name: &str) -> Result<(), PublishError> {
    let discard_staging = || {
        if let Err(e) = fs::remove_dir_all(staging) {
            warn!(path = %staging.display(), error = %e, "failed to remove staging directory");
        }
    };

    let backup = if live.exists() {
        let backup = parent.join(format!(".{name}.previous-{}", Uuid::new_v4().simple()));
        if let Err(source) = fs::rename(live, &backup) {
            discard_staging();
            return Err(PublishError::Io {
                path: live.to_path_buf(),
                source,
            });
        }
        Some(backup)
    } else {
        None
    };

    if let Err(source) = fs::rename(staging, live) {
        if let Some(backup) = &backup {
            if let Err(e) = fs::rename(backup, live) {
                warn!(
                    backup = %backup.display(),
                    error = %e,
                    "failed to restore previous output; it remains at the backup path"
                );
            }
        }
        discard_staging();
        return Err(PublishError::Io {
            path: live.to_path_buf(),
            source,
        });
    }

    if let Some(backup) = backup {
        if let Err(e) = fs::remove_dir_all(&backup) {
            warn!(path = %backup.display(), error = %e, "failed to remove previous output");
        }
    }
    Ok(())
}
