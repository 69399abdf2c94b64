//! Administrative operations on a whole site.
//!
//! [`Site`] ties paths, config, the reconciler and the publish pipeline
//! together and serializes every operation behind one lock, so a preview
//! never observes a half-applied publish from another thread.
//!
//! - [`Site::preview`]: reconcile disk against the saved registry without
//!   publishing or saving anything. Only identity markers for newly found
//!   posts are written.
//! - [`Site::apply`]: publish a caller-supplied registry, then save it.
//! - [`Site::refresh`]: preview followed by apply of the reconciled registry.

use crate::config::{ConfigError, SiteConfig, SitePaths};
use crate::identity::IdentityError;
use crate::publish::{PublishError, PublishPipeline};
use crate::reconcile::{ReconcileError, Reconciled, Reconciler};
use crate::registry::{Registry, RegistryError};
use crate::render::{ContentRenderer, MarkdownRenderer};
use crate::scan::ScanError;
use chrono::Utc;
use std::fmt;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use thiserror::Error;
use tracing::info;

#[derive(Error, Debug)]
pub enum AdminError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Registry(#[from] RegistryError),
    #[error(transparent)]
    Reconcile(#[from] ReconcileError),
    #[error(transparent)]
    Publish(#[from] PublishError),
}

/// Coarse failure class for front ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// A marker, registry or config file could not be understood.
    MalformedState,
    /// The registry disagrees with disk at publish time.
    ConsistencyViolation,
    Io,
    RenderFailure,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FailureKind::MalformedState => "malformed state",
            FailureKind::ConsistencyViolation => "consistency violation",
            FailureKind::Io => "I/O failure",
            FailureKind::RenderFailure => "render failure",
        };
        f.write_str(s)
    }
}

impl AdminError {
    pub fn kind(&self) -> FailureKind {
        match self {
            AdminError::Config(ConfigError::Io(_)) => FailureKind::Io,
            AdminError::Config(_) => FailureKind::MalformedState,
            AdminError::Registry(RegistryError::Io { .. }) => FailureKind::Io,
            AdminError::Registry(RegistryError::Malformed { .. }) => FailureKind::MalformedState,
            AdminError::Reconcile(ReconcileError::Scan(ScanError::Io { .. })) => FailureKind::Io,
            AdminError::Reconcile(ReconcileError::Scan(ScanError::Identity(e))) => identity_kind(e),
            AdminError::Reconcile(ReconcileError::Scan(ScanError::DuplicateIdentity { .. })) => {
                FailureKind::MalformedState
            }
            AdminError::Publish(e) => match e {
                PublishError::ConsistencyViolation { .. }
                | PublishError::UnsupportedEntry { .. }
                | PublishError::InvalidOutput { .. } => FailureKind::ConsistencyViolation,
                PublishError::Identity(e) => identity_kind(e),
                PublishError::RenderFailure { .. } => FailureKind::RenderFailure,
                PublishError::Io { .. } => FailureKind::Io,
            },
        }
    }
}

fn identity_kind(e: &IdentityError) -> FailureKind {
    match e {
        IdentityError::Io { .. } => FailureKind::Io,
        IdentityError::Malformed { .. } => FailureKind::MalformedState,
    }
}

/// Saved registry next to what a refresh would produce.
#[derive(Debug, Clone)]
pub struct Preview {
    pub previous: Registry,
    pub reconciled: Reconciled,
}

/// One site: its paths, ordering policy and renderer.
pub struct Site<R = MarkdownRenderer> {
    paths: SitePaths,
    reconciler: Reconciler,
    pipeline: PublishPipeline<R>,
    lock: Mutex<()>,
}

impl Site<MarkdownRenderer> {
    /// Site with the stock markdown renderer configured from `config`.
    pub fn from_config(root: &Path, config: &SiteConfig) -> Result<Self, AdminError> {
        let paths = config.paths(root);
        paths.validate()?;
        Ok(Self::new(
            paths,
            Reconciler::new(config.ordering),
            MarkdownRenderer::new(config.render.clone()),
        ))
    }
}

impl<R: ContentRenderer> Site<R> {
    pub fn new(paths: SitePaths, reconciler: Reconciler, renderer: R) -> Self {
        Self {
            paths,
            reconciler,
            pipeline: PublishPipeline::new(renderer),
            lock: Mutex::new(()),
        }
    }

    pub fn paths(&self) -> &SitePaths {
        &self.paths
    }

    // A panic while holding the lock leaves nothing half-updated in memory:
    // all state lives on disk.
    fn lock(&self) -> MutexGuard<'_, ()> {
        self.lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Saved registry and the result of reconciling disk against it.
    pub fn preview(&self) -> Result<Preview, AdminError> {
        let _guard = self.lock();
        self.preview_locked()
    }

    /// Publish `registry`, then save it as the site's registry.
    ///
    /// Returns the registry as saved, with disk-derived fields refreshed.
    /// Nothing is saved if publishing fails.
    pub fn apply(&self, registry: &Registry) -> Result<Registry, AdminError> {
        let _guard = self.lock();
        self.apply_locked(registry)
    }

    /// Reconcile and publish in one step.
    pub fn refresh(&self) -> Result<Registry, AdminError> {
        let _guard = self.lock();
        let preview = self.preview_locked()?;
        self.apply_locked(&preview.reconciled.registry)
    }

    fn preview_locked(&self) -> Result<Preview, AdminError> {
        let previous = Registry::load(&self.paths.registry_file)?;
        let reconciled = self
            .reconciler
            .reconcile(&self.paths.content_dir, &previous, Utc::now())?;
        Ok(Preview {
            previous,
            reconciled,
        })
    }

    fn apply_locked(&self, registry: &Registry) -> Result<Registry, AdminError> {
        let published =
            self.pipeline
                .publish(&self.paths.content_dir, registry, &self.paths.output_dir)?;
        published.save(&self.paths.registry_file)?;
        info!(
            items = published.len(),
            registry = %self.paths.registry_file.display(),
            "registry saved"
        );
        Ok(published)
    }
}
