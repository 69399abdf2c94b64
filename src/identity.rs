//! Per-directory identity markers.
//!
//! Every post directory carries a small text file, [`MARKER_FILENAME`],
//! holding the post's [`Identity`]. The marker is what lets a post keep its
//! name and publish date when the directory is renamed or its contents are
//! rewritten: the registry is keyed by the marker, never by the path.
//!
//! Markers are write-once. [`ensure`] creates one with exclusive-create
//! semantics, so an existing marker is never overwritten, and a marker that
//! cannot be parsed is an error rather than a reason to mint a new identity:
//! re-minting would silently detach the post from its registry entry.

use crate::types::Identity;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

/// Reserved filename of the identity marker inside each post directory.
pub const MARKER_FILENAME: &str = "post-uuid.txt";

#[derive(Error, Debug)]
pub enum IdentityError {
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Malformed identity marker {path}: {reason}")]
    Malformed { path: PathBuf, reason: String },
}

/// Path of the marker file for a post directory.
pub fn marker_path(post_dir: &Path) -> PathBuf {
    post_dir.join(MARKER_FILENAME)
}

/// Read the identity recorded in `post_dir`, if any.
///
/// Returns `Ok(None)` when there is no marker. A marker path that exists but
/// is not a regular file, or whose content is not a UUID, is
/// [`IdentityError::Malformed`].
pub fn read(post_dir: &Path) -> Result<Option<Identity>, IdentityError> {
    let path = marker_path(post_dir);
    let meta = match fs::symlink_metadata(&path) {
        Ok(m) => m,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(source) => return Err(IdentityError::Io { path, source }),
    };
    if !meta.is_file() {
        return Err(IdentityError::Malformed {
            path,
            reason: "not a regular file".into(),
        });
    }
    let content = fs::read_to_string(&path).map_err(|source| IdentityError::Io {
        path: path.clone(),
        source,
    })?;
    content
        .parse::<Identity>()
        .map(Some)
        .map_err(|e| IdentityError::Malformed {
            path,
            reason: e.to_string(),
        })
}

/// Read the marker in `post_dir`, minting and persisting a new one if absent.
///
/// The returned identity is always durable: the marker has been written
/// before this returns. Returns the identity and whether it was just minted.
pub fn ensure(post_dir: &Path) -> Result<(Identity, bool), IdentityError> {
    if let Some(existing) = read(post_dir)? {
        return Ok((existing, false));
    }

    let identity = Identity::mint();
    let path = marker_path(post_dir);
    let write = || -> io::Result<()> {
        let mut file = OpenOptions::new().write(true).create_new(true).open(&path)?;
        file.write_all(identity.to_string().as_bytes())?;
        file.sync_all()
    };
    write().map_err(|source| IdentityError::Io {
        path: path.clone(),
        source,
    })?;

    info!(dir = %post_dir.display(), %identity, "minted identity");
    Ok((identity, true))
}
