//! Shared test utilities for the simple-blog test suite.
//!
//! Provides fixture setup, post-directory builders, registry item builders,
//! and lookups that panic with a readable message on a miss.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let tmp = setup_fixtures();
//! let scanned = scan(&tmp.path().join("posts")).unwrap();
//! let post = find_scanned(&scanned, "first-post");
//! assert_eq!(post.identity.to_string(), FIXTURE_FIRST_POST_ID);
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

use crate::registry::Registry;
use crate::scan::ScannedDir;
use crate::types::{ContentKind, Identity, Item};

/// Identity shipped in `fixtures/posts/first-post/post-uuid.txt`.
pub const FIXTURE_FIRST_POST_ID: &str = "5b0e2c7a-9d41-4f3e-8a6b-1c2d3e4f5a6b";

// =========================================================================
// Fixture setup
// =========================================================================

/// Copy `fixtures/` to a temp directory and return it.
///
/// Tests get an isolated copy they can mutate without affecting other tests
/// or the source fixtures.
pub fn setup_fixtures() -> TempDir {
    let tmp = TempDir::new().unwrap();
    let fixtures = Path::new(env!("CARGO_MANIFEST_DIR")).join("fixtures");
    copy_dir_recursive(&fixtures, tmp.path()).unwrap();
    tmp
}

fn copy_dir_recursive(src: &Path, dst: &Path) -> std::io::Result<()> {
    for entry in fs::read_dir(src)? {
        let entry = entry?;
        let src_path = entry.path();
        let dst_path = dst.join(entry.file_name());

        if src_path.is_dir() {
            fs::create_dir_all(&dst_path)?;
            copy_dir_recursive(&src_path, &dst_path)?;
        } else {
            fs::copy(&src_path, &dst_path)?;
        }
    }
    Ok(())
}

// =========================================================================
// Post directory builders
// =========================================================================

/// Create `root/name/index.md` with `body`. Returns the post directory.
pub fn write_markdown_post(root: &Path, name: &str, body: &str) -> PathBuf {
    let dir = root.join(name);
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join("index.md"), body).unwrap();
    dir
}

/// Create `root/name/index.html`. Returns the post directory.
pub fn write_html_post(root: &Path, name: &str) -> PathBuf {
    let dir = root.join(name);
    fs::create_dir_all(&dir).unwrap();
    fs::write(
        dir.join("index.html"),
        format!("<!DOCTYPE html><html><body><h1>{name}</h1></body></html>"),
    )
    .unwrap();
    dir
}

// =========================================================================
// Registry item builders
// =========================================================================

/// Item with a fresh identity, named after its directory.
pub fn item(dir: &str, kind: ContentKind) -> Item {
    Item {
        identity: Identity::mint(),
        source_dir: dir.to_string(),
        kind,
        fingerprint: format!("sha256:{dir}"),
        display_name: dir.to_string(),
        publish_date: "2024-01-01T00:00:00Z".parse().unwrap(),
        thumbnail: None,
    }
}

pub fn item_with_thumbnail(dir: &str, kind: ContentKind, thumbnail: &str) -> Item {
    Item {
        thumbnail: Some(thumbnail.to_string()),
        ..item(dir, kind)
    }
}

// =========================================================================
// Lookups and extractors. Lookups panic with a clear message on miss.
// =========================================================================

/// Source directories in registry order.
pub fn source_dirs(registry: &Registry) -> Vec<&str> {
    registry.iter().map(|i| i.source_dir.as_str()).collect()
}

/// Find a scanned post by directory name. Panics if not found.
pub fn find_scanned<'a>(scanned: &'a [ScannedDir], dir: &str) -> &'a ScannedDir {
    scanned
        .iter()
        .find(|s| s.source_dir == dir)
        .unwrap_or_else(|| {
            let dirs: Vec<&str> = scanned.iter().map(|s| s.source_dir.as_str()).collect();
            panic!("scanned dir '{dir}' not found. Available: {dirs:?}")
        })
}

/// Find a registry item by directory name. Panics if not found.
pub fn find_item<'a>(registry: &'a Registry, dir: &str) -> &'a Item {
    registry
        .iter()
        .find(|i| i.source_dir == dir)
        .unwrap_or_else(|| panic!("item '{dir}' not found. Available: {:?}", source_dirs(registry)))
}
