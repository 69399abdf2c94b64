//! Content discovery.
//!
//! Walks the immediate subdirectories of the content root and describes each
//! one that is a post. Nothing here decides display order or user metadata;
//! that is [`reconcile`](crate::reconcile)'s job.
//!
//! ## Directory Structure
//!
//! ```text
//! posts/                           # Content root
//! ├── hello-world/                 # Markdown post
//! │   ├── index.md                 # Rendered to index.html on publish
//! │   ├── post-thumbnail.jpg       # Optional thumbnail
//! │   ├── post-uuid.txt            # Identity marker (written on first scan)
//! │   └── figures/diagram.png      # Copied verbatim
//! ├── demo-page/                   # HTML post
//! │   ├── index.html               # Whole directory copied verbatim
//! │   └── app.js
//! └── drafts/                      # No index file: not a post, left alone
//! ```
//!
//! ## Classification
//!
//! - `index.html` (regular file) → [`ContentKind::Html`]
//! - otherwise `index.md` (regular file) → [`ContentKind::Markdown`]
//! - otherwise [`ContentKind::None`], and the directory is skipped
//!
//! Classification runs before identity resolution, so only posts ever get a
//! marker file written into them.
//!
//! ## Output Order
//!
//! Results are sorted by directory name. This only removes platform
//! enumeration order from the picture; it is not display order.

use crate::fingerprint;
use crate::identity::{self, IdentityError};
use crate::types::{ContentKind, Identity};
use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// Index file marking a static HTML post.
pub const HTML_INDEX: &str = "index.html";
/// Index file marking a markdown post.
pub const MARKDOWN_INDEX: &str = "index.md";

/// Thumbnail filenames, highest priority first.
pub const THUMBNAIL_NAMES: &[&str] = &[
    "post-thumbnail.jpeg",
    "post-thumbnail.jpg",
    "post-thumbnail.png",
    "post-thumbnail.bmp",
];

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("IO error scanning {dir}: {source}")]
    Io {
        dir: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error(transparent)]
    Identity(#[from] IdentityError),
    #[error("Identity {identity} is claimed by both \"{first}\" and \"{second}\" (copied marker file?)")]
    DuplicateIdentity {
        identity: Identity,
        first: String,
        second: String,
    },
}

impl ScanError {
    fn io(dir: &Path) -> impl FnOnce(io::Error) -> ScanError + '_ {
        move |source| ScanError::Io {
            dir: dir.to_path_buf(),
            source,
        }
    }
}

/// Everything the scanner learns about one post directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScannedDir {
    /// Directory name under the content root.
    pub source_dir: String,
    pub identity: Identity,
    pub kind: ContentKind,
    pub fingerprint: String,
    pub thumbnail: Option<String>,
    /// True when the identity marker was written by this scan.
    pub minted: bool,
}

/// Scan the content root.
///
/// A content root that does not exist yet is an empty site, not an error.
/// Two directories holding the same identity abort the scan.
pub fn scan(root: &Path) -> Result<Vec<ScannedDir>, ScanError> {
    let mut results: Vec<ScannedDir> = Vec::new();
    let mut seen: HashMap<Identity, usize> = HashMap::new();
    for dir in collect_subdirs(root)? {
        let Some(scanned) = scan_post_dir(&dir)? else {
            continue;
        };
        if let Some(&idx) = seen.get(&scanned.identity) {
            return Err(ScanError::DuplicateIdentity {
                identity: scanned.identity,
                first: results[idx].source_dir.clone(),
                second: scanned.source_dir,
            });
        }
        seen.insert(scanned.identity, results.len());
        results.push(scanned);
    }
    debug!(root = %root.display(), posts = results.len(), "scan complete");
    Ok(results)
}

/// Scan a single directory. Returns `None` when it is not a post.
pub fn scan_post_dir(dir: &Path) -> Result<Option<ScannedDir>, ScanError> {
    let kind = detect_kind(dir).map_err(ScanError::io(dir))?;
    if !kind.is_publishable() {
        debug!(dir = %dir.display(), "skipping directory without index file");
        return Ok(None);
    }

    let (identity, minted) = identity::ensure(dir)?;
    let fingerprint = fingerprint::fingerprint_dir(dir).map_err(ScanError::io(dir))?;
    let thumbnail = find_thumbnail(dir).map_err(ScanError::io(dir))?;

    Ok(Some(ScannedDir {
        source_dir: dir_name(dir),
        identity,
        kind,
        fingerprint,
        thumbnail,
        minted,
    }))
}

/// Decide a directory's kind from its index file.
pub fn detect_kind(dir: &Path) -> io::Result<ContentKind> {
    if is_regular_file(&dir.join(HTML_INDEX))? {
        Ok(ContentKind::Html)
    } else if is_regular_file(&dir.join(MARKDOWN_INDEX))? {
        Ok(ContentKind::Markdown)
    } else {
        Ok(ContentKind::None)
    }
}

/// First reserved thumbnail filename present as a regular file.
pub fn find_thumbnail(dir: &Path) -> io::Result<Option<String>> {
    for name in THUMBNAIL_NAMES {
        if is_regular_file(&dir.join(name))? {
            return Ok(Some((*name).to_string()));
        }
    }
    Ok(None)
}

/// Immediate subdirectories of `root`, sorted by name. Symlinks are skipped.
fn collect_subdirs(root: &Path) -> Result<Vec<PathBuf>, ScanError> {
    let read = match fs::read_dir(root) {
        Ok(r) => r,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(ScanError::io(root)(e)),
    };

    let mut dirs = Vec::new();
    for entry in read {
        let entry = entry.map_err(ScanError::io(root))?;
        let file_type = entry.file_type().map_err(ScanError::io(&entry.path()))?;
        if file_type.is_dir() {
            dirs.push(entry.path());
        }
    }
    dirs.sort();
    Ok(dirs)
}

/// `symlink_metadata`-based check: a symlink to a file does not count.
fn is_regular_file(path: &Path) -> io::Result<bool> {
    match fs::symlink_metadata(path) {
        Ok(meta) => Ok(meta.is_file()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e),
    }
}

fn dir_name(dir: &Path) -> String {
    dir.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::{MARKER_FILENAME, marker_path};
    use crate::test_helpers::*;
    use tempfile::TempDir;

    // =========================================================================
    // Classification
    // =========================================================================

    #[test]
    fn html_index_is_html_kind() {
        let tmp = TempDir::new().unwrap();
        write_html_post(tmp.path(), "b");
        assert_eq!(detect_kind(&tmp.path().join("b")).unwrap(), ContentKind::Html);
    }

    #[test]
    fn markdown_index_is_markdown_kind() {
        let tmp = TempDir::new().unwrap();
        write_markdown_post(tmp.path(), "a", "# A");
        assert_eq!(
            detect_kind(&tmp.path().join("a")).unwrap(),
            ContentKind::Markdown
        );
    }

    #[test]
    fn html_wins_when_both_index_files_exist() {
        let tmp = TempDir::new().unwrap();
        let dir = write_markdown_post(tmp.path(), "both", "# Both");
        fs::write(dir.join(HTML_INDEX), "<p>hi</p>").unwrap();
        assert_eq!(detect_kind(&dir).unwrap(), ContentKind::Html);
    }

    #[test]
    fn index_directory_does_not_count() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("odd");
        fs::create_dir_all(dir.join("index.md")).unwrap();
        assert_eq!(detect_kind(&dir).unwrap(), ContentKind::None);
    }

    // =========================================================================
    // Thumbnails
    // =========================================================================

    #[test]
    fn thumbnail_absent() {
        let tmp = TempDir::new().unwrap();
        let dir = write_markdown_post(tmp.path(), "a", "# A");
        assert_eq!(find_thumbnail(&dir).unwrap(), None);
    }

    #[test]
    fn thumbnail_priority_order() {
        let tmp = TempDir::new().unwrap();
        let dir = write_markdown_post(tmp.path(), "a", "# A");
        fs::write(dir.join("post-thumbnail.bmp"), "bmp").unwrap();
        fs::write(dir.join("post-thumbnail.jpg"), "jpg").unwrap();
        assert_eq!(
            find_thumbnail(&dir).unwrap().as_deref(),
            Some("post-thumbnail.jpg")
        );

        fs::write(dir.join("post-thumbnail.jpeg"), "jpeg").unwrap();
        assert_eq!(
            find_thumbnail(&dir).unwrap().as_deref(),
            Some("post-thumbnail.jpeg")
        );
    }

    #[test]
    fn thumbnail_must_be_regular_file() {
        let tmp = TempDir::new().unwrap();
        let dir = write_markdown_post(tmp.path(), "a", "# A");
        fs::create_dir(dir.join("post-thumbnail.jpeg")).unwrap();
        fs::write(dir.join("post-thumbnail.png"), "png").unwrap();
        assert_eq!(
            find_thumbnail(&dir).unwrap().as_deref(),
            Some("post-thumbnail.png")
        );
    }

    // =========================================================================
    // scan
    // =========================================================================

    #[test]
    fn missing_root_is_empty_scan() {
        let tmp = TempDir::new().unwrap();
        assert!(scan(&tmp.path().join("posts")).unwrap().is_empty());
    }

    #[test]
    fn scan_finds_posts_sorted_by_name() {
        let tmp = TempDir::new().unwrap();
        write_html_post(tmp.path(), "zeta");
        write_markdown_post(tmp.path(), "alpha", "# Alpha");
        write_markdown_post(tmp.path(), "mid", "# Mid");

        let dirs: Vec<String> = scan(tmp.path())
            .unwrap()
            .into_iter()
            .map(|s| s.source_dir)
            .collect();
        assert_eq!(dirs, vec!["alpha", "mid", "zeta"]);
    }

    #[test]
    fn non_post_directories_are_skipped_and_left_untouched() {
        let tmp = TempDir::new().unwrap();
        write_markdown_post(tmp.path(), "a", "# A");
        let drafts = tmp.path().join("drafts");
        fs::create_dir_all(&drafts).unwrap();
        fs::write(drafts.join("notes.txt"), "wip").unwrap();
        fs::write(tmp.path().join("README.md"), "not a dir").unwrap();

        let scanned = scan(tmp.path()).unwrap();
        assert_eq!(scanned.len(), 1);
        assert!(!marker_path(&drafts).exists());
    }

    #[test]
    fn first_scan_mints_second_scan_reads() {
        let tmp = TempDir::new().unwrap();
        let dir = write_markdown_post(tmp.path(), "a", "# A");

        let first = scan(tmp.path()).unwrap();
        assert!(first[0].minted);
        let marker_before = fs::read(dir.join(MARKER_FILENAME)).unwrap();

        let second = scan(tmp.path()).unwrap();
        assert!(!second[0].minted);
        assert_eq!(first[0].identity, second[0].identity);
        assert_eq!(fs::read(dir.join(MARKER_FILENAME)).unwrap(), marker_before);
    }

    #[test]
    fn fingerprint_stable_after_marker_written() {
        let tmp = TempDir::new().unwrap();
        write_markdown_post(tmp.path(), "a", "# A");

        let first = scan(tmp.path()).unwrap();
        let second = scan(tmp.path()).unwrap();
        assert_eq!(first[0].fingerprint, second[0].fingerprint);
    }

    #[test]
    fn scan_reports_thumbnail() {
        let tmp = TempDir::new().unwrap();
        let dir = write_html_post(tmp.path(), "b");
        fs::write(dir.join("post-thumbnail.png"), "png").unwrap();

        let scanned = scan(tmp.path()).unwrap();
        assert_eq!(scanned[0].thumbnail.as_deref(), Some("post-thumbnail.png"));
    }

    #[test]
    fn malformed_marker_aborts_scan() {
        let tmp = TempDir::new().unwrap();
        write_markdown_post(tmp.path(), "a", "# A");
        let bad = write_markdown_post(tmp.path(), "b", "# B");
        fs::write(bad.join(MARKER_FILENAME), "nope").unwrap();

        match scan(tmp.path()).unwrap_err() {
            ScanError::Identity(IdentityError::Malformed { path, .. }) => {
                assert!(path.ends_with("b/post-uuid.txt"));
            }
            other => panic!("expected malformed marker, got {other:?}"),
        }
    }

    #[test]
    fn copied_marker_aborts_scan() {
        let tmp = TempDir::new().unwrap();
        let a = write_markdown_post(tmp.path(), "a", "# A");
        scan(tmp.path()).unwrap();
        let copy = write_markdown_post(tmp.path(), "a-copy", "# A");
        fs::copy(a.join(MARKER_FILENAME), copy.join(MARKER_FILENAME)).unwrap();

        match scan(tmp.path()).unwrap_err() {
            ScanError::DuplicateIdentity { first, second, .. } => {
                assert_eq!((first.as_str(), second.as_str()), ("a", "a-copy"));
            }
            other => panic!("expected duplicate identity, got {other:?}"),
        }
    }

    #[test]
    fn fixture_posts_scan() {
        let tmp = setup_fixtures();
        let scanned = scan(&tmp.path().join("posts")).unwrap();

        let dirs: Vec<&str> = scanned.iter().map(|s| s.source_dir.as_str()).collect();
        assert_eq!(dirs, vec!["first-post", "pixel-demo"]);

        let first = find_scanned(&scanned, "first-post");
        assert_eq!(first.kind, ContentKind::Markdown);
        assert_eq!(first.thumbnail.as_deref(), Some("post-thumbnail.png"));
        // The fixture ships its own marker.
        assert!(!first.minted);
        assert_eq!(first.identity.to_string(), FIXTURE_FIRST_POST_ID);

        let demo = find_scanned(&scanned, "pixel-demo");
        assert_eq!(demo.kind, ContentKind::Html);
        assert!(demo.minted);
    }
}
