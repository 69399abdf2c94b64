//! Content fingerprints for post directories.
//!
//! A fingerprint summarizes every regular file under a directory: its path
//! relative to the directory and the SHA-256 of its bytes. It is used only to
//! observe drift between the registry and disk, never for identity and never
//! for ordering.
//!
//! ## Format
//!
//! Each file contributes one line `"<sha256-hex>  <relative/path>\n"`, with
//! `/` as the separator on every platform. Lines are sorted by path before
//! the summary hash is taken, so the result does not depend on directory
//! enumeration order. The final value is `"sha256:<hex>"`.
//!
//! Symlinks are not followed and do not contribute.

use sha2::{Digest, Sha256};
use std::io;
use std::path::Path;
use walkdir::WalkDir;

/// Prefix of every fingerprint string. Bump the scheme name if the line
/// format ever changes so old and new fingerprints cannot be confused.
const SCHEME: &str = "sha256";

/// SHA-256 hash of a file's contents, returned as a hex string.
pub fn hash_file(path: &Path) -> io::Result<String> {
    let bytes = std::fs::read(path)?;
    let digest = Sha256::digest(&bytes);
    Ok(format!("{:x}", digest))
}

/// Fingerprint of all regular files beneath `dir`.
pub fn fingerprint_dir(dir: &Path) -> io::Result<String> {
    let mut lines = Vec::new();
    for entry in WalkDir::new(dir).follow_links(false) {
        let entry = entry.map_err(io::Error::from)?;
        if !entry.file_type().is_file() {
            continue;
        }
        let rel = entry
            .path()
            .strip_prefix(dir)
            .map_err(|e| io::Error::other(e.to_string()))?;
        // Raw bytes, so distinct non-UTF-8 names never hash alike.
        let rel = rel
            .components()
            .map(|c| c.as_os_str().as_encoded_bytes())
            .collect::<Vec<_>>()
            .join(&b'/');
        lines.push((rel, hash_file(entry.path())?));
    }
    lines.sort();

    let mut hasher = Sha256::new();
    for (rel, hash) in &lines {
        hasher.update(hash.as_bytes());
        hasher.update(b"  ");
        hasher.update(rel);
        hasher.update(b"\n");
    }
    Ok(format!("{}:{:x}", SCHEME, hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    // =========================================================================
    // hash_file
    // =========================================================================

    #[test]
    fn hash_file_deterministic() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("test.bin");
        fs::write(&path, b"hello world").unwrap();

        let h1 = hash_file(&path).unwrap();
        let h2 = hash_file(&path).unwrap();
        assert_eq!(h1, h2);
        assert_eq!(h1.len(), 64);
    }

    #[test]
    fn hash_file_known_value() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("empty");
        fs::write(&path, b"").unwrap();
        assert_eq!(
            hash_file(&path).unwrap(),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    // =========================================================================
    // fingerprint_dir
    // =========================================================================

    fn make_tree(root: &Path) {
        fs::create_dir_all(root.join("img")).unwrap();
        fs::write(root.join("index.md"), "# Post").unwrap();
        fs::write(root.join("img/a.png"), "png-bytes").unwrap();
    }

    #[test]
    fn fingerprint_has_scheme_prefix() {
        let tmp = TempDir::new().unwrap();
        make_tree(tmp.path());
        let fp = fingerprint_dir(tmp.path()).unwrap();
        assert!(fp.starts_with("sha256:"));
        assert_eq!(fp.len(), "sha256:".len() + 64);
    }

    #[test]
    fn identical_trees_have_identical_fingerprints() {
        let a = TempDir::new().unwrap();
        let b = TempDir::new().unwrap();
        make_tree(a.path());
        // Create in a different order to perturb enumeration order.
        fs::write(b.path().join("index.md"), "# Post").unwrap();
        fs::create_dir_all(b.path().join("img")).unwrap();
        fs::write(b.path().join("img/a.png"), "png-bytes").unwrap();

        assert_eq!(
            fingerprint_dir(a.path()).unwrap(),
            fingerprint_dir(b.path()).unwrap()
        );
    }

    #[test]
    fn content_change_changes_fingerprint() {
        let tmp = TempDir::new().unwrap();
        make_tree(tmp.path());
        let before = fingerprint_dir(tmp.path()).unwrap();

        fs::write(tmp.path().join("img/a.png"), "other-bytes").unwrap();
        assert_ne!(before, fingerprint_dir(tmp.path()).unwrap());
    }

    #[test]
    fn rename_changes_fingerprint() {
        let tmp = TempDir::new().unwrap();
        make_tree(tmp.path());
        let before = fingerprint_dir(tmp.path()).unwrap();

        fs::rename(tmp.path().join("img/a.png"), tmp.path().join("img/b.png")).unwrap();
        assert_ne!(before, fingerprint_dir(tmp.path()).unwrap());
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn non_utf8_names_are_distinguished() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let a = TempDir::new().unwrap();
        let b = TempDir::new().unwrap();
        fs::write(a.path().join(OsStr::from_bytes(b"\xff.txt")), "same").unwrap();
        fs::write(b.path().join(OsStr::from_bytes(b"\xfe.txt")), "same").unwrap();

        assert_ne!(
            fingerprint_dir(a.path()).unwrap(),
            fingerprint_dir(b.path()).unwrap()
        );
    }

    #[test]
    fn empty_directories_do_not_contribute() {
        let tmp = TempDir::new().unwrap();
        make_tree(tmp.path());
        let before = fingerprint_dir(tmp.path()).unwrap();

        fs::create_dir(tmp.path().join("empty")).unwrap();
        assert_eq!(before, fingerprint_dir(tmp.path()).unwrap());
    }

    #[test]
    fn missing_directory_is_error() {
        let tmp = TempDir::new().unwrap();
        assert!(fingerprint_dir(&tmp.path().join("nope")).is_err());
    }
}
