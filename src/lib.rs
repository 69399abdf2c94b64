//! # Simple Blog
//!
//! Keeps an ordered list of blog posts in step with a directory of post
//! folders and publishes them atomically. Your filesystem is the data
//! source: every subdirectory with an `index.html` or `index.md` is a post.
//!
//! # Architecture: Scan, Reconcile, Publish
//!
//! ```text
//! 1. Scan       posts/                     →  ScannedDir list  (kind, identity, fingerprint)
//! 2. Reconcile  ScannedDir + post-list.json →  Registry         (ordering, carried-over metadata)
//! 3. Publish    Registry + posts/           →  public/          (validated, staged, swapped)
//! ```
//!
//! Each stage is usable on its own. Reconciliation is pure once the scan is
//! done, so ordering rules are tested without touching the filesystem.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`scan`] | Stage 1: classifies post directories, reads or mints identities |
//! | [`reconcile`] | Stage 2: merges a scan into the prior registry under an ordering policy |
//! | [`publish`] | Stage 3: validates a registry against disk and swaps in a new output tree |
//! | [`registry`] | The ordered post list, its JSON file, and diffs between versions |
//! | [`identity`] | `post-uuid.txt` markers: read, mint, never rewrite |
//! | [`fingerprint`] | SHA-256 summary of a post directory |
//! | [`render`] | Markdown to HTML page rendering with pulldown-cmark and Maud |
//! | [`admin`] | Locked preview / apply / refresh over a whole site |
//! | [`config`] | `config.toml` loading, validation and merging |
//! | [`types`] | Shared types (`Identity`, `ContentKind`, `Item`) |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## Identity Lives On Disk
//!
//! A post's identity is a UUID written into the post directory itself, not
//! derived from its path. Renaming `drafts-1/` to `hello-world/` is just a
//! rename: the registry entry, with its title and publish date, follows.
//!
//! ## One Atomic Step
//!
//! Only publishing is all-or-nothing. The whole site is built in a staging
//! directory beside the live one and renamed into place, so a render error
//! halfway through never leaves a half-updated site. Saving the registry is a
//! plain overwrite that happens after a successful publish.
//!
//! ## No Global State
//!
//! Config, ordering policy and renderer settings are passed in at
//! construction. The binary installs the `tracing` subscriber; the library
//! only emits events.

pub mod admin;
pub mod config;
pub mod fingerprint;
pub mod identity;
pub mod output;
pub mod publish;
pub mod reconcile;
pub mod registry;
pub mod render;
pub mod scan;
pub mod types;

#[cfg(test)]
pub(crate) mod test_helpers;
