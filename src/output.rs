//! CLI output formatting.
//!
//! # Information-First Display
//!
//! Every post is shown by its position and display name first, with the
//! directory and other details as indented context lines:
//!
//! 1. **Header line**: positional index + display name + kind
//! 2. **Context lines**: indented `Source:`, `Published:`, `Thumbnail:`, etc.
//!
//! # Output Format
//!
//! ## Scan
//!
//! ```text
//! Posts
//! 001 first-post [Markdown]
//!     Identity: 5b0e…
//!     Thumbnail: post-thumbnail.png
//! 002 pixel-demo [HTML]
//!     Identity: 9c41… (new)
//!
//! Found 2 posts
//! ```
//!
//! ## Preview
//!
//! ```text
//! + 001 pixel-demo [HTML]
//!       Source: pixel-demo/
//!   002 My First Post [Markdown]
//!       Source: first-post/
//! ~ 003 Renamed Dir [HTML]
//!       Source: new-name/
//!
//! Removed
//! - Old Post (old-post/)
//!
//! 1 new, 2 retained, 1 removed
//! ```
//!
//! ## Publish
//!
//! ```text
//! 001 pixel-demo → public/pixel-demo/
//! 002 My First Post → public/first-post/
//!
//! Published 2 posts to public/
//! ```
//!
//! # Architecture
//!
//! Each command has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format
//! functions are pure: no I/O, no side effects.

use crate::admin::Preview;
use crate::registry::{Registry, RegistryDiff};
use crate::scan::ScannedDir;
use crate::types::{ContentKind, Item};
use std::path::Path;

// ============================================================================
// Shared entity display helpers
// ============================================================================

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

fn entity_header(index: usize, title: &str, kind: ContentKind) -> String {
    format!("{} {} [{}]", format_index(index), title, kind)
}

fn plural(n: usize, word: &str) -> String {
    if n == 1 {
        format!("{} {}", n, word)
    } else {
        format!("{} {}s", n, word)
    }
}

/// Context lines shared by registry and preview listings.
fn item_context(item: &Item, prefix: &str) -> Vec<String> {
    let mut lines = vec![
        format!("{}Source: {}/", prefix, item.source_dir),
        format!(
            "{}Published: {}",
            prefix,
            item.publish_date.format("%Y-%m-%d %H:%M UTC")
        ),
    ];
    if let Some(thumb) = &item.thumbnail {
        lines.push(format!("{}Thumbnail: {}", prefix, thumb));
    }
    lines
}

// ============================================================================
// Scan
// ============================================================================

/// Format scan results: every post directory found, in directory-name order.
pub fn format_scan_output(scanned: &[ScannedDir]) -> Vec<String> {
    let mut lines = vec!["Posts".to_string()];
    for (i, dir) in scanned.iter().enumerate() {
        lines.push(entity_header(i + 1, &dir.source_dir, dir.kind));
        let new_marker = if dir.minted { " (new)" } else { "" };
        lines.push(format!("{}Identity: {}{}", indent(1), dir.identity, new_marker));
        if let Some(thumb) = &dir.thumbnail {
            lines.push(format!("{}Thumbnail: {}", indent(1), thumb));
        }
    }
    lines.push(String::new());
    lines.push(format!("Found {}", plural(scanned.len(), "post")));
    lines
}

pub fn print_scan_output(scanned: &[ScannedDir]) {
    for line in format_scan_output(scanned) {
        println!("{}", line);
    }
}

// ============================================================================
// Preview
// ============================================================================

/// Format a preview: the reconciled registry with per-item change markers,
/// then anything that would be dropped.
///
/// Markers: `+` new, `~` changed, blank unchanged, `-` removed.
pub fn format_preview(preview: &Preview) -> Vec<String> {
    let next = &preview.reconciled.registry;
    let diff = RegistryDiff::between(&preview.previous, next);
    let mut lines = Vec::new();

    for (i, item) in next.iter().enumerate() {
        let marker = if diff.added.contains(&item.identity) {
            '+'
        } else if diff.changed.contains(&item.identity) {
            '~'
        } else {
            ' '
        };
        lines.push(format!(
            "{} {}",
            marker,
            entity_header(i + 1, &item.display_name, item.kind)
        ));
        lines.extend(item_context(item, "      "));
    }

    if !diff.removed.is_empty() {
        lines.push(String::new());
        lines.push("Removed".to_string());
        for id in &diff.removed {
            if let Some(item) = preview.previous.get(id) {
                lines.push(format!("- {} ({}/)", item.display_name, item.source_dir));
            }
        }
    }

    lines.push(String::new());
    let mut summary = format!(
        "{} new, {} retained, {} removed",
        preview.reconciled.fresh, preview.reconciled.retained, preview.reconciled.dropped
    );
    if diff.is_empty() {
        summary.push_str(" (no changes)");
    } else if diff.reordered {
        summary.push_str(" (order changed)");
    }
    lines.push(summary);
    lines
}

pub fn print_preview(preview: &Preview) {
    for line in format_preview(preview) {
        println!("{}", line);
    }
}

// ============================================================================
// Registry / publish
// ============================================================================

/// Format a registry listing in display order.
pub fn format_registry(registry: &Registry) -> Vec<String> {
    let mut lines = Vec::new();
    for (i, item) in registry.iter().enumerate() {
        lines.push(entity_header(i + 1, &item.display_name, item.kind));
        lines.extend(item_context(item, &indent(1)));
    }
    lines
}

/// Format the result of a publish: where each post landed.
pub fn format_publish_output(registry: &Registry, output_dir: &Path) -> Vec<String> {
    let out = output_dir.display();
    let mut lines = Vec::new();
    for (i, item) in registry.iter().enumerate() {
        lines.push(format!(
            "{} {} → {}/{}/",
            format_index(i + 1),
            item.display_name,
            out,
            item.source_dir
        ));
    }
    lines.push(String::new());
    lines.push(format!(
        "Published {} to {}/",
        plural(registry.len(), "post"),
        out
    ));
    lines
}

pub fn print_publish_output(registry: &Registry, output_dir: &Path) {
    for line in format_publish_output(registry, output_dir) {
        println!("{}", line);
    }
}
