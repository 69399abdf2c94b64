//! Shared types used across scan, reconcile, and publish.
//!
//! [`Item`] is what the registry file stores. Its JSON shape is fixed by
//! external consumers (the admin front end reads and writes it), so the
//! serialized form goes through [`ItemRecord`], which keeps the
//! `hasThumbnail`/`thumbnail` pair the file has always used while the
//! in-memory type carries a plain `Option`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Stable identity of a content directory.
///
/// Minted once (UUID v4) when a post is first discovered and persisted in the
/// directory's marker file. Never reassigned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Identity(Uuid);

impl Identity {
    /// Mint a fresh random identity.
    pub fn mint() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl From<Uuid> for Identity {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Canonical hyphenated lowercase form, same as the marker file.
        write!(f, "{}", self.0.hyphenated())
    }
}

impl FromStr for Identity {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim()).map(Self)
    }
}

/// What a content directory contains, decided by its index file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ContentKind {
    /// No recognized index file. Never stored in a registry.
    None,
    /// `index.html` present: published as a verbatim copy.
    #[serde(rename = "HTML")]
    Html,
    /// `index.md` present: rendered to `index.html` on publish.
    Markdown,
}

impl ContentKind {
    pub fn is_publishable(self) -> bool {
        !matches!(self, ContentKind::None)
    }
}

impl fmt::Display for ContentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContentKind::None => write!(f, "None"),
            ContentKind::Html => write!(f, "HTML"),
            ContentKind::Markdown => write!(f, "Markdown"),
        }
    }
}

/// A published post.
///
/// `kind`, `source_dir`, `fingerprint` and `thumbnail` always come from disk.
/// `display_name` and `publish_date` are the only fields an administrator
/// edits; reconciliation carries them over untouched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "ItemRecord", try_from = "ItemRecord")]
pub struct Item {
    pub identity: Identity,
    pub source_dir: String,
    pub kind: ContentKind,
    pub fingerprint: String,
    pub display_name: String,
    pub publish_date: DateTime<Utc>,
    pub thumbnail: Option<String>,
}

/// On-disk JSON form of an [`Item`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemRecord {
    pub identity: Identity,
    pub fingerprint: String,
    pub display_name: String,
    pub kind: ContentKind,
    pub publish_date: DateTime<Utc>,
    pub source_dir: String,
    pub has_thumbnail: bool,
    #[serde(default)]
    pub thumbnail: String,
}

impl From<Item> for ItemRecord {
    fn from(item: Item) -> Self {
        Self {
            identity: item.identity,
            fingerprint: item.fingerprint,
            display_name: item.display_name,
            kind: item.kind,
            publish_date: item.publish_date,
            source_dir: item.source_dir,
            has_thumbnail: item.thumbnail.is_some(),
            thumbnail: item.thumbnail.unwrap_or_default(),
        }
    }
}

impl TryFrom<ItemRecord> for Item {
    type Error = String;

    fn try_from(record: ItemRecord) -> Result<Self, Self::Error> {
        if !record.kind.is_publishable() {
            return Err(format!(
                "item {} in \"{}\" has kind None",
                record.identity, record.source_dir
            ));
        }
        Ok(Self {
            identity: record.identity,
            source_dir: record.source_dir,
            kind: record.kind,
            fingerprint: record.fingerprint,
            display_name: record.display_name,
            publish_date: record.publish_date,
            thumbnail: record.has_thumbnail.then_some(record.thumbnail),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_item() -> Item {
        Item {
            identity: "7a0c1f4e-3b1d-4a57-9f0e-2c8d6b5a4e31".parse().unwrap(),
            source_dir: "hello-world".to_string(),
            kind: ContentKind::Markdown,
            fingerprint: "sha256:abc".to_string(),
            display_name: "Hello, World".to_string(),
            publish_date: "2024-03-01T12:30:00Z".parse().unwrap(),
            thumbnail: Some("post-thumbnail.png".to_string()),
        }
    }

    #[test]
    fn identity_display_is_hyphenated_lowercase() {
        let id: Identity = "7A0C1F4E-3B1D-4A57-9F0E-2C8D6B5A4E31".parse().unwrap();
        assert_eq!(id.to_string(), "7a0c1f4e-3b1d-4a57-9f0e-2c8d6b5a4e31");
    }

    #[test]
    fn identity_parse_tolerates_trailing_newline() {
        let id: Identity = "7a0c1f4e-3b1d-4a57-9f0e-2c8d6b5a4e31\n".parse().unwrap();
        assert_eq!(id.to_string(), "7a0c1f4e-3b1d-4a57-9f0e-2c8d6b5a4e31");
    }

    #[test]
    fn identity_parse_rejects_garbage() {
        assert!("not-a-uuid".parse::<Identity>().is_err());
    }

    #[test]
    fn minted_identities_differ() {
        assert_ne!(Identity::mint(), Identity::mint());
    }

    #[test]
    fn kind_serializes_with_registry_names() {
        assert_eq!(serde_json::to_string(&ContentKind::Html).unwrap(), r#""HTML""#);
        assert_eq!(
            serde_json::to_string(&ContentKind::Markdown).unwrap(),
            r#""Markdown""#
        );
        assert_eq!(serde_json::to_string(&ContentKind::None).unwrap(), r#""None""#);
    }

    #[test]
    fn item_json_uses_registry_field_names() {
        let json = serde_json::to_value(sample_item()).unwrap();
        assert_eq!(json["identity"], "7a0c1f4e-3b1d-4a57-9f0e-2c8d6b5a4e31");
        assert_eq!(json["displayName"], "Hello, World");
        assert_eq!(json["sourceDir"], "hello-world");
        assert_eq!(json["kind"], "Markdown");
        assert_eq!(json["hasThumbnail"], true);
        assert_eq!(json["thumbnail"], "post-thumbnail.png");
        assert!(json["publishDate"].as_str().unwrap().starts_with("2024-03-01T12:30:00"));
    }

    #[test]
    fn item_without_thumbnail_writes_empty_string() {
        let mut item = sample_item();
        item.thumbnail = None;
        let json = serde_json::to_value(item).unwrap();
        assert_eq!(json["hasThumbnail"], false);
        assert_eq!(json["thumbnail"], "");
    }

    #[test]
    fn item_with_kind_none_is_rejected() {
        let mut json = serde_json::to_value(sample_item()).unwrap();
        json["kind"] = "None".into();
        let err = serde_json::from_value::<Item>(json).unwrap_err();
        assert!(err.to_string().contains("kind None"));
    }

    #[test]
    fn has_thumbnail_false_ignores_stale_filename() {
        let mut json = serde_json::to_value(sample_item()).unwrap();
        json["hasThumbnail"] = false.into();
        let item: Item = serde_json::from_value(json).unwrap();
        assert_eq!(item.thumbnail, None);
    }
}
