//! Merging a prior registry with a fresh scan.
//!
//! Reconciliation is the only way disk changes reach the registry. For each
//! scanned post it looks up the prior item with the same identity:
//!
//! - **Retained** (match): `display_name` and `publish_date` are carried over
//!   verbatim; `kind`, `source_dir`, `fingerprint` and `thumbnail` are taken
//!   from disk. Renaming a post directory therefore keeps its title and date.
//! - **Fresh** (no match): `display_name` defaults to the directory name and
//!   `publish_date` to the reconciliation's clock reading.
//!
//! Prior items whose directory is gone (or no longer has an index file) are
//! simply not in the result.
//!
//! ## Ordering
//!
//! Retained items keep their relative order from the prior registry. Fresh
//! items are sorted by directory name and placed as a block before or after
//! the retained block. Both the sort direction and the placement come from
//! [`OrderingPolicy`]: historical versions of this tool disagreed on both,
//! so neither is hard-wired.

use crate::registry::Registry;
use crate::scan::{self, ScanError, ScannedDir};
use crate::types::Item;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashSet;
use std::path::Path;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Error, Debug)]
pub enum ReconcileError {
    #[error("Scan failed: {0}")]
    Scan(#[from] ScanError),
}

/// Sort direction for newly discovered posts, by directory name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FreshSort {
    /// z → a. Date-prefixed directory names (`2024-05-…`) come out newest first.
    #[default]
    Descending,
    /// a → z.
    Ascending,
}

/// Where the block of newly discovered posts goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FreshPlacement {
    #[default]
    BeforeRetained,
    AfterRetained,
}

/// How a reconciled registry is ordered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OrderingPolicy {
    pub fresh_sort: FreshSort,
    pub fresh_placement: FreshPlacement,
}

impl OrderingPolicy {
    fn compare_fresh(&self, a: &Item, b: &Item) -> Ordering {
        let by_name = a.source_dir.cmp(&b.source_dir);
        match self.fresh_sort {
            FreshSort::Ascending => by_name,
            FreshSort::Descending => by_name.reverse(),
        }
    }
}

/// Result of a reconciliation, with bookkeeping for display and logging.
#[derive(Debug, Clone)]
pub struct Reconciled {
    pub registry: Registry,
    /// Number of posts with no prior entry.
    pub fresh: usize,
    /// Number of posts carried over from the prior registry.
    pub retained: usize,
    /// Prior entries that no longer exist on disk.
    pub dropped: usize,
}

/// Scans and reconciles against a prior registry.
#[derive(Debug, Clone, Default)]
pub struct Reconciler {
    policy: OrderingPolicy,
}

impl Reconciler {
    pub fn new(policy: OrderingPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> OrderingPolicy {
        self.policy
    }

    /// Scan `content_root` and merge the result into `prior`.
    ///
    /// All-or-nothing: any scan error aborts without returning a registry.
    pub fn reconcile(
        &self,
        content_root: &Path,
        prior: &Registry,
        now: DateTime<Utc>,
    ) -> Result<Reconciled, ReconcileError> {
        let scanned = scan::scan(content_root)?;
        let result = self.merge(prior, scanned, now);
        info!(
            fresh = result.fresh,
            retained = result.retained,
            dropped = result.dropped,
            "reconciled registry"
        );
        Ok(result)
    }

    /// Merge already-scanned directories into `prior`. Pure: no I/O.
    pub fn merge(&self, prior: &Registry, scanned: Vec<ScannedDir>, now: DateTime<Utc>) -> Reconciled {
        let positions = prior.positions();
        let mut retained: Vec<(usize, Item)> = Vec::new();
        let mut fresh: Vec<Item> = Vec::new();
        let mut seen = HashSet::new();

        for dir in scanned {
            if !seen.insert(dir.identity) {
                warn!(
                    identity = %dir.identity,
                    source_dir = %dir.source_dir,
                    "identity already merged, skipping"
                );
                continue;
            }
            match positions.get(&dir.identity) {
                Some(&idx) => {
                    let old = &prior.items()[idx];
                    retained.push((
                        idx,
                        Item {
                            identity: dir.identity,
                            source_dir: dir.source_dir,
                            kind: dir.kind,
                            fingerprint: dir.fingerprint,
                            display_name: old.display_name.clone(),
                            publish_date: old.publish_date,
                            thumbnail: dir.thumbnail,
                        },
                    ));
                }
                None => fresh.push(Item {
                    identity: dir.identity,
                    display_name: dir.source_dir.clone(),
                    source_dir: dir.source_dir,
                    kind: dir.kind,
                    fingerprint: dir.fingerprint,
                    publish_date: now,
                    thumbnail: dir.thumbnail,
                }),
            }
        }

        retained.sort_by_key(|(idx, _)| *idx);
        fresh.sort_by(|a, b| self.policy.compare_fresh(a, b));

        let counts = (fresh.len(), retained.len());
        let retained = retained.into_iter().map(|(_, item)| item);
        let items: Vec<Item> = match self.policy.fresh_placement {
            FreshPlacement::BeforeRetained => fresh.into_iter().chain(retained).collect(),
            FreshPlacement::AfterRetained => retained.chain(fresh).collect(),
        };

        Reconciled {
            fresh: counts.0,
            retained: counts.1,
            dropped: prior.iter().filter(|i| !seen.contains(&i.identity)).count(),
            registry: Registry::new(items),
        }
    }
}
