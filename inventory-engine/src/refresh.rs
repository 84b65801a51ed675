//! SnapshotRefresher - reload one group after a write
//!
//! 写入（无论成功或部分成功）之后按 id 重新读取该 group，整组替换进 catalog。
//! 读取失败时退回到全量 reload，不留下过期条目。

use inventory_client::DocumentStore;
use parking_lot::RwLock;
use serde::Serialize;
use shared::error::AppResult;
use shared::models::ProductGroup;
use std::sync::Arc;

use crate::catalog::Catalog;

/// What a refresh did to the catalog
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum RefreshOutcome {
    /// The group was re-read and replaced (or appended)
    Refreshed(ProductGroup),
    /// The store no longer has the group; its entry was removed
    Removed,
    /// The read failed; the full listing was reloaded (group count)
    ReloadedAll(usize),
}

impl RefreshOutcome {
    pub fn group(&self) -> Option<&ProductGroup> {
        match self {
            RefreshOutcome::Refreshed(group) => Some(group),
            _ => None,
        }
    }
}

#[derive(Clone)]
pub struct SnapshotRefresher {
    store: Arc<dyn DocumentStore>,
}

impl std::fmt::Debug for SnapshotRefresher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SnapshotRefresher").finish_non_exhaustive()
    }
}

impl SnapshotRefresher {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Replace the whole catalog with the store's listing
    pub async fn reload_all(&self, catalog: &RwLock<Catalog>) -> AppResult<usize> {
        let listing = self.store.list_groups().await?;
        let groups: Vec<ProductGroup> = listing.items.into_iter().map(ProductGroup::from).collect();
        let count = groups.len();
        catalog.write().replace_all(groups);
        tracing::info!(groups = count, "Catalog reloaded");
        Ok(count)
    }

    /// Re-read `group_id` and reconcile the catalog
    ///
    /// `previous_group_id` names the id the group was saved from when a save
    /// moved it; that entry is dropped as well.
    pub async fn refresh_group(
        &self,
        catalog: &RwLock<Catalog>,
        group_id: &str,
        previous_group_id: Option<&str>,
    ) -> AppResult<RefreshOutcome> {
        let fetched = self.store.read_group(group_id).await;

        let raw = match fetched {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!(
                    group_id = %group_id,
                    error = %e,
                    "Group refresh failed, reloading full listing"
                );
                let count = self.reload_all(catalog).await?;
                return Ok(RefreshOutcome::ReloadedAll(count));
            }
        };

        let mut catalog = catalog.write();
        if let Some(previous) = previous_group_id.filter(|p| *p != group_id) {
            catalog.remove(previous);
        }

        match raw {
            Some(raw) => {
                let group = ProductGroup::from(raw);
                let replaced = catalog.replace_or_append(group.clone());
                tracing::debug!(
                    group_id = %group.group_id,
                    variants = group.variants.len(),
                    replaced,
                    "Group refreshed"
                );
                Ok(RefreshOutcome::Refreshed(group))
            }
            None => {
                catalog.remove(group_id);
                tracing::info!(group_id = %group_id, "Group no longer exists, removed from catalog");
                Ok(RefreshOutcome::Removed)
            }
        }
    }
}
