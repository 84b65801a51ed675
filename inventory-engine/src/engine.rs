//! InventoryEngine - facade over catalog, edit session, save and merge
//!
//! 所有工作都由离散的用户动作触发（打开编辑、保存、执行合并、强制删除），
//! 每个动作按顺序跑完一串异步网络调用；没有后台任务。
//! Catalog 是唯一共享的可变资源，只做整组替换 / 追加。

use inventory_client::TaxonomySource;
use parking_lot::{RwLock, RwLockReadGuard};
use serde::Serialize;
use shared::error::{AppError, AppResult, ErrorCode};
use shared::models::ProductGroup;
use std::sync::Arc;

use crate::catalog::{Catalog, CatalogQuery};
use crate::conflict::ConflictKey;
use crate::core::Config;
use crate::draft::{ProductDraftPatch, VariantDraftPatch};
use crate::merge::{
    self, ConflictResolution, MergeContext, MergeOrchestrator, MergeOutcome, MergeState,
};
use crate::records;
use crate::refresh::{RefreshOutcome, SnapshotRefresher};
use crate::save::{SavePlan, collect_save_operations, collect_variant_save};
use crate::session::EditSession;
use crate::taxonomy::TaxonomyResolver;
use crate::writer::{WriteOrchestrator, WriteReport};

/// Result of a save: what was written and how the catalog was reconciled
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SaveOutcome {
    pub saved_group_id: String,
    pub report: WriteReport,
    pub refresh: RefreshOutcome,
}

impl SaveOutcome {
    pub fn is_success(&self) -> bool {
        self.report.is_success()
    }
}

fn no_active_group() -> AppError {
    AppError::with_message(ErrorCode::NoActiveGroup, "No group is open for editing")
}

#[derive(Debug)]
pub struct InventoryEngine {
    writer: WriteOrchestrator,
    refresher: SnapshotRefresher,
    resolver: TaxonomyResolver,
    catalog: RwLock<Catalog>,
    session: Option<EditSession>,
    merge: MergeOrchestrator,
}

impl InventoryEngine {
    pub fn new(writer: WriteOrchestrator) -> Self {
        Self {
            refresher: SnapshotRefresher::new(writer.store().clone()),
            merge: MergeOrchestrator::new(writer.clone()),
            writer,
            resolver: TaxonomyResolver::new(),
            catalog: RwLock::new(Catalog::default()),
            session: None,
        }
    }

    /// Engine backed by the HTTP document store described by `config`
    pub fn from_config(config: &Config) -> AppResult<Self> {
        let store = config.client_config().build_http_store()?;
        let writer = WriteOrchestrator::new(Arc::new(store))
            .with_chunk_size(config.write_chunk_size)?
            .with_parallel_collections(config.parallel_collections);
        Ok(Self::new(writer))
    }

    pub fn writer(&self) -> &WriteOrchestrator {
        &self.writer
    }

    pub fn resolver(&self) -> &TaxonomyResolver {
        &self.resolver
    }

    pub fn set_resolver(&mut self, resolver: TaxonomyResolver) {
        self.resolver = resolver;
    }

    /// Load and parse the taxonomy vocabularies
    pub async fn load_taxonomies(&mut self, source: &dyn TaxonomySource) -> AppResult<()> {
        self.resolver = TaxonomyResolver::load(source).await?;
        Ok(())
    }

    /// Replace the catalog with the store's full listing
    pub async fn load_catalog(&self) -> AppResult<usize> {
        self.refresher.reload_all(&self.catalog).await
    }

    pub fn catalog(&self) -> RwLockReadGuard<'_, Catalog> {
        self.catalog.read()
    }

    pub fn query(&self, query: &CatalogQuery) -> Vec<ProductGroup> {
        self.catalog.read().query(query).into_iter().cloned().collect()
    }

    // ========== Edit session ==========

    pub fn session(&self) -> Option<&EditSession> {
        self.session.as_ref()
    }

    fn session_mut(&mut self) -> AppResult<&mut EditSession> {
        self.session.as_mut().ok_or_else(no_active_group)
    }

    /// Open a catalog group for editing
    pub fn open(&mut self, group_id: &str) -> AppResult<&EditSession> {
        let group = self
            .catalog
            .read()
            .get(group_id)
            .cloned()
            .ok_or_else(|| AppError::group_not_found(group_id))?;
        let session = EditSession::open_with_resolver(group, &self.resolver)?;
        tracing::info!(group_id = %group_id, variants = session.drafts().variants.len(), "Group opened");
        let session: &EditSession = self.session.insert(session);
        Ok(session)
    }

    pub fn close(&mut self) {
        self.session = None;
    }

    /// Apply a product patch
    ///
    /// A rename looks for another group with the new name and returns the
    /// best merge target, if any. No suggestion is made while a merge holds
    /// a context.
    pub fn patch_product(&mut self, patch: ProductDraftPatch) -> AppResult<Option<ProductGroup>> {
        let session = self.session_mut()?;
        if !session.patch_product(patch) {
            return Ok(None);
        }
        let candidate = session.merge_candidate();
        if self.merge.state().has_context() {
            return Ok(None);
        }
        let groups = self.catalog.read().groups().to_vec();
        self.merge.suggest_merge(&candidate, &groups)
    }

    pub fn patch_variant(&mut self, inventory_id: &str, patch: VariantDraftPatch) -> AppResult<()> {
        self.session_mut()?.patch_variant(inventory_id, patch)
    }

    /// Discard edits of the open group
    pub fn reset_drafts(&mut self) -> AppResult<()> {
        let session = self.session.as_mut().ok_or_else(no_active_group)?;
        session.reset(&self.resolver)
    }

    // ========== Save ==========

    /// Save every change of the open group
    pub async fn save(&mut self) -> AppResult<SaveOutcome> {
        let session = self.session.as_ref().ok_or_else(no_active_group)?;
        let plan = collect_save_operations(session, &self.resolver)?;
        self.write_plan(plan).await
    }

    /// Save one variant of the open group
    pub async fn save_variant(&mut self, inventory_id: &str) -> AppResult<SaveOutcome> {
        let session = self.session.as_ref().ok_or_else(no_active_group)?;
        let plan = collect_variant_save(session, &self.resolver, inventory_id)?;
        self.write_plan(plan).await
    }

    async fn write_plan(&mut self, plan: SavePlan) -> AppResult<SaveOutcome> {
        let report = self.writer.execute(&plan.operations).await?;
        records::audit_archives(&plan.operations, &report);
        if report.is_success() {
            tracing::info!(
                group_id = %plan.group_id,
                saved_group_id = %plan.saved_group_id,
                written = report.total_written,
                "Save completed"
            );
        } else {
            tracing::warn!(
                group_id = %plan.group_id,
                failures = %report.failure_summary(),
                "Save incomplete"
            );
        }

        let previous = plan.is_group_change().then_some(plan.group_id.as_str());
        let refresh = self
            .refresher
            .refresh_group(&self.catalog, &plan.saved_group_id, previous)
            .await?;
        self.reconcile_session(&plan.group_id, &plan.saved_group_id, &refresh, report.is_success())?;

        Ok(SaveOutcome {
            saved_group_id: plan.saved_group_id,
            report,
            refresh,
        })
    }

    /// Point the open session at the refreshed state of `group_id`
    ///
    /// `rebuild` resets the drafts from the fresh snapshot; otherwise the
    /// drafts survive so a failed write can be retried.
    fn reconcile_session(
        &mut self,
        group_id: &str,
        fresh_group_id: &str,
        refresh: &RefreshOutcome,
        rebuild: bool,
    ) -> AppResult<()> {
        let Some(session) = self.session.as_mut() else {
            return Ok(());
        };
        if session.group_id() != group_id {
            return Ok(());
        }

        let fresh = match refresh {
            RefreshOutcome::Refreshed(group) => Some(group.clone()),
            RefreshOutcome::ReloadedAll(_) => self.catalog.read().get(fresh_group_id).cloned(),
            RefreshOutcome::Removed => {
                tracing::info!(group_id = %group_id, "Open group was removed, closing session");
                self.session = None;
                return Ok(());
            }
        };

        match fresh {
            Some(group) if rebuild => session.replace_group(group, &self.resolver)?,
            Some(group) => session.rebase(group),
            None => {}
        }
        Ok(())
    }

    // ========== Merge ==========

    pub fn merge_state(&self) -> MergeState {
        self.merge.state()
    }

    pub fn merge_context(&self) -> Option<&MergeContext> {
        self.merge.context()
    }

    fn catalog_group(&self, group_id: &str) -> AppResult<ProductGroup> {
        self.catalog
            .read()
            .get(group_id)
            .cloned()
            .ok_or_else(|| AppError::group_not_found(group_id))
    }

    /// Prepare merging `from_group_id` into `to_group_id`
    pub fn prepare_merge(&mut self, from_group_id: &str, to_group_id: &str) -> AppResult<&MergeContext> {
        let from = self.catalog_group(from_group_id)?;
        let to = self.catalog_group(to_group_id)?;
        self.merge.prepare_merge(from, to)
    }

    pub fn resolve_conflict(
        &mut self,
        key: &ConflictKey,
        resolution: ConflictResolution,
    ) -> AppResult<MergeState> {
        self.merge.resolve_conflict(key, resolution)
    }

    /// Execute the prepared merge and reconcile both groups
    pub async fn execute_merge(&mut self) -> AppResult<MergeOutcome> {
        let outcome = self.merge.execute().await?;
        if outcome.report.is_none() {
            return Ok(outcome);
        }

        let source = self
            .refresher
            .refresh_group(&self.catalog, &outcome.from_group_id, None)
            .await?;
        let target = self
            .refresher
            .refresh_group(&self.catalog, &outcome.to_group_id, None)
            .await?;

        if outcome.success {
            self.reconcile_session(&outcome.from_group_id, &outcome.to_group_id, &target, true)?;
        } else {
            self.reconcile_session(&outcome.from_group_id, &outcome.from_group_id, &source, false)?;
        }
        self.reconcile_session(&outcome.to_group_id, &outcome.to_group_id, &target, outcome.success)?;
        Ok(outcome)
    }

    /// Force-delete a variant
    ///
    /// Inside a prepared merge the variant may belong to either side; otherwise
    /// it must belong to the open group.
    pub async fn force_delete_variant(&mut self, inventory_id: &str) -> AppResult<WriteReport> {
        let merge_owner = self.merge.context().and_then(|context| {
            [&context.from_group, &context.to_group]
                .into_iter()
                .find(|g| g.variant(inventory_id).is_some())
                .map(|g| g.group_id.clone())
        });

        let (group_id, report) = match merge_owner {
            Some(group_id) => (group_id, self.merge.force_delete_variant(inventory_id).await?),
            None => {
                let group = self.session.as_ref().ok_or_else(no_active_group)?.group().clone();
                let report = merge::force_delete_variant(&self.writer, &group, inventory_id).await?;
                (group.group_id, report)
            }
        };

        let refresh = self.refresher.refresh_group(&self.catalog, &group_id, None).await?;
        self.reconcile_session(&group_id, &group_id, &refresh, report.is_success())?;
        Ok(report)
    }

    /// Abandon the merge without contacting the store
    pub fn cancel_merge(&mut self) -> AppResult<()> {
        self.merge.cancel()
    }
}
