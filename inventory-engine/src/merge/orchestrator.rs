//! MergeOrchestrator - drives one merge attempt through its state machine

use serde::Serialize;
use shared::error::{AppError, AppResult, ErrorCode};
use shared::models::ProductGroup;

use super::candidates::suggest_merge;
use super::context::{ConflictResolution, MergeContext};
use super::state::MergeState;
use crate::audit_log;
use crate::conflict::ConflictKey;
use crate::records::{self, reason};
use crate::writer::{WriteOrchestrator, WriteReport};

/// Result of a merge execution
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MergeOutcome {
    pub success: bool,
    pub message: String,
    pub from_group_id: String,
    pub to_group_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report: Option<WriteReport>,
}

/// Execute a prepared merge
///
/// Refuses (`success = false`, nothing written) while any conflict is
/// unresolved. Otherwise the whole sequence goes to the writer as one batch;
/// success requires every chunk to succeed.
pub async fn execute_merge(context: &MergeContext, writer: &WriteOrchestrator) -> MergeOutcome {
    let from_group_id = context.from_group.group_id.clone();
    let to_group_id = context.to_group.group_id.clone();

    if context.is_blocked() {
        tracing::warn!(
            from = %from_group_id,
            to = %to_group_id,
            conflicts = context.conflicts.len(),
            "Merge refused: unresolved conflicts"
        );
        return MergeOutcome {
            success: false,
            message: format!(
                "{} variant conflict(s) must be resolved before merging",
                context.conflicts.len()
            ),
            from_group_id,
            to_group_id,
            report: None,
        };
    }

    let operations = context.build_operations();
    tracing::info!(
        from = %from_group_id,
        to = %to_group_id,
        operations = operations.len(),
        resolutions = context.resolutions.len(),
        "Executing merge"
    );

    match writer.execute(&operations).await {
        Ok(report) => {
            records::audit_archives(&operations, &report);
            let success = report.is_success();
            let message = if success {
                audit_log!("merge", from_group_id, format!("merged into {}", to_group_id));
                format!("Merge completed ({} documents written)", report.total_written)
            } else {
                format!("Merge failed: {}", report.failure_summary())
            };
            MergeOutcome {
                success,
                message,
                from_group_id,
                to_group_id,
                report: Some(report),
            }
        }
        Err(e) => {
            tracing::error!(error = %e, "Merge operations rejected");
            MergeOutcome {
                success: false,
                message: format!("Merge failed: {}", e),
                from_group_id,
                to_group_id,
                report: None,
            }
        }
    }
}

/// Archive and delete one variant with its inventory record, outside any merge
pub async fn force_delete_variant(
    writer: &WriteOrchestrator,
    group: &ProductGroup,
    inventory_id: &str,
) -> AppResult<WriteReport> {
    let variant = group
        .variant(inventory_id)
        .ok_or_else(|| AppError::variant_not_found(inventory_id.trim()))?;
    let operations =
        records::remove_variant_with_inventory(&group.group_id, variant, reason::FORCE_DELETED);

    let report = writer.execute(&operations).await?;
    records::audit_archives(&operations, &report);
    if report.is_success() {
        audit_log!(
            "force_delete",
            format!("{}/{}", group.group_id, variant.inventory_id.trim()),
            reason::FORCE_DELETED
        );
    } else {
        tracing::warn!(
            group_id = %group.group_id,
            inventory_id = %variant.inventory_id,
            failures = report.failures.len(),
            "Force delete incomplete"
        );
    }
    Ok(report)
}

/// State holder for the merge flow of one edit session
#[derive(Debug)]
pub struct MergeOrchestrator {
    writer: WriteOrchestrator,
    state: MergeState,
    context: Option<MergeContext>,
}

impl MergeOrchestrator {
    pub fn new(writer: WriteOrchestrator) -> Self {
        Self {
            writer,
            state: MergeState::Idle,
            context: None,
        }
    }

    pub fn state(&self) -> MergeState {
        self.state
    }

    pub fn context(&self) -> Option<&MergeContext> {
        self.context.as_ref()
    }

    fn context_mut(&mut self) -> AppResult<&mut MergeContext> {
        self.context
            .as_mut()
            .ok_or_else(|| AppError::with_message(ErrorCode::NoMergeContext, "No merge in progress"))
    }

    fn settle(&mut self) -> AppResult<()> {
        let blocked = self.context.as_ref().is_some_and(MergeContext::is_blocked);
        let next = if blocked { MergeState::Blocked } else { MergeState::Prepared };
        if self.state != next {
            self.state.transition(next)?;
        }
        Ok(())
    }

    /// Look for a merge target for `candidate`; moves to `Proposed` when one exists
    pub fn suggest_merge(
        &mut self,
        candidate: &ProductGroup,
        all_groups: &[ProductGroup],
    ) -> AppResult<Option<ProductGroup>> {
        let Some(target) = suggest_merge(candidate, all_groups).cloned() else {
            return Ok(None);
        };
        if self.state != MergeState::Proposed {
            self.state.transition(MergeState::Proposed)?;
        }
        self.context = None;
        tracing::info!(
            from = %candidate.group_id,
            to = %target.group_id,
            "Merge target suggested"
        );
        Ok(Some(target))
    }

    /// Detect conflicts and hold the context; `Blocked` when any exist
    pub fn prepare_merge(&mut self, from: ProductGroup, to: ProductGroup) -> AppResult<&MergeContext> {
        if self.state == MergeState::Executing {
            return Err(AppError::invalid_state("A merge is executing"));
        }
        let context = MergeContext::prepare(from, to)?;
        tracing::info!(
            from = %context.from_group.group_id,
            to = %context.to_group.group_id,
            conflicts = context.conflicts.len(),
            "Merge prepared"
        );
        self.context = Some(context);
        self.settle()?;
        self.context_mut().map(|c| &*c)
    }

    /// Record a resolution; returns the resulting state
    pub fn resolve_conflict(
        &mut self,
        key: &ConflictKey,
        resolution: ConflictResolution,
    ) -> AppResult<MergeState> {
        if !matches!(self.state, MergeState::Prepared | MergeState::Blocked) {
            return Err(AppError::invalid_state(format!(
                "Conflicts cannot be resolved while {}",
                self.state
            )));
        }
        self.context_mut()?.resolve(key, resolution)?;
        self.settle()?;
        Ok(self.state)
    }

    /// Execute the held merge
    ///
    /// While blocked the refusal is returned as an unsuccessful outcome and the
    /// state stays `Blocked`. On success the context is released.
    pub async fn execute(&mut self) -> AppResult<MergeOutcome> {
        let context = self
            .context
            .as_ref()
            .ok_or_else(|| AppError::with_message(ErrorCode::NoMergeContext, "No merge in progress"))?;

        if context.is_blocked() {
            return Ok(execute_merge(context, &self.writer).await);
        }

        self.state.transition(MergeState::Executing)?;
        let outcome = execute_merge(context, &self.writer).await;
        if outcome.success {
            self.state.transition(MergeState::Done)?;
            self.context = None;
        } else {
            self.state.transition(MergeState::Failed)?;
        }
        Ok(outcome)
    }

    /// Force-delete a variant of either side to clear its conflict
    ///
    /// After a fully successful write the variant leaves the context and
    /// conflicts are detected again.
    pub async fn force_delete_variant(&mut self, inventory_id: &str) -> AppResult<WriteReport> {
        if !matches!(self.state, MergeState::Prepared | MergeState::Blocked) {
            return Err(AppError::invalid_state(format!(
                "Variants cannot be force-deleted while {}",
                self.state
            )));
        }
        let context = self.context_mut()?;
        let group = if context.from_group.variant(inventory_id).is_some() {
            context.from_group.clone()
        } else if context.to_group.variant(inventory_id).is_some() {
            context.to_group.clone()
        } else {
            return Err(AppError::variant_not_found(inventory_id.trim()));
        };

        let report = force_delete_variant(&self.writer, &group, inventory_id).await?;
        if report.is_success() {
            self.context_mut()?.remove_variant(inventory_id);
            self.settle()?;
        }
        Ok(report)
    }

    /// Abandon the merge without contacting the store
    pub fn cancel(&mut self) -> AppResult<()> {
        match self.state {
            MergeState::Idle => return Ok(()),
            MergeState::Done | MergeState::Failed | MergeState::Cancelled => {
                self.state.transition(MergeState::Idle)?;
            }
            _ => {
                self.state.transition(MergeState::Cancelled)?;
                tracing::info!("Merge cancelled");
            }
        }
        self.context = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use inventory_client::MemoryDocumentStore;
    use shared::models::Variant;
    use shared::store::Collection;
    use std::sync::Arc;

    fn variant(id: &str, kind: &str) -> Variant {
        Variant {
            inventory_id: id.to_string(),
            variant_sku: format!("sku-{}", id),
            variant_type: kind.to_string(),
            sealing: "none".to_string(),
            quantity: 2,
            ..Default::default()
        }
    }

    fn group(id: &str, variants: Vec<Variant>) -> ProductGroup {
        let mut g = ProductGroup {
            group_id: id.to_string(),
            product_name: "Alpha".to_string(),
            variants,
            ..Default::default()
        };
        g.recompute_total_quantity();
        g.sync_variant_refs();
        g
    }

    fn setup(from: &ProductGroup, to: &ProductGroup) -> (Arc<MemoryDocumentStore>, MergeOrchestrator) {
        let store = Arc::new(MemoryDocumentStore::new());
        store.seed_group(from);
        store.seed_group(to);
        let merge = MergeOrchestrator::new(WriteOrchestrator::new(store.clone()));
        (store, merge)
    }

    #[tokio::test]
    async fn test_blocked_merge_refuses_without_writing() {
        let from = group("vg_1", vec![variant("f1", "box")]);
        let to = group("vg_2", vec![variant("t1", "box")]);
        let (store, mut merge) = setup(&from, &to);

        merge.prepare_merge(from, to).unwrap();
        assert_eq!(merge.state(), MergeState::Blocked);

        let outcome = merge.execute().await.unwrap();
        assert!(!outcome.success);
        assert!(outcome.report.is_none());
        assert_eq!(merge.state(), MergeState::Blocked);
        assert!(store.write_log().is_empty());
    }

    #[tokio::test]
    async fn test_clean_merge_moves_variants() {
        let from = group("vg_1", vec![variant("f1", "box")]);
        let to = group("vg_2", vec![variant("t1", "shrink")]);
        let (store, mut merge) = setup(&from, &to);
        let all = vec![from.clone(), to.clone()];

        let target = merge.suggest_merge(&from, &all).unwrap().unwrap();
        assert_eq!(target.group_id, "vg_2");
        assert_eq!(merge.state(), MergeState::Proposed);

        merge.prepare_merge(from, target).unwrap();
        assert_eq!(merge.state(), MergeState::Prepared);

        let outcome = merge.execute().await.unwrap();
        assert!(outcome.success, "{}", outcome.message);
        assert_eq!(merge.state(), MergeState::Done);
        assert!(merge.context().is_none());

        assert!(store.get(&Collection::Products, "vg_1").is_none());
        assert_eq!(
            store
                .find_where(&Collection::ProductsArchive, "originalDocId", "vg_1")
                .pop()
                .unwrap()["mergedInto"],
            "vg_2"
        );
        assert_eq!(
            store.get(&Collection::Variants, "sku-f1").unwrap()["variantGroupIdRef"],
            "vg_2"
        );
    }

    #[tokio::test]
    async fn test_resolution_unblocks() {
        let from = group("vg_1", vec![variant("f1", "box")]);
        let to = group("vg_2", vec![variant("t1", "box")]);
        let (_store, mut merge) = setup(&from, &to);

        let key = merge.prepare_merge(from, to).unwrap().conflicts[0].key.clone();
        let state = merge
            .resolve_conflict(&key, ConflictResolution::Merge { target_variant_id: "sku-t1".to_string() })
            .unwrap();
        assert_eq!(state, MergeState::Prepared);

        let outcome = merge.execute().await.unwrap();
        assert!(outcome.success);
    }

    #[tokio::test]
    async fn test_force_delete_clears_conflict() {
        let from = group("vg_1", vec![variant("f1", "box"), variant("f2", "loose")]);
        let to = group("vg_2", vec![variant("t1", "box")]);
        let (store, mut merge) = setup(&from, &to);

        merge.prepare_merge(from, to).unwrap();
        assert_eq!(merge.state(), MergeState::Blocked);

        let report = merge.force_delete_variant("f1").await.unwrap();
        assert!(report.is_success());
        assert_eq!(merge.state(), MergeState::Prepared);
        assert!(merge.context().unwrap().conflicts.is_empty());
        assert!(store.get(&Collection::Inventory, "f1").is_none());
        assert_eq!(
            store
                .find_where(&Collection::InventoryArchive, "originalDocId", "f1")
                .pop()
                .unwrap()["reason"],
            "force_deleted"
        );

        let err = merge.force_delete_variant("missing").await.unwrap_err();
        assert_eq!(err.code, ErrorCode::VariantNotFound);
    }

    #[tokio::test]
    async fn test_cancel_and_no_context() {
        let from = group("vg_1", vec![variant("f1", "box")]);
        let to = group("vg_2", vec![variant("t1", "box")]);
        let (store, mut merge) = setup(&from, &to);

        let err = merge.execute().await.unwrap_err();
        assert_eq!(err.code, ErrorCode::NoMergeContext);

        merge.prepare_merge(from, to).unwrap();
        merge.cancel().unwrap();
        assert_eq!(merge.state(), MergeState::Cancelled);
        assert!(merge.context().is_none());
        assert!(store.write_log().is_empty());

        merge.cancel().unwrap();
        assert_eq!(merge.state(), MergeState::Idle);
    }
}
