//! Merge context, conflict resolutions and the merge operation sequence

use serde::{Deserialize, Serialize};
use shared::error::{AppError, AppResult, ErrorCode};
use shared::models::{ProductGroup, Variant};
use shared::store::PendingOperation;

use crate::conflict::{ConflictKey, VariantConflict, detect_conflicts};
use crate::records::{self, GroupRefs, reason};

/// Policy chosen for one conflict before the merge may run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "kebab-case")]
pub enum ConflictResolution {
    /// Fold the source variants into a surviving target variant
    Merge {
        #[serde(rename = "targetVariantId")]
        target_variant_id: String,
    },
    /// Archive and delete the source variants and their inventory records
    Discard,
    /// Move the source variants as they are; the duplicate key survives
    KeepBoth,
}

/// A conflict together with the policy chosen for it
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedConflict {
    pub conflict: VariantConflict,
    pub resolution: ConflictResolution,
}

/// One prospective merge of `from_group` into `to_group`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MergeContext {
    pub from_group: ProductGroup,
    pub to_group: ProductGroup,
    /// Unresolved conflicts; the merge is blocked while any remain
    pub conflicts: Vec<VariantConflict>,
    pub resolutions: Vec<ResolvedConflict>,
}

impl MergeContext {
    /// Detect conflicts between two distinct groups
    pub fn prepare(from_group: ProductGroup, to_group: ProductGroup) -> AppResult<Self> {
        if from_group.group_id == to_group.group_id {
            return Err(AppError::with_message(
                ErrorCode::MergeSameGroup,
                format!("Group {} cannot be merged into itself", from_group.group_id),
            ));
        }
        let conflicts = detect_conflicts(&from_group.variants, &to_group.variants);
        Ok(Self {
            from_group,
            to_group,
            conflicts,
            resolutions: Vec::new(),
        })
    }

    pub fn is_blocked(&self) -> bool {
        !self.conflicts.is_empty()
    }

    /// Record a policy for the conflict with this key
    ///
    /// A `Merge` target must be one of the conflict's target variants, named
    /// by variant doc id or inventory id; it is stored as the variant doc id.
    pub fn resolve(&mut self, key: &ConflictKey, resolution: ConflictResolution) -> AppResult<()> {
        let index = self
            .conflicts
            .iter()
            .position(|c| &c.key == key)
            .ok_or_else(|| {
                AppError::with_message(
                    ErrorCode::ConflictNotFound,
                    format!("No unresolved conflict for key {}", key),
                )
                .with_detail("key", key.to_string())
            })?;

        let resolution = match resolution {
            ConflictResolution::Merge { target_variant_id } => {
                let to_group_id = &self.to_group.group_id;
                let wanted = target_variant_id.trim();
                let target = self.conflicts[index]
                    .to_variants
                    .iter()
                    .find(|v| {
                        v.variant_doc_id(to_group_id) == wanted || v.inventory_id.trim() == wanted
                    })
                    .ok_or_else(|| {
                        AppError::with_message(
                            ErrorCode::InvalidMergeTarget,
                            format!("{} is not a target variant of conflict {}", wanted, key),
                        )
                        .with_detail("target_variant_id", wanted.to_string())
                    })?;
                ConflictResolution::Merge {
                    target_variant_id: target.variant_doc_id(to_group_id),
                }
            }
            other => other,
        };

        let conflict = self.conflicts.remove(index);
        tracing::info!(
            from = %self.from_group.group_id,
            to = %self.to_group.group_id,
            key = %conflict.key,
            resolution = ?resolution,
            remaining = self.conflicts.len(),
            "Merge conflict resolved"
        );
        self.resolutions.push(ResolvedConflict {
            conflict,
            resolution,
        });
        Ok(())
    }

    /// Drop a variant from whichever side holds it and re-run detection
    ///
    /// Conflicts whose key already has a recorded resolution stay resolved.
    pub fn remove_variant(&mut self, inventory_id: &str) -> Option<Variant> {
        let removed = self
            .from_group
            .remove_variant(inventory_id)
            .or_else(|| self.to_group.remove_variant(inventory_id))?;

        for resolved in &mut self.resolutions {
            resolved
                .conflict
                .from_variants
                .retain(|v| v.inventory_id.trim() != inventory_id.trim());
            resolved
                .conflict
                .to_variants
                .retain(|v| v.inventory_id.trim() != inventory_id.trim());
        }
        self.resolutions
            .retain(|r| !r.conflict.from_variants.is_empty() && !r.conflict.to_variants.is_empty());

        let resolved_keys: Vec<ConflictKey> =
            self.resolutions.iter().map(|r| r.conflict.key.clone()).collect();
        self.conflicts = detect_conflicts(&self.from_group.variants, &self.to_group.variants)
            .into_iter()
            .filter(|c| !resolved_keys.contains(&c.key))
            .collect();
        Some(removed)
    }

    /// Resolution covering a source variant, if any
    fn resolution_for(&self, variant: &Variant) -> Option<&ConflictResolution> {
        self.resolutions
            .iter()
            .find(|r| {
                r.conflict
                    .from_variants
                    .iter()
                    .any(|v| v.inventory_id == variant.inventory_id)
            })
            .map(|r| &r.resolution)
    }

    /// The merge sequence, in fixed order
    ///
    /// 1. archive the source group (`mergedInto`, `archivedAt`)
    /// 2. delete the source group document
    /// 3. repoint every source variant that moves to the target group
    /// 4. fold or discard the variants whose conflicts say so
    pub fn build_operations(&self) -> Vec<PendingOperation> {
        let from = &self.from_group;
        let to_id = self.to_group.group_id.as_str();
        let refs = GroupRefs::from(&self.to_group);

        let mut ops = vec![
            records::archive_group(from, Some(to_id), &reason::merged_into(to_id)),
            records::delete_group(from),
        ];

        let mut moving = Vec::new();
        let mut folded = Vec::new();
        for variant in &from.variants {
            match self.resolution_for(variant) {
                None | Some(ConflictResolution::KeepBoth) => moving.push(variant),
                Some(resolution) => folded.push((variant, resolution)),
            }
        }

        for variant in &moving {
            ops.push(records::repoint_variant(&from.group_id, variant, to_id));
        }
        for variant in &moving {
            ops.push(records::repoint_inventory(&from.group_id, variant, &refs));
        }

        for (variant, resolution) in folded {
            match resolution {
                ConflictResolution::Merge { target_variant_id } => {
                    ops.push(records::archive_variant(
                        &from.group_id,
                        variant,
                        reason::MERGED_INTO_EXISTING,
                        Some(target_variant_id.as_str()),
                    ));
                    ops.push(records::delete_variant(&from.group_id, variant));
                    ops.push(records::point_inventory_at_variant(
                        &from.group_id,
                        variant,
                        target_variant_id,
                        &refs,
                    ));
                }
                ConflictResolution::Discard => {
                    ops.push(records::archive_variant(
                        &from.group_id,
                        variant,
                        reason::DISCARDED_DURING_MERGE,
                        None,
                    ));
                    ops.push(records::delete_variant(&from.group_id, variant));
                    ops.push(records::archive_inventory(
                        &from.group_id,
                        variant,
                        reason::VARIANT_DISCARDED,
                    ));
                    ops.push(records::delete_inventory(variant));
                }
                ConflictResolution::KeepBoth => {}
            }
        }

        ops
    }
}
