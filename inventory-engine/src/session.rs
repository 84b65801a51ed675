//! EditSession - the group currently open for editing
//!
//! 显式的会话对象：当前编辑的 canonical group 与其草稿放在一起，
//! 由调用方持有并按引用传给 diff / save / merge，而不是隐式共享的可变状态。

use shared::error::{AppError, AppResult};
use shared::models::{ChangedField, ProductGroup};

use crate::diff::{GroupDiff, diff_group};
use crate::draft::{
    GroupDrafts, ProductDraftPatch, VariantDraftPatch, init_drafts_from_group, reset_drafts,
};
use crate::taxonomy::TaxonomyResolver;

/// One open group with its drafts
#[derive(Debug, Clone, PartialEq)]
pub struct EditSession {
    group: ProductGroup,
    drafts: GroupDrafts,
}

impl EditSession {
    /// Open a group with drafts copied verbatim from it
    pub fn open(group: ProductGroup) -> AppResult<Self> {
        let drafts = init_drafts_from_group(&group)?;
        Ok(Self { group, drafts })
    }

    /// Open a group with taxonomy inputs seeded from resolved canonical ids
    pub fn open_with_resolver(group: ProductGroup, resolver: &TaxonomyResolver) -> AppResult<Self> {
        let drafts = reset_drafts(&group, resolver)?;
        Ok(Self { group, drafts })
    }

    pub fn group(&self) -> &ProductGroup {
        &self.group
    }

    pub fn group_id(&self) -> &str {
        &self.group.group_id
    }

    pub fn drafts(&self) -> &GroupDrafts {
        &self.drafts
    }

    /// Group id the next save writes to
    pub fn effective_group_id(&self) -> &str {
        self.drafts.product.effective_group_id(&self.group)
    }

    pub fn is_group_id_changed(&self) -> bool {
        self.effective_group_id() != self.group.group_id
    }

    /// Apply a product patch, syncing variant drafts
    ///
    /// Returns true when the trimmed product name changed.
    pub fn patch_product(&mut self, patch: ProductDraftPatch) -> bool {
        let before = self.drafts.product.product_name.trim().to_string();
        self.drafts.apply_product_patch(patch);
        self.drafts.product.product_name.trim() != before
    }

    pub fn patch_variant(&mut self, inventory_id: &str, patch: VariantDraftPatch) -> AppResult<()> {
        let draft = self
            .drafts
            .variants
            .get_mut(inventory_id.trim())
            .ok_or_else(|| AppError::variant_not_found(inventory_id.trim()))?;
        draft.apply(patch);
        Ok(())
    }

    pub fn diff(&self) -> GroupDiff {
        diff_group(&self.group, &self.drafts)
    }

    pub fn is_dirty(&self) -> bool {
        !self.diff().is_empty()
    }

    /// Whether the draft renames the product
    pub fn is_renamed(&self) -> bool {
        self.diff().product_contains(ChangedField::ProductName)
    }

    /// The group as it would look under the drafted name, for merge lookup
    pub fn merge_candidate(&self) -> ProductGroup {
        let mut candidate = self.group.clone();
        candidate.product_name = self.drafts.product.product_name.trim().to_string();
        candidate
    }

    /// Discard edits and rebuild drafts from the canonical group
    pub fn reset(&mut self, resolver: &TaxonomyResolver) -> AppResult<()> {
        self.drafts = reset_drafts(&self.group, resolver)?;
        Ok(())
    }

    /// Swap in a fresh snapshot but keep the drafts
    ///
    /// After a partially failed write the diff then shows only what is still unsaved.
    pub fn rebase(&mut self, group: ProductGroup) {
        self.group = group;
    }

    /// Swap in a fresh snapshot after a write and rebuild drafts from it
    pub fn replace_group(&mut self, group: ProductGroup, resolver: &TaxonomyResolver) -> AppResult<()> {
        let drafts = reset_drafts(&group, resolver)?;
        self.group = group;
        self.drafts = drafts;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::error::ErrorCode;
    use shared::models::Variant;

    fn group() -> ProductGroup {
        ProductGroup {
            group_id: "vg_1".to_string(),
            product_name: "Alpha".to_string(),
            category: "cat_game".to_string(),
            variants: vec![
                Variant {
                    inventory_id: "inv-1".to_string(),
                    variant_type: "box".to_string(),
                    quantity: 1,
                    ..Default::default()
                },
                Variant {
                    inventory_id: "inv-2".to_string(),
                    variant_type: "box".to_string(),
                    quantity: 2,
                    ..Default::default()
                },
            ],
            ..Default::default()
        }
    }

    #[test]
    fn test_fresh_session_is_clean() {
        let session = EditSession::open(group()).unwrap();
        assert!(!session.is_dirty());
        assert!(!session.is_group_id_changed());
        assert_eq!(session.effective_group_id(), "vg_1");
    }

    #[test]
    fn test_rename_propagates_to_every_variant() {
        let mut session = EditSession::open(group()).unwrap();
        assert!(session.patch_product(ProductDraftPatch {
            product_name: Some("Alpha Remastered".to_string()),
            ..Default::default()
        }));
        assert!(session.is_renamed());

        let diff = session.diff();
        assert_eq!(diff.variants.len(), 2);
        assert!(
            diff.variants
                .iter()
                .all(|d| d.contains(ChangedField::ProductName))
        );
        assert_eq!(session.merge_candidate().product_name, "Alpha Remastered");
        assert_eq!(session.group().product_name, "Alpha");
    }

    #[test]
    fn test_whitespace_rename_is_not_a_change() {
        let mut session = EditSession::open(group()).unwrap();
        assert!(!session.patch_product(ProductDraftPatch {
            product_name: Some(" Alpha ".to_string()),
            ..Default::default()
        }));
        assert!(!session.is_dirty());
    }

    #[test]
    fn test_patch_variant() {
        let mut session = EditSession::open(group()).unwrap();
        session
            .patch_variant(
                " inv-2 ",
                VariantDraftPatch {
                    quantity: Some("5".to_string()),
                    ..Default::default()
                },
            )
            .unwrap();
        let diff = session.diff();
        assert_eq!(diff.variants.len(), 1);
        assert!(diff.variant("inv-2").unwrap().contains(ChangedField::Quantity));

        let err = session
            .patch_variant("missing", VariantDraftPatch::default())
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::VariantNotFound);
    }

    #[test]
    fn test_group_id_change_and_reset() {
        let mut session = EditSession::open(group()).unwrap();
        session.patch_product(ProductDraftPatch {
            group_id: Some("vg_9".to_string()),
            ..Default::default()
        });
        assert!(session.is_group_id_changed());
        assert!(
            session
                .diff()
                .variants
                .iter()
                .all(|d| d.contains(ChangedField::GroupId))
        );

        session.reset(&TaxonomyResolver::new()).unwrap();
        assert!(!session.is_group_id_changed());
        assert!(!session.is_dirty());
    }
}
