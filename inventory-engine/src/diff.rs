//! DiffEngine - changed-field sets between canonical records and drafts
//!
//! 标量字段 trim 后比较；taxonomy token 列表按多重集合比较（与顺序无关）；
//! 数字字段空串视为 0。
//!
//! 商品级的 `productName` / `category` 变更会传播到每个 variant 的 diff，
//! 因为每个 variant 都持有这两个字段的反范式副本（[`Variant::DENORMALIZED`]）。

use serde::Serialize;
use shared::models::{ChangedField, FieldDiff, ProductGroup, Variant};

use crate::draft::{GroupDrafts, ProductDraft, VariantDraft, first_non_empty, normalize_release_date};
use crate::tokens::{
    diff_number, parse_damages_input, parse_sealing_input, parse_status_tokens, parse_types_input,
    tokens_equal,
};

/// Diff of a whole group: product fields plus one entry per changed variant
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GroupDiff {
    pub product: Vec<ChangedField>,
    /// In the group's variant order
    pub variants: Vec<FieldDiff>,
}

impl GroupDiff {
    pub fn is_empty(&self) -> bool {
        self.product.is_empty() && self.variants.is_empty()
    }

    pub fn product_contains(&self, field: ChangedField) -> bool {
        self.product.contains(&field)
    }

    pub fn variant(&self, key: &str) -> Option<&FieldDiff> {
        self.variants.iter().find(|d| d.key == key.trim())
    }
}

fn scalar_changed(a: &str, b: &str) -> bool {
    a.trim() != b.trim()
}

/// The group's effective single selection, tokenized like the draft input
///
/// 读取端可能把数组拼成 `box|shrink` 这样的单个字符串，所以两侧必须用同一个 parser。
fn selection(values: &[String], parse: fn(&str) -> Vec<String>) -> Vec<String> {
    parse(&first_non_empty(values))
}

/// Changed product-level fields, in a fixed order
pub fn diff_product(group: &ProductGroup, draft: &ProductDraft) -> Vec<ChangedField> {
    let mut changes = Vec::new();

    if scalar_changed(&draft.series_id, &group.series_id) {
        changes.push(ChangedField::SeriesId);
    }
    if scalar_changed(&draft.product_name, &group.product_name) {
        changes.push(ChangedField::ProductName);
    }
    if scalar_changed(&draft.vol, &group.vol) {
        changes.push(ChangedField::Vol);
    }
    if draft.release_date.trim() != normalize_release_date(group.release_date.as_deref()) {
        changes.push(ChangedField::ReleaseDate);
    }

    let category_input = draft.category_input.trim();
    if scalar_changed(&draft.category, &group.category)
        || (!category_input.is_empty() && category_input != draft.category.trim())
    {
        changes.push(ChangedField::Category);
    }

    let storage_input = draft.storage_input.trim();
    if !storage_input.is_empty() {
        let current = group
            .variants
            .iter()
            .map(|v| v.storage_location.trim())
            .find(|s| !s.is_empty())
            .unwrap_or_default();
        if storage_input != current {
            changes.push(ChangedField::Storage);
        }
    }

    if draft.effective_group_id(group) != group.group_id {
        changes.push(ChangedField::GroupId);
    }

    if !tokens_equal(
        &selection(&group.types, parse_types_input),
        &parse_types_input(&draft.types_input),
    ) {
        changes.push(ChangedField::Types);
    }
    if !tokens_equal(
        &selection(&group.damages, parse_damages_input),
        &parse_damages_input(&draft.damages_input),
    ) {
        changes.push(ChangedField::Damages);
    }
    if !tokens_equal(
        &selection(&group.sealing, parse_sealing_input),
        &parse_sealing_input(&draft.sealing_input),
    ) {
        changes.push(ChangedField::Sealing);
    }

    changes
}

fn number_changed(original: f64, raw: &str) -> bool {
    diff_number(raw) != Some(original)
}

/// Changed fields of one variant; `None` when nothing differs
///
/// `group_id_changed` appends [`ChangedField::GroupId`] even when no field of
/// the variant itself changed.
pub fn diff_variant(
    variant: &Variant,
    draft: &VariantDraft,
    group_id_changed: bool,
) -> Option<FieldDiff> {
    let mut diff = FieldDiff::new(draft.key.clone());

    if !tokens_equal(
        &parse_types_input(&variant.variant_type),
        &parse_types_input(&draft.types),
    ) {
        diff.push(ChangedField::Types);
    }
    if !tokens_equal(
        &parse_damages_input(&variant.damages),
        &parse_damages_input(&draft.damages),
    ) {
        diff.push(ChangedField::Damages);
    }
    if !tokens_equal(
        &parse_sealing_input(&variant.sealing),
        &parse_sealing_input(&draft.sealing),
    ) {
        diff.push(ChangedField::Sealing);
    }
    if scalar_changed(&variant.storage_location, &draft.storage_location) {
        diff.push(ChangedField::StorageLocation);
    }
    if number_changed(variant.quantity as f64, &draft.quantity) {
        diff.push(ChangedField::Quantity);
    }
    if number_changed(variant.unit_price.unwrap_or(0.0), &draft.unit_price) {
        diff.push(ChangedField::UnitPrice);
    }
    if !tokens_equal(
        &parse_status_tokens(&variant.status_tokens),
        &parse_status_tokens(&draft.status_tokens),
    ) {
        diff.push(ChangedField::StatusTokens);
    }
    if scalar_changed(&variant.barcode, &draft.barcode) {
        diff.push(ChangedField::Barcode);
    }
    if scalar_changed(&variant.notes, &draft.notes) {
        diff.push(ChangedField::Notes);
    }
    if group_id_changed {
        diff.push(ChangedField::GroupId);
    }

    (!diff.is_empty()).then_some(diff)
}

/// Diff a group against its drafts, applying denormalized-field propagation
///
/// Variants without a draft are skipped.
pub fn diff_group(group: &ProductGroup, drafts: &GroupDrafts) -> GroupDiff {
    let product = diff_product(group, &drafts.product);
    let group_id_changed = product.contains(&ChangedField::GroupId);
    let invalidated: Vec<ChangedField> = Variant::DENORMALIZED
        .into_iter()
        .filter(|field| product.contains(field))
        .collect();

    let mut variants = Vec::new();
    for variant in &group.variants {
        let Some(draft) = drafts.variant(&variant.inventory_id) else {
            continue;
        };
        let mut diff = diff_variant(variant, draft, group_id_changed)
            .unwrap_or_else(|| FieldDiff::new(draft.key.clone()));
        for field in &invalidated {
            diff.push(*field);
        }
        if !diff.is_empty() {
            variants.push(diff);
        }
    }

    GroupDiff { product, variants }
}
