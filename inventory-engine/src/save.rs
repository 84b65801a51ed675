//! Save planning
//!
//! 把会话里的草稿和 diff 变成有序的 `PendingOperation` 列表：
//!
//! 1. group id 变更且有 variant：归档旧 group (`mergedInto`)、删除旧 group、
//!    重定向每个 variant 文档和 inventory 文档
//! 2. group id 变更但没有 variant：只归档 + 删除
//! 3. product diff 非空：写 product 文档（taxonomy 解析为 canonical id）
//! 4. 每个 variant diff 一条 inventory 文档（id、label、反范式引用、`changed_fields`）
//!
//! 任何 taxonomy 值解析失败都会在产生操作之前拒绝整个保存。

use serde::Serialize;
use serde_json::{Value, json};
use shared::error::{AppError, AppResult, ErrorCode};
use shared::models::{ChangedField, FieldDiff, ProductGroup, Variant};
use shared::store::{Collection, PendingOperation};
use shared::util::now_iso;

use crate::diff::{GroupDiff, diff_variant};
use crate::draft::{GroupDrafts, ProductDraft, VariantDraft, normalize_release_date};
use crate::records::{self, GroupRefs, object, reason};
use crate::session::EditSession;
use crate::taxonomy::{TaxonomyKind, TaxonomyResolver};
use crate::tokens::{
    parse_damages_input, parse_number, parse_sealing_input, parse_status_tokens,
    parse_types_input,
};

/// Operations for one save plus the snapshot expected afterwards
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SavePlan {
    /// Canonical group id before the save
    pub group_id: String,
    /// Group id the save writes to
    pub saved_group_id: String,
    pub operations: Vec<PendingOperation>,
    pub diff: GroupDiff,
    /// Optimistic post-save group
    pub snapshot: ProductGroup,
}

impl SavePlan {
    pub fn is_group_change(&self) -> bool {
        self.group_id != self.saved_group_id
    }
}

/// Resolve a token list; no tokens resolves to `None`, unknown tokens are an error
fn resolve_tokens(
    resolver: &TaxonomyResolver,
    tokens: &[String],
    kind: TaxonomyKind,
) -> AppResult<Option<String>> {
    if tokens.is_empty() {
        return Ok(None);
    }
    resolver
        .resolve(tokens, kind)
        .map(Some)
        .ok_or_else(|| AppError::unknown_taxonomy(tokens.join(", "), kind.as_str()))
}

/// Resolved id, or the trimmed raw input when it does not resolve
fn resolved_or_raw(
    resolver: &TaxonomyResolver,
    tokens: Vec<String>,
    kind: TaxonomyKind,
) -> Option<String> {
    resolver
        .resolve(&tokens, kind)
        .or_else(|| tokens.into_iter().next())
}

/// Denormalized references the save will write: effective id, name, category id
pub fn resolve_group_refs(
    group: &ProductGroup,
    product: &ProductDraft,
    resolver: &TaxonomyResolver,
) -> AppResult<GroupRefs> {
    let name = product.product_name.trim();
    let raw_category = [
        product.category_input.trim(),
        product.category.trim(),
        group.category.trim(),
    ]
    .into_iter()
    .find(|c| !c.is_empty())
    .unwrap_or_default();

    Ok(GroupRefs {
        group_id: product.effective_group_id(group).to_string(),
        product_name: if name.is_empty() {
            group.product_name.clone()
        } else {
            name.to_string()
        },
        category: resolver
            .resolve_required(raw_category, TaxonomyKind::Categories)?
            .unwrap_or_default(),
    })
}

fn release_date_value(raw: &str) -> AppResult<Value> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(Value::Null);
    }
    let date = normalize_release_date(Some(raw));
    if date.is_empty() {
        return Err(AppError::validation(format!("Invalid release date: {}", raw))
            .with_detail("field", "release_date"));
    }
    Ok(Value::String(format!("{}T00:00:00.000Z", date)))
}

fn parse_quantity(draft: &VariantDraft) -> AppResult<i64> {
    if draft.quantity.trim().is_empty() {
        return Ok(0);
    }
    parse_number(&draft.quantity)
        .map(|n| n as i64)
        .ok_or_else(|| {
            AppError::validation(format!("Invalid quantity for {}: {}", draft.key, draft.quantity))
                .with_detail("inventory_id", draft.key.clone())
        })
}

fn parse_unit_price(draft: &VariantDraft) -> AppResult<Option<f64>> {
    if draft.unit_price.trim().is_empty() {
        return Ok(None);
    }
    parse_number(&draft.unit_price).map(Some).ok_or_else(|| {
        AppError::validation(format!("Invalid unit price for {}: {}", draft.key, draft.unit_price))
            .with_detail("inventory_id", draft.key.clone())
    })
}

fn or_null(value: &str) -> Value {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        Value::Null
    } else {
        Value::String(trimmed.to_string())
    }
}

fn field_list(fields: &[ChangedField]) -> String {
    fields
        .iter()
        .map(ChangedField::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

/// products_master document for the effective group id
pub fn build_product_doc(
    group: &ProductGroup,
    product: &ProductDraft,
    changed: &[ChangedField],
    refs: &GroupRefs,
    resolver: &TaxonomyResolver,
) -> AppResult<PendingOperation> {
    let types = resolve_tokens(resolver, &parse_types_input(&product.types_input), TaxonomyKind::Types)?;
    let damages = resolve_tokens(
        resolver,
        &parse_damages_input(&product.damages_input),
        TaxonomyKind::Damages,
    )?;
    let sealing = resolve_tokens(
        resolver,
        &parse_sealing_input(&product.sealing_input),
        TaxonomyKind::Sealing,
    )?;

    let doc_id = if refs.group_id == group.group_id {
        group.doc_id().to_string()
    } else {
        refs.group_id.clone()
    };

    let data = object(json!({
        "variant_group_id": refs.group_id,
        "series_id": or_null(&product.series_id),
        "product_name": refs.product_name,
        "vol": or_null(&product.vol),
        "release_date": release_date_value(&product.release_date)?,
        "category": refs.category,
        "types": types,
        "damages": damages,
        "sealing": sealing,
        "updated_at": now_iso(),
    }));

    Ok(PendingOperation::set(
        Collection::Products,
        doc_id.clone(),
        data,
        format!("{} / {} [{}]", Collection::Products, doc_id, field_list(changed)),
    ))
}

/// inventory_master document for one variant
///
/// Taxonomy fields carry canonical ids next to their labels; the owning
/// group's references come from `refs`.
pub fn build_variant_doc(
    group: &ProductGroup,
    variant: &Variant,
    draft: &VariantDraft,
    diff: &FieldDiff,
    refs: &GroupRefs,
    resolver: &TaxonomyResolver,
) -> AppResult<PendingOperation> {
    let types = resolve_tokens(resolver, &parse_types_input(&draft.types), TaxonomyKind::Types)?;
    let damages = resolve_tokens(resolver, &parse_damages_input(&draft.damages), TaxonomyKind::Damages)?;
    let sealing = resolve_tokens(resolver, &parse_sealing_input(&draft.sealing), TaxonomyKind::Sealing)?;
    let storage = resolver.resolve_required(&draft.storage_location, TaxonomyKind::Storages)?;
    let label = |id: &Option<String>, kind: TaxonomyKind| {
        id.as_deref().map(|id| resolver.get_label(id, kind))
    };

    let variant_id = variant.variant_doc_id(&group.group_id);
    let data = object(json!({
        "variant_sku": variant_id,
        "variantIdRef": variant_id,
        "inventory_id": draft.key,
        "groupIdRef": refs.group_id,
        "productNameRef": refs.product_name,
        "categoryRef": refs.category,
        "types": types,
        "types_label": label(&types, TaxonomyKind::Types),
        "damages": damages,
        "damages_label": label(&damages, TaxonomyKind::Damages),
        "sealing": sealing,
        "sealing_label": label(&sealing, TaxonomyKind::Sealing),
        "storage": storage,
        "storage_label": label(&storage, TaxonomyKind::Storages),
        "quantity": parse_quantity(draft)?,
        "unit_price": parse_unit_price(draft)?,
        "status_tokens": parse_status_tokens(&draft.status_tokens),
        "barcode": draft.barcode.trim(),
        "notes": draft.notes.trim(),
        "updated_at": now_iso(),
        "changed_fields": diff.field_names(),
    }));

    Ok(PendingOperation::set(
        Collection::Inventory,
        draft.key.clone(),
        data,
        format!(
            "{} / {} [{}]",
            Collection::Inventory,
            draft.key,
            field_list(&diff.changed_fields)
        ),
    ))
}

/// Overlay one variant draft onto a canonical variant
fn apply_variant_draft(variant: &mut Variant, draft: &VariantDraft, resolver: &TaxonomyResolver) {
    if let Some(types) = resolved_or_raw(resolver, parse_types_input(&draft.types), TaxonomyKind::Types) {
        variant.variant_type = types;
    }
    if let Some(damages) =
        resolved_or_raw(resolver, parse_damages_input(&draft.damages), TaxonomyKind::Damages)
    {
        variant.damages = damages;
    }
    if let Some(sealing) =
        resolved_or_raw(resolver, parse_sealing_input(&draft.sealing), TaxonomyKind::Sealing)
    {
        variant.sealing = sealing;
    }
    let storage = draft.storage_location.trim();
    if !storage.is_empty() {
        variant.storage_location = resolver
            .resolve(&[storage], TaxonomyKind::Storages)
            .unwrap_or_else(|| storage.to_string());
    }
    if let Some(quantity) = parse_number(&draft.quantity) {
        variant.quantity = quantity as i64;
    }
    if let Some(price) = parse_number(&draft.unit_price) {
        variant.unit_price = Some(price);
    }
    let status = parse_status_tokens(&draft.status_tokens);
    if !status.is_empty() {
        variant.status_tokens = status.join("|");
    }
    if !draft.barcode.trim().is_empty() {
        variant.barcode = draft.barcode.trim().to_string();
    }
    if !draft.notes.trim().is_empty() {
        variant.notes = draft.notes.trim().to_string();
    }
}

/// The group as it should read back after a successful save
pub fn build_updated_snapshot(
    group: &ProductGroup,
    drafts: &GroupDrafts,
    refs: &GroupRefs,
    resolver: &TaxonomyResolver,
) -> ProductGroup {
    let product = &drafts.product;
    let mut snapshot = group.clone();

    if refs.group_id != group.group_id {
        snapshot.docid = None;
    }
    snapshot.group_id = refs.group_id.clone();
    snapshot.series_id = product.series_id.trim().to_string();
    snapshot.product_name = refs.product_name.clone();
    snapshot.vol = product.vol.trim().to_string();
    let release_date = normalize_release_date(Some(product.release_date.as_str()));
    snapshot.release_date = (!release_date.is_empty()).then_some(release_date);
    snapshot.category = refs.category.clone();
    snapshot.types = resolved_or_raw(resolver, parse_types_input(&product.types_input), TaxonomyKind::Types)
        .into_iter()
        .collect();
    snapshot.damages =
        resolved_or_raw(resolver, parse_damages_input(&product.damages_input), TaxonomyKind::Damages)
            .into_iter()
            .collect();
    snapshot.sealing =
        resolved_or_raw(resolver, parse_sealing_input(&product.sealing_input), TaxonomyKind::Sealing)
            .into_iter()
            .collect();

    for variant in &mut snapshot.variants {
        if let Some(draft) = drafts.variant(&variant.inventory_id) {
            apply_variant_draft(variant, draft, resolver);
        }
    }
    snapshot.recompute_total_quantity();
    snapshot.sync_variant_refs();
    snapshot
}

/// Plan the save of the whole open group
pub fn collect_save_operations(
    session: &EditSession,
    resolver: &TaxonomyResolver,
) -> AppResult<SavePlan> {
    let group = session.group();
    let drafts = session.drafts();
    let diff = session.diff();
    if diff.is_empty() {
        return Err(AppError::with_message(
            ErrorCode::NothingToSave,
            format!("No changes to save for {}", group.group_id),
        ));
    }

    let refs = resolve_group_refs(group, &drafts.product, resolver)?;
    let mut operations = Vec::new();

    if refs.group_id != group.group_id {
        if group.variants.is_empty() {
            operations.push(records::archive_group(group, None, reason::GROUP_ID_CHANGED));
            operations.push(records::delete_group(group));
        } else {
            operations.push(records::archive_group(
                group,
                Some(&refs.group_id),
                &reason::merged_into(&refs.group_id),
            ));
            operations.push(records::delete_group(group));
            for variant in &group.variants {
                operations.push(records::repoint_variant(&group.group_id, variant, &refs.group_id));
            }
            for variant in &group.variants {
                operations.push(records::repoint_inventory(&group.group_id, variant, &refs));
            }
        }
    }

    if !diff.product.is_empty() {
        operations.push(build_product_doc(group, &drafts.product, &diff.product, &refs, resolver)?);
    }

    for variant_diff in &diff.variants {
        let variant = group
            .variant(&variant_diff.key)
            .ok_or_else(|| AppError::variant_not_found(variant_diff.key.clone()))?;
        let draft = drafts
            .variant(&variant_diff.key)
            .ok_or_else(|| AppError::variant_not_found(variant_diff.key.clone()))?;
        operations.push(build_variant_doc(group, variant, draft, variant_diff, &refs, resolver)?);
    }

    tracing::debug!(
        group_id = %group.group_id,
        saved_group_id = %refs.group_id,
        operations = operations.len(),
        product_fields = %field_list(&diff.product),
        variants = diff.variants.len(),
        "Save planned"
    );

    Ok(SavePlan {
        group_id: group.group_id.clone(),
        saved_group_id: refs.group_id.clone(),
        snapshot: build_updated_snapshot(group, drafts, &refs, resolver),
        operations,
        diff,
    })
}

/// Plan the save of a single variant
///
/// Only that variant's inventory document is written; its group references
/// come from the canonical group, not from unsaved product edits.
pub fn collect_variant_save(
    session: &EditSession,
    resolver: &TaxonomyResolver,
    inventory_id: &str,
) -> AppResult<SavePlan> {
    let group = session.group();
    let variant = group
        .variant(inventory_id)
        .ok_or_else(|| AppError::variant_not_found(inventory_id.trim()))?;
    let draft = session
        .drafts()
        .variant(inventory_id)
        .ok_or_else(|| AppError::variant_not_found(inventory_id.trim()))?;
    let variant_diff = diff_variant(variant, draft, false).ok_or_else(|| {
        AppError::with_message(
            ErrorCode::NothingToSave,
            format!("No changes to save for {}", draft.key),
        )
    })?;

    let refs = GroupRefs::from(group);
    let operation = build_variant_doc(group, variant, draft, &variant_diff, &refs, resolver)?;

    let mut snapshot = group.clone();
    if let Some(target) = snapshot.variant_mut(inventory_id) {
        apply_variant_draft(target, draft, resolver);
    }
    snapshot.recompute_total_quantity();

    Ok(SavePlan {
        group_id: group.group_id.clone(),
        saved_group_id: group.group_id.clone(),
        operations: vec![operation],
        diff: GroupDiff {
            product: Vec::new(),
            variants: vec![variant_diff],
        },
        snapshot,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::draft::{ProductDraftPatch, VariantDraftPatch};
    use crate::taxonomy::TaxonomyDocument;
    use shared::store::WriteAction;

    fn resolver() -> TaxonomyResolver {
        TaxonomyResolver::new()
            .with_document(
                TaxonomyKind::Types,
                TaxonomyDocument::from_terms([("box", "箱"), ("loose", "裸")]),
            )
            .with_document(TaxonomyKind::Damages, TaxonomyDocument::from_terms([("dent", "凹み")]))
            .with_document(TaxonomyKind::Sealing, TaxonomyDocument::from_terms([("sealed", "未開封")]))
            .with_document(
                TaxonomyKind::Categories,
                TaxonomyDocument::from_terms([("cat_game", "ゲーム"), ("cat_card", "カード")]),
            )
            .with_document(TaxonomyKind::Storages, TaxonomyDocument::from_terms([("wh_a", "倉庫A")]))
    }

    fn variant(id: &str) -> Variant {
        Variant {
            inventory_id: id.to_string(),
            variant_sku: format!("vg_1_{}", id),
            variant_type: "box".to_string(),
            sealing: "sealed".to_string(),
            storage_location: "wh_a".to_string(),
            quantity: 2,
            unit_price: Some(500.0),
            ..Default::default()
        }
    }

    fn group(variants: Vec<Variant>) -> ProductGroup {
        let mut group = ProductGroup {
            group_id: "vg_1".to_string(),
            product_name: "Alpha".to_string(),
            category: "cat_game".to_string(),
            types: vec!["box".to_string()],
            sealing: vec!["sealed".to_string()],
            variants,
            ..Default::default()
        };
        group.recompute_total_quantity();
        group.sync_variant_refs();
        group
    }

    fn session(variants: Vec<Variant>) -> EditSession {
        EditSession::open_with_resolver(group(variants), &resolver()).unwrap()
    }

    fn data(op: &PendingOperation) -> &serde_json::Map<String, Value> {
        match &op.action {
            WriteAction::Set(data) => data,
            WriteAction::Delete => panic!("expected set"),
        }
    }

    fn targets(plan: &SavePlan) -> Vec<String> {
        plan.operations
            .iter()
            .map(|op| {
                let verb = if op.action.is_delete() { "del" } else { "set" };
                // 归档记录按原文档 id 展示
                let id = match &op.action {
                    WriteAction::Set(data) if op.collection.is_archive() => {
                        data["originalDocId"].as_str().unwrap_or_default()
                    }
                    _ => op.doc_id.as_str(),
                };
                format!("{} {}/{}", verb, op.collection, id)
            })
            .collect()
    }

    #[test]
    fn test_unchanged_session_has_nothing_to_save() {
        let err = collect_save_operations(&session(vec![variant("inv-1")]), &resolver()).unwrap_err();
        assert_eq!(err.code, ErrorCode::NothingToSave);
    }

    #[test]
    fn test_rename_writes_product_and_every_variant() {
        let mut s = session(vec![variant("inv-1"), variant("inv-2")]);
        s.patch_product(ProductDraftPatch {
            product_name: Some("Alpha II".to_string()),
            category_input: Some("カード".to_string()),
            ..Default::default()
        });

        let plan = collect_save_operations(&s, &resolver()).unwrap();
        assert!(!plan.is_group_change());
        assert_eq!(
            targets(&plan),
            vec![
                "set products_master/vg_1",
                "set inventory_master/inv-1",
                "set inventory_master/inv-2",
            ]
        );

        let product = data(&plan.operations[0]);
        assert_eq!(product["product_name"], "Alpha II");
        assert_eq!(product["category"], "cat_card");
        assert_eq!(product["types"], "box");
        assert_eq!(product["series_id"], Value::Null);

        for op in &plan.operations[1..] {
            let doc = data(op);
            assert_eq!(doc["productNameRef"], "Alpha II");
            assert_eq!(doc["categoryRef"], "cat_card");
            assert_eq!(doc["changed_fields"], json!(["productName", "category"]));
            assert_eq!(doc["types"], "box");
            assert_eq!(doc["types_label"], "箱");
            assert_eq!(doc["storage_label"], "倉庫A");
        }

        assert_eq!(plan.snapshot.product_name, "Alpha II");
        assert_eq!(plan.snapshot.category, "cat_card");
        assert_eq!(plan.snapshot.variants[1].product_name_ref, "Alpha II");
    }

    #[test]
    fn test_group_id_change_archives_and_repoints() {
        let mut s = session(vec![variant("inv-1")]);
        s.patch_product(ProductDraftPatch {
            group_id: Some("vg_9".to_string()),
            ..Default::default()
        });

        let plan = collect_save_operations(&s, &resolver()).unwrap();
        assert!(plan.is_group_change());
        assert_eq!(
            targets(&plan),
            vec![
                "set products_master_archive/vg_1",
                "del products_master/vg_1",
                "set variants_master/vg_1_inv-1",
                "set inventory_master/inv-1",
                "set products_master/vg_9",
                "set inventory_master/inv-1",
            ]
        );
        assert_eq!(data(&plan.operations[0])["mergedInto"], "vg_9");
        assert_eq!(data(&plan.operations[2])["variantGroupIdRef"], "vg_9");
        assert_eq!(data(&plan.operations[5])["groupIdRef"], "vg_9");
        assert_eq!(data(&plan.operations[5])["changed_fields"], json!(["groupId"]));
        assert_eq!(plan.snapshot.group_id, "vg_9");
        assert_eq!(plan.snapshot.variants[0].group_id_ref, "vg_9");
    }

    #[test]
    fn test_group_id_change_without_variants() {
        let mut s = session(vec![]);
        s.patch_product(ProductDraftPatch {
            group_id: Some("vg_9".to_string()),
            ..Default::default()
        });

        let plan = collect_save_operations(&s, &resolver()).unwrap();
        assert_eq!(
            targets(&plan),
            vec![
                "set products_master_archive/vg_1",
                "del products_master/vg_1",
                "set products_master/vg_9",
            ]
        );
        assert!(!data(&plan.operations[0]).contains_key("mergedInto"));
    }

    #[test]
    fn test_unknown_label_rejects_save() {
        let mut s = session(vec![variant("inv-1")]);
        s.patch_variant(
            "inv-1",
            VariantDraftPatch {
                types: Some("宝箱".to_string()),
                ..Default::default()
            },
        )
        .unwrap();

        let err = collect_save_operations(&s, &resolver()).unwrap_err();
        assert_eq!(err.code, ErrorCode::UnknownTaxonomyLabel);
    }

    #[test]
    fn test_labels_resolve_to_ids() {
        let mut s = session(vec![variant("inv-1")]);
        s.patch_variant(
            "inv-1",
            VariantDraftPatch {
                types: Some("裸".to_string()),
                damages: Some("凹み".to_string()),
                quantity: Some("1,200".to_string()),
                ..Default::default()
            },
        )
        .unwrap();

        let plan = collect_save_operations(&s, &resolver()).unwrap();
        let doc = data(&plan.operations[0]);
        assert_eq!(doc["types"], "loose");
        assert_eq!(doc["damages"], "dent");
        assert_eq!(doc["quantity"], 1200);
        assert_eq!(plan.snapshot.variants[0].variant_type, "loose");
        assert_eq!(plan.snapshot.total_quantity, 1200);
    }

    #[test]
    fn test_invalid_quantity_rejects_save() {
        let mut s = session(vec![variant("inv-1")]);
        s.patch_variant(
            "inv-1",
            VariantDraftPatch {
                quantity: Some("many".to_string()),
                ..Default::default()
            },
        )
        .unwrap();
        let err = collect_save_operations(&s, &resolver()).unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationFailed);
    }

    #[test]
    fn test_single_variant_save_uses_canonical_refs() {
        let mut s = session(vec![variant("inv-1"), variant("inv-2")]);
        s.patch_product(ProductDraftPatch {
            product_name: Some("Unsaved".to_string()),
            ..Default::default()
        });
        s.patch_variant(
            "inv-2",
            VariantDraftPatch {
                notes: Some("corner dent".to_string()),
                ..Default::default()
            },
        )
        .unwrap();

        let plan = collect_variant_save(&s, &resolver(), "inv-2").unwrap();
        assert_eq!(targets(&plan), vec!["set inventory_master/inv-2"]);
        let doc = data(&plan.operations[0]);
        assert_eq!(doc["productNameRef"], "Alpha");
        assert_eq!(doc["changed_fields"], json!(["notes"]));
        assert_eq!(plan.snapshot.variants[1].notes, "corner dent");

        let err = collect_variant_save(&s, &resolver(), "inv-1").unwrap_err();
        assert_eq!(err.code, ErrorCode::NothingToSave);
    }
}
