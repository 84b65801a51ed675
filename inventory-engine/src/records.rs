//! Store document builders
//!
//! 合并、保存、强制删除共用的文档构造：归档记录、删除、引用重定向。
//! 归档记录只写一次（append-only），写入成功后记审计日志。
//! 每份归档使用独立的文档 id（`{原 id}_{毫秒}_{随机后缀}`），原 id 存在
//! `originalDocId` 字段里；重试或重复归档只会追加新记录，不会覆盖旧记录。

use chrono::{SecondsFormat, Utc};
use serde_json::{Map, Value, json};
use shared::models::{ProductGroup, Variant};
use shared::store::{Collection, PendingOperation};
use shared::util::now_iso;
use uuid::Uuid;

use crate::audit_log;
use crate::writer::WriteReport;

/// Denormalized references a variant carries to its owning group
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupRefs {
    pub group_id: String,
    pub product_name: String,
    pub category: String,
}

impl From<&ProductGroup> for GroupRefs {
    fn from(group: &ProductGroup) -> Self {
        Self {
            group_id: group.group_id.clone(),
            product_name: group.product_name.clone(),
            category: group.category.clone(),
        }
    }
}

/// Archive reasons written into archive records
pub mod reason {
    pub const MERGED_INTO_EXISTING: &str = "merged_into_existing";
    pub const DISCARDED_DURING_MERGE: &str = "discarded_during_merge";
    pub const VARIANT_DISCARDED: &str = "variant_discarded";
    pub const FORCE_DELETED: &str = "force_deleted";
    pub const GROUP_ID_CHANGED: &str = "group_id_changed";

    pub fn merged_into(group_id: &str) -> String {
        format!("merged_into_{}", group_id)
    }
}

pub(crate) fn object(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

/// Identity of one archive copy: its own document id plus the archive time
#[derive(Debug, Clone)]
struct ArchiveStamp {
    doc_id: String,
    archived_at: String,
}

impl ArchiveStamp {
    fn new(original_doc_id: &str) -> Self {
        let now = Utc::now();
        let nonce = Uuid::new_v4().simple().to_string();
        Self {
            doc_id: format!(
                "{}_{}_{}",
                original_doc_id,
                now.timestamp_millis(),
                &nonce[..8]
            ),
            archived_at: now.to_rfc3339_opts(SecondsFormat::Millis, true),
        }
    }

    /// Stamp `archivedAt` / `originalDocId` into the payload and build the set
    fn into_operation(
        self,
        collection: Collection,
        original_doc_id: &str,
        mut data: Map<String, Value>,
        summary: String,
    ) -> PendingOperation {
        data.insert("archivedAt".to_string(), Value::String(self.archived_at));
        data.insert(
            "originalDocId".to_string(),
            Value::String(original_doc_id.to_string()),
        );
        PendingOperation::set(collection, self.doc_id, data, summary)
    }
}

/// Archive copy of a group, taken before it is deleted
///
/// `merged_into` is recorded when the group's variants move to another group.
pub fn archive_group(
    group: &ProductGroup,
    merged_into: Option<&str>,
    archive_reason: &str,
) -> PendingOperation {
    let variant_skus: Vec<String> = group
        .variants
        .iter()
        .map(|v| v.variant_doc_id(&group.group_id))
        .collect();
    let mut data = object(json!({
        "variant_group_id": group.group_id,
        "series_id": group.series_id,
        "product_name": group.product_name,
        "vol": group.vol,
        "category": group.category,
        "types": group.types,
        "damages": group.damages,
        "sealing": group.sealing,
        "archiveReason": archive_reason,
        "originalData": {
            "variant_skus": variant_skus,
            "totalQuantity": group.total_quantity,
        },
    }));
    if let Some(target) = merged_into {
        data.insert("mergedInto".to_string(), Value::String(target.to_string()));
    }
    let original = group.doc_id();
    ArchiveStamp::new(original).into_operation(
        Collection::ProductsArchive,
        original,
        data,
        format!("Archive group {} ({})", group.group_id, archive_reason),
    )
}

pub fn delete_group(group: &ProductGroup) -> PendingOperation {
    PendingOperation::delete(
        Collection::Products,
        group.doc_id(),
        format!("Delete group {}", group.group_id),
    )
}

/// Point a variants_master document at another group; payload otherwise unchanged
pub fn repoint_variant(from_group_id: &str, variant: &Variant, to_group_id: &str) -> PendingOperation {
    let variant_id = variant.variant_doc_id(from_group_id);
    PendingOperation::set(
        Collection::Variants,
        variant_id.clone(),
        object(json!({
            "variant_id": variant_id,
            "variantGroupIdRef": to_group_id,
            "updated_at": now_iso(),
        })),
        format!("Update variant {} → group {}", variant_id, to_group_id),
    )
}

/// Refresh an inventory record's denormalized group references
pub fn repoint_inventory(from_group_id: &str, variant: &Variant, refs: &GroupRefs) -> PendingOperation {
    PendingOperation::set(
        Collection::Inventory,
        variant.inventory_id.trim(),
        object(json!({
            "groupIdRef": refs.group_id,
            "productNameRef": refs.product_name,
            "categoryRef": refs.category,
            "previous_variant_group_id": from_group_id,
            "updated_at": now_iso(),
        })),
        format!("Update inventory {} → group {}", variant.inventory_id.trim(), refs.group_id),
    )
}

/// Point an inventory record at a surviving variant of the target group
pub fn point_inventory_at_variant(
    from_group_id: &str,
    variant: &Variant,
    target_variant_id: &str,
    refs: &GroupRefs,
) -> PendingOperation {
    PendingOperation::set(
        Collection::Inventory,
        variant.inventory_id.trim(),
        object(json!({
            "variantIdRef": target_variant_id,
            "variant_sku": target_variant_id,
            "groupIdRef": refs.group_id,
            "productNameRef": refs.product_name,
            "categoryRef": refs.category,
            "previous_variant_group_id": from_group_id,
            "updated_at": now_iso(),
        })),
        format!(
            "Update inventory {} → variant {}",
            variant.inventory_id.trim(),
            target_variant_id
        ),
    )
}

/// Archive copy of a variants_master document
pub fn archive_variant(
    group_id: &str,
    variant: &Variant,
    archive_reason: &str,
    merged_into_variant: Option<&str>,
) -> PendingOperation {
    let variant_id = variant.variant_doc_id(group_id);
    let mut data = object(json!({
        "variant_id": variant_id,
        "variantGroupIdRef": group_id,
        "type": variant.variant_type,
        "sealing": variant.sealing,
        "reason": archive_reason,
    }));
    if let Some(target) = merged_into_variant {
        data.insert("mergedIntoVariant".to_string(), Value::String(target.to_string()));
    }
    ArchiveStamp::new(&variant_id).into_operation(
        Collection::VariantsArchive,
        &variant_id,
        data,
        format!("Archive variant {} ({})", variant_id, archive_reason),
    )
}

pub fn delete_variant(group_id: &str, variant: &Variant) -> PendingOperation {
    let variant_id = variant.variant_doc_id(group_id);
    PendingOperation::delete(
        Collection::Variants,
        variant_id.clone(),
        format!("Delete variant {}", variant_id),
    )
}

/// Archive copy of an inventory_master document
pub fn archive_inventory(group_id: &str, variant: &Variant, archive_reason: &str) -> PendingOperation {
    let inventory_id = variant.inventory_id.trim();
    ArchiveStamp::new(inventory_id).into_operation(
        Collection::InventoryArchive,
        inventory_id,
        object(json!({
            "inventory_id": inventory_id,
            "variantIdRef": variant.variant_doc_id(group_id),
            "groupIdRef": group_id,
            "storage": variant.storage_location,
            "quantity": variant.quantity,
            "unit_price": variant.unit_price,
            "damages": variant.damages,
            "notes": variant.notes,
            "barcode": variant.barcode,
            "status_tokens": variant.status_tokens,
            "reason": archive_reason,
        })),
        format!("Archive inventory {} ({})", inventory_id, archive_reason),
    )
}

pub fn delete_inventory(variant: &Variant) -> PendingOperation {
    let inventory_id = variant.inventory_id.trim();
    PendingOperation::delete(
        Collection::Inventory,
        inventory_id,
        format!("Delete inventory {}", inventory_id),
    )
}

/// Archive and delete one variant together with its inventory record
pub fn remove_variant_with_inventory(
    group_id: &str,
    variant: &Variant,
    archive_reason: &str,
) -> Vec<PendingOperation> {
    vec![
        archive_variant(group_id, variant, archive_reason, None),
        delete_variant(group_id, variant),
        archive_inventory(group_id, variant, archive_reason),
        delete_inventory(variant),
    ]
}

/// Emit an audit event for every archive record the store accepted
pub fn audit_archives(operations: &[PendingOperation], report: &WriteReport) {
    for op in operations.iter().filter(|op| op.collection.is_archive()) {
        if report.was_written(op) {
            audit_log!("archive", format!("{}:{}", op.collection, op.doc_id), op.summary);
        }
    }
}
