//! Product group and variant models
//!
//! 三实体目录 (product group / variant / inventory record) 在客户端已经合并：
//! `ProductGroup` 持有其全部 `Variant`，每个 `Variant` 同时代表 variants_master
//! 与 inventory_master 中的一条记录。

use serde::{Deserialize, Serialize};

use super::diff::ChangedField;

/// Canonical record of one product, keyed by `group_id`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProductGroup {
    /// Identity, also the default store document id
    pub group_id: String,
    /// Store document id when it differs from `group_id`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub docid: Option<String>,
    #[serde(default)]
    pub series_id: String,
    pub product_name: String,
    #[serde(default)]
    pub vol: String,
    /// ISO 8601 date or timestamp as delivered by the store
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub release_date: Option<String>,
    /// Category taxonomy ID
    #[serde(default)]
    pub category: String,
    /// Taxonomy ID arrays
    #[serde(default)]
    pub types: Vec<String>,
    #[serde(default)]
    pub damages: Vec<String>,
    #[serde(default)]
    pub sealing: Vec<String>,
    #[serde(default)]
    pub total_quantity: i64,
    #[serde(default)]
    pub variants: Vec<Variant>,
}

impl ProductGroup {
    /// Document id in `products_master`
    pub fn doc_id(&self) -> &str {
        match self.docid.as_deref() {
            Some(id) if !id.trim().is_empty() => id,
            _ => &self.group_id,
        }
    }

    /// Find a variant by inventory id (trimmed comparison)
    pub fn variant(&self, inventory_id: &str) -> Option<&Variant> {
        let key = inventory_id.trim();
        self.variants.iter().find(|v| v.inventory_id.trim() == key)
    }

    pub fn variant_mut(&mut self, inventory_id: &str) -> Option<&mut Variant> {
        let key = inventory_id.trim();
        self.variants.iter_mut().find(|v| v.inventory_id.trim() == key)
    }

    /// Remove a variant, returning it if present
    pub fn remove_variant(&mut self, inventory_id: &str) -> Option<Variant> {
        let key = inventory_id.trim();
        let index = self.variants.iter().position(|v| v.inventory_id.trim() == key)?;
        let removed = self.variants.remove(index);
        self.recompute_total_quantity();
        Some(removed)
    }

    /// Sum of variant quantities
    pub fn recompute_total_quantity(&mut self) {
        self.total_quantity = self.variants.iter().map(|v| v.quantity).sum();
    }

    /// Copy this group's denormalized fields into every variant
    pub fn sync_variant_refs(&mut self) {
        let group_id = self.group_id.clone();
        let name = self.product_name.clone();
        let category = self.category.clone();
        for variant in &mut self.variants {
            variant.group_id_ref = group_id.clone();
            variant.product_name_ref = name.clone();
            variant.category_ref = category.clone();
        }
    }

    /// Display name: series id, product name and vol joined by spaces
    pub fn display_name(&self) -> String {
        [self.series_id.trim(), self.product_name.trim(), self.vol.trim()]
            .into_iter()
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// One stock-keeping configuration under a product group
///
/// Taxonomy fields hold canonical IDs; multi-valued fields are stored
/// `|`-joined the way the group-read endpoint delivers them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Variant {
    /// Unique identity key across the whole system
    pub inventory_id: String,
    /// Secondary identifier (variants_master document id)
    #[serde(default)]
    pub variant_sku: String,
    #[serde(rename = "type", default)]
    pub variant_type: String,
    #[serde(default)]
    pub damages: String,
    #[serde(default)]
    pub sealing: String,
    #[serde(default)]
    pub storage_location: String,
    #[serde(default)]
    pub quantity: i64,
    #[serde(default)]
    pub unit_price: Option<f64>,
    #[serde(default)]
    pub status_tokens: String,
    #[serde(default)]
    pub barcode: String,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub updated_at: String,

    // ── Denormalized copies of the owning group ──
    #[serde(default)]
    pub group_id_ref: String,
    #[serde(default)]
    pub product_name_ref: String,
    #[serde(default)]
    pub category_ref: String,
}

impl Variant {
    /// Product fields materialized on every variant
    ///
    /// A product diff naming any of these invalidates the copy held by each
    /// variant, so every variant diff must carry the field too.
    pub const DENORMALIZED: [ChangedField; 2] = [ChangedField::ProductName, ChangedField::Category];

    /// Document id in `variants_master`: the sku, or `{group}_{inventory}` when blank
    pub fn variant_doc_id(&self, group_id: &str) -> String {
        let sku = self.variant_sku.trim();
        if sku.is_empty() {
            format!("{}_{}", group_id, self.inventory_id.trim())
        } else {
            sku.to_string()
        }
    }

    /// Conflict key parts: type, sealing, damages, location
    pub fn key_parts(&self) -> (&str, &str, &str, &str) {
        (
            &self.variant_type,
            &self.sealing,
            &self.damages,
            &self.storage_location,
        )
    }
}
