//! DraftManager - editable working copies of canonical records
//!
//! 草稿保存自由文本输入（taxonomy 尚未解析），diff 和保存都以草稿为准。
//! 草稿 key 只用 `inventory_id`：空白或重复的 id 直接拒绝，不再退回共享的占位 key。

use chrono::{DateTime, NaiveDate};
use serde::{Deserialize, Serialize};
use shared::error::{AppError, AppResult, ErrorCode};
use shared::models::{ProductGroup, Variant};
use std::collections::BTreeMap;

use crate::taxonomy::{TaxonomyKind, TaxonomyResolver};
use crate::tokens::{
    format_number, parse_damages_input, parse_sealing_input, parse_types_input,
};

/// Product-level working copy, keyed by group id
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductDraft {
    /// Effective group id; a different value re-homes the group on save
    pub group_id: String,
    pub series_id: String,
    pub product_name: String,
    pub vol: String,
    /// Plain calendar date `YYYY-MM-DD`, empty when unknown
    pub release_date: String,
    pub category: String,
    pub category_input: String,
    /// Single-select taxonomy inputs
    pub types_input: String,
    pub damages_input: String,
    pub sealing_input: String,
    /// Default storage pushed to every variant draft
    pub storage_input: String,
}

impl ProductDraft {
    /// Draft group id, falling back to the canonical one when blank
    pub fn effective_group_id<'a>(&'a self, group: &'a ProductGroup) -> &'a str {
        let id = self.group_id.trim();
        if id.is_empty() { group.group_id.as_str() } else { id }
    }

    /// Apply a form patch; returns the values to push into every variant draft
    ///
    /// Taxonomy inputs are reduced to their first token, the category input
    /// doubles as the category and storage is trimmed.
    pub fn apply(&mut self, patch: ProductDraftPatch) -> VariantSync {
        let mut sync = VariantSync::default();

        if let Some(value) = patch.group_id {
            self.group_id = value;
        }
        if let Some(value) = patch.series_id {
            self.series_id = value;
        }
        if let Some(value) = patch.product_name {
            self.product_name = value;
        }
        if let Some(value) = patch.vol {
            self.vol = value;
        }
        if let Some(value) = patch.release_date {
            self.release_date = value;
        }
        if let Some(value) = patch.types_input {
            self.types_input = parse_types_input(&value).into_iter().next().unwrap_or_default();
            sync.types = Some(self.types_input.clone());
        }
        if let Some(value) = patch.damages_input {
            self.damages_input = parse_damages_input(&value).into_iter().next().unwrap_or_default();
            sync.damages = Some(self.damages_input.clone());
        }
        if let Some(value) = patch.sealing_input {
            self.sealing_input = parse_sealing_input(&value).into_iter().next().unwrap_or_default();
            sync.sealing = Some(self.sealing_input.clone());
        }
        if let Some(value) = patch.category_input {
            let trimmed = value.trim().to_string();
            self.category = trimmed.clone();
            self.category_input = trimmed;
        }
        if let Some(value) = patch.storage_input {
            self.storage_input = value.trim().to_string();
            sync.storage = Some(self.storage_input.clone());
        }

        sync
    }
}

/// Partial update of a [`ProductDraft`]
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProductDraftPatch {
    pub group_id: Option<String>,
    pub series_id: Option<String>,
    pub product_name: Option<String>,
    pub vol: Option<String>,
    pub release_date: Option<String>,
    pub category_input: Option<String>,
    pub types_input: Option<String>,
    pub damages_input: Option<String>,
    pub sealing_input: Option<String>,
    pub storage_input: Option<String>,
}

/// Product-level values copied into every variant draft
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VariantSync {
    pub types: Option<String>,
    pub damages: Option<String>,
    pub sealing: Option<String>,
    pub storage: Option<String>,
}

impl VariantSync {
    pub fn is_empty(&self) -> bool {
        self.types.is_none() && self.damages.is_none() && self.sealing.is_none() && self.storage.is_none()
    }
}

/// Variant-level working copy, keyed by inventory id
///
/// Numeric fields hold the raw form text; they are parsed when diffed or saved.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariantDraft {
    pub key: String,
    pub inventory_id: String,
    pub variant_sku: String,
    pub types: String,
    pub damages: String,
    pub sealing: String,
    pub storage_location: String,
    pub quantity: String,
    pub unit_price: String,
    pub status_tokens: String,
    pub barcode: String,
    pub notes: String,
}

impl VariantDraft {
    /// Apply a form patch; the key never changes
    pub fn apply(&mut self, patch: VariantDraftPatch) {
        let VariantDraftPatch {
            types,
            damages,
            sealing,
            storage_location,
            quantity,
            unit_price,
            status_tokens,
            barcode,
            notes,
        } = patch;
        for (slot, value) in [
            (&mut self.types, types),
            (&mut self.damages, damages),
            (&mut self.sealing, sealing),
            (&mut self.storage_location, storage_location),
            (&mut self.quantity, quantity),
            (&mut self.unit_price, unit_price),
            (&mut self.status_tokens, status_tokens),
            (&mut self.barcode, barcode),
            (&mut self.notes, notes),
        ] {
            if let Some(value) = value {
                *slot = value;
            }
        }
    }
}

/// Partial update of a [`VariantDraft`]
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VariantDraftPatch {
    pub types: Option<String>,
    pub damages: Option<String>,
    pub sealing: Option<String>,
    pub storage_location: Option<String>,
    pub quantity: Option<String>,
    pub unit_price: Option<String>,
    pub status_tokens: Option<String>,
    pub barcode: Option<String>,
    pub notes: Option<String>,
}

/// Drafts of one group
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GroupDrafts {
    pub product: ProductDraft,
    pub variants: BTreeMap<String, VariantDraft>,
}

impl GroupDrafts {
    pub fn variant(&self, inventory_id: &str) -> Option<&VariantDraft> {
        self.variants.get(inventory_id.trim())
    }

    /// Push product-level selections into every variant draft
    pub fn sync_variants(&mut self, sync: &VariantSync) {
        if sync.is_empty() {
            return;
        }
        for draft in self.variants.values_mut() {
            if let Some(types) = &sync.types {
                draft.types = types.clone();
            }
            if let Some(damages) = &sync.damages {
                draft.damages = damages.clone();
            }
            if let Some(sealing) = &sync.sealing {
                draft.sealing = sealing.clone();
            }
            if let Some(storage) = &sync.storage {
                draft.storage_location = storage.clone();
            }
        }
    }

    /// Apply a product patch and sync the affected variant fields
    pub fn apply_product_patch(&mut self, patch: ProductDraftPatch) {
        let sync = self.product.apply(patch);
        self.sync_variants(&sync);
    }
}

/// Normalize a stored release date to `YYYY-MM-DD`
///
/// Accepts RFC 3339 timestamps and plain `YYYY-MM-DD` / `YYYY/MM/DD` dates;
/// anything else becomes empty.
pub fn normalize_release_date(raw: Option<&str>) -> String {
    let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return String::new();
    };
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return ts.with_timezone(&chrono::Utc).date_naive().format("%Y-%m-%d").to_string();
    }
    ["%Y-%m-%d", "%Y/%m/%d"]
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
        .map(|date| date.format("%Y-%m-%d").to_string())
        .unwrap_or_default()
}

pub(crate) fn first_non_empty(values: &[String]) -> String {
    values
        .iter()
        .map(|v| v.trim())
        .find(|v| !v.is_empty())
        .unwrap_or_default()
        .to_string()
}

/// Build a product draft from a canonical group
pub fn create_product_draft(group: &ProductGroup) -> ProductDraft {
    ProductDraft {
        group_id: group.group_id.clone(),
        series_id: group.series_id.clone(),
        product_name: group.product_name.clone(),
        vol: group.vol.clone(),
        release_date: normalize_release_date(group.release_date.as_deref()),
        category: group.category.clone(),
        category_input: group.category.clone(),
        types_input: first_non_empty(&group.types),
        damages_input: first_non_empty(&group.damages),
        sealing_input: first_non_empty(&group.sealing),
        storage_input: String::new(),
    }
}

/// Build a variant draft; a blank inventory id is rejected
pub fn create_variant_draft(variant: &Variant) -> AppResult<VariantDraft> {
    let key = variant.inventory_id.trim();
    if key.is_empty() {
        return Err(AppError::with_message(
            ErrorCode::BlankInventoryId,
            format!("Variant {} has no inventory id", variant.variant_sku),
        )
        .with_detail("variant_sku", variant.variant_sku.clone()));
    }

    Ok(VariantDraft {
        key: key.to_string(),
        inventory_id: variant.inventory_id.clone(),
        variant_sku: variant.variant_sku.clone(),
        types: variant.variant_type.clone(),
        damages: variant.damages.clone(),
        sealing: variant.sealing.clone(),
        storage_location: variant.storage_location.clone(),
        quantity: variant.quantity.to_string(),
        unit_price: format_number(variant.unit_price.unwrap_or(0.0)),
        status_tokens: variant.status_tokens.clone(),
        barcode: variant.barcode.clone(),
        notes: variant.notes.clone(),
    })
}

/// Build the product draft and one variant draft per variant
pub fn init_drafts_from_group(group: &ProductGroup) -> AppResult<GroupDrafts> {
    let mut variants = BTreeMap::new();
    for variant in &group.variants {
        let draft = create_variant_draft(variant)?;
        if variants.contains_key(&draft.key) {
            return Err(AppError::with_message(
                ErrorCode::DuplicateInventoryId,
                format!("Inventory id {} appears twice in group {}", draft.key, group.group_id),
            )
            .with_detail("inventory_id", draft.key.clone())
            .with_detail("group_id", group.group_id.clone()));
        }
        variants.insert(draft.key.clone(), draft);
    }

    Ok(GroupDrafts {
        product: create_product_draft(group),
        variants,
    })
}

/// Rebuild drafts with taxonomy inputs seeded from resolved canonical ids
///
/// The storage input is seeded from the first variant that has a location.
/// Values that do not resolve are kept as typed.
pub fn reset_drafts(group: &ProductGroup, resolver: &TaxonomyResolver) -> AppResult<GroupDrafts> {
    let mut drafts = init_drafts_from_group(group)?;
    let seed = |candidates: &[String], kind: TaxonomyKind| {
        resolver
            .resolve(candidates, kind)
            .unwrap_or_else(|| first_non_empty(candidates))
    };

    let product = &mut drafts.product;
    product.types_input = seed(&group.types, TaxonomyKind::Types);
    product.damages_input = seed(&group.damages, TaxonomyKind::Damages);
    product.sealing_input = seed(&group.sealing, TaxonomyKind::Sealing);
    product.category_input = seed(std::slice::from_ref(&group.category), TaxonomyKind::Categories);
    product.storage_input = group
        .variants
        .iter()
        .map(|v| v.storage_location.trim())
        .find(|s| !s.is_empty())
        .map(|location| {
            let location = location.to_string();
            seed(std::slice::from_ref(&location), TaxonomyKind::Storages)
        })
        .unwrap_or_default();

    tracing::debug!(
        group_id = %group.group_id,
        variants = drafts.variants.len(),
        "Drafts reset with resolved taxonomy"
    );
    Ok(drafts)
}
